/*!
  The human readable textual form of a program is called assembly. This module translates
  assembly into encoded words.

  The source is line oriented:
    ```text
    $define numA          % allocates the next free register after the program
    @loop: LDA RnumA      % a labelled instruction
    ADD #1                % immediate operand
    STR RRptr             % indirect operand
    BZE @loop             % branch to a label
    HLT
    ```
  (The `%` annotations above are not part of the syntax.) Blank lines and `$define` lines do not
  occupy an instruction slot, so the index of a label is the offset of its word in the output.

  Translation is done in three passes over the lines. The first numbers the labelled lines, the
  second allocates registers for the variables, and the third emits one word per instruction.
  Both symbol tables are complete before anything is emitted, so a branch may refer to a label
  defined further down. The first fault aborts the whole translation.
*/

use std::fmt::{Display, Formatter};

use nom::{
  bytes::complete::is_not,
  character::complete::{char as one_char, digit1, space1},
  combinator::{all_consuming, map_res},
  sequence::{pair, preceded, terminated},
  IResult
};
use prettytable::{row, Table};
use thiserror::Error;

use crate::addressing::AddressingMode;
use crate::symboltable::SymbolTable;
use crate::table::TABLE_DISPLAY_FORMAT;
use super::binary::{Word, EncodingError};
use super::instruction::{Instruction, Operation};

const DEFINE: &str = "$define";
const LABEL_SIGIL: char = '@';

/// Faults found while translating assembly. `line` is the 1-based source line.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum AssemblerError {
  #[error("line {line}: invalid variable definition `{text}`")]
  InvalidVariableDefinition { line: usize, text: String },
  #[error("line {line}: `{name}` is not a valid variable name")]
  InvalidVariableName { line: usize, name: String },
  #[error("line {line}: invalid label definition `{text}`")]
  InvalidLabelDefinition { line: usize, text: String },
  #[error("line {line}: invalid expressions in line `{text}`")]
  InvalidExpressionsInLine { line: usize, text: String },
  #[error("line {line}: `{mnemonic}` is not an operation")]
  InvalidOperation { line: usize, mnemonic: String },
  #[error("line {line}: `{operand}` does not start with an addressing mode")]
  InvalidAddressingMode { line: usize, operand: String },
  #[error("line {line}: no label named `{label}`")]
  InvalidLabel { line: usize, label: String },
  #[error("line {line}: `{operand}` is neither a number nor a variable")]
  InvalidValue { line: usize, operand: String },
  #[error("line {line}: {source}")]
  Encoding { line: usize, #[source] source: EncodingError },
}

impl AssemblerError {
  pub fn line(&self) -> usize {
    match self {
      | AssemblerError::InvalidVariableDefinition { line, .. }
      | AssemblerError::InvalidVariableName       { line, .. }
      | AssemblerError::InvalidLabelDefinition    { line, .. }
      | AssemblerError::InvalidExpressionsInLine  { line, .. }
      | AssemblerError::InvalidOperation          { line, .. }
      | AssemblerError::InvalidAddressingMode     { line, .. }
      | AssemblerError::InvalidLabel              { line, .. }
      | AssemblerError::InvalidValue              { line, .. }
      | AssemblerError::Encoding                  { line, .. } => *line
    }
  }
}


/// The result of a translation together with the symbol tables used to produce it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Assembly {
  pub words        : Vec<Word>,
  pub instructions : Vec<Instruction>,
  pub labels       : SymbolTable,
  pub variables    : SymbolTable,
}

impl Assembly {
  pub fn len(&self) -> usize {
    self.words.len()
  }

  pub fn is_empty(&self) -> bool {
    self.words.is_empty()
  }
}

impl Display for Assembly {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Index", ubr->"Word", ubl->"Instruction", ubl->"Label"]);

    for (index, (word, instruction)) in self.words.iter().zip(&self.instructions).enumerate() {
      let label = match self.labels.get_symbol(index as Word) {
        Some(name) => format!("@{}", name),
        None       => String::new()
      };
      table.add_row(row![r->index, r->word, instruction, label]);
    }

    for (name, address) in self.variables.entries() {
      table.add_row(row![r->address, r->"", format!("{} {}", DEFINE, name), ""]);
    }

    write!(f, "{}", table)
  }
}


/// Translates assembly into words of the standard layout, the only layout `Machine` decodes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Assembler;

impl Assembler {

  pub fn new() -> Assembler {
    Assembler
  }

  /// Translates `text` into the words of a program.
  pub fn assemble(&self, text: &str) -> Result<Vec<Word>, AssemblerError> {
    Ok(self.assemble_listing(text)?.words)
  }

  /// Translates `text`, keeping the decoded instructions and symbol tables alongside the words.
  pub fn assemble_listing(&self, text: &str) -> Result<Assembly, AssemblerError> {
    let lines: Vec<&str> = text.lines().collect();

    let labels = number_labelled_lines(&lines)?;
    let program_length = instruction_lines(&lines).count() as Word;
    let variables = variable_definitions(&lines, program_length)?;
    tracing::debug!(
      labels = labels.len(),
      variables = variables.len(),
      program_length,
      "resolved symbols"
    );

    let mut words        = Vec::with_capacity(program_length as usize);
    let mut instructions = Vec::with_capacity(program_length as usize);

    for (line_number, line) in instruction_lines(&lines) {
      let (_, body) = split_label(line_number, line)?;
      let tokens: Vec<&str> = body.split_whitespace().collect();

      let instruction = match tokens.as_slice() {

        [mnemonic] if *mnemonic == Operation::Halt.mnemonic() => Instruction::halt(),

        [mnemonic, operand] => {
          let operation =
            Operation::from_mnemonic(mnemonic)
              .ok_or_else(|| AssemblerError::InvalidOperation {
                line: line_number,
                mnemonic: mnemonic.to_string()
              })?;
          let (addressing_mode, value) =
            parse_operand(line_number, operand, &labels, &variables)?;
          Instruction::new(operation, addressing_mode, value)
        }

        _ => {
          return Err(AssemblerError::InvalidExpressionsInLine {
            line: line_number,
            text: line.to_string()
          });
        }

      };

      let word =
        instruction.encode()
                   .map_err(|source| AssemblerError::Encoding { line: line_number, source })?;
      tracing::trace!(line = line_number, word, "{}", instruction);

      words.push(word);
      instructions.push(instruction);
    }

    tracing::debug!(words = words.len(), "assembled program");
    Ok(Assembly {
      words,
      instructions,
      labels,
      variables
    })
  }

}

/// Translates `text` with the standard word layout.
pub fn assemble(text: &str) -> Result<Vec<Word>, AssemblerError> {
  Assembler::new().assemble(text)
}

// region Line classification

fn is_definition(line: &str) -> bool {
  line.trim_start().starts_with(DEFINE)
}

/// The lines that produce a word, paired with their 1-based line numbers.
fn instruction_lines<'a>(lines: &'a [&'a str]) -> impl Iterator<Item = (usize, &'a str)> + 'a {
  lines.iter()
       .enumerate()
       .map(|(index, line)| (index + 1, line.trim()))
       .filter(|(_, line)| !line.is_empty() && !is_definition(line))
}

/// `@name: ` at the start of a line, returning `(rest, name)`.
fn label_definition(input: &str) -> IResult<&str, &str> {
  terminated(
    preceded(one_char(LABEL_SIGIL), is_not(": \t")),
    pair(one_char(':'), space1)
  )(input)
}

/// Separates an optional label from the instruction it annotates.
fn split_label(line_number: usize, line: &str) -> Result<(Option<&str>, &str), AssemblerError> {
  if !line.starts_with(LABEL_SIGIL) {
    return Ok((None, line));
  }

  match label_definition(line) {
    Ok((body, name)) => Ok((Some(name), body)),
    Err(_)           => Err(AssemblerError::InvalidLabelDefinition {
      line: line_number,
      text: line.to_string()
    })
  }
}

// endregion

// region Symbol passes

/// Maps every label to the index of the instruction it annotates.
fn number_labelled_lines(lines: &[&str]) -> Result<SymbolTable, AssemblerError> {
  let mut labels = SymbolTable::new();

  for (index, (line_number, line)) in instruction_lines(lines).enumerate() {
    if let (Some(name), _) = split_label(line_number, line)? {
      labels.insert(name, index as Word)
            .map_err(|_| AssemblerError::InvalidLabelDefinition {
              line: line_number,
              text: line.to_string()
            })?;
    }
  }

  Ok(labels)
}

/// Allocates registers for the variables, in declaration order, just past the program.
fn variable_definitions(lines: &[&str], program_length: Word) -> Result<SymbolTable, AssemblerError> {
  let mut variables = SymbolTable::new();
  let mut next_address = program_length;

  for (index, line) in lines.iter().enumerate() {
    if !is_definition(line) {
      continue;
    }
    let line_number = index + 1;
    let invalid_definition = || AssemblerError::InvalidVariableDefinition {
      line: line_number,
      text: line.trim().to_string()
    };

    let name = match line.split_whitespace().collect::<Vec<&str>>().as_slice() {
      [DEFINE, name] => *name,
      _              => return Err(invalid_definition())
    };
    if !is_variable_name(name) {
      return Err(AssemblerError::InvalidVariableName { line: line_number, name: name.to_string() });
    }

    variables.insert(name, next_address).map_err(|_| invalid_definition())?;
    next_address += 1;
  }

  Ok(variables)
}

/// A variable name must not read as a number and must not contain assembly punctuation.
fn is_variable_name(name: &str) -> bool {
  !name.is_empty()
    && !name.starts_with(|c: char| c.is_ascii_digit())
    && !name.contains(|c: char| c == LABEL_SIGIL || c == '#' || c == ':')
}

// endregion

// region Operands

fn literal(input: &str) -> IResult<&str, Word> {
  all_consuming(map_res(digit1, |digits: &str| digits.parse::<Word>()))(input)
}

/**
  Resolves an operand to an addressing mode and value. A label reference is always immediate and
  its value is the index of the labelled instruction. Otherwise the operand is an addressing mode
  prefix followed by either a non-negative literal or a variable name.
*/
fn parse_operand(
  line_number : usize,
  operand     : &str,
  labels      : &SymbolTable,
  variables   : &SymbolTable
) -> Result<(AddressingMode, Word), AssemblerError> {

  if let Some(label) = operand.strip_prefix(LABEL_SIGIL) {
    let index =
      labels.get_address(label)
            .ok_or_else(|| AssemblerError::InvalidLabel {
              line: line_number,
              label: label.to_string()
            })?;
    return Ok((AddressingMode::Immediate, index));
  }

  let (addressing_mode, rest) =
    AddressingMode::split_operand(operand)
      .ok_or_else(|| AssemblerError::InvalidAddressingMode {
        line: line_number,
        operand: operand.to_string()
      })?;

  let value = match literal(rest) {
    Ok((_, value)) => value,
    Err(_)         => {
      variables.get_address(rest)
               .ok_or_else(|| AssemblerError::InvalidValue {
                 line: line_number,
                 operand: operand.to_string()
               })?
    }
  };

  Ok((addressing_mode, value))
}

// endregion


#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  const MULTIPLY: &str = "$define numA
$define numB
$define output
LDA RnumA
BZE @final
LDA RnumB
BZE @final
@loop: LDA Routput
ADD RnumA
STR #output
LDA RnumB
SUB #1
STR #numB
BZE @final
JMP @loop
@final: HLT
";

  fn word(operation: Operation, mode: AddressingMode, value: Word) -> Word {
    Instruction::new(operation, mode, value).encode().unwrap()
  }

  #[test]
  fn multiply_matches_hand_encoding() {
    use AddressingMode::*;
    use Operation::*;

    let expected = vec![
      word(Load,         Direct,    13),
      word(BranchIfZero, Immediate, 12),
      word(Load,         Direct,    14),
      word(BranchIfZero, Immediate, 12),
      word(Load,         Direct,    15),
      word(Add,          Direct,    13),
      word(Store,        Immediate, 15),
      word(Load,         Direct,    14),
      word(Subtract,     Immediate, 1),
      word(Store,        Immediate, 14),
      word(BranchIfZero, Immediate, 12),
      word(Jump,         Immediate, 4),
      word(Halt,         Immediate, 0),
    ];
    assert_eq!(assemble(MULTIPLY).unwrap(), expected);
  }

  #[test]
  fn symbol_tables() {
    let assembly = Assembler::new().assemble_listing(MULTIPLY).unwrap();
    assert_eq!(assembly.len(), 13);
    assert_eq!(assembly.labels.get_address("loop"), Some(4));
    assert_eq!(assembly.labels.get_address("final"), Some(12));
    assert_eq!(assembly.variables.get_address("numA"), Some(13));
    assert_eq!(assembly.variables.get_address("numB"), Some(14));
    assert_eq!(assembly.variables.get_address("output"), Some(15));
    assert_eq!(assembly.instructions[4].to_string(), "LDA R15");
  }

  #[test]
  fn word_count_skips_blank_and_definition_lines() {
    let text = "\n$define x\n\nLDA #1\n   \n$define y\nSTR Rx\n\nHLT\n\n";
    let words = assemble(text).unwrap();
    assert_eq!(words.len(), 3);
    // x and y live just past the three instructions.
    assert_eq!(words[1], word(Operation::Store, AddressingMode::Direct, 3));
  }

  #[test]
  fn labels_ignore_preceding_definitions() {
    let text = "$define a\n\n@start: LDA #0\n$define b\n@next: ADD Rb\n\nJMP @start\nBNZ @next\nHLT";
    let assembly = Assembler::new().assemble_listing(text).unwrap();
    assert_eq!(assembly.labels.get_address("start"), Some(0));
    assert_eq!(assembly.labels.get_address("next"), Some(1));
    assert_eq!(assembly.variables.get_address("a"), Some(5));
    assert_eq!(assembly.variables.get_address("b"), Some(6));
    assert_eq!(assembly.words[2], word(Operation::Jump, AddressingMode::Immediate, 0));
    assert_eq!(assembly.words[3], word(Operation::BranchIfNonZero, AddressingMode::Immediate, 1));
  }

  #[test]
  fn forward_references_resolve() {
    let words = assemble("JMP @end\nLDA #1\n@end: HLT").unwrap();
    assert_eq!(words[0], word(Operation::Jump, AddressingMode::Immediate, 2));
  }

  #[test]
  fn addressing_modes_and_literals() {
    let words = assemble("LDA #7\nLDA R7\nLDA RR7\nAND #65535\nNOT #0").unwrap();
    assert_eq!(
      words,
      vec![
        word(Operation::Load, AddressingMode::Immediate, 7),
        word(Operation::Load, AddressingMode::Direct,    7),
        word(Operation::Load, AddressingMode::Indirect,  7),
        word(Operation::And,  AddressingMode::Immediate, 65_535),
        word(Operation::Not,  AddressingMode::Immediate, 0),
      ]
    );
  }

  #[test]
  fn whitespace_and_crlf_are_tolerated() {
    let words = assemble("  LDA   #1\r\n\t@l:  ADD #2\r\nHLT\r\n").unwrap();
    assert_eq!(words.len(), 3);
  }

  #[test]
  fn unresolved_label() {
    assert_eq!(
      assemble("JMP @missing\nHLT"),
      Err(AssemblerError::InvalidLabel { line: 1, label: "missing".to_string() })
    );
  }

  #[test]
  fn label_definition_needs_separator() {
    let result = assemble("LDA #1\n@loop:LDA #2\nHLT");
    assert_eq!(
      result,
      Err(AssemblerError::InvalidLabelDefinition { line: 2, text: "@loop:LDA #2".to_string() })
    );
    assert!(matches!(assemble("@loop HLT"), Err(AssemblerError::InvalidLabelDefinition { .. })));
    assert!(matches!(assemble("@: HLT"), Err(AssemblerError::InvalidLabelDefinition { .. })));
  }

  #[test]
  fn duplicate_label() {
    let result = assemble("@a: LDA #1\n@a: HLT");
    assert!(matches!(result, Err(AssemblerError::InvalidLabelDefinition { line: 2, .. })));
  }

  #[test]
  fn variable_definition_faults() {
    assert!(matches!(
      assemble("$define\nHLT"),
      Err(AssemblerError::InvalidVariableDefinition { line: 1, .. })
    ));
    assert!(matches!(
      assemble("$define a b\nHLT"),
      Err(AssemblerError::InvalidVariableDefinition { line: 1, .. })
    ));
    assert!(matches!(
      assemble("$definex y\nHLT"),
      Err(AssemblerError::InvalidVariableDefinition { .. })
    ));
    assert!(matches!(
      assemble("$define a\n$define a\nHLT"),
      Err(AssemblerError::InvalidVariableDefinition { line: 2, .. })
    ));
    assert_eq!(
      assemble("$define 9lives\nHLT"),
      Err(AssemblerError::InvalidVariableName { line: 1, name: "9lives".to_string() })
    );
  }

  #[test]
  fn expression_faults() {
    assert!(matches!(assemble("NOT"), Err(AssemblerError::InvalidExpressionsInLine { line: 1, .. })));
    assert!(matches!(assemble("LDA #1 #2"), Err(AssemblerError::InvalidExpressionsInLine { .. })));
    assert_eq!(
      assemble("MOV #1"),
      Err(AssemblerError::InvalidOperation { line: 1, mnemonic: "MOV".to_string() })
    );
    assert_eq!(
      assemble("LDA 12"),
      Err(AssemblerError::InvalidAddressingMode { line: 1, operand: "12".to_string() })
    );
    assert_eq!(
      assemble("LDA Rnothing"),
      Err(AssemblerError::InvalidValue { line: 1, operand: "Rnothing".to_string() })
    );
    assert!(matches!(assemble("LDA #-1"), Err(AssemblerError::InvalidValue { .. })));
  }

  #[test]
  fn literal_overflow() {
    let result = assemble("HLT\nLDA #65536");
    assert_eq!(
      result,
      Err(AssemblerError::Encoding {
        line: 2,
        source: EncodingError::ValueOverflow { value: 65_536, limit: 65_536 }
      })
    );
    assert_eq!(result.unwrap_err().line(), 2);
  }

  #[test]
  fn label_faults_come_before_emission_faults() {
    let result = assemble("MOV #1\n@bad HLT");
    assert!(matches!(result, Err(AssemblerError::InvalidLabelDefinition { line: 2, .. })));
  }

  #[test]
  fn listing_shows_labels_and_variables() {
    let listing = Assembler::new().assemble_listing(MULTIPLY).unwrap().to_string();
    assert!(listing.contains("@loop"));
    assert!(listing.contains("@final"));
    assert!(listing.contains("$define output"));
    assert!(listing.contains("JMP #4"));
  }

}
