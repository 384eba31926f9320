use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::addressing::AddressingMode;
use super::binary::{Word, EncodingError, STANDARD_LAYOUT};

/**
  Opcodes of the machine.

  The discriminant of each variant is its opcode field in an encoded word. That numbering is part
  of the binary format, so the order the opcodes are listed below is significant and must never
  change. The text form of each variant is its three letter mnemonic.

  Note that `BNE` is "branch if negative", not "branch if not equal".
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq,  Debug,    Hash
)]
#[repr(u8)]
pub enum Operation {
  #[strum(serialize = "HLT")] Halt,              // 0
  #[strum(serialize = "LDA")] Load,              // acc = v
  #[strum(serialize = "STR")] Store,             // registers[v] = acc
  #[strum(serialize = "ADD")] Add,
  #[strum(serialize = "SUB")] Subtract,
  #[strum(serialize = "AND")] And,               // 5
  #[strum(serialize = "ORR")] Or,
  #[strum(serialize = "XOR")] Xor,
  #[strum(serialize = "NOT")] Not,               // Unary, ignores v
  #[strum(serialize = "LSL")] ShiftLeft,
  #[strum(serialize = "LSR")] ShiftRight,        // 10
  #[strum(serialize = "BZE")] BranchIfZero,
  #[strum(serialize = "BNE")] BranchIfNegative,
  #[strum(serialize = "BPO")] BranchIfPositive,
  #[strum(serialize = "BNZ")] BranchIfNonZero,
  #[strum(serialize = "JMP")] Jump,              // 15
}

impl Operation {

  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn mnemonic(&self) -> &'static str {
    self.into()
  }

  pub fn from_mnemonic(mnemonic: &str) -> Option<Operation> {
    mnemonic.parse::<Operation>().ok()
  }

  /// True for the operations whose value is an absolute instruction index.
  pub fn is_branch(&self) -> bool {
    matches!(
      self,
      Operation::BranchIfZero
      | Operation::BranchIfNegative
      | Operation::BranchIfPositive
      | Operation::BranchIfNonZero
      | Operation::Jump
    )
  }

}


/// Why a word failed to decode.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DecodeError {
  #[error("word {word} has no operation with opcode {opcode}")]
  InvalidOpcode { word: Word, opcode: Word },
  #[error("word {word} has no addressing mode with code {mode}")]
  InvalidAddressingMode { word: Word, mode: Word },
  #[error("negative word {0} is not an instruction")]
  NegativeWord(Word),
}


/// The unencoded components of an instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
  pub operation       : Operation,
  pub addressing_mode : AddressingMode,
  pub value           : Word,
}

impl Instruction {

  pub fn new(operation: Operation, addressing_mode: AddressingMode, value: Word) -> Instruction {
    Instruction {
      operation,
      addressing_mode,
      value
    }
  }

  pub fn halt() -> Instruction {
    Instruction::new(Operation::Halt, AddressingMode::Immediate, 0)
  }

  /// Encodes the instruction with the standard word layout.
  pub fn encode(&self) -> Result<Word, EncodingError> {
    STANDARD_LAYOUT.encode(self.operation.code(), self.addressing_mode.code(), self.value)
  }

  /// Decodes a word produced with the standard word layout.
  pub fn decode(word: Word) -> Result<Instruction, DecodeError> {
    if word < 0 {
      return Err(DecodeError::NegativeWord(word));
    }

    let opcode = STANDARD_LAYOUT.extract_opcode(word);
    let mode   = STANDARD_LAYOUT.extract_mode(word);
    let value  = STANDARD_LAYOUT.extract_value(word);

    let operation =
      u8::try_from(opcode)
        .ok()
        .and_then(|code| Operation::try_from(code).ok())
        .ok_or(DecodeError::InvalidOpcode { word, opcode })?;

    let addressing_mode =
      u8::try_from(mode)
        .ok()
        .and_then(|code| AddressingMode::try_from(code).ok())
        .ok_or(DecodeError::InvalidAddressingMode { word, mode })?;

    Ok(Instruction::new(operation, addressing_mode, value))
  }

}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match (self.operation, self.addressing_mode, self.value) {

      (Operation::Halt, AddressingMode::Immediate, 0) => {
        write!(f, "{}", self.operation)
      }

      (operation, mode, value) => {
        write!(f, "{} {}{}", operation, mode, value)
      }

    }
  }
}

/// Decodes every word of a program.
pub fn disassemble(words: &[Word]) -> Result<Vec<Instruction>, DecodeError> {
  words.iter()
       .map(|word| Instruction::decode(*word))
       .collect()
}
