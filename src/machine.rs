/*!
  The Random-Access Stored-Program machine.

  The machine has a single accumulator, a program counter, and one flat array of registers that
  holds both the program and its data. There is no separate code segment: a program is loaded
  into the low registers, and its variables live in the registers just past it. Each step fetches
  the word at `registers[pc]`, advances `pc`, decodes the word, resolves its operand through the
  addressing mode, and applies the operation. A taken branch overwrites the advanced `pc` with an
  absolute instruction index.

  Once `HLT` executes the machine is completed for good; stepping a completed machine does
  nothing.
*/

use std::fmt::{Display, Formatter};

use prettytable::{row, table};
use thiserror::Error;

use crate::addressing::AddressingMode;
use crate::bytecode::{DecodeError, Instruction, Operation, Word};
use crate::table::{make_register_table, TABLE_DISPLAY_FORMAT};

pub const DEFAULT_REGISTER_COUNT: usize = 1024;

/// Faults raised while running a program. A correctly assembled program only raises these by
/// addressing outside of the register file.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum MachineError {
  #[error("unable to decode the instruction at address {address}: {source}")]
  Decode { address: usize, #[source] source: DecodeError },
  #[error("program counter {pc} is outside of memory ({size} registers)")]
  ProgramCounterOutOfBounds { pc: Word, size: usize },
  #[error("register address {address} is outside of memory ({size} registers)")]
  AddressOutOfBounds { address: Word, size: usize },
  #[error("machine did not halt within {0} steps")]
  StepLimitExceeded(u64),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Machine {

  // Memory store, holding both the program and its data.
  registers      : Vec<Word>,

  // Registers //
  pc             : Word, // Index of the next instruction
  acc            : Word, // Accumulator

  // Flags
  completed      : bool, // Set by `HLT`, never cleared

  // Bookkeeping
  steps          : u64,
  program_length : usize,
}

impl Machine {

  // region Construction

  /// A machine with `num_registers` zeroed registers and no program.
  pub fn new(num_registers: usize) -> Machine {
    Machine::with_registers(&[], num_registers)
  }

  /// A machine whose registers start with `registers`, padded with zeros to `num_registers`.
  pub fn with_registers(registers: &[Word], num_registers: usize) -> Machine {
    let mut memory = registers.to_vec();
    if memory.len() < num_registers {
      memory.resize(num_registers, 0);
    }

    Machine {
      registers      : memory,
      pc             : 0,
      acc            : 0,
      completed      : false,
      steps          : 0,
      program_length : 0,
    }
  }

  /**
    Loads `program` into the low registers, followed by `initial_registers` and then
    `blank_registers` zeroed registers. Variables declared in assembly are allocated right after
    the program, so `initial_registers` seeds them in declaration order.
  */
  pub fn with_program(program: &[Word], initial_registers: &[Word], blank_registers: usize) -> Machine {
    let mut memory = Vec::with_capacity(program.len() + initial_registers.len() + blank_registers);
    memory.extend_from_slice(program);
    memory.extend_from_slice(initial_registers);
    memory.resize(memory.len() + blank_registers, 0);

    let mut machine = Machine::with_registers(&memory, 0);
    machine.program_length = program.len();
    machine
  }

  pub fn set_register(&mut self, register: usize, value: Word) -> Result<(), MachineError> {
    let size = self.registers.len();
    match self.registers.get_mut(register) {
      Some(cell) => {
        *cell = value;
        Ok(())
      }
      None       => Err(MachineError::AddressOutOfBounds { address: register as Word, size })
    }
  }

  // endregion

  // region Accessors

  pub fn registers(&self) -> &[Word] {
    &self.registers
  }

  pub fn pc(&self) -> Word {
    self.pc
  }

  pub fn acc(&self) -> Word {
    self.acc
  }

  pub fn completed(&self) -> bool {
    self.completed
  }

  /// The number of instructions executed so far.
  pub fn steps(&self) -> u64 {
    self.steps
  }

  pub fn program_length(&self) -> usize {
    self.program_length
  }

  // endregion

  // region Execution

  /// Runs until `HLT`. A program that never halts never returns; see `run_with_limit`.
  pub fn run(&mut self) -> Result<(), MachineError> {
    tracing::debug!(pc = self.pc, registers = self.registers.len(), "running");
    while !self.completed {
      self.step()?;
    }
    tracing::debug!(steps = self.steps, acc = self.acc, "halted");
    Ok(())
  }

  /// Runs until `HLT` or until `max_steps` more instructions have executed, whichever is first.
  pub fn run_with_limit(&mut self, max_steps: u64) -> Result<(), MachineError> {
    tracing::debug!(pc = self.pc, max_steps, "running with a step limit");
    let mut executed = 0u64;
    while !self.completed {
      if executed == max_steps {
        tracing::debug!(steps = self.steps, "step limit reached");
        return Err(MachineError::StepLimitExceeded(max_steps));
      }
      self.step()?;
      executed += 1;
    }
    tracing::debug!(steps = self.steps, acc = self.acc, "halted");
    Ok(())
  }

  /// Fetches, decodes, and executes the instruction at `pc`.
  pub fn step(&mut self) -> Result<(), MachineError> {
    if self.completed {
      return Ok(());
    }

    let address = self.index(self.pc)
                      .map_err(|_| MachineError::ProgramCounterOutOfBounds {
                        pc: self.pc,
                        size: self.registers.len()
                      })?;
    let word = self.registers[address];

    // The increment comes first so that a taken branch replaces it.
    self.pc += 1;

    let instruction = Instruction::decode(word)
                        .map_err(|source| MachineError::Decode { address, source })?;
    let value = self.resolve(instruction.addressing_mode, instruction.value)?;

    tracing::trace!(address, acc = self.acc, value, "{}", instruction);

    match instruction.operation {
      Operation::Halt             => self.completed = true,
      Operation::Load             => self.acc = value,
      Operation::Store            => {
        let target = self.index(value)?;
        self.registers[target] = self.acc;
      }
      Operation::Add              => self.acc = self.acc.wrapping_add(value),
      Operation::Subtract         => self.acc = self.acc.wrapping_sub(value),
      Operation::And              => self.acc &= value,
      Operation::Or               => self.acc |= value,
      Operation::Xor              => self.acc ^= value,
      Operation::Not              => self.acc = !self.acc,
      Operation::ShiftLeft        => self.acc = shift_left(self.acc, value),
      Operation::ShiftRight       => self.acc = shift_right(self.acc, value),
      Operation::BranchIfZero     => self.branch_if(self.acc == 0, value),
      Operation::BranchIfNegative => self.branch_if(self.acc < 0, value),
      Operation::BranchIfPositive => self.branch_if(self.acc > 0, value),
      Operation::BranchIfNonZero  => self.branch_if(self.acc != 0, value),
      Operation::Jump             => self.pc = value,
    }

    self.steps += 1;

    #[cfg(feature = "trace_computation")] println!("{}", self);

    Ok(())
  }

  fn branch_if(&mut self, condition: bool, target: Word) {
    if condition {
      self.pc = target;
    }
  }

  /// Converts a register address to an index into `registers`.
  fn index(&self, address: Word) -> Result<usize, MachineError> {
    usize::try_from(address)
      .ok()
      .filter(|index| *index < self.registers.len())
      .ok_or(MachineError::AddressOutOfBounds { address, size: self.registers.len() })
  }

  /// The effective operand of an instruction.
  fn resolve(&self, addressing_mode: AddressingMode, value: Word) -> Result<Word, MachineError> {
    match addressing_mode {
      AddressingMode::Immediate => Ok(value),
      AddressingMode::Direct    => Ok(self.registers[self.index(value)?]),
      AddressingMode::Indirect  => {
        let pointer = self.registers[self.index(value)?];
        Ok(self.registers[self.index(pointer)?])
      }
    }
  }

  // endregion

  /// How many registers the state table shows: the program, anything nonzero, and `pc`.
  fn visible_registers(&self) -> usize {
    let last_used = self.registers
                        .iter()
                        .rposition(|word| *word != 0)
                        .map_or(0, |i| i + 1);
    let pc = usize::try_from(self.pc).map_or(0, |pc| pc + 1);

    self.program_length
        .max(last_used)
        .max(pc)
        .min(self.registers.len())
  }

}

impl Default for Machine {
  fn default() -> Self {
    Machine::new(DEFAULT_REGISTER_COUNT)
  }
}

// region Shifts

/// Shifting by the word width or more leaves nothing; a negative amount shifts the other way.
fn shift_left(acc: Word, amount: Word) -> Word {
  match amount < 0 {
    true  => shift_right_by(acc, amount.unsigned_abs()),
    false => shift_left_by(acc, amount as u64)
  }
}

/// Right shifts are arithmetic, so shifting everything out leaves the sign.
fn shift_right(acc: Word, amount: Word) -> Word {
  match amount < 0 {
    true  => shift_left_by(acc, amount.unsigned_abs()),
    false => shift_right_by(acc, amount as u64)
  }
}

fn shift_left_by(acc: Word, amount: u64) -> Word {
  match amount < Word::BITS as u64 {
    true  => acc << amount,
    false => 0
  }
}

fn shift_right_by(acc: Word, amount: u64) -> Word {
  match amount < Word::BITS as u64 {
    true  => acc >> amount,
    false => if acc < 0 { -1 } else { 0 }
  }
}

// endregion

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let shown     = &self.registers[..self.visible_registers()];
    let highlight = usize::try_from(self.pc).ok();
    let notes     = |i: usize| {
      match i < self.program_length {
        true  => Instruction::decode(self.registers[i])
                   .map_or_else(|_| "?".to_string(), |instruction| instruction.to_string()),
        false => String::new()
      }
    };

    let r_table = make_register_table('R', shown, notes, highlight);
    let mut combined_table = table!([r_table]);

    combined_table.set_titles(row![ub->"Registers"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    let status = match self.completed {
      true  => "Halted.",
      false => "Running."
    };

    write!(f, "PC: {}\tACC: {}\t{}\n{}", self.pc, self.acc, status, combined_table)
  }
}
