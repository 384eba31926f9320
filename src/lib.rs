/*!
  A Random-Access Stored-Program (RASP) machine and its assembler.

  The machine is a single accumulator computer whose program and data share one flat array of
  registers. Despite an instruction set of sixteen operations, indirect addressing makes it a
  complete stored-program computer.

  ```
  use rasp::{assemble, Machine};

  let words = assemble("$define x\nLDA Rx\nADD #2\nSTR #x\nHLT").unwrap();
  let mut machine = Machine::with_program(&words, &[40], 0);
  machine.run().unwrap();
  assert_eq!(machine.registers()[4], 42);
  ```
*/

pub mod addressing;
pub mod bytecode;
pub mod machine;
pub mod symboltable;
mod table;

pub use addressing::AddressingMode;
pub use bytecode::{
  assemble, disassemble, Assembler, AssemblerError, Assembly, DecodeError, EncodingError,
  Instruction, Operation, Word, WordLayout, STANDARD_LAYOUT
};
pub use machine::{Machine, MachineError, DEFAULT_REGISTER_COUNT};
pub use symboltable::SymbolTable;
