/*!

  Every instruction is a single word. An instruction has three components:

    Opcode:           4 bits
    Addressing mode:  2 bits
    Value:           16 bits

  packed positionally (see `binary`), so an encoded instruction is a non-negative integer below
  2^22. The value is a literal, a register address, or an instruction index, depending on the
  addressing mode and the operation. Branch targets are always immediate, absolute instruction
  indices.

  Labels and variable names do not appear in the bytecode. They are symbolic names resolved by
  the assembler to instruction indices and register addresses respectively.

*/

mod binary;
mod instruction;
mod assembly;

pub use binary::{Word, WordLayout, EncodingError, STANDARD_LAYOUT};
pub use instruction::{disassemble, DecodeError, Instruction, Operation};
pub use assembly::{assemble, Assembler, AssemblerError, Assembly};
