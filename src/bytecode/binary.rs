/*!
  This module is responsible for the encoding and decoding of binary instructions.

  A word is packed positionally rather than with shifts and masks, so that the layout reads the
  same for any field widths:

    word = opcode * 2^(V+A) + mode * 2^V + value

  where `A` is the width of the addressing mode field and `V` the width of the value field. With
  the standard layout that is

    Opcode:          4 bits
    Addressing mode: 2 bits
    Value:          16 bits

  Extraction uses truncating division, so decoding always yields three integers. Whether those
  integers name a real operation and addressing mode is decided one layer up, in
  `Instruction::decode`.
*/

use thiserror::Error;

/// The machine word. Registers, the accumulator, and encoded instructions are all words.
pub type Word = i64;

/// Raised when an instruction cannot be packed into a word.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EncodingError {
  #[error("value overflow: {value} does not fit in the value field (limit {limit})")]
  ValueOverflow { value: Word, limit: Word },
  #[error("negative value {0} cannot be encoded")]
  NegativeValue(Word),
}

/// Field widths of a machine word. `STANDARD_LAYOUT` is the only layout the machine decodes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct WordLayout {
  opcode_bits : u32,
  mode_bits   : u32,
  value_bits  : u32,
}

/// The standard layout. Changing it breaks every externally produced instruction stream.
pub const STANDARD_LAYOUT: WordLayout = WordLayout::new(4, 2, 16);

// An encoded word must stay a non-negative `Word`.
const _: () = assert!(STANDARD_LAYOUT.total_bits() < Word::BITS - 1);

impl WordLayout {

  const fn new(opcode_bits: u32, mode_bits: u32, value_bits: u32) -> WordLayout {
    WordLayout {
      opcode_bits,
      mode_bits,
      value_bits
    }
  }

  pub const fn opcode_bits(&self) -> u32 {
    self.opcode_bits
  }

  pub const fn mode_bits(&self) -> u32 {
    self.mode_bits
  }

  pub const fn value_bits(&self) -> u32 {
    self.value_bits
  }

  pub const fn total_bits(&self) -> u32 {
    self.opcode_bits + self.mode_bits + self.value_bits
  }

  /// `2^(V+A)`, the place value of the opcode field.
  pub const fn opcode_multiplier(&self) -> Word {
    1 << (self.value_bits + self.mode_bits)
  }

  /// `2^V`, the place value of the addressing mode field.
  pub const fn mode_multiplier(&self) -> Word {
    1 << self.value_bits
  }

  /// The exclusive upper bound of the value field.
  pub const fn value_limit(&self) -> Word {
    self.mode_multiplier()
  }

  /// The exclusive upper bound of an encoded word.
  pub const fn word_limit(&self) -> Word {
    1 << self.total_bits()
  }

  /**
    Packs the three fields into a word. The caller is responsible for passing an opcode and
    mode that fit their fields, which is always true for codes taken from `Operation` and
    `AddressingMode`. The value is checked, and an out of range value is an error rather than
    being truncated.
  */
  pub fn encode(&self, opcode: u8, mode: u8, value: Word) -> Result<Word, EncodingError> {
    debug_assert!((opcode as u32) < (1 << self.opcode_bits));
    debug_assert!((mode as u32) < (1 << self.mode_bits));

    if value < 0 {
      return Err(EncodingError::NegativeValue(value));
    }
    if value >= self.value_limit() {
      return Err(EncodingError::ValueOverflow { value, limit: self.value_limit() });
    }

    Ok(
      (opcode as Word) * self.opcode_multiplier() +
      (mode   as Word) * self.mode_multiplier()   +
      value
    )
  }

  pub fn extract_opcode(&self, word: Word) -> Word {
    word / self.opcode_multiplier()
  }

  pub fn extract_mode(&self, word: Word) -> Word {
    (word % self.opcode_multiplier()) / self.mode_multiplier()
  }

  pub fn extract_value(&self, word: Word) -> Word {
    word % self.mode_multiplier()
  }

}
