//! How an instruction's value field is interpreted: as a literal, as a register address, or as
//! the address of a register holding a register address.

use nom::{branch::alt, bytes::complete::tag, combinator::value, IResult};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

/**
  Addressing modes, ordered by depth of indirection. The numeric code of each mode is its field
  value in an encoded word, so the order below is significant.

  The text form of a mode is its assembly prefix, so `Display`/`FromStr` round-trip through
  `#`, `R`, and `RR`.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq, Ord, PartialOrd,   Debug,            Hash
)]
#[repr(u8)]
pub enum AddressingMode {
  /// `#n`: the value itself.
  #[strum(serialize = "#")]
  Immediate,
  /// `Rn`: the contents of register `n`.
  #[strum(serialize = "R")]
  Direct,
  /// `RRn`: the contents of the register whose address is in register `n`.
  #[strum(serialize = "RR")]
  Indirect,
}

impl AddressingMode {

  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn prefix(&self) -> &'static str {
    self.into()
  }

  /// The next mode down the chain of indirection, if any.
  pub fn more_indirect(&self) -> Option<AddressingMode> {
    AddressingMode::try_from(self.code() + 1).ok()
  }

  /// The next mode up the chain of indirection, if any.
  pub fn more_direct(&self) -> Option<AddressingMode> {
    self.code()
        .checked_sub(1)
        .and_then(|code| AddressingMode::try_from(code).ok())
  }

  /// Parses the mode prefix off the front of an operand token such as `RRx` or `#12`.
  pub fn from_address(token: &str) -> Option<AddressingMode> {
    AddressingMode::split_operand(token).map(|(mode, _)| mode)
  }

  /// Like `from_address`, but also returns the part of the token after the prefix.
  pub fn split_operand(token: &str) -> Option<(AddressingMode, &str)> {
    match mode_prefix(token) {
      Ok((rest, mode)) => Some((mode, rest)),
      Err(_)           => None
    }
  }

}

// `RR` must be tried before `R`.
fn mode_prefix(input: &str) -> IResult<&str, AddressingMode> {
  alt((
    value(AddressingMode::Immediate, tag("#")),
    value(AddressingMode::Indirect,  tag("RR")),
    value(AddressingMode::Direct,    tag("R")),
  ))(input)
}
