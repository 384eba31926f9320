//! Table formatting shared by the machine state dump and the assembly listing.

use lazy_static::lazy_static;
use prettytable::{format as TableFormat, row, Table};

lazy_static! {
  pub static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

/**
  Builds a three column table of `name[address] = contents` rows with an optional annotation per
  row. The row at `highlight` gets an arrow.
*/
pub fn make_register_table<T, A>(
    name      : char,
    registers : &[T],
    notes     : A,
    highlight : Option<usize>
  ) -> Table
  where T: std::fmt::Display,
        A: Fn(usize) -> String
{
  let mut table = Table::new();

  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![ubr->"Address", ubl->"Contents", ubl->"Instruction"]);

  for (i, cell) in registers.iter().enumerate() {
    match highlight == Some(i) {

      true  => {
        table.add_row(
          row![r->format!("* --> {}[{}] =", name, i), cell, notes(i)]
        );
      }

      false => {
        table.add_row(
          row![r->format!("{}[{}] =", name, i), cell, notes(i)]
        );
      }

    } // end match on highlight
  } // end for
  table
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn highlighted_row() {
    let table = make_register_table('R', &[10, 20, 30], |i| format!("note {}", i), Some(1));
    let text = table.to_string();
    assert!(text.contains("* --> R[1] ="));
    assert!(text.contains("R[2] ="));
    assert!(text.contains("note 0"));
    assert!(!text.contains("* --> R[0]"));
  }
}
