use bimap::BiMap;
use string_cache::DefaultAtom;

use crate::bytecode::Word;

/**
  A symbol table maps names to addresses. The assembler keeps two of them: labels, which map to
  the index of the instruction they annotate, and variables, which map to the register allocated
  for them after the end of the program. A symbol table is really just a convenience wrapper
  around a BiMap, so the reverse lookup (which name, if any, lives at an address) is as cheap as
  the forward one.
*/
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SymbolTable{
  table: BiMap<DefaultAtom, Word>
}

impl SymbolTable{

  pub fn new() -> SymbolTable {
    SymbolTable{
      table: BiMap::new()
    }
  }

  pub fn get_symbol(&self, address: Word) -> Option<&DefaultAtom>{
    self.table.get_by_right(&address)
  }

  pub fn get_address(&self, name: &str) -> Option<Word>{
    self.table.get_by_left(&DefaultAtom::from(name)).copied()
  }

  /// Refuses to replace an existing name or address, returning the rejected pair.
  pub fn insert(&mut self, name: &str, address: Word) -> Result<(), (DefaultAtom, Word)>{
    self.table.insert_no_overwrite(DefaultAtom::from(name), address)
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }

  /// The symbols ordered by address.
  pub fn entries(&self) -> Vec<(&DefaultAtom, Word)> {
    let mut entries: Vec<(&DefaultAtom, Word)> =
      self.table.iter().map(|(name, address)| (name, *address)).collect();
    entries.sort_by_key(|(_, address)| *address);
    entries
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lookups_both_ways() {
    let mut table = SymbolTable::new();
    assert!(table.is_empty());
    table.insert("loop", 4).unwrap();
    table.insert("final", 12).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.get_address("loop"), Some(4));
    assert_eq!(table.get_address("missing"), None);
    assert_eq!(table.get_symbol(12).map(|name| name.to_string()), Some("final".to_string()));
    assert_eq!(table.get_symbol(5), None);
  }

  #[test]
  fn no_overwrite() {
    let mut table = SymbolTable::new();
    table.insert("numA", 13).unwrap();
    assert!(table.insert("numA", 14).is_err());
    assert!(table.insert("numB", 13).is_err());
    assert_eq!(table.get_address("numA"), Some(13));
  }

  #[test]
  fn entries_in_address_order() {
    let mut table = SymbolTable::new();
    table.insert("output", 15).unwrap();
    table.insert("numA", 13).unwrap();
    table.insert("numB", 14).unwrap();
    let names: Vec<String> = table.entries().iter().map(|(name, _)| name.to_string()).collect();
    assert_eq!(names, vec!["numA", "numB", "output"]);
  }
}
