//! # Symbol Table
//!
//! Maps names to data addresses. Addresses are handed out monotonically
//! from the data base in first-reference order and are never reused. Integer
//! literals are pooled under reserved `_const_<literal>` names so every
//! occurrence of a literal shares one cell.

use crate::error::{CompileError, CompileResult};

use rustc_hash::FxHashMap;

/// Name of the synthetic zero constant.
pub const ZERO: &str = "_zero";
/// Name of the synthetic one constant.
pub const ONE: &str = "_one";
/// Name of the synthetic minus-one constant (255 in 8 bits).
pub const NEG_ONE: &str = "_neg_one";

const CONST_PREFIX: &str = "_const_";

/// Reserved name under which `literal` is pooled.
pub fn constant_name(literal: i64) -> String {
    format!("{CONST_PREFIX}{literal}")
}

/// Whether `name` belongs to the compiler: a synthetic constant or a pooled
/// literal. Source programs may not assign to these.
pub fn is_reserved(name: &str) -> bool {
    matches!(name, ZERO | ONE | NEG_ONE) || name.starts_with(CONST_PREFIX)
}

/// Truncates a literal to the machine's 8-bit two's-complement byte.
#[inline]
pub fn to_byte(literal: i64) -> u8 {
    literal as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A user variable, declared by assignment or by reference.
    Variable,
    /// A pooled literal or one of the synthetic arithmetic constants.
    Constant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub address: u16,
    /// Initial byte written to the data section.
    pub value: u8,
    /// Whether `value` is authoritative. Only the first initialized
    /// declaration sets it.
    pub initialized: bool,
    pub kind: SymbolKind,
}

#[derive(Debug)]
pub struct SymbolTable {
    entries: Vec<Symbol>,
    index: FxHashMap<String, usize>,
    next_address: u16,
    limit: u16,
}

impl SymbolTable {
    /// Creates an empty table allocating from `base` up to, but excluding,
    /// `limit`.
    pub fn new(base: u16, limit: u16) -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
            next_address: base,
            limit,
        }
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<u16> {
        self.get(name).map(|symbol| symbol.address)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&idx| &self.entries[idx])
    }

    /// Declares a variable, or updates an existing entry.
    ///
    /// An existing entry only takes `value` when it was uninitialized and
    /// this declaration is initialized; otherwise it is left untouched. The
    /// returned address is stable for the lifetime of the table.
    pub fn declare(&mut self, name: &str, value: u8, initialized: bool) -> CompileResult<u16> {
        self.insert(name, value, initialized, SymbolKind::Variable)
    }

    /// Declares a named constant such as [`ZERO`].
    pub fn declare_constant(&mut self, name: &str, value: u8) -> CompileResult<u16> {
        self.insert(name, value, true, SymbolKind::Constant)
    }

    /// Returns the cell holding `literal`, allocating it on first use.
    pub fn pool_constant(&mut self, literal: i64) -> CompileResult<u16> {
        let name = constant_name(literal);
        self.insert(&name, to_byte(literal), true, SymbolKind::Constant)
    }

    fn insert(
        &mut self,
        name: &str,
        value: u8,
        initialized: bool,
        kind: SymbolKind,
    ) -> CompileResult<u16> {
        if let Some(&idx) = self.index.get(name) {
            let entry = &mut self.entries[idx];
            if !entry.initialized && initialized {
                entry.value = value;
                entry.initialized = true;
            }
            return Ok(entry.address);
        }

        if self.next_address >= self.limit {
            return Err(CompileError::capacity(format!(
                "variable table full: no data address left for '{name}'"
            )));
        }

        let address = self.next_address;
        self.next_address += 1;
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(Symbol {
            name: name.to_string(),
            address,
            value,
            initialized,
            kind,
        });
        Ok(address)
    }

    /// All entries in declaration order, which is also address order.
    pub fn entries(&self) -> &[Symbol] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<Symbol> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_follow_first_reference_order() {
        let mut table = SymbolTable::new(0x80, 0xC8);
        assert_eq!(table.declare("b", 0, false), Ok(0x80));
        assert_eq!(table.declare("a", 0, false), Ok(0x81));
        assert_eq!(table.declare("b", 0, true), Ok(0x80));
        assert_eq!(table.find("a"), Some(0x81));
        assert_eq!(table.find("c"), None);
    }

    #[test]
    fn first_initialized_write_wins() {
        let mut table = SymbolTable::new(0x80, 0xC8);
        table.declare("x", 0, false).unwrap();
        table.declare("x", 7, true).unwrap();
        table.declare("x", 9, true).unwrap();
        let x = table.get("x").unwrap();
        assert_eq!(x.value, 7);
        assert!(x.initialized);
    }

    #[test]
    fn initialized_entry_ignores_uninitialized_redeclaration() {
        let mut table = SymbolTable::new(0x80, 0xC8);
        table.declare("x", 3, true).unwrap();
        table.declare("x", 0, false).unwrap();
        assert_eq!(table.get("x").unwrap().value, 3);
    }

    #[test]
    fn literals_are_pooled() {
        let mut table = SymbolTable::new(0x80, 0xC8);
        let a = table.pool_constant(5).unwrap();
        let b = table.pool_constant(5).unwrap();
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
        assert_eq!(table.entries()[0].name, "_const_5");
        assert_eq!(table.entries()[0].kind, SymbolKind::Constant);
    }

    #[test]
    fn negative_literals_use_twos_complement_bytes() {
        let mut table = SymbolTable::new(0x80, 0xC8);
        table.pool_constant(-5).unwrap();
        table.pool_constant(256).unwrap();
        let values: Vec<(&str, u8)> = table
            .entries()
            .iter()
            .map(|s| (s.name.as_str(), s.value))
            .collect();
        assert_eq!(values, vec![("_const_-5", 0xFB), ("_const_256", 0x00)]);
    }

    #[test]
    fn reserved_names() {
        assert!(is_reserved(ZERO));
        assert!(is_reserved(NEG_ONE));
        assert!(is_reserved(&constant_name(-3)));
        assert!(!is_reserved("_zeroish"));
        assert!(!is_reserved("x"));
    }

    #[test]
    fn full_table_reports_capacity_error() {
        let mut table = SymbolTable::new(0x80, 0x82);
        table.declare("a", 0, false).unwrap();
        table.declare("b", 0, false).unwrap();
        let err = table.declare("c", 0, false).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Capacity);
        // Existing names still resolve once the table is full.
        assert_eq!(table.declare("a", 1, true), Ok(0x80));
    }
}
