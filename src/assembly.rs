//! # Assembly Output
//!
//! Textual form of a compiled program: a `.DATA` section with one
//! `address value` pair per symbol, then a `.CODE` section with one
//! instruction per line. Numbers are uppercase hex with a `0x` prefix and no
//! padding.

use std::fmt;

use crate::opcode::Instruction;
use crate::symbol::{Symbol, SymbolKind};

/// A finished program: initial data and the instruction stream, which
/// always ends in `HLT`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// Symbols in address order.
    pub data: Vec<Symbol>,
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.data.iter().find(|symbol| symbol.name == name)
    }

    pub fn address_of(&self, name: &str) -> Option<u16> {
        self.symbol(name).map(|symbol| symbol.address)
    }

    /// User variables, skipping pooled literals and synthetic constants.
    pub fn variables(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.data
            .iter()
            .filter(|symbol| symbol.kind == SymbolKind::Variable)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ".DATA")?;
        for symbol in &self.data {
            writeln!(f, "0x{:X} 0x{:X}", symbol.address, symbol.value)?;
        }
        writeln!(f, ".CODE")?;
        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}

/// Serializes `program` to its assembly listing.
pub fn render(program: &Program) -> String {
    program.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;

    fn symbol(name: &str, address: u16, value: u8, kind: SymbolKind) -> Symbol {
        Symbol {
            name: name.to_string(),
            address,
            value,
            initialized: true,
            kind,
        }
    }

    #[test]
    fn renders_both_sections() {
        let program = Program {
            data: vec![
                symbol("_zero", 0x80, 0, SymbolKind::Constant),
                symbol("_neg_one", 0x82, 255, SymbolKind::Constant),
                symbol("x", 0x83, 0, SymbolKind::Variable),
            ],
            instructions: vec![
                Instruction {
                    opcode: Opcode::Lda,
                    operand: Some(0x82),
                    position: 0,
                },
                Instruction {
                    opcode: Opcode::Not,
                    operand: None,
                    position: 1,
                },
                Instruction {
                    opcode: Opcode::Jz,
                    operand: Some(0x1A),
                    position: 2,
                },
                Instruction {
                    opcode: Opcode::Hlt,
                    operand: None,
                    position: 3,
                },
            ],
        };

        assert_eq!(
            render(&program),
            ".DATA\n0x80 0x0\n0x82 0xFF\n0x83 0x0\n.CODE\nLDA 0x82\nNOT\nJZ 0x1A\nHLT\n"
        );
    }

    #[test]
    fn empty_program_still_has_section_headers() {
        assert_eq!(render(&Program::default()), ".DATA\n.CODE\n");
    }

    #[test]
    fn variables_skip_constants() {
        let program = Program {
            data: vec![
                symbol("_one", 0x81, 1, SymbolKind::Constant),
                symbol("y", 0x83, 0, SymbolKind::Variable),
                symbol("_const_4", 0x84, 4, SymbolKind::Constant),
            ],
            instructions: Vec::new(),
        };
        let names: Vec<&str> = program.variables().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["y"]);
        assert_eq!(program.address_of("_const_4"), Some(0x84));
        assert_eq!(program.address_of("z"), None);
    }
}
