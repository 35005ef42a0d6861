//! Compiler configuration: region markers, address-space layout and
//! capacity bounds.

use crate::error::{CompileError, CompileResult};
use crate::opcode::MAX_ADDRESSABLE;

/// Default first address of named variables and constants.
pub const DATA_BASE: u16 = 0x80;
/// Default first scratch address. Named data must stay below it.
pub const TEMP_BASE: u16 = 0xC8;
/// Size of the Neander address space.
pub const MEMORY_SIZE: u16 = 0x100;
/// Default bound on generated instructions (the final `HLT` excluded).
pub const MAX_INSTRUCTIONS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Line that opens the compiled region.
    pub start_marker: String,
    /// Line that closes the compiled region.
    pub end_marker: String,
    /// First address handed out to variables and constants.
    pub data_base: u16,
    /// First scratch address. Also the exclusive end of the data region.
    pub temp_base: u16,
    /// Exclusive end of the scratch region.
    pub memory_size: u16,
    pub max_instructions: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            start_marker: "INICIO".to_string(),
            end_marker: "FIM".to_string(),
            data_base: DATA_BASE,
            temp_base: TEMP_BASE,
            memory_size: MEMORY_SIZE,
            max_instructions: MAX_INSTRUCTIONS,
        }
    }
}

impl CompilerConfig {
    /// Checks that markers are usable, that the two address regions are
    /// ordered inside the machine's memory, and that every instruction index
    /// has a 16-bit byte offset.
    pub fn validate(&self) -> CompileResult<()> {
        if self.start_marker.trim().is_empty() || self.end_marker.trim().is_empty() {
            return Err(CompileError::structural_no_span(
                "region markers must not be empty",
            ));
        }
        if self.start_marker == self.end_marker {
            return Err(CompileError::structural_no_span(format!(
                "start and end markers are both '{}'",
                self.start_marker
            )));
        }
        if !(self.data_base < self.temp_base
            && self.temp_base < self.memory_size
            && self.memory_size <= MEMORY_SIZE)
        {
            return Err(CompileError::structural_no_span(format!(
                "invalid address layout: data 0x{:X}, temp 0x{:X}, end 0x{:X}",
                self.data_base, self.temp_base, self.memory_size
            )));
        }
        if self.max_instructions > MAX_ADDRESSABLE {
            return Err(CompileError::structural_no_span(format!(
                "max_instructions {} exceeds the {} addressable by a branch operand",
                self.max_instructions, MAX_ADDRESSABLE
            )));
        }
        Ok(())
    }

    /// Number of variable and constant slots available.
    pub fn data_capacity(&self) -> usize {
        self.temp_base.saturating_sub(self.data_base) as usize
    }

    /// Number of scratch slots available.
    pub fn temp_capacity(&self) -> usize {
        self.memory_size.saturating_sub(self.temp_base) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_valid() {
        let config = CompilerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.data_capacity(), 72);
        assert_eq!(config.temp_capacity(), 56);
    }

    #[test]
    fn overlapping_regions_are_rejected() {
        let config = CompilerConfig {
            temp_base: 0x80,
            ..CompilerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unaddressable_instruction_bound_is_rejected() {
        let config = CompilerConfig {
            max_instructions: 100_000,
            ..CompilerConfig::default()
        };
        assert!(config.validate().is_err());
        let config = CompilerConfig {
            max_instructions: MAX_ADDRESSABLE,
            ..CompilerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn identical_markers_are_rejected() {
        let config = CompilerConfig {
            end_marker: "INICIO".to_string(),
            ..CompilerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
