//! # Opcode Module
//!
//! The Neander instruction set and the buffer the code generator emits
//! into. Every instruction occupies [`INSTRUCTION_WIDTH`] bytes (opcode and
//! operand), so a branch to instruction `i` targets byte `i * 2`.
//!
//! ## Design Notes
//! - Instructions are appended in parse order and never removed.
//! - Forward branches are emitted as placeholders and patched in place once
//!   their target is known.

use std::fmt;

use crate::error::{CompileError, CompileResult};

/// Bytes per encoded instruction.
pub const INSTRUCTION_WIDTH: u16 = 2;

/// Most instructions whose byte offsets fit in a 16-bit operand.
pub const MAX_ADDRESSABLE: usize = (u16::MAX / INSTRUCTION_WIDTH) as usize;

/// Byte address of the instruction at `index`.
#[inline]
pub fn byte_offset(index: usize) -> CompileResult<u16> {
    u16::try_from(index)
        .ok()
        .and_then(|index| index.checked_mul(INSTRUCTION_WIDTH))
        .ok_or_else(|| {
            CompileError::capacity(format!(
                "instruction {index} is beyond the addressable code range"
            ))
        })
}

// -----------------------------------------------------------------------------
// OPCODES
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// No operation.
    Nop,
    /// `M[a] = AC`
    Sta,
    /// `AC = M[a]`
    Lda,
    /// `AC = AC + M[a]`, wrapping at 8 bits.
    Add,
    /// `AC = AC | M[a]`
    Or,
    /// `AC = AC & M[a]`
    And,
    /// `AC = !AC`
    Not,
    /// Unconditional branch to a byte offset.
    Jmp,
    /// Branch if the accumulator is negative (bit 7 set).
    Jn,
    /// Branch if the accumulator is zero.
    Jz,
    /// Stop execution.
    Hlt,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Sta => "STA",
            Opcode::Lda => "LDA",
            Opcode::Add => "ADD",
            Opcode::Or => "OR",
            Opcode::And => "AND",
            Opcode::Not => "NOT",
            Opcode::Jmp => "JMP",
            Opcode::Jn => "JN",
            Opcode::Jz => "JZ",
            Opcode::Hlt => "HLT",
        }
    }

    /// Whether the encoded form carries an operand field.
    pub fn takes_operand(self) -> bool {
        !matches!(self, Opcode::Nop | Opcode::Not | Opcode::Hlt)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

// -----------------------------------------------------------------------------
// INSTRUCTION
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    /// A data address, a branch byte offset, or `None` for operand-less
    /// opcodes and unpatched placeholders.
    pub operand: Option<u16>,
    /// Index in emission order. Fixed once assigned.
    pub position: usize,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand {
            Some(operand) if self.opcode.takes_operand() => {
                write!(f, "{} 0x{:X}", self.opcode, operand)
            }
            _ => write!(f, "{}", self.opcode),
        }
    }
}

// -----------------------------------------------------------------------------
// INSTRUCTION BUFFER
// -----------------------------------------------------------------------------

/// Append-only instruction list with in-place backpatching.
#[derive(Debug)]
pub struct InstructionBuffer {
    instructions: Vec<Instruction>,
    capacity: usize,
}

impl InstructionBuffer {
    /// Creates a buffer that accepts at most `capacity` emitted instructions.
    pub fn new(capacity: usize) -> Self {
        Self {
            instructions: Vec::new(),
            capacity,
        }
    }

    /// Appends an instruction and returns its position.
    pub fn emit(&mut self, opcode: Opcode, operand: Option<u16>) -> CompileResult<usize> {
        if self.instructions.len() >= self.capacity {
            return Err(CompileError::capacity(format!(
                "instruction buffer full ({} instructions)",
                self.capacity
            )));
        }
        let position = self.instructions.len();
        self.instructions.push(Instruction {
            opcode,
            operand,
            position,
        });
        Ok(position)
    }

    /// Appends a branch whose target is not known yet.
    #[inline]
    pub fn emit_placeholder(&mut self, opcode: Opcode) -> CompileResult<usize> {
        self.emit(opcode, None)
    }

    /// Rewrites the instruction at `index`. Its position is kept.
    pub fn patch(
        &mut self,
        index: usize,
        opcode: Opcode,
        operand: Option<u16>,
    ) -> CompileResult<()> {
        let len = self.instructions.len();
        let Some(slot) = self.instructions.get_mut(index) else {
            return Err(CompileError::structural_no_span(format!(
                "invalid instruction index {index} (buffer holds {len})"
            )));
        };
        slot.opcode = opcode;
        slot.operand = operand;
        Ok(())
    }

    /// Drops every instruction from `len` on. Used to discard the partial
    /// code of an abandoned statement, including unpatched placeholders.
    pub fn truncate(&mut self, len: usize) {
        self.instructions.truncate(len);
    }

    /// Appends the terminating `HLT`. This bypasses the capacity bound so a
    /// compiled program always ends in a halt.
    pub fn seal(&mut self) -> usize {
        let position = self.instructions.len();
        self.instructions.push(Instruction {
            opcode: Opcode::Hlt,
            operand: None,
            position,
        });
        position
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn emit_assigns_positions_in_order() {
        let mut buf = InstructionBuffer::new(8);
        assert_eq!(buf.emit(Opcode::Lda, Some(0x80)), Ok(0));
        assert_eq!(buf.emit(Opcode::Not, None), Ok(1));
        assert_eq!(buf.instructions()[1].position, 1);
    }

    #[test]
    fn patch_rewrites_operand_in_place() {
        let mut buf = InstructionBuffer::new(8);
        buf.emit(Opcode::Lda, Some(0xC8)).unwrap();
        let jz = buf.emit_placeholder(Opcode::Jz).unwrap();
        buf.emit(Opcode::Jmp, Some(0)).unwrap();
        let end = byte_offset(buf.len()).unwrap();
        buf.patch(jz, Opcode::Jz, Some(end)).unwrap();
        let patched = buf.instructions()[jz];
        assert_eq!(patched.operand, Some(6));
        assert_eq!(patched.position, jz);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn patch_out_of_range_fails() {
        let mut buf = InstructionBuffer::new(8);
        buf.emit(Opcode::Nop, None).unwrap();
        let err = buf.patch(1, Opcode::Jz, Some(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Structural);
    }

    #[test]
    fn capacity_is_enforced_but_seal_always_fits() {
        let mut buf = InstructionBuffer::new(1);
        buf.emit(Opcode::Lda, Some(0x80)).unwrap();
        let err = buf.emit(Opcode::Sta, Some(0x81)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Capacity);
        assert_eq!(buf.seal(), 1);
        assert_eq!(buf.instructions()[1].opcode, Opcode::Hlt);
    }

    #[test]
    fn truncate_discards_unpatched_placeholder() {
        let mut buf = InstructionBuffer::new(8);
        buf.emit(Opcode::Lda, Some(0x80)).unwrap();
        let mark = buf.len();
        buf.emit(Opcode::Lda, Some(0xC8)).unwrap();
        buf.emit_placeholder(Opcode::Jz).unwrap();
        buf.truncate(mark);
        assert_eq!(buf.len(), 1);
        assert!(buf.instructions().iter().all(|i| i.opcode != Opcode::Jz));
    }

    #[test]
    fn byte_offset_overflow_is_a_capacity_error() {
        assert_eq!(byte_offset(17), Ok(34));
        assert_eq!(byte_offset(MAX_ADDRESSABLE), Ok(u16::MAX - 1));
        let err = byte_offset(MAX_ADDRESSABLE + 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Capacity);
        assert!(byte_offset(100_000).is_err());
    }

    #[test]
    fn display_omits_operand_for_bare_opcodes() {
        let lda = Instruction {
            opcode: Opcode::Lda,
            operand: Some(0xC8),
            position: 0,
        };
        let not = Instruction {
            opcode: Opcode::Not,
            operand: None,
            position: 1,
        };
        assert_eq!(lda.to_string(), "LDA 0xC8");
        assert_eq!(not.to_string(), "NOT");
    }
}
