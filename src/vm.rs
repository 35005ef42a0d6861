use crate::assembly::Program;
use crate::error::{CompileError, CompileResult};
use crate::opcode::{Instruction, Opcode, INSTRUCTION_WIDTH};

/// Bytes of Neander memory.
pub const MEMORY_BYTES: usize = 256;
/// Step bound used by the CLI when none is given.
pub const DEFAULT_MAX_STEPS: u64 = 100_000;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halt {
    pub steps: u64,
    pub accumulator: u8,
}

/// Simulates a compiled [`Program`].
///
/// The data section is loaded into a flat 256-byte memory. Instructions are
/// kept apart from data and addressed by byte offset, two bytes per
/// instruction, the same way the code generator computes branch targets.
pub struct Machine<'p> {
    program: &'p Program,
    memory: [u8; MEMORY_BYTES],
    accumulator: u8,
    pc: usize,
    hits: Vec<u64>,
    steps: u64,
}

impl<'p> Machine<'p> {
    pub fn new(program: &'p Program) -> Self {
        let mut memory = [0u8; MEMORY_BYTES];
        for symbol in &program.data {
            if let Some(cell) = memory.get_mut(symbol.address as usize) {
                *cell = symbol.value;
            }
        }
        Self {
            program,
            memory,
            accumulator: 0,
            pc: 0,
            hits: vec![0; program.instructions.len()],
            steps: 0,
        }
    }

    /// Runs until `HLT`. Fails on a malformed instruction, on running off
    /// the end of the code, or after `max_steps` instructions without
    /// halting.
    pub fn run(&mut self, max_steps: u64) -> CompileResult<Halt> {
        loop {
            if self.steps >= max_steps {
                return Err(CompileError::runtime(format!(
                    "step limit of {max_steps} reached without HLT"
                )));
            }

            let Some(&instr) = self.program.instructions.get(self.pc) else {
                return Err(CompileError::runtime(format!(
                    "execution ran past the end of the program (instruction {})",
                    self.pc
                )));
            };
            self.hits[self.pc] += 1;
            self.steps += 1;
            self.pc += 1;

            match instr.opcode {
                Opcode::Nop => {}
                Opcode::Sta => {
                    let address = self.address(instr)?;
                    self.memory[address] = self.accumulator;
                }
                Opcode::Lda => {
                    let address = self.address(instr)?;
                    self.accumulator = self.memory[address];
                }
                Opcode::Add => {
                    let address = self.address(instr)?;
                    self.accumulator = self.accumulator.wrapping_add(self.memory[address]);
                }
                Opcode::Or => {
                    let address = self.address(instr)?;
                    self.accumulator |= self.memory[address];
                }
                Opcode::And => {
                    let address = self.address(instr)?;
                    self.accumulator &= self.memory[address];
                }
                Opcode::Not => self.accumulator = !self.accumulator,
                Opcode::Jmp => self.pc = self.branch_target(instr)?,
                Opcode::Jn => {
                    let target = self.branch_target(instr)?;
                    if self.accumulator & 0x80 != 0 {
                        self.pc = target;
                    }
                }
                Opcode::Jz => {
                    let target = self.branch_target(instr)?;
                    if self.accumulator == 0 {
                        self.pc = target;
                    }
                }
                Opcode::Hlt => {
                    return Ok(Halt {
                        steps: self.steps,
                        accumulator: self.accumulator,
                    });
                }
            }
        }
    }

    #[inline]
    pub fn accumulator(&self) -> u8 {
        self.accumulator
    }

    #[inline]
    pub fn memory(&self, address: u16) -> u8 {
        self.memory.get(address as usize).copied().unwrap_or(0)
    }

    /// Current value of the symbol `name`.
    pub fn value_of(&self, name: &str) -> Option<u8> {
        self.program.address_of(name).map(|address| self.memory(address))
    }

    /// How many times the instruction at `index` has executed.
    pub fn hits(&self, index: usize) -> u64 {
        self.hits.get(index).copied().unwrap_or(0)
    }

    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn address(&self, instr: Instruction) -> CompileResult<usize> {
        let operand = self.operand(instr)?;
        let address = operand as usize;
        if address >= MEMORY_BYTES {
            return Err(CompileError::runtime(format!(
                "address 0x{operand:X} out of range at instruction {}",
                instr.position
            )));
        }
        Ok(address)
    }

    fn branch_target(&self, instr: Instruction) -> CompileResult<usize> {
        let target = self.operand(instr)?;
        if target % INSTRUCTION_WIDTH != 0 {
            return Err(CompileError::runtime(format!(
                "misaligned branch target 0x{target:X} at instruction {}",
                instr.position
            )));
        }
        let index = (target / INSTRUCTION_WIDTH) as usize;
        if index >= self.program.instructions.len() {
            return Err(CompileError::runtime(format!(
                "branch target 0x{target:X} outside the program at instruction {}",
                instr.position
            )));
        }
        Ok(index)
    }

    fn operand(&self, instr: Instruction) -> CompileResult<u16> {
        instr.operand.ok_or_else(|| {
            CompileError::runtime(format!(
                "{} at instruction {} has no operand",
                instr.opcode, instr.position
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::symbol::{Symbol, SymbolKind};

    fn program(data: &[(u16, u8)], code: &[(Opcode, Option<u16>)]) -> Program {
        Program {
            data: data
                .iter()
                .map(|&(address, value)| Symbol {
                    name: format!("m{address:X}"),
                    address,
                    value,
                    initialized: true,
                    kind: SymbolKind::Variable,
                })
                .collect(),
            instructions: code
                .iter()
                .enumerate()
                .map(|(position, &(opcode, operand))| Instruction {
                    opcode,
                    operand,
                    position,
                })
                .collect(),
        }
    }

    #[test]
    fn add_wraps_at_eight_bits() {
        let p = program(
            &[(0x80, 200), (0x81, 100)],
            &[
                (Opcode::Lda, Some(0x80)),
                (Opcode::Add, Some(0x81)),
                (Opcode::Sta, Some(0x82)),
                (Opcode::Hlt, None),
            ],
        );
        let mut m = Machine::new(&p);
        let halt = m.run(10).unwrap();
        assert_eq!(halt.accumulator, 44);
        assert_eq!(halt.steps, 4);
        assert_eq!(m.memory(0x82), 44);
    }

    #[test]
    fn bitwise_ops() {
        let p = program(
            &[(0x80, 0b1100), (0x81, 0b1010)],
            &[
                (Opcode::Lda, Some(0x80)),
                (Opcode::And, Some(0x81)),
                (Opcode::Sta, Some(0x82)),
                (Opcode::Lda, Some(0x80)),
                (Opcode::Or, Some(0x81)),
                (Opcode::Not, None),
                (Opcode::Hlt, None),
            ],
        );
        let mut m = Machine::new(&p);
        m.run(10).unwrap();
        assert_eq!(m.memory(0x82), 0b1000);
        assert_eq!(m.accumulator(), !0b1110u8);
    }

    #[test]
    fn jn_branches_on_bit_seven() {
        // AC = 0x80 is negative, so the NOT is skipped.
        let p = program(
            &[(0x80, 0x80)],
            &[
                (Opcode::Lda, Some(0x80)),
                (Opcode::Jn, Some(6)),
                (Opcode::Not, None),
                (Opcode::Hlt, None),
            ],
        );
        let mut m = Machine::new(&p);
        m.run(10).unwrap();
        assert_eq!(m.accumulator(), 0x80);
        assert_eq!(m.hits(2), 0);
    }

    #[test]
    fn misaligned_branch_is_rejected() {
        let p = program(&[], &[(Opcode::Jmp, Some(3)), (Opcode::Hlt, None)]);
        let err = Machine::new(&p).run(10).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert!(err.message.contains("misaligned"));
    }

    #[test]
    fn unpatched_placeholder_is_rejected() {
        let p = program(&[], &[(Opcode::Jz, None), (Opcode::Hlt, None)]);
        let err = Machine::new(&p).run(10).unwrap_err();
        assert!(err.message.contains("no operand"));
    }

    #[test]
    fn running_off_the_end_fails() {
        let p = program(&[], &[(Opcode::Nop, None)]);
        let err = Machine::new(&p).run(10).unwrap_err();
        assert!(err.message.contains("past the end"));
    }

    #[test]
    fn step_limit_stops_infinite_loops() {
        let p = program(&[], &[(Opcode::Jmp, Some(0)), (Opcode::Hlt, None)]);
        let mut m = Machine::new(&p);
        let err = m.run(50).unwrap_err();
        assert!(err.message.contains("step limit"));
        assert_eq!(m.steps(), 50);
        assert_eq!(m.hits(0), 50);
    }
}
