//! # neanderc: Expression Compiler for the Neander Machine
//!
//! Compiles a tiny assignment language (`name = expr`, `RES name`) into
//! assembly for Neander, an 8-bit accumulator CPU with 256 bytes of memory
//! and no multiply or subtract instruction.
//!
//! ## Architecture
//! Source → Line cleaning → Pass 1 (declare targets) → Pass 2 (Lexer →
//! direct-emission parser) → Program → `.DATA` / `.CODE` listing
//!
//! ## Key Features
//! - Code is emitted while parsing; every production leaves its result in a
//!   fresh scratch cell.
//! - Literals are pooled, so each distinct value occupies one data cell.
//! - Subtraction compiles to two's-complement negation plus `ADD`;
//!   multiplication to a counting loop with a backpatched exit branch.
//! - A simulator runs compiled programs for testing and `--run`.

pub mod assembly;
pub mod compiler;
pub mod config;
pub mod error;
pub mod lexer;
pub mod opcode;
pub mod source;
pub mod symbol;
pub mod token;
pub mod vm;


use compiler::{Compilation, Compiler};
use config::CompilerConfig;
use error::CompileResult;

/// Compiles `source` with the default configuration.
pub fn compile(source: &str) -> CompileResult<Compilation> {
    compile_with(source, CompilerConfig::default())
}

/// Compiles `source` with `config`. Fails only when `config` is invalid;
/// problems in the source are returned as diagnostics.
pub fn compile_with(source: &str, config: CompilerConfig) -> CompileResult<Compilation> {
    Ok(Compiler::new(config)?.compile(source))
}
