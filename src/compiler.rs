use crate::assembly::Program;
use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileResult, Span};
use crate::lexer::{is_identifier, Lexer};
use crate::opcode::{byte_offset, InstructionBuffer, Opcode};
use crate::source::{self, SourceLine};
use crate::symbol::{self, SymbolTable};
use crate::token::TokenKind;

/// Addresses of the constants the arithmetic sequences rely on.
#[derive(Debug, Clone, Copy)]
struct Synthetic {
    zero: u16,
    one: u16,
    neg_one: u16,
}

/// Result of one compile: the program (always produced) plus every
/// diagnostic raised along the way, in source order.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub program: Program,
    pub diagnostics: Vec<CompileError>,
}

impl Compilation {
    /// True when the compile raised no diagnostics.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Compiler state for a single compile.
///
/// Grammar productions emit code as they parse and return the scratch
/// address holding their result; there is no intermediate tree.
pub struct Compiler {
    config: CompilerConfig,
    symbols: SymbolTable,
    code: InstructionBuffer,
    next_temp: u16,
    constants: Synthetic,
    diagnostics: Vec<CompileError>,
}

impl Compiler {
    /// Validates `config` and declares the synthetic constants, which take
    /// the first three data addresses.
    pub fn new(config: CompilerConfig) -> CompileResult<Self> {
        config.validate()?;

        let mut symbols = SymbolTable::new(config.data_base, config.temp_base);
        let constants = Synthetic {
            zero: symbols.declare_constant(symbol::ZERO, 0)?,
            one: symbols.declare_constant(symbol::ONE, 1)?,
            neg_one: symbols.declare_constant(symbol::NEG_ONE, 255)?,
        };

        Ok(Self {
            symbols,
            code: InstructionBuffer::new(config.max_instructions),
            next_temp: config.temp_base,
            constants,
            diagnostics: Vec::new(),
            config,
        })
    }

    /// Compiles a whole source file.
    ///
    /// Pass 1 declares every assignment target in the marked region so
    /// forward references resolve to stable addresses. Pass 2 generates code
    /// statement by statement. A statement that fails is reported and its
    /// partial code discarded; the program always ends in `HLT`.
    pub fn compile(mut self, source: &str) -> Compilation {
        let lines = source::clean(source);

        match source::region(&lines, &self.config.start_marker, &self.config.end_marker) {
            Some(body) => {
                self.declare_targets(body);
                for line in body {
                    let mark = self.code.len();
                    if let Err(err) = self.compile_statement(line) {
                        // Drop the partial code, unpatched placeholders included.
                        self.code.truncate(mark);
                        self.report(err.or_span(Span::line(line.number)));
                    }
                }
            }
            None => {
                let message = format!("start marker '{}' not found", self.config.start_marker);
                self.report(CompileError::structural_no_span(message));
            }
        }

        self.code.seal();
        self.finish()
    }

    fn finish(self) -> Compilation {
        Compilation {
            program: Program {
                data: self.symbols.into_entries(),
                instructions: self.code.into_instructions(),
            },
            diagnostics: self.diagnostics,
        }
    }

    // -------------------------------------------------------------------------
    // STATEMENTS
    // -------------------------------------------------------------------------

    fn declare_targets(&mut self, body: &[SourceLine<'_>]) {
        for line in body {
            let Some((target, _)) = line.text.split_once('=') else {
                continue;
            };
            let name = target.trim();
            if !is_identifier(name) || symbol::is_reserved(name) {
                continue;
            }
            if let Err(err) = self.symbols.declare(name, 0, false) {
                self.report(err.or_span(Span::line(line.number)));
            }
        }
    }

    fn compile_statement(&mut self, line: &SourceLine<'_>) -> CompileResult<()> {
        if let Some(operand) = res_operand(line.text) {
            return self.compile_res(line, operand);
        }
        if let Some(eq) = line.text.find('=') {
            return self.compile_assignment(line, eq);
        }
        Err(CompileError::structural(
            format!("unrecognized statement '{}'", line.text),
            statement_span(line),
        ))
    }

    fn compile_res(&mut self, line: &SourceLine<'_>, operand: &str) -> CompileResult<()> {
        let mut words = operand.split_whitespace();
        let (Some(name), None) = (words.next(), words.next()) else {
            return Err(CompileError::structural(
                "malformed RES statement: expected `RES <name>`",
                statement_span(line),
            ));
        };

        let Some(address) = self.symbols.find(name) else {
            return Err(CompileError::structural(
                format!("variable not found: {name}"),
                statement_span(line),
            ));
        };
        self.load(address)
    }

    fn compile_assignment(&mut self, line: &SourceLine<'_>, eq: usize) -> CompileResult<()> {
        let name = line.text[..eq].trim();
        let expr = &line.text[eq + 1..];
        if !is_identifier(name) || expr.trim().is_empty() {
            return Err(CompileError::structural(
                format!("malformed assignment '{}'", line.text),
                statement_span(line),
            ));
        }
        if symbol::is_reserved(name) {
            return Err(CompileError::structural(
                format!("cannot assign to reserved name '{name}'"),
                statement_span(line),
            ));
        }

        let target = self.symbols.declare(name, 0, true)?;

        let mut lexer = Lexer::new(expr, line.number, line.column + eq as u32 + 1);
        let result = self.parse_expression(&mut lexer)?;

        let trailing = lexer.current();
        if trailing.kind != TokenKind::Eof {
            let message = format!("unexpected trailing token '{}'", trailing.kind.describe());
            self.report(CompileError::parse(message, trailing.span));
        }

        self.load(result)?;
        self.store(target)
    }

    // -------------------------------------------------------------------------
    // EXPRESSIONS
    // -------------------------------------------------------------------------

    /// `expression := term ( ('+' | '-') term )*`
    fn parse_expression(&mut self, lexer: &mut Lexer<'_>) -> CompileResult<u16> {
        let mut left = self.parse_term(lexer)?;

        loop {
            let subtract = match lexer.current().kind {
                TokenKind::Plus => false,
                TokenKind::Minus => true,
                _ => break,
            };
            lexer.advance();

            let right = self.parse_term(lexer)?;
            let result = self.alloc_temp()?;

            if subtract {
                // a - b is a + (~b + 1); b is a scratch cell, so negate it in place.
                self.negate(right, right)?;
            }
            self.load(left)?;
            self.emit(Opcode::Add, right)?;
            self.store(result)?;

            left = result;
        }

        Ok(left)
    }

    /// `term := factor ( '*' factor )*`
    fn parse_term(&mut self, lexer: &mut Lexer<'_>) -> CompileResult<u16> {
        let mut left = self.parse_factor(lexer)?;

        while lexer.current().kind == TokenKind::Star {
            lexer.advance();
            let right = self.parse_factor(lexer)?;
            let result = self.alloc_temp()?;
            self.synthesize_multiply(left, right, result)?;
            left = result;
        }

        Ok(left)
    }

    /// `factor := NUMBER | IDENT | '(' expression ')' | '-' factor`
    ///
    /// Parse errors are reported and recovered here; the returned slot is
    /// always valid even if nothing was written to it.
    fn parse_factor(&mut self, lexer: &mut Lexer<'_>) -> CompileResult<u16> {
        let slot = self.alloc_temp()?;
        let token = lexer.current().clone();

        match token.kind {
            TokenKind::Number(literal) => {
                let constant = self.symbols.pool_constant(literal)?;
                self.copy(constant, slot)?;
                lexer.advance();
            }
            TokenKind::Ident(name)
                if symbol::is_reserved(&name) && self.symbols.find(&name).is_none() =>
            {
                let message = format!("'{name}' is a reserved name");
                self.report(CompileError::parse(message, token.span));
                lexer.advance();
            }
            TokenKind::Ident(name) => {
                let variable = self.symbols.declare(&name, 0, false)?;
                self.copy(variable, slot)?;
                lexer.advance();
            }
            TokenKind::LParen => {
                lexer.advance();
                let inner = self.parse_expression(lexer)?;
                if lexer.current().kind != TokenKind::RParen {
                    let span = lexer.current().span;
                    self.report(CompileError::parse("expected closing parenthesis", span));
                    return Ok(slot);
                }
                lexer.advance();
                self.copy(inner, slot)?;
            }
            TokenKind::Minus => {
                lexer.advance();
                let operand = self.parse_factor(lexer)?;
                self.negate(operand, slot)?;
            }
            other => {
                let message = format!("unexpected token in factor: '{}'", other.describe());
                self.report(CompileError::parse(message, token.span));
                lexer.advance();
            }
        }

        Ok(slot)
    }

    // -------------------------------------------------------------------------
    // ARITHMETIC SEQUENCES
    // -------------------------------------------------------------------------

    /// Emits `result = multiplier * multiplicand` as a counting loop:
    ///
    /// ```text
    ///       result = 0; counter = multiplier
    /// loop: if counter == 0 goto end
    ///       result = result + multiplicand
    ///       counter = counter + 255
    ///       goto loop
    /// end:
    /// ```
    ///
    /// The exit branch is emitted as a placeholder and patched once the
    /// backward jump is in place.
    fn synthesize_multiply(
        &mut self,
        multiplier: u16,
        multiplicand: u16,
        result: u16,
    ) -> CompileResult<()> {
        let Synthetic { zero, neg_one, .. } = self.constants;
        let counter = self.alloc_temp()?;

        self.copy(zero, result)?;
        self.copy(multiplier, counter)?;

        let loop_start = self.code.len();
        self.load(counter)?;
        let exit_jump = self.code.emit_placeholder(Opcode::Jz)?;

        self.load(result)?;
        self.emit(Opcode::Add, multiplicand)?;
        self.store(result)?;

        self.load(counter)?;
        self.emit(Opcode::Add, neg_one)?;
        self.store(counter)?;

        self.emit(Opcode::Jmp, byte_offset(loop_start)?)?;

        let loop_end = byte_offset(self.code.len())?;
        self.code.patch(exit_jump, Opcode::Jz, Some(loop_end))
    }

    /// `dst = ~src + 1`
    fn negate(&mut self, src: u16, dst: u16) -> CompileResult<()> {
        let one = self.constants.one;
        self.load(src)?;
        self.code.emit(Opcode::Not, None)?;
        self.emit(Opcode::Add, one)?;
        self.store(dst)
    }

    fn copy(&mut self, src: u16, dst: u16) -> CompileResult<()> {
        self.load(src)?;
        self.store(dst)
    }

    // -------------------------------------------------------------------------
    // EMISSION
    // -------------------------------------------------------------------------

    #[inline]
    fn load(&mut self, address: u16) -> CompileResult<()> {
        self.emit(Opcode::Lda, address).map(|_| ())
    }

    #[inline]
    fn store(&mut self, address: u16) -> CompileResult<()> {
        self.emit(Opcode::Sta, address).map(|_| ())
    }

    #[inline]
    fn emit(&mut self, opcode: Opcode, operand: u16) -> CompileResult<usize> {
        self.code.emit(opcode, Some(operand))
    }

    fn alloc_temp(&mut self) -> CompileResult<u16> {
        if self.next_temp >= self.config.memory_size {
            return Err(CompileError::capacity(format!(
                "scratch region exhausted ({} temporaries)",
                self.config.temp_capacity()
            )));
        }
        let address = self.next_temp;
        self.next_temp += 1;
        Ok(address)
    }

    fn report(&mut self, err: CompileError) {
        self.diagnostics.push(err);
    }
}

/// The operand text of a `RES` statement, if `text` is one.
fn res_operand(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("RES")?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

fn statement_span(line: &SourceLine<'_>) -> Span {
    Span::new(line.number, line.column, line.text.len() as u32)
}
