//! Script compiler
//!
//! Turns indentation-structured script source into a flat, jump-addressed
//! instruction list in a single forward pass over the lines. Blocks (`if`,
//! `else`, `for`) are tracked on an explicit stack; each open block remembers
//! which instruction needs its jump target backpatched once the block's end
//! is known.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::executor::types::{Arg, Instruction, Op, UNRESOLVED};

pub mod scan;

#[cfg(test)]
mod tests;

use scan::{
    find_assignment, find_top_level, indentation, is_identifier, is_wrapped, matching_close,
    split_top_level,
};

/* ===================== Program ===================== */

/// Compiled script
///
/// A program that failed to parse has no instructions and carries the error;
/// it must not be run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub source: String,
    pub instructions: Vec<Instruction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ParseError>,
}

impl Program {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Convert into a `Result`, for callers that want `?`.
    pub fn into_result(self) -> Result<Program, ParseError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    /// SHA-256 of the source text, hex encoded
    pub fn version_hash(&self) -> String {
        let digest = Sha256::digest(self.source.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// True if every jump lands inside the program. A target equal to the
    /// instruction count means "end of program".
    pub fn jump_targets_resolved(&self) -> bool {
        self.instructions
            .iter()
            .filter_map(|inst| inst.op.jump_target())
            .all(|target| target != UNRESOLVED && target <= self.instructions.len())
    }
}

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ParseError {
    #[error("Parse error on line {line}: unrecognized statement: {text}")]
    UnrecognizedStatement { line: usize, text: String },

    #[error("Parse error on line {line}: 'else' without a matching 'if': {text}")]
    ElseWithoutIf { line: usize, text: String },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnrecognizedStatement { line, .. }
            | ParseError::ElseWithoutIf { line, .. } => *line,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Public API ===================== */

/// Compile script source into a program
///
/// Never fails outright: a parse error is reported through `Program::error`
/// together with an empty instruction list.
pub fn parse(source: &str) -> Program {
    match compile(source) {
        Ok(instructions) => Program {
            source: source.to_string(),
            instructions,
            error: None,
        },
        Err(err) => {
            tracing::debug!(error = %err, "script failed to parse");
            Program {
                source: source.to_string(),
                instructions: Vec::new(),
                error: Some(err),
            }
        }
    }
}

fn compile(source: &str) -> ParseResult<Vec<Instruction>> {
    let mut compiler = Compiler::default();
    for (idx, raw) in source.lines().enumerate() {
        compiler.compile_line(idx + 1, raw)?;
    }
    compiler.finish()
}

/* ===================== Block Stack ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    If,
    Else,
    For,
}

/// An open block waiting for its end
#[derive(Debug, Clone, Copy)]
struct Block {
    kind: BlockKind,
    /// If: the jump-if-false. Else: the guard jump. For: the iterator-next.
    patch: usize,
    /// Indentation of the header line
    indent: usize,
    /// Source line of the header
    line: usize,
}

#[derive(Default)]
struct Compiler {
    instructions: Vec<Instruction>,
    blocks: Vec<Block>,
}

impl Compiler {
    fn emit(&mut self, line: usize, indent: usize, op: Op) -> usize {
        self.instructions.push(Instruction::new(line, indent, op));
        self.instructions.len() - 1
    }

    fn patch(&mut self, at: usize, target: usize) {
        if let Some(inst) = self.instructions.get_mut(at) {
            inst.op.set_jump_target(target);
        }
    }

    fn next_index(&self) -> usize {
        self.instructions.len()
    }

    /// Close every block the current indentation has left. Returns the last
    /// block closed, which is the one an `else:` would attach to.
    fn close_blocks(&mut self, indent: usize) -> Option<Block> {
        let mut last = None;
        while let Some(block) = self.blocks.last().copied() {
            if indent > block.indent {
                break;
            }
            self.blocks.pop();
            self.close(block);
            last = Some(block);
        }
        last
    }

    fn close(&mut self, block: Block) {
        match block.kind {
            BlockKind::If | BlockKind::Else => {
                let here = self.next_index();
                self.patch(block.patch, here);
            }
            BlockKind::For => {
                let back = self.emit(
                    block.line,
                    block.indent,
                    Op::Jump {
                        target: block.patch,
                    },
                );
                self.patch(block.patch, back + 1);
            }
        }
    }

    fn compile_line(&mut self, line: usize, raw: &str) -> ParseResult<()> {
        let indent = indentation(raw);
        let text = strip_comment(raw.trim());

        if text.is_empty() {
            self.emit(line, indent, Op::Nop);
            return Ok(());
        }

        let closed = self.close_blocks(indent);

        if is_else(text) {
            return match closed {
                Some(block) if block.kind == BlockKind::If && block.indent == indent => {
                    let guard = self.emit(line, indent, Op::Jump { target: UNRESOLVED });
                    self.patch(block.patch, guard + 1);
                    self.blocks.push(Block {
                        kind: BlockKind::Else,
                        patch: guard,
                        indent,
                        line,
                    });
                    Ok(())
                }
                _ => Err(ParseError::ElseWithoutIf {
                    line,
                    text: text.to_string(),
                }),
            };
        }

        let unrecognized = || ParseError::UnrecognizedStatement {
            line,
            text: text.to_string(),
        };

        if let Some(expr) = call_inner(text, "print") {
            self.emit(line, indent, Op::Print { expr: expr.to_string() });
            return Ok(());
        }

        if let Some(expr) = call_inner(text, "sleep").or_else(|| call_inner(text, "time.sleep")) {
            self.emit(
                line,
                indent,
                Op::Sleep {
                    duration: expr.to_string(),
                },
            );
            return Ok(());
        }

        if let Some(header) = block_header(text, "for") {
            let split = find_top_level(header, " in ").ok_or_else(unrecognized)?;
            let var = header[..split].trim();
            let iterable = header[split + 4..].trim();
            if !is_identifier(var) || iterable.is_empty() {
                return Err(unrecognized());
            }
            self.emit(
                line,
                indent,
                Op::IterInit {
                    var: var.to_string(),
                    iterable: iterable.to_string(),
                },
            );
            let next = self.emit(
                line,
                indent,
                Op::IterNext {
                    var: var.to_string(),
                    exit: UNRESOLVED,
                },
            );
            self.blocks.push(Block {
                kind: BlockKind::For,
                patch: next,
                indent,
                line,
            });
            return Ok(());
        }

        if let Some(condition) = block_header(text, "if") {
            if condition.is_empty() {
                return Err(unrecognized());
            }
            let jump = self.emit(
                line,
                indent,
                Op::JumpIfFalse {
                    condition: condition.to_string(),
                    target: UNRESOLVED,
                },
            );
            self.blocks.push(Block {
                kind: BlockKind::If,
                patch: jump,
                indent,
                line,
            });
            return Ok(());
        }

        if let Some(pos) = find_top_level(text, "+=") {
            let var = text[..pos].trim();
            let rhs = text[pos + 2..].trim();
            if is_identifier(var) && !rhs.is_empty() {
                self.emit(
                    line,
                    indent,
                    Op::Assign {
                        var: var.to_string(),
                        expr: format!("{} + {}", var, rhs),
                    },
                );
                return Ok(());
            }
            return Err(unrecognized());
        }

        if let Some(pos) = find_assignment(text) {
            let var = text[..pos].trim();
            let rhs = text[pos + 1..].trim();
            if !is_identifier(var) || rhs.is_empty() {
                return Err(unrecognized());
            }
            let op = match parse_call(rhs) {
                Some((target, action, args)) => Op::AssignCall {
                    var: var.to_string(),
                    target,
                    action,
                    args,
                },
                None => Op::Assign {
                    var: var.to_string(),
                    expr: rhs.to_string(),
                },
            };
            self.emit(line, indent, op);
            return Ok(());
        }

        if let Some((target, action, args)) = parse_call(text) {
            self.emit(line, indent, Op::Call { target, action, args });
            return Ok(());
        }

        Err(unrecognized())
    }

    fn finish(mut self) -> ParseResult<Vec<Instruction>> {
        self.close_blocks(0);
        debug_assert!(self
            .instructions
            .iter()
            .filter_map(|inst| inst.op.jump_target())
            .all(|t| t != UNRESOLVED));
        Ok(self.instructions)
    }
}

/* ===================== Line Helpers ===================== */

/// Drop a trailing `# comment` that sits outside any string literal.
fn strip_comment(text: &str) -> &str {
    match find_top_level(text, "#") {
        Some(pos) => text[..pos].trim_end(),
        None => text,
    }
}

fn is_else(text: &str) -> bool {
    text.strip_suffix(':')
        .map(|head| head.trim() == "else")
        .unwrap_or(false)
}

/// `<keyword> <rest>:` → `<rest>` (trimmed). The keyword must be followed by
/// whitespace or an opening parenthesis.
fn block_header<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(keyword)?;
    if !rest.starts_with(|c: char| c.is_whitespace() || c == '(') {
        return None;
    }
    rest.strip_suffix(':').map(str::trim)
}

/// `<name>(<inner>)` → `<inner>` (trimmed), only when the parentheses wrap the
/// whole remainder of the line.
fn call_inner<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(name)?;
    if !is_wrapped(rest, '(', ')') {
        return None;
    }
    Some(rest[1..rest.len() - 1].trim())
}

/// Match `id.action(args)` spanning the whole text.
fn parse_call(text: &str) -> Option<(String, String, Vec<Arg>)> {
    let open = find_top_level(text, "(")?;
    let close = matching_close(text, open)?;
    if close != text.len() - 1 {
        return None;
    }

    let (target, action) = text[..open].trim_end().split_once('.')?;
    if !is_identifier(target) || !is_identifier(action) {
        return None;
    }

    Some((
        target.to_string(),
        action.to_string(),
        parse_args(&text[open + 1..close]),
    ))
}

/// Split an argument string into named and positional arguments.
///
/// Positional arguments are keyed `"0"`, `"1"`, … in order of appearance.
pub fn parse_args(text: &str) -> Vec<Arg> {
    let mut args = Vec::new();
    let mut position = 0;

    for piece in split_top_level(text, ',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }

        if let Some(eq) = find_assignment(piece) {
            let name = piece[..eq].trim();
            if is_identifier(name) {
                args.push(Arg::new(name, piece[eq + 1..].trim()));
                continue;
            }
        }

        args.push(Arg::new(position.to_string(), piece));
        position += 1;
    }

    args
}
