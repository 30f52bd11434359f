//! Runtime errors
//!
//! Every error raised while stepping carries the 1-based source line of the
//! instruction that failed, and its message leads with that line.

use thiserror::Error;

use crate::parser::ParseError;
use crate::tools::ToolError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// The program failed to parse and cannot run
    #[error("cannot run a program that failed to parse: {0}")]
    InvalidProgram(ParseError),

    #[error("line {line}: '{expr}' is not iterable (found {found})")]
    NotIterable {
        line: usize,
        expr: String,
        found: &'static str,
    },

    /// Neither a registered tool nor a variable carries the target name
    #[error("line {line}: unknown call '{target}.{action}': no tool or variable named '{target}'")]
    UnknownCall {
        line: usize,
        target: String,
        action: String,
    },

    #[error("line {line}: tool '{tool}' has no action '{action}'")]
    UnknownAction {
        line: usize,
        tool: String,
        action: String,
    },

    #[error("line {line}: {kind} has no method '{method}'")]
    UnknownMethod {
        line: usize,
        kind: &'static str,
        method: String,
    },

    #[error("line {line}: {method}(): {message}")]
    InvalidArgument {
        line: usize,
        method: String,
        message: String,
    },

    /// A tool's own `invoke` failed
    #[error("line {line}: {tool}.{action} failed: {source}")]
    Tool {
        line: usize,
        tool: String,
        action: String,
        source: ToolError,
    },

    #[error("line {line}: execution cancelled")]
    Cancelled { line: usize },
}

impl RuntimeError {
    /// Source line the error is tagged with
    pub fn line(&self) -> usize {
        match self {
            RuntimeError::InvalidProgram(err) => err.line(),
            RuntimeError::NotIterable { line, .. }
            | RuntimeError::UnknownCall { line, .. }
            | RuntimeError::UnknownAction { line, .. }
            | RuntimeError::UnknownMethod { line, .. }
            | RuntimeError::InvalidArgument { line, .. }
            | RuntimeError::Tool { line, .. }
            | RuntimeError::Cancelled { line } => *line,
        }
    }
}

/// Why a host run loop stopped early
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("step limit of {limit} reached before the script finished")]
    StepLimitExceeded { limit: u64 },
}
