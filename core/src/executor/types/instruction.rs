//! Compiled instruction types

use serde::{Deserialize, Serialize};

/// Placeholder jump target used while a block is still open.
///
/// The compiler patches every one of these before `parse` returns.
pub const UNRESOLVED: usize = usize::MAX;

/// One call argument: its name (`"0"`, `"1"`, … for positional arguments) and
/// the raw, unevaluated expression text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arg {
    pub name: String,
    pub expr: String,
}

impl Arg {
    pub fn new(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expr: expr.into(),
        }
    }

    pub fn is_positional(&self) -> bool {
        self.name.bytes().all(|b| b.is_ascii_digit())
    }
}

/// Opcode and its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Nop,
    Call {
        target: String,
        action: String,
        args: Vec<Arg>,
    },
    Assign {
        var: String,
        expr: String,
    },
    AssignCall {
        var: String,
        target: String,
        action: String,
        args: Vec<Arg>,
    },
    Sleep {
        duration: String,
    },
    Jump {
        target: usize,
    },
    JumpIfFalse {
        condition: String,
        target: usize,
    },
    IterInit {
        var: String,
        iterable: String,
    },
    IterNext {
        var: String,
        exit: usize,
    },
    Print {
        expr: String,
    },
}

impl Op {
    /// The jump target this opcode carries, if it is a jump.
    pub fn jump_target(&self) -> Option<usize> {
        match self {
            Op::Jump { target } | Op::JumpIfFalse { target, .. } => Some(*target),
            Op::IterNext { exit, .. } => Some(*exit),
            _ => None,
        }
    }

    pub(crate) fn set_jump_target(&mut self, to: usize) {
        match self {
            Op::Jump { target } | Op::JumpIfFalse { target, .. } => *target = to,
            Op::IterNext { exit, .. } => *exit = to,
            _ => {}
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Op::Nop => "nop",
            Op::Call { .. } => "call",
            Op::Assign { .. } => "assign",
            Op::AssignCall { .. } => "assign_call",
            Op::Sleep { .. } => "sleep",
            Op::Jump { .. } => "jump",
            Op::JumpIfFalse { .. } => "jump_if_false",
            Op::IterInit { .. } => "iter_init",
            Op::IterNext { .. } => "iter_next",
            Op::Print { .. } => "print",
        }
    }
}

/// One compiled step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// 1-based source line
    pub line: usize,
    /// Indentation width of the source line
    pub indent: usize,
    #[serde(flatten)]
    pub op: Op,
}

impl Instruction {
    pub fn new(line: usize, indent: usize, op: Op) -> Self {
        Self { line, indent, op }
    }
}
