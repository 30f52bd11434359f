//! Runtime context
//!
//! All mutable state of one script run: variables, instruction pointer,
//! iterator table, status, and the host hooks. A context is created fresh per
//! run and is only ever mutated by `step`; the host discards it to stop.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::expressions::Vars;
use super::types::Val;
use crate::tools::ToolRegistry;

/* ===================== Status ===================== */

/// Execution status
///
/// `Idle → Running → {Paused | Completed | Error}`. `Paused` is set by the host
/// between ticks and cleared by the next step. `Completed` and `Error` are
/// terminal: a new run needs a new context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Error,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Error)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Idle => "idle",
            Status::Running => "running",
            Status::Paused => "paused",
            Status::Completed => "completed",
            Status::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/* ===================== Iterators ===================== */

/// State of one active `for` loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IteratorState {
    /// Index of the next item to hand out
    pub index: usize,
    pub items: Vec<Val>,
}

impl IteratorState {
    pub fn new(items: Vec<Val>) -> Self {
        Self { index: 0, items }
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.items.len()
    }
}

/* ===================== Context ===================== */

/// Host callback receiving script output and error lines
pub type LogHook = Box<dyn Fn(&str) + Send + Sync>;

/// Host callback receiving the source line about to execute
pub type LineHook = Box<dyn Fn(usize) + Send + Sync>;

pub struct Context {
    /// Identifies this run in logs
    pub id: Uuid,
    pub vars: Vars,
    /// Index of the next instruction
    pub ip: usize,
    pub iterators: HashMap<String, IteratorState>,
    pub status: Status,
    registry: Arc<ToolRegistry>,
    on_log: LogHook,
    on_line: LineHook,
    cancel: CancellationToken,
}

impl Context {
    /// Fresh context dispatching to the process-wide tool registry
    pub fn new() -> Self {
        Self::with_registry(ToolRegistry::global())
    }

    pub fn with_registry(registry: Arc<ToolRegistry>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vars: Vars::new(),
            ip: 0,
            iterators: HashMap::new(),
            status: Status::Idle,
            registry,
            on_log: Box::new(|line| tracing::info!(target: "graphscript::script", "{}", line)),
            on_line: Box::new(|_| {}),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the log callback
    pub fn on_log(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_log = Box::new(hook);
        self
    }

    /// Replace the line-highlight callback
    pub fn on_line(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_line = Box::new(hook);
        self
    }

    /// Seed variables before the first step
    pub fn with_vars(mut self, vars: Vars) -> Self {
        self.vars.extend(vars);
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn var(&self, name: &str) -> Option<&Val> {
        self.vars.get(name)
    }

    pub(crate) fn log(&self, line: &str) {
        (self.on_log)(line)
    }

    pub(crate) fn highlight(&self, line: usize) {
        (self.on_line)(line)
    }

    /// Host-side pause between ticks. Has no effect on terminal contexts.
    pub fn pause(&mut self) {
        if !self.status.is_terminal() {
            self.status = Status::Paused;
        }
    }

    /// Abandon the run: wakes a pending sleep and makes every later step fail.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token a host can hold on to and cancel from elsewhere
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("vars", &self.vars)
            .field("ip", &self.ip)
            .field("iterators", &self.iterators)
            .field("status", &self.status)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
