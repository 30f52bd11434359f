//! # Executor - Step-Driven Script VM
//!
//! Executes a compiled `Program` one instruction per `step`.
//!
//! ## Core Principles
//!
//! 1. **Flat instruction list**: all control flow is jumps, no recursion
//! 2. **Host-driven**: the host decides when to call `step`; nothing runs in
//!    the background
//! 3. **Single suspension point**: `sleep` is the only instruction that awaits
//!    a timer; tool calls await the tool
//! 4. **Lenient values**: expressions never fail, unknown names are `Undefined`

pub mod context;
pub mod errors;
pub mod exec_loop;
pub mod expressions;
pub mod stdlib;
pub mod types;
pub mod vm;

#[cfg(test)]
mod tests;

pub use context::{Context, IteratorState, LineHook, LogHook, Status};
pub use errors::{RunError, RuntimeError};
pub use exec_loop::{run_until_done, RunLimits};
pub use expressions::{evaluate, evaluate_args, Vars};
pub use types::{Arg, Instruction, Op, Val, UNRESOLVED};
pub use vm::step;
