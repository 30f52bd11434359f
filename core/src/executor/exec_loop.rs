//! Host run loop
//!
//! Drives `step` until the context reaches a terminal status. Hosts that need
//! finer control (single-stepping, a UI tick) call `step` themselves.

use std::time::Duration;

use super::context::{Context, Status};
use super::errors::RunError;
use super::vm::step;
use crate::parser::Program;

/// Limits a host applies to one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunLimits {
    /// Stop with `StepLimitExceeded` after this many instructions
    pub max_steps: Option<u64>,
    /// Pause between instructions
    pub step_delay: Duration,
}

impl RunLimits {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }
}

/* ===================== Public API ===================== */

/// Run the program until it completes or fails
///
/// Returns the number of instructions executed. Hitting the step limit leaves
/// the context `Paused`, so the host may resume it with further calls.
pub async fn run_until_done(
    program: &Program,
    ctx: &mut Context,
    limits: RunLimits,
) -> Result<u64, RunError> {
    tracing::info!(
        run_id = %ctx.id,
        instructions = program.len(),
        version = %program.version_hash(),
        "script started"
    );

    let mut executed: u64 = 0;
    while !ctx.status.is_terminal() {
        if let Some(limit) = limits.max_steps {
            if executed >= limit && ctx.ip < program.len() {
                ctx.pause();
                tracing::warn!(run_id = %ctx.id, limit, "step limit reached");
                return Err(RunError::StepLimitExceeded { limit });
            }
        }

        step(program, ctx).await?;

        if ctx.status == Status::Completed {
            break;
        }
        executed += 1;

        if !limits.step_delay.is_zero() {
            ctx.pause();
            tokio::time::sleep(limits.step_delay).await;
        }
    }

    tracing::info!(run_id = %ctx.id, executed, status = %ctx.status, "script finished");
    Ok(executed)
}
