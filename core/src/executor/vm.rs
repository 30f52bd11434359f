//! Instruction execution
//!
//! `step` executes exactly one instruction against a context. All control
//! flow is expressed through the instruction pointer: an instruction either
//! falls through to the next one or names the index to jump to.

use std::time::Duration;

use super::context::{Context, IteratorState, Status};
use super::errors::RuntimeError;
use super::expressions::{evaluate, evaluate_args};
use super::stdlib;
use super::types::{Arg, Instruction, Op, Val};
use crate::parser::Program;

/// Where execution continues after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Jump(usize),
}

/* ===================== Public API ===================== */

/// Execute one instruction
///
/// Stepping a completed or failed context does nothing. Stepping past the last
/// instruction marks the context completed. A failure marks the context as
/// errored, reports a line-tagged message through the log hook, and is
/// returned to the caller.
pub async fn step(program: &Program, ctx: &mut Context) -> Result<(), RuntimeError> {
    if let Some(err) = program.error() {
        return Err(fail(ctx, RuntimeError::InvalidProgram(err.clone())));
    }

    if ctx.status.is_terminal() {
        return Ok(());
    }

    let Some(inst) = program.instructions.get(ctx.ip) else {
        ctx.status = Status::Completed;
        tracing::debug!(run_id = %ctx.id, "script completed");
        return Ok(());
    };

    if ctx.is_cancelled() {
        return Err(fail(ctx, RuntimeError::Cancelled { line: inst.line }));
    }

    ctx.status = Status::Running;
    ctx.highlight(inst.line);
    tracing::debug!(
        run_id = %ctx.id,
        ip = ctx.ip,
        line = inst.line,
        op = inst.op.name(),
        "executing instruction"
    );

    match execute(inst, ctx).await {
        Ok(Flow::Next) => {
            ctx.ip += 1;
            Ok(())
        }
        Ok(Flow::Jump(target)) => {
            ctx.ip = target;
            Ok(())
        }
        Err(err) => Err(fail(ctx, err)),
    }
}

fn fail(ctx: &mut Context, err: RuntimeError) -> RuntimeError {
    ctx.status = Status::Error;
    ctx.log(&format!("Error: {}", err));
    tracing::warn!(run_id = %ctx.id, line = err.line(), error = %err, "script failed");
    err
}

/* ===================== Dispatch ===================== */

async fn execute(inst: &Instruction, ctx: &mut Context) -> Result<Flow, RuntimeError> {
    let line = inst.line;

    match &inst.op {
        Op::Nop => {}

        Op::Print { expr } => {
            let value = evaluate(expr, &ctx.vars);
            ctx.log(&value.to_string());
        }

        Op::Sleep { duration } => {
            if let Some(secs) = evaluate(duration, &ctx.vars).as_num() {
                if secs > 0.0 {
                    sleep(ctx, line, secs).await?;
                }
            }
        }

        Op::Assign { var, expr } => {
            let value = evaluate(expr, &ctx.vars);
            ctx.vars.insert(var.clone(), value);
        }

        Op::Call {
            target,
            action,
            args,
        } => {
            call(ctx, line, target, action, args).await?;
        }

        Op::AssignCall {
            var,
            target,
            action,
            args,
        } => {
            let value = call(ctx, line, target, action, args).await?;
            ctx.vars.insert(var.clone(), value);
        }

        Op::Jump { target } => return Ok(Flow::Jump(*target)),

        Op::JumpIfFalse { condition, target } => {
            if !evaluate(condition, &ctx.vars).is_truthy() {
                return Ok(Flow::Jump(*target));
            }
        }

        Op::IterInit { var, iterable } => match evaluate(iterable, &ctx.vars) {
            Val::List(items) => {
                ctx.iterators.insert(var.clone(), IteratorState::new(items));
            }
            other => {
                return Err(RuntimeError::NotIterable {
                    line,
                    expr: iterable.clone(),
                    found: other.type_name(),
                })
            }
        },

        Op::IterNext { var, exit } => {
            let next = match ctx.iterators.get_mut(var) {
                Some(state) if !state.is_exhausted() => {
                    let item = state.items[state.index].clone();
                    state.index += 1;
                    Some(item)
                }
                _ => None,
            };
            match next {
                Some(item) => {
                    ctx.vars.insert(var.clone(), item);
                }
                None => {
                    ctx.iterators.remove(var);
                    return Ok(Flow::Jump(*exit));
                }
            }
        }
    }

    Ok(Flow::Next)
}

/// Resolve a call: registered tool first, then a method on a variable.
async fn call(
    ctx: &mut Context,
    line: usize,
    target: &str,
    action: &str,
    args: &[Arg],
) -> Result<Val, RuntimeError> {
    let values = evaluate_args(args, &ctx.vars);

    if let Some(tool) = ctx.registry().lookup(target) {
        if !tool.list_actions().iter().any(|a| a.name == action) {
            return Err(RuntimeError::UnknownAction {
                line,
                tool: target.to_string(),
                action: action.to_string(),
            });
        }
        return tool
            .invoke(action, values)
            .await
            .map_err(|source| RuntimeError::Tool {
                line,
                tool: target.to_string(),
                action: action.to_string(),
                source,
            });
    }

    stdlib::call_method(line, target, action, &values, &mut ctx.vars)
}

/// Wait `secs` seconds, waking early if the context is cancelled.
async fn sleep(ctx: &Context, line: usize, secs: f64) -> Result<(), RuntimeError> {
    let delay = Duration::from_millis((secs * 1000.0).round() as u64);
    let token = ctx.cancellation_token();

    tokio::select! {
        _ = tokio::time::sleep(delay) => Ok(()),
        _ = token.cancelled() => Err(RuntimeError::Cancelled { line }),
    }
}
