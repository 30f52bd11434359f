//! Test helpers for executor tests
//!
//! Common utilities for parsing scripts, capturing host callbacks, and a small
//! in-memory tool to dispatch to.

use crate::executor::Val;
use crate::executor::{run_until_done, Context, RunError, RunLimits};
use crate::parser::{parse, Program};
use crate::tools::{
    arg, required_arg, ActionDescriptor, BoxFuture, ToolArgs, ToolClient, ToolError, ToolRegistry,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Lines received by a context's log hook
pub type Logs = Arc<Mutex<Vec<String>>>;

/// Parse a script that is expected to compile
pub fn compile(source: &str) -> Program {
    let program = parse(source);
    assert!(program.is_ok(), "Parse failed: {:?}", program.error);
    program
}

/// Context on `registry` whose log lines are collected
pub fn capture(registry: Arc<ToolRegistry>) -> (Context, Logs) {
    let logs: Logs = Arc::new(Mutex::new(Vec::new()));
    let sink = logs.clone();
    let ctx = Context::with_registry(registry).on_log(move |line| {
        sink.lock().unwrap().push(line.to_string());
    });
    (ctx, logs)
}

pub fn lines(logs: &Logs) -> Vec<String> {
    logs.lock().unwrap().clone()
}

/// Registry holding one fresh `Counter`
pub fn counter_registry() -> (Arc<ToolRegistry>, Arc<Counter>) {
    let registry = Arc::new(ToolRegistry::new());
    let counter = Arc::new(Counter::default());
    registry.register(counter.clone());
    (registry, counter)
}

/// Run to completion against an empty registry, expecting success
pub async fn run_script(source: &str) -> (Context, Vec<String>) {
    run_script_with(source, Arc::new(ToolRegistry::new())).await
}

pub async fn run_script_with(source: &str, registry: Arc<ToolRegistry>) -> (Context, Vec<String>) {
    let program = compile(source);
    let (mut ctx, logs) = capture(registry);
    run_until_done(&program, &mut ctx, RunLimits::unlimited())
        .await
        .expect("Script failed");
    (ctx, lines(&logs))
}

/// Run a script that is expected to fail
pub async fn run_failing(
    source: &str,
    registry: Arc<ToolRegistry>,
) -> (Context, RunError, Vec<String>) {
    let program = compile(source);
    let (mut ctx, logs) = capture(registry);
    let err = run_until_done(&program, &mut ctx, RunLimits::unlimited())
        .await
        .expect_err("Script should have failed");
    (ctx, err, lines(&logs))
}

/* ===================== Test Tool ===================== */

/// Tool `counter`:
/// - `hit(amount=1)` adds to a running total and returns it
/// - `echo(value)` returns its argument
/// - `fail()` always fails
#[derive(Default)]
pub struct Counter {
    total: AtomicUsize,
}

impl Counter {
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl ToolClient for Counter {
    fn id(&self) -> &str {
        "counter"
    }

    fn list_actions(&self) -> Vec<ActionDescriptor> {
        vec![
            ActionDescriptor::new("hit", "Add to the total", &["amount"]),
            ActionDescriptor::new("echo", "Return the argument", &["value"]),
            ActionDescriptor::new("fail", "Always fails", &[]),
        ]
    }

    fn invoke<'a>(
        &'a self,
        action: &'a str,
        args: ToolArgs,
    ) -> BoxFuture<'a, Result<Val, ToolError>> {
        Box::pin(async move {
            match action {
                "hit" => {
                    let amount = arg(&args, "amount", 0)
                        .and_then(Val::as_num)
                        .unwrap_or(1.0) as usize;
                    let total = self.total.fetch_add(amount, Ordering::SeqCst) + amount;
                    Ok(Val::Num(total as f64))
                }
                "echo" => Ok(required_arg(&args, action, "value", 0)?.clone()),
                "fail" => Err(ToolError::Failed("boom".to_string())),
                _ => Err(ToolError::UnknownAction {
                    tool: "counter".to_string(),
                    action: action.to_string(),
                }),
            }
        })
    }
}
