//! Built-in value methods
//!
//! When a call's target names a variable rather than a registered tool, the
//! call is a method on the variable's value:
//!
//! - lists: `append`, `pop`, `remove`, `clear`, `length`
//! - strings: `split`, `replace`, `lower`, `upper`, `length`
//!
//! List methods mutate the variable in place. String methods return a new
//! value and leave the variable untouched.

pub mod list;
pub mod string;

use std::collections::HashMap;

use super::errors::RuntimeError;
use super::expressions::Vars;
use super::types::Val;

/* ===================== Dispatcher ===================== */

/// Call `method` on the value stored in `target`
pub fn call_method(
    line: usize,
    target: &str,
    method: &str,
    args: &HashMap<String, Val>,
    vars: &mut Vars,
) -> Result<Val, RuntimeError> {
    let call = MethodCall { line, method, args };

    match vars.get_mut(target) {
        Some(Val::List(items)) => list::call(&call, items),
        Some(Val::Str(s)) => string::call(&call, s),
        Some(other) => Err(call.unknown(other.type_name())),
        None => Err(RuntimeError::UnknownCall {
            line,
            target: target.to_string(),
            action: method.to_string(),
        }),
    }
}

/* ===================== Argument Access ===================== */

/// One method invocation with its already-evaluated arguments
pub struct MethodCall<'a> {
    pub line: usize,
    pub method: &'a str,
    pub args: &'a HashMap<String, Val>,
}

impl<'a> MethodCall<'a> {
    /// Positional argument `idx`, if given
    pub fn arg(&self, idx: usize) -> Option<&'a Val> {
        self.args.get(&idx.to_string())
    }

    /// Positional argument `idx`, failing if it is missing
    pub fn required(&self, idx: usize) -> Result<&'a Val, RuntimeError> {
        self.arg(idx)
            .ok_or_else(|| self.invalid(format!("missing argument {}", idx + 1)))
    }

    pub fn invalid(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::InvalidArgument {
            line: self.line,
            method: self.method.to_string(),
            message: message.into(),
        }
    }

    pub fn unknown(&self, kind: &'static str) -> RuntimeError {
        RuntimeError::UnknownMethod {
            line: self.line,
            kind,
            method: self.method.to_string(),
        }
    }
}
