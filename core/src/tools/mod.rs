//! Tool registry
//!
//! A tool is an external capability the script can call by id, e.g.
//! `graph.add_node(label="A")`. Tools are registered by the host; the VM only
//! looks them up. The registry is a flat map from id to a trait object, and
//! one process-wide instance is shared by every context unless a host hands a
//! context its own.

pub mod graph;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use thiserror::Error;

use crate::executor::types::Val;

pub use graph::GraphTool;

/* ===================== Tool Contract ===================== */

/// Boxed future returned by `ToolClient::invoke`
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Evaluated call arguments. Positional arguments are keyed `"0"`, `"1"`, …
pub type ToolArgs = HashMap<String, Val>;

/// Description of one action a tool offers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub name: String,
    pub description: String,
    pub arg_names: Vec<String>,
}

impl ActionDescriptor {
    pub fn new(name: &str, description: &str, arg_names: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            arg_names: arg_names.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A registrable capability exposing named asynchronous actions
///
/// Arguments arrive already evaluated; the return value is stored into a
/// variable or discarded by the caller. Implementations own any shared state
/// they touch and do their own locking.
pub trait ToolClient: Send + Sync {
    fn id(&self) -> &str;

    fn list_actions(&self) -> Vec<ActionDescriptor>;

    fn invoke<'a>(
        &'a self,
        action: &'a str,
        args: ToolArgs,
    ) -> BoxFuture<'a, Result<Val, ToolError>>;
}

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("tool '{tool}' has no action '{action}'")]
    UnknownAction { tool: String, action: String },

    #[error("{action}: missing argument '{arg}'")]
    MissingArgument { action: String, arg: String },

    #[error("{action}: invalid argument '{arg}': {message}")]
    InvalidArgument {
        action: String,
        arg: String,
        message: String,
    },

    #[error("{0}")]
    Failed(String),
}

/// Fetch an argument by name, falling back to its position.
pub fn arg<'a>(args: &'a ToolArgs, name: &str, position: usize) -> Option<&'a Val> {
    args.get(name)
        .or_else(|| args.get(&position.to_string()))
        .filter(|v| !matches!(v, Val::Undefined))
}

/// Like `arg`, but a missing argument is an error.
pub fn required_arg<'a>(
    args: &'a ToolArgs,
    action: &str,
    name: &str,
    position: usize,
) -> Result<&'a Val, ToolError> {
    arg(args, name, position).ok_or_else(|| ToolError::MissingArgument {
        action: action.to_string(),
        arg: name.to_string(),
    })
}

/* ===================== Registry ===================== */

static GLOBAL: OnceLock<Arc<ToolRegistry>> = OnceLock::new();

#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn ToolClient>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> Arc<ToolRegistry> {
        GLOBAL.get_or_init(|| Arc::new(ToolRegistry::new())).clone()
    }

    /// Register a tool under its id, returning any tool it replaced.
    pub fn register(&self, tool: Arc<dyn ToolClient>) -> Option<Arc<dyn ToolClient>> {
        let id = tool.id().to_string();
        tracing::debug!(tool = %id, "registering tool");
        self.tools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tool)
    }

    pub fn unregister(&self, id: &str) -> Option<Arc<dyn ToolClient>> {
        tracing::debug!(tool = %id, "unregistering tool");
        self.tools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<dyn ToolClient>> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lookup(id).is_some()
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.ids())
            .finish()
    }
}
