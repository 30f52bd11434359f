//! Action recording
//!
//! Live interactions with a tool are published as `ActionEvent`s on an
//! `ActionBus`. Subscribers receive them on their own schedule, decoupled from
//! the call that produced them. `ScriptRecorder` is the subscriber a script
//! editor uses in record mode: it turns every event into a literal call
//! statement and appends it to its source, so the interaction can be replayed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::executor::types::Val;

/* ===================== Events ===================== */

/// One recorded tool action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub tool_id: String,
    pub action: String,
    pub args: HashMap<String, Val>,
    pub recorded_at: DateTime<Utc>,
}

impl ActionEvent {
    pub fn new(
        tool_id: impl Into<String>,
        action: impl Into<String>,
        args: HashMap<String, Val>,
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            action: action.into(),
            args,
            recorded_at: Utc::now(),
        }
    }

    /// Render as a call statement, e.g. `graph.add_node(label="A")`.
    ///
    /// Positional arguments come first in position order, then named
    /// arguments sorted by name.
    pub fn to_statement(&self) -> String {
        let mut positional: Vec<(usize, &Val)> = Vec::new();
        let mut named: Vec<(&str, &Val)> = Vec::new();
        for (name, value) in &self.args {
            match name.parse::<usize>() {
                Ok(pos) => positional.push((pos, value)),
                Err(_) => named.push((name, value)),
            }
        }
        positional.sort_by_key(|(pos, _)| *pos);
        named.sort_by_key(|(name, _)| *name);

        let args: Vec<String> = positional
            .into_iter()
            .map(|(_, v)| render_literal(v))
            .chain(
                named
                    .into_iter()
                    .map(|(name, v)| format!("{}={}", name, render_literal(v))),
            )
            .collect();

        format!("{}.{}({})", self.tool_id, self.action, args.join(", "))
    }
}

/// Script literal for a value. Objects have no literal form and are recorded
/// as their JSON text.
pub fn render_literal(value: &Val) -> String {
    match value {
        Val::Undefined | Val::Null => "None".to_string(),
        Val::Bool(true) => "True".to_string(),
        Val::Bool(false) => "False".to_string(),
        Val::Num(_) => value.to_string(),
        Val::Str(s) => quote(s),
        Val::List(items) => {
            let inner: Vec<String> = items.iter().map(render_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        Val::Obj(_) => quote(&value.to_string()),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/* ===================== Bus ===================== */

const BUS_CAPACITY: usize = 256;

static GLOBAL_BUS: OnceLock<ActionBus> = OnceLock::new();

/// Broadcast channel for action events
#[derive(Debug, Clone)]
pub struct ActionBus {
    tx: broadcast::Sender<ActionEvent>,
}

impl ActionBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// The process-wide bus
    pub fn global() -> &'static ActionBus {
        GLOBAL_BUS.get_or_init(|| ActionBus::new(BUS_CAPACITY))
    }

    /// Publish without waiting for anyone. Returns how many subscribers will
    /// see the event; zero subscribers is not an error.
    pub fn publish(&self, event: ActionEvent) -> usize {
        tracing::debug!(tool = %event.tool_id, action = %event.action, "action recorded");
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActionEvent> {
        self.tx.subscribe()
    }
}

impl Default for ActionBus {
    fn default() -> Self {
        Self::new(BUS_CAPACITY)
    }
}

/* ===================== Recorder ===================== */

/// Appends one call statement per received event to a script source
#[derive(Debug)]
pub struct ScriptRecorder {
    source: String,
    rx: broadcast::Receiver<ActionEvent>,
}

impl ScriptRecorder {
    pub fn new(bus: &ActionBus, source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            rx: bus.subscribe(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn into_source(self) -> String {
        self.source
    }

    /// Wait for the next event and append it. Returns the appended line, or
    /// `None` once the bus is gone.
    pub async fn record_next(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(self.append(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "recorder fell behind; actions were dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Append every event already waiting, without blocking. Returns how many
    /// lines were added.
    pub fn drain(&mut self) -> usize {
        let mut added = 0;
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.append(&event);
                    added += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "recorder fell behind; actions were dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return added,
            }
        }
    }

    fn append(&mut self, event: &ActionEvent) -> String {
        let line = event.to_statement();
        if !self.source.is_empty() && !self.source.ends_with('\n') {
            self.source.push('\n');
        }
        self.source.push_str(&line);
        line
    }
}
