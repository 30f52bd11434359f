//! In-memory graph tool
//!
//! A small node/edge store exposed to scripts under the id `graph`:
//! - `graph.add_node(label)` — create a node, returns it
//! - `graph.add_edge(source, target, label)` — connect two nodes, returns the edge
//! - `graph.get_node(id)` — the node, or `None`
//! - `graph.list_nodes()` — every node in creation order
//! - `graph.remove_node(id)` — delete a node and its edges, returns whether it existed
//! - `graph.set_label(id, label)` — relabel a node, returns it
//!
//! The store sits behind an async mutex so several script contexts can share
//! one tool instance. In record mode every successful action is also published
//! on an `ActionBus`.

use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::{arg, required_arg, ActionDescriptor, BoxFuture, ToolArgs, ToolClient, ToolError};
use crate::events::{ActionBus, ActionEvent};
use crate::executor::types::Val;

/* ===================== Actions ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphAction {
    AddNode,
    AddEdge,
    GetNode,
    ListNodes,
    RemoveNode,
    SetLabel,
}

impl GraphAction {
    const ALL: [GraphAction; 6] = [
        GraphAction::AddNode,
        GraphAction::AddEdge,
        GraphAction::GetNode,
        GraphAction::ListNodes,
        GraphAction::RemoveNode,
        GraphAction::SetLabel,
    ];

    fn name(&self) -> &'static str {
        match self {
            GraphAction::AddNode => "add_node",
            GraphAction::AddEdge => "add_edge",
            GraphAction::GetNode => "get_node",
            GraphAction::ListNodes => "list_nodes",
            GraphAction::RemoveNode => "remove_node",
            GraphAction::SetLabel => "set_label",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            GraphAction::AddNode => "Create a node with a label",
            GraphAction::AddEdge => "Connect two existing nodes",
            GraphAction::GetNode => "Look up a node by id",
            GraphAction::ListNodes => "List all nodes",
            GraphAction::RemoveNode => "Delete a node and its edges",
            GraphAction::SetLabel => "Change a node's label",
        }
    }

    fn arg_names(&self) -> &'static [&'static str] {
        match self {
            GraphAction::AddNode => &["label"],
            GraphAction::AddEdge => &["source", "target", "label"],
            GraphAction::GetNode | GraphAction::RemoveNode => &["id"],
            GraphAction::ListNodes => &[],
            GraphAction::SetLabel => &["id", "label"],
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }
}

/* ===================== Store ===================== */

#[derive(Debug, Clone, Serialize)]
struct Node {
    id: u64,
    label: String,
}

#[derive(Debug, Clone, Serialize)]
struct Edge {
    id: u64,
    source: u64,
    target: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

#[derive(Debug, Default)]
struct GraphStore {
    next_id: u64,
    nodes: BTreeMap<u64, Node>,
    edges: BTreeMap<u64, Edge>,
}

impl GraphStore {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

fn to_val<T: Serialize>(item: &T) -> Result<Val, ToolError> {
    serde_json::to_value(item)
        .map(Val::from)
        .map_err(|e| ToolError::Failed(e.to_string()))
}

/* ===================== Tool ===================== */

pub struct GraphTool {
    id: String,
    store: Mutex<GraphStore>,
    recorder: Option<ActionBus>,
}

impl GraphTool {
    pub fn new() -> Self {
        Self::with_id("graph")
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            store: Mutex::new(GraphStore::default()),
            recorder: None,
        }
    }

    /// Publish every successful action on `bus`
    pub fn recording(mut self, bus: ActionBus) -> Self {
        self.recorder = Some(bus);
        self
    }

    pub async fn node_count(&self) -> usize {
        self.store.lock().await.nodes.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.store.lock().await.edges.len()
    }

    async fn execute(&self, action: GraphAction, args: &ToolArgs) -> Result<Val, ToolError> {
        let name = action.name();
        let mut store = self.store.lock().await;

        match action {
            GraphAction::AddNode => {
                let label = required_arg(args, name, "label", 0)?.to_string();
                let id = store.allocate_id();
                let node = Node { id, label };
                let val = to_val(&node)?;
                store.nodes.insert(id, node);
                Ok(val)
            }
            GraphAction::AddEdge => {
                let source = node_id(args, name, "source", 0)?;
                let target = node_id(args, name, "target", 1)?;
                for (arg_name, id) in [("source", source), ("target", target)] {
                    if !store.nodes.contains_key(&id) {
                        return Err(ToolError::InvalidArgument {
                            action: name.to_string(),
                            arg: arg_name.to_string(),
                            message: format!("no node with id {}", id),
                        });
                    }
                }
                let label = arg(args, "label", 2)
                    .filter(|v| !v.is_nullish())
                    .map(|v| v.to_string());
                let id = store.allocate_id();
                let edge = Edge {
                    id,
                    source,
                    target,
                    label,
                };
                let val = to_val(&edge)?;
                store.edges.insert(id, edge);
                Ok(val)
            }
            GraphAction::GetNode => {
                let id = node_id(args, name, "id", 0)?;
                match store.nodes.get(&id) {
                    Some(node) => to_val(node),
                    None => Ok(Val::Null),
                }
            }
            GraphAction::ListNodes => store
                .nodes
                .values()
                .map(to_val)
                .collect::<Result<Vec<_>, _>>()
                .map(Val::List),
            GraphAction::RemoveNode => {
                let id = node_id(args, name, "id", 0)?;
                let existed = store.nodes.remove(&id).is_some();
                store
                    .edges
                    .retain(|_, edge| edge.source != id && edge.target != id);
                Ok(Val::Bool(existed))
            }
            GraphAction::SetLabel => {
                let id = node_id(args, name, "id", 0)?;
                let label = required_arg(args, name, "label", 1)?.to_string();
                let node = store.nodes.get_mut(&id).ok_or_else(|| ToolError::InvalidArgument {
                    action: name.to_string(),
                    arg: "id".to_string(),
                    message: format!("no node with id {}", id),
                })?;
                node.label = label;
                to_val(node)
            }
        }
    }
}

impl Default for GraphTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Node ids are accepted as numbers or as node objects carrying an `id`.
fn node_id(args: &ToolArgs, action: &str, name: &str, position: usize) -> Result<u64, ToolError> {
    let value = required_arg(args, action, name, position)?;
    let id = match value {
        Val::Obj(map) => map.get("id").and_then(Val::as_num),
        other => other.as_num(),
    };
    match id {
        Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as u64),
        _ => Err(ToolError::InvalidArgument {
            action: action.to_string(),
            arg: name.to_string(),
            message: format!("expected a node id, got {}", value.type_name()),
        }),
    }
}

impl ToolClient for GraphTool {
    fn id(&self) -> &str {
        &self.id
    }

    fn list_actions(&self) -> Vec<ActionDescriptor> {
        GraphAction::ALL
            .iter()
            .map(|a| ActionDescriptor::new(a.name(), a.description(), a.arg_names()))
            .collect()
    }

    fn invoke<'a>(
        &'a self,
        action: &'a str,
        args: ToolArgs,
    ) -> BoxFuture<'a, Result<Val, ToolError>> {
        Box::pin(async move {
            let graph_action =
                GraphAction::from_name(action).ok_or_else(|| ToolError::UnknownAction {
                    tool: self.id.clone(),
                    action: action.to_string(),
                })?;

            let result = self.execute(graph_action, &args).await?;

            if let Some(bus) = &self.recorder {
                bus.publish(ActionEvent::new(self.id.clone(), action, args));
            }
            Ok(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    fn obj_field(val: &Val, key: &str) -> Val {
        match val {
            Val::Obj(map) => map.get(key).cloned().unwrap_or(Val::Undefined),
            other => panic!("Expected object, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_and_get_node() {
        let graph = GraphTool::new();
        let node = graph
            .invoke("add_node", hashmap! { "label".to_string() => Val::from("A") })
            .await
            .unwrap();
        assert_eq!(obj_field(&node, "label"), Val::from("A"));
        let id = obj_field(&node, "id");

        let fetched = graph
            .invoke("get_node", hashmap! { "0".to_string() => id })
            .await
            .unwrap();
        assert_eq!(fetched, node);

        let missing = graph
            .invoke("get_node", hashmap! { "id".to_string() => Val::Num(99.0) })
            .await
            .unwrap();
        assert_eq!(missing, Val::Null);
    }

    #[tokio::test]
    async fn test_edges_require_existing_nodes() {
        let graph = GraphTool::new();
        let a = graph
            .invoke("add_node", hashmap! { "0".to_string() => Val::from("a") })
            .await
            .unwrap();
        let b = graph
            .invoke("add_node", hashmap! { "0".to_string() => Val::from("b") })
            .await
            .unwrap();

        graph
            .invoke(
                "add_edge",
                hashmap! { "0".to_string() => a.clone(), "1".to_string() => b },
            )
            .await
            .unwrap();
        assert_eq!(graph.edge_count().await, 1);

        let err = graph
            .invoke(
                "add_edge",
                hashmap! { "source".to_string() => a, "target".to_string() => Val::Num(42.0) },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { ref arg, .. } if arg == "target"));
    }

    #[tokio::test]
    async fn test_remove_node_drops_edges() {
        let graph = GraphTool::new();
        for label in ["a", "b"] {
            graph
                .invoke("add_node", hashmap! { "0".to_string() => Val::from(label) })
                .await
                .unwrap();
        }
        graph
            .invoke(
                "add_edge",
                hashmap! { "0".to_string() => Val::Num(1.0), "1".to_string() => Val::Num(2.0) },
            )
            .await
            .unwrap();

        let removed = graph
            .invoke("remove_node", hashmap! { "0".to_string() => Val::Num(1.0) })
            .await
            .unwrap();
        assert_eq!(removed, Val::Bool(true));
        assert_eq!(graph.node_count().await, 1);
        assert_eq!(graph.edge_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let graph = GraphTool::new();
        let err = graph.invoke("explode", ToolArgs::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownAction { .. }));
    }

    #[tokio::test]
    async fn test_recording_publishes_events() {
        let bus = ActionBus::new(8);
        let mut rx = bus.subscribe();
        let graph = GraphTool::new().recording(bus);

        graph
            .invoke("add_node", hashmap! { "label".to_string() => Val::from("A") })
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.to_statement(), r#"graph.add_node(label="A")"#);
    }
}
