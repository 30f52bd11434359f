pub mod cli;
pub mod config;
pub mod events;
pub mod executor;
pub mod parser;
pub mod tools;

// Re-export the embedding API
pub use events::{ActionBus, ActionEvent, ScriptRecorder};
pub use executor::{run_until_done, step, Context, RunError, RunLimits, RuntimeError, Status, Val};
pub use parser::{parse, ParseError, Program};
pub use tools::{ActionDescriptor, ToolClient, ToolError, ToolRegistry};
