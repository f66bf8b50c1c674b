//! Control state - the single owner of the shared mutable tables.
//!
//! The registry's status column and the execution history are the only
//! shared mutable resources. Both live here, behind one async mutex, so the
//! invoker's validate-then-append sequence and the history's eviction are
//! serialized. The lock is never held across a handler call.

use crate::tools::{ExecutionHistory, Tool, ToolRegistry};
use crate::types::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handle shared by the invoker, the health aggregator and the API layer.
pub type SharedControl = Arc<Mutex<ControlState>>;

/// Registry plus history, owned together.
#[derive(Debug)]
pub struct ControlState {
    registry: ToolRegistry,
    history: ExecutionHistory,
}

impl ControlState {
    pub fn new(registry: ToolRegistry, history: ExecutionHistory) -> Self {
        Self { registry, history }
    }

    /// Load tool definitions (or the built-in catalog) with a history of the given size.
    pub fn from_definitions(tools: Vec<Tool>, history_capacity: usize) -> Result<Self> {
        Ok(Self::new(
            ToolRegistry::load(tools)?,
            ExecutionHistory::new(history_capacity),
        ))
    }

    pub fn shared(self) -> SharedControl {
        Arc::new(Mutex::new(self))
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.registry
    }

    pub fn history(&self) -> &ExecutionHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ExecutionHistory {
        &mut self.history
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(ToolRegistry::new(), ExecutionHistory::default())
    }
}
