//! Tool infrastructure - registry, invocation, history and usage stats.
//!
//! The registry and the history are the shared tables (see [`crate::control`]).
//! The invoker is the only writer of the history; everything else reads.

pub mod handler;
pub mod history;
pub mod invoker;
pub mod registry;
pub mod stats;

pub use handler::{EchoHandler, GatewayToolHandler, HandlerSet, ToolCall, ToolHandler};
pub use history::{ExecutionHistory, ExecutionResult, DEFAULT_HISTORY_CAPACITY};
pub use invoker::{ExecutionRequest, ExecutionStatus, ToolInvoker, TIMEOUT_ERROR};
pub use registry::{
    builtin_tools, ParamDef, ParamType, Tool, ToolCategory, ToolRegistry, ToolStatus,
};
pub use stats::{UsageStats, UsageStatsCollector};
