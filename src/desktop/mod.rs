//! Desktop sessions - sandbox handles keyed by session, and the action handler.

pub mod actions;
pub mod sandbox;

pub use actions::ComputerActionHandler;
pub use sandbox::{DesktopSandbox, SandboxFactory, SessionManager};
