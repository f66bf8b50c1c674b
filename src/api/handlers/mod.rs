//! Endpoint handlers, one module per route family.

pub mod agent;
pub mod health;
pub mod mcp;
pub mod system;
