//! # Deskpilot Core - Tool Invocation and Session Status
//!
//! Control core behind the desktop-agent control surface:
//! - Tool registry with declarative parameter schemas
//! - Bounded-timeout tool invocation with a newest-first execution history
//! - Usage statistics derived from the history
//! - Gateway status tracking and restart relay
//! - Multi-subsystem health aggregation (healthy / degraded / down)
//! - Session-keyed desktop sandbox dispatch
//! - JSON/HTTP API for the browser UI
//!
//! ## Architecture
//!
//! Registry and history live in one [`control::ControlState`] behind an async
//! mutex; every other component holds a clone of that handle:
//! ```text
//!                    ┌──────────────────────────────────┐
//!   HTTP requests →  │            ControlState          │
//!                    │  ┌──────────┐   ┌─────────────┐  │
//!                    │  │ Registry │   │   History   │  │
//!                    │  └──────────┘   └─────────────┘  │
//!                    └──────▲──────────────▲────────────┘
//!                           │              │
//!          HealthAggregator ┘              └ ToolInvoker ──→ ToolHandler
//!                 │                                        (gateway / desktop)
//!                 └──→ GatewayStatusTracker, probes
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod agent;
pub mod api;
pub mod control;
pub mod desktop;
pub mod status;
pub mod system;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;
pub mod validation;

pub use types::{Config, Error, Result};
