//! API Module
//!
//! Structure:
//! - commands.rs: command functions for the GUI / CLI shell
//! - state.rs: engine state the commands operate on
//! - engine_status.rs: status payloads
//!
//! Usage:
//! - `api::commands::predict_yield(request)` - Direct access
//! - `api::predict_yield(request)` - Re-exported

pub mod commands;
pub mod engine_status;
pub mod state;

// Re-export current commands as default
pub use commands::*;
pub use engine_status::EngineStatus;
pub use state::AppState;
