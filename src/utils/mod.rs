//! Utilities
//!
//! Shared helpers for the orchestration crate.

pub mod error;

pub use error::{AgentError, AgentResult};
