//! Taskweave Core
//!
//! Foundational types for the Taskweave workspace. This crate has zero
//! dependencies on application-level code (orchestrators, backends, UI).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `message` - Conversation message model (`ConversationMessage`, `ToolCall`)
//! - `streaming` - Turn stream event types (`StreamEvent`)
//! - `partial_json` - Best-effort extraction of streamed JSON (`PartialJson`)
//!
//! ## Design Principles
//!
//! 1. **Minimal dependencies** - serde/thiserror/chrono/uuid only
//! 2. **Unidirectional dependency** - this crate depends on nothing else in
//!    the workspace
//! 3. **No panics across boundaries** - the partial parser degrades, never
//!    throws

pub mod error;
pub mod message;
pub mod partial_json;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Conversation Model ─────────────────────────────────────────────────
pub use message::{
    AgentAction, AgentRole, ConversationMessage, Role, ToolCall, ToolFunction,
};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::StreamEvent;

// ── Partial JSON ───────────────────────────────────────────────────────
pub use partial_json::{extract_json_candidate, parse_partial_json, PartialJson};
