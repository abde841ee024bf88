//! Tool Provider Model
//!
//! Describes the external tool providers visible to a run. Providers are
//! registered by the host; only enabled and connected providers contribute
//! tools, and only "default" providers may execute without confirmation.

use serde::{Deserialize, Serialize};

/// One callable tool exposed by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A registered tool provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolProviderInfo {
    /// Stable key used when dispatching tool calls
    pub key: String,
    pub name: String,
    /// Disabled providers are invisible to the model
    pub enabled: bool,
    /// Providers that lost their connection are invisible too
    pub connected: bool,
    /// Default providers execute without human confirmation
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub tools: Vec<ToolInfo>,
}

impl ToolProviderInfo {
    /// Whether this provider currently contributes tools.
    pub fn is_available(&self) -> bool {
        self.enabled && self.connected
    }

    /// Whether this provider owns a tool with the given name.
    pub fn has_tool(&self, tool_name: &str) -> bool {
        self.tools.iter().any(|t| t.name == tool_name)
    }
}
