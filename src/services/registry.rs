//! Tool Provider Registry
//!
//! Read-only view over the providers registered for a run. Only enabled and
//! connected providers contribute tools; "default" providers are the ones
//! trusted to execute without human confirmation.

use taskweave_core::ToolCall;

use crate::models::{ToolInfo, ToolProviderInfo};

pub struct ToolProviderRegistry {
    providers: Vec<ToolProviderInfo>,
}

impl ToolProviderRegistry {
    pub fn new(providers: Vec<ToolProviderInfo>) -> Self {
        Self { providers }
    }

    /// Tools exposed to the model: the union over available providers.
    pub fn available_tools(&self) -> Vec<ToolInfo> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .flat_map(|p| p.tools.iter().cloned())
            .collect()
    }

    /// Resolve the available provider owning a tool.
    pub fn find_provider(&self, tool_name: &str) -> Option<&ToolProviderInfo> {
        self.providers
            .iter()
            .find(|p| p.is_available() && p.has_tool(tool_name))
    }

    /// Whether any available provider exposes the tool.
    pub fn has_tool(&self, tool_name: &str) -> bool {
        self.find_provider(tool_name).is_some()
    }

    /// Whether every call resolves to a default provider. Mixed sets fail
    /// this check and are routed to confirmation as a whole.
    pub fn all_default(&self, calls: &[ToolCall]) -> bool {
        calls.iter().all(|call| {
            self.find_provider(&call.function.name)
                .map(|p| p.is_default)
                .unwrap_or(false)
        })
    }
}
