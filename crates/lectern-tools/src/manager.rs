use crate::tool::{Tool, ToolDescriptor, ToolOutput};
use lectern_core::ToolCall;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// Registry of tools, dispatched by name.
///
/// Sources reported by executed tools accumulate (deduplicated, in order)
/// until [`ToolManager::reset_sources`] is called.
pub struct ToolManager {
    tools: Vec<Arc<dyn Tool>>,
    last_sources: Mutex<Vec<String>>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            last_sources: Mutex::new(Vec::new()),
        }
    }

    /// Register a tool. A tool with the same name is replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.descriptor().name.clone();
        info!(tool = %name, "Registered tool");
        match self.tools.iter_mut().find(|t| t.descriptor().name == name) {
            Some(slot) => *slot = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.descriptor().name == name)
    }

    /// Descriptors of every registered tool, in registration order.
    pub fn definitions(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor().clone()).collect()
    }

    /// Run a tool call. Unknown tools and tool failures come back as error
    /// output rather than `Err`, so the text can be shown to the model.
    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let Some(tool) = self.get(&call.name) else {
            warn!(tool = %call.name, "Model requested unknown tool");
            return ToolOutput::error(format!("Tool '{}' not found", call.name));
        };

        let output = match tool.execute(call).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                return ToolOutput::error(format!("Tool '{}' failed: {e}", call.name));
            }
        };

        if !output.sources.is_empty() {
            let mut sources = self.last_sources.lock();
            for source in &output.sources {
                if !sources.contains(source) {
                    sources.push(source.clone());
                }
            }
        }
        output
    }

    pub fn last_sources(&self) -> Vec<String> {
        self.last_sources.lock().clone()
    }

    pub fn reset_sources(&self) {
        self.last_sources.lock().clear();
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}
