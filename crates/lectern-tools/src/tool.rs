use async_trait::async_trait;
use lectern_core::{LecternResult, ToolCall};
use serde::{Deserialize, Serialize};

/// Interface of a tool as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

/// Text handed back to the model, plus the sources it cites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub result: String,
    pub sources: Vec<String>,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            ..Self::default()
        }
    }

    pub fn with_sources(result: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            result: result.into(),
            sources,
            is_error: false,
        }
    }

    pub fn error(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            sources: Vec::new(),
            is_error: true,
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    async fn execute(&self, call: &ToolCall) -> LecternResult<ToolOutput>;
}
