use crate::backends::claude::ClaudeBackend;
use crate::backends::gemini::GeminiBackend;
use crate::backends::openai::OpenAiBackend;
use crate::backends::LlmBackend;
use crate::config::{LlmProvider, ModelConfig};
use lectern_core::{LecternResult, Message, ToolCall};
use lectern_tools::ToolDescriptor;

/// Response from the LLM: either text content or a tool call request.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmResponse {
    Text(String),
    ToolUse {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    Done(String),
}

impl LlmResponse {
    /// The textual part of the response; empty for a bare tool request.
    pub fn into_text(self) -> String {
        match self {
            LlmResponse::Text(text) | LlmResponse::Done(text) => text,
            LlmResponse::ToolUse { content, .. } => content.unwrap_or_default(),
        }
    }
}

/// LLM client that dispatches to the correct provider backend.
pub struct LlmClient {
    backend: Box<dyn LlmBackend>,
}

impl LlmClient {
    pub fn new(config: ModelConfig) -> Self {
        let backend: Box<dyn LlmBackend> = match config.provider {
            LlmProvider::Claude => Box::new(ClaudeBackend::new(config)),
            LlmProvider::OpenAi | LlmProvider::OpenRouter | LlmProvider::Groq => {
                Box::new(OpenAiBackend::new(config))
            }
            LlmProvider::Gemini => Box::new(GeminiBackend::new(config)),
        };
        Self { backend }
    }

    /// Create from a pre-built backend (for custom providers and tests).
    pub fn from_backend(backend: Box<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    pub async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> LecternResult<LlmResponse> {
        self.backend.chat(system_prompt, messages, tools).await
    }
}
