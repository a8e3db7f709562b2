pub mod claude;
pub mod gemini;
pub mod openai;

use crate::llm::LlmResponse;
use lectern_core::{LecternResult, Message};
use lectern_tools::ToolDescriptor;
use async_trait::async_trait;

/// Trait for LLM provider backends.
///
/// Each provider (Claude, OpenAI-compatible, Gemini) implements this trait
/// to handle API communication.
///
/// To add a new provider:
/// 1. Create a new module in `backends/`
/// 2. Implement `LlmBackend` for your struct
/// 3. Add the variant to `LlmProvider` enum in `config.rs`
/// 4. Wire it up in `LlmClient::new()` in `llm.rs`
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Non-streaming chat completion. An empty `tools` slice sends no tool
    /// definitions, so the model must answer in text.
    async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> LecternResult<LlmResponse>;
}
