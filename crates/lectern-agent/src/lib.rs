//! Answer generation for Lectern.
//!
//! [`LlmClient`] talks to a provider (Anthropic, any OpenAI-compatible API, or
//! Gemini) through the [`LlmBackend`](backends::LlmBackend) trait.
//! [`ResponseGenerator`] runs one tool-augmented generation: a first call with
//! the tool definitions, at most one round of tool execution, then a final
//! call without tools. [`RagSystem`] is the orchestrator tying sessions,
//! retrieval tools and generation together.

pub mod backends;
pub mod config;
pub mod generator;
pub mod llm;
pub mod rag;

pub use config::{EmbeddingConfig, EmbeddingKind, LlmProvider, ModelConfig, RagConfig};
pub use generator::{Generation, ResponseGenerator, SYSTEM_PROMPT};
pub use llm::{LlmClient, LlmResponse};
pub use rag::{CourseAnalytics, QueryOutcome, RagSystem};
