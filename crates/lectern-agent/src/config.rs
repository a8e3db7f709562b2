use lectern_core::{LecternError, LecternResult};
use lectern_retrieval::{EmbeddingProvider, LocalEmbedding, OpenAiEmbedding, StoreOptions};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Claude,
    OpenAi,
    OpenRouter,
    /// Groq cloud inference, OpenAI-compatible API.
    Groq,
    /// Google Gemini `generateContent` API.
    Gemini,
}

impl LlmProvider {
    /// Environment variable consulted when no key is configured.
    pub fn api_key_env(self) -> &'static str {
        match self {
            LlmProvider::Claude => "ANTHROPIC_API_KEY",
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::OpenRouter => "OPENROUTER_API_KEY",
            LlmProvider::Groq => "GROQ_API_KEY",
            LlmProvider::Gemini => "GEMINI_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: LlmProvider,
    pub model_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_tokens() -> u32 {
    800
}

impl ModelConfig {
    pub fn new(
        provider: LlmProvider,
        model_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            api_key: api_key.into(),
            api_base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url.trim_end_matches('/')
        } else {
            match self.provider {
                LlmProvider::Claude => "https://api.anthropic.com",
                LlmProvider::OpenAi => "https://api.openai.com",
                LlmProvider::OpenRouter => "https://openrouter.ai/api",
                LlmProvider::Groq => "https://api.groq.com/openai",
                LlmProvider::Gemini => "https://generativelanguage.googleapis.com",
            }
        }
    }

    /// Fill an empty `api_key` from the provider's environment variable.
    pub fn with_env_api_key(mut self) -> Self {
        if self.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var(self.provider.api_key_env()) {
                self.api_key = key;
            }
        }
        self
    }

    pub fn validate(&self) -> LecternResult<()> {
        if self.model_id.trim().is_empty() {
            return Err(LecternError::Config("model.model_id must not be empty".into()));
        }
        if self.api_key.trim().is_empty() {
            return Err(LecternError::Config(format!(
                "No API key configured: set model.api_key or {}",
                self.provider.api_key_env()
            )));
        }
        Ok(())
    }
}

/// Retrieval and conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_results: usize,
    /// Exchanges (user + assistant pairs) kept per session.
    pub max_history: usize,
    pub course_match_threshold: f32,
    /// Folder ingested when the server starts.
    pub docs_dir: Option<PathBuf>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
            max_results: 5,
            max_history: 2,
            course_match_threshold: 0.2,
            docs_dir: None,
        }
    }
}

impl RagConfig {
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            max_results: self.max_results,
            match_threshold: self.course_match_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingKind {
    #[default]
    Local,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingKind,
    pub dimension: usize,
    pub model: String,
    /// Empty means `OPENAI_API_KEY`.
    pub api_key: String,
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingKind::Local,
            dimension: 256,
            model: "text-embedding-3-small".to_string(),
            api_key: String::new(),
            base_url: "https://api.openai.com".to_string(),
        }
    }
}

impl EmbeddingConfig {
    pub fn build(&self) -> LecternResult<Arc<dyn EmbeddingProvider>> {
        match self.provider {
            EmbeddingKind::Local => Ok(Arc::new(LocalEmbedding::new(self.dimension))),
            EmbeddingKind::OpenAi => {
                let api_key = if self.api_key.trim().is_empty() {
                    std::env::var("OPENAI_API_KEY").map_err(|_| {
                        LecternError::Config(
                            "OpenAI embeddings need embedding.api_key or OPENAI_API_KEY".into(),
                        )
                    })?
                } else {
                    self.api_key.clone()
                };
                Ok(Arc::new(OpenAiEmbedding::new(
                    &self.base_url,
                    &api_key,
                    &self.model,
                    self.dimension,
                )?))
            }
        }
    }
}
