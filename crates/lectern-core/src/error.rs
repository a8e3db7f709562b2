use thiserror::Error;

pub type LecternResult<T> = Result<T, LecternError>;

/// Top-level error type. Each variant corresponds to a subsystem.
#[derive(Error, Debug)]
pub enum LecternError {
    /// Generation loop failures (malformed provider output, missing text).
    #[error("Agent error: {0}")]
    Agent(String),

    /// Outbound HTTP failures (LLM or embedding API calls).
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Tool error: {0}")]
    Tool(String),

    /// Vector collection or embedding failures.
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Course document parsing or ingestion failures.
    #[error("Document error: {0}")]
    Document(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
