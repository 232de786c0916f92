use thiserror::Error;

/// Main error type for cloudready operations
#[derive(Error, Debug)]
pub enum CloudReadyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No files available to analyze")]
    NoFiles,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("LLM request timed out after {0}s")]
    LlmTimeout(u64),

    #[error("Crawl error: {0}")]
    Crawl(String),

    #[error("Unknown progress phase: {0}")]
    UnknownPhase(String),

    #[error("Analysis task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, CloudReadyError>;
