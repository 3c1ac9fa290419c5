use thiserror::Error;

/// Main error type for the tailwind-purge crate
#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid extractor pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("No files found matching the content patterns")]
    NoFilesFound,

    #[error("Failed to write output to {path}: {message}")]
    OutputError { path: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },

    #[error("Tailwind processing error: {0}")]
    TailwindError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Input error: {0}")]
    InputError(String),

    #[error("Security violation: {0}")]
    SecurityError(String),
}

pub type Result<T> = std::result::Result<T, PurgeError>;
