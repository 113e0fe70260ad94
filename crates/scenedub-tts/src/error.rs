//! Error types for speech synthesis

use thiserror::Error;

/// Speech synthesis error types
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Engine binary is missing from the host
    #[error("speech engine not available: {0}")]
    Unavailable(String),

    /// Engine ran but did not produce usable audio
    #[error("synthesis failed: {0}")]
    Failed(String),

    /// The run was cancelled while the engine was in flight
    #[error("synthesis cancelled")]
    Cancelled,

    /// IO error (scratch files, process plumbing)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for synthesis operations
pub type SynthesisResult<T> = Result<T, SynthesisError>;
