//! Error taxonomy for dialogue assembly.

use scenedub_audio::AudioFormat;
use scenedub_tts::SynthesisError;
use thiserror::Error;

/// How a run can fail. Output is all-or-nothing: any of these means no
/// partial WAV was produced.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// No usable line survived sanitization
    #[error("script is empty after sanitization")]
    EmptyScript,

    /// An engine binary is missing from the host; retrying cannot help
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// A line still failed after the fallback retry
    #[error("line {line} failed: {source}")]
    LineFailed {
        line: usize,
        #[source]
        source: SynthesisError,
    },

    /// A clip could not be adapted to the run's reference format
    #[error(
        "line {line} produced {clip}, which cannot be adapted to the reference format ({reference}); \
         try voices from the same engine or language"
    )]
    IncompatibleVoiceFormats {
        line: usize,
        reference: AudioFormat,
        clip: AudioFormat,
    },

    /// The run was cancelled
    #[error("assembly cancelled")]
    Cancelled,

    /// Scratch directory could not be created
    #[error("failed to create scratch directory: {0}")]
    Scratch(#[source] std::io::Error),
}
