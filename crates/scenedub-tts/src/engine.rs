//! Speech synthesizer abstraction

use async_trait::async_trait;

use crate::error::SynthesisResult;
use crate::types::LineRequest;

/// A capability that turns one line of text into WAV container bytes.
///
/// Implementations shell out to an engine binary and read back the file it
/// wrote. The assembly pipeline only sees this seam, which keeps it
/// testable without any engine installed on the host.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize one line and return the raw WAV bytes.
    async fn synthesize_line(&self, request: &LineRequest<'_>) -> SynthesisResult<Vec<u8>>;
}
