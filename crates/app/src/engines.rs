//! Engine ownership and per-line dispatch.

use async_trait::async_trait;
use scenedub_tts::{LineRequest, SpeechSynthesizer, SynthesisResult, VoiceSelection};
use scenedub_tts_espeak::{EspeakConfig, EspeakEngine};
use scenedub_tts_piper::{PiperConfig, PiperEngine};
use tokio_util::sync::CancellationToken;

/// Owns one engine of each kind and routes each line on its voice
/// selection. The assembler only ever sees the `SpeechSynthesizer` seam.
pub struct EngineRouter {
    piper: PiperEngine,
    espeak: EspeakEngine,
}

impl EngineRouter {
    pub fn new(piper: PiperConfig, espeak: EspeakConfig, cancel: CancellationToken) -> Self {
        Self {
            piper: PiperEngine::new(piper, cancel.clone()),
            espeak: EspeakEngine::new(espeak, cancel),
        }
    }

    /// Both engine configs from the environment.
    pub fn from_env(cancel: CancellationToken) -> Self {
        Self::new(PiperConfig::from_env(), EspeakConfig::from_env(), cancel)
    }

    /// Probe both engine binaries, as (piper, espeak).
    pub async fn availability(&self) -> (bool, bool) {
        (
            self.piper.is_available().await,
            self.espeak.is_available().await,
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for EngineRouter {
    async fn synthesize_line(&self, request: &LineRequest<'_>) -> SynthesisResult<Vec<u8>> {
        match request.voice {
            VoiceSelection::Piper(_) => self.piper.synthesize_line(request).await,
            VoiceSelection::Espeak(_) => self.espeak.synthesize_line(request).await,
        }
    }
}
