//! eSpeak NG engine implementation for SceneDub

use async_trait::async_trait;
use scenedub_tts::process::{read_engine_output, run_engine};
use scenedub_tts::{LineRequest, SpeechSynthesizer, SynthesisResult};
use tokio_util::sync::CancellationToken;
use tracing::debug;


/// Configuration for the eSpeak NG engine.
#[derive(Debug, Clone)]
pub struct EspeakConfig {
    /// eSpeak binary name or path.
    pub binary: String,
    /// Voice used when a line arrives with an empty voice id.
    pub default_voice: String,
}

impl Default for EspeakConfig {
    fn default() -> Self {
        Self {
            binary: "espeak-ng".to_string(),
            default_voice: "en-us".to_string(),
        }
    }
}

impl EspeakConfig {
    /// Read `ESPEAK_BIN` and `ESPEAK_DEFAULT_VOICE` from the environment,
    /// falling back to the defaults field by field.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            binary: std::env::var("ESPEAK_BIN").unwrap_or(defaults.binary),
            default_voice: std::env::var("ESPEAK_DEFAULT_VOICE").unwrap_or(defaults.default_voice),
        }
    }
}

/// Map the shared timing scale onto eSpeak's words-per-minute rate.
///
/// 170 wpm is the neutral tempo; the scale divides it, with the scale
/// floored at 0.5 and the rate clamped to eSpeak's usable 110..=300 range.
pub fn espeak_rate(length_scale: f64) -> u32 {
    let rate = (170.0 / length_scale.max(0.5)).round() as u32;
    rate.clamp(110, 300)
}

/// Drives the `espeak-ng` binary: one spawn per line, text as the final
/// argument, WAV file out.
pub struct EspeakEngine {
    config: EspeakConfig,
    cancel: CancellationToken,
}

impl EspeakEngine {
    pub fn new(config: EspeakConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Check whether the espeak binary responds on this host. Used for
    /// pre-flight diagnostics; the synthesis path relies on spawn errors.
    pub async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.config.binary)
            .arg("--version")
            .output()
            .await
            .is_ok()
    }

    fn build_espeak_args(&self, voice: &str, rate: u32, out_file: &str, text: &str) -> Vec<String> {
        let voice = if voice.is_empty() {
            self.config.default_voice.as_str()
        } else {
            voice
        };
        vec![
            "-v".to_string(),
            voice.to_string(),
            "-s".to_string(),
            rate.to_string(),
            "-w".to_string(),
            out_file.to_string(),
            text.to_string(),
        ]
    }
}

#[async_trait]
impl SpeechSynthesizer for EspeakEngine {
    async fn synthesize_line(&self, request: &LineRequest<'_>) -> SynthesisResult<Vec<u8>> {
        let rate = espeak_rate(request.tuning.length_scale);
        debug!("line {} speaks at {} wpm", request.line_index, rate);
        let out_file = request.output_path();
        let args = self.build_espeak_args(
            request.voice.voice(),
            rate,
            &out_file.display().to_string(),
            request.text,
        );
        run_engine(&self.config.binary, &args, None, &self.cancel).await?;
        read_engine_output(&self.config.binary, &out_file).await
    }
}
