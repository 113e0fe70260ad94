//! Piper TTS engine implementation for SceneDub

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use scenedub_tts::process::{read_engine_output, run_engine};
use scenedub_tts::{LineRequest, SpeechSynthesizer, SynthesisResult, SynthesisTuning};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};


/// Configuration for the Piper engine.
#[derive(Debug, Clone)]
pub struct PiperConfig {
    /// Piper binary name or path.
    pub binary: String,
    /// Directory holding `.onnx` voice models.
    pub voices_dir: PathBuf,
    /// Model used when a voice id resolves to nothing on disk.
    pub default_model: PathBuf,
}

impl Default for PiperConfig {
    fn default() -> Self {
        let voices_dir = PathBuf::from("./models/piper");
        let default_model = voices_dir.join("en_US-amy-medium.onnx");
        Self {
            binary: "piper".to_string(),
            voices_dir,
            default_model,
        }
    }
}

impl PiperConfig {
    /// Read `PIPER_BIN`, `PIPER_VOICES_DIR` and `PIPER_DEFAULT_MODEL` from
    /// the environment, falling back to the defaults field by field.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let voices_dir = std::env::var("PIPER_VOICES_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.voices_dir);
        let default_model = std::env::var("PIPER_DEFAULT_MODEL")
            .map(PathBuf::from)
            .unwrap_or_else(|_| voices_dir.join("en_US-amy-medium.onnx"));
        Self {
            binary: std::env::var("PIPER_BIN").unwrap_or(defaults.binary),
            voices_dir,
            default_model,
        }
    }
}

/// Drives the `piper` binary: one spawn per line, text on stdin, WAV file
/// out.
pub struct PiperEngine {
    config: PiperConfig,
    cancel: CancellationToken,
}

impl PiperEngine {
    pub fn new(config: PiperConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Check whether the piper binary responds on this host. Used for
    /// pre-flight diagnostics; the synthesis path relies on spawn errors.
    pub async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.config.binary)
            .arg("--version")
            .output()
            .await
            .is_ok()
    }

    /// Resolve a voice id to a model path.
    ///
    /// An id ending in `.onnx` is used as a path, absolute or relative to
    /// the voices directory. Otherwise `<voices_dir>/<id>.onnx` is tried,
    /// then a scan of the voices directory for a model whose name contains
    /// the id. When nothing on disk matches, the default model is used.
    fn resolve_model(&self, voice: &str) -> PathBuf {
        if !voice.is_empty() {
            let inferred = if voice.ends_with(".onnx") {
                let path = Path::new(voice);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.config.voices_dir.join(voice)
                }
            } else {
                self.config.voices_dir.join(format!("{voice}.onnx"))
            };
            if inferred.exists() {
                return inferred;
            }
            if let Some(scanned) = self.scan_voices_dir(voice) {
                debug!("voice {:?} matched model {}", voice, scanned.display());
                return scanned;
            }
            warn!("no model found for voice {:?}, using the default model", voice);
        }
        self.config.default_model.clone()
    }

    /// First `.onnx` file in the voices directory whose stem contains the
    /// voice id, compared case-insensitively. Candidates are sorted so the
    /// pick is stable across runs.
    fn scan_voices_dir(&self, voice: &str) -> Option<PathBuf> {
        let needle = voice.to_lowercase();
        let entries = std::fs::read_dir(&self.config.voices_dir).ok()?;
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("onnx"))
                    && path
                        .file_stem()
                        .and_then(|stem| stem.to_str())
                        .is_some_and(|stem| stem.to_lowercase().contains(&needle))
            })
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    }

    fn build_piper_args(
        &self,
        model: &Path,
        out_file: &Path,
        tuning: &SynthesisTuning,
    ) -> Vec<String> {
        vec![
            "--model".to_string(),
            model.display().to_string(),
            "--output_file".to_string(),
            out_file.display().to_string(),
            "--length_scale".to_string(),
            tuning.length_scale.to_string(),
            "--noise_scale".to_string(),
            tuning.noise_scale.to_string(),
            "--noise_w".to_string(),
            tuning.noise_w.to_string(),
        ]
    }
}

#[async_trait]
impl SpeechSynthesizer for PiperEngine {
    async fn synthesize_line(&self, request: &LineRequest<'_>) -> SynthesisResult<Vec<u8>> {
        let model = self.resolve_model(request.voice.voice());
        let out_file = request.output_path();
        let args = self.build_piper_args(&model, &out_file, &request.tuning);
        run_engine(&self.config.binary, &args, Some(request.text), &self.cancel).await?;
        read_engine_output(&self.config.binary, &out_file).await
    }
}
