//! Core types for speech synthesis

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Which engine renders a speaker, and the engine-native voice to use.
///
/// Parsed once from the operator-facing string form and carried as data
/// from then on; nothing downstream re-parses voice strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceSelection {
    /// Piper voice id, or a path to an `.onnx` model
    Piper(String),
    /// eSpeak NG voice name such as "en-us"
    Espeak(String),
}

impl VoiceSelection {
    /// Parse the operator string form.
    ///
    /// `piper:<voice>` and `espeak:<voice>` select an engine explicitly when
    /// both sides of the colon are nonempty after trimming; the prefix is
    /// matched case-insensitively. Every other shape, bare names and unknown
    /// prefixes included, is a Piper voice taken verbatim.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some((prefix, rest)) = raw.split_once(':') {
            let rest = rest.trim();
            if !prefix.is_empty() && !rest.is_empty() {
                match prefix.to_ascii_lowercase().as_str() {
                    "piper" => return VoiceSelection::Piper(rest.to_string()),
                    "espeak" => return VoiceSelection::Espeak(rest.to_string()),
                    _ => {}
                }
            }
        }
        VoiceSelection::Piper(raw.to_string())
    }

    /// Engine identifier for logs and error messages.
    pub fn engine(&self) -> &'static str {
        match self {
            VoiceSelection::Piper(_) => "piper",
            VoiceSelection::Espeak(_) => "espeak",
        }
    }

    /// The engine-native voice name or id.
    pub fn voice(&self) -> &str {
        match self {
            VoiceSelection::Piper(voice) | VoiceSelection::Espeak(voice) => voice,
        }
    }
}

impl fmt::Display for VoiceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.engine(), self.voice())
    }
}

/// Tuning knobs shared by every line of a run.
///
/// `length_scale` stretches playback tempo on both engines (higher is
/// slower). The two noise knobs only affect Piper generation; eSpeak
/// ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesisTuning {
    pub length_scale: f64,
    pub noise_scale: f64,
    pub noise_w: f64,
}

impl Default for SynthesisTuning {
    fn default() -> Self {
        Self {
            length_scale: 1.0,
            noise_scale: 0.7,
            noise_w: 0.8,
        }
    }
}

/// One script line handed to a [`crate::SpeechSynthesizer`].
#[derive(Debug)]
pub struct LineRequest<'a> {
    /// Sanitized text to speak.
    pub text: &'a str,
    /// Engine and voice for this line.
    pub voice: &'a VoiceSelection,
    /// Run-wide tuning knobs.
    pub tuning: SynthesisTuning,
    /// Directory for intermediate engine output.
    pub scratch_dir: &'a Path,
    /// Zero-based position in the script, used to name scratch files.
    pub line_index: usize,
}

impl LineRequest<'_> {
    /// Scratch path the engine writes this line's WAV to.
    pub fn output_path(&self) -> PathBuf {
        self.scratch_dir.join(format!("line-{}.wav", self.line_index))
    }
}
