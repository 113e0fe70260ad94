//! Dialogue assembly: the per-line synthesis loop and WAV accumulation.
//!
//! One run is strictly sequential. The first successfully decoded clip
//! fixes the run's reference format; every later clip either matches it,
//! gets resampled to it, or trips the bounded fallback retry. PCM and
//! inter-line silence accumulate in memory and are encoded exactly once at
//! the end, so a failed run never leaves a partial file behind.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use scenedub_audio::{decode, encode, reconcile, silence, AudioFormat, DecodedClip, WavError};
use scenedub_tts::{
    LineRequest, SpeechSynthesizer, SynthesisError, SynthesisTuning, VoiceSelection,
};

use crate::error::AssemblyError;
use crate::nuance::{resolve_pause_ms, resolve_tuning, NuanceConfig, Preset};
use crate::script::{sanitize_line, DialogueLine, SpeakerProfile};

/// The unit of work: a script, two speakers, and delivery adjustments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyRequest {
    pub script: Vec<DialogueLine>,
    pub speakers: [SpeakerProfile; 2],
    #[serde(default)]
    pub preset: Preset,
    #[serde(default)]
    pub nuance: NuanceConfig,
}

/// Run-level options that do not vary per request.
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    /// Root for per-run scratch directories; the system temp dir if `None`.
    pub scratch_root: Option<PathBuf>,
    /// Neutral eSpeak voice used when a Piper line needs the fallback retry.
    pub fallback_voice: String,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            scratch_root: None,
            fallback_voice: "en-us".to_string(),
        }
    }
}

/// A speaker with their voice parsed and tuning resolved for this run.
struct CastMember {
    name: String,
    voice: VoiceSelection,
    tuning: SynthesisTuning,
}

impl CastMember {
    fn new(profile: &SpeakerProfile, tuning: SynthesisTuning) -> Self {
        Self {
            name: profile.name.clone(),
            voice: VoiceSelection::parse(&profile.voice),
            tuning,
        }
    }
}

/// Failures that qualify for the one fallback retry, as opposed to the
/// fatal ones carried in `AttemptError::Fatal`.
enum Retryable {
    Synthesis(SynthesisError),
    Irreconcilable {
        reference: AudioFormat,
        clip: AudioFormat,
    },
}

impl Retryable {
    fn into_assembly_error(self, line: usize) -> AssemblyError {
        match self {
            Retryable::Synthesis(source) => AssemblyError::LineFailed { line, source },
            Retryable::Irreconcilable { reference, clip } => {
                AssemblyError::IncompatibleVoiceFormats {
                    line,
                    reference,
                    clip,
                }
            }
        }
    }
}

impl std::fmt::Display for Retryable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Retryable::Synthesis(source) => write!(f, "{source}"),
            Retryable::Irreconcilable { reference, clip } => {
                write!(f, "clip format {clip} does not match the reference {reference}")
            }
        }
    }
}

enum AttemptError {
    Fatal(AssemblyError),
    Retryable(Retryable),
}

/// Drives one script through synthesis into a single WAV buffer.
pub struct DialogueAssembler<S> {
    synthesizer: S,
    options: AssemblerOptions,
}

impl<S: SpeechSynthesizer> DialogueAssembler<S> {
    pub fn new(synthesizer: S) -> Self {
        Self::with_options(synthesizer, AssemblerOptions::default())
    }

    pub fn with_options(synthesizer: S, options: AssemblerOptions) -> Self {
        Self {
            synthesizer,
            options,
        }
    }

    /// Assemble with a cancellation token that never fires.
    pub async fn assemble(&self, request: &AssemblyRequest) -> Result<Vec<u8>, AssemblyError> {
        self.assemble_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Assemble the request into one WAV buffer, or fail with nothing
    /// written. The token is checked before each line and raced against
    /// the in-flight synthesis call, so cancellation lands mid-line too.
    pub async fn assemble_with_cancel(
        &self,
        request: &AssemblyRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, AssemblyError> {
        let lines = prepare_lines(&request.script);
        if lines.is_empty() {
            return Err(AssemblyError::EmptyScript);
        }

        let scratch = self.create_scratch()?;
        let pause_ms = resolve_pause_ms(request.preset, &request.nuance);
        let cast = [
            CastMember::new(
                &request.speakers[0],
                resolve_tuning(request.preset, &request.nuance.speaker1),
            ),
            CastMember::new(
                &request.speakers[1],
                resolve_tuning(request.preset, &request.nuance.speaker2),
            ),
        ];

        info!(
            "assembling {} lines, {:?} preset, {} ms pauses",
            lines.len(),
            request.preset,
            pause_ms
        );

        let mut reference: Option<AudioFormat> = None;
        let mut pcm: Vec<u8> = Vec::new();
        let last = lines.len() - 1;

        for (index, line) in lines.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(AssemblyError::Cancelled);
            }
            let member = cast_for(&cast, &line.speaker);
            let clip = self
                .render_line(
                    index,
                    &line.text,
                    member,
                    scratch.path(),
                    reference.as_ref(),
                    cancel,
                )
                .await?;

            debug!(
                "line {}: {} PCM bytes from {}",
                index,
                clip.pcm.len(),
                member.voice
            );
            if reference.is_none() {
                reference = Some(clip.format);
            }
            pcm.extend_from_slice(&clip.pcm);
            if index < last {
                pcm.extend_from_slice(&silence(&clip.format, pause_ms));
            }
        }

        let reference = reference.ok_or(AssemblyError::EmptyScript)?;
        info!("assembled {} PCM bytes at {}", pcm.len(), reference);
        Ok(encode(&reference, &pcm))
    }

    /// Synthesize and adapt one line, spending the single fallback retry
    /// if the first attempt fails in a recoverable way.
    async fn render_line(
        &self,
        index: usize,
        text: &str,
        member: &CastMember,
        scratch: &Path,
        reference: Option<&AudioFormat>,
        cancel: &CancellationToken,
    ) -> Result<DecodedClip, AssemblyError> {
        let first = self
            .attempt(index, text, &member.voice, member.tuning, scratch, reference, cancel)
            .await;
        let cause = match first {
            Ok(clip) => return Ok(clip),
            Err(AttemptError::Fatal(err)) => return Err(err),
            Err(AttemptError::Retryable(cause)) => cause,
        };

        let fallback = self.fallback_voice_for(&member.voice);
        warn!(
            "line {} failed with {} ({}), retrying with {}",
            index, member.voice, cause, fallback
        );
        match self
            .attempt(index, text, &fallback, member.tuning, scratch, reference, cancel)
            .await
        {
            Ok(clip) => Ok(clip),
            Err(AttemptError::Fatal(err)) => Err(err),
            Err(AttemptError::Retryable(cause)) => Err(cause.into_assembly_error(index)),
        }
    }

    /// One synthesis attempt: engine call, decode, reconcile.
    async fn attempt(
        &self,
        index: usize,
        text: &str,
        voice: &VoiceSelection,
        tuning: SynthesisTuning,
        scratch: &Path,
        reference: Option<&AudioFormat>,
        cancel: &CancellationToken,
    ) -> Result<DecodedClip, AttemptError> {
        let request = LineRequest {
            text,
            voice,
            tuning,
            scratch_dir: scratch,
            line_index: index,
        };
        let synthesis = tokio::select! {
            result = self.synthesizer.synthesize_line(&request) => result,
            _ = cancel.cancelled() => {
                return Err(AttemptError::Fatal(AssemblyError::Cancelled))
            }
        };
        let bytes = match synthesis {
            Ok(bytes) => bytes,
            Err(SynthesisError::Unavailable(guidance)) => {
                return Err(AttemptError::Fatal(AssemblyError::EngineUnavailable(
                    guidance,
                )))
            }
            Err(SynthesisError::Cancelled) => {
                return Err(AttemptError::Fatal(AssemblyError::Cancelled))
            }
            Err(err @ SynthesisError::Failed(_)) => {
                return Err(AttemptError::Retryable(Retryable::Synthesis(err)))
            }
            Err(SynthesisError::Io(e)) => {
                return Err(AttemptError::Fatal(AssemblyError::LineFailed {
                    line: index,
                    source: SynthesisError::Io(e),
                }))
            }
        };

        // A malformed container counts as a failed synthesis for this line.
        let clip = match decode(&bytes) {
            Ok(clip) => clip,
            Err(WavError::InvalidContainer(reason)) => {
                return Err(AttemptError::Retryable(Retryable::Synthesis(
                    SynthesisError::Failed(format!("engine wrote an invalid WAV: {reason}")),
                )))
            }
        };

        match reference {
            None => Ok(clip),
            Some(reference) => {
                let clip_format = clip.format;
                reconcile(reference, clip).ok_or_else(|| {
                    AttemptError::Retryable(Retryable::Irreconcilable {
                        reference: *reference,
                        clip: clip_format,
                    })
                })
            }
        }
    }

    /// Fallback voice policy: an eSpeak speaker retries with the same
    /// voice; anything else retries with the configured neutral eSpeak
    /// voice.
    fn fallback_voice_for(&self, voice: &VoiceSelection) -> VoiceSelection {
        match voice {
            VoiceSelection::Espeak(voice) => VoiceSelection::Espeak(voice.clone()),
            VoiceSelection::Piper(_) => {
                VoiceSelection::Espeak(self.options.fallback_voice.clone())
            }
        }
    }

    fn create_scratch(&self) -> Result<TempDir, AssemblyError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("scenedub-");
        match &self.options.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(AssemblyError::Scratch)
    }
}

/// Sanitize every line and drop the ones with nothing left to speak.
fn prepare_lines(script: &[DialogueLine]) -> Vec<DialogueLine> {
    script
        .iter()
        .map(|line| DialogueLine {
            speaker: line.speaker.clone(),
            text: sanitize_line(&line.text),
        })
        .filter(|line| !line.text.is_empty())
        .collect()
}

/// A speaker name matching the second cast member selects them; everything
/// else, unknown names included, falls to the first.
fn cast_for<'a>(cast: &'a [CastMember; 2], speaker: &str) -> &'a CastMember {
    if speaker == cast[1].name {
        &cast[1]
    } else {
        &cast[0]
    }
}
