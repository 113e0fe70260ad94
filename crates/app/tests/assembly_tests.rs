//! End-to-end assembly scenarios driven by a scripted fake synthesizer.
//!
//! The fake returns one canned outcome per call, in order, and records what
//! it was asked to do, so the tests pin down the retry policy, the voice
//! routing, and the exact shape of the assembled PCM without any engine
//! binary on the host.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use scenedub_app::assembly::{AssemblerOptions, AssemblyRequest, DialogueAssembler};
use scenedub_app::error::AssemblyError;
use scenedub_app::nuance::{NuanceConfig, Preset, TuningOverride};
use scenedub_app::script::{DialogueLine, SpeakerProfile};
use scenedub_audio::{decode, encode, AudioFormat};
use scenedub_tts::{LineRequest, SpeechSynthesizer, SynthesisError, SynthesisResult, VoiceSelection};

const FORMAT_A: AudioFormat = AudioFormat {
    sample_rate: 22050,
    channels: 1,
    bits_per_sample: 16,
};

/// 220 ms of natural-preset silence at 22050 Hz mono, in bytes.
const NATURAL_PAUSE_BYTES: usize = 4851 * 2;

enum Step {
    Wav(Vec<u8>),
    Garbage,
    Fail(&'static str),
    Unavailable(&'static str),
    Hang,
}

#[derive(Debug, Clone)]
struct RecordedCall {
    line_index: usize,
    voice: VoiceSelection,
    text: String,
    length_scale: f64,
    scratch_dir: PathBuf,
    scratch_existed: bool,
}

struct FakeSynthesizer {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeSynthesizer {
    fn scripted(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for &FakeSynthesizer {
    async fn synthesize_line(&self, request: &LineRequest<'_>) -> SynthesisResult<Vec<u8>> {
        self.calls.lock().push(RecordedCall {
            line_index: request.line_index,
            voice: request.voice.clone(),
            text: request.text.to_string(),
            length_scale: request.tuning.length_scale,
            scratch_dir: request.scratch_dir.to_path_buf(),
            scratch_existed: request.scratch_dir.is_dir(),
        });
        let step = self
            .steps
            .lock()
            .pop_front()
            .expect("fake synthesizer ran out of scripted steps");
        match step {
            Step::Wav(bytes) => Ok(bytes),
            Step::Garbage => Ok(b"definitely not audio".to_vec()),
            Step::Fail(message) => Err(SynthesisError::Failed(message.to_string())),
            Step::Unavailable(message) => Err(SynthesisError::Unavailable(message.to_string())),
            Step::Hang => std::future::pending::<SynthesisResult<Vec<u8>>>().await,
        }
    }
}

fn clip(format: AudioFormat, value: i16, samples: usize) -> Vec<u8> {
    let pcm: Vec<u8> = std::iter::repeat(value)
        .take(samples)
        .flat_map(|s| s.to_le_bytes())
        .collect();
    encode(&format, &pcm)
}

fn mono_clip(value: i16, samples: usize) -> Vec<u8> {
    clip(FORMAT_A, value, samples)
}

fn speaker(name: &str, voice: &str) -> SpeakerProfile {
    SpeakerProfile {
        name: name.to_string(),
        voice: voice.to_string(),
        accent: String::new(),
        emotion: String::new(),
    }
}

fn line(speaker: &str, text: &str) -> DialogueLine {
    DialogueLine {
        speaker: speaker.to_string(),
        text: text.to_string(),
    }
}

/// Ana speaks Piper, Rui speaks eSpeak, natural preset.
fn request(script: Vec<DialogueLine>) -> AssemblyRequest {
    AssemblyRequest {
        script,
        speakers: [speaker("Ana", "piper:amy"), speaker("Rui", "espeak:en-gb")],
        preset: Preset::Natural,
        nuance: NuanceConfig::default(),
    }
}

fn segment_is_constant(pcm: &[u8], value: i16) -> bool {
    pcm.chunks_exact(2)
        .all(|pair| i16::from_le_bytes([pair[0], pair[1]]) == value)
}

#[tokio::test]
async fn matching_lines_assemble_with_pauses_between() {
    let fake = FakeSynthesizer::scripted(vec![
        Step::Wav(mono_clip(1000, 100)),
        Step::Wav(mono_clip(2000, 100)),
        Step::Wav(mono_clip(3000, 100)),
    ]);
    let assembler = DialogueAssembler::new(&fake);
    let request = request(vec![
        line("Ana", "First line."),
        line("Rui", "Second line."),
        line("Ana", "Third line."),
    ]);

    let wav = assembler.assemble(&request).await.unwrap();
    let out = decode(&wav).unwrap();

    assert_eq!(out.format, FORMAT_A);
    assert_eq!(out.pcm.len(), 3 * 200 + 2 * NATURAL_PAUSE_BYTES);

    let first = &out.pcm[0..200];
    let pause = &out.pcm[200..200 + NATURAL_PAUSE_BYTES];
    let second = &out.pcm[200 + NATURAL_PAUSE_BYTES..400 + NATURAL_PAUSE_BYTES];
    let tail = &out.pcm[out.pcm.len() - 200..];
    assert!(segment_is_constant(first, 1000));
    assert!(pause.iter().all(|b| *b == 0));
    assert!(segment_is_constant(second, 2000));
    assert!(segment_is_constant(tail, 3000));

    let calls = fake.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].voice, VoiceSelection::Piper("amy".to_string()));
    assert_eq!(calls[1].voice, VoiceSelection::Espeak("en-gb".to_string()));
    assert_eq!(calls[2].line_index, 2);
}

#[tokio::test]
async fn rate_mismatch_is_resampled_to_the_first_clip() {
    let faster = AudioFormat {
        sample_rate: 44100,
        ..FORMAT_A
    };
    let fake = FakeSynthesizer::scripted(vec![
        Step::Wav(mono_clip(1000, 100)),
        Step::Wav(clip(faster, 2000, 100)),
    ]);
    let assembler = DialogueAssembler::new(&fake);
    let request = request(vec![line("Ana", "One."), line("Rui", "Two.")]);

    let wav = assembler.assemble(&request).await.unwrap();
    let out = decode(&wav).unwrap();

    // 100 samples at 44100 become 50 at the 22050 reference rate.
    assert_eq!(out.format, FORMAT_A);
    assert_eq!(out.pcm.len(), 200 + NATURAL_PAUSE_BYTES + 100);
    let resampled = &out.pcm[200 + NATURAL_PAUSE_BYTES..];
    assert!(segment_is_constant(resampled, 2000));
    // No fallback call was needed.
    assert_eq!(fake.calls().len(), 2);
}

#[tokio::test]
async fn irreconcilable_clip_falls_back_and_recovers() {
    let stereo = AudioFormat {
        channels: 2,
        ..FORMAT_A
    };
    let fake = FakeSynthesizer::scripted(vec![
        Step::Wav(mono_clip(1000, 100)),
        Step::Wav(clip(stereo, 2000, 100)),
        Step::Wav(mono_clip(2500, 80)),
    ]);
    let assembler = DialogueAssembler::new(&fake);
    let request = request(vec![line("Ana", "One."), line("Ana", "Two.")]);

    let wav = assembler.assemble(&request).await.unwrap();
    let out = decode(&wav).unwrap();
    assert_eq!(out.pcm.len(), 200 + NATURAL_PAUSE_BYTES + 160);

    let calls = fake.calls();
    assert_eq!(calls.len(), 3);
    // The retry replays line 1 with the neutral eSpeak fallback voice.
    assert_eq!(calls[2].line_index, 1);
    assert_eq!(calls[2].voice, VoiceSelection::Espeak("en-us".to_string()));
}

#[tokio::test]
async fn fallback_still_irreconcilable_reports_both_formats() {
    let stereo = AudioFormat {
        channels: 2,
        ..FORMAT_A
    };
    let fake = FakeSynthesizer::scripted(vec![
        Step::Wav(mono_clip(1000, 100)),
        Step::Wav(clip(stereo, 2000, 100)),
        Step::Wav(clip(stereo, 2000, 100)),
    ]);
    let assembler = DialogueAssembler::new(&fake);
    let request = request(vec![line("Ana", "One."), line("Ana", "Two.")]);

    let err = assembler.assemble(&request).await.unwrap_err();
    match err {
        AssemblyError::IncompatibleVoiceFormats {
            line,
            reference,
            clip,
        } => {
            assert_eq!(line, 1);
            assert_eq!(reference, FORMAT_A);
            assert_eq!(clip, stereo);
        }
        other => panic!("expected IncompatibleVoiceFormats, got {other:?}"),
    }
}

#[tokio::test]
async fn engine_failure_retries_with_the_neutral_espeak_voice() {
    let fake = FakeSynthesizer::scripted(vec![
        Step::Fail("model exploded"),
        Step::Wav(mono_clip(500, 60)),
    ]);
    let assembler = DialogueAssembler::new(&fake);
    let request = request(vec![line("Ana", "Just this.")]);

    let wav = assembler.assemble(&request).await.unwrap();
    assert_eq!(decode(&wav).unwrap().pcm.len(), 120);

    let calls = fake.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].voice, VoiceSelection::Piper("amy".to_string()));
    assert_eq!(calls[1].voice, VoiceSelection::Espeak("en-us".to_string()));
}

#[tokio::test]
async fn espeak_speaker_retries_with_its_own_voice() {
    let fake = FakeSynthesizer::scripted(vec![
        Step::Fail("hiccup"),
        Step::Wav(mono_clip(500, 60)),
    ]);
    let assembler = DialogueAssembler::new(&fake);
    let request = request(vec![line("Rui", "Just this.")]);

    assembler.assemble(&request).await.unwrap();

    let calls = fake.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].voice, VoiceSelection::Espeak("en-gb".to_string()));
    assert_eq!(calls[1].voice, VoiceSelection::Espeak("en-gb".to_string()));
}

#[tokio::test]
async fn invalid_container_uses_the_fallback_retry() {
    let fake = FakeSynthesizer::scripted(vec![Step::Garbage, Step::Wav(mono_clip(500, 60))]);
    let assembler = DialogueAssembler::new(&fake);
    let request = request(vec![line("Ana", "Only line.")]);

    let wav = assembler.assemble(&request).await.unwrap();
    assert_eq!(decode(&wav).unwrap().format, FORMAT_A);
    assert_eq!(fake.calls().len(), 2);
    assert_eq!(
        fake.calls()[1].voice,
        VoiceSelection::Espeak("en-us".to_string())
    );
}

#[tokio::test]
async fn unavailable_engine_aborts_without_retry() {
    let fake = FakeSynthesizer::scripted(vec![Step::Unavailable(
        "piper not found. Please install piper to synthesize speech.",
    )]);
    let assembler = DialogueAssembler::new(&fake);
    let request = request(vec![line("Ana", "One."), line("Rui", "Two.")]);

    let err = assembler.assemble(&request).await.unwrap_err();
    match err {
        AssemblyError::EngineUnavailable(guidance) => {
            assert!(guidance.contains("piper"), "guidance: {guidance}")
        }
        other => panic!("expected EngineUnavailable, got {other:?}"),
    }
    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn double_failure_becomes_a_line_failure() {
    let fake = FakeSynthesizer::scripted(vec![Step::Fail("first"), Step::Fail("second")]);
    let assembler = DialogueAssembler::new(&fake);
    let request = request(vec![line("Ana", "Only line.")]);

    let err = assembler.assemble(&request).await.unwrap_err();
    match err {
        AssemblyError::LineFailed { line, source } => {
            assert_eq!(line, 0);
            assert!(matches!(source, SynthesisError::Failed(_)));
        }
        other => panic!("expected LineFailed, got {other:?}"),
    }
    assert_eq!(fake.calls().len(), 2);
}

#[tokio::test]
async fn empty_script_short_circuits_before_any_synthesis() {
    let fake = FakeSynthesizer::scripted(vec![]);
    let assembler = DialogueAssembler::new(&fake);
    let request = request(vec![
        line("Ana", "(long silence)"),
        line("Rui", "[door slams]"),
        line("Ana", "   "),
    ]);

    let err = assembler.assemble(&request).await.unwrap_err();
    assert!(matches!(err, AssemblyError::EmptyScript));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn unknown_speaker_uses_the_first_voice() {
    let fake = FakeSynthesizer::scripted(vec![Step::Wav(mono_clip(500, 60))]);
    let assembler = DialogueAssembler::new(&fake);
    let request = request(vec![line("Narrator", "Meanwhile.")]);

    assembler.assemble(&request).await.unwrap();
    assert_eq!(
        fake.calls()[0].voice,
        VoiceSelection::Piper("amy".to_string())
    );
}

#[tokio::test]
async fn sanitized_text_reaches_the_engine() {
    let fake = FakeSynthesizer::scripted(vec![Step::Wav(mono_clip(500, 60))]);
    let assembler = DialogueAssembler::new(&fake);
    let request = request(vec![line("Ana", "[whisper] Hello   there (softly)")]);

    assembler.assemble(&request).await.unwrap();
    assert_eq!(fake.calls()[0].text, "Hello there");
}

#[tokio::test]
async fn pause_override_is_clamped_to_the_ceiling() {
    let fake = FakeSynthesizer::scripted(vec![
        Step::Wav(mono_clip(1000, 100)),
        Step::Wav(mono_clip(2000, 100)),
    ]);
    let assembler = DialogueAssembler::new(&fake);
    let mut request = request(vec![line("Ana", "One."), line("Rui", "Two.")]);
    request.nuance.pause_ms = Some(5000);

    let wav = assembler.assemble(&request).await.unwrap();
    // 5000 ms clamps to 700: 22050 * 700 / 1000 = 15435 samples.
    let clamped_pause_bytes = 15435 * 2;
    assert_eq!(decode(&wav).unwrap().pcm.len(), 400 + clamped_pause_bytes);
}

#[tokio::test]
async fn tuning_overrides_reach_the_engine_clamped() {
    let fake = FakeSynthesizer::scripted(vec![
        Step::Wav(mono_clip(1000, 100)),
        Step::Wav(mono_clip(2000, 100)),
    ]);
    let assembler = DialogueAssembler::new(&fake);
    let mut request = request(vec![line("Ana", "One."), line("Rui", "Two.")]);
    request.preset = Preset::Fast;
    request.nuance.speaker1 = TuningOverride {
        length_scale: Some(9.9),
        ..Default::default()
    };

    assembler.assemble(&request).await.unwrap();
    let calls = fake.calls();
    // Ana's override clamps to 1.4; Rui keeps the fast-preset scale.
    assert_eq!(calls[0].length_scale, 1.4);
    assert_eq!(calls[1].length_scale, 0.93);
}

#[tokio::test]
async fn scratch_directory_lives_under_the_configured_root_and_is_removed() {
    let root = tempfile::tempdir().unwrap();
    let options = AssemblerOptions {
        scratch_root: Some(root.path().to_path_buf()),
        ..Default::default()
    };

    let fake = FakeSynthesizer::scripted(vec![Step::Wav(mono_clip(500, 60))]);
    let assembler = DialogueAssembler::with_options(&fake, options.clone());
    let request_ok = request(vec![line("Ana", "Fine.")]);
    assembler.assemble(&request_ok).await.unwrap();

    let call = &fake.calls()[0];
    assert!(call.scratch_existed);
    assert!(call.scratch_dir.starts_with(root.path()));
    let dir_name = call.scratch_dir.file_name().unwrap().to_string_lossy().into_owned();
    assert!(dir_name.starts_with("scenedub-"), "dir name: {dir_name}");
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);

    // Failure also leaves the root empty.
    let failing = FakeSynthesizer::scripted(vec![Step::Fail("a"), Step::Fail("b")]);
    let assembler = DialogueAssembler::with_options(&failing, options);
    let request_bad = request(vec![line("Ana", "Nope.")]);
    assembler.assemble(&request_bad).await.unwrap_err();
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn pre_cancelled_token_returns_cancelled_without_calls() {
    let fake = FakeSynthesizer::scripted(vec![]);
    let assembler = DialogueAssembler::new(&fake);
    let request = request(vec![line("Ana", "Never spoken.")]);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = assembler
        .assemble_with_cancel(&request, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AssemblyError::Cancelled));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn cancellation_lands_mid_line() {
    let fake = FakeSynthesizer::scripted(vec![Step::Hang]);
    let assembler = DialogueAssembler::new(&fake);
    let request = request(vec![line("Ana", "This call never returns.")]);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = assembler
        .assemble_with_cancel(&request, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AssemblyError::Cancelled));
    assert_eq!(fake.calls().len(), 1);
}
