//! SceneDub: stitches per-line synthesized speech into one dialogue WAV.
//!
//! The pipeline sanitizes a two-speaker script, invokes an external speech
//! engine once per line, reconciles the clip formats against the run's
//! reference format, inserts timed silence between lines, and serializes a
//! single canonical WAV buffer.

pub mod assembly;
pub mod engines;
pub mod error;
pub mod nuance;
pub mod script;

pub use assembly::{AssemblerOptions, AssemblyRequest, DialogueAssembler};
pub use engines::EngineRouter;
pub use error::AssemblyError;
pub use nuance::{NuanceConfig, Preset, TuningOverride};
pub use script::{DialogueLine, SpeakerProfile};
