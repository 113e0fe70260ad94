//! Speech synthesis abstraction layer for SceneDub
//!
//! This crate provides the foundational types for driving external speech
//! engines: voice selection, tuning knobs, the synthesizer trait and the
//! subprocess plumbing shared by the engine crates.

pub mod engine;
pub mod error;
pub mod process;
pub mod types;

pub use engine::SpeechSynthesizer;
pub use error::{SynthesisError, SynthesisResult};
pub use types::{LineRequest, SynthesisTuning, VoiceSelection};
