//! Script model and line sanitization.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One spoken line as it arrives from the script producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: String,
    pub text: String,
}

/// A cast member: display name plus the voice that renders them.
///
/// `accent` and `emotion` are hints consumed by the upstream text producer;
/// the pipeline carries them through but never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerProfile {
    pub name: String,
    pub voice: String,
    #[serde(default)]
    pub accent: String,
    #[serde(default)]
    pub emotion: String,
}

static STAGE_DIRECTIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").unwrap());
static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip stage directions and normalize whitespace.
///
/// Bracketed and parenthesized asides go first so the gap they leave
/// collapses with the surrounding whitespace; then runs of whitespace
/// become a single space and the ends are trimmed.
pub fn sanitize_line(text: &str) -> String {
    let stripped = STAGE_DIRECTIONS.replace_all(text, "");
    let collapsed = WHITESPACE_RUNS.replace_all(&stripped, " ");
    collapsed.trim().to_string()
}
