//! Delivery presets and per-speaker tuning overrides.

use scenedub_tts::SynthesisTuning;
use serde::{Deserialize, Serialize};

/// Delivery profile for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Fast,
    #[default]
    Natural,
    Cinematic,
}

impl Preset {
    /// Pause inserted between lines, before any override.
    pub fn pause_ms(&self) -> u64 {
        match self {
            Preset::Fast => 120,
            Preset::Natural => 220,
            Preset::Cinematic => 340,
        }
    }

    /// Engine tuning, before any override.
    pub fn tuning(&self) -> SynthesisTuning {
        match self {
            Preset::Fast => SynthesisTuning {
                length_scale: 0.93,
                noise_scale: 0.6,
                noise_w: 0.7,
            },
            Preset::Natural => SynthesisTuning {
                length_scale: 1.0,
                noise_scale: 0.7,
                noise_w: 0.8,
            },
            Preset::Cinematic => SynthesisTuning {
                length_scale: 1.08,
                noise_scale: 0.85,
                noise_w: 1.0,
            },
        }
    }
}

/// Optional per-speaker knob overrides; absent fields keep preset values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningOverride {
    pub length_scale: Option<f64>,
    pub noise_scale: Option<f64>,
    pub noise_w: Option<f64>,
}

/// Caller-supplied delivery adjustments for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NuanceConfig {
    pub pause_ms: Option<u64>,
    pub speaker1: TuningOverride,
    pub speaker2: TuningOverride,
}

/// Merge the preset pause with the override and clamp to 80..=700 ms.
pub fn resolve_pause_ms(preset: Preset, nuance: &NuanceConfig) -> u64 {
    nuance.pause_ms.unwrap_or(preset.pause_ms()).clamp(80, 700)
}

/// Merge preset tuning with one speaker's overrides.
///
/// Out-of-range values are coerced into the working ranges, never rejected:
/// tempo stays in 0.7..=1.4 and both noise knobs in 0.1..=1.6.
pub fn resolve_tuning(preset: Preset, overrides: &TuningOverride) -> SynthesisTuning {
    let base = preset.tuning();
    SynthesisTuning {
        length_scale: overrides
            .length_scale
            .unwrap_or(base.length_scale)
            .clamp(0.7, 1.4),
        noise_scale: overrides
            .noise_scale
            .unwrap_or(base.noise_scale)
            .clamp(0.1, 1.6),
        noise_w: overrides.noise_w.unwrap_or(base.noise_w).clamp(0.1, 1.6),
    }
}
