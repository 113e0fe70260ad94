//! Reconciling decoded clips against a run's reference format.

use tracing::debug;

use crate::resample::resample_mono16;
use crate::wav::{AudioFormat, DecodedClip};

/// Adapt `clip` to the reference format, if possible.
///
/// A clip that already matches passes through untouched. A pure sample-rate
/// mismatch is bridged by resampling, but only for mono 16-bit audio since
/// the resampler neither deinterleaves channels nor widens samples. Any
/// other mismatch is irreconcilable and returns `None`; the caller decides
/// whether that means a retry or a hard failure.
pub fn reconcile(reference: &AudioFormat, clip: DecodedClip) -> Option<DecodedClip> {
    if clip.format == *reference {
        return Some(clip);
    }

    let rate_only_mismatch = clip.format.channels == reference.channels
        && clip.format.bits_per_sample == reference.bits_per_sample;
    if rate_only_mismatch && reference.channels == 1 && reference.bits_per_sample == 16 {
        debug!(
            "resampling clip from {} Hz to {} Hz",
            clip.format.sample_rate, reference.sample_rate
        );
        let pcm = resample_mono16(&clip.pcm, clip.format.sample_rate, reference.sample_rate);
        return Some(DecodedClip {
            format: *reference,
            pcm,
        });
    }

    None
}
