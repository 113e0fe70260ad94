//! Inter-line pause generation.

use crate::wav::AudioFormat;

/// Produce `pause_ms` milliseconds of zero-valued PCM in the given format.
///
/// Zero bytes decode to zero amplitude in linear PCM regardless of channel
/// count or bit depth, so the buffer is a plain zero fill. The sample count
/// is `sample_rate * pause_ms / 1000` in integer math, floored but never
/// below one sample, so a positive pause always occupies at least one frame.
pub fn silence(format: &AudioFormat, pause_ms: u64) -> Vec<u8> {
    let samples = ((format.sample_rate as u64 * pause_ms) / 1000).max(1);
    vec![0u8; samples as usize * format.frame_size()]
}
