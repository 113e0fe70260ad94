//! Linear-interpolation resampler for mono 16-bit PCM.
//!
//! Plain linear interpolation with no anti-aliasing filter. Downsampling
//! can alias, a known limitation accepted for short voice clips.

/// Resample mono 16-bit little-endian PCM from `from_hz` to `to_hz`.
///
/// For `n` input samples the output holds `max(1, round(n * to_hz / from_hz))`
/// samples. Output sample `i` is read at fractional input position
/// `i * (n - 1) / (m - 1)` and linearly interpolated between its two
/// neighbors, so the first and last input samples always survive exactly.
/// Equal rates return the input unchanged and empty input stays empty.
pub fn resample_mono16(pcm: &[u8], from_hz: u32, to_hz: u32) -> Vec<u8> {
    if from_hz == to_hz {
        return pcm.to_vec();
    }

    let samples: Vec<i16> = pcm
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }

    let m = ((n as f64 * to_hz as f64 / from_hz as f64).round() as usize).max(1);
    let span = (n - 1) as f64;
    let denom = m.saturating_sub(1).max(1) as f64;

    let mut out = Vec::with_capacity(m * 2);
    for i in 0..m {
        let position = i as f64 * span / denom;
        let left = position.floor() as usize;
        let right = (left + 1).min(n - 1);
        let fraction = position - left as f64;
        let a = samples[left] as f64;
        let b = samples[right] as f64;
        let value = (a + (b - a) * fraction).round() as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}
