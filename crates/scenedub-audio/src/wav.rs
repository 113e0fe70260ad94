//! Fixed-layout WAV container codec.
//!
//! Synthesis engines are invoked with flags that force plain linear PCM
//! output, so the pipeline only ever speaks the canonical 44-byte-header
//! layout: RIFF descriptor, one 16-byte `fmt ` chunk, one `data` chunk,
//! nothing in between. [`decode`] reads the header fields at fixed offsets
//! and refuses anything that does not match that layout; [`encode`] emits
//! the same bytes for the same input, every time.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Total size of the canonical header preceding the PCM payload.
pub const HEADER_LEN: usize = 44;

/// Sample layout of a PCM buffer.
///
/// A raw PCM buffer is meaningless without one of these riding along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Samples per second, in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Bits per sample. Engines are driven to produce 16.
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Bytes occupied by one frame (one sample per channel).
    pub fn frame_size(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    /// Bytes streamed per second of audio at this format, saturating at
    /// the widest value the header field can carry.
    pub fn byte_rate(&self) -> u32 {
        let rate = self.sample_rate as u64
            * self.channels as u64
            * (self.bits_per_sample as u64 / 8);
        rate.min(u32::MAX as u64) as u32
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {}-bit",
            self.sample_rate, self.channels, self.bits_per_sample
        )
    }
}

/// One decoded clip: format plus raw interleaved little-endian PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedClip {
    pub format: AudioFormat,
    pub pcm: Vec<u8>,
}

/// Codec failure. The reason string names the check that failed so it can
/// surface verbatim in operator-facing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WavError {
    #[error("invalid WAV container: {0}")]
    InvalidContainer(String),
}

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Decode a canonical WAV buffer into its format and PCM payload.
///
/// The buffer must carry `RIFF` at offset 0, `WAVE` at 8, `fmt ` at 12 and
/// `data` at 36, with all three format fields non-zero. The payload is the
/// declared `data` byte range: trailing bytes past it are ignored, and a
/// declared length that overruns the buffer is clamped to the buffer end.
pub fn decode(buffer: &[u8]) -> Result<DecodedClip, WavError> {
    if buffer.len() < HEADER_LEN {
        return Err(WavError::InvalidContainer(format!(
            "buffer is {} bytes, shorter than the {}-byte header",
            buffer.len(),
            HEADER_LEN
        )));
    }
    if &buffer[0..4] != b"RIFF" || &buffer[8..12] != b"WAVE" {
        return Err(WavError::InvalidContainer(
            "missing RIFF/WAVE signature".to_string(),
        ));
    }
    if &buffer[12..16] != b"fmt " {
        return Err(WavError::InvalidContainer(
            "fmt chunk not at the fixed offset".to_string(),
        ));
    }
    if &buffer[36..40] != b"data" {
        return Err(WavError::InvalidContainer(
            "data chunk not at the fixed offset (extra metadata chunks are not supported)"
                .to_string(),
        ));
    }

    let channels = read_u16(buffer, 22);
    let sample_rate = read_u32(buffer, 24);
    let bits_per_sample = read_u16(buffer, 34);
    if sample_rate == 0 || channels == 0 || bits_per_sample == 0 {
        return Err(WavError::InvalidContainer(format!(
            "header declares a zero field ({} Hz, {} ch, {}-bit)",
            sample_rate, channels, bits_per_sample
        )));
    }

    let declared = read_u32(buffer, 40) as usize;
    let end = HEADER_LEN.saturating_add(declared).min(buffer.len());
    Ok(DecodedClip {
        format: AudioFormat {
            sample_rate,
            channels,
            bits_per_sample,
        },
        pcm: buffer[HEADER_LEN..end].to_vec(),
    })
}

/// Encode a PCM payload into a canonical single-data-chunk WAV buffer.
///
/// Byte-rate and block-align are derived from the format, the format tag is
/// always 1 (linear PCM) and the output is fully deterministic.
pub fn encode(format: &AudioFormat, pcm: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((36 + pcm.len()) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&format.channels.to_le_bytes());
    out.extend_from_slice(&format.sample_rate.to_le_bytes());
    out.extend_from_slice(&format.byte_rate().to_le_bytes());
    out.extend_from_slice(&(format.frame_size() as u16).to_le_bytes());
    out.extend_from_slice(&format.bits_per_sample.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(pcm.len() as u32).to_le_bytes());
    out.extend_from_slice(pcm);
    out
}
