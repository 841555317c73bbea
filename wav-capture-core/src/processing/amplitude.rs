//! Loudness metering for raw PCM chunks.
//!
//! Both policies are total: an empty or truncated buffer yields `0.0` and a
//! trailing partial frame is ignored, so a bad chunk only costs one
//! visualization frame.

use crate::models::audio_models::AudioFormat;

const I32_FULL_SCALE: f32 = 2_147_483_648.0; // 2^31
const I16_FULL_SCALE: f64 = 32_768.0; // 2^15

/// How a chunk is reduced to a single amplitude value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmplitudePolicy {
    /// 32-bit samples: peak absolute value of the first channel of every
    /// frame, normalized to `[0, 1]`.
    Peak { channels: u16 },
    /// 16-bit samples: RMS over every sample, scaled back to sample units
    /// (`0..=32768`).
    Rms,
}

impl AmplitudePolicy {
    /// Pick the policy matching the bit depth of `format`.
    pub fn for_format(format: &AudioFormat) -> Self {
        match format.bits_per_sample {
            32 => Self::Peak {
                channels: format.channels,
            },
            _ => Self::Rms,
        }
    }

    pub fn analyze(&self, chunk: &[u8]) -> f32 {
        match *self {
            Self::Peak { channels } => peak_i32(chunk, channels),
            Self::Rms => rms_i16(chunk),
        }
    }
}

/// Peak absolute amplitude of 32-bit little-endian samples.
///
/// Steps one frame (`channels * 4` bytes) at a time and reads the first
/// sample of each frame.
pub fn peak_i32(chunk: &[u8], channels: u16) -> f32 {
    let frame_size = 4 * channels.max(1) as usize;
    chunk
        .chunks_exact(frame_size)
        .map(|frame| {
            let sample = i32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
            (sample as f32 / I32_FULL_SCALE).abs()
        })
        .fold(0.0f32, f32::max)
}

/// RMS of 16-bit little-endian samples, in sample-magnitude units.
pub fn rms_i16(chunk: &[u8]) -> f32 {
    let mut sum_squares = 0.0f64;
    let mut count = 0usize;
    for pair in chunk.chunks_exact(2) {
        let normalized = i16::from_le_bytes([pair[0], pair[1]]) as f64 / I16_FULL_SCALE;
        sum_squares += normalized * normalized;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    ((sum_squares / count as f64).sqrt() * I16_FULL_SCALE) as f32
}
