use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sample rates accepted by the capture pipeline.
pub const SUPPORTED_SAMPLE_RATES: [u32; 2] = [44_100, 48_000];

/// PCM layout of the capture stream and the WAV file it is written to.
///
/// Samples are interleaved, signed, little-endian integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(format!("unsupported sample rate: {}", self.sample_rate));
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if ![16, 32].contains(&self.bits_per_sample) {
            return Err(format!("unsupported bit depth: {}", self.bits_per_sample));
        }
        Ok(())
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample as usize / 8
    }

    /// Bytes per frame (one sample for every channel).
    pub fn block_align(&self) -> usize {
        self.channels as usize * self.bytes_per_sample()
    }

    pub fn byte_rate(&self) -> u32 {
        let rate = self.sample_rate as u64 * self.channels as u64 * self.bits_per_sample as u64 / 8;
        rate.min(u32::MAX as u64) as u32
    }

    /// Playback length of `bytes` of PCM in this format.
    pub fn bytes_to_duration(&self, bytes: u64) -> Duration {
        let byte_rate = self.byte_rate();
        if byte_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(bytes as f64 / byte_rate as f64)
    }

    /// Round `bytes` up to a whole number of frames.
    pub fn align_to_frames(&self, bytes: usize) -> usize {
        let frame = self.block_align().max(1);
        bytes.div_ceil(frame) * frame
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            bits_per_sample: 16,
        }
    }
}

/// An input device a capture provider can open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDevice {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_fields_for_cd_quality_mono() {
        let format = AudioFormat::default();
        assert_eq!(format.block_align(), 2);
        assert_eq!(format.byte_rate(), 88_200);
        assert!(format.validate().is_ok());
    }

    #[test]
    fn derived_fields_for_stereo_32bit() {
        let format = AudioFormat::new(48_000, 2, 32);
        assert_eq!(format.block_align(), 8);
        assert_eq!(format.byte_rate(), 384_000);
    }

    #[test]
    fn rejects_unsupported_layouts() {
        assert!(AudioFormat::new(22_050, 1, 16).validate().is_err());
        assert!(AudioFormat::new(44_100, 3, 16).validate().is_err());
        assert!(AudioFormat::new(44_100, 1, 24).validate().is_err());
    }

    #[test]
    fn duration_from_bytes() {
        let format = AudioFormat::default();
        assert_eq!(format.bytes_to_duration(8_820), Duration::from_millis(100));
        assert_eq!(format.bytes_to_duration(0), Duration::ZERO);
    }

    #[test]
    fn aligns_up_to_whole_frames() {
        let format = AudioFormat::new(48_000, 2, 16);
        assert_eq!(format.align_to_frames(3), 4);
        assert_eq!(format.align_to_frames(8), 8);
        assert_eq!(format.align_to_frames(0), 0);
    }
}
