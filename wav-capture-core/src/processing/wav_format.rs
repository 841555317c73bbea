//! WAV file format utilities.
//!
//! Builds standard 44-byte RIFF WAV headers and patches the size fields of
//! a written file once recording completes.

use std::io::{Read, Seek, SeekFrom, Write};
use std::time::Duration;

use crate::models::audio_models::AudioFormat;
use crate::models::error::RecorderError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Largest `data` chunk whose RIFF size still fits the 32-bit field.
pub const MAX_DATA_SIZE: u32 = u32::MAX - 36;

const RIFF_SIZE_OFFSET: u64 = 4;
const DATA_SIZE_OFFSET: u64 = 40;
const PCM_FORMAT_TAG: u16 = 1;
const FMT_CHUNK_SIZE: u32 = 16;

/// Build a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bits_per_sample / 8
/// [32-33]  block_align = channels * bits_per_sample / 8
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
///
/// The RIFF size saturates at `u32::MAX` when `data_size > MAX_DATA_SIZE`;
/// byte rate and block align saturate at their field widths.
pub fn build_header(sample_rate: u32, channels: u16, bits_per_sample: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let frame_bits = channels as u64 * bits_per_sample as u64;
    let byte_rate = (sample_rate as u64 * frame_bits / 8).min(u32::MAX as u64) as u32;
    let block_align = (frame_bits / 8).min(u16::MAX as u64) as u16;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_size(data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
    header[20..22].copy_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bits_per_sample.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Build a header for `format` declaring `data_size` bytes of samples.
pub fn build_header_for(format: &AudioFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    build_header(format.sample_rate, format.channels, format.bits_per_sample, data_size)
}

/// Rewrite the RIFF size (offset 4) and data size (offset 40) of a written
/// WAV stream. All other bytes are left untouched and the stream position
/// is restored to the end.
pub fn patch_header<S: Write + Seek>(sink: &mut S, final_data_size: u32) -> Result<(), RecorderError> {
    let len = sink
        .seek(SeekFrom::End(0))
        .map_err(|e| RecorderError::io("header patch: sink is not seekable", e))?;
    if len < WAV_HEADER_SIZE as u64 {
        return Err(RecorderError::Io(format!(
            "header patch: sink holds {} bytes, expected at least {}",
            len, WAV_HEADER_SIZE
        )));
    }

    write_u32_at(sink, RIFF_SIZE_OFFSET, riff_size(final_data_size))?;
    write_u32_at(sink, DATA_SIZE_OFFSET, final_data_size)?;

    sink.seek(SeekFrom::End(0))
        .map_err(|e| RecorderError::io("header patch: failed to restore position", e))?;
    Ok(())
}

fn write_u32_at<S: Write + Seek>(sink: &mut S, offset: u64, value: u32) -> Result<(), RecorderError> {
    sink.seek(SeekFrom::Start(offset))
        .map_err(|e| RecorderError::io("header patch: seek failed", e))?;
    sink.write_all(&value.to_le_bytes())
        .map_err(|e| RecorderError::io("header patch: write failed", e))
}

fn riff_size(data_size: u32) -> u32 {
    data_size.saturating_add(36)
}

/// Decoded canonical WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveHeader {
    pub riff_size: u32,
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WaveHeader {
    pub fn format(&self) -> AudioFormat {
        AudioFormat::new(self.sample_rate, self.channels, self.bits_per_sample)
    }

    /// Playback length declared by the header.
    pub fn duration(&self) -> Duration {
        if self.byte_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.data_size as f64 / self.byte_rate as f64)
    }

    pub fn to_bytes(&self) -> [u8; WAV_HEADER_SIZE] {
        build_header(self.sample_rate, self.channels, self.bits_per_sample, self.data_size)
    }
}

/// Decode a canonical 44-byte PCM header.
pub fn parse_header(bytes: &[u8]) -> Result<WaveHeader, RecorderError> {
    if bytes.len() < WAV_HEADER_SIZE {
        return Err(RecorderError::Io(format!(
            "wav header truncated: {} bytes",
            bytes.len()
        )));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(RecorderError::Io("not a RIFF/WAVE stream".into()));
    }
    if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
        return Err(RecorderError::Io("not a canonical 44-byte wav header".into()));
    }

    let header = WaveHeader {
        riff_size: le_u32(bytes, 4),
        format_tag: le_u16(bytes, 20),
        channels: le_u16(bytes, 22),
        sample_rate: le_u32(bytes, 24),
        byte_rate: le_u32(bytes, 28),
        block_align: le_u16(bytes, 32),
        bits_per_sample: le_u16(bytes, 34),
        data_size: le_u32(bytes, 40),
    };
    if header.format_tag != PCM_FORMAT_TAG {
        return Err(RecorderError::Io(format!(
            "unsupported wav format tag: {}",
            header.format_tag
        )));
    }
    Ok(header)
}

/// Read and decode the header at the start of `reader`.
pub fn read_header<R: Read>(reader: &mut R) -> Result<WaveHeader, RecorderError> {
    let mut bytes = [0u8; WAV_HEADER_SIZE];
    reader
        .read_exact(&mut bytes)
        .map_err(|e| RecorderError::io("failed to read wav header", e))?;
    parse_header(&bytes)
}

fn le_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn le_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_size_is_44_bytes() {
        let header = build_header(44_100, 1, 16, 0);
        assert_eq!(header.len(), 44);
    }

    #[test]
    fn header_riff_magic() {
        let header = build_header(48_000, 2, 16, 0);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
    }

    #[test]
    fn header_pcm_format() {
        let header = build_header(48_000, 2, 16, 0);
        assert_eq!(u16::from_le_bytes([header[20], header[21]]), 1);
        assert_eq!(u32::from_le_bytes([header[16], header[17], header[18], header[19]]), 16);
    }

    #[test]
    fn header_44khz_mono_16bit() {
        let header = build_header(44_100, 1, 16, 8_820);

        assert_eq!(le_u16(&header, 22), 1);
        assert_eq!(le_u32(&header, 24), 44_100);
        assert_eq!(le_u32(&header, 28), 88_200); // 44100 * 1 * 16/8
        assert_eq!(le_u16(&header, 32), 2);
        assert_eq!(le_u16(&header, 34), 16);
        assert_eq!(le_u32(&header, 40), 8_820);
        assert_eq!(le_u32(&header, 4), 36 + 8_820);
    }

    #[test]
    fn header_48khz_stereo_32bit() {
        let header = build_header(48_000, 2, 32, 0);
        assert_eq!(le_u32(&header, 28), 384_000);
        assert_eq!(le_u16(&header, 32), 8);
        assert_eq!(le_u16(&header, 34), 32);
    }

    #[test]
    fn size_fields_hold_for_any_magnitude() {
        for data_size in [0u32, 1, 8_820, 0x00FF_FFFF, 0x8000_0000, MAX_DATA_SIZE] {
            let parsed = parse_header(&build_header(44_100, 2, 16, data_size)).unwrap();
            assert_eq!(parsed.data_size, data_size);
            assert_eq!(parsed.riff_size, data_size + 36);
        }
    }

    #[test]
    fn format_fields_saturate_instead_of_overflowing() {
        let header = build_header(u32::MAX, u16::MAX, u16::MAX, 0);
        assert_eq!(le_u32(&header, 28), u32::MAX);
        assert_eq!(le_u16(&header, 32), u16::MAX);
        assert_eq!(le_u16(&header, 22), u16::MAX);
        assert_eq!(le_u32(&header, 24), u32::MAX);
    }

    #[test]
    fn riff_size_saturates_past_limit() {
        let header = build_header(44_100, 1, 16, u32::MAX);
        assert_eq!(le_u32(&header, 4), u32::MAX);
        assert_eq!(le_u32(&header, 40), u32::MAX);
    }

    #[test]
    fn patch_matches_direct_build() {
        let mut sink = Cursor::new(build_header(44_100, 1, 16, 0).to_vec());
        sink.get_mut().extend_from_slice(&[7u8; 100]);

        patch_header(&mut sink, 100).unwrap();

        let bytes = sink.into_inner();
        assert_eq!(&bytes[..44], &build_header(44_100, 1, 16, 100));
        assert_eq!(&bytes[44..], &[7u8; 100]);
    }

    #[test]
    fn patch_leaves_position_at_end() {
        let mut sink = Cursor::new(build_header(48_000, 2, 32, 0).to_vec());
        patch_header(&mut sink, 0xDEAD_BEEF).unwrap();
        assert_eq!(sink.position(), 44);
        assert_eq!(le_u32(sink.get_ref(), 40), 0xDEAD_BEEF);
        assert_eq!(le_u32(sink.get_ref(), 4), 0xDEAD_BEEF + 36);
    }

    #[test]
    fn patch_rejects_short_sink() {
        let mut sink = Cursor::new(vec![0u8; 43]);
        let err = patch_header(&mut sink, 10).unwrap_err();
        assert!(matches!(err, RecorderError::Io(_)));
        assert_eq!(sink.get_ref(), &vec![0u8; 43]);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_header(&[0u8; 44]).is_err());
        assert!(parse_header(b"RIFF").is_err());

        let mut header = build_header(44_100, 1, 16, 0);
        header[20] = 3; // IEEE float
        assert!(parse_header(&header).is_err());
    }

    #[test]
    fn read_header_reports_duration() {
        let bytes = build_header(44_100, 1, 16, 88_200);
        let header = read_header(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(header.duration(), Duration::from_secs(1));
        assert_eq!(header.format(), AudioFormat::default());
        assert_eq!(header.to_bytes(), bytes);
    }
}
