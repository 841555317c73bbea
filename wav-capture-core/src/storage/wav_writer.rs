use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::audio_models::AudioFormat;
use crate::models::error::RecorderError;
use crate::processing::wav_format::{self, MAX_DATA_SIZE};

/// Streaming WAV file writer.
///
/// ## File Format
///
/// ```text
/// [44-byte WAV header]   data_size = 0 until finish()
/// [raw interleaved PCM data...]
/// ```
///
/// The header is written once at creation with a zero data size and patched
/// in place by `finish`. A writer that is abandoned keeps the provisional
/// header.
pub struct WavFileWriter {
    file_path: PathBuf,
    format: AudioFormat,
    file: BufWriter<File>,
    data_bytes: u64,
}

impl WavFileWriter {
    /// Create (or truncate) the file and write the provisional header.
    pub fn create(file_path: impl Into<PathBuf>, format: AudioFormat) -> Result<Self, RecorderError> {
        let file_path = file_path.into();

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| RecorderError::io("failed to create directory", e))?;
        }

        let file = File::create(&file_path).map_err(|e| RecorderError::io("failed to create file", e))?;
        let mut file = BufWriter::new(file);
        file.write_all(&wav_format::build_header_for(&format, 0))
            .map_err(|e| RecorderError::io("failed to write wav header", e))?;

        log::debug!("Opened {} for {:?}", file_path.display(), format);

        Ok(Self {
            file_path,
            format,
            file,
            data_bytes: 0,
        })
    }

    /// Append PCM data.
    ///
    /// Fails without writing anything if the chunk would push the data size
    /// past what the 32-bit header fields can declare.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), RecorderError> {
        if chunk.len() as u64 > self.remaining_capacity() {
            return Err(RecorderError::Io(format!(
                "wav data limit reached at {} bytes",
                self.data_bytes
            )));
        }
        self.file
            .write_all(chunk)
            .map_err(|e| RecorderError::io("write failed", e))?;
        self.data_bytes += chunk.len() as u64;
        Ok(())
    }

    /// Flush, patch the header sizes, sync to disk, and return the SHA-256
    /// checksum of the finished file.
    pub fn finish(mut self) -> Result<String, RecorderError> {
        self.file
            .flush()
            .map_err(|e| RecorderError::io("failed to flush", e))?;

        // write() never lets data_bytes exceed MAX_DATA_SIZE.
        let data_size = self.data_bytes as u32;
        wav_format::patch_header(&mut self.file, data_size)?;

        let file = self
            .file
            .into_inner()
            .map_err(|e| RecorderError::io("failed to flush", e.into_error()))?;
        file.sync_all()
            .map_err(|e| RecorderError::io("failed to sync", e))?;
        drop(file);

        sha256_file(&self.file_path)
    }

    /// Close the file without patching the header.
    pub fn abandon(mut self) {
        if let Err(e) = self.file.flush() {
            log::warn!("Failed to flush abandoned recording {}: {}", self.file_path.display(), e);
        }
    }

    /// PCM bytes written so far (excluding the header).
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    /// Bytes that can still be appended before the header limit.
    pub fn remaining_capacity(&self) -> u64 {
        MAX_DATA_SIZE as u64 - self.data_bytes
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Path of the output file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, RecorderError> {
    let mut file = File::open(path).map_err(|e| RecorderError::io("failed to open file for checksum", e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| RecorderError::io("failed to read file for checksum", e))?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
