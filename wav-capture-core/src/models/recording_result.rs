use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::AudioFormat;

/// Result returned when a recording session is finalized.
///
/// Serializable so the caller can store it next to the file name; the core
/// never persists it itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingResult {
    pub id: String,
    pub file_path: PathBuf,
    pub format: AudioFormat,
    /// Size of the `data` chunk in bytes.
    pub data_bytes: u64,
    pub duration_secs: f64,
    /// SHA-256 hex digest of the finished file.
    pub checksum: String,
    pub created_at: String,
    /// Opaque caller string (e.g. a scanned code), passed through untouched.
    pub tag: Option<String>,
}

impl RecordingResult {
    pub fn new(
        file_path: PathBuf,
        format: AudioFormat,
        data_bytes: u64,
        checksum: String,
        tag: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            duration_secs: format.bytes_to_duration(data_bytes).as_secs_f64(),
            file_path,
            format,
            data_bytes,
            checksum,
            created_at: chrono::Utc::now().to_rfc3339(),
            tag,
        }
    }

    /// Name of the recorded file, the key a caller associates the tag with.
    pub fn file_name(&self) -> Option<String> {
        self.file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}
