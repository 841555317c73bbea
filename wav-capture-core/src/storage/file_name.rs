use std::path::{Path, PathBuf};

use crate::models::error::RecorderError;

const WAV_EXTENSION: &str = ".wav";

/// Whether `name` is a usable recording name: ASCII letters, digits, `-`
/// and `_`, at least one character.
pub fn validate_file_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Turn a user-entered name into a `.wav` file name.
///
/// A name that already ends in `.wav` is accepted as long as its stem is
/// valid.
pub fn recording_file_name(name: &str) -> Result<String, RecorderError> {
    let stem = name.strip_suffix(WAV_EXTENSION).unwrap_or(name);
    if !validate_file_name(stem) {
        return Err(RecorderError::Initialization(format!(
            "invalid recording name {:?}: only letters, digits, '-' and '_' are allowed",
            name
        )));
    }
    Ok(format!("{}{}", stem, WAV_EXTENSION))
}

/// Path of the recording called `name` inside `directory`.
pub fn recording_path(directory: &Path, name: &str) -> Result<PathBuf, RecorderError> {
    Ok(directory.join(recording_file_name(name)?))
}
