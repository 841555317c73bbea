use std::path::PathBuf;
use std::time::Duration;

use super::audio_models::AudioFormat;

/// Default number of amplitude values kept for the live waveform.
pub const DEFAULT_WAVEFORM_CAPACITY: usize = 720;

/// What the capture loop does with the source while paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PausePolicy {
    /// Keep reading from the source and discard the data, so the device
    /// buffer never overruns.
    #[default]
    DrainAndDiscard,
    /// Stop reading and block on the pause gate until resume or stop.
    BlockSource,
}

/// Configuration for a recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfiguration {
    /// PCM layout requested from the capture source and written to the file.
    pub format: AudioFormat,

    /// Path of the `.wav` file a session writes to.
    pub output_path: PathBuf,

    /// Number of amplitude slots in the waveform buffer (default: 720).
    pub waveform_capacity: usize,

    /// Pause behaviour of the capture loop.
    pub pause_policy: PausePolicy,

    /// How long `stop()` waits for the capture loop before detaching it.
    pub stop_timeout: Duration,
}

impl RecorderConfiguration {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_pause_policy(mut self, policy: PausePolicy) -> Self {
        self.pause_policy = policy;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        self.format.validate()?;
        if self.waveform_capacity == 0 {
            return Err("waveform capacity must be positive".into());
        }
        if self.output_path.as_os_str().is_empty() {
            return Err("output path is empty".into());
        }
        Ok(())
    }
}

impl Default for RecorderConfiguration {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            output_path: PathBuf::from("recording.wav"),
            waveform_capacity: DEFAULT_WAVEFORM_CAPACITY,
            pause_policy: PausePolicy::default(),
            stop_timeout: Duration::from_secs(2),
        }
    }
}
