use std::fmt;

use serde::{Deserialize, Serialize};

/// Recorder state machine.
///
/// State transitions:
/// ```text
/// idle → recording ↔ paused
///            ↓          ↓
///         stopped ← ────┘
/// stopped → recording   (fresh session)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
    Paused,
    Stopped,
}

impl RecorderState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    /// A session is open: the sink holds a provisional header and the
    /// capture loop may still be running.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }

    pub fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Stopped)
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_idle_and_stopped_can_start() {
        assert!(RecorderState::Idle.can_start());
        assert!(RecorderState::Stopped.can_start());
        assert!(!RecorderState::Recording.can_start());
        assert!(!RecorderState::Paused.can_start());
    }

    #[test]
    fn active_covers_recording_and_paused() {
        assert!(RecorderState::Recording.is_active());
        assert!(RecorderState::Paused.is_active());
        assert!(!RecorderState::Idle.is_active());
        assert!(!RecorderState::Stopped.is_active());
    }
}
