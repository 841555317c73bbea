use thiserror::Error;

use super::state::RecorderState;

/// Errors that can occur while recording.
///
/// `Clone + PartialEq` so errors can be stored on the shared session and
/// handed to every listener.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    /// Capture device unavailable or misconfigured. `start()` leaves the
    /// recorder idle; re-check the device before retrying.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Sink open/write/seek failure. Fatal to the active session.
    #[error("i/o error: {0}")]
    Io(String),

    /// Operation requested in a state that forbids it.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: RecorderState,
    },

    /// The capture source failed mid-session.
    #[error("capture failed: {0}")]
    CaptureFailed(String),
}

impl RecorderError {
    pub(crate) fn invalid_state(operation: &'static str, state: RecorderState) -> Self {
        Self::InvalidState { operation, state }
    }

    pub(crate) fn io(context: &str, err: std::io::Error) -> Self {
        Self::Io(format!("{}: {}", context, err))
    }
}
