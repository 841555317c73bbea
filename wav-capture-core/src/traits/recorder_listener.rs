use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::RecorderState;

/// Event listener for recorder notifications.
///
/// Register any number of listeners with `Recorder::subscribe`. Buffer and
/// amplitude events are called from the capture thread; implementations
/// should marshal to a UI thread if needed and return quickly.
pub trait RecorderListener: Send + Sync {
    /// Called when the recorder state changes.
    fn on_state_changed(&self, _state: RecorderState) {}

    /// Called with every chunk written to the file, in capture order.
    fn on_audio_buffer_available(&self, _chunk: &[u8]) {}

    /// Called with the amplitude derived from every written chunk.
    fn on_amplitude(&self, _amplitude: f32) {}

    /// Called when the session fails in the background.
    fn on_error(&self, _error: &RecorderError) {}

    /// Called when the file is finalized.
    fn on_recording_finished(&self, _result: &RecordingResult) {}
}
