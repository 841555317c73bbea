use crate::models::audio_models::{AudioFormat, CaptureDevice};
use crate::models::error::RecorderError;

/// Interface for platform-specific PCM capture sources.
///
/// Implemented by:
/// - `CpalMicCapture` (wav-capture-cpal)
/// - `ChannelCaptureProvider` (in-memory source for tests and replays)
pub trait CaptureProvider: Send {
    /// Whether this capture source is currently available.
    fn is_available(&self) -> bool;

    /// Information about the device backing this provider.
    fn device_info(&self) -> CaptureDevice;

    /// Smallest read size in bytes the device supports for `format`.
    ///
    /// Fails with `RecorderError::Initialization` when the device cannot
    /// capture in that format.
    fn min_buffer_size(&self, format: &AudioFormat) -> Result<usize, RecorderError>;

    /// Open the device and start capturing interleaved little-endian PCM.
    ///
    /// Reads from the returned stream are `buffer_size` bytes, a whole
    /// number of frames.
    fn open(&mut self, format: &AudioFormat, buffer_size: usize) -> Result<Box<dyn CaptureStream>, RecorderError>;
}

/// An open capture stream, exclusively owned by the capture loop.
pub trait CaptureStream: Send {
    /// Block until `buf` is filled, returning the number of bytes written.
    ///
    /// May return `Ok(0)` when nothing arrived within the stream's poll
    /// window, so the caller can check for cancellation. Errors are fatal to
    /// the session.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, RecorderError>;

    /// Stop capturing and release the device. Idempotent.
    fn close(&mut self);
}
