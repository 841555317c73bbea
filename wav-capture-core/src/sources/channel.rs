use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::models::audio_models::{AudioFormat, CaptureDevice};
use crate::models::error::RecorderError;
use crate::traits::capture_provider::{CaptureProvider, CaptureStream};

/// How long a read waits for data before returning `Ok(0)`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

enum FeedEvent {
    Data(Vec<u8>),
    Failure(String),
}

/// Capture source fed from memory through a crossbeam channel.
///
/// Used to replay PCM from files and to drive the recorder in tests. Data
/// pushed through the paired [`ChannelCaptureFeed`] is re-chunked into
/// reads of exactly the stream's buffer size.
pub struct ChannelCaptureProvider {
    device: CaptureDevice,
    min_buffer_size: usize,
    poll_interval: Duration,
    available: bool,
    receiver: Receiver<FeedEvent>,
}

/// Producer half of a [`ChannelCaptureProvider`].
#[derive(Clone)]
pub struct ChannelCaptureFeed {
    sender: Sender<FeedEvent>,
}

impl ChannelCaptureProvider {
    pub fn new(min_buffer_size: usize) -> (Self, ChannelCaptureFeed) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let provider = Self {
            device: CaptureDevice {
                id: "channel".into(),
                name: "In-memory capture".into(),
                is_default: false,
            },
            min_buffer_size,
            poll_interval: DEFAULT_POLL_INTERVAL,
            available: true,
            receiver,
        };
        (provider, ChannelCaptureFeed { sender })
    }

    pub fn with_availability(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl CaptureProvider for ChannelCaptureProvider {
    fn is_available(&self) -> bool {
        self.available
    }

    fn device_info(&self) -> CaptureDevice {
        self.device.clone()
    }

    fn min_buffer_size(&self, format: &AudioFormat) -> Result<usize, RecorderError> {
        format.validate().map_err(RecorderError::Initialization)?;
        Ok(self.min_buffer_size)
    }

    fn open(&mut self, format: &AudioFormat, buffer_size: usize) -> Result<Box<dyn CaptureStream>, RecorderError> {
        if !self.available {
            return Err(RecorderError::Initialization("in-memory capture disabled".into()));
        }
        log::debug!("Opening in-memory capture: {:?}, {} byte reads", format, buffer_size);
        Ok(Box::new(ChannelCaptureStream {
            receiver: self.receiver.clone(),
            pending: Vec::with_capacity(buffer_size),
            poll_interval: self.poll_interval,
            closed: false,
        }))
    }
}

impl ChannelCaptureFeed {
    /// Queue PCM bytes. Returns `false` if the provider is gone.
    pub fn push(&self, pcm: impl Into<Vec<u8>>) -> bool {
        self.sender.send(FeedEvent::Data(pcm.into())).is_ok()
    }

    /// Make the next read fail with `RecorderError::CaptureFailed`.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.sender.send(FeedEvent::Failure(reason.into())).is_ok()
    }

    /// Number of pushes not yet picked up by a stream.
    pub fn queued(&self) -> usize {
        self.sender.len()
    }
}

struct ChannelCaptureStream {
    receiver: Receiver<FeedEvent>,
    pending: Vec<u8>,
    poll_interval: Duration,
    closed: bool,
}

impl CaptureStream for ChannelCaptureStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, RecorderError> {
        if self.closed {
            return Err(RecorderError::CaptureFailed("stream closed".into()));
        }

        while self.pending.len() < buf.len() {
            match self.receiver.recv_timeout(self.poll_interval) {
                Ok(FeedEvent::Data(bytes)) => self.pending.extend_from_slice(&bytes),
                Ok(FeedEvent::Failure(reason)) => return Err(RecorderError::CaptureFailed(reason)),
                Err(RecvTimeoutError::Timeout) => return Ok(0),
                Err(RecvTimeoutError::Disconnected) => {
                    if self.pending.is_empty() {
                        return Err(RecorderError::CaptureFailed("capture feed disconnected".into()));
                    }
                    break;
                }
            }
        }

        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
    }
}
