//! cpal microphone capture provider.
//!
//! The cpal stream delivers samples on the backend's callback thread. Each
//! callback batch is converted to little-endian bytes and handed to the
//! reader through a bounded crossbeam channel; `read` re-chunks the bytes
//! into the fixed buffer size the recorder asked for.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, SupportedBufferSize};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;

use wav_capture_core::models::audio_models::{AudioFormat, CaptureDevice};
use wav_capture_core::models::error::RecorderError;
use wav_capture_core::traits::capture_provider::{CaptureProvider, CaptureStream};

use crate::device_enumerator::DeviceEnumerator;

/// Device period assumed when the backend reports no buffer size range.
const FALLBACK_PERIOD_MS: u32 = 20;

/// How long a read waits before returning `Ok(0)`.
const READ_POLL: Duration = Duration::from_millis(50);

/// Callback batches buffered between the device and the reader.
const CHANNEL_DEPTH: usize = 256;

/// Microphone capture through cpal.
pub struct CpalMicCapture {
    device_name: Option<String>,
}

impl CpalMicCapture {
    /// Capture from the system default input device.
    pub fn default_device() -> Self {
        Self { device_name: None }
    }

    /// Capture from the input device called `name`.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    fn device(&self) -> Result<cpal::Device, RecorderError> {
        DeviceEnumerator::new().find_input_device(self.device_name.as_deref())
    }
}

impl CaptureProvider for CpalMicCapture {
    fn is_available(&self) -> bool {
        self.device().is_ok()
    }

    fn device_info(&self) -> CaptureDevice {
        let enumerator = DeviceEnumerator::new();
        let default_name = enumerator.default_input_name();
        match &self.device_name {
            Some(name) => CaptureDevice {
                id: name.clone(),
                name: name.clone(),
                is_default: default_name.as_deref() == Some(name.as_str()),
            },
            None => CaptureDevice {
                id: "default-mic".into(),
                name: default_name.unwrap_or_else(|| "Default Microphone".into()),
                is_default: true,
            },
        }
    }

    fn min_buffer_size(&self, format: &AudioFormat) -> Result<usize, RecorderError> {
        let sample_format = sample_format_for(format)?;
        let device = self.device()?;
        let supported = device
            .supported_input_configs()
            .map_err(|e| RecorderError::Initialization(format!("failed to query input configs: {}", e)))?
            .find(|range| {
                range.channels() == format.channels
                    && range.sample_format() == sample_format
                    && range.min_sample_rate().0 <= format.sample_rate
                    && format.sample_rate <= range.max_sample_rate().0
            })
            .ok_or_else(|| {
                RecorderError::Initialization(format!(
                    "device does not support {} Hz, {} ch, {:?}",
                    format.sample_rate, format.channels, sample_format
                ))
            })?;

        Ok(min_buffer_bytes(supported.buffer_size(), format))
    }

    fn open(&mut self, format: &AudioFormat, buffer_size: usize) -> Result<Box<dyn CaptureStream>, RecorderError> {
        let device_name = self.device_name.clone();
        let format = *format;
        let (data_tx, data_rx) = crossbeam_channel::bounded(CHANNEL_DEPTH);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let fault = Arc::new(Mutex::new(None));
        let stream_fault = Arc::clone(&fault);

        // cpal::Stream is not Send; it lives and dies on this thread.
        let owner = thread::Builder::new()
            .name("cpal-input".into())
            .spawn(move || {
                let stream = match build_stream(device_name.as_deref(), &format, data_tx, stream_fault) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(RecorderError::Initialization(format!(
                        "failed to start input stream: {}",
                        e
                    ))));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Returns once the reader closes or is dropped.
                let _ = shutdown_rx.recv();
                drop(stream);
                log::debug!("Input stream released");
            })
            .map_err(|e| RecorderError::Initialization(format!("failed to spawn input thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = owner.join();
                return Err(e);
            }
            Err(_) => {
                let _ = owner.join();
                return Err(RecorderError::Initialization("input thread exited during setup".into()));
            }
        }

        log::info!(
            "Opened input stream: {} Hz, {} ch, {}-bit, {} byte reads",
            format.sample_rate,
            format.channels,
            format.bits_per_sample,
            buffer_size
        );

        Ok(Box::new(CpalCaptureStream {
            receiver: data_rx,
            pending: Vec::with_capacity(buffer_size * 2),
            fault,
            shutdown: Some(shutdown_tx),
            owner: Some(owner),
        }))
    }
}

/// cpal sample format carrying `format.bits_per_sample`.
fn sample_format_for(format: &AudioFormat) -> Result<SampleFormat, RecorderError> {
    match format.bits_per_sample {
        16 => Ok(SampleFormat::I16),
        32 => Ok(SampleFormat::I32),
        other => Err(RecorderError::Initialization(format!(
            "unsupported bit depth: {}",
            other
        ))),
    }
}

/// Smallest read in bytes for a device buffer range.
fn min_buffer_bytes(buffer_size: &SupportedBufferSize, format: &AudioFormat) -> usize {
    let frames = match buffer_size {
        SupportedBufferSize::Range { min, .. } if *min > 0 => *min as usize,
        _ => (format.sample_rate * FALLBACK_PERIOD_MS / 1_000) as usize,
    };
    frames * format.block_align()
}

fn build_stream(
    device_name: Option<&str>,
    format: &AudioFormat,
    data_tx: Sender<Vec<u8>>,
    fault: Arc<Mutex<Option<String>>>,
) -> Result<cpal::Stream, RecorderError> {
    let device = DeviceEnumerator::new().find_input_device(device_name)?;
    let config = cpal::StreamConfig {
        channels: format.channels,
        sample_rate: cpal::SampleRate(format.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let err_fn = move |err: cpal::StreamError| {
        log::error!("Input stream error: {}", err);
        *fault.lock() = Some(err.to_string());
    };

    let stream = match sample_format_for(format)? {
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                forward(&data_tx, data.iter().flat_map(|s| s.to_le_bytes()).collect());
            },
            err_fn,
            None,
        ),
        _ => device.build_input_stream(
            &config,
            move |data: &[i32], _: &cpal::InputCallbackInfo| {
                forward(&data_tx, data.iter().flat_map(|s| s.to_le_bytes()).collect());
            },
            err_fn,
            None,
        ),
    };

    stream.map_err(|e| RecorderError::Initialization(format!("failed to build input stream: {}", e)))
}

/// Hand one callback batch to the reader. Never blocks the audio thread.
fn forward(data_tx: &Sender<Vec<u8>>, bytes: Vec<u8>) {
    if let Err(TrySendError::Full(dropped)) = data_tx.try_send(bytes) {
        log::warn!("Capture reader is behind; dropped {} bytes", dropped.len());
    }
}

struct CpalCaptureStream {
    receiver: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    fault: Arc<Mutex<Option<String>>>,
    shutdown: Option<Sender<()>>,
    owner: Option<thread::JoinHandle<()>>,
}

impl CaptureStream for CpalCaptureStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, RecorderError> {
        if self.shutdown.is_none() {
            return Err(RecorderError::CaptureFailed("stream closed".into()));
        }

        while self.pending.len() < buf.len() {
            if let Some(reason) = self.fault.lock().take() {
                return Err(RecorderError::CaptureFailed(reason));
            }
            match self.receiver.recv_timeout(READ_POLL) {
                Ok(bytes) => self.pending.extend_from_slice(&bytes),
                Err(RecvTimeoutError::Timeout) => return Ok(0),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(RecorderError::CaptureFailed("input stream ended".into()));
                }
            }
        }

        let n = buf.len();
        buf.copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    fn close(&mut self) {
        // Dropping the sender wakes the owner thread.
        if self.shutdown.take().is_none() {
            return;
        }
        if let Some(owner) = self.owner.take() {
            if owner.join().is_err() {
                log::error!("Input thread panicked");
            }
        }
        self.pending.clear();
    }
}

impl Drop for CpalCaptureStream {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_depth_maps_to_integer_sample_format() {
        assert_eq!(sample_format_for(&AudioFormat::new(44_100, 1, 16)).unwrap(), SampleFormat::I16);
        assert_eq!(sample_format_for(&AudioFormat::new(48_000, 2, 32)).unwrap(), SampleFormat::I32);
        assert!(sample_format_for(&AudioFormat::new(48_000, 2, 24)).is_err());
    }

    #[test]
    fn device_range_minimum_is_scaled_to_bytes() {
        let range = SupportedBufferSize::Range { min: 256, max: 4_096 };
        assert_eq!(min_buffer_bytes(&range, &AudioFormat::new(48_000, 2, 16)), 1_024);
        assert_eq!(min_buffer_bytes(&range, &AudioFormat::new(48_000, 2, 32)), 2_048);
    }

    #[test]
    fn unknown_range_falls_back_to_one_period() {
        let format = AudioFormat::new(44_100, 1, 16);
        // 20 ms at 44.1 kHz is 882 frames.
        assert_eq!(min_buffer_bytes(&SupportedBufferSize::Unknown, &format), 1_764);
        let zero = SupportedBufferSize::Range { min: 0, max: 0 };
        assert_eq!(min_buffer_bytes(&zero, &format), 1_764);
    }

    #[test]
    fn full_channel_drops_batch_without_blocking() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        forward(&tx, vec![1, 2]);
        forward(&tx, vec![3, 4]);
        assert_eq!(rx.try_recv().unwrap(), vec![1, 2]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stream_rechunks_and_reports_faults() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        let (shutdown_tx, _shutdown_rx) = crossbeam_channel::bounded(1);
        let fault = Arc::new(Mutex::new(None));
        let mut stream = CpalCaptureStream {
            receiver: rx,
            pending: Vec::new(),
            fault: Arc::clone(&fault),
            shutdown: Some(shutdown_tx),
            owner: None,
        };

        tx.send(vec![1, 2, 3]).unwrap();
        tx.send(vec![4, 5, 6]).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 4);
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(stream.read(&mut buf).unwrap(), 0);

        *fault.lock() = Some("device disconnected".into());
        assert_eq!(
            stream.read(&mut buf),
            Err(RecorderError::CaptureFailed("device disconnected".into()))
        );

        stream.close();
        assert!(stream.read(&mut buf).is_err());
    }
}
