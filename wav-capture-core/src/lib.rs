//! # wav-capture-core
//!
//! Platform-agnostic PCM capture core library.
//!
//! Pulls raw PCM from a capture source, streams it into a `.wav` file whose
//! header is patched with the final sizes on stop, and meters every chunk
//! for a live waveform. Platform backends (cpal, in-memory) implement the
//! `CaptureProvider` trait and plug into the generic `Recorder`.
//!
//! ## Architecture
//!
//! ```text
//! wav-capture-core (this crate)
//! ├── traits/       ← CaptureProvider, CaptureStream, RecorderListener, TimerListener
//! ├── models/       ← RecorderError, RecorderState, RecorderConfiguration, AudioFormat, RecordingResult
//! ├── processing/   ← WAV header codec, amplitude metering, waveform ring buffer
//! ├── session/      ← Recorder (state machine + capture loop), PauseGate
//! ├── sources/      ← ChannelCaptureProvider (in-memory source)
//! ├── storage/      ← WavFileWriter, recording file names
//! └── timing/       ← Timer, Clock
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod sources;
pub mod storage;
pub mod timing;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioFormat, CaptureDevice};
pub use models::config::{PausePolicy, RecorderConfiguration};
pub use models::error::RecorderError;
pub use models::recording_result::RecordingResult;
pub use models::state::RecorderState;
pub use processing::amplitude::AmplitudePolicy;
pub use processing::wav_format::WaveHeader;
pub use processing::waveform_buffer::{SharedWaveform, WaveformRingBuffer};
pub use session::recorder::Recorder;
pub use sources::channel::{ChannelCaptureFeed, ChannelCaptureProvider};
pub use storage::wav_writer::WavFileWriter;
pub use timing::clock::{Clock, ManualClock, MonotonicClock};
pub use timing::timer::Timer;
pub use traits::capture_provider::{CaptureProvider, CaptureStream};
pub use traits::recorder_listener::RecorderListener;
pub use traits::timer_listener::TimerListener;
