//! # wav-capture-cpal
//!
//! cpal backend for wav-capture-core.
//!
//! Provides:
//! - `CpalMicCapture`: Microphone capture via the platform's default cpal host
//! - `DeviceEnumerator`: Input device enumeration
//!
//! ## Usage
//! ```ignore
//! use wav_capture_cpal::CpalMicCapture;
//! use wav_capture_core::{Recorder, RecorderConfiguration};
//!
//! let mic = CpalMicCapture::default_device();
//! let mut recorder = Recorder::new(mic, RecorderConfiguration::new("take.wav"));
//! recorder.start()?;
//! ```

pub mod cpal_mic;
pub mod device_enumerator;

pub use cpal_mic::CpalMicCapture;
pub use device_enumerator::DeviceEnumerator;
