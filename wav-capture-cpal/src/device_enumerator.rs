//! Input device enumeration through the default cpal host.

use cpal::traits::{DeviceTrait, HostTrait};

use wav_capture_core::models::audio_models::CaptureDevice;
use wav_capture_core::models::error::RecorderError;

/// Audio device enumerator over the platform's default cpal host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List input (microphone) devices.
    pub fn list_input_devices(&self) -> Result<Vec<CaptureDevice>, RecorderError> {
        let default_name = self.default_input_name();
        let devices = self
            .host
            .input_devices()
            .map_err(|e| RecorderError::Initialization(format!("failed to list input devices: {}", e)))?;

        let mut result = Vec::new();
        for device in devices {
            let Ok(name) = device.name() else {
                log::debug!("Skipping input device without a name");
                continue;
            };
            result.push(CaptureDevice {
                id: name.clone(),
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
            });
        }
        Ok(result)
    }

    /// Name of the system default input device, if there is one.
    pub fn default_input_name(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    /// Resolve an input device by name, or the default device for `None`.
    pub fn find_input_device(&self, name: Option<&str>) -> Result<cpal::Device, RecorderError> {
        let Some(name) = name else {
            return self
                .host
                .default_input_device()
                .ok_or_else(|| RecorderError::Initialization("no default input device".into()));
        };

        self.host
            .input_devices()
            .map_err(|e| RecorderError::Initialization(format!("failed to list input devices: {}", e)))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| RecorderError::Initialization(format!("input device {:?} not found", name)))
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}
