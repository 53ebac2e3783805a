//! Input device enumeration over the default cpal host.
//!
//! cpal exposes no stable endpoint ids, so the device name doubles as its id.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

use emo_capture_core::models::audio_models::AudioSource;

use crate::error::BackendError;

pub struct DeviceEnumerator {
    host: Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Name of the backing host API (ALSA, WASAPI, CoreAudio, ...).
    pub fn host_name(&self) -> &'static str {
        self.host.id().name()
    }

    /// List input devices in host order.
    pub fn list_capture_devices(&self) -> Result<Vec<AudioSource>, BackendError> {
        let default_id = self.default_capture_device_id();
        let devices = self.host.input_devices().map_err(BackendError::Devices)?;

        let mut sources = Vec::new();
        for (index, device) in devices.enumerate() {
            let id = match device.name() {
                Ok(name) => name,
                Err(e) => {
                    log::debug!("Skipping input device {}: {}", index, e);
                    continue;
                }
            };
            sources.push(AudioSource {
                is_default: default_id.as_deref() == Some(id.as_str()),
                label: id.clone(),
                id,
            });
        }
        Ok(sources)
    }

    pub fn default_capture_device_id(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    /// The device with exactly this id, or the default input for `None`.
    pub fn find_capture_device(&self, id: Option<&str>) -> Result<Device, BackendError> {
        match id {
            None => self.host.default_input_device().ok_or(BackendError::NoDefaultDevice),
            Some(id) => self
                .host
                .input_devices()
                .map_err(BackendError::Devices)?
                .find(|d| d.name().map(|n| n == id).unwrap_or(false))
                .ok_or_else(|| BackendError::DeviceNotFound(id.to_string())),
        }
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}
