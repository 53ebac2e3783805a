use thiserror::Error;

use emo_capture_core::models::error::CaptureError;

/// Failures raised by the cpal backend before they reach the core.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no default input device")]
    NoDefaultDevice,

    #[error("no input device named '{0}'")]
    DeviceNotFound(String),

    #[error("failed to enumerate devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query input configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported sample format: {0:?}")]
    SampleFormat(cpal::SampleFormat),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("stream thread error: {0}")]
    Thread(String),
}

impl From<BackendError> for CaptureError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Thread(msg) => CaptureError::Unknown(msg),
            other => CaptureError::DeviceAccess(other.to_string()),
        }
    }
}
