use thiserror::Error;

/// Errors that can occur while capturing, decoding or encoding a recording.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Permission denied, or no device matched the requested constraints.
    #[error("device access failed: {0}")]
    DeviceAccess(String),

    /// The recorded chunk stream could not be decoded at stop time.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The requested chunk codec is not available in this build.
    ///
    /// Never returned from `start_capture`; the recorder falls back to the
    /// default codec instead.
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("a capture session is already active")]
    SessionActive,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}
