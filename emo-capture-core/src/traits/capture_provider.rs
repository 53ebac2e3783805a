use std::sync::Arc;

use crate::models::audio_models::AudioSource;
use crate::models::config::StreamConstraints;
use crate::models::error::CaptureError;

/// Callback invoked when an audio buffer is available.
///
/// Parameters:
/// - `samples`: Interleaved f32 samples.
/// - `sample_rate`: The actual sample rate of the delivered audio.
/// - `channels`: Number of channels (1 = mono, 2 = stereo interleaved).
pub type AudioBufferCallback = Arc<dyn Fn(&[f32], f64, u16) + Send + Sync + 'static>;

/// Format the backend actually granted for an open stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub sample_rate: u32,
    pub channels: u16,
}

/// A live hardware input stream.
///
/// Dropping the handle must release the device as well.
pub trait StreamHandle: Send {
    fn settings(&self) -> StreamSettings;

    /// Stop all tracks and release the device. Idempotent.
    fn stop(&mut self);
}

/// Interface for platform-specific microphone backends.
///
/// Implemented by:
/// - `CpalCaptureProvider` (emo-capture-cpal)
pub trait CaptureProvider: Send + Sync {
    /// Input devices currently known to the backend. Order is backend-defined.
    fn input_devices(&self) -> Result<Vec<AudioSource>, CaptureError>;

    /// Open an input stream honouring `constraints`, delivering buffers via `callback`.
    ///
    /// The callback may fire on a backend audio thread before this returns.
    /// Fails with `CaptureError::DeviceAccess` when permission is denied or
    /// no device matches, holding no device afterwards.
    fn open_stream(
        &self,
        constraints: &StreamConstraints,
        callback: AudioBufferCallback,
    ) -> Result<Box<dyn StreamHandle>, CaptureError>;
}
