//! # emo-capture-cpal
//!
//! Cross-platform microphone backend for emo-capture, built on cpal.
//!
//! Provides:
//! - `CpalCaptureProvider`: microphone streams honouring `StreamConstraints`
//! - `DeviceEnumerator`: input device listing on the default host
//!
//! ## Platform Requirements
//! - Linux: ALSA development headers (`libasound2-dev`)
//! - Windows / macOS: no extra system libraries
//!
//! ## Usage
//! ```ignore
//! use emo_capture_core::{AudioRecorder, RecorderConfig};
//! use emo_capture_cpal::CpalCaptureProvider;
//!
//! let recorder = AudioRecorder::new(CpalCaptureProvider::new(), RecorderConfig::default())?;
//! let session = recorder.start_capture(None).await?;
//! // ...
//! let wav = recorder.stop_capture(session).await?;
//! ```

pub mod cpal_mic;
pub mod device_enumerator;
pub mod error;

pub use cpal_mic::{CpalCaptureProvider, CpalStreamHandle};
pub use device_enumerator::DeviceEnumerator;
pub use error::BackendError;
