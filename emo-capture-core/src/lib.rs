//! # emo-capture-core
//!
//! Platform-agnostic speech capture core library.
//!
//! Records a microphone through a small audio graph into time-sliced Ogg
//! chunks, then decodes, trims and re-encodes the take as a canonical WAV.
//! Platform backends implement the `CaptureProvider` trait and plug into the
//! generic `AudioRecorder`.
//!
//! ## Architecture
//!
//! ```text
//! emo-capture-core (this crate)
//! ├── traits/       ← CaptureProvider, StreamHandle, ChunkEncoder
//! ├── models/       ← CaptureError, RecorderConfig, AudioSource, EncodedAudioBlob, etc.
//! ├── processing/   ← AudioGraph, AudioBuffer, resampling, trim, WAV encoding
//! ├── codec/        ← Ogg chunk encoders (PCM, Opus), DecodeContext
//! ├── session/      ← AudioRecorder, CaptureSession, ChunkRecorder
//! └── storage/      ← recording naming, metadata sidecar, file output
//! ```

pub mod codec;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use codec::{is_type_supported, select_codec, ChunkCodec, CodecChoice, DecodeContext, EncoderSpec};
pub use models::audio_models::{AudioLevels, AudioSource, CaptureSessionDiagnostics};
pub use models::config::{BitDepth, QualityProfile, RecorderConfig, StreamConstraints};
pub use models::error::CaptureError;
pub use models::recording_result::{EncodedAudioBlob, RecordingMetadata, WAV_MIME_TYPE};
pub use processing::audio_buffer::AudioBuffer;
pub use processing::graph::{AudioGraph, DestinationNode, SourceNode};
pub use processing::trim::trim;
pub use processing::wav_format::{encode_wav, WavInfo};
pub use session::chunk_recorder::{ChunkBuffer, ChunkRecorder};
pub use session::recorder::{AudioRecorder, CaptureSession};
pub use storage::metadata::{read_metadata, verify_recording, write_metadata};
pub use storage::naming::{recording_file_name, recording_path, slugify};
pub use storage::writer::save_recording;
pub use traits::capture_provider::{AudioBufferCallback, CaptureProvider, StreamHandle, StreamSettings};
pub use traits::chunk_encoder::ChunkEncoder;
