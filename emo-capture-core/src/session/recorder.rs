use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::chunk_recorder::{ChunkRecorder, ChunkRecorderOptions};
use crate::codec::{self, DecodeContext, EncoderSpec};
use crate::models::audio_models::{AudioLevels, AudioSource, CaptureSessionDiagnostics};
use crate::models::config::RecorderConfig;
use crate::models::error::CaptureError;
use crate::models::recording_result::EncodedAudioBlob;
use crate::processing::graph::AudioGraph;
use crate::processing::trim::trim;
use crate::processing::wav_format::encode_wav;
use crate::traits::capture_provider::{CaptureProvider, StreamHandle};

/// Platform-agnostic recording orchestrator.
///
/// Generic over the microphone backend via the `CaptureProvider` trait.
///
/// ```text
/// [Provider] → [SourceNode] → [DestinationNode] → [ChunkRecorder] → ChunkBuffer
///                                                                      │ stop
///                     EncodedAudioBlob ← encode_wav ← trim ← DecodeContext
/// ```
///
/// At most one `CaptureSession` is live per recorder.
pub struct AudioRecorder<P: CaptureProvider> {
    id: Uuid,
    provider: P,
    config: RecorderConfig,
    active: Arc<AtomicBool>,
}

impl<P: CaptureProvider> AudioRecorder<P> {
    pub fn new(provider: P, config: RecorderConfig) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(Self {
            id: Uuid::new_v4(),
            provider,
            config,
            active: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Whether a session started by this recorder is still live.
    pub fn is_recording(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Input devices known to the backend. No side effects.
    pub fn list_input_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        self.provider.input_devices()
    }

    /// Open the microphone and start recording.
    ///
    /// `device_id` of `None` selects the system default input. Fails with
    /// `SessionActive` while another session is live, and with `DeviceAccess`
    /// when the backend refuses the stream; nothing stays acquired on failure.
    pub async fn start_capture(&self, device_id: Option<&str>) -> Result<CaptureSession, CaptureError> {
        let guard = ActiveGuard::acquire(&self.active)?;
        let config = &self.config;

        let graph = AudioGraph::new(config.sample_rate, config.channels);
        let source = graph.create_source();
        let mut destination = graph.create_destination();
        graph.connect(&mut destination)?;
        let output = destination
            .take_stream()
            .ok_or_else(|| CaptureError::ConfigurationFailed("destination stream already taken".into()))?;

        let spec = EncoderSpec {
            sample_rate: config.sample_rate,
            channels: config.channels,
            bits_per_second: config.audio_bits_per_second,
        };
        let choice = codec::select_codec(&config.preferred_mime_type, &spec);
        let encoder = choice.codec.create_encoder(spec)?;

        let constraints = config.constraints(device_id);
        let mut stream = self.provider.open_stream(&constraints, source.callback())?;
        let settings = stream.settings();

        let options = ChunkRecorderOptions {
            timeslice: config.timeslice(),
            channels: config.channels,
            max_frames: config
                .max_duration_secs
                .map(|secs| (secs * config.sample_rate as f64) as u64),
        };
        let recorder = match ChunkRecorder::start(output, encoder, options).await {
            Ok(recorder) => recorder,
            Err(e) => {
                stream.stop();
                graph.close();
                return Err(e);
            }
        };

        log::info!(
            "Capture started: device={} granted={} Hz/{} ch graph={} Hz/{} ch codec={}",
            device_id.unwrap_or("default"),
            settings.sample_rate,
            settings.channels,
            config.sample_rate,
            config.channels,
            recorder.mime_type()
        );

        Ok(CaptureSession {
            id: Uuid::new_v4(),
            recorder_id: self.id,
            started_at: Utc::now(),
            started: Instant::now(),
            codec_fell_back: choice.fell_back,
            stream: Some(stream),
            graph,
            recorder: Some(recorder),
            _guard: guard,
        })
    }

    /// Stop a session and produce the trimmed WAV recording.
    ///
    /// The microphone, graph and recorder are released whether or not decoding
    /// succeeds, so a new session can be started afterwards.
    pub async fn stop_capture(&self, mut session: CaptureSession) -> Result<EncodedAudioBlob, CaptureError> {
        if session.recorder_id != self.id {
            return Err(CaptureError::ConfigurationFailed(
                "session was started by a different recorder".into(),
            ));
        }

        session.release_stream();
        session.graph.close();
        let elapsed = session.elapsed_secs();
        let recorder = session
            .recorder
            .take()
            .ok_or_else(|| CaptureError::Unknown("session has no recorder".into()))?;
        let result = recorder.finish().await;
        drop(session);
        let chunks = result?;

        let config = &self.config;
        log::debug!(
            "Decoding {} chunks ({} bytes) after {:.2}s",
            chunks.len(),
            chunks.total_bytes(),
            elapsed
        );
        let decoded = DecodeContext::new(config.sample_rate).decode(&chunks.concat())?;
        let trimmed = trim(&decoded, config.lead_trim_secs, config.tail_trim_secs);
        let blob = encode_wav(&trimmed, config.bit_depth())?;

        log::info!(
            "Capture stopped: {:.2}s decoded, {:.2}s kept, {} bytes WAV",
            decoded.duration_secs(),
            trimmed.duration_secs(),
            blob.len()
        );
        Ok(blob)
    }
}

/// A live recording. Consumed by `AudioRecorder::stop_capture`.
///
/// Dropping a session without stopping it releases the microphone, closes the
/// graph and discards the recording.
pub struct CaptureSession {
    id: Uuid,
    recorder_id: Uuid,
    started_at: DateTime<Utc>,
    started: Instant,
    codec_fell_back: bool,
    stream: Option<Box<dyn StreamHandle>>,
    graph: AudioGraph,
    recorder: Option<ChunkRecorder>,
    _guard: ActiveGuard,
}

impl CaptureSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// MIME type of the chunk codec in use.
    pub fn mime_type(&self) -> &'static str {
        self.recorder
            .as_ref()
            .map(ChunkRecorder::mime_type)
            .unwrap_or(codec::DEFAULT_MIME_TYPE)
    }

    /// Whether the preferred codec was unavailable and the default was used.
    pub fn codec_fell_back(&self) -> bool {
        self.codec_fell_back
    }

    pub fn levels(&self) -> AudioLevels {
        self.graph.levels()
    }

    pub fn diagnostics(&self) -> CaptureSessionDiagnostics {
        let mut diagnostics = self.graph.diagnostics();
        diagnostics.chunks_emitted = self
            .recorder
            .as_ref()
            .map(ChunkRecorder::chunks_emitted)
            .unwrap_or_default();
        diagnostics
    }

    fn release_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release_stream();
        self.graph.close();
        if self.recorder.take().is_some() {
            log::warn!("Capture session {} dropped without being stopped", self.id);
        }
    }
}

/// Holds the recorder's "active" flag for the lifetime of a session.
struct ActiveGuard {
    flag: Arc<AtomicBool>,
}

impl ActiveGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, CaptureError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| CaptureError::SessionActive)?;
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
