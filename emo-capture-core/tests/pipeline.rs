use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use emo_capture_core::{
    AudioBufferCallback, AudioRecorder, AudioSource, CaptureError, CaptureProvider, QualityProfile,
    RecorderConfig, StreamConstraints, StreamHandle, StreamSettings, WavInfo,
};
use emo_capture_core::codec::PCM_MIME_TYPE;
use parking_lot::Mutex;

/// Backend that replays fixed blocks as soon as a stream opens.
struct ScriptedProvider {
    devices: Vec<AudioSource>,
    blocks: Vec<Vec<f32>>,
    sample_rate: u32,
    channels: u16,
    open_streams: Arc<AtomicUsize>,
    last_constraints: Arc<Mutex<Option<StreamConstraints>>>,
}

impl ScriptedProvider {
    fn new(blocks: Vec<Vec<f32>>, sample_rate: u32, channels: u16) -> Self {
        Self {
            devices: vec![
                AudioSource {
                    id: "mic-1".into(),
                    label: "USB Microphone".into(),
                    is_default: true,
                },
                AudioSource {
                    id: "mic-2".into(),
                    label: String::new(),
                    is_default: false,
                },
            ],
            blocks,
            sample_rate,
            channels,
            open_streams: Arc::new(AtomicUsize::new(0)),
            last_constraints: Arc::new(Mutex::new(None)),
        }
    }

    /// `seconds` of constant mono audio at 48 kHz in 100 ms blocks.
    fn mono_48k(seconds: usize, value: f32) -> Self {
        let blocks = (0..seconds * 10).map(|_| vec![value; 4800]).collect();
        Self::new(blocks, 48000, 1)
    }
}

struct ScriptedStream {
    settings: StreamSettings,
    open_streams: Arc<AtomicUsize>,
    stopped: bool,
}

impl StreamHandle for ScriptedStream {
    fn settings(&self) -> StreamSettings {
        self.settings
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.open_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl CaptureProvider for ScriptedProvider {
    fn input_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        Ok(self.devices.clone())
    }

    fn open_stream(
        &self,
        constraints: &StreamConstraints,
        callback: AudioBufferCallback,
    ) -> Result<Box<dyn StreamHandle>, CaptureError> {
        if let Some(id) = &constraints.device_id {
            if !self.devices.iter().any(|d| &d.id == id) {
                return Err(CaptureError::DeviceAccess(format!("no device with id {}", id)));
            }
        }
        *self.last_constraints.lock() = Some(constraints.clone());
        self.open_streams.fetch_add(1, Ordering::SeqCst);

        for block in &self.blocks {
            callback(block, self.sample_rate as f64, self.channels);
        }

        Ok(Box::new(ScriptedStream {
            settings: StreamSettings {
                sample_rate: self.sample_rate,
                channels: self.channels,
            },
            open_streams: Arc::clone(&self.open_streams),
            stopped: false,
        }))
    }
}

/// Lossless chunk codec so sample values survive the round trip exactly.
fn pcm_config() -> RecorderConfig {
    RecorderConfig {
        preferred_mime_type: PCM_MIME_TYPE.into(),
        ..RecorderConfig::default()
    }
}

fn recorder(provider: ScriptedProvider) -> AudioRecorder<ScriptedProvider> {
    AudioRecorder::new(provider, pcm_config()).unwrap()
}

#[tokio::test]
async fn two_seconds_become_one_second_of_16_bit_wav() {
    let recorder = recorder(ScriptedProvider::mono_48k(2, 0.5));

    let session = recorder.start_capture(None).await.unwrap();
    assert!(recorder.is_recording());
    let blob = recorder.stop_capture(session).await.unwrap();

    assert_eq!(blob.mime_type(), "audio/wav");
    assert_eq!(blob.len(), 96044);
    let info = WavInfo::parse(blob.bytes()).unwrap();
    assert_eq!(info.sample_rate, 48000);
    assert_eq!(info.channels, 1);
    assert_eq!(info.bits_per_sample, 16);
    assert_eq!(info.frame_count(), 48000);
    // 0.5 * 0x7FFF truncated
    assert_eq!(&blob.bytes()[44..46], &16383i16.to_le_bytes());

    assert!(!recorder.is_recording());
    assert_eq!(recorder.provider().open_streams.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn hound_reads_the_output() {
    let recorder = recorder(ScriptedProvider::mono_48k(2, -0.25));
    let session = recorder.start_capture(None).await.unwrap();
    let blob = recorder.stop_capture(session).await.unwrap();

    let mut reader = hound::WavReader::new(Cursor::new(blob.into_bytes())).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 48000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
    assert_eq!(samples.len(), 48000);
    assert!(samples.iter().all(|&s| s == -8192));
}

#[tokio::test]
async fn studio_profile_writes_24_bit() {
    let config = RecorderConfig {
        profile: QualityProfile::Studio,
        ..pcm_config()
    };
    let recorder = AudioRecorder::new(ScriptedProvider::mono_48k(2, 1.0), config).unwrap();
    let session = recorder.start_capture(None).await.unwrap();
    let blob = recorder.stop_capture(session).await.unwrap();

    assert_eq!(blob.len(), 44 + 48000 * 3);
    assert_eq!(&blob.bytes()[44..47], &[0xFF, 0xFF, 0x7F]);
    let sample_size = recorder
        .provider()
        .last_constraints
        .lock()
        .as_ref()
        .map(|c| c.sample_size);
    assert_eq!(sample_size, Some(24));
}

#[tokio::test]
async fn constraints_disable_processing() {
    let recorder = recorder(ScriptedProvider::mono_48k(2, 0.1));
    let session = recorder.start_capture(Some("mic-2")).await.unwrap();
    drop(session);

    let constraints = recorder.provider().last_constraints.lock().clone().unwrap();
    assert_eq!(constraints.device_id.as_deref(), Some("mic-2"));
    assert_eq!(constraints.channel_count, 1);
    assert_eq!(constraints.sample_rate, 48000);
    assert_eq!(constraints.sample_size, 16);
    assert!(!constraints.echo_cancellation);
    assert!(!constraints.noise_suppression);
    assert!(!constraints.auto_gain_control);
}

#[tokio::test]
async fn second_start_fails_without_opening_hardware() {
    let recorder = recorder(ScriptedProvider::mono_48k(2, 0.1));
    let session = recorder.start_capture(None).await.unwrap();

    let second = recorder.start_capture(None).await;
    assert!(matches!(second, Err(CaptureError::SessionActive)));
    assert_eq!(recorder.provider().open_streams.load(Ordering::SeqCst), 1);

    recorder.stop_capture(session).await.unwrap();
    let third = recorder.start_capture(None).await.unwrap();
    recorder.stop_capture(third).await.unwrap();
}

#[tokio::test]
async fn unknown_device_is_device_access_and_leaves_no_session() {
    let recorder = recorder(ScriptedProvider::mono_48k(1, 0.1));

    let result = recorder.start_capture(Some("missing")).await;
    assert!(matches!(result, Err(CaptureError::DeviceAccess(_))));
    assert!(!recorder.is_recording());
    assert_eq!(recorder.provider().open_streams.load(Ordering::SeqCst), 0);

    let session = recorder.start_capture(Some("mic-1")).await.unwrap();
    recorder.stop_capture(session).await.unwrap();
}

#[tokio::test]
async fn silent_stream_fails_decode_and_resets_state() {
    let recorder = recorder(ScriptedProvider::new(Vec::new(), 48000, 1));
    let session = recorder.start_capture(None).await.unwrap();

    let result = recorder.stop_capture(session).await;
    assert!(matches!(result, Err(CaptureError::Decode(_))));
    assert!(!recorder.is_recording());
    assert_eq!(recorder.provider().open_streams.load(Ordering::SeqCst), 0);

    let session = recorder.start_capture(None).await.unwrap();
    drop(session);
}

#[tokio::test]
async fn short_take_is_not_trimmed() {
    let blocks = vec![vec![0.2f32; 4800]; 5];
    let recorder = recorder(ScriptedProvider::new(blocks, 48000, 1));
    let session = recorder.start_capture(None).await.unwrap();
    let blob = recorder.stop_capture(session).await.unwrap();
    assert_eq!(blob.len(), 44 + 24000 * 2);
}

#[tokio::test]
async fn device_format_is_adapted_to_the_graph() {
    // One second of stereo audio at 96 kHz, in 50 ms blocks.
    let blocks = vec![vec![0.5f32; 4800 * 2]; 20];
    let recorder = recorder(ScriptedProvider::new(blocks, 96000, 2));
    let session = recorder.start_capture(None).await.unwrap();
    let blob = recorder.stop_capture(session).await.unwrap();

    // 48000 frames remain after resampling; trimming a full second passes through.
    let info = WavInfo::parse(blob.bytes()).unwrap();
    assert_eq!(info.sample_rate, 48000);
    assert_eq!(info.channels, 1);
    assert_eq!(info.frame_count(), 48000);
}

#[tokio::test]
async fn fractional_rate_ratio_keeps_every_frame() {
    // Two seconds at 44.1 kHz in 512-frame callbacks, as a CD-rate device delivers them.
    let input: Vec<f32> = (0..88200).map(|i| (i as f32 * 0.02).sin() * 0.3).collect();
    let blocks: Vec<Vec<f32>> = input.chunks(512).map(|block| block.to_vec()).collect();
    let recorder = recorder(ScriptedProvider::new(blocks, 44100, 1));
    let session = recorder.start_capture(None).await.unwrap();
    let blob = recorder.stop_capture(session).await.unwrap();

    // 96000 graph frames minus half a second trimmed at each end.
    assert_eq!(blob.len(), 96044);
    let info = WavInfo::parse(blob.bytes()).unwrap();
    assert_eq!(info.frame_count(), 48000);
}

#[tokio::test]
async fn unsupported_preference_falls_back_to_default_codec() {
    let config = RecorderConfig {
        preferred_mime_type: "audio/webm; codecs=opus".into(),
        ..RecorderConfig::default()
    };
    let recorder = AudioRecorder::new(ScriptedProvider::mono_48k(2, 0.1), config).unwrap();
    let session = recorder.start_capture(None).await.unwrap();
    assert!(session.codec_fell_back());
    assert_eq!(session.mime_type(), PCM_MIME_TYPE);
    let blob = recorder.stop_capture(session).await.unwrap();
    assert_eq!(blob.len(), 96044);
}

#[tokio::test]
async fn dropped_session_releases_everything() {
    let recorder = recorder(ScriptedProvider::mono_48k(1, 0.1));
    let session = recorder.start_capture(None).await.unwrap();
    assert!(session.diagnostics().callback_count > 0);
    drop(session);

    assert!(!recorder.is_recording());
    assert_eq!(recorder.provider().open_streams.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn foreign_session_is_rejected() {
    let first = recorder(ScriptedProvider::mono_48k(1, 0.1));
    let second = recorder(ScriptedProvider::mono_48k(1, 0.1));
    let session = first.start_capture(None).await.unwrap();

    let result = second.stop_capture(session).await;
    assert!(matches!(result, Err(CaptureError::ConfigurationFailed(_))));
    assert!(!first.is_recording());
}

#[test]
fn lists_devices_in_backend_order() {
    let recorder = recorder(ScriptedProvider::mono_48k(1, 0.0));
    let devices = recorder.list_input_devices().unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].id, "mic-1");
    assert!(devices[0].is_default);
    assert!(devices[1].label.is_empty());
}
