//! cpal microphone capture provider.
//!
//! Every open stream lives on its own thread because `cpal::Stream` is not
//! `Send` on all hosts. Samples of any integer or float format are delivered
//! to the core as interleaved f32.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use parking_lot::Mutex;

use emo_capture_core::models::audio_models::AudioSource;
use emo_capture_core::models::config::StreamConstraints;
use emo_capture_core::models::error::CaptureError;
use emo_capture_core::traits::capture_provider::{
    AudioBufferCallback, CaptureProvider, StreamHandle, StreamSettings,
};

use crate::device_enumerator::DeviceEnumerator;
use crate::error::BackendError;

/// Microphone backend over the default cpal host.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalCaptureProvider;

impl CpalCaptureProvider {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureProvider for CpalCaptureProvider {
    fn input_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        Ok(DeviceEnumerator::new().list_capture_devices()?)
    }

    fn open_stream(
        &self,
        constraints: &StreamConstraints,
        callback: AudioBufferCallback,
    ) -> Result<Box<dyn StreamHandle>, CaptureError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let last_error = Arc::new(Mutex::new(None));

        let thread_constraints = constraints.clone();
        let thread_error = Arc::clone(&last_error);
        let thread = thread::Builder::new()
            .name("cpal-mic-capture".into())
            .spawn(move || run_stream(thread_constraints, callback, thread_error, ready_tx, stop_rx))
            .map_err(|e| BackendError::Thread(format!("failed to spawn capture thread: {}", e)))?;

        let settings = match ready_rx.recv() {
            Ok(Ok(settings)) => settings,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e.into());
            }
            Err(_) => {
                let _ = thread.join();
                return Err(BackendError::Thread("capture thread exited before opening".into()).into());
            }
        };

        log::info!(
            "Opened input stream on '{}': {} Hz, {} ch",
            constraints.device_id.as_deref().unwrap_or("default"),
            settings.sample_rate,
            settings.channels
        );

        Ok(Box::new(CpalStreamHandle {
            settings,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
            last_error,
        }))
    }
}

/// Live cpal input stream. Dropping it stops the stream.
pub struct CpalStreamHandle {
    settings: StreamSettings,
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl CpalStreamHandle {
    /// Most recent error reported by the host while streaming.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

impl StreamHandle for CpalStreamHandle {
    fn settings(&self) -> StreamSettings {
        self.settings
    }

    fn stop(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Capture thread panicked");
            }
        }
    }
}

impl Drop for CpalStreamHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_stream(
    constraints: StreamConstraints,
    callback: AudioBufferCallback,
    last_error: Arc<Mutex<Option<String>>>,
    ready: mpsc::Sender<Result<StreamSettings, BackendError>>,
    stop: mpsc::Receiver<()>,
) {
    let stream = match open_device_stream(&constraints, callback, last_error) {
        Ok((stream, settings)) => {
            let _ = ready.send(Ok(settings));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    // Either a stop message or the handle being dropped ends the stream.
    let _ = stop.recv();
    if let Err(e) = stream.pause() {
        log::debug!("Failed to pause input stream: {}", e);
    }
    drop(stream);
    log::debug!("Input stream closed");
}

fn open_device_stream(
    constraints: &StreamConstraints,
    callback: AudioBufferCallback,
    last_error: Arc<Mutex<Option<String>>>,
) -> Result<(Stream, StreamSettings), BackendError> {
    let device = DeviceEnumerator::new().find_capture_device(constraints.device_id.as_deref())?;
    let (config, sample_format) = select_config(&device, constraints)?;

    let err_fn = move |err: cpal::StreamError| {
        log::error!("Input stream error: {}", err);
        *last_error.lock() = Some(err.to_string());
    };

    let stream = match sample_format {
        SampleFormat::I16 => build_typed::<i16>(&device, &config, callback, err_fn)?,
        SampleFormat::U16 => build_typed::<u16>(&device, &config, callback, err_fn)?,
        SampleFormat::I32 => build_typed::<i32>(&device, &config, callback, err_fn)?,
        SampleFormat::F32 => build_typed::<f32>(&device, &config, callback, err_fn)?,
        other => return Err(BackendError::SampleFormat(other)),
    };
    stream.play()?;

    let settings = StreamSettings {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };
    Ok((stream, settings))
}

fn build_typed<T>(
    device: &Device,
    config: &StreamConfig,
    callback: AudioBufferCallback,
    err_fn: impl FnMut(cpal::StreamError) + Send + 'static,
) -> Result<Stream, BackendError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let sample_rate = config.sample_rate.0 as f64;
    let channels = config.channels;
    let mut scratch: Vec<f32> = Vec::new();

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            scratch.clear();
            scratch.extend(data.iter().map(|&s| f32::from_sample(s)));
            callback(&scratch, sample_rate, channels);
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}

/// Pick the input config closest to the constraints, else the device default.
fn select_config(
    device: &Device,
    constraints: &StreamConstraints,
) -> Result<(StreamConfig, SampleFormat), BackendError> {
    let ranges: Vec<_> = device.supported_input_configs()?.collect();
    let candidates: Vec<ConfigCandidate> = ranges
        .iter()
        .map(|r| ConfigCandidate {
            channels: r.channels(),
            min_rate: r.min_sample_rate().0,
            max_rate: r.max_sample_rate().0,
            format: r.sample_format(),
        })
        .collect();

    if let Some((index, rate)) = choose_config(&candidates, constraints) {
        let supported = ranges[index].clone().with_sample_rate(cpal::SampleRate(rate));
        return Ok((supported.config(), supported.sample_format()));
    }

    log::warn!("No input config matches the requested format, using the device default");
    let supported = device.default_input_config()?;
    Ok((supported.config(), supported.sample_format()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConfigCandidate {
    channels: u16,
    min_rate: u32,
    max_rate: u32,
    format: SampleFormat,
}

/// Best candidate index and the sample rate to request from it.
///
/// Exact rate beats exact channel count, which beats a wide sample format
/// that matches the requested sample size.
fn choose_config(candidates: &[ConfigCandidate], constraints: &StreamConstraints) -> Option<(usize, u32)> {
    candidates
        .iter()
        .enumerate()
        .filter_map(|(index, c)| {
            let format_rank = format_rank(c.format, constraints.sample_size)?;
            let rate = constraints.sample_rate.clamp(c.min_rate, c.max_rate);
            let rate_miss = rate != constraints.sample_rate;
            let channel_miss = c.channels != constraints.channel_count;
            let score = (rate_miss as u32) * 100 + (channel_miss as u32) * 10 + format_rank;
            Some((score, index, rate))
        })
        .min_by_key(|&(score, index, _)| (score, index))
        .map(|(_, index, rate)| (index, rate))
}

fn format_rank(format: SampleFormat, sample_size: u16) -> Option<u32> {
    match (format, sample_size) {
        (SampleFormat::F32, _) => Some(0),
        (SampleFormat::I32, s) if s > 16 => Some(1),
        (SampleFormat::I16, 16) => Some(1),
        (SampleFormat::I32, _) => Some(2),
        (SampleFormat::I16, _) => Some(2),
        (SampleFormat::U16, _) => Some(3),
        _ => None,
    }
}
