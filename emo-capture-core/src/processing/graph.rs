//! Minimal audio processing graph.
//!
//! ```text
//! [hardware callback] → [SourceNode] ──connect──→ [DestinationNode] → output stream
//! ```
//!
//! The recorder consumes the destination's output stream rather than the raw
//! hardware callback, so processing can be inserted into the graph without
//! touching the encoder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::resampler::{remix_channels, StreamingResampler};
use crate::models::audio_models::{AudioLevels, CaptureSessionDiagnostics};
use crate::models::error::CaptureError;
use crate::traits::capture_provider::AudioBufferCallback;

/// Receiving end of a destination node: blocks of interleaved graph-format samples.
pub type GraphOutputStream = mpsc::UnboundedReceiver<Vec<f32>>;

/// State shared between the graph, its nodes and the audio callback.
struct GraphContext {
    sample_rate: u32,
    channels: u16,
    closed: AtomicBool,
    resampler: Mutex<StreamingResampler>,
    sink: Mutex<Option<mpsc::UnboundedSender<Vec<f32>>>>,
    levels: Mutex<AudioLevels>,
    diagnostics: Mutex<CaptureSessionDiagnostics>,
}

/// Audio graph running at a fixed sample rate and channel count.
pub struct AudioGraph {
    context: Arc<GraphContext>,
}

impl AudioGraph {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            context: Arc::new(GraphContext {
                sample_rate,
                channels,
                closed: AtomicBool::new(false),
                resampler: Mutex::new(StreamingResampler::new(sample_rate as f64, channels as usize)),
                sink: Mutex::new(None),
                levels: Mutex::new(AudioLevels::default()),
                diagnostics: Mutex::new(CaptureSessionDiagnostics::default()),
            }),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.context.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.context.channels
    }

    /// Node that accepts buffers in any device format.
    pub fn create_source(&self) -> SourceNode {
        SourceNode {
            context: Arc::clone(&self.context),
        }
    }

    /// Pass-through node whose output stream carries the graph signal.
    pub fn create_destination(&self) -> DestinationNode {
        let (sender, receiver) = mpsc::unbounded_channel();
        DestinationNode {
            sender: Some(sender),
            stream: Some(receiver),
        }
    }

    /// Route the source into `destination`. A graph has a single sink.
    pub fn connect(&self, destination: &mut DestinationNode) -> Result<(), CaptureError> {
        if self.is_closed() {
            return Err(CaptureError::ConfigurationFailed("audio graph is closed".into()));
        }
        let sender = destination
            .sender
            .take()
            .ok_or_else(|| CaptureError::ConfigurationFailed("destination already connected".into()))?;

        let mut sink = self.context.sink.lock();
        if sink.is_some() {
            return Err(CaptureError::ConfigurationFailed("graph already has a destination".into()));
        }
        *sink = Some(sender);
        Ok(())
    }

    /// Stop routing audio. The resampler's held-back tail is delivered, then
    /// the destination stream ends after the blocks already sent.
    pub fn close(&self) {
        if self.context.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut resampler = self.context.resampler.lock();
        let tail = resampler.flush();
        let mut sink = self.context.sink.lock();
        if !tail.is_empty() {
            let channels = self.context.channels.max(1) as usize;
            self.context.diagnostics.lock().frames_received += (tail.len() / channels) as u64;
            if let Some(sink) = sink.as_ref() {
                let _ = sink.send(tail);
            }
        }
        sink.take();
    }

    pub fn is_closed(&self) -> bool {
        self.context.closed.load(Ordering::SeqCst)
    }

    pub fn levels(&self) -> AudioLevels {
        *self.context.levels.lock()
    }

    pub fn diagnostics(&self) -> CaptureSessionDiagnostics {
        self.context.diagnostics.lock().clone()
    }
}

impl Drop for AudioGraph {
    fn drop(&mut self) {
        self.close();
    }
}

/// Entry point of the graph, fed by the hardware stream.
#[derive(Clone)]
pub struct SourceNode {
    context: Arc<GraphContext>,
}

impl SourceNode {
    /// Push one interleaved device buffer into the graph.
    ///
    /// Converts to the graph's channel count and sample rate, meters the
    /// result and forwards it to the connected destination. Ignored once the
    /// graph is closed.
    pub fn process(&self, samples: &[f32], sample_rate: f64, channels: u16) {
        if self.context.closed.load(Ordering::SeqCst) || samples.is_empty() {
            return;
        }

        let graph_channels = self.context.channels as usize;
        let remixed = remix_channels(samples, channels as usize, graph_channels);

        // Held until the block is sent so blocks stay in stream order.
        let mut resampler = self.context.resampler.lock();
        let block = resampler.process(&remixed, sample_rate);

        {
            let mut d = self.context.diagnostics.lock();
            d.callback_count += 1;
            d.frames_received += (block.len() / graph_channels.max(1)) as u64;
        }
        if block.is_empty() {
            return;
        }
        *self.context.levels.lock() = AudioLevels::measure(&block);

        if let Some(sink) = self.context.sink.lock().as_ref() {
            // Receiver gone means the recorder already finished.
            let _ = sink.send(block);
        }
    }

    /// Wrap this node as a backend buffer callback.
    pub fn callback(&self) -> AudioBufferCallback {
        let node = self.clone();
        Arc::new(move |samples: &[f32], sample_rate: f64, channels: u16| {
            node.process(samples, sample_rate, channels);
        })
    }
}

/// Pass-through sink of the graph.
pub struct DestinationNode {
    sender: Option<mpsc::UnboundedSender<Vec<f32>>>,
    stream: Option<GraphOutputStream>,
}

impl DestinationNode {
    /// Take the output stream. Can be taken once.
    pub fn take_stream(&mut self) -> Option<GraphOutputStream> {
        self.stream.take()
    }
}
