use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::models::error::CaptureError;
use crate::processing::graph::GraphOutputStream;
use crate::traits::chunk_encoder::ChunkEncoder;

/// Ordered, append-only list of compressed fragments for one session.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<u8>>,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Empty fragments are not recorded.
    pub fn push(&mut self, chunk: Vec<u8>) {
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Join every fragment in emission order.
    pub fn concat(self) -> Vec<u8> {
        self.chunks.concat()
    }
}

/// Recorder settings derived from the session configuration.
#[derive(Debug, Clone, Copy)]
pub struct ChunkRecorderOptions {
    pub timeslice: Duration,
    pub channels: u16,
    /// Frames accepted before further audio is dropped (None = unlimited).
    pub max_frames: Option<u64>,
}

/// Time-sliced compressed recorder running as a tokio task.
///
/// Reads the graph output stream, feeds the encoder, and every `timeslice`
/// appends whatever the encoder produced to the session's `ChunkBuffer`.
/// The task ends when the stream ends (the graph was closed), after flushing
/// the encoder.
pub struct ChunkRecorder {
    mime_type: &'static str,
    chunks_emitted: Arc<AtomicU64>,
    handle: Option<JoinHandle<Result<ChunkBuffer, CaptureError>>>,
}

impl ChunkRecorder {
    /// Spawn the recorder and wait until it is running.
    pub async fn start(
        stream: GraphOutputStream,
        encoder: Box<dyn ChunkEncoder>,
        options: ChunkRecorderOptions,
    ) -> Result<Self, CaptureError> {
        if options.timeslice.is_zero() || options.channels == 0 {
            return Err(CaptureError::ConfigurationFailed(
                "recorder needs a positive timeslice and channel count".into(),
            ));
        }

        let mime_type = encoder.mime_type();
        let chunks_emitted = Arc::new(AtomicU64::new(0));
        let (started_tx, started_rx) = oneshot::channel();

        let handle = tokio::spawn(run(
            stream,
            encoder,
            options,
            Arc::clone(&chunks_emitted),
            started_tx,
        ));

        let recorder = Self {
            mime_type,
            chunks_emitted,
            handle: Some(handle),
        };
        if started_rx.await.is_err() {
            return Err(CaptureError::EncodingFailed(
                "chunk recorder stopped before it started".into(),
            ));
        }
        log::debug!("Chunk recorder started ({})", mime_type);
        Ok(recorder)
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn chunks_emitted(&self) -> u64 {
        self.chunks_emitted.load(Ordering::Relaxed)
    }

    /// Wait for the recorder to flush and hand back every chunk.
    ///
    /// The graph feeding the recorder must be closed first, otherwise this
    /// waits for as long as audio keeps arriving.
    pub async fn finish(mut self) -> Result<ChunkBuffer, CaptureError> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| CaptureError::Unknown("chunk recorder already finished".into()))?;
        handle
            .await
            .map_err(|e| CaptureError::Unknown(format!("chunk recorder task failed: {}", e)))?
    }
}

impl Drop for ChunkRecorder {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run(
    stream: GraphOutputStream,
    encoder: Box<dyn ChunkEncoder>,
    options: ChunkRecorderOptions,
    chunks_emitted: Arc<AtomicU64>,
    started: oneshot::Sender<()>,
) -> Result<ChunkBuffer, CaptureError> {
    let result = record(stream, encoder, options, chunks_emitted, started).await;
    if let Err(e) = &result {
        log::error!("Chunk recorder failed: {}", e);
    }
    result
}

async fn record(
    mut stream: GraphOutputStream,
    mut encoder: Box<dyn ChunkEncoder>,
    options: ChunkRecorderOptions,
    chunks_emitted: Arc<AtomicU64>,
    started: oneshot::Sender<()>,
) -> Result<ChunkBuffer, CaptureError> {
    let mut buffer = ChunkBuffer::new();
    let emit = |buffer: &mut ChunkBuffer, chunk: Vec<u8>| {
        if !chunk.is_empty() {
            chunks_emitted.fetch_add(1, Ordering::Relaxed);
            buffer.push(chunk);
        }
    };

    let mut ticker = tokio::time::interval(options.timeslice);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    let channels = options.channels as usize;
    let mut frames_accepted: u64 = 0;
    let mut limit_logged = false;

    let _ = started.send(());

    loop {
        tokio::select! {
            block = stream.recv() => {
                let Some(mut block) = block else { break };
                if let Some(max) = options.max_frames {
                    let remaining = max.saturating_sub(frames_accepted) as usize;
                    if block.len() / channels > remaining {
                        if !limit_logged {
                            log::warn!("Maximum recording duration reached, dropping further audio");
                            limit_logged = true;
                        }
                        block.truncate(remaining * channels);
                    }
                }
                if block.is_empty() {
                    continue;
                }
                frames_accepted += (block.len() / channels) as u64;
                encoder.write(&block)?;
            }
            _ = ticker.tick() => {
                let chunk = encoder.take_chunk()?;
                if !chunk.is_empty() {
                    log::debug!("Emitting chunk of {} bytes", chunk.len());
                }
                emit(&mut buffer, chunk);
            }
        }
    }

    let chunk = encoder.take_chunk()?;
    emit(&mut buffer, chunk);
    let tail = encoder.finish()?;
    emit(&mut buffer, tail);

    log::debug!(
        "Chunk recorder finished: {} frames in {} chunks ({} bytes)",
        frames_accepted,
        buffer.len(),
        buffer.total_bytes()
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{DecodeContext, EncoderSpec, PcmChunkEncoder};
    use tokio::sync::mpsc;

    fn pcm_encoder() -> Box<dyn ChunkEncoder> {
        Box::new(
            PcmChunkEncoder::new(EncoderSpec {
                sample_rate: 48000,
                channels: 1,
                bits_per_second: 256_000,
            })
            .unwrap(),
        )
    }

    fn options(max_frames: Option<u64>) -> ChunkRecorderOptions {
        ChunkRecorderOptions {
            timeslice: Duration::from_millis(10),
            channels: 1,
            max_frames,
        }
    }

    #[test]
    fn buffer_skips_empty_chunks_and_keeps_order() {
        let mut buffer = ChunkBuffer::new();
        buffer.push(vec![1, 2]);
        buffer.push(Vec::new());
        buffer.push(vec![3]);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.total_bytes(), 3);
        assert_eq!(buffer.concat(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn records_until_stream_ends() {
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = ChunkRecorder::start(rx, pcm_encoder(), options(None)).await.unwrap();
        assert_eq!(recorder.mime_type(), crate::codec::PCM_MIME_TYPE);

        for _ in 0..4 {
            tx.send(vec![0.25f32; 480]).unwrap();
            tokio::time::sleep(Duration::from_millis(15)).await;
        }
        drop(tx);

        let buffer = recorder.finish().await.unwrap();
        assert!(buffer.len() >= 2);
        let decoded = DecodeContext::new(48000).decode(&buffer.concat()).unwrap();
        assert_eq!(decoded.length(), 1920);
    }

    #[tokio::test]
    async fn drops_audio_past_the_limit() {
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = ChunkRecorder::start(rx, pcm_encoder(), options(Some(1000))).await.unwrap();
        tx.send(vec![0.1f32; 800]).unwrap();
        tx.send(vec![0.1f32; 800]).unwrap();
        tx.send(vec![0.1f32; 800]).unwrap();
        drop(tx);

        let buffer = recorder.finish().await.unwrap();
        let decoded = DecodeContext::new(48000).decode(&buffer.concat()).unwrap();
        assert_eq!(decoded.length(), 1000);
    }

    #[tokio::test]
    async fn counts_emitted_chunks() {
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = ChunkRecorder::start(rx, pcm_encoder(), options(None)).await.unwrap();
        tx.send(vec![0.0f32; 48]).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(recorder.chunks_emitted() >= 1);
        drop(tx);
        recorder.finish().await.unwrap();
    }
}
