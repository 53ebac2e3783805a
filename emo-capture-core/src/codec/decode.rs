use std::io::Cursor;

use ogg::reading::PacketReader;

#[cfg(feature = "opus")]
use super::opus_codec::{OpusPacketDecoder, OPUS_HEAD_MAGIC};
use super::pcm::{self, PCM_MAGIC};
use crate::models::error::CaptureError;
use crate::processing::audio_buffer::AudioBuffer;
use crate::processing::resampler::LinearResampler;

/// Decodes a complete recorded stream into raw audio.
///
/// Independent from the capture graph so it can run after the graph has been
/// torn down. Output is always delivered at `target_sample_rate`.
#[derive(Debug, Clone)]
pub struct DecodeContext {
    target_sample_rate: u32,
}

impl DecodeContext {
    pub fn new(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer, CaptureError> {
        if bytes.is_empty() {
            return Err(CaptureError::Decode("recorded stream is empty".into()));
        }

        let mut reader = PacketReader::new(Cursor::new(bytes));
        let head = next_packet(&mut reader)?
            .ok_or_else(|| CaptureError::Decode("stream contains no packets".into()))?;

        let (sample_rate, channels, samples) = if head.data.starts_with(PCM_MAGIC) {
            decode_pcm(&head.data, &mut reader)?
        } else if head.data.starts_with(b"OpusHead") {
            decode_opus(&head.data, &mut reader)?
        } else {
            return Err(CaptureError::Decode("unknown stream header".into()));
        };

        if samples.is_empty() {
            return Err(CaptureError::Decode("stream decoded to zero frames".into()));
        }

        let resampler = LinearResampler::new(self.target_sample_rate as f64);
        let samples = if resampler.is_passthrough(sample_rate as f64) {
            samples
        } else {
            log::debug!(
                "Resampling decoded audio from {} Hz to {} Hz",
                sample_rate,
                self.target_sample_rate
            );
            resampler.resample_interleaved(&samples, channels as usize, sample_rate as f64)
        };

        AudioBuffer::from_interleaved(self.target_sample_rate, channels, &samples)
    }
}

type Reader<'a> = PacketReader<Cursor<&'a [u8]>>;

fn next_packet(reader: &mut Reader<'_>) -> Result<Option<ogg::Packet>, CaptureError> {
    reader
        .read_packet()
        .map_err(|e| CaptureError::Decode(format!("corrupt ogg stream: {}", e)))
}

fn decode_pcm(head: &[u8], reader: &mut Reader<'_>) -> Result<(u32, u16, Vec<f32>), CaptureError> {
    let header = pcm::parse_identification_header(head)?;
    let mut samples = Vec::new();
    while let Some(packet) = next_packet(reader)? {
        pcm::decode_packet(&packet.data, &mut samples)?;
    }
    let whole = samples.len() - samples.len() % header.channels as usize;
    samples.truncate(whole);
    Ok((header.sample_rate, header.channels, samples))
}

#[cfg(feature = "opus")]
fn decode_opus(head: &[u8], reader: &mut Reader<'_>) -> Result<(u32, u16, Vec<f32>), CaptureError> {
    debug_assert!(head.starts_with(OPUS_HEAD_MAGIC));
    let mut decoder = OpusPacketDecoder::from_head(head)?;
    let channels = decoder.channels() as usize;
    let mut samples = Vec::new();
    let mut final_granule = None;
    while let Some(packet) = next_packet(reader)? {
        if OpusPacketDecoder::is_tags_packet(&packet.data) {
            continue;
        }
        decoder.decode(&packet.data, &mut samples)?;
        if packet.last_in_stream() {
            final_granule = Some(packet.absgp_page());
        }
    }

    let pre_skip = decoder.pre_skip().min(samples.len() / channels);
    samples.drain(..pre_skip * channels);
    if let Some(granule) = final_granule {
        let frames = (granule as usize).saturating_sub(decoder.pre_skip());
        samples.truncate(frames * channels);
    }
    Ok((decoder.sample_rate(), decoder.channels(), samples))
}

#[cfg(not(feature = "opus"))]
fn decode_opus(_head: &[u8], _reader: &mut Reader<'_>) -> Result<(u32, u16, Vec<f32>), CaptureError> {
    Err(CaptureError::Decode(
        "opus stream found but this build lacks the `opus` feature".into(),
    ))
}
