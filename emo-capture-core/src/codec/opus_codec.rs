//! `audio/ogg; codecs=opus`, the preferred chunk codec (RFC 7845 mapping).
//!
//! 20 ms frames at 48 kHz; the encoder's lookahead is announced as pre-skip
//! and the final granule position trims the zero padding of the last frame.

use opus::{Application, Bitrate, Channels, Decoder, Encoder};

use super::ogg_writer::OggChunkWriter;
use super::{EncoderSpec, OPUS_MIME_TYPE};
use crate::models::error::CaptureError;
use crate::traits::chunk_encoder::ChunkEncoder;

pub(crate) const OPUS_HEAD_MAGIC: &[u8; 8] = b"OpusHead";
const OPUS_TAGS_MAGIC: &[u8; 8] = b"OpusTags";
const OPUS_RATE: u32 = 48000;
const FRAME_SAMPLES: usize = 960;
/// Largest packet libopus can produce for one frame.
const MAX_PACKET_BYTES: usize = 4000;
/// 120 ms at 48 kHz, the longest frame a packet may hold.
const MAX_FRAME_SAMPLES: usize = 5760;

pub struct OpusChunkEncoder {
    ogg: OggChunkWriter,
    encoder: Encoder,
    channels: usize,
    pre_skip: u64,
    pending: Vec<f32>,
    samples_in: u64,
    packets_granule: u64,
}

impl OpusChunkEncoder {
    pub fn new(spec: EncoderSpec) -> Result<Self, CaptureError> {
        if !supports(&spec) {
            return Err(CaptureError::UnsupportedCodec(format!(
                "opus needs 48 kHz mono or stereo, got {} Hz / {} ch",
                spec.sample_rate, spec.channels
            )));
        }
        let layout = if spec.channels == 1 { Channels::Mono } else { Channels::Stereo };
        let mut encoder = Encoder::new(OPUS_RATE, layout, Application::Audio)
            .map_err(|e| CaptureError::EncodingFailed(format!("opus encoder: {}", e)))?;
        encoder
            .set_bitrate(Bitrate::Bits(spec.bits_per_second as i32))
            .map_err(|e| CaptureError::EncodingFailed(format!("opus bitrate: {}", e)))?;
        let pre_skip = encoder
            .get_lookahead()
            .map_err(|e| CaptureError::EncodingFailed(format!("opus lookahead: {}", e)))?
            .max(0) as u64;

        let mut ogg = OggChunkWriter::new();
        ogg.write_header(opus_head(spec.channels as u8, pre_skip as u16, spec.sample_rate))?;
        ogg.write_header(opus_tags())?;

        Ok(Self {
            ogg,
            encoder,
            channels: spec.channels as usize,
            pre_skip,
            pending: Vec::new(),
            samples_in: 0,
            packets_granule: 0,
        })
    }

    fn encode_frame(&mut self, frame: &[f32]) -> Result<(), CaptureError> {
        let mut packet = vec![0u8; MAX_PACKET_BYTES];
        let len = self
            .encoder
            .encode_float(frame, &mut packet)
            .map_err(|e| CaptureError::EncodingFailed(format!("opus encode: {}", e)))?;
        packet.truncate(len);
        self.packets_granule += FRAME_SAMPLES as u64;
        self.ogg.push_packet(packet, self.packets_granule)
    }

    fn encode_full_frames(&mut self) -> Result<(), CaptureError> {
        let frame_len = FRAME_SAMPLES * self.channels;
        while self.pending.len() >= frame_len {
            let frame: Vec<f32> = self.pending.drain(..frame_len).collect();
            self.encode_frame(&frame)?;
        }
        Ok(())
    }
}

impl ChunkEncoder for OpusChunkEncoder {
    fn mime_type(&self) -> &'static str {
        OPUS_MIME_TYPE
    }

    fn write(&mut self, samples: &[f32]) -> Result<(), CaptureError> {
        self.samples_in += (samples.len() / self.channels) as u64;
        self.pending.extend_from_slice(samples);
        self.encode_full_frames()
    }

    fn take_chunk(&mut self) -> Result<Vec<u8>, CaptureError> {
        self.ogg.take_chunk()
    }

    fn finish(&mut self) -> Result<Vec<u8>, CaptureError> {
        // Pad the tail so the encoder's lookahead is flushed out as well.
        let flush = FRAME_SAMPLES as u64 * self.channels as u64;
        let target = self.pending.len() as u64 + self.pre_skip * self.channels as u64;
        let padded = target.div_ceil(flush) * flush;
        self.pending.resize(padded as usize, 0.0);
        self.encode_full_frames()?;
        self.ogg.finish(self.pre_skip + self.samples_in)
    }
}

pub(crate) fn supports(spec: &EncoderSpec) -> bool {
    spec.sample_rate == OPUS_RATE && (spec.channels == 1 || spec.channels == 2)
}

fn opus_head(channels: u8, pre_skip: u16, input_rate: u32) -> Vec<u8> {
    let mut head = Vec::with_capacity(19);
    head.extend_from_slice(OPUS_HEAD_MAGIC);
    head.push(1);
    head.push(channels);
    head.extend_from_slice(&pre_skip.to_le_bytes());
    head.extend_from_slice(&input_rate.to_le_bytes());
    head.extend_from_slice(&0i16.to_le_bytes());
    head.push(0);
    head
}

fn opus_tags() -> Vec<u8> {
    let vendor = concat!("emo-capture ", env!("CARGO_PKG_VERSION"));
    let mut tags = Vec::with_capacity(16 + vendor.len());
    tags.extend_from_slice(OPUS_TAGS_MAGIC);
    tags.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    tags.extend_from_slice(vendor.as_bytes());
    tags.extend_from_slice(&0u32.to_le_bytes());
    tags
}

/// Stateful decoder for the audio packets of one Opus stream.
pub(crate) struct OpusPacketDecoder {
    decoder: Decoder,
    channels: usize,
    pre_skip: usize,
    scratch: Vec<f32>,
}

impl OpusPacketDecoder {
    /// Build from an `OpusHead` packet.
    pub fn from_head(head: &[u8]) -> Result<Self, CaptureError> {
        if head.len() < 19 || &head[0..8] != OPUS_HEAD_MAGIC {
            return Err(CaptureError::Decode("malformed OpusHead packet".into()));
        }
        let channels = head[9] as usize;
        let layout = match channels {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            other => {
                return Err(CaptureError::Decode(format!(
                    "unsupported opus channel count: {}",
                    other
                )))
            }
        };
        let pre_skip = u16::from_le_bytes([head[10], head[11]]) as usize;
        let decoder = Decoder::new(OPUS_RATE, layout)
            .map_err(|e| CaptureError::Decode(format!("opus decoder: {}", e)))?;
        Ok(Self {
            decoder,
            channels,
            pre_skip,
            scratch: vec![0.0; MAX_FRAME_SAMPLES * channels],
        })
    }

    pub fn sample_rate(&self) -> u32 {
        OPUS_RATE
    }

    pub fn channels(&self) -> u16 {
        self.channels as u16
    }

    pub fn pre_skip(&self) -> usize {
        self.pre_skip
    }

    pub fn is_tags_packet(packet: &[u8]) -> bool {
        packet.starts_with(OPUS_TAGS_MAGIC)
    }

    /// Decode one audio packet, appending interleaved samples to `out`.
    pub fn decode(&mut self, packet: &[u8], out: &mut Vec<f32>) -> Result<(), CaptureError> {
        if packet.is_empty() {
            return Ok(());
        }
        let frames = self
            .decoder
            .decode_float(packet, &mut self.scratch, false)
            .map_err(|e| CaptureError::Decode(format!("opus decode: {}", e)))?;
        out.extend_from_slice(&self.scratch[..frames * self.channels]);
        Ok(())
    }
}
