//! `audio/ogg; codecs=pcm`, the always-available fallback chunk codec.
//!
//! Identification packet (16 bytes):
//! ```text
//! [0-7]    "PCM     "
//! [8]      version (0)
//! [9]      channels
//! [10]     bits per sample (32, IEEE float)
//! [11]     reserved
//! [12-15]  sample rate, LE u32
//! ```
//! Audio packets carry interleaved little-endian f32 samples; the granule
//! position is the number of frames written so far.

use super::ogg_writer::OggChunkWriter;
use super::{EncoderSpec, PCM_MIME_TYPE};
use crate::models::error::CaptureError;
use crate::traits::chunk_encoder::ChunkEncoder;

pub(crate) const PCM_MAGIC: &[u8; 8] = b"PCM     ";
pub(crate) const PCM_HEADER_LEN: usize = 16;

/// Keeps packets well below the 64 KiB an Ogg page can hold.
const MAX_PACKET_FRAMES: usize = 4096;

pub struct PcmChunkEncoder {
    ogg: OggChunkWriter,
    channels: usize,
    pending: Vec<f32>,
    frames_written: u64,
}

impl PcmChunkEncoder {
    pub fn new(spec: EncoderSpec) -> Result<Self, CaptureError> {
        if spec.channels == 0 || spec.channels > u8::MAX as u16 {
            return Err(CaptureError::EncodingFailed(format!(
                "unsupported channel count: {}",
                spec.channels
            )));
        }
        let mut ogg = OggChunkWriter::new();
        ogg.write_header(identification_header(spec.sample_rate, spec.channels as u8))?;
        Ok(Self {
            ogg,
            channels: spec.channels as usize,
            pending: Vec::new(),
            frames_written: 0,
        })
    }

    fn flush_pending(&mut self) -> Result<(), CaptureError> {
        let frames = self.pending.len() / self.channels;
        if frames == 0 {
            return Ok(());
        }
        let samples: Vec<f32> = self.pending.drain(..frames * self.channels).collect();
        for packet_samples in samples.chunks(MAX_PACKET_FRAMES * self.channels) {
            let mut packet = Vec::with_capacity(packet_samples.len() * 4);
            for sample in packet_samples {
                packet.extend_from_slice(&sample.to_le_bytes());
            }
            self.frames_written += (packet_samples.len() / self.channels) as u64;
            self.ogg.push_packet(packet, self.frames_written)?;
        }
        Ok(())
    }
}

impl ChunkEncoder for PcmChunkEncoder {
    fn mime_type(&self) -> &'static str {
        PCM_MIME_TYPE
    }

    fn write(&mut self, samples: &[f32]) -> Result<(), CaptureError> {
        self.pending.extend_from_slice(samples);
        Ok(())
    }

    fn take_chunk(&mut self) -> Result<Vec<u8>, CaptureError> {
        self.flush_pending()?;
        self.ogg.take_chunk()
    }

    fn finish(&mut self) -> Result<Vec<u8>, CaptureError> {
        self.flush_pending()?;
        self.ogg.finish(self.frames_written)
    }
}

fn identification_header(sample_rate: u32, channels: u8) -> Vec<u8> {
    let mut header = Vec::with_capacity(PCM_HEADER_LEN);
    header.extend_from_slice(PCM_MAGIC);
    header.push(0);
    header.push(channels);
    header.push(32);
    header.push(0);
    header.extend_from_slice(&sample_rate.to_le_bytes());
    header
}

/// Format announced by a PCM identification packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PcmHeader {
    pub sample_rate: u32,
    pub channels: u16,
}

pub(crate) fn parse_identification_header(packet: &[u8]) -> Result<PcmHeader, CaptureError> {
    if packet.len() < PCM_HEADER_LEN || &packet[0..8] != PCM_MAGIC {
        return Err(CaptureError::Decode("malformed PCM identification header".into()));
    }
    if packet[8] != 0 || packet[10] != 32 {
        return Err(CaptureError::Decode(format!(
            "unsupported PCM stream version {} / {} bits",
            packet[8], packet[10]
        )));
    }
    let channels = packet[9] as u16;
    let sample_rate = u32::from_le_bytes([packet[12], packet[13], packet[14], packet[15]]);
    if channels == 0 || sample_rate == 0 {
        return Err(CaptureError::Decode("PCM header declares an empty format".into()));
    }
    Ok(PcmHeader { sample_rate, channels })
}

/// Decode one PCM audio packet into interleaved samples.
pub(crate) fn decode_packet(packet: &[u8], out: &mut Vec<f32>) -> Result<(), CaptureError> {
    if packet.len() % 4 != 0 {
        return Err(CaptureError::Decode(format!(
            "PCM packet of {} bytes is not float aligned",
            packet.len()
        )));
    }
    out.extend(
        packet
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
    );
    Ok(())
}
