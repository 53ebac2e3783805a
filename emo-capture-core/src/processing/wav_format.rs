//! WAV container encoding.
//!
//! Generates the canonical 44-byte RIFF header and serializes float samples
//! into little-endian integer PCM at 16 or 24 bits.

use super::audio_buffer::AudioBuffer;
use crate::models::config::BitDepth;
use crate::models::error::CaptureError;
use crate::models::recording_result::EncodedAudioBlob;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Generate a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (36 + data_size)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * bytes_per_sample * channels
/// [32-33]  block_align = channels * bytes_per_sample
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
///
/// Fails with `EncodingFailed` when a derived field does not fit its slot.
pub fn generate_wav_header(
    sample_rate: u32,
    bit_depth: u16,
    channels: u16,
    data_size: u32,
) -> Result<[u8; WAV_HEADER_SIZE], CaptureError> {
    let bytes_per_sample = bit_depth / 8;
    let block_align = channels.checked_mul(bytes_per_sample).ok_or_else(|| {
        CaptureError::EncodingFailed(format!("block align overflows for {} channels", channels))
    })?;
    let byte_rate = sample_rate.checked_mul(block_align as u32).ok_or_else(|| {
        CaptureError::EncodingFailed(format!(
            "byte rate overflows for {} Hz, {} ch, {} bit",
            sample_rate, channels, bit_depth
        ))
    })?;
    let chunk_size = data_size
        .checked_add(36)
        .ok_or_else(|| CaptureError::EncodingFailed(format!("{} bytes of PCM exceed the RIFF size limit", data_size)))?;

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    Ok(header)
}

/// Convert one float sample to its integer PCM value.
///
/// Clamp to [-1, 1], scale negatives and non-negatives by the bit depth's
/// separate constants, truncate toward zero. NaN maps to 0.
pub fn quantize(sample: f32, bit_depth: BitDepth) -> i32 {
    let (negative_scale, positive_scale) = bit_depth.scale();
    let clamped = (sample as f64).clamp(-1.0, 1.0);
    let scaled = if clamped < 0.0 {
        clamped * negative_scale
    } else {
        clamped * positive_scale
    };
    scaled as i32
}

/// Serialize a buffer into a WAV blob at `bit_depth`.
///
/// Frames are interleaved in channel order. The output is exactly
/// `44 + frames * channels * bytes_per_sample` bytes long.
pub fn encode_wav(buffer: &AudioBuffer, bit_depth: BitDepth) -> Result<EncodedAudioBlob, CaptureError> {
    let channels = buffer.number_of_channels();
    let bytes_per_sample = bit_depth.bytes_per_sample();
    let data_len = buffer.length() * channels as usize * bytes_per_sample;

    let data_size = u32::try_from(data_len)
        .ok()
        .filter(|size| size.checked_add(36).is_some())
        .ok_or_else(|| {
            CaptureError::EncodingFailed(format!("{} bytes of PCM exceed the RIFF size limit", data_len))
        })?;

    let mut bytes = Vec::with_capacity(WAV_HEADER_SIZE + data_len);
    bytes.extend_from_slice(&generate_wav_header(
        buffer.sample_rate(),
        bit_depth.bits(),
        channels,
        data_size,
    )?);

    match bit_depth {
        BitDepth::Sixteen => {
            for sample in buffer.interleaved() {
                bytes.extend_from_slice(&(quantize(sample, bit_depth) as i16).to_le_bytes());
            }
        }
        BitDepth::TwentyFour => {
            for sample in buffer.interleaved() {
                bytes.extend_from_slice(&quantize(sample, bit_depth).to_le_bytes()[..3]);
            }
        }
    }

    Ok(EncodedAudioBlob::wav(bytes))
}

/// Format fields read back from a 44-byte canonical header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WavInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavInfo {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < WAV_HEADER_SIZE
            || &bytes[0..4] != b"RIFF"
            || &bytes[8..12] != b"WAVE"
            || &bytes[12..16] != b"fmt "
            || &bytes[36..40] != b"data"
        {
            return None;
        }
        Some(Self {
            channels: u16::from_le_bytes([bytes[22], bytes[23]]),
            sample_rate: u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
            bits_per_sample: u16::from_le_bytes([bytes[34], bytes[35]]),
            data_size: u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
        })
    }

    pub fn frame_count(&self) -> usize {
        let block = self.channels as usize * (self.bits_per_sample as usize / 8);
        if block == 0 {
            return 0;
        }
        self.data_size as usize / block
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
    }

    fn i24_at(bytes: &[u8], offset: usize) -> i32 {
        i32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], 0]) << 8 >> 8
    }

    fn mono(samples: Vec<f32>) -> AudioBuffer {
        AudioBuffer::new(48000, vec![samples]).unwrap()
    }

    #[test]
    fn header_literals() {
        let header = generate_wav_header(48000, 16, 1, 0).unwrap();
        assert_eq!(header.len(), 44);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
        assert_eq!(u32_at(&header, 16), 16);
        assert_eq!(u16_at(&header, 20), 1);
    }

    #[test]
    fn header_48khz_mono_24bit() {
        let header = generate_wav_header(48000, 24, 1, 300).unwrap();
        assert_eq!(u16_at(&header, 22), 1);
        assert_eq!(u32_at(&header, 24), 48000);
        assert_eq!(u32_at(&header, 28), 144000);
        assert_eq!(u16_at(&header, 32), 3);
        assert_eq!(u16_at(&header, 34), 24);
        assert_eq!(u32_at(&header, 40), 300);
        assert_eq!(u32_at(&header, 4), 336);
    }

    #[test]
    fn full_scale_16bit_is_asymmetric() {
        let blob = encode_wav(&mono(vec![1.0, -1.0, 0.0]), BitDepth::Sixteen).unwrap();
        let bytes = blob.bytes();
        assert_eq!(u16_at(bytes, 44), 0x7FFF);
        assert_eq!(u16_at(bytes, 46), 0x8000);
        assert_eq!(u16_at(bytes, 48), 0);
    }

    #[test]
    fn full_scale_24bit_is_asymmetric() {
        let blob = encode_wav(&mono(vec![1.0, -1.0, 0.5]), BitDepth::TwentyFour).unwrap();
        let bytes = blob.bytes();
        assert_eq!(&bytes[44..47], &[0xFF, 0xFF, 0x7F]);
        assert_eq!(&bytes[47..50], &[0x00, 0x00, 0x80]);
        assert_eq!(i24_at(bytes, 50), (0.5f64 * 8388607.0) as i32);
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(quantize(2.5, BitDepth::Sixteen), 0x7FFF);
        assert_eq!(quantize(-7.0, BitDepth::Sixteen), -0x8000);
        assert_eq!(quantize(f32::NAN, BitDepth::Sixteen), 0);
    }

    #[test]
    fn quantize_truncates_toward_zero() {
        // 0.5 * 32767 = 16383.5, -0.5 * 32768 = -16384
        assert_eq!(quantize(0.5, BitDepth::Sixteen), 16383);
        assert_eq!(quantize(-0.5, BitDepth::Sixteen), -16384);
        assert_eq!(quantize(-0.00001, BitDepth::Sixteen), 0);
    }

    #[test]
    fn size_law_holds_for_both_depths() {
        let stereo = AudioBuffer::new(48000, vec![vec![0.1; 100], vec![-0.1; 100]]).unwrap();
        for depth in [BitDepth::Sixteen, BitDepth::TwentyFour] {
            let blob = encode_wav(&stereo, depth).unwrap();
            let data = 100 * 2 * depth.bytes_per_sample();
            assert_eq!(blob.len(), 44 + data);
            assert_eq!(u32_at(blob.bytes(), 40) as usize, data);
            assert_eq!(u32_at(blob.bytes(), 4) as usize, blob.len() - 8);
            assert_eq!(&blob.bytes()[36..40], b"data");
        }
    }

    #[test]
    fn frames_are_interleaved_in_channel_order() {
        let stereo = AudioBuffer::new(48000, vec![vec![1.0, 0.0], vec![-1.0, 0.0]]).unwrap();
        let blob = encode_wav(&stereo, BitDepth::Sixteen).unwrap();
        let bytes = blob.bytes();
        assert_eq!(u16_at(bytes, 22), 2);
        assert_eq!(u16_at(bytes, 32), 4);
        assert_eq!(u16_at(bytes, 44), 0x7FFF);
        assert_eq!(u16_at(bytes, 46), 0x8000);
    }

    #[test]
    fn empty_buffer_is_header_only() {
        let blob = encode_wav(&mono(vec![]), BitDepth::Sixteen).unwrap();
        assert_eq!(blob.len(), 44);
        assert_eq!(u32_at(blob.bytes(), 40), 0);
        assert_eq!(u32_at(blob.bytes(), 4), 36);
    }

    #[test]
    fn info_reads_back_header() {
        let blob = encode_wav(&mono(vec![0.0; 4800]), BitDepth::TwentyFour).unwrap();
        let info = WavInfo::parse(blob.bytes()).unwrap();
        assert_eq!(info.channels, 1);
        assert_eq!(info.sample_rate, 48000);
        assert_eq!(info.bits_per_sample, 24);
        assert_eq!(info.frame_count(), 4800);
        assert_eq!(info.duration_secs(), 0.1);

        assert!(WavInfo::parse(b"not a wav").is_none());
    }

    #[test]
    fn oversized_byte_rate_is_an_encoding_error() {
        let buffer = AudioBuffer::new(800_000_000, vec![vec![0.1; 4], vec![-0.1; 4]]).unwrap();
        assert!(matches!(
            encode_wav(&buffer, BitDepth::TwentyFour),
            Err(CaptureError::EncodingFailed(_))
        ));
        assert!(generate_wav_header(u32::MAX, 16, 1, 0).is_err());
        assert!(generate_wav_header(48000, 16, 1, u32::MAX).is_err());
    }
}
