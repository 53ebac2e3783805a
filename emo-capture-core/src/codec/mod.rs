//! Compressed chunk codecs used while a session is recording.
//!
//! Both codecs wrap their packets in a single logical Ogg stream. Opus is
//! preferred and compiled in with the `opus` feature; float PCM is always
//! available and serves as the fallback.

pub mod decode;
mod ogg_writer;
#[cfg(feature = "opus")]
mod opus_codec;
pub mod pcm;

use crate::models::error::CaptureError;
use crate::traits::chunk_encoder::ChunkEncoder;

pub use decode::DecodeContext;
#[cfg(feature = "opus")]
pub use opus_codec::OpusChunkEncoder;
pub use pcm::PcmChunkEncoder;

pub const OPUS_MIME_TYPE: &str = "audio/ogg; codecs=opus";
pub const PCM_MIME_TYPE: &str = "audio/ogg; codecs=pcm";

/// Codec a session asks for first.
pub const PREFERRED_MIME_TYPE: &str = OPUS_MIME_TYPE;
/// Codec used when the preferred one is not available.
pub const DEFAULT_MIME_TYPE: &str = PCM_MIME_TYPE;

/// Format of the audio handed to a chunk encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_second: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkCodec {
    Opus,
    Pcm,
}

impl ChunkCodec {
    /// Parse a MIME type such as `audio/ogg; codecs=opus`.
    ///
    /// Case and whitespace around parameters are ignored; quoted codec
    /// values are accepted.
    pub fn from_mime_type(mime: &str) -> Result<Self, CaptureError> {
        let normalized = mime.to_ascii_lowercase();
        let mut parts = normalized.split(';').map(str::trim);
        let essence = parts.next().unwrap_or_default();
        if essence != "audio/ogg" {
            return Err(CaptureError::UnsupportedCodec(mime.to_string()));
        }
        let codecs = parts
            .filter_map(|p| p.strip_prefix("codecs="))
            .map(|v| v.trim().trim_matches('"'))
            .next();
        match codecs {
            Some("opus") => Ok(ChunkCodec::Opus),
            Some("pcm") => Ok(ChunkCodec::Pcm),
            _ => Err(CaptureError::UnsupportedCodec(mime.to_string())),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ChunkCodec::Opus => OPUS_MIME_TYPE,
            ChunkCodec::Pcm => PCM_MIME_TYPE,
        }
    }

    /// Whether the codec was compiled into this build.
    pub fn is_available(&self) -> bool {
        match self {
            ChunkCodec::Opus => cfg!(feature = "opus"),
            ChunkCodec::Pcm => true,
        }
    }

    /// Whether the codec can encode audio in the given format.
    pub fn accepts(&self, spec: &EncoderSpec) -> bool {
        match self {
            ChunkCodec::Opus => {
                spec.sample_rate == 48000 && (spec.channels == 1 || spec.channels == 2)
            }
            ChunkCodec::Pcm => spec.channels > 0 && spec.channels <= u8::MAX as u16,
        }
    }

    pub fn create_encoder(&self, spec: EncoderSpec) -> Result<Box<dyn ChunkEncoder>, CaptureError> {
        match self {
            #[cfg(feature = "opus")]
            ChunkCodec::Opus => Ok(Box::new(OpusChunkEncoder::new(spec)?)),
            #[cfg(not(feature = "opus"))]
            ChunkCodec::Opus => Err(CaptureError::UnsupportedCodec(format!(
                "{} (built without the `opus` feature)",
                OPUS_MIME_TYPE
            ))),
            ChunkCodec::Pcm => Ok(Box::new(PcmChunkEncoder::new(spec)?)),
        }
    }
}

/// Whether chunks of the given MIME type can be recorded in this build.
pub fn is_type_supported(mime: &str) -> bool {
    ChunkCodec::from_mime_type(mime)
        .map(|codec| codec.is_available())
        .unwrap_or(false)
}

/// Outcome of the per-session codec decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecChoice {
    pub codec: ChunkCodec,
    pub fell_back: bool,
}

/// Pick the session codec: the preferred one when supported, else the default.
pub fn select_codec(preferred: &str, spec: &EncoderSpec) -> CodecChoice {
    match ChunkCodec::from_mime_type(preferred) {
        Ok(codec) if codec.is_available() && codec.accepts(spec) => CodecChoice {
            codec,
            fell_back: false,
        },
        Ok(_) => {
            log::warn!(
                "Preferred codec '{}' unavailable for {} Hz / {} ch, falling back to '{}'",
                preferred,
                spec.sample_rate,
                spec.channels,
                DEFAULT_MIME_TYPE
            );
            CodecChoice {
                codec: ChunkCodec::Pcm,
                fell_back: true,
            }
        }
        Err(e) => {
            log::warn!("{}, falling back to '{}'", e, DEFAULT_MIME_TYPE);
            CodecChoice {
                codec: ChunkCodec::Pcm,
                fell_back: true,
            }
        }
    }
}
