use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Media type of every blob produced by the encoder.
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Finished recording: WAV bytes plus their declared media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudioBlob {
    bytes: Vec<u8>,
    mime_type: &'static str,
}

impl EncodedAudioBlob {
    pub(crate) fn wav(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: WAV_MIME_TYPE,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mime_type(&self) -> &str {
        self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercase hex SHA-256 of the blob bytes.
    pub fn checksum(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Metadata stored alongside a saved recording.
///
/// Serializable for the JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub user_id: String,
    pub emotion: String,
    pub sentence: String,
    pub file_name: String,
    pub created_at: String,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub channels: u16,
    pub codec: String,
    pub checksum: String,
}

impl RecordingMetadata {
    /// Describe a finished blob recorded for one prompt.
    ///
    /// Format fields are read back from the blob's WAV header.
    pub fn for_prompt(user_id: &str, emotion: &str, sentence: &str, codec: &str, blob: &EncodedAudioBlob) -> Self {
        let header = crate::processing::wav_format::WavInfo::parse(blob.bytes()).unwrap_or_default();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            emotion: emotion.to_string(),
            sentence: sentence.to_string(),
            file_name: crate::storage::naming::recording_file_name(emotion, sentence),
            created_at: chrono::Utc::now().to_rfc3339(),
            duration_secs: header.duration_secs(),
            sample_rate: header.sample_rate,
            bit_depth: header.bits_per_sample,
            channels: header.channels,
            codec: codec.to_string(),
            checksum: blob.checksum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_sha256_hex() {
        let blob = EncodedAudioBlob::wav(b"abc".to_vec());
        assert_eq!(
            blob.checksum(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(blob.mime_type(), "audio/wav");
        assert_eq!(blob.len(), 3);
    }
}
