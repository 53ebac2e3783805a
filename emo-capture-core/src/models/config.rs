use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;
use crate::codec::PREFERRED_MIME_TYPE;

/// PCM sample width of the final WAV output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitDepth {
    #[serde(rename = "16")]
    Sixteen,
    #[serde(rename = "24")]
    TwentyFour,
}

impl BitDepth {
    pub fn bits(self) -> u16 {
        match self {
            Self::Sixteen => 16,
            Self::TwentyFour => 24,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        self.bits() as usize / 8
    }

    /// `(negative scale, non-negative scale)` applied to clamped float samples.
    ///
    /// The split is asymmetric: at 24 bits -1.0 maps to -8388608 (0x800000)
    /// while 1.0 maps to 8388607.
    pub fn scale(self) -> (f64, f64) {
        match self {
            Self::Sixteen => (0x8000 as f64, 0x7FFF as f64),
            Self::TwentyFour => (0x80_0000 as f64, 0x7F_FFFF as f64),
        }
    }

    pub fn from_bits(bits: u16) -> Result<Self, CaptureError> {
        match bits {
            16 => Ok(Self::Sixteen),
            24 => Ok(Self::TwentyFour),
            other => Err(CaptureError::ConfigurationFailed(format!(
                "unsupported bit depth: {}",
                other
            ))),
        }
    }
}

/// Recording quality profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityProfile {
    /// 16-bit output.
    #[default]
    Standard,
    /// 24-bit output.
    Studio,
}

impl QualityProfile {
    pub fn bit_depth(self) -> BitDepth {
        match self {
            Self::Standard => BitDepth::Sixteen,
            Self::Studio => BitDepth::TwentyFour,
        }
    }
}

/// Constraints requested from the capture backend when opening a microphone.
///
/// Adaptive processing is always off: raw fidelity over conversational clarity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    /// Exact device to open, or `None` for the system default.
    pub device_id: Option<String>,
    pub sample_rate: u32,
    pub channel_count: u16,
    /// Per-sample bit size hint (16 or 24).
    pub sample_size: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

/// Graph sample rates accepted by `RecorderConfig::validate`.
pub const SAMPLE_RATE_RANGE: std::ops::RangeInclusive<u32> = 8000..=384_000;

/// Configuration for an `AudioRecorder`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Graph and output sample rate in Hz (default: 48000).
    pub sample_rate: u32,

    /// Number of graph channels (default: 1).
    pub channels: u16,

    /// Output quality profile (default: standard / 16-bit).
    pub profile: QualityProfile,

    /// Seconds removed from the start of every recording (default: 0.5).
    pub lead_trim_secs: f64,

    /// Seconds removed from the end of every recording (default: 0.5).
    pub tail_trim_secs: f64,

    /// Interval at which the chunk recorder emits a chunk (default: 1000 ms).
    pub timeslice_ms: u64,

    /// Chunk codec tried first; the default codec is used when unsupported.
    pub preferred_mime_type: String,

    /// Target bitrate for compressed chunk codecs (default: 256 kbit/s).
    pub audio_bits_per_second: u32,

    /// Maximum recording duration in seconds (None = unlimited).
    pub max_duration_secs: Option<f64>,
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !SAMPLE_RATE_RANGE.contains(&self.sample_rate) {
            return Err(format!(
                "sample rate {} Hz outside {}..={} Hz",
                self.sample_rate,
                SAMPLE_RATE_RANGE.start(),
                SAMPLE_RATE_RANGE.end()
            ));
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        for (name, secs) in [("lead", self.lead_trim_secs), ("tail", self.tail_trim_secs)] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(format!("{} trim must be a non-negative number of seconds", name));
            }
        }
        if self.timeslice_ms == 0 {
            return Err("timeslice must be positive".into());
        }
        if let Some(max) = self.max_duration_secs {
            if !max.is_finite() || max <= 0.0 {
                return Err("max duration must be positive".into());
            }
        }
        Ok(())
    }

    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("invalid config: {}", e)))?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.profile.bit_depth()
    }

    pub fn timeslice(&self) -> Duration {
        Duration::from_millis(self.timeslice_ms)
    }

    /// Stream constraints for this configuration and an optional device.
    pub fn constraints(&self, device_id: Option<&str>) -> StreamConstraints {
        StreamConstraints {
            device_id: device_id.map(str::to_owned),
            sample_rate: self.sample_rate,
            channel_count: self.channels,
            sample_size: self.bit_depth().bits(),
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 1,
            profile: QualityProfile::Standard,
            lead_trim_secs: 0.5,
            tail_trim_secs: 0.5,
            timeslice_ms: 1000,
            preferred_mime_type: PREFERRED_MIME_TYPE.to_string(),
            audio_bits_per_second: 256_000,
            max_duration_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RecorderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.channels, 1);
        assert_eq!(config.bit_depth(), BitDepth::Sixteen);
    }

    #[test]
    fn constraints_disable_adaptive_processing() {
        let config = RecorderConfig {
            profile: QualityProfile::Studio,
            ..Default::default()
        };
        let c = config.constraints(Some("mic-2"));
        assert_eq!(c.device_id.as_deref(), Some("mic-2"));
        assert_eq!(c.sample_rate, 48000);
        assert_eq!(c.channel_count, 1);
        assert_eq!(c.sample_size, 24);
        assert!(!c.echo_cancellation);
        assert!(!c.noise_suppression);
        assert!(!c.auto_gain_control);

        assert_eq!(config.constraints(None).device_id, None);
    }

    #[test]
    fn rejects_invalid_values() {
        let bad_channels = RecorderConfig { channels: 6, ..Default::default() };
        assert!(bad_channels.validate().is_err());

        let bad_trim = RecorderConfig { lead_trim_secs: -0.1, ..Default::default() };
        assert!(bad_trim.validate().is_err());

        let nan_trim = RecorderConfig { tail_trim_secs: f64::NAN, ..Default::default() };
        assert!(nan_trim.validate().is_err());

        let zero_slice = RecorderConfig { timeslice_ms: 0, ..Default::default() };
        assert!(zero_slice.validate().is_err());

        for rate in [0, 7999, 384_001, 800_000_000] {
            let bad_rate = RecorderConfig { sample_rate: rate, ..Default::default() };
            assert!(bad_rate.validate().is_err(), "{} Hz accepted", rate);
        }
        for rate in [8000, 44100, 384_000] {
            let rate_ok = RecorderConfig { sample_rate: rate, ..Default::default() };
            assert!(rate_ok.validate().is_ok(), "{} Hz rejected", rate);
        }
    }

    #[test]
    fn json_fills_missing_fields() {
        let config = RecorderConfig::from_json(r#"{"profile": "studio", "lead_trim_secs": 0.25}"#).unwrap();
        assert_eq!(config.bit_depth(), BitDepth::TwentyFour);
        assert_eq!(config.lead_trim_secs, 0.25);
        assert_eq!(config.tail_trim_secs, 0.5);
        assert_eq!(config.sample_rate, 48000);

        assert!(matches!(
            RecorderConfig::from_json(r#"{"channels": 0}"#),
            Err(CaptureError::ConfigurationFailed(_))
        ));
    }

    #[test]
    fn bit_depth_table() {
        assert_eq!(BitDepth::Sixteen.scale(), (32768.0, 32767.0));
        assert_eq!(BitDepth::TwentyFour.scale(), (8388608.0, 8388607.0));
        assert_eq!(BitDepth::from_bits(24).unwrap(), BitDepth::TwentyFour);
        assert!(BitDepth::from_bits(32).is_err());
    }
}
