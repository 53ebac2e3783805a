use serde::{Deserialize, Serialize};

/// An audio input device available for capture.
///
/// `label` may be empty when the backend has not been granted access yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSource {
    pub id: String,
    pub label: String,
    pub is_default: bool,
}

impl AudioSource {
    /// Label suitable for display, falling back to a shortened id.
    pub fn display_name(&self) -> String {
        if self.label.is_empty() {
            let short: String = self.id.chars().take(5).collect();
            format!("Microphone {}", short)
        } else {
            self.label.clone()
        }
    }
}

/// Real-time audio level metering (RMS and peak, 0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioLevels {
    pub rms: f32,
    pub peak: f32,
}

impl AudioLevels {
    pub fn measure(samples: &[f32]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
        let rms = (sum_squares / samples.len() as f32).sqrt().min(1.0);
        let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs())).min(1.0);
        Self { rms, peak }
    }
}

/// Counters describing what a session has seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSessionDiagnostics {
    pub callback_count: u64,
    pub frames_received: u64,
    pub chunks_emitted: u64,
}
