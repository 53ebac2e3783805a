use crate::models::error::CaptureError;

/// Decoded audio: a sample rate plus one `Vec<f32>` per channel.
///
/// Every channel has the same length. Once built the buffer is never mutated;
/// trimming produces a new buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Build a buffer from planar channel data.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, CaptureError> {
        if sample_rate == 0 {
            return Err(CaptureError::Decode("sample rate must be positive".into()));
        }
        if channels.is_empty() {
            return Err(CaptureError::Decode("audio buffer needs at least one channel".into()));
        }
        let length = channels[0].len();
        if channels.iter().any(|c| c.len() != length) {
            return Err(CaptureError::Decode("channels have different lengths".into()));
        }
        Ok(Self { sample_rate, channels })
    }

    /// Build a buffer by de-interleaving `samples`. A trailing partial frame is dropped.
    pub fn from_interleaved(sample_rate: u32, channel_count: u16, samples: &[f32]) -> Result<Self, CaptureError> {
        let count = channel_count as usize;
        if count == 0 {
            return Err(CaptureError::Decode("audio buffer needs at least one channel".into()));
        }
        let frames = samples.len() / count;
        let mut channels = vec![Vec::with_capacity(frames); count];
        for frame in samples.chunks_exact(count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(sample_rate, channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn number_of_channels(&self) -> u16 {
        self.channels.len() as u16
    }

    /// Frames per channel.
    pub fn length(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        self.length() as f64 / self.sample_rate as f64
    }

    pub fn channel_data(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Frame-by-frame interleaved samples in channel order.
    pub fn interleaved(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.length()).flat_map(move |i| self.channels.iter().map(move |c| c[i]))
    }

    /// New buffer holding frames `[start, start + len)` of every channel.
    pub(crate) fn slice(&self, start: usize, len: usize) -> Self {
        Self {
            sample_rate: self.sample_rate,
            channels: self
                .channels
                .iter()
                .map(|c| c[start..start + len].to_vec())
                .collect(),
        }
    }
}
