/// Pure-math channel adaptation and linear-interpolation resampling.
///
/// All operations work on interleaved `&[f32]` buffers with no platform
/// dependencies. The graph source node streams device blocks through
/// `StreamingResampler`; the decode context resamples whole buffers.
#[derive(Debug, Clone)]
pub struct LinearResampler {
    pub target_sample_rate: f64,
}

impl LinearResampler {
    pub fn new(target_sample_rate: f64) -> Self {
        Self { target_sample_rate }
    }

    pub fn is_passthrough(&self, source_sample_rate: f64) -> bool {
        (source_sample_rate - self.target_sample_rate).abs() < 0.01
    }

    /// Resample mono audio from `source_sample_rate` to the target rate.
    ///
    /// Returns input unchanged if rates match.
    pub fn resample(&self, samples: &[f32], source_sample_rate: f64) -> Vec<f32> {
        self.resample_interleaved(samples, 1, source_sample_rate)
    }

    /// Resample interleaved audio with `channels` channels per frame.
    pub fn resample_interleaved(&self, samples: &[f32], channels: usize, source_sample_rate: f64) -> Vec<f32> {
        if self.is_passthrough(source_sample_rate) || samples.is_empty() || channels == 0 {
            return samples.to_vec();
        }

        let frame_count = samples.len() / channels;
        let ratio = self.target_sample_rate / source_sample_rate;
        let output_frames = (frame_count as f64 * ratio) as usize;
        if output_frames == 0 {
            return Vec::new();
        }

        let mut output = vec![0.0f32; output_frames * channels];
        for i in 0..output_frames {
            let source_index = i as f64 / ratio;
            let index = source_index as usize;
            let fraction = (source_index - index as f64) as f32;

            for ch in 0..channels {
                if index + 1 < frame_count {
                    output[i * channels + ch] = samples[index * channels + ch] * (1.0 - fraction)
                        + samples[(index + 1) * channels + ch] * fraction;
                } else if index < frame_count {
                    output[i * channels + ch] = samples[index * channels + ch];
                }
            }
        }
        output
    }
}

/// Linear resampler for a stream delivered in consecutive blocks.
///
/// Output frame `k` sits at source position `k / ratio` counted from the
/// first frame of the stream, the same grid `LinearResampler` uses over a
/// whole buffer. The newest input frame is held back until the next block
/// arrives so interpolation crosses block boundaries. `flush` emits the frames
/// still owed at the end of the stream.
#[derive(Debug, Clone)]
pub struct StreamingResampler {
    target_sample_rate: f64,
    channels: usize,
    source_sample_rate: Option<f64>,
    pending: Vec<f32>,
    consumed_frames: u64,
    input_frames: u64,
    emitted_frames: u64,
}

impl StreamingResampler {
    pub fn new(target_sample_rate: f64, channels: usize) -> Self {
        Self {
            target_sample_rate,
            channels: channels.max(1),
            source_sample_rate: None,
            pending: Vec::new(),
            consumed_frames: 0,
            input_frames: 0,
            emitted_frames: 0,
        }
    }

    /// Resample the next interleaved block of the stream.
    ///
    /// A change of source rate ends the previous stream: its owed frames are
    /// flushed ahead of the new block.
    pub fn process(&mut self, samples: &[f32], source_sample_rate: f64) -> Vec<f32> {
        let mut output = match self.source_sample_rate {
            Some(rate) if (rate - source_sample_rate).abs() >= 0.01 => self.flush(),
            _ => Vec::new(),
        };

        if (source_sample_rate - self.target_sample_rate).abs() < 0.01 {
            output.extend_from_slice(samples);
            return output;
        }

        let channels = self.channels;
        let whole_frames = samples.len() / channels;
        self.source_sample_rate = Some(source_sample_rate);
        self.pending.extend_from_slice(&samples[..whole_frames * channels]);
        self.input_frames += whole_frames as u64;

        let ratio = self.target_sample_rate / source_sample_rate;
        let pending_frames = self.pending.len() / channels;
        loop {
            let position = self.local_position(ratio);
            let index = position as usize;
            if index + 1 >= pending_frames {
                break;
            }
            let fraction = (position - index as f64) as f32;
            for ch in 0..channels {
                output.push(
                    self.pending[index * channels + ch] * (1.0 - fraction)
                        + self.pending[(index + 1) * channels + ch] * fraction,
                );
            }
            self.emitted_frames += 1;
        }

        // Frames before the next output position are no longer needed.
        let spent = (self.local_position(ratio) as usize).min(pending_frames.saturating_sub(1));
        self.pending.drain(..spent * channels);
        self.consumed_frames += spent as u64;
        output
    }

    /// End the stream: emit the frames still owed, holding the last input
    /// frame, and reset for a new stream.
    pub fn flush(&mut self) -> Vec<f32> {
        let mut output = Vec::new();
        let channels = self.channels;
        let pending_frames = self.pending.len() / channels;

        if let (Some(rate), true) = (self.source_sample_rate, pending_frames > 0) {
            let ratio = self.target_sample_rate / rate;
            let expected = (self.input_frames as f64 * ratio) as u64;
            while self.emitted_frames < expected {
                let index = (self.local_position(ratio) as usize).min(pending_frames - 1);
                output.extend_from_slice(&self.pending[index * channels..(index + 1) * channels]);
                self.emitted_frames += 1;
            }
        }

        self.source_sample_rate = None;
        self.pending.clear();
        self.consumed_frames = 0;
        self.input_frames = 0;
        self.emitted_frames = 0;
        output
    }

    fn local_position(&self, ratio: f64) -> f64 {
        (self.emitted_frames as f64 / ratio - self.consumed_frames as f64).max(0.0)
    }
}

/// Adapt interleaved audio from `from` channels to `to` channels.
///
/// Many → mono averages each frame; mono → many duplicates; any other
/// mismatch keeps the first `to` channels (zero-filling missing ones).
pub fn remix_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }
    let frame_count = samples.len() / from;
    let mut output = Vec::with_capacity(frame_count * to);

    if to == 1 {
        let scale = 1.0 / from as f32;
        for frame in samples.chunks_exact(from) {
            output.push(frame.iter().sum::<f32>() * scale);
        }
    } else if from == 1 {
        for &sample in samples {
            output.extend(std::iter::repeat(sample).take(to));
        }
    } else {
        for frame in samples.chunks_exact(from) {
            for ch in 0..to {
                output.push(frame.get(ch).copied().unwrap_or(0.0));
            }
        }
    }
    output
}
