use super::audio_buffer::AudioBuffer;

/// Default duration removed from each end of a recording.
pub const DEFAULT_TRIM_SECS: f64 = 0.5;

/// Remove `lead_secs` from the front and `tail_secs` from the back of every channel.
///
/// Offsets are `floor(secs * sample_rate)` and identical across channels.
/// If the trim would leave zero or fewer frames the input is returned
/// unchanged, so very short recordings survive intact.
pub fn trim(buffer: &AudioBuffer, lead_secs: f64, tail_secs: f64) -> AudioBuffer {
    let rate = buffer.sample_rate() as f64;
    let lead = frames_for(lead_secs, rate);
    let tail = frames_for(tail_secs, rate);
    let total = buffer.length();

    let new_length = total as i128 - lead as i128 - tail as i128;
    if new_length <= 0 {
        log::debug!(
            "trim of {} + {} frames would consume all {} frames, keeping recording untrimmed",
            lead,
            tail,
            total
        );
        return buffer.clone();
    }

    buffer.slice(lead, new_length as usize)
}

fn frames_for(secs: f64, rate: f64) -> usize {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * rate).floor() as usize
}
