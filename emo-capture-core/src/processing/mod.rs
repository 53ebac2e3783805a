pub mod audio_buffer;
pub mod graph;
pub mod resampler;
pub mod trim;
pub mod wav_format;
