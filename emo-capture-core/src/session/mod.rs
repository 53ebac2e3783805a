pub mod chunk_recorder;
pub mod recorder;
