use crate::models::error::CaptureError;

/// Streaming compressed-audio encoder driven by the chunk recorder.
///
/// Concatenating every chunk returned by `take_chunk` followed by the bytes
/// returned from `finish` must yield one complete, decodable stream.
pub trait ChunkEncoder: Send {
    /// MIME type of the produced stream (e.g. `audio/ogg; codecs=opus`).
    fn mime_type(&self) -> &'static str;

    /// Feed interleaved samples in the graph's format.
    fn write(&mut self, samples: &[f32]) -> Result<(), CaptureError>;

    /// Bytes that became ready since the previous call. May be empty.
    fn take_chunk(&mut self) -> Result<Vec<u8>, CaptureError>;

    /// Flush buffered audio and close the stream, returning the final bytes.
    fn finish(&mut self) -> Result<Vec<u8>, CaptureError>;
}
