use ogg::writing::{PacketWriteEndInfo, PacketWriter};

use crate::models::error::CaptureError;

/// One logical Ogg stream written into memory, drained chunk by chunk.
///
/// The most recent packet is held back so a time slice can close the current
/// page on it; every chunk therefore ends on a page boundary.
pub(crate) struct OggChunkWriter {
    writer: PacketWriter<'static, Vec<u8>>,
    serial: u32,
    held: Option<(Vec<u8>, u64)>,
    finished: bool,
}

impl OggChunkWriter {
    pub fn new() -> Self {
        Self {
            writer: PacketWriter::new(Vec::new()),
            serial: uuid::Uuid::new_v4().as_u128() as u32,
            held: None,
            finished: false,
        }
    }

    /// Write a header packet on a page of its own.
    pub fn write_header(&mut self, packet: Vec<u8>) -> Result<(), CaptureError> {
        self.release_held(PacketWriteEndInfo::EndPage)?;
        self.write(packet, PacketWriteEndInfo::EndPage, 0)
    }

    /// Queue an audio packet ending at granule position `granule`.
    pub fn push_packet(&mut self, packet: Vec<u8>, granule: u64) -> Result<(), CaptureError> {
        self.release_held(PacketWriteEndInfo::NormalPacket)?;
        self.held = Some((packet, granule));
        Ok(())
    }

    /// Close the current page and return every byte written since the last call.
    pub fn take_chunk(&mut self) -> Result<Vec<u8>, CaptureError> {
        self.release_held(PacketWriteEndInfo::EndPage)?;
        Ok(std::mem::take(self.writer.inner_mut()))
    }

    /// Terminate the stream on the held packet (or an empty one) at `final_granule`.
    pub fn finish(&mut self, final_granule: u64) -> Result<Vec<u8>, CaptureError> {
        if self.finished {
            return Ok(Vec::new());
        }
        let (packet, _) = self.held.take().unwrap_or_default();
        self.write(packet, PacketWriteEndInfo::EndStream, final_granule)?;
        self.finished = true;
        Ok(std::mem::take(self.writer.inner_mut()))
    }

    fn release_held(&mut self, end: PacketWriteEndInfo) -> Result<(), CaptureError> {
        if let Some((packet, granule)) = self.held.take() {
            self.write(packet, end, granule)?;
        }
        Ok(())
    }

    fn write(&mut self, packet: Vec<u8>, end: PacketWriteEndInfo, granule: u64) -> Result<(), CaptureError> {
        if self.finished {
            return Err(CaptureError::EncodingFailed("ogg stream already finished".into()));
        }
        self.writer
            .write_packet(packet, self.serial, end, granule)
            .map_err(|e| CaptureError::EncodingFailed(format!("ogg write failed: {}", e)))
    }
}
