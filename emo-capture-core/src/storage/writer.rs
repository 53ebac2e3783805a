use std::fs;
use std::path::{Path, PathBuf};

use super::metadata::write_metadata;
use super::naming::recording_path;
use crate::models::error::CaptureError;
use crate::models::recording_result::{EncodedAudioBlob, RecordingMetadata};

/// Write a finished recording and its metadata sidecar under `root`.
///
/// The WAV lands at `root/{user_id}/{emotion}/{file_name}` and replaces any
/// earlier take of the same prompt. Returns the WAV path.
pub fn save_recording(
    blob: &EncodedAudioBlob,
    metadata: &RecordingMetadata,
    root: &Path,
) -> Result<PathBuf, CaptureError> {
    if metadata.checksum != blob.checksum() {
        return Err(CaptureError::StorageError(
            "metadata checksum does not match the recording".into(),
        ));
    }

    let path = root.join(recording_path(&metadata.user_id, &metadata.emotion, &metadata.file_name));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {}", e)))?;
    }

    fs::write(&path, blob.bytes())
        .map_err(|e| CaptureError::StorageError(format!("failed to write recording: {}", e)))?;
    write_metadata(metadata, &path)?;

    log::info!("Saved recording {} ({} bytes)", path.display(), blob.len());
    Ok(path)
}
