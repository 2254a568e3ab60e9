use std::io::{Cursor, Read};

use log::debug;
use zip::read::ZipArchive;

use crate::error::SyncError;

/// Decompress the single payload file from a downloaded zip blob, returning
/// its entry name and bytes.
///
/// The manifest archive is assumed to contain exactly one file of interest;
/// when additional entries exist only the first is used. This mirrors the
/// remote packaging contract and is a deliberate choice, not an oversight.
pub fn extract_single(bytes: &[u8]) -> Result<(String, Vec<u8>), SyncError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| SyncError::Archive(format!("zip parse error: {e}")))?;

    if archive.is_empty() {
        return Err(SyncError::Archive("archive contains no entries".into()));
    }

    let mut entry = archive
        .by_index(0)
        .map_err(|e| SyncError::Archive(format!("zip entry error: {e}")))?;
    let name = entry.name().to_owned();

    let mut payload = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut payload)
        .map_err(|e| SyncError::Archive(format!("zip read error: {e}")))?;

    debug!("archive: extracted '{name}' ({} bytes)", payload.len());
    Ok((name, payload))
}
