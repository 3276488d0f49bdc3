//! ZIP archive codec adapter.
//!
//! The container engine consumes the archive byte format as an abstract
//! path→bytes list-in/list-out interface; this module is the thin adapter over
//! the `zip` crate that provides it. Payload bytes round-trip exactly, with no
//! transcoding. Writes are all-or-nothing: the archive is built in a temp file
//! next to the destination, its leading signature bytes are verified, and only
//! then is it persisted over the destination.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::VoxError;

/// ZIP local-file-header signature every saved artifact must start with.
pub const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// List every file entry of the archive at `path` as `(name, bytes)` pairs.
///
/// Directory entries are skipped. Reading creates no temporary resources, so
/// a failed load leaves nothing behind.
pub fn read_entries(path: &Path) -> Result<Vec<(String, Vec<u8>)>, VoxError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| VoxError::InvalidArchive(format!("{}: {e}", path.display())))?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| VoxError::InvalidArchive(format!("entry {index}: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        entries.push((name, bytes));
    }
    log::debug!("Read {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Write `entries` as a deflate-compressed ZIP archive at `path`.
///
/// The signature check runs unconditionally after every write; on mismatch
/// the temp file is dropped and the prior destination is left untouched.
pub fn write_entries(path: &Path, entries: &[(String, &[u8])]) -> Result<(), VoxError> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(parent)?;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(temp.as_file_mut());
    for (name, bytes) in entries {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| VoxError::Write(format!("{name}: {e}")))?;
        writer.write_all(bytes)?;
    }
    writer
        .finish()
        .map_err(|e| VoxError::Write(format!("finalizing archive: {e}")))?;

    verify_signature(temp.as_file_mut(), path)?;
    temp.persist(path).map_err(|e| VoxError::Io(e.error))?;
    log::debug!("Wrote {} entries to {}", entries.len(), path.display());
    Ok(())
}

/// Read back the first four bytes of the fully written archive and compare
/// them against the ZIP local-file-header signature.
fn verify_signature(file: &mut File, path: &Path) -> Result<(), VoxError> {
    file.flush()?;
    file.seek(SeekFrom::Start(0))?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)?;
    if magic != ZIP_SIGNATURE {
        return Err(VoxError::SignatureMismatch(path.display().to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_binary_payloads_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.vox");
        let payload = vec![0u8, 1, 2, 0, 255, 0, 42];
        let entries = vec![
            ("manifest.json".to_string(), br#"{"vox_version":"0.1.0"}"#.as_slice()),
            ("embeddings/model/data.bin".to_string(), payload.as_slice()),
        ];
        write_entries(&path, &entries).unwrap();

        let read = read_entries(&path).unwrap();
        assert_eq!(read.len(), 2);
        let (_, bytes) = read
            .iter()
            .find(|(name, _)| name == "embeddings/model/data.bin")
            .unwrap();
        assert_eq!(bytes, &payload);
    }

    #[test]
    fn written_archive_starts_with_zip_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.vox");
        write_entries(&path, &[("manifest.json".to_string(), b"{}".as_slice())]).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], &ZIP_SIGNATURE);
    }

    #[test]
    fn reading_a_non_archive_is_a_structural_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.vox");
        std::fs::write(&path, b"definitely not a zip").unwrap();
        let err = read_entries(&path).unwrap_err();
        assert!(matches!(err, VoxError::InvalidArchive(_)));
    }
}
