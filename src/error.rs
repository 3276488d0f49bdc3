/// Errors produced while loading, mutating, or saving a VOX container.
///
/// Structural load errors (`InvalidArchive`, `ManifestNotFound`,
/// `InvalidManifest`) are fatal to `load` and never yield a partial container.
/// Usage errors (`InvalidPath`, `MetadataMismatch`, `MissingModel`) are
/// rejected before any mutation occurs. Validation findings are *not* errors;
/// they are returned as data from [`crate::validate::validate`].
#[derive(thiserror::Error, Debug)]
pub enum VoxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a valid VOX archive: {0}")]
    InvalidArchive(String),
    #[error("manifest.json not found at archive root")]
    ManifestNotFound,
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("invalid entry path: {0:?} (must be non-empty and not the reserved manifest name)")]
    InvalidPath(String),
    #[error("entry metadata does not match the path prefix of {0:?}")]
    MetadataMismatch(String),
    #[error("embedding entry at {0:?} requires a non-empty model name")]
    MissingModel(String),
    #[error("failed to write archive: {0}")]
    Write(String),
    #[error("written archive does not start with the ZIP signature: {0}")]
    SignatureMismatch(String),
}
