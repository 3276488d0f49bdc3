//! # vox-rs
//!
//! A Rust library for reading, writing, and validating VOX voice identity
//! containers (`.vox` files).
//!
//! A `.vox` file is a ZIP archive holding a flat set of named binary entries
//! (reference audio under `reference/`, model embeddings under `embeddings/`)
//! indexed by a structured `manifest.json`. This crate keeps the two
//! representations mutually consistent under mutation, resolves fuzzy model
//! queries deterministically, grades manifests against the format rules
//! (including consent-sensitive provenance rules), computes a
//! synthesis-readiness verdict, and upgrades legacy manifests to the current
//! schema on load.
//!
//! ## Features
//!
//! - **Auto-sync**: adding or removing entries updates the manifest's
//!   reference-audio and embedding records automatically
//! - **Fuzzy model resolution**: deterministic, priority-ordered lookup from a
//!   query like `"0.6b"` to the right embedding asset
//! - **Graded validation**: collect-all or fail-fast, issues returned as data
//! - **Migration**: legacy manifests are upgraded in place on load
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! vox-rs = "0.1"
//! ```
//!
//! ```no_run
//! use vox_rs::{EntryMetadata, EmbeddingMeta, VoxContainer};
//! use std::path::Path;
//!
//! let mut container = VoxContainer::create(
//!     "Narrator",
//!     "A warm, clear narrator voice for audiobooks.",
//! );
//! container.add(
//!     "embeddings/qwen3-tts/0.6b/clone-prompt.bin",
//!     std::fs::read("clone-prompt.bin")?,
//!     EntryMetadata::Embedding(EmbeddingMeta {
//!         model: "Qwen3-TTS-0.6B".to_string(),
//!         ..Default::default()
//!     }),
//! )?;
//! container.save(Path::new("narrator.vox"))?;
//!
//! let loaded = VoxContainer::load(Path::new("narrator.vox"))?;
//! let prompt = loaded.embedding_data("0.6b").unwrap();
//! # let _ = prompt;
//! # Ok::<(), vox_rs::VoxError>(())
//! ```

pub mod archive;
pub mod container;
pub mod error;
pub mod manifest;
pub mod migrate;
pub mod resolve;
pub mod sync;
pub mod validate;

pub use container::{Entry, Readiness, VoxContainer};
pub use error::VoxError;
pub use manifest::{
    Character, EmbeddingEntry, Prosody, Provenance, ReferenceAudio, Source, Voice, VoxManifest,
    VoxManifestBuilder,
};
pub use resolve::ArtifactKind;
pub use sync::{EmbeddingMeta, EntryMetadata, ReferenceAudioMeta};
pub use validate::{Severity, ValidationIssue, ValidationMode};

/// Current version of the VOX format specification. Stamped into
/// `vox_version` immediately before every save; frozen for the process
/// lifetime.
pub const VOX_VERSION: &str = "0.1.0";

/// Reserved top-level name of the manifest document inside the archive.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Archive prefix for reference audio entries.
pub const REFERENCE_PREFIX: &str = "reference/";

/// Archive prefix for model embedding entries.
pub const EMBEDDINGS_PREFIX: &str = "embeddings/";

/// Minimum trimmed length of `voice.description`.
pub const MIN_DESCRIPTION_LEN: usize = 10;
