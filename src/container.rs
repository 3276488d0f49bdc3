//! The VOX container aggregate.
//!
//! A [`VoxContainer`] owns a flat table of named binary entries and the
//! structured manifest describing them, and keeps the two mutually consistent:
//! every mutation goes through the container so the auto-sync rules in
//! [`crate::sync`] hold. Loading and saving delegate the byte format to the
//! ZIP codec in [`crate::archive`].
//!
//! The container is plain owned data with no interior mutability; callers
//! needing shared access supply their own exclusion.

use std::collections::BTreeMap;
use std::path::Path;

use crate::archive;
use crate::error::VoxError;
use crate::manifest::{EmbeddingEntry, ReferenceAudio, VoxManifest};
use crate::migrate::migrate;
use crate::resolve::{self, ArtifactKind};
use crate::sync::{self, EntryMetadata};
use crate::validate::{self, entry_present, ValidationIssue, ValidationMode};
use crate::{EMBEDDINGS_PREFIX, MANIFEST_FILE_NAME, MIN_DESCRIPTION_LEN, REFERENCE_PREFIX, VOX_VERSION};

/// One named binary payload stored in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Archive path, unique within the container.
    pub path: String,
    /// Opaque payload bytes, round-tripped exactly.
    pub bytes: Vec<u8>,
    /// Media type derived from the path extension.
    pub media_type: String,
}

/// Coarse synthesis-readiness verdict, distinct from validation's graded
/// issue list: a `Ready` container can still carry validation warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Every declared asset is materialized and the fundamentals hold.
    Ready,
    /// Fundamentals hold but these declared assets have no entry; embedding
    /// keys appear as-is, reference records as `"reference:" + file`.
    NeedsRegeneration(Vec<String>),
    /// A fundamental is violated (empty name, short description); lists every
    /// violated reason, independent of entries.
    Invalid(Vec<String>),
}

/// In-memory representation of a `.vox` archive: entry table plus manifest.
#[derive(Debug, Clone, Default)]
pub struct VoxContainer {
    manifest: VoxManifest,
    entries: BTreeMap<String, Entry>,
}

impl VoxContainer {
    /// Create an empty container around an existing manifest.
    pub fn new(manifest: VoxManifest) -> Self {
        Self {
            manifest,
            entries: BTreeMap::new(),
        }
    }

    /// Create a container for a fresh voice identity.
    pub fn create(name: &str, description: &str) -> Self {
        Self::new(VoxManifest::new(name, description))
    }

    pub fn manifest(&self) -> &VoxManifest {
        &self.manifest
    }

    /// Mutable access to manifest fields not indexed by auto-sync (voice
    /// attributes, prosody, provenance, ...). Reference and embedding records
    /// tied to entries should be edited through `add`/`remove` instead.
    pub fn manifest_mut(&mut self) -> &mut VoxManifest {
        &mut self.manifest
    }

    // ---- entry management ------------------------------------------------

    /// Add an entry, replacing any existing entry at the same path.
    ///
    /// Replacement undoes the prior entry's manifest side effects before the
    /// new ones are applied, so no stale record field survives. Fails with a
    /// usage error, before any mutation, on an empty, directory-like, or
    /// reserved path, on
    /// metadata whose variant does not match the path prefix, or on an
    /// embedding add with an empty model.
    pub fn add(
        &mut self,
        path: &str,
        bytes: Vec<u8>,
        metadata: EntryMetadata,
    ) -> Result<(), VoxError> {
        self.add_with_media_type(path, bytes, None, metadata)
    }

    /// [`VoxContainer::add`] with an explicit media type override.
    pub fn add_with_media_type(
        &mut self,
        path: &str,
        bytes: Vec<u8>,
        media_type: Option<&str>,
        metadata: EntryMetadata,
    ) -> Result<(), VoxError> {
        if path.trim().is_empty() || path.ends_with('/') || path == MANIFEST_FILE_NAME {
            return Err(VoxError::InvalidPath(path.to_string()));
        }
        match &metadata {
            EntryMetadata::ReferenceAudio(_) if !path.starts_with(REFERENCE_PREFIX) => {
                return Err(VoxError::MetadataMismatch(path.to_string()));
            }
            EntryMetadata::Embedding(meta) => {
                if !path.starts_with(EMBEDDINGS_PREFIX) {
                    return Err(VoxError::MetadataMismatch(path.to_string()));
                }
                if meta.model.trim().is_empty() {
                    return Err(VoxError::MissingModel(path.to_string()));
                }
            }
            _ => {}
        }

        if self.entries.contains_key(path) {
            sync::undo_for_path(&mut self.manifest, path);
        }
        let media_type = media_type
            .map(str::to_string)
            .unwrap_or_else(|| media_type_for(path).to_string());
        self.entries.insert(
            path.to_string(),
            Entry {
                path: path.to_string(),
                bytes,
                media_type,
            },
        );
        sync::apply_add(&mut self.manifest, path, &metadata);
        Ok(())
    }

    /// Remove the entry at `path`, undoing its manifest side effects.
    /// A no-op returning `None` when the path is absent.
    pub fn remove(&mut self, path: &str) -> Option<Entry> {
        let removed = self.entries.remove(path)?;
        sync::undo_for_path(&mut self.manifest, path);
        Some(removed)
    }

    /// All entries whose path starts with `prefix`. Callers must not depend
    /// on the order.
    pub fn entries(&self, prefix: &str) -> Vec<&Entry> {
        self.entries
            .values()
            .filter(|entry| entry.path.starts_with(prefix))
            .collect()
    }

    pub fn entry(&self, path: &str) -> Option<&Entry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    // ---- model resolution ------------------------------------------------

    /// Resolve a fuzzy model query to a declared embedding entry.
    pub fn embedding_entry(&self, query: &str) -> Option<(&str, &EmbeddingEntry)> {
        let entries = self.manifest.embedding_entries.as_ref()?;
        resolve::embedding_entry(entries, query)
    }

    /// Resolve a fuzzy model query among entries of one artifact kind.
    pub fn embedding_entry_of_kind(
        &self,
        query: &str,
        kind: ArtifactKind,
    ) -> Option<(&str, &EmbeddingEntry)> {
        let entries = self.manifest.embedding_entries.as_ref()?;
        resolve::embedding_entry_of_kind(entries, query, kind)
    }

    /// Bytes of the embedding asset a fuzzy query resolves to, tolerating an
    /// `embeddings/` prefix mismatch between the declaration and the entry.
    pub fn embedding_data(&self, query: &str) -> Option<&[u8]> {
        let (_, entry) = self.embedding_entry(query)?;
        self.lookup_declared(&entry.file, EMBEDDINGS_PREFIX)
    }

    /// [`VoxContainer::embedding_data`] restricted to one artifact kind.
    pub fn embedding_data_of_kind(&self, query: &str, kind: ArtifactKind) -> Option<&[u8]> {
        let (_, entry) = self.embedding_entry_of_kind(query, kind)?;
        self.lookup_declared(&entry.file, EMBEDDINGS_PREFIX)
    }

    /// Reference audio records for a model, falling back to untagged
    /// (universal) records when no tag matches.
    pub fn reference_audio_for(&self, model: &str) -> Vec<&ReferenceAudio> {
        self.manifest
            .reference_audio
            .as_deref()
            .map(|list| resolve::reference_audio_for(list, model))
            .unwrap_or_default()
    }

    /// All declared model identifiers, sorted and deduplicated: embedding
    /// entry models plus reference audio model tags.
    pub fn supported_models(&self) -> Vec<String> {
        let mut models: Vec<String> = self
            .manifest
            .embedding_entries
            .iter()
            .flat_map(|entries| entries.values())
            .map(|entry| entry.model.clone())
            .chain(
                self.manifest
                    .reference_audio
                    .iter()
                    .flatten()
                    .filter_map(|record| record.model.clone()),
            )
            .collect();
        models.sort();
        models.dedup();
        models
    }

    // ---- validation & readiness -----------------------------------------

    /// Grade the manifest (and entry presence) against the format rules.
    pub fn validate(&self, mode: ValidationMode) -> Vec<ValidationIssue> {
        let paths: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        validate::validate(&self.manifest, &paths, mode)
    }

    /// Whether a collect-all validation run finds no error.
    pub fn is_valid(&self) -> bool {
        validate::is_valid(&self.validate(ValidationMode::CollectAll))
    }

    /// Compute the synthesis-readiness verdict.
    pub fn readiness(&self) -> Readiness {
        let mut reasons = Vec::new();
        if self.manifest.voice.name.trim().is_empty() {
            reasons.push("voice.name is empty".to_string());
        }
        if self.manifest.voice.description.trim().chars().count() < MIN_DESCRIPTION_LEN {
            reasons.push(format!(
                "voice.description is shorter than {MIN_DESCRIPTION_LEN} characters"
            ));
        }
        if !reasons.is_empty() {
            return Readiness::Invalid(reasons);
        }

        let paths: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        let mut missing = Vec::new();
        if let Some(entries) = self.manifest.embedding_entries.as_ref() {
            for (key, entry) in entries {
                if !entry_present(&paths, &entry.file, EMBEDDINGS_PREFIX) {
                    missing.push(key.clone());
                }
            }
        }
        if let Some(list) = self.manifest.reference_audio.as_ref() {
            for record in list {
                if !entry_present(&paths, &record.file, REFERENCE_PREFIX) {
                    missing.push(format!("reference:{}", record.file));
                }
            }
        }

        if missing.is_empty() {
            Readiness::Ready
        } else {
            Readiness::NeedsRegeneration(missing)
        }
    }

    // ---- persistence -----------------------------------------------------

    /// Load a container from a `.vox` archive.
    ///
    /// Raw entries are listed through the archive codec, the manifest is
    /// decoded from the reserved root document, and the migration engine
    /// upgrades legacy manifests using the raw embedding paths as ground
    /// truth. Fatal on a missing or undecodable manifest; no partial
    /// container is ever returned.
    pub fn load(path: &Path) -> Result<Self, VoxError> {
        let raw_entries = archive::read_entries(path)?;

        let manifest_json = raw_entries
            .iter()
            .find(|(name, _)| name == MANIFEST_FILE_NAME)
            .ok_or(VoxError::ManifestNotFound)?;
        let text = std::str::from_utf8(&manifest_json.1)
            .map_err(|e| VoxError::InvalidManifest(format!("manifest is not UTF-8: {e}")))?;
        let mut manifest = VoxManifest::from_json(text)?;

        let embedding_paths: Vec<String> = raw_entries
            .iter()
            .map(|(name, _)| name.clone())
            .filter(|name| name.starts_with(EMBEDDINGS_PREFIX))
            .collect();
        migrate(&mut manifest, &embedding_paths);

        let mut entries = BTreeMap::new();
        for (name, bytes) in raw_entries {
            if name == MANIFEST_FILE_NAME {
                continue;
            }
            entries.insert(
                name.clone(),
                Entry {
                    media_type: media_type_for(&name).to_string(),
                    path: name,
                    bytes,
                },
            );
        }

        log::info!(
            "Loaded VOX container {:?} with {} entries from {}",
            manifest.voice.name,
            entries.len(),
            path.display()
        );
        Ok(Self { manifest, entries })
    }

    /// Save the container as a `.vox` archive at `path`.
    ///
    /// Stamps `vox_version` to the current format version, then hands the
    /// serialized manifest and raw entries to the archive codec, which writes
    /// fully, verifies the ZIP signature, and atomically replaces the
    /// destination. The prior destination is never left partially written.
    pub fn save(&mut self, path: &Path) -> Result<(), VoxError> {
        self.manifest.vox_version = VOX_VERSION.to_string();
        let manifest_json = self.manifest.to_json()?;

        let mut raw: Vec<(String, &[u8])> = Vec::with_capacity(self.entries.len() + 1);
        raw.push((MANIFEST_FILE_NAME.to_string(), manifest_json.as_bytes()));
        for entry in self.entries.values() {
            raw.push((entry.path.clone(), entry.bytes.as_slice()));
        }
        archive::write_entries(path, &raw)?;

        log::info!(
            "Saved VOX container {:?} with {} entries to {}",
            self.manifest.voice.name,
            self.entries.len(),
            path.display()
        );
        Ok(())
    }

    /// Prefix-tolerant lookup of a declared file in the entry table.
    fn lookup_declared(&self, file: &str, prefix: &str) -> Option<&[u8]> {
        if let Some(entry) = self.entries.get(file) {
            return Some(&entry.bytes);
        }
        if let Some(stripped) = file.strip_prefix(prefix) {
            if let Some(entry) = self.entries.get(stripped) {
                return Some(&entry.bytes);
            }
        }
        self.entries
            .get(&format!("{prefix}{file}"))
            .map(|entry| entry.bytes.as_slice())
    }
}

/// Media type derived from a path extension. Unknown extensions fall back to
/// an opaque byte stream.
fn media_type_for(path: &str) -> &'static str {
    let extension = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .unwrap_or("");
    match extension.to_ascii_lowercase().as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "json" => "application/json",
        "txt" => "text/plain",
        "md" => "text/markdown",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{EmbeddingMeta, ReferenceAudioMeta};

    fn container() -> VoxContainer {
        VoxContainer::create("Narrator", "A warm, clear narrator voice for audiobooks.")
    }

    fn embedding_meta(model: &str) -> EntryMetadata {
        EntryMetadata::Embedding(EmbeddingMeta {
            model: model.to_string(),
            ..EmbeddingMeta::default()
        })
    }

    #[test]
    fn add_then_lookup_returns_exact_bytes() {
        let mut container = container();
        let payload = vec![0u8, 159, 146, 150, 0, 255];
        container
            .add("blobs/data.bin", payload.clone(), EntryMetadata::None)
            .unwrap();
        assert_eq!(container.entry("blobs/data.bin").unwrap().bytes, payload);
        assert_eq!(container.entry_count(), 1);
        assert!(container.contains("blobs/data.bin"));
    }

    #[test]
    fn empty_and_reserved_paths_are_rejected_before_mutation() {
        let mut container = container();
        assert!(matches!(
            container.add("", vec![1], EntryMetadata::None),
            Err(VoxError::InvalidPath(_))
        ));
        assert!(matches!(
            container.add("manifest.json", vec![1], EntryMetadata::None),
            Err(VoxError::InvalidPath(_))
        ));
        assert_eq!(container.entry_count(), 0);
    }

    #[test]
    fn directory_like_paths_are_rejected() {
        let mut container = container();
        let err = container
            .add("embeddings/", vec![1], embedding_meta("Some-Model"))
            .unwrap_err();
        assert!(matches!(err, VoxError::InvalidPath(_)));
        assert!(matches!(
            container.add("reference/", vec![1], EntryMetadata::None),
            Err(VoxError::InvalidPath(_))
        ));
        assert_eq!(container.entry_count(), 0);
        assert!(container.manifest().embedding_entries.is_none());
    }

    #[test]
    fn mismatched_metadata_is_rejected_before_mutation() {
        let mut container = container();
        let err = container
            .add("notes/readme.txt", vec![1], embedding_meta("Some-Model"))
            .unwrap_err();
        assert!(matches!(err, VoxError::MetadataMismatch(_)));
        assert_eq!(container.entry_count(), 0);
        assert!(container.manifest().embedding_entries.is_none());
    }

    #[test]
    fn managed_embedding_add_requires_a_model() {
        let mut container = container();
        let err = container
            .add("embeddings/x/data.bin", vec![1], embedding_meta("  "))
            .unwrap_err();
        assert!(matches!(err, VoxError::MissingModel(_)));
        assert_eq!(container.entry_count(), 0);
    }

    #[test]
    fn replacing_an_entry_replaces_its_side_effects() {
        let mut container = container();
        container
            .add(
                "reference/sample.wav",
                vec![1],
                EntryMetadata::ReferenceAudio(ReferenceAudioMeta {
                    transcript: Some("First.".to_string()),
                    duration_seconds: Some(9.0),
                    ..ReferenceAudioMeta::default()
                }),
            )
            .unwrap();
        container
            .add(
                "reference/sample.wav",
                vec![2],
                EntryMetadata::ReferenceAudio(ReferenceAudioMeta {
                    transcript: Some("Second.".to_string()),
                    ..ReferenceAudioMeta::default()
                }),
            )
            .unwrap();

        assert_eq!(container.entry_count(), 1);
        assert_eq!(container.entry("reference/sample.wav").unwrap().bytes, vec![2]);
        let list = container.manifest().reference_audio.as_ref().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].transcript, "Second.");
        assert_eq!(list[0].duration_seconds, None);
    }

    #[test]
    fn remove_is_a_no_op_on_absent_paths() {
        let mut container = container();
        assert!(container.remove("reference/ghost.wav").is_none());
    }

    #[test]
    fn remove_undoes_manifest_side_effects() {
        let mut container = container();
        container
            .add(
                "embeddings/qwen3-tts/0.6b/clone-prompt.bin",
                vec![1, 2, 3],
                embedding_meta("Qwen3-TTS-0.6B"),
            )
            .unwrap();
        assert!(container.manifest().embedding_entries.is_some());

        let removed = container
            .remove("embeddings/qwen3-tts/0.6b/clone-prompt.bin")
            .unwrap();
        assert_eq!(removed.bytes, vec![1, 2, 3]);
        assert!(container.manifest().embedding_entries.is_none());
    }

    #[test]
    fn entries_filters_by_prefix() {
        let mut container = container();
        container.add("reference/a.wav", vec![1], EntryMetadata::None).unwrap();
        container.add("reference/b.wav", vec![2], EntryMetadata::None).unwrap();
        container.add("notes/c.txt", vec![3], EntryMetadata::None).unwrap();
        assert_eq!(container.entries("reference/").len(), 2);
        assert_eq!(container.entries("").len(), 3);
    }

    #[test]
    fn embedding_data_resolves_through_the_fuzzy_index() {
        let mut container = container();
        container
            .add(
                "embeddings/qwen3-tts/0.6b/clone-prompt.bin",
                vec![6],
                embedding_meta("Qwen3-TTS-0.6B"),
            )
            .unwrap();
        container
            .add(
                "embeddings/qwen3-tts/1.7b/clone-prompt.bin",
                vec![17],
                embedding_meta("Qwen3-TTS-1.7B"),
            )
            .unwrap();

        for _ in 0..100 {
            assert_eq!(container.embedding_data("0.6b"), Some([6u8].as_slice()));
        }
        assert_eq!(container.embedding_data("kokoro"), None);
    }

    #[test]
    fn supported_models_are_sorted_and_deduplicated() {
        let mut container = container();
        container
            .add(
                "embeddings/qwen3-tts/0.6b/clone-prompt.bin",
                vec![1],
                embedding_meta("Qwen3-TTS-0.6B"),
            )
            .unwrap();
        container
            .add(
                "reference/sample.wav",
                vec![2],
                EntryMetadata::ReferenceAudio(ReferenceAudioMeta {
                    model: Some("Qwen3-TTS-0.6B".to_string()),
                    ..ReferenceAudioMeta::default()
                }),
            )
            .unwrap();
        assert_eq!(container.supported_models(), vec!["Qwen3-TTS-0.6B".to_string()]);
    }

    #[test]
    fn readiness_is_ready_when_all_declared_assets_exist() {
        let mut container = container();
        container
            .add(
                "embeddings/qwen3-tts/0.6b/clone-prompt.bin",
                vec![1],
                embedding_meta("Qwen3-TTS-0.6B"),
            )
            .unwrap();
        assert_eq!(container.readiness(), Readiness::Ready);
    }

    #[test]
    fn missing_declared_embedding_needs_regeneration() {
        let mut container = container();
        container
            .add(
                "embeddings/qwen3-tts/0.6b/clone-prompt.bin",
                vec![1],
                embedding_meta("Qwen3-TTS-0.6B"),
            )
            .unwrap();
        // Drop the binary without going through remove(), as a legacy
        // manifest declaring an unmaterialized asset would look.
        container.entries.clear();

        assert_eq!(
            container.readiness(),
            Readiness::NeedsRegeneration(vec!["qwen3-tts-0.6b".to_string()])
        );
    }

    #[test]
    fn short_description_invalidates_before_missing_assets_are_checked() {
        let mut container = container();
        container
            .add(
                "embeddings/qwen3-tts/0.6b/clone-prompt.bin",
                vec![1],
                embedding_meta("Qwen3-TTS-0.6B"),
            )
            .unwrap();
        container.entries.clear();
        container.manifest_mut().voice.description = "Short".to_string();

        match container.readiness() {
            Readiness::Invalid(reasons) => {
                assert_eq!(reasons.len(), 1);
                assert!(reasons[0].contains("voice.description"));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn missing_reference_records_are_reported_with_their_file() {
        let mut container = container();
        container.manifest_mut().reference_audio = Some(vec![ReferenceAudio {
            file: "reference/lost.wav".to_string(),
            ..ReferenceAudio::default()
        }]);
        assert_eq!(
            container.readiness(),
            Readiness::NeedsRegeneration(vec!["reference:reference/lost.wav".to_string()])
        );
    }

    #[test]
    fn ready_container_can_still_carry_validation_warnings() {
        let mut container = container();
        container.manifest_mut().provenance = Some(crate::manifest::Provenance {
            method: Some("teleported".to_string()),
            ..Default::default()
        });
        assert_eq!(container.readiness(), Readiness::Ready);
        assert!(container.is_valid());
        assert!(!container.validate(ValidationMode::CollectAll).is_empty());
    }

    #[test]
    fn media_types_derive_from_extensions() {
        assert_eq!(media_type_for("reference/sample.wav"), "audio/wav");
        assert_eq!(media_type_for("notes/readme.md"), "text/markdown");
        assert_eq!(
            media_type_for("embeddings/q/clone-prompt.bin"),
            "application/octet-stream"
        );
        assert_eq!(media_type_for("no-extension"), "application/octet-stream");
    }
}
