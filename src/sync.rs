//! Auto-sync between the container's entry table and the manifest.
//!
//! Adding or removing an entry under one of the managed prefixes
//! (`reference/`, `embeddings/`) updates the corresponding manifest records so
//! callers never have to perform two-phase entry + manifest edits. Records are
//! replaced, never merged, so no stale field survives an update.

use crate::manifest::{EmbeddingEntry, ReferenceAudio, VoxManifest};
use crate::{EMBEDDINGS_PREFIX, REFERENCE_PREFIX};

/// Creation-time metadata attached to [`crate::VoxContainer::add`].
///
/// The variant is selected by the caller to match the entry's path prefix.
/// `Embedding` carries a required `model`, so a managed embedding add cannot
/// forget it; [`EntryMetadata::None`] on an `embeddings/` path performs a raw
/// add with no manifest effect.
#[derive(Debug, Clone, Default)]
pub enum EntryMetadata {
    /// No manifest hints. On a `reference/` path a record with an empty
    /// transcript is still created; on an `embeddings/` path the add is raw.
    #[default]
    None,
    /// Hints for the `ReferenceAudio` record built on a `reference/` add.
    ReferenceAudio(ReferenceAudioMeta),
    /// Hints for the `EmbeddingEntry` built on a managed `embeddings/` add.
    Embedding(EmbeddingMeta),
}

/// Creation-time hints for a reference audio entry.
#[derive(Debug, Clone, Default)]
pub struct ReferenceAudioMeta {
    pub transcript: Option<String>,
    pub language: Option<String>,
    pub duration_seconds: Option<f64>,
    pub context: Option<String>,
    pub model: Option<String>,
    pub engine: Option<String>,
}

/// Creation-time hints for an embedding entry.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingMeta {
    /// Explicit map key. `None` derives the key from the entry path.
    pub key: Option<String>,
    /// Model identifier the asset belongs to. Required for a managed add.
    pub model: String,
    pub engine: Option<String>,
    pub format: Option<String>,
    pub description: Option<String>,
}

/// Derive the embedding map key from an archive path.
///
/// Strips the `embeddings/` prefix and the filename, then joins the remaining
/// directory segments with `-`. A path with no directory segments falls back
/// to the filename without its extension.
///
/// `embeddings/qwen3-tts/0.6b/clone-prompt.bin` → `qwen3-tts-0.6b`.
pub fn embedding_key_for_path(path: &str) -> String {
    let stripped = path.strip_prefix(EMBEDDINGS_PREFIX).unwrap_or(path);
    let segments: Vec<&str> = stripped.split('/').filter(|s| !s.is_empty()).collect();
    match segments.split_last() {
        Some((_, dirs)) if !dirs.is_empty() => dirs.join("-"),
        Some((filename, _)) => filename
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(filename)
            .to_string(),
        None => String::new(),
    }
}

/// File format derived from a path extension, if any.
pub(crate) fn format_for_path(path: &str) -> Option<String> {
    path.rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_string())
        .filter(|ext| !ext.is_empty())
}

/// Apply the manifest side effects of adding `path` with `meta`.
///
/// Callers must have verified the metadata variant against the path prefix;
/// a mismatched variant is ignored here rather than guessed at.
pub(crate) fn apply_add(manifest: &mut VoxManifest, path: &str, meta: &EntryMetadata) {
    if path.starts_with(REFERENCE_PREFIX) {
        let hints = match meta {
            EntryMetadata::ReferenceAudio(hints) => hints.clone(),
            _ => ReferenceAudioMeta::default(),
        };
        upsert_reference_record(manifest, path, hints);
    } else if path.starts_with(EMBEDDINGS_PREFIX) {
        if let EntryMetadata::Embedding(hints) = meta {
            upsert_embedding_entry(manifest, path, hints);
        }
        // EntryMetadata::None on an embeddings path is a raw add.
    }
}

/// Undo every manifest side effect tied to `path`.
///
/// Removes all reference records and embedding entries whose `file` matches,
/// collapsing an emptied list or map back to absent.
pub(crate) fn undo_for_path(manifest: &mut VoxManifest, path: &str) {
    if let Some(list) = manifest.reference_audio.as_mut() {
        list.retain(|record| record.file != path);
        if list.is_empty() {
            manifest.reference_audio = None;
        }
    }
    if let Some(entries) = manifest.embedding_entries.as_mut() {
        entries.retain(|_, entry| entry.file != path);
        if entries.is_empty() {
            manifest.embedding_entries = None;
        }
    }
}

fn upsert_reference_record(manifest: &mut VoxManifest, path: &str, hints: ReferenceAudioMeta) {
    let record = ReferenceAudio {
        file: path.to_string(),
        transcript: hints.transcript.unwrap_or_default(),
        language: hints.language,
        duration_seconds: hints.duration_seconds,
        context: hints.context,
        model: hints.model,
        engine: hints.engine,
    };
    let list = manifest.reference_audio.get_or_insert_with(Vec::new);
    match list.iter_mut().find(|existing| existing.file == path) {
        Some(existing) => *existing = record,
        None => list.push(record),
    }
}

fn upsert_embedding_entry(manifest: &mut VoxManifest, path: &str, hints: &EmbeddingMeta) {
    let key = hints
        .key
        .clone()
        .unwrap_or_else(|| embedding_key_for_path(path));
    let entry = EmbeddingEntry {
        model: hints.model.clone(),
        engine: hints.engine.clone(),
        file: path.to_string(),
        format: hints.format.clone().or_else(|| format_for_path(path)),
        description: hints.description.clone(),
    };
    manifest
        .embedding_entries
        .get_or_insert_with(Default::default)
        .insert(key, entry);
}
