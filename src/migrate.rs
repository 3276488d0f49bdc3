//! One-way, idempotent upgrade of legacy manifests to the current schema.
//!
//! Early VOX manifests carried embedding assets only as opaque archive paths,
//! sometimes described inside provider extension namespaces. Migration
//! reconciles that legacy data with the `embedding_entries` table, using the
//! raw entry paths as ground truth. Re-running on an already-migrated manifest
//! changes nothing beyond the version stamp.

use serde_json::Value;

use crate::manifest::{EmbeddingEntry, VoxManifest};
use crate::sync::{embedding_key_for_path, format_for_path};
use crate::{EMBEDDINGS_PREFIX, VOX_VERSION};

/// Extension keys whose string values historically pointed at embedding files.
const HINT_KEYS: [&str; 2] = ["clone_prompt", "embedding_file"];

/// Model/engine details recovered from an extension namespace for one path.
struct Hint {
    model: Option<String>,
    engine: Option<String>,
}

/// Upgrade `manifest` to the current schema using the raw `embeddings/` paths
/// found in the archive.
///
/// Manifests that already declare embedding entries, and archives with no
/// embedding payloads, only get their version stamped. Returns the number of
/// entries synthesized.
pub fn migrate(manifest: &mut VoxManifest, raw_embedding_paths: &[String]) -> usize {
    let already_declared = manifest
        .embedding_entries
        .as_ref()
        .is_some_and(|entries| !entries.is_empty());
    let paths: Vec<&String> = raw_embedding_paths
        .iter()
        .filter(|p| p.starts_with(EMBEDDINGS_PREFIX))
        .collect();

    let mut synthesized = 0;
    if !already_declared && !paths.is_empty() {
        for path in paths {
            let entry = match find_hint(manifest, path) {
                Some(hint) => entry_from_hint(path, hint),
                None => entry_from_path(path),
            };
            let key = embedding_key_for_path(path);
            manifest
                .embedding_entries
                .get_or_insert_with(Default::default)
                .insert(key, entry);
            synthesized += 1;
        }
        log::info!("Migrated {synthesized} legacy embedding paths into embedding_entries");
    }

    manifest.vox_version = VOX_VERSION.to_string();
    synthesized
}

fn entry_from_hint(path: &str, hint: Hint) -> EmbeddingEntry {
    EmbeddingEntry {
        model: hint.model.unwrap_or_else(|| embedding_key_for_path(path)),
        engine: hint.engine.or_else(|| engine_from_path(path)),
        file: path.to_string(),
        format: format_for_path(path),
        description: Some("Migrated from extension metadata".to_string()),
    }
}

fn entry_from_path(path: &str) -> EmbeddingEntry {
    EmbeddingEntry {
        model: embedding_key_for_path(path),
        engine: engine_from_path(path),
        file: path.to_string(),
        format: format_for_path(path),
        description: Some("Inferred from embedding file path".to_string()),
    }
}

/// Engine guess from the path shape: the first directory segment, when the
/// path has more than one.
fn engine_from_path(path: &str) -> Option<String> {
    let stripped = path.strip_prefix(EMBEDDINGS_PREFIX).unwrap_or(path);
    let segments: Vec<&str> = stripped.split('/').collect();
    // Last segment is the filename.
    if segments.len() > 2 {
        Some(segments[0].to_string())
    } else {
        None
    }
}

/// Search the extension namespaces for a hint describing `path`.
///
/// A hint is any nested string value equal to the path (with or without the
/// `embeddings/` prefix), or a `clone_prompt`/`embedding_file`-keyed string
/// the path ends with. The hint's siblings supply `model` and `engine`, with
/// the namespace name as the engine fallback.
fn find_hint(manifest: &VoxManifest, path: &str) -> Option<Hint> {
    let extensions = manifest.extensions.as_ref()?;
    let stripped = path.strip_prefix(EMBEDDINGS_PREFIX).unwrap_or(path);

    for (namespace, value) in extensions {
        if let Some(mut hint) = scan_value(value, path, stripped) {
            if hint.engine.is_none() {
                hint.engine = Some(namespace.clone());
            }
            return Some(hint);
        }
    }
    None
}

fn scan_value(value: &Value, path: &str, stripped: &str) -> Option<Hint> {
    match value {
        Value::String(s) if s == path || s == stripped => Some(Hint {
            model: None,
            engine: None,
        }),
        Value::Object(object) => scan_object(object, path, stripped),
        Value::Array(items) => items.iter().find_map(|item| scan_value(item, path, stripped)),
        _ => None,
    }
}

fn scan_object(
    object: &serde_json::Map<String, Value>,
    path: &str,
    stripped: &str,
) -> Option<Hint> {
    for (key, value) in object {
        let matched = match value {
            Value::String(s) => {
                s == path
                    || s == stripped
                    || (!s.is_empty()
                        && HINT_KEYS.contains(&key.as_str())
                        && path.ends_with(s.as_str()))
            }
            // A matching string inside a sibling list still hints at this object.
            Value::Array(items) => items
                .iter()
                .any(|item| item.as_str().is_some_and(|s| s == path || s == stripped)),
            _ => false,
        };
        if matched {
            return Some(Hint {
                model: object.get("model").and_then(Value::as_str).map(String::from),
                engine: object.get("engine").and_then(Value::as_str).map(String::from),
            });
        }
        if let Some(hint) = scan_value(value, path, stripped) {
            return Some(hint);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn legacy_manifest() -> VoxManifest {
        VoxManifest {
            vox_version: "0.0.9".to_string(),
            id: "ad7aa7d7-570d-4f9e-99da-1bd14b99cc78".to_string(),
            created: "2026-02-13T12:00:00Z".to_string(),
            ..VoxManifest::default()
        }
    }

    #[test]
    fn infers_entry_from_path_shape_without_hints() {
        let mut manifest = legacy_manifest();
        let paths = vec!["embeddings/x/y/clone-prompt.bin".to_string()];
        assert_eq!(migrate(&mut manifest, &paths), 1);

        let entries = manifest.embedding_entries.as_ref().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries["x-y"];
        assert_eq!(entry.file, "embeddings/x/y/clone-prompt.bin");
        assert_eq!(entry.format.as_deref(), Some("bin"));
        assert_eq!(entry.model, "x-y");
        assert_eq!(entry.engine.as_deref(), Some("x"));
        assert_eq!(manifest.vox_version, VOX_VERSION);
    }

    #[test]
    fn single_directory_path_gets_no_engine_guess() {
        let mut manifest = legacy_manifest();
        let paths = vec!["embeddings/kokoro/voice.npz".to_string()];
        migrate(&mut manifest, &paths);
        let entry = &manifest.embedding_entries.as_ref().unwrap()["kokoro"];
        assert_eq!(entry.engine, None);
    }

    #[test]
    fn extension_hint_supplies_model_and_namespace_engine() {
        let mut manifest = legacy_manifest();
        let mut extensions = BTreeMap::new();
        extensions.insert(
            "qwen3_tts".to_string(),
            json!({
                "clone_prompt": "qwen3-tts/0.6b/clone-prompt.bin",
                "model": "Qwen3-TTS-0.6B"
            }),
        );
        manifest.extensions = Some(extensions);

        let paths = vec!["embeddings/qwen3-tts/0.6b/clone-prompt.bin".to_string()];
        migrate(&mut manifest, &paths);

        let entry = &manifest.embedding_entries.as_ref().unwrap()["qwen3-tts-0.6b"];
        assert_eq!(entry.model, "Qwen3-TTS-0.6B");
        assert_eq!(entry.engine.as_deref(), Some("qwen3_tts"));
        assert_eq!(entry.description.as_deref(), Some("Migrated from extension metadata"));
    }

    #[test]
    fn nested_string_equal_to_path_counts_as_hint() {
        let mut manifest = legacy_manifest();
        let mut extensions = BTreeMap::new();
        extensions.insert(
            "provider".to_string(),
            json!({ "assets": { "files": ["embeddings/provider/data.bin"], "model": "Provider-1" } }),
        );
        manifest.extensions = Some(extensions);

        let paths = vec!["embeddings/provider/data.bin".to_string()];
        migrate(&mut manifest, &paths);
        let entry = &manifest.embedding_entries.as_ref().unwrap()["provider"];
        assert_eq!(entry.model, "Provider-1");
    }

    #[test]
    fn empty_hint_string_does_not_claim_every_path() {
        let mut manifest = legacy_manifest();
        let mut extensions = BTreeMap::new();
        extensions.insert(
            "provider".to_string(),
            json!({ "clone_prompt": "", "model": "Provider-1" }),
        );
        manifest.extensions = Some(extensions);

        let paths = vec!["embeddings/x/y/clone-prompt.bin".to_string()];
        migrate(&mut manifest, &paths);

        let entry = &manifest.embedding_entries.as_ref().unwrap()["x-y"];
        assert_eq!(entry.model, "x-y");
        assert_eq!(entry.engine.as_deref(), Some("x"));
        assert_eq!(entry.description.as_deref(), Some("Inferred from embedding file path"));
    }

    #[test]
    fn migration_is_idempotent() {
        let mut manifest = legacy_manifest();
        let paths = vec!["embeddings/x/y/clone-prompt.bin".to_string()];
        migrate(&mut manifest, &paths);
        let first = manifest.clone();

        assert_eq!(migrate(&mut manifest, &paths), 0);
        assert_eq!(manifest, first);
    }

    #[test]
    fn declared_entries_only_get_the_version_stamp() {
        let mut manifest = legacy_manifest();
        let mut entries = BTreeMap::new();
        entries.insert(
            "existing".to_string(),
            EmbeddingEntry {
                model: "Existing".to_string(),
                file: "embeddings/existing/data.bin".to_string(),
                ..EmbeddingEntry::default()
            },
        );
        manifest.embedding_entries = Some(entries.clone());

        migrate(&mut manifest, &["embeddings/other/data.bin".to_string()]);
        assert_eq!(manifest.embedding_entries.as_ref().unwrap(), &entries);
        assert_eq!(manifest.vox_version, VOX_VERSION);
    }

    #[test]
    fn no_embedding_paths_only_stamps_the_version() {
        let mut manifest = legacy_manifest();
        migrate(&mut manifest, &[]);
        assert!(manifest.embedding_entries.is_none());
        assert_eq!(manifest.vox_version, VOX_VERSION);
    }
}
