//! VOX manifest data structures.
//!
//! The manifest is the structured metadata document stored as `manifest.json`
//! at the root of every `.vox` archive. All types serialize to flat
//! lower-snake-case JSON; absent optional sections are omitted entirely rather
//! than written as `null`.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::VoxError;
use crate::VOX_VERSION;

/// Source material reference linking a character to the screenplay, novel, or
/// script that defines it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Character context for screenplay-aware voice casting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Character {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotional_range: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

/// Provenance tracking for voice origin, creation method, and consent status.
///
/// The `method` field distinguishes designed voices (no real person) from
/// cloned voices, which require consent and source traceability. The ethics
/// rules over these fields live in [`crate::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// How the voice was created: "designed", "synthesized", "cloned",
    /// "preset", or "hybrid".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    /// Consent status for cloned voices: "self", "granted", or "unknown".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Source material the voice was derived from (recordings, speakers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<String>>,
}

/// Prosodic preferences describing the voice's natural speaking style.
///
/// Descriptive strings rather than numeric values, to stay engine-agnostic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prosody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion_default: Option<String>,
}

/// Metadata for one reference audio clip bundled under `reference/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceAudio {
    /// Path of the audio entry within the archive, relative to the root.
    pub file: String,
    /// Verbatim transcript of the clip.
    #[serde(default)]
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Model this clip was prepared for. `None` marks a universal clip usable
    /// with any model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
}

/// A manifest record describing one model-specific binary asset under
/// `embeddings/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingEntry {
    /// Model identifier the asset belongs to (e.g. "Qwen3-TTS-0.6B").
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    /// Archive path of the asset; always starts with `embeddings/`.
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Core voice identity metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    /// Display name for the voice (e.g. "Narrator").
    #[serde(default)]
    pub name: String,
    /// Natural language description of the voice characteristics. Must be at
    /// least 10 trimmed characters; voice design engines synthesize from it.
    #[serde(default)]
    pub description: String,
    /// Primary language in BCP 47 form (e.g. "en-US").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// "male", "female", "nonbinary", or "neutral".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Approximate age range as `[minimum, maximum]`, minimum < maximum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// The root metadata structure for a VOX voice identity.
///
/// Construct either with [`VoxManifest::new`] for a fresh identity, or with
/// [`VoxManifestBuilder`] when most sections are known up front:
///
/// ```
/// use vox_rs::{Voice, VoxManifestBuilder};
///
/// let manifest = VoxManifestBuilder::default()
///     .voice(Voice {
///         name: "Narrator".to_string(),
///         description: "A warm, clear narrator voice for audiobooks.".to_string(),
///         ..Default::default()
///     })
///     .build()
///     .unwrap();
/// assert!(manifest.reference_audio.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into, strip_option), default)]
pub struct VoxManifest {
    /// Semantic version of the VOX format specification.
    #[serde(default)]
    pub vox_version: String,
    /// Unique identifier for this voice identity, UUID v4.
    #[serde(default)]
    pub id: String,
    /// RFC 3339 timestamp of when the identity was created.
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub voice: Voice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prosody: Option<Prosody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_audio: Option<Vec<ReferenceAudio>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<Character>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
    /// Engine-specific extension data, keyed by provider namespace. Payloads
    /// are deliberately unconstrained nested JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<BTreeMap<String, serde_json::Value>>,
    /// Declared embedding assets, keyed by a stable identifier derived from
    /// the asset path (e.g. "qwen3-tts-0.6b").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_entries: Option<BTreeMap<String, EmbeddingEntry>>,
}

impl VoxManifest {
    /// Create a manifest for a fresh voice identity with a generated UUID v4
    /// id and the current UTC timestamp.
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            vox_version: VOX_VERSION.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            created: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            voice: Voice {
                name: name.to_string(),
                description: description.to_string(),
                ..Voice::default()
            },
            ..Self::default()
        }
    }

    /// Encode the manifest as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, VoxError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| VoxError::InvalidManifest(format!("failed to encode manifest: {e}")))
    }

    /// Decode a manifest from its JSON document form.
    pub fn from_json(json: &str) -> Result<Self, VoxError> {
        serde_json::from_str(json)
            .map_err(|e| VoxError::InvalidManifest(format!("failed to decode manifest: {e}")))
    }
}
