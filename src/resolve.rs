//! Fuzzy model resolution over declared embedding entries.
//!
//! Resolution applies an explicit ordered list of matcher rules and
//! short-circuits on the first rule that produces any hit, keeping the
//! priority auditable. Candidates are iterated in key order, so ties within a
//! rule always break to the lexicographically smallest key and repeated calls
//! return the same entry regardless of how the manifest was built.

use std::collections::BTreeMap;

use crate::manifest::{EmbeddingEntry, ReferenceAudio};

/// Key-sorted view of the embedding entry map used by the matcher rules.
type Candidates<'a> = Vec<(&'a str, &'a EmbeddingEntry)>;

/// Discriminates embedding assets that share a model but differ in kind, so a
/// clone prompt is never confused with a sample audio file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Conditioning prompt for voice cloning (e.g. `clone-prompt.bin`).
    ClonePrompt,
    /// Bundled sample audio (e.g. `sample.wav`).
    SampleAudio,
}

impl ArtifactKind {
    /// Whether an archive path's file name signals this kind of artifact.
    pub fn matches(self, file: &str) -> bool {
        let name = file.rsplit('/').next().unwrap_or(file).to_ascii_lowercase();
        match self {
            ArtifactKind::ClonePrompt => name.contains("prompt") || name.contains("clone"),
            ArtifactKind::SampleAudio => {
                name.contains("sample")
                    || [".wav", ".mp3", ".flac", ".ogg"]
                        .iter()
                        .any(|ext| name.ends_with(ext))
            }
        }
    }
}

/// Resolve a fuzzy query to one embedding entry.
///
/// Rules, in strict priority order: exact key equality, case-insensitive key
/// equality, case-insensitive substring of the entry's `model`,
/// case-insensitive substring of the key. Returns `None` when nothing matches.
pub fn embedding_entry<'a>(
    entries: &'a BTreeMap<String, EmbeddingEntry>,
    query: &str,
) -> Option<(&'a str, &'a EmbeddingEntry)> {
    let candidates: Candidates<'a> = entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
    resolve(&candidates, query)
}

/// Resolve a fuzzy query among entries of one artifact kind only.
pub fn embedding_entry_of_kind<'a>(
    entries: &'a BTreeMap<String, EmbeddingEntry>,
    query: &str,
    kind: ArtifactKind,
) -> Option<(&'a str, &'a EmbeddingEntry)> {
    let candidates: Candidates<'a> = entries
        .iter()
        .map(|(k, v)| (k.as_str(), v))
        .filter(|(_, entry)| kind.matches(&entry.file))
        .collect();
    resolve(&candidates, query)
}

fn resolve<'a>(candidates: &Candidates<'a>, query: &str) -> Option<(&'a str, &'a EmbeddingEntry)> {
    type Matcher<'a> = fn(&Candidates<'a>, &str) -> Option<(&'a str, &'a EmbeddingEntry)>;
    let matchers: [Matcher<'a>; 4] = [
        match_exact_key as Matcher<'a>,
        match_key_case_insensitive as Matcher<'a>,
        match_model_substring as Matcher<'a>,
        match_key_substring as Matcher<'a>,
    ];
    matchers.iter().find_map(|rule| rule(candidates, query))
}

fn match_exact_key<'a>(
    candidates: &Candidates<'a>,
    query: &str,
) -> Option<(&'a str, &'a EmbeddingEntry)> {
    candidates.iter().copied().find(|(key, _)| *key == query)
}

fn match_key_case_insensitive<'a>(
    candidates: &Candidates<'a>,
    query: &str,
) -> Option<(&'a str, &'a EmbeddingEntry)> {
    candidates
        .iter()
        .copied()
        .find(|(key, _)| key.eq_ignore_ascii_case(query))
}

fn match_model_substring<'a>(
    candidates: &Candidates<'a>,
    query: &str,
) -> Option<(&'a str, &'a EmbeddingEntry)> {
    let needle = query.to_lowercase();
    candidates
        .iter()
        .copied()
        .find(|(_, entry)| entry.model.to_lowercase().contains(&needle))
}

fn match_key_substring<'a>(
    candidates: &Candidates<'a>,
    query: &str,
) -> Option<(&'a str, &'a EmbeddingEntry)> {
    let needle = query.to_lowercase();
    candidates
        .iter()
        .copied()
        .find(|(key, _)| key.to_lowercase().contains(&needle))
}

/// Filter reference audio records for a model.
///
/// Matches case-insensitively on the record's model tag, accepting substring
/// overlap in either direction. When no tagged record matches, returns the
/// untagged (universal) records instead; the two tiers are never unioned.
pub fn reference_audio_for<'a>(list: &'a [ReferenceAudio], model: &str) -> Vec<&'a ReferenceAudio> {
    let needle = model.to_lowercase();
    let tagged: Vec<&ReferenceAudio> = list
        .iter()
        .filter(|record| {
            record.model.as_deref().is_some_and(|tag| {
                let tag = tag.to_lowercase();
                tag.contains(&needle) || needle.contains(&tag)
            })
        })
        .collect();
    if !tagged.is_empty() {
        return tagged;
    }
    list.iter().filter(|record| record.model.is_none()).collect()
}
