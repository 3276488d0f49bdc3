//! Manifest validation against the VOX format rules.
//!
//! Validation is a pure function from a manifest (plus entry presence) to a
//! graded issue list. Findings are always returned as data, never as errors:
//! collect-all mode gathers every issue for reporting, fail-fast mode stops at
//! the first error-severity issue for automated gating. Both modes run the
//! same underlying passes.

use chrono::DateTime;
use uuid::Uuid;

use crate::manifest::{Provenance, VoxManifest};
use crate::{EMBEDDINGS_PREFIX, MIN_DESCRIPTION_LEN, REFERENCE_PREFIX};

/// Known voice creation methods. Anything else present is flagged as a
/// warning, not an error, so the vocabulary can grow between format versions.
const KNOWN_METHODS: [&str; 5] = ["designed", "synthesized", "cloned", "preset", "hybrid"];

const VALID_GENDERS: [&str; 4] = ["male", "female", "nonbinary", "neutral"];

/// Grading for a single validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One validation finding. Computed fresh per call, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub message: String,
    /// Dotted path of the offending field, when one can be named.
    pub field: Option<String>,
}

impl ValidationIssue {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            field: Some(field.to_string()),
        }
    }
}

/// How issues are gathered across the validation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Gather every issue (reporting).
    #[default]
    CollectAll,
    /// Stop at the first error-severity issue (gating).
    FailFast,
}

/// Issue accumulator shared by the passes. In fail-fast mode it stops
/// accepting issues once an error has been recorded.
struct Report {
    mode: ValidationMode,
    issues: Vec<ValidationIssue>,
    halted: bool,
}

impl Report {
    fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            issues: Vec::new(),
            halted: false,
        }
    }

    fn push(&mut self, issue: ValidationIssue) {
        if self.halted {
            return;
        }
        let is_error = issue.severity == Severity::Error;
        self.issues.push(issue);
        if is_error && self.mode == ValidationMode::FailFast {
            self.halted = true;
        }
    }
}

/// Validate a manifest against the VOX format rules.
///
/// `entry_paths` lists the archive paths currently present in the container's
/// entry table; declared assets without a matching entry are graded as
/// warnings (declaring an asset not yet materialized is legitimate).
pub fn validate(
    manifest: &VoxManifest,
    entry_paths: &[&str],
    mode: ValidationMode,
) -> Vec<ValidationIssue> {
    let mut report = Report::new(mode);
    check_required_fields(manifest, &mut report);
    check_voice_constraints(manifest, &mut report);
    check_embedding_shape(manifest, &mut report);
    check_bundle_completeness(manifest, entry_paths, &mut report);
    if let Some(provenance) = manifest.provenance.as_ref() {
        check_provenance_ethics(provenance, &mut report);
    }
    check_cross_tagging(manifest, &mut report);
    report.issues
}

/// Whether a validation run found no error-severity issue.
pub fn is_valid(issues: &[ValidationIssue]) -> bool {
    !issues.iter().any(|i| i.severity == Severity::Error)
}

fn check_required_fields(manifest: &VoxManifest, report: &mut Report) {
    if manifest.vox_version.trim().is_empty() {
        report.push(ValidationIssue::error(
            "vox_version",
            "vox_version must be a non-empty version string",
        ));
    }

    if !is_uuid_v4(&manifest.id) {
        report.push(ValidationIssue::error(
            "id",
            format!("id {:?} is not a valid UUID v4", manifest.id),
        ));
    }

    if DateTime::parse_from_rfc3339(&manifest.created).is_err() {
        report.push(ValidationIssue::error(
            "created",
            format!("created {:?} is not a valid RFC 3339 timestamp", manifest.created),
        ));
    }

    if manifest.voice.name.trim().is_empty() {
        report.push(ValidationIssue::error(
            "voice.name",
            "voice.name must be non-empty",
        ));
    }

    let description = manifest.voice.description.trim();
    if description.is_empty() {
        report.push(ValidationIssue::error(
            "voice.description",
            "voice.description must be non-empty",
        ));
    } else if description.chars().count() < MIN_DESCRIPTION_LEN {
        report.push(ValidationIssue::error(
            "voice.description",
            format!(
                "voice.description must be at least {MIN_DESCRIPTION_LEN} characters (got {})",
                description.chars().count()
            ),
        ));
    }
}

fn check_voice_constraints(manifest: &VoxManifest, report: &mut Report) {
    if let Some(age_range) = manifest.voice.age_range.as_ref() {
        if age_range.len() != 2 {
            report.push(ValidationIssue::error(
                "voice.age_range",
                format!(
                    "voice.age_range must have exactly two values (got {})",
                    age_range.len()
                ),
            ));
        } else if age_range[0] >= age_range[1] {
            report.push(ValidationIssue::error(
                "voice.age_range",
                format!(
                    "voice.age_range minimum {} must be strictly below maximum {}",
                    age_range[0], age_range[1]
                ),
            ));
        }
    }

    if let Some(gender) = manifest.voice.gender.as_deref() {
        if !VALID_GENDERS.contains(&gender) {
            report.push(ValidationIssue::error(
                "voice.gender",
                format!("voice.gender {gender:?} must be one of {VALID_GENDERS:?}"),
            ));
        }
    }

    if let Some(list) = manifest.reference_audio.as_ref() {
        for (index, record) in list.iter().enumerate() {
            if record.file.trim().is_empty() {
                report.push(ValidationIssue::error(
                    &format!("reference_audio[{index}].file"),
                    "reference audio file path must be non-empty",
                ));
            }
        }
    }
}

fn check_embedding_shape(manifest: &VoxManifest, report: &mut Report) {
    let Some(entries) = manifest.embedding_entries.as_ref() else {
        return;
    };
    for (key, entry) in entries {
        if entry.model.trim().is_empty() {
            report.push(ValidationIssue::error(
                &format!("embedding_entries.{key}.model"),
                "embedding entry model must be non-empty",
            ));
        }
        if entry.file.trim().is_empty() {
            report.push(ValidationIssue::error(
                &format!("embedding_entries.{key}.file"),
                "embedding entry file must be non-empty",
            ));
        } else if !entry.file.starts_with(EMBEDDINGS_PREFIX) {
            report.push(ValidationIssue::error(
                &format!("embedding_entries.{key}.file"),
                format!(
                    "embedding entry file {:?} must start with {EMBEDDINGS_PREFIX:?}",
                    entry.file
                ),
            ));
        }
    }
}

fn check_bundle_completeness(manifest: &VoxManifest, entry_paths: &[&str], report: &mut Report) {
    if let Some(entries) = manifest.embedding_entries.as_ref() {
        for (key, entry) in entries {
            if !entry.file.trim().is_empty()
                && !entry_present(entry_paths, &entry.file, EMBEDDINGS_PREFIX)
            {
                report.push(ValidationIssue::warning(
                    &format!("embedding_entries.{key}.file"),
                    format!("declared embedding file {:?} has no entry in the archive", entry.file),
                ));
            }
        }
    }
    if let Some(list) = manifest.reference_audio.as_ref() {
        for (index, record) in list.iter().enumerate() {
            if !record.file.trim().is_empty()
                && !entry_present(entry_paths, &record.file, REFERENCE_PREFIX)
            {
                report.push(ValidationIssue::warning(
                    &format!("reference_audio[{index}].file"),
                    format!("declared reference audio {:?} has no entry in the archive", record.file),
                ));
            }
        }
    }
}

fn check_provenance_ethics(provenance: &Provenance, report: &mut Report) {
    let Some(method) = provenance.method.as_deref() else {
        return;
    };

    if method == "cloned" {
        let has_source = provenance
            .source
            .as_ref()
            .is_some_and(|sources| sources.iter().any(|s| !s.trim().is_empty()));
        if !has_source {
            report.push(ValidationIssue::error(
                "provenance.source",
                "cloned voices must name at least one source for traceability",
            ));
        }
        match provenance.consent.as_deref() {
            Some("self") | Some("granted") => {}
            other => {
                report.push(ValidationIssue::error(
                    "provenance.consent",
                    format!(
                        "cloned voices require consent \"self\" or \"granted\" (got {other:?})"
                    ),
                ));
            }
        }
    } else if !KNOWN_METHODS.contains(&method) {
        report.push(ValidationIssue::warning(
            "provenance.method",
            format!("unknown provenance method {method:?}"),
        ));
    }
}

/// A reference record tagged for a model no declared embedding entry covers
/// suggests a dangling tag; substring overlap in either direction counts as
/// coverage.
fn check_cross_tagging(manifest: &VoxManifest, report: &mut Report) {
    let Some(list) = manifest.reference_audio.as_ref() else {
        return;
    };
    let models: Vec<String> = manifest
        .embedding_entries
        .iter()
        .flat_map(|entries| entries.values())
        .map(|entry| entry.model.to_lowercase())
        .collect();

    for (index, record) in list.iter().enumerate() {
        let Some(tag) = record.model.as_deref() else {
            continue;
        };
        let tag_lower = tag.to_lowercase();
        let covered = models
            .iter()
            .any(|model| model.contains(&tag_lower) || tag_lower.contains(model));
        if !covered {
            report.push(ValidationIssue::warning(
                &format!("reference_audio[{index}].model"),
                format!("model tag {tag:?} matches no declared embedding entry"),
            ));
        }
    }
}

/// Whether the entry table holds `file`, tolerating a missing or doubled
/// prefix on either side.
pub(crate) fn entry_present(entry_paths: &[&str], file: &str, prefix: &str) -> bool {
    if entry_paths.contains(&file) {
        return true;
    }
    if let Some(stripped) = file.strip_prefix(prefix) {
        if entry_paths.contains(&stripped) {
            return true;
        }
    }
    let prefixed = format!("{prefix}{file}");
    entry_paths.contains(&prefixed.as_str())
}

fn is_uuid_v4(value: &str) -> bool {
    // Hyphenated form only; parse_str would also accept the 32-char simple form.
    if value.len() != 36 {
        return false;
    }
    match Uuid::parse_str(value) {
        Ok(uuid) => uuid.get_version_num() == 4 && uuid.get_variant() == uuid::Variant::RFC4122,
        Err(_) => false,
    }
}
