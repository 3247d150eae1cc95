//! Change and conflict value types built from a backend status payload.
//!
//! Everything here is rebuilt wholesale on every status fetch. The raw
//! `*Payload` types mirror what the backend sends (every field optional);
//! [`GitStatus::from_payload`] normalizes them into the typed records the
//! rest of the crate works with.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Parameter name the backend uses to signal a modify/delete conflict.
pub const FILE_PARAMETER: &str = "file";

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Working-tree status of a single change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Untracked,
    StagedNew,
    StagedModified,
    Modified,
    Deleted,
    DeletedStaged,
    Renamed,
}

impl ChangeStatus {
    /// Parse the backend's status label.
    ///
    /// Accepts both the display labels (`"Staged (New)"`) and snake_case
    /// names (`"staged_new"`). Unknown labels fall back to `Modified`.
    pub fn from_str_val(s: &str) -> Self {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "untracked" | "new" => Self::Untracked,
            "stagednew" => Self::StagedNew,
            "stagedmodified" | "staged" => Self::StagedModified,
            "deleted" => Self::Deleted,
            "deletedstaged" | "stageddeleted" => Self::DeletedStaged,
            "renamed" | "stagedrenamed" => Self::Renamed,
            "modified" => Self::Modified,
            _ => {
                warn!(status = s, "unknown change status, treating as modified");
                Self::Modified
            }
        }
    }

    /// Whether this status implies the change sits in the index.
    pub fn implies_staged(self) -> bool {
        matches!(self, Self::StagedNew | Self::StagedModified | Self::DeletedStaged)
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Untracked => write!(f, "Untracked"),
            Self::StagedNew => write!(f, "Staged (New)"),
            Self::StagedModified => write!(f, "Staged (Modified)"),
            Self::Modified => write!(f, "Modified"),
            Self::Deleted => write!(f, "Deleted"),
            Self::DeletedStaged => write!(f, "Deleted (Staged)"),
            Self::Renamed => write!(f, "Renamed"),
        }
    }
}

/// Kind of profile entity a file holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    RegexPattern,
    CustomFormat,
    QualityProfile,
    MediaManagement,
    Other,
}

impl EntityType {
    /// Parse the backend's entity label (`"Custom Format"`, `"custom_format"`).
    pub fn from_str_val(s: &str) -> Self {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "regexpattern" | "regex" | "regexpatterns" => Self::RegexPattern,
            "customformat" | "customformats" | "format" => Self::CustomFormat,
            "qualityprofile" | "qualityprofiles" | "profile" => Self::QualityProfile,
            "mediamanagement" => Self::MediaManagement,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RegexPattern => write!(f, "Regex Pattern"),
            Self::CustomFormat => write!(f, "Custom Format"),
            Self::QualityProfile => write!(f, "Quality Profile"),
            Self::MediaManagement => write!(f, "Media Management"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// Which side of the index a change is on. At most one class may be
/// selected at a time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SelectionClass {
    Staged,
    Unstaged,
}

impl SelectionClass {
    pub fn of(staged: bool) -> Self {
        if staged {
            Self::Staged
        } else {
            Self::Unstaged
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Staged => Self::Unstaged,
            Self::Unstaged => Self::Staged,
        }
    }
}

impl std::fmt::Display for SelectionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Staged => write!(f, "staged"),
            Self::Unstaged => write!(f, "unstaged"),
        }
    }
}

/// Lifecycle of a conflict record within a merge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    Unresolved,
    Resolved,
}

impl ConflictStatus {
    pub fn from_str_val(s: &str) -> Self {
        if s.eq_ignore_ascii_case("resolved") {
            Self::Resolved
        } else {
            Self::Unresolved
        }
    }
}

impl std::fmt::Display for ConflictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unresolved => write!(f, "unresolved"),
            Self::Resolved => write!(f, "resolved"),
        }
    }
}

// ---------------------------------------------------------------------------
// Change
// ---------------------------------------------------------------------------

/// One tracked difference in the working tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    /// Repository-relative path; stable across refreshes.
    pub file_path: String,
    pub status: ChangeStatus,
    /// In the index.
    pub staged: bool,
    /// Staged, with further unstaged edits on top. Never true when
    /// `staged` is false.
    pub modified: bool,
    pub entity_type: EntityType,
    pub display_name: String,
    pub prior_name: Option<String>,
    pub incoming_name: Option<String>,
}

impl Change {
    pub fn selection_class(&self) -> SelectionClass {
        SelectionClass::of(self.staged)
    }

    /// Staged with unstaged edits layered on top.
    pub fn is_dirty_staged(&self) -> bool {
        self.staged && self.modified
    }

    /// Whether a rename or an incoming edit changes the logical name.
    pub fn name_changed(&self) -> bool {
        let changed = |other: &Option<String>| {
            other
                .as_deref()
                .is_some_and(|name| !name.is_empty() && name != self.display_name)
        };
        changed(&self.prior_name) || changed(&self.incoming_name)
    }

    fn from_payload(raw: ChangePayload) -> Self {
        let status = raw
            .status
            .as_deref()
            .map(ChangeStatus::from_str_val)
            .unwrap_or(ChangeStatus::Modified);
        let staged = raw.staged.unwrap_or_else(|| status.implies_staged());
        let mut modified = raw.modified.unwrap_or(false);
        if modified && !staged {
            warn!(path = %raw.file_path, "dropping modified flag on unstaged change");
            modified = false;
        }

        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        let local_name = non_empty(raw.local_name);
        let incoming_name = non_empty(raw.incoming_name);
        let display_name = local_name
            .clone()
            .or_else(|| incoming_name.clone())
            .unwrap_or_else(|| display_name_from_path(&raw.file_path));

        Self {
            entity_type: raw
                .entity_type
                .as_deref()
                .map(EntityType::from_str_val)
                .unwrap_or_else(|| entity_type_from_path(&raw.file_path)),
            file_path: raw.file_path,
            status,
            staged,
            modified,
            display_name,
            prior_name: non_empty(raw.prior_name),
            incoming_name,
        }
    }
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

/// One parameter whose local and incoming values disagree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictingParameter {
    pub parameter: String,
    #[serde(default, alias = "local_value")]
    pub local_value: serde_json::Value,
    #[serde(default, alias = "incoming_value")]
    pub incoming_value: serde_json::Value,
}

impl ConflictingParameter {
    pub fn is_file(&self) -> bool {
        self.parameter == FILE_PARAMETER
    }
}

/// An entity with both a local and an incoming version during a merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    pub file_path: String,
    pub entity_type: EntityType,
    pub display_name: String,
    pub status: ConflictStatus,
    /// In backend order. A `"file"` entry, when present, is the only entry.
    pub conflicting_parameters: Vec<ConflictingParameter>,
}

impl ConflictRecord {
    /// One side deleted the entity the other side modified.
    pub fn is_modify_delete(&self) -> bool {
        self.conflicting_parameters.iter().any(|p| p.is_file())
    }

    pub fn is_resolved(&self) -> bool {
        self.status == ConflictStatus::Resolved
    }

    pub fn parameter(&self, name: &str) -> Option<&ConflictingParameter> {
        self.conflicting_parameters.iter().find(|p| p.parameter == name)
    }

    fn from_payload(raw: ConflictPayload) -> Self {
        let mut params = raw
            .conflict_details
            .map(|d| d.conflicting_parameters)
            .unwrap_or_default();

        // The presence/absence decision dominates every field-level diff.
        if let Some(pos) = params.iter().position(|p| p.is_file()) {
            if params.len() > 1 {
                warn!(
                    path = %raw.file_path,
                    dropped = params.len() - 1,
                    "modify/delete conflict carried extra parameters"
                );
            }
            let file = params.swap_remove(pos);
            params = vec![file];
        }

        let display_name = raw
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| display_name_from_path(&raw.file_path));

        Self {
            entity_type: raw
                .entity_type
                .as_deref()
                .map(EntityType::from_str_val)
                .unwrap_or_else(|| entity_type_from_path(&raw.file_path)),
            file_path: raw.file_path,
            display_name,
            status: raw
                .status
                .as_deref()
                .map(ConflictStatus::from_str_val)
                .unwrap_or(ConflictStatus::Unresolved),
            conflicting_parameters: params,
        }
    }
}

// ---------------------------------------------------------------------------
// Status snapshot
// ---------------------------------------------------------------------------

/// A committed-but-unpushed entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnpushedFile {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

/// Aggregate status snapshot. Always replaced wholesale after a mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GitStatus {
    pub branch: String,
    pub outgoing_changes: Vec<Change>,
    pub incoming_changes: Vec<Change>,
    pub merge_conflicts: Vec<ConflictRecord>,
    pub is_merging: bool,
    pub has_unpushed_commits: bool,
    pub unpushed_files: Vec<UnpushedFile>,
}

impl GitStatus {
    /// Normalize a raw backend payload. Missing arrays become empty.
    pub fn from_payload(raw: StatusPayload) -> Self {
        Self {
            branch: raw.branch.unwrap_or_default(),
            outgoing_changes: raw
                .outgoing_changes
                .unwrap_or_default()
                .into_iter()
                .map(Change::from_payload)
                .collect(),
            incoming_changes: raw
                .incoming_changes
                .unwrap_or_default()
                .into_iter()
                .map(Change::from_payload)
                .collect(),
            merge_conflicts: raw
                .merge_conflicts
                .unwrap_or_default()
                .into_iter()
                .map(ConflictRecord::from_payload)
                .collect(),
            is_merging: raw.is_merging.unwrap_or(false),
            has_unpushed_commits: raw.has_unpushed_commits.unwrap_or(false),
            unpushed_files: raw.unpushed_files.unwrap_or_default(),
        }
    }

    pub fn outgoing_staged(&self) -> impl Iterator<Item = &Change> {
        self.outgoing_changes.iter().filter(|c| c.staged)
    }

    pub fn outgoing_unstaged(&self) -> impl Iterator<Item = &Change> {
        self.outgoing_changes.iter().filter(|c| !c.staged)
    }

    pub fn unresolved_conflicts(&self) -> impl Iterator<Item = &ConflictRecord> {
        self.merge_conflicts.iter().filter(|c| !c.is_resolved())
    }

    pub fn conflict(&self, file_path: &str) -> Option<&ConflictRecord> {
        self.merge_conflicts.iter().find(|c| c.file_path == file_path)
    }
}

// ---------------------------------------------------------------------------
// Raw payloads
// ---------------------------------------------------------------------------

/// Status payload as sent by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default, alias = "outgoing_changes")]
    pub outgoing_changes: Option<Vec<ChangePayload>>,
    #[serde(default, alias = "incoming_changes")]
    pub incoming_changes: Option<Vec<ChangePayload>>,
    #[serde(default, alias = "merge_conflicts")]
    pub merge_conflicts: Option<Vec<ConflictPayload>>,
    #[serde(default, alias = "is_merging")]
    pub is_merging: Option<bool>,
    #[serde(default, alias = "has_unpushed_commits")]
    pub has_unpushed_commits: Option<bool>,
    #[serde(default, alias = "unpushed_files")]
    pub unpushed_files: Option<Vec<UnpushedFile>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePayload {
    #[serde(alias = "file_path")]
    pub file_path: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub staged: Option<bool>,
    #[serde(default)]
    pub modified: Option<bool>,
    #[serde(default, rename = "type", alias = "entity_type", alias = "entityType")]
    pub entity_type: Option<String>,
    #[serde(default, alias = "local_name")]
    pub local_name: Option<String>,
    #[serde(default, alias = "incoming_name")]
    pub incoming_name: Option<String>,
    #[serde(default, alias = "prior_name")]
    pub prior_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictPayload {
    #[serde(alias = "file_path")]
    pub file_path: String,
    #[serde(default, rename = "type", alias = "entity_type", alias = "entityType")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "conflict_details")]
    pub conflict_details: Option<ConflictDetailsPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDetailsPayload {
    #[serde(default, alias = "conflicting_parameters")]
    pub conflicting_parameters: Vec<ConflictingParameter>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Trailing path segment with a `.yml`/`.yaml` extension stripped.
pub fn display_name_from_path(file_path: &str) -> String {
    let segment = file_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(file_path);
    segment
        .strip_suffix(".yml")
        .or_else(|| segment.strip_suffix(".yaml"))
        .unwrap_or(segment)
        .to_string()
}

fn entity_type_from_path(file_path: &str) -> EntityType {
    let dir = file_path.split('/').next().unwrap_or("");
    match dir {
        "regex_patterns" => EntityType::RegexPattern,
        "custom_formats" => EntityType::CustomFormat,
        "profiles" | "quality_profiles" => EntityType::QualityProfile,
        "media_management" => EntityType::MediaManagement,
        _ => EntityType::Other,
    }
}
