//! State that lives for the duration of one merge.
//!
//! A session starts whenever a status refresh shows `is_merging` flip from
//! false to true, and is reset after an abort. It remembers the choices
//! submitted for each record, so a resolved record can be re-opened with
//! its choices pre-filled, and it holds the modify/delete locks.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::conflict::editor::{Choice, ResolutionEditor};
use crate::conflict::key::ParameterKey;
use crate::errors::ResolutionError;
use crate::models::GitStatus;

#[derive(Debug, Default)]
pub struct MergeSession {
    was_merging: bool,
    locked: HashSet<String>,
    submitted: HashMap<String, HashMap<ParameterKey, Choice>>,
}

impl MergeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed every fresh status snapshot through here.
    pub fn observe(&mut self, status: &GitStatus) {
        if status.is_merging && !self.was_merging {
            info!(branch = %status.branch, "merge session started");
            self.reset();
        }
        self.was_merging = status.is_merging;
    }

    /// Forget every lock and remembered choice.
    pub fn reset(&mut self) {
        if !self.locked.is_empty() || !self.submitted.is_empty() {
            debug!(
                locked = self.locked.len(),
                remembered = self.submitted.len(),
                "clearing merge session"
            );
        }
        self.locked.clear();
        self.submitted.clear();
    }

    pub fn is_locked(&self, file_path: &str) -> bool {
        self.locked.contains(file_path)
    }

    /// Open an editor for the conflict at `file_path`.
    ///
    /// A modify/delete record that is resolved, or whose resolution
    /// succeeded in this session, is locked. A resolved field-level record
    /// comes back with the choices submitted for it.
    pub fn open(
        &self,
        status: &GitStatus,
        file_path: &str,
    ) -> Result<ResolutionEditor, ResolutionError> {
        let record = status
            .conflict(file_path)
            .ok_or_else(|| ResolutionError::UnknownConflict(file_path.to_string()))?;

        if record.is_modify_delete() && (record.is_resolved() || self.is_locked(file_path)) {
            return Err(ResolutionError::Locked(file_path.to_string()));
        }

        let editor = match self.submitted.get(file_path) {
            Some(seed) if record.is_resolved() => {
                ResolutionEditor::with_choices(record.clone(), seed)
            }
            _ => ResolutionEditor::new(record.clone()),
        };
        Ok(editor)
    }

    /// Remember a resolution the backend accepted.
    pub fn record_submission(&mut self, editor: &ResolutionEditor) {
        let path = editor.file_path().to_string();
        if editor.is_modify_delete() {
            info!(path = %path, "modify/delete conflict locked");
            self.locked.insert(path.clone());
        }
        self.submitted.insert(path, editor.choices().clone());
    }
}
