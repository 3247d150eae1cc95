//! Per-record accumulation of local/incoming choices.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conflict::key::ParameterKey;
use crate::errors::{ResolutionError, ValidationError};
use crate::models::ConflictRecord;

/// Which side of a conflicting parameter to keep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Local,
    Incoming,
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Incoming => write!(f, "incoming"),
        }
    }
}

impl std::str::FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "ours" => Ok(Self::Local),
            "incoming" | "theirs" => Ok(Self::Incoming),
            other => Err(format!("invalid choice '{other}': use 'local' or 'incoming'")),
        }
    }
}

/// Resolutions in the shape the backend expects:
/// `file path -> wire parameter key -> choice`.
pub type Resolutions = BTreeMap<String, BTreeMap<String, Choice>>;

/// Editing state for one conflict record, from open to submit or discard.
#[derive(Debug, Clone)]
pub struct ResolutionEditor {
    record: ConflictRecord,
    /// Record parameters in backend order, with their keys.
    keys: Vec<(ParameterKey, String)>,
    choices: HashMap<ParameterKey, Choice>,
}

impl ResolutionEditor {
    pub fn new(record: ConflictRecord) -> Self {
        let keys = record
            .conflicting_parameters
            .iter()
            .map(|p| (ParameterKey::from_parameter(&p.parameter), p.parameter.clone()))
            .collect();
        Self {
            record,
            keys,
            choices: HashMap::new(),
        }
    }

    /// Open with earlier choices pre-filled. Choices for keys the record no
    /// longer carries are dropped.
    pub fn with_choices(record: ConflictRecord, seed: &HashMap<ParameterKey, Choice>) -> Self {
        let mut editor = Self::new(record);
        for (key, _) in &editor.keys {
            if let Some(choice) = seed.get(key) {
                editor.choices.insert(key.clone(), *choice);
            }
        }
        editor
    }

    pub fn record(&self) -> &ConflictRecord {
        &self.record
    }

    pub fn file_path(&self) -> &str {
        &self.record.file_path
    }

    pub fn is_modify_delete(&self) -> bool {
        self.record.is_modify_delete()
    }

    /// Parameter keys in record order.
    pub fn keys(&self) -> impl Iterator<Item = &ParameterKey> {
        self.keys.iter().map(|(k, _)| k)
    }

    pub fn choice(&self, key: &ParameterKey) -> Option<Choice> {
        self.choices.get(key).copied()
    }

    pub fn choices(&self) -> &HashMap<ParameterKey, Choice> {
        &self.choices
    }

    /// Record or overwrite the choice for `key`.
    pub fn set_choice(&mut self, key: ParameterKey, choice: Choice) -> Result<(), ResolutionError> {
        if !self.keys.iter().any(|(k, _)| *k == key) {
            return Err(ResolutionError::UnknownParameter {
                file_path: self.record.file_path.clone(),
                parameter: key.to_string(),
            });
        }
        debug!(path = %self.record.file_path, %key, %choice, "conflict choice set");
        self.choices.insert(key, choice);
        Ok(())
    }

    /// Convenience for setting a choice by the record's parameter label.
    pub fn set_choice_for(&mut self, parameter: &str, choice: Choice) -> Result<(), ResolutionError> {
        self.set_choice(ParameterKey::from_parameter(parameter), choice)
    }

    pub fn clear_choice(&mut self, key: &ParameterKey) {
        self.choices.remove(key);
    }

    /// Every parameter has a choice. For a modify/delete record only the
    /// presence decision counts.
    pub fn is_ready(&self) -> bool {
        self.missing().is_empty()
    }

    /// Labels of the parameters that still need a choice.
    pub fn missing(&self) -> Vec<String> {
        if self.is_modify_delete() {
            return if self.choices.contains_key(&ParameterKey::File) {
                Vec::new()
            } else {
                vec![ParameterKey::File.wire_key()]
            };
        }
        self.keys
            .iter()
            .filter(|(k, _)| !self.choices.contains_key(k))
            .map(|(_, label)| label.clone())
            .collect()
    }

    /// Package the choices for submission.
    pub fn resolutions(&self) -> Result<Resolutions, ValidationError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(ValidationError::ConflictNotReady { missing });
        }

        let per_param: BTreeMap<String, Choice> = if self.is_modify_delete() {
            self.choices
                .get(&ParameterKey::File)
                .map(|c| (ParameterKey::File.wire_key(), *c))
                .into_iter()
                .collect()
        } else {
            self.keys
                .iter()
                .filter_map(|(k, _)| self.choices.get(k).map(|c| (k.wire_key(), *c)))
                .collect()
        };

        Ok(BTreeMap::from([(self.record.file_path.clone(), per_param)]))
    }
}
