//! Typed keys for conflicting parameters.
//!
//! The backend labels parameters for display (`"Tags: action"`,
//! `"Custom Format: 12"`) and expects resolutions keyed by a flat string
//! (`"tag_action"`, `"custom_format_12"`). [`ParameterKey`] sits between the
//! two so the rest of the crate compares structured values instead of
//! parsing strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::FILE_PARAMETER;

const TAG_LABEL_PREFIXES: [&str; 2] = ["Tags: ", "Tag: "];
const CUSTOM_FORMAT_LABEL_PREFIXES: [&str; 2] = ["Custom Format: ", "Custom Formats: "];
const TAG_WIRE_PREFIX: &str = "tag_";
const CUSTOM_FORMAT_WIRE_PREFIX: &str = "custom_format_";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterKey {
    /// A plain entity field such as `Description`.
    Field(String),
    /// Presence of a tag.
    Tag(String),
    /// A quality profile's score for one custom format.
    CustomFormat(String),
    /// The modify/delete presence decision.
    File,
}

impl ParameterKey {
    /// Key for a parameter label as it appears in a conflict record.
    pub fn from_parameter(label: &str) -> Self {
        if label == FILE_PARAMETER {
            return Self::File;
        }
        if let Some(name) = strip_any(label, &TAG_LABEL_PREFIXES) {
            return Self::Tag(name.trim().to_string());
        }
        if let Some(id) = strip_any(label, &CUSTOM_FORMAT_LABEL_PREFIXES) {
            return Self::CustomFormat(id.trim().to_string());
        }
        Self::Field(label.to_string())
    }

    /// Key for a flat resolution key as the backend expects it.
    pub fn from_wire(key: &str) -> Self {
        if key == FILE_PARAMETER {
            Self::File
        } else if let Some(id) = key.strip_prefix(CUSTOM_FORMAT_WIRE_PREFIX) {
            Self::CustomFormat(id.to_string())
        } else if let Some(name) = key.strip_prefix(TAG_WIRE_PREFIX) {
            Self::Tag(name.to_string())
        } else {
            Self::Field(key.to_string())
        }
    }

    pub fn wire_key(&self) -> String {
        match self {
            Self::Field(name) => name.clone(),
            Self::Tag(name) => format!("{TAG_WIRE_PREFIX}{name}"),
            Self::CustomFormat(id) => format!("{CUSTOM_FORMAT_WIRE_PREFIX}{id}"),
            Self::File => FILE_PARAMETER.to_string(),
        }
    }
}

fn strip_any<'a>(label: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|p| label.strip_prefix(p))
}

impl std::fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.wire_key())
    }
}

impl Serialize for ParameterKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.wire_key())
    }
}

impl<'de> Deserialize<'de> for ParameterKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&key))
    }
}
