//! Error types for the gitdeck core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

use crate::models::SelectionClass;
use crate::orchestrator::ActionKind;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

/// How a backend failure should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The backend understood the request and refused it (HTTP 400/409, or
    /// a `success: false` envelope). The message is meant for the user.
    Operational,
    /// Network loss, timeouts, 5xx, unreadable responses.
    Unexpected,
}

/// Errors from the external Git backend service.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP-level transport error (connect, TLS, timeout, body read).
    #[error("backend HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend returned a non-success status code.
    #[error("backend API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The backend answered 2xx but reported `success: false`.
    #[error("{0}")]
    Rejected(String),

    /// The response body could not be decoded.
    #[error("backend response parse error: {0}")]
    Parse(String),
}

impl BackendError {
    /// Classify the failure for notification purposes.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Api { status, .. } if matches!(status, 400 | 409) => FailureKind::Operational,
            Self::Rejected(_) => FailureKind::Operational,
            _ => FailureKind::Unexpected,
        }
    }

    /// HTTP status code, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// Client-side checks that block an action before it is dispatched.
///
/// The display text doubles as the tooltip on the disabled control.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("select at least one change first")]
    EmptySelection,

    #[error("only {expected} changes can be used for this action")]
    WrongSelectionClass { expected: SelectionClass },

    #[error("enter a commit message")]
    EmptyCommitMessage,

    #[error("there are no unpushed commits")]
    NothingToPush,

    #[error("there are no incoming changes to pull")]
    NoIncomingChanges,

    #[error("no merge is in progress")]
    NotMerging,

    #[error("{remaining} conflict(s) still need resolving")]
    UnresolvedConflicts { remaining: usize },

    #[error("choose a side for: {}", missing.join(", "))]
    ConflictNotReady { missing: Vec<String> },
}

// ---------------------------------------------------------------------------
// Resolution errors
// ---------------------------------------------------------------------------

/// Errors from the conflict resolution subsystem.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// No conflict record with this path is part of the current status.
    #[error("no merge conflict for '{0}'")]
    UnknownConflict(String),

    /// A resolved modify/delete conflict cannot be edited again.
    #[error("'{0}' was resolved as a modify/delete conflict; abort the merge to change it")]
    Locked(String),

    /// The parameter is not one of the record's conflicting parameters.
    #[error("'{parameter}' is not a conflicting parameter of '{file_path}'")]
    UnknownParameter {
        file_path: String,
        parameter: String,
    },
}

// ---------------------------------------------------------------------------
// Orchestrator errors
// ---------------------------------------------------------------------------

/// Errors returned when dispatching an orchestrator action.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Another action is still in flight.
    #[error("{current} is still in progress")]
    Busy { current: ActionKind },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
