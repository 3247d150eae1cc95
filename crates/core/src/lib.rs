//! gitdeck core library.
//!
//! Client-side engine for reviewing a working tree of configuration files
//! against a Git backend: the change model, multi-select over outgoing
//! changes, parameter-level conflict resolution, and a single-flight
//! orchestrator for stage/commit/pull/push/merge actions.

pub mod backend;
pub mod config;
pub mod conflict;
pub mod errors;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod selection;

// Re-exports for convenience.
pub use backend::{GitBackend, HttpGitBackend};
pub use config::AppConfig;
pub use conflict::{Choice, MergeSession, ParameterKey, ResolutionEditor};
pub use errors::CoreError;
pub use models::GitStatus;
pub use notify::{Notification, NotificationLevel, Notifier};
pub use orchestrator::{ActionKind, ActionReport, ResolveOutcome, SyncOrchestrator};
pub use selection::{Selection, SelectionController};
