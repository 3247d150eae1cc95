//! Seam between the engine and the service that owns the repository.
//!
//! The orchestrator only ever talks to a [`GitBackend`]. The HTTP
//! implementation lives in [`client`]; tests plug in scripted backends.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conflict::Resolutions;
use crate::errors::BackendError;
use crate::models::GitStatus;

pub use client::HttpGitBackend;

/// Reply to an operation that carries nothing but an optional message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationReply {
    #[serde(default)]
    pub message: Option<String>,
}

/// What a pull ended in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PullState {
    /// Fast-forward or clean merge.
    #[default]
    Ok,
    /// The pull started a merge that needs conflict resolution.
    Resolve,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullReply {
    #[serde(default)]
    pub state: PullState,
    #[serde(default)]
    pub message: Option<String>,
}

/// Reply to a resolution submission.
///
/// `success: false` is a soft failure: the backend wants the user to adjust
/// their choices, and `message` says why.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolveReply {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Operations the engine needs from the repository service.
#[async_trait]
pub trait GitBackend: Send + Sync {
    async fn get_status(&self) -> Result<GitStatus, BackendError>;

    async fn stage(&self, files: &[String]) -> Result<OperationReply, BackendError>;

    async fn unstage(&self, files: &[String]) -> Result<OperationReply, BackendError>;

    async fn commit(&self, files: &[String], message: &str) -> Result<OperationReply, BackendError>;

    async fn revert(&self, files: &[String]) -> Result<OperationReply, BackendError>;

    async fn revert_file(&self, file_path: &str) -> Result<OperationReply, BackendError>;

    async fn revert_all(&self) -> Result<OperationReply, BackendError>;

    async fn push(&self) -> Result<OperationReply, BackendError>;

    async fn pull(&self, branch: &str) -> Result<PullReply, BackendError>;

    async fn resolve_conflicts(&self, resolutions: &Resolutions)
        -> Result<ResolveReply, BackendError>;

    async fn finalize_merge(&self) -> Result<OperationReply, BackendError>;

    async fn abort_merge(&self) -> Result<OperationReply, BackendError>;
}
