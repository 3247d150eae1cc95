//! Single-flight coordinator for every mutating Git action.
//!
//! The [`SyncOrchestrator`] is a small state machine over the current
//! action. Each action runs the same cycle:
//!
//! 1. Validate against the latest status and the caller's selection.
//! 2. Claim the action slot, or fail with `Busy` if another action holds it.
//! 3. Call the backend.
//! 4. On success, refetch the status. The status is never patched locally.
//! 5. Notify.
//! 6. Release the slot, whatever happened above.
//!
//! Validation failures are returned to the caller and never notified; they
//! double as tooltips for disabled controls through the `can_*` queries.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::{GitBackend, PullState};
use crate::conflict::{MergeSession, ResolutionEditor};
use crate::errors::{BackendError, OrchestratorError, ResolutionError, ValidationError};
use crate::models::{GitStatus, SelectionClass};
use crate::notify::{describe_failure, Notification, NotificationLevel, Notifier};
use crate::selection::Selection;

// ---------------------------------------------------------------------------
// Action state
// ---------------------------------------------------------------------------

/// The action in flight. Idle is `None`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Staging,
    Unstaging,
    Committing,
    Reverting,
    Pulling,
    Pushing,
    Resolving,
    Finalizing,
    Aborting,
}

impl ActionKind {
    /// Phrase for generic failure messages: "Failed to {verb} ...".
    pub fn verb(self) -> &'static str {
        match self {
            Self::Staging => "stage changes",
            Self::Unstaging => "unstage changes",
            Self::Committing => "commit",
            Self::Reverting => "revert changes",
            Self::Pulling => "pull",
            Self::Pushing => "push",
            Self::Resolving => "resolve the conflict",
            Self::Finalizing => "finalize the merge",
            Self::Aborting => "abort the merge",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Staging => write!(f, "staging"),
            Self::Unstaging => write!(f, "unstaging"),
            Self::Committing => write!(f, "committing"),
            Self::Reverting => write!(f, "reverting"),
            Self::Pulling => write!(f, "pulling"),
            Self::Pushing => write!(f, "pushing"),
            Self::Resolving => write!(f, "resolving"),
            Self::Finalizing => write!(f, "finalizing"),
            Self::Aborting => write!(f, "aborting"),
        }
    }
}

/// Outcome of a completed action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionReport {
    pub action: ActionKind,
    pub level: NotificationLevel,
    pub message: String,
    /// Status after the post-action refresh, if the refresh succeeded.
    pub status: Option<Arc<GitStatus>>,
}

/// Outcome of submitting a conflict resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Resolved(ActionReport),
    /// The backend did not accept the choices. The editor stays open.
    NeedsCorrection { message: String },
}

/// Releases the action slot when dropped.
struct ActionGuard<'a> {
    slot: &'a watch::Sender<Option<ActionKind>>,
    action: ActionKind,
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        self.slot.send_replace(None);
        debug!(action = %self.action, "action slot released");
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct SyncOrchestrator {
    backend: Arc<dyn GitBackend>,
    notifier: Notifier,
    status: watch::Sender<Arc<GitStatus>>,
    action: watch::Sender<Option<ActionKind>>,
    session: Mutex<MergeSession>,
    /// Sequence number handed to the next status fetch.
    dispatched: AtomicU64,
    /// Sequence number of the snapshot currently published.
    published: AtomicU64,
}

impl SyncOrchestrator {
    pub fn new(backend: Arc<dyn GitBackend>, notifier: Notifier) -> Self {
        info!("initializing sync orchestrator");
        let (status, _) = watch::channel(Arc::new(GitStatus::default()));
        let (action, _) = watch::channel(None);
        Self {
            backend,
            notifier,
            status,
            action,
            session: Mutex::new(MergeSession::new()),
            dispatched: AtomicU64::new(0),
            published: AtomicU64::new(0),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// The latest status snapshot.
    pub fn status(&self) -> Arc<GitStatus> {
        self.status.borrow().clone()
    }

    pub fn current_action(&self) -> Option<ActionKind> {
        *self.action.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.current_action().is_some()
    }

    pub fn subscribe_actions(&self) -> watch::Receiver<Option<ActionKind>> {
        self.action.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Arc<GitStatus>> {
        self.status.subscribe()
    }

    /// Refetch the status from the backend and publish it.
    ///
    /// Callable at any time, including by features outside the
    /// orchestrator (e.g. after a branch checkout). Fetches are ordered by
    /// dispatch: a reply that lands after a later-dispatched fetch was
    /// published is dropped, and the newer snapshot is returned instead.
    pub async fn fetch_status(&self) -> Result<Arc<GitStatus>, BackendError> {
        let seq = self.dispatched.fetch_add(1, Ordering::SeqCst) + 1;
        let fresh = Arc::new(self.backend.get_status().await?);

        let mut session = self.session();
        if seq <= self.published.load(Ordering::SeqCst) {
            debug!(seq, "dropping stale status snapshot");
            return Ok(self.status());
        }
        session.observe(&fresh);
        self.published.store(seq, Ordering::SeqCst);
        self.status.send_replace(fresh.clone());
        drop(session);

        debug!(
            seq,
            branch = %fresh.branch,
            merging = fresh.is_merging,
            "status refreshed"
        );
        Ok(fresh)
    }

    /// Open the conflict at `file_path` for editing.
    pub fn open_conflict(&self, file_path: &str) -> Result<ResolutionEditor, ResolutionError> {
        let status = self.status();
        self.session().open(&status, file_path)
    }

    // -----------------------------------------------------------------------
    // Availability
    // -----------------------------------------------------------------------

    pub fn can_stage(&self, selection: &Selection) -> Result<(), ValidationError> {
        require_class(selection, SelectionClass::Unstaged)
    }

    pub fn can_unstage(&self, selection: &Selection) -> Result<(), ValidationError> {
        require_class(selection, SelectionClass::Staged)
    }

    pub fn can_commit(&self, selection: &Selection, message: &str) -> Result<(), ValidationError> {
        require_class(selection, SelectionClass::Staged)?;
        if message.trim().is_empty() {
            return Err(ValidationError::EmptyCommitMessage);
        }
        Ok(())
    }

    pub fn can_revert(&self, selection: &Selection) -> Result<(), ValidationError> {
        if selection.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        Ok(())
    }

    pub fn can_push(&self) -> Result<(), ValidationError> {
        if !self.status().has_unpushed_commits {
            return Err(ValidationError::NothingToPush);
        }
        Ok(())
    }

    pub fn can_pull(&self) -> Result<(), ValidationError> {
        if self.status().incoming_changes.is_empty() {
            return Err(ValidationError::NoIncomingChanges);
        }
        Ok(())
    }

    pub fn can_resolve(&self, editor: &ResolutionEditor) -> Result<(), ValidationError> {
        if !self.status().is_merging {
            return Err(ValidationError::NotMerging);
        }
        editor.resolutions().map(|_| ())
    }

    pub fn can_finalize(&self) -> Result<(), ValidationError> {
        let status = self.status();
        if !status.is_merging {
            return Err(ValidationError::NotMerging);
        }
        let remaining = status.unresolved_conflicts().count();
        if remaining > 0 {
            return Err(ValidationError::UnresolvedConflicts { remaining });
        }
        Ok(())
    }

    pub fn can_abort(&self) -> Result<(), ValidationError> {
        if !self.status().is_merging {
            return Err(ValidationError::NotMerging);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    pub async fn stage(&self, selection: &Selection) -> Result<ActionReport, OrchestratorError> {
        self.can_stage(selection)?;
        let kind = ActionKind::Staging;
        let _guard = self.begin(kind)?;
        let reply = self.call(kind, self.backend.stage(&selection.paths)).await?;
        let message = reply
            .message
            .unwrap_or_else(|| format!("Staged {}", count(selection.len())));
        Ok(self.complete(kind, NotificationLevel::Success, message).await)
    }

    pub async fn unstage(&self, selection: &Selection) -> Result<ActionReport, OrchestratorError> {
        self.can_unstage(selection)?;
        let kind = ActionKind::Unstaging;
        let _guard = self.begin(kind)?;
        let reply = self.call(kind, self.backend.unstage(&selection.paths)).await?;
        let message = reply
            .message
            .unwrap_or_else(|| format!("Unstaged {}", count(selection.len())));
        Ok(self.complete(kind, NotificationLevel::Success, message).await)
    }

    pub async fn commit(
        &self,
        selection: &Selection,
        message: &str,
    ) -> Result<ActionReport, OrchestratorError> {
        self.can_commit(selection, message)?;
        let kind = ActionKind::Committing;
        let _guard = self.begin(kind)?;
        let reply = self
            .call(kind, self.backend.commit(&selection.paths, message.trim()))
            .await?;
        let text = reply
            .message
            .unwrap_or_else(|| format!("Committed {}", count(selection.len())));
        Ok(self.complete(kind, NotificationLevel::Success, text).await)
    }

    pub async fn revert(&self, selection: &Selection) -> Result<ActionReport, OrchestratorError> {
        self.can_revert(selection)?;
        let kind = ActionKind::Reverting;
        let _guard = self.begin(kind)?;
        let reply = self.call(kind, self.backend.revert(&selection.paths)).await?;
        let message = reply
            .message
            .unwrap_or_else(|| format!("Reverted {}", count(selection.len())));
        Ok(self.complete(kind, NotificationLevel::Success, message).await)
    }

    pub async fn revert_file(&self, file_path: &str) -> Result<ActionReport, OrchestratorError> {
        if file_path.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        let kind = ActionKind::Reverting;
        let _guard = self.begin(kind)?;
        let reply = self.call(kind, self.backend.revert_file(file_path)).await?;
        let message = reply
            .message
            .unwrap_or_else(|| format!("Reverted {file_path}"));
        Ok(self.complete(kind, NotificationLevel::Success, message).await)
    }

    pub async fn revert_all(&self) -> Result<ActionReport, OrchestratorError> {
        let kind = ActionKind::Reverting;
        let _guard = self.begin(kind)?;
        let reply = self.call(kind, self.backend.revert_all()).await?;
        let message = reply
            .message
            .unwrap_or_else(|| "Reverted all changes".to_string());
        Ok(self.complete(kind, NotificationLevel::Success, message).await)
    }

    pub async fn push(&self) -> Result<ActionReport, OrchestratorError> {
        self.can_push()?;
        let kind = ActionKind::Pushing;
        let _guard = self.begin(kind)?;
        let reply = self.call(kind, self.backend.push()).await?;
        let message = reply
            .message
            .unwrap_or_else(|| "Pushed to remote".to_string());
        Ok(self.complete(kind, NotificationLevel::Success, message).await)
    }

    /// Pull the whole incoming set into the current branch.
    pub async fn pull(&self) -> Result<ActionReport, OrchestratorError> {
        self.can_pull()?;
        let branch = self.status().branch.clone();
        let kind = ActionKind::Pulling;
        let _guard = self.begin(kind)?;
        let reply = self.call(kind, self.backend.pull(&branch)).await?;
        let (level, message) = match reply.state {
            PullState::Ok => (
                NotificationLevel::Success,
                reply
                    .message
                    .unwrap_or_else(|| format!("Pulled changes into {branch}")),
            ),
            PullState::Resolve => (
                NotificationLevel::Warning,
                reply
                    .message
                    .unwrap_or_else(|| "Pull started a merge with conflicts to resolve".to_string()),
            ),
        };
        Ok(self.complete(kind, level, message).await)
    }

    /// Submit the editor's choices.
    ///
    /// A soft failure from the backend comes back as
    /// [`ResolveOutcome::NeedsCorrection`] with a warning notification and
    /// no status refresh.
    pub async fn submit_resolution(
        &self,
        editor: &ResolutionEditor,
    ) -> Result<ResolveOutcome, OrchestratorError> {
        self.can_resolve(editor)?;
        let resolutions = editor.resolutions()?;
        if editor.is_modify_delete() {
            let status = self.status();
            let resolved = status
                .conflict(editor.file_path())
                .is_some_and(|r| r.is_resolved());
            if resolved || self.session().is_locked(editor.file_path()) {
                return Err(ResolutionError::Locked(editor.file_path().to_string()).into());
            }
        }

        let kind = ActionKind::Resolving;
        let _guard = self.begin(kind)?;
        let reply = self
            .call(kind, self.backend.resolve_conflicts(&resolutions))
            .await?;

        if !reply.success {
            let message = reply
                .message
                .unwrap_or_else(|| "The backend could not apply these choices".to_string());
            self.notifier
                .notify(NotificationLevel::Warning, Some(kind), message.clone());
            return Ok(ResolveOutcome::NeedsCorrection { message });
        }

        self.session().record_submission(editor);
        let message = reply
            .message
            .unwrap_or_else(|| format!("Resolved {}", editor.record().display_name));
        let report = self.complete(kind, NotificationLevel::Success, message).await;
        Ok(ResolveOutcome::Resolved(report))
    }

    pub async fn finalize_merge(&self) -> Result<ActionReport, OrchestratorError> {
        self.can_finalize()?;
        let kind = ActionKind::Finalizing;
        let _guard = self.begin(kind)?;
        let reply = self.call(kind, self.backend.finalize_merge()).await?;
        let message = reply
            .message
            .unwrap_or_else(|| "Merge finalized".to_string());
        Ok(self.complete(kind, NotificationLevel::Success, message).await)
    }

    pub async fn abort_merge(&self) -> Result<ActionReport, OrchestratorError> {
        self.can_abort()?;
        let kind = ActionKind::Aborting;
        let _guard = self.begin(kind)?;
        let reply = self.call(kind, self.backend.abort_merge()).await?;
        self.session().reset();
        let message = reply.message.unwrap_or_else(|| "Merge aborted".to_string());
        Ok(self.complete(kind, NotificationLevel::Success, message).await)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Claim the action slot.
    fn begin(&self, kind: ActionKind) -> Result<ActionGuard<'_>, OrchestratorError> {
        let mut busy = None;
        self.action.send_if_modified(|current| match current {
            Some(other) => {
                busy = Some(*other);
                false
            }
            None => {
                *current = Some(kind);
                true
            }
        });
        if let Some(current) = busy {
            debug!(requested = %kind, current = %current, "action rejected, orchestrator busy");
            return Err(OrchestratorError::Busy { current });
        }
        info!(action = %kind, "action started");
        Ok(ActionGuard {
            slot: &self.action,
            action: kind,
        })
    }

    /// Await a backend call, notifying on failure.
    async fn call<T, F>(&self, kind: ActionKind, fut: F) -> Result<T, OrchestratorError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        match fut.await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(action = %kind, error = %e, "action failed");
                let (level, message) = describe_failure(kind, &e);
                self.notifier.notify(level, Some(kind), message);
                Err(OrchestratorError::Backend(e))
            }
        }
    }

    /// Refresh after a successful call and notify the outcome.
    async fn complete(
        &self,
        kind: ActionKind,
        level: NotificationLevel,
        message: String,
    ) -> ActionReport {
        let status = match self.fetch_status().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(action = %kind, error = %e, "status refresh after action failed");
                self.notifier.send(Notification::new(
                    NotificationLevel::Error,
                    Some(kind),
                    "Failed to refresh status",
                ));
                None
            }
        };
        info!(action = %kind, level = %level, "action completed");
        self.notifier.notify(level, Some(kind), message.clone());
        ActionReport {
            action: kind,
            level,
            message,
            status,
        }
    }

    fn session(&self) -> MutexGuard<'_, MergeSession> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn require_class(selection: &Selection, expected: SelectionClass) -> Result<(), ValidationError> {
    if selection.is_empty() {
        return Err(ValidationError::EmptySelection);
    }
    if selection.class != Some(expected) {
        return Err(ValidationError::WrongSelectionClass { expected });
    }
    Ok(())
}

fn count(n: usize) -> String {
    if n == 1 {
        "1 file".to_string()
    } else {
        format!("{n} files")
    }
}
