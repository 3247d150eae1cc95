//! End-to-end tests for the `SyncOrchestrator` against a scripted backend.
//!
//! The scripted backend keeps a status snapshot that tests swap to simulate
//! what the real service would report after each mutation. Every call is
//! recorded so tests can assert exactly what reached the backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;

use gitdeck_core::backend::{GitBackend, OperationReply, PullReply, PullState, ResolveReply};
use gitdeck_core::conflict::{Choice, ParameterKey, Resolutions};
use gitdeck_core::errors::{BackendError, OrchestratorError, ResolutionError, ValidationError};
use gitdeck_core::models::{
    Change, ChangeStatus, ConflictRecord, ConflictStatus, ConflictingParameter, EntityType,
    GitStatus, SelectionClass,
};
use gitdeck_core::notify::{Notification, NotificationLevel, Notifier};
use gitdeck_core::orchestrator::{ActionKind, ActionReport, ResolveOutcome, SyncOrchestrator};
use gitdeck_core::selection::SelectionController;

// ===========================================================================
// Scripted backend
// ===========================================================================

#[derive(Debug, Clone)]
enum Failure {
    Api(u16, &'static str),
    Rejected(&'static str),
    Parse,
}

impl Failure {
    fn into_error(self) -> BackendError {
        match self {
            Self::Api(status, message) => BackendError::Api {
                status,
                message: message.into(),
            },
            Self::Rejected(message) => BackendError::Rejected(message.into()),
            Self::Parse => BackendError::Parse("unexpected end of input".into()),
        }
    }
}

#[derive(Default)]
struct ScriptedBackend {
    status: Mutex<GitStatus>,
    /// Status to report once the next mutation succeeds.
    after: Mutex<Option<GitStatus>>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<VecDeque<Failure>>,
    pull_state: Mutex<PullState>,
    resolve_replies: Mutex<VecDeque<ResolveReply>>,
    submitted: Mutex<Vec<Resolutions>>,
    /// When set, mutations wait for a permit before answering.
    gate: Option<Arc<Notify>>,
    /// When set, the next status fetch takes its snapshot and then waits.
    status_gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedBackend {
    fn with_status(status: GitStatus) -> Self {
        Self {
            status: Mutex::new(status),
            ..Default::default()
        }
    }

    fn gated(status: GitStatus, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::with_status(status)
        }
    }

    fn then_report(&self, status: GitStatus) {
        *self.after.lock().unwrap() = Some(status);
    }

    fn hold_next_status(&self, gate: Arc<Notify>) {
        *self.status_gate.lock().unwrap() = Some(gate);
    }

    fn fail_next(&self, failure: Failure) {
        self.failures.lock().unwrap().push_back(failure);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn status_fetches(&self) -> usize {
        self.calls().iter().filter(|c| *c == "get_status").count()
    }

    async fn mutate(&self, call: String) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push(call);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(failure) = self.failures.lock().unwrap().pop_front() {
            return Err(failure.into_error());
        }
        if let Some(next) = self.after.lock().unwrap().take() {
            *self.status.lock().unwrap() = next;
        }
        Ok(())
    }
}

#[async_trait]
impl GitBackend for ScriptedBackend {
    async fn get_status(&self) -> Result<GitStatus, BackendError> {
        self.calls.lock().unwrap().push("get_status".into());
        let snapshot = self.status.lock().unwrap().clone();
        let gate = self.status_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(snapshot)
    }

    async fn stage(&self, files: &[String]) -> Result<OperationReply, BackendError> {
        self.mutate(format!("stage:{}", files.join(","))).await?;
        Ok(OperationReply::default())
    }

    async fn unstage(&self, files: &[String]) -> Result<OperationReply, BackendError> {
        self.mutate(format!("unstage:{}", files.join(","))).await?;
        Ok(OperationReply::default())
    }

    async fn commit(&self, files: &[String], message: &str) -> Result<OperationReply, BackendError> {
        self.mutate(format!("commit:{}:{}", files.join(","), message))
            .await?;
        Ok(OperationReply {
            message: Some("Committed".into()),
        })
    }

    async fn revert(&self, files: &[String]) -> Result<OperationReply, BackendError> {
        self.mutate(format!("revert:{}", files.join(","))).await?;
        Ok(OperationReply::default())
    }

    async fn revert_file(&self, file_path: &str) -> Result<OperationReply, BackendError> {
        self.mutate(format!("revert_file:{file_path}")).await?;
        Ok(OperationReply::default())
    }

    async fn revert_all(&self) -> Result<OperationReply, BackendError> {
        self.mutate("revert_all".into()).await?;
        Ok(OperationReply::default())
    }

    async fn push(&self) -> Result<OperationReply, BackendError> {
        self.mutate("push".into()).await?;
        Ok(OperationReply::default())
    }

    async fn pull(&self, branch: &str) -> Result<PullReply, BackendError> {
        self.mutate(format!("pull:{branch}")).await?;
        Ok(PullReply {
            state: *self.pull_state.lock().unwrap(),
            message: None,
        })
    }

    async fn resolve_conflicts(
        &self,
        resolutions: &Resolutions,
    ) -> Result<ResolveReply, BackendError> {
        self.submitted.lock().unwrap().push(resolutions.clone());
        let reply = self
            .resolve_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ResolveReply {
                success: true,
                message: None,
            });
        if reply.success {
            self.mutate("resolve".into()).await?;
        } else {
            self.calls.lock().unwrap().push("resolve".into());
        }
        Ok(reply)
    }

    async fn finalize_merge(&self) -> Result<OperationReply, BackendError> {
        self.mutate("finalize".into()).await?;
        Ok(OperationReply::default())
    }

    async fn abort_merge(&self) -> Result<OperationReply, BackendError> {
        self.mutate("abort".into()).await?;
        Ok(OperationReply::default())
    }
}

// ===========================================================================
// Fixtures
// ===========================================================================

fn change(path: &str, status: ChangeStatus, staged: bool) -> Change {
    Change {
        file_path: path.into(),
        status,
        staged,
        modified: false,
        entity_type: EntityType::CustomFormat,
        display_name: path.into(),
        prior_name: None,
        incoming_name: None,
    }
}

fn working_tree() -> GitStatus {
    GitStatus {
        branch: "main".into(),
        outgoing_changes: vec![
            change("custom_formats/a.yml", ChangeStatus::Modified, false),
            change("custom_formats/b.yml", ChangeStatus::Untracked, false),
            change("custom_formats/c.yml", ChangeStatus::StagedModified, true),
        ],
        ..Default::default()
    }
}

fn conflict(path: &str, params: &[&str], status: ConflictStatus) -> ConflictRecord {
    ConflictRecord {
        file_path: path.into(),
        entity_type: EntityType::QualityProfile,
        display_name: "1080p".into(),
        status,
        conflicting_parameters: params
            .iter()
            .map(|p| ConflictingParameter {
                parameter: p.to_string(),
                local_value: serde_json::json!(1),
                incoming_value: serde_json::json!(2),
            })
            .collect(),
    }
}

fn merging(conflicts: Vec<ConflictRecord>) -> GitStatus {
    GitStatus {
        branch: "main".into(),
        is_merging: true,
        merge_conflicts: conflicts,
        ..Default::default()
    }
}

async fn orchestrator(
    backend: Arc<ScriptedBackend>,
) -> (SyncOrchestrator, broadcast::Receiver<Notification>) {
    let orchestrator = SyncOrchestrator::new(backend, Notifier::new(16));
    let rx = orchestrator.notifier().subscribe();
    orchestrator.fetch_status().await.unwrap();
    (orchestrator, rx)
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn test_stage_range_selection_refreshes_status() {
    let backend = Arc::new(ScriptedBackend::with_status(working_tree()));
    let (orch, mut rx) = orchestrator(backend.clone()).await;

    let status = orch.status();
    let mut selection = SelectionController::new();
    selection.select_at(&status.outgoing_changes, 0, false);
    selection.select_at(&status.outgoing_changes, 2, true);
    // c.yml is staged, so the range stops at the unstaged rows.
    let snapshot = selection.snapshot(&status.outgoing_changes);
    assert_eq!(
        snapshot.paths,
        vec!["custom_formats/a.yml", "custom_formats/b.yml"]
    );

    let mut after = working_tree();
    for c in after.outgoing_changes.iter_mut() {
        c.staged = true;
    }
    backend.then_report(after);

    let report = orch.stage(&snapshot).await.unwrap();
    assert_eq!(report.action, ActionKind::Staging);
    assert_eq!(report.level, NotificationLevel::Success);
    assert_eq!(report.message, "Staged 2 files");
    assert_eq!(
        backend.calls(),
        vec![
            "get_status",
            "stage:custom_formats/a.yml,custom_formats/b.yml",
            "get_status"
        ]
    );
    assert!(orch.status().outgoing_changes.iter().all(|c| c.staged));
    assert_eq!(orch.current_action(), None);

    let toast = rx.recv().await.unwrap();
    assert_eq!(toast.level, NotificationLevel::Success);
    assert_eq!(toast.action, Some(ActionKind::Staging));
}

#[tokio::test]
async fn test_commit_with_empty_selection_never_reaches_backend() {
    let backend = Arc::new(ScriptedBackend::with_status(working_tree()));
    let (orch, mut rx) = orchestrator(backend.clone()).await;

    let empty = SelectionController::new().snapshot(&orch.status().outgoing_changes);
    let err = orch.commit(&empty, "update formats").await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Validation(ValidationError::EmptySelection)
    ));
    assert_eq!(backend.calls(), vec!["get_status"]);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_commit_requires_staged_selection_and_message() {
    let backend = Arc::new(ScriptedBackend::with_status(working_tree()));
    let (orch, _rx) = orchestrator(backend.clone()).await;
    let changes = orch.status().outgoing_changes.clone();

    let mut unstaged = SelectionController::new();
    unstaged.select_at(&changes, 0, false);
    let err = orch
        .commit(&unstaged.snapshot(&changes), "msg")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Validation(ValidationError::WrongSelectionClass {
            expected: SelectionClass::Staged
        })
    ));

    let mut staged = SelectionController::new();
    staged.select_at(&changes, 2, false);
    let snapshot = staged.snapshot(&changes);
    assert_eq!(
        orch.can_commit(&snapshot, "   "),
        Err(ValidationError::EmptyCommitMessage)
    );

    let report = orch.commit(&snapshot, "  tune scores ").await.unwrap();
    assert_eq!(report.message, "Committed");
    assert!(backend
        .calls()
        .contains(&"commit:custom_formats/c.yml:tune scores".to_string()));
}

#[tokio::test]
async fn test_second_action_rejected_while_first_in_flight() {
    let gate = Arc::new(Notify::new());
    let mut status = working_tree();
    status.has_unpushed_commits = true;
    let backend = Arc::new(ScriptedBackend::gated(status, gate.clone()));
    let orch = Arc::new(SyncOrchestrator::new(backend.clone(), Notifier::new(16)));
    orch.fetch_status().await.unwrap();

    let changes = orch.status().outgoing_changes.clone();
    let mut selection = SelectionController::new();
    selection.select_at(&changes, 0, false);
    let snapshot = selection.snapshot(&changes);

    let mut actions = orch.subscribe_actions();
    let task = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.stage(&snapshot).await })
    };

    while actions.borrow_and_update().is_none() {
        actions.changed().await.unwrap();
    }
    assert_eq!(orch.current_action(), Some(ActionKind::Staging));
    assert!(orch.is_busy());

    let err = orch.push().await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Busy {
            current: ActionKind::Staging
        }
    ));
    assert!(!backend.calls().contains(&"push".to_string()));

    gate.notify_one();
    task.await.unwrap().unwrap();
    assert_eq!(orch.current_action(), None);

    // Idle again, so the push goes through.
    gate.notify_one();
    orch.push().await.unwrap();
    assert!(backend.calls().contains(&"push".to_string()));
}

/// Wait for `task` to claim `kind`, release the backend, and return the
/// result once the slot has gone back to idle exactly once.
async fn release_held(
    task: JoinHandle<Result<ActionReport, OrchestratorError>>,
    actions: &mut watch::Receiver<Option<ActionKind>>,
    gate: &Notify,
    kind: ActionKind,
) -> Result<ActionReport, OrchestratorError> {
    actions.changed().await.unwrap();
    assert_eq!(*actions.borrow_and_update(), Some(kind));
    assert!(!actions.has_changed().unwrap());

    gate.notify_one();
    let result = task.await.unwrap();
    assert!(actions.has_changed().unwrap());
    assert_eq!(*actions.borrow_and_update(), None);
    assert!(!actions.has_changed().unwrap());
    result
}

#[tokio::test]
async fn test_action_slot_returns_to_idle_once_per_action() {
    let gate = Arc::new(Notify::new());
    let mut status = working_tree();
    status.has_unpushed_commits = true;
    let backend = Arc::new(ScriptedBackend::gated(status, gate.clone()));
    let orch = Arc::new(SyncOrchestrator::new(backend.clone(), Notifier::new(16)));
    orch.fetch_status().await.unwrap();

    let changes = orch.status().outgoing_changes.clone();
    let mut selection = SelectionController::new();
    selection.select_at(&changes, 0, false);
    let snapshot = selection.snapshot(&changes);

    let mut actions = orch.subscribe_actions();
    actions.borrow_and_update();

    let task = {
        let (orch, snapshot) = (orch.clone(), snapshot.clone());
        tokio::spawn(async move { orch.stage(&snapshot).await })
    };
    release_held(task, &mut actions, &gate, ActionKind::Staging)
        .await
        .unwrap();

    backend.fail_next(Failure::Api(409, "index.lock exists"));
    let task = {
        let (orch, snapshot) = (orch.clone(), snapshot.clone());
        tokio::spawn(async move { orch.stage(&snapshot).await })
    };
    let err = release_held(task, &mut actions, &gate, ActionKind::Staging)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Backend(_)));

    let task = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.push().await })
    };
    release_held(task, &mut actions, &gate, ActionKind::Pushing)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stale_sibling_fetch_does_not_overwrite_action_refresh() {
    let mut before = working_tree();
    before.branch = "before".into();
    before.has_unpushed_commits = true;
    let backend = Arc::new(ScriptedBackend::with_status(before));
    let orch = Arc::new(SyncOrchestrator::new(backend.clone(), Notifier::new(16)));
    orch.fetch_status().await.unwrap();

    // A sibling fetch takes its snapshot, then stalls.
    let held = Arc::new(Notify::new());
    backend.hold_next_status(held.clone());
    let sibling = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.fetch_status().await })
    };
    while backend.status_fetches() < 2 {
        tokio::task::yield_now().await;
    }

    let mut after = working_tree();
    after.branch = "after-push".into();
    backend.then_report(after);
    orch.push().await.unwrap();
    assert_eq!(orch.status().branch, "after-push");

    held.notify_one();
    let returned = sibling.await.unwrap().unwrap();
    assert_eq!(returned.branch, "after-push");
    assert_eq!(orch.status().branch, "after-push");
    assert!(!orch.status().has_unpushed_commits);
}

#[tokio::test]
async fn test_stale_fetch_does_not_clear_modify_delete_lock() {
    let conflicted = merging(vec![conflict(
        "profiles/old.yml",
        &["file"],
        ConflictStatus::Unresolved,
    )]);
    let mut idle = working_tree();
    idle.is_merging = false;
    let backend = Arc::new(ScriptedBackend::with_status(idle));
    let orch = Arc::new(SyncOrchestrator::new(backend.clone(), Notifier::new(16)));
    orch.fetch_status().await.unwrap();

    // A fetch from before the merge stalls while the merge starts.
    let held = Arc::new(Notify::new());
    backend.hold_next_status(held.clone());
    let sibling = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.fetch_status().await })
    };
    while backend.status_fetches() < 2 {
        tokio::task::yield_now().await;
    }

    *backend.status.lock().unwrap() = conflicted.clone();
    orch.fetch_status().await.unwrap();
    let mut editor = orch.open_conflict("profiles/old.yml").unwrap();
    editor.set_choice(ParameterKey::File, Choice::Local).unwrap();
    orch.submit_resolution(&editor).await.unwrap();
    assert!(orch.open_conflict("profiles/old.yml").is_err());

    held.notify_one();
    sibling.await.unwrap().unwrap();
    assert!(orch.status().is_merging);
    assert_eq!(
        orch.open_conflict("profiles/old.yml").unwrap_err(),
        ResolutionError::Locked("profiles/old.yml".into())
    );
}

#[tokio::test]
async fn test_operational_failure_warns_and_returns_to_idle() {
    let backend = Arc::new(ScriptedBackend::with_status(working_tree()));
    let (orch, mut rx) = orchestrator(backend.clone()).await;
    let changes = orch.status().outgoing_changes.clone();
    let mut selection = SelectionController::new();
    selection.select_at(&changes, 1, false);
    let snapshot = selection.snapshot(&changes);

    backend.fail_next(Failure::Api(409, "a merge is in progress"));
    let err = orch.stage(&snapshot).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Backend(_)));
    assert_eq!(orch.current_action(), None);
    // No refresh after a failure.
    assert_eq!(backend.status_fetches(), 1);

    let toast = rx.recv().await.unwrap();
    assert_eq!(toast.level, NotificationLevel::Warning);
    assert_eq!(toast.message, "a merge is in progress");

    backend.fail_next(Failure::Rejected("nothing to stage"));
    orch.stage(&snapshot).await.unwrap_err();
    assert_eq!(rx.recv().await.unwrap().level, NotificationLevel::Warning);

    // And the user can retry.
    orch.stage(&snapshot).await.unwrap();
    assert_eq!(backend.status_fetches(), 2);
}

#[tokio::test]
async fn test_bad_request_and_unexpected_failures_are_errors() {
    let mut status = working_tree();
    status.incoming_changes = vec![change("profiles/hd.yml", ChangeStatus::Modified, false)];
    let backend = Arc::new(ScriptedBackend::with_status(status));
    let (orch, mut rx) = orchestrator(backend.clone()).await;

    backend.fail_next(Failure::Api(400, "invalid branch name"));
    orch.pull().await.unwrap_err();
    let toast = rx.recv().await.unwrap();
    assert_eq!(toast.level, NotificationLevel::Error);
    assert_eq!(toast.message, "invalid branch name");

    backend.fail_next(Failure::Api(502, "bad gateway"));
    orch.pull().await.unwrap_err();
    let toast = rx.recv().await.unwrap();
    assert_eq!(toast.level, NotificationLevel::Error);
    assert_eq!(toast.message, "Failed to pull due to an unexpected error");

    backend.fail_next(Failure::Parse);
    orch.pull().await.unwrap_err();
    assert_eq!(rx.recv().await.unwrap().level, NotificationLevel::Error);
    assert_eq!(orch.current_action(), None);
}

#[tokio::test]
async fn test_push_and_pull_availability() {
    let backend = Arc::new(ScriptedBackend::with_status(working_tree()));
    let (orch, _rx) = orchestrator(backend.clone()).await;

    assert_eq!(orch.can_push(), Err(ValidationError::NothingToPush));
    assert!(matches!(
        orch.push().await,
        Err(OrchestratorError::Validation(ValidationError::NothingToPush))
    ));
    assert_eq!(orch.can_pull(), Err(ValidationError::NoIncomingChanges));
    assert_eq!(orch.can_finalize(), Err(ValidationError::NotMerging));
    assert_eq!(orch.can_abort(), Err(ValidationError::NotMerging));
    assert_eq!(backend.calls(), vec!["get_status"]);
}

#[tokio::test]
async fn test_pull_into_conflicts_then_resolve_and_finalize() {
    let mut status = working_tree();
    status.incoming_changes = vec![change("profiles/hd.yml", ChangeStatus::Modified, false)];
    let backend = Arc::new(ScriptedBackend::with_status(status));
    let (orch, mut rx) = orchestrator(backend.clone()).await;

    *backend.pull_state.lock().unwrap() = PullState::Resolve;
    backend.then_report(merging(vec![
        conflict(
            "profiles/hd.yml",
            &["Description", "Custom Format: 12"],
            ConflictStatus::Unresolved,
        ),
        conflict("profiles/old.yml", &["file"], ConflictStatus::Unresolved),
    ]));
    let report = orch.pull().await.unwrap();
    assert_eq!(report.level, NotificationLevel::Warning);
    assert!(backend.calls().contains(&"pull:main".to_string()));
    assert_eq!(rx.recv().await.unwrap().level, NotificationLevel::Warning);

    assert_eq!(
        orch.can_finalize(),
        Err(ValidationError::UnresolvedConflicts { remaining: 2 })
    );

    // Field-level record.
    let mut editor = orch.open_conflict("profiles/hd.yml").unwrap();
    editor.set_choice_for("Description", Choice::Local).unwrap();
    assert!(matches!(
        orch.submit_resolution(&editor).await,
        Err(OrchestratorError::Validation(
            ValidationError::ConflictNotReady { .. }
        ))
    ));
    editor
        .set_choice(ParameterKey::from_wire("custom_format_12"), Choice::Incoming)
        .unwrap();
    backend.then_report(merging(vec![
        conflict(
            "profiles/hd.yml",
            &["Description", "Custom Format: 12"],
            ConflictStatus::Resolved,
        ),
        conflict("profiles/old.yml", &["file"], ConflictStatus::Unresolved),
    ]));
    let outcome = orch.submit_resolution(&editor).await.unwrap();
    assert!(matches!(outcome, ResolveOutcome::Resolved(_)));

    let sent = backend.submitted.lock().unwrap().last().cloned().unwrap();
    assert_eq!(sent["profiles/hd.yml"]["Description"], Choice::Local);
    assert_eq!(sent["profiles/hd.yml"]["custom_format_12"], Choice::Incoming);

    // Reopening a resolved record brings back the submitted choices.
    let reopened = orch.open_conflict("profiles/hd.yml").unwrap();
    assert!(reopened.is_ready());

    // Modify/delete record locks once resolved.
    let mut editor = orch.open_conflict("profiles/old.yml").unwrap();
    assert!(editor.is_modify_delete());
    editor.set_choice(ParameterKey::File, Choice::Local).unwrap();
    let resolved_all = merging(vec![
        conflict(
            "profiles/hd.yml",
            &["Description", "Custom Format: 12"],
            ConflictStatus::Resolved,
        ),
        conflict("profiles/old.yml", &["file"], ConflictStatus::Resolved),
    ]);
    backend.then_report(resolved_all);
    orch.submit_resolution(&editor).await.unwrap();
    assert_eq!(
        orch.open_conflict("profiles/old.yml").unwrap_err(),
        ResolutionError::Locked("profiles/old.yml".into())
    );
    assert!(matches!(
        orch.submit_resolution(&editor).await,
        Err(OrchestratorError::Resolution(ResolutionError::Locked(_)))
    ));

    assert!(orch.can_finalize().is_ok());
    backend.then_report(working_tree());
    orch.finalize_merge().await.unwrap();
    assert!(!orch.status().is_merging);
}

#[tokio::test]
async fn test_resolve_soft_failure_keeps_editor_open() {
    let backend = Arc::new(ScriptedBackend::with_status(merging(vec![conflict(
        "profiles/hd.yml",
        &["Description"],
        ConflictStatus::Unresolved,
    )])));
    let (orch, mut rx) = orchestrator(backend.clone()).await;

    backend.resolve_replies.lock().unwrap().push_back(ResolveReply {
        success: false,
        message: Some("score out of range".into()),
    });

    let mut editor = orch.open_conflict("profiles/hd.yml").unwrap();
    editor.set_choice_for("Description", Choice::Incoming).unwrap();
    let outcome = orch.submit_resolution(&editor).await.unwrap();
    assert_eq!(
        outcome,
        ResolveOutcome::NeedsCorrection {
            message: "score out of range".into()
        }
    );
    assert_eq!(backend.status_fetches(), 1);
    assert_eq!(orch.current_action(), None);

    let toast = rx.recv().await.unwrap();
    assert_eq!(toast.level, NotificationLevel::Warning);
    assert_eq!(toast.action, Some(ActionKind::Resolving));

    // The same choices can be corrected and resubmitted.
    editor.set_choice_for("Description", Choice::Local).unwrap();
    let outcome = orch.submit_resolution(&editor).await.unwrap();
    assert!(matches!(outcome, ResolveOutcome::Resolved(_)));
}

#[tokio::test]
async fn test_rejected_modify_delete_resolution_stays_editable() {
    let backend = Arc::new(ScriptedBackend::with_status(merging(vec![conflict(
        "profiles/old.yml",
        &["file"],
        ConflictStatus::Unresolved,
    )])));
    let (orch, mut rx) = orchestrator(backend.clone()).await;

    backend.resolve_replies.lock().unwrap().push_back(ResolveReply {
        success: false,
        message: Some("score out of range".into()),
    });
    let mut editor = orch.open_conflict("profiles/old.yml").unwrap();
    editor.set_choice(ParameterKey::File, Choice::Incoming).unwrap();
    let outcome = orch.submit_resolution(&editor).await.unwrap();
    assert!(matches!(outcome, ResolveOutcome::NeedsCorrection { .. }));
    assert_eq!(rx.recv().await.unwrap().level, NotificationLevel::Warning);

    let reopened = orch.open_conflict("profiles/old.yml").unwrap();
    assert!(reopened.is_modify_delete());
    assert!(!reopened.is_ready());
}

#[tokio::test]
async fn test_abort_clears_modify_delete_lock() {
    let conflicted = merging(vec![conflict(
        "profiles/old.yml",
        &["file"],
        ConflictStatus::Unresolved,
    )]);
    let backend = Arc::new(ScriptedBackend::with_status(conflicted.clone()));
    let (orch, _rx) = orchestrator(backend.clone()).await;

    let mut editor = orch.open_conflict("profiles/old.yml").unwrap();
    editor.set_choice(ParameterKey::File, Choice::Incoming).unwrap();
    orch.submit_resolution(&editor).await.unwrap();
    assert!(orch.open_conflict("profiles/old.yml").is_err());

    backend.then_report(working_tree());
    orch.abort_merge().await.unwrap();
    assert!(!orch.status().is_merging);

    // The retried merge presents the same record, editable again.
    *backend.status.lock().unwrap() = conflicted;
    orch.fetch_status().await.unwrap();
    assert!(orch.open_conflict("profiles/old.yml").is_ok());
}

#[tokio::test]
async fn test_revert_variants_share_action_kind() {
    let backend = Arc::new(ScriptedBackend::with_status(working_tree()));
    let (orch, _rx) = orchestrator(backend.clone()).await;
    let changes = orch.status().outgoing_changes.clone();

    let mut selection = SelectionController::new();
    selection.select_at(&changes, 0, false);
    let report = orch.revert(&selection.snapshot(&changes)).await.unwrap();
    assert_eq!(report.action, ActionKind::Reverting);

    let report = orch.revert_file("custom_formats/b.yml").await.unwrap();
    assert_eq!(report.message, "Reverted custom_formats/b.yml");

    let report = orch.revert_all().await.unwrap();
    assert_eq!(report.action, ActionKind::Reverting);

    assert_eq!(
        &backend.calls()[1..],
        &[
            "revert:custom_formats/a.yml",
            "get_status",
            "revert_file:custom_formats/b.yml",
            "get_status",
            "revert_all",
            "get_status"
        ]
    );
}

#[tokio::test]
async fn test_fetch_status_publishes_to_subscribers() {
    let backend = Arc::new(ScriptedBackend::with_status(GitStatus::default()));
    let orch = SyncOrchestrator::new(backend.clone(), Notifier::default());
    let mut statuses = orch.subscribe_status();

    *backend.status.lock().unwrap() = working_tree();
    orch.fetch_status().await.unwrap();

    assert!(statuses.has_changed().unwrap());
    let latest = statuses.borrow_and_update().clone();
    assert_eq!(latest.branch, "main");
    assert_eq!(latest.outgoing_staged().count(), 1);
    assert_eq!(latest.outgoing_unstaged().count(), 2);
}
