//! Status display and the stage/commit/revert/pull/push actions.

use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};

use gitdeck_core::models::{Change, GitStatus};
use gitdeck_core::orchestrator::{ActionKind, ActionReport, SyncOrchestrator};
use gitdeck_core::selection::{Selection, SelectionChange, SelectionController};

use crate::style;

/// Run `fut` behind a spinner labelled with the action.
pub async fn with_spinner<T>(action: ActionKind, fut: impl Future<Output = T>) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        spinner.set_style(
            template.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
    }
    spinner.set_message(format!("{action}..."));
    spinner.enable_steady_tick(Duration::from_millis(80));
    let out = fut.await;
    spinner.finish_and_clear();
    out
}

pub fn print_report(report: &ActionReport) {
    println!("{}", style::level(report.level, &report.message));
}

/// Select `paths` through the controller, the same way a sequence of
/// clicks would.
pub fn select(changes: &[Change], paths: &[String]) -> Result<Selection> {
    let mut selection = SelectionController::new();
    for path in paths {
        match selection.select_path(changes, path, false) {
            SelectionChange::Selected(_) | SelectionChange::Deselected(_) => {}
            SelectionChange::Extended(_) => {}
            SelectionChange::Rejected => {
                let class = selection
                    .selection_class()
                    .map(|c| c.to_string())
                    .unwrap_or_default();
                bail!("'{path}' cannot be selected together with {class} changes");
            }
            SelectionChange::OutOfRange => bail!("no outgoing change at '{path}'"),
        }
    }
    Ok(selection.snapshot(changes))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

pub fn print_status(status: &GitStatus) {
    println!();
    println!("{}", style::header(&format!("Branch {}", status.branch)));
    println!("{}", "═".repeat(7 + status.branch.len()));
    println!();
    println!(
        "  {}",
        if status.is_merging {
            style::merging()
        } else {
            style::not_merging()
        }
    );
    if status.has_unpushed_commits {
        println!(
            "  {}",
            style::warn(&format!(
                "Unpushed commits touching {} file(s)",
                status.unpushed_files.len()
            ))
        );
    }
    println!();

    if status.outgoing_changes.is_empty() {
        println!("  {}", style::dim("Working tree clean."));
    } else {
        println!("  {}", style::header("Outgoing"));
        println!("{}", change_table(&status.outgoing_changes));
    }

    if !status.incoming_changes.is_empty() {
        println!();
        println!("  {}", style::header("Incoming"));
        println!("{}", change_table(&status.incoming_changes));
    }

    let unresolved = status.unresolved_conflicts().count();
    if !status.merge_conflicts.is_empty() {
        println!();
        println!(
            "  {}",
            style::warn(&format!(
                "{} of {} conflict(s) unresolved. Run 'gitdeck conflicts' for details.",
                unresolved,
                status.merge_conflicts.len()
            ))
        );
    }
    println!();
}

fn change_table(changes: &[Change]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Path", "Name", "Type", "Status", "Staged"]);

    for change in changes {
        let name = if change.name_changed() {
            let from = change
                .prior_name
                .as_deref()
                .or(change.incoming_name.as_deref())
                .unwrap_or_default();
            format!("{} (was {})", change.display_name, from)
        } else {
            change.display_name.clone()
        };
        let staged = match (change.staged, change.is_dirty_staged()) {
            (true, true) => "yes, with edits",
            (true, false) => "yes",
            (false, _) => "no",
        };
        table.add_row(vec![
            Cell::new(&change.file_path),
            Cell::new(name),
            Cell::new(change.entity_type.to_string()),
            Cell::new(change.status.to_string()).fg(style::change_color(change.status)),
            Cell::new(staged),
        ]);
    }
    table
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

pub async fn stage(orch: &SyncOrchestrator, paths: &[String]) -> Result<()> {
    let selection = select(&orch.status().outgoing_changes, paths)?;
    let report = with_spinner(ActionKind::Staging, orch.stage(&selection))
        .await
        .context("stage failed")?;
    print_report(&report);
    Ok(())
}

pub async fn unstage(orch: &SyncOrchestrator, paths: &[String]) -> Result<()> {
    let selection = select(&orch.status().outgoing_changes, paths)?;
    let report = with_spinner(ActionKind::Unstaging, orch.unstage(&selection))
        .await
        .context("unstage failed")?;
    print_report(&report);
    Ok(())
}

pub async fn commit(orch: &SyncOrchestrator, paths: &[String], message: &str) -> Result<()> {
    let changes = orch.status().outgoing_changes.clone();
    let selection = if paths.is_empty() {
        // Default to everything staged.
        let staged: Vec<String> = orch
            .status()
            .outgoing_staged()
            .map(|c| c.file_path.clone())
            .collect();
        select(&changes, &staged)?
    } else {
        select(&changes, paths)?
    };
    let report = with_spinner(ActionKind::Committing, orch.commit(&selection, message))
        .await
        .context("commit failed")?;
    print_report(&report);
    Ok(())
}

pub async fn revert(orch: &SyncOrchestrator, paths: &[String], all: bool) -> Result<()> {
    let report = if all {
        with_spinner(ActionKind::Reverting, orch.revert_all()).await
    } else if let [path] = paths {
        with_spinner(ActionKind::Reverting, orch.revert_file(path)).await
    } else {
        let selection = select(&orch.status().outgoing_changes, paths)?;
        with_spinner(ActionKind::Reverting, orch.revert(&selection)).await
    }
    .context("revert failed")?;
    print_report(&report);
    Ok(())
}

pub async fn pull(orch: &SyncOrchestrator) -> Result<()> {
    let report = with_spinner(ActionKind::Pulling, orch.pull())
        .await
        .context("pull failed")?;
    print_report(&report);
    if orch.status().is_merging {
        println!(
            "  {}",
            style::dim("Resolve with 'gitdeck conflicts' and 'gitdeck resolve'.")
        );
    }
    Ok(())
}

pub async fn push(orch: &SyncOrchestrator) -> Result<()> {
    let report = with_spinner(ActionKind::Pushing, orch.push())
        .await
        .context("push failed")?;
    print_report(&report);
    Ok(())
}
