//! Merge conflict listing and resolution.

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use gitdeck_core::conflict::{Choice, ParameterKey, ResolutionEditor};
use gitdeck_core::models::ConflictRecord;
use gitdeck_core::orchestrator::{ActionKind, ResolveOutcome, SyncOrchestrator};

use crate::actions::{print_report, with_spinner};
use crate::style;

/// Parse `param=local|incoming`.
pub fn parse_choice(s: &str) -> std::result::Result<(String, Choice), String> {
    let (param, choice) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected <param>=<local|incoming>, got '{s}'"))?;
    let param = param.trim();
    if param.is_empty() {
        return Err(format!("missing parameter name in '{s}'"));
    }
    Ok((param.to_string(), choice.trim().parse()?))
}

pub fn list(orch: &SyncOrchestrator, file: Option<&str>) -> Result<()> {
    let status = orch.status();
    if !status.is_merging {
        println!("{}", style::dim("No merge in progress."));
        return Ok(());
    }

    if let Some(path) = file {
        let record = status
            .conflict(path)
            .with_context(|| format!("no merge conflict for '{path}'"))?;
        print_record(record, orch.open_conflict(path).ok().as_ref());
        return Ok(());
    }

    if status.merge_conflicts.is_empty() {
        println!("{}", style::success("No conflicts. Run 'gitdeck finalize' to finish the merge."));
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["File", "Name", "Type", "Status", "Parameters"]);
    for record in &status.merge_conflicts {
        let params = if record.is_modify_delete() {
            "modified on one side, deleted on the other".to_string()
        } else {
            record
                .conflicting_parameters
                .iter()
                .map(|p| p.parameter.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        table.add_row(vec![
            Cell::new(&record.file_path),
            Cell::new(&record.display_name),
            Cell::new(record.entity_type.to_string()),
            style::conflict_cell(record.status),
            Cell::new(params),
        ]);
    }
    println!("{table}");
    println!();
    println!(
        "{} of {} conflict(s) unresolved",
        status.unresolved_conflicts().count(),
        status.merge_conflicts.len()
    );
    Ok(())
}

fn print_record(record: &ConflictRecord, editor: Option<&ResolutionEditor>) {
    println!();
    println!("{}", style::header(&record.display_name));
    println!("  File   : {}", record.file_path);
    println!("  Type   : {}", record.entity_type);
    println!("  Status : {}", record.status);
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Parameter", "Key", "Local", "Incoming", "Chosen"]);
    for param in &record.conflicting_parameters {
        let key = ParameterKey::from_parameter(&param.parameter);
        let chosen = editor
            .and_then(|e| e.choice(&key))
            .map(|c| c.to_string())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(&param.parameter),
            Cell::new(key.wire_key()),
            Cell::new(param.local_value.to_string()),
            Cell::new(param.incoming_value.to_string()),
            Cell::new(chosen),
        ]);
    }
    println!("{table}");
    if editor.is_none() && record.is_modify_delete() {
        println!(
            "  {}",
            style::dim("Resolved modify/delete conflicts are locked. Abort the merge to change it.")
        );
    }
}

/// Match a user-supplied name against the record's keys, by label first
/// and then by wire key.
fn find_key(editor: &ResolutionEditor, name: &str) -> Option<ParameterKey> {
    let by_label = ParameterKey::from_parameter(name);
    let by_wire = ParameterKey::from_wire(name);
    editor
        .keys()
        .find(|k| **k == by_label || **k == by_wire)
        .cloned()
}

pub async fn resolve(
    orch: &SyncOrchestrator,
    file: &str,
    choices: &[(String, Choice)],
    all: Option<Choice>,
) -> Result<()> {
    let mut editor = orch
        .open_conflict(file)
        .with_context(|| format!("cannot edit conflict for '{file}'"))?;

    if let Some(choice) = all {
        let keys: Vec<ParameterKey> = editor.keys().cloned().collect();
        for key in keys {
            editor.set_choice(key, choice)?;
        }
    }
    for (name, choice) in choices {
        let Some(key) = find_key(&editor, name) else {
            let known: Vec<String> = editor.keys().map(|k| k.wire_key()).collect();
            bail!(
                "'{name}' is not a conflicting parameter of '{file}' (expected one of: {})",
                known.join(", ")
            );
        };
        editor.set_choice(key, *choice)?;
    }

    if let Err(e) = orch.can_resolve(&editor) {
        print_record(editor.record(), Some(&editor));
        bail!("{e}");
    }

    let outcome = with_spinner(ActionKind::Resolving, orch.submit_resolution(&editor))
        .await
        .context("resolve failed")?;
    match outcome {
        ResolveOutcome::Resolved(report) => {
            print_report(&report);
            let remaining = orch.status().unresolved_conflicts().count();
            if remaining == 0 {
                println!("  {}", style::dim("All conflicts resolved. Run 'gitdeck finalize'."));
            } else {
                println!("  {}", style::dim(&format!("{remaining} conflict(s) left.")));
            }
            Ok(())
        }
        ResolveOutcome::NeedsCorrection { message } => {
            bail!("the backend did not accept these choices: {message}")
        }
    }
}

pub async fn finalize(orch: &SyncOrchestrator) -> Result<()> {
    let report = with_spinner(ActionKind::Finalizing, orch.finalize_merge())
        .await
        .context("finalize failed")?;
    print_report(&report);
    Ok(())
}

pub async fn abort(orch: &SyncOrchestrator) -> Result<()> {
    let report = with_spinner(ActionKind::Aborting, orch.abort_merge())
        .await
        .context("abort failed")?;
    print_report(&report);
    Ok(())
}
