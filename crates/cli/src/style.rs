//! Terminal styling for gitdeck output.

use console::Style;

use gitdeck_core::models::{ChangeStatus, ConflictStatus};
use gitdeck_core::notify::NotificationLevel;

fn marked(mark: &str, style: Style, msg: &str) -> String {
    format!("{} {}", style.apply_to(mark), msg)
}

pub fn success(msg: &str) -> String {
    marked("✓", Style::new().green(), msg)
}

pub fn error(msg: &str) -> String {
    marked("✗", Style::new().red(), msg)
}

pub fn warn(msg: &str) -> String {
    marked("⚠", Style::new().yellow(), msg)
}

/// Report line for an action outcome.
pub fn level(level: NotificationLevel, msg: &str) -> String {
    match level {
        NotificationLevel::Success => success(msg),
        NotificationLevel::Warning => warn(msg),
        NotificationLevel::Error => error(msg),
    }
}

pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

/// Hints and empty-state lines.
pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

pub fn change_color(status: ChangeStatus) -> comfy_table::Color {
    match status {
        ChangeStatus::Untracked | ChangeStatus::StagedNew => comfy_table::Color::Green,
        ChangeStatus::Deleted | ChangeStatus::DeletedStaged => comfy_table::Color::Red,
        ChangeStatus::Renamed => comfy_table::Color::Blue,
        ChangeStatus::Modified | ChangeStatus::StagedModified => comfy_table::Color::Yellow,
    }
}

pub fn conflict_cell(status: ConflictStatus) -> comfy_table::Cell {
    match status {
        ConflictStatus::Resolved => comfy_table::Cell::new("✓ resolved").fg(comfy_table::Color::Green),
        ConflictStatus::Unresolved => {
            comfy_table::Cell::new("✗ unresolved").fg(comfy_table::Color::Red)
        }
    }
}

/// Merge indicator: in progress (yellow dot).
pub fn merging() -> String {
    let style = Style::new().yellow();
    format!("{} Merge in progress", style.apply_to("●"))
}

/// Merge indicator: clean (dim dot).
pub fn not_merging() -> String {
    let style = Style::new().dim();
    format!("{} No merge in progress", style.apply_to("○"))
}
