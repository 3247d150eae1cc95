//! Point and range selection over the outgoing change list.
//!
//! The controller never holds the change list itself; every operation takes
//! the current slice. After a refresh the caller is expected to
//! [`clear`](SelectionController::clear) it.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::models::{Change, SelectionClass};

/// What a selection gesture did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    /// A single item was added.
    Selected(String),
    /// A single item was removed.
    Deselected(String),
    /// A range extension added these paths (possibly none).
    Extended(Vec<String>),
    /// The item belongs to the other staging class.
    Rejected,
    /// The index does not address an item in the list.
    OutOfRange,
}

/// An immutable copy of the selection, handed to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Selected paths in list order.
    pub paths: Vec<String>,
    pub class: Option<SelectionClass>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }
}

/// Selection state for the outgoing change list.
#[derive(Debug, Default, Clone)]
pub struct SelectionController {
    selected: HashSet<String>,
    selection_class: Option<SelectionClass>,
    anchor_index: Option<usize>,
    preview: HashSet<String>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Gestures
    // -----------------------------------------------------------------------

    /// Click on the row at `index`.
    ///
    /// A plain click toggles the row and moves the anchor to it. A range
    /// click unions every row between the anchor and `index` (inclusive)
    /// that matches the current class, leaving the anchor where it is.
    /// Without an anchor a range click behaves like a plain click.
    pub fn select_at(
        &mut self,
        changes: &[Change],
        index: usize,
        is_range_gesture: bool,
    ) -> SelectionChange {
        let Some(item) = changes.get(index) else {
            return SelectionChange::OutOfRange;
        };

        if is_range_gesture {
            if let Some(anchor) = self.anchor_index.filter(|a| *a < changes.len()) {
                return self.extend_range(changes, anchor, index);
            }
        }

        self.toggle(item, index)
    }

    /// Pointer entered the row at `index`.
    ///
    /// While the range modifier is held, recompute the preview to the range
    /// a range click at `index` would add. Without the modifier the preview
    /// is cleared.
    pub fn hover(&mut self, changes: &[Change], index: usize, modifier_held: bool) {
        if !modifier_held || index >= changes.len() {
            self.release_modifier();
            return;
        }

        self.preview = match self.anchor_index.filter(|a| *a < changes.len()) {
            Some(anchor) => self.range_matching(changes, anchor, index),
            None => changes
                .get(index)
                .filter(|c| self.accepts(c.selection_class()))
                .map(|c| HashSet::from([c.file_path.clone()]))
                .unwrap_or_default(),
        };
    }

    /// The range modifier was released.
    pub fn release_modifier(&mut self) {
        self.preview.clear();
    }

    /// Select or toggle by path, for front ends without row indices.
    pub fn select_path(
        &mut self,
        changes: &[Change],
        file_path: &str,
        is_range_gesture: bool,
    ) -> SelectionChange {
        match changes.iter().position(|c| c.file_path == file_path) {
            Some(index) => self.select_at(changes, index, is_range_gesture),
            None => SelectionChange::OutOfRange,
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.preview.clear();
        self.anchor_index = None;
        self.selection_class = None;
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn is_selected(&self, file_path: &str) -> bool {
        self.selected.contains(file_path)
    }

    pub fn is_previewed(&self, file_path: &str) -> bool {
        self.preview.contains(file_path)
    }

    pub fn selection_class(&self) -> Option<SelectionClass> {
        self.selection_class
    }

    pub fn anchor_index(&self) -> Option<usize> {
        self.anchor_index
    }

    pub fn selected(&self) -> &HashSet<String> {
        &self.selected
    }

    pub fn preview(&self) -> &HashSet<String> {
        &self.preview
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected paths in the order they appear in `changes`.
    pub fn selected_paths(&self, changes: &[Change]) -> Vec<String> {
        changes
            .iter()
            .filter(|c| self.selected.contains(&c.file_path))
            .map(|c| c.file_path.clone())
            .collect()
    }

    pub fn snapshot(&self, changes: &[Change]) -> Selection {
        Selection {
            paths: self.selected_paths(changes),
            class: self.selection_class,
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn accepts(&self, class: SelectionClass) -> bool {
        self.selected.is_empty() || self.selection_class.map_or(true, |c| c == class)
    }

    fn toggle(&mut self, item: &Change, index: usize) -> SelectionChange {
        if self.selected.remove(&item.file_path) {
            if self.selected.is_empty() {
                self.selection_class = None;
            }
            self.anchor_index = Some(index);
            return SelectionChange::Deselected(item.file_path.clone());
        }

        let class = item.selection_class();
        if !self.accepts(class) {
            debug!(
                path = %item.file_path,
                %class,
                current = ?self.selection_class,
                "rejected selection of mixed staging class"
            );
            return SelectionChange::Rejected;
        }

        if self.selected.is_empty() {
            self.selection_class = Some(class);
        }
        self.selected.insert(item.file_path.clone());
        self.anchor_index = Some(index);
        SelectionChange::Selected(item.file_path.clone())
    }

    fn extend_range(&mut self, changes: &[Change], anchor: usize, index: usize) -> SelectionChange {
        let class = self.range_class(changes, anchor);
        let range = self.range_matching(changes, anchor, index);

        let added: Vec<String> = changes
            .iter()
            .filter(|c| range.contains(&c.file_path) && !self.selected.contains(&c.file_path))
            .map(|c| c.file_path.clone())
            .collect();

        if !added.is_empty() && self.selected.is_empty() {
            self.selection_class = Some(class);
        }
        self.selected.extend(added.iter().cloned());

        debug!(anchor, index, added = added.len(), "extended selection range");
        SelectionChange::Extended(added)
    }

    /// The class a range is filtered by: the current class, or the anchor's
    /// when nothing is selected.
    fn range_class(&self, changes: &[Change], anchor: usize) -> SelectionClass {
        match self.selection_class {
            Some(class) if !self.selected.is_empty() => class,
            _ => changes[anchor].selection_class(),
        }
    }

    fn range_matching(&self, changes: &[Change], anchor: usize, index: usize) -> HashSet<String> {
        let class = self.range_class(changes, anchor);
        let lo = anchor.min(index);
        let hi = anchor.max(index);
        changes[lo..=hi]
            .iter()
            .filter(|c| c.selection_class() == class)
            .map(|c| c.file_path.clone())
            .collect()
    }
}
