//! Pointer and modifier-key state shared by the rows of a change list.
//!
//! The page owns one [`PointerContext`]. Rows report pointer-enter/leave and
//! clicks; the page's keyboard handler reports the range modifier. Because
//! the hovered row is tracked explicitly, a modifier press can start a
//! preview without the pointer moving.

use crate::models::Change;
use crate::selection::controller::{SelectionChange, SelectionController};

/// Last known pointer coordinates, in page space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PointerContext {
    position: Option<PointerPosition>,
    hovered_index: Option<usize>,
    range_modifier_held: bool,
}

impl PointerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Option<PointerPosition> {
        self.position
    }

    pub fn hovered_index(&self) -> Option<usize> {
        self.hovered_index
    }

    pub fn range_modifier_held(&self) -> bool {
        self.range_modifier_held
    }

    pub fn on_pointer_move(&mut self, x: f64, y: f64) {
        self.position = Some(PointerPosition { x, y });
    }

    pub fn on_pointer_enter(
        &mut self,
        index: usize,
        selection: &mut SelectionController,
        changes: &[Change],
    ) {
        self.hovered_index = Some(index);
        selection.hover(changes, index, self.range_modifier_held);
    }

    /// Only clears the hovered row if `index` is still the one recorded;
    /// enter events for the next row may arrive before this leave.
    pub fn on_pointer_leave(&mut self, index: usize) {
        if self.hovered_index == Some(index) {
            self.hovered_index = None;
        }
    }

    pub fn on_modifier_down(&mut self, selection: &mut SelectionController, changes: &[Change]) {
        self.range_modifier_held = true;
        if let Some(index) = self.hovered_index {
            selection.hover(changes, index, true);
        }
    }

    pub fn on_modifier_up(&mut self, selection: &mut SelectionController) {
        self.range_modifier_held = false;
        selection.release_modifier();
    }

    /// A click on row `index`; a range gesture when the modifier is held.
    pub fn on_click(
        &mut self,
        index: usize,
        selection: &mut SelectionController,
        changes: &[Change],
    ) -> SelectionChange {
        self.hovered_index = Some(index);
        selection.select_at(changes, index, self.range_modifier_held)
    }
}
