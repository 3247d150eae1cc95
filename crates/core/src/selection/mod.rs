//! Selection of outgoing changes.
//!
//! 1. **Controller** -- point and range selection constrained to one staging
//!    class, plus the hover preview shown during a range gesture.
//! 2. **Pointer** -- page-owned pointer and modifier state that feeds the
//!    controller's hover handling.

pub mod controller;
pub mod pointer;

pub use controller::{Selection, SelectionChange, SelectionController};
pub use pointer::{PointerContext, PointerPosition};
