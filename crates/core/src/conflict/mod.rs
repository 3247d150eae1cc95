//! Parameter-level resolution of merge conflicts.
//!
//! The conflict subsystem is responsible for:
//! 1. **Keys** -- typed identities for conflicting parameters.
//! 2. **Editing** -- accumulating a local/incoming choice per parameter and
//!    deciding when a record is ready to submit.
//! 3. **Session** -- per-merge memory: submitted choices and modify/delete
//!    locks.

pub mod editor;
pub mod key;
pub mod session;

pub use editor::{Choice, ResolutionEditor, Resolutions};
pub use key::ParameterKey;
pub use session::MergeSession;
