//! Saved state for screen suspend/resume.
//!
//! A [`SavedState`] holds named slots of string codes. It can be kept in
//! memory across a configuration change or written to a [`StateFile`] to
//! survive a process restart.

mod file;
mod saved;

pub use file::StateFile;
pub use saved::SavedState;
