//! Reactive output pipeline.
//!
//! ```text
//! Scheduler commit ──▶ commits signal ──▶ render effect ──▶ TerminalRenderer
//! ```
//!
//! The scheduler only bumps a counter; drawing happens in the one effect
//! installed by [`mount_terminal`].

pub mod mount;

pub use mount::{mount_terminal, MountHandle};
