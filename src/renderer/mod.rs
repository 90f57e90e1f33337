//! Renderers for committed host trees.
//!
//! - [`terminal`] - Line-oriented terminal output with text attributes

pub mod terminal;

pub use terminal::{render_to_string, Attr, TerminalRenderer};
