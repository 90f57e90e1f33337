//! Host backends.
//!
//! - [`backend`] - The capability trait the scheduler is built on
//! - [`memory`] - An in-memory, DOM-like node tree

pub mod backend;
pub mod memory;

pub use backend::HostBackend;
pub use memory::{HostNode, MemoryHost, NodeKind};
