//! Host backend capability.
//!
//! The scheduler never touches platform nodes directly. It is handed a
//! backend at construction and goes through these four operations:
//!
//! ```text
//! complete fiber ──▶ create_host_node
//! commit         ──▶ stage_root ─▶ append_child × N ─▶ commit_tree
//! ```
//!
//! `create_host_node` is the host-element factory; `commit_tree` is the
//! mutator that performs the final splice into the visible root.

use std::fmt;

use crate::error::Result;
use crate::fiber::Fiber;

/// A platform the fiber tree can be materialized into.
pub trait HostBackend {
    /// Opaque handle to a platform node.
    type Node: Clone + fmt::Debug;

    /// Translate a host or text fiber into a detached platform node with
    /// its props assigned.
    fn create_host_node(&mut self, fiber: &Fiber<Self::Node>) -> Result<Self::Node>;

    /// A detached, childless copy of the real root to build into.
    fn stage_root(&mut self, root: &Self::Node) -> Result<Self::Node>;

    /// Append `child` as the last child of `parent`.
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<()>;

    /// Replace the children of `root` with the children of `staged` in one
    /// step.
    fn commit_tree(&mut self, root: &Self::Node, staged: &Self::Node) -> Result<()>;
}
