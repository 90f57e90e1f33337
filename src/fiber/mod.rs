//! Fiber model, factory and reconciler.
//!
//! ```text
//! Element ──create_fiber──▶ Fiber (Created)
//!                             │ reconcile_fiber: render component, link children
//!                             ▼
//!                           Fiber (Visited) ──work loop completes──▶ Fiber (Completed)
//! ```
//!
//! - [`node`] - The `Fiber` struct, kinds, modes and flags
//! - [`tree`] - Index-addressed arena holding one flush's fibers
//! - [`create`] - Element → fiber conversion
//! - [`reconcile`] - Component re-render and child linking

pub mod create;
pub mod node;
pub mod reconcile;
pub mod tree;

pub use create::{create_fiber, create_root_fiber};
pub use node::{Fiber, FiberData, FiberFlags, FiberKind, FiberSnapshot, FiberTag, Mode};
pub use reconcile::{merge_render_props, reconcile_fiber, rerender_fiber, update_children_references};
pub use tree::{Children, FiberId, FiberTree};
