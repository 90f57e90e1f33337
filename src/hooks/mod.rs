//! Hooks - per-instance state for function components.
//!
//! - [`store`] - Positional hook boxes keyed by component instance
//! - [`state`] - `use_state`, setters and the render context stack

pub mod state;
pub mod store;

pub use state::{is_rendering, try_use_state, use_state, HookRuntime, SetState, StateUpdate};
pub(crate) use state::FlushTrigger;
pub use store::{HookStore, InstanceKey};
