//! # spark-fiber
//!
//! Fiber reconciler, work-loop scheduler and hooks for reactive UI trees.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! state cells and commit notifications.
//!
//! ## Architecture
//!
//! A declarative [`Element`] tree is mirrored into a tree of fibers that
//! are walked one unit of work at a time, then committed into a host tree
//! in one atomic swap:
//! ```text
//! create_element → render / setter → Scheduler ─┬─ reconcile (components run, children linked)
//!                                               ├─ complete  (host nodes created)
//!                                               └─ commit    (staged root swapped in)
//! ```
//!
//! Every flush rebuilds the fibers below the root from the elements. State
//! lives in the hook store, keyed by each component's position in the
//! tree, so it survives the rebuild.
//!
//! ## Modules
//!
//! - [`element`] - Declarative tree builder
//! - [`fiber`] - Fiber model, factory and reconciler
//! - [`scheduler`] - Work loop, task queue, flush cycle
//! - [`hooks`] - `use_state` and the hook store
//! - [`commit`] - Atomic host-tree commit
//! - [`host`] - Host backend trait and the in-memory host
//! - [`renderer`] / [`pipeline`] - Terminal output driven by commits
//!
//! ## Example
//!
//! ```
//! use spark_fiber::{create_element, leaf, use_state, Callback, Component, MemoryHost, Props};
//!
//! let counter = Component::new("Counter", |_| {
//!     let (count, set_count) = use_state(0i64);
//!     let on_click = Callback::new(move |_| set_count.update(|c| c + 1));
//!     create_element("button", Props::new().with("onclick", on_click), [count])
//! });
//!
//! let host = MemoryHost::new();
//! let container = host.create_container("root");
//! let scheduler = spark_fiber::render(host, leaf(&counter, Props::new()), container.clone()).unwrap();
//!
//! container.find("button").unwrap().dispatch("onclick");
//! assert_eq!(container.text_content(), "1");
//! assert_eq!(scheduler.commit_count(), 2);
//! ```

pub mod commit;
pub mod config;
pub mod element;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod host;
pub mod pipeline;
pub mod renderer;
pub mod scheduler;
pub mod types;

// Re-export commonly used items
pub use element::{create_element, leaf, text, Component, Element, Node, Tag};
pub use error::{FiberError, Result};
pub use types::{Callback, PropValue, Props};

pub use config::{SchedulerConfig, TraceSteps};

pub use hooks::{is_rendering, try_use_state, use_state, SetState, StateUpdate};

pub use host::{HostBackend, HostNode, MemoryHost, NodeKind};

pub use scheduler::{FlushReport, Scheduler, SchedulerPhase, WorkStatus};

pub use pipeline::{mount_terminal, MountHandle};

pub use renderer::{render_to_string, Attr, TerminalRenderer};

/// Mount `element` into `container` with a new scheduler and flush it.
///
/// The scheduler is configured from the environment
/// ([`SchedulerConfig::from_env`]). Keep the returned scheduler alive for
/// as long as state setters should trigger re-renders.
#[must_use = "dropping the scheduler stops state setters from re-rendering"]
pub fn render<B: HostBackend + 'static>(backend: B, element: Element, container: B::Node) -> Result<Scheduler<B>> {
    let scheduler = Scheduler::with_config(backend, SchedulerConfig::from_env());
    scheduler.render(element, container)?;
    Ok(scheduler)
}
