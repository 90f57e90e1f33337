//! `use_state` and the render context behind it.
//!
//! While a function component renders, the scheduler pushes a render frame
//! onto a thread-local stack. Hook calls read that frame to find the hook
//! store and the instance being rendered, the same way primitives read the
//! current parent from a context stack.
//!
//! # Example
//!
//! ```ignore
//! use spark_fiber::{use_state, create_element, Component, Props, Callback};
//!
//! let counter = Component::new("Counter", |_props| {
//!     let (count, set_count) = use_state(0i64);
//!     let on_click = Callback::new(move |_| set_count.update(|c| c + 1));
//!     create_element("button", Props::new().with("onclick", on_click), [count])
//! });
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use spark_signals::{signal, Signal};

use crate::config::{step_trace, TraceSteps};
use crate::element::{Component, Element};
use crate::error::{FiberError, Result};
use crate::types::Props;
use super::store::{HookStore, InstanceKey, Slot};

// =============================================================================
// Flush Trigger
// =============================================================================

/// Something that can run a full-tree flush on request.
pub(crate) trait FlushTrigger {
    fn request_flush(&self);
}

struct NoTrigger;

impl FlushTrigger for NoTrigger {
    fn request_flush(&self) {}
}

// =============================================================================
// Render Context Stack
// =============================================================================

struct RenderFrame {
    store: Rc<RefCell<HookStore>>,
    key: InstanceKey,
    trigger: Weak<dyn FlushTrigger>,
    trace: TraceSteps,
    violation: Option<FiberError>,
}

thread_local! {
    static RENDER_STACK: RefCell<Vec<RenderFrame>> = const { RefCell::new(Vec::new()) };
}

/// Whether a function component is currently rendering on this thread.
pub fn is_rendering() -> bool {
    RENDER_STACK.with(|stack| !stack.borrow().is_empty())
}

/// Pops the frame even if the component panics.
struct FrameGuard;

impl Drop for FrameGuard {
    fn drop(&mut self) {
        RENDER_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

// =============================================================================
// Hook Runtime
// =============================================================================

/// Everything a reconciler needs to render components with hooks.
#[derive(Clone)]
pub struct HookRuntime {
    store: Rc<RefCell<HookStore>>,
    trigger: Weak<dyn FlushTrigger>,
    generation: u64,
    trace: TraceSteps,
}

impl HookRuntime {
    pub(crate) fn new(store: Rc<RefCell<HookStore>>, trigger: Weak<dyn FlushTrigger>, generation: u64, trace: TraceSteps) -> Self {
        Self {
            store,
            trigger,
            generation,
            trace,
        }
    }

    /// A runtime whose setters update state but never schedule a flush.
    pub fn detached(store: Rc<RefCell<HookStore>>) -> Self {
        let trigger: Weak<dyn FlushTrigger> = Weak::<NoTrigger>::new();
        Self::new(store, trigger, 1, TraceSteps::empty())
    }

    pub fn store(&self) -> &Rc<RefCell<HookStore>> {
        &self.store
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Render `component` as the instance at `key`.
    pub fn render_component(&self, key: &InstanceKey, component: &Component, props: &Props) -> Result<Element> {
        self.store
            .borrow_mut()
            .begin_render(key, component.id(), component.name(), self.generation);

        RENDER_STACK.with(|stack| {
            stack.borrow_mut().push(RenderFrame {
                store: self.store.clone(),
                key: key.clone(),
                trigger: self.trigger.clone(),
                trace: self.trace,
                violation: None,
            })
        });
        let guard = FrameGuard;
        let output = component.render(props);
        let violation = RENDER_STACK.with(|stack| {
            stack
                .borrow_mut()
                .last_mut()
                .and_then(|frame| frame.violation.take())
        });
        drop(guard);

        if let Some(err) = violation {
            return Err(err);
        }
        let output = output?;
        self.store.borrow_mut().end_render(key)?;
        Ok(output)
    }
}

// =============================================================================
// Setter
// =============================================================================

/// A state update: a new value or a function of the previous one.
pub enum StateUpdate<T> {
    Replace(T),
    Update(Box<dyn FnOnce(&T) -> T>),
}

impl<T> StateUpdate<T> {
    pub fn update(f: impl FnOnce(&T) -> T + 'static) -> Self {
        StateUpdate::Update(Box::new(f))
    }
}

impl<T> From<T> for StateUpdate<T> {
    fn from(value: T) -> Self {
        StateUpdate::Replace(value)
    }
}

/// Setter returned by [`use_state`].
///
/// Writing commits the value into the hook box and then requests a
/// full-tree flush from the scheduler that rendered the component.
pub struct SetState<T: Clone + PartialEq + 'static> {
    cell: Signal<T>,
    trigger: Weak<dyn FlushTrigger>,
    trace: TraceSteps,
}

impl<T: Clone + PartialEq + 'static> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            trigger: self.trigger.clone(),
            trace: self.trace,
        }
    }
}

impl<T: Clone + PartialEq + 'static> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SetState(..)")
    }
}

impl<T: Clone + PartialEq + 'static> SetState<T> {
    /// Replace the value.
    pub fn set(&self, value: T) {
        self.apply(StateUpdate::Replace(value));
    }

    /// Derive the value from the previous one.
    pub fn update(&self, f: impl FnOnce(&T) -> T + 'static) {
        self.apply(StateUpdate::update(f));
    }

    pub fn apply(&self, update: StateUpdate<T>) {
        let next = match update {
            StateUpdate::Replace(value) => value,
            StateUpdate::Update(f) => f(&self.cell.get()),
        };
        self.cell.set(next);
        step_trace!(self.trace, TraceSteps::USE_STATE, "state updated, requesting flush");

        match self.trigger.upgrade() {
            Some(trigger) => trigger.request_flush(),
            None => tracing::warn!("state updated after its scheduler was dropped, no re-render"),
        }
    }

    /// Current value in the box.
    pub fn get(&self) -> T {
        self.cell.get()
    }
}

// =============================================================================
// use_state
// =============================================================================

/// Declare a state cell for the rendering component.
///
/// Returns the current value and its setter. Must be called
/// unconditionally and in the same order on every render.
///
/// # Errors
///
/// - [`FiberError::HookOutsideRender`] when no component is rendering.
/// - [`FiberError::HookOrder`] when this render calls more hooks than the
///   first one did.
/// - [`FiberError::HookTypeMismatch`] when the box at this position holds
///   another type.
pub fn try_use_state<T: Clone + PartialEq + 'static>(initial: T) -> Result<(T, SetState<T>)> {
    RENDER_STACK.with(|stack| {
        let stack = stack.borrow();
        let frame = stack.last().ok_or(FiberError::HookOutsideRender)?;
        let mut store = frame.store.borrow_mut();

        let found = match store.next_slot(&frame.key)? {
            Slot::Mount(boxes) => {
                let cell = signal(initial);
                boxes.push(Box::new(cell.clone()));
                step_trace!(frame.trace, TraceSteps::USE_STATE, instance = %frame.key, index = boxes.len() - 1, "registered hook");
                Ok(cell)
            }
            Slot::Existing(any, index) => any.downcast_ref::<Signal<T>>().cloned().ok_or(index),
        };
        let cell: Signal<T> = match found {
            Ok(cell) => cell,
            Err(index) => {
                return Err(FiberError::HookTypeMismatch {
                    instance: store.describe(&frame.key),
                    index,
                });
            }
        };

        let setter = SetState {
            cell: cell.clone(),
            trigger: frame.trigger.clone(),
            trace: frame.trace,
        };
        Ok((cell.get(), setter))
    })
}

/// Declare a state cell for the rendering component.
///
/// Hook-order violations are recorded on the render and abort the flush
/// once the component returns; the call itself hands back `initial` with
/// a setter that does nothing.
///
/// # Panics
///
/// Panics when called while no function component is rendering.
pub fn use_state<T: Clone + PartialEq + 'static>(initial: T) -> (T, SetState<T>) {
    match try_use_state(initial.clone()) {
        Ok(pair) => pair,
        Err(FiberError::HookOutsideRender) => {
            panic!("use_state called outside of a function component render")
        }
        Err(err) => {
            RENDER_STACK.with(|stack| {
                if let Some(frame) = stack.borrow_mut().last_mut() {
                    frame.violation.get_or_insert(err);
                }
            });
            let setter = SetState {
                cell: signal(initial.clone()),
                trigger: Weak::<NoTrigger>::new(),
                trace: TraceSteps::empty(),
            };
            (initial, setter)
        }
    }
}
