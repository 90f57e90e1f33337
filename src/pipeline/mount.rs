//! Mount API - terminal render effect for a scheduler.
//!
//! Installs one reactive effect that reads the scheduler's commit counter
//! and redraws the committed host tree. Every commit bumps the counter,
//! so the terminal follows the visible tree without polling.
//!
//! # Example
//!
//! ```ignore
//! use spark_fiber::{create_element, MemoryHost, Props, Scheduler};
//! use spark_fiber::pipeline::mount_terminal;
//!
//! let host = MemoryHost::new();
//! let container = host.create_container("root");
//! let scheduler = Scheduler::new(host);
//!
//! let handle = mount_terminal(&scheduler, std::io::stdout());
//! scheduler.render(create_element("p", Props::new(), ["hello"]), container)?;
//!
//! handle.unmount();
//! ```

use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;

use spark_signals::effect;

use crate::host::MemoryHost;
use crate::renderer::TerminalRenderer;
use crate::scheduler::Scheduler;

// =============================================================================
// Mount Handle
// =============================================================================

/// Handle returned by [`mount_terminal`]. Dropping it stops the effect.
pub struct MountHandle {
    stop_effect: Option<Box<dyn FnOnce()>>,
    frames: Rc<Cell<usize>>,
}

impl MountHandle {
    /// Stop the render effect.
    pub fn unmount(mut self) {
        if let Some(stop) = self.stop_effect.take() {
            stop();
        }
    }

    /// Frames drawn so far.
    pub fn frames(&self) -> usize {
        self.frames.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.stop_effect.is_some()
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.stop_effect.take() {
            stop();
        }
    }
}

// =============================================================================
// Mount Function
// =============================================================================

/// Redraw the scheduler's container to `out` after every commit.
///
/// The effect runs once right away; nothing is drawn until a tree has
/// been mounted. Write failures are logged and the frame is skipped.
pub fn mount_terminal<W: Write + 'static>(scheduler: &Scheduler<MemoryHost>, out: W) -> MountHandle {
    let frames = Rc::new(Cell::new(0));
    let frames_clone = frames.clone();
    let commits = scheduler.commits();
    let scheduler = scheduler.clone();
    let mut renderer = TerminalRenderer::new(out);

    let stop_fn = effect(move || {
        // Read the counter (creates dependency)
        let committed = commits.get();
        if committed == 0 {
            return;
        }
        let Some(container) = scheduler.container() else {
            return;
        };
        match renderer.render(&container) {
            Ok(()) => frames_clone.set(frames_clone.get() + 1),
            Err(err) => tracing::warn!(error = %err, commit = committed, "terminal redraw failed"),
        }
    });

    MountHandle {
        stop_effect: Some(Box::new(stop_fn)),
        frames,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io;

    use crate::element::{create_element, leaf, Component};
    use crate::hooks::use_state;
    use crate::types::{Callback, Props};

    /// Writer appending into a shared buffer.
    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_redraws_after_each_commit() {
        let host = MemoryHost::new();
        let container = host.create_container("root");
        let scheduler = Scheduler::new(host);
        let out = Shared::default();

        let handle = mount_terminal(&scheduler, out.clone());
        assert_eq!(handle.frames(), 0);

        let counter = Component::new("Counter", |_| {
            let (count, set_count) = use_state(0i64);
            let on_click = Callback::new(move |_| set_count.update(|c| c + 1));
            create_element("button", Props::new().with("onclick", on_click), [count])
        });
        scheduler.render(leaf(&counter, Props::new()), container.clone()).unwrap();
        assert_eq!(handle.frames(), 1);

        container.find("button").unwrap().dispatch("onclick");
        assert_eq!(handle.frames(), 2);

        let text = String::from_utf8_lossy(&out.0.borrow()).into_owned();
        assert!(text.contains('0'));
        assert!(text.contains('1'));
        handle.unmount();
    }

    #[test]
    fn test_unmount_stops_redraws() {
        let host = MemoryHost::new();
        let container = host.create_container("root");
        let scheduler = Scheduler::new(host);

        let handle = mount_terminal(&scheduler, Shared::default());
        scheduler
            .render(create_element("p", Props::new(), ["a"]), container.clone())
            .unwrap();
        let frames = handle.frames.clone();
        handle.unmount();

        scheduler.flush_sync().unwrap();
        assert_eq!(frames.get(), 1);
    }
}
