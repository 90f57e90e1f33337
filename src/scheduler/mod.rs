//! Work-loop scheduler.
//!
//! A [`Scheduler`] owns everything one mounted root needs: the host
//! backend, the double-buffered fiber roots, the task queue and the hook
//! store. Flushes run through the task queue one task at a time:
//!
//! ```text
//! Idle ──render / setter──▶ Rendering ──queue of units empty──▶ Committing ──▶ Idle
//!                              ▲    │
//!                              └────┘ one UnitOfWork task per fiber
//! ```
//!
//! Only one flush is in flight. A flush requested while another runs (a
//! setter called during render, say) is recorded and starts after the
//! current commit.
//!
//! # Example
//!
//! ```ignore
//! use spark_fiber::{create_element, MemoryHost, Props, Scheduler};
//!
//! let host = MemoryHost::new();
//! let container = host.create_container("root");
//! let scheduler = Scheduler::new(host);
//! scheduler.render(create_element("div", Props::new(), ["hi"]), container.clone())?;
//! assert_eq!(container.inner_markup(), "<div>hi</div>");
//! ```

pub mod queue;
pub mod work_loop;

pub use queue::{Task, TaskQueue};
pub use work_loop::{complete_unit_of_work, perform_unit_of_work};

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use spark_signals::{signal, Signal};

use crate::commit::commit_root;
use crate::config::{step_trace, SchedulerConfig, TraceSteps};
use crate::element::Element;
use crate::error::{FiberError, Result};
use crate::fiber::{create_root_fiber, FiberId, FiberTree};
use crate::hooks::{FlushTrigger, HookRuntime, HookStore};
use crate::host::HostBackend;

// =============================================================================
// Public Types
// =============================================================================

/// Where the scheduler is in its flush cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerPhase {
    #[default]
    Idle,
    Rendering,
    Committing,
}

/// Summary of one committed flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Flush counter, starting at 1 for the first mount.
    pub generation: u64,
    pub units_of_work: usize,
    /// Fibers allocated for the flush.
    pub fibers: usize,
    /// Host nodes attached under the root.
    pub host_nodes: usize,
    /// Hook instances dropped because they did not render.
    pub pruned_instances: usize,
}

/// Outcome of driving the task queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkStatus {
    /// Ran to completion; carries the last committed flush.
    Committed(FlushReport),
    /// Stopped after `units_per_slice` units; call [`Scheduler::resume`].
    Yielded,
    /// Queued behind the flush already in flight.
    Deferred,
    /// Nothing to do.
    Idle,
}

impl WorkStatus {
    pub fn report(&self) -> Option<&FlushReport> {
        match self {
            WorkStatus::Committed(report) => Some(report),
            _ => None,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, WorkStatus::Committed(_))
    }
}

// =============================================================================
// Fiber Machine
// =============================================================================

/// Current/next pair.
#[derive(Debug)]
struct DoubleBuffer<T> {
    current: Option<T>,
    next: Option<T>,
}

impl<T> Default for DoubleBuffer<T> {
    fn default() -> Self {
        Self {
            current: None,
            next: None,
        }
    }
}

/// Control state of one mounted root.
struct FiberMachine<H> {
    root: DoubleBuffer<FiberTree<H>>,
    unit_of_work: DoubleBuffer<FiberId>,
    effect_list: Vec<FiberId>,
    mounted: Option<(Element, H)>,
    units: usize,
}

impl<H> Default for FiberMachine<H> {
    fn default() -> Self {
        Self {
            root: DoubleBuffer::default(),
            unit_of_work: DoubleBuffer::default(),
            effect_list: Vec::new(),
            mounted: None,
            units: 0,
        }
    }
}

impl<H> FiberMachine<H> {
    /// Drop all in-progress state. The committed tree stays.
    fn reset_work(&mut self) {
        self.root.next = None;
        self.unit_of_work = DoubleBuffer::default();
        self.effect_list.clear();
        self.units = 0;
    }
}

// =============================================================================
// Scheduler
// =============================================================================

struct SchedulerInner<B: HostBackend> {
    config: SchedulerConfig,
    backend: RefCell<B>,
    machine: RefCell<FiberMachine<B::Node>>,
    queue: RefCell<TaskQueue>,
    hooks: Rc<RefCell<HookStore>>,
    phase: Cell<SchedulerPhase>,
    generation: Cell<u64>,
    /// A flush was requested while the queue was draining.
    pending: Cell<bool>,
    draining: Cell<bool>,
    /// Flushes chained through `pending` since the queue was last quiet.
    chained: Cell<usize>,
    commits: Signal<u64>,
    on_error: RefCell<Option<Rc<dyn Fn(&FiberError)>>>,
    weak_self: Weak<SchedulerInner<B>>,
}

/// Clears the draining flag on every exit path.
struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Drives flushes for one mounted root.
///
/// Cloning gives another handle to the same scheduler. Setters of
/// components it rendered hold only a weak link, so dropping the last
/// handle stops re-rendering.
#[must_use = "dropping the scheduler stops state setters from re-rendering"]
pub struct Scheduler<B: HostBackend + 'static> {
    inner: Rc<SchedulerInner<B>>,
}

impl<B: HostBackend + 'static> Clone for Scheduler<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: HostBackend + 'static> Scheduler<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, SchedulerConfig::default())
    }

    pub fn with_config(backend: B, config: SchedulerConfig) -> Self {
        let inner = Rc::new_cyclic(|weak_self| SchedulerInner {
            config,
            backend: RefCell::new(backend),
            machine: RefCell::new(FiberMachine::default()),
            queue: RefCell::new(TaskQueue::new()),
            hooks: Rc::new(RefCell::new(HookStore::new())),
            phase: Cell::new(SchedulerPhase::Idle),
            generation: Cell::new(0),
            pending: Cell::new(false),
            draining: Cell::new(false),
            chained: Cell::new(0),
            commits: signal(0),
            on_error: RefCell::new(None),
            weak_self: weak_self.clone(),
        });
        Self { inner }
    }

    /// Mount `element` into `container` and flush.
    ///
    /// Mounting again replaces the previous element; hook state of
    /// instances that still render at the same positions is kept.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a component render of this scheduler.
    pub fn render(&self, element: Element, container: B::Node) -> Result<WorkStatus> {
        self.inner.machine.borrow_mut().mounted = Some((element, container));
        self.inner.schedule_flush()
    }

    /// Flush the mounted tree now.
    pub fn flush_sync(&self) -> Result<WorkStatus> {
        self.inner.schedule_flush()
    }

    /// Continue a flush that yielded.
    pub fn resume(&self) -> Result<WorkStatus> {
        if self.inner.queue.borrow().is_empty() && !self.inner.pending.get() {
            return Ok(WorkStatus::Idle);
        }
        self.inner.drain()
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.inner.phase.get()
    }

    /// Number of flushes started.
    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    /// Number of commits so far.
    pub fn commit_count(&self) -> u64 {
        self.inner.commits.get()
    }

    /// Reactive commit counter. Effects reading it re-run after each commit.
    pub fn commits(&self) -> Signal<u64> {
        self.inner.commits.clone()
    }

    /// Failure callback for flushes started by state setters.
    ///
    /// Without one, such failures are logged at `error` level.
    pub fn on_flush_error(&self, callback: impl Fn(&FiberError) + 'static) {
        *self.inner.on_error.borrow_mut() = Some(Rc::new(callback));
    }

    pub fn with_backend<R>(&self, f: impl FnOnce(&B) -> R) -> R {
        f(&self.inner.backend.borrow())
    }

    /// The mounted container handle.
    pub fn container(&self) -> Option<B::Node> {
        self.inner
            .machine
            .borrow()
            .mounted
            .as_ref()
            .map(|(_, container)| container.clone())
    }

    /// Read the last committed fiber tree.
    pub fn with_current_tree<R>(&self, f: impl FnOnce(&FiberTree<B::Node>) -> R) -> Option<R> {
        self.inner.machine.borrow().root.current.as_ref().map(f)
    }

    /// Fiber of the next unit of work while a flush is suspended.
    pub fn next_unit_of_work(&self) -> Option<FiberId> {
        self.inner.machine.borrow().unit_of_work.next
    }

    /// Live hook instances.
    pub fn hook_instances(&self) -> usize {
        self.inner.hooks.borrow().instance_count()
    }
}

impl<B: HostBackend + 'static> SchedulerInner<B> {
    fn trigger(&self) -> Weak<dyn FlushTrigger> {
        let weak: Weak<dyn FlushTrigger> = self.weak_self.clone();
        weak
    }

    /// Start a new flush, or record it if one is draining.
    ///
    /// A flush that yielded is abandoned and rebuilt from the mounted
    /// element.
    fn schedule_flush(&self) -> Result<WorkStatus> {
        if self.draining.get() {
            self.pending.set(true);
            return Ok(WorkStatus::Deferred);
        }
        if self.machine.borrow().mounted.is_none() {
            return Err(FiberError::NotMounted);
        }
        self.chained.set(0);
        {
            let mut queue = self.queue.borrow_mut();
            queue.clear();
            queue.push(Task::Flush);
        }
        self.drain()
    }

    fn drain(&self) -> Result<WorkStatus> {
        if self.draining.replace(true) {
            self.pending.set(true);
            return Ok(WorkStatus::Deferred);
        }
        let _guard = DrainGuard(&self.draining);

        let mut budget = self.config.units_per_slice;
        let mut last_report = None;
        loop {
            let task = self.queue.borrow_mut().pop();
            let Some(task) = task else {
                if self.pending.replace(false) {
                    let chained = self.chained.get() + 1;
                    if chained > self.config.max_nested_flushes {
                        let err = FiberError::FlushLimitExceeded {
                            limit: self.config.max_nested_flushes,
                        };
                        self.abort_flush(&err);
                        return Err(err);
                    }
                    self.chained.set(chained);
                    self.queue.borrow_mut().push(Task::Flush);
                    continue;
                }
                self.chained.set(0);
                return Ok(last_report.map_or(WorkStatus::Idle, WorkStatus::Committed));
            };

            let outcome = match task {
                Task::Flush => self.begin_flush(),
                Task::UnitOfWork(fiber) => {
                    if let Some(left) = budget.as_mut() {
                        if *left == 0 {
                            self.queue.borrow_mut().push_front(task);
                            step_trace!(self.config.trace, TraceSteps::WORK_LOOP, next = %fiber, "yielding");
                            return Ok(WorkStatus::Yielded);
                        }
                        *left -= 1;
                    }
                    self.step(fiber)
                }
                Task::Commit => self.commit().map(|report| last_report = Some(report)),
            };
            if let Err(err) = outcome {
                self.abort_flush(&err);
                return Err(err);
            }
        }
    }

    /// Rebuild the work-in-progress root from the mounted element.
    fn begin_flush(&self) -> Result<()> {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let mut machine = self.machine.borrow_mut();
        let (element, container) = machine.mounted.clone().ok_or(FiberError::NotMounted)?;
        machine.reset_work();

        let mut tree = FiberTree::new();
        let root = create_root_fiber(&mut tree, container, &element, self.config.trace);
        machine.root.next = Some(tree);
        machine.unit_of_work.next = Some(root);
        self.phase.set(SchedulerPhase::Rendering);
        self.queue.borrow_mut().push(Task::UnitOfWork(root));

        tracing::debug!(generation, "flush started");
        Ok(())
    }

    fn step(&self, fiber: FiberId) -> Result<()> {
        let hooks = HookRuntime::new(
            self.hooks.clone(),
            self.trigger(),
            self.generation.get(),
            self.config.trace,
        );
        let mut machine = self.machine.borrow_mut();
        let machine = &mut *machine;
        let tree = machine.root.next.as_mut().ok_or(FiberError::NotMounted)?;
        let mut backend = self.backend.borrow_mut();

        machine.unit_of_work.current = Some(fiber);
        let next = perform_unit_of_work(
            tree,
            fiber,
            &hooks,
            &mut *backend,
            &mut machine.effect_list,
            self.config.trace,
        )?;
        machine.units += 1;
        machine.unit_of_work.next = next;

        let task = match next {
            Some(next) => Task::UnitOfWork(next),
            None => Task::Commit,
        };
        self.queue.borrow_mut().push(task);
        Ok(())
    }

    fn commit(&self) -> Result<FlushReport> {
        self.phase.set(SchedulerPhase::Committing);
        let generation = self.generation.get();

        let report = {
            let mut machine = self.machine.borrow_mut();
            let tree = machine.root.next.take().ok_or(FiberError::NotMounted)?;
            let mut backend = self.backend.borrow_mut();

            let mut host_nodes = 0;
            for root in machine.effect_list.drain(..) {
                host_nodes += commit_root(&mut *backend, &tree, root, self.config.trace)?;
            }

            let pruned_instances = self.hooks.borrow_mut().retain_rendered(generation);
            let report = FlushReport {
                generation,
                units_of_work: machine.units,
                fibers: tree.len(),
                host_nodes,
                pruned_instances,
            };
            machine.root.current = Some(tree);
            machine.reset_work();
            report
        };

        self.phase.set(SchedulerPhase::Idle);
        tracing::debug!(
            generation,
            units = report.units_of_work,
            host_nodes = report.host_nodes,
            "flush committed"
        );
        // Effects on the counter may read the scheduler; every borrow is
        // released by now.
        self.commits.set(self.commits.get() + 1);
        Ok(report)
    }

    fn abort_flush(&self, err: &FiberError) {
        self.machine.borrow_mut().reset_work();
        self.queue.borrow_mut().clear();
        self.pending.set(false);
        self.chained.set(0);
        self.phase.set(SchedulerPhase::Idle);
        tracing::debug!(generation = self.generation.get(), error = %err, "flush aborted");
    }

    fn report_error(&self, err: &FiberError) {
        let callback = self.on_error.borrow().clone();
        match callback {
            Some(callback) => callback(err),
            None => tracing::error!(error = %err, "flush failed"),
        }
    }
}

impl<B: HostBackend + 'static> FlushTrigger for SchedulerInner<B> {
    fn request_flush(&self) {
        if let Err(err) = self.schedule_flush() {
            self.report_error(&err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{create_element, leaf, Component, Node};
    use crate::hooks::use_state;
    use crate::host::{HostNode, MemoryHost};
    use crate::types::{Callback, Props};

    fn mount(app: Element) -> (Scheduler<MemoryHost>, HostNode) {
        let host = MemoryHost::new();
        let container = host.create_container("root");
        let scheduler = Scheduler::new(host);
        scheduler.render(app, container.clone()).unwrap();
        (scheduler, container)
    }

    fn counter(step: i64, initial: i64) -> Component {
        Component::new("Counter", move |_| {
            let (count, set_count) = use_state(initial);
            let on_click = Callback::new(move |_| set_count.update(move |c| c + step));
            create_element("button", Props::new().with("onclick", on_click), [count])
        })
    }

    type PhaseReader = Rc<RefCell<Option<Box<dyn Fn() -> SchedulerPhase>>>>;

    /// Memory host that samples the scheduler phase on every splice.
    struct PhaseRecorder {
        host: MemoryHost,
        read_phase: PhaseReader,
        at_commit: Rc<RefCell<Vec<SchedulerPhase>>>,
    }

    impl HostBackend for PhaseRecorder {
        type Node = HostNode;

        fn create_host_node(&mut self, fiber: &crate::fiber::Fiber<HostNode>) -> Result<HostNode> {
            self.host.create_host_node(fiber)
        }

        fn stage_root(&mut self, root: &HostNode) -> Result<HostNode> {
            self.host.stage_root(root)
        }

        fn append_child(&mut self, parent: &HostNode, child: &HostNode) -> Result<()> {
            self.host.append_child(parent, child)
        }

        fn commit_tree(&mut self, root: &HostNode, staged: &HostNode) -> Result<()> {
            if let Some(read) = self.read_phase.borrow().as_ref() {
                self.at_commit.borrow_mut().push(read());
            }
            self.host.commit_tree(root, staged)
        }
    }

    #[test]
    fn test_mount_commits_once() {
        let (scheduler, container) = mount(create_element("div", Props::new(), ["hi"]));

        assert_eq!(container.inner_markup(), "<div>hi</div>");
        assert_eq!(scheduler.commit_count(), 1);
        assert_eq!(scheduler.generation(), 1);
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
        assert_eq!(scheduler.next_unit_of_work(), None);
        assert!(scheduler.with_current_tree(|tree| tree.len()).unwrap() >= 3);
    }

    #[test]
    fn test_flush_report() {
        let host = MemoryHost::new();
        let container = host.create_container("root");
        let scheduler = Scheduler::new(host);
        let status = scheduler
            .render(create_element("ul", Props::new(), ["a", "b"]), container)
            .unwrap();

        let report = status.report().unwrap();
        assert_eq!(report.generation, 1);
        assert_eq!(report.units_of_work, 4);
        assert_eq!(report.fibers, 4);
        assert_eq!(report.host_nodes, 3);
    }

    #[test]
    fn test_flush_without_mount() {
        let scheduler = Scheduler::new(MemoryHost::new());
        assert_eq!(scheduler.flush_sync().unwrap_err(), FiberError::NotMounted);
        assert_eq!(scheduler.resume().unwrap(), WorkStatus::Idle);
    }

    #[test]
    fn test_setter_triggers_flush() {
        let (scheduler, container) = mount(leaf(&counter(1, 0), Props::new()));
        let button = container.find("button").unwrap();

        assert!(button.dispatch("onclick"));
        assert_eq!(container.text_content(), "1");
        assert_eq!(scheduler.commit_count(), 2);
    }

    #[test]
    fn test_units_per_slice_yields() {
        let host = MemoryHost::new();
        let container = host.create_container("root");
        let scheduler = Scheduler::with_config(host, SchedulerConfig::default().with_units_per_slice(2));

        let app = create_element("div", Props::new(), ["a", "b", "c"]);
        let status = scheduler.render(app, container.clone()).unwrap();
        assert_eq!(status, WorkStatus::Yielded);
        assert_eq!(scheduler.phase(), SchedulerPhase::Rendering);
        assert!(scheduler.next_unit_of_work().is_some());
        assert_eq!(container.child_count(), 0);

        let mut resumes = 0;
        let status = loop {
            match scheduler.resume().unwrap() {
                WorkStatus::Yielded => resumes += 1,
                other => break other,
            }
        };
        assert!(status.is_committed());
        assert!(resumes >= 1);
        assert_eq!(container.inner_markup(), "<div>abc</div>");
    }

    #[test]
    fn test_setter_during_render_is_deferred() {
        let renders = Rc::new(Cell::new(0));
        let seen = renders.clone();
        let eager = Component::new("Eager", move |_| {
            let (value, set_value) = use_state(0i64);
            seen.set(seen.get() + 1);
            if value < 3 {
                set_value.set(value + 1);
            }
            create_element("span", Props::new(), [value])
        });

        let (scheduler, container) = mount(leaf(&eager, Props::new()));
        assert_eq!(container.text_content(), "3");
        assert_eq!(renders.get(), 4);
        assert_eq!(scheduler.commit_count(), 4);
    }

    #[test]
    fn test_runaway_setter_hits_flush_limit() {
        let runaway = Component::new("Runaway", |_| {
            let (value, set_value) = use_state(0i64);
            set_value.set(value + 1);
            leaf("div", Props::new())
        });

        let host = MemoryHost::new();
        let container = host.create_container("root");
        let scheduler = Scheduler::with_config(host, SchedulerConfig::default().with_max_nested_flushes(5));
        let err = scheduler.render(leaf(&runaway, Props::new()), container).unwrap_err();

        assert_eq!(err, FiberError::FlushLimitExceeded { limit: 5 });
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
    }

    #[test]
    fn test_failed_setter_flush_reports_error() {
        let fail = Rc::new(Cell::new(false));
        let failing = fail.clone();
        let app = Component::fallible("Fragile", move |_| {
            let (n, set_n) = use_state(0i64);
            if failing.get() && n > 0 {
                return Err(FiberError::component("Fragile", "boom"));
            }
            let on_click = Callback::new(move |_| set_n.update(|n| n + 1));
            Ok(create_element("button", Props::new().with("onclick", on_click), [n]))
        });

        let (scheduler, container) = mount(leaf(&app, Props::new()));
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        scheduler.on_flush_error(move |err| sink.borrow_mut().push(err.clone()));

        fail.set(true);
        container.find("button").unwrap().dispatch("onclick");

        assert_eq!(errors.borrow().len(), 1);
        assert!(matches!(errors.borrow()[0], FiberError::ComponentFailed { .. }));
        assert_eq!(container.text_content(), "0");
        assert_eq!(scheduler.commit_count(), 1);
    }

    #[test]
    fn test_unrendered_instances_are_pruned() {
        let show = Rc::new(Cell::new(true));
        let visible = show.clone();
        let child = counter(1, 0);
        let app = Component::new("App", move |_| {
            let kids: Vec<Node> = if visible.get() {
                vec![leaf(&child, Props::new()).into()]
            } else {
                vec!["empty".into()]
            };
            create_element("main", Props::new(), kids)
        });

        let (scheduler, _container) = mount(leaf(&app, Props::new()));
        assert_eq!(scheduler.hook_instances(), 2);

        show.set(false);
        let report = scheduler.flush_sync().unwrap();
        assert_eq!(report.report().unwrap().pruned_instances, 1);
        assert_eq!(scheduler.hook_instances(), 1);
    }

    #[test]
    fn test_committing_phase_once_per_flush() {
        let host = MemoryHost::new();
        let container = host.create_container("root");
        let read_phase: PhaseReader = Rc::new(RefCell::new(None));
        let at_commit = Rc::new(RefCell::new(Vec::new()));
        let recorder = PhaseRecorder {
            host,
            read_phase: read_phase.clone(),
            at_commit: at_commit.clone(),
        };
        let scheduler = Scheduler::with_config(recorder, SchedulerConfig::default().with_units_per_slice(2));
        let inner = Rc::downgrade(&scheduler.inner);
        let read: Box<dyn Fn() -> SchedulerPhase> =
            Box::new(move || inner.upgrade().map_or(SchedulerPhase::Idle, |inner| inner.phase.get()));
        *read_phase.borrow_mut() = Some(read);

        // Root, the counter's button and its text: three units, two per slice.
        let status = scheduler.render(leaf(&counter(1, 0), Props::new()), container.clone()).unwrap();
        assert_eq!(status, WorkStatus::Yielded);
        assert_eq!(scheduler.phase(), SchedulerPhase::Rendering);
        assert!(at_commit.borrow().is_empty());

        assert!(scheduler.resume().unwrap().is_committed());
        assert_eq!(*at_commit.borrow(), vec![SchedulerPhase::Committing]);
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);

        container.find("button").unwrap().dispatch("onclick");
        assert_eq!(scheduler.phase(), SchedulerPhase::Rendering);
        assert_eq!(at_commit.borrow().len(), 1);

        assert!(scheduler.resume().unwrap().is_committed());
        assert_eq!(*at_commit.borrow(), vec![SchedulerPhase::Committing, SchedulerPhase::Committing]);
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
        assert_eq!(container.text_content(), "1");
        assert_eq!(scheduler.commit_count(), 2);
    }
}
