//! Scheduler configuration.
//!
//! Controls the cooperative yield policy, the nested flush limit and which
//! render phases emit trace events.

use bitflags::bitflags;

/// Environment variable read by [`TraceSteps::from_env`].
pub const TRACE_ENV: &str = "SPARK_FIBER_TRACE";

bitflags! {
    /// Render phases that can be traced individually.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TraceSteps: u16 {
        /// Element → fiber conversion.
        const FIBERIZE = 1 << 0;
        /// Child/sibling/parent linking.
        const CREATE_FIBER_REFERENCES = 1 << 1;
        /// Function component re-renders.
        const UPDATE_FIBER = 1 << 2;
        /// Descend/advance/climb decisions of one unit of work.
        const EXECUTE_UOW = 1 << 3;
        /// Flush start, slices and yields.
        const WORK_LOOP = 1 << 4;
        /// Host node creation.
        const CREATE_ELEMENT = 1 << 5;
        /// Hook registration and setter calls.
        const USE_STATE = 1 << 6;
        /// Staging and splicing of the host tree.
        const COMMIT = 1 << 7;
    }
}

impl TraceSteps {
    /// Parse a comma separated list such as `commit,work_loop` or `all`.
    ///
    /// Unknown names are ignored.
    pub fn parse(spec: &str) -> Self {
        let mut steps = TraceSteps::empty();
        for name in spec.split(',').map(|s| s.trim().to_ascii_lowercase()) {
            steps |= match name.as_str() {
                "all" => TraceSteps::all(),
                "fiberize" => TraceSteps::FIBERIZE,
                "create_fiber_references" | "references" => TraceSteps::CREATE_FIBER_REFERENCES,
                "update_fiber" => TraceSteps::UPDATE_FIBER,
                "execute_uow" | "uow" => TraceSteps::EXECUTE_UOW,
                "work_loop" => TraceSteps::WORK_LOOP,
                "create_element" => TraceSteps::CREATE_ELEMENT,
                "use_state" => TraceSteps::USE_STATE,
                "commit" => TraceSteps::COMMIT,
                _ => TraceSteps::empty(),
            };
        }
        steps
    }

    /// Read the steps from `SPARK_FIBER_TRACE`; empty when unset.
    pub fn from_env() -> Self {
        std::env::var(TRACE_ENV)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }
}

/// Emit a `tracing` debug event when `$step` is enabled in `$steps`.
macro_rules! step_trace {
    ($steps:expr, $step:expr, $($arg:tt)+) => {
        if $steps.contains($step) {
            tracing::debug!(step = ?$step, $($arg)+);
        }
    };
}
pub(crate) use step_trace;

// =============================================================================
// Scheduler Config
// =============================================================================

/// Configuration for a [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Units of work per slice before yielding. `None` never yields.
    pub units_per_slice: Option<usize>,
    /// Maximum flushes chained by state updates requested during a flush.
    pub max_nested_flushes: usize,
    /// Phases that emit trace events.
    pub trace: TraceSteps,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            units_per_slice: None,
            max_nested_flushes: 50,
            trace: TraceSteps::empty(),
        }
    }
}

impl SchedulerConfig {
    /// Default config with trace steps taken from the environment.
    pub fn from_env() -> Self {
        Self {
            trace: TraceSteps::from_env(),
            ..Self::default()
        }
    }

    /// Yield after `units` units of work (0 is treated as 1).
    pub fn with_units_per_slice(mut self, units: usize) -> Self {
        self.units_per_slice = Some(units.max(1));
        self
    }

    pub fn with_max_nested_flushes(mut self, limit: usize) -> Self {
        self.max_nested_flushes = limit;
        self
    }

    pub fn with_trace(mut self, steps: TraceSteps) -> Self {
        self.trace = steps;
        self
    }
}
