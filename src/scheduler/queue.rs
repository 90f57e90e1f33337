//! Task queue for cooperative scheduling.
//!
//! Every step of a flush is a task. The scheduler pops one at a time, so
//! the suspension point is always "between two tasks".

use std::collections::VecDeque;

use crate::fiber::FiberId;

/// One schedulable step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Rebuild the work-in-progress root from the mounted element.
    Flush,
    /// Reconcile (and possibly complete) one fiber.
    UnitOfWork(FiberId),
    /// Splice the completed tree into the host root.
    Commit,
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    /// Put a task back at the head, used when yielding mid-flush.
    pub fn push_front(&mut self, task: Task) {
        self.tasks.push_front(task);
    }

    pub fn pop(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
