//! Fiber arena.
//!
//! One `FiberTree` per flush. Fibers are addressed by index, so the
//! child/sibling/parent links are plain `FiberId`s and the tree never owns
//! cycles. The whole arena is dropped when the next flush commits.

use std::fmt;

use super::node::{Fiber, Mode};

/// Index of a fiber inside its [`FiberTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId(pub(crate) u32);

impl FiberId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena of fibers built during one flush.
pub struct FiberTree<H> {
    fibers: Vec<Fiber<H>>,
    root: Option<FiberId>,
}

impl<H> Default for FiberTree<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> FiberTree<H> {
    pub fn new() -> Self {
        Self {
            fibers: Vec::new(),
            root: None,
        }
    }

    /// Store a fiber and return its id.
    pub(crate) fn alloc(&mut self, fiber: Fiber<H>) -> FiberId {
        let id = FiberId(self.fibers.len() as u32);
        self.fibers.push(fiber);
        id
    }

    pub(crate) fn set_root(&mut self, id: FiberId) {
        self.root = Some(id);
    }

    /// The work-in-progress (or committed) root.
    pub fn root(&self) -> Option<FiberId> {
        self.root
    }

    /// Fiber by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this tree.
    pub fn get(&self, id: FiberId) -> &Fiber<H> {
        &self.fibers[id.index()]
    }

    pub fn get_mut(&mut self, id: FiberId) -> &mut Fiber<H> {
        &mut self.fibers[id.index()]
    }

    pub fn try_get(&self, id: FiberId) -> Option<&Fiber<H>> {
        self.fibers.get(id.index())
    }

    /// Number of fibers allocated, including ones orphaned by re-linking.
    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    /// Children of `id` in order, following `child` then `sibling`.
    pub fn children(&self, id: FiberId) -> Children<'_, H> {
        Children {
            tree: self,
            next: self.get(id).child,
        }
    }

    /// Whether every reachable fiber has reached `mode`.
    pub fn all_reached(&self, mode: Mode) -> bool {
        let Some(root) = self.root else { return true };
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.get(id).mode < mode {
                return false;
            }
            stack.extend(self.children(id));
        }
        true
    }
}

impl<H: fmt::Debug> fmt::Debug for FiberTree<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiberTree")
            .field("root", &self.root)
            .field("fibers", &self.fibers)
            .finish()
    }
}

/// Iterator over a fiber's children.
pub struct Children<'a, H> {
    tree: &'a FiberTree<H>,
    next: Option<FiberId>,
}

impl<H> Iterator for Children<'_, H> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        let id = self.next?;
        self.next = self.tree.get(id).sibling;
        Some(id)
    }
}
