//! Fiber - the mutable work unit mirroring one element during one flush.
//!
//! Fibers live in a [`FiberTree`](super::FiberTree) arena and point at each
//! other by [`FiberId`](super::FiberId): `child` (first child), `sibling`
//! (next sibling) and `parent` (back-reference). Those three pointers are
//! all the work loop needs to walk the tree without recursion.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::element::Component;
use crate::types::Props;
use super::tree::FiberId;

// =============================================================================
// Enums
// =============================================================================

/// Which kind of node a fiber mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiberKind {
    FunctionComponent,
    HostComponent,
    TextNode,
}

/// Traversal mode. Only ever advances `Created → Visited → Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    /// Allocated, children not linked yet.
    Created,
    /// Reconciled, children linked.
    Visited,
    /// Host node attached (or queued for commit if root).
    Completed,
}

/// The fiber's current tag.
///
/// A function component fiber starts as `Component` and takes the tag of
/// whatever it rendered, so after reconciliation it usually reads `Host`.
#[derive(Debug, Clone, PartialEq)]
pub enum FiberTag {
    /// The host root wrapping a mounted tree.
    Root,
    Host(Rc<str>),
    Component(Component),
    Text,
}

/// Payload carried by the fiber.
#[derive(Debug, Clone, PartialEq)]
pub enum FiberData {
    None,
    Component(Component),
    Text(String),
}

bitflags! {
    /// Per-fiber work flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FiberFlags: u8 {
        /// Props changed after the fiber was visited; defeats the bail-out.
        const PENDING_UPDATE = 1 << 0;
        /// Queued on the effect list for commit.
        const ON_EFFECT_LIST = 1 << 1;
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Shallow copy of a fiber taken when it is created.
///
/// Kept in the `alternate` slot. Nothing reads it during a flush; fibers
/// are rebuilt from elements every time.
#[derive(Debug, Clone, PartialEq)]
pub struct FiberSnapshot {
    pub tag: FiberTag,
    pub kind: FiberKind,
    pub props: Props,
    pub mode: Mode,
}

// =============================================================================
// Fiber
// =============================================================================

pub struct Fiber<H> {
    pub(crate) tag: FiberTag,
    pub(crate) kind: FiberKind,
    pub(crate) data: FiberData,
    pub(crate) props: Props,
    pub(crate) initial_props: Props,
    pub(crate) mode: Mode,
    pub(crate) flags: FiberFlags,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) parent: Option<FiberId>,
    pub(crate) alternate: Option<FiberSnapshot>,
    /// Sibling indices from the root; identifies component instances.
    pub(crate) path: Vec<u32>,
    pub(crate) state_element: Option<H>,
}

impl<H> Fiber<H> {
    pub(crate) fn new(tag: FiberTag, kind: FiberKind, data: FiberData, props: Props, path: Vec<u32>) -> Self {
        Self {
            tag,
            kind,
            data,
            initial_props: props.clone(),
            props,
            mode: Mode::Created,
            flags: FiberFlags::empty(),
            child: None,
            sibling: None,
            parent: None,
            alternate: None,
            path,
            state_element: None,
        }
    }

    pub fn tag(&self) -> &FiberTag {
        &self.tag
    }

    pub fn kind(&self) -> FiberKind {
        self.kind
    }

    pub fn data(&self) -> &FiberData {
        &self.data
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn initial_props(&self) -> &Props {
        &self.initial_props
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn flags(&self) -> FiberFlags {
        self.flags
    }

    pub fn child(&self) -> Option<FiberId> {
        self.child
    }

    pub fn sibling(&self) -> Option<FiberId> {
        self.sibling
    }

    pub fn parent(&self) -> Option<FiberId> {
        self.parent
    }

    pub fn alternate(&self) -> Option<&FiberSnapshot> {
        self.alternate.as_ref()
    }

    pub fn path(&self) -> &[u32] {
        &self.path
    }

    /// Host handle, present once the fiber completed.
    pub fn state_element(&self) -> Option<&H> {
        self.state_element.as_ref()
    }

    /// Host tag this fiber materializes as, if any.
    ///
    /// `None` for the root, text fibers and components that rendered
    /// another component.
    pub fn host_tag(&self) -> Option<&str> {
        match &self.tag {
            FiberTag::Host(tag) => Some(tag),
            _ => None,
        }
    }

    /// Text payload of a text fiber.
    pub fn text(&self) -> Option<&str> {
        match &self.data {
            FiberData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether completion should ask the host backend for a node.
    pub fn needs_host_node(&self) -> bool {
        self.kind == FiberKind::TextNode || self.host_tag().is_some()
    }

    /// Flag new props so the next reconciliation does not bail out.
    ///
    /// The scheduler never calls this: every flush rebuilds the fibers from
    /// elements, so freshly created fibers are never `Visited` and never
    /// bail out. It exists for driving the reconciler by hand over a tree
    /// that is kept across passes.
    pub fn mark_pending_update(&mut self, props: Props) {
        self.initial_props = props;
        self.flags.insert(FiberFlags::PENDING_UPDATE);
    }

    /// Advance the mode. Regressions are ignored.
    pub(crate) fn advance(&mut self, mode: Mode) {
        if mode > self.mode {
            self.mode = mode;
        }
    }

    pub(crate) fn snapshot(&self) -> FiberSnapshot {
        FiberSnapshot {
            tag: self.tag.clone(),
            kind: self.kind,
            props: self.props.without_children(),
            mode: self.mode,
        }
    }
}

impl<H: fmt::Debug> fmt::Debug for Fiber<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("tag", &self.tag)
            .field("kind", &self.kind)
            .field("mode", &self.mode)
            .field("flags", &self.flags)
            .field("child", &self.child)
            .field("sibling", &self.sibling)
            .field("parent", &self.parent)
            .field("path", &self.path)
            .field("state_element", &self.state_element)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(tag: &str) -> Fiber<()> {
        Fiber::new(
            FiberTag::Host(Rc::from(tag)),
            FiberKind::HostComponent,
            FiberData::None,
            Props::new(),
            vec![0],
        )
    }

    #[test]
    fn test_mode_never_regresses() {
        let mut fiber = host("div");
        fiber.advance(Mode::Completed);
        fiber.advance(Mode::Visited);
        assert_eq!(fiber.mode(), Mode::Completed);
    }

    #[test]
    fn test_needs_host_node() {
        assert!(host("div").needs_host_node());

        let text: Fiber<()> = Fiber::new(
            FiberTag::Text,
            FiberKind::TextNode,
            FiberData::Text("hi".to_string()),
            Props::new(),
            vec![],
        );
        assert!(text.needs_host_node());
        assert_eq!(text.text(), Some("hi"));

        let root: Fiber<()> = Fiber::new(FiberTag::Root, FiberKind::HostComponent, FiberData::None, Props::new(), vec![]);
        assert!(!root.needs_host_node());
    }

    #[test]
    fn test_mark_pending_update() {
        let mut fiber = host("div");
        fiber.mark_pending_update(Props::new().with("id", "x"));
        assert!(fiber.flags().contains(FiberFlags::PENDING_UPDATE));
        assert_eq!(fiber.initial_props().get_str("id"), Some("x"));
    }
}
