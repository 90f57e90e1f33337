//! Fiber factory.
//!
//! Turns one declarative node into a fiber: component elements become
//! `FunctionComponent` fibers, host elements `HostComponent` fibers and
//! text leaves `TextNode` fibers.

use crate::config::{step_trace, TraceSteps};
use crate::element::{Element, Node, Tag};
use crate::types::Props;
use super::node::{Fiber, FiberData, FiberKind, FiberTag};
use super::tree::{FiberId, FiberTree};

/// Allocate a fiber for `node` at `path`.
///
/// The `alternate` slot gets a snapshot of the fresh fiber.
pub fn create_fiber<H>(tree: &mut FiberTree<H>, node: &Node, path: Vec<u32>, trace: TraceSteps) -> FiberId {
    let mut fiber = match node {
        Node::Element(element) => {
            let (tag, kind, data) = match element.tag() {
                Tag::Component(component) => (
                    FiberTag::Component(component.clone()),
                    FiberKind::FunctionComponent,
                    FiberData::Component(component.clone()),
                ),
                Tag::Host(name) => (FiberTag::Host(name.clone()), FiberKind::HostComponent, FiberData::None),
            };
            Fiber::new(tag, kind, data, element.props().clone(), path)
        }
        Node::Text(text) => Fiber::new(
            FiberTag::Text,
            FiberKind::TextNode,
            FiberData::Text(text.clone()),
            Props::new(),
            path,
        ),
    };
    fiber.alternate = Some(fiber.snapshot());

    step_trace!(trace, TraceSteps::FIBERIZE, kind = ?fiber.kind, tag = ?fiber.tag, "fiberized node");
    tree.alloc(fiber)
}

/// Allocate the host root for a flush.
///
/// The root carries the real container as its host handle and has the
/// application element as its only child.
pub fn create_root_fiber<H>(tree: &mut FiberTree<H>, container: H, app: &Element, trace: TraceSteps) -> FiberId {
    let mut props = Props::new();
    props.children = vec![Node::Element(app.clone())].into();
    let mut fiber = Fiber::new(FiberTag::Root, FiberKind::HostComponent, FiberData::None, props, Vec::new());
    fiber.state_element = Some(container);
    fiber.alternate = Some(fiber.snapshot());

    step_trace!(trace, TraceSteps::FIBERIZE, "created host root");
    let id = tree.alloc(fiber);
    tree.set_root(id);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{create_element, leaf, Component};
    use crate::fiber::node::Mode;

    #[test]
    fn test_host_element_fiber() {
        let mut tree: FiberTree<()> = FiberTree::new();
        let node = Node::from(create_element("div", Props::new().with("id", "a"), ["hi"]));
        let id = create_fiber(&mut tree, &node, vec![0], TraceSteps::empty());
        let fiber = tree.get(id);

        assert_eq!(fiber.kind(), FiberKind::HostComponent);
        assert_eq!(fiber.host_tag(), Some("div"));
        assert_eq!(fiber.mode(), Mode::Created);
        assert_eq!(fiber.props().children.len(), 1);
        assert_eq!(fiber.initial_props(), fiber.props());
        assert!(fiber.child().is_none());
        assert!(fiber.alternate().is_some());
    }

    #[test]
    fn test_fiber_shares_element_children() {
        let mut tree: FiberTree<()> = FiberTree::new();
        let element = create_element("ul", Props::new(), [create_element("li", Props::new(), ["x"])]);
        let id = create_fiber(&mut tree, &Node::from(element.clone()), vec![0], TraceSteps::empty());

        assert!(std::rc::Rc::ptr_eq(&tree.get(id).props().children, &element.props().children));
    }

    #[test]
    fn test_component_fiber_carries_function() {
        let comp = Component::new("Hello", |_| leaf("span", Props::new()));
        let mut tree: FiberTree<()> = FiberTree::new();
        let node = Node::from(leaf(&comp, Props::new()));
        let id = create_fiber(&mut tree, &node, vec![], TraceSteps::empty());
        let fiber = tree.get(id);

        assert_eq!(fiber.kind(), FiberKind::FunctionComponent);
        assert_eq!(fiber.data(), &FiberData::Component(comp));
        assert_eq!(fiber.host_tag(), None);
    }

    #[test]
    fn test_primitive_fiber() {
        let mut tree: FiberTree<()> = FiberTree::new();
        let id = create_fiber(&mut tree, &Node::from(42), vec![], TraceSteps::empty());
        let fiber = tree.get(id);

        assert_eq!(fiber.kind(), FiberKind::TextNode);
        assert_eq!(fiber.text(), Some("42"));
        assert_eq!(fiber.tag(), &FiberTag::Text);
    }

    #[test]
    fn test_root_fiber() {
        let mut tree: FiberTree<&str> = FiberTree::new();
        let app = leaf("main", Props::new());
        let root = create_root_fiber(&mut tree, "container", &app, TraceSteps::empty());

        assert_eq!(tree.root(), Some(root));
        assert_eq!(tree.get(root).state_element(), Some(&"container"));
        assert_eq!(tree.get(root).props().children.to_vec(), vec![Node::Element(app)]);
    }
}
