//! One unit of work: reconcile, then descend, advance or climb.
//!
//! Traversal uses only the fibers' own `child`/`sibling`/`parent` links,
//! so the loop can stop after any unit and pick up from the returned fiber
//! later. Descent is pre-order, completion post-order.

use crate::config::{step_trace, TraceSteps};
use crate::error::Result;
use crate::fiber::{reconcile_fiber, FiberFlags, FiberId, FiberTree, Mode};
use crate::hooks::HookRuntime;
use crate::host::HostBackend;

/// Process `fiber` and return the next unit of work, or `None` once the
/// whole tree is completed.
pub fn perform_unit_of_work<B: HostBackend>(
    tree: &mut FiberTree<B::Node>,
    fiber: FiberId,
    hooks: &HookRuntime,
    backend: &mut B,
    effects: &mut Vec<FiberId>,
    trace: TraceSteps,
) -> Result<Option<FiberId>> {
    let work_in_progress = reconcile_fiber(tree, fiber, hooks, trace)?;
    step_trace!(trace, TraceSteps::EXECUTE_UOW, fiber = %work_in_progress, "executed unit of work");

    if let Some(child) = tree.get(work_in_progress).child() {
        return Ok(Some(child));
    }

    let mut current = Some(work_in_progress);
    while let Some(id) = current {
        complete_unit_of_work(tree, id, backend, effects, trace)?;
        if let Some(sibling) = tree.get(id).sibling() {
            return Ok(Some(sibling));
        }
        current = tree.get(id).parent();
    }
    Ok(None)
}

/// Complete one fiber.
///
/// The work-in-progress root goes on the effect list for commit. Any
/// other fiber that materializes gets its host node from the backend.
pub fn complete_unit_of_work<B: HostBackend>(
    tree: &mut FiberTree<B::Node>,
    id: FiberId,
    backend: &mut B,
    effects: &mut Vec<FiberId>,
    trace: TraceSteps,
) -> Result<()> {
    if tree.root() == Some(id) {
        if !tree.get(id).flags().contains(FiberFlags::ON_EFFECT_LIST) {
            effects.push(id);
            tree.get_mut(id).flags.insert(FiberFlags::ON_EFFECT_LIST);
        }
    } else if tree.get(id).needs_host_node() && tree.get(id).state_element().is_none() {
        let node = backend.create_host_node(tree.get(id))?;
        tree.get_mut(id).state_element = Some(node);
        step_trace!(trace, TraceSteps::CREATE_ELEMENT, fiber = %id, "created host node");
    }
    tree.get_mut(id).advance(Mode::Completed);

    step_trace!(trace, TraceSteps::WORK_LOOP, fiber = %id, "completed fiber");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::element::{create_element, Element, Node};
    use crate::fiber::create_root_fiber;
    use crate::hooks::HookStore;
    use crate::host::{HostNode, MemoryHost};
    use crate::types::Props;

    fn run(app: &Element) -> (FiberTree<HostNode>, Vec<FiberId>, Vec<FiberId>, MemoryHost) {
        let mut host = MemoryHost::new();
        let hooks = HookRuntime::detached(Rc::new(RefCell::new(HookStore::new())));
        let mut tree = FiberTree::new();
        let root = create_root_fiber(&mut tree, host.create_container("root"), app, TraceSteps::empty());

        let mut visited = Vec::new();
        let mut effects = Vec::new();
        let mut next = Some(root);
        while let Some(id) = next {
            visited.push(id);
            next = perform_unit_of_work(&mut tree, id, &hooks, &mut host, &mut effects, TraceSteps::empty()).unwrap();
        }
        (tree, visited, effects, host)
    }

    #[test]
    fn test_traversal_is_preorder() {
        let app = create_element(
            "div",
            Props::new(),
            [Node::from(create_element("p", Props::new(), ["a"])), Node::from("b")],
        );
        let (tree, visited, _, _) = run(&app);

        let labels: Vec<String> = visited
            .iter()
            .map(|&id| {
                let fiber = tree.get(id);
                fiber
                    .host_tag()
                    .or(fiber.text())
                    .unwrap_or("root")
                    .to_string()
            })
            .collect();
        assert_eq!(labels, vec!["root", "div", "p", "a", "b"]);
    }

    #[test]
    fn test_every_fiber_completed() {
        let app = create_element("ul", Props::new(), [create_element("li", Props::new(), ["x"])]);
        let (tree, _, effects, host) = run(&app);

        assert!(tree.all_reached(Mode::Completed));
        assert_eq!(effects, vec![tree.root().unwrap()]);
        assert_eq!(host.nodes_created(), 3);
        let li = tree.get(tree.get(tree.root().unwrap()).child().unwrap()).child().unwrap();
        assert!(tree.get(li).state_element().is_some());
    }

    #[test]
    fn test_root_gets_no_new_host_node() {
        let (tree, _, _, _) = run(&create_element("span", Props::new(), Vec::<Node>::new()));
        let root = tree.get(tree.root().unwrap());
        assert_eq!(root.state_element().and_then(HostNode::tag).as_deref(), Some("root"));
        assert!(root.flags().contains(FiberFlags::ON_EFFECT_LIST));
    }
}
