//! Reconciler - re-renders function components and links children.
//!
//! # Algorithm
//!
//! 1. Bail out if the fiber was already visited and has no pending update
//!    (the only memoization point; prunes the whole subtree)
//! 2. Function components run with their merged props; the output's tag
//!    and props are copied into the same fiber so the instance keeps its
//!    hook state
//! 3. Walk the children once: first child goes to `child`, the rest chain
//!    through `sibling`, every one points back through `parent`
//! 4. Mark the fiber `Visited`

use crate::config::{step_trace, TraceSteps};
use crate::element::{Node, Tag};
use crate::error::Result;
use crate::hooks::{HookRuntime, InstanceKey};
use crate::types::Props;
use super::create::create_fiber;
use super::node::{FiberData, FiberFlags, FiberKind, FiberTag, Mode};
use super::tree::{FiberId, FiberTree};

/// Props a component renders with: carried-over props overlaid with the
/// initial ones, children excluded. Where both have a key the initial
/// value wins.
pub fn merge_render_props(carried: &Props, initial: &Props) -> Props {
    carried.overlay(initial)
}

fn should_bail<H>(tree: &FiberTree<H>, id: FiberId) -> bool {
    let fiber = tree.get(id);
    fiber.mode >= Mode::Visited && !fiber.flags.contains(FiberFlags::PENDING_UPDATE)
}

/// Reconcile one fiber: re-render if it is a component, then link its
/// children.
pub fn reconcile_fiber<H>(tree: &mut FiberTree<H>, id: FiberId, hooks: &HookRuntime, trace: TraceSteps) -> Result<FiberId> {
    if should_bail(tree, id) {
        step_trace!(trace, TraceSteps::UPDATE_FIBER, fiber = %id, "bail out, already visited");
        return Ok(id);
    }

    if tree.get(id).kind == FiberKind::FunctionComponent {
        rerender_fiber(tree, id, hooks, trace)?;
    }
    Ok(update_children_references(tree, id, trace))
}

/// Run a function component fiber and adopt its output.
///
/// The previous props become `initial_props`; the output's props (with its
/// children) become `props`. If the output is itself a component element,
/// the fiber keeps no host tag and the output becomes its only child.
pub fn rerender_fiber<H>(tree: &mut FiberTree<H>, id: FiberId, hooks: &HookRuntime, trace: TraceSteps) -> Result<()> {
    let fiber = tree.get(id);
    let FiberData::Component(component) = &fiber.data else {
        return Ok(());
    };
    let component = component.clone();
    let props = merge_render_props(&fiber.props, &fiber.initial_props);
    let key = InstanceKey::new(fiber.path.clone());

    let output = hooks.render_component(&key, &component, &props)?;

    let (tag, rendered_props) = match output.tag().clone() {
        Tag::Host(name) => (FiberTag::Host(name), output.into_parts().1),
        Tag::Component(_) => {
            let mut props = Props::new();
            props.children = vec![Node::Element(output)].into();
            (FiberTag::Component(component.clone()), props)
        }
    };

    let fiber = tree.get_mut(id);
    fiber.initial_props = std::mem::replace(&mut fiber.props, rendered_props);
    fiber.tag = tag;

    step_trace!(trace, TraceSteps::UPDATE_FIBER, fiber = %id, component = component.name(), "re-rendered function component");
    Ok(())
}

/// Build the child/sibling/parent links of `id` from its props' children.
///
/// Returns the fiber unchanged when it was already visited and nothing is
/// pending. Zero children leaves `child` empty, ending the branch.
pub fn update_children_references<H>(tree: &mut FiberTree<H>, id: FiberId, trace: TraceSteps) -> FiberId {
    if should_bail(tree, id) {
        return id;
    }

    let fiber = tree.get_mut(id);
    fiber.child = None;
    let children = fiber.props.children.clone();
    let parent_path = fiber.path.clone();

    let mut previous: Option<FiberId> = None;
    for (index, node) in children.iter().enumerate() {
        let mut path = parent_path.clone();
        path.push(index as u32);
        let child = create_fiber(tree, node, path, trace);
        tree.get_mut(child).parent = Some(id);

        match previous {
            None => tree.get_mut(id).child = Some(child),
            Some(prev) => tree.get_mut(prev).sibling = Some(child),
        }
        previous = Some(child);
    }

    let fiber = tree.get_mut(id);
    fiber.advance(Mode::Visited);
    fiber.flags.remove(FiberFlags::PENDING_UPDATE);

    step_trace!(trace, TraceSteps::CREATE_FIBER_REFERENCES, fiber = %id, children = children.len(), "linked children");
    id
}
