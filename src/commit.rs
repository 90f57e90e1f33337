//! Commit engine - materializes a completed fiber tree into the host tree.
//!
//! # Algorithm
//!
//! 1. Stage a detached, childless clone of the real root
//! 2. Walk the fibers with an explicit worklist, appending every host
//!    handle under its nearest host ancestor's handle
//! 3. Hand the real root and the staged clone to the backend, which swaps
//!    the children in one step
//!
//! Nothing touches the real root before step 3, so a failure anywhere in
//! the walk leaves the visible tree as it was.

use crate::config::{step_trace, TraceSteps};
use crate::error::{FiberError, Result};
use crate::fiber::{FiberId, FiberTree};
use crate::host::HostBackend;

/// Host-bearing children of `id`, in order.
///
/// Fibers without a host handle of their own (components that rendered
/// another component) are transparent: their children take their place.
pub fn host_children<H>(tree: &FiberTree<H>, id: FiberId) -> Vec<FiberId> {
    let mut found = Vec::new();
    let mut stack: Vec<FiberId> = tree.children(id).collect();
    stack.reverse();

    while let Some(next) = stack.pop() {
        if tree.get(next).needs_host_node() {
            found.push(next);
        } else {
            let start = stack.len();
            stack.extend(tree.children(next));
            stack[start..].reverse();
        }
    }
    found
}

/// Commit the completed tree under `root` into the root's host handle.
///
/// Returns the number of host nodes attached.
pub fn commit_root<B: HostBackend>(
    backend: &mut B,
    tree: &FiberTree<B::Node>,
    root: FiberId,
    trace: TraceSteps,
) -> Result<usize> {
    let real = tree
        .get(root)
        .state_element()
        .cloned()
        .ok_or(FiberError::NotMounted)?;
    let staged = backend.stage_root(&real)?;

    let mut attached = 0;
    let mut worklist = vec![(root, staged.clone())];
    while let Some((fiber, parent)) = worklist.pop() {
        for child in host_children(tree, fiber) {
            let handle = tree
                .get(child)
                .state_element()
                .cloned()
                .ok_or_else(|| FiberError::HostNodeCreation {
                    tag: format!("{:?}", tree.get(child).tag()),
                    reason: format!("fiber {child} reached commit without a host node"),
                })?;
            backend.append_child(&parent, &handle)?;
            attached += 1;
            worklist.push((child, handle));
        }
    }

    backend.commit_tree(&real, &staged)?;
    step_trace!(trace, TraceSteps::COMMIT, fiber = %root, attached, "committed tree");
    Ok(attached)
}
