//! In-memory host - a small DOM-like node tree.
//!
//! Used as the default backend and in tests. Nodes are shared handles
//! (`Rc<RefCell<..>>`), so a handle kept by the caller keeps observing the
//! node after commits.
//!
//! # Property assignment
//!
//! - Primitive values become attributes (`id="a"`)
//! - `Handler` values become listeners, fired by [`HostNode::dispatch`]
//! - Map values assign nested properties; only `style` and `dataset`
//!   accept them, anything else is [`FiberError::InvalidProperty`]
//! - `Null` values are skipped

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{FiberError, Result};
use crate::fiber::{Fiber, FiberKind};
use crate::types::{Callback, PropValue};
use super::backend::HostBackend;

// =============================================================================
// Host Node
// =============================================================================

/// What a host node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(String),
    Text(String),
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    dataset: BTreeMap<String, String>,
    listeners: BTreeMap<String, Callback>,
    children: Vec<HostNode>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
            style: BTreeMap::new(),
            dataset: BTreeMap::new(),
            listeners: BTreeMap::new(),
            children: Vec::new(),
        }
    }
}

/// Shared handle to an in-memory node.
#[derive(Clone)]
pub struct HostNode(Rc<RefCell<NodeData>>);

impl HostNode {
    pub fn element(tag: &str) -> Self {
        Self(Rc::new(RefCell::new(NodeData::new(NodeKind::Element(tag.to_string())))))
    }

    pub fn text(content: &str) -> Self {
        Self(Rc::new(RefCell::new(NodeData::new(NodeKind::Text(content.to_string())))))
    }

    pub fn kind(&self) -> NodeKind {
        self.0.borrow().kind.clone()
    }

    /// Tag name of an element node.
    pub fn tag(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element(tag) => Some(tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Text(_))
    }

    /// Handles to the children, in order.
    pub fn children(&self) -> Vec<HostNode> {
        self.0.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.borrow().attributes.get(name).cloned()
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.0.borrow_mut().attributes.insert(name.to_string(), value.to_string());
    }

    pub fn style(&self, name: &str) -> Option<String> {
        self.0.borrow().style.get(name).cloned()
    }

    pub fn data(&self, name: &str) -> Option<String> {
        self.0.borrow().dataset.get(name).cloned()
    }

    pub fn has_listener(&self, event: &str) -> bool {
        self.0.borrow().listeners.contains_key(event)
    }

    /// Fire the listener registered for `event`. Returns whether one ran.
    ///
    /// The listener runs with no borrow held, so it may trigger a flush
    /// that rewrites this very tree.
    pub fn dispatch(&self, event: &str) -> bool {
        let listener = self.0.borrow().listeners.get(event).cloned();
        match listener {
            Some(callback) => {
                callback.call(event);
                true
            }
            None => false,
        }
    }

    /// Append a child.
    pub fn append_child(&self, child: &HostNode) {
        self.0.borrow_mut().children.push(child.clone());
    }

    /// Remove and return all children.
    pub fn take_children(&self) -> Vec<HostNode> {
        std::mem::take(&mut self.0.borrow_mut().children)
    }

    /// Same node kind and properties, no children.
    pub fn shallow_clone(&self) -> HostNode {
        let data = self.0.borrow();
        let copy = NodeData {
            kind: data.kind.clone(),
            attributes: data.attributes.clone(),
            style: data.style.clone(),
            dataset: data.dataset.clone(),
            listeners: data.listeners.clone(),
            children: Vec::new(),
        };
        HostNode(Rc::new(RefCell::new(copy)))
    }

    pub fn ptr_eq(&self, other: &HostNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            let data = node.0.borrow();
            if let NodeKind::Text(text) = &data.kind {
                out.push_str(text);
            }
            stack.extend(data.children.iter().rev().cloned());
        }
        out
    }

    /// All descendant elements with `tag`, in document order.
    pub fn find_all(&self, tag: &str) -> Vec<HostNode> {
        let mut found = Vec::new();
        let mut stack: Vec<HostNode> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            if node.tag().as_deref() == Some(tag) {
                found.push(node.clone());
            }
            stack.extend(node.children().into_iter().rev());
        }
        found
    }

    /// First descendant element with `tag`.
    pub fn find(&self, tag: &str) -> Option<HostNode> {
        self.find_all(tag).into_iter().next()
    }

    /// HTML-like serialization of the children of this node.
    pub fn inner_markup(&self) -> String {
        self.children().iter().map(HostNode::to_markup).collect()
    }

    /// HTML-like serialization, attributes and style in key order.
    pub fn to_markup(&self) -> String {
        let data = self.0.borrow();
        match &data.kind {
            NodeKind::Text(text) => escape(text),
            NodeKind::Element(tag) => {
                let mut out = format!("<{tag}");
                for (name, value) in &data.attributes {
                    out.push_str(&format!(" {name}=\"{}\"", escape(value)));
                }
                if !data.style.is_empty() {
                    let style: Vec<String> = data.style.iter().map(|(k, v)| format!("{k}:{v}")).collect();
                    out.push_str(&format!(" style=\"{}\"", escape(&style.join(";"))));
                }
                for (name, value) in &data.dataset {
                    out.push_str(&format!(" data-{name}=\"{}\"", escape(value)));
                }
                out.push('>');
                for child in &data.children {
                    out.push_str(&child.to_markup());
                }
                out.push_str(&format!("</{tag}>"));
                out
            }
        }
    }
}

impl fmt::Debug for HostNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markup())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// =============================================================================
// Property Assignment
// =============================================================================

fn assign_props(node: &HostNode, fiber: &Fiber<HostNode>) -> Result<()> {
    let mut data = node.0.borrow_mut();
    for (name, value) in fiber.props().iter() {
        match value {
            PropValue::Null => {}
            PropValue::Handler(callback) => {
                data.listeners.insert(name.to_string(), callback.clone());
            }
            PropValue::Map(nested) => {
                for (key, nested_value) in nested {
                    let path = format!("{name}.{key}");
                    if matches!(nested_value, PropValue::Map(_) | PropValue::Handler(_)) {
                        return Err(FiberError::InvalidProperty { path });
                    }
                    let target = match name {
                        "style" => &mut data.style,
                        "dataset" => &mut data.dataset,
                        _ => return Err(FiberError::InvalidProperty { path }),
                    };
                    target.insert(key.clone(), nested_value.to_text());
                }
            }
            primitive => {
                data.attributes.insert(name.to_string(), primitive.to_text());
            }
        }
    }
    Ok(())
}

// =============================================================================
// Memory Host
// =============================================================================

#[derive(Debug, Default)]
struct HostStats {
    nodes_created: Cell<usize>,
    commits: Cell<usize>,
}

/// In-memory host backend.
///
/// Clones share the same counters, so a clone kept outside the scheduler
/// can observe how many nodes were created and how many commits ran.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    stats: Rc<HostStats>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root container to mount into.
    pub fn create_container(&self, tag: &str) -> HostNode {
        HostNode::element(tag)
    }

    pub fn nodes_created(&self) -> usize {
        self.stats.nodes_created.get()
    }

    pub fn commit_count(&self) -> usize {
        self.stats.commits.get()
    }
}

impl HostBackend for MemoryHost {
    type Node = HostNode;

    fn create_host_node(&mut self, fiber: &Fiber<HostNode>) -> Result<HostNode> {
        let node = match fiber.kind() {
            FiberKind::TextNode => HostNode::text(fiber.text().unwrap_or_default()),
            FiberKind::HostComponent | FiberKind::FunctionComponent => {
                let tag = fiber.host_tag().ok_or_else(|| FiberError::HostNodeCreation {
                    tag: format!("{:?}", fiber.tag()),
                    reason: "fiber has no host tag".to_string(),
                })?;
                if tag.is_empty() {
                    return Err(FiberError::HostNodeCreation {
                        tag: String::new(),
                        reason: "empty tag name".to_string(),
                    });
                }
                let node = HostNode::element(tag);
                assign_props(&node, fiber)?;
                node
            }
        };
        self.stats.nodes_created.set(self.stats.nodes_created.get() + 1);
        Ok(node)
    }

    fn stage_root(&mut self, root: &HostNode) -> Result<HostNode> {
        Ok(root.shallow_clone())
    }

    fn append_child(&mut self, parent: &HostNode, child: &HostNode) -> Result<()> {
        if parent.is_text() {
            return Err(FiberError::InvalidProperty {
                path: "text.children".to_string(),
            });
        }
        parent.append_child(child);
        Ok(())
    }

    fn commit_tree(&mut self, root: &HostNode, staged: &HostNode) -> Result<()> {
        root.take_children();
        for child in staged.take_children() {
            root.append_child(&child);
        }
        self.stats.commits.set(self.stats.commits.get() + 1);
        Ok(())
    }
}
