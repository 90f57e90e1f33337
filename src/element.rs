//! Declarative tree builder.
//!
//! Elements are immutable descriptions of one node: a host tag or a
//! component, its props and its children. Building them has no side
//! effects; the scheduler turns them into fibers.
//!
//! # Example
//!
//! ```
//! use spark_fiber::{create_element, Props};
//!
//! let tree = create_element("div", Props::new().with("id", "greeting"), ["hi"]);
//! assert_eq!(tree.props().children.len(), 1);
//! ```

use std::fmt;
use std::rc::Rc;

use crate::error::{FiberError, Result};
use crate::types::Props;

// =============================================================================
// Component
// =============================================================================

type RenderFn = dyn Fn(&Props) -> Result<Element>;

/// A function component: props in, element out.
///
/// Cloning shares the same function; identity is the allocation, so two
/// clones are the same component for hook bookkeeping.
#[derive(Clone)]
pub struct Component {
    name: Rc<str>,
    render: Rc<RenderFn>,
}

impl Component {
    /// An infallible component.
    pub fn new(name: &str, render: impl Fn(&Props) -> Element + 'static) -> Self {
        Self {
            name: Rc::from(name),
            render: Rc::new(move |props| Ok(render(props))),
        }
    }

    /// A component whose render can fail. The error aborts the flush.
    pub fn fallible(name: &str, render: impl Fn(&Props) -> Result<Element> + 'static) -> Self {
        Self {
            name: Rc::from(name),
            render: Rc::new(render),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable identity of the underlying function.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.render) as *const () as usize
    }

    /// Run the render function.
    pub fn render(&self, props: &Props) -> Result<Element> {
        (self.render)(props).map_err(|err| match err {
            FiberError::ComponentFailed { .. } => err,
            other @ (FiberError::HookOrder { .. }
            | FiberError::HookTypeMismatch { .. }
            | FiberError::HookOutsideRender) => other,
            other => FiberError::component(self.name(), other.to_string()),
        })
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.render, &other.render)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

// =============================================================================
// Tag / Element / Node
// =============================================================================

/// What an element renders as.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    /// A host element such as `div`.
    Host(Rc<str>),
    /// A function component.
    Component(Component),
}

impl From<&str> for Tag {
    fn from(tag: &str) -> Self {
        Tag::Host(Rc::from(tag))
    }
}

impl From<String> for Tag {
    fn from(tag: String) -> Self {
        Tag::Host(Rc::from(tag))
    }
}

impl From<Component> for Tag {
    fn from(component: Component) -> Self {
        Tag::Component(component)
    }
}

impl From<&Component> for Tag {
    fn from(component: &Component) -> Self {
        Tag::Component(component.clone())
    }
}

/// Immutable declarative node.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    tag: Tag,
    props: Props,
}

impl Element {
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Props, with `children` holding the child nodes.
    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &[Node] {
        &self.props.children
    }

    pub(crate) fn into_parts(self) -> (Tag, Props) {
        (self.tag, self.props)
    }
}

/// A child position: an element or a primitive leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Text(value.to_string())
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Node::Text(value.to_string())
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Text(value.to_string())
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Text(value.to_string())
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Build an element from a tag (or component), props and children.
///
/// Any `children` already present in `props` are replaced by `children`.
pub fn create_element<N: Into<Node>>(
    tag: impl Into<Tag>,
    props: Props,
    children: impl IntoIterator<Item = N>,
) -> Element {
    let mut props = props;
    props.children = children.into_iter().map(Into::into).collect();
    Element {
        tag: tag.into(),
        props,
    }
}

/// Element with no children.
pub fn leaf(tag: impl Into<Tag>, props: Props) -> Element {
    create_element(tag, props, Vec::<Node>::new())
}

/// A text leaf.
pub fn text(value: impl Into<String>) -> Node {
    Node::Text(value.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_element_collects_children() {
        let el = create_element(
            "div",
            Props::new().with("id", "a"),
            [Node::from("hi"), create_element("span", Props::new(), [7]).into()],
        );
        assert_eq!(el.tag(), &Tag::from("div"));
        assert_eq!(el.children().len(), 2);
        assert_eq!(el.children()[0], Node::Text("hi".to_string()));
        assert_eq!(el.props().get_str("id"), Some("a"));
    }

    #[test]
    fn test_component_identity() {
        let a = Component::new("A", |_| leaf("div", Props::new()));
        let b = a.clone();
        let c = Component::new("A", |_| leaf("div", Props::new()));
        assert_eq!(a, b);
        assert_eq!(a.id(), b.id());
        assert_ne!(a, c);
    }

    #[test]
    fn test_fallible_component_error_is_wrapped() {
        let broken = Component::fallible("Broken", |_| {
            Err(FiberError::InvalidProperty {
                path: "x.y".to_string(),
            })
        });
        let err = broken.render(&Props::new()).unwrap_err();
        assert!(matches!(err, FiberError::ComponentFailed { component, .. } if component == "Broken"));
    }

    #[test]
    fn test_numbers_become_text() {
        assert_eq!(Node::from(-2), Node::Text("-2".to_string()));
        assert_eq!(Node::from(true), Node::Text("true".to_string()));
    }
}
