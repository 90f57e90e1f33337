//! Terminal renderer for committed host trees.
//!
//! Walks a [`HostNode`] tree and prints its text, one line per block
//! element, with text attributes derived from tags and `style` entries.
//!
//! # Algorithm
//!
//! 1. Walk the tree with an explicit enter/exit stack
//! 2. Block tags break the line on enter and on exit
//! 3. Text runs are printed with the attributes inherited from their
//!    ancestors; escape codes are only emitted when the attribute set
//!    changes
//! 4. Everything is queued into one buffer and written with one call

use std::io::{self, Write};

use bitflags::bitflags;
use crossterm::queue;
use crossterm::style::{Attribute, Print, SetAttribute};

use crate::error::Result;
use crate::host::{HostNode, NodeKind};

// =============================================================================
// Attributes
// =============================================================================

bitflags! {
    /// Text attributes.
    ///
    /// Combine with bitwise OR: `Attr::BOLD | Attr::ITALIC`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attr: u8 {
        const NONE = 0;
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const INVERSE = 1 << 4;
        const STRIKETHROUGH = 1 << 5;
    }
}

impl Attr {
    /// Attributes an element adds to its subtree.
    pub fn of(node: &HostNode) -> Attr {
        let mut attr = match node.tag().as_deref() {
            Some("h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "b" | "strong") => Attr::BOLD,
            Some("i" | "em") => Attr::ITALIC,
            Some("u") => Attr::UNDERLINE,
            Some("s" | "del") => Attr::STRIKETHROUGH,
            Some("small") => Attr::DIM,
            Some("button") => Attr::INVERSE,
            _ => Attr::NONE,
        };
        if matches!(node.style("font-weight").as_deref(), Some("bold" | "700")) {
            attr |= Attr::BOLD;
        }
        if node.style("font-style").as_deref() == Some("italic") {
            attr |= Attr::ITALIC;
        }
        match node.style("text-decoration").as_deref() {
            Some("underline") => attr |= Attr::UNDERLINE,
            Some("line-through") => attr |= Attr::STRIKETHROUGH,
            _ => {}
        }
        attr
    }

    fn attributes(self) -> impl Iterator<Item = Attribute> {
        [
            (Attr::BOLD, Attribute::Bold),
            (Attr::DIM, Attribute::Dim),
            (Attr::ITALIC, Attribute::Italic),
            (Attr::UNDERLINE, Attribute::Underlined),
            (Attr::INVERSE, Attribute::Reverse),
            (Attr::STRIKETHROUGH, Attribute::CrossedOut),
        ]
        .into_iter()
        .filter(move |(flag, _)| self.contains(*flag))
        .map(|(_, attribute)| attribute)
    }
}

/// Tags that occupy their own lines.
pub fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "div" | "p" | "section" | "main" | "article" | "header" | "footer" | "nav" | "ul" | "ol" | "li"
            | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre" | "blockquote"
    )
}

// =============================================================================
// Renderer
// =============================================================================

enum Visit {
    Enter(HostNode, Attr),
    Exit { block: bool },
}

/// Prints host trees to a writer.
pub struct TerminalRenderer<W: Write> {
    out: W,
    buffer: Vec<u8>,
    styled: bool,
    current: Attr,
    at_line_start: bool,
    frames: usize,
}

impl<W: Write> TerminalRenderer<W> {
    /// Renderer emitting attribute escape codes.
    pub fn new(out: W) -> Self {
        Self::with_styling(out, true)
    }

    /// Renderer emitting text only.
    pub fn plain(out: W) -> Self {
        Self::with_styling(out, false)
    }

    fn with_styling(out: W, styled: bool) -> Self {
        Self {
            out,
            buffer: Vec::with_capacity(4096),
            styled,
            current: Attr::NONE,
            at_line_start: true,
            frames: 0,
        }
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Render the children of `root` as one frame.
    pub fn render(&mut self, root: &HostNode) -> Result<()> {
        self.buffer.clear();
        self.current = Attr::NONE;
        self.at_line_start = true;

        let mut stack: Vec<Visit> = root
            .children()
            .into_iter()
            .rev()
            .map(|child| Visit::Enter(child, Attr::NONE))
            .collect();

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(node, inherited) => match node.kind() {
                    NodeKind::Text(text) => self.print(&text, inherited)?,
                    NodeKind::Element(tag) => {
                        let block = is_block(&tag);
                        if block {
                            self.break_line()?;
                        }
                        if tag == "li" {
                            self.print("- ", inherited)?;
                        }
                        let attr = inherited | Attr::of(&node);
                        stack.push(Visit::Exit { block });
                        stack.extend(node.children().into_iter().rev().map(|child| Visit::Enter(child, attr)));
                    }
                },
                Visit::Exit { block } => {
                    if block {
                        self.break_line()?;
                    }
                }
            }
        }
        self.break_line()?;
        self.set_attr(Attr::NONE)?;

        self.out.write_all(&self.buffer)?;
        self.out.flush()?;
        self.frames += 1;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print(&mut self, text: &str, attr: Attr) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.set_attr(attr)?;
        queue!(self.buffer, Print(text))?;
        self.at_line_start = false;
        Ok(())
    }

    fn break_line(&mut self) -> io::Result<()> {
        if !self.at_line_start {
            self.set_attr(Attr::NONE)?;
            queue!(self.buffer, Print("\n"))?;
            self.at_line_start = true;
        }
        Ok(())
    }

    fn set_attr(&mut self, attr: Attr) -> io::Result<()> {
        if !self.styled || attr == self.current {
            return Ok(());
        }
        queue!(self.buffer, SetAttribute(Attribute::Reset))?;
        for attribute in attr.attributes() {
            queue!(self.buffer, SetAttribute(attribute))?;
        }
        self.current = attr;
        Ok(())
    }
}

/// Plain-text rendering of the children of `root`.
pub fn render_to_string(root: &HostNode) -> Result<String> {
    let mut renderer = TerminalRenderer::plain(Vec::new());
    renderer.render(root)?;
    Ok(String::from_utf8_lossy(&renderer.into_inner()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(tag: &str, children: &[HostNode]) -> HostNode {
        let node = HostNode::element(tag);
        for child in children {
            node.append_child(child);
        }
        node
    }

    fn root(children: &[HostNode]) -> HostNode {
        el("root", children)
    }

    #[test]
    fn test_blocks_break_lines() {
        let tree = root(&[el(
            "div",
            &[
                el("h1", &[HostNode::text("Title")]),
                el("p", &[HostNode::text("a "), el("b", &[HostNode::text("b")])]),
            ],
        )]);
        assert_eq!(render_to_string(&tree).unwrap(), "Title\na b\n");
    }

    #[test]
    fn test_list_items() {
        let tree = root(&[el(
            "ul",
            &[el("li", &[HostNode::text("one")]), el("li", &[HostNode::text("two")])],
        )]);
        assert_eq!(render_to_string(&tree).unwrap(), "- one\n- two\n");
    }

    #[test]
    fn test_inline_text_stays_on_line() {
        let tree = root(&[el("span", &[HostNode::text("x")]), HostNode::text("y")]);
        assert_eq!(render_to_string(&tree).unwrap(), "xy\n");
    }

    #[test]
    fn test_attr_from_tag_and_style() {
        let heading = HostNode::element("h2");
        assert_eq!(Attr::of(&heading), Attr::BOLD);

        let span = HostNode::element("span");
        assert_eq!(Attr::of(&span), Attr::NONE);
    }

    #[test]
    fn test_styled_output_resets_attributes() {
        let tree = root(&[el("strong", &[HostNode::text("hot")])]);
        let mut renderer = TerminalRenderer::new(Vec::new());
        renderer.render(&tree).unwrap();
        assert_eq!(renderer.frames(), 1);

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.contains("hot"));
        assert!(out.contains("\u{1b}[1m"));
        assert!(out.ends_with("\u{1b}[0m\n"));
    }

    #[test]
    fn test_empty_tree() {
        assert_eq!(render_to_string(&root(&[])).unwrap(), "");
    }
}
