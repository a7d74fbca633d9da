//! Sentence spans: mapping fragments onto the markup tree.
//!
//! [`SpanBuilder`] walks a block element's subtree in document order while
//! consuming fragments, recording for every fragment the pieces of text it
//! covers together with the formatting elements ([`Mark`]s) open around each
//! piece. [`serialize_spans`] turns those spans back into markup, one
//! `<span id="sentence{n}">` per fragment.
//!
//! # Example
//!
//! ```
//! use readalong::dom::parse_html;
//! use readalong::segment::segment;
//! use readalong::spans::SpanBuilder;
//!
//! let dom = parse_html("<p>Hello <b>world</b>.</p>");
//! let p = dom.find_by_tag("p").unwrap();
//! let text = dom.text_of(p);
//! let fragments = segment(&text, &["Hello world."]).unwrap();
//!
//! let spans = SpanBuilder::new(&dom, p).build(&fragments, 0).unwrap();
//! assert_eq!(spans.len(), 1);
//! assert_eq!(spans[0].nodes.len(), 3);
//! assert_eq!(spans[0].nodes[1].marks[0].tag_name(), "b");
//! ```

mod serialize;

pub use serialize::{anchor_id, replace_with_spans, serialize_spans, ANCHOR_PREFIX};

use html5ever::QualName;
use tracing::{trace, warn};

use crate::dom::{ArenaDom, ArenaNodeData, ArenaNodeId, Attribute};
use crate::error::{Error, Result};
use crate::segment::{Fragment, FragmentKind};

/// A formatting element open around a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    pub name: QualName,
    /// Attributes in source order.
    pub attrs: Vec<Attribute>,
}

impl Mark {
    pub fn new(name: QualName, attrs: Vec<Attribute>) -> Self {
        Self { name, attrs }
    }

    pub fn tag_name(&self) -> &str {
        self.name.local.as_ref()
    }

    /// Value of an attribute, by qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.qualified_name() == name)
            .map(|a| a.value.as_str())
    }

    /// A wrapper left behind by an earlier tagging pass.
    fn is_anchor_wrapper(&self) -> bool {
        self.tag_name() == "span"
            && self.attrs.len() == 1
            && self
                .attr("id")
                .and_then(|id| id.strip_prefix(ANCHOR_PREFIX))
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    }
}

/// Literal text plus the marks (outer to inner) active around it.
///
/// A childless element such as `<br/>` is recorded with empty text and the
/// element itself as the innermost mark.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
    pub marks: Vec<Mark>,
}

/// One fragment materialized against the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceSpan {
    pub id: u32,
    pub kind: FragmentKind,
    /// Fragment text; always the concatenation of `nodes`' texts.
    pub text: String,
    pub nodes: Vec<TextNode>,
}

impl SentenceSpan {
    fn new(id: u32, kind: FragmentKind) -> Self {
        Self {
            id,
            kind,
            text: String::new(),
            nodes: Vec::new(),
        }
    }

    /// Anchor id of this span (`sentence{id}`).
    pub fn anchor(&self) -> String {
        anchor_id(self.id)
    }

    pub fn is_sentence(&self) -> bool {
        self.kind == FragmentKind::Sentence
    }

    fn push_text(&mut self, text: &str, marks: Vec<Mark>) {
        self.text.push_str(text);
        self.nodes.push(TextNode {
            text: text.to_string(),
            marks,
        });
    }

    fn push_empty_element(&mut self, element: Mark, mut marks: Vec<Mark>) {
        marks.push(element);
        self.nodes.push(TextNode {
            text: String::new(),
            marks,
        });
    }
}

/// What the cursor currently points at, after descending.
enum Leaf<'d> {
    /// Unconsumed remainder of a text node.
    Text(&'d str),
    /// An element without children.
    Empty(Mark),
    /// Comments and anything else that carries no text.
    Skip,
}

/// Walk state: current leaf, offset into its text, open marks.
///
/// Wrappers from an earlier tagging pass occupy a stack slot (so exits stay
/// balanced) but are not reported as marks.
struct Cursor {
    node: ArenaNodeId,
    offset: usize,
    stack: Vec<Option<Mark>>,
}

impl Cursor {
    fn new(dom: &ArenaDom, root: ArenaNodeId) -> Self {
        let first = dom
            .get(root)
            .map(|n| n.first_child)
            .unwrap_or(ArenaNodeId::NONE);
        Self {
            node: first,
            offset: 0,
            stack: Vec::new(),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.node.is_none()
    }

    fn marks(&self) -> Vec<Mark> {
        self.stack.iter().flatten().cloned().collect()
    }

    /// Enter elements down to the first leaf, opening a mark per element.
    fn descend(&mut self, dom: &ArenaDom) {
        while let Some(node) = dom.get(self.node) {
            let ArenaNodeData::Element { name, attrs, .. } = &node.data else {
                return;
            };
            if node.first_child.is_none() {
                return;
            }
            let mark = Mark::new(name.clone(), attrs.clone());
            self.stack
                .push(if mark.is_anchor_wrapper() { None } else { Some(mark) });
            self.node = node.first_child;
            self.offset = 0;
        }
    }

    fn leaf<'d>(&self, dom: &'d ArenaDom) -> Leaf<'d> {
        match dom.get(self.node).map(|n| &n.data) {
            Some(ArenaNodeData::Text(text)) => Leaf::Text(&text[self.offset..]),
            Some(ArenaNodeData::Element { name, attrs, .. }) => {
                Leaf::Empty(Mark::new(name.clone(), attrs.clone()))
            }
            _ => Leaf::Skip,
        }
    }

    /// Move to the next node after the current one, closing the mark of
    /// every element whose subtree is left. Stops at `root`.
    fn advance(&mut self, dom: &ArenaDom, root: ArenaNodeId) {
        self.offset = 0;
        let mut current = self.node;
        loop {
            let Some(node) = dom.get(current) else {
                self.node = ArenaNodeId::NONE;
                return;
            };
            if node.next_sibling.is_some() {
                self.node = node.next_sibling;
                return;
            }
            if node.parent == root || node.parent.is_none() {
                self.node = ArenaNodeId::NONE;
                return;
            }
            self.stack.pop();
            current = node.parent;
        }
    }
}

/// Builds [`SentenceSpan`]s for one block element.
///
/// The tree is only read. Ids are `start_id, start_id + 1, ...` in fragment
/// order, one per fragment regardless of how many text nodes it spans.
pub struct SpanBuilder<'d> {
    dom: &'d ArenaDom,
    root: ArenaNodeId,
}

impl<'d> SpanBuilder<'d> {
    pub fn new(dom: &'d ArenaDom, root: ArenaNodeId) -> Self {
        Self { dom, root }
    }

    /// Consume `fragments` against the block's text leaves.
    ///
    /// Running out of tree while a fragment is still unsatisfied ends the
    /// walk normally: the current span is kept with the text the tree did
    /// cover and no later fragment produces a span. Text that does not match
    /// the fragments is an [`Error::DomDesynchronization`].
    pub fn build(&self, fragments: &[Fragment<'_>], start_id: u32) -> Result<Vec<SentenceSpan>> {
        let dom = self.dom;
        let mut cursor = Cursor::new(dom, self.root);
        let mut spans = Vec::with_capacity(fragments.len());

        for (index, fragment) in fragments.iter().enumerate() {
            let id = start_id + index as u32;
            let mut span = SentenceSpan::new(id, fragment.kind);
            let mut rest = fragment.text;

            while !rest.is_empty() {
                if cursor.is_exhausted() {
                    warn!(
                        "sentence{id}: block text ended with {} bytes of fragment left",
                        rest.len()
                    );
                    if !span.nodes.is_empty() {
                        spans.push(span);
                    }
                    return Ok(spans);
                }

                cursor.descend(dom);
                match cursor.leaf(dom) {
                    Leaf::Text(leaf) if rest.len() < leaf.len() => {
                        if !leaf.starts_with(rest) {
                            return Err(desync(id, rest, leaf));
                        }
                        span.push_text(rest, cursor.marks());
                        cursor.offset += rest.len();
                        rest = "";
                    }
                    Leaf::Text(leaf) => {
                        let Some(after) = rest.strip_prefix(leaf) else {
                            return Err(desync(id, rest, leaf));
                        };
                        if !leaf.is_empty() {
                            span.push_text(leaf, cursor.marks());
                        }
                        rest = after;
                        cursor.advance(dom, self.root);
                    }
                    Leaf::Empty(element) => {
                        span.push_empty_element(element, cursor.marks());
                        cursor.advance(dom, self.root);
                    }
                    Leaf::Skip => cursor.advance(dom, self.root),
                }
            }

            trace!("sentence{id}: {} text nodes", span.nodes.len());
            spans.push(span);
        }

        self.drain_trailing(&mut cursor, &mut spans, start_id + fragments.len() as u32)?;
        Ok(spans)
    }

    /// Attach childless elements after the last fragment to the last span.
    fn drain_trailing(
        &self,
        cursor: &mut Cursor,
        spans: &mut [SentenceSpan],
        next_id: u32,
    ) -> Result<()> {
        while !cursor.is_exhausted() {
            cursor.descend(self.dom);
            match cursor.leaf(self.dom) {
                Leaf::Text(leaf) if !leaf.is_empty() => {
                    return Err(desync(next_id, "", leaf));
                }
                Leaf::Empty(element) => {
                    if let Some(last) = spans.last_mut() {
                        last.push_empty_element(element, cursor.marks());
                    }
                }
                Leaf::Text(_) | Leaf::Skip => {}
            }
            cursor.advance(self.dom, self.root);
        }
        Ok(())
    }
}

/// Build spans for `block` from its fragments.
pub fn build_spans(
    dom: &ArenaDom,
    block: ArenaNodeId,
    fragments: &[Fragment<'_>],
    start_id: u32,
) -> Result<Vec<SentenceSpan>> {
    SpanBuilder::new(dom, block).build(fragments, start_id)
}

fn desync(span_id: u32, expected: &str, found: &str) -> Error {
    Error::DomDesynchronization {
        span_id,
        expected: expected.chars().take(40).collect(),
        found: found.chars().take(40).collect(),
    }
}
