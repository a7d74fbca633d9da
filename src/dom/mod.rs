//! Chapter markup as an arena-allocated tree.
//!
//! Markup is parsed with html5ever into an [`ArenaDom`], rewritten in place,
//! and written back out as XHTML by [`serialize_document`].
//!
//! # Example
//!
//! ```
//! use readalong::dom::{parse_html, serialize_node};
//!
//! let dom = parse_html("<p>Hello <b>world</b>.</p>");
//! let p = dom.find_by_tag("p").unwrap();
//!
//! assert_eq!(dom.text_of(p), "Hello world.");
//! assert_eq!(serialize_node(&dom, p), "<p>Hello <b>world</b>.</p>");
//! ```

mod arena;
mod serialize;
mod tree_sink;
mod xhtml;

pub use arena::{ArenaDom, ArenaNode, ArenaNodeData, ArenaNodeId, Attribute, ChildrenIter, Descendants};
pub use serialize::{serialize_document, serialize_node};

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

use tree_sink::ArenaSink;

/// Parse chapter markup into an [`ArenaDom`].
///
/// Parsing is lenient: html5ever repairs malformed markup the way browsers
/// do and always synthesizes `html`, `head` and `body`. Self-closing
/// non-void elements such as `<a id="pg12"/>` stay empty, as in XHTML.
pub fn parse_html(html: &str) -> ArenaDom {
    let html = xhtml::expand_self_closing(html);
    let sink = ArenaSink::new();
    parse_document(sink, ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_dom()
}

/// Parse chapter bytes into an [`ArenaDom`].
///
/// Handles encoding detection via the XML declaration, falling back to
/// Windows-1252 for malformed UTF-8.
pub fn parse_html_bytes(html: &[u8]) -> ArenaDom {
    let hint_encoding = crate::util::extract_xml_encoding(html);
    let html_str = crate::util::decode_text(html, hint_encoding);
    parse_html(&html_str)
}
