//! XHTML serialization of an [`ArenaDom`].

use html5ever::ns;

use super::arena::{ArenaDom, ArenaNodeData, ArenaNodeId};

/// HTML elements that never have content and are written self-closing.
pub(super) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Serialize a whole document, including doctype and XML declaration.
pub fn serialize_document(dom: &ArenaDom) -> String {
    let mut out = String::new();
    for child in dom.children(dom.document()) {
        write_node(dom, child, &mut out);
        if !dom.is_element(child) {
            out.push('\n');
        }
    }
    out
}

/// Serialize a single node and its subtree.
pub fn serialize_node(dom: &ArenaDom, id: ArenaNodeId) -> String {
    let mut out = String::new();
    write_node(dom, id, &mut out);
    out
}

fn write_node(dom: &ArenaDom, id: ArenaNodeId, out: &mut String) {
    let Some(node) = dom.get(id) else {
        return;
    };

    match &node.data {
        ArenaNodeData::Document => {
            for child in dom.children(id) {
                write_node(dom, child, out);
            }
        }
        ArenaNodeData::Element { name, attrs, .. } => {
            let tag = name.local.as_ref();
            out.push('<');
            out.push_str(tag);
            for attr in attrs {
                out.push(' ');
                out.push_str(&attr.qualified_name());
                out.push_str("=\"");
                escape_into(&attr.value, true, out);
                out.push('"');
            }

            if node.first_child.is_none() {
                // Foreign (SVG, MathML) elements may self-close; HTML ones
                // only when void.
                if name.ns != ns!(html) || VOID_ELEMENTS.contains(&tag) {
                    out.push_str("/>");
                } else {
                    out.push_str("></");
                    out.push_str(tag);
                    out.push('>');
                }
                return;
            }

            out.push('>');
            let raw = name.ns == ns!(html) && RAW_TEXT_ELEMENTS.contains(&tag);
            for child in dom.children(id) {
                match dom.text_content(child) {
                    Some(text) if raw => out.push_str(text),
                    _ => write_node(dom, child, out),
                }
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        ArenaNodeData::Text(text) => escape_into(text, false, out),
        ArenaNodeData::Comment(text) => {
            // The HTML tokenizer turns `<?xml ...?>` into a bogus comment
            // holding `?xml ...?`.
            if text.len() >= 2 && text.starts_with('?') && text.ends_with('?') {
                out.push('<');
                out.push_str(text);
                out.push('>');
            } else {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
        }
        ArenaNodeData::Doctype {
            name,
            public_id,
            system_id,
        } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            if !public_id.is_empty() {
                out.push_str(" PUBLIC \"");
                out.push_str(public_id);
                out.push('"');
                if !system_id.is_empty() {
                    out.push_str(" \"");
                    out.push_str(system_id);
                    out.push('"');
                }
            } else if !system_id.is_empty() {
                out.push_str(" SYSTEM \"");
                out.push_str(system_id);
                out.push('"');
            }
            out.push('>');
        }
    }
}

fn escape_into(s: &str, in_attribute: bool, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&#160;"),
            _ => out.push(c),
        }
    }
}
