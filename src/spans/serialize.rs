//! Rebuilding block content from sentence spans.

use std::collections::HashSet;

use html5ever::{LocalName, QualName, local_name, ns};

use super::SentenceSpan;
use crate::dom::{ArenaDom, ArenaNodeId, Attribute};

/// Prefix of every sentence anchor id.
pub const ANCHOR_PREFIX: &str = "sentence";

/// Anchor id for a span id: `sentence{id}`.
pub fn anchor_id(id: u32) -> String {
    format!("{ANCHOR_PREFIX}{id}")
}

/// Create one anchored `<span>` per sentence span, with `separator` text
/// between consecutive spans.
///
/// The returned nodes are not attached anywhere yet. An `id` carried by a
/// mark is only reproduced the first time that element is rebuilt, so ids
/// stay unique when a formatting element covers several sentences.
pub fn serialize_spans(
    dom: &mut ArenaDom,
    spans: &[SentenceSpan],
    separator: &str,
) -> Vec<ArenaNodeId> {
    let mut out = Vec::with_capacity(spans.len() * 2);
    let mut seen_ids = HashSet::new();

    for (i, span) in spans.iter().enumerate() {
        if i > 0 && !separator.is_empty() {
            out.push(dom.create_text(separator.to_string()));
        }

        let wrapper = dom.create_element(
            QualName::new(None, ns!(html), local_name!("span")),
            vec![Attribute {
                name: QualName::new(None, ns!(), LocalName::from("id")),
                value: span.anchor(),
            }],
        );

        for node in &span.nodes {
            let mut parent = wrapper;
            for mark in &node.marks {
                let attrs = mark
                    .attrs
                    .iter()
                    .filter(|a| a.name.local.as_ref() != "id" || seen_ids.insert(a.value.clone()))
                    .cloned()
                    .collect();
                let element = dom.create_element(mark.name.clone(), attrs);
                dom.append(parent, element);
                parent = element;
            }
            if !node.text.is_empty() {
                let text = dom.create_text(node.text.clone());
                dom.append(parent, text);
            }
        }

        out.push(wrapper);
    }

    out
}

/// Replace the children of `block` with the serialized spans.
///
/// Siblings and ancestors of `block` are left untouched.
pub fn replace_with_spans(
    dom: &mut ArenaDom,
    block: ArenaNodeId,
    spans: &[SentenceSpan],
    separator: &str,
) {
    // Clear first so ids carried over from the old children map to the
    // rebuilt elements.
    dom.clear_children(block);
    let nodes = serialize_spans(dom, spans, separator);
    for node in nodes {
        dom.append(block, node);
    }
}
