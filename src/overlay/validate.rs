//! Cross-checking overlay ranges against tagged chapter markup.

use std::fmt;

use tracing::warn;

use super::SentenceRange;
use crate::dom::{ArenaDom, parse_html_bytes};
use crate::spans::anchor_id;

/// A range whose sentence anchor does not exist in the chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingAnchor {
    pub id: u32,
    pub anchor: String,
}

impl fmt::Display for MissingAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no element with id {:?} for sentence {}", self.anchor, self.id)
    }
}

/// Ranges in `ranges` whose `sentence{id}` anchor is absent from `dom`.
pub fn missing_anchors(dom: &ArenaDom, ranges: &[SentenceRange]) -> Vec<MissingAnchor> {
    let mut missing = Vec::new();
    for range in ranges {
        let anchor = anchor_id(range.id);
        if dom.get_by_id(&anchor).is_none() {
            warn!(id = range.id, %anchor, "overlay references a missing sentence anchor");
            missing.push(MissingAnchor { id: range.id, anchor });
        }
    }
    missing
}

/// Parse chapter markup and report ranges without a matching anchor.
pub fn validate_anchors(markup: &[u8], ranges: &[SentenceRange]) -> Vec<MissingAnchor> {
    let dom = parse_html_bytes(markup);
    missing_anchors(&dom, ranges)
}
