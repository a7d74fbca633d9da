//! XHTML syntax the HTML tree builder does not understand.
//!
//! Chapters are XHTML, where `<a id="pg12"/>` is a complete empty element.
//! The HTML tree builder reads it as a start tag instead, so the element
//! swallows the rest of its block and gets reopened in the next one.

use std::borrow::Cow;

use memchr::{memchr, memmem};

use super::serialize::VOID_ELEMENTS;

/// Elements whose content is not scanned for tags.
const TEXT_ONLY_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Rewrite self-closing non-void tags as an explicit start/end pair.
///
/// `<a id="x"/>` becomes `<a id="x"></a>`. Void elements, comments, CDATA
/// sections, declarations, processing instructions, quoted attribute values
/// and the content of text-only elements are left as they are. Returns the
/// input unchanged when nothing needed rewriting.
pub(crate) fn expand_self_closing(html: &str) -> Cow<'_, str> {
    let bytes = html.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut pos = 0;
    let mut text_only: Option<&'static str> = None;

    while let Some(offset) = memchr(b'<', &bytes[pos..]) {
        let start = pos + offset;
        let rest = &bytes[start..];

        if let Some(tag) = text_only {
            if is_end_tag(rest, tag) {
                text_only = None;
            }
            pos = start + 1;
            continue;
        }

        let skip_to = if rest.starts_with(b"<!--") {
            Some(find_after(bytes, start + 4, b"-->"))
        } else if rest.starts_with(b"<![CDATA[") {
            Some(find_after(bytes, start + 9, b"]]>"))
        } else if rest.starts_with(b"<!") || rest.starts_with(b"<?") {
            Some(find_after(bytes, start + 2, b">"))
        } else {
            None
        };
        if let Some(next) = skip_to {
            pos = next;
            continue;
        }

        let name_len = tag_name_len(&rest[1..]);
        if name_len == 0 {
            pos = start + 1;
            continue;
        }
        let name = &html[start + 1..start + 1 + name_len];

        let Some(end) = tag_end(bytes, start + 1 + name_len) else {
            break;
        };
        let lower = name.to_ascii_lowercase();

        if bytes[end - 1] == b'/' {
            if !VOID_ELEMENTS.contains(&lower.as_str()) {
                out.push_str(&html[copied..end - 1]);
                out.push_str("></");
                out.push_str(name);
                out.push('>');
                copied = end + 1;
            }
        } else {
            text_only = TEXT_ONLY_ELEMENTS.iter().copied().find(|t| *t == lower);
        }
        pos = end + 1;
    }

    if copied == 0 {
        Cow::Borrowed(html)
    } else {
        out.push_str(&html[copied..]);
        Cow::Owned(out)
    }
}

/// Length of the tag name at the start of `bytes`, or 0 if it is not one.
fn tag_name_len(bytes: &[u8]) -> usize {
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() => bytes
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.'))
            .count(),
        _ => 0,
    }
}

/// Index of the `>` closing the tag, skipping quoted attribute values.
fn tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote = None;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
    }
    None
}

/// Position just past the next `needle` at or after `from`, or the end.
fn find_after(bytes: &[u8], from: usize, needle: &[u8]) -> usize {
    let from = from.min(bytes.len());
    memmem::find(&bytes[from..], needle).map_or(bytes.len(), |i| from + i + needle.len())
}

fn is_end_tag(bytes: &[u8], tag: &str) -> bool {
    bytes.starts_with(b"</")
        && bytes
            .get(2..2 + tag.len())
            .is_some_and(|name| name.eq_ignore_ascii_case(tag.as_bytes()))
}
