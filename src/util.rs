//! Text decoding and normalization helpers.

use std::borrow::Cow;

/// Decode chapter bytes to a string.
///
/// Tries UTF-8 first (BOM handled by encoding_rs), then the encoding named
/// in the XML declaration, then Windows-1252, which is what most
/// mislabelled old ebooks turn out to be.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract the `encoding` value from an XML declaration, if the document
/// starts with one.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    // The declaration must be at the very start; 100 bytes is plenty.
    let prefix = &bytes[..bytes.len().min(100)];

    let xml_start = memchr::memmem::find(prefix, b"<?xml")?;
    let after_xml = &prefix[xml_start..];
    let decl_end = memchr::memmem::find(after_xml, b"?>").unwrap_or(after_xml.len());
    let decl = &after_xml[..decl_end];

    let enc_pos = decl
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &decl[enc_pos + 9..];

    let quote = *after_enc.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = after_enc[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&after_enc[1..value_end]).ok()
}

/// Collapse every run of spaces and newlines to a single space.
///
/// Only `' '` and `'\n'` are folded; tabs and non-breaking spaces are kept.
pub fn collapse_whitespace(text: &str) -> Cow<'_, str> {
    let needs_work = text
        .as_bytes()
        .windows(2)
        .any(|w| matches!(w, [b' ' | b'\n', b' ' | b'\n']))
        || text.contains('\n');
    if !needs_work {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c == ' ' || c == '\n' {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_xml_encoding() {
        assert_eq!(
            extract_xml_encoding(br#"<?xml version="1.0" encoding="windows-1252"?><html/>"#),
            Some("windows-1252")
        );
        assert_eq!(
            extract_xml_encoding(b"<?xml version='1.0' encoding='UTF-8'?>"),
            Some("UTF-8")
        );
        assert_eq!(extract_xml_encoding(br#"<?xml version="1.0"?>"#), None);
        assert_eq!(extract_xml_encoding(b"<html></html>"), None);
    }

    #[test]
    fn test_decode_text_utf8_borrowed() {
        let decoded = decode_text("plain".as_bytes(), None);
        assert!(matches!(decoded, Cow::Borrowed("plain")));
    }

    #[test]
    fn test_decode_text_uses_hint() {
        // "é" in ISO-8859-1
        let decoded = decode_text(b"caf\xe9", Some("iso-8859-1"));
        assert_eq!(decoded, "caf\u{e9}");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a  b\n\n c"), "a b c");
        assert_eq!(collapse_whitespace("a\nb"), "a b");
        assert_eq!(collapse_whitespace("a\tb"), "a\tb");
        assert!(matches!(collapse_whitespace("a b"), Cow::Borrowed(_)));
    }
}
