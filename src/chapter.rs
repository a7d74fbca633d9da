//! Tagging every text block of a chapter with sentence anchors.
//!
//! # Example
//!
//! ```
//! use readalong::chapter::{tag_sentences, TagOptions};
//! use readalong::tokenize::{SentenceCache, TerminalPunctuation};
//!
//! let html = "<html><body><h1>One</h1><p>Hello <b>world</b>. Bye now.</p></body></html>";
//! let mut cache = SentenceCache::new();
//! let tagged = tag_sentences(html, &TerminalPunctuation, &mut cache, &TagOptions::default()).unwrap();
//!
//! assert_eq!(tagged.next_id, 4);
//! assert!(tagged.markup.contains(r#"<h1><span id="sentence0">One</span></h1>"#));
//! assert!(tagged.markup.contains(r#"<span id="sentence1">Hello <b>world</b>.</span>"#));
//! ```

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::dom::{ArenaDom, ArenaNodeId, parse_html_bytes, serialize_document};
use crate::error::{Error, Result};
use crate::segment::segment;
use crate::spans::{SentenceSpan, SpanBuilder, replace_with_spans};
use crate::tokenize::{SentenceCache, Tokenizer};
use crate::util::collapse_whitespace;

/// Default block elements whose text is split into sentences.
pub const DEFAULT_BLOCK_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "p"];

/// Options for a tagging pass.
#[derive(Debug, Clone)]
pub struct TagOptions {
    /// Element names treated as text blocks. Blocks nested inside another
    /// block are handled as part of the outer one.
    pub block_tags: Vec<String>,
    /// Text inserted between consecutive sentence spans.
    pub separator: String,
    /// Id of the first span. Pass the previous chapter's `next_id` to keep
    /// ids unique across a book.
    pub start_id: u32,
}

impl Default for TagOptions {
    fn default() -> Self {
        Self {
            block_tags: DEFAULT_BLOCK_TAGS.iter().map(|t| t.to_string()).collect(),
            separator: " ".to_string(),
            start_id: 0,
        }
    }
}

impl TagOptions {
    pub fn with_start_id(mut self, start_id: u32) -> Self {
        self.start_id = start_id;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_block_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.block_tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Result of tagging one chapter.
#[derive(Debug, Clone)]
pub struct TaggedChapter {
    /// Rewritten chapter markup.
    pub markup: String,
    /// Every span created, in id order.
    pub spans: Vec<SentenceSpan>,
    /// First id not used by this chapter.
    pub next_id: u32,
}

/// A sentence as handed to an external aligner.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SentenceRecord {
    pub id: u32,
    pub text: String,
}

impl TaggedChapter {
    /// Sentence spans (gaps excluded) with whitespace runs collapsed.
    pub fn sentences(&self) -> impl Iterator<Item = SentenceRecord> + '_ {
        self.spans
            .iter()
            .filter(|span| span.is_sentence())
            .map(|span| SentenceRecord {
                id: span.id,
                text: collapse_whitespace(&span.text).into_owned(),
            })
    }
}

/// A chapter document supplied by the container layer.
pub trait Chapter {
    /// File name of the chapter, as referenced from overlays.
    fn file_name(&self) -> &str;
    /// Raw chapter markup.
    fn content(&self) -> &[u8];
    /// Replace the raw chapter markup.
    fn set_content(&mut self, content: Vec<u8>);
}

/// A chapter held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryChapter {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl MemoryChapter {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Read a chapter from disk. The file name is the path's last component.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { file_name, content })
    }
}

impl Chapter for MemoryChapter {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn content(&self) -> &[u8] {
        &self.content
    }

    fn set_content(&mut self, content: Vec<u8>) {
        self.content = content;
    }
}

/// Tag a chapter in place and return the spans it received.
pub fn tag_chapter<C, T>(
    chapter: &mut C,
    tokenizer: &T,
    cache: &mut SentenceCache,
    options: &TagOptions,
) -> Result<TaggedChapter>
where
    C: Chapter + ?Sized,
    T: Tokenizer + ?Sized,
{
    let mut dom = parse_html_bytes(chapter.content());
    let tagged = tag_parsed(&mut dom, tokenizer, cache, options)?;
    debug!(
        "{}: {} spans, next id {}",
        chapter.file_name(),
        tagged.spans.len(),
        tagged.next_id
    );
    chapter.set_content(tagged.markup.clone().into_bytes());
    Ok(tagged)
}

/// Tag chapter markup, returning the rewritten markup and its spans.
pub fn tag_sentences<T>(
    markup: &str,
    tokenizer: &T,
    cache: &mut SentenceCache,
    options: &TagOptions,
) -> Result<TaggedChapter>
where
    T: Tokenizer + ?Sized,
{
    let mut dom = parse_html_bytes(markup.as_bytes());
    tag_parsed(&mut dom, tokenizer, cache, options)
}

fn tag_parsed<T>(
    dom: &mut ArenaDom,
    tokenizer: &T,
    cache: &mut SentenceCache,
    options: &TagOptions,
) -> Result<TaggedChapter>
where
    T: Tokenizer + ?Sized,
{
    let spans = tag_dom(dom, tokenizer, cache, options)?;
    let next_id = options.start_id + spans.len() as u32;
    Ok(TaggedChapter {
        markup: serialize_document(dom),
        spans,
        next_id,
    })
}

/// Tag every text block below the document body.
///
/// Each block is segmented and rebuilt from its own text; ids run on from
/// `options.start_id` across blocks. Blocks without text are left alone.
pub fn tag_dom<T>(
    dom: &mut ArenaDom,
    tokenizer: &T,
    cache: &mut SentenceCache,
    options: &TagOptions,
) -> Result<Vec<SentenceSpan>>
where
    T: Tokenizer + ?Sized,
{
    let body = dom
        .find_by_tag("body")
        .ok_or_else(|| Error::MissingElement("body".to_string()))?;
    let blocks = text_blocks(dom, body, &options.block_tags);

    let mut spans = Vec::new();
    let mut next_id = options.start_id;

    for block in blocks {
        let text = dom.text_of(block);
        let sentences = cache.sentences(tokenizer, &text);
        let fragments = segment(&text, sentences)?;
        let block_spans = SpanBuilder::new(dom, block).build(&fragments, next_id)?;
        if block_spans.is_empty() {
            continue;
        }

        replace_with_spans(dom, block, &block_spans, &options.separator);
        next_id += block_spans.len() as u32;
        spans.extend(block_spans);
    }

    debug!(
        "tagged {} spans ({} tokenizer cache entries)",
        spans.len(),
        cache.len()
    );
    Ok(spans)
}

/// Outermost elements below `root` whose name is in `tags`, in document
/// order.
fn text_blocks(dom: &ArenaDom, root: ArenaNodeId, tags: &[String]) -> Vec<ArenaNodeId> {
    let mut blocks = Vec::new();
    let mut selected = HashSet::new();

    for id in dom.descendants(root) {
        let is_block = dom
            .element_name(id)
            .is_some_and(|name| tags.iter().any(|t| t.as_str() == name.as_ref()));
        if !is_block {
            continue;
        }

        let mut ancestor = dom.get(id).map(|n| n.parent).unwrap_or(ArenaNodeId::NONE);
        let mut nested = false;
        while ancestor.is_some() && ancestor != root {
            if selected.contains(&ancestor) {
                nested = true;
                break;
            }
            ancestor = dom.get(ancestor).map(|n| n.parent).unwrap_or(ArenaNodeId::NONE);
        }

        if !nested {
            selected.insert(id);
            blocks.push(id);
        }
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::tokenize::TerminalPunctuation;

    fn tag(html: &str, options: &TagOptions) -> TaggedChapter {
        let mut cache = SentenceCache::new();
        tag_sentences(html, &TerminalPunctuation, &mut cache, options).unwrap()
    }

    #[test]
    fn test_each_block_uses_its_own_text() {
        let tagged = tag(
            "<body><p>First block.</p><p>Second block.</p><p>Third.</p></body>",
            &TagOptions::default(),
        );

        let texts: Vec<_> = tagged.spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["First block.", "Second block.", "Third."]);
        assert!(tagged.markup.contains(r#"<p><span id="sentence1">Second block.</span></p>"#));
    }

    #[test]
    fn test_ids_continue_from_start_id() {
        let tagged = tag(
            "<body><h2>Head</h2><p>A. B.</p></body>",
            &TagOptions::default().with_start_id(100),
        );

        let ids: Vec<_> = tagged.spans.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![100, 101, 102, 103]);
        assert_eq!(tagged.next_id, 104);
    }

    #[test]
    fn test_non_block_content_untouched() {
        let tagged = tag(
            r#"<body><div class="fig"><img src="a.png"/></div><p>Text.</p></body>"#,
            &TagOptions::default(),
        );
        assert!(tagged.markup.contains(r#"<div class="fig"><img src="a.png"/></div>"#));
    }

    #[test]
    fn test_empty_block_left_alone() {
        let tagged = tag(
            r#"<body><p><img src="a.png"/></p><p>Text.</p></body>"#,
            &TagOptions::default(),
        );
        assert!(tagged.markup.contains(r#"<p><img src="a.png"/></p>"#));
        assert_eq!(tagged.spans[0].id, 0);
    }

    #[test]
    fn test_nested_blocks_handled_by_outer() {
        let dom = parse_html("<body><blockquote><p>Inner.</p></blockquote><p>Outer.</p></body>");
        let body = dom.find_by_tag("body").unwrap();
        let tags = vec!["blockquote".to_string(), "p".to_string()];

        let blocks = text_blocks(&dom, body, &tags);
        let names: Vec<_> = blocks
            .iter()
            .map(|&b| dom.element_name(b).unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["blockquote", "p"]);
    }

    #[test]
    fn test_custom_block_tags() {
        let tagged = tag(
            "<body><ul><li>Item one.</li></ul><p>Skipped.</p></body>",
            &TagOptions::default().with_block_tags(["li"]),
        );
        assert_eq!(tagged.spans.len(), 1);
        assert!(tagged.markup.contains(r#"<li><span id="sentence0">Item one.</span></li>"#));
        assert!(tagged.markup.contains("<p>Skipped.</p>"));
    }

    #[test]
    fn test_sentences_for_aligner() {
        let tagged = tag(
            "<body><p>One\n  line.  Two.</p></body>",
            &TagOptions::default(),
        );

        let sentences: Vec<_> = tagged.sentences().collect();
        assert_eq!(
            sentences,
            vec![
                SentenceRecord { id: 0, text: "One line.".to_string() },
                SentenceRecord { id: 2, text: "Two.".to_string() },
            ]
        );
    }

    #[test]
    fn test_tokenizer_mismatch_propagates() {
        let normalizing = |text: &str| vec![text.replace('\n', " ")];
        let mut cache = SentenceCache::new();
        let err = tag_sentences(
            "<body><p>Line\nbreak.</p></body>",
            &normalizing,
            &mut cache,
            &TagOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::TokenizationMismatch { .. }));
    }

    #[test]
    fn test_tag_chapter_rewrites_content() {
        let mut chapter = MemoryChapter::new("chap1.xhtml", "<body><p>Hi there.</p></body>");
        let mut cache = SentenceCache::new();

        let tagged =
            tag_chapter(&mut chapter, &TerminalPunctuation, &mut cache, &TagOptions::default())
                .unwrap();

        assert_eq!(chapter.file_name(), "chap1.xhtml");
        assert_eq!(chapter.content(), tagged.markup.as_bytes());
        let content = String::from_utf8(chapter.content).unwrap();
        assert!(content.contains(r#"<span id="sentence0">Hi there.</span>"#));
    }

    #[test]
    fn test_cache_shared_across_chapters() {
        let mut cache = SentenceCache::new();
        let options = TagOptions::default();
        let html = "<body><p>Same text.</p></body>";

        tag_sentences(html, &TerminalPunctuation, &mut cache, &options).unwrap();
        tag_sentences(html, &TerminalPunctuation, &mut cache, &options).unwrap();

        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);
    }
}
