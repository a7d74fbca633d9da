//! # readalong
//!
//! Sentence anchoring and EPUB 3 Media Overlay synthesis for read-aloud
//! ebooks.
//!
//! ## Features
//!
//! - Wrap every sentence of a chapter's text blocks in an anchored
//!   `<span id="sentenceN">`, preserving inline formatting
//! - Pluggable sentence tokenizer with a per-run memo cache
//! - Emit SMIL media overlays from per-sentence audio timings
//! - Read existing overlays back and check their anchors against a chapter
//!
//! ## Quick Start
//!
//! ```
//! use readalong::{tag_sentences, create_media_overlay, SentenceCache, SentenceRange,
//!     TagOptions, TerminalPunctuation};
//!
//! let html = "<html><body><p>Hello <b>world</b>. Bye now.</p></body></html>";
//! let mut cache = SentenceCache::new();
//! let tagged = tag_sentences(html, &TerminalPunctuation, &mut cache, &TagOptions::default()).unwrap();
//!
//! let sentences: Vec<_> = tagged.sentences().map(|s| s.text).collect();
//! assert_eq!(sentences, ["Hello world.", "Bye now."]);
//!
//! // Timings come from an external aligner.
//! let ranges = [SentenceRange::new(0, 0.0, 1.1), SentenceRange::new(2, 1.1, 2.0)];
//! let smil = create_media_overlay("book", "ch1.xhtml", "ch1.mp3", &ranges).unwrap();
//! assert!(String::from_utf8(smil).unwrap().contains("#sentence2"));
//! ```

pub mod chapter;
pub mod dom;
pub mod error;
pub mod overlay;
pub mod segment;
pub mod spans;
pub mod tokenize;
pub(crate) mod util;

pub use chapter::{Chapter, MemoryChapter, SentenceRecord, TagOptions, TaggedChapter, tag_chapter, tag_sentences};
pub use error::{Error, Result};
pub use overlay::{MediaOverlay, SentenceRange, create_media_overlay, parse_media_overlay};
pub use segment::{Fragment, FragmentKind, segment};
pub use spans::{Mark, SentenceSpan, TextNode};
pub use tokenize::{SentenceCache, TerminalPunctuation, Tokenizer};
