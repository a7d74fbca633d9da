//! Fragment segmentation of a block's flattened text.
//!
//! Tokenizer sentences are located in the block text left to right and the
//! text between them is kept as gap fragments, so the fragments always
//! concatenate back to the input.

use memchr::memmem;
use tracing::trace;

use crate::error::{Error, Result};

/// Whether a fragment came from the tokenizer or sits between sentences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum FragmentKind {
    Sentence,
    Gap,
}

/// A slice of block text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a> {
    pub kind: FragmentKind,
    pub text: &'a str,
    /// Byte offset of `text` within the block text.
    pub offset: usize,
}

impl<'a> Fragment<'a> {
    fn new(kind: FragmentKind, text: &'a str, offset: usize) -> Self {
        Self { kind, text, offset }
    }
}

/// Split `text` into sentence and gap fragments.
///
/// Each sentence is searched for starting at the end of the previous match.
/// Empty sentences are ignored. A sentence that cannot be found is a
/// [`Error::TokenizationMismatch`].
///
/// # Example
///
/// ```
/// use readalong::segment::segment;
///
/// let fragments = segment("Hello world. Bye now.", &["Hello world.", "Bye now."]).unwrap();
/// let texts: Vec<_> = fragments.iter().map(|f| f.text).collect();
/// assert_eq!(texts, ["Hello world.", " ", "Bye now."]);
/// ```
pub fn segment<'a, S: AsRef<str>>(text: &'a str, sentences: &[S]) -> Result<Vec<Fragment<'a>>> {
    let mut fragments = Vec::with_capacity(sentences.len() * 2 + 1);
    let mut last_end = 0;

    for sentence in sentences {
        let sentence = sentence.as_ref();
        if sentence.is_empty() {
            trace!("skipping empty sentence at byte {last_end}");
            continue;
        }

        let start = memmem::find(&text.as_bytes()[last_end..], sentence.as_bytes())
            .map(|pos| last_end + pos)
            .ok_or_else(|| Error::TokenizationMismatch {
                sentence: sentence.to_string(),
                offset: last_end,
            })?;

        if start > last_end {
            fragments.push(Fragment::new(
                FragmentKind::Gap,
                &text[last_end..start],
                last_end,
            ));
        }

        let end = start + sentence.len();
        fragments.push(Fragment::new(
            FragmentKind::Sentence,
            &text[start..end],
            start,
        ));
        last_end = end;
    }

    if text.len() > last_end {
        fragments.push(Fragment::new(FragmentKind::Gap, &text[last_end..], last_end));
    }

    Ok(fragments)
}
