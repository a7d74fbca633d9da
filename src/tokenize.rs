//! Sentence tokenizer seam and per-run memoization.
//!
//! Tokenization proper is an external concern: anything implementing
//! [`Tokenizer`] can be plugged in, including a plain closure. The contract is
//! that every returned sentence is a literal substring of the input and that
//! sentences come back in left-to-right order.

use std::collections::HashMap;

/// Splits a block of text into sentences.
pub trait Tokenizer {
    /// Return the sentences of `text`, in order, as literal substrings.
    fn sentences(&self, text: &str) -> Vec<String>;
}

impl<F> Tokenizer for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn sentences(&self, text: &str) -> Vec<String> {
        self(text)
    }
}

/// Naive tokenizer that breaks after `.`, `!` or `?` followed by whitespace.
///
/// Closing quotes and brackets directly after the terminator stay with the
/// sentence. Abbreviations ("Mr. Smith") are split; plug in a real tokenizer
/// where that matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPunctuation;

impl Tokenizer for TerminalPunctuation {
    fn sentences(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut start: Option<usize> = None;
        let mut chars = text.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            if start.is_none() {
                if c.is_whitespace() {
                    continue;
                }
                start = Some(i);
            }

            if !matches!(c, '.' | '!' | '?') {
                continue;
            }

            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if matches!(next, '.' | '!' | '?' | '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}') {
                    end = j + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }

            let at_boundary = chars.peek().is_none_or(|&(_, next)| next.is_whitespace());
            if at_boundary && let Some(s) = start.take() {
                sentences.push(text[s..end].to_string());
            }
        }

        if let Some(s) = start {
            let tail = text[s..].trim_end();
            if !tail.is_empty() {
                sentences.push(tail.to_string());
            }
        }

        sentences
    }
}

/// Memoizes tokenizer output by exact input text.
///
/// Owned by the caller for the duration of a run and never evicts; the
/// distinct text volume is bounded by one book. Use one cache per worker when
/// tagging chapters in parallel.
#[derive(Debug, Default)]
pub struct SentenceCache {
    entries: HashMap<String, Vec<String>>,
    hits: u64,
    misses: u64,
}

impl SentenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sentences of `text`, computed by `tokenizer` on first sight.
    pub fn sentences<T>(&mut self, tokenizer: &T, text: &str) -> &[String]
    where
        T: Tokenizer + ?Sized,
    {
        if self.entries.contains_key(text) {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.entries
                .insert(text.to_string(), tokenizer.sentences(text));
        }
        &self.entries[text]
    }

    /// Number of distinct texts cached.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}
