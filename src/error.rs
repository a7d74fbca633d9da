//! Error types for readalong operations.

use thiserror::Error;

/// Errors that can occur while tagging chapters or handling media overlays.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The tokenizer returned a sentence that is not a literal substring of
    /// the remaining block text.
    #[error("Tokenization mismatch: sentence {sentence:?} not found at or after byte {offset}")]
    TokenizationMismatch { sentence: String, offset: usize },

    /// The flattened text used for segmentation diverged from the text
    /// actually present in the markup tree.
    #[error("DOM desynchronized at sentence{span_id}: expected {expected:?}, found {found:?}")]
    DomDesynchronization {
        span_id: u32,
        expected: String,
        found: String,
    },

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("Invalid media overlay: {0}")]
    InvalidOverlay(String),

    #[error("Invalid clock value: {0:?}")]
    InvalidClockValue(String),
}

pub type Result<T> = std::result::Result<T, Error>;
