//! EPUB 3 Media Overlay (SMIL) documents.
//!
//! A media overlay binds each sentence anchor of a chapter to a clip of the
//! chapter's narration audio. [`create_media_overlay`] synthesizes one from
//! timing ranges computed by an external aligner; [`parse_media_overlay`]
//! reads one back.
//!
//! # Example
//!
//! ```
//! use readalong::overlay::{create_media_overlay, SentenceRange};
//!
//! let ranges = [SentenceRange::new(5, 1.2, 3.4)];
//! let smil = create_media_overlay("book1", "chap1.xhtml", "chap1.mp3", &ranges).unwrap();
//! let smil = String::from_utf8(smil).unwrap();
//!
//! assert!(smil.contains(r#"<par id="sentence5">"#));
//! assert!(smil.contains(r#"<text src="../chap1.xhtml#sentence5"/>"#));
//! assert!(smil.contains(r#"<audio src="../chap1.mp3" clipBegin="1.2s" clipEnd="3.4s"/>"#));
//! ```

mod reader;
mod validate;

pub use reader::{parse_clock_value, parse_media_overlay};
pub use validate::{MissingAnchor, missing_anchors, validate_anchors};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use crate::error::Result;
use crate::spans::{ANCHOR_PREFIX, anchor_id};

/// SMIL 3.0 namespace.
pub const SMIL_NAMESPACE: &str = "http://www.w3.org/ns/SMIL";

/// EPUB OPS namespace, bound to the `epub:` prefix.
pub const EPUB_NAMESPACE: &str = "http://www.idpf.org/2007/ops";

/// Audio timing of one sentence, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SentenceRange {
    pub id: u32,
    pub start: f64,
    pub end: f64,
}

impl SentenceRange {
    pub fn new(id: u32, start: f64, end: f64) -> Self {
        Self { id, start, end }
    }
}

/// An audio clip reference.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioClip {
    pub src: String,
    /// Clip start in seconds (SMIL default: 0).
    pub clip_begin: f64,
    /// Clip end in seconds; `None` plays to the end of the file.
    pub clip_end: Option<f64>,
}

/// A `<par>`: one text fragment played together with one audio clip.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OverlayPar {
    pub id: Option<String>,
    pub text_src: String,
    pub audio: Option<AudioClip>,
}

impl OverlayPar {
    /// Sentence id referenced by this par, from the text fragment
    /// (`chap.xhtml#sentence12`) or else the par id.
    pub fn sentence_id(&self) -> Option<u32> {
        let from_text = self
            .text_src
            .rsplit_once('#')
            .map(|(_, fragment)| fragment);
        from_text
            .into_iter()
            .chain(self.id.as_deref())
            .find_map(|anchor| anchor.strip_prefix(ANCHOR_PREFIX)?.parse().ok())
    }
}

/// A media overlay document for one chapter.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaOverlay {
    /// Id of the top-level `<seq>`.
    pub id: Option<String>,
    /// `epub:textref` of the top-level `<seq>`.
    pub text_ref: Option<String>,
    pub pars: Vec<OverlayPar>,
}

impl MediaOverlay {
    /// Overlay for one chapter narrated by one audio file.
    ///
    /// Paths are written relative to a sibling directory (`../chapter`),
    /// ranges are kept in input order and times are not rounded.
    pub fn for_chapter(
        base: &str,
        chapter_filename: &str,
        audio_filename: &str,
        ranges: &[SentenceRange],
    ) -> Self {
        let audio_src = format!("../{audio_filename}");
        let pars = ranges
            .iter()
            .map(|range| {
                let anchor = anchor_id(range.id);
                OverlayPar {
                    text_src: format!("../{chapter_filename}#{anchor}"),
                    id: Some(anchor),
                    audio: Some(AudioClip {
                        src: audio_src.clone(),
                        clip_begin: range.start,
                        clip_end: Some(range.end),
                    }),
                }
            })
            .collect();

        Self {
            id: Some(format!("{base}_overlay")),
            text_ref: Some(format!("../{chapter_filename}")),
            pars,
        }
    }

    /// Timing ranges of every par that has audio and a sentence anchor.
    ///
    /// A clip without `clipEnd` gets `end == start`.
    pub fn ranges(&self) -> Vec<SentenceRange> {
        self.pars
            .iter()
            .filter_map(|par| {
                let id = par.sentence_id()?;
                let audio = par.audio.as_ref()?;
                let end = audio.clip_end.unwrap_or(audio.clip_begin);
                Some(SentenceRange::new(id, audio.clip_begin, end))
            })
            .collect()
    }

    /// Serialize as a SMIL 3.0 document.
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new("smil").with_attributes([
            ("xmlns", SMIL_NAMESPACE),
            ("xmlns:epub", EPUB_NAMESPACE),
            ("version", "3.0"),
        ])))?;
        writer.write_event(Event::Start(BytesStart::new("body")))?;

        let mut seq = BytesStart::new("seq");
        if let Some(id) = &self.id {
            seq.push_attribute(("id", id.as_str()));
        }
        if let Some(text_ref) = &self.text_ref {
            seq.push_attribute(("epub:textref", text_ref.as_str()));
        }
        seq.push_attribute(("epub:type", "chapter"));
        writer.write_event(Event::Start(seq))?;

        for par in &self.pars {
            let mut start = BytesStart::new("par");
            if let Some(id) = &par.id {
                start.push_attribute(("id", id.as_str()));
            }
            writer.write_event(Event::Start(start))?;

            writer.write_event(Event::Empty(
                BytesStart::new("text").with_attributes([("src", par.text_src.as_str())]),
            ))?;

            if let Some(audio) = &par.audio {
                let mut element = BytesStart::new("audio");
                element.push_attribute(("src", audio.src.as_str()));
                element.push_attribute(("clipBegin", clock_value(audio.clip_begin).as_str()));
                if let Some(end) = audio.clip_end {
                    element.push_attribute(("clipEnd", clock_value(end).as_str()));
                }
                writer.write_event(Event::Empty(element))?;
            }

            writer.write_event(Event::End(BytesEnd::new("par")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("seq")))?;
        writer.write_event(Event::End(BytesEnd::new("body")))?;
        writer.write_event(Event::End(BytesEnd::new("smil")))?;

        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Synthesize the media overlay for one chapter.
///
/// The top-level `<seq>` gets id `{base}_overlay` and references
/// `../{chapter_filename}`; each range becomes a `<par id="sentence{id}">`
/// pointing at `../{chapter_filename}#sentence{id}` and a clip of
/// `../{audio_filename}`. Ranges are not validated, sorted or deduplicated.
pub fn create_media_overlay(
    base: &str,
    chapter_filename: &str,
    audio_filename: &str,
    ranges: &[SentenceRange],
) -> Result<Vec<u8>> {
    MediaOverlay::for_chapter(base, chapter_filename, audio_filename, ranges).to_xml()
}

/// Timecount clock value in seconds, at the shortest precision that
/// round-trips.
///
/// Whole numbers keep one decimal (`3.0` -> `"3.0s"`), and magnitudes below
/// `1e-4` or from `1e16` up switch to an exponent with a sign and at least
/// two digits (`1e21` -> `"1e+21s"`, `0.000015` -> `"1.5e-05s"`).
fn clock_value(seconds: f64) -> String {
    let magnitude = seconds.abs();
    if !seconds.is_finite() {
        format!("{seconds}s")
    } else if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let sci = format!("{seconds:e}");
        let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let (sign, digits) = match exp.strip_prefix('-') {
            Some(digits) => ('-', digits),
            None => ('+', exp),
        };
        format!("{mantissa}e{sign}{digits:0>2}s")
    } else if seconds.fract() == 0.0 {
        format!("{seconds:.1}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(ranges: &[SentenceRange]) -> String {
        let bytes = create_media_overlay("book1", "chap1.xhtml", "chap1.mp3", ranges).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_single_range() {
        let smil = overlay(&[SentenceRange::new(5, 1.2, 3.4)]);

        assert!(smil.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(smil.contains(
            r#"<smil xmlns="http://www.w3.org/ns/SMIL" xmlns:epub="http://www.idpf.org/2007/ops" version="3.0">"#
        ));
        assert!(smil.contains(
            r#"<seq id="book1_overlay" epub:textref="../chap1.xhtml" epub:type="chapter">"#
        ));
        assert_eq!(smil.matches("<par ").count(), 1);
        assert!(smil.contains(r#"<par id="sentence5">"#));
        assert!(smil.contains(r#"<text src="../chap1.xhtml#sentence5"/>"#));
        assert!(smil.contains(r#"<audio src="../chap1.mp3" clipBegin="1.2s" clipEnd="3.4s"/>"#));
    }

    #[test]
    fn test_exact_layout() {
        let smil = overlay(&[SentenceRange::new(0, 0.0, 1.5)]);
        let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<smil xmlns="http://www.w3.org/ns/SMIL" xmlns:epub="http://www.idpf.org/2007/ops" version="3.0">
  <body>
    <seq id="book1_overlay" epub:textref="../chap1.xhtml" epub:type="chapter">
      <par id="sentence0">
        <text src="../chap1.xhtml#sentence0"/>
        <audio src="../chap1.mp3" clipBegin="0.0s" clipEnd="1.5s"/>
      </par>
    </seq>
  </body>
</smil>
"#;
        assert_eq!(smil, expected);
    }

    #[test]
    fn test_input_order_and_duplicates_kept() {
        let smil = overlay(&[
            SentenceRange::new(3, 5.0, 6.0),
            SentenceRange::new(1, 1.0, 2.0),
            SentenceRange::new(3, 5.0, 6.0),
        ]);

        let ids: Vec<_> = smil
            .match_indices("<par id=\"")
            .map(|(i, m)| {
                let rest = &smil[i + m.len()..];
                &rest[..rest.find('"').unwrap()]
            })
            .collect();
        assert_eq!(ids, vec!["sentence3", "sentence1", "sentence3"]);
    }

    #[test]
    fn test_precision_not_rounded() {
        let smil = overlay(&[SentenceRange::new(2, 0.123456789, 12345.000001)]);
        assert!(smil.contains(r#"clipBegin="0.123456789s""#));
        assert!(smil.contains(r#"clipEnd="12345.000001s""#));
    }

    #[test]
    fn test_clock_value_forms() {
        assert_eq!(clock_value(3.0), "3.0s");
        assert_eq!(clock_value(0.0), "0.0s");
        assert_eq!(clock_value(1.2), "1.2s");
        assert_eq!(clock_value(0.0001), "0.0001s");
        assert_eq!(clock_value(0.000015), "1.5e-05s");
        assert_eq!(clock_value(1e16), "1e+16s");
        assert_eq!(clock_value(1e21), "1e+21s");
        assert_eq!(clock_value(1.5e300), "1.5e+300s");
    }

    #[test]
    fn test_deterministic() {
        let ranges = [SentenceRange::new(1, 0.5, 1.0), SentenceRange::new(2, 1.0, 2.25)];
        assert_eq!(overlay(&ranges), overlay(&ranges));
    }

    #[test]
    fn test_filenames_escaped() {
        let bytes = create_media_overlay("b", "a&b.xhtml", "x\".mp3", &[SentenceRange::new(0, 0.0, 1.0)])
            .unwrap();
        let smil = String::from_utf8(bytes).unwrap();
        assert!(smil.contains("../a&amp;b.xhtml#sentence0"));
        assert!(smil.contains("../x&quot;.mp3"));
    }

    #[test]
    fn test_sentence_id_from_par() {
        let par = OverlayPar {
            id: Some("p1".to_string()),
            text_src: "../c.xhtml#sentence12".to_string(),
            audio: None,
        };
        assert_eq!(par.sentence_id(), Some(12));

        let par = OverlayPar {
            id: Some("sentence7".to_string()),
            text_src: "../c.xhtml#intro".to_string(),
            audio: None,
        };
        assert_eq!(par.sentence_id(), Some(7));

        let par = OverlayPar {
            id: None,
            text_src: "../c.xhtml".to_string(),
            audio: None,
        };
        assert_eq!(par.sentence_id(), None);
    }

    #[test]
    fn test_ranges_from_overlay() {
        let ranges = [SentenceRange::new(4, 0.25, 1.75), SentenceRange::new(5, 1.75, 3.0)];
        let overlay = MediaOverlay::for_chapter("b", "c.xhtml", "c.mp3", &ranges);
        assert_eq!(overlay.ranges(), ranges.to_vec());
    }
}
