//! Reading SMIL media overlay documents.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{AudioClip, MediaOverlay, OverlayPar};
use crate::error::{Error, Result};

/// Parse a media overlay document.
///
/// Nested `<seq>` elements are flattened into one list of pars in document
/// order; the id and `epub:textref` of the outermost `<seq>` are kept. Pars
/// without a `<text>` child are dropped.
pub fn parse_media_overlay(bytes: &[u8]) -> Result<MediaOverlay> {
    let content = String::from_utf8(strip_bom(bytes).to_vec())?;
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    let mut overlay = MediaOverlay::default();
    let mut saw_root = false;
    let mut saw_seq = false;
    let mut current: Option<PendingPar> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"smil" => saw_root = true,
                    b"seq" if !saw_seq => {
                        saw_seq = true;
                        overlay.id = attr_value(&e, b"id")?;
                        overlay.text_ref = attr_value(&e, b"textref")?;
                    }
                    b"par" => current = Some(PendingPar::new(attr_value(&e, b"id")?)),
                    b"text" | b"audio" => {
                        if let Some(par) = current.as_mut() {
                            par.read_child(&e)?;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"text" | b"audio" => {
                        if let Some(par) = current.as_mut() {
                            par.read_child(&e)?;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if local_name(name.as_ref()) == b"par"
                    && let Some(par) = current.take().and_then(PendingPar::finish)
                {
                    overlay.pars.push(par);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }

    if !saw_root {
        return Err(Error::InvalidOverlay("missing <smil> root element".to_string()));
    }

    Ok(overlay)
}

/// A `<par>` whose children are still being read.
struct PendingPar {
    id: Option<String>,
    text_src: Option<String>,
    audio: Option<AudioClip>,
}

impl PendingPar {
    fn new(id: Option<String>) -> Self {
        Self {
            id,
            text_src: None,
            audio: None,
        }
    }

    fn read_child(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let name = e.name();
        match local_name(name.as_ref()) {
            b"text" => self.text_src = attr_value(e, b"src")?,
            b"audio" => {
                let src = attr_value(e, b"src")?.unwrap_or_default();
                let clip_begin = match attr_value(e, b"clipBegin")? {
                    Some(v) => parse_clock_value(&v)?,
                    None => 0.0,
                };
                let clip_end = attr_value(e, b"clipEnd")?
                    .map(|v| parse_clock_value(&v))
                    .transpose()?;
                self.audio = Some(AudioClip {
                    src,
                    clip_begin,
                    clip_end,
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Option<OverlayPar> {
        Some(OverlayPar {
            id: self.id,
            text_src: self.text_src?,
            audio: self.audio,
        })
    }
}

/// Parse a SMIL clock value into seconds.
///
/// Accepts full (`01:02:03.5`) and partial (`02:03.5`) clock values and
/// timecounts with an optional `h`, `min`, `s` or `ms` metric (bare numbers
/// are seconds).
///
/// ```
/// use readalong::overlay::parse_clock_value;
///
/// assert_eq!(parse_clock_value("1.2s").unwrap(), 1.2);
/// assert_eq!(parse_clock_value("0:01:30").unwrap(), 90.0);
/// assert_eq!(parse_clock_value("250ms").unwrap(), 0.25);
/// ```
pub fn parse_clock_value(value: &str) -> Result<f64> {
    let invalid = || Error::InvalidClockValue(value.to_string());
    let v = value.trim();

    if v.contains(':') {
        let parts: Vec<&str> = v.split(':').collect();
        let (hours, minutes, seconds) = match parts.as_slice() {
            [h, m, s] => (*h, *m, *s),
            [m, s] => ("0", *m, *s),
            _ => return Err(invalid()),
        };
        let hours = parse_number(hours).ok_or_else(invalid)?;
        let minutes = parse_number(minutes).ok_or_else(invalid)?;
        let seconds = parse_number(seconds).ok_or_else(invalid)?;
        if minutes.fract() != 0.0 || hours.fract() != 0.0 {
            return Err(invalid());
        }
        return Ok(hours * 3600.0 + minutes * 60.0 + seconds);
    }

    // Milliseconds divide so that whole counts stay exact.
    let (number, multiplier, divisor) = if let Some(n) = v.strip_suffix("ms") {
        (n, 1.0, 1000.0)
    } else if let Some(n) = v.strip_suffix("min") {
        (n, 60.0, 1.0)
    } else if let Some(n) = v.strip_suffix('h') {
        (n, 3600.0, 1.0)
    } else if let Some(n) = v.strip_suffix('s') {
        (n, 1.0, 1.0)
    } else {
        (v, 1.0, 1.0)
    };

    parse_number(number)
        .map(|n| n * multiplier / divisor)
        .ok_or_else(invalid)
}

/// Unsigned decimal number: digits with at most one dot.
fn parse_number(s: &str) -> Option<f64> {
    let valid = !s.is_empty()
        && s.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && s.bytes().filter(|&b| b == b'.').count() <= 1
        && s != ".";
    if !valid {
        return None;
    }
    s.parse().ok()
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if local_name(attr.key.as_ref()) == key {
            let raw = String::from_utf8(attr.value.to_vec())?;
            let value = quick_xml::escape::unescape(&raw)
                .map_err(|err| Error::InvalidOverlay(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}
