//! Media overlay synthesis, reading and anchor validation.

use readalong::overlay::{
    MediaOverlay, MissingAnchor, missing_anchors, parse_clock_value, validate_anchors,
};
use readalong::{
    Error, SentenceCache, SentenceRange, TagOptions, TerminalPunctuation, create_media_overlay,
    parse_media_overlay, tag_sentences,
};

const CHAPTER: &str = "<html><body><h1>Loomings</h1>\
<p>Call me Ishmael. Some years ago, never mind how long precisely, I thought I would sail about.</p>\
</body></html>";

#[test]
fn test_single_range_document() {
    let smil = create_media_overlay("book1", "chap1.xhtml", "chap1.mp3", &[SentenceRange::new(5, 1.2, 3.4)])
        .unwrap();

    let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<smil xmlns="http://www.w3.org/ns/SMIL" xmlns:epub="http://www.idpf.org/2007/ops" version="3.0">
  <body>
    <seq id="book1_overlay" epub:textref="../chap1.xhtml" epub:type="chapter">
      <par id="sentence5">
        <text src="../chap1.xhtml#sentence5"/>
        <audio src="../chap1.mp3" clipBegin="1.2s" clipEnd="3.4s"/>
      </par>
    </seq>
  </body>
</smil>
"#;
    assert_eq!(String::from_utf8(smil).unwrap(), expected);
}

#[test]
fn test_ranges_kept_in_input_order() {
    let ranges = [
        SentenceRange::new(3, 4.0, 5.0),
        SentenceRange::new(1, 0.0, 2.5),
        SentenceRange::new(2, 2.5, 4.0),
    ];
    let smil = create_media_overlay("b", "c.xhtml", "c.mp3", &ranges).unwrap();
    let smil = String::from_utf8(smil).unwrap();

    let positions: Vec<_> = ["sentence3", "sentence1", "sentence2"]
        .iter()
        .map(|id| smil.find(&format!("<par id=\"{id}\">")).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(smil.contains(r#"clipBegin="4.0s" clipEnd="5.0s""#));
    assert!(smil.contains(r#"clipBegin="0.0s" clipEnd="2.5s""#));
}

#[test]
fn test_empty_ranges() {
    let smil = create_media_overlay("b", "c.xhtml", "c.mp3", &[]).unwrap();
    let overlay = parse_media_overlay(&smil).unwrap();
    assert!(overlay.pars.is_empty());
    assert_eq!(overlay.id.as_deref(), Some("b_overlay"));
}

#[test]
fn test_file_names_are_escaped() {
    let smil = create_media_overlay("a&b", "ch \"1\".xhtml", "a<b>.mp3", &[SentenceRange::new(0, 0.0, 1.0)])
        .unwrap();
    let text = String::from_utf8(smil.clone()).unwrap();
    assert!(text.contains("a&amp;b_overlay"));
    assert!(text.contains("&quot;1&quot;"));
    assert!(text.contains("a&lt;b&gt;.mp3"));

    let overlay = parse_media_overlay(&smil).unwrap();
    assert_eq!(overlay.text_ref.as_deref(), Some("../ch \"1\".xhtml"));
    assert_eq!(overlay.pars[0].audio.as_ref().unwrap().src, "../a<b>.mp3");
}

#[test]
fn test_tag_then_overlay() {
    let mut cache = SentenceCache::new();
    let tagged = tag_sentences(CHAPTER, &TerminalPunctuation, &mut cache, &TagOptions::default())
        .unwrap();

    // Pretend an aligner produced one second per sentence.
    let ranges: Vec<_> = tagged
        .sentences()
        .enumerate()
        .map(|(i, s)| SentenceRange::new(s.id, i as f64, i as f64 + 1.0))
        .collect();
    assert_eq!(
        ranges.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![0, 1, 3]
    );

    let smil = create_media_overlay("moby", "ch1.xhtml", "ch1.mp3", &ranges).unwrap();
    assert!(validate_anchors(tagged.markup.as_bytes(), &ranges).is_empty());

    let overlay = parse_media_overlay(&smil).unwrap();
    assert_eq!(overlay.ranges(), ranges);
    assert_eq!(
        overlay
            .pars
            .iter()
            .map(|p| p.sentence_id())
            .collect::<Vec<_>>(),
        vec![Some(0), Some(1), Some(3)]
    );
}

#[test]
fn test_untagged_chapter_has_no_anchors() {
    let ranges = [SentenceRange::new(0, 0.0, 1.0), SentenceRange::new(1, 1.0, 2.0)];
    let missing = validate_anchors(CHAPTER.as_bytes(), &ranges);

    assert_eq!(
        missing,
        vec![
            MissingAnchor { id: 0, anchor: "sentence0".to_string() },
            MissingAnchor { id: 1, anchor: "sentence1".to_string() },
        ]
    );
}

#[test]
fn test_missing_anchors_against_parsed_dom() {
    let mut cache = SentenceCache::new();
    let tagged = tag_sentences(
        CHAPTER,
        &TerminalPunctuation,
        &mut cache,
        &TagOptions::default().with_start_id(10),
    )
    .unwrap();
    let dom = readalong::dom::parse_html(&tagged.markup);

    let ranges = [SentenceRange::new(10, 0.0, 1.0), SentenceRange::new(0, 1.0, 2.0)];
    let missing = missing_anchors(&dom, &ranges);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].anchor, "sentence0");
}

#[test]
fn test_for_chapter_matches_create() {
    let ranges = [SentenceRange::new(2, 0.5, 1.75)];
    let overlay = MediaOverlay::for_chapter("x", "c.xhtml", "c.mp3", &ranges);
    assert_eq!(
        overlay.to_xml().unwrap(),
        create_media_overlay("x", "c.xhtml", "c.mp3", &ranges).unwrap()
    );
    assert_eq!(parse_media_overlay(&overlay.to_xml().unwrap()).unwrap(), overlay);
}

#[test]
fn test_not_xml() {
    let err = parse_media_overlay(&[0xff, 0xfe, 0x00]).unwrap_err();
    assert!(matches!(err, Error::Utf8(_)));
}

#[test]
fn test_clock_value_forms_agree() {
    let forms = ["90s", "1.5min", "00:01:30", "01:30", "90000ms", "90"];
    for form in forms {
        assert_eq!(parse_clock_value(form).unwrap(), 90.0, "{form}");
    }
}
