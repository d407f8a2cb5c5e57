// Unit tests for document extraction.
//
// Office fixtures are built in memory (see tests/common) so every case runs
// against a real zip archive rather than a bare XML string.

mod common;

use authorship::extract::{
    extract, extract_with_limit, DocumentFormat, ExtractError, Upload, MAX_ARCHIVE_BYTES,
};

// ============================================================
// Word documents
// ============================================================

#[test]
fn docx_paragraphs_joined_with_newlines() {
    let bytes = common::docx(&["First paragraph.", "", "Third & final."]);
    let text = extract(&Upload::new("essay.docx", bytes)).unwrap();
    assert_eq!(text, "First paragraph.\n\nThird & final.");
}

#[test]
fn docx_extension_is_case_insensitive() {
    let bytes = common::docx(&["Shouting file name"]);
    let text = extract(&Upload::new("ESSAY.DOCX", bytes)).unwrap();
    assert_eq!(text, "Shouting file name");
}

#[test]
fn docx_corrupt_archive_is_an_error() {
    let upload = Upload::new("essay.docx", b"PK\x03\x04 definitely not a zip".to_vec());
    let err = extract(&upload).unwrap_err();
    assert!(matches!(err, ExtractError::Archive(_)), "got: {err:?}");
}

#[test]
fn docx_without_document_part_is_an_error() {
    let bytes = common::zip_archive(&[("word/styles.xml", "<w:styles/>".to_string())]);
    let err = extract(&Upload::new("essay.docx", bytes)).unwrap_err();
    assert!(matches!(err, ExtractError::MissingPart(_)), "got: {err:?}");
}

// ============================================================
// Presentations
// ============================================================

#[test]
fn pptx_follows_presentation_order_not_file_order() {
    // The fixture writes slide 1 as slide2.xml and slide 2 as slide1.xml.
    let bytes = common::pptx(&[&["Opening title", "Agenda"], &["Closing remarks"]]);
    let text = extract(&Upload::new("deck.pptx", bytes)).unwrap();
    assert_eq!(text, "Opening title\nAgenda\nClosing remarks");
}

#[test]
fn pptx_skips_blank_shapes() {
    let bytes = common::pptx(&[&["   ", "Only real text"], &[""]]);
    let text = extract(&Upload::new("deck.pptx", bytes)).unwrap();
    assert_eq!(text, "Only real text");
}

#[test]
fn pptx_without_slide_list_falls_back_to_file_numbers() {
    let slide = |text: &str| {
        format!(
            r#"<p:sld xmlns:a="a" xmlns:p="p"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
        )
    };
    let bytes = common::zip_archive(&[
        ("ppt/presentation.xml", r#"<p:presentation xmlns:p="p"/>"#.to_string()),
        ("ppt/slides/slide10.xml", slide("ten")),
        ("ppt/slides/slide2.xml", slide("two")),
    ]);
    let text = extract(&Upload::new("deck.pptx", bytes)).unwrap();
    assert_eq!(text, "two\nten");
}

#[test]
fn pptx_many_large_slides_exceed_archive_budget() {
    let big = "word ".repeat(64 * 1024 / 5);
    let slides: Vec<[&str; 1]> = (0..40).map(|_| [big.as_str()]).collect();
    let slides: Vec<&[&str]> = slides.iter().map(|s| s.as_slice()).collect();
    let upload = Upload::new("deck.pptx", common::pptx(&slides));

    let err = extract_with_limit(&upload, 1024 * 1024).unwrap_err();
    assert!(matches!(err, ExtractError::ArchiveTooLarge { .. }), "got: {err:?}");

    // The same deck fits a budget large enough for all of it.
    let text = extract_with_limit(&upload, 8 * 1024 * 1024).unwrap();
    assert!(text.len() > 40 * 60 * 1024);
}

#[test]
fn pptx_repeated_slide_cannot_amplify_past_default_budget() {
    // One highly compressible 1 MiB slide listed 40 times in the slide list.
    let body = "a".repeat(1024 * 1024);
    let slide = format!(
        r#"<p:sld xmlns:a="a" xmlns:p="p"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{body}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
    );
    let ids: String = (0..40)
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId2"/>"#, 256 + i))
        .collect();
    let bytes = common::zip_archive(&[
        (
            "ppt/presentation.xml",
            format!(r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#),
        ),
        (
            "ppt/_rels/presentation.xml.rels",
            r#"<Relationships xmlns="x"><Relationship Id="rId2" Target="slides/slide1.xml"/></Relationships>"#.to_string(),
        ),
        ("ppt/slides/slide1.xml", slide),
    ]);
    assert!(bytes.len() < 64 * 1024);

    let err = extract(&Upload::new("deck.pptx", bytes)).unwrap_err();
    assert!(
        matches!(err, ExtractError::ArchiveTooLarge { limit } if limit == MAX_ARCHIVE_BYTES),
        "got: {err:?}"
    );
}

#[test]
fn pptx_garbage_is_an_error_not_a_panic() {
    let upload = Upload::new("deck.pptx", vec![0u8; 64]);
    assert!(extract(&upload).is_err());
}

// ============================================================
// Plain text and dispatch
// ============================================================

#[test]
fn txt_decodes_permissively() {
    let upload = Upload::new("notes.txt", b"na\xEFve text".to_vec());
    let text = extract(&upload).unwrap();
    assert!(text.starts_with("na"));
    assert!(text.ends_with("ve text"));
    assert!(text.contains('\u{FFFD}'));
}

#[test]
fn unsupported_format_is_empty() {
    let upload = Upload::new("photo.jpeg", vec![0xFF, 0xD8, 0xFF]);
    assert_eq!(upload.format(), DocumentFormat::Unsupported);
    assert_eq!(extract(&upload).unwrap(), "");
}

#[test]
fn extraction_is_idempotent() {
    let uploads = [
        Upload::new("a.docx", common::docx(&["Same words", "every time"])),
        Upload::new("b.pptx", common::pptx(&[&["Same slide"], &["Same again"]])),
        Upload::new("c.txt", "Same text".as_bytes().to_vec()),
    ];
    for upload in &uploads {
        assert_eq!(extract(upload).unwrap(), extract(upload).unwrap());
    }
}
