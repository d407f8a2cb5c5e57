// Shared fixtures: in-memory Office documents and a tiny model artifact.
//
// Each integration test binary compiles this module separately and uses a
// different subset of it.
#![allow(dead_code)]

use std::io::{Cursor, Write};

use authorship::classifier::artifact::{LogisticModel, TfidfVectorizer};
use authorship::classifier::LinearClassifier;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Zip the given (path, contents) pairs.
pub fn zip_archive(entries: &[(&str, String)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A .docx with one body paragraph per entry ("" for an empty paragraph).
pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| {
            if p.is_empty() {
                "<w:p/>".to_string()
            } else {
                format!(
                    r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                    escape(p)
                )
            }
        })
        .collect();

    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    );

    zip_archive(&[
        ("[Content_Types].xml", content_types()),
        ("word/document.xml", document),
    ])
}

/// A .pptx whose slides hold one text box per entry.
///
/// Slide files are written in reverse name order (the first slide shown is
/// the highest-numbered file) so tests can tell presentation order apart
/// from file order.
pub fn pptx(slides: &[&[&str]]) -> Vec<u8> {
    let count = slides.len();

    let mut slide_ids = String::new();
    let mut rels = String::new();
    let mut slide_files = Vec::new();
    for (position, shapes) in slides.iter().enumerate() {
        let file_number = count - position;
        let rid = format!("rId{}", position + 2);
        slide_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="{rid}"/>"#, 256 + position));
        rels.push_str(&format!(
            r#"<Relationship Id="{rid}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{file_number}.xml"/>"#
        ));
        slide_files.push((format!("ppt/slides/slide{file_number}.xml"), slide_xml(shapes)));
    }

    let presentation = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldIdLst>{slide_ids}</p:sldIdLst></p:presentation>"#
    );
    let rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
    );

    let mut entries = vec![("[Content_Types].xml", content_types())];
    entries.push(("ppt/presentation.xml", presentation));
    entries.push(("ppt/_rels/presentation.xml.rels", rels));

    let slide_entries: Vec<(&str, String)> = slide_files
        .iter()
        .map(|(name, xml)| (name.as_str(), xml.clone()))
        .collect();
    entries.extend(slide_entries);

    zip_archive(&entries)
}

fn slide_xml(shapes: &[&str]) -> String {
    let shapes: String = shapes
        .iter()
        .enumerate()
        .map(|(i, text)| {
            format!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="TextBox {i}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
                i + 2,
                escape(text)
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld></p:sld>"#
    )
}

fn content_types() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#
        .to_string()
}

/// Words the fixture model treats as AI-flavoured.
pub const AI_WORDS: &str = "furthermore delve tapestry moreover multifaceted";

/// Words the fixture model treats as human-flavoured.
pub const HUMAN_WORDS: &str = "lol gonna yeah kinda dunno";

/// A binary model over a ten-word vocabulary. Class order is [human, ai]
/// with labels 0 and 1 unless `ai_first` is set.
pub fn artifact(ai_first: bool) -> (TfidfVectorizer, LogisticModel) {
    let ai: Vec<&str> = AI_WORDS.split(' ').collect();
    let human: Vec<&str> = HUMAN_WORDS.split(' ').collect();

    let vocabulary: serde_json::Map<String, serde_json::Value> = ai
        .iter()
        .chain(human.iter())
        .enumerate()
        .map(|(i, word)| (word.to_string(), serde_json::json!(i)))
        .collect();

    // Positive weight pushes toward classes[1].
    let sign = if ai_first { -1.0 } else { 1.0 };
    let coef: Vec<f64> = (0..ai.len())
        .map(|_| 4.0 * sign)
        .chain((0..human.len()).map(|_| -4.0 * sign))
        .collect();
    let classes = if ai_first {
        serde_json::json!([1, 0])
    } else {
        serde_json::json!([0, 1])
    };

    let vectorizer = serde_json::from_value(serde_json::json!({
        "vocabulary": vocabulary,
        "idf": vec![1.0; ai.len() + human.len()],
        "ngram_range": [1, 1],
    }))
    .unwrap();
    let model = serde_json::from_value(serde_json::json!({
        "classes": classes,
        "coef": [coef],
        "intercept": [0.0],
    }))
    .unwrap();

    (vectorizer, model)
}

pub fn classifier() -> LinearClassifier {
    let (vectorizer, model) = artifact(false);
    LinearClassifier::from_parts(vectorizer, model, "1").unwrap()
}
