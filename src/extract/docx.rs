// Word (.docx) text extraction.
//
// Reads word/document.xml and emits one line per body paragraph, empty
// paragraphs included, in document order. Paragraphs nested in tables or
// text boxes are not body paragraphs and are skipped.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{archive, ExtractError};

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract the newline-joined paragraph text of a .docx file.
pub fn extract_text(bytes: &[u8], archive_limit: u64) -> Result<String, ExtractError> {
    let mut archive = archive::open(bytes, archive_limit)?;
    let xml = archive.require_part(DOCUMENT_PART)?;
    Ok(paragraphs(&xml)?.join("\n"))
}

/// Body paragraphs of a WordprocessingML document part.
pub fn paragraphs(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    // Depth of containers whose paragraphs aren't body paragraphs.
    let mut nested = 0usize;
    let mut in_paragraph = false;
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"tbl" | b"txbxContent" => nested += 1,
                b"p" if nested == 0 => {
                    in_paragraph = true;
                    current.clear();
                }
                b"r" if nested == 0 && in_paragraph => in_run = true,
                b"t" if nested == 0 && in_run => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" if nested == 0 => paragraphs.push(String::new()),
                b"tab" if nested == 0 && in_run => current.push('\t'),
                b"br" | b"cr" if nested == 0 && in_run => current.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_text => {
                let text = e.unescape().map_err(quick_xml::Error::from)?;
                current.push_str(&text);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"tbl" | b"txbxContent" => nested = nested.saturating_sub(1),
                b"p" if nested == 0 && in_paragraph => {
                    paragraphs.push(std::mem::take(&mut current));
                    in_paragraph = false;
                }
                b"r" if nested == 0 => in_run = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{inner}</w:body></w:document>"#
        )
    }

    #[test]
    fn test_runs_are_concatenated_within_a_paragraph() {
        let xml = body(r#"<w:p><w:r><w:t>Hello, </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>"#);
        assert_eq!(paragraphs(&xml).unwrap(), vec!["Hello, world"]);
    }

    #[test]
    fn test_empty_paragraphs_become_empty_lines() {
        let xml = body(r#"<w:p><w:r><w:t>One</w:t></w:r></w:p><w:p/><w:p></w:p><w:p><w:r><w:t>Two</w:t></w:r></w:p>"#);
        assert_eq!(paragraphs(&xml).unwrap(), vec!["One", "", "", "Two"]);
    }

    #[test]
    fn test_tabs_and_breaks_inside_runs() {
        let xml = body(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r></w:p>"#,
        );
        assert_eq!(paragraphs(&xml).unwrap(), vec!["a\tb\nc"]);
    }

    #[test]
    fn test_table_paragraphs_are_skipped() {
        let xml = body(
            r#"<w:p><w:r><w:t>Before</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p><w:r><w:t>After</w:t></w:r></w:p>"#,
        );
        assert_eq!(paragraphs(&xml).unwrap(), vec!["Before", "After"]);
    }

    #[test]
    fn test_entities_are_unescaped() {
        let xml = body(r#"<w:p><w:r><w:t xml:space="preserve">Fish &amp; chips </w:t></w:r></w:p>"#);
        assert_eq!(paragraphs(&xml).unwrap(), vec!["Fish & chips "]);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let xml = body(r#"<w:p><w:r><w:t>unclosed</w:r></w:p>"#);
        assert!(paragraphs(&xml).is_err());
    }
}
