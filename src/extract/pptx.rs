// PowerPoint (.pptx) text extraction.
//
// Slide order comes from the slide id list in ppt/presentation.xml, resolved
// through its relationships part. Archive order and file names don't define
// the order users see, so they are only a fallback for decks missing the list.
//
// Within a slide, top-level shapes are read in tree order. Group shapes,
// pictures and graphic frames (tables, charts) carry no text of their own.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::archive::{self, Archive};
use super::ExtractError;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";

/// Extract the newline-joined shape text of a .pptx file.
pub fn extract_text(bytes: &[u8], archive_limit: u64) -> Result<String, ExtractError> {
    let mut archive = archive::open(bytes, archive_limit)?;

    let mut texts = Vec::new();
    for slide in slide_parts(&mut archive)? {
        let xml = archive.require_part(&slide)?;
        texts.extend(shape_texts(&xml)?);
    }
    Ok(texts.join("\n"))
}

/// Archive paths of the slides, in presentation order.
fn slide_parts(archive: &mut Archive<'_>) -> Result<Vec<String>, ExtractError> {
    let presentation = archive.require_part(PRESENTATION_PART)?;
    let slide_ids = slide_relationship_ids(&presentation)?;

    if !slide_ids.is_empty() {
        if let Some(rels) = archive.read_part(PRESENTATION_RELS_PART)? {
            let targets = relationship_targets(&rels)?;
            return slide_ids
                .iter()
                .map(|id| {
                    targets
                        .get(id)
                        .map(|target| resolve_target(target))
                        .ok_or_else(|| {
                            ExtractError::MissingPart(format!("slide relationship {id}"))
                        })
                })
                .collect();
        }
    }

    Ok(slides_by_number(&archive.part_names()))
}

/// Relationship ids (`r:id`) of the `p:sldId` entries, in list order.
fn slide_relationship_ids(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                if let Some(id) = prefixed_id(&e)? {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

/// The namespaced `r:id` attribute; the bare `id` is the numeric slide id.
fn prefixed_id(element: &BytesStart<'_>) -> Result<Option<String>, ExtractError> {
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
            let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Map relationship `Id` to `Target` for a .rels part.
fn relationship_targets(xml: &str) -> Result<HashMap<String, String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(quick_xml::Error::from)?;
                    let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
                    match attr.key.as_ref() {
                        b"Id" => id = Some(value.into_owned()),
                        b"Target" => target = Some(value.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// Presentation relationship targets are relative to `ppt/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{target}"),
    }
}

/// `ppt/slides/slideN.xml` parts sorted by N.
fn slides_by_number(names: &[String]) -> Vec<String> {
    let mut slides: Vec<(u32, String)> = names
        .iter()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse()
                .ok()?;
            Some((number, name.clone()))
        })
        .collect();
    slides.sort();
    slides.into_iter().map(|(_, name)| name).collect()
}

/// Trimmed, non-empty text of each top-level shape on a slide.
pub fn shape_texts(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut texts = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut paragraph = String::new();

    let mut group_depth = 0usize;
    // Inside mc:Fallback, which repeats the content of its mc:Choice sibling.
    let mut fallback_depth = 0usize;
    let mut in_shape = false;
    let mut in_body = false;
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Start(e) if e.local_name().as_ref() == b"Fallback" => {
                fallback_depth += 1;
                continue;
            }
            Event::End(e) if e.local_name().as_ref() == b"Fallback" => {
                fallback_depth = fallback_depth.saturating_sub(1);
                continue;
            }
            Event::Eof => break,
            _ if fallback_depth > 0 => continue,
            _ => {}
        }

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"grpSp" => group_depth += 1,
                b"sp" if group_depth == 0 => {
                    in_shape = true;
                    paragraphs.clear();
                }
                b"txBody" if in_shape => in_body = true,
                b"p" if in_body => {
                    in_paragraph = true;
                    paragraph.clear();
                }
                b"t" if in_paragraph => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" if in_body => paragraphs.push(String::new()),
                b"br" if in_paragraph => paragraph.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_text => {
                let text = e.unescape().map_err(quick_xml::Error::from)?;
                paragraph.push_str(&text);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"grpSp" => group_depth = group_depth.saturating_sub(1),
                b"sp" if group_depth == 0 && in_shape => {
                    let text = paragraphs.join("\n");
                    let text = text.trim();
                    if !text.is_empty() {
                        texts.push(text.to_string());
                    }
                    in_shape = false;
                }
                b"txBody" => in_body = false,
                b"p" if in_paragraph => {
                    paragraphs.push(std::mem::take(&mut paragraph));
                    in_paragraph = false;
                }
                b"t" => in_text = false,
                _ => {}
            },
            _ => {}
        }
    }

    Ok(texts)
}
