use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::ir::{ElementType, ParagraphRecord};
use crate::matching::normalize;

use super::container::DocumentContainer;
use super::xml::{attr_value, parse_xml_part, XmlEvent};

/// Style id -> display name from `word/styles.xml`.
#[derive(Clone, Debug, Default)]
pub struct StyleCatalog {
    names: HashMap<String, String>,
}

impl StyleCatalog {
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let part = parse_xml_part("word/styles.xml", xml)?;
        let mut names = HashMap::new();
        let mut current: Option<String> = None;
        for ev in &part.events {
            match ev {
                XmlEvent::Start { name, attrs } if name == "w:style" => {
                    current = attr_value(attrs, "w:styleId").map(|v| v.into_owned());
                }
                XmlEvent::End { name } if name == "w:style" => current = None,
                XmlEvent::Start { name, attrs } | XmlEvent::Empty { name, attrs }
                    if name == "w:name" =>
                {
                    if let (Some(id), Some(val)) = (current.as_ref(), attr_value(attrs, "w:val")) {
                        names.insert(id.clone(), val.into_owned());
                    }
                }
                _ => {}
            }
        }
        Ok(Self { names })
    }

    pub fn display_name(&self, style_id: &str) -> Option<&str> {
        self.names.get(style_id).map(|s| s.as_str())
    }

    /// Heading/caption classification by style id or display name prefix.
    pub fn classify(&self, style_id: &str) -> Option<ElementType> {
        let candidates = [Some(style_id), self.display_name(style_id)];
        for c in candidates.into_iter().flatten() {
            let lower = c.trim().to_lowercase();
            if lower.starts_with("heading") || lower.starts_with("title") {
                return Some(ElementType::Heading);
            }
            if lower.starts_with("caption") {
                return Some(ElementType::Caption);
            }
        }
        None
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ExtractedText {
    pub paragraphs: Vec<ParagraphRecord>,
    pub full_text: String,
}

impl ExtractedText {
    /// Paragraph whose text covers the given `full_text` char offset.
    pub fn paragraph_at_offset(&self, offset: usize) -> Option<&ParagraphRecord> {
        let idx = self.paragraphs.partition_point(|p| p.offset <= offset);
        let p = self.paragraphs.get(idx.checked_sub(1)?)?;
        (offset <= p.offset + p.raw_text.chars().count()).then_some(p)
    }
}

/// Open a package and extract its body paragraphs.
pub fn extract(path: &Path) -> Result<ExtractedText> {
    Ok(DocumentContainer::open(path)?.extract())
}

struct OpenParagraph {
    ordinal: usize,
    text: String,
    style_id: Option<String>,
    footnote_ref: bool,
    in_fallback: bool,
}

/// Event indices of every `<w:p>` start tag, in document order. A
/// paragraph's `body_ordinal` indexes this list.
pub fn paragraph_starts(events: &[XmlEvent]) -> Vec<usize> {
    events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_start_of("w:p"))
        .map(|(i, _)| i)
        .collect()
}

pub fn extract_paragraphs(events: &[XmlEvent], styles: &StyleCatalog) -> ExtractedText {
    let mut done: Vec<OpenParagraph> = Vec::new();
    let mut stack: Vec<OpenParagraph> = Vec::new();
    let mut next_ordinal = 0usize;
    let mut ppr_depth = 0usize;
    let mut in_text = false;
    // mc:Fallback repeats mc:Choice content (text boxes); its text is ignored.
    let mut fallback_depth = 0usize;

    for ev in events {
        match ev {
            XmlEvent::Start { name, attrs } => match name.as_str() {
                "w:p" => {
                    stack.push(OpenParagraph {
                        ordinal: next_ordinal,
                        text: String::new(),
                        style_id: None,
                        footnote_ref: false,
                        in_fallback: fallback_depth > 0,
                    });
                    next_ordinal += 1;
                }
                "w:pPr" => ppr_depth += 1,
                "w:t" => in_text = true,
                "mc:Fallback" => fallback_depth += 1,
                "w:pStyle" => set_style(&mut stack, ppr_depth, attrs),
                "w:footnoteReference" => mark_footnote(&mut stack),
                _ => {}
            },
            XmlEvent::End { name } => match name.as_str() {
                "w:p" => {
                    if let Some(p) = stack.pop() {
                        done.push(p);
                    }
                    ppr_depth = 0;
                }
                "w:pPr" => ppr_depth = ppr_depth.saturating_sub(1),
                "w:t" => in_text = false,
                "mc:Fallback" => fallback_depth = fallback_depth.saturating_sub(1),
                _ => {}
            },
            XmlEvent::Empty { name, attrs } => match name.as_str() {
                "w:pStyle" => set_style(&mut stack, ppr_depth, attrs),
                "w:footnoteReference" => mark_footnote(&mut stack),
                "w:tab" if ppr_depth == 0 => push_text(&mut stack, "\t"),
                "w:br" | "w:cr" if ppr_depth == 0 => push_text(&mut stack, "\n"),
                _ => {}
            },
            XmlEvent::Text { text } | XmlEvent::CData { text } if in_text => {
                push_text(&mut stack, text);
            }
            _ => {}
        }
    }

    done.sort_by_key(|p| p.ordinal);

    let mut out = ExtractedText::default();
    let mut cursor = 0usize;
    for p in done {
        if p.in_fallback {
            continue;
        }
        let trimmed = p.text.trim();
        if trimmed.is_empty() {
            continue;
        }
        let element_type = p
            .style_id
            .as_deref()
            .and_then(|id| styles.classify(id))
            .unwrap_or(if p.footnote_ref {
                ElementType::Footnote
            } else {
                ElementType::Paragraph
            });
        let len = trimmed.chars().count();
        out.full_text.push_str(trimmed);
        out.full_text.push('\n');
        out.paragraphs.push(ParagraphRecord {
            index: out.paragraphs.len(),
            body_ordinal: p.ordinal,
            raw_text: trimmed.to_string(),
            normalized_text: normalize(trimmed),
            element_type,
            style_id: p.style_id,
            offset: cursor,
        });
        cursor += len + 1;
    }
    out
}

fn set_style(stack: &mut [OpenParagraph], ppr_depth: usize, attrs: &[(String, String)]) {
    if ppr_depth == 0 {
        return;
    }
    if let (Some(top), Some(val)) = (stack.last_mut(), attr_value(attrs, "w:val")) {
        let val = val.trim();
        if !val.is_empty() {
            top.style_id = Some(val.to_string());
        }
    }
}

fn mark_footnote(stack: &mut [OpenParagraph]) {
    if let Some(top) = stack.last_mut() {
        top.footnote_ref = true;
    }
}

fn push_text(stack: &mut [OpenParagraph], text: &str) {
    if let Some(top) = stack.last_mut() {
        top.text.push_str(text);
    }
}
