use chrono::{SecondsFormat, Utc};
use tracing::debug;

use crate::error::{CorrectorError, Result};
use crate::ir::{Category, CommentRecord, ParagraphRecord};

use super::container::DocumentContainer;
use super::extract::paragraph_starts;
use super::xml::{matching_end, XmlEvent};

#[derive(Clone, Debug)]
pub struct CommentAuthor {
    pub name: String,
    pub initials: String,
}

impl Default for CommentAuthor {
    fn default() -> Self {
        Self {
            name: "AI Corrector".to_string(),
            initials: "AI".to_string(),
        }
    }
}

/// Attach a comment to a whole paragraph.
///
/// Inserts `w:commentRangeStart` after the paragraph properties,
/// `w:commentRangeEnd` before `</w:p>` and a reference run right after it,
/// then queues the comment record on the container. Returns the new id.
pub fn anchor_comment(
    container: &mut DocumentContainer,
    paragraph: &ParagraphRecord,
    body_text: &str,
    author: &CommentAuthor,
    category: Category,
) -> Result<String> {
    let anchor_err = |reason: &str| CorrectorError::Anchor {
        paragraph_index: paragraph.index,
        reason: reason.to_string(),
    };
    if body_text.trim().is_empty() {
        return Err(anchor_err("empty comment body"));
    }

    let events = &container.body.events;
    let start_idx = *paragraph_starts(events)
        .get(paragraph.body_ordinal)
        .ok_or_else(|| anchor_err("paragraph not found in document body"))?;
    let end_idx =
        matching_end(events, start_idx).ok_or_else(|| anchor_err("paragraph is not closed"))?;
    let content_idx = match events.get(start_idx + 1) {
        Some(XmlEvent::Start { name, .. }) if name == "w:pPr" => {
            matching_end(events, start_idx + 1).ok_or_else(|| anchor_err("unclosed w:pPr"))? + 1
        }
        Some(XmlEvent::Empty { name, .. }) if name == "w:pPr" => start_idx + 2,
        _ => start_idx + 1,
    };

    let id = container.allocate_comment_id().to_string();
    let id_attr = [("w:id", id.as_str())];
    let tail = vec![
        XmlEvent::empty("w:commentRangeEnd", &id_attr),
        XmlEvent::start("w:r", &[]),
        XmlEvent::start("w:rPr", &[]),
        XmlEvent::empty("w:rStyle", &[("w:val", "CommentReference")]),
        XmlEvent::end("w:rPr"),
        XmlEvent::empty("w:commentReference", &id_attr),
        XmlEvent::end("w:r"),
    ];
    let events = &mut container.body.events;
    events.splice(end_idx..end_idx, tail);
    events.insert(content_idx, XmlEvent::empty("w:commentRangeStart", &id_attr));

    container.pending.push(CommentRecord {
        comment_id: id.clone(),
        author: author.name.clone(),
        initials: author.initials.clone(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        body_text: body_text.to_string(),
        paragraph_index: paragraph.index,
        category,
    });
    debug!(comment_id = %id, paragraph = paragraph.index, ordinal = paragraph.body_ordinal, "anchored comment");
    Ok(id)
}
