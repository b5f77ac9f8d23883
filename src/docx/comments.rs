use crate::error::Result;
use crate::ir::{CommentRecord, Suggestion};

use super::manifest::insert_before_root_end;
use super::xml::{attr_value, parse_xml_part, write_xml_part, XmlEvent, XmlPart};

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Comment body as separate lines; each becomes its own `w:p`.
pub fn comment_body_lines(s: &Suggestion, include_confidence: bool) -> Vec<String> {
    let mut lines = vec![format!("{} {}", s.category.icon(), s.category.label())];
    if !s.suggested_text.trim().is_empty() {
        lines.push(format!("Suggestion: {}", s.suggested_text.trim()));
    }
    if !s.reason.trim().is_empty() {
        lines.push(format!("Reason: {}", s.reason.trim()));
    }
    if include_confidence {
        lines.push(format!("Confidence: {:.0}%", s.confidence * 100.0));
    }
    lines
}

pub fn comment_body_text(s: &Suggestion, include_confidence: bool) -> String {
    comment_body_lines(s, include_confidence).join("\n")
}

/// Events for one `<w:comment>`. Body lines are split on `\n`.
pub fn comment_events(rec: &CommentRecord) -> Vec<XmlEvent> {
    let mut out = vec![XmlEvent::start(
        "w:comment",
        &[
            ("w:id", rec.comment_id.as_str()),
            ("w:author", rec.author.as_str()),
            ("w:date", rec.timestamp.as_str()),
            ("w:initials", rec.initials.as_str()),
        ],
    )];
    for (i, line) in rec.body_text.split('\n').enumerate() {
        out.push(XmlEvent::start("w:p", &[]));
        if i == 0 {
            out.push(XmlEvent::start("w:pPr", &[]));
            out.push(XmlEvent::empty("w:pStyle", &[("w:val", "CommentText")]));
            out.push(XmlEvent::end("w:pPr"));
        }
        out.push(XmlEvent::start("w:r", &[]));
        if i == 0 {
            out.push(XmlEvent::start("w:rPr", &[]));
            out.push(XmlEvent::empty("w:rStyle", &[("w:val", "CommentReference")]));
            out.push(XmlEvent::end("w:rPr"));
            out.push(XmlEvent::empty("w:annotationRef", &[]));
            out.push(XmlEvent::end("w:r"));
            out.push(XmlEvent::start("w:r", &[]));
        }
        out.push(XmlEvent::start("w:t", &[("xml:space", "preserve")]));
        out.push(XmlEvent::text(line));
        out.push(XmlEvent::end("w:t"));
        out.push(XmlEvent::end("w:r"));
        out.push(XmlEvent::end("w:p"));
    }
    out.push(XmlEvent::end("w:comment"));
    out
}

pub fn new_comments_part(name: &str) -> XmlPart {
    XmlPart {
        name: name.to_string(),
        events: vec![
            XmlEvent::Decl {
                version: "1.0".into(),
                encoding: Some("UTF-8".into()),
                standalone: Some("yes".into()),
            },
            XmlEvent::start("w:comments", &[("xmlns:w", W_NS)]),
            XmlEvent::end("w:comments"),
        ],
    }
}

/// Append records to a comments part (new or pre-existing) and serialize it.
pub fn write_comments(part: &mut XmlPart, records: &[CommentRecord]) -> Result<Vec<u8>> {
    let events: Vec<XmlEvent> = records.iter().flat_map(comment_events).collect();
    insert_before_root_end(part, events)?;
    write_xml_part(part)
}

/// Highest numeric `w:id` among existing comments.
pub fn max_comment_id(part: &XmlPart) -> Option<u64> {
    part.events
        .iter()
        .filter_map(|ev| match ev {
            XmlEvent::Start { name, attrs } | XmlEvent::Empty { name, attrs }
                if name == "w:comment" =>
            {
                attr_value(attrs, "w:id").and_then(|v| v.trim().parse::<u64>().ok())
            }
            _ => None,
        })
        .max()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedComment {
    pub id: String,
    pub author: String,
    pub initials: String,
    pub date: String,
    /// Paragraph texts joined with `\n`.
    pub text: String,
}

pub fn parse_comments(xml: &[u8]) -> Result<Vec<ParsedComment>> {
    let part = parse_xml_part("word/comments.xml", xml)?;
    let mut out = Vec::new();
    let mut current: Option<(ParsedComment, Vec<String>)> = None;
    let mut in_text = false;
    for ev in &part.events {
        match ev {
            XmlEvent::Start { name, attrs } if name == "w:comment" => {
                let get = |k: &str| attr_value(attrs, k).map(|v| v.into_owned()).unwrap_or_default();
                current = Some((
                    ParsedComment {
                        id: get("w:id"),
                        author: get("w:author"),
                        initials: get("w:initials"),
                        date: get("w:date"),
                        text: String::new(),
                    },
                    Vec::new(),
                ));
            }
            XmlEvent::End { name } if name == "w:comment" => {
                if let Some((mut c, paras)) = current.take() {
                    c.text = paras.join("\n");
                    out.push(c);
                }
            }
            XmlEvent::Start { name, .. } if name == "w:p" => {
                if let Some((_, paras)) = current.as_mut() {
                    paras.push(String::new());
                }
            }
            XmlEvent::Start { name, .. } if name == "w:t" => in_text = true,
            XmlEvent::End { name } if name == "w:t" => in_text = false,
            XmlEvent::Text { text } if in_text => {
                if let Some(last) = current.as_mut().and_then(|(_, p)| p.last_mut()) {
                    last.push_str(text);
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Category;

    fn record(id: &str, body: &str) -> CommentRecord {
        CommentRecord {
            comment_id: id.to_string(),
            author: "AI Corrector".into(),
            initials: "AI".into(),
            timestamp: "2026-01-01T00:00:00Z".into(),
            body_text: body.to_string(),
            paragraph_index: 0,
            category: Category::Grammar,
        }
    }

    #[test]
    fn escaping_round_trip() {
        let body = r#"Comment with "quotes" & <tags>"#;
        let mut part = new_comments_part("word/comments.xml");
        let bytes = write_comments(&mut part, &[record("0", body)]).unwrap();
        let xml = String::from_utf8(bytes.clone()).unwrap();
        assert!(!xml.contains("& <"));
        assert!(xml.contains(r#"xml:space="preserve""#));

        let parsed = parse_comments(&bytes).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, body);
        assert_eq!(parsed[0].id, "0");
        assert_eq!(parsed[0].author, "AI Corrector");
    }

    #[test]
    fn multi_line_bodies_and_apostrophes() {
        let body = "\u{270F} Grammar\nSuggestion: it's  fine \nReason: a > b";
        let mut part = new_comments_part("word/comments.xml");
        let bytes = write_comments(&mut part, &[record("0", body), record("1", "x")]).unwrap();
        let parsed = parse_comments(&bytes).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].text, body);
        assert_eq!(max_comment_id(&parse_xml_part("c", &bytes).unwrap()), Some(1));
    }

    #[test]
    fn body_lines_follow_template() {
        let s = Suggestion::new("a", "b", "because", Category::Clarity, 0.876);
        let lines = comment_body_lines(&s, true);
        assert_eq!(lines[1], "Suggestion: b");
        assert_eq!(lines[2], "Reason: because");
        assert_eq!(lines[3], "Confidence: 88%");
        assert!(lines[0].ends_with("Clarity"));
        assert_eq!(comment_body_lines(&s, false).len(), 3);
    }

    #[test]
    fn body_is_never_empty() {
        let s = Suggestion::new("a", "", "", Category::Style, 0.5);
        assert!(!comment_body_text(&s, false).is_empty());
    }
}
