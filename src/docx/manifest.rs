//! `[Content_Types].xml` and `*.rels` handling.

use std::collections::HashMap;

use super::xml::{attr_value, parse_xml_part, root_end, write_xml_part, XmlEvent, XmlPart};
use crate::error::{CorrectorError, Result};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";

pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const OFFICE_DOCUMENT_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const STYLES_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
pub const COMMENTS_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";

pub const COMMENTS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.comments+xml";
pub const RELS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

pub fn parse_relationships(name: &str, xml: &[u8]) -> Result<Vec<Relationship>> {
    let part = parse_xml_part(name, xml)?;
    Ok(relationships_of(&part))
}

fn relationships_of(part: &XmlPart) -> Vec<Relationship> {
    let mut out = Vec::new();
    for ev in &part.events {
        let (XmlEvent::Start { name, attrs } | XmlEvent::Empty { name, attrs }) = ev else {
            continue;
        };
        if name != "Relationship" {
            continue;
        }
        let get = |k: &str| attr_value(attrs, k).map(|v| v.into_owned()).unwrap_or_default();
        out.push(Relationship {
            id: get("Id"),
            rel_type: get("Type"),
            target: get("Target"),
            external: get("TargetMode").eq_ignore_ascii_case("external"),
        });
    }
    out
}

/// One past the highest numeric `rIdN`; non-numeric ids are ignored.
pub fn next_relationship_id(rels: &[Relationship]) -> String {
    let max = rels
        .iter()
        .filter_map(|r| r.id.strip_prefix("rId"))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("rId{}", max + 1)
}

pub fn empty_relationships() -> Vec<u8> {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{RELATIONSHIPS_NS}"></Relationships>"#
    )
    .into_bytes()
}

/// Add a relationship unless one with the same type and target exists.
/// Returns the rewritten part (or `None` when unchanged) and the id in use.
pub fn ensure_relationship(
    name: &str,
    xml: &[u8],
    rel_type: &str,
    target: &str,
) -> Result<(Option<Vec<u8>>, String)> {
    let mut part = parse_xml_part(name, xml)?;
    let rels = relationships_of(&part);
    if let Some(existing) = rels
        .iter()
        .find(|r| r.rel_type == rel_type && r.target.trim_start_matches('/') == target.trim_start_matches('/'))
    {
        return Ok((None, existing.id.clone()));
    }
    let id = next_relationship_id(&rels);
    let ev = XmlEvent::empty(
        "Relationship",
        &[("Id", id.as_str()), ("Type", rel_type), ("Target", target)],
    );
    insert_before_root_end(&mut part, vec![ev])?;
    Ok((Some(write_xml_part(&part)?), id))
}

/// Parsed `[Content_Types].xml`. Keys are lowercase extensions and
/// lowercase part names with a leading slash.
#[derive(Clone, Debug, Default)]
pub struct ContentTypes {
    pub defaults: HashMap<String, String>,
    pub overrides: HashMap<String, String>,
}

impl ContentTypes {
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let part = parse_xml_part(CONTENT_TYPES_PART, xml)?;
        let mut out = Self::default();
        for ev in &part.events {
            let (XmlEvent::Start { name, attrs } | XmlEvent::Empty { name, attrs }) = ev else {
                continue;
            };
            let ct = attr_value(attrs, "ContentType").map(|v| v.into_owned());
            match (name.as_str(), ct) {
                ("Default", Some(ct)) => {
                    if let Some(ext) = attr_value(attrs, "Extension") {
                        out.defaults.insert(ext.to_lowercase(), ct);
                    }
                }
                ("Override", Some(ct)) => {
                    if let Some(p) = attr_value(attrs, "PartName") {
                        out.overrides.insert(part_key(&p), ct);
                    }
                }
                _ => {}
            }
        }
        Ok(out)
    }

    /// Content type declared for a zip entry, by override or extension.
    pub fn content_type_of(&self, entry: &str) -> Option<&str> {
        if let Some(ct) = self.overrides.get(&part_key(entry)) {
            return Some(ct);
        }
        let ext = entry.rsplit_once('.').map(|(_, e)| e.to_lowercase())?;
        self.defaults.get(&ext).map(|s| s.as_str())
    }
}

fn part_key(part: &str) -> String {
    format!("/{}", part.trim_start_matches('/')).to_lowercase()
}

/// Add `<Override PartName=.. ContentType=..>` if the part has no override.
pub fn ensure_override(xml: &[u8], entry: &str, content_type: &str) -> Result<Option<Vec<u8>>> {
    let types = ContentTypes::parse(xml)?;
    if types.overrides.contains_key(&part_key(entry)) {
        return Ok(None);
    }
    let mut part = parse_xml_part(CONTENT_TYPES_PART, xml)?;
    let part_name = format!("/{}", entry.trim_start_matches('/'));
    let ev = XmlEvent::empty(
        "Override",
        &[("PartName", part_name.as_str()), ("ContentType", content_type)],
    );
    insert_before_root_end(&mut part, vec![ev])?;
    Ok(Some(write_xml_part(&part)?))
}

/// Add `<Default Extension=.. ContentType=..>` if the extension is undeclared.
pub fn ensure_default(xml: &[u8], extension: &str, content_type: &str) -> Result<Option<Vec<u8>>> {
    let types = ContentTypes::parse(xml)?;
    if types.defaults.contains_key(&extension.to_lowercase()) {
        return Ok(None);
    }
    let mut part = parse_xml_part(CONTENT_TYPES_PART, xml)?;
    let ev = XmlEvent::empty(
        "Default",
        &[("Extension", extension), ("ContentType", content_type)],
    );
    // Defaults conventionally precede overrides.
    let first_override = part
        .events
        .iter()
        .position(|e| matches!(e, XmlEvent::Start { name, .. } | XmlEvent::Empty { name, .. } if name == "Override"));
    match first_override {
        Some(i) => part.events.insert(i, ev),
        None => insert_before_root_end(&mut part, vec![ev])?,
    }
    Ok(Some(write_xml_part(&part)?))
}

/// Insert events as the last children of the root element. A self-closing
/// root is expanded first.
pub fn insert_before_root_end(part: &mut XmlPart, new_events: Vec<XmlEvent>) -> Result<()> {
    let root_idx = part
        .events
        .iter()
        .position(|e| matches!(e, XmlEvent::Start { .. } | XmlEvent::Empty { .. }))
        .ok_or_else(|| CorrectorError::xml(&part.name, "no root element"))?;
    if let XmlEvent::Empty { name, attrs } = &part.events[root_idx] {
        let (name, attrs) = (name.clone(), attrs.clone());
        part.events[root_idx] = XmlEvent::Start {
            name: name.clone(),
            attrs,
        };
        part.events.insert(root_idx + 1, XmlEvent::End { name });
    }
    let end = root_end(&part.events).ok_or_else(|| CorrectorError::xml(&part.name, "unterminated root"))?;
    part.events.splice(end..end, new_events);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.org/?a=1&amp;b=2" TargetMode="External"/><Relationship Id="custom" Type="x" Target="y.xml"/></Relationships>"#;

    const TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

    #[test]
    fn parses_relationships_and_allocates_next_id() {
        let rels = parse_relationships("word/_rels/document.xml.rels", RELS.as_bytes()).unwrap();
        assert_eq!(rels.len(), 3);
        assert!(rels[1].external);
        assert_eq!(rels[1].target, "https://example.org/?a=1&b=2");
        assert_eq!(next_relationship_id(&rels), "rId8");
        assert_eq!(next_relationship_id(&[]), "rId1");
    }

    #[test]
    fn ensure_relationship_is_idempotent() {
        let (added, id) =
            ensure_relationship("r", RELS.as_bytes(), COMMENTS_REL_TYPE, "comments.xml").unwrap();
        assert_eq!(id, "rId8");
        let added = added.unwrap();
        let text = String::from_utf8(added.clone()).unwrap();
        assert!(text.contains(r#"<Relationship Id="rId8" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="comments.xml"/></Relationships>"#));
        assert!(text.contains("a=1&amp;b=2"));

        let (again, id2) = ensure_relationship("r", &added, COMMENTS_REL_TYPE, "comments.xml").unwrap();
        assert!(again.is_none());
        assert_eq!(id2, "rId8");
    }

    #[test]
    fn relationship_into_fresh_part() {
        let (added, id) =
            ensure_relationship("r", &empty_relationships(), COMMENTS_REL_TYPE, "comments.xml").unwrap();
        assert_eq!(id, "rId1");
        let rels = parse_relationships("r", &added.unwrap()).unwrap();
        assert_eq!(rels.len(), 1);
    }

    #[test]
    fn override_and_default_are_added_once() {
        let once = ensure_override(TYPES.as_bytes(), "word/comments.xml", COMMENTS_CONTENT_TYPE)
            .unwrap()
            .unwrap();
        let types = ContentTypes::parse(&once).unwrap();
        assert_eq!(types.content_type_of("word/comments.xml"), Some(COMMENTS_CONTENT_TYPE));
        assert_eq!(types.content_type_of("word/styles.xml"), Some("application/xml"));
        assert!(ensure_override(&once, "/word/comments.xml", COMMENTS_CONTENT_TYPE)
            .unwrap()
            .is_none());

        assert!(ensure_default(&once, "rels", RELS_CONTENT_TYPE).unwrap().is_none());
        let bare = br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#;
        let with_rels = ensure_default(bare, "rels", RELS_CONTENT_TYPE).unwrap().unwrap();
        let types = ContentTypes::parse(&with_rels).unwrap();
        assert_eq!(types.content_type_of("_rels/.rels"), Some(RELS_CONTENT_TYPE));
    }
}
