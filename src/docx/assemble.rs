use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{CorrectorError, Result};

use super::comments::write_comments;
use super::container::DocumentContainer;
use super::manifest::{
    empty_relationships, ensure_default, ensure_override, ensure_relationship,
    parse_relationships, ContentTypes, COMMENTS_CONTENT_TYPE, COMMENTS_REL_TYPE,
    CONTENT_TYPES_PART, RELS_CONTENT_TYPE,
};
use super::package::{rels_path_for, resolve_target, split_part_path, DocxPackage};
use super::xml::write_xml_part;

/// Serialize the container to `output_path` and return the number of
/// comments written.
///
/// With no pending comments the package is written back untouched. The
/// output appears only once the whole zip has been written.
pub fn finalize(mut container: DocumentContainer, output_path: &Path) -> Result<usize> {
    let count = container.pending.len();
    if count == 0 {
        info!(output = %output_path.display(), "no comments anchored; repackaging unchanged");
        container.package.write_atomic(output_path)?;
        return Ok(0);
    }

    let baseline = consistency_problems(&container.package, &container.main_part);

    let body = write_xml_part(&container.body)?;
    container.package.set_entry(&container.main_part, body);

    let mut comments_part = container.take_comments_part();
    let comments = write_comments(&mut comments_part, &container.pending)?;
    let comments_entry = container.comments_entry.clone();
    container.package.set_entry(&comments_entry, comments);

    let mut content_types = container
        .package
        .data(CONTENT_TYPES_PART)
        .ok_or_else(|| CorrectorError::Packaging("missing [Content_Types].xml".into()))?
        .to_vec();
    if let Some(updated) = ensure_override(&content_types, &comments_entry, COMMENTS_CONTENT_TYPE)? {
        content_types = updated;
    }

    let rels_entry = rels_path_for(&container.main_part);
    let rels = match container.package.data(&rels_entry) {
        Some(bytes) => bytes.to_vec(),
        None => {
            debug!(part = %rels_entry, "creating main part relationships");
            if let Some(updated) = ensure_default(&content_types, "rels", RELS_CONTENT_TYPE)? {
                content_types = updated;
            }
            empty_relationships()
        }
    };
    let (main_dir, _) = split_part_path(&container.main_part);
    let target = relative_target(main_dir, &comments_entry);
    let (updated_rels, rel_id) = ensure_relationship(&rels_entry, &rels, COMMENTS_REL_TYPE, &target)?;
    if let Some(updated) = updated_rels {
        container.package.set_entry(&rels_entry, updated);
    } else if !container.package.contains(&rels_entry) {
        container.package.set_entry(&rels_entry, rels);
    }
    container.package.set_entry(CONTENT_TYPES_PART, content_types);

    let introduced: Vec<String> = consistency_problems(&container.package, &container.main_part)
        .into_iter()
        .filter(|p| !baseline.contains(p))
        .collect();
    if !introduced.is_empty() {
        return Err(CorrectorError::Packaging(format!(
            "inconsistent package: {}",
            introduced.join("; ")
        )));
    }

    container.package.write_atomic(output_path)?;
    info!(
        output = %output_path.display(),
        comments = count,
        relationship = %rel_id,
        "wrote corrected document"
    );
    Ok(count)
}

/// Target of `entry` relative to the directory `base_dir`.
fn relative_target(base_dir: &str, entry: &str) -> String {
    if base_dir.is_empty() {
        return entry.to_string();
    }
    match entry.strip_prefix(base_dir).and_then(|r| r.strip_prefix('/')) {
        Some(rest) => rest.to_string(),
        None => format!("/{entry}"),
    }
}

/// Dangling internal relationships of the main part and parts without a
/// declared content type.
pub fn consistency_problems(package: &DocxPackage, main_part: &str) -> Vec<String> {
    let mut problems = Vec::new();

    let types = match package.data(CONTENT_TYPES_PART).map(ContentTypes::parse) {
        Some(Ok(t)) => t,
        Some(Err(e)) => {
            problems.push(format!("unreadable content types: {e}"));
            ContentTypes::default()
        }
        None => {
            problems.push("missing [Content_Types].xml".to_string());
            ContentTypes::default()
        }
    };
    for ent in &package.entries {
        if ent.is_dir || ent.name.ends_with('/') || ent.name == CONTENT_TYPES_PART {
            continue;
        }
        if types.content_type_of(&ent.name).is_none() {
            problems.push(format!("no content type for {}", ent.name));
        }
    }

    let rels_entry = rels_path_for(main_part);
    if let Some(bytes) = package.data(&rels_entry) {
        match parse_relationships(&rels_entry, bytes) {
            Ok(rels) => {
                let (dir, _) = split_part_path(main_part);
                for rel in rels.iter().filter(|r| !r.external) {
                    let entry = resolve_target(dir, &rel.target);
                    if !package.contains(&entry) {
                        problems.push(format!("relationship {} targets missing part {entry}", rel.id));
                    }
                }
            }
            Err(e) => problems.push(format!("unreadable {rels_entry}: {e}")),
        }
    }

    if !problems.is_empty() {
        warn!(count = problems.len(), "package consistency problems");
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::anchor::{anchor_comment, CommentAuthor};
    use crate::docx::comments::parse_comments;
    use crate::docx::testutil::write_docx;
    use crate::ir::Category;

    #[test]
    fn relative_targets() {
        assert_eq!(relative_target("word", "word/comments.xml"), "comments.xml");
        assert_eq!(relative_target("word", "other/comments.xml"), "/other/comments.xml");
        assert_eq!(relative_target("", "comments.xml"), "comments.xml");
    }

    #[test]
    fn zero_comments_leaves_manifests_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_docx(dir.path(), "in.docx", &["Hello world."]);
        let out = dir.path().join("out.docx");
        let container = DocumentContainer::open(&input).unwrap();
        assert_eq!(finalize(container, &out).unwrap(), 0);

        let before = DocxPackage::read(&input).unwrap();
        let after = DocxPackage::read(&out).unwrap();
        for part in ["[Content_Types].xml", "word/_rels/document.xml.rels", "word/document.xml"] {
            assert_eq!(before.data(part), after.data(part), "{part}");
        }
        assert!(!after.contains("word/comments.xml"));
    }

    #[test]
    fn anchored_comments_are_packaged() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_docx(dir.path(), "in.docx", &["First paragraph.", "Second paragraph."]);
        let out = dir.path().join("out.docx");
        let mut container = DocumentContainer::open(&input).unwrap();
        let paras = container.extract().paragraphs;
        let author = CommentAuthor::default();
        let a = anchor_comment(&mut container, &paras[1], "one", &author, Category::Grammar).unwrap();
        let b = anchor_comment(&mut container, &paras[0], "two", &author, Category::Style).unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("0", "1"));
        assert_eq!(finalize(container, &out).unwrap(), 2);

        let pkg = DocxPackage::read(&out).unwrap();
        let comments = parse_comments(pkg.data("word/comments.xml").unwrap()).unwrap();
        assert_eq!(comments.len(), 2);

        let types = ContentTypes::parse(pkg.data(CONTENT_TYPES_PART).unwrap()).unwrap();
        assert_eq!(types.content_type_of("word/comments.xml"), Some(COMMENTS_CONTENT_TYPE));

        let rels = parse_relationships("r", pkg.data("word/_rels/document.xml.rels").unwrap()).unwrap();
        let rel = rels.iter().find(|r| r.rel_type == COMMENTS_REL_TYPE).unwrap();
        assert_eq!(rel.id, "rId2");
        assert_eq!(rel.target, "comments.xml");

        let body = String::from_utf8(pkg.data("word/document.xml").unwrap().to_vec()).unwrap();
        let start = body.find(r#"<w:commentRangeStart w:id="0"/>"#).unwrap();
        let end = body.find(r#"<w:commentRangeEnd w:id="0"/>"#).unwrap();
        let reference = body.find(r#"<w:commentReference w:id="0"/>"#).unwrap();
        let text = body.find("Second paragraph.").unwrap();
        assert!(start < text && text < end && end < reference);
        assert!(body.find("</w:pPr><w:commentRangeStart w:id=\"1\"/>").is_some());
        assert!(consistency_problems(&pkg, "word/document.xml").is_empty());
    }

    #[test]
    fn existing_comments_are_continued() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_docx(dir.path(), "in.docx", &["Alpha.", "Beta."]);
        let first = dir.path().join("first.docx");
        let second = dir.path().join("second.docx");
        let author = CommentAuthor::default();

        let mut c = DocumentContainer::open(&input).unwrap();
        let paras = c.extract().paragraphs;
        anchor_comment(&mut c, &paras[0], "a", &author, Category::Grammar).unwrap();
        finalize(c, &first).unwrap();

        let mut c = DocumentContainer::open(&first).unwrap();
        assert!(c.has_existing_comments());
        let paras = c.extract().paragraphs;
        let id = anchor_comment(&mut c, &paras[1], "b", &author, Category::Grammar).unwrap();
        assert_eq!(id, "1");
        finalize(c, &second).unwrap();

        let pkg = DocxPackage::read(&second).unwrap();
        let comments = parse_comments(pkg.data("word/comments.xml").unwrap()).unwrap();
        let ids: Vec<&str> = comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1"]);
        let rels = parse_relationships("r", pkg.data("word/_rels/document.xml.rels").unwrap()).unwrap();
        assert_eq!(rels.iter().filter(|r| r.rel_type == COMMENTS_REL_TYPE).count(), 1);
    }

    #[test]
    fn anchor_on_unknown_paragraph_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_docx(dir.path(), "in.docx", &["Only one."]);
        let mut c = DocumentContainer::open(&input).unwrap();
        let mut para = c.extract().paragraphs.remove(0);
        para.body_ordinal = 42;
        let err = anchor_comment(&mut c, &para, "x", &CommentAuthor::default(), Category::Style)
            .unwrap_err();
        assert!(matches!(err, CorrectorError::Anchor { .. }));
        assert!(c.pending_comments().is_empty());
    }
}
