use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CorrectorError, Result};
use crate::ir::CommentRecord;

use super::comments::{max_comment_id, new_comments_part};
use super::extract::{extract_paragraphs, ExtractedText, StyleCatalog};
use super::manifest::{
    parse_relationships, COMMENTS_REL_TYPE, CONTENT_TYPES_PART,
    OFFICE_DOCUMENT_REL_TYPE, PACKAGE_RELS_PART, STYLES_REL_TYPE,
};
use super::package::{rels_path_for, resolve_target, split_part_path, DocxPackage};
use super::xml::{parse_xml_part, XmlPart};

const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// Unpacked document held in memory for one run. Exactly one writer mutates
/// it: the anchor step edits `body` and queues comments, the assembler
/// serializes everything once.
pub struct DocumentContainer {
    pub(crate) source_path: PathBuf,
    pub(crate) package: DocxPackage,
    pub(crate) main_part: String,
    pub(crate) body: XmlPart,
    pub(crate) styles: StyleCatalog,
    pub(crate) comments: Option<XmlPart>,
    pub(crate) comments_entry: String,
    pub(crate) pending: Vec<CommentRecord>,
    next_comment_id: u64,
}

impl DocumentContainer {
    pub fn open(path: &Path) -> Result<Self> {
        let package = DocxPackage::read(path)?;
        if !package.contains(CONTENT_TYPES_PART) {
            return Err(CorrectorError::format(path, "missing [Content_Types].xml"));
        }

        let main_part = locate_main_part(&package, path)?;
        let body_bytes = package
            .data(&main_part)
            .ok_or_else(|| CorrectorError::format(path, format!("missing main part {main_part}")))?;
        let body = parse_xml_part(&main_part, body_bytes)
            .map_err(|e| CorrectorError::format(path, e.to_string()))?;

        let (dir, _) = split_part_path(&main_part);
        let dir = dir.to_string();
        let main_rels = match package.data(&rels_path_for(&main_part)) {
            Some(bytes) => parse_relationships(&rels_path_for(&main_part), bytes)
                .map_err(|e| CorrectorError::format(path, e.to_string()))?,
            None => Vec::new(),
        };

        let styles_entry = main_rels
            .iter()
            .find(|r| r.rel_type == STYLES_REL_TYPE && !r.external)
            .map(|r| resolve_target(&dir, &r.target))
            .unwrap_or_else(|| resolve_target(&dir, "styles.xml"));
        let styles = match package.data(&styles_entry) {
            Some(bytes) => StyleCatalog::parse(bytes).unwrap_or_else(|e| {
                warn!(part = %styles_entry, error = %e, "ignoring unreadable styles part");
                StyleCatalog::default()
            }),
            None => StyleCatalog::default(),
        };

        let existing_comments = main_rels
            .iter()
            .find(|r| r.rel_type == COMMENTS_REL_TYPE && !r.external)
            .map(|r| resolve_target(&dir, &r.target));
        let (comments, comments_entry) = match existing_comments {
            Some(entry) => match package.data(&entry) {
                Some(bytes) => {
                    let part = parse_xml_part(&entry, bytes)
                        .map_err(|e| CorrectorError::format(path, e.to_string()))?;
                    (Some(part), entry)
                }
                None => (None, entry),
            },
            None => (None, resolve_target(&dir, "comments.xml")),
        };
        let next_comment_id = comments
            .as_ref()
            .and_then(max_comment_id)
            .map(|m| m + 1)
            .unwrap_or(0);

        debug!(
            path = %path.display(),
            main_part = %main_part,
            existing_comments = comments.is_some(),
            next_comment_id,
            "opened document container"
        );

        Ok(Self {
            source_path: path.to_path_buf(),
            package,
            main_part,
            body,
            styles,
            comments,
            comments_entry,
            pending: Vec::new(),
            next_comment_id,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn main_part(&self) -> &str {
        &self.main_part
    }

    pub fn body(&self) -> &XmlPart {
        &self.body
    }

    pub fn comments_entry(&self) -> &str {
        &self.comments_entry
    }

    pub fn has_existing_comments(&self) -> bool {
        self.comments.is_some()
    }

    pub fn extract(&self) -> ExtractedText {
        extract_paragraphs(&self.body.events, &self.styles)
    }

    pub fn pending_comments(&self) -> &[CommentRecord] {
        &self.pending
    }

    pub(crate) fn allocate_comment_id(&mut self) -> u64 {
        let id = self.next_comment_id;
        self.next_comment_id += 1;
        id
    }

    pub(crate) fn take_comments_part(&mut self) -> XmlPart {
        self.comments
            .take()
            .unwrap_or_else(|| new_comments_part(&self.comments_entry))
    }
}

fn locate_main_part(package: &DocxPackage, path: &Path) -> Result<String> {
    if let Some(bytes) = package.data(PACKAGE_RELS_PART) {
        let rels = parse_relationships(PACKAGE_RELS_PART, bytes)
            .map_err(|e| CorrectorError::format(path, e.to_string()))?;
        if let Some(rel) = rels.iter().find(|r| r.rel_type == OFFICE_DOCUMENT_REL_TYPE) {
            let entry = resolve_target("", &rel.target);
            if package.contains(&entry) {
                return Ok(entry);
            }
            warn!(target = %rel.target, "officeDocument relationship points to a missing part");
        }
    }
    if package.contains(DEFAULT_MAIN_PART) {
        return Ok(DEFAULT_MAIN_PART.to_string());
    }
    Err(CorrectorError::format(path, "no main document part"))
}
