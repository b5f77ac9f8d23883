use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::chunk::{split_into_windows, TextWindow};
use crate::docx::extract;
use crate::ir::ParagraphRecord;

/// Paragraph dump handed to the external analyzer.
#[derive(Clone, Debug, Serialize)]
pub struct TextExport {
    pub version: u32,
    pub source: String,
    pub paragraph_count: usize,
    pub paragraphs: Vec<ParagraphRecord>,
    pub full_text: String,
    pub windows: Vec<TextWindow>,
}

pub fn build_text_export(input_docx: &Path, max_chars: usize, overlap: usize) -> anyhow::Result<TextExport> {
    let extracted = extract(input_docx).with_context(|| format!("extract text: {}", input_docx.display()))?;
    let windows = split_into_windows(&extracted.full_text, max_chars, overlap);
    Ok(TextExport {
        version: 1,
        source: input_docx.display().to_string(),
        paragraph_count: extracted.paragraphs.len(),
        paragraphs: extracted.paragraphs,
        full_text: extracted.full_text,
        windows,
    })
}

pub fn extract_text_json(
    input_docx: &Path,
    output_json: &Path,
    max_chars: usize,
    overlap: usize,
) -> anyhow::Result<()> {
    let out = build_text_export(input_docx, max_chars, overlap)?;
    fs::write(
        output_json,
        serde_json::to_vec_pretty(&out).context("serialize text json")?,
    )
    .with_context(|| format!("write text json: {}", output_json.display()))?;
    Ok(())
}

pub fn default_text_output_for(input_docx: &Path) -> PathBuf {
    let stem = input_docx
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("docx");
    let dir = input_docx.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{stem}.text.json"))
}
