use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::docx::comments::comment_body_text;
use crate::docx::guard::check_integrity;
use crate::docx::{anchor_comment, create_backup, finalize, verify_integrity, DocumentContainer};
use crate::error::{CorrectorError, Result};
use crate::ir::{Category, MatchResult, ParagraphRecord, Suggestion, TextSpan};
use crate::matching::{Matcher, MatcherStats};
use crate::progress::ConsoleProgress;
use crate::resolve::{resolve_all, ResolveStats};
use crate::suggestions::dedup_suggestions;

use super::config::PipelineConfig;

pub const ANCHOR_FAILED_REASON: &str = "XML integration failed";

#[derive(Clone, Debug, Serialize)]
pub struct AnchoredComment {
    pub comment_id: String,
    pub paragraph_index: usize,
    pub strategy: String,
    pub score: f64,
    pub confidence: f64,
    pub category: Category,
    pub excerpt: String,
    pub span: Option<TextSpan>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FailedSuggestion {
    pub excerpt: String,
    pub category: Category,
    pub reason: String,
}

/// Outcome of one document run. Every input suggestion is accounted for in
/// exactly one of `comments`, `failed` or `duplicates_removed`.
#[derive(Clone, Debug, Serialize)]
pub struct ProcessReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub backup: Option<PathBuf>,
    pub paragraphs: usize,
    pub suggestions_total: usize,
    pub duplicates_removed: usize,
    pub comments: Vec<AnchoredComment>,
    pub failed: Vec<FailedSuggestion>,
    pub resolve_stats: ResolveStats,
    pub matcher_stats: MatcherStats,
}

impl ProcessReport {
    pub fn success_count(&self) -> usize {
        self.comments.len()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| CorrectorError::InvalidInput(format!("serialize report: {e}")))?;
        std::fs::write(path, bytes).map_err(|e| CorrectorError::io(path, e))
    }
}

/// One correction run. Holds the only mutable state of the process
/// (matcher cache and counters); create a fresh one per document.
pub struct CorrectionRun {
    cfg: PipelineConfig,
    progress: ConsoleProgress,
    matcher: Matcher,
}

impl CorrectionRun {
    pub fn new(cfg: PipelineConfig, progress: ConsoleProgress) -> Self {
        let matcher = Matcher::new(cfg.matcher_cache);
        Self {
            cfg,
            progress,
            matcher,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Resolve, anchor and package. Per-suggestion problems end up in the
    /// report; only unreadable input or a failed write is an error.
    pub fn process_document(
        &mut self,
        input: &Path,
        suggestions: Vec<Suggestion>,
        output: &Path,
    ) -> Result<ProcessReport> {
        if same_file(input, output) {
            return Err(CorrectorError::InvalidInput(format!(
                "output would overwrite the input: {}",
                output.display()
            )));
        }

        self.progress.info(format!("Verify {}", input.display()));
        check_integrity(input)?;

        let backup = if self.cfg.backup {
            let p = create_backup(input)?;
            self.progress.info(format!("Backup {}", p.display()));
            Some(p)
        } else {
            None
        };

        let mut container = DocumentContainer::open(input)?;
        let extracted = container.extract();
        self.progress.info(format!(
            "Extracted {} paragraphs ({} chars)",
            extracted.paragraphs.len(),
            extracted.full_text.chars().count()
        ));

        let suggestions_total = suggestions.len();
        let (suggestions, duplicates_removed) = if self.cfg.dedup {
            let d = dedup_suggestions(suggestions, self.cfg.dedup_threshold);
            (d.kept, d.duplicates.len())
        } else {
            (suggestions, 0)
        };
        if duplicates_removed > 0 {
            self.progress.info(format!("Removed {duplicates_removed} duplicate suggestions"));
        }

        let resolution = resolve_all(
            suggestions,
            &extracted.paragraphs,
            &mut self.matcher,
            self.cfg.min_score,
            Some(&self.progress),
        );

        let mut failed: Vec<FailedSuggestion> = resolution
            .failed
            .into_iter()
            .map(|(s, reason)| FailedSuggestion {
                excerpt: s.original_excerpt,
                category: s.category,
                reason,
            })
            .collect();

        let comments = self.anchor_all(
            &mut container,
            &extracted.paragraphs,
            resolution.resolved,
            &mut failed,
        )?;

        self.progress.info(format!("Write {}", output.display()));
        let written = finalize(container, output).map_err(|e| match e {
            CorrectorError::Packaging(_) => e,
            other => CorrectorError::Packaging(other.to_string()),
        })?;
        if !verify_integrity(output) {
            error!(output = %output.display(), "written document failed verification");
            let _ = std::fs::remove_file(output);
            return Err(CorrectorError::Packaging(format!(
                "output failed integrity check: {}",
                output.display()
            )));
        }

        info!(
            comments = written,
            failed = failed.len(),
            duplicates = duplicates_removed,
            "document processed"
        );
        let report = ProcessReport {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            backup,
            paragraphs: extracted.paragraphs.len(),
            suggestions_total,
            duplicates_removed,
            comments,
            failed,
            resolve_stats: resolution.stats,
            matcher_stats: self.matcher.stats().clone(),
        };

        if let Some(path) = self.cfg.report_path_for(output) {
            report.write_json(&path)?;
            self.progress.info(format!("Report {}", path.display()));
        }
        Ok(report)
    }
}

impl CorrectionRun {
    /// Anchor every resolved suggestion. Non-fatal anchor errors become
    /// failure entries; the remaining suggestions are still anchored.
    fn anchor_all(
        &self,
        container: &mut DocumentContainer,
        paragraphs: &[ParagraphRecord],
        resolved: Vec<(Suggestion, MatchResult)>,
        failed: &mut Vec<FailedSuggestion>,
    ) -> Result<Vec<AnchoredComment>> {
        let mut comments = Vec::with_capacity(resolved.len());
        let total = resolved.len();
        for (i, (s, m)) in resolved.into_iter().enumerate() {
            let body = comment_body_text(&s, self.cfg.include_confidence);
            let anchored = match paragraphs.get(m.paragraph_index) {
                Some(paragraph) => {
                    anchor_comment(container, paragraph, &body, &self.cfg.author, s.category)
                }
                None => Err(CorrectorError::Anchor {
                    paragraph_index: m.paragraph_index,
                    reason: "paragraph index out of range".to_string(),
                }),
            };
            match anchored {
                Ok(comment_id) => comments.push(AnchoredComment {
                    comment_id,
                    paragraph_index: m.paragraph_index,
                    strategy: m.strategy_name,
                    score: m.match_score,
                    confidence: m.confidence,
                    category: s.category,
                    excerpt: s.original_excerpt,
                    span: s.span,
                }),
                Err(e) if !e.is_fatal() => {
                    warn!(error = %e, excerpt = %s.original_excerpt, "anchoring failed");
                    failed.push(FailedSuggestion {
                        excerpt: s.original_excerpt,
                        category: s.category,
                        reason: ANCHOR_FAILED_REASON.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
            self.progress.progress("Anchor", i + 1, total);
        }
        Ok(comments)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
