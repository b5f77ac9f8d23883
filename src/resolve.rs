use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::CorrectorError;
use crate::ir::{MatchResult, ParagraphRecord, Suggestion};
use crate::matching::matcher::empty_strategy_counts;
use crate::matching::{Haystack, Matcher};
use crate::progress::ConsoleProgress;

pub const NO_MATCH_REASON: &str = "no text match found";

#[derive(Clone, Debug, Default, Serialize)]
pub struct ResolveStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successful matches per strategy, every strategy listed.
    pub strategy_counts: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, Default)]
pub struct Resolution {
    pub resolved: Vec<(Suggestion, MatchResult)>,
    pub failed: Vec<(Suggestion, String)>,
    pub stats: ResolveStats,
}

/// Match every suggestion, in input order, against the paragraphs.
///
/// Resolved suggestions get their span set in full-text coordinates. A
/// suggestion that cannot be placed lands in `failed`; nothing is dropped,
/// so `resolved.len() + failed.len() == suggestions.len()`.
pub fn resolve_all(
    suggestions: Vec<Suggestion>,
    paragraphs: &[ParagraphRecord],
    matcher: &mut Matcher,
    min_score: f64,
    progress: Option<&ConsoleProgress>,
) -> Resolution {
    let texts: Vec<&str> = paragraphs.iter().map(|p| p.raw_text.as_str()).collect();
    let haystack = Haystack::new(&texts);
    let total = suggestions.len();

    let mut out = Resolution {
        stats: ResolveStats {
            strategy_counts: empty_strategy_counts(),
            ..ResolveStats::default()
        },
        ..Resolution::default()
    };

    for (i, mut suggestion) in suggestions.into_iter().enumerate() {
        out.stats.attempted += 1;
        match matcher.find_best_match(&suggestion.original_excerpt, &haystack, min_score) {
            Some(m) => {
                let para = &paragraphs[m.paragraph_index];
                suggestion.span = Some(m.char_span.shifted(para.offset));
                *out.stats.strategy_counts.entry(m.strategy_name.clone()).or_default() += 1;
                out.stats.succeeded += 1;
                debug!(
                    suggestion = i,
                    paragraph = m.paragraph_index,
                    strategy = %m.strategy_name,
                    score = m.match_score,
                    "resolved suggestion"
                );
                out.resolved.push((suggestion, m));
            }
            None => {
                let err = CorrectorError::NoMatchFound;
                out.stats.failed += 1;
                debug!(suggestion = i, excerpt = %suggestion.original_excerpt, error = %err, "unresolved suggestion");
                out.failed.push((suggestion, err.to_string()));
            }
        }
        if let Some(p) = progress {
            p.progress("Resolve", i + 1, total);
        }
    }

    info!(
        attempted = out.stats.attempted,
        succeeded = out.stats.succeeded,
        failed = out.stats.failed,
        "resolution finished"
    );
    out
}
