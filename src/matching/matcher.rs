use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, trace};

use crate::ir::MatchResult;

use super::fuzz::{
    partial_ratio_chars, ratio_chars, token_set_ratio, token_sort_ratio, weighted_ratio,
};
use super::locate::locate_span;
use super::normalize::{fold_chars, normalize};

pub const DEFAULT_MIN_SCORE: f64 = 75.0;

/// Scanning stops once the best score reaches either of these.
const NEAR_EXACT_SCORE: f64 = 99.5;
const EXCELLENT_FUZZY_SCORE: f64 = 95.0;

const EXACT_EQUAL_SCORE: f64 = 100.0;
const EXACT_CONTAINED_SCORE: f64 = 99.0;

/// One paragraph as seen by the matcher.
pub struct HaystackParagraph {
    pub raw: String,
    pub normalized: String,
    folded: Vec<char>,
}

/// Paragraph texts prepared once per document.
pub struct Haystack {
    paragraphs: Vec<HaystackParagraph>,
}

impl Haystack {
    pub fn new<S: AsRef<str>>(paragraphs: &[S]) -> Self {
        let paragraphs = paragraphs
            .iter()
            .map(|p| {
                let raw = p.as_ref().to_string();
                let normalized = normalize(&raw);
                let folded = fold_chars(&normalized);
                HaystackParagraph {
                    raw,
                    normalized,
                    folded,
                }
            })
            .collect();
        Self { paragraphs }
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&HaystackParagraph> {
        self.paragraphs.get(idx)
    }
}

struct Needle {
    normalized: String,
    folded: Vec<char>,
}

type ScoreFn = fn(&Needle, &HaystackParagraph) -> f64;

/// Row of the strategy cascade. Order is priority order.
struct Strategy {
    name: &'static str,
    threshold: f64,
    discount: f64,
    score: ScoreFn,
}

const STRATEGIES: [Strategy; 5] = [
    Strategy {
        name: "exact",
        // containment scores 99 and counts as exact
        threshold: EXACT_CONTAINED_SCORE,
        discount: 1.0,
        score: score_exact,
    },
    Strategy {
        name: "partial",
        threshold: 90.0,
        discount: 0.9,
        score: score_partial,
    },
    Strategy {
        name: "token_sort",
        threshold: 85.0,
        discount: 0.8,
        score: score_token_sort,
    },
    Strategy {
        name: "token_set",
        threshold: 80.0,
        discount: 0.75,
        score: score_token_set,
    },
    Strategy {
        name: "weighted",
        threshold: 75.0,
        discount: 0.85,
        score: score_weighted,
    },
];

pub fn strategy_names() -> impl Iterator<Item = &'static str> {
    STRATEGIES.iter().map(|s| s.name)
}

fn score_exact(n: &Needle, p: &HaystackParagraph) -> f64 {
    if p.normalized == n.normalized {
        EXACT_EQUAL_SCORE
    } else if p.normalized.contains(n.normalized.as_str()) {
        EXACT_CONTAINED_SCORE
    } else {
        0.0
    }
}

/// The alignment and subset scores only look for the needle inside the
/// paragraph. A paragraph shorter than the needle (a heading quoted inside a
/// longer excerpt) is compared as a whole string instead.
fn paragraph_holds_needle(n: &Needle, p: &HaystackParagraph) -> bool {
    p.folded.len() >= n.folded.len()
}

fn score_partial(n: &Needle, p: &HaystackParagraph) -> f64 {
    if paragraph_holds_needle(n, p) {
        partial_ratio_chars(&n.folded, &p.folded, 90.0)
    } else {
        ratio_chars(&n.folded, &p.folded)
    }
}

fn score_token_sort(n: &Needle, p: &HaystackParagraph) -> f64 {
    token_sort_ratio(&n.normalized, &p.normalized)
}

fn score_token_set(n: &Needle, p: &HaystackParagraph) -> f64 {
    if paragraph_holds_needle(n, p) {
        token_set_ratio(&n.normalized, &p.normalized)
    } else {
        token_sort_ratio(&n.normalized, &p.normalized)
    }
}

fn score_weighted(n: &Needle, p: &HaystackParagraph) -> f64 {
    if paragraph_holds_needle(n, p) {
        weighted_ratio(&n.normalized, &p.normalized, 75.0)
    } else {
        ratio_chars(&n.folded, &p.folded).max(token_sort_ratio(&n.normalized, &p.normalized))
    }
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    paragraph: usize,
    strategy: usize,
    score: f64,
}

/// First accepted strategy for one paragraph.
fn evaluate(needle: &Needle, para: &HaystackParagraph) -> Option<Candidate> {
    for (i, s) in STRATEGIES.iter().enumerate() {
        let score = (s.score)(needle, para);
        if score >= s.threshold {
            return Some(Candidate {
                paragraph: 0,
                strategy: i,
                score,
            });
        }
    }
    None
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct MatcherStats {
    pub calls: usize,
    pub cache_hits: usize,
    pub paragraphs_scanned: usize,
    pub early_exits: usize,
    pub unlocatable_spans: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    needle: String,
    haystack_len: usize,
    min_score_bits: u64,
}

/// Per-run matcher. Owns the memo cache and counters; create one per document.
pub struct Matcher {
    cache_enabled: bool,
    cache: HashMap<CacheKey, Option<MatchResult>>,
    stats: MatcherStats,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Matcher {
    pub fn new(cache_enabled: bool) -> Self {
        Self {
            cache_enabled,
            cache: HashMap::new(),
            stats: MatcherStats::default(),
        }
    }

    pub fn stats(&self) -> &MatcherStats {
        &self.stats
    }

    pub fn find_best_match(
        &mut self,
        needle: &str,
        haystack: &Haystack,
        min_score: f64,
    ) -> Option<MatchResult> {
        self.stats.calls += 1;
        let normalized = normalize(needle);
        if normalized.is_empty() || haystack.is_empty() {
            return None;
        }

        let key = CacheKey {
            needle: normalized.clone(),
            haystack_len: haystack.len(),
            min_score_bits: min_score.to_bits(),
        };
        if self.cache_enabled {
            if let Some(hit) = self.cache.get(&key) {
                self.stats.cache_hits += 1;
                return hit.clone();
            }
        }

        let folded = fold_chars(&normalized);
        let result = self.scan(needle, Needle { normalized, folded }, haystack, min_score);
        if self.cache_enabled {
            self.cache.insert(key, result.clone());
        }
        result
    }

    fn scan(
        &mut self,
        raw_needle: &str,
        needle: Needle,
        haystack: &Haystack,
        min_score: f64,
    ) -> Option<MatchResult> {
        let mut best: Option<Candidate> = None;
        for (idx, para) in haystack.paragraphs.iter().enumerate() {
            if para.normalized.is_empty() {
                continue;
            }
            self.stats.paragraphs_scanned += 1;
            let Some(mut cand) = evaluate(&needle, para) else {
                continue;
            };
            cand.paragraph = idx;
            trace!(
                paragraph = idx,
                strategy = STRATEGIES[cand.strategy].name,
                score = cand.score,
                "candidate"
            );
            // Strictly greater: ties keep the earlier paragraph.
            if best.map_or(true, |b| cand.score > b.score) {
                best = Some(cand);
            }
            let top = best.map_or(0.0, |b| b.score);
            if top >= NEAR_EXACT_SCORE || top >= EXCELLENT_FUZZY_SCORE {
                self.stats.early_exits += 1;
                break;
            }
        }

        let best = best?;
        if best.score < min_score {
            debug!(score = best.score, min_score, "best candidate below min score");
            return None;
        }

        let para = &haystack.paragraphs[best.paragraph];
        let Some((span, step)) = locate_span(raw_needle, &para.raw) else {
            self.stats.unlocatable_spans += 1;
            debug!(
                paragraph = best.paragraph,
                "paragraph matched but excerpt span could not be located"
            );
            return None;
        };

        let strategy = &STRATEGIES[best.strategy];
        debug!(
            paragraph = best.paragraph,
            strategy = strategy.name,
            score = best.score,
            ?step,
            "matched excerpt"
        );
        Some(MatchResult {
            paragraph_index: best.paragraph,
            char_span: span,
            strategy_name: strategy.name.to_string(),
            match_score: best.score,
            confidence: (best.score / 100.0 * strategy.discount).clamp(0.0, 1.0),
        })
    }
}

/// Uncached one-shot search over raw paragraph texts.
pub fn find_best_match<S: AsRef<str>>(
    needle: &str,
    haystack_paragraphs: &[S],
    min_score: f64,
) -> Option<MatchResult> {
    let haystack = Haystack::new(haystack_paragraphs);
    Matcher::new(false).find_best_match(needle, &haystack, min_score)
}

/// Zero-filled per-strategy counters, in cascade order.
pub fn empty_strategy_counts() -> BTreeMap<String, usize> {
    strategy_names().map(|n| (n.to_string(), 0)).collect()
}
