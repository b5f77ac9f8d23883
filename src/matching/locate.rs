use crate::ir::TextSpan;

use super::fuzz::{partial_ratio_chars, ratio_chars};
use super::normalize::fold_chars;

const PREFIX_CHARS: usize = 30;
const LEAD_WORDS: usize = 5;
const MIN_WINDOW: usize = 50;
const WINDOW_STEP: usize = 5;
const WINDOW_MIN_SCORE: f64 = 70.0;

/// Which rung of the ladder produced a span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocateStep {
    Direct,
    CaseInsensitive,
    Prefix,
    LeadWords,
    Window,
}

/// Find the needle inside the raw paragraph text.
///
/// The prefix and lead-word rungs extend the span to the full needle length
/// (clamped to the paragraph end) even though only part of the needle was
/// matched; the window rung accepts any window scoring at least 70.
pub fn locate_span(needle: &str, paragraph: &str) -> Option<(TextSpan, LocateStep)> {
    let needle_len = needle.chars().count();
    let para_len = paragraph.chars().count();
    if needle_len == 0 || para_len == 0 {
        return None;
    }

    if let Some(start) = find_char_offset(paragraph, needle) {
        return Some((TextSpan::new(start, start + needle_len), LocateStep::Direct));
    }

    let para_folded = fold_chars(paragraph);
    let needle_folded = fold_chars(needle);
    if let Some(start) = find_chars(&para_folded, &needle_folded) {
        return Some((
            TextSpan::new(start, start + needle_len),
            LocateStep::CaseInsensitive,
        ));
    }

    if needle_len > PREFIX_CHARS {
        let prefix: String = needle.chars().take(PREFIX_CHARS).collect();
        if let Some(start) = find_char_offset(paragraph, &prefix) {
            let end = (start + needle_len).min(para_len);
            return Some((TextSpan::new(start, end), LocateStep::Prefix));
        }
    }

    let lead = needle
        .split_whitespace()
        .take(LEAD_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    if !lead.is_empty() {
        if let Some(start) = find_char_offset(paragraph, &lead) {
            let end = (start + needle_len).min(para_len);
            return Some((TextSpan::new(start, end), LocateStep::LeadWords));
        }
    }

    best_window(&needle_folded, &para_folded).map(|span| (span, LocateStep::Window))
}

fn best_window(needle: &[char], para: &[char]) -> Option<TextSpan> {
    let window = needle.len().max(MIN_WINDOW);
    if para.len() <= window {
        let score = window_score(needle, para);
        return (score >= WINDOW_MIN_SCORE).then(|| TextSpan::new(0, para.len()));
    }

    let last_start = para.len() - window;
    let mut starts: Vec<usize> = (0..=last_start).step_by(WINDOW_STEP).collect();
    if starts.last() != Some(&last_start) {
        starts.push(last_start);
    }

    let mut best: Option<(f64, usize)> = None;
    for start in starts {
        let score = window_score(needle, &para[start..start + window]);
        if score >= WINDOW_MIN_SCORE && best.map_or(true, |(b, _)| score > b) {
            best = Some((score, start));
        }
    }
    best.map(|(_, start)| TextSpan::new(start, start + window))
}

fn window_score(needle: &[char], window: &[char]) -> f64 {
    ratio_chars(needle, window).max(partial_ratio_chars(needle, window, WINDOW_MIN_SCORE))
}

fn find_char_offset(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .find(needle)
        .map(|byte| haystack[..byte].chars().count())
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
