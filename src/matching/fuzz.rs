//! Similarity scores on a 0..=100 scale.
//!
//! `ratio` is the normalized indel similarity `200 * lcs / (len_a + len_b)`.
//! The LCS length is computed bit-parallel (Hyyro), so scoring a short excerpt
//! against a long paragraph costs `O(len * ceil(excerpt / 64))`.

use std::collections::{BTreeSet, HashMap};

use super::normalize::token_process;

pub(crate) struct PatternMask {
    len: usize,
    words: usize,
    masks: HashMap<char, Vec<u64>>,
}

impl PatternMask {
    pub(crate) fn new(pattern: &[char]) -> Self {
        let words = pattern.len().div_ceil(64).max(1);
        let mut masks: HashMap<char, Vec<u64>> = HashMap::new();
        for (i, ch) in pattern.iter().enumerate() {
            let m = masks.entry(*ch).or_insert_with(|| vec![0u64; words]);
            m[i / 64] |= 1u64 << (i % 64);
        }
        Self {
            len: pattern.len(),
            words,
            masks,
        }
    }

    pub(crate) fn lcs(&self, text: &[char]) -> usize {
        if self.len == 0 || text.is_empty() {
            return 0;
        }
        let mut v = vec![u64::MAX; self.words];
        for ch in text {
            let Some(pm) = self.masks.get(ch) else {
                continue;
            };
            let mut carry = 0u64;
            for w in 0..self.words {
                let vw = v[w];
                let u = vw & pm[w];
                let (s1, o1) = vw.overflowing_add(u);
                let (s2, o2) = s1.overflowing_add(carry);
                carry = u64::from(o1 || o2);
                v[w] = s2 | (vw & !pm[w]);
            }
        }
        let mut zeros = 0usize;
        for (w, vw) in v.iter().enumerate() {
            let mask = if w + 1 == self.words && self.len % 64 != 0 {
                (1u64 << (self.len % 64)) - 1
            } else {
                u64::MAX
            };
            zeros += (!vw & mask).count_ones() as usize;
        }
        zeros
    }
}

pub(crate) fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (pattern, text) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    PatternMask::new(pattern).lcs(text)
}

fn ratio_from_lcs(lcs: usize, la: usize, lb: usize) -> f64 {
    if la + lb == 0 {
        return 100.0;
    }
    200.0 * lcs as f64 / (la + lb) as f64
}

pub fn ratio(a: &str, b: &str) -> f64 {
    let ac: Vec<char> = a.chars().collect();
    let bc: Vec<char> = b.chars().collect();
    ratio_chars(&ac, &bc)
}

pub(crate) fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    ratio_from_lcs(lcs_len(a, b), a.len(), b.len())
}

/// Best `ratio` of the shorter string against any same-length window of the
/// longer one (plus the shorter edge windows). Results below `score_cutoff`
/// are reported as 0.
pub fn partial_ratio(a: &str, b: &str, score_cutoff: f64) -> f64 {
    let ac: Vec<char> = a.chars().collect();
    let bc: Vec<char> = b.chars().collect();
    partial_ratio_chars(&ac, &bc, score_cutoff)
}

pub(crate) fn partial_ratio_chars(a: &[char], b: &[char], score_cutoff: f64) -> f64 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }
    if short.len() == long.len() {
        let r = ratio_chars(short, long);
        return if r >= score_cutoff { r } else { 0.0 };
    }

    let m = short.len();
    let n = long.len();
    let pm = PatternMask::new(short);

    let mut need: HashMap<char, usize> = HashMap::new();
    for ch in short {
        *need.entry(*ch).or_default() += 1;
    }

    // Whole-string histogram bound first; unrelated paragraphs stop here.
    let global_overlap = histogram_overlap(&need, long);
    if 100.0 * global_overlap as f64 / m as f64 + f64::EPSILON < score_cutoff {
        return 0.0;
    }

    let mut best = 0.0f64;
    let floor = |best: f64| best.max(score_cutoff);

    let mut have: HashMap<char, usize> = HashMap::new();
    let mut overlap = 0usize;
    for ch in &long[..m] {
        add_char(&need, &mut have, &mut overlap, *ch);
    }
    for start in 0..=(n - m) {
        if start > 0 {
            remove_char(&need, &mut have, &mut overlap, long[start - 1]);
            add_char(&need, &mut have, &mut overlap, long[start + m - 1]);
        }
        let bound = 100.0 * overlap as f64 / m as f64;
        if bound > best && bound + f64::EPSILON >= floor(best) {
            let r = ratio_from_lcs(pm.lcs(&long[start..start + m]), m, m);
            if r > best {
                best = r;
                if best >= 100.0 {
                    return best;
                }
            }
        }
    }

    // Edge windows shorter than the pattern (needle hanging off either end).
    for w in 1..m {
        let bound = 200.0 * w as f64 / (m + w) as f64;
        if bound <= best || bound + f64::EPSILON < score_cutoff {
            continue;
        }
        for window in [&long[..w], &long[n - w..]] {
            let r = ratio_from_lcs(pm.lcs(window), m, w);
            if r > best {
                best = r;
            }
        }
    }

    if best >= score_cutoff {
        best
    } else {
        0.0
    }
}

fn histogram_overlap(need: &HashMap<char, usize>, text: &[char]) -> usize {
    let mut have: HashMap<char, usize> = HashMap::new();
    let mut overlap = 0usize;
    for ch in text {
        add_char(need, &mut have, &mut overlap, *ch);
    }
    overlap
}

fn add_char(
    need: &HashMap<char, usize>,
    have: &mut HashMap<char, usize>,
    overlap: &mut usize,
    ch: char,
) {
    let Some(n) = need.get(&ch) else {
        return;
    };
    let h = have.entry(ch).or_default();
    if *h < *n {
        *overlap += 1;
    }
    *h += 1;
}

fn remove_char(
    need: &HashMap<char, usize>,
    have: &mut HashMap<char, usize>,
    overlap: &mut usize,
    ch: char,
) {
    let Some(n) = need.get(&ch) else {
        return;
    };
    let h = have.entry(ch).or_default();
    if *h == 0 {
        return;
    }
    *h -= 1;
    if *h < *n {
        *overlap -= 1;
    }
}

fn sorted_tokens(text: &str) -> String {
    let processed = token_process(text);
    let mut toks: Vec<&str> = processed.split(' ').filter(|t| !t.is_empty()).collect();
    toks.sort_unstable();
    toks.join(" ")
}

/// `ratio` after sorting the processed tokens of both strings.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let sa = sorted_tokens(a);
    let sb = sorted_tokens(b);
    if sa.is_empty() || sb.is_empty() {
        return 0.0;
    }
    ratio(&sa, &sb)
}

/// Set-based comparison: 100 when one token set contains the other.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let pa = token_process(a);
    let pb = token_process(b);
    let ta: BTreeSet<&str> = pa.split(' ').filter(|t| !t.is_empty()).collect();
    let tb: BTreeSet<&str> = pb.split(' ').filter(|t| !t.is_empty()).collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let sect: Vec<&str> = ta.intersection(&tb).copied().collect();
    let diff_ab: Vec<&str> = ta.difference(&tb).copied().collect();
    let diff_ba: Vec<&str> = tb.difference(&ta).copied().collect();
    if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let sect_s = sect.join(" ");
    let join = |rest: &[&str]| {
        if sect_s.is_empty() {
            rest.join(" ")
        } else {
            format!("{} {}", sect_s, rest.join(" "))
        }
    };
    let comb_ab = join(&diff_ab);
    let comb_ba = join(&diff_ba);

    let mut best = ratio(&comb_ab, &comb_ba);
    if !sect_s.is_empty() {
        best = best.max(ratio(&sect_s, &comb_ab));
        best = best.max(ratio(&sect_s, &comb_ba));
    }
    best
}

const UNBASE_SCALE: f64 = 0.95;

/// Weighted composite of the other scores, chosen by the length ratio of the
/// two processed strings. Results below `score_cutoff` are reported as 0.
pub fn weighted_ratio(a: &str, b: &str, score_cutoff: f64) -> f64 {
    let pa = token_process(a);
    let pb = token_process(b);
    let ac: Vec<char> = pa.chars().collect();
    let bc: Vec<char> = pb.chars().collect();
    if ac.is_empty() || bc.is_empty() {
        return 0.0;
    }

    let (la, lb) = (ac.len() as f64, bc.len() as f64);
    let len_ratio = la.max(lb) / la.min(lb);
    let mut end = ratio_chars(&ac, &bc);

    if len_ratio < 1.5 {
        let token = token_sort_ratio(&pa, &pb).max(token_set_ratio(&pa, &pb));
        end = end.max(token * UNBASE_SCALE);
    } else {
        let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
        let partial = partial_ratio_chars(&ac, &bc, score_cutoff / partial_scale);
        end = end.max(partial * partial_scale);

        let st_a: Vec<char> = sorted_tokens(&pa).chars().collect();
        let st_b: Vec<char> = sorted_tokens(&pb).chars().collect();
        let scale = UNBASE_SCALE * partial_scale;
        let partial_sorted = partial_ratio_chars(&st_a, &st_b, score_cutoff / scale);
        end = end.max(partial_sorted * scale);
    }

    if end >= score_cutoff {
        end
    } else {
        0.0
    }
}
