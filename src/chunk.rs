use serde::Serialize;

pub const DEFAULT_MAX_CHARS: usize = 6000;
pub const DEFAULT_OVERLAP: usize = 200;

/// A slice of the full document text handed to the analyzer. Offsets are
/// char offsets into the full text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextWindow {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Pack whole lines into windows of at most `max_chars`, breaking over-long
/// lines at whitespace. Every window after the first reaches back up to
/// `overlap` chars, snapped forward to a word boundary.
pub fn split_into_windows(full_text: &str, max_chars: usize, overlap: usize) -> Vec<TextWindow> {
    let chars: Vec<char> = full_text.chars().collect();
    let n = chars.len();
    let max_chars = max_chars.max(1);
    let mut out = Vec::new();
    let mut cursor = 0usize;

    while cursor < n {
        let hard_end = (cursor + max_chars).min(n);
        let end = if hard_end == n {
            n
        } else {
            let slice = &chars[cursor..hard_end];
            slice
                .iter()
                .rposition(|&c| c == '\n')
                .or_else(|| slice.iter().rposition(|c| c.is_whitespace()))
                .map(|i| cursor + i + 1)
                .unwrap_or(hard_end)
        };

        let start = if cursor == 0 || overlap == 0 {
            cursor
        } else {
            let back = cursor.saturating_sub(overlap);
            chars[back..cursor]
                .iter()
                .position(|c| c.is_whitespace())
                .map(|i| back + i + 1)
                .unwrap_or(cursor)
        };

        let text: String = chars[start..end].iter().collect();
        if !text.trim().is_empty() {
            out.push(TextWindow {
                index: out.len(),
                start,
                end,
                text,
            });
        }
        cursor = end;
    }
    out
}
