use once_cell::sync::Lazy;
use regex::Regex;

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Canonical form used for every comparison.
///
/// Typographic quotes become ASCII quotes, en/em dashes (and their relatives)
/// become `-`, whitespace runs collapse to one space, ends are trimmed.
/// `normalize(normalize(x)) == normalize(x)` holds because every mapped
/// character is mapped to a fixed point of the mapping.
pub fn normalize(text: &str) -> String {
    let mapped: String = text.chars().map(map_char).collect();
    WS_RE.replace_all(mapped.trim(), " ").into_owned()
}

fn map_char(ch: char) -> char {
    match ch {
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{00AB}' | '\u{00BB}'
        | '\u{2033}' => '"',
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2039}' | '\u{203A}'
        | '\u{2032}' | '\u{00B4}' | '`' => '\'',
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}'
        | '\u{2212}' => '-',
        '\u{00A0}' | '\u{2007}' | '\u{202F}' | '\u{2009}' | '\u{200A}' => ' ',
        '\u{200B}' | '\u{FEFF}' => ' ',
        c => c,
    }
}

/// Lowercase + non-alphanumerics to spaces, collapsed. Used by token strategies.
pub fn token_process(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            for lc in ch.to_lowercase() {
                out.push(lc);
            }
        } else {
            out.push(' ');
        }
    }
    WS_RE.replace_all(out.trim(), " ").into_owned()
}

/// One lowercase char per input char, so indices stay aligned with the input.
pub fn fold_chars(text: &str) -> Vec<char> {
    text.chars().map(fold_char).collect()
}

pub fn fold_char(ch: char) -> char {
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(c), None) => c,
        _ => ch,
    }
}
