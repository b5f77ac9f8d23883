use serde::{Deserialize, Serialize};

/// Contiguous char range `[start, end)`.
///
/// Offsets count Unicode scalar values, not bytes. A span is either
/// paragraph-local or full-document; use [`TextSpan::shifted`] to move
/// between the two.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(end >= start);
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn shifted(&self, offset: usize) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Paragraph,
    Heading,
    Caption,
    Footnote,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParagraphRecord {
    /// Ordinal among extracted (non-empty) paragraphs.
    pub index: usize,
    /// Ordinal among all `w:p` elements of the main document part.
    pub body_ordinal: usize,
    pub raw_text: String,
    pub normalized_text: String,
    pub element_type: ElementType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_id: Option<String>,
    /// Char offset of this paragraph's trimmed text inside the full text.
    pub offset: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Category {
    Grammar,
    Style,
    Clarity,
    Academic,
    Structure,
    References,
    Methodology,
    Formatting,
}

impl Category {
    /// Lenient parse for analyzer output; unknown labels fall back to `Style`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "grammar" | "spelling" | "punctuation" | "orthography" | "typo" => Self::Grammar,
            "clarity" | "readability" | "wording" => Self::Clarity,
            "academic" | "tone" | "register" | "academic_tone" => Self::Academic,
            "structure" | "organization" | "coherence" => Self::Structure,
            "references" | "reference" | "citation" | "citations" => Self::References,
            "methodology" | "method" | "methods" => Self::Methodology,
            "formatting" | "format" | "layout" => Self::Formatting,
            _ => Self::Style,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grammar => "grammar",
            Self::Style => "style",
            Self::Clarity => "clarity",
            Self::Academic => "academic",
            Self::Structure => "structure",
            Self::References => "references",
            Self::Methodology => "methodology",
            Self::Formatting => "formatting",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Grammar => "Grammar",
            Self::Style => "Style",
            Self::Clarity => "Clarity",
            Self::Academic => "Academic tone",
            Self::Structure => "Structure",
            Self::References => "References",
            Self::Methodology => "Methodology",
            Self::Formatting => "Formatting",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Grammar => "\u{270F}",
            Self::Style => "\u{1F3A8}",
            Self::Clarity => "\u{1F4A1}",
            Self::Academic => "\u{1F393}",
            Self::Structure => "\u{1F9F1}",
            Self::References => "\u{1F4DA}",
            Self::Methodology => "\u{1F52C}",
            Self::Formatting => "\u{1F4D0}",
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

fn default_confidence() -> f64 {
    0.8
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(alias = "original_text", alias = "original")]
    pub original_excerpt: String,
    #[serde(alias = "suggested", alias = "suggestion", alias = "corrected_text")]
    pub suggested_text: String,
    #[serde(default, alias = "explanation")]
    pub reason: String,
    #[serde(default = "default_category")]
    pub category: Category,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Full-document span; set once by the resolver.
    #[serde(default, skip_deserializing)]
    pub span: Option<TextSpan>,
}

fn default_category() -> Category {
    Category::Style
}

impl Suggestion {
    pub fn new(
        original_excerpt: impl Into<String>,
        suggested_text: impl Into<String>,
        reason: impl Into<String>,
        category: Category,
        confidence: f64,
    ) -> Self {
        Self {
            original_excerpt: original_excerpt.into(),
            suggested_text: suggested_text.into(),
            reason: reason.into(),
            category,
            confidence: clamp_confidence(confidence),
            span: None,
        }
    }
}

pub fn clamp_confidence(v: f64) -> f64 {
    if v.is_nan() {
        return default_confidence();
    }
    v.clamp(0.0, 1.0)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub paragraph_index: usize,
    /// Paragraph-local span inside the raw paragraph text.
    pub char_span: TextSpan,
    pub strategy_name: String,
    pub match_score: f64,
    pub confidence: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommentRecord {
    pub comment_id: String,
    pub author: String,
    pub initials: String,
    pub timestamp: String,
    pub body_text: String,
    pub paragraph_index: usize,
    pub category: Category,
}
