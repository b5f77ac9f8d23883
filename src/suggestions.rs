use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CorrectorError, Result};
use crate::ir::{clamp_confidence, Suggestion};
use crate::matching::fuzz::ratio;
use crate::matching::normalize;

pub const DEFAULT_DEDUP_THRESHOLD: f64 = 90.0;

pub fn load_suggestions(path: &Path) -> Result<Vec<Suggestion>> {
    let text = std::fs::read_to_string(path).map_err(|e| CorrectorError::io(path, e))?;
    let out = parse_suggestions(&text)?;
    debug!(path = %path.display(), count = out.len(), "loaded suggestions");
    Ok(out)
}

/// Accepts a JSON array of suggestions, an object with a `suggestions`
/// array, or analyzer output with the JSON embedded in surrounding prose or
/// code fences.
pub fn parse_suggestions(text: &str) -> Result<Vec<Suggestion>> {
    let text = text.trim_start_matches('\u{feff}').trim();
    let value = match serde_json::from_str::<Value>(text) {
        Ok(v) => v,
        Err(_) => extract_embedded_json(text)?,
    };

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("suggestions") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(CorrectorError::InvalidInput(
                    "`suggestions` must be an array".into(),
                ))
            }
            None => vec![Value::Object(map)],
        },
        other => {
            return Err(CorrectorError::InvalidInput(format!(
                "expected a JSON array or object, got {other}"
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let mut s = Suggestion::deserialize(item).map_err(|e| {
                CorrectorError::InvalidInput(format!("suggestion #{}: {e}", i + 1))
            })?;
            s.confidence = clamp_confidence(s.confidence);
            s.span = None;
            Ok(s)
        })
        .collect()
}

/// First JSON object or array in the text; trailing text is ignored.
fn extract_embedded_json(text: &str) -> Result<Value> {
    let start = text
        .find(['{', '['])
        .ok_or_else(|| CorrectorError::InvalidInput("no JSON object or array found".into()))?;
    let mut de = serde_json::Deserializer::from_str(&text[start..]);
    Value::deserialize(&mut de)
        .map_err(|e| CorrectorError::InvalidInput(format!("malformed suggestion JSON: {e}")))
}

#[derive(Clone, Debug, Default)]
pub struct DedupOutcome {
    pub kept: Vec<Suggestion>,
    /// Removed suggestions with the index (in `kept`) of the one they duplicate.
    pub duplicates: Vec<(Suggestion, usize)>,
}

/// Drop suggestions whose category matches and whose normalized excerpt
/// scores at least `threshold` against an already kept one. Order of kept
/// suggestions is preserved.
pub fn dedup_suggestions(suggestions: Vec<Suggestion>, threshold: f64) -> DedupOutcome {
    let mut out = DedupOutcome::default();
    let mut signatures: Vec<String> = Vec::new();
    for s in suggestions {
        let sig = normalize(&s.original_excerpt).to_lowercase();
        let dup_of = out.kept.iter().zip(&signatures).position(|(k, ksig)| {
            k.category == s.category && ratio(ksig, &sig) >= threshold
        });
        match dup_of {
            Some(idx) => {
                warn!(excerpt = %s.original_excerpt, category = s.category.as_str(), "dropping duplicate suggestion");
                out.duplicates.push((s, idx));
            }
            None => {
                signatures.push(sig);
                out.kept.push(s);
            }
        }
    }
    out
}
