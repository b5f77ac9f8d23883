use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "docx-corrector.toml";
pub const CONFIG_ENV_VAR: &str = "DOCX_CORRECTOR_CONFIG";

/// Raw `docx-corrector.toml`. Every field is optional; defaults are applied
/// when the pipeline config is resolved.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub matching: MatchingSection,
    #[serde(default)]
    pub comments: CommentsSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub chunking: ChunkingSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct MatchingSection {
    /// Minimum accepted match score (0-100).
    #[serde(default)]
    pub min_score: Option<f64>,
    /// Memoize matcher results within one run.
    #[serde(default)]
    pub cache: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CommentsSection {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub initials: Option<String>,
    #[serde(default)]
    pub include_confidence: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PipelineSection {
    #[serde(default)]
    pub backup: Option<bool>,
    #[serde(default)]
    pub dedup: Option<bool>,
    #[serde(default)]
    pub dedup_threshold: Option<f64>,
    /// Appended to the input stem when no output path is given.
    #[serde(default)]
    pub output_suffix: Option<String>,
    /// Write the run report as JSON next to the output.
    #[serde(default)]
    pub report_json: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ChunkingSection {
    #[serde(default)]
    pub max_chars: Option<usize>,
    #[serde(default)]
    pub overlap: Option<usize>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct LoggingSection {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default)]
    pub level: Option<String>,
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    if let Some(p) = find_file_upwards(workdir, filename, 8) {
        return Some(p);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 10) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).context("parse config toml")?;
    Ok(cfg)
}

/// Explicit path, then `DOCX_CORRECTOR_CONFIG`, then an upward search.
pub fn locate_config(explicit: Option<PathBuf>, workdir: &Path) -> Option<PathBuf> {
    explicit
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
        .or_else(|| find_default_config(workdir, CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_config() {
        let cfg: AppConfig = toml::from_str(
            r#"
[matching]
min_score = 80

[comments]
author = "Lektorat"
"#,
        )
        .unwrap();
        assert_eq!(cfg.matching.min_score, Some(80.0));
        assert_eq!(cfg.comments.author.as_deref(), Some("Lektorat"));
        assert!(cfg.pipeline.backup.is_none());
        assert!(cfg.logging.level.is_none());
    }

    #[test]
    fn finds_file_in_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "").unwrap();
        let found = find_file_upwards(&nested, CONFIG_FILE_NAME, 8).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE_NAME));
        assert!(find_file_upwards(&nested, "nope.toml", 1).is_none());
    }

    #[test]
    fn unknown_sections_are_rejected_as_errors_only_when_malformed() {
        assert!(toml::from_str::<AppConfig>("[matching]\nmin_score = \"high\"").is_err());
        assert!(toml::from_str::<AppConfig>("[extra]\nx = 1").is_ok());
    }
}
