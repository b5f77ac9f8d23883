use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::chunk::{DEFAULT_MAX_CHARS, DEFAULT_OVERLAP};
use crate::config::{load_config, locate_config, AppConfig, CONFIG_FILE_NAME};
use crate::docx::CommentAuthor;
use crate::matching::DEFAULT_MIN_SCORE;
use crate::suggestions::DEFAULT_DEDUP_THRESHOLD;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub workdir: PathBuf,
    /// Config file that was loaded, if any.
    pub config_path: Option<PathBuf>,

    pub min_score: f64,
    pub matcher_cache: bool,

    pub author: CommentAuthor,
    pub include_confidence: bool,

    pub backup: bool,
    pub dedup: bool,
    pub dedup_threshold: f64,
    pub output_suffix: String,
    pub report_json: bool,
    pub report_json_path: Option<PathBuf>,

    pub chunk_max_chars: usize,
    pub chunk_overlap: usize,

    pub log_level: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default(), PathBuf::from("."), None)
    }
}

impl PipelineConfig {
    pub fn from_paths_and_args(
        input: &Path,
        config_path: Option<PathBuf>,
        min_score: Option<f64>,
        author: Option<String>,
        no_backup: bool,
        report_json: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let workdir = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let workdir = workdir.canonicalize().unwrap_or(workdir);

        let explicit = config_path.is_some();
        let cfg_file = locate_config(config_path, &workdir);
        let mut file_cfg = AppConfig::default();
        let mut loaded = None;
        if let Some(p) = cfg_file {
            if p.exists() {
                file_cfg = load_config(&p)?;
                loaded = Some(p);
            } else if explicit {
                return Err(anyhow!("config not found: {}", p.display()));
            }
        }

        let mut cfg = Self::from_app_config(&file_cfg, workdir, loaded);
        if let Some(s) = min_score {
            cfg.min_score = s;
        }
        if let Some(a) = author.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
            cfg.author.initials = initials_of(&a);
            cfg.author.name = a;
        }
        if no_backup {
            cfg.backup = false;
        }
        if report_json.is_some() {
            cfg.report_json = true;
            cfg.report_json_path = report_json;
        }
        cfg.validate().context("validate config")?;
        Ok(cfg)
    }

    pub fn from_app_config(file_cfg: &AppConfig, workdir: PathBuf, config_path: Option<PathBuf>) -> Self {
        let defaults = CommentAuthor::default();
        let author_name = file_cfg
            .comments
            .author
            .clone()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let initials = file_cfg
            .comments
            .initials
            .clone()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| author_name.as_deref().map(initials_of))
            .unwrap_or(defaults.initials);
        let author = CommentAuthor {
            name: author_name.unwrap_or(defaults.name),
            initials,
        };

        Self {
            workdir,
            config_path,
            min_score: file_cfg.matching.min_score.unwrap_or(DEFAULT_MIN_SCORE),
            matcher_cache: file_cfg.matching.cache.unwrap_or(true),
            author,
            include_confidence: file_cfg.comments.include_confidence.unwrap_or(true),
            backup: file_cfg.pipeline.backup.unwrap_or(true),
            dedup: file_cfg.pipeline.dedup.unwrap_or(true),
            dedup_threshold: file_cfg
                .pipeline
                .dedup_threshold
                .unwrap_or(DEFAULT_DEDUP_THRESHOLD),
            output_suffix: file_cfg
                .pipeline
                .output_suffix
                .clone()
                .unwrap_or_else(|| "_corrected".to_string()),
            report_json: file_cfg.pipeline.report_json.unwrap_or(false),
            report_json_path: None,
            chunk_max_chars: file_cfg.chunking.max_chars.unwrap_or(DEFAULT_MAX_CHARS).max(1),
            chunk_overlap: file_cfg.chunking.overlap.unwrap_or(DEFAULT_OVERLAP),
            log_level: file_cfg
                .logging
                .level
                .clone()
                .unwrap_or_else(|| "info".to_string()),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=100.0).contains(&self.min_score) {
            return Err(anyhow!("min_score must be within 0..=100, got {}", self.min_score));
        }
        if !(0.0..=100.0).contains(&self.dedup_threshold) {
            return Err(anyhow!(
                "dedup_threshold must be within 0..=100, got {}",
                self.dedup_threshold
            ));
        }
        if self.chunk_overlap >= self.chunk_max_chars {
            return Err(anyhow!(
                "chunking.overlap ({}) must be smaller than chunking.max_chars ({})",
                self.chunk_overlap,
                self.chunk_max_chars
            ));
        }
        Ok(())
    }

    /// `<stem><suffix>.docx` beside the input.
    pub fn default_output_for(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output")
            .to_string();
        input.with_file_name(format!("{stem}{}.docx", self.output_suffix))
    }

    pub fn report_path_for(&self, output: &Path) -> Option<PathBuf> {
        if !self.report_json {
            return None;
        }
        Some(
            self.report_json_path
                .clone()
                .unwrap_or_else(|| output.with_extension("report.json")),
        )
    }
}

fn initials_of(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .filter_map(|w| w.chars().next())
        .flat_map(|c| c.to_uppercase())
        .take(3)
        .collect();
    if initials.is_empty() {
        "AI".to_string()
    } else {
        initials
    }
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILE_NAME);
    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG_TOML: &str = r#"[matching]
# Suggestions scoring below this (0-100) are reported as unmatched.
min_score = 75.0
cache = true

[comments]
author = "AI Corrector"
initials = "AI"
include_confidence = true

[pipeline]
backup = true
dedup = true
dedup_threshold = 90.0
output_suffix = "_corrected"
report_json = false

[chunking]
# Analysis windows for --extract-text-json.
max_chars = 6000
overlap = 200

[logging]
# Overridden by RUST_LOG.
level = "info"
"#;
