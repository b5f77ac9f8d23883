use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};

use docx_corrector::docx::guard::check_integrity;
use docx_corrector::logging::init_logging;
use docx_corrector::pipeline::{extract_text_json, init_default_config, CorrectionRun, PipelineConfig};
use docx_corrector::progress::ConsoleProgress;
use docx_corrector::suggestions::load_suggestions;

#[derive(Parser, Debug)]
#[command(name = "docx-corrector")]
#[command(about = "Anchor AI correction suggestions as Word comments in a .docx", long_about = None)]
struct Args {
    /// Generate a default config file, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write the config file to (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite an existing config file when used with --init-config
    #[arg(long)]
    force: bool,

    /// Input .docx
    #[arg(value_name = "DOCX")]
    input: Option<PathBuf>,

    /// Suggestions JSON produced by the analyzer
    #[arg(short, long, value_name = "JSON")]
    suggestions: Option<PathBuf>,

    /// Output .docx (default: <input_stem>_corrected.docx)
    #[arg(short, long, value_name = "DOCX")]
    output: Option<PathBuf>,

    /// Config file path (default: search for docx-corrector.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum match score 0-100 (default 75)
    #[arg(long)]
    min_score: Option<f64>,

    /// Comment author name
    #[arg(long)]
    author: Option<String>,

    /// Skip the backup copy of the input
    #[arg(long)]
    no_backup: bool,

    /// Write the run report as JSON
    #[arg(long, value_name = "JSON")]
    report_json: Option<PathBuf>,

    /// Export paragraphs, full text and analysis windows as JSON
    #[arg(long, value_name = "JSON")]
    extract_text_json: Option<PathBuf>,

    /// Only check that the input is a readable .docx package
    #[arg(long)]
    verify_only: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let progress = ConsoleProgress::new(true);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let input = require_input(args.input)?;
    ensure_docx_path(&input)?;
    if !input.is_file() {
        bail!("input not found: {}", input.display());
    }

    let cfg = PipelineConfig::from_paths_and_args(
        &input,
        args.config,
        args.min_score,
        args.author,
        args.no_backup,
        args.report_json,
    )
    .context("build config")?;
    init_logging(&cfg.log_level);
    if let Some(p) = cfg.config_path.as_ref() {
        tracing::debug!(config = %p.display(), "loaded config");
    }

    if args.verify_only {
        check_integrity(&input).with_context(|| format!("verify {}", input.display()))?;
        eprintln!("OK: {}", input.display());
        return Ok(());
    }

    if let Some(text_json) = args.extract_text_json.as_ref() {
        extract_text_json(&input, text_json, cfg.chunk_max_chars, cfg.chunk_overlap)?;
        progress.info(format!("Wrote text export: {}", text_json.display()));
        if args.suggestions.is_none() {
            return Ok(());
        }
    }

    let suggestions_path = args
        .suggestions
        .context("missing --suggestions <JSON> (or use --extract-text-json / --verify-only)")?;
    let suggestions = load_suggestions(&suggestions_path)
        .with_context(|| format!("load suggestions: {}", suggestions_path.display()))?;

    let output = match args.output {
        Some(p) => p,
        None => cfg.default_output_for(&input),
    };
    ensure_docx_path(&output)?;

    let mut run = CorrectionRun::new(cfg, progress);
    let report = run
        .process_document(&input, suggestions, &output)
        .with_context(|| format!("process {}", input.display()))?;

    eprintln!(
        "Anchored {} of {} suggestions ({} failed, {} duplicates removed) -> {}",
        report.success_count(),
        report.suggestions_total,
        report.failed.len(),
        report.duplicates_removed,
        report.output.display()
    );
    for f in &report.failed {
        eprintln!("  - [{}] {}: {}", f.category.as_str(), f.reason, preview(&f.excerpt, 80));
    }
    if let Some(b) = report.backup.as_ref() {
        eprintln!("Backup: {}", b.display());
    }
    Ok(())
}

/// Print usage and fail when no input document was given.
fn require_input(input: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(p) = input {
        return Ok(p);
    }
    let mut cmd = Args::command();
    cmd.print_help().context("print help")?;
    eprintln!(
        "\n\nUSAGE:\n  docx-corrector <input.docx> --suggestions <suggestions.json>\n\nTIPS:\n  - Export text for the analyzer first with --extract-text-json.\n  - Default config search: docx-corrector.toml (upwards), or set DOCX_CORRECTOR_CONFIG.\n"
    );
    bail!("missing input .docx")
}

fn ensure_docx_path(path: &Path) -> anyhow::Result<()> {
    let is_docx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
    if !is_docx {
        bail!("not a .docx file: {}", path.display());
    }
    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}
