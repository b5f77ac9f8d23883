mod config;
mod export;
mod run;

pub use config::{init_default_config, PipelineConfig};
pub use export::{build_text_export, default_text_output_for, extract_text_json, TextExport};
pub use run::{AnchoredComment, CorrectionRun, FailedSuggestion, ProcessReport, ANCHOR_FAILED_REASON};
