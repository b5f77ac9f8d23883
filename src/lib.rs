//! Anchor AI-generated correction suggestions as native Word comments.
//!
//! Suggestions quote an excerpt of the document; the matcher finds the
//! paragraph each excerpt came from, and the docx layer attaches a comment
//! to that paragraph and repackages the file.

pub mod chunk;
pub mod config;
pub mod docx;
pub mod error;
pub mod ir;
pub mod logging;
pub mod matching;
pub mod pipeline;
pub mod progress;
pub mod resolve;
pub mod suggestions;

pub use error::{CorrectorError, Result};
