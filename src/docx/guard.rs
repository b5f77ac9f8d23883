use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{CorrectorError, Result};

use super::container::DocumentContainer;
use super::manifest::{ContentTypes, CONTENT_TYPES_PART};
use super::package::DocxPackage;

/// `true` when the file opens as a zip, every entry decompresses with a
/// valid checksum, the content types parse and the main part is well-formed.
/// Never raises.
pub fn verify_integrity(path: &Path) -> bool {
    match check_integrity(path) {
        Ok(()) => true,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "integrity check failed");
            false
        }
    }
}

pub fn check_integrity(path: &Path) -> Result<()> {
    // Reading every entry to the end makes the zip reader verify CRC-32.
    let package = DocxPackage::read(path)?;
    let types = package
        .data(CONTENT_TYPES_PART)
        .ok_or_else(|| CorrectorError::format(path, "missing [Content_Types].xml"))?;
    ContentTypes::parse(types).map_err(|e| CorrectorError::format(path, e.to_string()))?;
    drop(package);
    DocumentContainer::open(path)?;
    Ok(())
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| CorrectorError::io(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Copy the input byte-for-byte to `<stem>_backup_<YYYYmmdd_HHMMSS>.docx`
/// beside it and verify the copy's digest.
pub fn create_backup(input: &Path) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup = free_backup_path(input, &stamp);
    fs::copy(input, &backup).map_err(|e| CorrectorError::io(&backup, e))?;

    let expected = file_sha256(input)?;
    let got = file_sha256(&backup)?;
    if got != expected {
        warn!(backup = %backup.display(), "backup digest mismatch");
        let _ = fs::remove_file(&backup);
        return Err(CorrectorError::Packaging(format!(
            "backup sha256 mismatch: expected={expected} got={got}"
        )));
    }
    info!(backup = %backup.display(), sha256 = %expected, "created backup");
    Ok(backup)
}

fn free_backup_path(input: &Path, stamp: &str) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let ext = input
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "docx".to_string());
    let mut candidate = dir.join(format!("{stem}_backup_{stamp}.{ext}"));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{stem}_backup_{stamp}_{n}.{ext}"));
        n += 1;
    }
    candidate
}
