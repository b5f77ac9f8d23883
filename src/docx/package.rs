use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{CorrectorError, Result};

/// In-memory copy of a `.docx` zip container. Entries keep their original
/// order, compression and timestamps so untouched parts are written back as
/// they were read.
pub struct DocxPackage {
    pub entries: Vec<DocxEntry>,
}

pub struct DocxEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub compression: CompressionMethod,
    pub last_modified: zip::DateTime,
    pub unix_mode: Option<u32>,
    pub is_dir: bool,
}

/// Upper bound on preallocation from an entry's declared size; the header is
/// untrusted until the CRC has been checked.
const MAX_PREALLOC: u64 = 8 * 1024 * 1024;

fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

impl DocxPackage {
    pub fn read(path: &Path) -> Result<Self> {
        let f = File::open(path).map_err(|e| CorrectorError::io(path, e))?;
        let mut zip =
            ZipArchive::new(f).map_err(|e| CorrectorError::format(path, format!("not a zip archive: {e}")))?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip
                .by_index(i)
                .map_err(|e| CorrectorError::format(path, format!("zip entry {i}: {e}")))?;
            let mut data = Vec::with_capacity(initial_capacity(file.size()));
            file.read_to_end(&mut data).map_err(|e| {
                CorrectorError::format(path, format!("read zip entry {}: {e}", file.name()))
            })?;
            entries.push(DocxEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                last_modified: file.last_modified().unwrap_or_default(),
                unix_mode: file.unix_mode(),
                is_dir: file.is_dir(),
            });
        }
        Ok(Self { entries })
    }

    pub fn entry(&self, name: &str) -> Option<&DocxEntry> {
        let name = entry_name(name);
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn data(&self, name: &str) -> Option<&[u8]> {
        self.entry(name).map(|e| e.data.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Replace an entry's bytes, or append a new deflated entry.
    pub fn set_entry(&mut self, name: &str, data: Vec<u8>) {
        let name = entry_name(name);
        if let Some(ent) = self.entries.iter_mut().find(|e| e.name == name) {
            ent.data = data;
            return;
        }
        self.entries.push(DocxEntry {
            name: name.to_string(),
            data,
            compression: CompressionMethod::Deflated,
            last_modified: zip::DateTime::default(),
            unix_mode: None,
            is_dir: false,
        });
    }

    pub fn write_into<W: Write + Seek>(&self, sink: W) -> Result<W> {
        let mut zout = ZipWriter::new(sink);
        for ent in &self.entries {
            let mut opts = SimpleFileOptions::default()
                .compression_method(ent.compression)
                .last_modified_time(ent.last_modified);
            if let Some(mode) = ent.unix_mode {
                opts = opts.unix_permissions(mode);
            }
            if ent.is_dir || ent.name.ends_with('/') {
                zout.add_directory(ent.name.as_str(), opts)
                    .map_err(|e| CorrectorError::Packaging(format!("add zip dir {}: {e}", ent.name)))?;
            } else {
                zout.start_file(ent.name.as_str(), opts)
                    .map_err(|e| CorrectorError::Packaging(format!("start zip file {}: {e}", ent.name)))?;
                zout.write_all(&ent.data)
                    .map_err(|e| CorrectorError::Packaging(format!("write zip file {}: {e}", ent.name)))?;
            }
        }
        zout.finish()
            .map_err(|e| CorrectorError::Packaging(format!("finish zip: {e}")))
    }

    /// Write to a temp file beside `output_path`, then rename it into place.
    /// A failed write leaves no partial file at `output_path`.
    pub fn write_atomic(&self, output_path: &Path) -> Result<()> {
        let dir = match output_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir).map_err(|e| CorrectorError::io(dir, e))?;
        let mut tmp = self.write_into(tmp)?;
        tmp.flush().map_err(|e| CorrectorError::io(tmp.path(), e))?;
        tmp.persist(output_path)
            .map_err(|e| CorrectorError::io(output_path, e.error))?;
        Ok(())
    }
}

/// Zip entry names never carry the leading slash used by OPC part names.
pub fn entry_name(part_name: &str) -> &str {
    part_name.trim_start_matches('/')
}

/// Resolve a relationship target against the directory of its source part.
///
/// `resolve_target("word", "comments.xml")` is `word/comments.xml`;
/// absolute targets (`/word/x.xml`) ignore the base.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(abs) = target.strip_prefix('/') {
        return abs.to_string();
    }
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// `word/document.xml` -> (`word`, `document.xml`).
pub fn split_part_path(entry: &str) -> (&str, &str) {
    match entry.rfind('/') {
        Some(i) => (&entry[..i], &entry[i + 1..]),
        None => ("", entry),
    }
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`.
pub fn rels_path_for(entry: &str) -> String {
    let (dir, file) = split_part_path(entry);
    if dir.is_empty() {
        format!("_rels/{file}.rels")
    } else {
        format!("{dir}/_rels/{file}.rels")
    }
}
