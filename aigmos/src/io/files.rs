//! Text file primitives for the filesystem boundary.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};

/// Result of a strict UTF-8 read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRead {
    Text(String),
    /// The file exists but is not valid UTF-8.
    Binary,
}

pub fn read_text(path: &Path) -> Result<TextRead> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(TextRead::Text(text)),
        Err(err) if err.kind() == ErrorKind::InvalidData => Ok(TextRead::Binary),
        Err(err) => Err(err).with_context(|| format!("read {}", path.display())),
    }
}

/// Read a file that must be UTF-8 text.
pub fn read_utf8_strict(path: &Path) -> Result<String> {
    match read_text(path)? {
        TextRead::Text(text) => Ok(text),
        TextRead::Binary => {
            let abs = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            anyhow::bail!(
                "UTF-8 decode error in file: {} (abs={})",
                path.display(),
                abs.display()
            )
        }
    }
}

/// Write via `<name>.tmp` + rename, creating parent directories.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut tmp_name = path
        .file_name()
        .with_context(|| format!("path has no file name {}", path.display()))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
