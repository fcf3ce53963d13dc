//! Directory import honoring cascading `.ignore` files.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::files::{TextRead, read_text};
use crate::core::ignore::{IGNORE_FILE, IgnoreRule, is_ignored, parse_rules};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub imported: usize,
    pub skipped_ignore: usize,
    pub skipped_binary: usize,
    pub skipped_other: usize,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "imported={} skipped_ignore={} skipped_binary={} skipped_other={}",
            self.imported, self.skipped_ignore, self.skipped_binary, self.skipped_other
        )
    }
}

/// One imported file: path segments relative to the import root, and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedFile {
    pub rel: Vec<String>,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeImport {
    pub files: Vec<ImportedFile>,
    pub stats: ImportStats,
}

/// Read every UTF-8 file under `root` in sorted order.
///
/// Ignored directories are not entered. Non-UTF-8 files count as binary;
/// unreadable entries and non-UTF-8 names count as other.
pub fn collect_tree(root: &Path) -> Result<TreeImport> {
    if !root.is_dir() {
        anyhow::bail!("import.many expects a directory path");
    }
    let mut out = TreeImport::default();
    walk_dir(root, root, &[], &mut out)?;
    debug!(root = %root.display(), stats = %out.stats, "tree collected");
    Ok(out)
}

fn walk_dir(root: &Path, dir: &Path, inherited: &[IgnoreRule], out: &mut TreeImport) -> Result<()> {
    let mut rules = inherited.to_vec();
    rules.extend(load_rules(dir));

    let Ok(read_dir) = fs::read_dir(dir) else {
        debug!(dir = %dir.display(), "directory unreadable, skipping");
        return Ok(());
    };
    let mut entries: Vec<PathBuf> = Vec::new();
    for entry in read_dir {
        match entry {
            Ok(entry) => entries.push(entry.path()),
            Err(_) => out.stats.skipped_other += 1,
        }
    }
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    for path in entries {
        let Ok(meta) = fs::metadata(&path) else {
            out.stats.skipped_other += 1;
            continue;
        };
        let is_dir = meta.is_dir();

        if is_ignored(&path, is_dir, &rules) {
            out.stats.skipped_ignore += 1;
            continue;
        }
        if is_dir {
            walk_dir(root, &path, &rules, out)?;
            continue;
        }
        if !meta.is_file() {
            continue;
        }

        let Some(rel) = relative_segments(root, &path) else {
            out.stats.skipped_other += 1;
            continue;
        };
        match read_text(&path) {
            Ok(TextRead::Text(text)) => {
                out.files.push(ImportedFile { rel, text });
                out.stats.imported += 1;
            }
            Ok(TextRead::Binary) => out.stats.skipped_binary += 1,
            Err(err) => {
                debug!(path = %path.display(), err = %format!("{err:#}"), "skipping unreadable file");
                out.stats.skipped_other += 1;
            }
        }
    }
    Ok(())
}

fn load_rules(dir: &Path) -> Vec<IgnoreRule> {
    let path = dir.join(IGNORE_FILE);
    if !path.is_file() {
        return Vec::new();
    }
    // A non-UTF-8 ignore file is skipped and the import carries on.
    match read_text(&path) {
        Ok(TextRead::Text(contents)) => parse_rules(dir, &contents),
        _ => Vec::new(),
    }
}

fn relative_segments(root: &Path, path: &Path) -> Option<Vec<String>> {
    path.strip_prefix(root)
        .ok()?
        .iter()
        .map(|segment| segment.to_str().map(str::to_string))
        .collect()
}

/// Write `text` to `dir/<rel...>` for every leaf, atomically.
pub fn write_tree(dir: &Path, leaves: &[(Vec<String>, String)]) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    for (rel, text) in leaves {
        if rel.is_empty() {
            continue;
        }
        let path = rel.iter().fold(dir.to_path_buf(), |acc, seg| acc.join(seg));
        super::files::write_atomic(&path, text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, contents: &[u8]) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, contents).expect("write");
    }

    #[test]
    fn cascading_ignores_and_counts() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        write(root, ".ignore", b"*.log\nbuild/\n");
        write(root, "a.txt", b"A");
        write(root, "debug.log", b"noise");
        write(root, "build/out.txt", b"skip");
        write(root, "src/.ignore", b"!keep.log\n");
        write(root, "src/keep.log", b"kept");
        write(root, "src/img.bin", &[0xff, 0xfe]);

        let import = collect_tree(root).expect("collect");
        let rels: Vec<String> = import.files.iter().map(|f| f.rel.join("/")).collect();
        assert_eq!(rels, vec![".ignore", "a.txt", "src/.ignore", "src/keep.log"]);
        assert_eq!(
            import.stats,
            ImportStats {
                imported: 4,
                skipped_ignore: 2,
                skipped_binary: 1,
                skipped_other: 0,
            }
        );
        assert_eq!(
            import.stats.to_string(),
            "imported=4 skipped_ignore=2 skipped_binary=1 skipped_other=0"
        );
    }

    #[test]
    fn missing_directory_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = collect_tree(&temp.path().join("nope")).unwrap_err();
        assert_eq!(err.to_string(), "import.many expects a directory path");
    }

    #[test]
    fn write_tree_materializes_leaves() {
        let temp = tempfile::tempdir().expect("tempdir");
        let leaves = vec![
            (vec!["a.txt".to_string()], "A".to_string()),
            (vec!["d".to_string(), "b.txt".to_string()], "B".to_string()),
        ];
        write_tree(temp.path(), &leaves).expect("write");
        assert_eq!(fs::read_to_string(temp.path().join("d/b.txt")).expect("read"), "B");
    }
}
