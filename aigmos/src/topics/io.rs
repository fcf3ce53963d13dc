//! The filesystem boundary: `import.*` and `export.*`.
//!
//! Default export destinations live under the configured `output_dir`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::console::Console;
use crate::core::symbol::parse_table;
use crate::core::table::TableNode;
use crate::io::files::{read_utf8_strict, write_atomic};
use crate::io::walk::{collect_tree, write_tree};
use crate::registry::{CommandSpec, arg, at_most};
use crate::reply::Reply;

const IMPORT_FILE_USAGE: &str = "import.file <src_file> <$sub:key|#path>";
const IMPORT_MANY_USAGE: &str = "import.many <src_dir> #path";
const EXPORT_FILE_USAGE: &str = "export.file <$sub:key|#path> [dst_file]";
const EXPORT_MANY_USAGE: &str = "export.many #path [dst_dir]";

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "sys.io.import.file",
        import_file,
        "Import one OS file into $ or #",
        IMPORT_FILE_USAGE,
    ),
    CommandSpec::new(
        "sys.io.import.many",
        import_many,
        "Import OS directory tree into #",
        IMPORT_MANY_USAGE,
    ),
    CommandSpec::new(
        "sys.io.export.file",
        export_file,
        "Export one $/# leaf to OS file",
        EXPORT_FILE_USAGE,
    ),
    CommandSpec::new(
        "sys.io.export.many",
        export_many,
        "Export one # tree to OS directory",
        EXPORT_MANY_USAGE,
    ),
];

/// `$sub:key` with both parts present.
fn split_text_key(token: &str) -> Result<(&str, &str)> {
    token
        .strip_prefix('$')
        .and_then(|body| body.split_once(':'))
        .filter(|(sub, key)| !sub.is_empty() && !key.is_empty())
        .context("Expected $<sub>:<key>")
}

/// `$sub:key` -> `sub__key.txt`, `#a:b` -> `a__b.txt`.
fn auto_file_name(src: &str) -> String {
    let body = src.strip_prefix(['$', '#']).unwrap_or(src);
    format!("{}.txt", body.replace(':', "__"))
}

fn auto_dir_name(src: &str) -> String {
    src.strip_prefix('#').unwrap_or(src).replace(':', "__")
}

fn import_file(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 2, IMPORT_FILE_USAGE)?;
    let src = Path::new(arg(args, 0, IMPORT_FILE_USAGE)?);
    let dst = arg(args, 1, IMPORT_FILE_USAGE)?;
    if !src.is_file() {
        bail!("import.file expects a readable file path");
    }
    let text = read_utf8_strict(src)?;

    if dst.starts_with('$') {
        let (sub, key) = split_text_key(dst)?;
        console
            .store()
            .texts_mut()?
            .entry(sub.to_string())
            .or_default()
            .insert(key.to_string(), text);
    } else if dst.starts_with('#') {
        let path = parse_table(dst)?;
        console.store().tables_mut().set_leaf(&path, &text)?;
    } else {
        bail!("import.file dst must be $sub:key or #path");
    }
    Ok(Reply::ok())
}

fn import_many(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 2, IMPORT_MANY_USAGE)?;
    let src = Path::new(arg(args, 0, IMPORT_MANY_USAGE)?);
    let dst = arg(args, 1, IMPORT_MANY_USAGE)?;
    if !src.is_dir() {
        bail!("import.many expects a directory path");
    }
    if !dst.starts_with('#') {
        bail!("import.many dst must be #path root");
    }
    let root = parse_table(dst)?;

    let tree = collect_tree(src)?;
    let mut store = console.store();
    let tables = store.tables_mut();
    tables.ensure_dict(&root)?;
    for file in &tree.files {
        let mut path = root.clone();
        path.extend(file.rel.iter().cloned());
        tables.set_leaf(&path, &file.text)?;
    }
    info!(src = %src.display(), stats = %tree.stats, "directory imported");
    Ok(Reply::Text(format!("OK {}", tree.stats)))
}

fn export_file(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 2, EXPORT_FILE_USAGE)?;
    let src = arg(args, 0, EXPORT_FILE_USAGE)?;

    let text = {
        let store = console.store();
        if src.starts_with('$') {
            let (sub, key) = split_text_key(src)?;
            store.text_sub(sub)?.get(key).cloned().context("Key not found")?
        } else if src.starts_with('#') {
            match store.tables().get(&parse_table(src)?) {
                None => bail!("Source #path not found"),
                Some(TableNode::Dict(_)) => {
                    bail!("export.file expects a leaf; use export.many for trees")
                }
                Some(TableNode::Leaf(text)) => text.clone(),
            }
        } else {
            bail!("export.file src must be $sub:key or #path");
        }
    };

    let dst = match args.get(1) {
        Some(dst) => PathBuf::from(dst),
        None => console.config().output_dir.join(auto_file_name(src)),
    };
    write_atomic(&dst, &text)?;
    Ok(Reply::Text(dst.display().to_string()))
}

fn export_many(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 2, EXPORT_MANY_USAGE)?;
    let src = arg(args, 0, EXPORT_MANY_USAGE)?;
    if !src.starts_with('#') {
        bail!("export.many src must be #path root");
    }
    let root = parse_table(src)?;

    let leaves: Vec<(Vec<String>, String)> = {
        let store = console.store();
        let tables = store.tables();
        match tables.get(&root) {
            None => bail!("Source #root not found"),
            Some(TableNode::Leaf(_)) => bail!("export.many expects a dict root"),
            Some(TableNode::Dict(_)) => tables
                .leaves(&root)
                .into_iter()
                .map(|(path, text)| (path[root.len()..].to_vec(), text))
                .collect(),
        }
    };

    let dst = match args.get(1) {
        Some(dst) => PathBuf::from(dst),
        None => console.config().output_dir.join(auto_dir_name(src)),
    };
    write_tree(&dst, &leaves)?;
    Ok(Reply::Text(dst.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_names_flatten_separators() {
        assert_eq!(auto_file_name("$notes:title"), "notes__title.txt");
        assert_eq!(auto_file_name("#a:b:c"), "a__b__c.txt");
        assert_eq!(auto_dir_name("#docs:src"), "docs__src");
    }

    #[test]
    fn text_keys_need_both_parts() {
        assert_eq!(split_text_key("$a:b").expect("split"), ("a", "b"));
        for bad in ["$a", "$:b", "$a:", "a:b"] {
            assert_eq!(
                split_text_key(bad).unwrap_err().to_string(),
                "Expected $<sub>:<key>"
            );
        }
    }
}
