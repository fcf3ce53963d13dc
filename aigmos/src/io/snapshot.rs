//! SQLite snapshots of the symbolic store.
//!
//! `save_snapshot` replaces the database contents with the store;
//! `load_snapshot` rebuilds a store from it. Table nodes are kept as an
//! adjacency list: `node_path` joins the escaped segments with `:` and only
//! identifies the row; the tree is rebuilt from `parent_path` and `node_key`.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, Transaction, params};
use tracing::info;

use crate::core::store::{Store, TABLES_ROOT};
use crate::core::table::{Branch, TableNode};

pub const SCHEMA_VERSION: &str = "1";

const PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS lf_meta (
        k TEXT PRIMARY KEY,
        v TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS lf_kv_sub (
        root TEXT NOT NULL,
        sub  TEXT NOT NULL,
        PRIMARY KEY (root, sub)
    );

    CREATE TABLE IF NOT EXISTS lf_kv_item (
        root TEXT NOT NULL,
        sub  TEXT NOT NULL,
        k    TEXT NOT NULL,
        v    TEXT NOT NULL DEFAULT '',
        PRIMARY KEY (root, sub, k),
        FOREIGN KEY (root, sub) REFERENCES lf_kv_sub(root, sub) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS lf_kv_item_by_sub ON lf_kv_item(root, sub);

    CREATE TABLE IF NOT EXISTS lf_list_sub (
        root TEXT NOT NULL,
        sub  TEXT NOT NULL,
        PRIMARY KEY (root, sub)
    );

    CREATE TABLE IF NOT EXISTS lf_list_item (
        root TEXT NOT NULL,
        sub  TEXT NOT NULL,
        idx  INTEGER NOT NULL,
        v    TEXT NOT NULL DEFAULT '',
        PRIMARY KEY (root, sub, idx),
        FOREIGN KEY (root, sub) REFERENCES lf_list_sub(root, sub) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS lf_list_item_by_sub ON lf_list_item(root, sub, idx);

    CREATE TABLE IF NOT EXISTS lf_tbl_node (
        root        TEXT NOT NULL,
        node_path   TEXT NOT NULL,
        parent_path TEXT,
        node_key    TEXT,
        kind        TEXT NOT NULL CHECK(kind IN ('dict','leaf')),
        v           TEXT,
        PRIMARY KEY (root, node_path)
    );

    CREATE UNIQUE INDEX IF NOT EXISTS lf_tbl_node_siblings
        ON lf_tbl_node(root, parent_path, node_key);

    CREATE INDEX IF NOT EXISTS lf_tbl_node_children
        ON lf_tbl_node(root, parent_path);
";

fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let db = Connection::open(path)
        .with_context(|| format!("open snapshot database {}", path.display()))?;
    db.execute_batch(PRAGMAS)
        .context("set snapshot pragmas")?;
    db.execute_batch(SCHEMA)
        .context("create snapshot schema")?;
    db.execute(
        "INSERT OR IGNORE INTO lf_meta(k, v) VALUES ('schema_version', ?1)",
        params![SCHEMA_VERSION],
    )
    .context("record schema version")?;
    Ok(db)
}

fn check_version(db: &Connection) -> Result<()> {
    let version: String = db
        .query_row(
            "SELECT v FROM lf_meta WHERE k = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .context("read schema version")?;
    if version != SCHEMA_VERSION {
        bail!("unsupported snapshot schema_version {version} (expected {SCHEMA_VERSION})");
    }
    Ok(())
}

/// Replace the snapshot at `path` with the contents of `store`.
pub fn save_snapshot(path: &Path, store: &Store) -> Result<()> {
    let mut db = open(path)?;
    check_version(&db)?;
    let tx = db.transaction().context("start snapshot transaction")?;
    tx.execute_batch(
        "DELETE FROM lf_kv_item; DELETE FROM lf_kv_sub;
         DELETE FROM lf_list_item; DELETE FROM lf_list_sub;
         DELETE FROM lf_tbl_node;",
    )
    .context("clear previous snapshot")?;

    for (root, subs) in store.kvlists() {
        for (sub, items) in subs {
            tx.execute(
                "INSERT INTO lf_kv_sub (root, sub) VALUES (?1, ?2)",
                params![root, sub],
            )
            .with_context(|| format!("insert kv sub {root}/{sub}"))?;
            for (key, value) in items {
                tx.execute(
                    "INSERT INTO lf_kv_item (root, sub, k, v) VALUES (?1, ?2, ?3, ?4)",
                    params![root, sub, key, value],
                )
                .with_context(|| format!("insert kv item {root}/{sub}/{key}"))?;
            }
        }
    }

    for (root, subs) in store.lists() {
        for (sub, items) in subs {
            tx.execute(
                "INSERT INTO lf_list_sub (root, sub) VALUES (?1, ?2)",
                params![root, sub],
            )
            .with_context(|| format!("insert list sub {root}/{sub}"))?;
            for (idx, value) in items.iter().enumerate() {
                tx.execute(
                    "INSERT INTO lf_list_item (root, sub, idx, v) VALUES (?1, ?2, ?3, ?4)",
                    params![root, sub, idx as i64, value],
                )
                .with_context(|| format!("insert list item {root}/{sub}/{idx}"))?;
            }
        }
    }

    save_branch(&tx, store.tables().root(), &mut Vec::new())?;

    tx.commit().context("commit snapshot")?;
    info!(path = %path.display(), "snapshot saved");
    Ok(())
}

fn save_branch(tx: &Transaction<'_>, branch: &Branch, path: &mut Vec<String>) -> Result<()> {
    for (key, node) in branch {
        let parent_path = (!path.is_empty()).then(|| path.join(":"));
        path.push(escape_segment(key));
        let node_path = path.join(":");
        let (kind, value) = match node {
            TableNode::Dict(_) => ("dict", None),
            TableNode::Leaf(text) => ("leaf", Some(text.as_str())),
        };
        tx.execute(
            "INSERT INTO lf_tbl_node (root, node_path, parent_path, node_key, kind, v)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![TABLES_ROOT, &node_path, parent_path, key, kind, value],
        )
        .with_context(|| format!("insert table node {node_path}"))?;
        if let TableNode::Dict(children) = node {
            save_branch(tx, children, path)?;
        }
        path.pop();
    }
    Ok(())
}

/// Build a store from the snapshot at `path`.
pub fn load_snapshot(path: &Path) -> Result<Store> {
    if !path.is_file() {
        bail!("snapshot not found: {}", path.display());
    }
    let db = open(path)?;
    check_version(&db)?;
    let mut store = Store::default();

    let mut stmt = db
        .prepare("SELECT root, sub FROM lf_kv_sub ORDER BY root, sub")
        .context("prepare kv sub query")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .context("query kv subs")?;
    for row in rows {
        let (root, sub) = row.context("read kv sub row")?;
        store.kv_root_mut(&root)?.entry(sub).or_default();
    }

    let mut stmt = db
        .prepare("SELECT root, sub, k, v FROM lf_kv_item ORDER BY root, sub, k")
        .context("prepare kv item query")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .context("query kv items")?;
    for row in rows {
        let (root, sub, key, value) = row.context("read kv item row")?;
        store.kv_sub_mut(&root, &sub)?.insert(key, value);
    }

    let mut stmt = db
        .prepare("SELECT root, sub FROM lf_list_sub ORDER BY root, sub")
        .context("prepare list sub query")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .context("query list subs")?;
    for row in rows {
        let (root, sub) = row.context("read list sub row")?;
        store.list_root_mut(&root)?.entry(sub).or_default();
    }

    let mut stmt = db
        .prepare("SELECT root, sub, v FROM lf_list_item ORDER BY root, sub, idx")
        .context("prepare list item query")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .context("query list items")?;
    for row in rows {
        let (root, sub, value) = row.context("read list item row")?;
        store.list_sub_mut(&root, &sub)?.push(value);
    }

    let mut stmt = db
        .prepare(
            "SELECT node_path, parent_path, node_key, kind, v
             FROM lf_tbl_node WHERE root = ?1 ORDER BY node_path",
        )
        .context("prepare table node query")?;
    let rows = stmt
        .query_map([TABLES_ROOT], |row| {
            Ok(NodeRow {
                node_path: row.get(0)?,
                parent_path: row.get(1)?,
                node_key: row.get(2)?,
                kind: row.get(3)?,
                value: row.get(4)?,
            })
        })
        .context("query table nodes")?;
    let rows = rows
        .collect::<rusqlite::Result<Vec<NodeRow>>>()
        .context("read table node rows")?;

    let parents: HashMap<&str, (Option<&str>, &str)> = rows
        .iter()
        .map(|row| {
            (
                row.node_path.as_str(),
                (row.parent_path.as_deref(), row.node_key.as_str()),
            )
        })
        .collect();
    let mut leaves = Vec::new();
    for row in &rows {
        let path = resolve_path(&parents, &row.node_path)?;
        match row.kind.as_str() {
            "dict" => {
                store.tables_mut().ensure_dict(&path)?;
            }
            _ => leaves.push((path, row.value.clone().unwrap_or_default())),
        }
    }
    for (path, value) in leaves {
        store.tables_mut().set_leaf(&path, &value)?;
    }

    info!(path = %path.display(), "snapshot loaded");
    Ok(store)
}

struct NodeRow {
    node_path: String,
    parent_path: Option<String>,
    node_key: String,
    kind: String,
    value: Option<String>,
}

/// Backslash and `:` are escaped so distinct paths never share a `node_path`.
fn escape_segment(key: &str) -> String {
    key.replace('\\', "\\\\").replace(':', "\\:")
}

/// Walk `parent_path` links up to the root, collecting raw keys.
fn resolve_path(
    parents: &HashMap<&str, (Option<&str>, &str)>,
    node_path: &str,
) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let mut current = Some(node_path);
    while let Some(id) = current {
        if keys.len() > parents.len() {
            bail!("table node {node_path} has a cyclic parent chain");
        }
        let (parent, key) = parents
            .get(id)
            .with_context(|| format!("table node {node_path} has a missing parent {id}"))?;
        keys.push((*key).to_string());
        current = *parent;
    }
    keys.reverse();
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: &str) -> Vec<String> {
        raw.split(':').map(str::to_string).collect()
    }

    fn sample() -> Store {
        let mut store = Store::default();
        let texts = store.texts_mut().expect("texts");
        texts.entry("notes".to_string()).or_default().insert("a".into(), "alpha".into());
        texts.entry("empty".to_string()).or_default();
        store
            .routines_mut()
            .expect("routines")
            .insert("build".into(), vec!["mk $x".into(), "ls".into()]);
        store.tables_mut().set_leaf(&p("repo:src:main.rs"), "fn main() {}").expect("set");
        store.tables_mut().ensure_dict(&p("repo:empty")).expect("mk");
        store
    }

    #[test]
    fn save_then_load_preserves_store() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state").join("store.sqlite");
        let store = sample();
        save_snapshot(&path, &store).expect("save");
        assert_eq!(load_snapshot(&path).expect("load"), store);
    }

    #[test]
    fn save_replaces_previous_contents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("store.sqlite");
        save_snapshot(&path, &sample()).expect("save");
        save_snapshot(&path, &Store::default()).expect("save empty");
        assert_eq!(load_snapshot(&path).expect("load"), Store::default());
    }

    #[test]
    fn keys_with_colons_and_backslashes_round_trip() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("s.sqlite");
        let mut store = Store::default();
        store
            .tables_mut()
            .set_node(
                &p("a"),
                TableNode::Dict(Branch::from([
                    ("b:c".to_string(), TableNode::leaf("x")),
                    ("b".to_string(), TableNode::Dict(Branch::from([(
                        "c".to_string(),
                        TableNode::leaf("y"),
                    )]))),
                    ("d\\:e".to_string(), TableNode::leaf("z")),
                ])),
            )
            .expect("set");
        store
            .texts_mut()
            .expect("texts")
            .entry("keep".to_string())
            .or_default()
            .insert("k".into(), "v".into());

        save_snapshot(&path, &store).expect("save");
        assert_eq!(load_snapshot(&path).expect("load"), store);
    }

    #[test]
    fn escaped_segments_stay_distinct() {
        assert_eq!(escape_segment("a:b"), "a\\:b");
        assert_eq!(escape_segment("a\\"), "a\\\\");
        assert_ne!(
            [escape_segment("a\\"), escape_segment("b")].join(":"),
            [escape_segment("a\\:b")].join(":")
        );
    }
}
