//! Deterministic work sharding over a `#` subtree.
//!
//! Strategy `S1+S2`: every top-level child of the root becomes one shard
//! (S1) unless it holds more than `max_files` leaves, in which case its
//! leaves are chunked into shards of at most `max_files` (S2).

use serde::{Deserialize, Serialize};

use super::table::Table;

pub const PLAN_KEY: &str = "plan";
pub const STRATEGY: &str = "S1+S2";
pub const DEFAULT_MAX_FILES: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDoc {
    pub root: Vec<String>,
    pub intent: String,
    pub strategy: String,
    pub constraints: Constraints,
    pub shards: Vec<Shard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub max_files: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shard {
    pub id: String,
    pub summary: String,
    pub targets: Vec<Target>,
    pub leaf_count: usize,
}

/// Paths are relative to the plan root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Target {
    Subtree { path: Vec<String> },
    Leafs { paths: Vec<Vec<String>> },
}

/// Build the plan for `root`. `max_files` must be at least 1.
///
/// A missing or leaf root yields a plan with no shards. A previously
/// written plan leaf is not itself sharded.
pub fn build_plan(table: &Table, root: &[String], intent: &str, max_files: usize) -> PlanDoc {
    let max_files = max_files.max(1);
    let top: Vec<&String> = table
        .get(root)
        .and_then(|node| node.as_dict())
        .map(|branch| branch.keys().filter(|key| *key != PLAN_KEY).collect())
        .unwrap_or_default();

    let mut shards = Vec::new();
    for key in top {
        let mut subtree = root.to_vec();
        subtree.push(key.clone());
        let leaves = table.leaves(&subtree);

        if leaves.len() <= max_files {
            shards.push(Shard {
                id: shard_id(shards.len()),
                summary: key.clone(),
                targets: vec![Target::Subtree {
                    path: vec![key.clone()],
                }],
                leaf_count: leaves.len(),
            });
            continue;
        }

        let relative: Vec<Vec<String>> = leaves
            .into_iter()
            .map(|(path, _)| path[root.len()..].to_vec())
            .collect();
        for (n, chunk) in relative.chunks(max_files).enumerate() {
            shards.push(Shard {
                id: shard_id(shards.len()),
                summary: format!("{key} (chunk {})", n + 1),
                targets: vec![Target::Leafs {
                    paths: chunk.to_vec(),
                }],
                leaf_count: chunk.len(),
            });
        }
    }

    PlanDoc {
        root: root.to_vec(),
        intent: intent.to_string(),
        strategy: STRATEGY.to_string(),
        constraints: Constraints { max_files },
        shards,
    }
}

fn shard_id(existing: usize) -> String {
    format!("{:02}", existing + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: &str) -> Vec<String> {
        raw.split(':').map(str::to_string).collect()
    }

    fn fixture() -> Table {
        let mut table = Table::default();
        table.set_leaf(&p("repo:docs:a.md"), "a").expect("set");
        for name in ["x", "y", "z"] {
            table.set_leaf(&p(&format!("repo:src:{name}.rs")), name).expect("set");
        }
        table
    }

    #[test]
    fn small_children_become_subtree_shards() {
        let doc = build_plan(&fixture(), &p("repo"), "review", 25);
        assert_eq!(doc.shards.len(), 2);
        assert_eq!(doc.shards[0].id, "01");
        assert_eq!(
            doc.shards[0].targets,
            vec![Target::Subtree { path: p("docs") }]
        );
        assert_eq!(doc.shards[1].leaf_count, 3);
    }

    #[test]
    fn large_children_are_chunked() {
        let doc = build_plan(&fixture(), &p("repo"), "review", 2);
        let summaries: Vec<&str> = doc.shards.iter().map(|s| s.summary.as_str()).collect();
        assert_eq!(summaries, vec!["docs", "src (chunk 1)", "src (chunk 2)"]);
        assert_eq!(
            doc.shards[2].targets,
            vec![Target::Leafs {
                paths: vec![p("src:z.rs")]
            }]
        );
        assert_eq!(doc.shards[2].id, "03");
    }

    #[test]
    fn existing_plan_is_not_sharded() {
        let mut table = fixture();
        table.set_leaf(&p("repo:plan"), "{}").expect("set");
        let doc = build_plan(&table, &p("repo"), "again", 25);
        assert_eq!(doc.shards.len(), 2);
    }

    #[test]
    fn missing_root_has_no_shards() {
        let doc = build_plan(&Table::default(), &p("nowhere"), "scaffold", 25);
        assert!(doc.shards.is_empty());
        assert_eq!(doc.strategy, STRATEGY);
    }

    #[test]
    fn json_shape_tags_targets_by_kind() {
        let doc = build_plan(&fixture(), &p("repo"), "review", 2);
        let value = serde_json::to_value(&doc).expect("json");
        assert_eq!(value["constraints"]["max_files"], 2);
        assert_eq!(value["shards"][0]["targets"][0]["kind"], "subtree");
        assert_eq!(value["shards"][1]["targets"][0]["kind"], "leafs");
        assert_eq!(
            value["shards"][1]["targets"][0]["paths"][0],
            serde_json::json!(["src", "x.rs"])
        );
    }
}
