//! `plan`, `plan.show`, `plan.rm`.
//!
//! The planner has no side effects beyond writing the `#<root>:plan` leaf.

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::console::Console;
use crate::core::plan::{DEFAULT_MAX_FILES, PLAN_KEY, build_plan};
use crate::core::symbol::parse_table;
use crate::core::table::TableNode;
use crate::registry::{CommandSpec, arg, at_most};
use crate::reply::Reply;

const PLAN_USAGE: &str = "plan #root <intent...> [max_files=N]";
const MAX_FILES_PREFIX: &str = "max_files=";

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "sys.plan",
        plan,
        "Create a sharded plan under #root:plan",
        PLAN_USAGE,
    ),
    CommandSpec::new("sys.plan.show", plan_show, "Show #root:plan", "plan.show #root"),
    CommandSpec::new("sys.plan.rm", plan_rm, "Remove #root:plan", "plan.rm #root"),
];

fn plan_path(root: &[String]) -> Vec<String> {
    let mut path = root.to_vec();
    path.push(PLAN_KEY.to_string());
    path
}

fn plan(console: &Console, args: &[String]) -> Result<Reply> {
    let root_token = arg(args, 0, PLAN_USAGE)?;
    if !root_token.starts_with('#') {
        bail!("plan expects a #root");
    }
    let root = parse_table(root_token)?;

    let mut max_files = DEFAULT_MAX_FILES;
    let mut intent_parts: Vec<&str> = Vec::new();
    for part in &args[1..] {
        match part.strip_prefix(MAX_FILES_PREFIX) {
            Some(raw) => {
                let raw = raw.trim();
                if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                    bail!("max_files must be integer");
                }
                max_files = raw.parse().context("max_files must be integer")?;
                if max_files == 0 {
                    bail!("max_files must be >= 1");
                }
            }
            None => intent_parts.push(part),
        }
    }
    let intent = intent_parts.join(" ");
    let intent = intent.trim();
    if intent.is_empty() {
        bail!("plan expects an intent string");
    }

    let mut store = console.store();
    let doc = build_plan(store.tables(), &root, intent, max_files);
    let json = serde_json::to_string_pretty(&doc).context("serialize plan")?;
    store.tables_mut().set_leaf(&plan_path(&root), &json)?;
    debug!(root = %root.join(":"), shards = doc.shards.len(), "plan written");
    Ok(Reply::ok())
}

fn plan_show(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 1, "plan.show #root")?;
    let root = parse_table(arg(args, 0, "plan.show #root")?)?;
    let store = console.store();
    match store.tables().get(&plan_path(&root)) {
        None => Ok(Reply::from("")),
        Some(TableNode::Dict(_)) => bail!("plan is not a leaf"),
        Some(TableNode::Leaf(text)) => Ok(Reply::from(text.clone())),
    }
}

fn plan_rm(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 1, "plan.rm #root")?;
    let root = parse_table(arg(args, 0, "plan.rm #root")?)?;
    console.store().tables_mut().remove(&plan_path(&root))?;
    Ok(Reply::ok())
}
