//! User-surface primitives over `$` texts, `&` routines and `#` tables.
//!
//! `$` lives under the `texts` kv root, `&` under the `routines` list root,
//! `#` is the table tree. Cross-namespace copies are allowed where a shape
//! maps cleanly; moves stay within one namespace.

use anyhow::{Context, Result, bail};

use crate::console::Console;
use crate::core::store::{KvSub, Store};
use crate::core::symbol::{
    Sigil, parse_indexed_step, parse_routine, parse_step, parse_table, parse_text,
};
use crate::core::table::{Branch, TableNode};
use crate::registry::{CommandSpec, arg, at_most};
use crate::reply::Reply;

const MK_USAGE: &str = "mk &<name> | mk $<sub> | mk #<path>";
const RM_USAGE: &str = "rm &<name> | rm $<sub> | rm #<path>";
const LS_USAGE: &str = "ls [ &<name> | $ | $<sub> | #<path> ]";
const ADD_ITEM_USAGE: &str =
    "add.item &<name> <step...> | add.item $<sub> <key> | add.item $<sub>:<key> <text...> | add.item #<path> <text...>";
const CAT_USAGE: &str = "cat (&<name> | $<sub>:<key> | #<path>)";
const CP_USAGE: &str = "cp <src> <dst>";
const MV_USAGE: &str = "mv <src> <dst>";

const OVERVIEW: &str = "$  texts      (key/value symbol store)\n\
                        &  routines   (linear execution lists)\n\
                        #  tables     (infinite dict store)";

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "sys.mk",
        mk,
        "Create a routine (&), text namespace ($), or table path (#)",
        MK_USAGE,
    ),
    CommandSpec::new(
        "sys.rm",
        rm,
        "Remove a routine (&), text namespace ($), or table node (#)",
        RM_USAGE,
    ),
    CommandSpec::new(
        "sys.ls",
        ls,
        "List routines, steps, text namespaces/keys, or table keys",
        LS_USAGE,
    ),
    CommandSpec::new(
        "sys.add.item",
        add_item,
        "Add routine step, write/append text key, or write/append table leaf",
        ADD_ITEM_USAGE,
    )
    .values_from(1),
    CommandSpec::new(
        "sys.cat",
        cat,
        "Show the contents of a $ key, & routine, or # leaf",
        CAT_USAGE,
    ),
    CommandSpec::new(
        "sys.cp",
        cp,
        "Copy between $, &, and #. Dict<->dict supports subtree clone.",
        CP_USAGE,
    ),
    CommandSpec::new(
        "sys.mv",
        mv,
        "Move/rename within $ (texts), within & (routines), or within # (tables). No cross moves.",
        MV_USAGE,
    ),
];

fn mk(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 1, MK_USAGE)?;
    let target = arg(args, 0, MK_USAGE)?;
    let mut store = console.store();
    match Sigil::of(target) {
        Some(Sigil::Routine) => {
            let name = parse_routine(target)?;
            store.routines_mut()?.entry(name.to_string()).or_default();
        }
        Some(Sigil::Text) => {
            let text = parse_text(target)?;
            if text.key.is_some() {
                bail!("mk expects $<sub> only (not $<sub>:<key>)");
            }
            store.texts_mut()?.entry(text.sub.to_string()).or_default();
        }
        Some(Sigil::Table) => {
            store.tables_mut().ensure_dict(&parse_table(target)?)?;
        }
        _ => bail!("mk expects &<name> OR $<sub> OR #<path>"),
    }
    Ok(Reply::ok())
}

fn rm(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 1, RM_USAGE)?;
    let target = arg(args, 0, RM_USAGE)?;
    match Sigil::of(target) {
        Some(Sigil::Routine) => {
            let name = parse_routine(target)?;
            console.runners().ensure_unlocked(name)?;
            let mut store = console.store();
            store.routine(name)?;
            store.routines_mut()?.remove(name);
        }
        Some(Sigil::Text) => {
            let text = parse_text(target)?;
            if text.key.is_some() {
                bail!("rm expects $<sub> only (not $<sub>:<key>)");
            }
            let mut store = console.store();
            store.text_sub(text.sub)?;
            store.texts_mut()?.remove(text.sub);
        }
        Some(Sigil::Table) => {
            let path = parse_table(target)?;
            console.store().tables_mut().remove(&path)?;
        }
        _ => bail!("rm expects &<name> OR $<sub> OR #<path>"),
    }
    Ok(Reply::ok())
}

fn ls(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 1, LS_USAGE)?;
    let Some(target) = args.first() else {
        return Ok(Reply::from(OVERVIEW));
    };
    let store = console.store();
    match target.as_str() {
        "$" => return Ok(Reply::Lines(store.texts()?.keys().cloned().collect())),
        "&" => return Ok(Reply::Lines(store.routines()?.keys().cloned().collect())),
        _ => {}
    }
    match Sigil::of(target) {
        Some(Sigil::Text) => {
            let text = parse_text(target)?;
            if text.key.is_some() {
                bail!("ls expects $<sub> only (not $<sub>:<key>)");
            }
            Ok(Reply::Lines(store.text_sub(text.sub)?.keys().cloned().collect()))
        }
        Some(Sigil::Routine) => {
            let name = parse_routine(target)?;
            Ok(Reply::Lines(store.routine(name)?.clone()))
        }
        Some(Sigil::Table) => match store.tables().get(&parse_table(target)?) {
            None => Ok(Reply::from("")),
            Some(TableNode::Leaf(_)) => bail!("ls expects a dict node; use cat for leaf values"),
            Some(TableNode::Dict(branch)) => Ok(Reply::Lines(branch.keys().cloned().collect())),
        },
        _ => bail!("ls usage: ls | ls &<name> | ls $ | ls $<sub> | ls #<path>"),
    }
}

fn add_item(console: &Console, args: &[String]) -> Result<Reply> {
    let target = arg(args, 0, ADD_ITEM_USAGE)?;
    let rest = &args[1..];
    match Sigil::of(target) {
        Some(Sigil::Routine) => {
            let name = parse_routine(target)?;
            console.runners().ensure_unlocked(name)?;
            let step = rest.join(" ").trim().to_string();
            console.store().routine_mut(name)?.push(step);
        }
        Some(Sigil::Text) => {
            let text = parse_text(target)?;
            let mut store = console.store();
            let sub = store.texts_mut()?.entry(text.sub.to_string()).or_default();
            match text.key {
                None => {
                    let [key] = rest else {
                        bail!("add.item $<sub> expects exactly one <key>");
                    };
                    sub.entry(key.clone()).or_default();
                }
                Some(key) => {
                    let addition = rest.join(" ");
                    sub.entry(key.to_string())
                        .or_default()
                        .push_str(addition.trim());
                }
            }
        }
        Some(Sigil::Table) => {
            let addition = rest.join(" ");
            let addition = addition.trim();
            if addition.is_empty() {
                bail!("add.item #<path> expects <text...>");
            }
            let path = parse_table(target)?;
            console.store().tables_mut().append_leaf(&path, addition)?;
        }
        _ => bail!("add.item expects &... or $... or #..."),
    }
    Ok(Reply::ok())
}

fn cat(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 1, CAT_USAGE)?;
    let target = arg(args, 0, CAT_USAGE)?;
    let store = console.store();
    match Sigil::of(target) {
        Some(Sigil::Text) => {
            let text = parse_text(target)?;
            let Some(key) = text.key else {
                bail!("Expected $<sub>:<key>");
            };
            let value = store.text_sub(text.sub)?.get(key).context("Key not found")?;
            Ok(Reply::from(value.clone()))
        }
        Some(Sigil::Routine) => {
            let name = parse_routine(target)?;
            Ok(Reply::Lines(store.routine(name)?.clone()))
        }
        Some(Sigil::Table) => match store.tables().get(&parse_table(target)?) {
            None => Ok(Reply::from("")),
            Some(TableNode::Dict(_)) => bail!("cat expects a leaf; use ls for dict nodes"),
            Some(TableNode::Leaf(text)) => Ok(Reply::from(text.clone())),
        },
        _ => bail!("cat expects $... or &... or #..."),
    }
}

/// Write into a step list: `None` appends, `Some(len)` appends, smaller
/// indexes overwrite.
fn write_step(steps: &mut Vec<String>, index: Option<usize>, value: String) -> Result<()> {
    match index {
        None => steps.push(value),
        Some(i) if i == steps.len() => steps.push(value),
        Some(i) => match steps.get_mut(i) {
            Some(slot) => *slot = value,
            None => bail!("Index out of range"),
        },
    }
    Ok(())
}

fn source_node(store: &Store, path: &[String]) -> Result<TableNode> {
    store
        .tables()
        .get(path)
        .cloned()
        .context("Source #path not found")
}

fn source_step(store: &Store, name: &str, index: usize) -> Result<String> {
    store
        .routine(name)?
        .get(index)
        .cloned()
        .context("Step index out of range")
}

fn source_text(store: &Store, sub: &str, key: &str) -> Result<String> {
    store
        .text_sub(sub)?
        .get(key)
        .cloned()
        .context("Source key not found")
}

fn cp(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 2, CP_USAGE)?;
    let src = arg(args, 0, CP_USAGE)?;
    let dst = arg(args, 1, CP_USAGE)?;

    // Routine destinations are checked before the store is locked.
    if Sigil::of(dst) == Some(Sigil::Routine)
        && let Ok(step) = parse_step(dst)
    {
        console.runners().ensure_unlocked(step.name)?;
    }

    let mut store = console.store();
    match (Sigil::of(src), Sigil::of(dst)) {
        (Some(Sigil::Table), Some(Sigil::Table)) => {
            let s_path = parse_table(src)?;
            let d_path = parse_table(dst)?;
            let node = source_node(&store, &s_path)?;
            store.tables_mut().set_node(&d_path, node)?;
        }
        (Some(Sigil::Text), Some(Sigil::Table)) => {
            let s = parse_text(src)?;
            let d_path = parse_table(dst)?;
            let node = match s.key {
                None => TableNode::Dict(
                    store
                        .text_sub(s.sub)?
                        .iter()
                        .map(|(key, value)| (key.clone(), TableNode::leaf(value.clone())))
                        .collect(),
                ),
                Some(key) => TableNode::Leaf(source_text(&store, s.sub, key)?),
            };
            store.tables_mut().set_node(&d_path, node)?;
        }
        (Some(Sigil::Table), Some(Sigil::Text)) => {
            let s_path = parse_table(src)?;
            let d = parse_text(dst)?;
            let node = source_node(&store, &s_path)?;
            match d.key {
                None => {
                    let TableNode::Dict(branch) = node else {
                        bail!("cp #-> $sub expects #path to be a dict node");
                    };
                    let flat = flatten(branch)?;
                    store.texts_mut()?.insert(d.sub.to_string(), flat);
                }
                Some(key) => {
                    let TableNode::Leaf(value) = node else {
                        bail!("cp #leaf -> $sub:key requires #path to be a leaf value");
                    };
                    store
                        .texts_mut()?
                        .entry(d.sub.to_string())
                        .or_default()
                        .insert(key.to_string(), value);
                }
            }
        }
        (Some(Sigil::Routine), Some(Sigil::Table)) => {
            let (name, index) =
                parse_indexed_step(src, "cp &-># supports only one step: cp &name:<idx> #path")?;
            let d_path = parse_table(dst)?;
            let step = source_step(&store, name, index)?;
            store.tables_mut().set_node(&d_path, TableNode::Leaf(step))?;
        }
        (Some(Sigil::Table), Some(Sigil::Routine)) => {
            let node = source_node(&store, &parse_table(src)?)?;
            let TableNode::Leaf(value) = node else {
                bail!("cp #->& requires #path to be a leaf value");
            };
            let d = parse_step(dst)?;
            write_step(store.routine_mut(d.name)?, d.index, value)?;
        }
        (Some(Sigil::Text), Some(Sigil::Text)) => {
            let s = parse_text(src)?;
            let d = parse_text(dst)?;
            match (s.key, d.key) {
                (None, None) => {
                    let items = store.text_sub(s.sub)?.clone();
                    store.texts_mut()?.insert(d.sub.to_string(), items);
                }
                (Some(s_key), Some(d_key)) => {
                    let value = source_text(&store, s.sub, s_key)?;
                    store
                        .texts_mut()?
                        .entry(d.sub.to_string())
                        .or_default()
                        .insert(d_key.to_string(), value);
                }
                _ => bail!("cp $->$ requires same level: $sub->$sub or $sub:key->$sub:key"),
            }
        }
        (Some(Sigil::Text), Some(Sigil::Routine)) => {
            let s = parse_text(src)?;
            let Some(s_key) = s.key else {
                bail!("cp $->& supports only one key: cp $sub:key &name[[:idx]]");
            };
            let d = parse_step(dst)?;
            store.routine(d.name)?;
            let value = source_text(&store, s.sub, s_key)?;
            write_step(store.routine_mut(d.name)?, d.index, value)?;
        }
        (Some(Sigil::Routine), Some(Sigil::Text)) => {
            let (name, index) = parse_indexed_step(
                src,
                "cp &->$ supports only one step: cp &name:<idx> $sub:key",
            )?;
            let d = parse_text(dst)?;
            let Some(d_key) = d.key else {
                bail!("cp &->$ requires $sub:key");
            };
            let step = source_step(&store, name, index)?;
            store
                .texts_mut()?
                .entry(d.sub.to_string())
                .or_default()
                .insert(d_key.to_string(), step);
        }
        (Some(Sigil::Routine), Some(Sigil::Routine)) => {
            let s_name = parse_routine(src)?;
            let d_name = parse_routine(dst)?;
            let steps = store.routine(s_name)?.clone();
            store.routines_mut()?.insert(d_name.to_string(), steps);
        }
        _ => bail!("cp supports $->$, $->&, &->$, &->&, plus $<->#, &<->#, #->#"),
    }
    Ok(Reply::ok())
}

/// A dict of leaves as a text namespace.
fn flatten(branch: Branch) -> Result<KvSub> {
    branch
        .into_iter()
        .map(|(key, node)| match node {
            TableNode::Leaf(value) => Ok((key, value)),
            TableNode::Dict(_) => {
                bail!("Cannot import nested dict into $sub (expected flat dict of scalars)")
            }
        })
        .collect()
}

fn mv(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 2, MV_USAGE)?;
    let src = arg(args, 0, MV_USAGE)?;
    let dst = arg(args, 1, MV_USAGE)?;
    if src == dst {
        return Ok(Reply::from("Need coffee?"));
    }

    match (Sigil::of(src), Sigil::of(dst)) {
        (Some(Sigil::Table), Some(Sigil::Table)) => {
            let s_path = parse_table(src)?;
            let d_path = parse_table(dst)?;
            let mut store = console.store();
            let tables = store.tables_mut();
            let node = tables.remove(&s_path)?.context("Source #path not found")?;
            if let Err(err) = tables.set_node(&d_path, node.clone()) {
                tables.set_node(&s_path, node)?;
                return Err(err);
            }
        }
        (Some(Sigil::Text), Some(Sigil::Text)) => {
            let s = parse_text(src)?;
            let d = parse_text(dst)?;
            let mut store = console.store();
            store.text_sub(s.sub)?;
            let texts = store.texts_mut()?;
            match (s.key, d.key) {
                (None, None) => {
                    let items = texts.remove(s.sub).unwrap_or_default();
                    texts.insert(d.sub.to_string(), items);
                }
                (Some(s_key), Some(d_key)) => {
                    let value = texts
                        .get_mut(s.sub)
                        .and_then(|items| items.remove(s_key))
                        .context("Source key not found")?;
                    texts
                        .entry(d.sub.to_string())
                        .or_default()
                        .insert(d_key.to_string(), value);
                }
                _ => bail!("mv $->$ requires same level: $sub->$sub or $sub:key->$sub:key"),
            }
        }
        (Some(Sigil::Routine), Some(Sigil::Routine)) => {
            let s = parse_step(src)?;
            let d = parse_step(dst)?;
            console.runners().ensure_unlocked(s.name)?;
            console.runners().ensure_unlocked(d.name)?;
            let mut store = console.store();
            store.routine(s.name)?;
            let routines = store.routines_mut()?;
            match (s.index, d.index) {
                (None, None) => {
                    let steps = routines.remove(s.name).unwrap_or_default();
                    routines.insert(d.name.to_string(), steps);
                }
                (Some(s_idx), Some(d_idx)) => {
                    let step = match routines.get_mut(s.name) {
                        Some(steps) if s_idx < steps.len() => steps.remove(s_idx),
                        _ => bail!("Source index out of range"),
                    };
                    let dst_len = routines.get(d.name).map_or(0, Vec::len);
                    if d_idx > dst_len {
                        if let Some(steps) = routines.get_mut(s.name) {
                            steps.insert(s_idx, step);
                        }
                        bail!("Destination index out of range");
                    }
                    write_step(
                        routines.entry(d.name.to_string()).or_default(),
                        Some(d_idx),
                        step,
                    )?;
                }
                _ => bail!(
                    "mv &->& requires same level: &name->&name or &name:idx->&name:idx"
                ),
            }
        }
        _ => bail!("mv supports $->$, &->&, and #-># only"),
    }
    Ok(Reply::ok())
}
