//! Generic `root -> sub -> [items]` primitives.
//!
//! Indexes may be negative and count from the end.

use anyhow::{Result, bail};

use crate::console::Console;
use crate::core::store::{LIST_ROOTS, ROUTINES_ROOT};
use crate::registry::{CommandSpec, arg, at_most};
use crate::reply::Reply;

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new("sys.lst.ls", roots_ls, "List lists roots (schema anchors)", "sys.lst.ls"),
    CommandSpec::new("sys.lst.sub.ls", sub_ls, "List subs under lists root", "sys.lst.sub.ls <root>"),
    CommandSpec::new("sys.lst.sub.mk", sub_mk, "Create sub under lists root", "sys.lst.sub.mk <root> <sub>"),
    CommandSpec::new(
        "sys.lst.sub.rm",
        sub_rm,
        "Remove sub under lists root (and list)",
        "sys.lst.sub.rm <root> <sub>",
    ),
    CommandSpec::new(
        "sys.lst.items.ls",
        items_ls,
        "List items under root/sub",
        "sys.lst.items.ls <root> <sub>",
    ),
    CommandSpec::new(
        "sys.lst.item.append",
        item_append,
        "Append item under root/sub",
        "sys.lst.item.append <root> <sub> <value...>",
    )
    .values_from(2),
    CommandSpec::new(
        "sys.lst.item.get",
        item_get,
        "Get item by index under root/sub",
        "sys.lst.item.get <root> <sub> <idx>",
    ),
    CommandSpec::new(
        "sys.lst.item.set",
        item_set,
        "Set item by index under root/sub",
        "sys.lst.item.set <root> <sub> <idx> <value...>",
    )
    .values_from(3),
    CommandSpec::new(
        "sys.lst.item.del",
        item_del,
        "Delete item by index under root/sub",
        "sys.lst.item.del <root> <sub> <idx>",
    ),
    CommandSpec::new(
        "sys.lst.item.clear",
        item_clear,
        "Clear list under root/sub",
        "sys.lst.item.clear <root> <sub>",
    ),
];

/// Resolve a possibly negative index against `len`.
fn resolve_index(raw: &str, len: usize) -> Result<usize> {
    let Ok(index) = raw.parse::<i64>() else {
        bail!("Index must be integer");
    };
    let resolved = if index < 0 {
        i64::try_from(len).ok().map(|len| len + index)
    } else {
        Some(index)
    };
    match resolved.and_then(|i| usize::try_from(i).ok()) {
        Some(i) if i < len => Ok(i),
        _ => bail!("Index out of range"),
    }
}

/// Routines being executed by a runner may not be mutated.
fn ensure_writable(console: &Console, root: &str, sub: &str) -> Result<()> {
    if root == ROUTINES_ROOT {
        console.runners().ensure_unlocked(sub)?;
    }
    Ok(())
}

fn root_sub<'a>(args: &'a [String], usage: &str) -> Result<(&'a str, &'a str)> {
    Ok((arg(args, 0, usage)?, arg(args, 1, usage)?))
}

fn roots_ls(_console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 0, "sys.lst.ls")?;
    let mut roots: Vec<String> = LIST_ROOTS.iter().map(|root| root.to_string()).collect();
    roots.sort();
    Ok(Reply::Lines(roots))
}

fn sub_ls(console: &Console, args: &[String]) -> Result<Reply> {
    let root = arg(args, 0, "sys.lst.sub.ls <root>")?;
    let store = console.store();
    Ok(Reply::Lines(store.list_root(root)?.keys().cloned().collect()))
}

fn sub_mk(console: &Console, args: &[String]) -> Result<Reply> {
    let (root, sub) = root_sub(args, "sys.lst.sub.mk <root> <sub>")?;
    console
        .store()
        .list_root_mut(root)?
        .entry(sub.to_string())
        .or_default();
    Ok(Reply::ok())
}

fn sub_rm(console: &Console, args: &[String]) -> Result<Reply> {
    let (root, sub) = root_sub(args, "sys.lst.sub.rm <root> <sub>")?;
    ensure_writable(console, root, sub)?;
    let mut store = console.store();
    store.list_sub(root, sub)?;
    store.list_root_mut(root)?.remove(sub);
    Ok(Reply::ok())
}

fn items_ls(console: &Console, args: &[String]) -> Result<Reply> {
    let (root, sub) = root_sub(args, "sys.lst.items.ls <root> <sub>")?;
    let store = console.store();
    Ok(Reply::Lines(store.list_sub(root, sub)?.clone()))
}

fn item_append(console: &Console, args: &[String]) -> Result<Reply> {
    let (root, sub) = root_sub(args, "sys.lst.item.append <root> <sub> <value...>")?;
    ensure_writable(console, root, sub)?;
    let value = args[2..].join(" ");
    console.store().list_sub_mut(root, sub)?.push(value);
    Ok(Reply::ok())
}

fn item_get(console: &Console, args: &[String]) -> Result<Reply> {
    const USAGE: &str = "sys.lst.item.get <root> <sub> <idx>";
    let (root, sub) = root_sub(args, USAGE)?;
    let raw = arg(args, 2, USAGE)?;
    let store = console.store();
    let items = store.list_sub(root, sub)?;
    let index = resolve_index(raw, items.len())?;
    Ok(Reply::from(items[index].clone()))
}

fn item_set(console: &Console, args: &[String]) -> Result<Reply> {
    const USAGE: &str = "sys.lst.item.set <root> <sub> <idx> <value...>";
    let (root, sub) = root_sub(args, USAGE)?;
    let raw = arg(args, 2, USAGE)?;
    ensure_writable(console, root, sub)?;
    let value = args[3..].join(" ");
    let mut store = console.store();
    let items = store.list_sub_mut(root, sub)?;
    let index = resolve_index(raw, items.len())?;
    items[index] = value;
    Ok(Reply::ok())
}

fn item_del(console: &Console, args: &[String]) -> Result<Reply> {
    const USAGE: &str = "sys.lst.item.del <root> <sub> <idx>";
    let (root, sub) = root_sub(args, USAGE)?;
    let raw = arg(args, 2, USAGE)?;
    ensure_writable(console, root, sub)?;
    let mut store = console.store();
    let items = store.list_sub_mut(root, sub)?;
    let index = resolve_index(raw, items.len())?;
    Ok(Reply::from(items.remove(index)))
}

fn item_clear(console: &Console, args: &[String]) -> Result<Reply> {
    let (root, sub) = root_sub(args, "sys.lst.item.clear <root> <sub>")?;
    ensure_writable(console, root, sub)?;
    console.store().list_sub_mut(root, sub)?.clear();
    Ok(Reply::ok())
}
