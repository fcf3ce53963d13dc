//! Generic `root -> sub -> key -> value` primitives.

use anyhow::Result;

use crate::console::Console;
use crate::core::store::KV_ROOTS;
use crate::registry::{CommandSpec, arg, at_most};
use crate::reply::Reply;

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new("sys.kvl.ls", roots_ls, "List kvlists roots (schema anchors)", "sys.kvl.ls"),
    CommandSpec::new("sys.kvl.sub.ls", sub_ls, "List subs under kvlists root", "sys.kvl.sub.ls <root>"),
    CommandSpec::new("sys.kvl.sub.mk", sub_mk, "Create sub under kvlists root", "sys.kvl.sub.mk <root> <sub>"),
    CommandSpec::new(
        "sys.kvl.sub.rm",
        sub_rm,
        "Remove sub under kvlists root (and keys)",
        "sys.kvl.sub.rm <root> <sub>",
    ),
    CommandSpec::new(
        "sys.kvl.sub.keys",
        sub_ls,
        "List sub-dict names under kvlists root",
        "sys.kvl.sub.keys <root>",
    ),
    CommandSpec::new("sys.kvl.kv.ls", kv_ls, "List keys under root/sub", "sys.kvl.kv.ls <root> <sub>"),
    CommandSpec::new(
        "sys.kvl.kv.set",
        kv_set,
        "Set key=value under root/sub",
        "sys.kvl.kv.set <root> <sub> <key> <value...>",
    )
    .values_from(3),
    CommandSpec::new(
        "sys.kvl.kv.get",
        kv_get,
        "Get value for key under root/sub",
        "sys.kvl.kv.get <root> <sub> <key>",
    ),
    CommandSpec::new(
        "sys.kvl.kv.del",
        kv_del,
        "Delete key under root/sub",
        "sys.kvl.kv.del <root> <sub> <key>",
    ),
    CommandSpec::new(
        "sys.kvl.kv.clear",
        kv_clear,
        "Clear all keys under root/sub",
        "sys.kvl.kv.clear <root> <sub>",
    ),
];

fn roots_ls(_console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 0, "sys.kvl.ls")?;
    let mut roots: Vec<String> = KV_ROOTS.iter().map(|root| root.to_string()).collect();
    roots.sort();
    Ok(Reply::Lines(roots))
}

fn sub_ls(console: &Console, args: &[String]) -> Result<Reply> {
    let root = arg(args, 0, "sys.kvl.sub.ls <root>")?;
    let store = console.store();
    Ok(Reply::Lines(store.kv_root(root)?.keys().cloned().collect()))
}

fn sub_mk(console: &Console, args: &[String]) -> Result<Reply> {
    const USAGE: &str = "sys.kvl.sub.mk <root> <sub>";
    let root = arg(args, 0, USAGE)?;
    let sub = arg(args, 1, USAGE)?;
    console
        .store()
        .kv_root_mut(root)?
        .entry(sub.to_string())
        .or_default();
    Ok(Reply::ok())
}

fn sub_rm(console: &Console, args: &[String]) -> Result<Reply> {
    const USAGE: &str = "sys.kvl.sub.rm <root> <sub>";
    let root = arg(args, 0, USAGE)?;
    let sub = arg(args, 1, USAGE)?;
    let mut store = console.store();
    store.kv_sub(root, sub)?;
    store.kv_root_mut(root)?.remove(sub);
    Ok(Reply::ok())
}

fn kv_ls(console: &Console, args: &[String]) -> Result<Reply> {
    const USAGE: &str = "sys.kvl.kv.ls <root> <sub>";
    let root = arg(args, 0, USAGE)?;
    let sub = arg(args, 1, USAGE)?;
    let store = console.store();
    Ok(Reply::Lines(store.kv_sub(root, sub)?.keys().cloned().collect()))
}

fn kv_set(console: &Console, args: &[String]) -> Result<Reply> {
    const USAGE: &str = "sys.kvl.kv.set <root> <sub> <key> <value...>";
    let root = arg(args, 0, USAGE)?;
    let sub = arg(args, 1, USAGE)?;
    let key = arg(args, 2, USAGE)?;
    let value = args[3..].join(" ");
    console
        .store()
        .kv_sub_mut(root, sub)?
        .insert(key.to_string(), value);
    Ok(Reply::ok())
}

fn kv_get(console: &Console, args: &[String]) -> Result<Reply> {
    const USAGE: &str = "sys.kvl.kv.get <root> <sub> <key>";
    let root = arg(args, 0, USAGE)?;
    let sub = arg(args, 1, USAGE)?;
    let key = arg(args, 2, USAGE)?;
    let store = console.store();
    Ok(store
        .kv_sub(root, sub)?
        .get(key)
        .map_or(Reply::Nothing, |value| Reply::from(value.clone())))
}

fn kv_del(console: &Console, args: &[String]) -> Result<Reply> {
    const USAGE: &str = "sys.kvl.kv.del <root> <sub> <key>";
    let root = arg(args, 0, USAGE)?;
    let sub = arg(args, 1, USAGE)?;
    let key = arg(args, 2, USAGE)?;
    let removed = console.store().kv_sub_mut(root, sub)?.remove(key);
    Ok(removed.map_or(Reply::Nothing, Reply::from))
}

fn kv_clear(console: &Console, args: &[String]) -> Result<Reply> {
    const USAGE: &str = "sys.kvl.kv.clear <root> <sub>";
    let root = arg(args, 0, USAGE)?;
    let sub = arg(args, 1, USAGE)?;
    console.store().kv_sub_mut(root, sub)?.clear();
    Ok(Reply::ok())
}
