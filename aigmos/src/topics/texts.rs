//! Authoring helpers pinned to the `texts` root.

use anyhow::Result;

use crate::console::Console;
use crate::registry::{CommandSpec, arg};
use crate::reply::Reply;

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "sys.t.key.ensure",
        key_ensure,
        "Ensure empty key under texts/<sub>",
        "sys.t.key.ensure <sub> <key>",
    ),
    CommandSpec::new(
        "sys.t.text.append",
        text_append,
        "Append text to texts/<sub>/<key>",
        "sys.t.text.append <sub> <key> <text...>",
    )
    .values_from(2),
];

fn key_ensure(console: &Console, args: &[String]) -> Result<Reply> {
    const USAGE: &str = "sys.t.key.ensure <sub> <key>";
    let sub = arg(args, 0, USAGE)?;
    let key = arg(args, 1, USAGE)?;
    console
        .store()
        .texts_mut()?
        .entry(sub.to_string())
        .or_default()
        .entry(key.to_string())
        .or_default();
    Ok(Reply::ok())
}

fn text_append(console: &Console, args: &[String]) -> Result<Reply> {
    const USAGE: &str = "sys.t.text.append <sub> <key> <text...>";
    let sub = arg(args, 0, USAGE)?;
    let key = arg(args, 1, USAGE)?;
    let addition = args[2..].join(" ");
    console
        .store()
        .texts_mut()?
        .entry(sub.to_string())
        .or_default()
        .entry(key.to_string())
        .or_default()
        .push_str(&addition);
    Ok(Reply::ok())
}
