//! `ON`, `ON.show`, `ON.reset`: bindings on the trigger bus.

use anyhow::{Result, bail};

use crate::bus::Binding;
use crate::console::Console;
use crate::core::trigger::{PURGE, is_runner_control, is_trigger_symbol, parse_value};
use crate::registry::{CommandSpec, arg, at_most};
use crate::reply::Reply;

const ON_USAGE: &str = "ON <symbol.trg> <N> <command...>";
const SHOW_USAGE: &str = "ON.show <symbol.trg|*.trg>";
const RESET_USAGE: &str = "ON.reset <symbol.trg|*.trg>";

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new("sys.ev.on", on, "Bind an event to a trigger symbol", ON_USAGE),
    CommandSpec::new("sys.ev.show", show, "Show bindings", SHOW_USAGE),
    CommandSpec::new("sys.ev.reset", reset, "Remove bindings", RESET_USAGE),
];

fn on(console: &Console, args: &[String]) -> Result<Reply> {
    let symbol = arg(args, 0, ON_USAGE)?;
    if !is_trigger_symbol(symbol) {
        bail!("ON expects a *.trg symbol");
    }
    let value = parse_value(arg(args, 1, ON_USAGE)?);
    if value == 0 {
        bail!("ON value cannot be 0");
    }
    if value == PURGE {
        bail!("ON cannot bind value 3 (3 is purge-only)");
    }
    let command = args[2..].to_vec();
    if command.is_empty() {
        bail!("ON expects a command");
    }
    if is_runner_control(&command) {
        bail!("Events cannot control runners (%)");
    }

    console.events().bind(Binding {
        symbol: symbol.to_string(),
        value,
        command,
    });
    console.ensure_event_poller()?;
    Ok(Reply::ok())
}

fn show(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 1, SHOW_USAGE)?;
    let pattern = arg(args, 0, SHOW_USAGE)?;
    Ok(Reply::Lines(console.events().show(pattern)))
}

fn reset(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 1, RESET_USAGE)?;
    let pattern = arg(args, 0, RESET_USAGE)?;
    console.events().reset(pattern);
    Ok(Reply::ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::ConsoleConfig;

    #[test]
    fn binding_validation() {
        let console = Console::new(ConsoleConfig::default()).expect("console");
        let run = |line: &str| console.execute(line).unwrap_or_default();
        assert_eq!(run("ON %a 1 ls"), "Error: ON expects a *.trg symbol");
        assert_eq!(run("ON %a.trg zero ls"), "Error: ON value cannot be 0");
        assert_eq!(
            run("ON %a.trg 3 ls"),
            "Error: ON cannot bind value 3 (3 is purge-only)"
        );
        assert_eq!(run("ON %a.trg 1"), "Error: ON expects a command");
        assert_eq!(
            run("ON %a.trg 1 stop %b"),
            "Error: Events cannot control runners (%)"
        );
        assert!(console.events().bindings().is_empty());
        console.shutdown();
    }

    #[test]
    fn bind_show_reset() {
        let console = Console::new(ConsoleConfig::default()).expect("console");
        let run = |line: &str| console.execute(line).unwrap_or_default();
        assert_eq!(run("ON %a.trg 1 mk $done"), "OK");
        assert_eq!(run("ON $f:go.trg 2 ls"), "OK");
        assert_eq!(run("ON.show %a.trg"), "%a.trg 1 mk $done");
        assert_eq!(run("ON.show *.trg"), "%a.trg 1 mk $done\n$f:go.trg 2 ls");
        assert_eq!(run("ON.reset *.trg"), "OK");
        assert_eq!(run("ON.show *.trg"), "");
        console.shutdown();
    }
}
