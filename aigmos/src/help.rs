//! `help` and `help <alias>`.

use anyhow::Result;

use crate::console::{Console, HELP};
use crate::registry::{CommandSpec, at_most};
use crate::reply::Reply;

pub const COMMAND: CommandSpec = CommandSpec::new(
    HELP,
    help,
    "Show the command surface (aliases)",
    "help [alias]",
);

const SYNTAX: &[&str] = &[
    "Syntax:",
    "  $sub         Text namespace",
    "  $sub:key     Specific text key under texts/<sub>",
    "  &name        Routine namespace",
    "  &name:idx    One routine step",
    "  #path        Table/tree path (#a:b:c); leaf via cat, node via ls",
    "  %name        Background runner (run %name ...)",
    "  *.trg        Numeric trigger bus (events)",
    "",
    "Examples:",
    "  run mk $x",
    "  run %build &build",
    "  ON %build.trg 1 Q build_ok",
    "  ON.show *.trg",
];

fn help(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 1, COMMAND.usage)?;
    if let Some(name) = args.first() {
        return Ok(describe(console, name));
    }

    let mut lines = vec![
        "HGI Command Surface".to_string(),
        "-".repeat(40),
        String::new(),
        "Surface commands:".to_string(),
    ];
    lines.extend(console.aliases().names().map(|name| format!("  - {name}")));
    lines.push(String::new());
    lines.extend(SYNTAX.iter().map(|line| line.to_string()));
    Ok(Reply::Lines(lines))
}

fn describe(console: &Console, name: &str) -> Reply {
    let Some(expansion) = console.aliases().get(name) else {
        return Reply::from("Alias not found");
    };
    let mut lines = vec![
        format!("Command: {name}"),
        "Type:    User-surface alias".to_string(),
        "Note:    Expands internally to sys.* primitive".to_string(),
        format!("Expands: {expansion}"),
    ];
    let primitive = expansion.split_whitespace().next().unwrap_or_default();
    if let Some(spec) = console.registry().get(primitive) {
        lines.push(format!("About:   {}", spec.help));
        lines.push(format!("Usage:   {}", spec.usage));
    }
    Reply::Lines(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::ConsoleConfig;

    #[test]
    fn lists_aliases_and_syntax() {
        let console = Console::new(ConsoleConfig::default()).expect("console");
        let text = console.execute("help").expect("output");
        assert!(text.starts_with("HGI Command Surface\n"), "{text}");
        assert!(text.contains("  - add.item"));
        assert!(text.contains("  - Q"));
        assert!(text.contains("*.trg"));
    }

    #[test]
    fn describes_one_alias() {
        let console = Console::new(ConsoleConfig::default()).expect("console");
        let text = console.execute("help cp").expect("output");
        assert!(text.contains("Expands: sys.cp"));
        assert!(text.contains("Usage:   cp <src> <dst>"));
        assert_eq!(console.execute("help nope").as_deref(), Some("Alias not found"));
    }
}
