//! Line-oriented front end: a REPL and a script runner over one console.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::console::Console;

pub const PROMPT: &str = "> ";

const BANNER: &[&str] = &[
    "aigmos console",
    "Commands: help (lists aliases).",
    "Exit: quit/exit",
    "",
];

fn is_exit(line: &str) -> bool {
    matches!(line.trim(), "quit" | "exit")
}

/// Prompt, read, execute, print until `quit`, `exit` or end of input.
pub fn run_repl<R: BufRead, W: Write>(console: &Console, input: R, mut output: W) -> Result<()> {
    for line in BANNER {
        writeln!(output, "{line}").context("write banner")?;
    }
    let mut lines = input.lines();
    loop {
        write!(output, "{PROMPT}").context("write prompt")?;
        output.flush().context("flush prompt")?;
        let Some(line) = lines.next() else {
            writeln!(output).context("write newline")?;
            break;
        };
        let line = line.context("read input line")?;
        if is_exit(&line) {
            break;
        }
        if let Some(reply) = console.execute(&line) {
            writeln!(output, "{reply}").context("write reply")?;
        }
    }
    Ok(())
}

/// Execute each line without prompting. Blank lines and lines starting with
/// `//` are skipped; `quit`/`exit` ends the script early.
pub fn run_lines<'a, W: Write>(
    console: &Console,
    lines: impl IntoIterator<Item = &'a str>,
    mut output: W,
) -> Result<()> {
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        if is_exit(trimmed) {
            break;
        }
        if let Some(reply) = console.execute(line) {
            writeln!(output, "{reply}").context("write reply")?;
        }
    }
    Ok(())
}
