//! aigmos binary: REPL, one-shot commands, or a script.
//!
//! With `--state` the store is loaded from a SQLite snapshot at startup
//! (when the file exists) and saved back on exit.

use std::fs;
use std::io;
use std::path::PathBuf;

use aigmos::console::Console;
use aigmos::core::store::Store;
use aigmos::exit_codes;
use aigmos::io::config::{DEFAULT_CONFIG_PATH, load_config};
use aigmos::io::snapshot::{load_snapshot, save_snapshot};
use aigmos::logging;
use aigmos::repl::{run_lines, run_repl};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "aigmos",
    version,
    about = "Deterministic command console over a symbolic store"
)]
struct Cli {
    /// Console config (TOML). A missing file means defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// SQLite snapshot to load on start and save on exit.
    #[arg(long)]
    state: Option<PathBuf>,

    /// Execute one line and exit. May be repeated.
    #[arg(short = 'c', long = "command", value_name = "LINE")]
    commands: Vec<String>,

    /// Execute every line of a file and exit.
    #[arg(long, conflicts_with = "commands")]
    script: Option<PathBuf>,
}

fn main() {
    logging::init();
    match run(Cli::parse()) {
        Ok(()) => std::process::exit(exit_codes::OK),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config)?;
    let store = match &cli.state {
        Some(path) if path.is_file() => load_snapshot(path)?,
        _ => Store::default(),
    };
    let console = Console::with_store(config, store)?;

    let script = cli
        .script
        .as_ref()
        .map(|path| {
            fs::read_to_string(path).with_context(|| format!("read script {}", path.display()))
        })
        .transpose()?;

    let stdout = io::stdout();
    let session = match &script {
        Some(text) => run_lines(&console, text.lines(), stdout.lock()),
        None if !cli.commands.is_empty() => {
            run_lines(&console, cli.commands.iter().map(String::as_str), stdout.lock())
        }
        None => run_repl(&console, io::stdin().lock(), stdout.lock()),
    };

    console.shutdown();
    if let Some(path) = &cli.state {
        save_snapshot(path, &console.snapshot())
            .with_context(|| format!("save snapshot {}", path.display()))?;
        info!(path = %path.display(), "snapshot saved");
    }
    session
}
