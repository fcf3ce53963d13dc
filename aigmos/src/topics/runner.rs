//! `run`, `status`, `pause`, `stop`.
//!
//! `run <cmd...>` executes one nested line in place. `run %name [target]`
//! starts a background runner; the target is a routine (`&r`, default
//! `&<name>`), a single command stored at `$sub:key` or a `#` leaf, or the
//! remaining tokens as a literal command line.

use anyhow::{Result, anyhow, bail};

use crate::console::Console;
use crate::core::store::Store;
use crate::core::symbol::{Sigil, parse_routine, parse_runner};
use crate::core::table::TableNode;
use crate::jobs::RunPlan;
use crate::registry::{CommandSpec, arg, at_most};
use crate::reply::{Outcome, Reply};

const RUN_USAGE: &str = "run <cmd...> | run %<name> <target|cmd...>";

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "sys.run",
        run,
        "Run single command or start background runner",
        RUN_USAGE,
    ),
    CommandSpec::new("sys.status", status, "Runner status", "status %<name>"),
    CommandSpec::new("sys.pause", pause, "Toggle runner pause", "pause %<name>"),
    CommandSpec::new("sys.stop", stop, "Stop runner (graceful)", "stop %<name>"),
];

fn run(console: &Console, args: &[String]) -> Result<Reply> {
    let Some(first) = args.first() else {
        bail!("run expects arguments");
    };
    if Sigil::of(first) != Some(Sigil::Runner) {
        return run_nested(console, &args.join(" "));
    }

    let name = parse_runner(first)?;
    if console.runners().is_active(name) {
        bail!("Runner already active");
    }
    let plan = {
        let store = console.store();
        match args.get(1) {
            None => routine_plan(&store, name)?,
            Some(target) => match Sigil::of(target) {
                Some(Sigil::Routine) => routine_plan(&store, parse_routine(target)?)?,
                Some(Sigil::Text | Sigil::Table) => single_plan(stored_line(&store, target)?),
                _ => single_plan(args[1..].join(" ")),
            },
        }
    };
    console.runners().start(console.handle()?, name, plan)?;
    Ok(Reply::ok())
}

/// Single-shot execution inside the current gate.
fn run_nested(console: &Console, line: &str) -> Result<Reply> {
    match console.eval(line) {
        None => Ok(Reply::Nothing),
        Some(Outcome::Reply(reply)) => Ok(reply),
        Some(Outcome::Rejected(message)) => Ok(Reply::Text(message)),
        Some(Outcome::Failed(message)) => Err(anyhow!(message)),
    }
}

fn routine_plan(store: &Store, routine: &str) -> Result<RunPlan> {
    Ok(RunPlan {
        steps: store.routine(routine)?.clone(),
        routine: Some(routine.to_string()),
    })
}

fn single_plan(line: String) -> RunPlan {
    let steps = if line.trim().is_empty() {
        Vec::new()
    } else {
        vec![line]
    };
    RunPlan {
        steps,
        routine: None,
    }
}

/// The command line stored at `$sub:key` or a `#` leaf.
fn stored_line(store: &Store, target: &str) -> Result<String> {
    if let Some(body) = target.strip_prefix('$') {
        let Some((sub, key)) = body.split_once(':') else {
            bail!("run $ expects $sub:key");
        };
        let line = store.text_sub(sub)?.get(key).map_or("", String::as_str);
        return Ok(line.trim().to_string());
    }

    let path: Vec<String> = target
        .trim_start_matches('#')
        .split(':')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();
    if path.is_empty() {
        bail!("run # expects leaf (scalar), not dict node");
    }
    match store.tables().get(&path) {
        Some(TableNode::Dict(_)) => bail!("run # expects leaf (scalar), not dict node"),
        Some(TableNode::Leaf(line)) => Ok(line.trim().to_string()),
        None => Ok(String::new()),
    }
}

fn status(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 1, "status %<name>")?;
    let name = parse_runner(arg(args, 0, "status %<name>")?)?;
    Ok(match console.runners().get(name) {
        Some(job) => Reply::Text(job.summary()),
        None => Reply::from("NOT_FOUND"),
    })
}

fn pause(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 1, "pause %<name>")?;
    let name = parse_runner(arg(args, 0, "pause %<name>")?)?;
    console.runners().pause(name)?;
    Ok(Reply::ok())
}

fn stop(console: &Console, args: &[String]) -> Result<Reply> {
    at_most(args, 1, "stop %<name>")?;
    let name = parse_runner(arg(args, 0, "stop %<name>")?)?;
    console.runners().stop(name)?;
    Ok(Reply::ok())
}
