//! Internal `sys.*` primitives.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::console::Console;
use crate::reply::Reply;

pub type Handler = fn(&Console, &[String]) -> Result<Reply>;

#[derive(Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub handler: Handler,
    pub help: &'static str,
    pub usage: &'static str,
    /// Index of the first argument whose `*.trg` tokens are replaced by
    /// their values. `None` keeps every argument symbolic.
    pub values_from: Option<usize>,
}

impl CommandSpec {
    pub const fn new(name: &'static str, handler: Handler, help: &'static str, usage: &'static str) -> Self {
        Self {
            name,
            handler,
            help,
            usage,
            values_from: None,
        }
    }

    pub const fn values_from(mut self, index: usize) -> Self {
        self.values_from = Some(index);
        self
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    commands: BTreeMap<&'static str, CommandSpec>,
}

impl Registry {
    pub fn register(&mut self, spec: CommandSpec) {
        self.commands.insert(spec.name, spec);
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }
}

/// Argument `index`, or a usage error.
pub fn arg<'a>(args: &'a [String], index: usize, usage: &str) -> Result<&'a str> {
    match args.get(index) {
        Some(value) => Ok(value),
        None => anyhow::bail!("usage: {usage}"),
    }
}

/// Fail when more than `max` arguments were given.
pub fn at_most(args: &[String], max: usize, usage: &str) -> Result<()> {
    if args.len() > max {
        anyhow::bail!("usage: {usage}");
    }
    Ok(())
}
