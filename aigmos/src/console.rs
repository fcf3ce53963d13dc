//! The console: one pipeline for every line.
//!
//! `raw` -> whitespace split -> surface gate -> expansion -> dispatch.
//!
//! Only surface aliases and `help` may start a line. Expansion rewrites the
//! tokens to a fixpoint (alias head replacement first, then trigger values),
//! and the resulting `sys.*` head is looked up in the registry. Execution is
//! serialized by a single gate shared by the REPL, runner threads and the
//! event poller.

use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::alias::AliasTable;
use crate::bus::EventBus;
use crate::core::expand::{self, Expander};
use crate::core::store::Store;
use crate::core::table::TableNode;
use crate::core::trigger;
use crate::help;
use crate::io::config::ConsoleConfig;
use crate::jobs::Runners;
use crate::registry::Registry;
use crate::reply::{Outcome, Reply};
use crate::topics;

pub const HELP: &str = "help";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEntry {
    In(String),
    Out(String),
}

#[derive(Debug)]
pub struct Console {
    config: ConsoleConfig,
    aliases: AliasTable,
    registry: Registry,
    store: Mutex<Store>,
    runners: Runners,
    events: EventBus,
    gate: Mutex<()>,
    history: Mutex<Vec<HistoryEntry>>,
    this: Weak<Console>,
}

impl Console {
    pub fn new(config: ConsoleConfig) -> Result<Arc<Self>> {
        Self::with_store(config, Store::default())
    }

    pub fn with_store(config: ConsoleConfig, store: Store) -> Result<Arc<Self>> {
        config.validate()?;
        let aliases = AliasTable::with_overrides(&config.aliases);
        let mut registry = Registry::default();
        registry.register(help::COMMAND);
        for spec in topics::all_commands() {
            registry.register(*spec);
        }
        Ok(Arc::new_cyclic(|this| Self {
            config,
            aliases,
            registry,
            store: Mutex::new(store),
            runners: Runners::default(),
            events: EventBus::default(),
            gate: Mutex::new(()),
            history: Mutex::new(Vec::new()),
            this: this.clone(),
        }))
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Exclusive access to the store. Do not hold across nested execution.
    pub fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock()
    }

    pub fn snapshot(&self) -> Store {
        self.store.lock().clone()
    }

    pub fn replace_store(&self, store: Store) {
        *self.store.lock() = store;
    }

    pub fn runners(&self) -> &Runners {
        &self.runners
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().clone()
    }

    /// A strong handle for work that outlives the current call.
    pub fn handle(&self) -> Result<Arc<Self>> {
        self.this.upgrade().context("console is shutting down")
    }

    /// Run one line and render the result.
    pub fn execute(&self, raw: &str) -> Option<String> {
        self.execute_outcome(raw).and_then(Outcome::render)
    }

    /// Run one line under the execution gate.
    pub fn execute_outcome(&self, raw: &str) -> Option<Outcome> {
        let _gate = self.gate.lock();
        self.eval(raw)
    }

    /// The pipeline itself. Callers must hold the gate.
    pub(crate) fn eval(&self, raw: &str) -> Option<Outcome> {
        self.history.lock().push(HistoryEntry::In(raw.to_string()));

        let parts: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
        let head = parts.first()?;
        if head != HELP && !self.aliases.contains(head) {
            debug!(head = %head, "rejected by surface gate");
            return Some(Outcome::Rejected("Unknown command".to_string()));
        }

        let parts = match self.expand(parts) {
            Ok(parts) => parts,
            Err(err) => return Some(self.record(Outcome::Failed(format!("{err:#}")))),
        };
        let (cmd, args) = parts.split_first()?;
        let Some(spec) = self.registry.get(cmd) else {
            return Some(Outcome::Rejected(format!("Unknown command: {cmd}")));
        };

        debug!(cmd = %cmd, args = args.len(), "dispatch");
        let outcome = match (spec.handler)(self, args) {
            Ok(reply) => Outcome::Reply(reply),
            Err(err) => Outcome::Failed(format!("{err:#}")),
        };
        Some(self.record(outcome))
    }

    fn record(&self, outcome: Outcome) -> Outcome {
        if let Some(text) = outcome.clone().render() {
            self.history.lock().push(HistoryEntry::Out(text));
        }
        outcome
    }

    /// Run a `sys.*` primitive directly, with no gate and no expansion.
    pub fn dispatch_internal(&self, parts: &[String]) -> Result<Reply> {
        let Some((cmd, args)) = parts.split_first() else {
            return Ok(Reply::Nothing);
        };
        let spec = self
            .registry
            .get(cmd)
            .ok_or_else(|| anyhow!("Unknown command: {cmd}"))?;
        (spec.handler)(self, args)
    }

    /// Expand tokens to a fixpoint.
    pub fn expand(&self, parts: Vec<String>) -> Result<Vec<String>> {
        let aliases = |parts: &[String]| self.aliases.expand(parts);
        let runner_triggers = |parts: &[String]| {
            self.trigger_pass(parts, |token| {
                trigger::runner_symbol(token).map(|name| i64::from(self.runners.trigger(name)))
            })
        };
        let text_triggers = |parts: &[String]| {
            self.trigger_pass(parts, |token| {
                trigger::text_symbol(token).map(|(sub, key)| self.text_trigger(sub, key))
            })
        };
        let table_triggers = |parts: &[String]| {
            self.trigger_pass(parts, |token| {
                trigger::table_symbol(token).map(|path| self.table_trigger(&path))
            })
        };
        let expanders: [&Expander<'_>; 4] =
            [&aliases, &runner_triggers, &text_triggers, &table_triggers];
        expand::expand(parts, self.config.expand_max_passes, &expanders)
    }

    /// Substitute trigger values in the value arguments of the head
    /// primitive. Reference arguments keep their symbols.
    fn trigger_pass(
        &self,
        parts: &[String],
        resolve: impl Fn(&str) -> Option<i64>,
    ) -> Option<Vec<String>> {
        let (head, args) = parts.split_first()?;
        let from = self.registry.get(head)?.values_from?;
        let values = trigger::substitute(args.get(from..)?, resolve)?;
        let mut out = Vec::with_capacity(parts.len());
        out.push(head.clone());
        out.extend_from_slice(&args[..from]);
        out.extend(values);
        Some(out)
    }

    fn text_trigger(&self, sub: &str, key: &str) -> i64 {
        let store = self.store.lock();
        store
            .text_sub(sub)
            .ok()
            .and_then(|items| items.get(key))
            .map_or(0, |value| trigger::parse_value(value))
    }

    fn table_trigger(&self, path: &[String]) -> i64 {
        let store = self.store.lock();
        match store.tables().get(path) {
            Some(TableNode::Leaf(value)) => trigger::parse_value(value),
            _ => 0,
        }
    }

    /// Current integer value of a trigger symbol; unknown symbols read 0.
    pub fn resolve_trigger(&self, symbol: &str) -> i64 {
        if let Some(name) = trigger::runner_symbol(symbol) {
            return i64::from(self.runners.trigger(name));
        }
        if let Some((sub, key)) = trigger::text_symbol(symbol) {
            return self.text_trigger(sub, key);
        }
        if let Some(path) = trigger::table_symbol(symbol) {
            return self.table_trigger(&path);
        }
        0
    }

    /// Start the event poller if it is not running.
    pub fn ensure_event_poller(&self) -> Result<()> {
        let tick = Duration::from_millis(self.config.event_tick_ms);
        self.events.ensure_poller(self.handle()?, tick)
    }

    /// Stop the event poller and every runner, waiting for their threads.
    pub fn shutdown(&self) {
        self.events.shutdown();
        self.runners.shutdown();
    }
}
