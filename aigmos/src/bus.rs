//! Event bindings over the numeric trigger bus.
//!
//! A poller thread reads every bound symbol once per tick and fires the
//! bindings whose value matches, once per rising edge.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::console::Console;
use crate::core::trigger::{Latch, is_runner_control, matches_pattern, step_latch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub symbol: String,
    pub value: i64,
    pub command: Vec<String>,
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.symbol, self.value, self.command.join(" "))
    }
}

#[derive(Debug, Default)]
struct EventTable {
    bindings: Vec<Binding>,
    armed: HashMap<String, bool>,
}

impl EventTable {
    fn forget(&mut self, symbol: &str) {
        self.bindings.retain(|binding| binding.symbol != symbol);
        self.armed.remove(symbol);
    }
}

#[derive(Debug, Default)]
pub struct EventBus {
    table: Mutex<EventTable>,
    poller: Mutex<Option<JoinHandle<()>>>,
    stop: AtomicBool,
}

impl EventBus {
    pub fn bind(&self, binding: Binding) {
        debug!(symbol = %binding.symbol, value = binding.value, "event bound");
        self.table.lock().bindings.push(binding);
    }

    pub fn bindings(&self) -> Vec<Binding> {
        self.table.lock().bindings.clone()
    }

    pub fn show(&self, pattern: &str) -> Vec<String> {
        self.table
            .lock()
            .bindings
            .iter()
            .filter(|binding| matches_pattern(&binding.symbol, pattern))
            .map(ToString::to_string)
            .collect()
    }

    /// Drop matching bindings and their latches. Returns how many were removed.
    pub fn reset(&self, pattern: &str) -> usize {
        let mut table = self.table.lock();
        let symbols: Vec<String> = table
            .bindings
            .iter()
            .filter(|binding| matches_pattern(&binding.symbol, pattern))
            .map(|binding| binding.symbol.clone())
            .collect();
        let before = table.bindings.len();
        for symbol in &symbols {
            table.forget(symbol);
        }
        before - table.bindings.len()
    }

    /// Bound symbols, deduplicated in binding order.
    pub fn symbols(&self) -> Vec<String> {
        let table = self.table.lock();
        let mut out: Vec<String> = Vec::new();
        for binding in &table.bindings {
            if !out.contains(&binding.symbol) {
                out.push(binding.symbol.clone());
            }
        }
        out
    }

    /// Apply one observation of `symbol` and return the commands to fire.
    fn observe(&self, symbol: &str, value: i64) -> Vec<Vec<String>> {
        let mut table = self.table.lock();
        let armed = table.armed.entry(symbol.to_string()).or_insert(true);
        match step_latch(armed, value) {
            Latch::Purge => {
                debug!(symbol, "purging bindings");
                table.forget(symbol);
                Vec::new()
            }
            Latch::Rearm | Latch::Hold => Vec::new(),
            Latch::Fire => table
                .bindings
                .iter()
                .filter(|binding| binding.symbol == symbol && binding.value == value)
                .map(|binding| binding.command.clone())
                .collect(),
        }
    }

    /// Start the poller unless it is already running.
    pub fn ensure_poller(&self, console: Arc<Console>, tick: Duration) -> Result<()> {
        let mut poller = self.poller.lock();
        if poller.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }
        self.stop.store(false, Ordering::SeqCst);
        let handle = thread::Builder::new()
            .name("event:poll".to_string())
            .spawn(move || {
                while !console.events().stop.load(Ordering::SeqCst) {
                    poll_once(&console);
                    thread::sleep(tick);
                }
            })
            .context("spawn event poller thread")?;
        *poller = Some(handle);
        debug!("event poller started");
        Ok(())
    }

    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let handle = self.poller.lock().take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            warn!("event poller panicked");
        }
    }
}

/// One poller pass: read each bound symbol and run what fires.
///
/// Commands run through the gated pipeline with no bus lock held.
pub fn poll_once(console: &Console) {
    let bus = console.events();
    for symbol in bus.symbols() {
        let value = console.resolve_trigger(&symbol);
        for command in bus.observe(&symbol, value) {
            if command.is_empty() || is_runner_control(&command) {
                continue;
            }
            let line = command.join(" ");
            debug!(symbol = %symbol, value, line = %line, "event fired");
            console.execute(&line);
        }
    }
}
