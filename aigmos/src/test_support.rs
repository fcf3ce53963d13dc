//! Test-only helpers: a console with a private output directory, and
//! polling for background work.

use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tempfile::TempDir;

use crate::console::Console;
use crate::io::config::ConsoleConfig;

/// A console whose `output_dir` lives in a temporary directory.
///
/// Pulses and poll ticks are shortened so lifecycle tests settle quickly.
/// Background threads are stopped on drop.
pub struct TestConsole {
    console: Arc<Console>,
    temp: TempDir,
}

impl TestConsole {
    pub fn new() -> Result<Self> {
        Self::with_config(ConsoleConfig::default())
    }

    pub fn with_config(mut config: ConsoleConfig) -> Result<Self> {
        let temp = tempfile::tempdir().context("create temp dir")?;
        config.output_dir = temp.path().join("output");
        config.event_tick_ms = 5;
        config.trigger_pulse_ms = 200;
        Ok(Self {
            console: Console::new(config)?,
            temp,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn console(&self) -> &Arc<Console> {
        &self.console
    }

    /// Execute a line; no output reads as the empty string.
    pub fn run(&self, line: &str) -> String {
        self.console.execute(line).unwrap_or_default()
    }

    /// Poll `line` until its output satisfies `done`, or fail after `timeout`.
    pub fn wait_for(
        &self,
        line: &str,
        timeout: Duration,
        done: impl Fn(&str) -> bool,
    ) -> Result<String> {
        let deadline = Instant::now() + timeout;
        loop {
            let out = self.run(line);
            if done(&out) {
                return Ok(out);
            }
            if Instant::now() >= deadline {
                bail!("timed out waiting on `{line}`; last output: {out}");
            }
            thread::sleep(Duration::from_millis(2));
        }
    }
}

impl Deref for TestConsole {
    type Target = Console;

    fn deref(&self) -> &Console {
        &self.console
    }
}

impl Drop for TestConsole {
    fn drop(&mut self) {
        self.console.shutdown();
    }
}
