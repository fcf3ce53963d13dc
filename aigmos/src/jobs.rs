//! Background runners.
//!
//! A runner feeds a snapshot of command lines through the gated console
//! pipeline on its own thread and reports completion on `%name.trg`:
//! 1 done, 2 failed, 3 stopped, each held for the pulse duration and then
//! reset to 0. A routine being executed is locked against mutation until
//! the runner reaches a terminal status.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::console::Console;
use crate::core::trigger::{self, is_runner_control_line};
use crate::reply::Outcome;

/// Replaced with the 1-based step number before a step runs.
pub const COUNTER: &str = "<counter>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerStatus {
    Idle,
    Running,
    Paused,
    Stopped,
    Failed,
    Done,
}

impl RunnerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
            Self::Done => "done",
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl fmt::Display for RunnerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct JobState {
    status: RunnerStatus,
    step: usize,
    last_error: Option<String>,
    log: Vec<String>,
    stop_requested: bool,
    paused: bool,
}

#[derive(Debug)]
pub struct RunnerJob {
    name: String,
    state: Mutex<JobState>,
    resume: Condvar,
    trg: AtomicU8,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl RunnerJob {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(JobState {
                status: RunnerStatus::Idle,
                step: 0,
                last_error: None,
                log: Vec::new(),
                stop_requested: false,
                paused: false,
            }),
            resume: Condvar::new(),
            trg: AtomicU8::new(0),
            worker: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> RunnerStatus {
        self.state.lock().status
    }

    pub fn trigger(&self) -> u8 {
        self.trg.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    /// `<status> step=<i> err=<e> trg=<t>`
    pub fn summary(&self) -> String {
        let state = self.state.lock();
        format!(
            "{} step={} err={} trg={}",
            state.status,
            state.step,
            state.last_error.as_deref().unwrap_or(""),
            self.trigger()
        )
    }

    /// Running <-> paused. Returns the new status.
    fn toggle_pause(&self) -> Result<RunnerStatus> {
        let mut state = self.state.lock();
        match state.status {
            RunnerStatus::Running => {
                state.status = RunnerStatus::Paused;
                state.paused = true;
            }
            RunnerStatus::Paused => {
                state.status = RunnerStatus::Running;
                state.paused = false;
                self.resume.notify_all();
            }
            _ => bail!("pause only valid for running/paused"),
        }
        Ok(state.status)
    }

    fn request_stop(&self) {
        let mut state = self.state.lock();
        if state.status.is_active() {
            state.stop_requested = true;
            state.paused = false;
            self.resume.notify_all();
        }
    }

    fn stop_requested(&self) -> bool {
        self.state.lock().stop_requested
    }

    fn wait_if_paused(&self) {
        let mut state = self.state.lock();
        while state.paused && !state.stop_requested {
            self.resume.wait(&mut state);
        }
    }

    fn push_log(&self, line: impl Into<String>) {
        self.state.lock().log.push(line.into());
    }

    fn set_step(&self, step: usize) {
        self.state.lock().step = step;
    }

    fn finish(&self, status: RunnerStatus, error: Option<String>) {
        let mut state = self.state.lock();
        state.status = status;
        state.paused = false;
        match error {
            Some(err) => {
                state.log.push(format!("FAILED: {err}"));
                state.last_error = Some(err);
            }
            None => state.log.push(status.as_str().to_uppercase()),
        }
        self.resume.notify_all();
    }

    fn pulse(&self, value: u8, hold: Duration) {
        self.trg.store(value, Ordering::SeqCst);
        thread::sleep(hold);
        self.trg.store(0, Ordering::SeqCst);
    }

    fn join(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            warn!(runner = %self.name, "runner thread panicked");
        }
    }
}

/// What a runner executes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPlan {
    pub steps: Vec<String>,
    /// Routine to lock while the runner is active.
    pub routine: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RoutineLock {
    runner: String,
    state: RunnerStatus,
}

/// Runner jobs by name, plus routine locks.
///
/// Lock order: `jobs` before `locks`.
#[derive(Debug, Default)]
pub struct Runners {
    jobs: Mutex<BTreeMap<String, Arc<RunnerJob>>>,
    locks: Mutex<BTreeMap<String, RoutineLock>>,
}

impl Runners {
    pub fn get(&self, name: &str) -> Option<Arc<RunnerJob>> {
        self.jobs.lock().get(name).cloned()
    }

    /// Current trigger value; 0 for unknown runners.
    pub fn trigger(&self, name: &str) -> u8 {
        self.get(name).map_or(0, |job| job.trigger())
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.get(name).is_some_and(|job| job.status().is_active())
    }

    /// Fail when an active runner holds `routine`.
    pub fn ensure_unlocked(&self, routine: &str) -> Result<()> {
        if let Some(lock) = self.locks.lock().get(routine) {
            bail!(
                "Routine &{routine} is locked by %{} ({})",
                lock.runner,
                lock.state
            );
        }
        Ok(())
    }

    /// Replace the job `name` and start it on a worker thread.
    pub fn start(&self, console: Arc<Console>, name: &str, plan: RunPlan) -> Result<()> {
        let job = {
            let mut jobs = self.jobs.lock();
            if jobs.get(name).is_some_and(|job| job.status().is_active()) {
                bail!("Runner already active");
            }
            // A new runner takes over the routine lock; the previous holder
            // only releases a lock it still owns.
            if let Some(routine) = &plan.routine {
                self.locks.lock().insert(
                    routine.clone(),
                    RoutineLock {
                        runner: name.to_string(),
                        state: RunnerStatus::Running,
                    },
                );
            }
            let job = Arc::new(RunnerJob::new(name));
            {
                let mut state = job.state.lock();
                state.status = RunnerStatus::Running;
                state.log.push(format!("START %{name}"));
            }
            jobs.insert(name.to_string(), Arc::clone(&job));
            job
        };

        let hold = Duration::from_millis(console.config().trigger_pulse_ms);
        let RunPlan { steps, routine } = plan;
        let worker_job = Arc::clone(&job);
        let worker_routine = routine.clone();
        let spawned = thread::Builder::new()
            .name(format!("runner:{name}"))
            .spawn(move || {
                run_worker(&console, &worker_job, &steps, worker_routine.as_deref(), hold);
            });

        match spawned {
            Ok(handle) => {
                *job.worker.lock() = Some(handle);
                info!(runner = name, "runner started");
                Ok(())
            }
            Err(err) => {
                job.finish(RunnerStatus::Failed, Some(err.to_string()));
                if let Some(routine) = &routine {
                    self.release(routine, name);
                }
                Err(err).with_context(|| format!("spawn runner thread for %{name}"))
            }
        }
    }

    pub fn pause(&self, name: &str) -> Result<()> {
        let job = self.get(name).context("Runner not found")?;
        let status = job.toggle_pause()?;
        for lock in self.locks.lock().values_mut() {
            if lock.runner == name {
                lock.state = status;
            }
        }
        debug!(runner = name, %status, "runner pause toggled");
        Ok(())
    }

    pub fn stop(&self, name: &str) -> Result<()> {
        let job = self.get(name).context("Runner not found")?;
        job.request_stop();
        Ok(())
    }

    /// Stop every runner and wait for its worker.
    pub fn shutdown(&self) {
        let jobs: Vec<Arc<RunnerJob>> = self.jobs.lock().values().cloned().collect();
        for job in &jobs {
            job.request_stop();
        }
        for job in &jobs {
            job.join();
        }
    }

    fn release(&self, routine: &str, runner: &str) {
        let mut locks = self.locks.lock();
        if locks.get(routine).is_some_and(|lock| lock.runner == runner) {
            locks.remove(routine);
        }
    }
}

enum End {
    Done,
    Stopped,
    Failed(String),
}

/// The routine lock is released before the terminal status is published,
/// so it never outlives the run into the trigger pulse.
fn run_worker(
    console: &Console,
    job: &RunnerJob,
    steps: &[String],
    routine: Option<&str>,
    hold: Duration,
) {
    let end = drive(console, job, steps);
    let (status, error, value) = match end {
        End::Done => (RunnerStatus::Done, None, trigger::DONE),
        End::Stopped => (RunnerStatus::Stopped, None, trigger::STOPPED),
        End::Failed(err) => (RunnerStatus::Failed, Some(err), trigger::FAILED),
    };
    info!(runner = job.name(), %status, "runner finished");
    if let Some(routine) = routine {
        console.runners().release(routine, job.name());
    }
    job.finish(status, error);
    job.pulse(value, hold);
}

fn drive(console: &Console, job: &RunnerJob, steps: &[String]) -> End {
    for (i, raw) in steps.iter().enumerate() {
        job.set_step(i);

        if job.stop_requested() {
            job.push_log("STOP requested");
            return End::Stopped;
        }
        job.wait_if_paused();
        if job.stop_requested() {
            job.push_log("STOP requested (after pause)");
            return End::Stopped;
        }

        let step = raw.trim();
        if step.is_empty() {
            continue;
        }
        let step = step.replace(COUNTER, &(i + 1).to_string());
        if is_runner_control_line(&step) {
            return End::Failed("Runner cannot execute runner-control commands".to_string());
        }

        let outcome = console.execute_outcome(&step);
        let failed = outcome.as_ref().is_some_and(Outcome::is_error);
        let rendered = outcome.and_then(Outcome::render);
        job.push_log(format!(
            "[{i}] {step} -> {}",
            rendered.as_deref().unwrap_or("(no output)")
        ));
        if failed {
            return End::Failed(rendered.unwrap_or_default());
        }
    }
    End::Done
}
