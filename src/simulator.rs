//! Simulation run driver.
//!
//! Owns the root engine and the injected-event queue, and advances the
//! single simulation clock: each step takes the earliest next-event time
//! across the engine tree and the queue, collects the outputs of every
//! imminent model, delivers them, then runs the due transitions. The loop
//! is synchronous and single-threaded; the only cross-thread interaction
//! is the [`StopHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::architecture::{ModelUri, RunContext};
use crate::error::{DevsError, DevsResult};
use crate::event::Event;
use crate::model::{AtomicModel, Engine, TraceEntry};
use crate::params::{RunParameters, SimulationConfig};
use crate::report::SimulationReport;
use crate::scheduler::Scheduler;
use crate::time::{SimTime, TimeUnit};
use crate::value::Value;

// ── Stop handle ───────────────────────────────────────────────────────

/// Thread-safe signal asking a running simulator to stop after the
/// current step.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Simulator ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Built,
    Running,
    Ended,
}

/// Top-level simulation driver.
///
/// Call `initialise`, then `step`, `run_until` or `run_for`, and finally
/// `end_simulation`; or use [`run_standalone`](Simulator::run_standalone)
/// for the whole sequence.
#[derive(Debug)]
pub struct Simulator {
    root: Engine,
    run: Arc<RunContext>,
    scheduler: Scheduler,
    current_time: SimTime,
    state: RunState,
    trace: Vec<TraceEntry>,
    /// Events emitted by the root itself.
    emitted: Vec<Event>,
    steps: u64,
    stop: StopHandle,
}

impl Simulator {
    pub fn new(root: Engine, run: Arc<RunContext>) -> Self {
        Simulator {
            root,
            run,
            scheduler: Scheduler::new(),
            current_time: SimTime::ZERO,
            state: RunState::Built,
            trace: Vec::new(),
            emitted: Vec::new(),
            steps: 0,
            stop: StopHandle::default(),
        }
    }

    pub fn root(&self) -> &Engine {
        &self.root
    }

    pub fn root_uri(&self) -> &ModelUri {
        self.root.uri()
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.run.time_unit()
    }

    /// Current simulated time.
    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    /// Total steps executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Every transition performed so far, in execution order.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Events emitted by the root model.
    pub fn emitted(&self) -> &[Event] {
        &self.emitted
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Hand every model its run parameters. Only legal before `initialise`.
    pub fn set_run_parameters(&mut self, params: &RunParameters) -> DevsResult<()> {
        self.expect_state(RunState::Built, "set run parameters")?;
        self.root.set_run_parameters(params)
    }

    /// Start the run at `start`.
    ///
    /// Events injected beforehand must not lie before `start`.
    pub fn initialise(&mut self, start: SimTime) -> DevsResult<()> {
        self.expect_state(RunState::Built, "initialise")?;
        if let Some(first) = self.scheduler.peek_time() {
            if first < start {
                return Err(self.violation(format!(
                    "injected event at {} precedes the start time {}",
                    first, start
                )));
            }
        }
        self.root.initialise(start)?;
        self.current_time = start;
        self.state = RunState::Running;
        info!(root = %self.root.uri(), start = %start, "simulation initialised");
        Ok(())
    }

    /// Queue an external event for the root model.
    ///
    /// Rejected when the event lies in the past or the root does not import
    /// its type.
    pub fn inject(&mut self, event: Event) -> DevsResult<()> {
        if self.state == RunState::Ended {
            return Err(self.violation("inject after the end of the simulation"));
        }
        if event.time < self.current_time {
            return Err(self.violation(format!(
                "event {} lies before the current time {}",
                event, self.current_time
            )));
        }
        if !self.root.imports(&event.kind) {
            return Err(self.violation(format!("event type {} is not imported", event.kind)));
        }
        debug!(event = %event, "event injected");
        self.scheduler.schedule(event);
        Ok(())
    }

    /// Earliest time at which something happens; `None` once quiescent.
    pub fn next_event_time(&self) -> Option<SimTime> {
        if self.state != RunState::Running {
            return None;
        }
        match (self.root.next_event_time(), self.scheduler.peek_time()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Execute the next instant. Returns its time, or `None` when nothing
    /// remains to be done.
    pub fn step(&mut self) -> DevsResult<Option<SimTime>> {
        self.expect_state(RunState::Running, "step")?;
        let Some(now) = self.next_event_time() else {
            return Ok(None);
        };
        self.execute(now)?;
        Ok(Some(now))
    }

    /// Run every instant up to and including `end`, then move the clock to
    /// `end`. Returns the number of steps executed.
    ///
    /// Stops early, leaving the clock at the last executed instant, when the
    /// stop handle fires.
    pub fn run_until(&mut self, end: SimTime) -> DevsResult<u64> {
        self.expect_state(RunState::Running, "run")?;
        if end < self.current_time {
            return Err(self.violation(format!(
                "end time {} precedes the current time {}",
                end, self.current_time
            )));
        }
        let start = self.steps;
        loop {
            if self.stop.is_stopped() {
                info!(time = %self.current_time, "simulation stopped");
                return Ok(self.steps - start);
            }
            match self.next_event_time() {
                Some(now) if now <= end => self.execute(now)?,
                _ => break,
            }
        }
        self.current_time = end;
        Ok(self.steps - start)
    }

    /// Run at most `max_steps` instants. Returns the number executed.
    pub fn run_for(&mut self, max_steps: u64) -> DevsResult<u64> {
        let mut steps = 0u64;
        while steps < max_steps && !self.stop.is_stopped() {
            if self.step()?.is_none() {
                break;
            }
            steps += 1;
        }
        Ok(steps)
    }

    /// Finalise every model at `end`.
    pub fn end_simulation(&mut self, end: SimTime) -> DevsResult<()> {
        self.expect_state(RunState::Running, "end")?;
        if end < self.current_time {
            return Err(self.violation(format!(
                "end time {} precedes the current time {}",
                end, self.current_time
            )));
        }
        if !self.scheduler.is_empty() {
            debug!(dropped = self.scheduler.len(), "injected events left undelivered");
        }
        self.root.end_simulation(end)?;
        self.current_time = end;
        self.state = RunState::Ended;
        info!(end = %end, steps = self.steps, "simulation ended");
        Ok(())
    }

    /// `initialise(start)`, `run_until(end)`, `end_simulation(end)`, then
    /// the final report.
    pub fn run_standalone(&mut self, start: SimTime, end: SimTime) -> DevsResult<SimulationReport> {
        self.initialise(start)?;
        self.run_until(end)?;
        self.end_simulation(end)?;
        Ok(self.final_report())
    }

    /// Apply a [`SimulationConfig`] and run it to completion.
    pub fn run_config(&mut self, config: &SimulationConfig) -> DevsResult<SimulationReport> {
        if let Some(unit) = config.time_unit {
            if unit != self.run.time_unit() {
                return Err(self.violation(format!(
                    "configured time unit {} differs from the architecture's {}",
                    unit,
                    self.run.time_unit()
                )));
            }
        }
        self.set_run_parameters(&config.parameters)?;
        self.run_standalone(config.start(), config.end())
    }

    pub fn final_report(&self) -> SimulationReport {
        self.root.final_report()
    }

    // ── State access ──────────────────────────────────────────

    pub fn get_value(&self, uri: &ModelUri, name: &str) -> DevsResult<Option<Value>> {
        let engine = self
            .root
            .find(uri)
            .ok_or_else(|| DevsError::UnknownModel(uri.clone()))?;
        Ok(engine.get_value(name))
    }

    /// Exogenous command to model `uri`, applied at the current time.
    pub fn set_value(&mut self, uri: &ModelUri, name: &str, value: Value) -> DevsResult<bool> {
        let now = self.current_time;
        let engine = self
            .root
            .find_mut(uri)
            .ok_or_else(|| DevsError::UnknownModel(uri.clone()))?;
        engine.set_value(name, value, now)
    }

    /// Downcast the model of atomic engine `uri` for inspection.
    pub fn model<T: AtomicModel>(&self, uri: &ModelUri) -> Option<&T> {
        self.root.model::<T>(uri)
    }

    pub fn model_mut<T: AtomicModel>(&mut self, uri: &ModelUri) -> Option<&mut T> {
        self.root.model_mut::<T>(uri)
    }

    // ── Internals ─────────────────────────────────────────────

    /// One instant: outputs of every imminent model first, then injected
    /// events, then the transitions.
    fn execute(&mut self, now: SimTime) -> DevsResult<()> {
        let outputs = self.root.collect_outputs(now)?;
        for event in &outputs {
            debug!(event = %event, "root output");
        }
        self.emitted.extend(outputs);
        while let Some(event) = self.scheduler.pop_due(now) {
            self.root.deliver(event)?;
        }
        self.root.transition(now, &mut self.trace)?;
        self.current_time = now;
        self.steps += 1;
        Ok(())
    }

    fn expect_state(&self, expected: RunState, action: &str) -> DevsResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.violation(format!("cannot {} while {:?}", action, self.state)))
        }
    }

    fn violation(&self, reason: impl Into<String>) -> DevsError {
        DevsError::protocol(self.root.uri(), reason)
    }
}
