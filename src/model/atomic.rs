//! `AtomicEngine`: drives one leaf model through the atomic protocol.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::architecture::{AtomicDescriptor, ModelSignature, ModelUri, RunContext};
use crate::error::{DevsError, DevsResult};
use crate::event::Event;
use crate::params::RunParameters;
use crate::report::SimulationReport;
use crate::time::{Duration, SimTime};
use crate::value::Value;

use super::context::ModelContext;
use super::trace::{TraceEntry, TransitionKind};
use super::traits::AtomicModel;
use super::variables::{ModelVariables, VariableHandle};

/// Lifecycle of an atomic model within one run.
///
/// `Uninitialized → Initialized → {Idle, Scheduled}* → Finalized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPhase {
    Uninitialized,
    Initialized,
    /// Time advance is infinite.
    Idle,
    /// A finite time advance is pending.
    Scheduled,
    Finalized,
}

impl ModelPhase {
    /// `true` in the phases where transitions are legal.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ModelPhase::Initialized | ModelPhase::Idle | ModelPhase::Scheduled
        )
    }
}

/// The engine of one atomic model.
///
/// Owns the model, its variables and its pending-event buffer, and keeps
/// the time of the last transition and of the next scheduled one.
pub struct AtomicEngine {
    uri: ModelUri,
    model: Box<dyn AtomicModel>,
    signature: ModelSignature,
    variables: ModelVariables,
    /// Descriptor-level parameter defaults.
    defaults: IndexMap<String, Value>,
    run: Arc<RunContext>,
    owns_engine: bool,
    phase: ModelPhase,
    params_set: bool,
    last_event: SimTime,
    next_event: Option<SimTime>,
    /// Events delivered since the last transition.
    pending: Vec<Event>,
}

impl AtomicEngine {
    pub fn new(
        descriptor: &AtomicDescriptor,
        model: Box<dyn AtomicModel>,
        run: Arc<RunContext>,
        owns_engine: bool,
    ) -> Self {
        AtomicEngine {
            uri: descriptor.uri.clone(),
            model,
            signature: descriptor.signature.clone(),
            variables: ModelVariables::from_signature(&descriptor.signature),
            defaults: descriptor.parameters.clone(),
            run,
            owns_engine,
            phase: ModelPhase::Uninitialized,
            params_set: false,
            last_event: SimTime::ZERO,
            next_event: None,
            pending: Vec::new(),
        }
    }

    pub fn uri(&self) -> &ModelUri {
        &self.uri
    }

    pub fn phase(&self) -> ModelPhase {
        self.phase
    }

    /// `false` when the model was folded into its parent's engine.
    pub fn owns_engine(&self) -> bool {
        self.owns_engine
    }

    pub fn signature(&self) -> &ModelSignature {
        &self.signature
    }

    /// Time of the last transition (or of initialisation).
    pub fn last_event_time(&self) -> SimTime {
        self.last_event
    }

    /// Downcast the model for inspection.
    pub fn model<T: AtomicModel>(&self) -> Option<&T> {
        self.model.as_any().downcast_ref::<T>()
    }

    pub fn model_mut<T: AtomicModel>(&mut self) -> Option<&mut T> {
        self.model.as_any_mut().downcast_mut::<T>()
    }

    // ── Protocol ──────────────────────────────────────────────

    /// Hand the model its run parameters. Only legal before initialisation.
    pub fn set_run_parameters(&mut self, params: &RunParameters) -> DevsResult<()> {
        if self.phase != ModelPhase::Uninitialized {
            return Err(DevsError::protocol(
                &self.uri,
                "run parameters must be set before initialisation",
            ));
        }
        let view = params.for_model(&self.uri, Some(&self.defaults));
        self.model.set_run_parameters(&view)?;
        self.params_set = true;
        Ok(())
    }

    /// Initialise the model for a run starting at `start`.
    pub fn initialise(&mut self, start: SimTime) -> DevsResult<()> {
        if self.phase != ModelPhase::Uninitialized {
            return Err(DevsError::protocol(
                &self.uri,
                format!("cannot initialise in phase {:?}", self.phase),
            ));
        }
        if !self.params_set {
            self.set_run_parameters(&RunParameters::new())?;
        }
        let mut ctx = ModelContext::new(
            &self.uri,
            start,
            self.run.time_unit(),
            &mut self.variables,
        );
        self.model.initialise_state(&mut ctx)?;
        self.phase = ModelPhase::Initialized;
        self.pending.clear();
        self.reschedule(start);
        Ok(())
    }

    /// Time of the next internal transition; `None` when idle or inactive.
    pub fn next_event_time(&self) -> Option<SimTime> {
        if self.phase.is_active() {
            self.next_event
        } else {
            None
        }
    }

    /// Buffer an event for the next transition.
    pub fn deliver(&mut self, event: Event) -> DevsResult<()> {
        if !self.phase.is_active() {
            return Err(DevsError::protocol(
                &self.uri,
                format!("event {} delivered in phase {:?}", event, self.phase),
            ));
        }
        if !self.signature.imported_events.contains(&event.kind) {
            return Err(DevsError::protocol(
                &self.uri,
                format!("event type {} is not imported", event.kind),
            ));
        }
        trace!(model = %self.uri, event = %event, "event buffered");
        self.pending.push(event);
        Ok(())
    }

    /// Collect the model's output if it is imminent at `now`.
    pub fn collect_outputs(&mut self, now: SimTime) -> DevsResult<Vec<Event>> {
        if self.next_event_time() != Some(now) {
            return Ok(Vec::new());
        }
        let ctx = ModelContext::new(&self.uri, now, self.run.time_unit(), &mut self.variables);
        let mut events = self.model.output(&ctx);
        for event in &mut events {
            if !self.signature.exported_events.contains(&event.kind) {
                return Err(DevsError::protocol(
                    &self.uri,
                    format!("output of undeclared event type {}", event.kind),
                ));
            }
            event.time = now;
        }
        Ok(events)
    }

    /// Run the transition due at `now`, if any.
    ///
    /// Internal when only the time advance elapsed, external when only
    /// events arrived, confluent when both happen at once. The confluent
    /// case applies the internal transition first, then the external one
    /// with zero elapsed time.
    pub fn transition(&mut self, now: SimTime, trace: &mut Vec<TraceEntry>) -> DevsResult<()> {
        let imminent = self.next_event_time() == Some(now);
        if !imminent && self.pending.is_empty() {
            return Ok(());
        }
        if !self.phase.is_active() {
            return Err(DevsError::protocol(
                &self.uri,
                format!("transition in phase {:?}", self.phase),
            ));
        }
        if let Some(next) = self.next_event {
            if now > next {
                return Err(DevsError::protocol(
                    &self.uri,
                    format!("scheduled transition at {} was skipped, now {}", next, now),
                ));
            }
        }
        let elapsed = now.elapsed_since(self.last_event).ok_or_else(|| {
            DevsError::protocol(
                &self.uri,
                format!("time moved backward from {} to {}", self.last_event, now),
            )
        })?;

        let mut events = std::mem::take(&mut self.pending);
        self.run.priorities().sort(&mut events);
        let kind = if events.is_empty() {
            TransitionKind::Internal
        } else if imminent {
            TransitionKind::Confluent
        } else {
            TransitionKind::External
        };

        let mut ctx = ModelContext::new(&self.uri, now, self.run.time_unit(), &mut self.variables);
        match kind {
            TransitionKind::Internal => self.model.internal_transition(&mut ctx, elapsed)?,
            TransitionKind::External => {
                self.model.external_transition(&mut ctx, elapsed, &events)?
            }
            TransitionKind::Confluent => {
                self.model.internal_transition(&mut ctx, elapsed)?;
                self.model
                    .external_transition(&mut ctx, Duration::ZERO, &events)?;
            }
        }

        debug!(model = %self.uri, time = %now, %kind, events = events.len(), "transition");
        trace.push(TraceEntry {
            time: now,
            model: self.uri.clone(),
            kind,
            events: events.into_iter().map(|e| e.kind).collect(),
        });
        self.reschedule(now);
        Ok(())
    }

    /// Finalise the model at `end`.
    pub fn end_simulation(&mut self, end: SimTime) -> DevsResult<()> {
        if !self.phase.is_active() {
            return Err(DevsError::protocol(
                &self.uri,
                format!("cannot end simulation in phase {:?}", self.phase),
            ));
        }
        if end < self.last_event {
            return Err(DevsError::protocol(
                &self.uri,
                format!("end time {} precedes last transition {}", end, self.last_event),
            ));
        }
        if !self.pending.is_empty() {
            warn!(model = %self.uri, dropped = self.pending.len(), "undelivered events at end");
            self.pending.clear();
        }
        let mut ctx = ModelContext::new(&self.uri, end, self.run.time_unit(), &mut self.variables);
        self.model.end_simulation(&mut ctx)?;
        self.phase = ModelPhase::Finalized;
        self.next_event = None;
        Ok(())
    }

    pub fn final_report(&self) -> SimulationReport {
        SimulationReport::Atomic {
            uri: self.uri.clone(),
            entries: self.model.final_report(),
        }
    }

    // ── State access ──────────────────────────────────────────

    /// Named model state, falling back to the model's variables.
    pub fn get_value(&self, name: &str) -> Option<Value> {
        self.model
            .get_value(name)
            .or_else(|| self.variables.read(name))
    }

    /// Exogenous command at `now`.
    ///
    /// An accepted command re-evaluates the time advance from the last
    /// transition, so the time elapsed since then still reaches the next
    /// transition. A next event that would fall before `now` is held at `now`.
    pub fn set_value(&mut self, name: &str, value: Value, now: SimTime) -> DevsResult<bool> {
        if !self.phase.is_active() {
            return Err(DevsError::protocol(
                &self.uri,
                format!("set_value in phase {:?}", self.phase),
            ));
        }
        if now < self.last_event {
            return Err(DevsError::protocol(
                &self.uri,
                format!("set_value at {} precedes last transition {}", now, self.last_event),
            ));
        }
        if !self.model.set_value(name, value) {
            return Ok(false);
        }
        let ta = self.model.time_advance();
        self.next_event = self.last_event.advance(ta).map(|next| next.max(now));
        self.phase = match self.next_event {
            Some(_) => ModelPhase::Scheduled,
            None => ModelPhase::Idle,
        };
        trace!(model = %self.uri, time = %now, ta = %ta, "time advance re-evaluated");
        Ok(true)
    }

    // ── Variables ─────────────────────────────────────────────

    pub(crate) fn exported_handle(&self, name: &str) -> Option<VariableHandle> {
        self.variables.exported_handle(name)
    }

    pub(crate) fn bind_import(&mut self, name: &str, handle: VariableHandle) -> DevsResult<()> {
        self.variables.bind(&self.uri, name, handle)
    }

    pub(crate) fn unbound_imports(&self, out: &mut Vec<(ModelUri, String)>) {
        out.extend(
            self.variables
                .unbound()
                .map(|name| (self.uri.clone(), name.to_string())),
        );
    }

    fn reschedule(&mut self, now: SimTime) {
        let ta = self.model.time_advance();
        self.last_event = now;
        self.next_event = now.advance(ta);
        self.phase = match self.next_event {
            Some(_) => ModelPhase::Scheduled,
            None => ModelPhase::Idle,
        };
        trace!(model = %self.uri, time = %now, ta = %ta, "rescheduled");
    }
}

impl std::fmt::Debug for AtomicEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicEngine")
            .field("uri", &self.uri)
            .field("phase", &self.phase)
            .field("last_event", &self.last_event)
            .field("next_event", &self.next_event)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
