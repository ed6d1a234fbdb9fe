//! `Engine`: the one protocol shape shared by atomic and coupled engines.

use crate::architecture::ModelUri;
use crate::error::DevsResult;
use crate::event::{Event, EventType};
use crate::params::RunParameters;
use crate::report::SimulationReport;
use crate::time::SimTime;
use crate::value::Value;

use super::atomic::AtomicEngine;
use super::coupled::CoupledEngine;
use super::trace::TraceEntry;
use super::traits::AtomicModel;
use super::variables::VariableHandle;

/// A simulation engine: a leaf model or a composition of engines.
///
/// Coupled engines nest, so a whole model tree is one `Engine` owned by
/// whoever drives it.
#[derive(Debug)]
pub enum Engine {
    Atomic(AtomicEngine),
    Coupled(CoupledEngine),
}

impl Engine {
    pub fn uri(&self) -> &ModelUri {
        match self {
            Engine::Atomic(e) => e.uri(),
            Engine::Coupled(e) => e.uri(),
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, Engine::Atomic(_))
    }

    pub fn owns_engine(&self) -> bool {
        match self {
            Engine::Atomic(e) => e.owns_engine(),
            Engine::Coupled(e) => e.owns_engine(),
        }
    }

    /// `true` when events of type `kind` may be delivered to this engine.
    pub fn imports(&self, kind: &EventType) -> bool {
        match self {
            Engine::Atomic(e) => e.signature().imported_events.contains(kind),
            Engine::Coupled(e) => e.imports(kind),
        }
    }

    // ── Protocol ──────────────────────────────────────────────

    pub fn set_run_parameters(&mut self, params: &RunParameters) -> DevsResult<()> {
        match self {
            Engine::Atomic(e) => e.set_run_parameters(params),
            Engine::Coupled(e) => e.set_run_parameters(params),
        }
    }

    pub fn initialise(&mut self, start: SimTime) -> DevsResult<()> {
        match self {
            Engine::Atomic(e) => e.initialise(start),
            Engine::Coupled(e) => e.initialise(start),
        }
    }

    pub fn next_event_time(&self) -> Option<SimTime> {
        match self {
            Engine::Atomic(e) => e.next_event_time(),
            Engine::Coupled(e) => e.next_event_time(),
        }
    }

    pub fn deliver(&mut self, event: Event) -> DevsResult<()> {
        match self {
            Engine::Atomic(e) => e.deliver(event),
            Engine::Coupled(e) => e.deliver(event),
        }
    }

    pub fn collect_outputs(&mut self, now: SimTime) -> DevsResult<Vec<Event>> {
        match self {
            Engine::Atomic(e) => e.collect_outputs(now),
            Engine::Coupled(e) => e.collect_outputs(now),
        }
    }

    pub fn transition(&mut self, now: SimTime, trace: &mut Vec<TraceEntry>) -> DevsResult<()> {
        match self {
            Engine::Atomic(e) => e.transition(now, trace),
            Engine::Coupled(e) => e.transition(now, trace),
        }
    }

    pub fn end_simulation(&mut self, end: SimTime) -> DevsResult<()> {
        match self {
            Engine::Atomic(e) => e.end_simulation(end),
            Engine::Coupled(e) => e.end_simulation(end),
        }
    }

    pub fn final_report(&self) -> SimulationReport {
        match self {
            Engine::Atomic(e) => e.final_report(),
            Engine::Coupled(e) => e.final_report(),
        }
    }

    // ── Lookup ────────────────────────────────────────────────

    /// The engine of `uri` within this tree, this engine included.
    pub fn find(&self, uri: &ModelUri) -> Option<&Engine> {
        if self.uri() == uri {
            return Some(self);
        }
        match self {
            Engine::Coupled(c) => c.children().iter().find_map(|child| child.find(uri)),
            Engine::Atomic(_) => None,
        }
    }

    pub fn find_mut(&mut self, uri: &ModelUri) -> Option<&mut Engine> {
        if self.uri() == uri {
            return Some(self);
        }
        match self {
            Engine::Coupled(c) => c
                .children_mut()
                .iter_mut()
                .find_map(|child| child.find_mut(uri)),
            Engine::Atomic(_) => None,
        }
    }

    /// Downcast the model of the atomic engine `uri`.
    pub fn model<T: AtomicModel>(&self, uri: &ModelUri) -> Option<&T> {
        match self.find(uri)? {
            Engine::Atomic(e) => e.model::<T>(),
            Engine::Coupled(_) => None,
        }
    }

    pub fn model_mut<T: AtomicModel>(&mut self, uri: &ModelUri) -> Option<&mut T> {
        match self.find_mut(uri)? {
            Engine::Atomic(e) => e.model_mut::<T>(),
            Engine::Coupled(_) => None,
        }
    }

    // ── State access ──────────────────────────────────────────

    /// Named state of an atomic model; `None` for coupled engines.
    pub fn get_value(&self, name: &str) -> Option<Value> {
        match self {
            Engine::Atomic(e) => e.get_value(name),
            Engine::Coupled(_) => None,
        }
    }

    pub fn set_value(&mut self, name: &str, value: Value, now: SimTime) -> DevsResult<bool> {
        match self {
            Engine::Atomic(e) => e.set_value(name, value, now),
            Engine::Coupled(_) => Ok(false),
        }
    }

    // ── Variables ─────────────────────────────────────────────

    pub(crate) fn exported_handle(&self, name: &str) -> Option<VariableHandle> {
        match self {
            Engine::Atomic(e) => e.exported_handle(name),
            Engine::Coupled(e) => e.exported_handle(name),
        }
    }

    pub(crate) fn bind_import(&mut self, name: &str, handle: VariableHandle) -> DevsResult<()> {
        match self {
            Engine::Atomic(e) => e.bind_import(name, handle),
            Engine::Coupled(e) => e.bind_import(name, handle),
        }
    }

    /// `(model, variable)` pairs of imported variables with no writer.
    pub fn unbound_imports(&self, out: &mut Vec<(ModelUri, String)>) {
        match self {
            Engine::Atomic(e) => e.unbound_imports(out),
            Engine::Coupled(e) => e.unbound_imports(out),
        }
    }
}
