//! `CoupledEngine`: composes child engines behind the atomic protocol.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::architecture::{CoupledDescriptor, ModelUri};
use crate::error::{DevsError, DevsResult};
use crate::event::{Event, EventType};
use crate::params::RunParameters;
use crate::report::SimulationReport;
use crate::time::SimTime;

use super::engine::Engine;
use super::trace::TraceEntry;
use super::variables::VariableHandle;

/// A `(child index, event type)` routing endpoint.
type Port = (usize, EventType);

/// The engine of a coupled model.
///
/// Children are exclusively owned and kept in declaration order; every
/// fan-out (outputs, transitions, reports) visits them in that order. The
/// descriptor's routing tables are compiled into index-based lookups once,
/// at construction.
pub struct CoupledEngine {
    uri: ModelUri,
    owns_engine: bool,
    children: Vec<Engine>,
    /// Sibling routes: child output → sibling inputs.
    connections: IndexMap<Port, Vec<Port>>,
    /// Imported event type → child inputs.
    imports: IndexMap<EventType, Vec<Port>>,
    /// Child output → event types exported by this model.
    reexports: IndexMap<Port, Vec<EventType>>,
    /// Imported variable → `(child, variable)` readers.
    imported_variables: IndexMap<String, Vec<(usize, String)>>,
    /// Exported variable → `(child, variable)` writer.
    reexported_variables: IndexMap<String, (usize, String)>,
}

impl CoupledEngine {
    /// Compose `children`, given in the descriptor's submodel order, and
    /// wire the sibling variable bindings.
    pub fn new(
        descriptor: &CoupledDescriptor,
        mut children: Vec<Engine>,
        owns_engine: bool,
    ) -> DevsResult<Self> {
        let uri = &descriptor.uri;
        let declared: Vec<&ModelUri> = descriptor.submodels.iter().collect();
        let given: Vec<&ModelUri> = children.iter().map(Engine::uri).collect();
        if declared != given {
            return Err(DevsError::invalid(
                uri,
                "child engines do not match the declared submodels",
            ));
        }
        let index: HashMap<&ModelUri, usize> =
            declared.iter().enumerate().map(|(i, u)| (*u, i)).collect();
        let position = |m: &ModelUri| -> DevsResult<usize> {
            index
                .get(m)
                .copied()
                .ok_or_else(|| DevsError::UnknownModel(m.clone()))
        };

        let mut connections: IndexMap<Port, Vec<Port>> = IndexMap::new();
        for (source, sinks) in &descriptor.connections {
            let from = (position(&source.model)?, source.kind.clone());
            let entry = connections.entry(from).or_default();
            for sink in sinks {
                entry.push((position(&sink.model)?, sink.kind.clone()));
            }
        }

        let mut imports: IndexMap<EventType, Vec<Port>> = IndexMap::new();
        for (kind, sinks) in &descriptor.imported {
            let entry = imports.entry(kind.clone()).or_default();
            for sink in sinks {
                entry.push((position(&sink.model)?, sink.kind.clone()));
            }
        }

        let mut reexports: IndexMap<Port, Vec<EventType>> = IndexMap::new();
        for (kind, sources) in &descriptor.reexported {
            for source in sources {
                reexports
                    .entry((position(&source.model)?, source.kind.clone()))
                    .or_default()
                    .push(kind.clone());
            }
        }

        let mut imported_variables: IndexMap<String, Vec<(usize, String)>> = IndexMap::new();
        for (decl, sinks) in &descriptor.imported_variables {
            let entry = imported_variables.entry(decl.name.clone()).or_default();
            for sink in sinks {
                entry.push((position(&sink.model)?, sink.name.clone()));
            }
        }

        let mut reexported_variables = IndexMap::new();
        for (source, decl) in &descriptor.reexported_variables {
            reexported_variables.insert(
                decl.name.clone(),
                (position(&source.model)?, source.name.clone()),
            );
        }

        for (source, sinks) in &descriptor.bindings {
            let handle = children[position(&source.model)?]
                .exported_handle(&source.name)
                .ok_or_else(|| {
                    DevsError::invalid(
                        uri,
                        format!("{} does not export variable {}", source.model, source.name),
                    )
                })?;
            for sink in sinks {
                children[position(&sink.model)?].bind_import(&sink.name, handle.clone())?;
            }
        }

        debug!(
            model = %uri,
            children = children.len(),
            routes = connections.len(),
            "coupled engine composed"
        );
        Ok(CoupledEngine {
            uri: uri.clone(),
            owns_engine,
            children,
            connections,
            imports,
            reexports,
            imported_variables,
            reexported_variables,
        })
    }

    pub fn uri(&self) -> &ModelUri {
        &self.uri
    }

    /// `false` when this model is folded into its parent's engine.
    pub fn owns_engine(&self) -> bool {
        self.owns_engine
    }

    pub fn children(&self) -> &[Engine] {
        &self.children
    }

    pub fn imports(&self, kind: &EventType) -> bool {
        self.imports.contains_key(kind)
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Engine] {
        &mut self.children
    }

    // ── Protocol ──────────────────────────────────────────────

    pub fn set_run_parameters(&mut self, params: &RunParameters) -> DevsResult<()> {
        for child in &mut self.children {
            child.set_run_parameters(params)?;
        }
        Ok(())
    }

    pub fn initialise(&mut self, start: SimTime) -> DevsResult<()> {
        for child in &mut self.children {
            child.initialise(start)?;
        }
        Ok(())
    }

    /// Earliest next-event time across the children.
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.children.iter().filter_map(Engine::next_event_time).min()
    }

    /// Route an event this model imports to the children importing it.
    pub fn deliver(&mut self, event: Event) -> DevsResult<()> {
        let sinks = self.imports.get(&event.kind).ok_or_else(|| {
            DevsError::protocol(&self.uri, format!("event type {} is not imported", event.kind))
        })?;
        for (idx, kind) in sinks {
            trace!(model = %self.uri, event = %event, to = %self.children[*idx].uri(), "imported event routed");
            self.children[*idx].deliver(event.routed(kind, event.time))?;
        }
        Ok(())
    }

    /// Collect the outputs of every imminent child.
    ///
    /// Sibling-bound events are buffered in their targets; events this model
    /// reexports are returned to the caller. Every routed event is stamped
    /// with `now`.
    pub fn collect_outputs(&mut self, now: SimTime) -> DevsResult<Vec<Event>> {
        let mut exported = Vec::new();
        let mut routed: Vec<(usize, Event)> = Vec::new();
        for (idx, child) in self.children.iter_mut().enumerate() {
            for event in child.collect_outputs(now)? {
                let port = (idx, event.kind.clone());
                let sinks = self.connections.get(&port);
                let exports = self.reexports.get(&port);
                if sinks.is_none() && exports.is_none() {
                    trace!(model = %child.uri(), event = %event, "output has no route");
                }
                for (sink, kind) in sinks.into_iter().flatten() {
                    routed.push((*sink, event.routed(kind, now)));
                }
                for kind in exports.into_iter().flatten() {
                    exported.push(event.routed(kind, now));
                }
            }
        }
        for (idx, event) in routed {
            trace!(model = %self.uri, event = %event, to = %self.children[idx].uri(), "event routed");
            self.children[idx].deliver(event)?;
        }
        Ok(exported)
    }

    /// Fan the transition at `now` out to every child, in declaration order.
    pub fn transition(&mut self, now: SimTime, trace: &mut Vec<TraceEntry>) -> DevsResult<()> {
        for child in &mut self.children {
            child.transition(now, trace)?;
        }
        Ok(())
    }

    pub fn end_simulation(&mut self, end: SimTime) -> DevsResult<()> {
        for child in &mut self.children {
            child.end_simulation(end)?;
        }
        Ok(())
    }

    /// Aggregated report: one sub-report per child.
    pub fn final_report(&self) -> SimulationReport {
        SimulationReport::Coupled {
            uri: self.uri.clone(),
            children: self.children.iter().map(Engine::final_report).collect(),
        }
    }

    // ── Variables ─────────────────────────────────────────────

    pub(crate) fn exported_handle(&self, name: &str) -> Option<VariableHandle> {
        let (idx, child_name) = self.reexported_variables.get(name)?;
        self.children[*idx].exported_handle(child_name)
    }

    pub(crate) fn bind_import(&mut self, name: &str, handle: VariableHandle) -> DevsResult<()> {
        let sinks = self.imported_variables.get(name).ok_or_else(|| {
            DevsError::invalid(&self.uri, format!("variable {} is not imported", name))
        })?;
        for (idx, child_name) in sinks {
            self.children[*idx].bind_import(child_name, handle.clone())?;
        }
        Ok(())
    }

    pub(crate) fn unbound_imports(&self, out: &mut Vec<(ModelUri, String)>) {
        for child in &self.children {
            child.unbound_imports(out);
        }
    }
}

impl std::fmt::Debug for CoupledEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoupledEngine")
            .field("uri", &self.uri)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}
