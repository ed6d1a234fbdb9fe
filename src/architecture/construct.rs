//! Simulator construction: one engine per model, built bottom-up.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::{DevsError, DevsResult};
use crate::event::PriorityOrder;
use crate::model::{AtomicEngine, CoupledEngine, Engine};
use crate::simulator::Simulator;
use crate::time::TimeUnit;

use super::descriptor::{EngineCreationMode, ModelDescriptor};
use super::{Architecture, ModelUri};

// ── Run context ───────────────────────────────────────────────────────

/// Run-wide settings threaded explicitly through every engine.
///
/// Produced by [`Architecture::validate`]; replaces any process-wide
/// simulation state.
#[derive(Debug, Clone)]
pub struct RunContext {
    time_unit: TimeUnit,
    priorities: PriorityOrder,
}

impl RunContext {
    pub fn new(time_unit: TimeUnit, priorities: PriorityOrder) -> Self {
        RunContext {
            time_unit,
            priorities,
        }
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    pub fn priorities(&self) -> &PriorityOrder {
        &self.priorities
    }
}

// ── Construction ──────────────────────────────────────────────────────

impl Architecture {
    /// Build the engine tree of the whole architecture and wrap it in a
    /// run driver.
    ///
    /// Every imported variable in the tree must end up bound, since the
    /// root has no parent to supply it.
    pub fn construct_simulator(&self) -> DevsResult<Simulator> {
        let run = Arc::new(self.validate()?);
        let root = self
            .root
            .clone()
            .ok_or_else(|| DevsError::IncompleteArchitecture("no root model is set".into()))?;
        let engine = self.build(&root, &run)?;

        let mut unbound = Vec::new();
        engine.unbound_imports(&mut unbound);
        if let Some((model, name)) = unbound.into_iter().next() {
            return Err(DevsError::construction(
                &model,
                format!("imported variable {} is never bound", name),
            ));
        }

        info!(root = %root, unit = %run.time_unit(), "simulator constructed");
        Ok(Simulator::new(engine, run))
    }

    /// Build the engine of the subtree rooted at `uri`.
    ///
    /// Imported variables of the subtree may remain unbound; they are
    /// expected to be supplied by whatever composes the returned engine.
    pub fn construct_simulator_at(&self, uri: &ModelUri) -> DevsResult<Engine> {
        let run = Arc::new(self.validate()?);
        self.build(uri, &run)
    }

    /// Walk the topological order, instantiating every engine-owning model
    /// after its children. The first failure aborts construction.
    fn build(&self, uri: &ModelUri, run: &Arc<RunContext>) -> DevsResult<Engine> {
        let order = self.topological_sort_from(uri)?;
        let mut built: IndexMap<ModelUri, Engine> = IndexMap::new();
        for model in self.extract_models_with_engine(&order) {
            let engine = self.instantiate(&model, run, &mut built)?;
            built.insert(model, engine);
        }
        match built.shift_remove(uri) {
            Some(engine) => Ok(engine),
            None => self.instantiate(uri, run, &mut built),
        }
    }

    /// Instantiate one engine. Children already built are moved into their
    /// parent; folded (`NoEngine`) children are built inline.
    fn instantiate(
        &self,
        uri: &ModelUri,
        run: &Arc<RunContext>,
        built: &mut IndexMap<ModelUri, Engine>,
    ) -> DevsResult<Engine> {
        let descriptor = self
            .models
            .get(uri)
            .ok_or_else(|| DevsError::UnknownModel(uri.clone()))?;
        let owns_engine = descriptor.creation_mode() != EngineCreationMode::NoEngine;

        match descriptor {
            ModelDescriptor::Atomic(d) => {
                let model = d
                    .factory
                    .create(uri)
                    .map_err(|e| DevsError::construction(uri, e))?;
                debug!(model = %uri, owns_engine, "instantiated atomic model");
                Ok(Engine::Atomic(AtomicEngine::new(
                    d,
                    model,
                    Arc::clone(run),
                    owns_engine,
                )))
            }
            ModelDescriptor::Coupled(d) => {
                let mut children = Vec::with_capacity(d.submodels.len());
                for child in &d.submodels {
                    let engine = match built.shift_remove(child) {
                        Some(engine) => engine,
                        None => self.instantiate(child, run, built)?,
                    };
                    children.push(engine);
                }
                let engine = CoupledEngine::new(d, children, owns_engine)
                    .map_err(|e| DevsError::construction(uri, e))?;
                debug!(model = %uri, owns_engine, "composed coupled model");
                Ok(Engine::Coupled(engine))
            }
        }
    }
}
