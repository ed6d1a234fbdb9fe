//! Model architectures: the declarative graph a simulator is built from.
//!
//! An [`Architecture`] owns one descriptor per model URI, the root URI and
//! the run's time unit. Descriptors may be added in any order by
//! independent producers; completeness is evaluated lazily.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`descriptor`] | [`ModelUri`], [`ModelDescriptor`], routing endpoints |
//! | `validate` | completeness, structural validation, topological order |
//! | `construct` | engine construction, [`RunContext`] |

pub mod descriptor;

mod construct;
mod validate;

pub use construct::RunContext;
pub use descriptor::{
    AtomicDescriptor, CoupledDescriptor, EngineCreationMode, EventSink, EventSource,
    ModelDescriptor, ModelSignature, ModelUri, VariableDecl, VariableSink, VariableSource,
};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::error::{DevsError, DevsResult};
use crate::event::{EventPriorities, EventType};
use crate::time::TimeUnit;

#[cfg(test)]
mod tests;

/// The aggregate graph of model descriptors.
#[derive(Debug, Clone, Default)]
pub struct Architecture {
    models: IndexMap<ModelUri, ModelDescriptor>,
    root: Option<ModelUri>,
    time_unit: Option<TimeUnit>,
    priorities: EventPriorities,
}

impl Architecture {
    /// Create an empty architecture with no time unit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty architecture with its time unit already declared.
    pub fn with_time_unit(unit: TimeUnit) -> Self {
        Architecture {
            time_unit: Some(unit),
            ..Self::default()
        }
    }

    // ── Time unit ─────────────────────────────────────────────

    /// Declare the simulation time unit. May be done exactly once.
    pub fn set_time_unit(&mut self, unit: TimeUnit) -> DevsResult<()> {
        if self.time_unit.is_some() {
            return Err(DevsError::TimeUnitAlreadySet);
        }
        self.time_unit = Some(unit);
        Ok(())
    }

    pub fn is_time_unit_set(&self) -> bool {
        self.time_unit.is_some()
    }

    pub fn time_unit(&self) -> Option<TimeUnit> {
        self.time_unit
    }

    // ── Event priorities ──────────────────────────────────────

    /// Declare that `higher` events are applied before `lower` events
    /// reaching the same model at the same instant.
    pub fn declare_priority(&mut self, higher: impl Into<EventType>, lower: impl Into<EventType>) {
        self.priorities.declare(higher, lower);
    }

    pub fn priorities(&self) -> &EventPriorities {
        &self.priorities
    }

    // ── Adding and removing models ────────────────────────────

    pub fn add_atomic_model(&mut self, descriptor: AtomicDescriptor) -> DevsResult<()> {
        self.insert(ModelDescriptor::Atomic(descriptor))
    }

    pub fn add_coupled_model(&mut self, descriptor: CoupledDescriptor) -> DevsResult<()> {
        self.insert(ModelDescriptor::Coupled(descriptor))
    }

    /// Add an atomic model as the root of a mono-model architecture.
    ///
    /// Requires the architecture to be empty.
    pub fn add_atomic_model_as_root(&mut self, descriptor: AtomicDescriptor) -> DevsResult<()> {
        if !self.models.is_empty() {
            if self.models.contains_key(&descriptor.uri) {
                return Err(DevsError::DuplicateModel(descriptor.uri));
            }
            return Err(DevsError::ArchitectureNotEmpty {
                count: self.models.len(),
            });
        }
        let uri = descriptor.uri.clone();
        self.add_atomic_model(descriptor)?;
        self.root = Some(uri);
        Ok(())
    }

    /// Add a coupled model as the root. Requires that no root is set yet.
    pub fn add_coupled_model_as_root(&mut self, descriptor: CoupledDescriptor) -> DevsResult<()> {
        if let Some(existing) = &self.root {
            return Err(DevsError::RootAlreadySet {
                existing: existing.clone(),
            });
        }
        let uri = descriptor.uri.clone();
        self.add_coupled_model(descriptor)?;
        self.root = Some(uri);
        Ok(())
    }

    /// Mark an already registered model as the root.
    pub fn set_root(&mut self, uri: &ModelUri) -> DevsResult<()> {
        if let Some(existing) = &self.root {
            return Err(DevsError::RootAlreadySet {
                existing: existing.clone(),
            });
        }
        if !self.is_model(uri) {
            return Err(DevsError::UnknownModel(uri.clone()));
        }
        self.root = Some(uri.clone());
        Ok(())
    }

    /// Remove a model's descriptor. Removing the root clears the root.
    pub fn remove_model(&mut self, uri: &ModelUri) -> DevsResult<ModelDescriptor> {
        let removed = self
            .models
            .shift_remove(uri)
            .ok_or_else(|| DevsError::UnknownModel(uri.clone()))?;
        if self.root.as_ref() == Some(uri) {
            self.root = None;
        }
        debug!(model = %uri, "removed model descriptor");
        Ok(removed)
    }

    fn insert(&mut self, descriptor: ModelDescriptor) -> DevsResult<()> {
        descriptor.check_well_formed()?;
        let uri = descriptor.uri().clone();
        if self.models.contains_key(&uri) {
            return Err(DevsError::DuplicateModel(uri));
        }
        debug!(
            model = %uri,
            atomic = descriptor.is_atomic(),
            mode = ?descriptor.creation_mode(),
            "added model descriptor"
        );
        self.models.insert(uri, descriptor);
        Ok(())
    }

    // ── Membership queries ────────────────────────────────────

    pub fn is_model(&self, uri: &ModelUri) -> bool {
        self.models.contains_key(uri)
    }

    pub fn is_atomic_model(&self, uri: &ModelUri) -> DevsResult<bool> {
        Ok(self.descriptor(uri)?.is_atomic())
    }

    pub fn is_coupled_model(&self, uri: &ModelUri) -> DevsResult<bool> {
        Ok(!self.descriptor(uri)?.is_atomic())
    }

    /// `true` when the root is an atomic model.
    pub fn is_mono_model(&self) -> bool {
        self.root
            .as_ref()
            .and_then(|r| self.models.get(r))
            .is_some_and(ModelDescriptor::is_atomic)
    }

    pub fn is_root_model(&self, uri: &ModelUri) -> bool {
        self.root.as_ref() == Some(uri)
    }

    pub fn root_model(&self) -> Option<&ModelUri> {
        self.root.as_ref()
    }

    pub fn model_descriptor(&self, uri: &ModelUri) -> Option<&ModelDescriptor> {
        self.models.get(uri)
    }

    /// All registered URIs, in insertion order.
    pub fn all_models(&self) -> Vec<ModelUri> {
        self.models.keys().cloned().collect()
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn is_engine_creation_mode(&self, uri: &ModelUri, mode: EngineCreationMode) -> bool {
        self.models
            .get(uri)
            .is_some_and(|d| d.creation_mode() == mode)
    }

    // ── Ancestry queries ──────────────────────────────────────

    /// The coupled model declaring `uri` as a submodel, if any.
    pub fn parent_of(&self, uri: &ModelUri) -> Option<&ModelUri> {
        self.models
            .values()
            .filter_map(ModelDescriptor::as_coupled)
            .find(|c| c.submodels.contains(uri))
            .map(|c| &c.uri)
    }

    /// Direct children of a coupled model, in declaration order.
    pub fn children_of(&self, uri: &ModelUri) -> DevsResult<Vec<ModelUri>> {
        Ok(self.coupled(uri)?.submodels.iter().cloned().collect())
    }

    /// Proper descendants of a coupled model, depth-first.
    pub fn descendants_of(&self, uri: &ModelUri) -> DevsResult<Vec<ModelUri>> {
        let mut out = IndexSet::new();
        self.collect_descendants(self.coupled(uri)?, &mut out);
        Ok(out.into_iter().collect())
    }

    /// `true` when `child` is a direct submodel of `parent`.
    ///
    /// Both models must be registered and distinct.
    pub fn is_child_model_of(&self, child: &ModelUri, parent: &ModelUri) -> DevsResult<bool> {
        if child == parent {
            return Err(DevsError::protocol(parent, "a model is not its own child"));
        }
        self.descriptor(child)?;
        Ok(self.coupled(parent)?.submodels.contains(child))
    }

    /// `true` when `descendant` is a proper descendant of `ancestor`.
    ///
    /// Asking whether a model descends from itself is a contract violation.
    pub fn is_descendant(&self, descendant: &ModelUri, ancestor: &ModelUri) -> DevsResult<bool> {
        if descendant == ancestor {
            return Err(DevsError::protocol(
                ancestor,
                "a model is not its own descendant",
            ));
        }
        let mut out = IndexSet::new();
        self.collect_descendants(self.coupled(ancestor)?, &mut out);
        Ok(out.contains(descendant))
    }

    fn collect_descendants(&self, coupled: &CoupledDescriptor, out: &mut IndexSet<ModelUri>) {
        for child in &coupled.submodels {
            // A revisited model means a containment cycle; validation reports it.
            if !out.insert(child.clone()) {
                continue;
            }
            if let Some(ModelDescriptor::Coupled(c)) = self.models.get(child) {
                self.collect_descendants(c, out);
            }
        }
    }

    // ── Internal lookups ──────────────────────────────────────

    fn descriptor(&self, uri: &ModelUri) -> DevsResult<&ModelDescriptor> {
        self.models
            .get(uri)
            .ok_or_else(|| DevsError::UnknownModel(uri.clone()))
    }

    /// The coupled descriptor of `uri`; an atomic model counts as unknown.
    fn coupled(&self, uri: &ModelUri) -> DevsResult<&CoupledDescriptor> {
        self.descriptor(uri)?
            .as_coupled()
            .ok_or_else(|| DevsError::UnknownModel(uri.clone()))
    }
}
