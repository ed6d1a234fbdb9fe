//! Model descriptors: the static metadata an architecture is built from.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::{DevsError, DevsResult};
use crate::event::EventType;
use crate::model::{AtomicModel, FnFactory, ModelFactory};
use crate::time::TimeUnit;
use crate::value::{Value, ValueKind};

// ── ModelUri ──────────────────────────────────────────────────────────

/// Unique identifier of a model within an architecture.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelUri(String);

impl ModelUri {
    pub fn new(uri: impl Into<String>) -> Self {
        ModelUri(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModelUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelUri {
    fn from(s: &str) -> Self {
        ModelUri::new(s)
    }
}

impl From<&ModelUri> for ModelUri {
    fn from(u: &ModelUri) -> Self {
        u.clone()
    }
}

// ── Engine creation mode ──────────────────────────────────────────────

/// How the simulation engine of a model is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineCreationMode {
    /// Folded into the engine of its parent, which must itself be created
    /// as `AtomicEngine` (or `NoEngine`).
    NoEngine,
    /// Owns an engine. For a coupled model this means its whole subtree is
    /// simulated by that single engine.
    AtomicEngine,
    /// A coupled model owning a coordinator over its children's engines.
    CoordinationEngine,
}

// ── Signatures ────────────────────────────────────────────────────────

/// A named, typed variable declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub kind: ValueKind,
}

impl VariableDecl {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        VariableDecl {
            name: name.into(),
            kind,
        }
    }
}

/// The events and variables a model consumes and produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSignature {
    pub imported_events: IndexSet<EventType>,
    pub exported_events: IndexSet<EventType>,
    pub imported_variables: IndexMap<String, ValueKind>,
    pub exported_variables: IndexMap<String, ValueKind>,
}

impl ModelSignature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn imports(mut self, kind: impl Into<EventType>) -> Self {
        self.imported_events.insert(kind.into());
        self
    }

    pub fn exports(mut self, kind: impl Into<EventType>) -> Self {
        self.exported_events.insert(kind.into());
        self
    }

    pub fn imports_variable(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.imported_variables.insert(name.into(), kind);
        self
    }

    pub fn exports_variable(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.exported_variables.insert(name.into(), kind);
        self
    }
}

// ── Routing endpoints ─────────────────────────────────────────────────

/// A `(model, event type)` pair emitting events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventSource {
    pub model: ModelUri,
    pub kind: EventType,
}

impl EventSource {
    pub fn new(model: impl Into<ModelUri>, kind: impl Into<EventType>) -> Self {
        EventSource {
            model: model.into(),
            kind: kind.into(),
        }
    }
}

/// A `(model, event type)` pair receiving events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventSink {
    pub model: ModelUri,
    pub kind: EventType,
}

impl EventSink {
    pub fn new(model: impl Into<ModelUri>, kind: impl Into<EventType>) -> Self {
        EventSink {
            model: model.into(),
            kind: kind.into(),
        }
    }
}

/// A variable exported by a submodel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableSource {
    pub name: String,
    pub kind: ValueKind,
    pub model: ModelUri,
}

impl VariableSource {
    pub fn new(name: impl Into<String>, kind: ValueKind, model: impl Into<ModelUri>) -> Self {
        VariableSource {
            name: name.into(),
            kind,
            model: model.into(),
        }
    }
}

/// A variable imported by a submodel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableSink {
    pub name: String,
    pub kind: ValueKind,
    pub model: ModelUri,
}

impl VariableSink {
    pub fn new(name: impl Into<String>, kind: ValueKind, model: impl Into<ModelUri>) -> Self {
        VariableSink {
            name: name.into(),
            kind,
            model: model.into(),
        }
    }
}

// ── Atomic descriptor ─────────────────────────────────────────────────

/// Static metadata of a leaf model.
#[derive(Clone)]
pub struct AtomicDescriptor {
    pub uri: ModelUri,
    pub factory: Arc<dyn ModelFactory>,
    pub time_unit: TimeUnit,
    pub creation_mode: EngineCreationMode,
    pub signature: ModelSignature,
    /// Defaults consulted when the run parameters lack a key.
    pub parameters: IndexMap<String, Value>,
}

impl AtomicDescriptor {
    /// Descriptor whose model is built by calling `make` once per run.
    pub fn new<M, F>(uri: impl Into<ModelUri>, time_unit: TimeUnit, make: F) -> Self
    where
        M: AtomicModel,
        F: Fn() -> M + Send + Sync + 'static,
    {
        Self::with_factory(uri, time_unit, FnFactory::new(make))
    }

    /// Descriptor backed by an arbitrary (possibly fallible) factory.
    pub fn with_factory(
        uri: impl Into<ModelUri>,
        time_unit: TimeUnit,
        factory: impl ModelFactory + 'static,
    ) -> Self {
        AtomicDescriptor {
            uri: uri.into(),
            factory: Arc::new(factory),
            time_unit,
            creation_mode: EngineCreationMode::AtomicEngine,
            signature: ModelSignature::new(),
            parameters: IndexMap::new(),
        }
    }

    pub fn with_signature(mut self, signature: ModelSignature) -> Self {
        self.signature = signature;
        self
    }

    pub fn with_creation_mode(mut self, mode: EngineCreationMode) -> Self {
        self.creation_mode = mode;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

impl std::fmt::Debug for AtomicDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicDescriptor")
            .field("uri", &self.uri)
            .field("time_unit", &self.time_unit)
            .field("creation_mode", &self.creation_mode)
            .field("signature", &self.signature)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

// ── Coupled descriptor ────────────────────────────────────────────────

/// Static metadata of a composite model and its routing tables.
#[derive(Debug, Clone)]
pub struct CoupledDescriptor {
    pub uri: ModelUri,
    /// Children in declaration order; this order is used wherever siblings
    /// must be visited deterministically.
    pub submodels: IndexSet<ModelUri>,
    /// Events this model imports, forwarded to children.
    pub imported: IndexMap<EventType, Vec<EventSink>>,
    /// Events this model exports, keyed by the exported type, fed by children.
    pub reexported: IndexMap<EventType, Vec<EventSource>>,
    /// Sibling-to-sibling event routes.
    pub connections: IndexMap<EventSource, Vec<EventSink>>,
    pub imported_variables: IndexMap<VariableDecl, Vec<VariableSink>>,
    pub reexported_variables: IndexMap<VariableSource, VariableDecl>,
    pub bindings: IndexMap<VariableSource, Vec<VariableSink>>,
    pub creation_mode: EngineCreationMode,
}

impl CoupledDescriptor {
    pub fn new(uri: impl Into<ModelUri>) -> Self {
        CoupledDescriptor {
            uri: uri.into(),
            submodels: IndexSet::new(),
            imported: IndexMap::new(),
            reexported: IndexMap::new(),
            connections: IndexMap::new(),
            imported_variables: IndexMap::new(),
            reexported_variables: IndexMap::new(),
            bindings: IndexMap::new(),
            creation_mode: EngineCreationMode::CoordinationEngine,
        }
    }

    pub fn with_submodel(mut self, uri: impl Into<ModelUri>) -> Self {
        self.submodels.insert(uri.into());
        self
    }

    pub fn with_creation_mode(mut self, mode: EngineCreationMode) -> Self {
        self.creation_mode = mode;
        self
    }

    /// Route `source` events of one child to `sink` of a sibling.
    pub fn connect(mut self, source: EventSource, sink: EventSink) -> Self {
        self.connections.entry(source).or_default().push(sink);
        self
    }

    /// Forward events of type `kind` received by this model to `sink`.
    pub fn import(mut self, kind: impl Into<EventType>, sink: EventSink) -> Self {
        self.imported.entry(kind.into()).or_default().push(sink);
        self
    }

    /// Export `source` events of a child as `kind` events of this model.
    pub fn reexport(mut self, kind: impl Into<EventType>, source: EventSource) -> Self {
        self.reexported.entry(kind.into()).or_default().push(source);
        self
    }

    /// Bind a child's exported variable to a sibling's imported one.
    pub fn bind(mut self, source: VariableSource, sink: VariableSink) -> Self {
        self.bindings.entry(source).or_default().push(sink);
        self
    }

    /// Forward a variable imported by this model to a child.
    pub fn import_variable(mut self, decl: VariableDecl, sink: VariableSink) -> Self {
        self.imported_variables.entry(decl).or_default().push(sink);
        self
    }

    /// Export a child's variable as a variable of this model.
    pub fn reexport_variable(mut self, source: VariableSource, decl: VariableDecl) -> Self {
        self.reexported_variables.insert(source, decl);
        self
    }

    /// The signature this model presents to its own parent.
    pub fn signature(&self) -> ModelSignature {
        ModelSignature {
            imported_events: self.imported.keys().cloned().collect(),
            exported_events: self.reexported.keys().cloned().collect(),
            imported_variables: self
                .imported_variables
                .keys()
                .map(|d| (d.name.clone(), d.kind))
                .collect(),
            exported_variables: self
                .reexported_variables
                .values()
                .map(|d| (d.name.clone(), d.kind))
                .collect(),
        }
    }

    /// Every model URI the routing tables mention, submodels first.
    pub fn referenced_models(&self) -> IndexSet<ModelUri> {
        let mut refs: IndexSet<ModelUri> = self.submodels.iter().cloned().collect();
        for (source, sinks) in &self.connections {
            refs.insert(source.model.clone());
            refs.extend(sinks.iter().map(|s| s.model.clone()));
        }
        for sinks in self.imported.values() {
            refs.extend(sinks.iter().map(|s| s.model.clone()));
        }
        for sources in self.reexported.values() {
            refs.extend(sources.iter().map(|s| s.model.clone()));
        }
        for (source, sinks) in &self.bindings {
            refs.insert(source.model.clone());
            refs.extend(sinks.iter().map(|s| s.model.clone()));
        }
        for sinks in self.imported_variables.values() {
            refs.extend(sinks.iter().map(|s| s.model.clone()));
        }
        refs.extend(self.reexported_variables.keys().map(|s| s.model.clone()));
        refs
    }
}

// ── ModelDescriptor ───────────────────────────────────────────────────

/// Descriptor of one model: atomic or coupled, never both.
#[derive(Debug, Clone)]
pub enum ModelDescriptor {
    Atomic(AtomicDescriptor),
    Coupled(CoupledDescriptor),
}

impl ModelDescriptor {
    pub fn uri(&self) -> &ModelUri {
        match self {
            ModelDescriptor::Atomic(d) => &d.uri,
            ModelDescriptor::Coupled(d) => &d.uri,
        }
    }

    pub fn creation_mode(&self) -> EngineCreationMode {
        match self {
            ModelDescriptor::Atomic(d) => d.creation_mode,
            ModelDescriptor::Coupled(d) => d.creation_mode,
        }
    }

    pub fn signature(&self) -> ModelSignature {
        match self {
            ModelDescriptor::Atomic(d) => d.signature.clone(),
            ModelDescriptor::Coupled(d) => d.signature(),
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, ModelDescriptor::Atomic(_))
    }

    pub fn as_coupled(&self) -> Option<&CoupledDescriptor> {
        match self {
            ModelDescriptor::Coupled(d) => Some(d),
            ModelDescriptor::Atomic(_) => None,
        }
    }

    /// Local well-formedness, checkable without the rest of the architecture.
    pub(crate) fn check_well_formed(&self) -> DevsResult<()> {
        let uri = self.uri();
        if uri.as_str().is_empty() {
            return Err(DevsError::invalid(uri, "empty model URI"));
        }
        match self {
            ModelDescriptor::Atomic(d) => {
                if d.creation_mode == EngineCreationMode::CoordinationEngine {
                    return Err(DevsError::invalid(
                        uri,
                        "an atomic model cannot own a coordination engine",
                    ));
                }
                Ok(())
            }
            ModelDescriptor::Coupled(d) => d.check_well_formed(),
        }
    }
}

impl CoupledDescriptor {
    fn check_well_formed(&self) -> DevsResult<()> {
        let uri = &self.uri;
        if self.submodels.is_empty() {
            return Err(DevsError::invalid(uri, "a coupled model needs submodels"));
        }
        if self.submodels.contains(uri) {
            return Err(DevsError::invalid(uri, "a coupled model cannot contain itself"));
        }
        let child = |m: &ModelUri, role: &str| -> DevsResult<()> {
            if self.submodels.contains(m) {
                Ok(())
            } else {
                Err(DevsError::invalid(
                    uri,
                    format!("{} {} is not a declared submodel", role, m),
                ))
            }
        };
        for (source, sinks) in &self.connections {
            child(&source.model, "connection source")?;
            for sink in sinks {
                child(&sink.model, "connection sink")?;
                if sink.model == source.model {
                    return Err(DevsError::invalid(
                        uri,
                        format!("connection loops back into {}", sink.model),
                    ));
                }
            }
        }
        for sink in self.imported.values().flatten() {
            child(&sink.model, "imported event sink")?;
        }
        for source in self.reexported.values().flatten() {
            child(&source.model, "reexported event source")?;
        }
        for (source, sinks) in &self.bindings {
            child(&source.model, "variable source")?;
            for sink in sinks {
                child(&sink.model, "variable sink")?;
            }
        }
        for sink in self.imported_variables.values().flatten() {
            child(&sink.model, "imported variable sink")?;
        }
        for source in self.reexported_variables.keys() {
            child(&source.model, "reexported variable source")?;
        }
        Ok(())
    }
}
