//! Completeness, structural validation and topological ordering.

use std::collections::HashMap;

use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::error::{DevsError, DevsResult};

use super::construct::RunContext;
use super::descriptor::{CoupledDescriptor, EngineCreationMode, ModelDescriptor, ModelSignature};
use super::{Architecture, ModelUri};

impl Architecture {
    /// `true` when a root and a time unit are set and every URI referenced
    /// by a coupled descriptor resolves to a registered descriptor.
    pub fn is_complete(&self) -> bool {
        self.root.is_some() && self.time_unit.is_some() && self.missing_references().is_empty()
    }

    /// URIs referenced by coupled descriptors but never registered.
    pub fn missing_references(&self) -> Vec<ModelUri> {
        let mut missing = IndexSet::new();
        for coupled in self.models.values().filter_map(ModelDescriptor::as_coupled) {
            for uri in coupled.referenced_models() {
                if !self.models.contains_key(&uri) {
                    missing.insert(uri);
                }
            }
        }
        missing.into_iter().collect()
    }

    /// Full structural validation, run before any engine is built.
    ///
    /// Beyond completeness this checks containment (one parent per model,
    /// no cycles), engine creation modes, time units, the event types and
    /// variable kinds of every route, and the acyclicity of the declared
    /// event priorities. On success the resolved run context is returned.
    pub fn validate(&self) -> DevsResult<RunContext> {
        let root = self.root.as_ref().ok_or_else(|| {
            DevsError::IncompleteArchitecture("no root model is set".into())
        })?;
        let unit = self.time_unit.ok_or_else(|| {
            DevsError::IncompleteArchitecture("simulation time unit is not set".into())
        })?;
        let missing = self.missing_references();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(ModelUri::as_str).collect();
            return Err(DevsError::IncompleteArchitecture(format!(
                "unresolved models: {}",
                names.join(", ")
            )));
        }

        let parents = self.check_containment(root)?;
        self.check_creation_modes(root, &parents)?;

        for descriptor in self.models.values() {
            match descriptor {
                ModelDescriptor::Atomic(d) if d.time_unit != unit => {
                    return Err(DevsError::invalid(
                        &d.uri,
                        format!("time unit {} differs from the architecture's {}", d.time_unit, unit),
                    ));
                }
                ModelDescriptor::Atomic(_) => {}
                ModelDescriptor::Coupled(c) => self.check_routing(c)?,
            }
        }

        let priorities = self.priorities.resolve()?;

        let reachable: IndexSet<&ModelUri> = self.subtree(root).into_iter().collect();
        for uri in self.models.keys().filter(|u| !reachable.contains(u)) {
            warn!(model = %uri, "model is not reachable from the root and will not be simulated");
        }

        debug!(root = %root, models = self.models.len(), "architecture validated");
        Ok(RunContext::new(unit, priorities))
    }

    /// Children-before-parent ordering of the whole tree.
    pub fn topological_sort(&self) -> DevsResult<Vec<ModelUri>> {
        let root = self.root.as_ref().ok_or_else(|| {
            DevsError::IncompleteArchitecture("no root model is set".into())
        })?;
        self.topological_sort_from(root)
    }

    /// Children-before-parent ordering of the subtree rooted at `uri`.
    ///
    /// Siblings appear in the declaration order of their parent, so the
    /// result is identical across runs.
    pub fn topological_sort_from(&self, uri: &ModelUri) -> DevsResult<Vec<ModelUri>> {
        if !self.is_complete() {
            return Err(DevsError::IncompleteArchitecture(
                "topological sort requires a complete architecture".into(),
            ));
        }
        if !self.is_model(uri) {
            return Err(DevsError::UnknownModel(uri.clone()));
        }
        let mut order = Vec::with_capacity(self.models.len());
        let mut on_path = Vec::new();
        self.post_order(uri, &mut on_path, &mut order)?;
        Ok(order)
    }

    /// Keep only the models that own a distinct engine, preserving order.
    pub fn extract_models_with_engine(&self, models: &[ModelUri]) -> Vec<ModelUri> {
        models
            .iter()
            .filter(|uri| {
                self.models
                    .get(*uri)
                    .is_some_and(|d| d.creation_mode() != EngineCreationMode::NoEngine)
            })
            .cloned()
            .collect()
    }

    fn post_order(
        &self,
        uri: &ModelUri,
        on_path: &mut Vec<ModelUri>,
        order: &mut Vec<ModelUri>,
    ) -> DevsResult<()> {
        if on_path.contains(uri) {
            return Err(DevsError::invalid(uri, "containment cycle"));
        }
        if let Some(ModelDescriptor::Coupled(c)) = self.models.get(uri) {
            on_path.push(uri.clone());
            for child in &c.submodels {
                self.post_order(child, on_path, order)?;
            }
            on_path.pop();
        }
        if !order.contains(uri) {
            order.push(uri.clone());
        }
        Ok(())
    }

    /// URIs in the subtree of `uri`, parents first; tolerant of cycles.
    fn subtree(&self, uri: &ModelUri) -> Vec<&ModelUri> {
        let mut seen: IndexSet<&ModelUri> = IndexSet::new();
        let mut stack: Vec<&ModelUri> = vec![uri];
        while let Some(current) = stack.pop() {
            let Some((_, key, descriptor)) = self.models.get_full(current) else {
                continue;
            };
            if !seen.insert(key) {
                continue;
            }
            if let ModelDescriptor::Coupled(c) = descriptor {
                stack.extend(c.submodels.iter().rev());
            }
        }
        seen.into_iter().collect()
    }

    /// Every model has at most one parent, the root has none, and
    /// containment is acyclic. Returns the child → parent map.
    fn check_containment(&self, root: &ModelUri) -> DevsResult<HashMap<&ModelUri, &ModelUri>> {
        let mut parents: HashMap<&ModelUri, &ModelUri> = HashMap::new();
        for coupled in self.models.values().filter_map(ModelDescriptor::as_coupled) {
            for child in &coupled.submodels {
                if let Some(previous) = parents.insert(child, &coupled.uri) {
                    return Err(DevsError::invalid(
                        child,
                        format!("declared as a submodel of both {} and {}", previous, coupled.uri),
                    ));
                }
            }
        }
        if let Some(parent) = parents.get(root) {
            return Err(DevsError::invalid(
                root,
                format!("the root cannot be a submodel of {}", parent),
            ));
        }
        for start in parents.keys() {
            let mut current = *start;
            let mut steps = 0usize;
            while let Some(parent) = parents.get(current) {
                steps += 1;
                if *parent == *start || steps > parents.len() {
                    return Err(DevsError::invalid(start, "containment cycle"));
                }
                current = *parent;
            }
        }
        Ok(parents)
    }

    /// A `NoEngine` model is folded into its parent, so its parent must
    /// itself be simulated as a single engine; conversely every child of a
    /// single-engine coupled model is folded.
    fn check_creation_modes(
        &self,
        root: &ModelUri,
        parents: &HashMap<&ModelUri, &ModelUri>,
    ) -> DevsResult<()> {
        if self.is_engine_creation_mode(root, EngineCreationMode::NoEngine) {
            return Err(DevsError::invalid(root, "the root must own an engine"));
        }
        for (uri, descriptor) in &self.models {
            let Some(parent) = parents.get(uri) else {
                continue;
            };
            let parent_mode = self.models[*parent].creation_mode();
            let folded_parent = parent_mode != EngineCreationMode::CoordinationEngine;
            let folded = descriptor.creation_mode() == EngineCreationMode::NoEngine;
            if folded != folded_parent {
                return Err(DevsError::invalid(
                    uri,
                    format!(
                        "creation mode {:?} is incompatible with parent {} created as {:?}",
                        descriptor.creation_mode(),
                        parent,
                        parent_mode
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Event types and variable kinds of every route must match the
    /// signatures of the models at both ends.
    fn check_routing(&self, coupled: &CoupledDescriptor) -> DevsResult<()> {
        let uri = &coupled.uri;
        let signatures: HashMap<&ModelUri, ModelSignature> = coupled
            .submodels
            .iter()
            .filter_map(|child| self.models.get(child).map(|d| (child, d.signature())))
            .collect();
        fn sig<'a>(
            signatures: &'a HashMap<&ModelUri, ModelSignature>,
            m: &ModelUri,
        ) -> DevsResult<&'a ModelSignature> {
            signatures
                .get(m)
                .ok_or_else(|| DevsError::UnknownModel(m.clone()))
        }
        let fail = |reason: String| Err(DevsError::invalid(uri, reason));

        for (source, sinks) in &coupled.connections {
            if !sig(&signatures, &source.model)?.exported_events.contains(&source.kind) {
                return fail(format!("{} does not export {}", source.model, source.kind));
            }
            for sink in sinks {
                if !sig(&signatures, &sink.model)?.imported_events.contains(&sink.kind) {
                    return fail(format!("{} does not import {}", sink.model, sink.kind));
                }
            }
        }
        for (kind, sinks) in &coupled.imported {
            for sink in sinks {
                if !sig(&signatures, &sink.model)?.imported_events.contains(&sink.kind) {
                    return fail(format!(
                        "imported {} is forwarded to {} which does not import {}",
                        kind, sink.model, sink.kind
                    ));
                }
            }
        }
        for (kind, sources) in &coupled.reexported {
            for source in sources {
                if !sig(&signatures, &source.model)?.exported_events.contains(&source.kind) {
                    return fail(format!(
                        "reexported {} comes from {} which does not export {}",
                        kind, source.model, source.kind
                    ));
                }
            }
        }

        for (source, sinks) in &coupled.bindings {
            match sig(&signatures, &source.model)?.exported_variables.get(&source.name) {
                Some(kind) if *kind == source.kind => {}
                _ => {
                    return fail(format!(
                        "{} does not export variable {}: {}",
                        source.model, source.name, source.kind
                    ))
                }
            }
            for sink in sinks {
                if sink.kind != source.kind {
                    return fail(format!(
                        "binding {}.{} -> {}.{} mixes {} and {}",
                        source.model, source.name, sink.model, sink.name, source.kind, sink.kind
                    ));
                }
                match sig(&signatures, &sink.model)?.imported_variables.get(&sink.name) {
                    Some(kind) if *kind == sink.kind => {}
                    _ => {
                        return fail(format!(
                            "{} does not import variable {}: {}",
                            sink.model, sink.name, sink.kind
                        ))
                    }
                }
            }
        }
        for (decl, sinks) in &coupled.imported_variables {
            for sink in sinks {
                let imported = sig(&signatures, &sink.model)?.imported_variables.get(&sink.name);
                if sink.kind != decl.kind || imported != Some(&sink.kind) {
                    return fail(format!(
                        "imported variable {} cannot feed {}.{}",
                        decl.name, sink.model, sink.name
                    ));
                }
            }
        }
        for (source, decl) in &coupled.reexported_variables {
            let exported = sig(&signatures, &source.model)?.exported_variables.get(&source.name);
            if source.kind != decl.kind || exported != Some(&source.kind) {
                return fail(format!(
                    "reexported variable {} cannot come from {}.{}",
                    decl.name, source.model, source.name
                ));
            }
        }
        Ok(())
    }
}
