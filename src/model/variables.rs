//! Shared model variables.
//!
//! A variable is owned by the model exporting it. Readers get a
//! [`VariableHandle`], a read-only alias into the writer's holder, wired by
//! the parent coupled engine when the engine tree is built.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::architecture::{ModelSignature, ModelUri};
use crate::error::{DevsError, DevsResult};
use crate::value::{Value, ValueKind};

/// Writer-side holder of one exported variable.
#[derive(Debug, Clone)]
pub struct VariableCell {
    kind: ValueKind,
    value: Rc<RefCell<Value>>,
}

impl VariableCell {
    pub fn new(kind: ValueKind) -> Self {
        VariableCell {
            kind,
            value: Rc::new(RefCell::new(kind.default_value())),
        }
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn get(&self) -> Value {
        self.value.borrow().clone()
    }

    /// A read-only alias of this cell.
    pub fn handle(&self) -> VariableHandle {
        VariableHandle {
            kind: self.kind,
            value: Rc::clone(&self.value),
        }
    }

    fn set(&self, value: Value) {
        *self.value.borrow_mut() = value;
    }
}

/// Reader-side alias of a variable owned by another model.
#[derive(Debug, Clone)]
pub struct VariableHandle {
    kind: ValueKind,
    value: Rc<RefCell<Value>>,
}

impl VariableHandle {
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn get(&self) -> Value {
        self.value.borrow().clone()
    }
}

/// The variables of one atomic model: cells it writes, handles it reads.
#[derive(Debug, Default)]
pub struct ModelVariables {
    exported: IndexMap<String, VariableCell>,
    imported: IndexMap<String, (ValueKind, Option<VariableHandle>)>,
}

impl ModelVariables {
    pub fn from_signature(signature: &ModelSignature) -> Self {
        ModelVariables {
            exported: signature
                .exported_variables
                .iter()
                .map(|(name, kind)| (name.clone(), VariableCell::new(*kind)))
                .collect(),
            imported: signature
                .imported_variables
                .iter()
                .map(|(name, kind)| (name.clone(), (*kind, None)))
                .collect(),
        }
    }

    /// Current value of an imported (bound) or exported variable.
    pub fn read(&self, name: &str) -> Option<Value> {
        if let Some((_, handle)) = self.imported.get(name) {
            return handle.as_ref().map(VariableHandle::get);
        }
        self.exported.get(name).map(VariableCell::get)
    }

    /// Write an exported variable. Integers widen into real variables.
    pub fn write(&self, uri: &ModelUri, name: &str, value: Value) -> DevsResult<()> {
        let cell = self.exported.get(name).ok_or_else(|| {
            DevsError::protocol(uri, format!("write to undeclared variable {}", name))
        })?;
        let value = match (cell.kind(), value) {
            (ValueKind::Real, Value::Integer(i)) => Value::Real(i as f64),
            (kind, value) if value.kind() == kind => value,
            (kind, value) => {
                return Err(DevsError::protocol(
                    uri,
                    format!("variable {} is {}, cannot hold {}", name, kind, value.kind()),
                ))
            }
        };
        cell.set(value);
        Ok(())
    }

    pub fn exported_handle(&self, name: &str) -> Option<VariableHandle> {
        self.exported.get(name).map(VariableCell::handle)
    }

    /// Wire an imported variable to a writer's cell.
    pub fn bind(&mut self, uri: &ModelUri, name: &str, handle: VariableHandle) -> DevsResult<()> {
        let (kind, slot) = self.imported.get_mut(name).ok_or_else(|| {
            DevsError::invalid(uri, format!("variable {} is not imported", name))
        })?;
        if *kind != handle.kind() {
            return Err(DevsError::invalid(
                uri,
                format!("variable {} is {}, bound to {}", name, kind, handle.kind()),
            ));
        }
        if slot.is_some() {
            return Err(DevsError::invalid(
                uri,
                format!("variable {} is bound more than once", name),
            ));
        }
        *slot = Some(handle);
        Ok(())
    }

    /// Names of imported variables with no writer yet.
    pub fn unbound(&self) -> impl Iterator<Item = &str> {
        self.imported
            .iter()
            .filter(|(_, (_, handle))| handle.is_none())
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri() -> ModelUri {
        ModelUri::new("tank")
    }

    #[test]
    fn test_handle_sees_writes() {
        let writer = ModelVariables::from_signature(
            &ModelSignature::new().exports_variable("level", ValueKind::Real),
        );
        let mut reader = ModelVariables::from_signature(
            &ModelSignature::new().imports_variable("level", ValueKind::Real),
        );
        assert_eq!(reader.read("level"), None);

        let handle = writer.exported_handle("level").unwrap();
        reader.bind(&ModelUri::new("gauge"), "level", handle).unwrap();
        assert_eq!(reader.read("level"), Some(Value::Real(0.0)));

        writer.write(&uri(), "level", Value::Integer(3)).unwrap();
        assert_eq!(reader.read("level"), Some(Value::Real(3.0)));
        assert_eq!(reader.unbound().count(), 0);
    }

    #[test]
    fn test_write_checks_declaration_and_kind() {
        let vars = ModelVariables::from_signature(
            &ModelSignature::new().exports_variable("on", ValueKind::Bool),
        );
        assert!(matches!(
            vars.write(&uri(), "off", Value::Bool(true)),
            Err(DevsError::ProtocolViolation { .. })
        ));
        assert!(vars.write(&uri(), "on", Value::Integer(1)).is_err());
        assert!(vars.write(&uri(), "on", Value::Bool(true)).is_ok());
    }

    #[test]
    fn test_bind_rejects_kind_mismatch_and_rebinding() {
        let writer = ModelVariables::from_signature(
            &ModelSignature::new().exports_variable("level", ValueKind::Integer),
        );
        let mut reader = ModelVariables::from_signature(
            &ModelSignature::new().imports_variable("level", ValueKind::Real),
        );
        let handle = writer.exported_handle("level").unwrap();
        assert!(reader.bind(&uri(), "level", handle).is_err());

        let real = VariableCell::new(ValueKind::Real);
        reader.bind(&uri(), "level", real.handle()).unwrap();
        assert!(reader.bind(&uri(), "level", real.handle()).is_err());
    }
}
