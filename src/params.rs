//! Run parameters and simulation configuration.
//!
//! Parameters are a flat map from `"<modelURI>:<paramName>"` to a
//! [`Value`]. The kernel never interprets them; each model reads its own
//! through a scoped [`ModelParameters`] view once, before initialisation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::architecture::ModelUri;
use crate::error::{DevsError, DevsResult};
use crate::time::{SimTime, TimeUnit};
use crate::value::Value;

// ── RunParameters ─────────────────────────────────────────────────────

/// The parameter map of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunParameters {
    values: IndexMap<String, Value>,
}

impl RunParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// The key of parameter `name` of model `uri`.
    pub fn key(uri: &ModelUri, name: &str) -> String {
        format!("{}:{}", uri, name)
    }

    /// Builder-style insertion of a model parameter.
    pub fn with(mut self, uri: impl Into<ModelUri>, name: &str, value: impl Into<Value>) -> Self {
        self.set(&uri.into(), name, value);
        self
    }

    pub fn set(&mut self, uri: &ModelUri, name: &str, value: impl Into<Value>) {
        self.values.insert(Self::key(uri, name), value.into());
    }

    /// Insert under a raw `uri:name` key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parameters of `uri`, falling back to `defaults` for absent keys.
    pub fn for_model<'a>(
        &'a self,
        uri: &'a ModelUri,
        defaults: Option<&'a IndexMap<String, Value>>,
    ) -> ModelParameters<'a> {
        ModelParameters {
            uri,
            run: self,
            defaults,
        }
    }
}

// ── ModelParameters ───────────────────────────────────────────────────

/// Read-only view of the parameters of one model.
#[derive(Debug, Clone, Copy)]
pub struct ModelParameters<'a> {
    uri: &'a ModelUri,
    run: &'a RunParameters,
    defaults: Option<&'a IndexMap<String, Value>>,
}

impl<'a> ModelParameters<'a> {
    pub fn uri(&self) -> &ModelUri {
        self.uri
    }

    /// Raw lookup: the run's value, else the descriptor default.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.run
            .get(&RunParameters::key(self.uri, name))
            .or_else(|| self.defaults.and_then(|d| d.get(name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn real(&self, name: &str) -> DevsResult<f64> {
        self.typed(name, "real", Value::as_real)
    }

    pub fn real_or(&self, name: &str, default: f64) -> DevsResult<f64> {
        self.typed_or(name, default, "real", Value::as_real)
    }

    pub fn integer(&self, name: &str) -> DevsResult<i64> {
        self.typed(name, "integer", Value::as_integer)
    }

    pub fn integer_or(&self, name: &str, default: i64) -> DevsResult<i64> {
        self.typed_or(name, default, "integer", Value::as_integer)
    }

    pub fn boolean(&self, name: &str) -> DevsResult<bool> {
        self.typed(name, "boolean", Value::as_bool)
    }

    pub fn boolean_or(&self, name: &str, default: bool) -> DevsResult<bool> {
        self.typed_or(name, default, "boolean", Value::as_bool)
    }

    pub fn text(&self, name: &str) -> DevsResult<&'a str> {
        let value = self.get(name).ok_or_else(|| self.missing(name))?;
        value.as_text().ok_or_else(|| DevsError::ParameterType {
            key: RunParameters::key(self.uri, name),
            expected: "text",
        })
    }

    fn typed<T>(
        &self,
        name: &str,
        expected: &'static str,
        convert: fn(&Value) -> Option<T>,
    ) -> DevsResult<T> {
        let value = self.get(name).ok_or_else(|| self.missing(name))?;
        convert(value).ok_or_else(|| DevsError::ParameterType {
            key: RunParameters::key(self.uri, name),
            expected,
        })
    }

    fn typed_or<T>(
        &self,
        name: &str,
        default: T,
        expected: &'static str,
        convert: fn(&Value) -> Option<T>,
    ) -> DevsResult<T> {
        match self.get(name) {
            None => Ok(default),
            Some(_) => self.typed(name, expected, convert),
        }
    }

    fn missing(&self, name: &str) -> DevsError {
        DevsError::MissingParameter {
            key: RunParameters::key(self.uri, name),
        }
    }
}

// ── SimulationConfig ──────────────────────────────────────────────────

/// A complete run description, usually loaded from TOML.
///
/// ```toml
/// time_unit = "seconds"
/// start_time = 0
/// end_time = 10
///
/// [parameters]
/// "tic:period" = 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// When present, must equal the architecture's time unit.
    #[serde(default)]
    pub time_unit: Option<TimeUnit>,
    #[serde(default)]
    pub start_time: u64,
    pub end_time: u64,
    #[serde(default)]
    pub parameters: RunParameters,
}

impl SimulationConfig {
    pub fn new(start_time: u64, end_time: u64) -> Self {
        SimulationConfig {
            time_unit: None,
            start_time,
            end_time,
            parameters: RunParameters::new(),
        }
    }

    pub fn from_toml_str(s: &str) -> DevsResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn with_time_unit(mut self, unit: TimeUnit) -> Self {
        self.time_unit = Some(unit);
        self
    }

    pub fn with_parameters(mut self, parameters: RunParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn start(&self) -> SimTime {
        SimTime::new(self.start_time)
    }

    pub fn end(&self) -> SimTime {
        SimTime::new(self.end_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tank() -> ModelUri {
        ModelUri::new("tank")
    }

    #[test]
    fn test_typed_getters() {
        let params = RunParameters::new()
            .with("tank", "capacity", 12.5)
            .with("tank", "slots", 3i64)
            .with("tank", "label", "main");
        let uri = tank();
        let view = params.for_model(&uri, None);

        assert_eq!(view.real("capacity").unwrap(), 12.5);
        assert_eq!(view.real("slots").unwrap(), 3.0);
        assert_eq!(view.integer("slots").unwrap(), 3);
        assert_eq!(view.text("label").unwrap(), "main");
        assert!(matches!(
            view.boolean("label"),
            Err(DevsError::ParameterType { expected: "boolean", .. })
        ));
        match view.real("missing") {
            Err(DevsError::MissingParameter { key }) => assert_eq!(key, "tank:missing"),
            other => panic!("expected a missing parameter, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults_and_scoping() {
        let params = RunParameters::new()
            .with("tank", "capacity", 20.0)
            .with("other", "leak", 1.0);
        let mut defaults = IndexMap::new();
        defaults.insert("capacity".to_string(), Value::Real(10.0));
        defaults.insert("leak".to_string(), Value::Real(0.5));

        let uri = tank();
        let view = params.for_model(&uri, Some(&defaults));
        assert_eq!(view.real("capacity").unwrap(), 20.0);
        assert_eq!(view.real("leak").unwrap(), 0.5);
        assert_eq!(view.real_or("absent", 7.0).unwrap(), 7.0);
        assert!(view.integer_or("capacity", 1).is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let config = SimulationConfig::from_toml_str(
            r#"
            time_unit = "seconds"
            end_time = 10

            [parameters]
            "tic:period" = 2
            "tank:capacity" = 1.5
            "#,
        )
        .unwrap();
        assert_eq!(config.time_unit, Some(TimeUnit::Seconds));
        assert_eq!(config.start(), SimTime::ZERO);
        assert_eq!(config.end(), SimTime::new(10));
        assert_eq!(config.parameters.get("tic:period"), Some(&Value::Integer(2)));
        assert_eq!(config.parameters.get("tank:capacity"), Some(&Value::Real(1.5)));
    }

    #[test]
    fn test_config_rejects_malformed_toml() {
        let err = SimulationConfig::from_toml_str("end_time = \"soon\"").unwrap_err();
        assert!(matches!(err, DevsError::Config(_)));
    }
}
