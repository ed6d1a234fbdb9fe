//! `ModelContext`: what a model sees of the run during a protocol call.

use crate::architecture::ModelUri;
use crate::error::DevsResult;
use crate::time::{SimTime, TimeUnit};
use crate::value::Value;

use super::variables::ModelVariables;

/// Mutable context passed to a model on every protocol call.
///
/// Provides the model with:
/// - its URI and the current simulated time
/// - read access to its bound imported variables
/// - write access to its exported variables
pub struct ModelContext<'a> {
    pub(crate) uri: &'a ModelUri,
    pub(crate) now: SimTime,
    pub(crate) time_unit: TimeUnit,
    pub(crate) variables: &'a mut ModelVariables,
}

impl<'a> ModelContext<'a> {
    pub(crate) fn new(
        uri: &'a ModelUri,
        now: SimTime,
        time_unit: TimeUnit,
        variables: &'a mut ModelVariables,
    ) -> Self {
        ModelContext {
            uri,
            now,
            time_unit,
            variables,
        }
    }

    #[inline]
    pub fn uri(&self) -> &ModelUri {
        self.uri
    }

    /// Current simulated time.
    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    #[inline]
    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    /// Value of a variable; `None` if undeclared or not yet bound.
    pub fn read(&self, name: &str) -> Option<Value> {
        self.variables.read(name)
    }

    pub fn read_real(&self, name: &str) -> Option<f64> {
        self.read(name).and_then(|v| v.as_real())
    }

    /// Write one of the model's exported variables.
    pub fn write(&mut self, name: &str, value: impl Into<Value>) -> DevsResult<()> {
        self.variables.write(self.uri, name, value.into())
    }
}
