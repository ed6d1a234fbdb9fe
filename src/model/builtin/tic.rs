//! `TicModel`: emits a `tic` event every period.

use crate::architecture::{AtomicDescriptor, ModelSignature, ModelUri};
use crate::error::{DevsError, DevsResult};
use crate::event::Event;
use crate::params::{ModelParameters, RunParameters};
use crate::report::ReportEntries;
use crate::time::{Duration, TimeUnit};
use crate::value::Value;

use crate::model::context::ModelContext;
use crate::model::traits::AtomicModel;

/// Periodic emitter of `tic` events.
///
/// The period is read from the run parameter `"<uri>:period"` (a positive
/// integer, default 1). Each `tic` carries its sequence number, starting
/// at 1.
#[derive(Debug, Clone)]
pub struct TicModel {
    pub period: u64,
    pub count: u64,
}

impl TicModel {
    pub const EVENT: &'static str = "tic";
    pub const PERIOD: &'static str = "period";

    pub fn new() -> Self {
        TicModel { period: 1, count: 0 }
    }

    /// Descriptor of a `TicModel` exporting `tic`.
    pub fn descriptor(uri: impl Into<ModelUri>, time_unit: TimeUnit) -> AtomicDescriptor {
        AtomicDescriptor::new(uri, time_unit, TicModel::new)
            .with_signature(ModelSignature::new().exports(Self::EVENT))
    }
}

impl Default for TicModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicModel for TicModel {
    fn set_run_parameters(&mut self, params: &ModelParameters<'_>) -> DevsResult<()> {
        let period = params.integer_or(Self::PERIOD, 1)?;
        if period <= 0 {
            return Err(DevsError::ParameterType {
                key: RunParameters::key(params.uri(), Self::PERIOD),
                expected: "positive integer",
            });
        }
        self.period = period as u64;
        Ok(())
    }

    fn initialise_state(&mut self, _ctx: &mut ModelContext<'_>) -> DevsResult<()> {
        self.count = 0;
        Ok(())
    }

    fn time_advance(&self) -> Duration {
        Duration::ticks(self.period)
    }

    fn output(&self, ctx: &ModelContext<'_>) -> Vec<Event> {
        vec![Event::with_content(
            ctx.now(),
            Self::EVENT,
            Value::Integer((self.count + 1) as i64),
        )]
    }

    fn internal_transition(
        &mut self,
        _ctx: &mut ModelContext<'_>,
        _elapsed: Duration,
    ) -> DevsResult<()> {
        self.count += 1;
        Ok(())
    }

    fn final_report(&self) -> ReportEntries {
        let mut entries = ReportEntries::new();
        entries.insert("tics".into(), Value::Integer(self.count as i64));
        entries.insert(Self::PERIOD.into(), Value::Integer(self.period as i64));
        entries
    }

    fn get_value(&self, name: &str) -> Option<Value> {
        match name {
            "tics" => Some(Value::Integer(self.count as i64)),
            "period" => Some(Value::Integer(self.period as i64)),
            _ => None,
        }
    }

    fn set_value(&mut self, name: &str, value: Value) -> bool {
        match (name, value.as_integer()) {
            ("period", Some(p)) if p > 0 => {
                self.period = p as u64;
                true
            }
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
