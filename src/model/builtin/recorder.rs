//! `RecorderModel`: records every event it receives.

use crate::architecture::{AtomicDescriptor, ModelSignature, ModelUri};
use crate::error::DevsResult;
use crate::event::{Event, EventType};
use crate::report::ReportEntries;
use crate::time::{Duration, SimTime, TimeUnit};
use crate::value::Value;

use crate::model::context::ModelContext;
use crate::model::traits::AtomicModel;

/// A passive model that accumulates every delivered event.
///
/// `RecorderModel` never schedules itself. This makes it a convenient sink
/// for tests that verify delivery counts, ordering and timing.
#[derive(Debug, Clone, Default)]
pub struct RecorderModel {
    /// Every event received, in application order.
    pub received: Vec<Event>,
    /// Times of the external transitions.
    pub transitions: Vec<SimTime>,
}

impl RecorderModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor of a `RecorderModel` importing each of `imports`.
    pub fn descriptor<I>(uri: impl Into<ModelUri>, time_unit: TimeUnit, imports: I) -> AtomicDescriptor
    where
        I: IntoIterator,
        I::Item: Into<EventType>,
    {
        let signature = imports
            .into_iter()
            .fold(ModelSignature::new(), |sig, kind| sig.imports(kind));
        AtomicDescriptor::new(uri, time_unit, RecorderModel::new).with_signature(signature)
    }

    /// Received events of one type.
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.received.iter().filter(move |e| e.kind.as_str() == kind)
    }
}

impl AtomicModel for RecorderModel {
    fn initialise_state(&mut self, _ctx: &mut ModelContext<'_>) -> DevsResult<()> {
        self.received.clear();
        self.transitions.clear();
        Ok(())
    }

    fn time_advance(&self) -> Duration {
        Duration::Infinite
    }

    fn external_transition(
        &mut self,
        ctx: &mut ModelContext<'_>,
        _elapsed: Duration,
        events: &[Event],
    ) -> DevsResult<()> {
        self.transitions.push(ctx.now());
        self.received.extend_from_slice(events);
        Ok(())
    }

    fn final_report(&self) -> ReportEntries {
        let mut entries = ReportEntries::new();
        entries.insert("received".into(), Value::Integer(self.received.len() as i64));
        entries.insert(
            "transitions".into(),
            Value::Integer(self.transitions.len() as i64),
        );
        entries
    }

    fn get_value(&self, name: &str) -> Option<Value> {
        match name {
            "received" => Some(Value::Integer(self.received.len() as i64)),
            "last" => self.received.last().map(|e| Value::Text(e.kind.to_string())),
            _ => None,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
