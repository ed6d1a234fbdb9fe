//! Per-model event dispatch tables.
//!
//! Instead of events that know how to apply themselves to a model, a model
//! family registers one handler per event type it imports.

use indexmap::IndexMap;

use crate::error::{DevsError, DevsResult};
use crate::event::{Event, EventType};

use super::context::ModelContext;

/// Handler applying one event's effect to a model of type `M`.
pub type EventHandlerFn<M> = fn(&mut M, &mut ModelContext<'_>, &Event) -> DevsResult<()>;

/// Table `event type → handler` for one model family.
pub struct EventDispatch<M> {
    handlers: IndexMap<EventType, EventHandlerFn<M>>,
}

impl<M> EventDispatch<M> {
    pub fn new() -> Self {
        EventDispatch {
            handlers: IndexMap::new(),
        }
    }

    /// Register the handler for `kind`, replacing any previous one.
    pub fn on(mut self, kind: impl Into<EventType>, handler: EventHandlerFn<M>) -> Self {
        self.handlers.insert(kind.into(), handler);
        self
    }

    pub fn handler(&self, kind: &EventType) -> Option<EventHandlerFn<M>> {
        self.handlers.get(kind).copied()
    }

    pub fn handles(&self, kind: &EventType) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Apply `event` to `model`. An event with no handler is a protocol
    /// violation: the model imported a type it cannot process.
    pub fn dispatch(
        &self,
        model: &mut M,
        ctx: &mut ModelContext<'_>,
        event: &Event,
    ) -> DevsResult<()> {
        let handler = self.handler(&event.kind).ok_or_else(|| {
            DevsError::protocol(ctx.uri(), format!("no handler for {}", event.kind))
        })?;
        handler(model, ctx, event)
    }
}

impl<M> Default for EventDispatch<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for EventDispatch<M> {
    fn clone(&self) -> Self {
        EventDispatch {
            handlers: self.handlers.clone(),
        }
    }
}

impl<M> std::fmt::Debug for EventDispatch<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::{ModelSignature, ModelUri};
    use crate::model::variables::ModelVariables;
    use crate::time::{SimTime, TimeUnit};

    #[derive(Default)]
    struct Valve {
        open: bool,
        log: Vec<&'static str>,
    }

    fn open(v: &mut Valve, _ctx: &mut ModelContext<'_>, _e: &Event) -> DevsResult<()> {
        v.open = true;
        v.log.push("open");
        Ok(())
    }

    fn close(v: &mut Valve, _ctx: &mut ModelContext<'_>, _e: &Event) -> DevsResult<()> {
        v.open = false;
        v.log.push("close");
        Ok(())
    }

    #[test]
    fn test_dispatch_by_event_type() {
        let table: EventDispatch<Valve> = EventDispatch::new().on("open", open).on("close", close);
        let uri = ModelUri::new("valve");
        let mut vars = ModelVariables::from_signature(&ModelSignature::new());
        let mut ctx = ModelContext {
            uri: &uri,
            now: SimTime::new(1),
            time_unit: TimeUnit::Seconds,
            variables: &mut vars,
        };
        let mut valve = Valve::default();

        table.dispatch(&mut valve, &mut ctx, &Event::new(SimTime::new(1), "open")).unwrap();
        table.dispatch(&mut valve, &mut ctx, &Event::new(SimTime::new(1), "close")).unwrap();
        assert_eq!(valve.log, vec!["open", "close"]);
        assert!(!valve.open);

        let err = table
            .dispatch(&mut valve, &mut ctx, &Event::new(SimTime::new(1), "vent"))
            .unwrap_err();
        assert!(matches!(err, DevsError::ProtocolViolation { .. }));
        assert!(table.handles(&"open".into()));
    }
}
