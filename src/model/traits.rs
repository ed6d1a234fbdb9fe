//! `AtomicModel` trait and the factories descriptors use to build models.

use std::any::Any;

use crate::architecture::ModelUri;
use crate::error::{BoxError, DevsResult};
use crate::event::Event;
use crate::params::ModelParameters;
use crate::report::ReportEntries;
use crate::time::Duration;
use crate::value::Value;

use super::context::ModelContext;

// ── AtomicModel ───────────────────────────────────────────────────────

/// Trait implemented by every leaf model.
///
/// The engine owning the model drives it through the protocol
/// `initialise_state → (output → transition)* → end_simulation`; the model
/// itself never observes another model except through bound variables.
///
/// # Contract
///
/// Implementations **must**:
/// - Keep `time_advance` free of side effects.
/// - Be deterministic for equal inputs.
/// - Touch variables only through the supplied [`ModelContext`].
///
/// # Example
///
/// ```rust
/// use devsim::model::{AtomicModel, ModelContext};
/// use devsim::{DevsResult, Duration, Event};
///
/// struct Lamp { on: bool }
///
/// impl AtomicModel for Lamp {
///     fn time_advance(&self) -> Duration { Duration::Infinite }
///     fn handle_event(&mut self, _ctx: &mut ModelContext<'_>, event: &Event) -> DevsResult<()> {
///         self.on = event.kind.as_str() == "switch_on";
///         Ok(())
///     }
///     fn as_any(&self) -> &dyn std::any::Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
/// }
/// ```
pub trait AtomicModel: Any {
    /// Read the model's run parameters. Called once, before
    /// `initialise_state`.
    fn set_run_parameters(&mut self, _params: &ModelParameters<'_>) -> DevsResult<()> {
        Ok(())
    }

    /// Reset the state for a new run starting at `ctx.now()`.
    fn initialise_state(&mut self, _ctx: &mut ModelContext<'_>) -> DevsResult<()> {
        Ok(())
    }

    /// Time until the next internal transition; `Duration::Infinite` when
    /// the model is passive.
    fn time_advance(&self) -> Duration;

    /// Events emitted just before an internal transition.
    fn output(&self, _ctx: &ModelContext<'_>) -> Vec<Event> {
        Vec::new()
    }

    /// State change when the time advance elapses.
    fn internal_transition(
        &mut self,
        _ctx: &mut ModelContext<'_>,
        _elapsed: Duration,
    ) -> DevsResult<()> {
        Ok(())
    }

    /// State change on received events.
    ///
    /// `events` are already in priority order. The default applies them one
    /// by one through [`handle_event`](AtomicModel::handle_event).
    fn external_transition(
        &mut self,
        ctx: &mut ModelContext<'_>,
        _elapsed: Duration,
        events: &[Event],
    ) -> DevsResult<()> {
        for event in events {
            self.handle_event(ctx, event)?;
        }
        Ok(())
    }

    /// Apply the effect of a single event.
    fn handle_event(&mut self, _ctx: &mut ModelContext<'_>, _event: &Event) -> DevsResult<()> {
        Ok(())
    }

    /// Flush observable state at the end of the run.
    fn end_simulation(&mut self, _ctx: &mut ModelContext<'_>) -> DevsResult<()> {
        Ok(())
    }

    /// Summary entries for the final report.
    fn final_report(&self) -> ReportEntries {
        ReportEntries::new()
    }

    /// Named state read by an external observer.
    fn get_value(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Exogenous command. Returns `false` when `name` is not settable.
    fn set_value(&mut self, _name: &str, _value: Value) -> bool {
        false
    }

    /// Downcast support, required for `Simulator::model::<T>()`.
    fn as_any(&self) -> &dyn Any;
    /// Mutable downcast support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// ── Factories ─────────────────────────────────────────────────────────

/// Builds a fresh model instance each time a simulator is constructed.
pub trait ModelFactory: Send + Sync {
    fn create(&self, uri: &ModelUri) -> Result<Box<dyn AtomicModel>, BoxError>;
}

/// Fallible factories written as closures over the model URI.
impl<F> ModelFactory for F
where
    F: Fn(&ModelUri) -> Result<Box<dyn AtomicModel>, BoxError> + Send + Sync,
{
    fn create(&self, uri: &ModelUri) -> Result<Box<dyn AtomicModel>, BoxError> {
        (self)(uri)
    }
}

/// Infallible factory wrapping a plain constructor.
pub struct FnFactory<F> {
    make: F,
}

impl<F> FnFactory<F> {
    pub fn new(make: F) -> Self {
        FnFactory { make }
    }
}

impl<F, M> ModelFactory for FnFactory<F>
where
    F: Fn() -> M + Send + Sync,
    M: AtomicModel,
{
    fn create(&self, _uri: &ModelUri) -> Result<Box<dyn AtomicModel>, BoxError> {
        Ok(Box::new((self.make)()))
    }
}
