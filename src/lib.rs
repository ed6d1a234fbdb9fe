//! # devsim: hierarchical discrete-event simulation kernel
//!
//! Declare atomic and coupled models in an [`Architecture`], validate it,
//! and construct a [`Simulator`] that drives the resulting engine tree on a
//! single deterministic clock. No async, no wall-clock time; simultaneous
//! events are ordered by declared event priorities, never by arrival alone.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │        Simulator          │ ← clock, injected events, trace
//! │  ┌────────────────────┐  │
//! │  │   CoupledEngine     │  │ ← routes events, binds variables
//! │  │  ┌──────────────┐  │  │
//! │  │  │ AtomicEngine │  │  │ ← protocol phases, monotonic time
//! │  │  │ ┌──────────┐ │  │  │
//! │  │  │ │  Model   │ │  │  │ ← user state machine
//! │  │  │ └──────────┘ │  │  │
//! │  │  └──────────────┘  │  │
//! │  └────────────────────┘  │
//! └──────────────────────────┘
//!          ▲ built bottom-up from
//! ┌──────────────────────────┐
//! │       Architecture        │ ← descriptors, validation, topo order
//! └──────────────────────────┘
//! ```

pub mod architecture;
pub mod error;
pub mod event;
pub mod model;
pub mod params;
pub mod report;
pub mod scheduler;
pub mod simulator;
pub mod time;
pub mod value;

// Re-exports for convenience.
pub use architecture::{
    Architecture, AtomicDescriptor, CoupledDescriptor, EngineCreationMode, EventSink,
    EventSource, ModelDescriptor, ModelSignature, ModelUri, RunContext, VariableDecl,
    VariableSink, VariableSource,
};
pub use error::{DevsError, DevsResult};
pub use event::{Event, EventPriorities, EventType, PriorityOrder};
pub use model::{AtomicModel, Engine, ModelContext, RecorderModel, TicModel, TraceEntry};
pub use params::{ModelParameters, RunParameters, SimulationConfig};
pub use report::{ReportEntries, SimulationReport};
pub use scheduler::Scheduler;
pub use simulator::{Simulator, StopHandle};
pub use time::{Duration, SimTime, TimeUnit};
pub use value::{Value, ValueKind};
