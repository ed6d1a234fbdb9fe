//! Atomic model protocol and the engines that drive models.
//!
//! A leaf model implements [`AtomicModel`]; the kernel wraps it in an
//! [`AtomicEngine`] that enforces the protocol's phases and monotonic time.
//! [`CoupledEngine`]s compose child engines and route events and variables
//! between them, so a whole model tree is a single [`Engine`].
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`traits`] | [`AtomicModel`], [`ModelFactory`], [`FnFactory`] |
//! | [`context`] | [`ModelContext`] |
//! | [`variables`] | [`VariableCell`], [`VariableHandle`], [`ModelVariables`] |
//! | [`dispatch`] | [`EventDispatch`] tables |
//! | [`atomic`] | [`AtomicEngine`], [`ModelPhase`] |
//! | [`coupled`] | [`CoupledEngine`] |
//! | [`engine`] | [`Engine`] |
//! | [`trace`] | [`TraceEntry`], [`TransitionKind`] |
//! | [`builtin`] | [`TicModel`], [`RecorderModel`] |

pub mod atomic;
pub mod builtin;
pub mod context;
pub mod coupled;
pub mod dispatch;
pub mod engine;
pub mod trace;
pub mod traits;
pub mod variables;

pub use atomic::{AtomicEngine, ModelPhase};
pub use builtin::{RecorderModel, TicModel};
pub use context::ModelContext;
pub use coupled::CoupledEngine;
pub use dispatch::{EventDispatch, EventHandlerFn};
pub use engine::Engine;
pub use trace::{TraceEntry, TransitionKind};
pub use traits::{AtomicModel, FnFactory, ModelFactory};
pub use variables::{ModelVariables, VariableCell, VariableHandle};
