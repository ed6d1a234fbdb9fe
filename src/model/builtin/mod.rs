//! Built-in models: TicModel and RecorderModel.
//!
//! Small reference models used for testing and demonstration.

pub mod recorder;
pub mod tic;

pub use recorder::RecorderModel;
pub use tic::TicModel;
