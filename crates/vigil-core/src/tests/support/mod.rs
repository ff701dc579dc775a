//! Test harness utilities for the editing session behavioural suite.

mod reporter;
mod world;

pub use reporter::{RecordingSessionReporter, SessionEvent};
pub use world::{SessionWorld, world};
