//! Core data structures of the collision engine.
//!
//! `particle` holds the rigid-body math, `event` the scheduled-event type
//! with its deterministic ordering, `queue` the min-heap adapter, and `sim`
//! the engine that ties them together.

pub mod event;
pub mod particle;
pub mod queue;
pub mod sim;

pub use event::{Event, EventKind};
pub use particle::{Color, Particle};
pub use queue::MinQueue;
pub use sim::{SimConfig, SimState, Simulation, StepOutcome};
