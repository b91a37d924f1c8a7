//! Event-driven simulation of elastic circular bodies on a bounded plane.
//!
//! Collisions are predicted in closed form and scheduled in a min-heap;
//! between events every particle moves in a straight line. Velocity changes
//! invalidate outstanding predictions lazily through collision-count
//! snapshots, so the queue never needs random removal. A redraw heartbeat
//! event paints frames onto a host-supplied [`RenderTarget`] at a fixed
//! cadence of simulation time.
//!
//! Hosts own the control loop: arm a run with [`Simulation::simulate`],
//! then pull events one at a time with [`Simulation::step`] or drain them
//! with [`Simulation::run`].

pub mod core;
pub mod error;

pub use crate::core::sim::MAX_PARTICLES;
pub use crate::core::{Color, Event, EventKind, MinQueue, Particle};
pub use crate::core::{SimConfig, SimState, Simulation, StepOutcome};
pub use crate::error::{Error, Result};

/// Drawing surface the engine paints on redraw events.
///
/// Implementations translate the engine's plane coordinates into whatever
/// the host displays; the engine calls `clear` once per frame and then
/// `draw_circle` once per particle.
pub trait RenderTarget {
    /// Begin a frame over a plane of the given extents.
    fn clear(&mut self, width: f64, height: f64);

    /// Draw one particle at center `(x, y)`.
    fn draw_circle(&mut self, x: f64, y: f64, radius: f64, color: Color);
}

/// Render target that discards every frame, for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRender;

impl RenderTarget for NullRender {
    fn clear(&mut self, _width: f64, _height: f64) {}

    fn draw_circle(&mut self, _x: f64, _y: f64, _radius: f64, _color: Color) {}
}
