//! Seam to the movement/animation collaborators.
//!
//! The tick loop hands a sink the frame's final direction and at most one
//! interact pulse. Physical integration, rotation smoothing, and animation
//! mapping live behind this trait.

use tracing::{debug, info};

use crate::math::Vec2;
use crate::merge::INPUT_EPSILON;

pub trait MotionSink {
    /// Receives the frame's clamped direction.
    fn apply_direction(&mut self, direction: Vec2, dt: f32);
    /// Receives the frame's interact pulse.
    fn interact(&mut self);
}

/// Sink that narrates motion over tracing, for headless operation.
#[derive(Debug, Default)]
pub struct TracingSink {
    moving: bool,
}

impl MotionSink for TracingSink {
    fn apply_direction(&mut self, direction: Vec2, _dt: f32) {
        let moving = direction.len() > INPUT_EPSILON;
        if moving != self.moving {
            info!(x = direction.x, y = direction.y, moving, "movement state changed");
            self.moving = moving;
        } else if moving {
            debug!(x = direction.x, y = direction.y, "moving");
        }
    }

    fn interact(&mut self) {
        info!("interact triggered");
    }
}
