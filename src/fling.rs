//! Fling physics
//!
//! Converts a release velocity into a decaying trajectory of viewport
//! positions, bounded by the content extents. The tracker is tick-driven on
//! the owning thread; each tick yields an absolute position and the caller
//! turns consecutive positions into scroll deltas.

/// Velocity decay rate, applied as `v * e^(-DECELERATION * dt)`.
const DECELERATION: f32 = 4.0;
/// Speed in px/s below which the fling is considered settled.
const MIN_VELOCITY: f32 = 30.0;

/// One in-progress fling trajectory.
#[derive(Debug)]
pub struct FlingTracker {
    pos: (f32, f32),
    velocity: (f32, f32),
    max: (f32, f32),
    finished: bool,
}

impl FlingTracker {
    /// Start a fling from `start` with the given viewport velocity in px/s.
    /// Positions are clamped to `[0, max]` per axis.
    #[must_use]
    pub fn new(start: (f32, f32), velocity: (f32, f32), max: (f32, f32)) -> Self {
        Self {
            pos: start,
            velocity,
            max: (max.0.max(0.0), max.1.max(0.0)),
            finished: false,
        }
    }

    /// Advance the simulation by `dt` seconds. Returns the new absolute
    /// position, or `None` once the trajectory has settled.
    pub fn tick(&mut self, dt: f32) -> Option<(f32, f32)> {
        if self.finished {
            return None;
        }

        self.pos.0 += self.velocity.0 * dt;
        self.pos.1 += self.velocity.1 * dt;

        // An axis pinned at a bound stops contributing.
        if self.pos.0 <= 0.0 || self.pos.0 >= self.max.0 {
            self.pos.0 = self.pos.0.clamp(0.0, self.max.0);
            self.velocity.0 = 0.0;
        }
        if self.pos.1 <= 0.0 || self.pos.1 >= self.max.1 {
            self.pos.1 = self.pos.1.clamp(0.0, self.max.1);
            self.velocity.1 = 0.0;
        }

        let decay = (-DECELERATION * dt).exp();
        self.velocity.0 *= decay;
        self.velocity.1 *= decay;

        if self.velocity.0.abs() < MIN_VELOCITY && self.velocity.1.abs() < MIN_VELOCITY {
            self.finished = true;
        }

        Some(self.pos)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
