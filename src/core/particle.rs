use crate::error::{Error, Result};

/// Fixed spatial dimension (the plane).
pub const DIM: usize = 2;

/// Opaque display color carried by a particle. The engine never interprets
/// it; it is handed back verbatim to the render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Construct a color from 8-bit channels.
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A circular rigid body on the plane.
///
/// Fields:
/// - `id`: stable identifier, equal to the particle's index in the engine's
///   particle vector
/// - `r`: position [x, y] of the center
/// - `v`: velocity [vx, vy]
/// - `radius`: disc radius (> 0)
/// - `mass`: particle mass (> 0)
/// - `restitution`: wall reflection coefficient in [-1, 0); -1 is perfectly
///   elastic
/// - `color`: opaque display attribute
/// - `collision_count`: incremented each time the particle participates in a
///   realized collision, snapshotted into events for staleness detection
#[derive(Debug, Clone)]
pub struct Particle {
    /// Stable particle identifier (index into the engine's particle vector).
    pub id: u32,
    /// Position (x, y) of the center.
    pub r: [f64; DIM],
    /// Velocity (vx, vy).
    pub v: [f64; DIM],
    /// Disc radius (> 0).
    pub radius: f64,
    /// Mass (> 0).
    pub mass: f64,
    /// Wall reflection coefficient, applied to the hit axis on a wall bounce.
    pub restitution: f64,
    /// Opaque display color.
    pub color: Color,
    /// Collision participation counter (for event invalidation).
    pub collision_count: u64,
}

impl Particle {
    /// Create a new particle after validating invariants.
    ///
    /// Errors:
    /// - `Error::InvalidConfig` if `radius` or `mass` is non-positive, if
    ///   `restitution` lies outside [-1, 0), or if any kinematic component
    ///   is NaN/inf.
    pub fn new(
        id: u32,
        r: [f64; DIM],
        v: [f64; DIM],
        radius: f64,
        mass: f64,
        restitution: f64,
        color: Color,
    ) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(Error::InvalidConfig(
                "radius must be finite and > 0".into(),
            ));
        }
        if !mass.is_finite() || mass <= 0.0 {
            return Err(Error::InvalidConfig("mass must be finite and > 0".into()));
        }
        if !restitution.is_finite() || !(-1.0..0.0).contains(&restitution) {
            return Err(Error::InvalidConfig(
                "restitution must lie in [-1, 0)".into(),
            ));
        }
        if !r.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidConfig("position must be finite".into()));
        }
        if !v.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidConfig("velocity must be finite".into()));
        }
        Ok(Self {
            id,
            r,
            v,
            radius,
            mass,
            restitution,
            color,
            collision_count: 0,
        })
    }

    /// Advance the position by `v * dt`. Callers must not pass negative `dt`.
    #[inline]
    pub fn update(&mut self, dt: f64) {
        for k in 0..DIM {
            self.r[k] += self.v[k] * dt;
        }
    }

    /// Increment the collision counter (used for event invalidation).
    #[inline]
    pub fn bump_collision_count(&mut self) {
        self.collision_count = self.collision_count.saturating_add(1);
    }

    /// Elastic two-body impulse along the line of centers.
    ///
    /// Precondition: both particles sit at the predicted contact instant, so
    /// the contact distance equals the sum of radii. Both collision counters
    /// are incremented.
    pub fn bounce_off(&mut self, other: &mut Particle) {
        let mut d = [0.0_f64; DIM];
        let mut dv = [0.0_f64; DIM];
        for k in 0..DIM {
            d[k] = other.r[k] - self.r[k];
            dv[k] = other.v[k] - self.v[k];
        }
        let dvdr = dot(&d, &dv);
        let sigma = self.radius + other.radius;
        let j = 2.0 * self.mass * other.mass * dvdr / ((self.mass + other.mass) * sigma);
        for k in 0..DIM {
            let jk = j * d[k] / sigma;
            self.v[k] += jk / self.mass;
            other.v[k] -= jk / other.mass;
        }
        self.bump_collision_count();
        other.bump_collision_count();
    }

    /// Reflect the velocity component on `axis` by the restitution
    /// coefficient and increment the collision counter.
    pub fn bounce_off_wall(&mut self, axis: usize) {
        self.v[axis] *= self.restitution;
        self.bump_collision_count();
    }

    /// Time until the particle's edge touches the wall it is moving toward
    /// on `axis`, where the walls sit at 0 and `extent`. Returns infinity
    /// when the velocity component is exactly zero. The result may be
    /// negative when the edge already sits past the wall; the engine
    /// schedules only strictly-future predictions.
    pub fn predict_wall_hit(&self, axis: usize, extent: f64) -> f64 {
        let v = self.v[axis];
        if v > 0.0 {
            (extent - self.r[axis] - self.radius) / v
        } else if v < 0.0 {
            (self.radius - self.r[axis]) / v
        } else {
            f64::INFINITY
        }
    }

    /// Time until this particle contacts `other`, from the quadratic for two
    /// moving circles. Returns infinity when the ids match, when the pair is
    /// separating (`d . dv > 0`), when there is no relative motion, when the
    /// discriminant is negative (the paths never reach contact), or when the
    /// quadratic root is negative (already overlapping; treated as
    /// non-colliding).
    pub fn predict_time_to_collide(&self, other: &Particle) -> f64 {
        if self.id == other.id {
            return f64::INFINITY;
        }
        let mut d = [0.0_f64; DIM];
        let mut dv = [0.0_f64; DIM];
        for k in 0..DIM {
            d[k] = other.r[k] - self.r[k];
            dv[k] = other.v[k] - self.v[k];
        }
        let dvdr = dot(&d, &dv);
        if dvdr > 0.0 {
            return f64::INFINITY;
        }
        let dvdv = dot(&dv, &dv);
        if dvdv == 0.0 {
            return f64::INFINITY;
        }
        let drdr = dot(&d, &d);
        let sigma = self.radius + other.radius;
        let disc = dvdr * dvdr - dvdv * (drdr - sigma * sigma);
        if disc < 0.0 {
            return f64::INFINITY;
        }
        let t = -(dvdr + disc.sqrt()) / dvdv;
        if t < 0.0 {
            return f64::INFINITY;
        }
        t
    }

    /// Returns the particle's kinetic energy: 1/2 m |v|^2.
    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * dot(&self.v, &self.v)
    }
}

#[inline]
pub(crate) fn dot(a: &[f64; DIM], b: &[f64; DIM]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
