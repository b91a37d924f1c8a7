use crate::core::particle::{dot, Color, Particle, DIM};
use crate::core::queue::MinQueue;
use crate::core::{Event, EventKind};
use crate::error::{Error, Result};
use crate::RenderTarget;
use rand::{rng, rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, trace};

/// Small numeric tolerance for time comparisons. Predictions at or below
/// this relative offset are treated as immediate and never scheduled.
const EPS_TIME: f64 = 1e-12;

/// Hard cap on the particle population.
pub const MAX_PARTICLES: usize = 200;

/// Engine parameters, fixed at construction.
///
/// The plane spans `[0, width] x [0, height]` with reflecting walls on all
/// four sides. `max_time` is the scheduling horizon: no event is enqueued
/// past it, so a run drains and exhausts shortly after the clock crosses it.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Plane extent on the x axis.
    pub width: f64,
    /// Plane extent on the y axis.
    pub height: f64,
    /// Scheduling horizon in simulation seconds.
    pub max_time: f64,
    /// Redraw heartbeat frequency (frames per simulation second).
    pub redraw_hz: f64,
    /// Wall restitution applied to every populated particle, in [-1, 0).
    pub restitution: f64,
    /// Lower bound of the sampled initial speed.
    pub min_speed: f64,
    /// Upper bound of the sampled initial speed.
    pub max_speed: f64,
    /// Disc radius for fixed-mass particles, and the base radius that the
    /// sampled mass scales in random-mass mode.
    pub radius: f64,
    /// Mass for fixed-mass particles.
    pub mass: f64,
    /// Lower bound of the sampled mass in random-mass mode.
    pub min_mass: f64,
    /// Upper bound of the sampled mass in random-mass mode.
    pub max_mass: f64,
    /// RNG seed; `None` draws one from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            max_time: 1e6,
            redraw_hz: 1000.0,
            restitution: -1.0,
            min_speed: 500.0,
            max_speed: 1000.0,
            radius: 10.0,
            mass: 0.5,
            min_mass: 1.0,
            max_mass: 5.0,
            seed: None,
        }
    }
}

impl SimConfig {
    fn validate(&self) -> Result<()> {
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(Error::InvalidConfig("width must be finite and > 0".into()));
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err(Error::InvalidConfig("height must be finite and > 0".into()));
        }
        if !self.max_time.is_finite() || self.max_time <= 0.0 {
            return Err(Error::InvalidConfig(
                "max_time must be finite and > 0".into(),
            ));
        }
        if !self.redraw_hz.is_finite() || self.redraw_hz <= 0.0 {
            return Err(Error::InvalidConfig(
                "redraw_hz must be finite and > 0".into(),
            ));
        }
        if !self.restitution.is_finite() || !(-1.0..0.0).contains(&self.restitution) {
            return Err(Error::InvalidConfig(
                "restitution must lie in [-1, 0)".into(),
            ));
        }
        if !self.min_speed.is_finite()
            || !self.max_speed.is_finite()
            || self.min_speed <= 0.0
            || self.min_speed > self.max_speed
        {
            return Err(Error::InvalidConfig(
                "speed range must satisfy 0 < min <= max".into(),
            ));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(Error::InvalidConfig("radius must be finite and > 0".into()));
        }
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(Error::InvalidConfig("mass must be finite and > 0".into()));
        }
        if !self.min_mass.is_finite()
            || !self.max_mass.is_finite()
            || self.min_mass <= 0.0
            || self.min_mass > self.max_mass
        {
            return Err(Error::InvalidConfig(
                "mass range must satisfy 0 < min <= max".into(),
            ));
        }
        if self.width < 2.0 * self.radius || self.height < 2.0 * self.radius {
            return Err(Error::InvalidConfig(
                "plane must be at least one particle diameter in each extent".into(),
            ));
        }
        Ok(())
    }
}

/// Lifecycle of the engine as observed by a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    /// Constructed; no particles, no events.
    Idle,
    /// Populated and scheduled but no event processed yet.
    Seeded,
    /// Actively consuming events.
    Running,
    /// Paused by the host; the queue is intact and the run can resume.
    Stopped,
    /// The queue drained. Terminal; the engine stays inert from here on.
    Exhausted,
}

/// What a single `step` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A valid event was applied at its scheduled time.
    Applied(EventKind),
    /// The extracted event was stale and dropped without touching state.
    Discarded,
    /// The engine is not running; nothing was done.
    Stopped,
    /// The queue drained; the run is over for good.
    Exhausted,
}

impl StepOutcome {
    /// Whether a driving loop should keep stepping.
    #[inline]
    pub fn continues(&self) -> bool {
        matches!(self, StepOutcome::Applied(_) | StepOutcome::Discarded)
    }
}

/// Event-driven collision engine over a bounded plane.
///
/// The engine owns the particle set, the event queue, and the clock. Hosts
/// drive it by calling `simulate` to arm a run and then pulling events one
/// at a time with `step` (or draining them with `run`). Stale events are
/// detected through collision-count snapshots and dropped silently.
#[derive(Debug)]
pub struct Simulation {
    cfg: SimConfig,
    time_now: f64,
    pub particles: Vec<Particle>,
    queue: MinQueue<Event>,
    rng: StdRng,
    running: bool,
    seeded: bool,
    exhausted: bool,
    applied: u64,
    discarded: u64,
}

impl Simulation {
    /// Create an idle engine from a validated configuration.
    pub fn new(cfg: SimConfig) -> Result<Self> {
        cfg.validate()?;
        let rng: StdRng = match cfg.seed {
            Some(s) => SeedableRng::seed_from_u64(s),
            None => SeedableRng::seed_from_u64(rng().random()),
        };
        debug!(
            width = cfg.width,
            height = cfg.height,
            max_time = cfg.max_time,
            seeded_rng = cfg.seed.is_some(),
            "engine created"
        );
        Ok(Self {
            cfg,
            time_now: 0.0,
            particles: Vec::new(),
            queue: MinQueue::new(),
            rng,
            running: false,
            seeded: false,
            exhausted: false,
            applied: 0,
            discarded: 0,
        })
    }

    /// Arm a run. On the first call this populates `count` particles
    /// (`random_mass` samples mass and scales the radius by it) and seeds
    /// the event queue; later calls resume a stopped run without touching
    /// particles or queue. Calling while running stops the run instead.
    /// After exhaustion this is a no-op.
    ///
    /// Errors:
    /// - `Error::InvalidConfig` if `count` exceeds `MAX_PARTICLES` or the
    ///   particles cannot be placed without overlap.
    pub fn simulate(&mut self, count: usize, random_mass: bool) -> Result<()> {
        if self.exhausted {
            debug!("simulate called after exhaustion; ignoring");
            return Ok(());
        }
        if self.running {
            self.stop_simulation();
            return Ok(());
        }
        if count > MAX_PARTICLES {
            return Err(Error::InvalidConfig(format!(
                "particle count {count} exceeds the maximum of {MAX_PARTICLES}"
            )));
        }
        if self.particles.is_empty() && count > 0 {
            self.populate(count, random_mass)?;
            // A previous empty-plane run leaves only heartbeat entries;
            // rebuilding predicts the new particles from the current time.
            self.rebuild_event_queue()?;
        } else if self.queue.is_empty() {
            self.seed_events()?;
        }
        self.seeded = true;
        self.running = true;
        debug!(
            time = self.time_now,
            particles = self.particles.len(),
            pending = self.queue.len(),
            "run armed"
        );
        Ok(())
    }

    /// Pause the run. The clock, particles, and queue keep their state, so
    /// a later `simulate` resumes exactly where the run left off.
    pub fn stop_simulation(&mut self) {
        self.running = false;
        debug!(time = self.time_now, "run stopped");
    }

    /// Process the next event against `target`.
    ///
    /// Extracts the earliest event, drops it if a participant has collided
    /// since it was scheduled, and otherwise drifts every particle to the
    /// event time and applies it: pair impulse, wall reflection, or redraw
    /// (which repaints `target` and re-arms the heartbeat). New predictions
    /// are scheduled only for the particles the event touched.
    ///
    /// Errors:
    /// - `Error::Numeric` if the extracted event time precedes the clock,
    ///   which means scheduling state is corrupt.
    pub fn step<R: RenderTarget + ?Sized>(&mut self, target: &mut R) -> Result<StepOutcome> {
        if self.exhausted {
            return Ok(StepOutcome::Exhausted);
        }
        if !self.running {
            return Ok(StepOutcome::Stopped);
        }
        if self.queue.is_empty() {
            self.running = false;
            self.exhausted = true;
            debug!(
                time = self.time_now,
                applied = self.applied,
                discarded = self.discarded,
                "event queue exhausted"
            );
            return Ok(StepOutcome::Exhausted);
        }

        let ev = self.queue.extract_min()?;
        if !self.event_is_valid(&ev) {
            self.discarded += 1;
            trace!(time = ev.time_f64(), kind = ?ev.kind, "stale event dropped");
            return Ok(StepOutcome::Discarded);
        }

        let t_ev = ev.time_f64();
        let dt = t_ev - self.time_now;
        if dt < -EPS_TIME {
            return Err(Error::Numeric(format!(
                "event time {t_ev} precedes current time {}",
                self.time_now
            )));
        }
        self.drift_all(dt.max(0.0));
        self.time_now = t_ev;

        match ev.kind {
            EventKind::Pair { a, b } => {
                let (i, j) = (a as usize, b as usize);
                // Pair participants are normalized a < b at scheduling time.
                let (head, tail) = self.particles.split_at_mut(j);
                head[i].bounce_off(&mut tail[0]);
                self.predict_for(i)?;
                self.predict_for(j)?;
            }
            EventKind::WallX { i } => {
                let i = i as usize;
                self.particles[i].bounce_off_wall(0);
                self.snap_to_wall(i, 0);
                self.predict_for(i)?;
            }
            EventKind::WallY { i } => {
                let i = i as usize;
                self.particles[i].bounce_off_wall(1);
                self.snap_to_wall(i, 1);
                self.predict_for(i)?;
            }
            EventKind::Redraw => {
                self.draw(target);
                self.schedule(1.0 / self.cfg.redraw_hz, EventKind::Redraw)?;
            }
        }

        self.applied += 1;
        trace!(time = self.time_now, kind = ?ev.kind, "event applied");
        Ok(StepOutcome::Applied(ev.kind))
    }

    /// Drive `step` until the run stops or exhausts, returning the final
    /// outcome.
    pub fn run<R: RenderTarget + ?Sized>(&mut self, target: &mut R) -> Result<StepOutcome> {
        loop {
            let out = self.step(target)?;
            if !out.continues() {
                return Ok(out);
            }
        }
    }

    /// Rebuild the event queue from the current particle states.
    ///
    /// This should be called after externally modifying positions or
    /// velocities so that scheduled times match the new kinematics.
    pub fn rebuild_event_queue(&mut self) -> Result<()> {
        self.queue.clear();
        self.seed_events()
    }

    /// Returns current simulation time.
    pub fn time(&self) -> f64 {
        self.time_now
    }

    /// Number of particles.
    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    /// Compute total kinetic energy (diagnostic).
    pub fn kinetic_energy(&self) -> f64 {
        self.particles.iter().map(|p| p.kinetic_energy()).sum()
    }

    /// Count of events applied so far.
    pub fn events_applied(&self) -> u64 {
        self.applied
    }

    /// Count of stale events dropped so far.
    pub fn events_discarded(&self) -> u64 {
        self.discarded
    }

    /// Number of events currently scheduled.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Whether the engine is consuming events.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SimState {
        if self.exhausted {
            SimState::Exhausted
        } else if self.running {
            SimState::Running
        } else if !self.seeded {
            SimState::Idle
        } else if self.applied + self.discarded == 0 {
            SimState::Seeded
        } else {
            SimState::Stopped
        }
    }

    // ============ Internal helpers ============

    /// Place `count` random particles by rejection sampling. The batch
    /// commits only after every disc has been placed, so a failed placement
    /// leaves the particle collection untouched.
    fn populate(&mut self, count: usize, random_mass: bool) -> Result<()> {
        let max_attempts = 1_000_000usize;
        let mut placed: Vec<Particle> = Vec::with_capacity(count);
        for id in 0..(count as u32) {
            let (mass, radius) = if random_mass {
                let m = self.rng.random_range(self.cfg.min_mass..=self.cfg.max_mass);
                (m, self.cfg.radius * m)
            } else {
                (self.cfg.mass, self.cfg.radius)
            };
            if 2.0 * radius > self.cfg.width || 2.0 * radius > self.cfg.height {
                return Err(Error::InvalidConfig(format!(
                    "particle {id} with radius {radius} cannot fit the plane"
                )));
            }

            let speed = self
                .rng
                .random_range(self.cfg.min_speed..=self.cfg.max_speed);
            let angle = self.rng.random_range(0.0..std::f64::consts::TAU);
            let v = [speed * angle.cos(), speed * angle.sin()];
            let color = Color::new(self.rng.random(), self.rng.random(), self.rng.random());

            // Sample centers inset by the radius so the disc starts fully
            // inside, rejecting positions that overlap placed particles.
            let mut attempts = 0usize;
            let r = loop {
                if attempts >= max_attempts {
                    return Err(Error::InvalidConfig(format!(
                        "failed to place particle {id} without overlap; \
                         use fewer or smaller particles"
                    )));
                }
                attempts += 1;
                let r = [
                    self.rng.random_range(radius..=self.cfg.width - radius),
                    self.rng.random_range(radius..=self.cfg.height - radius),
                ];
                if !overlaps_existing(&placed, &r, radius) {
                    break r;
                }
            };

            placed.push(Particle::new(
                id,
                r,
                v,
                radius,
                mass,
                self.cfg.restitution,
                color,
            )?);
        }
        self.particles = placed;
        debug!(count, random_mass, "particles populated");
        Ok(())
    }

    /// Schedule predictions for every pair and every particle-wall path,
    /// plus the heartbeat that keeps redraws flowing.
    fn seed_events(&mut self) -> Result<()> {
        let n = self.particles.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let t_rel = self.particles[i].predict_time_to_collide(&self.particles[j]);
                self.schedule(
                    t_rel,
                    EventKind::Pair {
                        a: i as u32,
                        b: j as u32,
                    },
                )?;
            }
        }
        for i in 0..n {
            let tx = self.particles[i].predict_wall_hit(0, self.cfg.width);
            self.schedule(tx, EventKind::WallX { i: i as u32 })?;
            let ty = self.particles[i].predict_wall_hit(1, self.cfg.height);
            self.schedule(ty, EventKind::WallY { i: i as u32 })?;
        }
        // The heartbeat enters at the current instant so the first frame
        // paints the seeded layout.
        if self.time_now <= self.cfg.max_time {
            let hb = Event::new(self.time_now, EventKind::Redraw, None, None)?;
            self.queue.insert(hb);
        }
        Ok(())
    }

    /// Re-predict everything involving particle `i` after its velocity
    /// changed. Stale entries for the old trajectory stay queued and die
    /// by snapshot mismatch.
    fn predict_for(&mut self, i: usize) -> Result<()> {
        for j in 0..self.particles.len() {
            if j == i {
                continue;
            }
            let t_rel = self.particles[i].predict_time_to_collide(&self.particles[j]);
            let (a, b) = if i < j { (i, j) } else { (j, i) };
            self.schedule(
                t_rel,
                EventKind::Pair {
                    a: a as u32,
                    b: b as u32,
                },
            )?;
        }
        let tx = self.particles[i].predict_wall_hit(0, self.cfg.width);
        self.schedule(tx, EventKind::WallX { i: i as u32 })?;
        let ty = self.particles[i].predict_wall_hit(1, self.cfg.height);
        self.schedule(ty, EventKind::WallY { i: i as u32 })?;
        Ok(())
    }

    /// Enqueue `kind` at `t_rel` from now, snapshotting participant
    /// collision counts. An exactly-zero prediction means contact at the
    /// current instant and is admitted; anything else not strictly above
    /// EPS_TIME (past, float-noise, or NaN), or whose absolute time falls
    /// past the horizon, is dropped here.
    fn schedule(&mut self, t_rel: f64, kind: EventKind) -> Result<()> {
        if t_rel != 0.0 && !(t_rel > EPS_TIME) {
            return Ok(());
        }
        let t_abs = self.time_now + t_rel;
        if !t_abs.is_finite() || t_abs > self.cfg.max_time {
            return Ok(());
        }
        let (pa, pb) = kind.participants();
        let cc_a = pa.map(|i| self.particles[i as usize].collision_count);
        let cc_b = pb.map(|i| self.particles[i as usize].collision_count);
        let ev = Event::new(t_abs, kind, cc_a, cc_b)?;
        self.queue.insert(ev);
        trace!(time = t_abs, kind = ?kind, "event scheduled");
        Ok(())
    }

    /// Check an extracted event against current collision counts.
    fn event_is_valid(&self, ev: &Event) -> bool {
        let (pa, pb) = ev.kind.participants();
        let now_a = pa.and_then(|i| self.particles.get(i as usize).map(|p| p.collision_count));
        let now_b = pb.and_then(|i| self.particles.get(i as usize).map(|p| p.collision_count));
        ev.is_valid(now_a, now_b)
    }

    /// Drift all particles forward by `dt` and clamp each center into the
    /// plane. The clamp is a fallback against accumulated float error; wall
    /// contact itself is handled by scheduled events.
    fn drift_all(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let extent = [self.cfg.width, self.cfg.height];
        for p in &mut self.particles {
            for k in 0..DIM {
                p.r[k] += p.v[k] * dt;
                let lo = p.radius;
                let hi = extent[k] - p.radius;
                if p.r[k] < lo {
                    p.r[k] = lo;
                } else if p.r[k] > hi {
                    p.r[k] = hi;
                }
            }
        }
    }

    /// Snap particle `i` onto the contact plane of the wall it just left.
    /// The post-bounce velocity sign tells which wall was struck.
    fn snap_to_wall(&mut self, i: usize, axis: usize) {
        let extent = if axis == 0 {
            self.cfg.width
        } else {
            self.cfg.height
        };
        let p = &mut self.particles[i];
        if p.v[axis] > 0.0 {
            p.r[axis] = p.radius;
        } else if p.v[axis] < 0.0 {
            p.r[axis] = extent - p.radius;
        }
    }

    /// Repaint `target` from the current particle states.
    fn draw<R: RenderTarget + ?Sized>(&self, target: &mut R) {
        target.clear(self.cfg.width, self.cfg.height);
        for p in &self.particles {
            target.draw_circle(p.r[0], p.r[1], p.radius, p.color);
        }
    }
}

fn overlaps_existing(existing: &[Particle], r: &[f64; DIM], radius: f64) -> bool {
    existing.iter().any(|p| {
        let mut d = [0.0_f64; DIM];
        for k in 0..DIM {
            d[k] = r[k] - p.r[k];
        }
        let min = radius + p.radius;
        dot(&d, &d) < min * min
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullRender;

    fn quiet_cfg() -> SimConfig {
        SimConfig {
            width: 200.0,
            height: 100.0,
            max_time: 100.0,
            redraw_hz: 10.0,
            seed: Some(7),
            ..SimConfig::default()
        }
    }

    fn red() -> Color {
        Color::new(255, 0, 0)
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Simulation::new(SimConfig::default()).is_ok());
    }

    #[test]
    fn invalid_configs_rejected() {
        let bad_hz = SimConfig {
            redraw_hz: 0.0,
            ..SimConfig::default()
        };
        assert!(Simulation::new(bad_hz).is_err());

        let bad_restitution = SimConfig {
            restitution: 0.5,
            ..SimConfig::default()
        };
        assert!(Simulation::new(bad_restitution).is_err());

        let too_narrow = SimConfig {
            width: 15.0,
            radius: 10.0,
            ..SimConfig::default()
        };
        assert!(Simulation::new(too_narrow).is_err());

        let bad_speed = SimConfig {
            min_speed: 100.0,
            max_speed: 50.0,
            ..SimConfig::default()
        };
        assert!(Simulation::new(bad_speed).is_err());
    }

    #[test]
    fn simulate_caps_particle_count() -> Result<()> {
        let mut sim = Simulation::new(SimConfig {
            seed: Some(1),
            ..SimConfig::default()
        })?;
        let err = sim.simulate(MAX_PARTICLES + 1, false).unwrap_err();
        assert!(err.to_string().contains("200"));
        assert_eq!(sim.state(), SimState::Idle);
        Ok(())
    }

    #[test]
    fn seeded_populate_is_deterministic() -> Result<()> {
        let cfg = SimConfig {
            seed: Some(42),
            ..SimConfig::default()
        };
        let mut a = Simulation::new(cfg.clone())?;
        let mut b = Simulation::new(cfg)?;
        a.simulate(5, true)?;
        b.simulate(5, true)?;
        for (pa, pb) in a.particles.iter().zip(b.particles.iter()) {
            assert_eq!(pa.r, pb.r);
            assert_eq!(pa.v, pb.v);
            assert_eq!(pa.mass, pb.mass);
            assert_eq!(pa.radius, pb.radius);
            assert_eq!(pa.color, pb.color);
        }
        Ok(())
    }

    #[test]
    fn populated_particles_fit_without_overlap() -> Result<()> {
        let mut sim = Simulation::new(SimConfig {
            seed: Some(9),
            ..SimConfig::default()
        })?;
        sim.simulate(20, false)?;
        let cfg = sim.config().clone();
        for p in &sim.particles {
            assert!(p.r[0] >= p.radius && p.r[0] <= cfg.width - p.radius);
            assert!(p.r[1] >= p.radius && p.r[1] <= cfg.height - p.radius);
            let speed = (p.v[0] * p.v[0] + p.v[1] * p.v[1]).sqrt();
            assert!(speed >= cfg.min_speed - 1e-9 && speed <= cfg.max_speed + 1e-9);
        }
        for i in 0..sim.particles.len() {
            for j in (i + 1)..sim.particles.len() {
                let (pi, pj) = (&sim.particles[i], &sim.particles[j]);
                let dx = pi.r[0] - pj.r[0];
                let dy = pi.r[1] - pj.r[1];
                let dist = (dx * dx + dy * dy).sqrt();
                assert!(dist >= pi.radius + pj.radius - 1e-9);
            }
        }
        Ok(())
    }

    #[test]
    fn failed_populate_leaves_no_particles() -> Result<()> {
        // Two radius-10 discs cannot both fit a 25 x 25 plane, so the
        // second placement runs out of attempts.
        let mut sim = Simulation::new(SimConfig {
            width: 25.0,
            height: 25.0,
            max_time: 10.0,
            seed: Some(11),
            ..SimConfig::default()
        })?;
        let err = sim.simulate(2, false).unwrap_err();
        assert!(err.to_string().contains("without overlap"));
        assert_eq!(sim.num_particles(), 0);
        assert_eq!(sim.state(), SimState::Idle);
        assert!(!sim.is_running());

        // A feasible request afterwards starts from a clean plane.
        sim.simulate(1, false)?;
        assert_eq!(sim.num_particles(), 1);
        assert_eq!(sim.state(), SimState::Running);
        Ok(())
    }

    #[test]
    fn single_particle_reflects_off_wall() -> Result<()> {
        let mut sim = Simulation::new(quiet_cfg())?;
        sim.simulate(1, false)?;
        sim.particles[0] = Particle::new(0, [50.0, 50.0], [100.0, 0.0], 10.0, 0.5, -1.0, red())?;
        sim.rebuild_event_queue()?;

        let mut target = NullRender;
        loop {
            match sim.step(&mut target)? {
                StepOutcome::Applied(EventKind::WallX { i }) => {
                    assert_eq!(i, 0);
                    break;
                }
                out if out.continues() => continue,
                out => panic!("run ended before the wall hit: {out:?}"),
            }
        }
        assert!((sim.time() - 1.4).abs() < 1e-12, "time = {}", sim.time());
        assert_eq!(sim.particles[0].v, [-100.0, 0.0]);
        assert_eq!(sim.particles[0].collision_count, 1);
        // Snapped onto the far contact plane.
        assert!((sim.particles[0].r[0] - 190.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn exact_wall_contact_bounces_immediately() -> Result<()> {
        let mut sim = Simulation::new(quiet_cfg())?;
        sim.simulate(1, false)?;
        // Touching the right wall dead-on and still moving into it.
        sim.particles[0] = Particle::new(0, [190.0, 50.0], [100.0, 0.0], 10.0, 0.5, -1.0, red())?;
        sim.rebuild_event_queue()?;

        let mut target = NullRender;
        match sim.step(&mut target)? {
            StepOutcome::Applied(EventKind::WallX { i }) => assert_eq!(i, 0),
            out => panic!("expected the contact-time wall hit first, got {out:?}"),
        }
        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.particles[0].v, [-100.0, 0.0]);
        assert_eq!(sim.particles[0].collision_count, 1);
        assert!((sim.particles[0].r[0] - 190.0).abs() < 1e-9);

        // The reflected body leaves the wall and crosses to the far side,
        // 180 units away at speed 100.
        loop {
            match sim.step(&mut target)? {
                StepOutcome::Applied(EventKind::WallX { i }) => {
                    assert_eq!(i, 0);
                    break;
                }
                out if out.continues() => continue,
                out => panic!("run ended before the far wall: {out:?}"),
            }
        }
        assert!((sim.time() - 1.8).abs() < 1e-12, "time = {}", sim.time());
        Ok(())
    }

    #[test]
    fn head_on_pair_collides_at_predicted_time() -> Result<()> {
        let mut sim = Simulation::new(quiet_cfg())?;
        sim.simulate(2, false)?;
        sim.particles[0] = Particle::new(0, [20.0, 50.0], [10.0, 0.0], 5.0, 1.0, -1.0, red())?;
        sim.particles[1] =
            Particle::new(1, [120.0, 50.0], [-10.0, 0.0], 5.0, 1.0, -1.0, red())?;
        sim.rebuild_event_queue()?;

        let mut target = NullRender;
        loop {
            match sim.step(&mut target)? {
                StepOutcome::Applied(EventKind::Pair { a, b }) => {
                    assert_eq!((a, b), (0, 1));
                    break;
                }
                out if out.continues() => continue,
                out => panic!("run ended before the pair collision: {out:?}"),
            }
        }
        assert!((sim.time() - 4.5).abs() < 1e-9, "time = {}", sim.time());
        // Equal masses head-on: velocities exchange.
        assert!((sim.particles[0].v[0] + 10.0).abs() < 1e-9);
        assert!((sim.particles[1].v[0] - 10.0).abs() < 1e-9);
        assert_eq!(sim.particles[0].collision_count, 1);
        assert_eq!(sim.particles[1].collision_count, 1);
        Ok(())
    }

    #[test]
    fn empty_plane_heartbeat_advances_clock() -> Result<()> {
        let mut sim = Simulation::new(SimConfig {
            redraw_hz: 4.0,
            seed: Some(3),
            ..quiet_cfg()
        })?;
        sim.simulate(0, false)?;
        assert_eq!(sim.state(), SimState::Seeded);
        assert_eq!(sim.num_particles(), 0);

        let mut target = NullRender;
        for expected in [0.0, 0.25, 0.5] {
            match sim.step(&mut target)? {
                StepOutcome::Applied(EventKind::Redraw) => {}
                out => panic!("expected a redraw, got {out:?}"),
            }
            assert!((sim.time() - expected).abs() < 1e-12);
        }
        assert_eq!(sim.events_applied(), 3);
        assert_eq!(sim.state(), SimState::Running);
        Ok(())
    }

    #[test]
    fn horizon_drains_queue_and_exhausts() -> Result<()> {
        let mut sim = Simulation::new(SimConfig {
            max_time: 0.5,
            redraw_hz: 4.0,
            seed: Some(3),
            ..quiet_cfg()
        })?;
        sim.simulate(0, false)?;
        let mut target = NullRender;
        let out = sim.run(&mut target)?;
        assert_eq!(out, StepOutcome::Exhausted);
        assert_eq!(sim.state(), SimState::Exhausted);
        // Heartbeats at 0, 0.25, 0.5; the next would pass the horizon.
        assert_eq!(sim.events_applied(), 3);
        assert!(!sim.is_running());

        // Exhaustion is terminal: re-arming does nothing.
        sim.simulate(0, false)?;
        assert_eq!(sim.state(), SimState::Exhausted);
        assert_eq!(sim.step(&mut target)?, StepOutcome::Exhausted);
        Ok(())
    }

    #[test]
    fn simulate_while_running_stops_and_resume_keeps_clock() -> Result<()> {
        let mut sim = Simulation::new(SimConfig {
            redraw_hz: 4.0,
            seed: Some(5),
            ..quiet_cfg()
        })?;
        sim.simulate(0, false)?;
        let mut target = NullRender;
        sim.step(&mut target)?;
        sim.step(&mut target)?;
        let paused_at = sim.time();

        sim.simulate(0, false)?;
        assert_eq!(sim.state(), SimState::Stopped);
        assert_eq!(sim.step(&mut target)?, StepOutcome::Stopped);
        assert_eq!(sim.time(), paused_at);

        sim.simulate(0, false)?;
        assert_eq!(sim.state(), SimState::Running);
        sim.step(&mut target)?;
        assert!(sim.time() > paused_at);
        Ok(())
    }

    #[test]
    fn step_before_simulate_reports_stopped() -> Result<()> {
        let mut sim = Simulation::new(quiet_cfg())?;
        let mut target = NullRender;
        assert_eq!(sim.step(&mut target)?, StepOutcome::Stopped);
        assert_eq!(sim.state(), SimState::Idle);
        Ok(())
    }
}
