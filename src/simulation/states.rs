//! Core state types for the particle simulation.
//!
//! Defines the particle and wall records shared by both variants:
//! - `Particle` with its contact-pressure accumulator and flow flag
//! - `Wall` as an immutable segment with derived unit vectors
//! - `RunContext` holding the per-run counters
//!
//! All vectors are `NVec2` (nalgebra `Vector2<f64>`).

use std::fmt;

use nalgebra::Vector2;

use crate::error::SimulationError;
use crate::simulation::space;

pub type NVec2 = Vector2<f64>;

/// Stable particle identity, kept across respawns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub u64);

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    Ordinary,
    Wall, // wall endpoint
    Border,
    Spawn,
    OpeningLeft,
    OpeningRight,
}

impl ParticleKind {
    pub const ALL: [ParticleKind; 6] = [
        ParticleKind::OpeningLeft,
        ParticleKind::OpeningRight,
        ParticleKind::Spawn,
        ParticleKind::Wall,
        ParticleKind::Ordinary,
        ParticleKind::Border,
    ];

    /// Inverse of [`ParticleKind::code`]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Numeric tag shared with particle lists written by other tools
    pub fn code(self) -> u8 {
        match self {
            ParticleKind::OpeningLeft => 1,
            ParticleKind::OpeningRight => 2,
            ParticleKind::Spawn => 3,
            ParticleKind::Wall => 4,
            ParticleKind::Ordinary => 5,
            ParticleKind::Border => 6,
        }
    }
}

/// Extra state carried by pedestrian particles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pedestrian {
    pub tau: f64, // relaxation time
    pub driving_speed: f64, // desired speed
    pub target: NVec2, // current goal
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: ParticleId,
    pub kind: ParticleKind,
    pub position: NVec2,
    pub velocity: NVec2,
    pub force: NVec2, // net force of the last evaluation
    pub mass: f64, // 0 for immovable markers
    pub radius: f64,
    pub normal_force: f64, // sum of |F_n| over this step's contacts
    pub flowed_out: bool,
    pub pedestrian: Option<Pedestrian>,
}

impl Particle {
    pub fn new(id: ParticleId, kind: ParticleKind, position: NVec2, radius: f64, mass: f64) -> Self {
        Self {
            id,
            kind,
            position,
            velocity: NVec2::zeros(),
            force: NVec2::zeros(),
            mass,
            radius: radius.max(0.0),
            normal_force: 0.0,
            flowed_out: false,
            pedestrian: None,
        }
    }

    pub fn with_velocity(mut self, velocity: NVec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_force(mut self, force: NVec2) -> Self {
        self.force = force;
        self
    }

    pub fn with_pedestrian(mut self, pedestrian: Pedestrian) -> Self {
        self.pedestrian = Some(pedestrian);
        self
    }

    /// Same identity and accumulators, new kinematic state
    pub fn with_motion(&self, position: NVec2, velocity: NVec2, force: NVec2) -> Self {
        Self {
            position,
            velocity,
            force,
            ..self.clone()
        }
    }

    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.norm_squared()
    }

    /// Accumulated normal force over the circumference
    pub fn pressure(&self) -> f64 {
        if self.radius == 0.0 {
            return 0.0;
        }
        self.normal_force / (2.0 * std::f64::consts::PI * self.radius)
    }

    /// Acceleration implied by the stored force, zero for massless markers
    pub fn acceleration(&self) -> NVec2 {
        if self.mass == 0.0 {
            NVec2::zeros()
        } else {
            self.force / self.mass
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallKind {
    Vertical,
    HorizontalLeft,
    HorizontalRight,
    Diagonal,
}

/// Immutable line segment `from -> to`
#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    pub from: NVec2,
    pub to: NVec2,
    pub kind: WallKind,
    tangent: NVec2,
}

impl Wall {
    pub fn new(from: NVec2, to: NVec2) -> Result<Self, SimulationError> {
        let tangent = space::to_unit(to - from).ok_or(SimulationError::DegenerateWall)?;

        let d = to - from;
        let kind = if d.x * d.y != 0.0 {
            WallKind::Diagonal
        } else if d.y != 0.0 {
            WallKind::Vertical
        } else if from.x == 0.0 {
            WallKind::HorizontalLeft
        } else {
            WallKind::HorizontalRight
        };

        Ok(Self { from, to, kind, tangent })
    }

    pub fn length(&self) -> f64 {
        (self.to - self.from).norm()
    }

    pub fn tangent(&self) -> NVec2 {
        self.tangent
    }

    pub fn right_normal(&self) -> NVec2 {
        NVec2::new(self.tangent.y, -self.tangent.x)
    }

    pub fn left_normal(&self) -> NVec2 {
        NVec2::new(-self.tangent.y, self.tangent.x)
    }

    /// Virtual zero-mass particles at both endpoints. The endpoint of a
    /// horizontal wall that borders the opening is tagged accordingly.
    pub fn endpoint_particles(&self, ctx: &mut RunContext) -> [Particle; 2] {
        let (first, second) = match self.kind {
            WallKind::HorizontalLeft => (ParticleKind::Wall, ParticleKind::OpeningLeft),
            WallKind::HorizontalRight => (ParticleKind::OpeningRight, ParticleKind::Wall),
            _ => (ParticleKind::Wall, ParticleKind::Wall),
        };
        [
            Particle::new(ctx.next_id(), first, self.from, 0.0, 0.0),
            Particle::new(ctx.next_id(), second, self.to, 0.0, 0.0),
        ]
    }
}

/// Per-run bookkeeping that would otherwise be global
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    next_id: u64,
    pub max_pressure: f64, // highest pressure seen in the current step
    pub kinetic_energy: f64, // kinetic energy of the current step
    pub flowed_total: u64,
    pub flowed_last_step: u64,
    pub time: f64,
    pub steps: u64,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ParticleId {
        let id = ParticleId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Reset the per-step fields
    pub fn begin_step(&mut self) {
        self.max_pressure = 0.0;
        self.kinetic_energy = 0.0;
        self.flowed_last_step = 0;
    }

    pub fn observe_pressure(&mut self, pressure: f64) {
        if pressure > self.max_pressure {
            self.max_pressure = pressure;
        }
    }

    pub fn record_flow(&mut self) {
        self.flowed_total += 1;
        self.flowed_last_step += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_round_trip() {
        for kind in ParticleKind::ALL {
            assert_eq!(ParticleKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ParticleKind::from_code(6), Some(ParticleKind::Border));
        assert_eq!(ParticleKind::from_code(0), None);
        assert_eq!(ParticleKind::from_code(7), None);
    }

    #[test]
    fn wall_kind_follows_orientation() {
        let v = Wall::new(NVec2::new(0.0, 0.0), NVec2::new(0.0, 3.0)).unwrap();
        let hl = Wall::new(NVec2::new(0.0, 1.0), NVec2::new(2.0, 1.0)).unwrap();
        let hr = Wall::new(NVec2::new(3.0, 1.0), NVec2::new(5.0, 1.0)).unwrap();
        let d = Wall::new(NVec2::new(0.0, 0.0), NVec2::new(1.0, 1.0)).unwrap();
        assert_eq!(v.kind, WallKind::Vertical);
        assert_eq!(hl.kind, WallKind::HorizontalLeft);
        assert_eq!(hr.kind, WallKind::HorizontalRight);
        assert_eq!(d.kind, WallKind::Diagonal);
    }

    #[test]
    fn zero_length_wall_is_rejected() {
        let p = NVec2::new(1.0, 1.0);
        assert_eq!(Wall::new(p, p), Err(SimulationError::DegenerateWall));
    }

    #[test]
    fn run_context_hands_out_increasing_ids() {
        let mut ctx = RunContext::new();
        let a = ctx.next_id();
        let b = ctx.next_id();
        assert!(b > a);
    }
}
