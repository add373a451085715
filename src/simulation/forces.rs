//! Force contributors for the granular and pedestrian models
//!
//! A model owns a [`ForceSet`]: a list of boxed [`ForceTerm`]s whose
//! contributions are summed into a single [`Evaluation`] per particle.
//! Available terms:
//! - `ParticleContacts` and `WallContacts` (linear spring + tangential damping)
//! - `Gravity`
//! - `SocialForce` (exponential repulsion between all pedestrians)
//! - `DrivingForce` (relaxation towards the exit)

use crate::error::SimulationError;
use crate::simulation::integrator::Evaluation;
use crate::simulation::neighbours::Neighbours;
use crate::simulation::space::{self, Versors};
use crate::simulation::states::{NVec2, Particle, Wall};

/// Standard gravity
pub const G: f64 = 9.80665;

/// Everything a term may read while evaluating `predicted[index]`
pub struct ForceInput<'a> {
    pub index: usize,
    pub predicted: &'a [Particle],
    pub neighbours: &'a Neighbours,
}

impl<'a> ForceInput<'a> {
    pub fn particle(&self) -> &'a Particle {
        &self.predicted[self.index]
    }
}

/// A single contribution to the total force
pub trait ForceTerm {
    fn accumulate(&self, input: &ForceInput, out: &mut Evaluation) -> Result<(), SimulationError>;
}

/// Sum of force terms
pub struct ForceSet {
    terms: Vec<Box<dyn ForceTerm + Send + Sync>>,
}

impl Default for ForceSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ForceSet {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn with<T>(mut self, term: T) -> Self
    where
        T: ForceTerm + Send + Sync + 'static,
    {
        self.terms.push(Box::new(term));
        self
    }

    /// Total force on `predicted[index]`
    pub fn evaluate(
        &self,
        index: usize,
        predicted: &[Particle],
        neighbours: &Neighbours,
    ) -> Result<Evaluation, SimulationError> {
        let input = ForceInput { index, predicted, neighbours };
        let mut out = Evaluation::new(NVec2::zeros());
        for term in &self.terms {
            term.accumulate(&input, &mut out)?;
        }
        Ok(out)
    }
}

/// Linear normal spring and tangential damping
#[derive(Debug, Clone, Copy)]
pub struct ContactLaw {
    pub kn: f64, // normal stiffness
    pub kt: f64, // tangential stiffness
}

impl ContactLaw {
    /// Returns the contact force and the magnitude of its normal part.
    /// Non-positive overlap gives no force at all.
    pub fn force(&self, superposition: f64, versors: &Versors, relative_velocity: NVec2) -> (NVec2, f64) {
        if superposition <= 0.0 {
            return (NVec2::zeros(), 0.0);
        }
        let normal = -self.kn * superposition * versors.normal;
        let tangential =
            -self.kt * superposition * relative_velocity.dot(&versors.tangent) * versors.tangent;
        (normal + tangential, normal.norm())
    }
}

/// Contacts with the particles of the neighbour map
pub struct ParticleContacts {
    pub law: ContactLaw,
}

impl ForceTerm for ParticleContacts {
    fn accumulate(&self, input: &ForceInput, out: &mut Evaluation) -> Result<(), SimulationError> {
        let p = input.particle();
        for &j in &input.neighbours[input.index] {
            let other = &input.predicted[j];
            let s = space::superposition(p, other);
            if s < 0.0 {
                continue;
            }
            let versors = space::normal_and_tangential(p.position, other.position).ok_or(
                SimulationError::CoincidentParticles {
                    first: p.id,
                    second: other.id,
                },
            )?;
            let (force, normal) = self.law.force(s, &versors, p.velocity - other.velocity);
            out.force += force;
            out.normal_force += normal;
        }
        Ok(())
    }
}

/// Contacts with the static walls
pub struct WallContacts {
    pub law: ContactLaw,
    pub walls: Vec<Wall>,
}

impl ForceTerm for WallContacts {
    fn accumulate(&self, input: &ForceInput, out: &mut Evaluation) -> Result<(), SimulationError> {
        let p = input.particle();
        for wall in &self.walls {
            let s = space::wall_superposition(p, wall);
            if s <= 0.0 {
                continue;
            }
            let versors = space::wall_versors(p, wall);
            let (force, normal) = self.law.force(s, &versors, p.velocity);
            out.force += force;
            out.normal_force += normal;
        }
        Ok(())
    }
}

/// Uniform downward pull `(0, -m g)`
pub struct Gravity {
    pub g: f64,
}

impl ForceTerm for Gravity {
    fn accumulate(&self, input: &ForceInput, out: &mut Evaluation) -> Result<(), SimulationError> {
        out.force += gravity_force(input.particle().mass, self.g);
        Ok(())
    }
}

pub fn gravity_force(mass: f64, g: f64) -> NVec2 {
    NVec2::new(0.0, -mass * g)
}

/// `A * exp(-d / B)` pushing away from every other pedestrian.
/// Massless markers neither exert nor feel it.
pub struct SocialForce {
    pub a: f64, // strength
    pub b: f64, // decay length
}

impl SocialForce {
    pub fn between(&self, p: &Particle, other: &Particle) -> Result<NVec2, SimulationError> {
        let away = space::to_unit(p.position - other.position).ok_or(
            SimulationError::CoincidentParticles {
                first: p.id,
                second: other.id,
            },
        )?;
        let d = space::distance_between(p, other);
        Ok(self.a * (-d / self.b).exp() * away)
    }
}

impl ForceTerm for SocialForce {
    fn accumulate(&self, input: &ForceInput, out: &mut Evaluation) -> Result<(), SimulationError> {
        let p = input.particle();
        if p.mass == 0.0 {
            return Ok(());
        }
        for (j, other) in input.predicted.iter().enumerate() {
            if j == input.index || other.mass == 0.0 {
                continue;
            }
            out.force += self.between(p, other)?;
        }
        Ok(())
    }
}

/// Exit geometry used to pick each pedestrian's target
#[derive(Debug, Clone, Copy)]
pub struct ExitTarget {
    pub width: f64,
    pub opening: f64,
    pub fall_length: f64,
}

impl ExitTarget {
    /// Nearest reachable point of the exit while above it, then a point
    /// below the room once through.
    pub fn target_for(&self, p: &Particle) -> NVec2 {
        let centre = self.width / 2.0;
        if p.position.y > self.fall_length {
            let left = centre - self.opening / 2.0 + p.radius;
            let right = centre + self.opening / 2.0 - p.radius;
            let x = if left <= right { p.position.x.clamp(left, right) } else { centre };
            NVec2::new(x, self.fall_length)
        } else {
            NVec2::new(centre, -self.fall_length)
        }
    }
}

/// `(m / tau) * (v_d * e - v)` with `e` pointing at the target
pub fn driving_force(p: &Particle, target: NVec2, tau: f64, driving_speed: f64) -> Result<NVec2, SimulationError> {
    let e = space::to_unit(target - p.position).ok_or(SimulationError::TargetReached { particle: p.id })?;
    Ok((p.mass / tau) * (driving_speed * e - p.velocity))
}

pub struct DrivingForce {
    pub exit: ExitTarget,
}

impl ForceTerm for DrivingForce {
    fn accumulate(&self, input: &ForceInput, out: &mut Evaluation) -> Result<(), SimulationError> {
        let p = input.particle();
        let Some(ped) = p.pedestrian else {
            return Ok(());
        };
        let target = self.exit.target_for(p);
        out.force += driving_force(p, target, ped.tau, ped.driving_speed)?;
        out.target = Some(target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::states::{ParticleId, ParticleKind, Pedestrian};

    fn particle(id: u64, x: f64, y: f64) -> Particle {
        Particle::new(ParticleId(id), ParticleKind::Ordinary, NVec2::new(x, y), 0.5, 1.0)
    }

    #[test]
    fn normal_force_pushes_apart() {
        let law = ContactLaw { kn: 1e5, kt: 2e5 };
        let v = space::normal_and_tangential(NVec2::zeros(), NVec2::new(1.0, 0.0)).unwrap();
        let (f, n) = law.force(0.01, &v, NVec2::zeros());
        assert!(f.x < 0.0);
        assert!((n - 1e3).abs() < 1e-9);
    }

    #[test]
    fn tangential_force_opposes_sliding() {
        let law = ContactLaw { kn: 0.0, kt: 10.0 };
        let v = space::normal_and_tangential(NVec2::zeros(), NVec2::new(0.0, -1.0)).unwrap();
        let (f, _) = law.force(0.1, &v, NVec2::new(2.0, 0.0));
        assert!(f.x < 0.0);
        assert!(f.y.abs() < 1e-12);
    }

    #[test]
    fn social_force_is_repulsive() {
        let s = SocialForce { a: 2000.0, b: 0.08 };
        let f = s.between(&particle(0, 0.0, 0.0), &particle(1, 2.0, 0.0)).unwrap();
        assert!(f.x < 0.0);
        assert!((f.x.abs() - 2000.0 * (-1.0f64 / 0.08).exp()).abs() < 1e-9);
    }

    #[test]
    fn driving_force_at_target_is_an_error() {
        let p = particle(3, 1.0, 1.0);
        assert_eq!(
            driving_force(&p, NVec2::new(1.0, 1.0), 0.5, 1.0),
            Err(SimulationError::TargetReached { particle: ParticleId(3) })
        );
    }

    #[test]
    fn exit_target_is_clamped_inside_the_door() {
        let exit = ExitTarget { width: 20.0, opening: 1.2, fall_length: 5.0 };
        let mut p = particle(0, 2.0, 10.0);
        p.radius = 0.25;
        p.pedestrian = Some(Pedestrian { tau: 0.5, driving_speed: 1.5, target: NVec2::zeros() });
        let t = exit.target_for(&p);
        assert!((t.x - (10.0 - 0.6 + 0.25)).abs() < 1e-12);
        assert_eq!(t.y, 5.0);

        p.position = NVec2::new(10.0, 4.0);
        assert_eq!(exit.target_for(&p), NVec2::new(10.0, -5.0));
    }
}
