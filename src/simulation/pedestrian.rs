//! Pedestrian room: social force evacuation through a single exit.
//! Pedestrians that walk out are retired for good.

use crate::error::SimulationError;
use crate::simulation::engine::NeighbourStrategy;
use crate::simulation::forces::{
    ContactLaw, DrivingForce, ExitTarget, ForceSet, ParticleContacts, SocialForce, WallContacts,
};
use crate::simulation::integrator::{Evaluation, Fate, GearModel};
use crate::simulation::neighbours::{Neighbours, NeighboursFinder};
use crate::simulation::params::{SiloParameters, SocialParameters};
use crate::simulation::population::{observe_flow, Lifecycle};
use crate::simulation::states::{Particle, RunContext, Wall};

pub struct PedestrianRoom {
    params: SiloParameters,
    social: SocialParameters,
    walls: Vec<Wall>,
    finder: NeighbourStrategy,
    forces: ForceSet,
    exit: ExitTarget,
}

impl PedestrianRoom {
    pub fn new(
        params: SiloParameters,
        social: SocialParameters,
        walls: Vec<Wall>,
        finder: NeighbourStrategy,
    ) -> Self {
        let law = ContactLaw { kn: params.kn, kt: params.kt };
        let exit = ExitTarget {
            width: params.width,
            opening: params.opening,
            fall_length: params.fall_length,
        };
        let forces = ForceSet::new()
            .with(ParticleContacts { law })
            .with(WallContacts { law, walls: walls.clone() })
            .with(SocialForce { a: social.a, b: social.b })
            .with(DrivingForce { exit });

        Self {
            params,
            social,
            walls,
            finder,
            forces,
            exit,
        }
    }

    pub fn params(&self) -> &SiloParameters {
        &self.params
    }

    pub fn social(&self) -> &SocialParameters {
        &self.social
    }

    pub fn exit(&self) -> &ExitTarget {
        &self.exit
    }

    /// Store the starting force and target on every particle so the
    /// integrator history is seeded with the real acceleration
    pub fn apply_initial_forces(&self, particles: &mut [Particle]) -> Result<(), SimulationError> {
        let neighbours = self.finder.find(particles)?;
        let mut evaluations = Vec::with_capacity(particles.len());
        for index in 0..particles.len() {
            evaluations.push(self.forces.evaluate(index, particles, &neighbours)?);
        }
        for (p, eval) in particles.iter_mut().zip(evaluations) {
            if p.mass == 0.0 {
                continue;
            }
            p.force = eval.force;
            if let (Some(ped), Some(target)) = (p.pedestrian.as_mut(), eval.target) {
                ped.target = target;
            }
        }
        Ok(())
    }
}

impl GearModel for PedestrianRoom {
    fn on_predicted(&self, predicted: &Particle) -> Fate {
        if predicted.mass > 0.0 && predicted.position.y < 0.0 {
            Fate::Exit
        } else {
            Fate::Stay
        }
    }

    fn on_evaluate(&self, predicted: &[Particle]) -> Result<Neighbours, SimulationError> {
        self.finder.find(predicted)
    }

    fn total_force(
        &self,
        index: usize,
        predicted: &[Particle],
        neighbours: &Neighbours,
    ) -> Result<Evaluation, SimulationError> {
        self.forces.evaluate(index, predicted, neighbours)
    }

    fn on_fixed(&mut self, fixed: &mut Particle, ctx: &mut RunContext) -> Fate {
        observe_flow(fixed, self.params.fall_length, ctx)
    }

    fn exit_lifecycle(&self) -> Lifecycle {
        Lifecycle::Retired
    }

    fn walls(&self) -> &[Wall] {
        &self.walls
    }
}
