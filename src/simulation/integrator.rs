//! Order-5 Gear predictor-corrector
//!
//! Every particle carries six time derivatives (position up to the fifth
//! derivative). One `evolve(dt)` call runs:
//! - predict: Taylor-expand the current derivatives by `dt`
//! - evaluate: build neighbours on the predicted set and compare the real
//!   acceleration with the predicted one
//! - fix: correct every order with the Gear coefficients
//!
//! The physics and the particle lifecycle live behind [`GearModel`], so the
//! same driver advances both the silo and the pedestrian room.

use crate::error::SimulationError;
use crate::simulation::neighbours::Neighbours;
use crate::simulation::population::{Lifecycle, Population};
use crate::simulation::states::{NVec2, Particle, RunContext, Wall};

pub const DERIVATIVES: usize = 6;

pub type Derivatives = [NVec2; DERIVATIVES];

/// Gear-5 corrector coefficients for velocity-dependent forces
pub const GEAR5_ALPHA: [f64; DERIVATIVES] = [
    3.0 / 16.0,
    251.0 / 360.0,
    1.0,
    11.0 / 18.0,
    1.0 / 6.0,
    1.0 / 60.0,
];

const FACTORIAL: [f64; DERIVATIVES] = [1.0, 1.0, 2.0, 6.0, 24.0, 120.0];

/// What happens to a particle after a lifecycle check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fate {
    Stay,
    Exit,
}

/// Result of a force evaluation on one predicted particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub force: NVec2,
    pub normal_force: f64, // sum of |F_n| over all contacts
    pub target: Option<NVec2>, // updated goal, pedestrians only
}

impl Evaluation {
    pub fn new(force: NVec2) -> Self {
        Self {
            force,
            normal_force: 0.0,
            target: None,
        }
    }
}

/// `r0 = x, r1 = v, r2 = F/m`, higher orders zero
pub fn default_derivatives(p: &Particle) -> Derivatives {
    let mut r = [NVec2::zeros(); DERIVATIVES];
    r[0] = p.position;
    r[1] = p.velocity;
    r[2] = p.acceleration();
    r
}

/// Taylor prediction of all orders
pub fn predict(current: &Derivatives, dt: f64) -> Derivatives {
    let mut predicted = [NVec2::zeros(); DERIVATIVES];
    for k in 0..DERIVATIVES {
        let mut sum = NVec2::zeros();
        for i in k..DERIVATIVES {
            let n = i - k;
            sum += current[i] * (dt.powi(n as i32) / FACTORIAL[n]);
        }
        predicted[k] = sum;
    }
    predicted
}

/// Scaled acceleration error `(a - r2_pred) * dt^2 / 2!`
pub fn delta_r2(acceleration: NVec2, predicted: &Derivatives, dt: f64) -> NVec2 {
    (acceleration - predicted[2]) * (dt * dt / FACTORIAL[2])
}

/// Corrected derivatives `r_k = r_k_pred + alpha_k * k! / dt^k * delta_r2`
pub fn correct(predicted: &Derivatives, delta_r2: NVec2, alpha: &[f64; DERIVATIVES], dt: f64) -> Derivatives {
    let mut fixed = [NVec2::zeros(); DERIVATIVES];
    for k in 0..DERIVATIVES {
        fixed[k] = predicted[k] + delta_r2 * (alpha[k] * FACTORIAL[k] / dt.powi(k as i32));
    }
    fixed
}

/// Force law and lifecycle hooks plugged into [`GearSystem`]
pub trait GearModel {
    fn alpha(&self) -> [f64; DERIVATIVES] {
        GEAR5_ALPHA
    }

    /// History of a particle entering the integrator
    fn seed_derivatives(&self, p: &Particle) -> Derivatives {
        default_derivatives(p)
    }

    /// Called right after a particle is predicted
    fn on_predicted(&self, _predicted: &Particle) -> Fate {
        Fate::Stay
    }

    /// Neighbour map of the predicted population
    fn on_evaluate(&self, predicted: &[Particle]) -> Result<Neighbours, SimulationError>;

    /// Total force on `predicted[index]`
    fn total_force(
        &self,
        index: usize,
        predicted: &[Particle],
        neighbours: &Neighbours,
    ) -> Result<Evaluation, SimulationError>;

    /// Called for every corrected particle
    fn on_fixed(&mut self, _fixed: &mut Particle, _ctx: &mut RunContext) -> Fate {
        Fate::Stay
    }

    /// Called once per completed step
    fn on_post_fix(&mut self, _population: &mut Population, _ctx: &mut RunContext) {}

    /// Lifecycle given to particles that leave the system
    fn exit_lifecycle(&self) -> Lifecycle {
        Lifecycle::Retired
    }

    fn walls(&self) -> &[Wall] {
        &[]
    }
}

/// Programmatic surface consumed by the runner
pub trait Simulation {
    fn evolve(&mut self, dt: f64) -> Result<(), SimulationError>;
    fn particles(&self) -> Vec<Particle>;
    fn walls(&self) -> &[Wall];
    fn kinetic_energy(&self) -> f64;
    fn flowed_total(&self) -> u64;
    fn flowed_last_step(&self) -> u64;
    fn max_pressure(&self) -> f64;
    fn time(&self) -> f64;
}

/// Generic Gear-5 driver over a particle arena
pub struct GearSystem<M: GearModel> {
    model: M,
    population: Population,
    ctx: RunContext,
}

impl<M: GearModel> GearSystem<M> {
    pub fn new(model: M, particles: Vec<Particle>, ctx: RunContext) -> Self {
        let mut population = Population::new();
        for p in particles {
            let seed = model.seed_derivatives(&p);
            population.insert(p, seed);
        }
        Self { model, population, ctx }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Advance one step. Nothing is committed unless evaluation succeeds.
    pub fn evolve(&mut self, dt: f64) -> Result<(), SimulationError> {
        let alpha = self.model.alpha();

        // Predict every active particle
        let mut survivors: Vec<(usize, Derivatives)> = Vec::new();
        let mut snapshot: Vec<Particle> = Vec::new();
        let mut exited: Vec<usize> = Vec::new();

        for index in self.population.active_indices() {
            let slot = self.population.slot(index);
            let predicted = predict(&slot.gear.current, dt);
            let p = &slot.particle;
            let candidate = p.with_motion(predicted[0], predicted[1], predicted[2] * p.mass);

            match self.model.on_predicted(&candidate) {
                Fate::Exit => exited.push(index),
                Fate::Stay => {
                    survivors.push((index, predicted));
                    snapshot.push(candidate);
                }
            }
        }

        // Evaluate against the frozen predicted snapshot
        let neighbours = self.model.on_evaluate(&snapshot)?;
        let mut evaluations = Vec::with_capacity(snapshot.len());
        for i in 0..snapshot.len() {
            evaluations.push(self.model.total_force(i, &snapshot, &neighbours)?);
        }

        // Fix and commit
        let mut ctx = self.ctx.clone();
        ctx.begin_step();
        let exit_lifecycle = self.model.exit_lifecycle();

        for index in exited {
            self.population.retire(index, exit_lifecycle);
        }

        for (((index, predicted), candidate), eval) in survivors.into_iter().zip(snapshot).zip(evaluations) {
            let acceleration = if candidate.mass == 0.0 {
                NVec2::zeros()
            } else {
                eval.force / candidate.mass
            };
            let delta = delta_r2(acceleration, &predicted, dt);
            let current = correct(&predicted, delta, &alpha, dt);

            let mut fixed = candidate.with_motion(current[0], current[1], current[2] * candidate.mass);
            fixed.normal_force = eval.normal_force;
            if let (Some(ped), Some(target)) = (fixed.pedestrian.as_mut(), eval.target) {
                ped.target = target;
            }

            let fate = self.model.on_fixed(&mut fixed, &mut ctx);

            let slot = self.population.slot_mut(index);
            slot.gear.predicted = predicted;
            slot.gear.delta_r2 = delta;
            slot.gear.current = current;

            match fate {
                Fate::Exit => {
                    slot.particle = fixed;
                    self.population.retire(index, exit_lifecycle);
                }
                Fate::Stay => {
                    ctx.kinetic_energy += fixed.kinetic_energy();
                    ctx.observe_pressure(fixed.pressure());
                    slot.particle = fixed;
                }
            }
        }

        self.model.on_post_fix(&mut self.population, &mut ctx);

        ctx.time += dt;
        ctx.steps += 1;
        self.ctx = ctx;
        Ok(())
    }
}

impl<M: GearModel> Simulation for GearSystem<M> {
    fn evolve(&mut self, dt: f64) -> Result<(), SimulationError> {
        GearSystem::evolve(self, dt)
    }

    fn particles(&self) -> Vec<Particle> {
        self.population.active().cloned().collect()
    }

    fn walls(&self) -> &[Wall] {
        self.model.walls()
    }

    fn kinetic_energy(&self) -> f64 {
        self.ctx.kinetic_energy
    }

    fn flowed_total(&self) -> u64 {
        self.ctx.flowed_total
    }

    fn flowed_last_step(&self) -> u64 {
        self.ctx.flowed_last_step
    }

    fn max_pressure(&self) -> f64 {
        self.ctx.max_pressure
    }

    fn time(&self) -> f64 {
        self.ctx.time
    }
}
