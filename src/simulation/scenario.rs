//! Build fully-initialized simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a runtime `Scenario`
//! containing:
//! - engine settings (`Engine`)
//! - run loop parameters (`RunParameters`)
//! - the integrator loaded with its model (`SimulationKind`)
//!
//! Container walls, opening markers and the random initial placement are
//! built here as well.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::configuration::config::{NeighboursConfig, ParticleConfig, ScenarioConfig, VariantConfig};
use crate::error::SimulationError;
use crate::simulation::engine::{Engine, NeighbourStrategy, Variant};
use crate::simulation::forces::{gravity_force, G};
use crate::simulation::granular::GranularSilo;
use crate::simulation::integrator::GearSystem;
use crate::simulation::neighbours::{optimal_cells, BruteForce, CellIndex};
use crate::simulation::params::{RunParameters, SiloParameters, SocialParameters};
use crate::simulation::pedestrian::PedestrianRoom;
use crate::simulation::runner::{run, RunSummary};
use crate::simulation::states::{NVec2, Particle, ParticleKind, Pedestrian, RunContext, Wall, WallKind};

/// Consecutive failed attempts allowed before placement gives up
pub const MAX_PLACEMENT_TRIES: usize = 100;

/// Integrator loaded with one of the two models
pub enum SimulationKind {
    Granular(GearSystem<GranularSilo>),
    Pedestrian(GearSystem<PedestrianRoom>),
}

/// Fully-initialized runtime bundle built from a [`ScenarioConfig`]
pub struct Scenario {
    pub engine: Engine,
    pub parameters: RunParameters,
    pub system: SimulationKind,
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self, SimulationError> {
        let e_cfg = &cfg.engine;
        let s_cfg = &cfg.system;

        let variant = match e_cfg.variant {
            VariantConfig::Granular => Variant::Granular,
            VariantConfig::Pedestrian => Variant::Pedestrian,
        };
        let engine = Engine {
            variant,
            seed: e_cfg.seed.unwrap_or(42),
        };

        // Geometry and contact constants, validated once here
        let social = match variant {
            Variant::Granular => None,
            Variant::Pedestrian => {
                let p_cfg = cfg.pedestrian.as_ref().ok_or_else(|| {
                    SimulationError::InvalidConfiguration("pedestrian runs need a `pedestrian` section".into())
                })?;
                Some((
                    p_cfg.min_diameter,
                    p_cfg.max_diameter,
                    SocialParameters::new(p_cfg.a, p_cfg.b, p_cfg.tau, p_cfg.driving_speed)?,
                ))
            }
        };
        let params = match social {
            None => SiloParameters::granular(
                s_cfg.n, s_cfg.width, s_cfg.length, s_cfg.opening, s_cfg.mass, s_cfg.kn, s_cfg.kt,
            )?,
            Some((min_d, max_d, _)) => SiloParameters::pedestrian(
                s_cfg.n,
                s_cfg.width,
                s_cfg.length,
                s_cfg.opening,
                s_cfg.mass,
                s_cfg.kn,
                s_cfg.kt,
                min_d,
                max_d,
            )?,
        };

        let p_cfg = &cfg.parameters;
        let parameters = RunParameters {
            simulation_time: p_cfg.simulation_time,
            dt: params.time_step(p_cfg.delta1),
            log_interval: p_cfg.log_interval.unwrap_or(variant.default_log_interval()),
            stop_tolerance: p_cfg.stop_tolerance.unwrap_or(variant.default_stop_tolerance()),
        };

        let mut ctx = RunContext::new();
        let walls = silo_walls(&params, variant)?;

        // Particles: explicit list or random non-overlapping placement
        let mut particles: Vec<Particle> = match &cfg.particles {
            Some(list) => list
                .iter()
                .map(|pc| configured_particle(pc, &params, &mut ctx))
                .collect::<Result<_, _>>()?,
            None => {
                let mut rng = StdRng::seed_from_u64(engine.seed);
                place_random(&mut rng, &params, &mut ctx)
            }
        };
        for p in particles.iter_mut() {
            match social {
                None => p.force = gravity_force(p.mass, G),
                Some((_, _, s)) => {
                    p.pedestrian = Some(Pedestrian {
                        tau: s.tau,
                        driving_speed: s.driving_speed,
                        target: NVec2::new(params.width / 2.0, params.fall_length),
                    });
                }
            }
        }
        particles.extend(opening_markers(&walls, &params, &mut ctx));

        let finder = neighbour_strategy(e_cfg.neighbours, e_cfg.rows, e_cfg.cols, &params);
        info!(
            "built {:?} scenario: {} particles, {} walls, dt = {:e}",
            variant,
            particles.len(),
            walls.len(),
            parameters.dt
        );

        let system = match social {
            None => SimulationKind::Granular(GearSystem::new(
                GranularSilo::new(params, walls, finder),
                particles,
                ctx,
            )),
            Some((_, _, s)) => {
                let room = PedestrianRoom::new(params, s, walls, finder);
                room.apply_initial_forces(&mut particles)?;
                SimulationKind::Pedestrian(GearSystem::new(room, particles, ctx))
            }
        };

        Ok(Self {
            engine,
            parameters,
            system,
        })
    }

    /// Run the loaded system until the horizon or the stop condition
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        info!(
            "running {:?} scenario for {} s (seed {})",
            self.engine.variant, self.parameters.simulation_time, self.engine.seed
        );
        match &mut self.system {
            SimulationKind::Granular(sys) => run(sys, &self.parameters),
            SimulationKind::Pedestrian(sys) => run(sys, &self.parameters),
        }
    }
}

fn configured_particle(
    pc: &ParticleConfig,
    params: &SiloParameters,
    ctx: &mut RunContext,
) -> Result<Particle, SimulationError> {
    let kind = match pc.kind {
        None => ParticleKind::Ordinary,
        Some(code) => ParticleKind::from_code(code)
            .ok_or_else(|| SimulationError::InvalidConfiguration(format!("unknown particle kind code {code}")))?,
    };
    Ok(Particle::new(
        ctx.next_id(),
        kind,
        NVec2::new(pc.x[0], pc.x[1]),
        pc.radius,
        pc.mass.unwrap_or(params.mass),
    )
    .with_velocity(NVec2::new(pc.v[0], pc.v[1])))
}

/// Grid sized so that touching grains always share or neighbour a cell
pub fn neighbour_strategy(
    kind: NeighboursConfig,
    rows: Option<usize>,
    cols: Option<usize>,
    params: &SiloParameters,
) -> NeighbourStrategy {
    match kind {
        NeighboursConfig::BruteForce => NeighbourStrategy::BruteForce(BruteForce::new(0.0)),
        NeighboursConfig::CellIndex => {
            let length = params.total_length();
            let rows = rows.unwrap_or_else(|| optimal_cells(length, 0.0, params.max_radius()));
            let cols = cols.unwrap_or_else(|| optimal_cells(params.width, 0.0, params.max_radius()));
            NeighbourStrategy::CellIndex(CellIndex::with_grid(params.width, length, rows, cols, 0.0, false))
        }
    }
}

/// Two side walls and the two bottom walls leaving a centred opening.
/// Side walls of the pedestrian room start at the exit line.
pub fn silo_walls(params: &SiloParameters, variant: Variant) -> Result<Vec<Wall>, SimulationError> {
    let width = params.width;
    let fall = params.fall_length;
    let total = params.total_length();
    let bottom = match variant {
        Variant::Granular => 0.0,
        Variant::Pedestrian => fall,
    };
    let side = (width - params.opening) / 2.0;
    let right_start = (width + params.opening) / 2.0;

    Ok(vec![
        Wall::new(NVec2::new(0.0, bottom), NVec2::new(0.0, total))?,
        Wall::new(NVec2::new(width, bottom), NVec2::new(width, total))?,
        Wall::new(NVec2::new(0.0, fall), NVec2::new(side, fall))?,
        Wall::new(NVec2::new(right_start, fall), NVec2::new(right_start + side, fall))?,
    ])
}

/// Immovable markers on both edges of the opening
pub fn opening_markers(walls: &[Wall], params: &SiloParameters, ctx: &mut RunContext) -> Vec<Particle> {
    if params.opening <= 0.0 {
        return Vec::new();
    }
    walls
        .iter()
        .filter(|w| matches!(w.kind, WallKind::HorizontalLeft | WallKind::HorizontalRight))
        .flat_map(|w| w.endpoint_particles(ctx))
        .filter(|p| matches!(p.kind, ParticleKind::OpeningLeft | ParticleKind::OpeningRight))
        .collect()
}

/// Non-overlapping random placement inside the container body.
///
/// Each particle gets up to [`MAX_PLACEMENT_TRIES`] attempts; when they run
/// out placement stops early and fewer particles are returned.
pub fn place_random<R: Rng>(rng: &mut R, params: &SiloParameters, ctx: &mut RunContext) -> Vec<Particle> {
    let mut placed: Vec<Particle> = Vec::with_capacity(params.n);
    let y_min = params.fall_length;
    let y_max = params.fall_length + params.length;

    'outer: while placed.len() < params.n {
        let diameter = if params.max_diameter > params.min_diameter {
            rng.gen_range(params.min_diameter..params.max_diameter)
        } else {
            params.min_diameter
        };
        let r = diameter / 2.0;

        for _ in 0..MAX_PLACEMENT_TRIES {
            let x = rng.gen_range(r..(params.width - r));
            let y = rng.gen_range((y_min + r)..(y_max - r));
            let position = NVec2::new(x, y);

            let overlaps = placed
                .iter()
                .any(|p| (p.position - position).norm() < p.radius + r);
            if !overlaps {
                placed.push(Particle::new(ctx.next_id(), ParticleKind::Ordinary, position, r, params.mass));
                continue 'outer;
            }
        }

        warn!(
            "placement stopped after {} consecutive failures: {} of {} particles placed",
            MAX_PLACEMENT_TRIES,
            placed.len(),
            params.n
        );
        break;
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SiloParameters {
        SiloParameters::granular(40, 1.0, 3.0, 0.25, 0.01, 1e5, 2e5).unwrap()
    }

    #[test]
    fn silo_has_two_sides_and_a_split_floor() {
        let p = params();
        let walls = silo_walls(&p, Variant::Granular).unwrap();
        assert_eq!(walls.len(), 4);
        assert_eq!(walls[2].kind, WallKind::HorizontalLeft);
        assert_eq!(walls[3].kind, WallKind::HorizontalRight);
        let gap = walls[3].from.x - walls[2].to.x;
        assert!((gap - 0.25).abs() < 1e-12);
    }

    #[test]
    fn markers_sit_on_the_opening_edges() {
        let p = params();
        let walls = silo_walls(&p, Variant::Granular).unwrap();
        let mut ctx = RunContext::new();
        let markers = opening_markers(&walls, &p, &mut ctx);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].kind, ParticleKind::OpeningLeft);
        assert_eq!(markers[1].kind, ParticleKind::OpeningRight);
        assert!((markers[0].position.x - 0.375).abs() < 1e-12);
        assert!((markers[1].position.x - 0.625).abs() < 1e-12);
        assert!(markers.iter().all(|m| m.mass == 0.0));
    }

    #[test]
    fn random_placement_never_overlaps() {
        let p = params();
        let mut rng = StdRng::seed_from_u64(7);
        let mut ctx = RunContext::new();
        let placed = place_random(&mut rng, &p, &mut ctx);
        assert!(!placed.is_empty());
        for (i, a) in placed.iter().enumerate() {
            assert!(a.position.x - a.radius >= 0.0 && a.position.x + a.radius <= p.width);
            for b in &placed[i + 1..] {
                assert!((a.position - b.position).norm() >= a.radius + b.radius);
            }
        }
    }
}
