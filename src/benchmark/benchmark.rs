use std::time::Instant;

use crate::simulation::engine::{NeighbourStrategy, Variant};
use crate::simulation::granular::GranularSilo;
use crate::simulation::integrator::GearSystem;
use crate::simulation::neighbours::{optimal_cells, BruteForce, CellIndex, NeighboursFinder};
use crate::simulation::params::SiloParameters;
use crate::simulation::scenario::{place_random, silo_walls};
use crate::simulation::states::{NVec2, Particle, ParticleId, ParticleKind, RunContext};

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Deterministic particle cloud inside a `side x side` square
fn particle_cloud(n: usize, side: f64, radius: f64) -> Vec<Particle> {
    (0..n)
        .map(|i| {
            let i_f = i as f64;
            // deterministic positions, no rand needed
            let x = NVec2::new(
                (0.5 + 0.49 * (i_f * 0.37).sin()) * side,
                (0.5 + 0.49 * (i_f * 0.13).cos()) * side,
            );
            Particle::new(ParticleId(i as u64), ParticleKind::Ordinary, x, radius, 1.0)
        })
        .collect()
}

pub fn bench_neighbours() {
    // Different system sizes to test
    let ns = [200, 400, 800, 1600, 3200, 6400];
    let side = 20.0;
    let radius = 0.05;
    let rc = 0.1;

    for n in ns {
        let particles = particle_cloud(n, side, radius);

        let brute = BruteForce::new(rc);
        let m = optimal_cells(side, rc, radius);
        let cells = CellIndex::new(side, side, m, rc, false);

        // Warm up
        let _ = brute.find(&particles);
        let _ = cells.find(&particles);

        // Time brute force
        let t0 = Instant::now();
        let a = brute.find(&particles);
        let dt_brute = t0.elapsed().as_secs_f64();

        // Time cell index
        let t1 = Instant::now();
        let b = cells.find(&particles);
        let dt_cells = t1.elapsed().as_secs_f64();

        let agree = matches!((&a, &b), (Ok(x), Ok(y)) if x == y);
        println!(
            "N = {n:5}, brute force = {:8.6} s, cell index ({m}x{m}) = {:8.6} s, agree = {agree}",
            dt_brute, dt_cells
        );
    }
}

pub fn bench_silo_steps() {
    // Grain counts to test
    let ns = [100, 200, 400, 800];
    let steps = 200; // steps per strategy

    for n in ns {
        let params = match SiloParameters::granular(n, 2.0, 6.0, 0.4, 0.01, 1e5, 1e3) {
            Ok(p) => p,
            Err(e) => {
                println!("N = {n:5}, skipped: {e}");
                continue;
            }
        };
        let dt = params.time_step(1e-5);

        let mut ctx = RunContext::new();
        let mut rng = StdRng::seed_from_u64(42);
        let particles = place_random(&mut rng, &params, &mut ctx);

        let brute = NeighbourStrategy::BruteForce(BruteForce::new(0.0));
        let cells = NeighbourStrategy::CellIndex(CellIndex::with_grid(
            params.width,
            params.total_length(),
            optimal_cells(params.total_length(), 0.0, params.max_radius()),
            optimal_cells(params.width, 0.0, params.max_radius()),
            0.0,
            false,
        ));

        let mut timings = Vec::new();
        for finder in [brute, cells] {
            let walls = match silo_walls(&params, Variant::Granular) {
                Ok(w) => w,
                Err(_) => continue,
            };
            let model = GranularSilo::new(params.clone(), walls, finder);
            let mut sys = GearSystem::new(model, particles.clone(), ctx.clone());

            let t0 = Instant::now();
            for _ in 0..steps {
                if sys.evolve(dt).is_err() {
                    break;
                }
            }
            timings.push(t0.elapsed().as_secs_f64());
        }

        if let [brute_s, cells_s] = timings.as_slice() {
            println!(
                "N = {:5}, {steps} steps, brute force = {:8.6} s, cell index = {:8.6} s",
                particles.len(),
                brute_s,
                cells_s
            );
        }
    }
}
