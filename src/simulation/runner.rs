//! Fixed-step run loop with progress logging and the kinetic energy stop
//! condition.

use std::time::Instant;

use log::info;

use crate::error::SimulationError;
use crate::simulation::integrator::Simulation;
use crate::simulation::params::RunParameters;

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub final_time: f64,
    pub stopped_at: Option<f64>, // time of the stop condition, if reached
    pub flowed_total: u64,
    pub mean_flow: f64, // flowed particles per second actually simulated
    pub peak_pressure: f64,
}

/// Step `sim` until the horizon, or until the kinetic energy falls back
/// below `stop_tolerance` after having exceeded it once
pub fn run<S: Simulation>(sim: &mut S, params: &RunParameters) -> Result<RunSummary, SimulationError> {
    let start = Instant::now();
    let mut steps = 0u64;
    let mut log_step = 0u64;
    let mut moving = false;
    let mut stopped_at = None;
    let mut peak_pressure = 0.0f64;

    while sim.time() < params.simulation_time {
        if sim.time() >= params.log_interval * log_step as f64 {
            info!(
                "t = {:.4} / {:.4} s, kinetic energy = {:e}, particles = {}",
                sim.time(),
                params.simulation_time,
                sim.kinetic_energy(),
                sim.particles().len()
            );
            log_step += 1;
        }

        sim.evolve(params.dt)?;
        steps += 1;
        peak_pressure = peak_pressure.max(sim.max_pressure());

        let kinetic_energy = sim.kinetic_energy();
        if !moving {
            moving = kinetic_energy > params.stop_tolerance;
        }
        if moving && kinetic_energy < params.stop_tolerance {
            info!("stop condition reached at t = {:.6} s", sim.time());
            stopped_at = Some(sim.time());
            break;
        }
    }

    let elapsed = sim.time();
    let mean_flow = if elapsed > 0.0 {
        sim.flowed_total() as f64 / elapsed
    } else {
        0.0
    };
    info!("mean flow: {:.4} particles/s", mean_flow);
    info!("total simulation time: {:.3} s", start.elapsed().as_secs_f64());

    Ok(RunSummary {
        steps,
        final_time: elapsed,
        stopped_at,
        flowed_total: sim.flowed_total(),
        mean_flow,
        peak_pressure,
    })
}
