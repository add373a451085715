//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – variant, neighbour search and placement seed
//! - [`ParametersConfig`] – run horizon, time step and run-loop knobs
//! - [`SystemConfig`]     – container geometry and contact constants
//! - [`PedestrianConfig`] – social force constants (pedestrian runs only)
//! - [`ParticleConfig`]   – optional explicit initial particles
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//! An example granular silo matching these types:
//!
//! ```yaml
//! engine:
//!   variant: "granular"        # or "pedestrian"
//!   neighbours: "cell_index"   # or "brute_force"
//!   rows: 60                   # optional grid override, like `cols`
//!   seed: 42
//!
//! parameters:
//!   simulation_time: 5.0       # horizon in simulated seconds
//!   delta1: 1.0e-5             # requested step, capped by 0.1 * sqrt(m / kn)
//!
//! system:
//!   n: 200
//!   width: 1.0
//!   length: 3.0
//!   opening: 0.25
//!   mass: 0.01
//!   kn: 1.0e5
//!   kt: 1.0e3
//!
//! particles:                   # optional, replaces random placement
//!   - x: [ 0.5, 1.0 ]
//!     v: [ 0.0, 0.0 ]
//!     radius: 0.02
//!     mass: 0.01
//!     kind: 5                  # optional numeric kind code
//! ```
//!
//! The scenario builder then maps this configuration into its runtime
//! representation.

use serde::Deserialize;

/// Which model the engine runs
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantConfig {
    #[serde(rename = "granular")] // grains under gravity, recycled through the respawn row
    Granular,

    #[serde(rename = "pedestrian")] // social force evacuation, exited pedestrians are removed
    Pedestrian,
}

/// Which neighbour finder the engine uses
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighboursConfig {
    #[serde(rename = "brute_force")] // compare every pair
    BruteForce,

    #[serde(rename = "cell_index")] // uniform grid, only adjacent cells compared
    CellIndex,
}

/// High-level engine configuration
#[derive(Deserialize, Debug)]
pub struct EngineConfig {
    pub variant: VariantConfig,
    pub neighbours: NeighboursConfig,
    pub rows: Option<usize>, // grid rows override, derived from the grain size otherwise
    pub cols: Option<usize>, // grid columns override
    pub seed: Option<u64>, // deterministic seed for random placement
}

/// Run loop parameters
#[derive(Deserialize, Debug, Clone)]
pub struct ParametersConfig {
    pub simulation_time: f64, // horizon
    pub delta1: f64, // requested time step
    pub log_interval: Option<f64>, // simulated seconds between progress logs
    pub stop_tolerance: Option<f64>, // kinetic energy stop threshold
}

/// Container geometry and contact constants
#[derive(Deserialize, Debug, Clone)]
pub struct SystemConfig {
    pub n: usize, // particles to place
    pub width: f64,
    pub length: f64,
    pub opening: f64, // exit diameter
    pub mass: f64, // particle mass
    pub kn: f64, // normal stiffness
    pub kt: f64, // tangential stiffness
}

/// Social force constants
#[derive(Deserialize, Debug, Clone)]
pub struct PedestrianConfig {
    pub min_diameter: f64,
    pub max_diameter: f64,
    pub a: f64, // repulsion strength
    pub b: f64, // repulsion decay length
    pub tau: f64, // relaxation time
    pub driving_speed: f64, // desired walking speed
}

/// Configuration for a single particle's initial state
#[derive(Deserialize, Debug)]
pub struct ParticleConfig {
    pub x: [f64; 2], // position
    pub v: [f64; 2], // velocity
    pub radius: f64,
    pub mass: Option<f64>, // falls back to `system.mass`
    pub kind: Option<u8>, // numeric kind code, ordinary when absent
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug)]
pub struct ScenarioConfig {
    pub engine: EngineConfig,
    pub parameters: ParametersConfig,
    pub system: SystemConfig,
    pub pedestrian: Option<PedestrianConfig>, // required by the pedestrian variant
    pub particles: Option<Vec<ParticleConfig>>, // explicit particles instead of random placement
}
