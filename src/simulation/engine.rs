//! High-level runtime engine settings
//!
//! Selects the simulation variant and the neighbour search strategy
//! used when building a `Scenario`

use crate::error::SimulationError;
use crate::simulation::neighbours::{BruteForce, CellIndex, Neighbours, NeighboursFinder};
use crate::simulation::states::Particle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Granular,
    Pedestrian,
}

impl Variant {
    /// Simulated seconds between progress lines
    pub fn default_log_interval(self) -> f64 {
        match self {
            Variant::Granular => 0.025,
            Variant::Pedestrian => 0.5,
        }
    }

    /// Kinetic energy below which a moving system counts as stopped
    pub fn default_stop_tolerance(self) -> f64 {
        match self {
            Variant::Granular => 1e-8,
            Variant::Pedestrian => 7e-7,
        }
    }
}

/// Neighbour finder picked at build time
#[derive(Debug, Clone)]
pub enum NeighbourStrategy {
    BruteForce(BruteForce),
    CellIndex(CellIndex),
}

impl NeighboursFinder for NeighbourStrategy {
    fn find(&self, particles: &[Particle]) -> Result<Neighbours, SimulationError> {
        match self {
            NeighbourStrategy::BruteForce(f) => f.find(particles),
            NeighbourStrategy::CellIndex(f) => f.find(particles),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    pub variant: Variant, // granular silo or pedestrian room
    pub seed: u64, // placement seed
}
