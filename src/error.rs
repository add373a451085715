//! Error type shared by the simulation core.
//!
//! Every failure here is fatal for the current step: the integrator never
//! commits a step that produced one, so the previous state stays valid.

use std::fmt;

use crate::simulation::states::ParticleId;

/// Errors raised while building or advancing a simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Two particle centres coincide, so no contact direction exists.
    CoincidentParticles { first: ParticleId, second: ParticleId },
    /// A pedestrian sits exactly on its target point.
    TargetReached { particle: ParticleId },
    /// A particle fell outside the cell grid of the neighbour finder.
    OutsideGrid { particle: ParticleId, row: i64, col: i64 },
    /// A wall whose endpoints coincide.
    DegenerateWall,
    /// Rejected configuration, checked once before stepping starts.
    InvalidConfiguration(String),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::CoincidentParticles { first, second } => {
                write!(f, "particles {} and {} share the same position", first, second)
            }
            SimulationError::TargetReached { particle } => {
                write!(f, "particle {} is located exactly at its target", particle)
            }
            SimulationError::OutsideGrid { particle, row, col } => write!(
                f,
                "particle {} maps to cell ({}, {}) which is outside the grid",
                particle, row, col
            ),
            SimulationError::DegenerateWall => write!(f, "wall endpoints must not coincide"),
            SimulationError::InvalidConfiguration(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for SimulationError {}
