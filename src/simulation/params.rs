//! Physical parameters and derived geometry of a run
//!
//! `SiloParameters` holds the container geometry and contact constants
//! shared by both variants; `SocialParameters` adds the pedestrian model
//! and `RunParameters` drives the run loop.
//!
//! Vertical layout, bottom to top:
//! - `[0, fall_length)`: fall area below the opening
//! - `[fall_length, fall_length + length)`: the container itself
//! - `[respawn_min_y, respawn_max_y)`: respawn band, one max diameter high

use crate::error::SimulationError;

#[derive(Debug, Clone)]
pub struct SiloParameters {
    pub n: usize, // requested particle count
    pub width: f64,
    pub length: f64,
    pub opening: f64, // exit diameter
    pub mass: f64,
    pub kn: f64, // normal stiffness
    pub kt: f64, // tangential stiffness
    pub fall_length: f64,
    pub min_diameter: f64,
    pub max_diameter: f64,
}

impl SiloParameters {
    /// Granular silo: fall area is a tenth of the length and grain sizes
    /// follow the opening (or the width for a closed silo)
    pub fn granular(
        n: usize,
        width: f64,
        length: f64,
        opening: f64,
        mass: f64,
        kn: f64,
        kt: f64,
    ) -> Result<Self, SimulationError> {
        let (min_diameter, max_diameter) = if opening == 0.0 {
            (width / 21.0, width / 15.0)
        } else {
            (opening / 7.0, opening / 5.0)
        };
        let params = Self {
            n,
            width,
            length,
            opening,
            mass,
            kn,
            kt,
            fall_length: length / 10.0,
            min_diameter,
            max_diameter,
        };
        params.validate()?;
        Ok(params)
    }

    /// Pedestrian room: a quarter of the length lies below the exit
    #[allow(clippy::too_many_arguments)]
    pub fn pedestrian(
        n: usize,
        width: f64,
        length: f64,
        opening: f64,
        mass: f64,
        kn: f64,
        kt: f64,
        min_diameter: f64,
        max_diameter: f64,
    ) -> Result<Self, SimulationError> {
        let params = Self {
            n,
            width,
            length,
            opening,
            mass,
            kn,
            kt,
            fall_length: length / 4.0,
            min_diameter,
            max_diameter,
        };
        params.validate()?;
        if !(min_diameter > 0.0 && min_diameter <= max_diameter && max_diameter < width) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "diameters must satisfy 0 < min ({}) <= max ({}) < width ({})",
                min_diameter, max_diameter, width
            )));
        }
        Ok(params)
    }

    fn validate(&self) -> Result<(), SimulationError> {
        if !(self.length > self.width && self.width > self.opening && self.opening >= 0.0) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "expected length ({}) > width ({}) > opening ({}) >= 0",
                self.length, self.width, self.opening
            )));
        }
        if self.mass <= 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "mass must be positive, got {}",
                self.mass
            )));
        }
        if self.kn <= 0.0 || self.kt < 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "stiffness constants must satisfy kn > 0 and kt >= 0, got kn = {}, kt = {}",
                self.kn, self.kt
            )));
        }
        Ok(())
    }

    pub fn max_radius(&self) -> f64 {
        self.max_diameter / 2.0
    }

    pub fn respawn_min_y(&self) -> f64 {
        self.fall_length + self.length
    }

    pub fn respawn_max_y(&self) -> f64 {
        self.respawn_min_y() + self.max_diameter
    }

    pub fn respawn_length(&self) -> f64 {
        self.respawn_max_y() - self.respawn_min_y()
    }

    pub fn total_length(&self) -> f64 {
        self.fall_length + self.length + self.respawn_length()
    }

    /// `min(0.1 * sqrt(m / kn), requested)`
    pub fn time_step(&self, requested: f64) -> f64 {
        let natural = 0.1 * (self.mass / self.kn).sqrt();
        if requested > 0.0 {
            natural.min(requested)
        } else {
            natural
        }
    }
}

/// Run loop settings
#[derive(Debug, Clone)]
pub struct RunParameters {
    pub simulation_time: f64, // horizon in simulated seconds
    pub dt: f64, // effective step
    pub log_interval: f64, // simulated seconds between progress logs
    pub stop_tolerance: f64, // kinetic energy stop threshold
}

/// Social force model constants
#[derive(Debug, Clone, Copy)]
pub struct SocialParameters {
    pub a: f64, // repulsion strength
    pub b: f64, // repulsion decay length
    pub tau: f64, // relaxation time
    pub driving_speed: f64,
}

impl SocialParameters {
    pub fn new(a: f64, b: f64, tau: f64, driving_speed: f64) -> Result<Self, SimulationError> {
        if tau <= 0.0 || b <= 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "tau ({}) and B ({}) must be positive",
                tau, b
            )));
        }
        Ok(Self { a, b, tau, driving_speed })
    }
}
