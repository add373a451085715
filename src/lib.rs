pub mod error;
pub mod simulation;
pub mod configuration;
pub mod benchmark;

pub use error::SimulationError;

pub use simulation::states::{NVec2, Particle, ParticleId, ParticleKind, Pedestrian, RunContext, Wall, WallKind};
pub use simulation::neighbours::{BruteForce, CellIndex, Neighbours, NeighboursFinder};
pub use simulation::integrator::{Evaluation, Fate, GearModel, GearSystem, Simulation, GEAR5_ALPHA};
pub use simulation::forces::{ContactLaw, ForceSet, ForceTerm, G};
pub use simulation::granular::{GranularSilo, RespawnArea};
pub use simulation::pedestrian::PedestrianRoom;
pub use simulation::params::{RunParameters, SiloParameters, SocialParameters};
pub use simulation::scenario::{Scenario, SimulationKind};
pub use simulation::runner::{run, RunSummary};

pub use configuration::config::{
    EngineConfig, NeighboursConfig, ParametersConfig, ParticleConfig, PedestrianConfig, ScenarioConfig, SystemConfig,
    VariantConfig,
};

pub use benchmark::benchmark::{bench_neighbours, bench_silo_steps};
