pub mod states;
pub mod space;
pub mod params;
pub mod engine;
pub mod neighbours;
pub mod population;
pub mod integrator;
pub mod forces;
pub mod granular;
pub mod pedestrian;
pub mod scenario;
pub mod runner;
