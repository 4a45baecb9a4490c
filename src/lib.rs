pub mod advisories;
pub mod clusters;
pub mod config;
pub mod distance;
pub mod engine;
pub mod error;
pub mod features;
pub mod logging;
pub mod missions;
pub mod pathing;
pub mod policy;
pub mod refuel;
pub mod scenario;
pub mod spatial;
pub mod world;

pub use config::EngineConfig;
pub use engine::{Engine, MissionRefresh, StageReport, TurnAnalysis};
pub use error::{ConfigError, EngineError, OrderError, StateError};
pub use missions::{Mission, MissionStore, TargetIndex};
pub use scenario::{FixtureLoader, TurnFixture};
pub use spatial::{Coord, CoordSet, Grid, IterationOrder};
pub use world::{TurnState, TurnStateBuilder};
