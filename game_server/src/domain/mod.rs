// Domain layer: core simulation types and rules.

pub mod errors;
pub mod obstacles;
pub mod registry;
pub mod rng;
pub mod round;
pub mod systems;
pub mod tuning;

pub use errors::RegistryError;
pub use obstacles::{Obstacle, ObstacleGeometry, Rect};
pub use registry::{Player, PlayerId, PlayerRegistry, Username};
pub use round::{Phase, RoundState, RoundTimings, Transition};
pub use tuning::{ScoringMode, WorldTuning};
