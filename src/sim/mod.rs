//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must stay pure:
//! - Time comes in as explicit millisecond timestamps
//! - Seeded RNG only
//! - Stable iteration order (spawn order)
//! - No rendering, audio or platform dependencies

pub mod avatar;
pub mod collision;
pub mod entity;
pub mod events;
pub mod spawn;
pub mod state;
pub mod tick;

pub use avatar::Avatar;
pub use collision::{CollisionOutcome, ComboDelta, Pickup, resolve};
pub use entity::{Aabb, Coin, EntityId, EntityView, Obstacle, ObstacleShape, SpawnEntity, ViewKind};
pub use events::{GameEvent, TelemetryEvent, TelemetryKind};
pub use spawn::{CoinScheduler, ObstacleScheduler, SpawnTimer, Timeline};
pub use state::{CoinType, PlayerInfo, PowerUpKind, ProgressionState, RunPhase};
pub use tick::{RunSummary, Simulation, TickInput, derive_speed};
