//! Outbound event streams
//!
//! The simulation never calls collaborators directly. It queues two kinds of
//! plain data the driver drains after each tick:
//! - `GameEvent`: gameplay moments (audio cues, HUD flashes)
//! - `TelemetryEvent`: analytics notifications from progression bookkeeping

use serde::Serialize;

use super::entity::EntityId;
use super::state::{CoinType, PowerUpKind};

/// Gameplay moments worth a sound or a visual flourish
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    Jump,
    DoubleJump,
    Dash,
    AirCombo,
    CoinCollected { coin: CoinType, bonus_s: f32 },
    PowerUpGranted(PowerUpKind),
    ObstacleHit { penalty_s: f32 },
    /// Obstacle smashed by an invulnerable avatar
    ObstacleDestroyed(EntityId),
    ObstaclesDodged(u32),
    LevelUp(usize),
    BoostStarted,
    GameOver { score: u64 },
}

/// Analytics payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TelemetryKind {
    LevelChange { level: usize },
    GrantPowerUp { kind: PowerUpKind },
    ConsumePowerUp { kind: PowerUpKind },
    ResetPowerUps,
    BoostStart { duration_ms: f64 },
    BoostEnd,
    DashStart { duration_ms: f64 },
    DashEnd,
    SoundToggle { muted: bool },
}

impl TelemetryKind {
    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryKind::LevelChange { .. } => "levelChange",
            TelemetryKind::GrantPowerUp { .. } => "grantPowerUp",
            TelemetryKind::ConsumePowerUp { .. } => "consumePowerUp",
            TelemetryKind::ResetPowerUps => "resetPowerUps",
            TelemetryKind::BoostStart { .. } => "boostStart",
            TelemetryKind::BoostEnd => "boostEnd",
            TelemetryKind::DashStart { .. } => "dashStart",
            TelemetryKind::DashEnd => "dashEnd",
            TelemetryKind::SoundToggle { .. } => "soundToggle",
        }
    }
}

/// A timestamped analytics notification
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryEvent {
    pub timestamp: f64,
    #[serde(flatten)]
    pub kind: TelemetryKind,
}
