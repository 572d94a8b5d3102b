//! Cuboneon Arena - a time-attack neon runner
//!
//! Core modules:
//! - `sim`: Deterministic simulation (progression, spawning, physics, collisions)
//! - `tuning`: Data-driven game balance
//! - `platform`: Browser focus/visibility handling and key mapping
//! - `persistence`: Preference storage (LocalStorage on web)
//! - `ranking`: Score submission and leaderboard
//! - `audio`: Sound cues
//! - `telemetry`: Analytics event sinks

pub mod audio;
pub mod persistence;
pub mod platform;
pub mod ranking;
pub mod sim;
pub mod telemetry;
pub mod tuning;

pub use ranking::{LocalRanking, RankingReport};
pub use tuning::Tuning;

/// Engine constants that are not balance knobs
pub mod consts {
    /// Preference key for the persisted mute flag
    pub const MUTE_KEY: &str = "cuboneonSoundMuted";
    /// Preference key for the local leaderboard
    pub const LOCAL_RANKING_KEY: &str = "cuboneonLocalRanking";

    /// Maximum characters of a player name sent to the ranking
    pub const RANKING_MAX_NAME_LENGTH: usize = 15;
    /// Leaderboard rows shown
    pub const RANKING_TOP_N: usize = 20;

    /// Name used when the player leaves the field empty
    pub const ANONYMOUS_NAME: &str = "Anonymous";

    /// Largest frame delta the loop will integrate (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;
}

/// Truncate a string to at most `max` characters (not bytes)
#[inline]
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
