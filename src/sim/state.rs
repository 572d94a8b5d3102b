//! Progression state and core simulation types
//!
//! `ProgressionState` is the single source of truth for score, combo, timer,
//! level, coin counters, power-ups and timed windows. It owns no timers; the
//! simulation loop feeds it the clock and drains its telemetry outbox.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::events::{TelemetryEvent, TelemetryKind};
use crate::consts::{ANONYMOUS_NAME, MUTE_KEY};
use crate::persistence::PreferenceStore;

/// Coin colours, one per level band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinType {
    Green,
    Blue,
    Violet,
    Yellow,
    White,
}

impl CoinType {
    pub const ALL: [CoinType; 5] = [
        CoinType::Green,
        CoinType::Blue,
        CoinType::Violet,
        CoinType::Yellow,
        CoinType::White,
    ];

    fn index(self) -> usize {
        match self {
            CoinType::Green => 0,
            CoinType::Blue => 1,
            CoinType::Violet => 2,
            CoinType::Yellow => 3,
            CoinType::White => 4,
        }
    }

    /// Power-up granted by collecting this coin
    pub fn power_up(self) -> Option<PowerUpKind> {
        match self {
            CoinType::Violet => Some(PowerUpKind::Dash),
            CoinType::Yellow => Some(PowerUpKind::DoubleJump),
            CoinType::White => Some(PowerUpKind::AirCombo),
            CoinType::Green | CoinType::Blue => None,
        }
    }

    /// Whether collecting this coin opens a speed boost window
    pub fn triggers_boost(self) -> bool {
        matches!(self, CoinType::Blue | CoinType::Yellow)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CoinType::Green => "green",
            CoinType::Blue => "blue",
            CoinType::Violet => "violet",
            CoinType::Yellow => "yellow",
            CoinType::White => "white",
        }
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoinType {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "green" => Ok(CoinType::Green),
            "blue" => Ok(CoinType::Blue),
            "violet" => Ok(CoinType::Violet),
            "yellow" => Ok(CoinType::Yellow),
            "white" => Ok(CoinType::White),
            _ => {
                log::warn!("Unknown coin type: {s}");
                Err(UnknownKind(s.to_string()))
            }
        }
    }
}

/// Single-use abilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUpKind {
    Dash,
    DoubleJump,
    AirCombo,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [PowerUpKind::Dash, PowerUpKind::DoubleJump, PowerUpKind::AirCombo];

    fn index(self) -> usize {
        match self {
            PowerUpKind::Dash => 0,
            PowerUpKind::DoubleJump => 1,
            PowerUpKind::AirCombo => 2,
        }
    }
}

impl FromStr for PowerUpKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dash" => Ok(PowerUpKind::Dash),
            "doublejump" | "double_jump" => Ok(PowerUpKind::DoubleJump),
            "aircombo" | "air_combo" => Ok(PowerUpKind::AirCombo),
            _ => {
                log::warn!("Unknown power-up kind: {s}");
                Err(UnknownKind(s.to_string()))
            }
        }
    }
}

/// A coin or power-up name that does not exist
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown kind `{0}`")]
pub struct UnknownKind(pub String);

/// Run lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    /// No run started yet
    #[default]
    Idle,
    Running,
    Paused,
    /// Timer ran out (or run torn down); never resumes
    GameOver,
}

/// Per-coin-type collection counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoinCounts([u32; 5]);

impl CoinCounts {
    pub fn get(&self, coin: CoinType) -> u32 {
        self.0[coin.index()]
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }
}

/// Per-kind power-up charges (0 or 1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerUps([u8; 3]);

impl PowerUps {
    pub fn count(&self, kind: PowerUpKind) -> u8 {
        self.0[kind.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&c| c == 0)
    }
}

/// Time-bounded effect window, expired by the loop comparing timestamps
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimedWindow {
    pub active: bool,
    pub end_ms: f64,
}

impl TimedWindow {
    /// Active and past its end timestamp
    pub fn expired(&self, now_ms: f64) -> bool {
        self.active && now_ms >= self.end_ms
    }
}

/// Player identity, fixed once a run starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub name: String,
    pub email: String,
}

impl Default for PlayerInfo {
    fn default() -> Self {
        Self {
            name: ANONYMOUS_NAME.to_string(),
            email: String::new(),
        }
    }
}

impl PlayerInfo {
    /// Normalise raw form input: trimmed name (or anonymous), lowercase email
    pub fn new(name: &str, email: &str) -> Self {
        let name = name.trim();
        Self {
            name: if name.is_empty() {
                ANONYMOUS_NAME.to_string()
            } else {
                name.to_string()
            },
            email: email.trim().to_lowercase(),
        }
    }
}

/// Permanent bonuses that survive hits (reset only at run start)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bonuses {
    pub jump_velocity_bonus: f32,
    pub unlimited_mode: bool,
    pub obstacle_rate_modifier: f64,
}

impl Default for Bonuses {
    fn default() -> Self {
        Self {
            jump_velocity_bonus: 0.0,
            unlimited_mode: false,
            obstacle_rate_modifier: 1.0,
        }
    }
}

/// Everything progression-related for one run
#[derive(Debug, Clone)]
pub struct ProgressionState {
    phase: RunPhase,
    score: u64,
    combo: u32,
    time_remaining: f32,
    max_time: f32,
    level: usize,
    coins: CoinCounts,
    power_ups: PowerUps,
    boost: TimedWindow,
    dash: TimedWindow,
    muted: bool,
    player: PlayerInfo,
    bonuses: Bonuses,
    /// Last clock value seen by the loop, used to stamp telemetry
    clock_ms: f64,
    outbox: Vec<TelemetryEvent>,
}

impl ProgressionState {
    /// Fresh idle state with the given timer cap
    pub fn new(max_time: f32) -> Self {
        Self {
            phase: RunPhase::Idle,
            score: 0,
            combo: 0,
            time_remaining: 0.0,
            max_time: max_time.max(0.0),
            level: 0,
            coins: CoinCounts::default(),
            power_ups: PowerUps::default(),
            boost: TimedWindow::default(),
            dash: TimedWindow::default(),
            muted: false,
            player: PlayerInfo::default(),
            bonuses: Bonuses::default(),
            clock_ms: 0.0,
            outbox: Vec::new(),
        }
    }

    /// Reset every field to run-start defaults and reload the mute preference
    pub fn initialize(&mut self, initial_time: f32, store: &dyn PreferenceStore) {
        self.phase = RunPhase::Idle;
        self.score = 0;
        self.combo = 0;
        self.time_remaining = initial_time.clamp(0.0, self.max_time);
        self.set_level(0);
        self.reset_coin_counts(None);
        self.reset_all_power_ups();
        self.set_boost_active(false, 0.0);
        self.set_dash_active(false, 0.0);
        self.reset_bonuses();
        self.muted = store.get(MUTE_KEY).is_some_and(|v| v == "true");
    }

    // === Lifecycle ===

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Run in progress, paused or not
    pub fn is_running(&self) -> bool {
        matches!(self.phase, RunPhase::Running | RunPhase::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.phase == RunPhase::Paused
    }

    /// Running and not paused
    pub fn is_active(&self) -> bool {
        self.phase == RunPhase::Running
    }

    pub(crate) fn set_phase(&mut self, phase: RunPhase) {
        if self.phase == RunPhase::GameOver && phase != RunPhase::Idle {
            // Only a fresh initialize leaves game over
            return;
        }
        self.phase = phase;
    }

    pub(crate) fn observe_clock(&mut self, now_ms: f64) {
        self.clock_ms = now_ms;
    }

    // === Score / combo / time ===

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn time_remaining(&self) -> f32 {
        self.time_remaining
    }

    pub fn max_time(&self) -> f32 {
        self.max_time
    }

    pub fn increment_score(&mut self, amount: u64) {
        self.score = self.score.saturating_add(amount);
    }

    pub fn increment_combo(&mut self) {
        self.combo = self.combo.saturating_add(1);
    }

    pub fn reset_combo(&mut self) {
        if self.combo > 0 {
            log::debug!("Combo reset ({} -> 0)", self.combo);
        }
        self.combo = 0;
    }

    /// Add (or subtract) seconds, saturating into `[0, max_time]`
    pub fn apply_time_delta(&mut self, delta: f32) {
        self.time_remaining = (self.time_remaining + delta).clamp(0.0, self.max_time);
    }

    // === Level ===

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn set_level(&mut self, level: usize) {
        if self.level == level {
            return;
        }
        self.level = level;
        self.emit(TelemetryKind::LevelChange { level });
    }

    // === Coins ===

    pub fn coin_counts(&self) -> CoinCounts {
        self.coins
    }

    pub fn coin_count(&self, coin: CoinType) -> u32 {
        self.coins.get(coin)
    }

    pub fn add_coin(&mut self, coin: CoinType) {
        let slot = &mut self.coins.0[coin.index()];
        *slot = slot.saturating_add(1);
    }

    /// `None` clears every counter, `Some(t)` clears one
    pub fn reset_coin_counts(&mut self, coin: Option<CoinType>) {
        match coin {
            None => self.coins = CoinCounts::default(),
            Some(coin) => self.coins.0[coin.index()] = 0,
        }
    }

    // === Power-ups ===

    pub fn power_ups(&self) -> PowerUps {
        self.power_ups
    }

    pub fn has_power_up(&self, kind: PowerUpKind) -> bool {
        self.power_ups.count(kind) > 0
    }

    /// Grant one charge; holding a charge already grants nothing extra.
    /// Returns whether a charge was added.
    pub fn grant_power_up(&mut self, kind: PowerUpKind) -> bool {
        let slot = &mut self.power_ups.0[kind.index()];
        if *slot > 0 {
            return false;
        }
        *slot = 1;
        self.emit(TelemetryKind::GrantPowerUp { kind });
        true
    }

    /// Spend one charge if held; a no-op at zero. Returns whether one was spent.
    pub fn consume_power_up(&mut self, kind: PowerUpKind) -> bool {
        let slot = &mut self.power_ups.0[kind.index()];
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        self.emit(TelemetryKind::ConsumePowerUp { kind });
        true
    }

    pub fn reset_all_power_ups(&mut self) {
        if self.power_ups.is_empty() {
            return;
        }
        self.power_ups = PowerUps::default();
        self.emit(TelemetryKind::ResetPowerUps);
    }

    // === Timed windows ===

    pub fn boost(&self) -> TimedWindow {
        self.boost
    }

    pub fn dash(&self) -> TimedWindow {
        self.dash
    }

    pub fn is_boost_active(&self) -> bool {
        self.boost.active
    }

    pub fn is_dashing(&self) -> bool {
        self.dash.active
    }

    /// Open or close the boost window. An end time not after the current
    /// clock closes it. Returns whether the active flag flipped.
    pub fn set_boost_active(&mut self, active: bool, end_ms: f64) -> bool {
        let now = self.clock_ms;
        let (flipped, start) = toggle_window(&mut self.boost, active, end_ms, now);
        if flipped {
            self.emit(if start {
                TelemetryKind::BoostStart {
                    duration_ms: end_ms - now,
                }
            } else {
                TelemetryKind::BoostEnd
            });
        }
        flipped
    }

    /// Mirror of the avatar's dash, read by speed derivation
    pub fn set_dash_active(&mut self, active: bool, end_ms: f64) -> bool {
        let now = self.clock_ms;
        let (flipped, start) = toggle_window(&mut self.dash, active, end_ms, now);
        if flipped {
            self.emit(if start {
                TelemetryKind::DashStart {
                    duration_ms: end_ms - now,
                }
            } else {
                TelemetryKind::DashEnd
            });
        }
        flipped
    }

    // === Preferences ===

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Flip and persist the mute flag, returning the new value
    pub fn toggle_mute(&mut self, store: &mut dyn PreferenceStore) -> bool {
        self.muted = !self.muted;
        store.set(MUTE_KEY, if self.muted { "true" } else { "false" });
        self.emit(TelemetryKind::SoundToggle { muted: self.muted });
        self.muted
    }

    // === Player ===

    pub fn player(&self) -> &PlayerInfo {
        &self.player
    }

    /// Set identity; ignored while a run is in progress
    pub fn set_player_info(&mut self, player: PlayerInfo) {
        if self.is_running() {
            log::warn!("Player info is fixed during a run");
            return;
        }
        self.player = player;
    }

    // === Permanent bonuses ===

    pub fn bonuses(&self) -> Bonuses {
        self.bonuses
    }

    pub fn is_unlimited(&self) -> bool {
        self.bonuses.unlimited_mode
    }

    pub fn increment_jump_velocity_bonus(&mut self, amount: f32) {
        self.bonuses.jump_velocity_bonus += amount;
    }

    /// Unlimited power-ups, paid for with denser obstacles
    pub fn enable_unlimited_mode(&mut self, obstacle_rate_modifier: f64) {
        self.bonuses.unlimited_mode = true;
        self.bonuses.obstacle_rate_modifier = obstacle_rate_modifier;
    }

    pub fn reset_bonuses(&mut self) {
        self.bonuses = Bonuses::default();
    }

    // === Hit reset ===

    /// Obstacle hit: combo, boost, coins, level and power-ups go back to zero together
    pub fn reset_after_hit(&mut self) {
        self.reset_combo();
        self.set_boost_active(false, 0.0);
        self.reset_coin_counts(None);
        self.set_level(0);
        self.reset_all_power_ups();
    }

    // === Telemetry ===

    fn emit(&mut self, kind: TelemetryKind) {
        self.outbox.push(TelemetryEvent {
            timestamp: self.clock_ms,
            kind,
        });
    }

    pub fn drain_telemetry(&mut self) -> Vec<TelemetryEvent> {
        std::mem::take(&mut self.outbox)
    }
}

/// Returns (flipped, now_active)
fn toggle_window(window: &mut TimedWindow, active: bool, end_ms: f64, now_ms: f64) -> (bool, bool) {
    if active && end_ms > now_ms {
        let was_active = window.active;
        window.active = true;
        window.end_ms = end_ms;
        (!was_active, true)
    } else if window.active {
        window.active = false;
        window.end_ms = 0.0;
        (true, false)
    } else {
        (false, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use proptest::prelude::*;

    fn fresh() -> ProgressionState {
        let mut state = ProgressionState::new(90.0);
        state.initialize(30.0, &MemoryStore::default());
        state.drain_telemetry();
        state
    }

    #[test]
    fn test_initialize_defaults() {
        let state = fresh();
        assert_eq!(state.phase(), RunPhase::Idle);
        assert_eq!(state.time_remaining(), 30.0);
        assert_eq!(state.level(), 0);
        assert_eq!(state.coin_counts().total(), 0);
        assert!(state.power_ups().is_empty());
        assert!(!state.is_muted());
    }

    #[test]
    fn test_initialize_loads_mute_preference() {
        let mut store = MemoryStore::default();
        store.set(MUTE_KEY, "true");
        let mut state = ProgressionState::new(90.0);
        state.initialize(30.0, &store);
        assert!(state.is_muted());
    }

    #[test]
    fn test_toggle_mute_persists() {
        let mut store = MemoryStore::default();
        let mut state = fresh();
        assert!(state.toggle_mute(&mut store));
        assert_eq!(store.get(MUTE_KEY).as_deref(), Some("true"));
        assert!(!state.toggle_mute(&mut store));
        assert_eq!(store.get(MUTE_KEY).as_deref(), Some("false"));
    }

    #[test]
    fn test_grant_twice_stays_at_one() {
        let mut state = fresh();
        assert!(state.grant_power_up(PowerUpKind::Dash));
        assert!(!state.grant_power_up(PowerUpKind::Dash));
        assert_eq!(state.power_ups().count(PowerUpKind::Dash), 1);
        // Only the first grant notifies
        assert_eq!(state.drain_telemetry().len(), 1);
    }

    #[test]
    fn test_consume_at_zero_is_noop() {
        let mut state = fresh();
        assert!(!state.consume_power_up(PowerUpKind::AirCombo));
        assert_eq!(state.power_ups().count(PowerUpKind::AirCombo), 0);
        state.grant_power_up(PowerUpKind::AirCombo);
        assert!(state.consume_power_up(PowerUpKind::AirCombo));
        assert!(!state.consume_power_up(PowerUpKind::AirCombo));
        assert_eq!(state.power_ups().count(PowerUpKind::AirCombo), 0);
    }

    #[test]
    fn test_reset_all_power_ups_idempotent() {
        let mut state = fresh();
        state.grant_power_up(PowerUpKind::Dash);
        state.grant_power_up(PowerUpKind::DoubleJump);
        state.reset_all_power_ups();
        let first = state.power_ups();
        state.reset_all_power_ups();
        assert_eq!(state.power_ups(), first);
        assert!(state.power_ups().is_empty());
    }

    #[test]
    fn test_set_level_notifies_only_on_change() {
        let mut state = fresh();
        state.set_level(0);
        assert!(state.drain_telemetry().is_empty());
        state.set_level(2);
        let events = state.drain_telemetry();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, TelemetryKind::LevelChange { level: 2 });
    }

    #[test]
    fn test_reset_single_coin_counter() {
        let mut state = fresh();
        state.add_coin(CoinType::Green);
        state.add_coin(CoinType::Green);
        state.add_coin(CoinType::Blue);
        state.reset_coin_counts(Some(CoinType::Green));
        assert_eq!(state.coin_count(CoinType::Green), 0);
        assert_eq!(state.coin_count(CoinType::Blue), 1);
        state.reset_coin_counts(None);
        assert_eq!(state.coin_counts().total(), 0);
    }

    #[test]
    fn test_boost_window_is_edge_triggered() {
        let mut state = fresh();
        state.observe_clock(1000.0);
        assert!(state.set_boost_active(true, 6000.0));
        // Extending an open window is not a flip
        assert!(!state.set_boost_active(true, 7000.0));
        assert_eq!(state.boost().end_ms, 7000.0);
        assert!(state.set_boost_active(false, 0.0));
        assert!(!state.set_boost_active(false, 0.0));

        let names: Vec<_> = state.drain_telemetry().iter().map(|e| e.kind.name()).collect();
        assert_eq!(names, ["boostStart", "boostEnd"]);
    }

    #[test]
    fn test_activation_in_the_past_closes_window() {
        let mut state = fresh();
        state.observe_clock(5000.0);
        assert!(!state.set_dash_active(true, 4000.0));
        assert!(!state.is_dashing());
    }

    #[test]
    fn test_hit_reset_is_total() {
        let mut state = fresh();
        state.observe_clock(0.0);
        for _ in 0..5 {
            state.increment_combo();
        }
        state.set_level(3);
        state.add_coin(CoinType::Yellow);
        state.grant_power_up(PowerUpKind::Dash);
        state.grant_power_up(PowerUpKind::AirCombo);
        state.set_boost_active(true, 5000.0);

        state.reset_after_hit();

        assert_eq!(state.combo(), 0);
        assert_eq!(state.level(), 0);
        assert_eq!(state.coin_counts().total(), 0);
        assert!(state.power_ups().is_empty());
        assert!(!state.is_boost_active());
    }

    #[test]
    fn test_player_info_normalised_and_locked() {
        let mut state = fresh();
        state.set_player_info(PlayerInfo::new("   ", "  Ana@Example.COM "));
        assert_eq!(state.player().name, ANONYMOUS_NAME);
        assert_eq!(state.player().email, "ana@example.com");

        state.set_phase(RunPhase::Running);
        state.set_player_info(PlayerInfo::new("Intruder", "x@y.z"));
        assert_eq!(state.player().name, ANONYMOUS_NAME);
    }

    #[test]
    fn test_game_over_is_sticky() {
        let mut state = fresh();
        state.set_phase(RunPhase::Running);
        state.set_phase(RunPhase::GameOver);
        state.set_phase(RunPhase::Running);
        assert_eq!(state.phase(), RunPhase::GameOver);
        assert!(!state.is_running());
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Violet".parse::<CoinType>(), Ok(CoinType::Violet));
        assert!("purple".parse::<CoinType>().is_err());
        assert_eq!("double_jump".parse::<PowerUpKind>(), Ok(PowerUpKind::DoubleJump));
        let err = "teleport".parse::<PowerUpKind>().unwrap_err();
        assert_eq!(err, UnknownKind("teleport".to_string()));
        assert_eq!(err.to_string(), "unknown kind `teleport`");
        let _: Box<dyn std::error::Error> = Box::new(err);
    }

    proptest! {
        #[test]
        fn prop_time_delta_saturates(start in 0.0f32..90.0, delta in -500.0f32..500.0) {
            let mut state = ProgressionState::new(90.0);
            state.initialize(start, &MemoryStore::default());
            state.apply_time_delta(delta);
            prop_assert!(state.time_remaining() >= 0.0);
            prop_assert!(state.time_remaining() <= 90.0);
        }

        #[test]
        fn prop_grants_never_exceed_one(grants in 1usize..8, consumes in 0usize..8) {
            let mut state = fresh();
            for _ in 0..grants {
                state.grant_power_up(PowerUpKind::DoubleJump);
            }
            prop_assert_eq!(state.power_ups().count(PowerUpKind::DoubleJump), 1);
            for _ in 0..consumes {
                state.consume_power_up(PowerUpKind::DoubleJump);
            }
            let expected = if consumes == 0 { 1 } else { 0 };
            prop_assert_eq!(state.power_ups().count(PowerUpKind::DoubleJump), expected);
        }
    }
}
