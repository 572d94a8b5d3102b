//! Data-driven game balance
//!
//! Every number that shapes how a run feels lives here. `Tuning::default()`
//! is the shipped balance; pages can override any subset through JSON.

use serde::{Deserialize, Serialize};

use crate::sim::entity::ObstacleShape;
use crate::sim::state::CoinType;

/// What a level needs before the player moves on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advance {
    pub coin: CoinType,
    pub count: u32,
}

/// Per-level rule: which coin spawns, and what advances to the next level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRule {
    pub spawn: CoinType,
    /// `None` on the final level
    pub advance: Option<Advance>,
}

/// Time bonus in seconds granted by each coin type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinBonuses {
    pub green: f32,
    pub blue: f32,
    pub violet: f32,
    pub yellow: f32,
    pub white: f32,
}

impl Default for CoinBonuses {
    fn default() -> Self {
        Self {
            green: 1.0,
            blue: 2.0,
            violet: 3.0,
            yellow: 4.0,
            white: 5.0,
        }
    }
}

impl CoinBonuses {
    pub fn get(&self, coin: CoinType) -> f32 {
        match coin {
            CoinType::Green => self.green,
            CoinType::Blue => self.blue,
            CoinType::Violet => self.violet,
            CoinType::Yellow => self.yellow,
            CoinType::White => self.white,
        }
    }
}

/// Complete balance sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Physics (px, px/s, px/s²) ===
    pub gravity: f32,
    pub base_jump_velocity: f32,
    /// Jump multiplier once combo reaches 3
    pub jump_combo_multiplier: f32,
    pub double_jump_multiplier: f32,
    pub ground_y: f32,

    // === Horizontal speed ===
    pub base_speed: f32,
    pub combo3_speed_multiplier: f32,
    pub combo6_speed_multiplier: f32,
    pub boost_multiplier: f32,
    pub boost_duration_s: f32,
    pub level_speed_multipliers: Vec<f32>,
    pub level_jump_multipliers: Vec<f32>,

    // === Time and score ===
    pub initial_time_s: f32,
    pub max_time_cap_s: f32,
    pub hit_penalty_s: f32,
    /// Base points per coin (multiplied by combo)
    pub coin_score: u64,
    pub points_per_obstacle_dodged: u64,

    // === Spawn cadence (ms) ===
    pub obstacle_base_interval_ms: f64,
    pub obstacle_min_gap_ms: f64,
    pub obstacle_rate_decrease_factor: f64,
    pub max_consecutive_obstacles: u32,
    pub consecutive_break_multiplier: f64,
    pub coin_base_interval_ms: f64,
    pub coin_min_interval_ms: f64,
    pub coin_interval_randomness_ms: f64,
    pub coin_interval_combo6_multiplier: f64,
    pub min_obstacle_visual_gap_px: f32,
    pub obstacle_large_chance: f64,
    pub obstacle_double_chance: f64,

    // === Power-ups ===
    pub dash_speed_bonus: f32,
    pub dash_duration_s: f32,
    /// Dashing makes the avatar invulnerable
    pub dash_invulnerable: bool,
    /// An invulnerable avatar destroys the obstacles it touches
    pub invulnerable_destroys_obstacles: bool,
    pub air_combo_resets_double_jump: bool,
    /// Two jump presses this close while airborne trigger a dash
    pub double_tap_window_ms: f64,
    /// Obstacle cadence multiplier once unlimited mode is on
    pub unlimited_obstacle_rate_modifier: f64,
    /// Added to jump velocity by each permanent jump bonus
    pub jump_bonus_increment: f32,

    // === Collision margins (px) ===
    pub obstacle_hit_margin: f32,
    pub coin_pickup_margin: f32,

    // === Levels ===
    pub level_rules: Vec<LevelRule>,
    pub shapes_by_level: Vec<Vec<ObstacleShape>>,
    pub coin_bonuses: CoinBonuses,

    // === Arena geometry (px) ===
    pub arena_width: f32,
    pub arena_height: f32,
    pub avatar_x: f32,
    pub avatar_width: f32,
    pub avatar_height: f32,
    pub coin_size: f32,
    /// Size factor applied to large obstacles
    pub large_obstacle_scale: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        use ObstacleShape::*;

        Self {
            gravity: 1800.0,
            base_jump_velocity: 700.0,
            jump_combo_multiplier: 1.1,
            double_jump_multiplier: 1.1,
            ground_y: 0.0,

            base_speed: 420.0,
            combo3_speed_multiplier: 1.2,
            combo6_speed_multiplier: 1.5,
            boost_multiplier: 1.5,
            boost_duration_s: 5.0,
            level_speed_multipliers: vec![1.0, 1.15, 1.30, 1.45, 1.60, 1.75],
            level_jump_multipliers: vec![1.0, 1.0, 1.1, 1.1, 1.2, 1.2],

            initial_time_s: 30.0,
            max_time_cap_s: 90.0,
            hit_penalty_s: 1.0,
            coin_score: 5,
            points_per_obstacle_dodged: 10,

            obstacle_base_interval_ms: 1800.0,
            obstacle_min_gap_ms: 550.0,
            obstacle_rate_decrease_factor: 0.96,
            max_consecutive_obstacles: 3,
            consecutive_break_multiplier: 1.6,
            coin_base_interval_ms: 2200.0,
            coin_min_interval_ms: 1600.0,
            coin_interval_randomness_ms: 800.0,
            coin_interval_combo6_multiplier: 0.7,
            min_obstacle_visual_gap_px: 120.0,
            obstacle_large_chance: 0.33,
            obstacle_double_chance: 0.4,

            dash_speed_bonus: 800.0,
            dash_duration_s: 0.25,
            dash_invulnerable: true,
            invulnerable_destroys_obstacles: true,
            air_combo_resets_double_jump: true,
            double_tap_window_ms: 250.0,
            unlimited_obstacle_rate_modifier: 0.85,
            jump_bonus_increment: 50.0,

            obstacle_hit_margin: -10.0,
            coin_pickup_margin: 5.0,

            level_rules: vec![
                LevelRule {
                    spawn: CoinType::Green,
                    advance: Some(Advance { coin: CoinType::Green, count: 3 }),
                },
                LevelRule {
                    spawn: CoinType::Blue,
                    advance: Some(Advance { coin: CoinType::Blue, count: 3 }),
                },
                LevelRule {
                    spawn: CoinType::Violet,
                    advance: Some(Advance { coin: CoinType::Violet, count: 2 }),
                },
                LevelRule {
                    spawn: CoinType::Yellow,
                    advance: Some(Advance { coin: CoinType::Yellow, count: 2 }),
                },
                LevelRule {
                    spawn: CoinType::White,
                    advance: Some(Advance { coin: CoinType::White, count: 2 }),
                },
                LevelRule {
                    spawn: CoinType::White,
                    advance: None,
                },
            ],
            shapes_by_level: vec![
                vec![Square],
                vec![Square, Triangle],
                vec![Square, Triangle, Line, Cube],
                vec![Square, Triangle, Line, Cube, Zeta],
                vec![Square, Triangle, Line, Cube, Zeta, LShape],
            ],
            coin_bonuses: CoinBonuses::default(),

            arena_width: 800.0,
            arena_height: 400.0,
            avatar_x: 80.0,
            avatar_width: 40.0,
            avatar_height: 70.0,
            coin_size: 28.0,
            large_obstacle_scale: 1.5,
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) tuning document; missing fields keep defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Number of levels defined by the rule table (at least one)
    pub fn level_count(&self) -> usize {
        self.level_rules.len().max(1)
    }

    /// Rule for a level, if one is configured
    pub fn level_rule(&self, level: usize) -> Option<&LevelRule> {
        self.level_rules.get(level)
    }

    /// Permanent speed multiplier for a level (last entry covers higher levels)
    pub fn level_speed_multiplier(&self, level: usize) -> f32 {
        clamped_entry(&self.level_speed_multipliers, level)
    }

    /// Permanent jump multiplier for a level (last entry covers higher levels)
    pub fn level_jump_multiplier(&self, level: usize) -> f32 {
        clamped_entry(&self.level_jump_multipliers, level)
    }

    /// Shape pool for a level (last pool covers higher levels)
    pub fn shape_pool(&self, level: usize) -> &[ObstacleShape] {
        match self.shapes_by_level.len() {
            0 => &[],
            n => &self.shapes_by_level[level.min(n - 1)],
        }
    }

    /// Combo-driven speed multiplier
    pub fn combo_speed_multiplier(&self, combo: u32) -> f32 {
        if combo >= 6 {
            self.combo6_speed_multiplier
        } else if combo >= 3 {
            self.combo3_speed_multiplier
        } else {
            1.0
        }
    }
}

fn clamped_entry(table: &[f32], index: usize) -> f32 {
    match table.len() {
        0 => {
            log::warn!("Empty multiplier table, using 1.0");
            1.0
        }
        n => table[index.min(n - 1)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_table() {
        let tuning = Tuning::default();
        assert_eq!(tuning.level_count(), 6);
        assert_eq!(tuning.level_rule(0).map(|r| r.spawn), Some(CoinType::Green));
        assert!(tuning.level_rule(5).is_some_and(|r| r.advance.is_none()));
        assert!(tuning.level_rule(6).is_none());
    }

    #[test]
    fn test_multipliers_clamp_to_last_entry() {
        let tuning = Tuning::default();
        assert_eq!(tuning.level_speed_multiplier(0), 1.0);
        assert_eq!(tuning.level_speed_multiplier(99), 1.75);
        assert_eq!(tuning.shape_pool(5).len(), 6);
        assert_eq!(tuning.combo_speed_multiplier(2), 1.0);
        assert_eq!(tuning.combo_speed_multiplier(3), 1.2);
        assert_eq!(tuning.combo_speed_multiplier(6), 1.5);
    }

    #[test]
    fn test_partial_json_override() {
        let tuning = Tuning::from_json(r#"{ "base_speed": 500.0, "coin_bonuses": { "green": 2.5 } }"#)
            .expect("valid tuning");
        assert_eq!(tuning.base_speed, 500.0);
        assert_eq!(tuning.coin_bonuses.get(CoinType::Green), 2.5);
        assert_eq!(tuning.coin_bonuses.get(CoinType::White), 5.0);
        assert_eq!(tuning.initial_time_s, 30.0);
    }

    #[test]
    fn test_empty_tables_fall_back() {
        let tuning = Tuning {
            level_speed_multipliers: Vec::new(),
            shapes_by_level: Vec::new(),
            ..Default::default()
        };
        assert_eq!(tuning.level_speed_multiplier(3), 1.0);
        assert!(tuning.shape_pool(0).is_empty());
    }
}
