//! Collision resolution
//!
//! `resolve` is a pure function over the avatar box and the live entities.
//! It reports what happened; the loop applies state changes and asks the
//! schedulers to remove the listed ids.

use std::collections::HashSet;

use super::entity::{Aabb, Coin, EntityId, Obstacle};
use super::state::{CoinType, PowerUpKind};
use crate::tuning::Tuning;

/// Combo change requested by a collision pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboDelta {
    Add(u32),
    Reset,
}

impl Default for ComboDelta {
    fn default() -> Self {
        ComboDelta::Add(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pickup {
    pub id: EntityId,
    pub coin_type: CoinType,
    pub bonus_s: f32,
}

/// Everything a collision pass produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionOutcome {
    /// Seconds to add (negative for penalties)
    pub time_delta: f32,
    pub combo: ComboDelta,
    /// Base points per pickup, before the combo multiplier
    pub score_increments: Vec<u64>,
    pub pickups: Vec<Pickup>,
    pub grants: Vec<PowerUpKind>,
    pub boost: bool,
    pub obstacle_hit: bool,
    pub removed_obstacles: HashSet<EntityId>,
    pub removed_coins: HashSet<EntityId>,
    /// Obstacles smashed while invulnerable
    pub destroyed_by_dash: Vec<EntityId>,
}


/// Test the avatar against every obstacle, then (only if nothing hit)
/// against every coin
pub fn resolve(avatar: &Aabb, invulnerable: bool, obstacles: &[Obstacle], coins: &[Coin], tuning: &Tuning) -> CollisionOutcome {
    let mut out = CollisionOutcome::default();

    for obstacle in obstacles {
        if !avatar.overlaps(&obstacle.bounds(), tuning.obstacle_hit_margin) {
            continue;
        }
        if invulnerable {
            if tuning.invulnerable_destroys_obstacles {
                out.removed_obstacles.insert(obstacle.id);
                out.destroyed_by_dash.push(obstacle.id);
            }
            // Otherwise passes straight through
            continue;
        }
        out.time_delta -= tuning.hit_penalty_s;
        out.combo = ComboDelta::Reset;
        out.obstacle_hit = true;
        out.removed_obstacles.insert(obstacle.id);
    }

    if out.obstacle_hit {
        return out;
    }

    let mut combo_gain = 0;
    for coin in coins {
        if !avatar.overlaps(&coin.bounds(), tuning.coin_pickup_margin) {
            continue;
        }
        let coin_type = coin.kind.coin_type;
        out.time_delta += coin.kind.bonus_s;
        combo_gain += 1;
        out.score_increments.push(tuning.coin_score);
        out.pickups.push(Pickup {
            id: coin.id,
            coin_type,
            bonus_s: coin.kind.bonus_s,
        });
        if let Some(kind) = coin_type.power_up() {
            out.grants.push(kind);
        }
        if coin_type.triggers_boost() {
            out.boost = true;
        }
        out.removed_coins.insert(coin.id);
    }
    out.combo = ComboDelta::Add(combo_gain);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{CoinKind, ObstacleKind, ObstacleShape};
    use glam::Vec2;

    fn avatar_box(tuning: &Tuning) -> Aabb {
        Aabb::from_bottom_left(
            Vec2::new(tuning.avatar_x, 0.0),
            Vec2::new(tuning.avatar_width, tuning.avatar_height),
        )
    }

    fn obstacle(id: u32, x: f32) -> Obstacle {
        Obstacle {
            id: EntityId(id),
            kind: ObstacleKind {
                shape: ObstacleShape::Square,
                large: false,
            },
            pos: Vec2::new(x, 0.0),
            size: Vec2::splat(40.0),
        }
    }

    fn coin(id: u32, x: f32, y: f32, coin_type: CoinType) -> Coin {
        Coin {
            id: EntityId(id),
            kind: CoinKind { coin_type, bonus_s: 2.0 },
            pos: Vec2::new(x, y),
            size: Vec2::splat(28.0),
        }
    }

    #[test]
    fn test_hit_applies_penalty_and_reset() {
        let tuning = Tuning::default();
        let out = resolve(&avatar_box(&tuning), false, &[obstacle(1, 90.0)], &[], &tuning);
        assert!(out.obstacle_hit);
        assert_eq!(out.combo, ComboDelta::Reset);
        assert_eq!(out.time_delta, -tuning.hit_penalty_s);
        assert!(out.removed_obstacles.contains(&EntityId(1)));
    }

    #[test]
    fn test_each_overlapping_obstacle_is_a_hit() {
        let tuning = Tuning::default();
        let obstacles = [obstacle(1, 70.0), obstacle(2, 95.0)];
        let out = resolve(&avatar_box(&tuning), false, &obstacles, &[], &tuning);
        assert_eq!(out.removed_obstacles.len(), 2);
        assert_eq!(out.time_delta, -2.0 * tuning.hit_penalty_s);
    }

    #[test]
    fn test_hit_suppresses_coin_pickup() {
        let tuning = Tuning::default();
        let coins = [coin(10, 85.0, 20.0, CoinType::Green)];
        let out = resolve(&avatar_box(&tuning), false, &[obstacle(1, 90.0)], &coins, &tuning);
        assert!(out.obstacle_hit);
        assert!(out.pickups.is_empty());
        assert!(out.score_increments.is_empty());
        assert!(out.removed_coins.is_empty());
    }

    #[test]
    fn test_invulnerable_destroys_without_penalty() {
        let tuning = Tuning::default();
        let coins = [coin(10, 85.0, 20.0, CoinType::Green)];
        let out = resolve(&avatar_box(&tuning), true, &[obstacle(1, 90.0)], &coins, &tuning);
        assert!(!out.obstacle_hit);
        assert_eq!(out.destroyed_by_dash, vec![EntityId(1)]);
        // Coins still collected while dashing
        assert_eq!(out.pickups.len(), 1);
        assert_eq!(out.combo, ComboDelta::Add(1));
    }

    #[test]
    fn test_invulnerable_without_destroy_ignores_obstacle() {
        let tuning = Tuning {
            invulnerable_destroys_obstacles: false,
            ..Default::default()
        };
        let out = resolve(&avatar_box(&tuning), true, &[obstacle(1, 90.0)], &[], &tuning);
        assert!(out.removed_obstacles.is_empty());
        assert!(!out.obstacle_hit);
        assert_eq!(out.time_delta, 0.0);
        assert_eq!(out.combo, ComboDelta::Add(0));
    }

    #[test]
    fn test_coin_effects() {
        let tuning = Tuning::default();
        let coins = [
            coin(10, 85.0, 10.0, CoinType::Yellow),
            coin(11, 100.0, 30.0, CoinType::Green),
            coin(12, 600.0, 30.0, CoinType::White),
        ];
        let out = resolve(&avatar_box(&tuning), false, &[], &coins, &tuning);
        assert_eq!(out.combo, ComboDelta::Add(2));
        assert_eq!(out.score_increments, vec![tuning.coin_score; 2]);
        assert_eq!(out.time_delta, 4.0);
        assert_eq!(out.grants, vec![PowerUpKind::DoubleJump]);
        assert!(out.boost);
        assert!(!out.removed_coins.contains(&EntityId(12)));
    }

    #[test]
    fn test_near_miss_obstacle_is_not_a_hit() {
        let tuning = Tuning::default();
        // Overlaps by 5px horizontally; the -10 margin needs more
        let out = resolve(&avatar_box(&tuning), false, &[obstacle(1, 115.0)], &[], &tuning);
        assert!(!out.obstacle_hit);
    }
}
