//! Spawn scheduling
//!
//! Each scheduler keeps at most one pending fire-at entry on the shared
//! `Timeline`. The loop pops due entries, lets the owning scheduler spawn,
//! then asks it for a fresh delay computed from the current run state.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;
use rand_pcg::Pcg32;

use super::entity::{Coin, CoinKind, EntityId, IdAllocator, Obstacle, ObstacleKind};
use super::state::CoinType;
use crate::tuning::Tuning;

/// Which scheduler a timeline entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpawnTimer {
    Obstacle,
    Coin,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    fire_at: f64,
    timer: SpawnTimer,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, earliest fire time must pop first.
        // Ties go to the obstacle timer.
        other
            .fire_at
            .total_cmp(&self.fire_at)
            .then_with(|| timer_rank(other.timer).cmp(&timer_rank(self.timer)))
    }
}

fn timer_rank(timer: SpawnTimer) -> u8 {
    match timer {
        SpawnTimer::Obstacle => 0,
        SpawnTimer::Coin => 1,
    }
}

/// Min-heap of fire-at timestamps (ms), one entry per timer at most
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    heap: BinaryHeap<Pending>,
}

impl Timeline {
    /// Schedule `timer` to fire at `fire_at`, replacing any pending entry
    pub fn schedule(&mut self, timer: SpawnTimer, fire_at: f64) {
        self.cancel(timer);
        self.heap.push(Pending { fire_at, timer });
    }

    pub fn cancel(&mut self, timer: SpawnTimer) {
        self.heap.retain(|p| p.timer != timer);
    }

    pub fn cancel_all(&mut self) {
        self.heap.clear();
    }

    /// Fire time of the pending entry for `timer`
    pub fn pending(&self, timer: SpawnTimer) -> Option<f64> {
        self.heap.iter().find(|p| p.timer == timer).map(|p| p.fire_at)
    }

    /// Pop the earliest entry if it is due at `now`
    pub fn pop_due(&mut self, now: f64) -> Option<SpawnTimer> {
        if self.heap.peek()?.fire_at <= now {
            self.heap.pop().map(|p| p.timer)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

/// Run-state snapshot the schedulers read when spawning or rescheduling
#[derive(Debug, Clone, Copy)]
pub struct SpawnContext {
    pub now: f64,
    pub combo: u32,
    pub level: usize,
    /// Current horizontal speed (px/s)
    pub speed: f32,
    pub rate_modifier: f64,
}

fn elapsed_since(last: Option<f64>, now: f64) -> f64 {
    match last {
        Some(t) => now - t,
        None => f64::INFINITY,
    }
}

// === Obstacles ===

#[derive(Debug, Clone, Default)]
pub struct ObstacleScheduler {
    obstacles: Vec<Obstacle>,
    last_spawn_ms: Option<f64>,
    consecutive: u32,
}

impl ObstacleScheduler {
    pub fn active(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub(crate) fn active_mut(&mut self) -> &mut [Obstacle] {
        &mut self.obstacles
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Forget the consecutive streak (called on every hit)
    pub fn reset_consecutive(&mut self) {
        self.consecutive = 0;
    }

    /// Remove by identity; unknown ids are ignored
    pub fn remove(&mut self, ids: &HashSet<EntityId>) {
        if ids.is_empty() {
            return;
        }
        self.obstacles.retain(|o| !ids.contains(&o.id));
    }

    /// Drop every obstacle whose right edge has left the arena, returning how many
    pub(crate) fn sweep_off_screen(&mut self) -> u32 {
        let before = self.obstacles.len();
        self.obstacles.retain(|o| !o.is_off_screen());
        (before - self.obstacles.len()) as u32
    }

    pub fn clear_pending_spawn(&self, timeline: &mut Timeline) {
        timeline.cancel(SpawnTimer::Obstacle);
    }

    /// Milliseconds until the next spawn
    pub fn next_delay(&self, tuning: &Tuning, ctx: &SpawnContext) -> f64 {
        let mut interval = tuning.obstacle_base_interval_ms;
        if ctx.combo >= 3 {
            let steps = (ctx.combo - 2).min(10) as i32;
            interval *= tuning.obstacle_rate_decrease_factor.powi(steps);
        }
        if self.consecutive >= tuning.max_consecutive_obstacles {
            interval *= tuning.consecutive_break_multiplier;
        }

        let speed = f64::from(ctx.speed.max(1.0));
        let visual_gap_ms = f64::from(tuning.min_obstacle_visual_gap_px) / speed * 1000.0;
        let min_gap = visual_gap_ms + tuning.obstacle_min_gap_ms;

        let elapsed = elapsed_since(self.last_spawn_ms, ctx.now);
        min_gap.max(interval * ctx.rate_modifier - elapsed)
    }

    /// Schedule the next fire on the timeline
    pub fn schedule(&self, tuning: &Tuning, ctx: &SpawnContext, timeline: &mut Timeline) {
        timeline.schedule(SpawnTimer::Obstacle, ctx.now + self.next_delay(tuning, ctx));
    }

    /// Timer fired: spawn one obstacle (maybe two), returning how many
    pub fn fire(
        &mut self,
        tuning: &Tuning,
        ctx: &SpawnContext,
        rng: &mut Pcg32,
        ids: &mut IdAllocator,
    ) -> usize {
        let max = tuning.max_consecutive_obstacles;
        if self.consecutive >= max {
            // The elongated break has elapsed
            self.consecutive = 0;
        }
        self.last_spawn_ms = Some(ctx.now);

        let Some(first) = build_obstacle(tuning, ctx.level, tuning.arena_width, rng, ids) else {
            return 0;
        };
        let first_right = first.right();
        self.obstacles.push(first);
        self.consecutive += 1;

        if ctx.combo >= 3 && rng.random_bool(tuning.obstacle_double_chance.clamp(0.0, 1.0)) && self.consecutive < max {
            let gap = tuning.min_obstacle_visual_gap_px + rng.random::<f32>() * tuning.arena_width * 0.05;
            if let Some(second) = build_obstacle(tuning, ctx.level, first_right + gap, rng, ids) {
                self.obstacles.push(second);
                self.consecutive += 1;
                return 2;
            }
        }
        1
    }

    pub fn clear(&mut self) {
        self.obstacles.clear();
        self.last_spawn_ms = None;
        self.consecutive = 0;
    }

    #[cfg(test)]
    pub(crate) fn insert_for_test(&mut self, ids: &mut IdAllocator, x: f32, y: f32) -> EntityId {
        let shape = super::entity::ObstacleShape::Square;
        let id = ids.next_id();
        self.obstacles.push(Obstacle {
            id,
            kind: ObstacleKind { shape, large: false },
            pos: Vec2::new(x, y),
            size: shape.size(),
        });
        id
    }
}

fn build_obstacle(tuning: &Tuning, level: usize, left: f32, rng: &mut Pcg32, ids: &mut IdAllocator) -> Option<Obstacle> {
    let Some(&shape) = tuning.shape_pool(level).choose(rng) else {
        log::warn!("No obstacle shapes configured for level {level}");
        return None;
    };

    let large = shape.large_capable() && level >= 2 && rng.random_bool(tuning.obstacle_large_chance.clamp(0.0, 1.0));
    let mut size = shape.size();
    if large {
        size *= tuning.large_obstacle_scale;
    }

    Some(Obstacle {
        id: ids.next_id(),
        kind: ObstacleKind { shape, large },
        pos: Vec2::new(left, tuning.ground_y),
        size,
    })
}

// === Coins ===

#[derive(Debug, Clone, Default)]
pub struct CoinScheduler {
    coins: Vec<Coin>,
    last_spawn_ms: Option<f64>,
}

impl CoinScheduler {
    pub fn active(&self) -> &[Coin] {
        &self.coins
    }

    pub(crate) fn active_mut(&mut self) -> &mut [Coin] {
        &mut self.coins
    }

    pub fn remove(&mut self, ids: &HashSet<EntityId>) {
        if ids.is_empty() {
            return;
        }
        self.coins.retain(|c| !ids.contains(&c.id));
    }

    pub(crate) fn sweep_off_screen(&mut self) -> u32 {
        let before = self.coins.len();
        self.coins.retain(|c| !c.is_off_screen());
        (before - self.coins.len()) as u32
    }

    pub fn clear_pending_spawn(&self, timeline: &mut Timeline) {
        timeline.cancel(SpawnTimer::Coin);
    }

    /// Milliseconds until the next spawn (includes a random jitter)
    pub fn next_delay(&self, tuning: &Tuning, ctx: &SpawnContext, rng: &mut Pcg32) -> f64 {
        let mut interval = tuning.coin_base_interval_ms;
        if ctx.combo >= 6 {
            interval *= tuning.coin_interval_combo6_multiplier;
        }
        interval += rng.random::<f64>() * tuning.coin_interval_randomness_ms;

        let elapsed = elapsed_since(self.last_spawn_ms, ctx.now);
        tuning.coin_min_interval_ms.max(interval - elapsed)
    }

    pub fn schedule(&self, tuning: &Tuning, ctx: &SpawnContext, rng: &mut Pcg32, timeline: &mut Timeline) {
        let delay = self.next_delay(tuning, ctx, rng);
        timeline.schedule(SpawnTimer::Coin, ctx.now + delay);
    }

    /// Timer fired: spawn the level's coin type. Returns the spawned type.
    pub fn fire(
        &mut self,
        tuning: &Tuning,
        ctx: &SpawnContext,
        rng: &mut Pcg32,
        ids: &mut IdAllocator,
    ) -> Option<CoinType> {
        self.last_spawn_ms = Some(ctx.now);

        let Some(rule) = tuning.level_rule(ctx.level) else {
            log::warn!("No coin spawn rule for level {}", ctx.level);
            return None;
        };
        let coin_type = rule.spawn;

        let width = tuning.arena_width;
        let height = tuning.arena_height;
        let x = width + rng.random::<f32>() * width * 0.1;

        // Keep coins inside the band the avatar can reach
        let estimated_jump = height * 0.175;
        let band_min = estimated_jump * 0.5;
        let band_max = (height * 0.65).min(height - estimated_jump * 1.5).max(band_min);
        let y = band_min + rng.random::<f32>() * (band_max - band_min);

        self.coins.push(Coin {
            id: ids.next_id(),
            kind: CoinKind {
                coin_type,
                bonus_s: tuning.coin_bonuses.get(coin_type),
            },
            pos: Vec2::new(x, y),
            size: Vec2::splat(tuning.coin_size),
        });
        Some(coin_type)
    }

    pub fn clear(&mut self) {
        self.coins.clear();
        self.last_spawn_ms = None;
    }

    #[cfg(test)]
    pub(crate) fn insert_for_test(&mut self, ids: &mut IdAllocator, x: f32, y: f32, coin_type: CoinType, bonus_s: f32) -> EntityId {
        let id = ids.next_id();
        self.coins.push(Coin {
            id,
            kind: CoinKind { coin_type, bonus_s },
            pos: Vec2::new(x, y),
            size: Vec2::splat(28.0),
        });
        id
    }
}
