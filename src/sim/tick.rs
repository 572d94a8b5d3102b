//! Simulation loop
//!
//! `Simulation` owns everything one run needs: tuning, progression, avatar,
//! both schedulers, the spawn timeline and the seeded RNG. The driver calls
//! `tick` once per animation frame with a millisecond timestamp.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::avatar::Avatar;
use super::collision::{CollisionOutcome, ComboDelta, resolve};
use super::entity::{EntityView, IdAllocator, ViewKind};
use super::events::{GameEvent, TelemetryEvent};
use super::spawn::{CoinScheduler, ObstacleScheduler, SpawnContext, SpawnTimer, Timeline};
use super::state::{PlayerInfo, ProgressionState, RunPhase};
use crate::consts::MAX_FRAME_DT;
use crate::persistence::PreferenceStore;
use crate::tuning::Tuning;

/// Player actions sampled for one frame
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Jump key pressed (double tap in the air may dash)
    pub jump: bool,
    /// Explicit dash key
    pub dash: bool,
    pub air_combo: bool,
}

/// Final result handed to the ranking collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub name: String,
    pub email: String,
    pub score: u64,
    pub level: usize,
}

/// Frame timestamps to clamped deltas
#[derive(Debug, Clone, Copy, Default)]
struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    /// Seconds since the previous frame; `None` on the first frame
    fn advance(&mut self, now: f64) -> Option<f32> {
        let last = self.last_ms.replace(now)?;
        let dt = ((now - last) / 1000.0) as f32;
        Some(dt.clamp(0.0, MAX_FRAME_DT))
    }

    fn reset(&mut self) {
        self.last_ms = None;
    }
}

/// Horizontal speed for the current progression state
pub fn derive_speed(tuning: &Tuning, state: &ProgressionState) -> f32 {
    let boost = if state.is_boost_active() {
        tuning.boost_multiplier
    } else {
        1.0
    };
    let dash = if state.is_dashing() {
        tuning.dash_speed_bonus
    } else {
        0.0
    };
    tuning.base_speed
        * tuning.level_speed_multiplier(state.level())
        * tuning.combo_speed_multiplier(state.combo())
        * boost
        + dash
}

pub struct Simulation {
    tuning: Tuning,
    state: ProgressionState,
    avatar: Avatar,
    obstacles: ObstacleScheduler,
    coins: CoinScheduler,
    timeline: Timeline,
    rng: Pcg32,
    ids: IdAllocator,
    clock: FrameClock,
    speed: f32,
    /// Obstacles dodged since the last hit
    dodged_since_hit: u32,
    events: Vec<GameEvent>,
    summary: Option<RunSummary>,
}

impl Simulation {
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        let state = ProgressionState::new(tuning.max_time_cap_s);
        let avatar = Avatar::new(tuning.ground_y);
        let speed = derive_speed(&tuning, &state);
        Self {
            tuning,
            state,
            avatar,
            obstacles: ObstacleScheduler::default(),
            coins: CoinScheduler::default(),
            timeline: Timeline::default(),
            rng: Pcg32::seed_from_u64(seed),
            ids: IdAllocator::default(),
            clock: FrameClock::default(),
            speed,
            dodged_since_hit: 0,
            events: Vec::new(),
            summary: None,
        }
    }

    // === Accessors ===

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    pub fn avatar(&self) -> &Avatar {
        &self.avatar
    }

    pub fn obstacles(&self) -> &ObstacleScheduler {
        &self.obstacles
    }

    pub fn coins(&self) -> &CoinScheduler {
        &self.coins
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Speed derived on the last tick (px/s)
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn dodged_since_hit(&self) -> u32 {
        self.dodged_since_hit
    }

    // === Lifecycle ===

    /// Begin a fresh run at `now`
    pub fn start(&mut self, player: PlayerInfo, now: f64, store: &dyn PreferenceStore) {
        self.state.initialize(self.tuning.initial_time_s, store);
        self.state.set_player_info(player);
        self.state.observe_clock(now);
        self.state.set_phase(RunPhase::Running);

        self.avatar = Avatar::new(self.tuning.ground_y);
        self.obstacles.clear();
        self.coins.clear();
        self.timeline.cancel_all();
        self.ids = IdAllocator::default();
        self.clock.reset();
        self.dodged_since_hit = 0;
        self.events.clear();
        self.summary = None;
        self.speed = derive_speed(&self.tuning, &self.state);

        self.schedule_spawns(now);
        log::info!("Run started for {} at {now:.0}ms", self.state.player().name);
    }

    /// Freeze the run; pending spawns are dropped
    pub fn pause(&mut self) {
        if !self.state.is_active() {
            return;
        }
        self.state.set_phase(RunPhase::Paused);
        self.obstacles.clear_pending_spawn(&mut self.timeline);
        self.coins.clear_pending_spawn(&mut self.timeline);
        log::info!("Paused");
    }

    /// Continue a paused run; spawn timers restart from `now`
    pub fn resume(&mut self, now: f64) {
        if !self.state.is_paused() {
            return;
        }
        self.state.set_phase(RunPhase::Running);
        self.state.observe_clock(now);
        self.clock.reset();
        self.schedule_spawns(now);
        log::info!("Resumed at {now:.0}ms");
    }

    pub fn toggle_pause(&mut self, now: f64) {
        if self.state.is_paused() {
            self.resume(now);
        } else {
            self.pause();
        }
    }

    /// Cancel every pending timer and end the run without a summary
    pub fn teardown(&mut self) {
        self.timeline.cancel_all();
        if self.state.is_running() {
            self.state.set_phase(RunPhase::GameOver);
        }
        self.obstacles.clear();
        self.coins.clear();
    }

    // === Bonuses and preferences ===

    pub fn toggle_mute(&mut self, store: &mut dyn PreferenceStore) -> bool {
        self.state.toggle_mute(store)
    }

    pub fn set_player_info(&mut self, player: PlayerInfo) {
        self.state.set_player_info(player);
    }

    /// Permanent jump boost for the rest of the run
    pub fn add_jump_bonus(&mut self) {
        self.state.increment_jump_velocity_bonus(self.tuning.jump_bonus_increment);
    }

    pub fn enable_unlimited_mode(&mut self) {
        self.state.enable_unlimited_mode(self.tuning.unlimited_obstacle_rate_modifier);
        log::info!("Unlimited mode enabled");
    }

    // === Frame ===

    /// Advance one animation frame at timestamp `now` (ms)
    pub fn tick(&mut self, now: f64, input: &TickInput) {
        if !self.state.is_active() {
            return;
        }
        self.state.observe_clock(now);
        let Some(dt) = self.clock.advance(now) else {
            // First frame after start/resume only records the timestamp
            return;
        };

        self.handle_input(now, input);
        self.fire_due_timers(now);

        self.state.apply_time_delta(-dt);

        self.expire_windows(now);
        self.speed = derive_speed(&self.tuning, &self.state);

        self.avatar.update_physics(dt, &self.tuning);

        let dx = self.speed * dt;
        for obstacle in self.obstacles.active_mut() {
            obstacle.pos.x -= dx;
        }
        for coin in self.coins.active_mut() {
            coin.pos.x -= dx;
        }

        let dodged = self.obstacles.sweep_off_screen();
        self.coins.sweep_off_screen();

        let outcome = resolve(
            &self.avatar.bounds(&self.tuning),
            self.avatar.is_invulnerable(&self.tuning),
            self.obstacles.active(),
            self.coins.active(),
            &self.tuning,
        );
        self.apply_outcome(&outcome, now);

        if dodged > 0 && !outcome.obstacle_hit {
            self.state
                .increment_score(self.tuning.points_per_obstacle_dodged * u64::from(dodged));
            self.dodged_since_hit += dodged;
            self.events.push(GameEvent::ObstaclesDodged(dodged));
        }

        self.speed = derive_speed(&self.tuning, &self.state);

        if self.state.time_remaining() <= 0.0 {
            self.finish_run();
        }
    }

    fn handle_input(&mut self, now: f64, input: &TickInput) {
        let Self {
            tuning, state, avatar, events, ..
        } = self;
        if input.jump {
            events.extend(avatar.press_jump(now, tuning, state));
        }
        if input.dash {
            events.extend(avatar.activate_dash(now, tuning, state));
        }
        if input.air_combo {
            events.extend(avatar.activate_air_combo(tuning, state));
        }
    }

    fn spawn_context(&self, now: f64) -> SpawnContext {
        SpawnContext {
            now,
            combo: self.state.combo(),
            level: self.state.level(),
            speed: self.speed,
            rate_modifier: self.state.bonuses().obstacle_rate_modifier,
        }
    }

    fn schedule_spawns(&mut self, now: f64) {
        let ctx = self.spawn_context(now);
        self.obstacles.schedule(&self.tuning, &ctx, &mut self.timeline);
        self.coins.schedule(&self.tuning, &ctx, &mut self.rng, &mut self.timeline);
    }

    fn fire_due_timers(&mut self, now: f64) {
        // Collect first so a zero delay cannot fire twice in one frame
        let mut due = Vec::with_capacity(2);
        while let Some(timer) = self.timeline.pop_due(now) {
            due.push(timer);
        }

        for timer in due {
            let ctx = self.spawn_context(now);
            match timer {
                SpawnTimer::Obstacle => {
                    self.obstacles.fire(&self.tuning, &ctx, &mut self.rng, &mut self.ids);
                    self.obstacles.schedule(&self.tuning, &ctx, &mut self.timeline);
                }
                SpawnTimer::Coin => {
                    self.coins.fire(&self.tuning, &ctx, &mut self.rng, &mut self.ids);
                    self.coins
                        .schedule(&self.tuning, &ctx, &mut self.rng, &mut self.timeline);
                }
            }
        }
    }

    fn expire_windows(&mut self, now: f64) {
        if self.state.boost().expired(now) {
            self.state.set_boost_active(false, 0.0);
        }
        self.avatar.expire_dash(now, &mut self.state);
    }

    fn apply_outcome(&mut self, outcome: &CollisionOutcome, now: f64) {
        self.obstacles.remove(&outcome.removed_obstacles);
        self.coins.remove(&outcome.removed_coins);
        self.events
            .extend(outcome.destroyed_by_dash.iter().map(|&id| GameEvent::ObstacleDestroyed(id)));

        // Coin points use the combo from before this pass
        let combo_before = self.state.combo();
        self.state.apply_time_delta(outcome.time_delta);

        match outcome.combo {
            ComboDelta::Reset => {
                self.state.reset_after_hit();
                self.obstacles.reset_consecutive();
                self.dodged_since_hit = 0;
                self.events.push(GameEvent::ObstacleHit {
                    penalty_s: -outcome.time_delta,
                });
                log::debug!("Obstacle hit, progression reset");
                return;
            }
            ComboDelta::Add(n) => {
                let multiplier = u64::from(combo_before.max(1));
                for &points in &outcome.score_increments {
                    self.state.increment_score(points * multiplier);
                }
                for _ in 0..n {
                    self.state.increment_combo();
                }
            }
        }

        for pickup in &outcome.pickups {
            self.state.add_coin(pickup.coin_type);
            self.events.push(GameEvent::CoinCollected {
                coin: pickup.coin_type,
                bonus_s: pickup.bonus_s,
            });
        }
        for &kind in &outcome.grants {
            if self.state.grant_power_up(kind) {
                self.events.push(GameEvent::PowerUpGranted(kind));
            }
        }

        if !outcome.pickups.is_empty() {
            self.check_level_advance();
        }

        if outcome.boost {
            let end = now + f64::from(self.tuning.boost_duration_s) * 1000.0;
            self.state.set_boost_active(true, end);
            self.events.push(GameEvent::BoostStarted);
        }
    }

    fn check_level_advance(&mut self) {
        let level = self.state.level();
        let Some(rule) = self.tuning.level_rule(level) else {
            log::warn!("No level rule for level {level}");
            return;
        };
        let Some(advance) = rule.advance else {
            return;
        };
        if self.state.coin_count(advance.coin) < advance.count {
            return;
        }

        let next = (level + 1).min(self.tuning.level_count() - 1);
        self.state.reset_coin_counts(Some(advance.coin));
        if next != level {
            self.state.set_level(next);
            self.events.push(GameEvent::LevelUp(next));
            log::info!("Level up: {next}");
        }
    }

    fn finish_run(&mut self) {
        self.state.set_phase(RunPhase::GameOver);
        self.timeline.cancel_all();
        if self.avatar.is_dashing() {
            self.avatar.expire_dash(f64::INFINITY, &mut self.state);
        }
        self.state.set_boost_active(false, 0.0);

        let player = self.state.player();
        let summary = RunSummary {
            name: player.name.clone(),
            email: player.email.clone(),
            score: self.state.score(),
            level: self.state.level(),
        };
        log::info!("Game over: {} scored {}", summary.name, summary.score);
        self.events.push(GameEvent::GameOver { score: summary.score });
        self.summary = Some(summary);
    }

    // === Outputs ===

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn drain_telemetry(&mut self) -> Vec<TelemetryEvent> {
        self.state.drain_telemetry()
    }

    /// Final result, available once after game over
    pub fn take_summary(&mut self) -> Option<RunSummary> {
        self.summary.take()
    }

    /// Avatar first, then obstacles, then coins
    pub fn entity_views(&self) -> Vec<EntityView> {
        let bounds = self.avatar.bounds(&self.tuning);
        let size = bounds.max - bounds.min;
        let avatar = EntityView {
            kind: ViewKind::Avatar,
            visual: if self.avatar.is_dashing() {
                "dashing"
            } else if self.avatar.is_airborne() {
                "jumping"
            } else {
                "running"
            },
            x: bounds.min.x,
            y: bounds.min.y,
            w: size.x,
            h: size.y,
        };

        std::iter::once(avatar)
            .chain(self.obstacles.active().iter().map(EntityView::from))
            .chain(self.coins.active().iter().map(EntityView::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::sim::collision::Pickup;
    use crate::sim::entity::EntityId;
    use crate::sim::state::{CoinType, PowerUpKind};

    fn started(tuning: Tuning) -> Simulation {
        let mut sim = Simulation::new(tuning, 42);
        sim.start(PlayerInfo::new("Tester", "t@example.com"), 0.0, &MemoryStore::default());
        sim.tick(0.0, &TickInput::default());
        sim
    }

    fn coin_outcome(coins: &[CoinType]) -> CollisionOutcome {
        let tuning = Tuning::default();
        let mut out = CollisionOutcome {
            combo: ComboDelta::Add(coins.len() as u32),
            ..Default::default()
        };
        for (i, &coin_type) in coins.iter().enumerate() {
            let bonus_s = tuning.coin_bonuses.get(coin_type);
            out.time_delta += bonus_s;
            out.score_increments.push(tuning.coin_score);
            out.pickups.push(Pickup {
                id: EntityId(1000 + i as u32),
                coin_type,
                bonus_s,
            });
            out.grants.extend(coin_type.power_up());
            out.boost |= coin_type.triggers_boost();
        }
        out
    }

    fn hit_outcome() -> CollisionOutcome {
        CollisionOutcome {
            time_delta: -1.0,
            combo: ComboDelta::Reset,
            obstacle_hit: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_three_greens_advance_level() {
        let mut sim = started(Tuning::default());
        sim.state.add_coin(CoinType::Blue);
        for _ in 0..3 {
            sim.apply_outcome(&coin_outcome(&[CoinType::Green]), 100.0);
        }
        assert_eq!(sim.state.level(), 1);
        assert_eq!(sim.state.coin_count(CoinType::Green), 0);
        assert_eq!(sim.state.coin_count(CoinType::Blue), 1);
        assert!(sim.drain_events().contains(&GameEvent::LevelUp(1)));
    }

    #[test]
    fn test_level_holds_below_threshold() {
        let mut sim = started(Tuning::default());
        for _ in 0..2 {
            sim.apply_outcome(&coin_outcome(&[CoinType::Green]), 100.0);
        }
        assert_eq!(sim.state.level(), 0);
        assert_eq!(sim.state.coin_count(CoinType::Green), 2);
    }

    #[test]
    fn test_hit_resets_everything_and_multiplier() {
        let mut sim = started(Tuning::default());
        for _ in 0..5 {
            sim.state.increment_combo();
        }
        sim.state.set_level(2);
        sim.state.add_coin(CoinType::Violet);
        sim.state.grant_power_up(PowerUpKind::Dash);
        sim.state.grant_power_up(PowerUpKind::DoubleJump);
        sim.dodged_since_hit = 4;
        let ctx = sim.spawn_context(50.0);
        sim.obstacles.fire(&sim.tuning, &ctx, &mut sim.rng, &mut sim.ids);
        assert!(sim.obstacles().consecutive() > 0);

        sim.apply_outcome(&hit_outcome(), 100.0);

        assert_eq!(sim.state.combo(), 0);
        assert_eq!(sim.state.level(), 0);
        assert_eq!(sim.state.coin_counts().total(), 0);
        assert!(sim.state.power_ups().is_empty());
        assert_eq!(sim.dodged_since_hit(), 0);
        assert_eq!(sim.obstacles().consecutive(), 0);

        // Next pickup scores at max(1, 0) = 1
        let before = sim.state.score();
        sim.apply_outcome(&coin_outcome(&[CoinType::Green]), 200.0);
        assert_eq!(sim.state.score() - before, sim.tuning.coin_score);
    }

    #[test]
    fn test_level_checked_only_on_pickup_ticks() {
        let mut sim = started(Tuning::default());
        for _ in 0..3 {
            sim.state.add_coin(CoinType::Green);
        }
        sim.apply_outcome(&coin_outcome(&[]), 100.0);
        assert_eq!(sim.state.level(), 0);

        sim.apply_outcome(&coin_outcome(&[CoinType::Blue]), 200.0);
        assert_eq!(sim.state.level(), 1);
        assert_eq!(sim.state.coin_count(CoinType::Green), 0);
    }

    #[test]
    fn test_idle_simulation_never_spawns() {
        let mut sim = Simulation::new(Tuning::default(), 3);
        for i in 0..600 {
            sim.tick(f64::from(i) * 16.0, &TickInput::default());
        }
        assert!(sim.timeline().is_empty());
        assert!(sim.obstacles().active().is_empty());
        assert!(sim.coins().active().is_empty());
        assert_eq!(sim.state().phase(), RunPhase::Idle);
    }

    #[test]
    fn test_game_over_leaves_timers_inert() {
        let mut sim = started(Tuning::default());
        assert!(!sim.timeline().is_empty());
        let remaining = sim.state.time_remaining();
        sim.state.apply_time_delta(-remaining);
        sim.tick(16.0, &TickInput::default());
        assert_eq!(sim.state().phase(), RunPhase::GameOver);
        assert!(sim.timeline().is_empty());

        let obstacles = sim.obstacles().active().len();
        let coins = sim.coins().active().len();
        for i in 2..600 {
            sim.tick(f64::from(i) * 16.0, &TickInput::default());
        }
        assert!(sim.timeline().is_empty());
        assert_eq!(sim.obstacles().active().len(), obstacles);
        assert_eq!(sim.coins().active().len(), coins);
    }

    #[test]
    fn test_coin_score_uses_combo_before_pickup() {
        let mut sim = started(Tuning::default());
        for _ in 0..4 {
            sim.state.increment_combo();
        }
        sim.apply_outcome(&coin_outcome(&[CoinType::Green, CoinType::Green]), 100.0);
        assert_eq!(sim.state.score(), 2 * sim.tuning.coin_score * 4);
        assert_eq!(sim.state.combo(), 6);
    }

    #[test]
    fn test_boost_expires_after_window() {
        let mut sim = started(Tuning::default());
        sim.tick(1000.0, &TickInput::default());
        sim.apply_outcome(&coin_outcome(&[CoinType::Blue]), 1000.0);
        assert!(sim.state.is_boost_active());
        assert_eq!(sim.state.boost().end_ms, 6000.0);

        sim.tick(6100.0, &TickInput::default());
        assert!(!sim.state.is_boost_active());
        let expected = derive_speed(&sim.tuning, &sim.state);
        assert_eq!(sim.speed(), expected);
        assert!(
            (sim.speed()
                - sim.tuning.base_speed
                    * sim.tuning.level_speed_multiplier(sim.state.level())
                    * sim.tuning.combo_speed_multiplier(sim.state.combo()))
            .abs()
                < 1e-3
        );
    }

    #[test]
    fn test_dash_speed_is_additive() {
        let tuning = Tuning::default();
        let mut state = ProgressionState::new(tuning.max_time_cap_s);
        state.initialize(30.0, &MemoryStore::default());
        for _ in 0..6 {
            state.increment_combo();
        }
        state.set_dash_active(true, 10_000.0);
        let expected = tuning.base_speed * 1.0 * 1.5 * 1.0 + 800.0;
        assert!((derive_speed(&tuning, &state) - expected).abs() < 1e-3);
    }

    #[test]
    fn test_hit_suppresses_coin_and_dodge_in_same_tick() {
        let mut sim = started(Tuning::default());
        let x = sim.tuning.avatar_x + 10.0;
        sim.obstacles.insert_for_test(&mut sim.ids, x, 0.0);
        sim.coins.insert_for_test(&mut sim.ids, x, 20.0, CoinType::Green, 1.0);
        // One obstacle already past the left edge
        sim.obstacles.insert_for_test(&mut sim.ids, -200.0, 0.0);

        let score = sim.state.score();
        sim.tick(16.0, &TickInput::default());

        assert_eq!(sim.state.score(), score);
        assert_eq!(sim.state.combo(), 0);
        assert_eq!(sim.coins.active().len(), 1);
        let events = sim.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::ObstacleHit { .. })));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::ObstaclesDodged(_))));
    }

    #[test]
    fn test_dodge_bonus_without_hit() {
        let mut sim = started(Tuning::default());
        sim.obstacles.insert_for_test(&mut sim.ids, -200.0, 0.0);
        sim.obstacles.insert_for_test(&mut sim.ids, -300.0, 0.0);
        sim.tick(16.0, &TickInput::default());
        assert_eq!(sim.state.score(), 2 * sim.tuning.points_per_obstacle_dodged);
        assert_eq!(sim.dodged_since_hit(), 2);
        assert!(sim.obstacles.active().is_empty());
    }

    #[test]
    fn test_coin_pickup_through_tick() {
        let mut sim = started(Tuning::default());
        let x = sim.tuning.avatar_x + 5.0;
        sim.coins.insert_for_test(&mut sim.ids, x, 10.0, CoinType::Yellow, 4.0);
        let time = sim.state.time_remaining();
        sim.tick(16.0, &TickInput::default());
        assert_eq!(sim.state.combo(), 1);
        assert!(sim.state.has_power_up(PowerUpKind::DoubleJump));
        assert!(sim.state.is_boost_active());
        assert!(sim.state.time_remaining() > time + 3.9);
        assert!(sim.coins.active().is_empty());
    }

    #[test]
    fn test_time_stays_within_cap() {
        let mut sim = started(Tuning::default());
        for _ in 0..40 {
            sim.apply_outcome(&coin_outcome(&[CoinType::White]), 100.0);
        }
        assert_eq!(sim.state.time_remaining(), sim.tuning.max_time_cap_s);
    }

    #[test]
    fn test_first_frame_records_only() {
        let mut sim = Simulation::new(Tuning::default(), 1);
        sim.start(PlayerInfo::default(), 500.0, &MemoryStore::default());
        let time = sim.state.time_remaining();
        sim.tick(2000.0, &TickInput::default());
        assert_eq!(sim.state.time_remaining(), time);
        sim.tick(2050.0, &TickInput::default());
        assert!((sim.state.time_remaining() - (time - 0.05)).abs() < 1e-4);
    }

    #[test]
    fn test_stalled_frame_is_clamped() {
        let mut sim = started(Tuning::default());
        let time = sim.state.time_remaining();
        sim.tick(10_000.0, &TickInput::default());
        assert!((sim.state.time_remaining() - (time - MAX_FRAME_DT)).abs() < 1e-4);
    }

    #[test]
    fn test_timer_runs_out() {
        let tuning = Tuning {
            initial_time_s: 1.0,
            ..Default::default()
        };
        let mut sim = started(tuning);
        let mut now = 0.0;
        while sim.state.phase() == RunPhase::Running && now < 5000.0 {
            now += 100.0;
            sim.tick(now, &TickInput::default());
        }
        assert_eq!(sim.state.phase(), RunPhase::GameOver);
        assert_eq!(sim.state.time_remaining(), 0.0);
        assert!(sim.timeline().is_empty());
        assert!(sim.drain_events().iter().any(|e| matches!(e, GameEvent::GameOver { .. })));

        let summary = sim.take_summary().expect("summary after game over");
        assert_eq!(summary.name, "Tester");
        assert_eq!(summary.email, "t@example.com");
        assert!(sim.take_summary().is_none());

        // Ticks after game over do nothing
        let views = sim.entity_views();
        sim.tick(now + 100.0, &TickInput::default());
        assert_eq!(sim.entity_views(), views);
    }

    #[test]
    fn test_pause_cancels_timers_and_resume_reschedules() {
        let mut sim = started(Tuning::default());
        sim.tick(16.0, &TickInput::default());
        assert_eq!(sim.timeline().len(), 2);

        sim.pause();
        assert!(sim.state.is_paused());
        assert!(sim.state.is_running());
        assert!(sim.timeline().is_empty());

        let time = sim.state.time_remaining();
        sim.tick(60_000.0, &TickInput::default());
        assert_eq!(sim.state.time_remaining(), time);

        sim.resume(60_000.0);
        assert!(sim.timeline().pending(SpawnTimer::Obstacle).is_some_and(|t| t > 60_000.0));
        assert!(sim.timeline().pending(SpawnTimer::Coin).is_some_and(|t| t > 60_000.0));

        // No backlog of missed spawns
        sim.tick(60_000.0, &TickInput::default());
        sim.tick(60_016.0, &TickInput::default());
        assert!(sim.obstacles().active().is_empty());
        assert!(sim.coins().active().is_empty());
    }

    #[test]
    fn test_teardown_cancels_everything() {
        let mut sim = started(Tuning::default());
        sim.teardown();
        assert!(sim.timeline().is_empty());
        assert_eq!(sim.state.phase(), RunPhase::GameOver);
        assert!(sim.take_summary().is_none());
    }

    #[test]
    fn test_spawns_arrive_over_time() {
        let mut sim = started(Tuning::default());
        let mut now = 0.0;
        for _ in 0..200 {
            now += 16.0;
            sim.tick(now, &TickInput::default());
        }
        // At least one obstacle and one coin were spawned
        assert!(sim.ids.next_id().0 >= 2);
    }

    #[test]
    fn test_same_seed_replays_identically() {
        let run = || {
            let mut sim = started(Tuning::default());
            let mut now = 0.0;
            for frame in 0..900 {
                now += 16.0;
                let input = TickInput {
                    jump: frame % 45 == 0,
                    ..Default::default()
                };
                sim.tick(now, &input);
            }
            (sim.state.score(), sim.state.combo(), sim.entity_views())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_jump_input_emits_event() {
        let mut sim = started(Tuning::default());
        sim.tick(
            16.0,
            &TickInput {
                jump: true,
                ..Default::default()
            },
        );
        assert!(sim.avatar().is_airborne());
        assert!(sim.drain_events().contains(&GameEvent::Jump));
    }
}
