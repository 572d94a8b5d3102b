//! Avatar controller: jump physics and power-up actions
//!
//! States: grounded / airborne, with dashing orthogonal to both. Dashing
//! blocks jump input but gravity keeps integrating.

use glam::Vec2;

use super::entity::Aabb;
use super::events::GameEvent;
use super::state::{PowerUpKind, ProgressionState};
use crate::tuning::Tuning;

#[derive(Debug, Clone)]
pub struct Avatar {
    /// Height of the avatar's feet above the ground line
    pub y: f32,
    pub vel_y: f32,
    airborne: bool,
    double_jump_available: bool,
    /// Jump presses this flight
    jump_presses: u32,
    /// Dash end timestamp while dashing
    dash_end_ms: Option<f64>,
    last_press_ms: Option<f64>,
}

impl Default for Avatar {
    fn default() -> Self {
        Self {
            y: 0.0,
            vel_y: 0.0,
            airborne: false,
            double_jump_available: true,
            jump_presses: 0,
            dash_end_ms: None,
            last_press_ms: None,
        }
    }
}

impl Avatar {
    pub fn new(ground_y: f32) -> Self {
        Self {
            y: ground_y,
            ..Default::default()
        }
    }

    pub fn is_airborne(&self) -> bool {
        self.airborne
    }

    pub fn is_dashing(&self) -> bool {
        self.dash_end_ms.is_some()
    }

    pub fn double_jump_available(&self) -> bool {
        self.double_jump_available
    }

    pub fn jump_presses(&self) -> u32 {
        self.jump_presses
    }

    /// Obstacles cannot hurt the avatar
    pub fn is_invulnerable(&self, tuning: &Tuning) -> bool {
        self.is_dashing() && tuning.dash_invulnerable
    }

    pub fn bounds(&self, tuning: &Tuning) -> Aabb {
        Aabb::from_bottom_left(
            Vec2::new(tuning.avatar_x, self.y),
            Vec2::new(tuning.avatar_width, tuning.avatar_height),
        )
    }

    /// Launch velocity for a jump at the current level and combo
    pub fn jump_velocity(tuning: &Tuning, state: &ProgressionState) -> f32 {
        let base = tuning.base_jump_velocity * tuning.level_jump_multiplier(state.level())
            + state.bonuses().jump_velocity_bonus;
        let combo_mult = if state.combo() >= 3 {
            tuning.jump_combo_multiplier
        } else {
            1.0
        };
        base * combo_mult
    }

    /// Jump key pressed. Two presses within the double-tap window while
    /// airborne dash if a dash is available; otherwise this is a jump.
    pub fn press_jump(&mut self, now: f64, tuning: &Tuning, state: &mut ProgressionState) -> Option<GameEvent> {
        let double_tap = self
            .last_press_ms
            .is_some_and(|last| now - last <= tuning.double_tap_window_ms);
        self.last_press_ms = Some(now);

        if double_tap && self.airborne && self.can_dash(state) {
            return self.activate_dash(now, tuning, state);
        }
        self.jump(tuning, state)
    }

    /// Ground jump, or a second jump in the air when allowed
    pub fn jump(&mut self, tuning: &Tuning, state: &mut ProgressionState) -> Option<GameEvent> {
        if !state.is_active() || self.is_dashing() {
            return None;
        }

        let velocity = Self::jump_velocity(tuning, state);
        let on_ground = self.y <= tuning.ground_y + 1.0;

        if !self.airborne && on_ground {
            self.airborne = true;
            self.vel_y = velocity;
            self.jump_presses = 1;
            Some(GameEvent::Jump)
        } else if self.airborne && state.is_unlimited() {
            self.vel_y = velocity * tuning.double_jump_multiplier;
            self.jump_presses += 1;
            Some(GameEvent::DoubleJump)
        } else if self.airborne && self.double_jump_available && state.has_power_up(PowerUpKind::DoubleJump) {
            self.vel_y = velocity * tuning.double_jump_multiplier;
            state.consume_power_up(PowerUpKind::DoubleJump);
            self.double_jump_available = false;
            self.jump_presses = 2;
            Some(GameEvent::DoubleJump)
        } else {
            None
        }
    }

    fn can_dash(&self, state: &ProgressionState) -> bool {
        !self.is_dashing() && (state.is_unlimited() || state.has_power_up(PowerUpKind::Dash))
    }

    /// Start a dash; mirrors the window into progression state
    pub fn activate_dash(&mut self, now: f64, tuning: &Tuning, state: &mut ProgressionState) -> Option<GameEvent> {
        if !state.is_active() || !self.can_dash(state) {
            return None;
        }
        if !state.is_unlimited() {
            state.consume_power_up(PowerUpKind::Dash);
        }
        let end = now + f64::from(tuning.dash_duration_s) * 1000.0;
        self.dash_end_ms = Some(end);
        state.set_dash_active(true, end);
        log::debug!("Dash until {end:.0}ms");
        Some(GameEvent::Dash)
    }

    /// Spend an air combo mid-flight, optionally re-arming the double jump
    pub fn activate_air_combo(&mut self, tuning: &Tuning, state: &mut ProgressionState) -> Option<GameEvent> {
        if !state.is_active() || !self.airborne {
            return None;
        }
        if !state.is_unlimited() && !state.consume_power_up(PowerUpKind::AirCombo) {
            return None;
        }
        if tuning.air_combo_resets_double_jump {
            self.double_jump_available = true;
        }
        Some(GameEvent::AirCombo)
    }

    /// End the dash once the clock passes its end time. Returns true if it ended.
    pub fn expire_dash(&mut self, now: f64, state: &mut ProgressionState) -> bool {
        match self.dash_end_ms {
            Some(end) if now >= end => {
                self.dash_end_ms = None;
                state.set_dash_active(false, 0.0);
                true
            }
            _ => false,
        }
    }

    /// Integrate gravity; landing re-arms the double jump
    pub fn update_physics(&mut self, dt: f32, tuning: &Tuning) {
        self.vel_y -= tuning.gravity * dt;
        self.y += self.vel_y * dt;

        if self.y <= tuning.ground_y {
            self.y = tuning.ground_y;
            self.vel_y = 0.0;
            if self.airborne {
                self.airborne = false;
                self.double_jump_available = true;
                self.jump_presses = 0;
            }
        }
    }
}
