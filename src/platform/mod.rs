//! Platform glue shared by the browser and headless drivers
//!
//! - Implicit pause when the window loses focus or the tab is hidden
//! - Keyboard mapping

use crate::sim::Simulation;

/// Pauses on blur/hidden and restores the previous pause state on refocus.
/// A run the player paused by hand stays paused.
#[derive(Debug, Default, Clone, Copy)]
pub struct FocusGuard {
    paused_by_blur: bool,
}

impl FocusGuard {
    pub fn paused_by_blur(&self) -> bool {
        self.paused_by_blur
    }

    /// Window blurred or tab hidden
    pub fn on_blur(&mut self, sim: &mut Simulation) {
        if sim.state().is_active() {
            self.paused_by_blur = true;
            sim.pause();
        }
    }

    /// Window focused or tab visible again
    pub fn on_focus(&mut self, sim: &mut Simulation, now: f64) {
        if !self.paused_by_blur {
            return;
        }
        self.paused_by_blur = false;
        if sim.state().is_paused() {
            sim.resume(now);
        }
    }

    /// Player toggled pause by hand; focus no longer owns the pause
    pub fn on_manual_pause(&mut self) {
        self.paused_by_blur = false;
    }
}

/// Keyboard actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Jump,
    Dash,
    AirCombo,
    TogglePause,
    ToggleMute,
    /// Start or restart from a menu screen
    Confirm,
}

impl Action {
    /// Map a `KeyboardEvent` (`code`, `key`) pair
    pub fn from_key(code: &str, key: &str) -> Option<Self> {
        match (code, key) {
            ("Space", _) | (_, " ") | ("ArrowUp", _) => Some(Action::Jump),
            ("KeyD", _) | (_, "d") => Some(Action::Dash),
            ("KeyC", _) | (_, "c") => Some(Action::AirCombo),
            ("KeyP", _) | (_, "p") => Some(Action::TogglePause),
            ("KeyM", _) | (_, "m") => Some(Action::ToggleMute),
            ("Enter", _) | (_, "Enter") => Some(Action::Confirm),
            _ => None,
        }
    }
}
