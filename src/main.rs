//! Cuboneon Arena entry point
//!
//! Browser: canvas 2D rendering driven by requestAnimationFrame.
//! Native: a seeded headless run with a simple autopilot, for quick balance checks.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlInputElement};

    use cuboneon_arena::audio::{AudioSink, SoundCue, WebAudio};
    use cuboneon_arena::persistence::{LocalStore, PreferenceStore};
    use cuboneon_arena::platform::{Action, FocusGuard};
    use cuboneon_arena::ranking::{RankingReport, RankingService, ScoreSubmission, remote};
    use cuboneon_arena::sim::{EntityView, PlayerInfo, RunSummary, Simulation, TickInput, ViewKind};
    use cuboneon_arena::telemetry::{TelemetrySink, WindowTelemetry};
    use cuboneon_arena::{LocalRanking, Tuning};

    /// Pixels of floor drawn under the ground line
    const FLOOR_PX: f64 = 24.0;

    struct Game {
        sim: Simulation,
        guard: FocusGuard,
        input: TickInput,
        audio: WebAudio,
        telemetry: WindowTelemetry,
        store: LocalStore,
        ctx: CanvasRenderingContext2d,
        canvas_size: (f64, f64),
        ranking_url: Option<String>,
        /// A frame callback is registered
        looping: bool,
    }

    impl Game {
        fn now() -> f64 {
            web_sys::window()
                .and_then(|w| w.performance())
                .map(|p| p.now())
                .unwrap_or_else(js_sys::Date::now)
        }

        fn start(&mut self) {
            let player = read_player();
            let now = Self::now();
            self.sim.start(player, now, &self.store);
            self.audio.set_muted(self.sim.state().is_muted());
            self.audio.resume();
            self.guard = FocusGuard::default();
            set_text("ranking", "");
            set_class("game-over", "hidden");
        }

        fn handle_action(&mut self, action: Action) {
            let running = self.sim.state().is_running();
            match action {
                Action::Jump if running => self.input.jump = true,
                Action::Dash if running => self.input.dash = true,
                Action::AirCombo if running => self.input.air_combo = true,
                Action::TogglePause if running => {
                    self.guard.on_manual_pause();
                    self.sim.toggle_pause(Self::now());
                }
                Action::ToggleMute => {
                    let muted = self.sim.toggle_mute(&mut self.store);
                    self.audio.set_muted(muted);
                    self.flush_telemetry();
                }
                Action::Confirm | Action::Jump if !running => {
                    self.audio.play(SoundCue::ButtonClick);
                    self.start();
                }
                _ => {}
            }
        }

        fn update(&mut self, time: f64) {
            let input = std::mem::take(&mut self.input);
            self.sim.tick(time, &input);

            for event in self.sim.drain_events() {
                if let Some(cue) = SoundCue::for_event(&event) {
                    self.audio.play(cue);
                }
            }
            self.flush_telemetry();
        }

        fn flush_telemetry(&mut self) {
            let events = self.sim.drain_telemetry();
            self.telemetry.record_all(&events);
        }

        fn render(&self) {
            let (w, h) = self.canvas_size;
            let tuning = self.sim.tuning();
            let scale = w / f64::from(tuning.arena_width);
            let ground = h - FLOOR_PX;

            self.ctx.set_fill_style_str("#0b0221");
            self.ctx.fill_rect(0.0, 0.0, w, h);
            self.ctx.set_fill_style_str("#2de2e6");
            self.ctx.fill_rect(0.0, ground, w, 2.0);

            for view in self.sim.entity_views() {
                self.ctx.set_fill_style_str(view_color(&view));
                let x = f64::from(view.x) * scale;
                let vw = f64::from(view.w) * scale;
                let vh = f64::from(view.h) * scale;
                let y = ground - f64::from(view.y) * scale - vh;
                self.ctx.fill_rect(x, y, vw, vh);
            }
        }

        fn update_hud(&self) {
            let state = self.sim.state();
            set_text("score", &state.score().to_string());
            set_text("time", &format!("{:.1}", state.time_remaining()));
            set_text("combo", &format!("x{}", state.combo()));
            set_text("level", &(state.level() + 1).to_string());

            let power_ups = state.power_ups();
            let held: Vec<&str> = cuboneon_arena::sim::PowerUpKind::ALL
                .iter()
                .filter(|&&k| power_ups.count(k) > 0)
                .map(|k| match k {
                    cuboneon_arena::sim::PowerUpKind::Dash => "DASH",
                    cuboneon_arena::sim::PowerUpKind::DoubleJump => "2JUMP",
                    cuboneon_arena::sim::PowerUpKind::AirCombo => "AIR",
                })
                .collect();
            set_text("powerups", &held.join(" "));
            set_class("paused", if state.is_paused() { "" } else { "hidden" });
        }

        fn finish(&mut self, summary: RunSummary) {
            set_class("game-over", "");
            set_text("final-score", &format!("{}, your final score: {}", summary.name, summary.score));
            set_text("ranking", "Submitting score and loading ranking...");

            let submission = ScoreSubmission::from(&summary);
            match self.ranking_url.clone() {
                Some(url) => {
                    wasm_bindgen_futures::spawn_local(async move {
                        let report = remote::submit_and_fetch(&url, &submission).await;
                        show_report(&report);
                    });
                }
                None => {
                    let mut local = LocalRanking::new(self.store);
                    show_report(&local.report(&submission));
                }
            }
        }
    }

    fn view_color(view: &EntityView) -> &'static str {
        match (view.kind, view.visual) {
            (ViewKind::Avatar, "dashing") => "#ff2a6d",
            (ViewKind::Avatar, _) => "#f9f871",
            (ViewKind::Obstacle, _) => "#d1f7ff",
            (ViewKind::Coin, "green") => "#39ff14",
            (ViewKind::Coin, "blue") => "#1f51ff",
            (ViewKind::Coin, "violet") => "#bc13fe",
            (ViewKind::Coin, "yellow") => "#ffea00",
            (ViewKind::Coin, _) => "#ffffff",
        }
    }

    fn document() -> Option<Document> {
        web_sys::window()?.document()
    }

    fn set_text(id: &str, text: &str) {
        if let Some(el) = document().and_then(|d| d.get_element_by_id(id)) {
            el.set_text_content(Some(text));
        }
    }

    fn set_class(id: &str, class: &str) {
        if let Some(el) = document().and_then(|d| d.get_element_by_id(id)) {
            let _ = el.set_attribute("class", class);
        }
    }

    fn input_value(id: &str) -> String {
        document()
            .and_then(|d| d.get_element_by_id(id))
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
            .map(|input| input.value())
            .unwrap_or_default()
    }

    fn read_player() -> PlayerInfo {
        PlayerInfo::new(&input_value("player-name"), &input_value("player-email"))
    }

    fn show_report(report: &RankingReport) {
        let Some(doc) = document() else { return };
        let Some(container) = doc.get_element_by_id("ranking") else {
            return;
        };
        container.set_text_content(None);
        for line in report.lines() {
            if let Ok(p) = doc.create_element("p") {
                p.set_text_content(Some(&line));
                let _ = container.append_child(&p);
            }
        }
    }

    /// Page-provided balance overrides from `<script id="tuning" type="application/json">`
    fn load_tuning(doc: &Document) -> Tuning {
        let Some(json) = doc.get_element_by_id("tuning").and_then(|el| el.text_content()) else {
            return Tuning::default();
        };
        Tuning::from_json(&json).unwrap_or_else(|e| {
            log::warn!("Ignoring invalid tuning: {e}");
            Tuning::default()
        })
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).map_err(|e| JsValue::from_str(&e.to_string()))?;

        log::info!("Cuboneon Arena starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let canvas: HtmlCanvasElement = document.get_element_by_id("canvas").ok_or("no canvas")?.dyn_into()?;
        let dpr = window.device_pixel_ratio();
        let width = f64::from(canvas.client_width()) * dpr;
        let height = f64::from(canvas.client_height()) * dpr;
        canvas.set_width(width as u32);
        canvas.set_height(height as u32);

        let ctx: CanvasRenderingContext2d = canvas.get_context("2d")?.ok_or("no 2d context")?.dyn_into()?;

        let ranking_url = document.body().and_then(|b| b.dataset().get("rankingUrl"));
        let seed = js_sys::Date::now() as u64;
        let store = LocalStore;
        let mut audio = WebAudio::new();
        audio.set_muted(store.get(cuboneon_arena::consts::MUTE_KEY).is_some_and(|v| v == "true"));

        let game = Rc::new(RefCell::new(Game {
            sim: Simulation::new(load_tuning(&document), seed),
            guard: FocusGuard::default(),
            input: TickInput::default(),
            audio,
            telemetry: WindowTelemetry,
            store,
            ctx,
            canvas_size: (width, height),
            ranking_url,
            looping: false,
        }));
        log::info!("Game initialized with seed: {seed}");

        setup_keyboard(game.clone());
        setup_touch(&canvas, game.clone());
        setup_focus_handling(game.clone());

        game.borrow().render();
        Ok(())
    }

    fn ensure_loop(game: &Rc<RefCell<Game>>) {
        let mut g = game.borrow_mut();
        if g.sim.state().is_running() && !g.looping {
            g.looping = true;
            drop(g);
            request_animation_frame(game.clone());
        }
    }

    fn setup_keyboard(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
            let Some(action) = Action::from_key(&event.code(), &event.key()) else {
                return;
            };
            event.prevent_default();
            game.borrow_mut().handle_action(action);
            ensure_loop(&game);
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_touch(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::TouchEvent| {
            game.borrow_mut().handle_action(Action::Jump);
            ensure_loop(&game);
        });
        let _ = canvas.add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_focus_handling(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let Some(doc) = window.document() else { return };

        // Tab visibility
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let hidden = document()
                    .map(|d| d.visibility_state() == web_sys::VisibilityState::Hidden)
                    .unwrap_or(false);
                let mut g = game.borrow_mut();
                let Game { sim, guard, .. } = &mut *g;
                if hidden {
                    guard.on_blur(sim);
                    log::info!("Auto-paused (tab hidden)");
                } else {
                    guard.on_focus(sim, Game::now());
                }
            });
            let _ = doc.add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Window blur
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                let Game { sim, guard, .. } = &mut *g;
                guard.on_blur(sim);
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Window focus
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                let Game { sim, guard, .. } = &mut *g;
                guard.on_focus(sim, Game::now());
            });
            let _ = window.add_event_listener_with_callback("focus", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        let keep_going = {
            let mut g = game.borrow_mut();
            g.update(time);
            g.render();
            g.update_hud();

            if let Some(summary) = g.sim.take_summary() {
                g.finish(summary);
            }
            g.looping = g.sim.state().is_running();
            g.looping
        };

        // Game over drops the frame registration
        if keep_going {
            request_animation_frame(game);
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use cuboneon_arena::audio::{AudioSink, SilentAudio, SoundCue};
    use cuboneon_arena::persistence::MemoryStore;
    use cuboneon_arena::ranking::{RankingService, ScoreSubmission};
    use cuboneon_arena::sim::{PlayerInfo, PowerUpKind, Simulation, TickInput};
    use cuboneon_arena::telemetry::{LogTelemetry, TelemetrySink};
    use cuboneon_arena::{LocalRanking, Tuning};

    env_logger::init();
    log::info!("Cuboneon Arena (native) starting headless run...");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(7);
    let tuning = match std::env::args().nth(2) {
        Some(path) => match std::fs::read_to_string(&path).map(|json| Tuning::from_json(&json)) {
            Ok(Ok(tuning)) => tuning,
            Ok(Err(e)) => {
                log::warn!("Invalid tuning in {path}: {e}");
                Tuning::default()
            }
            Err(e) => {
                log::warn!("Cannot read {path}: {e}");
                Tuning::default()
            }
        },
        None => Tuning::default(),
    };

    let store = MemoryStore::default();
    let mut audio = SilentAudio::default();
    let mut telemetry = LogTelemetry;
    let mut sim = Simulation::new(tuning, seed);
    sim.start(PlayerInfo::new("Autopilot", ""), 0.0, &store);

    // 60 FPS until the clock runs out (capped at ten minutes of game time)
    let frame_ms = 1000.0 / 60.0;
    let mut now = 0.0;
    while sim.state().is_running() && now < 600_000.0 {
        let input = autopilot(&sim);
        sim.tick(now, &input);
        for event in sim.drain_events() {
            if let Some(cue) = SoundCue::for_event(&event) {
                audio.play(cue);
            }
        }
        telemetry.record_all(&sim.drain_telemetry());
        now += frame_ms;
    }
    sim.teardown();

    let Some(summary) = sim.take_summary() else {
        println!("Run stopped after {:.1}s without finishing", now / 1000.0);
        return;
    };
    println!(
        "Seed {seed}: scored {} reaching level {} in {:.1}s ({} cues)",
        summary.score,
        summary.level + 1,
        now / 1000.0,
        audio.played.len()
    );

    let mut ranking = LocalRanking::new(store);
    for line in ranking.report(&ScoreSubmission::from(&summary)).lines() {
        println!("{line}");
    }

    fn autopilot(sim: &Simulation) -> TickInput {
        let tuning = sim.tuning();
        let avatar_right = tuning.avatar_x + tuning.avatar_width;
        // Jump when an obstacle is about a fifth of a second away
        let reach = sim.speed() * 0.2;
        let threat = sim.obstacles().active().iter().any(|o| {
            let gap = o.pos.x - avatar_right;
            (0.0..reach).contains(&gap)
        });
        let state = sim.state();
        let falling_into_threat = threat && sim.avatar().is_airborne() && sim.avatar().vel_y < 0.0;
        TickInput {
            jump: (threat && !sim.avatar().is_airborne())
                || (falling_into_threat && state.has_power_up(PowerUpKind::DoubleJump)),
            dash: threat && state.has_power_up(PowerUpKind::Dash),
            air_combo: falling_into_threat
                && state.has_power_up(PowerUpKind::AirCombo)
                && !sim.avatar().double_jump_available(),
        }
    }
}
