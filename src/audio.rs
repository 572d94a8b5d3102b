//! Sound cues
//!
//! The simulation emits `GameEvent`s; this module maps them to named cues and
//! plays them. In the browser every cue is a short procedural oscillator
//! sequence, so there are no audio files to load.

use crate::sim::{CoinType, GameEvent};

/// Named sound effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Jump,
    DoubleJump,
    Coin(CoinType),
    HitObstacle,
    DashDestroyObstacle,
    LevelUp,
    Dash,
    AirCombo,
    PowerUpGrant,
    GameOver,
    ButtonClick,
}

impl SoundCue {
    /// Cue for a gameplay event, if it has one
    pub fn for_event(event: &GameEvent) -> Option<Self> {
        Some(match event {
            GameEvent::Jump => SoundCue::Jump,
            GameEvent::DoubleJump => SoundCue::DoubleJump,
            GameEvent::Dash => SoundCue::Dash,
            GameEvent::AirCombo => SoundCue::AirCombo,
            GameEvent::CoinCollected { coin, .. } => SoundCue::Coin(*coin),
            GameEvent::PowerUpGranted(_) => SoundCue::PowerUpGrant,
            GameEvent::ObstacleHit { .. } => SoundCue::HitObstacle,
            GameEvent::ObstacleDestroyed(_) => SoundCue::DashDestroyObstacle,
            GameEvent::LevelUp(_) => SoundCue::LevelUp,
            GameEvent::GameOver { .. } => SoundCue::GameOver,
            GameEvent::ObstaclesDodged(_) | GameEvent::BoostStarted => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            SoundCue::Jump => "jump",
            SoundCue::DoubleJump => "doubleJump",
            SoundCue::Coin(CoinType::Green) => "coinGreen",
            SoundCue::Coin(CoinType::Blue) => "coinBlue",
            SoundCue::Coin(CoinType::Violet) => "coinViolet",
            SoundCue::Coin(CoinType::Yellow) => "coinYellow",
            SoundCue::Coin(CoinType::White) => "coinWhite",
            SoundCue::HitObstacle => "hitObstacle",
            SoundCue::DashDestroyObstacle => "dashDestroyObstacle",
            SoundCue::LevelUp => "levelUp",
            SoundCue::Dash => "dash",
            SoundCue::AirCombo => "airCombo",
            SoundCue::PowerUpGrant => "powerupGrant",
            SoundCue::GameOver => "gameOver",
            SoundCue::ButtonClick => "buttonClick",
        }
    }

    /// Oscillator recipe for this cue
    pub fn tone(self) -> Tone {
        use Waveform::*;
        match self {
            SoundCue::Jump => Tone::sweep(Triangle, 220.0, 520.0, 0.15, 0.3),
            SoundCue::DoubleJump => Tone::sweep(Triangle, 380.0, 820.0, 0.15, 0.3),
            SoundCue::Coin(coin) => {
                // Brighter coins chime higher
                let base = match coin {
                    CoinType::Green => 660.0,
                    CoinType::Blue => 740.0,
                    CoinType::Violet => 830.0,
                    CoinType::Yellow => 880.0,
                    CoinType::White => 990.0,
                };
                Tone::arpeggio(Sine, &[base, base * 1.5], 0.06, 0.12, 0.25)
            }
            SoundCue::HitObstacle => Tone::sweep(Sawtooth, 180.0, 50.0, 0.25, 0.4),
            SoundCue::DashDestroyObstacle => Tone::sweep(Square, 900.0, 120.0, 0.12, 0.2),
            SoundCue::LevelUp => Tone::arpeggio(Triangle, &[400.0, 500.0, 600.0, 800.0], 0.1, 0.4, 0.3),
            SoundCue::Dash => Tone::sweep(Sawtooth, 300.0, 1200.0, 0.18, 0.25),
            SoundCue::AirCombo => Tone::arpeggio(Square, &[520.0, 780.0], 0.05, 0.1, 0.2),
            SoundCue::PowerUpGrant => Tone::arpeggio(Sine, &[600.0, 800.0, 1000.0], 0.08, 0.15, 0.25),
            SoundCue::GameOver => Tone::arpeggio(Sine, &[400.0, 350.0, 300.0, 200.0], 0.2, 0.3, 0.3),
            SoundCue::ButtonClick => Tone::sweep(Sine, 500.0, 500.0, 0.05, 0.2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Procedural sound: one or more notes with an exponential fade
#[derive(Debug, Clone, PartialEq)]
pub struct Tone {
    pub waveform: Waveform,
    /// (start frequency, end frequency) per note
    pub notes: Vec<(f32, f32)>,
    /// Offset between note starts (s)
    pub step_s: f64,
    /// Fade length of each note (s)
    pub decay_s: f64,
    pub gain: f32,
}

impl Tone {
    fn sweep(waveform: Waveform, from: f32, to: f32, decay_s: f64, gain: f32) -> Self {
        Self {
            waveform,
            notes: vec![(from, to)],
            step_s: 0.0,
            decay_s,
            gain,
        }
    }

    fn arpeggio(waveform: Waveform, freqs: &[f32], step_s: f64, decay_s: f64, gain: f32) -> Self {
        Self {
            waveform,
            notes: freqs.iter().map(|&f| (f, f)).collect(),
            step_s,
            decay_s,
            gain,
        }
    }

    /// Total playing time (s)
    pub fn duration(&self) -> f64 {
        self.step_s * self.notes.len().saturating_sub(1) as f64 + self.decay_s
    }
}

/// Fire-and-forget cue playback
pub trait AudioSink {
    fn play(&mut self, cue: SoundCue);
    fn set_muted(&mut self, muted: bool);
}

/// Logs cues instead of playing them (native, tests)
#[derive(Debug, Default)]
pub struct SilentAudio {
    muted: bool,
    pub played: Vec<SoundCue>,
}

impl AudioSink for SilentAudio {
    fn play(&mut self, cue: SoundCue) {
        if self.muted {
            return;
        }
        log::trace!("cue: {}", cue.name());
        self.played.push(cue);
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebAudio;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, AudioContextState, GainNode, OscillatorNode, OscillatorType};

    use super::{AudioSink, SoundCue, Tone, Waveform};

    /// Web Audio oscillator playback
    pub struct WebAudio {
        ctx: Option<AudioContext>,
        volume: f32,
        muted: bool,
    }

    impl Default for WebAudio {
        fn default() -> Self {
            Self::new()
        }
    }

    impl WebAudio {
        pub fn new() -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                volume: 0.8,
                muted: false,
            }
        }

        /// Resume the context (browsers require a user gesture)
        pub fn resume(&self) {
            if let Some(ctx) = &self.ctx {
                let _ = ctx.resume();
            }
        }

        fn create_osc(ctx: &AudioContext, freq: f32, waveform: Waveform) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(match waveform {
                Waveform::Sine => OscillatorType::Sine,
                Waveform::Square => OscillatorType::Square,
                Waveform::Sawtooth => OscillatorType::Sawtooth,
                Waveform::Triangle => OscillatorType::Triangle,
            });
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        fn play_tone(ctx: &AudioContext, tone: &Tone, vol: f32) {
            for (i, &(from, to)) in tone.notes.iter().enumerate() {
                let Some((osc, gain)) = Self::create_osc(ctx, from, tone.waveform) else {
                    continue;
                };
                let t = ctx.current_time() + i as f64 * tone.step_s;
                let end = t + tone.decay_s;

                gain.gain().set_value_at_time(vol * tone.gain, t).ok();
                gain.gain().exponential_ramp_to_value_at_time(0.01, end).ok();
                if from != to {
                    osc.frequency().set_value_at_time(from, t).ok();
                    osc.frequency().exponential_ramp_to_value_at_time(to, end).ok();
                }

                osc.start_with_when(t).ok();
                osc.stop_with_when(end + 0.05).ok();
            }
        }
    }

    impl AudioSink for WebAudio {
        fn play(&mut self, cue: SoundCue) {
            if self.muted || self.volume <= 0.0 {
                return;
            }
            let Some(ctx) = &self.ctx else { return };

            if ctx.state() == AudioContextState::Suspended {
                let _ = ctx.resume();
            }
            Self::play_tone(ctx, &cue.tone(), self.volume);
        }

        fn set_muted(&mut self, muted: bool) {
            self.muted = muted;
        }
    }
}
