//! Audio cues
//!
//! Gameplay code only fires named cues through [`AudioSink`]. On the web the
//! cues are synthesized with the Web Audio API - no sound files needed.

/// Sound cues emitted by the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Problem target whacked
    CorrectHit,
    /// Decoy target whacked (strike)
    Penalty,
    /// Target popped out of its slot
    Popup,
    /// Problem target escaped unhit
    Miss,
    /// Promoted to the next level
    LevelUp,
    /// Fired or failed the performance review
    GameOver,
    /// Beat the final level
    Victory,
}

/// Fire-and-forget audio port
///
/// Implementations must never fail: a muted or uninitialized backend simply
/// ignores the cue.
pub trait AudioSink {
    fn play(&self, cue: Cue);

    /// Initialize or resume the backend (called on user gesture / game start)
    fn resume(&self) {}
}

/// Audio sink that plays nothing (tests, headless runs)
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play(&self, _cue: Cue) {}
}

#[cfg(target_arch = "wasm32")]
pub use web::WebAudio;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::{Cell, RefCell};

    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::{AudioSink, Cue};
    use crate::settings::Settings;

    /// Web Audio backend with procedurally generated cues
    pub struct WebAudio {
        ctx: RefCell<Option<AudioContext>>,
        volume: Cell<f32>,
    }

    impl WebAudio {
        /// Context is created lazily on the first `resume` (browsers require a
        /// user gesture before audio may start)
        pub fn new(settings: &Settings) -> Self {
            Self {
                ctx: RefCell::new(None),
                volume: Cell::new(settings.effective_volume()),
            }
        }

        /// Re-read volume/mute from settings
        pub fn apply_settings(&self, settings: &Settings) {
            self.volume.set(settings.effective_volume());
        }

        /// Create an oscillator routed through a gain node
        fn create_osc(
            &self,
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        /// Single oscillator with a frequency sweep and exponential decay
        fn sweep(
            &self,
            ctx: &AudioContext,
            vol: f32,
            osc_type: OscillatorType,
            (from, to): (f32, f32),
            peak: f32,
            duration: f64,
        ) {
            let Some((osc, gain)) = self.create_osc(ctx, from, osc_type) else {
                return;
            };
            let t = ctx.current_time();

            osc.frequency().set_value_at_time(from, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(to, t + duration * 0.66)
                .ok();
            gain.gain().set_value_at_time(vol * peak, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + duration)
                .ok();

            osc.start().ok();
            osc.stop_with_when(t + duration).ok();
        }

        /// Sequence of notes, each with its own envelope
        #[allow(clippy::too_many_arguments)]
        fn notes(
            &self,
            ctx: &AudioContext,
            vol: f32,
            osc_type: OscillatorType,
            notes: &[f32],
            spacing: f64,
            peak: f32,
            length: f64,
        ) {
            for (i, freq) in notes.iter().enumerate() {
                let Some((osc, gain)) = self.create_osc(ctx, *freq, osc_type) else {
                    continue;
                };
                let t = ctx.current_time() + i as f64 * spacing;
                gain.gain().set_value_at_time(0.0, t).ok();
                gain.gain()
                    .linear_ramp_to_value_at_time(vol * peak, t + 0.02)
                    .ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + length)
                    .ok();
                osc.start_with_when(t).ok();
                osc.stop_with_when(t + length).ok();
            }
        }

        /// Penalty buzz - dissonant sawtooth cluster
        fn play_buzz(&self, ctx: &AudioContext, vol: f32) {
            let t = ctx.current_time();
            for freq in [150.0, 153.0, 157.0, 160.0] {
                if let Some((osc, gain)) = self.create_osc(ctx, freq, OscillatorType::Sawtooth) {
                    gain.gain().set_value_at_time(vol * 0.2, t).ok();
                    gain.gain()
                        .exponential_ramp_to_value_at_time(0.01, t + 0.4)
                        .ok();
                    osc.start().ok();
                    osc.stop_with_when(t + 0.4).ok();
                }
            }
        }
    }

    impl AudioSink for WebAudio {
        fn resume(&self) {
            let mut ctx = self.ctx.borrow_mut();
            if ctx.is_none() {
                *ctx = AudioContext::new().ok();
                if ctx.is_none() {
                    log::warn!("Failed to create AudioContext - audio disabled");
                }
            }
            if let Some(ctx) = ctx.as_ref() {
                let _ = ctx.resume();
            }
        }

        fn play(&self, cue: Cue) {
            let vol = self.volume.get();
            if vol <= 0.0 {
                return;
            }

            let ctx = self.ctx.borrow();
            let Some(ctx) = ctx.as_ref() else { return };

            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            match cue {
                Cue::CorrectHit => {
                    self.sweep(ctx, vol, OscillatorType::Square, (800.0, 200.0), 0.3, 0.15)
                }
                Cue::Penalty => self.play_buzz(ctx, vol),
                Cue::Popup => {
                    self.sweep(ctx, vol, OscillatorType::Sine, (300.0, 600.0), 0.1, 0.08)
                }
                Cue::Miss => {
                    self.sweep(ctx, vol, OscillatorType::Sine, (400.0, 150.0), 0.1, 0.15)
                }
                Cue::LevelUp => self.notes(
                    ctx,
                    vol,
                    OscillatorType::Square,
                    &[523.25, 659.25, 783.99, 1046.5],
                    0.1,
                    0.2,
                    0.3,
                ),
                Cue::GameOver => self.notes(
                    ctx,
                    vol,
                    OscillatorType::Triangle,
                    &[400.0, 350.0, 300.0, 250.0],
                    0.2,
                    0.2,
                    0.25,
                ),
                Cue::Victory => self.notes(
                    ctx,
                    vol,
                    OscillatorType::Square,
                    &[523.25, 659.25, 783.99, 1046.5, 783.99, 1046.5],
                    0.12,
                    0.15,
                    0.4,
                ),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::{AudioSink, Cue};

    /// Records every cue for assertions
    #[derive(Debug, Default)]
    pub struct RecordingAudio {
        pub cues: RefCell<Vec<Cue>>,
        pub resumes: RefCell<u32>,
    }

    impl RecordingAudio {
        pub fn count(&self, cue: Cue) -> usize {
            self.cues.borrow().iter().filter(|c| **c == cue).count()
        }
    }

    impl AudioSink for RecordingAudio {
        fn play(&self, cue: Cue) {
            self.cues.borrow_mut().push(cue);
        }

        fn resume(&self) {
            *self.resumes.borrow_mut() += 1;
        }
    }
}
