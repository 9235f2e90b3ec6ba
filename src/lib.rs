//! Corporate Whack - a whack-a-mole arcade game about office life
//!
//! Core modules:
//! - `sim`: Deterministic gameplay (session progression, target lifecycle, hit-testing)
//! - `tuning`: Data-driven level table, target catalog and message pools
//! - `audio`: Audio cue port (Web Audio synthesis in the browser)
//! - `settings`: Player preferences
//! - `platform`: Browser bindings for the JS host

pub mod audio;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use audio::{AudioSink, Cue, SilentAudio};
pub use settings::Settings;
pub use tuning::{ConfigError, GameConfig, LevelDefinition, TargetKind};

/// Game configuration constants
pub mod consts {
    /// Rise animation duration (ms)
    pub const RISE_MS: f64 = 200.0;
    /// Fall animation duration (ms)
    pub const FALL_MS: f64 = 150.0;
    /// Squash animation duration after a hit (ms)
    pub const HIT_MS: f64 = 200.0;

    /// Target height when fully hidden in its slot
    pub const HIDDEN_Y: f32 = -0.8;
    /// Target height when fully raised
    pub const RAISED_Y: f32 = 0.3;
    /// Idle bob while raised
    pub const BOB_AMPLITUDE: f32 = 0.05;
    pub const BOB_PERIOD_MS: f64 = 100.0;
    /// Fraction of height lost at the end of the squash
    pub const HIT_SQUASH: f32 = 0.8;
    /// Sink speed while squashing (units/s)
    pub const HIT_SINK_SPEED: f32 = 2.0;

    /// Target body (upright cylinder)
    pub const TARGET_RADIUS: f32 = 0.35;
    pub const TARGET_HEIGHT: f32 = 0.6;
    /// Normalized slot coordinates are scaled by this into world units
    pub const SLOT_SPACING: f32 = 2.0;

    /// Largest frame delta fed to the simulation (s)
    pub const MAX_FRAME_DT: f32 = 0.1;
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Ease-out with a slight overshoot past 1.0 before settling
#[inline]
pub fn ease_out_back(t: f32) -> f32 {
    const C1: f32 = 1.70158;
    const C3: f32 = C1 + 1.0;
    let t = t - 1.0;
    1.0 + C3 * t.powi(3) + C1 * t.powi(2)
}

/// Quadratic ease-in
#[inline]
pub fn ease_in_quad(t: f32) -> f32 {
    t * t
}
