//! Frame tick
//!
//! Drives one session frame in a fixed order: level timer, spawn check,
//! target animation, escape reconciliation, then the pointer hit-test.

use std::rc::Rc;

use glam::Vec2;
use serde::Serialize;

use super::outcome::{CultureHit, Feedback, Hud, Outcome};
use super::pick::PickCamera;
use super::state::GameState;
use super::targets::{HitVerdict, Removal, TargetId, TargetManager, TargetPhase};
use crate::audio::AudioSink;
use crate::consts::MAX_FRAME_DT;
use crate::tuning::GameConfig;

/// Input for a single frame
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Whack at this pointer position (normalized device coordinates)
    pub pointer: Option<Vec2>,
    /// Pause toggle
    pub pause: bool,
    /// Idle/demo mode - AI plays the game
    pub idle_mode: bool,
}

/// Everything the presentation layer needs from one frame
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub hud: Hud,
    /// Level transition or session end produced this frame
    pub outcome: Option<Outcome>,
    pub feedback: Option<Feedback>,
    /// Text to flash at the pointer ("+1" / "HR WARNING!")
    pub feedback_text: Option<&'static str>,
    pub hit: Option<HitVerdict>,
    pub removed: Vec<Removal>,
    /// Problems that escaped this frame
    pub escaped: u32,
}

/// A session plus its targets
pub struct Game {
    pub state: GameState,
    pub targets: TargetManager,
    pub camera: PickCamera,
    /// Session clock (ms); stands still while paused
    pub clock_ms: f64,
    /// Promotion or demotion waiting for the player to continue
    pending: Option<Outcome>,
}

impl Game {
    pub fn new(config: Rc<GameConfig>, audio: Rc<dyn AudioSink>, seed: u64) -> Self {
        Self {
            state: GameState::new(config.clone(), audio.clone(), seed),
            targets: TargetManager::new(config, audio, seed.wrapping_add(1)),
            camera: PickCamera::default(),
            clock_ms: 0.0,
            pending: None,
        }
    }

    /// Start a fresh session
    pub fn start(&mut self) {
        self.targets.clear_all();
        self.pending = None;
        self.clock_ms = 0.0;
        self.state.start_game();
    }

    /// Start over after a game over or victory
    pub fn restart(&mut self) {
        self.start();
    }

    /// Resume play after a promotion or demotion screen.
    ///
    /// Returns false if no transition was waiting.
    pub fn continue_level(&mut self) -> bool {
        let Some(outcome) = self.pending.take() else {
            return false;
        };
        log::debug!("Continuing after {}", outcome.headline());
        self.state.is_paused = false;
        self.state.start_level();
        self.targets.clear_all();
        true
    }

    pub fn pending(&self) -> Option<&Outcome> {
        self.pending.as_ref()
    }

    /// Pointer position that lands on a target's current body
    pub fn pointer_for(&self, id: TargetId) -> Option<Vec2> {
        let target = self.targets.get(id)?;
        let body = self.targets.body(target)?;
        Some(self.camera.project(body.center))
    }

    fn park(&mut self, outcome: &Outcome) {
        if matches!(outcome, Outcome::LevelUp { .. } | Outcome::Demote { .. }) {
            self.state.is_paused = true;
            self.pending = Some(outcome.clone());
        }
    }
}

/// Advance the session by one frame of `dt` seconds
pub fn tick(game: &mut Game, input: &TickInput, dt: f32) -> TickReport {
    let mut report = TickReport {
        hud: game.state.hud(),
        outcome: None,
        feedback: None,
        feedback_text: None,
        hit: None,
        removed: Vec::new(),
        escaped: 0,
    };

    // Pause is locked while a transition screen is up
    if input.pause && game.state.is_playing && game.pending.is_none() {
        let paused = game.state.toggle_pause();
        log::debug!("Paused: {}", paused);
    }

    let mut input = *input;
    if input.idle_mode {
        if game.pending.is_some() {
            game.continue_level();
        }
        input.pointer = idle_aim(game);
    }

    if !game.state.is_playing || game.state.is_paused {
        report.hud = game.state.hud();
        return report;
    }

    // A NaN delta would poison every clock for the rest of the session
    let dt = if dt.is_finite() {
        dt.clamp(0.0, MAX_FRAME_DT)
    } else {
        0.0
    };
    game.clock_ms += dt as f64 * 1000.0;

    // Level timer
    if let Some(outcome) = game.state.update_timer(dt) {
        return finish(game, report, outcome);
    }

    // Spawn
    let level = game.state.level_config();
    if game.state.should_spawn(game.clock_ms) && game.targets.active_count() < level.max_active {
        game.targets.spawn_target(level.problem_ratio, level.visible_ms);
        game.state.record_spawn(game.clock_ms);
    }

    // Animate, then charge every escaped problem as a miss
    report.removed = game.targets.update(dt);
    for removal in &report.removed {
        if removal.escaped && removal.is_problem {
            game.state.miss_problem();
            report.escaped += 1;
        }
    }

    // Whack
    if let Some(point) = input.pointer
        && let Some(verdict) = game.targets.check_hit(point, &game.camera)
    {
        let is_problem = verdict.is_problem;
        report.hit = Some(verdict);
        if is_problem {
            report.give(Feedback::Good);
            let hit = game.state.hit_problem();
            if hit.score >= hit.target {
                let outcome = game.state.check_level_end();
                return finish(game, report, outcome);
            }
        } else {
            report.give(Feedback::Bad);
            if let CultureHit::Fired { outcome } = game.state.hit_culture() {
                return finish(game, report, outcome);
            }
        }
    }

    report.hud = game.state.hud();
    report
}

impl TickReport {
    fn give(&mut self, feedback: Feedback) {
        self.feedback = Some(feedback);
        self.feedback_text = Some(feedback.text());
    }
}

fn finish(game: &mut Game, mut report: TickReport, outcome: Outcome) -> TickReport {
    game.park(&outcome);
    report.hud = game.state.hud();
    report.outcome = Some(outcome);
    report
}

/// Demo player: whack the oldest fully raised problem
fn idle_aim(game: &Game) -> Option<Vec2> {
    game.targets
        .active()
        .iter()
        .find(|t| t.is_problem && t.phase == TargetPhase::Visible)
        .and_then(|t| game.pointer_for(t.id))
}
