//! Session progression
//!
//! `GameState` is the single authority on level, score, strikes and the level
//! timer. It never touches targets; the host feeds it hit/miss verdicts and
//! acts on the [`Outcome`] values it returns.

use std::rc::Rc;

use rand::SeedableRng;
use rand::seq::IndexedRandom;
use rand_pcg::Pcg32;

use super::outcome::{CultureHit, EndReason, Hud, LevelConfig, Outcome, ProblemHit, Stats};
use crate::audio::{AudioSink, Cue};
use crate::tuning::{GameConfig, LevelDefinition};

/// Progress of one play session
pub struct GameState {
    /// 0-based, always within the level table
    pub level_index: usize,
    /// Problems hit this level
    pub score: u32,
    /// Problems hit over the whole session
    pub total_solved: u32,
    /// Problems that escaped over the whole session
    pub total_missed: u32,
    /// Decoys hit (only reset by a new session)
    pub strikes: u32,
    /// Seconds left on the level timer
    pub time_remaining: f32,
    pub is_playing: bool,
    pub is_paused: bool,
    pub game_over: bool,
    pub victory: bool,
    /// Session clock (ms) of the last spawn; `None` spawns straight away
    pub last_spawn_ms: Option<f64>,
    /// Spawns requested this level
    pub spawn_count: u32,

    config: Rc<GameConfig>,
    audio: Rc<dyn AudioSink>,
    rng: Pcg32,
}

impl GameState {
    pub fn new(config: Rc<GameConfig>, audio: Rc<dyn AudioSink>, seed: u64) -> Self {
        let mut state = Self {
            level_index: 0,
            score: 0,
            total_solved: 0,
            total_missed: 0,
            strikes: 0,
            time_remaining: 0.0,
            is_playing: false,
            is_paused: false,
            game_over: false,
            victory: false,
            last_spawn_ms: None,
            spawn_count: 0,
            config,
            audio,
            rng: Pcg32::seed_from_u64(seed),
        };
        state.reset();
        state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Back to a fresh, not-yet-started session
    pub fn reset(&mut self) {
        self.level_index = 0;
        self.score = 0;
        self.total_solved = 0;
        self.total_missed = 0;
        self.strikes = 0;
        self.time_remaining = self.current_level().time_limit_secs as f32;
        self.is_playing = false;
        self.is_paused = false;
        self.game_over = false;
        self.victory = false;
        self.last_spawn_ms = None;
        self.spawn_count = 0;
    }

    /// Begin a new session at the first level. Safe to call repeatedly.
    pub fn start_game(&mut self) {
        self.reset();
        self.is_playing = true;
        self.time_remaining = self.current_level().time_limit_secs as f32;
        self.audio.resume();
        log::info!("Session started at {}", self.level_name());
    }

    pub fn current_level(&self) -> &LevelDefinition {
        &self.config.levels[self.level_index]
    }

    pub fn level_name(&self) -> &str {
        &self.current_level().name
    }

    /// Hits required to clear the current level
    pub fn target_hits(&self) -> u32 {
        self.current_level().target_hits
    }

    pub fn max_strikes(&self) -> u32 {
        self.config.max_strikes
    }

    pub fn strikes_remaining(&self) -> u32 {
        self.max_strikes().saturating_sub(self.strikes)
    }

    pub fn is_final_level(&self) -> bool {
        self.level_index + 1 >= self.config.level_count()
    }

    pub fn hit_problem(&mut self) -> ProblemHit {
        self.warn_if_idle("hit_problem");
        self.score += 1;
        self.total_solved += 1;
        self.audio.play(Cue::CorrectHit);

        ProblemHit {
            delta: 1,
            score: self.score,
            target: self.target_hits(),
        }
    }

    pub fn hit_culture(&mut self) -> CultureHit {
        self.warn_if_idle("hit_culture");
        self.strikes += 1;
        self.audio.play(Cue::Penalty);

        if self.strikes >= self.max_strikes() {
            return CultureHit::Fired {
                outcome: self.end_game(EndReason::Fired),
            };
        }

        CultureHit::Strike {
            strikes: self.strikes,
            max_strikes: self.max_strikes(),
        }
    }

    /// A problem target escaped
    pub fn miss_problem(&mut self) {
        self.warn_if_idle("miss_problem");
        self.total_missed += 1;
        self.audio.play(Cue::Miss);
    }

    /// Count the level timer down. Returns the level-end outcome once it hits zero.
    pub fn update_timer(&mut self, dt: f32) -> Option<Outcome> {
        if !self.is_playing || self.is_paused {
            return None;
        }

        self.time_remaining -= dt;
        if self.time_remaining <= 0.0 {
            self.time_remaining = 0.0;
            return Some(self.check_level_end());
        }
        None
    }

    /// Decide what the end of the level means.
    ///
    /// Reaching the hit target always advances. Otherwise a hit ratio of at
    /// least `min_success_rate` still advances, and anything less demotes (or
    /// ends the session on the first level).
    pub fn check_level_end(&mut self) -> Outcome {
        if self.score >= self.target_hits() {
            return self.advance_level();
        }

        let ratio = self.score as f64 / self.target_hits() as f64;
        if ratio >= self.config.min_success_rate {
            self.advance_level()
        } else {
            self.demote_or_end()
        }
    }

    pub fn advance_level(&mut self) -> Outcome {
        if self.is_final_level() {
            return self.end_game(EndReason::Victory);
        }

        self.level_index += 1;
        self.audio.play(Cue::LevelUp);
        log::info!("Promoted to {}", self.level_name());

        let level_number = self.level_index as u32 + 1;
        Outcome::LevelUp {
            new_level: self.level_index,
            level_name: self.level_name().to_string(),
            message: self.config.messages.promotion(level_number).to_string(),
        }
    }

    pub fn demote_or_end(&mut self) -> Outcome {
        if self.level_index == 0 {
            return self.end_game(EndReason::Performance);
        }

        self.level_index -= 1;
        log::info!("Demoted to {}", self.level_name());

        Outcome::Demote {
            new_level: self.level_index,
            level_name: self.level_name().to_string(),
            message: self.config.messages.demotion.clone(),
        }
    }

    /// Fresh timer and score for the current level (after a promotion or demotion)
    pub fn start_level(&mut self) {
        self.score = 0;
        self.time_remaining = self.current_level().time_limit_secs as f32;
        self.last_spawn_ms = None;
        self.spawn_count = 0;
    }

    pub fn end_game(&mut self, reason: EndReason) -> Outcome {
        self.is_playing = false;
        self.game_over = true;

        if reason == EndReason::Victory {
            self.victory = true;
            self.audio.play(Cue::Victory);
            log::info!("Session won: {} solved", self.total_solved);
            return Outcome::Victory {
                stats: self.stats(),
            };
        }

        self.audio.play(Cue::GameOver);
        let pool = match reason {
            EndReason::Fired => &self.config.messages.fired,
            _ => &self.config.messages.performance,
        };
        let message = pool.choose(&mut self.rng).cloned().unwrap_or_default();
        log::info!("Session over ({:?}) at {}", reason, self.level_name());

        Outcome::GameOver {
            reason,
            message,
            stats: self.stats(),
        }
    }

    pub fn stats(&self) -> Stats {
        Stats {
            final_level: self.level_name().to_string(),
            level_index: self.level_index + 1,
            total_levels: self.config.level_count(),
            problems_solved: self.total_solved,
            problems_missed: self.total_missed,
            culture_violations: self.strikes,
            success_rate: Stats::success_rate(self.total_solved, self.total_missed),
        }
    }

    /// Whether the spawn interval has passed since the last spawn
    pub fn should_spawn(&self, now_ms: f64) -> bool {
        if !self.is_playing || self.is_paused {
            return false;
        }
        match self.last_spawn_ms {
            None => true,
            Some(last) => now_ms - last >= self.current_level().spawn_interval_ms as f64,
        }
    }

    pub fn record_spawn(&mut self, now_ms: f64) {
        self.last_spawn_ms = Some(now_ms);
        self.spawn_count += 1;
    }

    /// Flip pause, returning the new state
    pub fn toggle_pause(&mut self) -> bool {
        self.is_paused = !self.is_paused;
        self.is_paused
    }

    pub fn level_config(&self) -> LevelConfig {
        let level = self.current_level();
        LevelConfig {
            problem_ratio: level.problem_ratio,
            visible_ms: level.visible_ms,
            max_active: level.max_active,
            spawn_interval_ms: level.spawn_interval_ms,
        }
    }

    pub fn hud(&self) -> Hud {
        Hud {
            level_name: self.level_name().to_string(),
            score: self.score,
            target: self.target_hits(),
            time_remaining: self.time_remaining.ceil() as u32,
            strikes: self.strikes,
            strikes_remaining: self.strikes_remaining(),
            max_strikes: self.max_strikes(),
            paused: self.is_paused,
        }
    }

    fn warn_if_idle(&self, op: &str) {
        if !self.is_playing {
            log::warn!("{op} called while no session is playing");
        }
    }
}
