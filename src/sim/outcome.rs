//! Typed results of session transitions
//!
//! Terminal and level-transition conditions are values the host matches on,
//! never errors.

use serde::Serialize;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// Too many strikes
    Fired,
    /// Failed the first level
    Performance,
    /// Cleared the final level
    Victory,
}

impl EndReason {
    /// Headline for the end screen
    pub fn title(&self) -> &'static str {
        match self {
            EndReason::Fired => "YOU'RE FIRED!",
            EndReason::Performance => "PERFORMANCE REVIEW",
            EndReason::Victory => "CONGRATULATIONS!",
        }
    }
}

/// Session summary shown on level transitions and end screens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub final_level: String,
    /// 1-based
    pub level_index: usize,
    pub total_levels: usize,
    pub problems_solved: u32,
    pub problems_missed: u32,
    /// Strikes taken
    pub culture_violations: u32,
    /// Percentage 0-100
    pub success_rate: u32,
}

impl Stats {
    /// `round(100 * solved / (solved + missed))`, or 0 before anything was solved
    pub fn success_rate(solved: u32, missed: u32) -> u32 {
        if solved == 0 {
            return 0;
        }
        (100.0 * solved as f64 / (solved + missed) as f64).round() as u32
    }
}

/// Result of a level-end evaluation or session termination
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outcome {
    /// Promoted; `new_level` is the 0-based index now in effect
    LevelUp {
        new_level: usize,
        level_name: String,
        message: String,
    },
    /// Demoted one level
    Demote {
        new_level: usize,
        level_name: String,
        message: String,
    },
    GameOver {
        reason: EndReason,
        message: String,
        stats: Stats,
    },
    Victory { stats: Stats },
}

impl Outcome {
    /// True for outcomes that end the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::GameOver { .. } | Outcome::Victory { .. })
    }

    /// One-line headline for the transition screen
    pub fn headline(&self) -> String {
        match self {
            Outcome::LevelUp { level_name, .. } => {
                format!("You've been promoted to {level_name}!")
            }
            Outcome::Demote { level_name, .. } => format!("Back to {level_name}."),
            Outcome::GameOver { reason, .. } => reason.title().to_string(),
            Outcome::Victory { .. } => EndReason::Victory.title().to_string(),
        }
    }
}

/// Result of whacking a problem target (the `success: true` payload; a
/// decoy hit reports through [`CultureHit`] instead)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProblemHit {
    /// Always +1
    pub delta: u32,
    /// In-level score after the hit
    pub score: u32,
    /// Hits required this level
    pub target: u32,
}

/// Result of whacking a decoy target (the `success: false` payload)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CultureHit {
    /// A strike was recorded but the session continues
    Strike { strikes: u32, max_strikes: u32 },
    /// The strike limit was reached; carries the `GameOver` outcome
    Fired { outcome: Outcome },
}

/// Short text flashed at the pointer after a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Good,
    Bad,
}

impl Feedback {
    pub fn text(&self) -> &'static str {
        match self {
            Feedback::Good => "+1",
            Feedback::Bad => "HR WARNING!",
        }
    }
}

/// Per-frame HUD snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hud {
    pub level_name: String,
    pub score: u32,
    pub target: u32,
    /// Whole seconds, rounded up
    pub time_remaining: u32,
    pub strikes: u32,
    pub strikes_remaining: u32,
    pub max_strikes: u32,
    pub paused: bool,
}

/// Spawn parameters of the current level
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelConfig {
    pub problem_ratio: f64,
    pub visible_ms: u32,
    pub max_active: usize,
    pub spawn_interval_ms: u32,
}
