//! Data-driven game balance
//!
//! Level progression, target catalog, slot layout and message pools. Loaded
//! once at startup and shared immutably for the whole session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One difficulty tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    /// 1-based ordinal, must match the level's position in the table
    pub id: u32,
    pub name: String,
    /// Problems to hit to pass the level outright
    pub target_hits: u32,
    pub time_limit_secs: u32,
    /// How long a target stays raised (ms)
    pub visible_ms: u32,
    /// Minimum gap between spawns (ms)
    pub spawn_interval_ms: u32,
    pub max_active: usize,
    /// Probability that a spawn is a problem rather than a decoy
    pub problem_ratio: f64,
    pub speed_multiplier: f32,
}

impl LevelDefinition {
    fn new(
        id: u32,
        name: &str,
        visible_ms: u32,
        spawn_interval_ms: u32,
        max_active: usize,
        problem_ratio: f64,
        speed_multiplier: f32,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            target_hits: 10,
            time_limit_secs: 60,
            visible_ms,
            spawn_interval_ms,
            max_active,
            problem_ratio,
            speed_multiplier,
        }
    }
}

/// A catalog entry for something that can pop out of a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetKind {
    pub id: String,
    pub label: String,
    /// Emoji drawn on the target's face
    pub marker: String,
    /// Body color (0xRRGGBB)
    pub color: u32,
}

impl TargetKind {
    fn new(id: &str, marker: &str, label: &str, color: u32) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            marker: marker.to_string(),
            color,
        }
    }
}

/// Normalized slot position on the desk (-1..1 on both axes)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotPosition {
    pub x: f32,
    pub z: f32,
}

/// Flavor text shown on level transitions and game over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// Keyed by the 1-based number of the level being promoted into
    pub promotions: BTreeMap<u32, String>,
    pub default_promotion: String,
    pub demotion: String,
    pub fired: Vec<String>,
    pub performance: Vec<String>,
}

impl Default for Messages {
    fn default() -> Self {
        let promotions = [
            (2, "You've proven yourself capable of handling emails.\nNow handle EVERYTHING."),
            (3, "Middle management awaits.\nMore politics, same pay."),
            (4, "You're now responsible for other people's mistakes.\nCongratulations?"),
            (5, "The corner office is yours.\nSurvive this and you can retire."),
        ]
        .into_iter()
        .map(|(level, text)| (level, text.to_string()))
        .collect();

        Self {
            promotions,
            default_promotion: "You've been promoted!".to_string(),
            demotion: "Performance concerns. You've been demoted.".to_string(),
            fired: to_strings(&[
                "HR would like a word with you.",
                "You're just not a culture fit.",
                "We're going in a different direction.",
                "It's not you, it's... actually, it's you.",
                "Please collect your things from your desk.",
            ]),
            performance: to_strings(&[
                "Your performance review was... concerning.",
                "We expected more synergy from you.",
                "Your KPIs are not meeting expectations.",
                "Perhaps corporate life isn't for you.",
                "The quarterly targets remain unmet.",
            ]),
        }
    }
}

impl Messages {
    /// Promotion blurb for the given 1-based level number
    pub fn promotion(&self, level_number: u32) -> &str {
        self.promotions
            .get(&level_number)
            .map(String::as_str)
            .unwrap_or(&self.default_promotion)
    }
}

fn to_strings(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| s.to_string()).collect()
}

/// Configuration loading/validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse game config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("level table is empty")]
    NoLevels,
    #[error("level at position {position} has id {id}, expected {expected}", expected = .position + 1)]
    LevelOrder { position: usize, id: u32 },
    #[error("level {id}: {field} must be positive")]
    NonPositive { id: u32, field: &'static str },
    #[error("{field} must be between 0 and 1 (got {value})")]
    OutOfUnitRange { field: String, value: f64 },
    #[error("{0} pool is empty")]
    EmptyPool(&'static str),
    #[error("target id '{0}' appears more than once in the catalog")]
    DuplicateTarget(String),
    #[error("max_strikes must be at least 1")]
    NoStrikes,
}

/// Complete game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub levels: Vec<LevelDefinition>,
    /// Targets the player should hit
    pub problems: Vec<TargetKind>,
    /// Targets the player must leave alone
    pub decoys: Vec<TargetKind>,
    pub slots: Vec<SlotPosition>,
    pub max_strikes: u32,
    /// Fraction of `target_hits` needed at time-out to still advance
    pub min_success_rate: f64,
    pub messages: Messages,
}

impl Default for GameConfig {
    fn default() -> Self {
        let levels = vec![
            LevelDefinition::new(1, "Junior Staff", 2000, 1500, 2, 0.9, 1.0),
            LevelDefinition::new(2, "Senior Staff", 1700, 1300, 3, 0.8, 1.2),
            LevelDefinition::new(3, "Director", 1400, 1100, 4, 0.7, 1.4),
            LevelDefinition::new(4, "Head of Department", 1100, 900, 5, 0.6, 1.6),
            LevelDefinition::new(5, "CEO", 800, 700, 6, 0.5, 2.0),
        ];

        let problems = vec![
            TargetKind::new("email", "📧", "Unread Emails", 0x3498db),
            TargetKind::new("contract", "📝", "Contract Negotiations", 0x9b59b6),
            TargetKind::new("staff", "👥", "Staff Conflict", 0xe67e22),
            TargetKind::new("bug", "🐛", "Software Bug", 0x1abc9c),
            TargetKind::new("it", "💻", "IT Problems", 0x34495e),
            TargetKind::new("report", "📊", "Reports Due", 0x2ecc71),
            TargetKind::new("call", "📞", "Missed Calls", 0xf1c40f),
            TargetKind::new("client", "🔥", "Client Complaint", 0xe74c3c),
            TargetKind::new("meeting", "📅", "Meeting Overload", 0x95a5a6),
        ];

        let decoys = vec![
            TargetKind::new("teambuilding", "🎭", "Team Building", 0xff69b4),
            TargetKind::new("employee", "🏆", "Employee of Month", 0xffd700),
            TargetKind::new("mandatoryfun", "🤝", "Mandatory Fun", 0xff1493),
            TargetKind::new("allhands", "📣", "All-Hands Meeting", 0x00ced1),
            TargetKind::new("birthday", "🎂", "Birthday Party", 0xffa07a),
            TargetKind::new("opendoor", "💬", "Open Door Policy", 0x98fb98),
        ];

        // 3x3 desk grid
        let mut slots = Vec::with_capacity(9);
        for z in [-0.6, 0.0, 0.6] {
            for x in [-0.6, 0.0, 0.6] {
                slots.push(SlotPosition { x, z });
            }
        }

        Self {
            levels,
            problems,
            decoys,
            slots,
            max_strikes: 5,
            min_success_rate: 0.5,
            messages: Messages::default(),
        }
    }
}

impl GameConfig {
    /// Parse a JSON config (missing fields fall back to defaults) and validate it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        log::info!(
            "Loaded game config: {} levels, {} problems, {} decoys, {} slots",
            config.levels.len(),
            config.problems.len(),
            config.decoys.len(),
            config.slots.len()
        );
        Ok(config)
    }

    /// Check the invariants the simulation relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.levels.is_empty() {
            return Err(ConfigError::NoLevels);
        }
        for (position, level) in self.levels.iter().enumerate() {
            if level.id as usize != position + 1 {
                return Err(ConfigError::LevelOrder {
                    position,
                    id: level.id,
                });
            }
            let positive = [
                ("target_hits", level.target_hits),
                ("time_limit_secs", level.time_limit_secs),
                ("visible_ms", level.visible_ms),
                ("spawn_interval_ms", level.spawn_interval_ms),
                ("max_active", level.max_active as u32),
            ];
            if let Some(&(field, _)) = positive.iter().find(|(_, value)| *value == 0) {
                return Err(ConfigError::NonPositive {
                    id: level.id,
                    field,
                });
            }
            check_unit(&format!("level {} problem_ratio", level.id), level.problem_ratio)?;
        }
        check_unit("min_success_rate", self.min_success_rate)?;

        if self.max_strikes == 0 {
            return Err(ConfigError::NoStrikes);
        }
        if self.problems.is_empty() {
            return Err(ConfigError::EmptyPool("problem"));
        }
        if self.decoys.is_empty() {
            return Err(ConfigError::EmptyPool("decoy"));
        }
        if self.slots.is_empty() {
            return Err(ConfigError::EmptyPool("slot"));
        }
        if self.messages.fired.is_empty() {
            return Err(ConfigError::EmptyPool("fired message"));
        }
        if self.messages.performance.is_empty() {
            return Err(ConfigError::EmptyPool("performance message"));
        }

        let mut seen = std::collections::HashSet::new();
        for kind in self.problems.iter().chain(&self.decoys) {
            if !seen.insert(kind.id.as_str()) {
                return Err(ConfigError::DuplicateTarget(kind.id.clone()));
            }
        }
        Ok(())
    }

    /// Number of levels in the progression
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

fn check_unit(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange {
            field: field.to_string(),
            value,
        })
    }
}
