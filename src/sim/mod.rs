//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time only advances through `tick`/`update` deltas
//! - Seeded RNG only
//! - Stable iteration order (by target id)
//! - Rendering and audio only through injected ports

pub mod outcome;
pub mod pick;
pub mod slot;
pub mod state;
pub mod targets;
pub mod tick;

pub use outcome::{CultureHit, EndReason, Feedback, Hud, LevelConfig, Outcome, ProblemHit, Stats};
pub use pick::{HitTest, NullView, PickCamera, Ray, TargetBody, TargetPose, TargetView, ray_cylinder};
pub use slot::{Slot, SlotGrid};
pub use state::GameState;
pub use targets::{ActiveTarget, HitVerdict, Removal, TargetId, TargetManager, TargetPhase};
pub use tick::{Game, TickInput, TickReport, tick};
