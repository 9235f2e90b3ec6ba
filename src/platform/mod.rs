//! Platform abstraction layer
//!
//! The JS host owns the canvas, the 3D scene and the DOM screens. Each
//! animation frame it calls [`WhackGame::frame`] (wasm only) and applies the
//! returned report: HUD values, transition screens, and the queue of target
//! draw commands collected by [`CommandBuffer`].

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Vec2, Vec3};
use serde::Serialize;

use crate::sim::{TargetId, TargetPhase, TargetPose, TargetView, TickReport};
use crate::tuning::TargetKind;

#[cfg(target_arch = "wasm32")]
mod web;
#[cfg(target_arch = "wasm32")]
pub use web::WhackGame;

/// One draw instruction for the host renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum ViewCommand {
    Show {
        id: TargetId,
        x: f32,
        z: f32,
        label: String,
        marker: String,
        color: u32,
        is_problem: bool,
    },
    Pose {
        id: TargetId,
        phase: TargetPhase,
        height: f32,
        squash: f32,
    },
    Hit {
        id: TargetId,
        is_problem: bool,
    },
    Remove {
        id: TargetId,
    },
}

/// `TargetView` that queues commands until the host drains them
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    queue: Rc<RefCell<Vec<ViewCommand>>>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything queued since the last drain
    pub fn drain(&self) -> Vec<ViewCommand> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }

    fn push(&self, cmd: ViewCommand) {
        self.queue.borrow_mut().push(cmd);
    }
}

impl TargetView for CommandBuffer {
    fn show(&mut self, id: TargetId, slot: Vec3, kind: &TargetKind, is_problem: bool) {
        self.push(ViewCommand::Show {
            id,
            x: slot.x,
            z: slot.z,
            label: kind.label.clone(),
            marker: kind.marker.clone(),
            color: kind.color,
            is_problem,
        });
    }

    fn pose(&mut self, id: TargetId, phase: TargetPhase, pose: TargetPose) {
        self.push(ViewCommand::Pose {
            id,
            phase,
            height: pose.height,
            squash: pose.squash,
        });
    }

    fn hit(&mut self, id: TargetId, is_problem: bool) {
        self.push(ViewCommand::Hit { id, is_problem });
    }

    fn remove(&mut self, id: TargetId) {
        self.push(ViewCommand::Remove { id });
    }
}

/// What `frame` hands back to the host
#[derive(Debug, Serialize)]
pub struct Frame {
    #[serde(flatten)]
    pub report: TickReport,
    pub commands: Vec<ViewCommand>,
    /// Headline for the outcome screen, if any
    pub headline: Option<String>,
}

impl Frame {
    pub fn new(report: TickReport, commands: Vec<ViewCommand>) -> Self {
        let headline = report.outcome.as_ref().map(|o| o.headline());
        Self {
            report,
            commands,
            headline,
        }
    }
}

/// Canvas size in pixels, used to map pointer events into the pick camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn to_ndc(&self, x: f32, y: f32) -> Vec2 {
        pointer_to_ndc(x, y, self.width, self.height)
    }
}

/// Canvas pixel position to normalized device coordinates (y up)
pub fn pointer_to_ndc(x: f32, y: f32, width: f32, height: f32) -> Vec2 {
    if width <= 0.0 || height <= 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new((x / width) * 2.0 - 1.0, -(y / height) * 2.0 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentAudio;
    use crate::sim::{Game, TickInput, tick};
    use crate::tuning::GameConfig;

    #[test]
    fn test_pointer_to_ndc() {
        assert_eq!(pointer_to_ndc(0.0, 0.0, 800.0, 600.0), Vec2::new(-1.0, 1.0));
        assert_eq!(pointer_to_ndc(400.0, 300.0, 800.0, 600.0), Vec2::ZERO);
        assert_eq!(pointer_to_ndc(800.0, 600.0, 800.0, 600.0), Vec2::new(1.0, -1.0));
        assert_eq!(pointer_to_ndc(10.0, 10.0, 0.0, 600.0), Vec2::ZERO);
    }

    #[test]
    fn test_viewport_keeps_canvas_clicks_on_screen() {
        let viewport = Viewport::new(1280.0, 720.0);
        for (x, y) in [(0.0, 0.0), (640.0, 360.0), (1279.0, 719.0), (100.0, 650.0)] {
            let ndc = viewport.to_ndc(x, y);
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "({x}, {y}) -> {ndc}");
        }
    }

    #[test]
    fn test_viewport_click_lands_on_target() {
        let viewport = Viewport::new(1280.0, 720.0);
        let mut game = Game::new(Rc::new(GameConfig::default()), Rc::new(SilentAudio), 23);
        game.camera.set_aspect(viewport.width, viewport.height);
        game.start();
        let mut id = None;
        for _ in 0..60 {
            tick(&mut game, &TickInput::default(), 1.0 / 60.0);
            id = game
                .targets
                .active()
                .iter()
                .find(|t| t.phase == TargetPhase::Visible)
                .map(|t| t.id);
            if id.is_some() {
                break;
            }
        }
        let ndc = game.pointer_for(id.unwrap()).unwrap();
        // Back to canvas pixels, as the host would report the click
        let x = (ndc.x + 1.0) * 0.5 * viewport.width;
        let y = (1.0 - ndc.y) * 0.5 * viewport.height;
        let report = tick(
            &mut game,
            &TickInput {
                pointer: Some(viewport.to_ndc(x, y)),
                ..Default::default()
            },
            1.0 / 60.0,
        );
        assert!(report.hit.is_some());
    }

    #[test]
    fn test_frame_json_carries_feedback_text() {
        let mut config = GameConfig::default();
        config.levels[0].problem_ratio = 1.0;
        let mut game = Game::new(Rc::new(config), Rc::new(SilentAudio), 24);
        game.start();

        let mut pointer = None;
        for _ in 0..60 {
            tick(&mut game, &TickInput::default(), 1.0 / 60.0);
            pointer = game
                .targets
                .active()
                .iter()
                .find(|t| t.phase == TargetPhase::Visible)
                .and_then(|t| game.pointer_for(t.id));
            if pointer.is_some() {
                break;
            }
        }
        let report = tick(
            &mut game,
            &TickInput {
                pointer,
                ..Default::default()
            },
            1.0 / 60.0,
        );
        let json = serde_json::to_value(Frame::new(report, Vec::new())).unwrap();
        assert_eq!(json["feedback"], "good");
        assert_eq!(json["feedback_text"], "+1");
    }

    #[test]
    fn test_command_buffer_records_lifecycle() {
        let buffer = CommandBuffer::new();
        let mut game = Game::new(Rc::new(GameConfig::default()), Rc::new(SilentAudio), 21);
        game.targets.set_view(Box::new(buffer.clone()));
        game.start();

        tick(&mut game, &TickInput::default(), 1.0 / 60.0);
        let first = buffer.drain();
        assert!(matches!(first.first(), Some(ViewCommand::Show { .. })));
        assert!(first.iter().any(|c| matches!(c, ViewCommand::Pose { .. })));
        assert!(buffer.drain().is_empty());

        // Long enough for the first target to leave
        for _ in 0..200 {
            tick(&mut game, &TickInput::default(), 1.0 / 60.0);
        }
        assert!(
            buffer
                .drain()
                .iter()
                .any(|c| matches!(c, ViewCommand::Remove { .. }))
        );
    }

    #[test]
    fn test_frame_json_shape() {
        let buffer = CommandBuffer::new();
        let mut game = Game::new(Rc::new(GameConfig::default()), Rc::new(SilentAudio), 22);
        game.targets.set_view(Box::new(buffer.clone()));
        game.start();

        let report = tick(&mut game, &TickInput::default(), 1.0 / 60.0);
        let json = serde_json::to_value(Frame::new(report, buffer.drain())).unwrap();
        assert_eq!(json["hud"]["level_name"], "Junior Staff");
        assert_eq!(json["hud"]["time_remaining"], 60);
        assert_eq!(json["commands"][0]["cmd"], "show");
        assert!(json["outcome"].is_null());
        assert!(json["headline"].is_null());
        assert!(json["feedback_text"].is_null());
    }
}
