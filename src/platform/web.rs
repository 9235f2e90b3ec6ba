//! wasm-bindgen surface for the JS host

use std::rc::Rc;

use wasm_bindgen::prelude::*;

use super::{CommandBuffer, Frame, Viewport};
use crate::audio::WebAudio;
use crate::settings::Settings;
use crate::sim::{Game, TickInput, tick};
use crate::tuning::GameConfig;

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Game instance driven by the page's animation loop
#[wasm_bindgen]
pub struct WhackGame {
    game: Game,
    audio: Rc<WebAudio>,
    settings: Settings,
    commands: CommandBuffer,
    viewport: Viewport,
    pause_requested: bool,
    idle_mode: bool,
}

#[wasm_bindgen]
impl WhackGame {
    /// Build a game for a canvas of `width` x `height` pixels, from an
    /// optional JSON config override
    #[wasm_bindgen(constructor)]
    pub fn new(
        seed: u64,
        width: f32,
        height: f32,
        config_json: Option<String>,
    ) -> Result<WhackGame, JsValue> {
        let config = match config_json {
            Some(json) => GameConfig::from_json(&json).map_err(js_err)?,
            None => GameConfig::default(),
        };

        let settings = Settings::load();
        let audio = Rc::new(WebAudio::new(&settings));
        let commands = CommandBuffer::new();
        let mut game = Game::new(Rc::new(config), audio.clone(), seed);
        game.targets.set_view(Box::new(commands.clone()));
        game.camera.set_aspect(width, height);

        log::info!("Corporate Whack ready (seed {})", seed);
        Ok(Self {
            game,
            audio,
            settings,
            commands,
            viewport: Viewport::new(width, height),
            pause_requested: false,
            idle_mode: false,
        })
    }

    pub fn start(&mut self) {
        self.game.start();
    }

    /// Dismiss the promotion/demotion screen
    pub fn continue_level(&mut self) -> bool {
        self.game.continue_level()
    }

    pub fn restart(&mut self) {
        self.game.restart();
    }

    /// Pause takes effect on the next frame
    pub fn toggle_pause(&mut self) {
        self.pause_requested = true;
    }

    pub fn toggle_mute(&mut self) -> bool {
        let muted = self.settings.toggle_mute();
        self.audio.apply_settings(&self.settings);
        self.settings.save();
        muted
    }

    pub fn set_volume(&mut self, master: f32, sfx: f32) {
        self.settings.set_master_volume(master);
        self.settings.set_sfx_volume(sfx);
        self.audio.apply_settings(&self.settings);
        self.settings.save();
    }

    pub fn set_idle(&mut self, on: bool) {
        self.idle_mode = on;
        log::info!("Idle mode: {}", on);
    }

    pub fn set_aspect(&mut self, width: f32, height: f32) {
        self.viewport = Viewport::new(width, height);
        self.game.camera.set_aspect(width, height);
    }

    /// Advance one animation frame. `activate` marks a click/tap at the
    /// pointer (canvas pixels) this frame.
    pub fn frame(
        &mut self,
        dt: f32,
        pointer_x: f32,
        pointer_y: f32,
        activate: bool,
    ) -> Result<JsValue, JsValue> {
        let input = TickInput {
            pointer: activate.then(|| self.viewport.to_ndc(pointer_x, pointer_y)),
            pause: std::mem::take(&mut self.pause_requested),
            idle_mode: self.idle_mode,
        };

        let report = tick(&mut self.game, &input, dt);
        let frame = Frame::new(report, self.commands.drain());
        let json = serde_json::to_string(&frame).map_err(js_err)?;
        js_sys::JSON::parse(&json)
    }

    /// Current stats snapshot (for the end screens)
    pub fn stats(&self) -> Result<JsValue, JsValue> {
        let json = serde_json::to_string(&self.game.state.stats()).map_err(js_err)?;
        js_sys::JSON::parse(&json)
    }
}

/// Module init: route `log` to the browser console and panics to `console.error`
#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}
