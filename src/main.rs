//! Corporate Whack entry point
//!
//! The browser build is driven from JS through `platform::WhackGame`. Natively
//! this runs a headless demo session with the autoplayer and prints the result.
//!
//! Usage: `corporate-whack [seed] [config.json]`

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::rc::Rc;

    use corporate_whack::sim::{Game, Outcome, TickInput, tick};
    use corporate_whack::{GameConfig, SilentAudio};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let seed = match args.next() {
        Some(s) => s.parse::<u64>()?,
        None => 0x5EED,
    };
    let config = match args.next() {
        Some(path) => GameConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => GameConfig::default(),
    };

    log::info!("Corporate Whack (native) starting, seed {}", seed);
    let mut game = Game::new(Rc::new(config), Rc::new(SilentAudio), seed);
    game.start();

    let input = TickInput {
        idle_mode: true,
        ..Default::default()
    };
    const FRAME: f32 = 1.0 / 60.0;
    // An hour of simulated play is far more than any session needs
    for _ in 0..(60 * 60 * 60) {
        let report = tick(&mut game, &input, FRAME);
        let Some(outcome) = report.outcome else {
            continue;
        };
        println!("{}", outcome.headline());
        match outcome {
            Outcome::LevelUp { message, .. } | Outcome::Demote { message, .. } => {
                println!("  {}", message.replace('\n', " "));
            }
            Outcome::GameOver { message, stats, .. } => {
                println!("  {message}");
                println!("{}", serde_json::to_string_pretty(&stats)?);
                break;
            }
            Outcome::Victory { stats } => {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                break;
            }
        }
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::wasm_start, this is just to satisfy the compiler
}
