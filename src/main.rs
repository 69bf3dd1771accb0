//! Marble Course headless driver
//!
//! Runs the simulation core against the reference physics world with a
//! scripted autopilot and logs the run.
//!
//! Usage: `marble-course [settings.json] [seconds]`

use marble_course::consts::{MAX_SUBSTEPS, SIM_DT};
use marble_course::sim::{Game, GamePhase, KeyIntents, SimWorld};
use marble_course::{Result, Settings};

/// Host frame rate the driver pretends to render at
const FRAME_DT: f32 = 1.0 / 60.0;
const DEFAULT_SECONDS: f32 = 30.0;

/// Hold forward, keep to the middle of the lane, hop now and then
fn autopilot(time: f64, x: f32) -> KeyIntents {
    KeyIntents {
        forward: true,
        leftward: x > 0.4,
        rightward: x < -0.4,
        jump: (time % 1.5) < 0.1,
        ..Default::default()
    }
}

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);

    let settings = match args.next() {
        Some(path) => Settings::load(&path)?,
        None => {
            log::info!("Using default settings");
            Settings::default()
        }
    };
    let seconds = args
        .next()
        .and_then(|s| s.parse::<f32>().ok())
        .unwrap_or(DEFAULT_SECONDS);

    let mut game = Game::new(SimWorld::new(), &settings)?;
    log::info!(
        "Course: {} obstacles, finish at z = {:.1}",
        game.course().layout().count(),
        game.course().finish_line_z()
    );

    let mut accumulator = 0.0f32;
    let mut elapsed = 0.0f64;
    let mut last_phase = game.phase();
    let mut finishes = 0u32;
    let frames = (seconds / FRAME_DT).ceil() as u32;

    for _ in 0..frames {
        accumulator += FRAME_DT;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let x = game.player_position()?.x;
            let keys = autopilot(elapsed, x);
            elapsed += SIM_DT as f64;
            game.frame(elapsed, SIM_DT, &keys)?;
            accumulator -= SIM_DT;
            substeps += 1;
        }

        let phase = game.phase();
        if phase != last_phase {
            log::info!("Phase {:?} -> {:?} at {:.2}s", last_phase, phase, elapsed);
            if phase == GamePhase::Ended {
                finishes += 1;
                if let Some(duration) = game.store().duration() {
                    println!("Finished in {:.2}s", duration);
                }
                // Go again on a fresh layout
                game.restart()?;
            }
            last_phase = game.phase();
        }
    }

    println!(
        "Simulated {:.1}s: {} finishes, {} restarts",
        elapsed,
        finishes,
        game.store().restarts()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
