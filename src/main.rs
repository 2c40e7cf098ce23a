//! tcg-turns - turn structure and priority engine
//!
//! Plays a match between seeded random players and prints the game log.
//!
//! ## Usage
//!
//! ```
//! tcg-turns [OPTIONS]
//!
//! Options:
//!   --config <path>   Match configuration (JSON)
//!   --turns <n>       Maximum number of turns to play
//!   --seed <n>        Seed for the random players
//! ```
//!
//! Set `RUST_LOG=debug` (or `trace`) for engine-level detail.

use std::env;
use std::process::ExitCode;

use tcg_turns::{GameLoop, GameResult, MatchConfig, RandomDecisionMaker, TurnOutcome};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: tcg-turns [--config <path>] [--turns <n>] [--seed <n>]";

#[derive(Debug, Default)]
struct Args {
    config: Option<String>,
    turns: Option<u32>,
    seed: Option<u64>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .ok_or_else(|| format!("{} requires a value", flag))
        };
        match arg.as_str() {
            "--config" => args.config = Some(value("--config")?),
            "--turns" => {
                let raw = value("--turns")?;
                let turns = raw
                    .parse()
                    .map_err(|_| format!("invalid turn count: {}", raw))?;
                args.turns = Some(turns);
            }
            "--seed" => {
                let raw = value("--seed")?;
                let seed = raw.parse().map_err(|_| format!("invalid seed: {}", raw))?;
                args.seed = Some(seed);
            }
            "--help" | "-h" => {
                return Err(USAGE.to_string());
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }
    Ok(args)
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => MatchConfig::load(path)?,
        None => MatchConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let max_turns = args.turns.unwrap_or(config.max_turns);

    let mut game = GameLoop::new(&config, RandomDecisionMaker::new(config.seed))?;
    let mut outcome = game.run(max_turns)?;
    // The random players never pause, but a configured stop-on-step does.
    while outcome == TurnOutcome::Paused {
        info!("stopped during {}", game.state().current_phase_description());
        outcome = game.resume()?;
        if outcome == TurnOutcome::Completed {
            outcome = game.run(max_turns)?;
        }
    }

    for line in game.session().game_log() {
        println!("{}", line);
    }
    match outcome {
        TurnOutcome::GameOver(GameResult::Winner(winner)) => {
            let name = game
                .state()
                .player(winner)
                .map_or_else(|| winner.to_string(), |p| p.name.clone());
            println!("{} wins on turn {}", name, game.state().turn.turn_number);
        }
        TurnOutcome::GameOver(_) => println!("the game ended without a winner"),
        _ => println!("stopped after turn {}", game.state().turn.turn_number),
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
