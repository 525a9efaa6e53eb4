use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tiles_2048::config::{ConfigError, GameConfig};
use tiles_2048::engine::{Direction, Score, Tile};
use tiles_2048::repository::{GameRepository, MoveResult, SessionStatus};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "simulate", version, about = "Play many seeded random-policy games in parallel")]
struct Args {
    /// Number of games to play
    #[arg(short = 'n', long, default_value_t = 1000)]
    games: u64,

    /// Base seed; game i uses seed + i
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// TOML game configuration; the classic 4x4 game when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop a game after this many accepted moves
    #[arg(long, default_value_t = 100_000)]
    max_moves: u64,

    /// No progress bar
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy)]
struct Outcome {
    score: Score,
    highest: Tile,
    moves: u64,
    undos: u64,
    won: bool,
    game_over: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::classic(),
    };
    if args.games == 0 {
        anyhow::bail!("--games must be at least 1");
    }

    let pb = if args.quiet { ProgressBar::hidden() } else { ProgressBar::new(args.games) };
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} games ({eta})")?
            .progress_chars("=>-"),
    );

    let start = Instant::now();
    let outcomes: Vec<Outcome> = (0..args.games)
        .into_par_iter()
        .map(|i| {
            let outcome = play_one(&config, args.seed.wrapping_add(i), args.max_moves);
            pb.inc(1);
            outcome
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    pb.finish_and_clear();

    let elapsed = start.elapsed().as_secs_f64().max(1e-6);
    let total_moves: u64 = outcomes.iter().map(|o| o.moves).sum();
    info!(games = outcomes.len(), elapsed_s = elapsed, "simulation finished");
    report(&outcomes, config.default_goal);
    println!("moves/sec: {:.1}", total_moves as f64 / elapsed);
    Ok(())
}

/// One game with a uniform random policy over legal directions. A stuck grid
/// that still has lives is undone; the spent life stays spent.
fn play_one(config: &GameConfig, seed: u64, max_moves: u64) -> Result<Outcome, ConfigError> {
    let mut game = GameRepository::with_seed(config, seed)?;
    let mut policy = StdRng::seed_from_u64(seed.rotate_left(32) ^ 0x5EED);
    let (mut moves, mut undos) = (0, 0);

    while moves < max_moves && game.status() == SessionStatus::Active {
        let legal: Vec<Direction> =
            Direction::ALL.iter().copied().filter(|&d| game.current_state().can_shift(d)).collect();
        let Some(&direction) = legal.choose(&mut policy) else {
            // stuck with nothing to undo to
            if game.undo().is_err() {
                break;
            }
            undos += 1;
            continue;
        };
        match game.move_grid(direction) {
            Ok(MoveResult::NoError) => moves += 1,
            Ok(MoveResult::NotGameEnding { .. }) => {
                moves += 1;
                if game.undo().is_ok() {
                    undos += 1;
                }
            }
            Ok(MoveResult::GameOver { .. }) => moves += 1,
            Ok(MoveResult::CannotMoveInThatDirection) | Err(_) => break,
        }
    }
    debug!(seed, moves, score = game.score(), "game finished");

    Ok(Outcome {
        score: game.score(),
        highest: game.highest_number(),
        moves,
        undos,
        won: game.goal_reached(),
        game_over: game.status() == SessionStatus::GameOver,
    })
}

fn report(outcomes: &[Outcome], goal: Tile) {
    let n = outcomes.len().max(1) as f64;
    let mean_score = outcomes.iter().map(|o| o.score as f64).sum::<f64>() / n;
    let max_score = outcomes.iter().map(|o| o.score).max().unwrap_or(0);
    let wins = outcomes.iter().filter(|o| o.won).count();
    let game_overs = outcomes.iter().filter(|o| o.game_over).count();
    let undos: u64 = outcomes.iter().map(|o| o.undos).sum();

    let mut highest: BTreeMap<Tile, usize> = BTreeMap::new();
    for o in outcomes {
        *highest.entry(o.highest).or_default() += 1;
    }

    println!("games: {} | game over: {} | undos used: {}", outcomes.len(), game_overs, undos);
    println!("score: mean {:.1} | max {}", mean_score, max_score);
    println!("reached {}: {} ({:.2}%)", goal, wins, 100.0 * wins as f64 / n);
    println!("highest tile distribution:");
    for (tile, count) in highest.iter().rev() {
        println!("  {:>6}: {:>6} ({:.2}%)", tile, count, 100.0 * *count as f64 / n);
    }
}
