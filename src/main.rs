use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tiles_2048::config::GameConfig;
use tiles_2048::engine::Direction;
use tiles_2048::events::Notification;
use tiles_2048::repository::{GameRepository, MoveResult, SessionError};
use tiles_2048::saves::{SaveFormat, SaveStore};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tiles-2048", about = "Play 2048 in the terminal, with lives and undo")]
struct Args {
    /// TOML game configuration; the classic 4x4 game when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for tile spawns
    #[arg(long)]
    seed: Option<u64>,

    /// Directory holding save files
    #[arg(long, default_value = "saves")]
    save_dir: PathBuf,

    /// Store saves in the binary container instead of JSON
    #[arg(long)]
    binary: bool,

    /// Resume a saved game by name
    #[arg(long)]
    load: Option<String>,

    /// Let undo back out of a finished game
    #[arg(long)]
    undo_after_game_over: bool,
}

const HELP: &str = "commands: w/a/s/d or up/left/down/right, u (undo), name <text>, save [name], load <name>, saves, q";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => GameConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => GameConfig::classic(),
    };
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let format = if args.binary { SaveFormat::Binary } else { SaveFormat::Json };
    let store = SaveStore::new(&args.save_dir, format);

    let mut game = match &args.load {
        Some(name) => {
            let snapshot = store.load(name).with_context(|| format!("loading save {name:?}"))?;
            GameRepository::from_snapshot(&snapshot, rng)?
        }
        None => GameRepository::new(&config, rng)?,
    };
    game.set_undo_after_game_over(args.undo_after_game_over);
    game.subscribe(print_notification);

    println!("{HELP}");
    println!("{}", game.current_state());
    print_status(&game);

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        let (command, rest) = line.split_once(' ').map_or((line, ""), |(c, r)| (c, r.trim()));

        match command {
            "" => continue,
            "q" | "quit" => break,
            "u" | "undo" => match game.undo() {
                Ok(state) => println!("{state}"),
                Err(e) => println!("{e}"),
            },
            "name" if !rest.is_empty() => game.set_player_name(rest),
            "save" => {
                let name = if rest.is_empty() { game.player_name().to_string() } else { rest.to_string() };
                match store.save(&name, &game.serialize()) {
                    Ok(path) => println!("saved to {}", path.display()),
                    Err(e) => println!("save failed: {e}"),
                }
            }
            "load" if !rest.is_empty() => match store.load(rest) {
                Ok(snapshot) => match game.restore(&snapshot) {
                    Ok(()) => println!("{}", game.current_state()),
                    Err(e) => println!("load failed: {e}"),
                },
                Err(e) => println!("load failed: {e}"),
            },
            "saves" => match store.list() {
                Ok(names) if names.is_empty() => println!("no saves in {}", store.dir().display()),
                Ok(names) => names.iter().for_each(|n| println!("  {n}")),
                Err(e) => println!("{e}"),
            },
            other => match parse_direction(other) {
                Some(direction) => play(&mut game, direction),
                None => println!("{HELP}"),
            },
        }
        print_status(&game);
    }
    Ok(())
}

fn play(game: &mut GameRepository, direction: Direction) {
    match game.move_grid(direction) {
        Ok(MoveResult::CannotMoveInThatDirection) => println!("cannot move {direction}"),
        Ok(result) => {
            println!("{}", game.current_state());
            if let Some(message) = result.message() {
                println!("{message}");
            }
        }
        Err(SessionError::NotActive) => println!("the game is over; undo (if enabled), load or quit"),
    }
}

fn parse_direction(word: &str) -> Option<Direction> {
    match word {
        "w" | "up" => Some(Direction::Up),
        "a" | "left" => Some(Direction::Left),
        "s" | "down" => Some(Direction::Down),
        "d" | "right" => Some(Direction::Right),
        _ => None,
    }
}

fn print_status(game: &GameRepository) {
    println!(
        "lives: {} | undos: {} | highest: {} | goal: {}",
        game.remaining_lives(),
        game.remaining_undos(),
        game.highest_number(),
        game.goal()
    );
}

fn print_notification(notification: &Notification) {
    match notification {
        Notification::GoalReached { goal, .. } => println!("*** reached {goal}! keep going ***"),
        Notification::MaxNumberChanged { highest } => println!("new highest tile: {highest}"),
        Notification::LivesChanged { remaining_lives } => println!("life lost, {remaining_lives} left"),
        Notification::GameOver { score, highest } => println!("GAME OVER | score: {score} | highest: {highest}"),
        Notification::PlayerNameChanged { name } => println!("player: {name}"),
        Notification::MoveApplied { .. } | Notification::UndoApplied { .. } | Notification::UndoDepthChanged { .. } => {}
    }
}
