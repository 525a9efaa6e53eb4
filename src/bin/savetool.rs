use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tiles_2048::engine::GridState;
use tiles_2048::saves::{read_snapshot_file, write_snapshot_file, SaveFormat};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "savetool", version, about = "Inspect and convert 2048 save files")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a save between JSON (.save.json) and binary (.save.bin)
    Convert {
        input: PathBuf,
        /// Output file; defaults to the input name with the other format's suffix
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,
    },
    /// Print a save's fields and its current grid
    Show {
        input: PathBuf,
        /// Print every grid in the undo chain, newest first
        #[arg(long)]
        chain: bool,
    },
    /// List save files under a directory
    List {
        #[arg(default_value = "saves")]
        dir: PathBuf,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().cmd {
        Command::Convert { input, output, force } => convert(&input, output, force),
        Command::Show { input, chain } => show(&input, chain),
        Command::List { dir, recursive } => list(&dir, recursive),
    }
}

fn convert(input: &Path, output: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let Some(format) = SaveFormat::from_path(input) else {
        anyhow::bail!("input must end in .save.json or .save.bin, got: {}", input.display());
    };
    let output = match output {
        Some(path) => path,
        None => {
            let name = input.file_name().and_then(|s| s.to_str()).unwrap_or_default();
            let stem = name.strip_suffix(format.suffix()).unwrap_or(name);
            let target = match format {
                SaveFormat::Json => SaveFormat::Binary,
                SaveFormat::Binary => SaveFormat::Json,
            };
            input.with_file_name(format!("{stem}{}", target.suffix()))
        }
    };
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let snapshot = read_snapshot_file(input)?;
    write_snapshot_file(&output, &snapshot)?;
    info!(from = %input.display(), to = %output.display(), "converted save");
    Ok(())
}

fn show(input: &Path, chain: bool) -> anyhow::Result<()> {
    let snapshot = read_snapshot_file(input)?;
    let states = snapshot.grid_states()?;

    println!("file: {}", input.display());
    println!("player: {}", if snapshot.player_name.is_empty() { "-" } else { snapshot.player_name.as_str() });
    println!("grid: {}x{} | goal: {}", snapshot.grid_width, snapshot.grid_height, snapshot.goal);
    println!("lives: {} | undo chain: {}/{}", snapshot.remaining_lives, states.len(), snapshot.max_undos);
    println!("spawnables: {:?}", snapshot.accepted_spawnables);
    println!("highest: {}", states.iter().map(GridState::highest_tile).max().unwrap_or(0));

    let shown = if chain { states.len() } else { 1 };
    for (i, state) in states.iter().take(shown).enumerate() {
        if chain {
            println!("[{i}]");
        }
        println!("{state}");
    }
    Ok(())
}

fn list(dir: &Path, recursive: bool) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }
    let walker = if recursive { WalkDir::new(dir) } else { WalkDir::new(dir).max_depth(1) };
    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && SaveFormat::from_path(e.path()).is_some())
        .map(|e| e.into_path())
        .collect();
    files.sort();

    for path in &files {
        match read_snapshot_file(path) {
            Ok(s) => {
                let score = s.undo_chain.first().map_or(0, |g| g.score);
                println!("{}  player={:?} lives={} score={}", path.display(), s.player_name, s.remaining_lives, score);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "unreadable save"),
        }
    }
    println!("{} save file(s)", files.len());
    Ok(())
}
