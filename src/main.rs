//! Sente: a feature-based Go engine.
//!
//! ## Usage
//!
//! - `sente gtp` - Start the GTP server for GUI integration
//! - `sente demo` - Play a short self-play game and print the result

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use sente::board::Player;
use sente::engine::{self, Engine, EngineConfig};
use sente::gtp::GtpClient;
use sente::location;
use sente::state::GameState;

/// Sente: a feature-based Go engine
#[derive(Parser)]
#[command(name = "sente")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine to play with: random, noeye, feature, rave, mcts, mcts2
    #[arg(long, default_value = "mcts")]
    engine: String,

    /// Board size
    #[arg(long, default_value_t = 19)]
    size: usize,

    /// Komi
    #[arg(long, default_value_t = 6.5)]
    komi: f64,

    /// Seed for the engine's random number generator
    #[arg(long)]
    seed: Option<u64>,

    /// Feature weight file
    #[arg(long, default_value = "data/features.tsv")]
    weights: PathBuf,

    /// Pattern vocabulary file
    #[arg(long, default_value = "data/patterns.tsv")]
    patterns: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the GTP (Go Text Protocol) server for use with GUI applications
    Gtp,
    /// Run a short self-play demo
    Demo,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig {
        weights_file: cli.weights,
        patterns_file: cli.patterns,
        seed: cli.seed,
    };
    let engine = engine::create_engine(&cli.engine, &config)?;

    match cli.command {
        Some(Commands::Gtp) => {
            let mut client = GtpClient::new(engine, &cli.engine, cli.size, cli.komi);
            client.run()?;
        }
        Some(Commands::Demo) | None => {
            run_demo(engine, cli.size, cli.komi);
        }
    }
    Ok(())
}

fn run_demo(mut engine: Box<dyn Engine>, size: usize, komi: f64) {
    println!("sente self-play demo on a {size}x{size} board, komi {komi}\n");

    let mut state = GameState::new_game(size);
    let mut player = Player::Black;
    let max_moves = size * size * 3;
    let mut num_moves = 0;
    while !state.is_game_over() && num_moves < max_moves {
        let mv = engine.suggest_move(player, &state, komi);
        println!("{player} {}", location::to_string(mv));
        state = state.play_move(player, mv);
        player = player.other();
        num_moves += 1;
    }

    println!("{}", state.board);
    let (b, w) = state.board.score();
    let margin = b as f64 - (w as f64 + komi);
    let verdict = if margin > 0.0 {
        format!("B+{margin}")
    } else if margin < 0.0 {
        format!("W+{}", -margin)
    } else {
        "0".to_string()
    };
    println!("\nfinal score: {verdict}");
}
