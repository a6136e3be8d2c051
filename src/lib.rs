//! Sente: a feature-based Go engine.
//!
//! The crate is layered: the rules live at the bottom, move selection at
//! the top, with chain analysis and feature extraction in between.
//!
//! ## Modules
//!
//! - [`location`] - Points as indices into a padded 1-D array
//! - [`board`] - Immutable board, captures, legality, area scoring
//! - [`state`] - Game state with ko enforcement and undo
//! - [`chains`] - Union-find chain and liberty analysis
//! - [`pattern`] - Canonical local patterns and the count-min sketch
//! - [`features`] - Per-move feature extraction
//! - [`engine`] - Move-selection engines and the registry
//! - [`mcts`] - Monte Carlo tree search
//! - [`gtp`] - Go Text Protocol front end
//!
//! ## Example
//!
//! ```
//! use sente::board::Player;
//! use sente::engine::{Engine, NoEyeEngine};
//! use sente::state::GameState;
//!
//! let state = GameState::new_game(9);
//! let mut engine = NoEyeEngine::new(Some(42));
//! let mv = engine.suggest_move(Player::Black, &state, 6.5);
//! println!("suggested: {}", sente::location::to_string(mv));
//! ```

pub mod board;
pub mod chains;
pub mod engine;
pub mod features;
pub mod gtp;
pub mod location;
pub mod mcts;
pub mod pattern;
pub mod state;
