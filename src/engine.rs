//! Move-selection engines, from uniform random play up to the
//! feature-weighted policy, behind one trait so the protocol layer and
//! the tree search can swap them freely.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::board::Player;
use crate::chains;
use crate::features::{FEATURE_NAMES, FeatureExtractor, FeatureWeight, read_weight_file};
use crate::location::{self, Loc};
use crate::pattern::{Pattern, read_pattern_file};
use crate::state::GameState;

/// A move-selection policy.
pub trait Engine {
    /// Pick a move for `player` in `state`.
    fn suggest_move(&mut self, player: Player, state: &GameState, komi: f64) -> Loc;

    /// Score every candidate move; empty when there is nothing worth
    /// playing (terminal position or pass-only).
    fn move_probs(&mut self, player: Player, state: &GameState, komi: f64) -> Vec<(Loc, f64)>;

    /// Human-readable breakdown of how this engine scores one point.
    fn detail_score(&mut self, player: Player, l: Loc, state: &GameState) -> String;
}

/// Legal moves worth considering: everything except filling our own
/// trivial eyes. Falls back to a lone pass when nothing else remains,
/// and to nothing at all once the game is over.
pub fn non_bad_moves(player: Player, state: &GameState) -> Vec<Loc> {
    if state.is_game_over() {
        return Vec::new();
    }
    let own = player.square();
    let moves: Vec<Loc> = state
        .legal_moves(player)
        .into_iter()
        .filter(|&l| !chains::is_trivial_eye(own, l, &state.board))
        .collect();
    if moves.is_empty() {
        vec![location::PASS]
    } else {
        moves
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn make_rng(seed: Option<u64>) -> fastrand::Rng {
    match seed {
        Some(s) => fastrand::Rng::with_seed(s),
        None => fastrand::Rng::new(),
    }
}

// =============================================================================
// Random and eye-avoiding baselines
// =============================================================================

/// Plays uniformly random legal moves, passing with the same
/// probability as any single move.
pub struct RandomEngine {
    rng: fastrand::Rng,
}

impl RandomEngine {
    pub fn new(seed: Option<u64>) -> RandomEngine {
        RandomEngine {
            rng: make_rng(seed),
        }
    }
}

impl Engine for RandomEngine {
    fn suggest_move(&mut self, player: Player, state: &GameState, _komi: f64) -> Loc {
        if state.is_game_over() {
            return location::PASS;
        }
        let legal = state.legal_moves(player);
        let idx = self.rng.usize(0..=legal.len());
        if idx == legal.len() {
            location::PASS
        } else {
            legal[idx]
        }
    }

    fn move_probs(&mut self, player: Player, state: &GameState, _komi: f64) -> Vec<(Loc, f64)> {
        if state.is_game_over() {
            return Vec::new();
        }
        let legal = state.legal_moves(player);
        let p = 1.0 / (legal.len() + 1) as f64;
        legal.into_iter().map(|l| (l, p)).collect()
    }

    fn detail_score(&mut self, _player: Player, _l: Loc, _state: &GameState) -> String {
        "not implemented".to_string()
    }
}

/// Random play that refuses to fill its own trivial eyes, which keeps
/// playouts from destroying their own living groups.
pub struct NoEyeEngine {
    rng: fastrand::Rng,
}

impl NoEyeEngine {
    pub fn new(seed: Option<u64>) -> NoEyeEngine {
        NoEyeEngine {
            rng: make_rng(seed),
        }
    }
}

impl Engine for NoEyeEngine {
    fn suggest_move(&mut self, player: Player, state: &GameState, _komi: f64) -> Loc {
        let moves = non_bad_moves(player, state);
        if moves.is_empty() {
            return location::PASS;
        }
        moves[self.rng.usize(0..moves.len())]
    }

    fn move_probs(&mut self, player: Player, state: &GameState, _komi: f64) -> Vec<(Loc, f64)> {
        let moves = non_bad_moves(player, state);
        if moves == [location::PASS] || moves.is_empty() {
            return Vec::new();
        }
        let p = 1.0 / moves.len() as f64;
        moves.into_iter().map(|l| (l, p)).collect()
    }

    fn detail_score(&mut self, _player: Player, _l: Loc, _state: &GameState) -> String {
        "not implemented".to_string()
    }
}

// =============================================================================
// Feature-weighted policy
// =============================================================================

/// Scores moves as a weighted sum of their feature values, with learned
/// weights read from a tab-separated file.
pub struct FeatureEngine {
    rng: fastrand::Rng,
    weights: Vec<FeatureWeight>,
    patterns: HashMap<Pattern, i32>,
    /// Pattern ids present in the weight table; extraction skips ids we
    /// have no weight for.
    known_pattern_ids: HashSet<i32>,
}

impl FeatureEngine {
    pub fn new(
        weights: Vec<FeatureWeight>,
        patterns: HashMap<Pattern, i32>,
        seed: Option<u64>,
    ) -> Result<FeatureEngine> {
        for fw in &weights {
            if !FEATURE_NAMES.contains(&fw.name.as_str()) {
                bail!("weight file names unknown feature '{}'", fw.name);
            }
        }
        let known_pattern_ids = weights
            .iter()
            .find(|fw| fw.name == "pattern")
            .map(|fw| fw.weights.keys().copied().collect())
            .unwrap_or_default();
        Ok(FeatureEngine {
            rng: make_rng(seed),
            weights,
            patterns,
            known_pattern_ids,
        })
    }

    pub fn from_files(
        weights_file: &Path,
        patterns_file: &Path,
        seed: Option<u64>,
    ) -> Result<FeatureEngine> {
        let weights = read_weight_file(weights_file)?;
        let patterns = read_pattern_file(patterns_file)
            .with_context(|| "loading pattern vocabulary".to_string())?;
        FeatureEngine::new(weights, patterns, seed)
    }

    fn score_location(&self, extractor: &FeatureExtractor, l: Loc) -> f64 {
        let mut score = 0.0;
        for fw in &self.weights {
            let value = extractor.feature(&fw.name, l, false).unwrap_or(0);
            if value == 0 {
                // 0 is the default value with implicit weight 0.
                continue;
            }
            if let Some(weight) = fw.weights.get(&value) {
                score += weight;
            }
        }
        score
    }
}

impl Engine for FeatureEngine {
    fn suggest_move(&mut self, player: Player, state: &GameState, _komi: f64) -> Loc {
        let moves = non_bad_moves(player, state);
        if moves.is_empty() {
            return location::PASS;
        }
        if moves.len() == 1 {
            return moves[0];
        }
        let extractor =
            FeatureExtractor::new(state, player, &self.patterns, Some(&self.known_pattern_ids));
        let mut scored: Vec<(Loc, f64)> = moves
            .into_iter()
            .map(|l| (l, self.score_location(&extractor, l)))
            .collect();
        // Jitter breaks ties so equal-scoring points vary.
        for entry in &mut scored {
            entry.1 += self.rng.f64() * 0.05;
        }
        scored
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(l, _)| l)
            .unwrap_or(location::PASS)
    }

    fn move_probs(&mut self, player: Player, state: &GameState, _komi: f64) -> Vec<(Loc, f64)> {
        let moves = non_bad_moves(player, state);
        if moves == [location::PASS] || moves.is_empty() {
            return Vec::new();
        }
        let extractor =
            FeatureExtractor::new(state, player, &self.patterns, Some(&self.known_pattern_ids));
        moves
            .into_iter()
            .map(|l| (l, sigmoid(self.score_location(&extractor, l))))
            .collect()
    }

    fn detail_score(&mut self, player: Player, l: Loc, state: &GameState) -> String {
        let extractor =
            FeatureExtractor::new(state, player, &self.patterns, Some(&self.known_pattern_ids));
        let mut total = 0.0;
        let mut parts = String::new();
        for fw in &self.weights {
            let value = extractor.feature(&fw.name, l, false).unwrap_or(0);
            let weight = if value == 0 {
                0.0
            } else {
                fw.weights.get(&value).copied().unwrap_or(0.0)
            };
            total += weight;
            parts.push_str(&format!(" {}_{}={}", fw.name, value, weight));
        }
        format!("{total} from{parts}")
    }
}

// =============================================================================
// All-moves-as-first playout sampler
// =============================================================================

/// Estimates move strength by running full random playouts and crediting
/// every move a side made in a won game (all-moves-as-first).
pub struct RaveEngine {
    playout: NoEyeEngine,
    num_games: usize,
}

impl RaveEngine {
    pub fn new(seed: Option<u64>) -> RaveEngine {
        RaveEngine {
            playout: NoEyeEngine::new(seed),
            num_games: 1000,
        }
    }

    fn simulate_games(&mut self, player: Player, state: &GameState, komi: f64) -> Vec<(Loc, f64)> {
        let mut tallies: HashMap<(Player, Loc), (u32, u32)> = HashMap::new();
        let max_moves = state.board.size * state.board.size * 3;

        for _ in 0..self.num_games {
            let mut curr = state.clone();
            let mut curr_player = player;
            let mut moves_made = HashSet::new();
            let mut num_moves = 0;
            while !curr.is_game_over() && num_moves < max_moves {
                let l = self.playout.suggest_move(curr_player, &curr, komi);
                moves_made.insert((curr_player, l));
                curr = curr.play_move(curr_player, l);
                curr_player = curr_player.other();
                num_moves += 1;
            }
            let (b, w) = curr.board.score();
            let margin = b as f64 - (w as f64 + komi);
            let won = match player {
                Player::Black => margin > 0.0,
                Player::White => margin < 0.0,
            };
            for mv in moves_made {
                let entry = tallies.entry(mv).or_insert((0, 0));
                if won {
                    entry.0 += 1;
                }
                entry.1 += 1;
            }
        }

        let candidates: HashSet<Loc> = non_bad_moves(player, state).into_iter().collect();
        tallies
            .into_iter()
            .filter(|((p, l), _)| *p == player && candidates.contains(l))
            .map(|((_, l), (wins, total))| (l, wins as f64 / total as f64))
            .collect()
    }
}

impl Engine for RaveEngine {
    fn suggest_move(&mut self, player: Player, state: &GameState, komi: f64) -> Loc {
        self.simulate_games(player, state, komi)
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(l, _)| l)
            .unwrap_or(location::PASS)
    }

    fn move_probs(&mut self, player: Player, state: &GameState, komi: f64) -> Vec<(Loc, f64)> {
        self.simulate_games(player, state, komi)
    }

    fn detail_score(&mut self, _player: Player, _l: Loc, _state: &GameState) -> String {
        "not implemented".to_string()
    }
}

// =============================================================================
// Engine registry
// =============================================================================

/// Everything an engine might need at construction time.
pub struct EngineConfig {
    pub weights_file: std::path::PathBuf,
    pub patterns_file: std::path::PathBuf,
    pub seed: Option<u64>,
}

/// Build a named engine. Known names: `random`, `noeye`, `feature`,
/// `rave`, `mcts` (feature-guided search), and `mcts2` (search with
/// uniform priors).
pub fn create_engine(name: &str, config: &EngineConfig) -> Result<Box<dyn Engine>> {
    use crate::mcts::MctsEngine;
    let engine: Box<dyn Engine> = match name {
        "random" => Box::new(RandomEngine::new(config.seed)),
        "noeye" => Box::new(NoEyeEngine::new(config.seed)),
        "feature" => Box::new(FeatureEngine::from_files(
            &config.weights_file,
            &config.patterns_file,
            config.seed,
        )?),
        "rave" => Box::new(RaveEngine::new(config.seed)),
        "mcts" => Box::new(MctsEngine::new(
            Box::new(FeatureEngine::from_files(
                &config.weights_file,
                &config.patterns_file,
                config.seed,
            )?),
            Box::new(NoEyeEngine::new(config.seed)),
            500,
            config.seed,
        )),
        "mcts2" => Box::new(MctsEngine::new(
            Box::new(NoEyeEngine::new(config.seed)),
            Box::new(NoEyeEngine::new(config.seed)),
            500,
            config.seed,
        )),
        _ => bail!("unknown engine '{name}'"),
    };
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::features::parse_weights;
    use crate::location::loc;
    use crate::state::KoRule;

    #[test]
    fn test_non_bad_moves_avoids_own_eyes() {
        let board = Board::from_text(
            "
           3 X X .
           2 X . X
           1 . X X
            ",
        )
        .unwrap();
        let state = GameState::with_board(board, Player::White, KoRule::Superko);
        let moves = non_bad_moves(Player::Black, &state);
        // Both empty corners and the center are black eyes.
        assert_eq!(moves, vec![location::PASS]);
        // White cannot play in them at all (suicide).
        assert_eq!(non_bad_moves(Player::White, &state), vec![location::PASS]);
    }

    #[test]
    fn test_non_bad_moves_empty_when_game_over() {
        let state = GameState::new_game(5)
            .play_move(Player::Black, location::PASS)
            .play_move(Player::White, location::PASS);
        assert!(non_bad_moves(Player::Black, &state).is_empty());
    }

    #[test]
    fn test_random_engine_plays_legal_moves() {
        let mut engine = RandomEngine::new(Some(7));
        let state = GameState::new_game(5);
        for _ in 0..20 {
            let l = engine.suggest_move(Player::Black, &state, 0.0);
            assert!(l == location::PASS || state.is_legal_move(Player::Black, l));
        }
    }

    #[test]
    fn test_noeye_engine_completes_games() {
        let mut engine = NoEyeEngine::new(Some(11));
        let mut state = GameState::new_game(5);
        let mut player = Player::Black;
        let mut moves = 0;
        while !state.is_game_over() && moves < 5 * 5 * 3 {
            let l = engine.suggest_move(player, &state, 0.0);
            state = state.play_move(player, l);
            player = player.other();
            moves += 1;
        }
        assert!(state.is_game_over() || moves == 5 * 5 * 3);
    }

    #[test]
    fn test_feature_engine_prefers_capture() {
        // A single weight that rewards captures.
        let weights = parse_weights(
            "capture_count\t1\t10.0\n\
             capture_count\t2\t20.0\n",
        )
        .unwrap();
        let mut engine = FeatureEngine::new(weights, HashMap::new(), Some(3)).unwrap();
        let board = Board::from_text(
            "
           5 . . . . .
           4 . O . . .
           3 O X O . .
           2 . . . . .
           1 . . . . .
             1 2 3 4 5
            ",
        )
        .unwrap();
        let state = GameState::with_board(board, Player::Black, KoRule::Superko);
        // Capturing the black stone dominates every other move.
        assert_eq!(engine.suggest_move(Player::White, &state, 0.0), loc(2, 2));
    }

    #[test]
    fn test_feature_engine_rejects_unknown_feature_names() {
        let weights = parse_weights("no_such_feature\t1\t1.0\n").unwrap();
        assert!(FeatureEngine::new(weights, HashMap::new(), None).is_err());
    }

    #[test]
    fn test_feature_engine_probs_are_probabilities() {
        let weights = parse_weights("capture_count\t1\t1.0\n").unwrap();
        let mut engine = FeatureEngine::new(weights, HashMap::new(), Some(5)).unwrap();
        let state = GameState::new_game(5);
        let probs = engine.move_probs(Player::Black, &state, 0.0);
        assert_eq!(probs.len(), 25);
        for (_, p) in probs {
            assert!(p > 0.0 && p < 1.0);
        }
    }

    #[test]
    fn test_rave_engine_tallies_per_player() {
        // Win ratios come from the mover's own tallies only, so every
        // reported move is one of the mover's candidates.
        let state = GameState::new_game(3);
        let mut engine = RaveEngine::new(Some(11));
        let probs = engine.move_probs(Player::Black, &state, 0.0);
        assert!(!probs.is_empty());
        let candidates = non_bad_moves(Player::Black, &state);
        for (l, p) in probs {
            assert!(candidates.contains(&l));
            assert!((0.0..=1.0).contains(&p));
        }
        let mv = engine.suggest_move(Player::Black, &state, 0.0);
        assert!(state.is_legal_move(Player::Black, mv));
    }

    #[test]
    fn test_create_engine_unknown_name() {
        let config = EngineConfig {
            weights_file: "weights.tsv".into(),
            patterns_file: "patterns.tsv".into(),
            seed: None,
        };
        assert!(create_engine("nonsense", &config).is_err());
        assert!(create_engine("random", &config).is_ok());
    }
}
