//! Monte Carlo tree search over game states.
//!
//! The tree lives in a flat arena of nodes indexed by position, with
//! parent links for backpropagation. A heuristic engine supplies move
//! priors that order expansion and bias selection; a separate rollout
//! engine plays positions out to the end. Search stops at a simulation
//! budget or a wall-clock cap, whichever comes first.

use std::time::{Duration, Instant};

use crate::board::Player;
use crate::engine::Engine;
use crate::location::{self, Loc};
use crate::state::GameState;

/// Wall-clock cap on one search.
const MAX_THINK: Duration = Duration::from_secs(5);

/// Weight of the heuristic prior in child selection.
const EXPLORATION_FACTOR: f64 = 2.0;

/// One node of the search tree.
struct SearchNode {
    /// Move that led here (UNDEFINED at the root).
    mv: Loc,
    parent: Option<usize>,
    state: GameState,
    visits: f64,
    wins: f64,
    /// Heuristic prior of `mv`, fixed at expansion.
    prior: f64,
    children: Vec<usize>,
    /// Unexpanded moves with priors, best last so expansion can pop.
    untried: Vec<(Loc, f64)>,
}

impl SearchNode {
    fn player_just_moved(&self) -> Player {
        self.state.player_just_moved
    }

    /// Mean value smoothed with one prior win over two prior visits,
    /// plus a prior-weighted exploration bonus that decays with visits.
    fn selection_score(&self) -> f64 {
        let win_rate = (self.wins + 1.0) / (self.visits + 2.0);
        let exploration = EXPLORATION_FACTOR * self.prior / (1.0 + self.visits);
        win_rate + exploration
    }
}

/// Tree search driven by two engines: `heuristic` orders and biases the
/// tree, `rollout` finishes games from the frontier.
pub struct MctsEngine {
    heuristic: Box<dyn Engine>,
    rollout: Box<dyn Engine>,
    num_sims: usize,
    max_think: Duration,
    rng: fastrand::Rng,
}

impl MctsEngine {
    pub fn new(
        heuristic: Box<dyn Engine>,
        rollout: Box<dyn Engine>,
        num_sims: usize,
        seed: Option<u64>,
    ) -> MctsEngine {
        MctsEngine {
            heuristic,
            rollout,
            num_sims,
            max_think: MAX_THINK,
            rng: match seed {
                Some(s) => fastrand::Rng::with_seed(s),
                None => fastrand::Rng::new(),
            },
        }
    }

    /// Candidate moves for the side to move in `state`, jittered to
    /// break prior ties and sorted so the best prior is last.
    fn untried_moves(&mut self, state: &GameState, komi: f64) -> Vec<(Loc, f64)> {
        let to_move = state.player_just_moved.other();
        let mut moves = self.heuristic.move_probs(to_move, state, komi);
        for entry in &mut moves {
            entry.1 += self.rng.f64() * 1e-5;
        }
        moves.sort_by(|a, b| a.1.total_cmp(&b.1));
        moves
    }

    fn new_node(
        &mut self,
        mv: Loc,
        parent: Option<usize>,
        state: GameState,
        prior: f64,
        komi: f64,
    ) -> SearchNode {
        let untried = self.untried_moves(&state, komi);
        SearchNode {
            mv,
            parent,
            state,
            visits: 0.0,
            wins: 0.0,
            prior,
            children: Vec::new(),
            untried,
        }
    }

    /// One selection / expansion / rollout / backpropagation pass.
    fn simulate(&mut self, arena: &mut Vec<SearchNode>, komi: f64) {
        // Select down to a node with untried moves (or a terminal).
        let mut n = 0;
        while arena[n].untried.is_empty() && !arena[n].children.is_empty() {
            n = *arena[n]
                .children
                .iter()
                .max_by(|&&a, &&b| {
                    arena[a]
                        .selection_score()
                        .total_cmp(&arena[b].selection_score())
                })
                .expect("children is non-empty");
        }

        // Expand the best untried move.
        if let Some((mv, prior)) = arena[n].untried.pop() {
            let to_move = arena[n].player_just_moved().other();
            let state = arena[n].state.play_move(to_move, mv);
            let child = self.new_node(mv, Some(n), state, prior, komi);
            arena.push(child);
            let idx = arena.len() - 1;
            arena[n].children.push(idx);
            n = idx;
        }

        // Roll the game out from here.
        let mut state = arena[n].state.clone();
        let max_moves = state.board.size * state.board.size * 3;
        let mut num_moves = 0;
        while !state.is_game_over() && num_moves < max_moves {
            let p = state.player_just_moved.other();
            let mv = self.rollout.suggest_move(p, &state, komi);
            state = state.play_move(p, mv);
            num_moves += 1;
        }

        // Backpropagate, flipping the result at each level.
        let mut result = game_result(&state, arena[n].player_just_moved(), komi);
        let mut curr = Some(n);
        while let Some(i) = curr {
            arena[i].wins += result;
            arena[i].visits += 1.0;
            result = 1.0 - result;
            curr = arena[i].parent;
        }
    }

    /// Build a tree rooted at `state` and run simulations against the
    /// budget and the clock. Returns the arena; the root is index 0.
    fn run_search(&mut self, state: &GameState, komi: f64) -> Vec<SearchNode> {
        let root = self.new_node(location::UNDEFINED, None, state.clone(), 0.0, komi);
        let mut arena = vec![root];
        let start = Instant::now();
        for _ in 0..self.num_sims {
            self.simulate(&mut arena, komi);
            if start.elapsed() > self.max_think {
                break;
            }
        }
        arena
    }
}

/// Final result in [0, 1] from the viewpoint of `player_just_moved`,
/// counting a jigo as half.
fn game_result(state: &GameState, player_just_moved: Player, komi: f64) -> f64 {
    let (b, w) = state.board.score();
    let margin = match player_just_moved {
        Player::White => (w as f64 + komi) - b as f64,
        Player::Black => b as f64 - (w as f64 + komi),
    };
    if margin > 0.0 {
        1.0
    } else if margin < 0.0 {
        0.0
    } else {
        0.5
    }
}

impl Engine for MctsEngine {
    fn suggest_move(&mut self, player: Player, state: &GameState, komi: f64) -> Loc {
        let good_moves = self.heuristic.move_probs(player, state, komi);
        match good_moves.len() {
            0 => location::PASS,
            1 => good_moves[0].0,
            _ => {
                let arena = self.run_search(state, komi);
                // The most-visited child is less noisy than the one
                // with the best win rate.
                arena[0]
                    .children
                    .iter()
                    .max_by(|&&a, &&b| arena[a].visits.total_cmp(&arena[b].visits))
                    .map(|&i| arena[i].mv)
                    .unwrap_or(location::PASS)
            }
        }
    }

    fn move_probs(&mut self, _player: Player, state: &GameState, komi: f64) -> Vec<(Loc, f64)> {
        let arena = self.run_search(state, komi);
        let max_visits = arena[0]
            .children
            .iter()
            .map(|&i| arena[i].visits)
            .fold(f64::NEG_INFINITY, f64::max);
        if !max_visits.is_finite() || max_visits <= 0.0 {
            return Vec::new();
        }
        arena[0]
            .children
            .iter()
            .map(|&i| (arena[i].mv, arena[i].visits / max_visits))
            .collect()
    }

    fn detail_score(&mut self, _player: Player, _l: Loc, _state: &GameState) -> String {
        "not implemented".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::engine::NoEyeEngine;
    use crate::location::loc;
    use crate::state::KoRule;

    fn small_mcts(num_sims: usize) -> MctsEngine {
        MctsEngine::new(
            Box::new(NoEyeEngine::new(Some(1))),
            Box::new(NoEyeEngine::new(Some(2))),
            num_sims,
            Some(3),
        )
    }

    #[test]
    fn test_game_result_perspective() {
        // Black holds six points to white's one; the empties touch both
        // colors and stay neutral.
        let board = Board::from_text(
            "
           3 X X X
           2 X X X
           1 . O .
            ",
        )
        .unwrap();
        let state = GameState::with_board(board, Player::White, KoRule::Superko);
        assert_eq!(game_result(&state, Player::Black, 0.0), 1.0);
        assert_eq!(game_result(&state, Player::White, 0.0), 0.0);
        // A komi that exactly balances the margin scores as a draw.
        let (b, w) = state.board.score();
        let balancing_komi = b as f64 - w as f64;
        assert_eq!(game_result(&state, Player::Black, balancing_komi), 0.5);
    }

    #[test]
    fn test_move_probs_cover_candidates() {
        let board = Board::from_text(
            "
           3 X O .
           2 X O .
           1 X O .
            ",
        )
        .unwrap();
        let state = GameState::with_board(board, Player::White, KoRule::Superko);
        let mut engine = small_mcts(300);
        let probs = engine.move_probs(Player::Black, &state, 0.0);
        // Three candidate points in the right column; the most-visited
        // one normalizes to 1.
        assert!(!probs.is_empty());
        let max = probs.iter().map(|&(_, p)| p).fold(f64::MIN, f64::max);
        assert_eq!(max, 1.0);
        let candidates = [loc(1, 3), loc(2, 3), loc(3, 3)];
        for (l, p) in probs {
            assert!(candidates.contains(&l));
            assert!(p > 0.0 && p <= 1.0);
        }
    }

    #[test]
    fn test_suggest_move_passes_on_terminal_state() {
        let state = GameState::new_game(5)
            .play_move(Player::Black, location::PASS)
            .play_move(Player::White, location::PASS);
        let mut engine = small_mcts(10);
        assert_eq!(
            engine.suggest_move(Player::Black, &state, 0.0),
            location::PASS
        );
    }

    #[test]
    fn test_most_visited_child_wins() {
        // With only two moves left, the search visits the better one
        // more often: capturing at (1,3) keeps everything.
        let board = Board::from_text(
            "
           3 . X .
           2 X X O
           1 X O .
             1 2 3
            ",
        )
        .unwrap();
        let state = GameState::with_board(board, Player::White, KoRule::Superko);
        let mut engine = small_mcts(200);
        let mv = engine.suggest_move(Player::Black, &state, 0.0);
        assert!(mv == loc(1, 3) || mv == loc(3, 3) || mv == loc(3, 1));
    }
}
