//! Game state on top of the board: whose turn just passed, the last two
//! moves, capture tallies, and the bounded window of prior position
//! hashes that enforces ko and superko.
//!
//! A placement is legal only if the board allows it *and* the resulting
//! board hash has not been seen inside the configured window. Simple ko
//! falls out of a window of two entries; a window of eight catches
//! position cycles like the pinwheel ko in practice. Snapback stays
//! legal under every rule because capturing more than one stone changes
//! the hash.

use std::collections::VecDeque;

use crate::board::{Board, Player};
use crate::location::{self, Loc};

/// Ko-detection strictness, expressed as how many prior position hashes
/// are remembered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KoRule {
    /// No repetition check at all.
    Allowed,
    /// Forbid only the immediate single-stone recapture.
    Simple,
    /// Positional superko over a bounded lookback.
    Superko,
}

impl KoRule {
    pub fn hash_window(self) -> usize {
        match self {
            KoRule::Allowed => 0,
            KoRule::Simple => 2,
            KoRule::Superko => 8,
        }
    }
}

/// One position in a game, including enough history for ko enforcement
/// and game-over detection. Value type: `play_move` returns a new state.
#[derive(Clone)]
pub struct GameState {
    pub board: Board,
    pub player_just_moved: Player,
    pub prev_move: Loc,
    pub prev_prev_move: Loc,
    pub black_captured: u32,
    pub white_captured: u32,
    pub ko_rule: KoRule,
    /// FIFO of recent board hashes, newest at the back, oldest trimmed.
    hash_history: VecDeque<u64>,
}

impl GameState {
    pub fn new_game(size: usize) -> GameState {
        GameState::with_board(Board::empty(size), Player::White, KoRule::Superko)
    }

    /// Start from an arbitrary board position; `player_just_moved` makes
    /// the other player the one to move.
    pub fn with_board(board: Board, player_just_moved: Player, ko_rule: KoRule) -> GameState {
        let mut hash_history = VecDeque::new();
        if ko_rule.hash_window() > 0 {
            hash_history.push_back(board.hash);
        }
        GameState {
            board,
            player_just_moved,
            prev_move: location::UNDEFINED,
            prev_prev_move: location::UNDEFINED,
            black_captured: 0,
            white_captured: 0,
            ko_rule,
            hash_history,
        }
    }

    pub fn play_move(&self, player: Player, l: Loc) -> GameState {
        let result = self.board.play(player, l);
        let mut hash_history = self.hash_history.clone();
        let window = self.ko_rule.hash_window();
        if window > 0 {
            hash_history.push_back(result.board.hash);
            while hash_history.len() > window {
                hash_history.pop_front();
            }
        }
        GameState {
            board: result.board,
            player_just_moved: player,
            prev_move: l,
            prev_prev_move: self.prev_move,
            black_captured: self.black_captured + result.black_captured,
            white_captured: self.white_captured + result.white_captured,
            ko_rule: self.ko_rule,
            hash_history,
        }
    }

    /// Board-level legality plus the repetition check: the position the
    /// move produces must not recur within the hash window.
    pub fn is_legal_move(&self, player: Player, l: Loc) -> bool {
        if l < 0 {
            return true;
        }
        if !self.board.is_legal_move(player.square(), l) {
            return false;
        }
        if self.ko_rule.hash_window() == 0 {
            return true;
        }
        let result = self.board.play(player, l);
        !self.hash_history.contains(&result.board.hash)
    }

    pub fn legal_moves(&self, player: Player) -> Vec<Loc> {
        self.board
            .board_locs()
            .filter(|&l| self.is_legal_move(player, l))
            .collect()
    }

    /// The game ends when both players pass in a row.
    pub fn is_game_over(&self) -> bool {
        self.prev_move == location::PASS && self.prev_prev_move == location::PASS
    }
}

/// Undo-able stack of game states, the mutable handle the protocol layer
/// holds on an ongoing game.
pub struct Game {
    size: usize,
    pub komi: f64,
    states: Vec<GameState>,
}

impl Game {
    pub fn new(size: usize, komi: f64) -> Game {
        Game {
            size,
            komi,
            states: vec![GameState::new_game(size)],
        }
    }

    pub fn current(&self) -> &GameState {
        self.states.last().expect("game always has a state")
    }

    pub fn play_move(&mut self, player: Player, l: Loc) {
        let next = self.current().play_move(player, l);
        self.states.push(next);
    }

    /// Pop the most recent move; the initial position is never popped.
    pub fn undo_move(&mut self) {
        if self.states.len() > 1 {
            self.states.pop();
        }
    }

    pub fn reset(&mut self) {
        self.states = vec![GameState::new_game(self.size)];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::loc;

    fn ko_board() -> Board {
        Board::from_text(
            "
           4 . . . .
           3 . X O .
           2 X . X O
           1 . X O .
             1 2 3 4
            ",
        )
        .unwrap()
    }

    #[test]
    fn test_simple_ko_recapture_is_illegal() {
        let state = GameState::with_board(ko_board(), Player::Black, KoRule::Superko)
            .play_move(Player::White, loc(2, 2));
        // White just captured the black stone at (2,3); black taking
        // straight back would repeat the position.
        assert!(!state.is_legal_move(Player::Black, loc(2, 3)));
    }

    #[test]
    fn test_simple_ko_caught_by_two_entry_window() {
        let state = GameState::with_board(ko_board(), Player::Black, KoRule::Simple)
            .play_move(Player::White, loc(2, 2));
        assert!(!state.is_legal_move(Player::Black, loc(2, 3)));
    }

    #[test]
    fn test_ko_allowed_rule_permits_recapture() {
        let state = GameState::with_board(ko_board(), Player::Black, KoRule::Allowed)
            .play_move(Player::White, loc(2, 2));
        assert!(state.is_legal_move(Player::Black, loc(2, 3)));
    }

    #[test]
    fn test_snapback_is_legal() {
        // https://senseis.xmp.net/?Snapback
        let snapback = Board::from_text(
            "
           7 . . . . . . .
           6 . x o o o . .
           5 . x o x x o .
           4 . . x o . o .
           3 . . x x o o .
           2 . . x . x x .
           1 . . . . . . .
             1 2 3 4 5 6 7
        ",
        )
        .unwrap();
        let state = GameState::with_board(snapback, Player::White, KoRule::Superko)
            .play_move(Player::Black, loc(4, 5));
        // Black just captured one stone at (4,5), putting itself in
        // atari. White recaptures two stones: a different position, so
        // no ko violation.
        assert!(state.is_legal_move(Player::White, loc(4, 4)));
    }

    #[test]
    fn test_pinwheel_superko() {
        // https://senseis.xmp.net/?PinwheelKo — a 7-move cycle of
        // single-stone captures that recreates the starting position.
        let pinwheel = "
            3 O X .
            2 . O X
            1 O X .
              1 2 3
        ";
        let play_cycle = |ko_rule: KoRule| {
            GameState::with_board(Board::from_text(pinwheel).unwrap(), Player::White, ko_rule)
                .play_move(Player::White, loc(3, 3))
                .play_move(Player::Black, loc(2, 1))
                .play_move(Player::White, loc(1, 3))
                .play_move(Player::Black, loc(3, 2))
                .play_move(Player::White, loc(1, 1))
                .play_move(Player::Black, loc(2, 3))
                .play_move(Player::White, loc(3, 1))
        };

        // With the full 8-entry window the replay at (1,2) would recreate
        // the starting position, so it is rejected.
        let state = play_cycle(KoRule::Superko);
        assert!(!state.is_legal_move(Player::Black, loc(1, 2)));
        // The immediate recapture at (2,1) is a plain ko either way.
        assert!(!state.is_legal_move(Player::Black, loc(2, 1)));

        // A two-entry window has already forgotten the starting position.
        let state = play_cycle(KoRule::Simple);
        assert!(state.is_legal_move(Player::Black, loc(1, 2)));
        assert!(!state.is_legal_move(Player::Black, loc(2, 1)));
    }

    #[test]
    fn test_game_over_after_two_passes() {
        let state = GameState::new_game(5);
        assert!(!state.is_game_over());
        let state = state.play_move(Player::Black, location::PASS);
        assert!(!state.is_game_over());
        let state = state.play_move(Player::White, location::PASS);
        assert!(state.is_game_over());
    }

    #[test]
    fn test_capture_tallies_accumulate() {
        let board = Board::from_text(
            "
           3 . . .
           2 X O .
           1 X O .
            ",
        )
        .unwrap();
        let state = GameState::with_board(board, Player::Black, KoRule::Superko)
            .play_move(Player::White, loc(3, 1));
        assert_eq!(state.black_captured, 2);
        assert_eq!(state.white_captured, 0);
    }

    #[test]
    fn test_undo_restores_previous_state() {
        let mut game = Game::new(5, 6.5);
        let hash0 = game.current().board.hash;
        game.play_move(Player::Black, loc(3, 3));
        assert_ne!(game.current().board.hash, hash0);
        game.undo_move();
        assert_eq!(game.current().board.hash, hash0);
        // The initial state cannot be undone away.
        game.undo_move();
        assert_eq!(game.current().board.hash, hash0);
    }
}
