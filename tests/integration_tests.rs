//! End-to-end tests across the rules, feature, and engine layers.

use std::collections::HashMap;

use sente::board::{Board, Player, Square};
use sente::engine::{self, Engine, EngineConfig, FeatureEngine, NoEyeEngine, RandomEngine};
use sente::features::{FeatureExtractor, parse_weights};
use sente::gtp::GtpClient;
use sente::location::{self, loc};
use sente::pattern::{CountMinSketch, Pattern, PatternExtractor};
use sente::state::{GameState, KoRule};

/// Apply alternating moves, black first, to a fresh game state.
fn setup_game(size: usize, moves: &[&str]) -> GameState {
    let mut state = GameState::new_game(size);
    let mut player = Player::Black;
    for mv in moves {
        let l = location::parse(mv).unwrap();
        assert!(state.is_legal_move(player, l), "illegal setup move {mv}");
        state = state.play_move(player, l);
        player = player.other();
    }
    state
}

// =============================================================================
// Rules layer
// =============================================================================

#[test]
fn test_full_game_sequence_with_capture() {
    // Black surrounds the white stone at C3 and takes it.
    let state = setup_game(5, &["C2", "C3", "B3", "pass", "D3", "pass", "C4"]);
    let c3 = location::parse("C3").unwrap();
    assert_eq!(state.board.get(c3), Square::Empty);
    assert_eq!(state.white_captured, 1);
    assert_eq!(state.black_captured, 0);
}

#[test]
fn test_superko_forbids_position_recreation_across_layers() {
    let board = Board::from_text(
        "
       4 . . . .
       3 . X O .
       2 X . X O
       1 . X O .
         1 2 3 4
        ",
    )
    .unwrap();
    let state = GameState::with_board(board, Player::Black, KoRule::Superko)
        .play_move(Player::White, loc(2, 2));
    // Direct recapture repeats the position, so the rules and the
    // engines both exclude it.
    assert!(!state.is_legal_move(Player::Black, loc(2, 3)));
    assert!(!engine::non_bad_moves(Player::Black, &state).contains(&loc(2, 3)));
}

#[test]
fn test_scoring_matches_captures() {
    // White captures the lone black stone and owns the whole board.
    let state = setup_game(3, &["B2", "B1", "pass", "A2", "pass", "C2", "pass", "B3"]);
    assert_eq!(state.black_captured, 1);
    let (b, w) = state.board.score();
    assert_eq!((b, w), (0, 9));
}

// =============================================================================
// Patterns and features
// =============================================================================

#[test]
fn test_pattern_canonical_form_is_shared_by_all_rotations() {
    // One asymmetric corner shape, pushed through all four corners by
    // rotating the diagram by hand; every reading canonicalizes alike.
    let boards = [
        "
       3 . . .
       2 X . .
       1 O X .
        ",
        "
       3 O X .
       2 X . .
       1 . . .
        ",
        "
       3 . X O
       2 . . X
       1 . . .
        ",
        "
       3 . . .
       2 . . X
       1 . X O
        ",
    ];
    let extractor = PatternExtractor::new(3);
    let patterns: Vec<Pattern> = boards
        .iter()
        .map(|text| {
            let board = Board::from_text(text).unwrap();
            extractor.pattern_at(&board, loc(2, 2), Player::Black)
        })
        .collect();
    for p in &patterns[1..] {
        assert_eq!(*p, patterns[0]);
    }
}

#[test]
fn test_sketch_estimates_upper_bound_true_counts() {
    let mut sketch = CountMinSketch::new();
    let board = Board::from_text(
        "
       5 . . . . .
       4 . X O . .
       3 . X O . .
       2 . . . . .
       1 . . . . .
         1 2 3 4 5
        ",
    )
    .unwrap();
    let extractor = PatternExtractor::new(3);
    let mut true_counts: HashMap<Pattern, u32> = HashMap::new();
    for _ in 0..3 {
        for l in board.board_locs() {
            let p = extractor.pattern_at(&board, l, Player::Black);
            sketch.add(&p);
            *true_counts.entry(p).or_insert(0) += 1;
        }
    }
    for (p, count) in true_counts {
        assert!(sketch.frequency(&p) >= count);
    }
}

#[test]
fn test_feature_extraction_on_played_out_position() {
    let state = setup_game(5, &["C3", "C2", "D2", "B3", "D3"]);
    let patterns = HashMap::new();
    let extractor = FeatureExtractor::new(&state, Player::White, &patterns, None);
    // Last move was black D3; distance features measure from there.
    let d3 = location::parse("D3").unwrap();
    assert_eq!(extractor.dist_to_last_move(d3 + location::RIGHT), 2);
    // Every feature name resolves on every legal point.
    for l in state.legal_moves(Player::White) {
        for name in sente::features::FEATURE_NAMES {
            assert!(extractor.feature(name, l, true).is_ok());
        }
    }
}

// =============================================================================
// Engines
// =============================================================================

#[test]
fn test_seeded_engines_are_reproducible() {
    let state = setup_game(9, &["E5", "C3"]);
    let a = RandomEngine::new(Some(99)).suggest_move(Player::Black, &state, 6.5);
    let b = RandomEngine::new(Some(99)).suggest_move(Player::Black, &state, 6.5);
    assert_eq!(a, b);

    let a = NoEyeEngine::new(Some(7)).suggest_move(Player::Black, &state, 6.5);
    let b = NoEyeEngine::new(Some(7)).suggest_move(Player::Black, &state, 6.5);
    assert_eq!(a, b);
}

#[test]
fn test_noeye_playout_preserves_life() {
    // Black is alive in the corner with two one-point eyes; no number
    // of eye-avoiding playout moves may fill them.
    let board = Board::from_text(
        "
       5 . . . . .
       4 . . . . .
       3 X X X X X
       2 . X . X .
       1 X X X X X
         1 2 3 4 5
        ",
    )
    .unwrap();
    let state = GameState::with_board(board, Player::White, KoRule::Superko);
    let eyes = [loc(2, 1), loc(2, 3), loc(2, 5)];
    let moves = engine::non_bad_moves(Player::Black, &state);
    for eye in eyes {
        assert!(!moves.contains(&eye));
    }
}

#[test]
fn test_feature_engine_full_game_against_random() {
    let weights = parse_weights(
        "capture_count\t1\t2.0\n\
         capture_count\t2\t3.0\n\
         self_atari\t1\t-2.0\n",
    )
    .unwrap();
    let mut feature = FeatureEngine::new(weights, HashMap::new(), Some(1)).unwrap();
    let mut random = RandomEngine::new(Some(2));

    let mut state = GameState::new_game(5);
    let mut player = Player::Black;
    let mut num_moves = 0;
    while !state.is_game_over() && num_moves < 5 * 5 * 3 {
        let mv = if player == Player::Black {
            feature.suggest_move(player, &state, 0.0)
        } else {
            random.suggest_move(player, &state, 0.0)
        };
        assert!(state.is_legal_move(player, mv));
        state = state.play_move(player, mv);
        player = player.other();
        num_moves += 1;
    }
    // The game reached a conclusion without an illegal move.
    assert!(state.is_game_over() || num_moves == 5 * 5 * 3);
}

#[test]
fn test_registry_builds_data_backed_engines() {
    let config = EngineConfig {
        weights_file: "data/features.tsv".into(),
        patterns_file: "data/patterns.tsv".into(),
        seed: Some(5),
    };
    for name in ["random", "noeye", "feature", "rave", "mcts", "mcts2"] {
        assert!(engine::create_engine(name, &config).is_ok(), "{name}");
    }
    assert!(engine::create_engine("bogus", &config).is_err());
}

// =============================================================================
// GTP session
// =============================================================================

#[test]
fn test_gtp_session() {
    let mut client = GtpClient::new(Box::new(NoEyeEngine::new(Some(3))), "noeye", 9, 0.0);
    assert!(client.execute("boardsize", &["5"]).0);
    assert!(client.execute("komi", &["0.5"]).0);
    assert!(client.execute("play", &["B", "C3"]).0);
    let (ok, vertex) = client.execute("genmove", &["W"]);
    assert!(ok);
    assert!(vertex == "pass" || location::parse(&vertex).is_ok());

    // Board rendering includes the black stone.
    let (ok, diagram) = client.execute("showboard", &[]);
    assert!(ok);
    assert!(diagram.contains('X'));

    // Replaying on an occupied point is rejected.
    let (ok, msg) = client.execute("play", &["W", "C3"]);
    assert!(!ok);
    assert_eq!(msg, "illegal move");

    assert!(client.execute("clear_board", &[]).0);
    let (_, list) = client.execute("all_legal", &["B"]);
    assert_eq!(list.split_whitespace().count(), 25);
}

#[test]
fn test_gtp_detail_score_reports_features() {
    let weights = parse_weights("near_corner\t1\t0.45\n").unwrap();
    let feature = FeatureEngine::new(weights, HashMap::new(), Some(1)).unwrap();
    let mut client = GtpClient::new(Box::new(feature), "feature", 9, 6.5);
    let (ok, detail) = client.execute("detail_score", &["B", "C3"]);
    assert!(ok);
    assert!(detail.contains("near_corner_1=0.45"), "{detail}");
}
