//! Chain and liberty analysis: union-find grouping of connected
//! same-color stones, plus the fast eye/edge checks the playout engines
//! lean on.

use std::collections::HashSet;

use crate::board::{Board, Player, Square};
use crate::location::{self, Loc};

/// A collection of disjoint sets over the integers `0..size`, with
/// union by rank and path compression.
pub struct DisjointSet {
    rank: Vec<u32>,
    parent: Vec<usize>,
}

impl DisjointSet {
    pub fn new(size: usize) -> DisjointSet {
        DisjointSet {
            rank: vec![0; size],
            parent: (0..size).collect(),
        }
    }

    /// The representative element of the set containing `i`.
    /// Iterative two-pass path compression, no recursion.
    pub fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = i;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Merge the sets containing `i` and `j`.
    pub fn union(&mut self, i: usize, j: usize) {
        let irep = self.find(i);
        let jrep = self.find(j);
        if irep == jrep {
            return;
        }
        if self.rank[irep] < self.rank[jrep] {
            self.parent[irep] = jrep;
        } else if self.rank[jrep] < self.rank[irep] {
            self.parent[jrep] = irep;
        } else {
            self.parent[irep] = jrep;
            self.rank[jrep] += 1;
        }
    }
}

/// A maximal connected group of equal-valued cells: its representative
/// index and all member locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub rep: Loc,
    pub elements: Vec<Loc>,
}

/// Partition the playable board into chains by unioning every cell with
/// its up and right neighbor when they hold the same value. Note this
/// includes chains of empty cells; callers filter by the color at
/// `chain.rep`.
pub fn find_chains(board: &Board) -> Vec<Chain> {
    let mut sets = DisjointSet::new(location::NUM_LOCS);
    for l in board.board_locs() {
        let up = l + location::UP;
        let right = l + location::RIGHT;
        if board.get(l) == board.get(up) {
            sets.union(l as usize, up as usize);
        }
        if board.get(l) == board.get(right) {
            sets.union(l as usize, right as usize);
        }
    }

    let mut chains: Vec<Chain> = Vec::new();
    let mut rep_index = vec![usize::MAX; location::NUM_LOCS];
    for l in board.board_locs() {
        let rep = sets.find(l as usize);
        if rep_index[rep] == usize::MAX {
            rep_index[rep] = chains.len();
            chains.push(Chain {
                rep: rep as Loc,
                elements: Vec::new(),
            });
        }
        chains[rep_index[rep]].elements.push(l);
    }
    chains
}

/// The chain containing a given location, if the location is on board.
pub fn chain_at(board: &Board, l: Loc) -> Option<Chain> {
    find_chains(board).into_iter().find(|c| c.elements.contains(&l))
}

/// Empty points orthogonally adjacent to any member of the chain.
pub fn liberties(board: &Board, chain: &Chain) -> HashSet<Loc> {
    let mut libs = HashSet::new();
    for &member in &chain.elements {
        for n in location::neighbors(member) {
            if board.get(n) == Square::Empty {
                libs.insert(n);
            }
        }
    }
    libs
}

/// All stones of `player` that belong to chains with exactly one
/// liberty.
pub fn stones_in_atari(player: Player, board: &Board) -> Vec<Loc> {
    let sq = player.square();
    let mut stones = Vec::new();
    for chain in find_chains(board) {
        if board.get(chain.rep) == sq && liberties(board, &chain).len() == 1 {
            stones.extend(chain.elements);
        }
    }
    stones
}

/// Fast, conservative eye check for the given color at an empty point.
///
/// If this returns true the point *is* an eye; if it returns false the
/// point may or may not be one. All four orthogonal neighbors must be
/// the color or off board; then either three diagonals are the color
/// with exactly one belonging to the opponent, or no diagonal belongs
/// to the opponent at all. The false-negative bias is intentional —
/// callers only use it to avoid filling their own eyes.
pub fn is_trivial_eye(sq: Square, l: Loc, board: &Board) -> bool {
    let other = sq.opposite();

    for n in location::neighbors(l) {
        let c = board.get(n);
        if c != sq && c != Square::OffBoard {
            return false;
        }
    }

    let mut same_diag = 0;
    let mut other_diag = 0;
    for d in location::diagonals(l) {
        let c = board.get(d);
        if c == sq {
            same_diag += 1;
        } else if c == other {
            other_diag += 1;
        }
    }

    (same_diag == 3 && other_diag == 1) || other_diag == 0
}

/// True for an edge point with no stone among its eight neighbors.
pub fn is_empty_edge(l: Loc, board: &Board) -> bool {
    let on_edge = location::neighbors(l)
        .iter()
        .any(|&n| board.get(n) == Square::OffBoard);
    if !on_edge {
        return false;
    }
    location::neighbors(l)
        .iter()
        .chain(location::diagonals(l).iter())
        .all(|&n| !matches!(board.get(n), Square::Black | Square::White))
}
