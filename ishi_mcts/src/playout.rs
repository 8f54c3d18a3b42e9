// Copyright 2024
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! One descend-expand-simulate-backup cycle (spec.md §4.3).

use std::collections::HashSet;

use ishi_board::{Board, Color, Coord};
use rand::rngs::SmallRng;

use crate::options::{Config, ThreadModel};
use crate::ownership::OwnerMap;
use crate::policy::{PlayoutPolicy, Prior};
use crate::selection::{maybe_randomize, SelectionPolicy};
use crate::tree::{ExpandOutcome, NodeId, Tree};

/// Run one `uct_playout` iteration and return the number of games it added
/// (always `1`, per spec.md §4.3 step 7 — the return value exists so the
/// worker pool can sum it without re-deriving it from `root.playouts`).
pub fn uct_playout(
    tree: &Tree,
    root_board: &Board,
    selection: &SelectionPolicy,
    playout_policy: &dyn PlayoutPolicy,
    prior: &dyn Prior,
    config: &Config,
    owner_map: &OwnerMap,
    rng: &mut SmallRng,
) -> u32 {
    let virtual_loss = config.thread_model == ThreadModel::TreeVl;
    let mut board = root_board.clone();
    let mut path: Vec<NodeId> = vec![tree.root_id()];
    let mut amaf: HashSet<(Color, Coord)> = HashSet::new();

    // Descend.
    let mut node_id = tree.root_id();
    loop {
        let node = tree.node(node_id);

        if !node.is_expanded() {
            if node.stats.playouts() >= config.expand_p {
                expand_with_backoff(tree, node_id, &board, prior);
            }

            if !tree.node(node_id).is_expanded() {
                break;
            }
        }

        let randomized = maybe_randomize(config.random_policy_every, rng, &tree.node(node_id).children());
        let Some(child_id) = randomized.or_else(|| selection.choose(tree, node_id)) else {
            break;
        };

        if virtual_loss {
            tree.node(child_id).stats.add_virtual_loss();
        }

        let child = tree.node(child_id);
        board
            .play(child.color, child.coord)
            .expect("a move stored in the tree must be legal on its parent board");

        if let Coord::Point(_) = child.coord {
            amaf.insert((child.color, child.coord));
        }

        path.push(child_id);
        node_id = child_id;
    }

    // Simulate.
    let mut passes = if board.last_move_was_pass() { 1 } else { 0 };
    let mut moves_played = 0usize;

    while passes < 2 && moves_played < config.gamelen {
        let mover = board.to_move();
        let coord = playout_policy.choose(&board, mover, rng);
        board
            .play(mover, coord)
            .expect("the playout policy must only produce legal moves");

        if let Coord::Point(_) = coord {
            amaf.insert((mover, coord));
            passes = 0;
        } else {
            passes += 1;
        }

        moves_played += 1;

        if config.mercymin > 0 {
            let diff = board.capture_difference(Color::Black).unsigned_abs();
            if diff >= config.mercymin {
                break;
            }
        }
    }

    // Score and convert to a result in [0, 1] from the root mover's
    // perspective.
    let margin = board.score_area(tree.extra_komi);
    let black_ahead = margin > 0.0;
    let root_is_black = tree.root_color == Color::Black;
    let binary_result = if root_is_black == black_ahead { 1.0 } else { 0.0 };

    let result = if config.val_scale > 0.0 {
        let points = config.val_points.max(1.0);
        let scaled_margin = ((margin.abs() + config.val_extra) / points).clamp(0.0, 1.0);
        let continuous = if root_is_black == black_ahead {
            0.5 + 0.5 * scaled_margin
        } else {
            0.5 - 0.5 * scaled_margin
        };
        (1.0 - config.val_scale) * binary_result + config.val_scale * continuous
    } else {
        binary_result
    };

    // Backup.
    for &id in &path {
        let node = tree.node(id);
        let node_result = if node.color == tree.root_color { result } else { 1.0 - result };
        node.stats.add_result(node_result);

        let child_color = node.color.opposite();
        for child_id in node.children() {
            let child = tree.node(child_id);
            if amaf.contains(&(child_color, child.coord)) {
                let rave_result = if child_color == tree.root_color { result } else { 1.0 - result };
                child.rave.add_result(rave_result);
            }
        }
    }

    if virtual_loss {
        for &id in &path[1..] {
            tree.node(id).stats.remove_virtual_loss();
        }
    }

    owner_map.record(&board);

    1
}

/// `Tree::expand`'s retry loop: a losing descender spins briefly on
/// `ExpandOutcome::LostRace` before falling through to a playout from the
/// contended node (spec.md §4.1).
fn expand_with_backoff(tree: &Tree, id: NodeId, board: &Board, prior: &dyn Prior) -> ExpandOutcome {
    let backoff = crossbeam_utils::Backoff::new();

    loop {
        match tree.expand(id, board, prior) {
            ExpandOutcome::LostRace if !backoff.is_completed() => backoff.snooze(),
            outcome => return outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Config;
    use crate::ownership::OwnerMap;
    use crate::policy::{RandomPlayoutPolicy, UniformPrior};
    use ishi_board::Board;
    use rand::SeedableRng;

    #[test]
    fn one_playout_increments_root_and_ownermap() {
        let board = Board::new(9);
        let tree = Tree::init(Color::Black, 1 << 20, false);
        let selection = SelectionPolicy::ucb1(0.5);
        let playout_policy = RandomPlayoutPolicy;
        let prior = UniformPrior;
        let config = Config::default();
        let owner_map = OwnerMap::new(9);
        let mut rng = SmallRng::seed_from_u64(1);

        let games = uct_playout(&tree, &board, &selection, &playout_policy, &prior, &config, &owner_map, &mut rng);

        assert_eq!(games, 1);
        assert_eq!(tree.root().stats.playouts(), 1);
        assert_eq!(owner_map.playouts(), 1);
    }

    #[test]
    fn many_playouts_keep_values_in_unit_range() {
        let board = Board::new(9);
        let tree = Tree::init(Color::Black, 1 << 20, false);
        let selection = SelectionPolicy::ucb1(0.5);
        let playout_policy = RandomPlayoutPolicy;
        let prior = UniformPrior;
        let config = Config::default();
        let owner_map = OwnerMap::new(9);
        let mut rng = SmallRng::seed_from_u64(42);

        for _ in 0..50 {
            uct_playout(&tree, &board, &selection, &playout_policy, &prior, &config, &owner_map, &mut rng);
        }

        assert_eq!(tree.root().stats.playouts(), 50);
        assert!((0.0..=1.0).contains(&tree.root().stats.value()));
    }
}
