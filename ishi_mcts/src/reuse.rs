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

//! Tree reuse across moves, and pondering during the opponent's turn
//! (spec.md §4.7).

use std::fmt;
use std::sync::Arc;

use ishi_board::{Board, Coord};

use crate::options::Config;
use crate::ownership::OwnerMap;
use crate::pool::Pool;
use crate::tree::Tree;

/// Recoverable failure at the `notify_play`/`genmove` boundary (spec.md §7
/// "Recoverable at engine boundary"): the played coordinate has no matching
/// child in the current tree (an unexpected move — unusual rengo, a dropped
/// move). The caller must discard the tree entirely and build fresh on the
/// next `genmove`.
#[derive(Debug)]
pub struct PromoteError;

impl fmt::Display for PromoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "played coordinate has no matching child in the current tree")
    }
}

impl std::error::Error for PromoteError {}

/// `promote(tree, played_coord)` at a `notify_play` boundary.
pub fn promote_on_play(tree: Tree, played: Coord) -> Result<Tree, PromoteError> {
    tree.promote(played).map_err(|_| PromoteError)
}

/// A background search running on the opponent's position. Identical to a
/// foreground search except it carries no stop condition of its own — the
/// next `notify_play` halts it (spec.md §4.7).
pub struct Ponder {
    pool: Pool,
}

impl Ponder {
    pub fn start(tree: Tree, board_after_our_move: Board, config: Arc<Config>, owner_map: Arc<OwnerMap>) -> Ponder {
        Ponder { pool: Pool::start(tree, board_after_our_move, config, owner_map) }
    }

    /// Halt pondering and reclaim the tree plus games played, so the next
    /// `genmove` can keep searching from where pondering left off.
    pub fn stop(self) -> (Tree, u32) {
        self.pool.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Config, ThreadModel};
    use ishi_board::Color;
    use std::time::Duration;

    #[test]
    fn promote_on_play_drops_the_tree_on_an_unknown_move() {
        let tree = Tree::init(Color::Black, 1 << 20, false);
        let board = Board::new(9);
        tree.expand(tree.root_id(), &board, &crate::policy::UniformPrior);

        let result = promote_on_play(tree, Coord::Resign);
        assert!(result.is_err());
    }

    #[test]
    fn pondering_keeps_accumulating_until_stopped() {
        let board = Board::new(9);
        let tree = Tree::init(Color::White, 1 << 20, false);
        let config = Arc::new(Config {
            threads: 1,
            thread_model: ThreadModel::TreeVl,
            force_seed: Some(5),
            ..Config::default()
        });
        let owner_map = Arc::new(OwnerMap::new(9));

        let ponder = Ponder::start(tree, board, config, owner_map);
        std::thread::sleep(Duration::from_millis(10));
        let (tree, games) = ponder.stop();

        assert!(games > 0);
        assert_eq!(tree.root().stats.playouts(), games);
    }
}
