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

//! The main-thread search loop: progress, memory, and the stopping rules of
//! spec.md §4.5.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ishi_board::Board;

use crate::options::Config;
use crate::ownership::OwnerMap;
use crate::pool::Pool;
use crate::time_control::StopConditions;
use crate::tree::Tree;

/// How often a status line is emitted, independent of the busy-wait poll
/// period itself (spec.md §4.5 step 2).
const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Run a search to completion: start the pool, poll until a stop condition
/// fires, then stop it and return the resulting tree plus games played.
pub fn run(tree: Tree, board: Board, config: Arc<Config>, owner_map: Arc<OwnerMap>, stop_conditions: StopConditions) -> (Tree, u32) {
    let selection = config.selection.build();
    let pool = Pool::start(tree, board, config.clone(), owner_map);

    let mut last_progress = Instant::now();
    let mut memory_warned = false;

    loop {
        std::thread::sleep(ishi_util::config::TREE_BUSYWAIT_INTERVAL);

        let tree = pool.progress_tree();
        let playouts = tree.root().stats.playouts();

        if last_progress.elapsed() >= PROGRESS_INTERVAL {
            ishi_util::progress_line!("{} playouts, {} nodes", playouts, tree.node_count());
            last_progress = Instant::now();
        }

        if !memory_warned && tree.memory_exceeded(config.max_tree_size) {
            ishi_util::warn_line!(
                "search tree reached max_tree_size ({} bytes); expansion stops but existing nodes keep accumulating stats",
                config.max_tree_size
            );
            memory_warned = true;
        }

        let hard_stop = match stop_conditions {
            StopConditions::Games { worst, .. } => playouts >= worst,
            StopConditions::Walltime { worst, .. } => Instant::now() >= worst,
        };

        if hard_stop {
            break;
        }

        let best = selection.choose(tree, tree.root_id());

        let early_win = if let Some(id) = best {
            let node = tree.node(id);
            let node_playouts = node.stats.playouts();
            let value = node.stats.value();
            (node_playouts >= 2000 && value >= config.loss_threshold) || (node_playouts >= 500 && value >= 0.95)
        } else {
            false
        };

        if early_win {
            break;
        }

        let desired_done = match stop_conditions {
            StopConditions::Games { desired, .. } => playouts >= desired,
            StopConditions::Walltime { desired, .. } => Instant::now() >= desired,
        };

        if desired_done {
            let winner = selection.winner(tree, tree.root_id());
            if best.is_none() || winner == best {
                break;
            }
        }
    }

    pool.stop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Config, ThreadModel};
    use ishi_board::Color;

    #[test]
    fn a_small_games_budget_stops_promptly_and_matches_root_playouts() {
        let board = Board::new(9);
        let tree = Tree::init(Color::Black, 1 << 20, false);
        let config = Arc::new(Config {
            threads: 1,
            thread_model: ThreadModel::TreeVl,
            force_seed: Some(3),
            ..Config::default()
        });
        let owner_map = Arc::new(OwnerMap::new(9));
        let stop_conditions = StopConditions::Games { desired: 50, worst: 200 };

        let (tree, games) = run(tree, board, config, owner_map, stop_conditions);

        assert!(games >= 50);
        assert_eq!(tree.root().stats.playouts(), games);
    }
}
