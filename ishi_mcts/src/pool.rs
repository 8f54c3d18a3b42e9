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

//! Spawns, signals and joins the worker threads (spec.md §4.4). A search is
//! `start`ed, runs until `stop`ped, and hands back the tree it searched plus
//! the total games played. `SearchHandle` is the redesign of the source's
//! global `uct_halt` sentinel plus thread-local `thread_id` (spec.md §9):
//! one atomic flag, shared by `Arc`, with worker identity passed explicitly
//! into each worker's closure instead of thread-local state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use ishi_board::Board;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::options::{Config, ThreadModel};
use crate::ownership::OwnerMap;
use crate::playout::uct_playout;
use crate::tree::Tree;

/// Read-only view of a running search's halt flag.
#[derive(Clone)]
pub struct SearchHandle {
    halt: Arc<AtomicBool>,
}

impl SearchHandle {
    pub fn is_halted(&self) -> bool {
        self.halt.load(Ordering::Acquire)
    }
}

enum Workers {
    /// TREE / TREEVL: every worker shares one tree via `Arc`.
    Shared { handles: Vec<JoinHandle<u32>>, tree: Arc<Tree> },
    /// ROOT: every worker owns a private deep-cloned tree, wrapped in `Arc`
    /// so the controller can still poll `trees[0]` for progress while the
    /// search runs — reading is not the "sharing" spec.md §5 rules out,
    /// only cross-worker mutation is. `trees[0]` doubles as the merge
    /// destination at `stop()` (spec.md §4.4).
    Root { handles: Vec<JoinHandle<u32>>, trees: Vec<Arc<Tree>> },
}

/// A running search. `start` returns immediately with the pool already
/// spawned; `stop` halts every worker, joins them, and returns the resulting
/// tree plus aggregate games played (spec.md §4.4 pool protocol).
pub struct Pool {
    halt: Arc<AtomicBool>,
    workers: Workers,
}

impl Pool {
    pub fn start(tree: Tree, board: Board, config: Arc<Config>, owner_map: Arc<OwnerMap>) -> Pool {
        let halt = Arc::new(AtomicBool::new(false));
        let threads = config.resolved_threads().max(1);

        let workers = if config.thread_model == ThreadModel::Root {
            let trees: Vec<Arc<Tree>> = (0..threads).map(|_| Arc::new(tree.deep_clone())).collect();
            let handles = trees
                .iter()
                .enumerate()
                .map(|(i, t)| Self::spawn_shared_worker(i, t.clone(), board.clone(), config.clone(), owner_map.clone(), halt.clone()))
                .collect();
            Workers::Root { handles, trees }
        } else {
            let shared = Arc::new(tree);
            let handles = (0..threads)
                .map(|i| Self::spawn_shared_worker(i, shared.clone(), board.clone(), config.clone(), owner_map.clone(), halt.clone()))
                .collect();
            Workers::Shared { handles, tree: shared }
        };

        Pool { halt, workers }
    }

    pub fn handle(&self) -> SearchHandle {
        SearchHandle { halt: self.halt.clone() }
    }

    /// Per-worker seed (spec.md §6 `force_seed`, §8 scenario 5: determinism
    /// under a forced seed requires each worker's stream to be a pure
    /// function of the seed and its index, nothing time- or thread-id
    /// derived).
    fn worker_seed(config: &Config, i: usize) -> u64 {
        let base = config.force_seed.unwrap_or(0x5DEECE66D);
        base.wrapping_add(i as u64).wrapping_mul(0x9E3779B97F4A7C15)
    }

    fn spawn_shared_worker(
        i: usize,
        tree: Arc<Tree>,
        board: Board,
        config: Arc<Config>,
        owner_map: Arc<OwnerMap>,
        halt: Arc<AtomicBool>,
    ) -> JoinHandle<u32> {
        let seed = Self::worker_seed(&config, i);

        std::thread::Builder::new()
            .name(format!("ishi-worker-{i}"))
            .spawn(move || {
                let mut rng = SmallRng::seed_from_u64(seed);
                let selection = config.selection.build();
                let mut games = 0u32;

                while !halt.load(Ordering::Acquire) {
                    games += uct_playout(
                        tree.as_ref(),
                        &board,
                        &selection,
                        config.playout_policy.as_ref(),
                        config.prior.as_ref(),
                        config.as_ref(),
                        owner_map.as_ref(),
                        &mut rng,
                    );
                }

                games
            })
            .expect("failed to spawn search worker thread")
    }

    /// The tree to poll for progress while the search is running:
    /// the one shared tree in TREE/TREEVL mode, or a designated worker's
    /// private tree in ROOT mode.
    pub fn progress_tree(&self) -> &Tree {
        match &self.workers {
            Workers::Shared { tree, .. } => tree.as_ref(),
            Workers::Root { trees, .. } => trees[0].as_ref(),
        }
    }

    pub fn stop(self) -> (Tree, u32) {
        let Pool { halt, workers } = self;
        halt.store(true, Ordering::Release);

        match workers {
            Workers::Shared { handles, tree } => {
                let games = handles.into_iter().map(|h| h.join().expect("worker thread panicked")).sum();
                let tree = Arc::try_unwrap(tree).unwrap_or_else(|_| panic!("a worker outlived its join"));
                (tree, games)
            }
            Workers::Root { handles, mut trees } => {
                let games = handles.into_iter().map(|h| h.join().expect("worker thread panicked")).sum();
                let k = trees.len().max(1) as u32;

                for src in &trees[1..] {
                    Tree::merge(trees[0].root_id(), &trees[0], src.root_id(), src);
                }
                trees[0].normalize(trees[0].root_id(), k);

                let dst = trees.remove(0);
                let dst = Arc::try_unwrap(dst).unwrap_or_else(|_| panic!("a worker outlived its join"));

                (dst, games)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Config;
    use ishi_board::Color;
    use std::time::Duration;

    #[test]
    fn tree_mode_accumulates_playouts_until_stopped() {
        let board = Board::new(9);
        let tree = Tree::init(Color::Black, 1 << 20, false);
        let config = Arc::new(Config {
            threads: 2,
            thread_model: ThreadModel::Tree,
            force_seed: Some(7),
            ..Config::default()
        });
        let owner_map = Arc::new(OwnerMap::new(9));

        let pool = Pool::start(tree, board, config, owner_map);
        std::thread::sleep(Duration::from_millis(20));
        let (tree, games) = pool.stop();

        assert!(games > 0);
        assert_eq!(tree.root().stats.playouts(), games);
    }

    #[test]
    fn root_mode_merges_private_trees() {
        let board = Board::new(9);
        let tree = Tree::init(Color::Black, 1 << 20, false);
        let config = Arc::new(Config {
            threads: 3,
            thread_model: ThreadModel::Root,
            force_seed: Some(11),
            ..Config::default()
        });
        let owner_map = Arc::new(OwnerMap::new(9));

        let pool = Pool::start(tree, board, config, owner_map);
        std::thread::sleep(Duration::from_millis(20));
        let (tree, games) = pool.stop();

        assert!(games > 0);
        assert!(tree.root().stats.playouts() > 0);
    }
}
