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

//! The engine facade (spec.md §4.9, §6): the one object a front-end talks
//! to. Everything else in this crate is a collaborator wired together here.

use std::sync::Arc;
use std::time::Instant;

use ishi_board::{Board, Color, Coord, Group};

use crate::options::Config;
use crate::ownership::{GJ_MINGAMES, OwnerMap, PointStatus};
use crate::reuse::{self, Ponder};
use crate::search;
use crate::time_control::{self, StopConditions, TimeInfo};
use crate::tree::Tree;

pub struct Engine {
    config: Arc<Config>,
    tree: Option<Tree>,
    owner_map: Arc<OwnerMap>,
    ponder: Option<Ponder>,
    board_size: usize,
    /// The color the tree's root was built for, so `genmove` can tell
    /// whether an existing tree is still usable or must be rebuilt.
    root_color: Option<Color>,
    /// Color of the last move seen by `notify_play`, to detect the same
    /// side moving twice in a row (spec.md §7 "Non-alternating play").
    last_played_color: Option<Color>,
    /// Games played by the most recent `genmove` search, captured before
    /// the post-search promotion replaces the root with the chosen child
    /// (spec.md §8 scenario 1 measures this count, not the post-promotion
    /// root's own, smaller, playout total).
    last_games_played: u32,
}

impl Engine {
    pub fn new(config: Config, board_size: usize) -> Engine {
        config.validate();
        Engine {
            config: Arc::new(config),
            tree: None,
            owner_map: Arc::new(OwnerMap::new(board_size)),
            ponder: None,
            board_size,
            root_color: None,
            last_played_color: None,
            last_games_played: 0,
        }
    }

    fn stop_pondering(&mut self) {
        if let Some(ponder) = self.ponder.take() {
            let (tree, _games) = ponder.stop();
            self.tree = Some(tree);
        }
    }

    /// Diagnostic, never fatal (spec.md §7): the front-end may signal a
    /// superko violation on the incoming board. Warn and clear it.
    fn warn_and_clear_superko(&self, board: &mut Board) {
        if board.superko_flag() {
            ishi_util::warn_line!("superko violation signaled on incoming board, continuing");
            board.clear_superko_flag();
        }
    }

    /// `notify_play(board, move)` (spec.md §4.7, §6).
    pub fn notify_play(&mut self, played_by: Color, played: Coord) {
        self.stop_pondering();

        if let Some(last) = self.last_played_color {
            assert_ne!(last, played_by, "Non-alternating play: {played_by:?} moved twice in a row");
        }
        self.last_played_color = Some(played_by);

        if played == Coord::Resign {
            self.tree = None;
            self.root_color = None;
            return;
        }

        if let Some(tree) = self.tree.take() {
            match reuse::promote_on_play(tree, played) {
                Ok(promoted) => {
                    self.root_color = Some(promoted.root_color);
                    self.tree = Some(promoted);
                }
                Err(_) => {
                    self.tree = None;
                    self.root_color = None;
                }
            }
        }
    }

    /// `genmove(board, time_info, color, pass_all_alive) -> coord` (spec.md
    /// §4.5, §4.9, §6).
    pub fn genmove(&mut self, board: &mut Board, time_info: &TimeInfo, color: Color, pass_all_alive: bool) -> Coord {
        self.stop_pondering();
        self.warn_and_clear_superko(board);

        let tree = match self.tree.take() {
            Some(tree) if self.root_color == Some(color) => tree,
            _ => {
                let mut fresh = Tree::init(color, self.config.max_tree_size, self.config.fast_alloc);
                fresh.extra_komi = self.config.dynkomi_for(color, board.move_count() as usize, board.size() * board.size());
                fresh
            }
        };

        self.owner_map = Arc::new(OwnerMap::new(self.board_size));

        let board_side = board.size() + 2;
        let timer_start = Instant::now();
        let stop_conditions = time_control::resolve(time_info, board_side, board.move_count(), &self.config, timer_start);

        let (tree, games) = search::run(tree, board.clone(), self.config.clone(), self.owner_map.clone(), stop_conditions);
        self.last_games_played = games;

        let selection = self.config.selection.build();
        let best = selection.choose(&tree, tree.root_id());

        let mut chosen = match best {
            None => Coord::Pass,
            Some(id) => {
                let node = tree.node(id);
                if node.stats.value() < self.config.resign_ratio
                    && node.stats.playouts() > GJ_MINGAMES
                    && node.coord != Coord::Pass
                {
                    Coord::Resign
                } else {
                    node.coord
                }
            }
        };

        // Pass-safety override: mirror a just-played opponent pass when the
        // position is settled, or unconditionally when the front-end has
        // already told us the whole board is alive.
        if board.last_move_was_pass() && chosen != Coord::Resign {
            if pass_all_alive || self.owner_map.uct_pass_is_safe(board) {
                chosen = Coord::Pass;
            }
        }

        if chosen == Coord::Resign {
            self.tree = None;
            self.root_color = None;
            return chosen;
        }

        match reuse::promote_on_play(tree, chosen) {
            Ok(promoted) => {
                self.root_color = Some(promoted.root_color);
                self.tree = Some(promoted);
            }
            Err(_) => {
                self.tree = None;
                self.root_color = None;
            }
        }

        if chosen != Coord::Pass {
            if let Some(tree) = self.tree.take() {
                if self.config.pondering_opt {
                    let mut after = board.clone();
                    if after.play(color, chosen).is_ok() {
                        let owner_map = Arc::new(OwnerMap::new(self.board_size));
                        self.owner_map = owner_map.clone();
                        self.ponder = Some(Ponder::start(tree, after, self.config.clone(), owner_map));
                    } else {
                        self.tree = Some(tree);
                    }
                } else {
                    self.tree = Some(tree);
                }
            }
        }

        chosen
    }

    /// `chat(board, cmd) -> string?` (spec.md §6): only "winrate" is
    /// understood.
    pub fn chat(&self, cmd: &str) -> Option<String> {
        if cmd != "winrate" {
            return None;
        }

        let tree = self.tree.as_ref()?;
        let selection = self.config.selection.build();
        let best = selection.choose(tree, tree.root_id())?;
        let node = tree.node(best);
        Some(format!("winrate {} {} {}", node.coord, node.stats.playouts(), node.stats.value()))
    }

    /// `dead_group_list(board) -> list<group>` (spec.md §4.8, §6).
    pub fn dead_group_list(&self, board: &Board) -> Vec<Group> {
        if self.tree.is_some() && self.owner_map.playouts() > 0 {
            return self.owner_map.dead_group_list(board);
        }

        // No live tree: spin up a transient one, run exactly GJ_MINGAMES
        // playouts, report, then discard — the next genmove must see clean
        // state (spec.md §4.8).
        let transient = Tree::init(board.to_move(), self.config.max_tree_size, self.config.fast_alloc);
        let owner_map = Arc::new(OwnerMap::new(self.board_size));
        let stop_conditions = StopConditions::Games { desired: GJ_MINGAMES, worst: GJ_MINGAMES };
        let (_tree, _games) = search::run(transient, board.clone(), self.config.clone(), owner_map.clone(), stop_conditions);

        owner_map.dead_group_list(board)
    }

    /// Total playouts recorded at the tree root, `0` with no live tree.
    /// Exposed for front-ends that want raw search stats beyond `chat`.
    pub fn root_playouts(&self) -> u32 {
        self.tree.as_ref().map_or(0, |tree| tree.root().stats.playouts())
    }

    /// Games played by the most recent `genmove` search (spec.md §8
    /// scenario 1), measured before that search's own post-move promotion.
    pub fn last_games_played(&self) -> u32 {
        self.last_games_played
    }

    /// Total playouts recorded by the ownership map of the most recent
    /// search.
    pub fn ownermap_playouts(&self) -> u32 {
        self.owner_map.playouts()
    }

    /// `done()` (spec.md §6): stop pondering, free tree and ownership map.
    pub fn done(&mut self) {
        self.stop_pondering();
        self.tree = None;
        self.owner_map = Arc::new(OwnerMap::new(self.board_size));
        self.root_color = None;
    }

    /// `printhook(board, sink)` (spec.md §6): one `:`/`X`/`O`/`,` character
    /// per board point (dame/black/white/unclear).
    pub fn printhook(&self, board: &Board, sink: &mut dyn std::fmt::Write) -> std::fmt::Result {
        for p in board.points() {
            let ch = match self.owner_map.classify(board, p) {
                PointStatus::Dame => ':',
                PointStatus::Black => 'X',
                PointStatus::White => 'O',
                PointStatus::Unclear => ',',
            };
            write!(sink, "{ch}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ThreadModel;

    fn config() -> Config {
        Config { threads: 1, thread_model: ThreadModel::TreeVl, force_seed: Some(1), ..Config::default() }
    }

    #[test]
    fn genmove_on_an_empty_board_plays_a_legal_move_with_a_forced_seed() {
        let mut engine = Engine::new(
            Config { threads: 1, thread_model: ThreadModel::TreeVl, force_seed: Some(1), ..Config::default() },
            9,
        );
        let mut board = Board::new(9);
        let time_info = TimeInfo {
            period: time_control::Period::Move,
            dim: time_control::Dim::Games,
            budget: 200,
            in_byoyomi: false,
            recommended: 0.0,
            max_time: 0.0,
            net_lag: std::time::Duration::ZERO,
        };

        let coord = engine.genmove(&mut board, &time_info, Color::Black, false);
        assert!(matches!(coord, Coord::Point(_)));
        assert!(board.is_valid(Color::Black, coord));
    }

    #[test]
    #[should_panic(expected = "Non-alternating")]
    fn two_plays_by_the_same_color_in_a_row_is_fatal() {
        let mut engine = Engine::new(config(), 9);
        engine.notify_play(Color::Black, Coord::Pass);
        engine.notify_play(Color::Black, Coord::Pass);
    }

    #[test]
    fn done_clears_engine_state() {
        let mut engine = Engine::new(config(), 9);
        engine.notify_play(Color::Black, Coord::Pass);
        engine.done();
        assert!(engine.tree.is_none());
    }

    #[test]
    fn genmove_clears_a_superko_flag_signaled_by_the_front_end() {
        let mut engine = Engine::new(config(), 9);
        let mut board = Board::new(9);
        board.set_superko_flag(true);
        let time_info = TimeInfo {
            period: time_control::Period::Move,
            dim: time_control::Dim::Games,
            budget: 50,
            in_byoyomi: false,
            recommended: 0.0,
            max_time: 0.0,
            net_lag: std::time::Duration::ZERO,
        };

        engine.genmove(&mut board, &time_info, Color::Black, false);

        assert!(!board.superko_flag());
    }
}
