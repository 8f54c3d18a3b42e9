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

//! The configuration record of spec.md §6. Parsing is explicitly out of
//! scope for the core — the engine always receives one of these fully
//! populated — so this module is nothing but a plain struct and its
//! defaults, mirroring how `dg_mcts::options::SearchOptions` is handed to
//! the search already resolved rather than read from argv itself.

use std::sync::Arc;

use ishi_board::Color;

use crate::policy::{Prior, RandomPlayoutPolicy, UniformPrior};
use crate::selection::SelectionPolicy;

/// Worker pool parallelization strategy (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadModel {
    /// Every worker owns a private tree copy; merged and normalized at
    /// shutdown.
    Root,
    /// Every worker shares one tree, no virtual loss.
    Tree,
    /// Shared tree, virtual loss applied on descent.
    TreeVl,
}

impl Default for ThreadModel {
    fn default() -> Self {
        ThreadModel::TreeVl
    }
}

/// `root_heuristic` from spec.md §6. Left as an opaque selector since the
/// root-only heuristics it names are themselves out of scope (they would
/// live in the `Prior`/`PlayoutPolicy` implementations a front-end supplies).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootHeuristic {
    None,
    One,
    Two,
    Three,
}

impl Default for RootHeuristic {
    fn default() -> Self {
        RootHeuristic::None
    }
}

/// Which side(s) dynamic komi applies to (spec.md §6 "dynkomi base and
/// color mask").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynkomiMask {
    Neither,
    Black,
    White,
    Both,
}

impl DynkomiMask {
    fn applies_to(self, color: Color) -> bool {
        match (self, color) {
            (DynkomiMask::Both, _) => true,
            (DynkomiMask::Black, Color::Black) => true,
            (DynkomiMask::White, Color::White) => true,
            _ => false,
        }
    }
}

impl Default for DynkomiMask {
    fn default() -> Self {
        DynkomiMask::Neither
    }
}

/// The subset of the configuration record relevant to the core (spec.md §6).
#[derive(Clone)]
pub struct Config {
    pub threads: usize,
    pub thread_model: ThreadModel,
    pub pondering_opt: bool,
    pub max_tree_size: usize,
    pub fast_alloc: bool,
    pub force_seed: Option<u64>,
    pub no_book: bool,
    pub resign_ratio: f32,
    pub loss_threshold: f32,
    pub mercymin: u32,
    pub gamelen: usize,
    pub expand_p: u32,
    pub fuseki_end: f32,
    pub yose_start: f32,
    pub dynkomi_base: f32,
    pub dynkomi_mask: DynkomiMask,
    pub val_scale: f32,
    pub val_points: f32,
    pub val_extra: f32,
    pub root_heuristic: RootHeuristic,
    pub pass_all_alive: bool,
    pub random_policy_every: Option<u32>,
    pub selection: SelectionKind,
    pub prior: Arc<dyn Prior>,
    pub playout_policy: Arc<dyn crate::policy::PlayoutPolicy>,
}

/// Which `SelectionPolicy` implementation to build (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Ucb1 { exploration: ordered_float::OrderedFloat<f64> },
    Rave { rave_equiv: u32 },
}

impl SelectionKind {
    pub fn build(self) -> SelectionPolicy {
        match self {
            SelectionKind::Ucb1 { exploration } => SelectionPolicy::ucb1(exploration.into_inner()),
            SelectionKind::Rave { rave_equiv } => SelectionPolicy::rave(rave_equiv),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: 1,
            thread_model: ThreadModel::default(),
            pondering_opt: false,
            max_tree_size: 3 * 1024 * 1024 * 1024,
            fast_alloc: false,
            force_seed: None,
            no_book: false,
            resign_ratio: 0.2,
            loss_threshold: 0.85,
            mercymin: 0,
            gamelen: 722,
            expand_p: 2,
            fuseki_end: 0.20,
            yose_start: 0.40,
            dynkomi_base: 0.0,
            dynkomi_mask: DynkomiMask::default(),
            val_scale: 0.0,
            val_points: 0.0,
            val_extra: 0.0,
            root_heuristic: RootHeuristic::default(),
            pass_all_alive: false,
            random_policy_every: None,
            selection: SelectionKind::Ucb1 { exploration: ordered_float::OrderedFloat(0.44) },
            prior: Arc::new(UniformPrior),
            playout_policy: Arc::new(RandomPlayoutPolicy),
        }
    }
}

impl Config {
    /// Fatal per spec.md §7: mutually exclusive flags.
    pub fn validate(&self) {
        assert!(
            !(self.fast_alloc && self.thread_model == ThreadModel::Root),
            "fast_alloc is incompatible with ROOT parallelization"
        );
        assert!(
            self.random_policy_every.map_or(true, |n| n > 0),
            "random_policy_every must be a positive 1-in-N rate"
        );
    }

    pub fn resolved_threads(&self) -> usize {
        if self.threads == 0 {
            *ishi_util::config::NUM_THREADS
        } else {
            self.threads
        }
    }

    /// Opening-phase dynamic komi offset for `root_color` at `move_count` on
    /// a board of `board_area` points (spec.md §6 "dynkomi base and color
    /// mask", glossary "Dynkomi"): ramps linearly from `dynkomi_base` at
    /// move 0 down to zero by `fuseki_end`, and only for a side covered by
    /// `dynkomi_mask`.
    pub fn dynkomi_for(&self, root_color: Color, move_count: usize, board_area: usize) -> f32 {
        if self.dynkomi_base == 0.0 || !self.dynkomi_mask.applies_to(root_color) {
            return 0.0;
        }

        let fuseki_end_move = (self.fuseki_end as f64 * board_area as f64) as usize;
        if fuseki_end_move == 0 || move_count >= fuseki_end_move {
            return 0.0;
        }

        let remaining = (fuseki_end_move - move_count) as f32 / fuseki_end_move as f32;
        self.dynkomi_base * remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "incompatible")]
    fn fast_alloc_and_root_parallelism_is_fatal() {
        let config = Config {
            fast_alloc: true,
            thread_model: ThreadModel::Root,
            ..Config::default()
        };
        config.validate();
    }

    #[test]
    fn default_config_validates() {
        Config::default().validate();
    }

    #[test]
    fn dynkomi_is_zero_off_the_mask_and_ramps_to_zero_by_fuseki_end() {
        let config = Config { dynkomi_base: 6.0, dynkomi_mask: DynkomiMask::Black, fuseki_end: 0.5, ..Config::default() };

        assert_eq!(config.dynkomi_for(Color::White, 0, 81), 0.0);
        assert_eq!(config.dynkomi_for(Color::Black, 0, 81), 6.0);
        assert!(config.dynkomi_for(Color::Black, 20, 81) < 6.0);
        assert_eq!(config.dynkomi_for(Color::Black, 40, 81), 0.0);
    }
}
