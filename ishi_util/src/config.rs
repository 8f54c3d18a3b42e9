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

//! Process-wide tunables read once from the environment, in the same style
//! as `dg_utils::config` (a handful of `lazy_static!` statics parsed with a
//! default fallback). These are *not* the per-search `Config` record of
//! spec.md §6 — that one is always fully populated by the caller and never
//! touched here. These are knobs that make sense at process scope: how
//! chatty the engine is, and the fallback thread count when the caller's
//! config record says zero.

use std::env;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

lazy_static::lazy_static! {
    /// Default worker count when a `Config` leaves `threads` unset (0).
    pub static ref NUM_THREADS: usize = env_or("ISHI_NUM_THREADS", 1);

    /// Suppresses the search controller's periodic progress line
    /// (spec.md §4.5 step 2) when set.
    pub static ref QUIET: bool = env_or("ISHI_QUIET", false);

    /// Emits the per-iteration `trace-mcts`-style tree dump to stderr.
    pub static ref VERBOSE: bool = env_or("ISHI_VERBOSE", false);
}

/// `TREE_BUSYWAIT_INTERVAL` from spec.md §4.5: how often the search
/// controller polls the tree while a search is running.
pub const TREE_BUSYWAIT_INTERVAL: Duration = Duration::from_millis(100);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_to_default() {
        assert_eq!(env_or::<usize>("ISHI_DOES_NOT_EXIST", 7), 7);
    }
}
