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

//! Converts the front-end's time information into stop conditions (spec.md
//! §4.6).

use std::time::{Duration, Instant};

use crate::options::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Null,
    Move,
    /// Not permitted at this layer; the front-end must convert a
    /// whole-game time control into a per-move one before calling in.
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dim {
    Games,
    Walltime,
}

/// What the front-end hands the core for one `genmove` (spec.md §4.6).
#[derive(Debug, Clone, Copy)]
pub struct TimeInfo {
    pub period: Period,
    pub dim: Dim,
    /// Games budget (when `dim == Games`) or a placeholder otherwise.
    pub budget: u32,
    pub in_byoyomi: bool,
    /// Seconds.
    pub recommended: f64,
    /// Seconds.
    pub max_time: f64,
    pub net_lag: Duration,
}

#[derive(Debug, Clone, Copy)]
pub enum StopConditions {
    Games { desired: u32, worst: u32 },
    Walltime { desired: Instant, worst: Instant },
}

fn offset_instant(base: Instant, plus: Duration, minus: Duration) -> Instant {
    base.checked_add(plus).and_then(|t| t.checked_sub(minus)).unwrap_or(base)
}

/// Resolve `time_info` into `StopConditions`, given the padded board side
/// (`size + 2`, matching `Tree`/`Board`'s own stride convention) and the
/// move number the position is at.
pub fn resolve(time_info: &TimeInfo, board_side: usize, move_number: u32, config: &Config, timer_start: Instant) -> StopConditions {
    assert_ne!(time_info.period, Period::Total, "TOTAL period must be converted to MOVE by the front-end before reaching the core");

    let (dim, games_budget) = if time_info.period == Period::Null {
        (Dim::Games, 80_000)
    } else {
        (time_info.dim, time_info.budget)
    };

    match dim {
        Dim::Games => StopConditions::Games { desired: games_budget, worst: games_budget },
        Dim::Walltime => {
            let (desired_secs, worst_secs) = if time_info.in_byoyomi {
                (time_info.recommended * 0.9, time_info.recommended * 1.1)
            } else {
                let bsize = ((board_side as f64) - 2.0).powi(2);
                let fuseki_end_move = config.fuseki_end as f64 * bsize;
                let yose_start_move = config.yose_start as f64 * bsize;
                let moves_left_at_yose = ((bsize - yose_start_move) / 2.0).max(1.0);
                let longest = time_info.max_time / moves_left_at_yose;
                let move_number = move_number as f64;

                let desired = if move_number < fuseki_end_move {
                    let t = move_number / fuseki_end_move.max(1.0);
                    time_info.recommended + t * (longest - time_info.recommended)
                } else if move_number < yose_start_move {
                    longest
                } else {
                    time_info.recommended
                };

                (desired, desired * 3.0)
            };

            // Clamp worst to max_time first, then desired to worst. If
            // `recommended` alone already exceeds `max_time`, `desired` is
            // left as computed rather than re-derived from the clamped
            // worst — matching the open question in spec.md §9 about this
            // rarely-hit interaction; re-deriving it differently would need
            // a scenario that exercises it, which none of the testable
            // properties do.
            let worst_secs = worst_secs.min(time_info.max_time).max(0.0);
            let desired_secs = desired_secs.min(worst_secs).max(0.0);

            let worst = offset_instant(timer_start, Duration::from_secs_f64(worst_secs), time_info.net_lag);
            let desired = offset_instant(timer_start, Duration::from_secs_f64(desired_secs), time_info.net_lag);

            StopConditions::Walltime { desired, worst }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn games_dimension_uses_the_same_budget_for_both_bounds() {
        let time_info = TimeInfo {
            period: Period::Move,
            dim: Dim::Games,
            budget: 1000,
            in_byoyomi: false,
            recommended: 0.0,
            max_time: 0.0,
            net_lag: Duration::ZERO,
        };

        let resolved = resolve(&time_info, 11, 0, &config(), Instant::now());
        match resolved {
            StopConditions::Games { desired, worst } => {
                assert_eq!(desired, 1000);
                assert_eq!(worst, 1000);
            }
            _ => panic!("expected a games stop condition"),
        }
    }

    #[test]
    fn null_period_defaults_to_eighty_thousand_games() {
        let time_info = TimeInfo {
            period: Period::Null,
            dim: Dim::Walltime,
            budget: 0,
            in_byoyomi: false,
            recommended: 0.0,
            max_time: 0.0,
            net_lag: Duration::ZERO,
        };

        let resolved = resolve(&time_info, 11, 0, &config(), Instant::now());
        match resolved {
            StopConditions::Games { desired, worst } => {
                assert_eq!(desired, 80_000);
                assert_eq!(worst, 80_000);
            }
            _ => panic!("expected a games stop condition"),
        }
    }

    #[test]
    fn byoyomi_widens_the_worst_bound_by_ten_percent() {
        let timer_start = Instant::now();
        let time_info = TimeInfo {
            period: Period::Move,
            dim: Dim::Walltime,
            budget: 0,
            in_byoyomi: true,
            recommended: 10.0,
            max_time: 100.0,
            net_lag: Duration::ZERO,
        };

        let resolved = resolve(&time_info, 11, 50, &config(), timer_start);
        match resolved {
            StopConditions::Walltime { desired, worst } => {
                assert!(worst > desired);
                assert!(worst.duration_since(timer_start).as_secs_f64() > 10.9);
                assert!(desired.duration_since(timer_start).as_secs_f64() < 9.1);
            }
            _ => panic!("expected a walltime stop condition"),
        }
    }

    #[test]
    fn worst_is_never_more_than_max_time() {
        let timer_start = Instant::now();
        let time_info = TimeInfo {
            period: Period::Move,
            dim: Dim::Walltime,
            budget: 0,
            in_byoyomi: false,
            recommended: 50.0,
            max_time: 60.0,
            net_lag: Duration::ZERO,
        };

        let resolved = resolve(&time_info, 11, 0, &config(), timer_start);
        match resolved {
            StopConditions::Walltime { worst, .. } => {
                assert!(worst.duration_since(timer_start).as_secs_f64() <= 60.0 + 1e-9);
            }
            _ => panic!("expected a walltime stop condition"),
        }
    }
}
