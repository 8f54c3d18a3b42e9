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

//! Status-line helpers. The teacher never adopts a logging crate — it
//! writes directly to stderr, gated by a config flag or a cargo feature
//! (`trace-mcts`). These macros keep that convention in one place instead
//! of repeating `if !*config::QUIET { eprintln!(...) }` at every call site.

/// Always-on diagnostic line (spec.md §7 "Soft (log-only)" errors: memory
/// limit reached, stop times already in the past, etc).
#[macro_export]
macro_rules! warn_line {
    ($($arg:tt)*) => {
        eprintln!("warn: {}", format!($($arg)*));
    };
}

/// Progress line, suppressed when `ishi_util::config::QUIET` is set.
#[macro_export]
macro_rules! progress_line {
    ($($arg:tt)*) => {
        if !*$crate::config::QUIET {
            eprintln!("{}", format!($($arg)*));
        }
    };
}

/// Verbose trace line, shown only when `ishi_util::config::VERBOSE` is set.
#[macro_export]
macro_rules! trace_line {
    ($($arg:tt)*) => {
        if *$crate::config::VERBOSE {
            eprintln!("trace: {}", format!($($arg)*));
        }
    };
}
