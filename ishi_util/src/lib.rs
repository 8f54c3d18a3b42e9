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

//! Process-wide ambient helpers shared by the engine and its binary: a
//! `config` module of environment-derived tunables (mirroring
//! `dg_utils::config`) and a tiny `log` module of gated `eprintln!` helpers
//! (mirroring the `trace-mcts` feature convention used throughout the
//! teacher crate).

pub mod config;
pub mod log;
