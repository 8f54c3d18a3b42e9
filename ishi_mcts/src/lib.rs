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

//! Parallel Monte-Carlo tree search over a Go position: the tree, the
//! per-iteration playout, the worker pool, the search controller, and the
//! engine facade that ties them together for a front-end.

pub mod engine;
pub mod options;
pub mod ownership;
pub mod playout;
pub mod policy;
pub mod pool;
pub mod reuse;
pub mod search;
pub mod selection;
pub mod time_control;
pub mod tree;

pub use self::engine::Engine;
pub use self::options::Config;
