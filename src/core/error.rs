// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
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

//! Error types
//!
//! Two layers of failure exist in this crate:
//!
//! - [`Error`]: everything that can go wrong *around* the arbiter (configuration,
//!   save states, traces, a testbench that runs out of ticks). These are returned
//!   through [`Result`].
//! - [`Fault`]: protocol violations detected *inside* the arbiter. The arbiter never
//!   returns these; it recovers by itself (abort or full reset) and records the
//!   most recent one for inspection.

use super::arbiter::ControllerState;
use thiserror::Error;

/// Result type alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid priority table {table:?}: {reason}")]
    InvalidPriorityTable { table: Vec<u8>, reason: String },

    #[error("Invalid source id: {0} (must be 0-7)")]
    InvalidSourceId(u8),

    #[error("Save state error: {0}")]
    Snapshot(String),

    #[error("Trace error: {0}")]
    Trace(#[from] serde_json::Error),

    #[error("Simulation stalled after {ticks} ticks in state {state:?}")]
    Stalled { ticks: u64, state: ControllerState },

    #[error("Unexpected bus frame: expected 0x{expected:02X}, observed {observed:?}")]
    UnexpectedFrame { expected: u8, observed: Option<u8> },
}

/// Protocol fault recorded by the arbiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    /// A non-`10` command code (or a floating bus) arrived in the middle of a
    /// priority table load
    #[error("malformed command {code:?} during priority load cycle {cycle}")]
    MalformedCommand { cycle: u8, code: Option<u8> },

    /// The completion frame did not match the outstanding transaction
    #[error("completion mismatch: expected 0x{expected:02X}, observed {observed:?}")]
    CompletionMismatch { expected: u8, observed: Option<u8> },
}
