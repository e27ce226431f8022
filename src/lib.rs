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

//! irqx: An 8-source interrupt arbiter
//!
//! This crate models a clocked interrupt arbiter that picks one of eight request
//! lines, either by round-robin polling or through a fixed priority table, and
//! hands it to a processor over a shared half-duplex bus with a three-phase
//! handshake.
//!
//! # Architecture
//!
//! - [`core`]: The arbiter, bus model and testbench
//! - [`config`]: TOML simulation configuration
//!
//! # Example
//!
//! ```
//! use irqx::core::arbiter::{PriorityTable, Requests};
//! use irqx::core::testbench::{Setup, Testbench};
//!
//! let table = PriorityTable::from_ranks([5, 3, 7, 0, 4, 2, 6, 1])?;
//! let mut bench = Testbench::new(Setup::Priority(table)).with_requests(Requests::all());
//! bench.run_until_serviced(8)?;
//! assert_eq!(bench.service_order(), vec![5, 3, 7, 0, 4, 2, 6, 1]);
//! # Ok::<(), irqx::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`core::arbiter`]: State register, priority table, handshake sequencer
//! - [`core::bus`]: Frame tags and tri-state bus ownership
//! - [`core::testbench`]: Processor agent and tick driver
//!
//! # Error Handling
//!
//! All fallible operations return [`core::error::Result<T>`] which is an alias for
//! `Result<T, Error>`. Protocol violations inside the arbiter are not errors: the
//! arbiter recovers by itself and records a [`core::error::Fault`].

pub mod config;
pub mod core;

// Re-export commonly used types
pub use crate::core::error::{Error, Fault, Result};
