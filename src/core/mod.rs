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

//! Core arbiter components
//!
//! - [`bus`]: Frame encoding and tri-state bus ownership
//! - [`arbiter`]: The interrupt arbiter state machine
//! - [`testbench`]: Processor agent and stimulus driver
//! - [`error`]: Error and fault types

pub mod arbiter;
pub mod bus;
pub mod error;
pub mod testbench;
