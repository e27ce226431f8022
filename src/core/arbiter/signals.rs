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

//! Boundary signals sampled and driven once per tick
//!
//! ```text
//! Signal          | Dir   | Width | Meaning
//! ----------------|-------|-------|-------------------------------------------
//! reset           | in    | 1     | Synchronous reset, overrides everything
//! request_vector  | in    | 8     | Level-sensitive per-source pending flags
//! bus             | inout | 8     | Shared bus, `None` while floating
//! ack_in          | in    | 1     | Processor handshake, active on high-to-low
//! interrupt_line  | out   | 1     | A winning source awaits transfer
//! ```

use crate::core::bus::BusState;
use bitflags::bitflags;

bitflags! {
    /// Raw request vector, one bit per source
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Requests: u8 {
        const IRQ0 = 1 << 0;
        const IRQ1 = 1 << 1;
        const IRQ2 = 1 << 2;
        const IRQ3 = 1 << 3;
        const IRQ4 = 1 << 4;
        const IRQ5 = 1 << 5;
        const IRQ6 = 1 << 6;
        const IRQ7 = 1 << 7;
    }
}

impl Requests {
    /// Request flag for a single source (id taken modulo 8)
    ///
    /// # Example
    ///
    /// ```
    /// use irqx::core::arbiter::Requests;
    ///
    /// assert_eq!(Requests::source(3), Requests::IRQ3);
    /// ```
    #[inline]
    pub fn source(id: u8) -> Self {
        Self::from_bits_retain(1 << (id & 0x07))
    }

    /// Whether the given source is requesting service
    #[inline]
    pub fn is_pending(self, id: u8) -> bool {
        self.contains(Self::source(id))
    }
}

/// Inputs sampled on one clock tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inputs {
    pub reset: bool,
    pub requests: Requests,
    /// Level on the shared bus, `None` while floating
    pub bus: Option<u8>,
    /// Acknowledge line (idle high)
    pub ack: bool,
}

impl Inputs {
    /// Idle inputs: no reset, no requests, floating bus, ack high
    pub fn idle() -> Self {
        Self {
            reset: false,
            requests: Requests::empty(),
            bus: None,
            ack: true,
        }
    }

    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    pub fn with_requests(mut self, requests: Requests) -> Self {
        self.requests = requests;
        self
    }

    pub fn with_bus(mut self, bus: Option<u8>) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_ack(mut self, ack: bool) -> Self {
        self.ack = ack;
        self
    }
}

impl Default for Inputs {
    fn default() -> Self {
        Self::idle()
    }
}

/// Registered outputs after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outputs {
    pub interrupt_line: bool,
    /// Arbiter side of the bus (drive enable + value)
    pub bus: BusState,
}
