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

//! Shared half-duplex bus and frame encoding
//!
//! The arbiter and the processor share one 8-bit tri-state bus. At most one side
//! drives it on any tick; when nobody drives it the bus floats.
//!
//! ## Frame Layout
//!
//! ```text
//!  7   6   5   4   3   2   1   0
//! +---+---+---+---+---+---+---+---+
//! |        tag        |  source   |
//! +---+---+---+---+---+---+---+---+
//! ```
//!
//! ```text
//! Tag    | Driven by  | Meaning
//! -------|------------|-------------------------------
//! 01011  | arbiter    | Polling address frame
//! 10100  | processor  | Polling completion frame
//! 10011  | arbiter    | Priority address frame
//! 01100  | processor  | Priority completion frame
//! ```
//!
//! ## Command Layout (command reception only)
//!
//! ```text
//!  7   6   5   4   3   2   1   0
//! +---+---+---+---+---+---+---+---+
//! |  entry high |  entry low  | code  |
//! +---+---+---+---+---+---+---+---+
//! ```
//!
//! `code` is `01` (polling) or `10` (priority load). In a priority load the two
//! 3-bit entries fill two consecutive ranks of the priority table.
//!
//! ## Ownership
//!
//! The arbiter publishes its side as a [`BusState`]. The processor can only put
//! a value on the wire through a [`BusGrant`], which exists only while the
//! arbiter has released the bus. [`Wire`] is the settled result of one tick and
//! names exactly one driver, so a tick where both sides drive cannot be built.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame tags (bits 7-3 of a frame)
pub mod tags {
    /// Polling address frame, driven by the arbiter
    pub const POLL_ADDRESS: u8 = 0b01011;

    /// Polling completion frame, driven by the processor
    pub const POLL_COMPLETE: u8 = 0b10100;

    /// Priority address frame, driven by the arbiter
    pub const PRIORITY_ADDRESS: u8 = 0b10011;

    /// Priority completion frame, driven by the processor
    pub const PRIORITY_COMPLETE: u8 = 0b01100;
}

/// Command codes (bits 1-0 of a command byte)
pub mod commands {
    /// Select polling mode
    pub const POLLING: u8 = 0b01;

    /// Load two priority entries / select priority mode
    pub const PRIORITY: u8 = 0b10;

    /// Mask for the command code field
    pub const CODE_MASK: u8 = 0b11;
}

/// One 8-bit bus frame: 5-bit tag plus 3-bit source id
///
/// # Example
///
/// ```
/// use irqx::core::bus::{tags, Frame};
///
/// let frame = Frame::new(tags::POLL_ADDRESS, 5);
/// assert_eq!(frame.raw(), 0b0101_1101);
/// assert_eq!(frame.tag(), tags::POLL_ADDRESS);
/// assert_eq!(frame.source(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame(u8);

impl Frame {
    /// Build a frame from a tag and a source id
    ///
    /// Only the low 5 bits of `tag` and the low 3 bits of `source` are used.
    #[inline]
    pub const fn new(tag: u8, source: u8) -> Self {
        Self(((tag & 0x1F) << 3) | (source & 0x07))
    }

    /// Wrap a raw byte observed on the bus
    #[inline]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn tag(self) -> u8 {
        self.0 >> 3
    }

    #[inline]
    pub const fn source(self) -> u8 {
        self.0 & 0x07
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05b}+{}", self.tag(), self.source())
    }
}

impl From<Frame> for u8 {
    fn from(frame: Frame) -> u8 {
        frame.raw()
    }
}

/// Encode a priority-load command carrying two table entries
///
/// `high` lands in bits 7-5, `low` in bits 4-2, and the command code is `10`.
///
/// # Example
///
/// ```
/// use irqx::core::bus::priority_load;
///
/// assert_eq!(priority_load(5, 3), 0b1010_1110);
/// assert_eq!(priority_load(7, 0), 0b1110_0010);
/// ```
#[inline]
pub const fn priority_load(high: u8, low: u8) -> u8 {
    ((high & 0x07) << 5) | ((low & 0x07) << 2) | commands::PRIORITY
}

/// Extract the 2-bit command code from a command byte
#[inline]
pub const fn command_code(byte: u8) -> u8 {
    byte & commands::CODE_MASK
}

/// Extract the two priority entries (high, low) from a priority-load byte
#[inline]
pub const fn priority_entries(byte: u8) -> (u8, u8) {
    ((byte >> 5) & 0x07, (byte >> 2) & 0x07)
}

/// The arbiter's side of the tri-state bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BusState {
    /// High impedance: the arbiter is not driving
    #[default]
    Released,
    /// The arbiter drives this value
    Driven(u8),
}

impl BusState {
    /// Value the arbiter is driving, if any
    #[inline]
    pub fn value(self) -> Option<u8> {
        match self {
            BusState::Released => None,
            BusState::Driven(value) => Some(value),
        }
    }

    /// Drive-enable flag
    #[inline]
    pub fn is_driven(self) -> bool {
        matches!(self, BusState::Driven(_))
    }
}

/// Permission for the processor to drive the bus for one tick
///
/// Only [`Wire::settle`] hands these out, and only when the arbiter has
/// released the bus.
#[derive(Debug)]
pub struct BusGrant {
    _private: (),
}

impl BusGrant {
    /// Put `value` on the bus for this tick
    #[inline]
    pub fn drive(self, value: u8) -> ProcessorDrive {
        ProcessorDrive(value)
    }
}

/// A value the processor drives under a [`BusGrant`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorDrive(u8);

/// Settled bus for one tick: who drives it and with what
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Wire {
    /// Nobody drives the bus
    #[default]
    Floating,
    /// The arbiter drives the bus
    Arbiter(u8),
    /// The processor drives the bus
    Processor(u8),
}

impl Wire {
    /// Settle the bus for one tick
    ///
    /// If the arbiter drives, the processor is never consulted. Otherwise the
    /// processor receives a [`BusGrant`] and may return a drive.
    ///
    /// # Example
    ///
    /// ```
    /// use irqx::core::bus::{BusState, Wire};
    ///
    /// let wire = Wire::settle(BusState::Driven(0x5D), |grant| Some(grant.drive(0xFF)));
    /// assert_eq!(wire, Wire::Arbiter(0x5D));
    ///
    /// let wire = Wire::settle(BusState::Released, |grant| Some(grant.drive(0xA5)));
    /// assert_eq!(wire, Wire::Processor(0xA5));
    /// ```
    pub fn settle<F>(arbiter: BusState, processor: F) -> Self
    where
        F: FnOnce(BusGrant) -> Option<ProcessorDrive>,
    {
        match arbiter {
            BusState::Driven(value) => Wire::Arbiter(value),
            BusState::Released => match processor(BusGrant { _private: () }) {
                Some(ProcessorDrive(value)) => Wire::Processor(value),
                None => Wire::Floating,
            },
        }
    }

    /// Level seen on the bus, `None` when floating
    #[inline]
    pub fn value(self) -> Option<u8> {
        match self {
            Wire::Floating => None,
            Wire::Arbiter(value) | Wire::Processor(value) => Some(value),
        }
    }
}
