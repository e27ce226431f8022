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

//! Priority table and the two request scanners
//!
//! The table has one slot per rank (0 = highest, 7 = lowest); each slot holds
//! the 3-bit id of the source assigned that rank. It is written two slots at a
//! time by the four priority-load commands and is read-only afterwards.

use super::signals::Requests;
use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Number of interrupt sources (and priority ranks)
pub const SOURCE_COUNT: usize = 8;

/// Rank-ordered source ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PriorityTable {
    slots: [u8; SOURCE_COUNT],
}

impl PriorityTable {
    /// Create an empty table (every slot holds source 0)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from rank-ordered source ids
    ///
    /// Ids are checked to fit in 3 bits. Duplicates are allowed here; the
    /// arbiter accepts whatever the load sequence delivers.
    ///
    /// # Example
    ///
    /// ```
    /// use irqx::core::arbiter::PriorityTable;
    ///
    /// let table = PriorityTable::from_ranks([5, 3, 7, 0, 4, 2, 6, 1]).unwrap();
    /// assert_eq!(table.source_at(0), 5);
    /// assert_eq!(table.source_at(7), 1);
    /// ```
    pub fn from_ranks(slots: [u8; SOURCE_COUNT]) -> Result<Self> {
        if let Some(&bad) = slots.iter().find(|&&id| id as usize >= SOURCE_COUNT) {
            return Err(Error::InvalidSourceId(bad));
        }
        Ok(Self { slots })
    }

    /// Source id at `rank` (taken modulo 8)
    #[inline]
    pub fn source_at(&self, rank: u8) -> u8 {
        self.slots[(rank & 0x07) as usize]
    }

    /// Rank-ordered source ids
    #[inline]
    pub fn ranks(&self) -> &[u8; SOURCE_COUNT] {
        &self.slots
    }

    /// Write the two slots filled by load cycle `cycle` (0-3)
    ///
    /// Cycle `n` writes ranks `2n` and `2n + 1`.
    pub(crate) fn write_pair(&mut self, cycle: u8, high: u8, low: u8) {
        let base = ((cycle & 0x03) as usize) * 2;
        self.slots[base] = high & 0x07;
        self.slots[base + 1] = low & 0x07;
        log::trace!(
            "Priority table: rank {} <- source {}, rank {} <- source {}",
            base,
            high & 0x07,
            base + 1,
            low & 0x07
        );
    }

    /// First rank whose source is requesting, as `(rank, source)`
    ///
    /// Ranks are checked strictly in order 0..7, so a lower rank always wins.
    ///
    /// # Example
    ///
    /// ```
    /// use irqx::core::arbiter::{PriorityTable, Requests};
    ///
    /// let table = PriorityTable::from_ranks([5, 3, 7, 0, 4, 2, 6, 1]).unwrap();
    /// let requests = Requests::IRQ0 | Requests::IRQ7;
    /// assert_eq!(table.first_pending(requests), Some((2, 7)));
    /// ```
    pub fn first_pending(&self, requests: Requests) -> Option<(u8, u8)> {
        self.slots
            .iter()
            .enumerate()
            .find(|&(_, &source)| requests.is_pending(source))
            .map(|(rank, &source)| (rank as u8, source))
    }

    /// Check that every source appears exactly once
    ///
    /// The arbiter itself does not require this; configuration front ends use
    /// it to reject tables that would starve a source.
    pub fn validate_permutation(&self) -> Result<()> {
        let mut seen = [false; SOURCE_COUNT];
        for &source in &self.slots {
            if seen[source as usize] {
                return Err(Error::InvalidPriorityTable {
                    table: self.slots.to_vec(),
                    reason: format!("source {} appears more than once", source),
                });
            }
            seen[source as usize] = true;
        }
        Ok(())
    }
}

/// Round-robin polling step: is the source at `index` requesting?
#[inline]
pub fn poll(requests: Requests, index: u8) -> bool {
    requests.is_pending(index)
}

/// Next polling index (wraps 7 -> 0)
#[inline]
pub fn next_index(index: u8) -> u8 {
    index.wrapping_add(1) & 0x07
}
