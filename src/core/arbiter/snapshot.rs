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

//! Save states
//!
//! A snapshot captures the whole register file so a run can be resumed on the
//! exact tick it was saved. Snapshots are encoded with bincode.

use super::{CompletionSampling, InterruptArbiter, Registers};
use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized arbiter state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub registers: Registers,
    pub sampling: CompletionSampling,
    pub ticks: u64,
}

impl Snapshot {
    /// Encode to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| Error::Snapshot(format!("Failed to encode snapshot: {}", e)))
    }

    /// Decode from bytes
    ///
    /// Rejects other format versions, trailing bytes and register files the
    /// arbiter could not have reached (see [`Registers::validate`]).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (snapshot, consumed): (Snapshot, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| Error::Snapshot(format!("Failed to decode snapshot: {}", e)))?;

        if consumed != bytes.len() {
            return Err(Error::Snapshot(format!(
                "{} trailing bytes after snapshot",
                bytes.len() - consumed
            )));
        }

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Snapshot(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        snapshot.registers.validate()?;
        Ok(snapshot)
    }

    /// Write to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_bytes()?)?;
        log::info!("Snapshot saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Read from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }
}

impl InterruptArbiter {
    /// Capture the current state
    pub fn save_state(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            registers: self.regs,
            sampling: self.sampling,
            ticks: self.ticks,
        }
    }

    /// Restore a previously captured state
    ///
    /// The last recorded fault is cleared.
    pub fn load_state(&mut self, snapshot: &Snapshot) -> Result<()> {
        snapshot.registers.validate()?;
        self.regs = snapshot.registers;
        self.sampling = snapshot.sampling;
        self.ticks = snapshot.ticks;
        self.last_fault = None;
        log::debug!(
            "Snapshot restored: state {:?}, tick {}",
            self.regs.state,
            self.ticks
        );
        Ok(())
    }
}
