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

//! 8-Source Interrupt Arbiter
//!
//! The arbiter decides which of eight request lines is serviced next and hands
//! the winner to the processor over a shared half-duplex bus.
//!
//! ## Operation
//!
//! 1. **Reset**: every register returns to its initial value, bus released.
//! 2. **Command reception**: the processor selects polling (`01`) or loads the
//!    priority table with four `10` commands.
//! 3. **Dispatch**: transient scan state is cleared and the mode's scanner starts.
//! 4. **Scan + handshake**: a requesting source is found, then the three-phase
//!    request/address/completion exchange runs.
//!
//! ## Modes
//!
//! - **Polling**: a 3-bit index walks 0..7, one index per tick. After a
//!   completion the scan resumes from the serviced index.
//! - **Priority**: every tick the table is searched from rank 0; the first rank
//!   whose source is requesting wins. After a completion the search restarts
//!   from rank 0.
//!
//! ## Timing
//!
//! One call to [`InterruptArbiter::tick`] is one clock edge. The next register
//! file is a pure function of the current one and the sampled inputs
//! ([`transition`]); outputs are taken from the registers after the edge.

mod command;
mod handshake;
mod priority;
mod signals;
mod snapshot;
mod state;

pub use command::{decode_command, CommandAction};
pub use priority::{next_index, poll, PriorityTable, SOURCE_COUNT};
pub use signals::{Inputs, Outputs, Requests};
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use state::{ControllerState, Mode, Phase, Scheme};

use super::bus::BusState;
use super::error::{Error, Fault, Result};
use handshake::Step;
use serde::{Deserialize, Serialize};

/// When the completion frame is sampled relative to its ack edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionSampling {
    /// Compare against the bus level latched on the previous tick
    #[default]
    Registered,
    /// Compare against the bus level on the tick of the ack edge
    SameCycle,
}

/// State register stored as its 4-bit code; reserved codes load as Reset
mod state_code {
    use super::ControllerState;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(state: &ControllerState, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(state.code())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ControllerState, D::Error> {
        u8::deserialize(d).map(ControllerState::from_code)
    }
}

/// Complete register file of the arbiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    #[serde(with = "state_code")]
    pub(crate) state: ControllerState,
    pub(crate) mode: Mode,
    /// Priority load cycle (0-3)
    pub(crate) cycle: u8,
    pub(crate) table: PriorityTable,
    /// Polling scan index (0-7)
    pub(crate) scan_index: u8,
    /// Winning source of the last priority scan (0-7)
    pub(crate) winner: u8,
    /// Drive enable + driven value
    pub(crate) bus: BusState,
    pub(crate) interrupt_line: bool,
    /// Ack level latched on the previous tick (edge detection)
    pub(crate) ack_sample: bool,
    /// Bus level latched on the previous tick
    pub(crate) bus_sample: Option<u8>,
}

impl Registers {
    /// Power-on / reset values
    pub fn reset_value() -> Self {
        Self {
            state: ControllerState::Reset,
            mode: Mode::Uninitialized,
            cycle: 0,
            table: PriorityTable::new(),
            scan_index: 0,
            winner: 0,
            bus: BusState::Released,
            interrupt_line: false,
            ack_sample: true,
            bus_sample: None,
        }
    }

    #[inline]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Registered outputs
    #[inline]
    pub fn outputs(&self) -> Outputs {
        Outputs {
            interrupt_line: self.interrupt_line,
            bus: self.bus,
        }
    }

    /// Check that every field fits its hardware width and that the fields
    /// agree with each other
    ///
    /// A register file the arbiter can reach from reset always passes:
    ///
    /// - `cycle` is non-zero only during command reception
    /// - reset and command reception run without a mode
    /// - a scan or handshake state runs under its own mode
    /// - the bus is driven exactly in the address-ack states
    /// - the interrupt line is high exactly in the request-ack states
    pub fn validate(&self) -> Result<()> {
        if self.cycle > 3 {
            return Err(Error::Snapshot(format!(
                "load cycle {} out of range",
                self.cycle
            )));
        }
        if self.scan_index as usize >= SOURCE_COUNT {
            return Err(Error::InvalidSourceId(self.scan_index));
        }
        if self.winner as usize >= SOURCE_COUNT {
            return Err(Error::InvalidSourceId(self.winner));
        }
        PriorityTable::from_ranks(*self.table.ranks())?;
        self.check_consistency().map_err(Error::Snapshot)
    }

    fn check_consistency(&self) -> std::result::Result<(), String> {
        if self.cycle != 0 && self.state != ControllerState::GetCommands {
            return Err(format!(
                "load cycle {} outside command reception (state {:?})",
                self.cycle, self.state
            ));
        }

        let phase = self.state.phase();
        let expected_mode = match (self.state, phase) {
            (ControllerState::Reset | ControllerState::GetCommands, _) => {
                Some(Mode::Uninitialized)
            }
            (_, Some((scheme, _))) => Some(scheme.mode()),
            // Dispatch falls back to reset without a mode
            _ => None,
        };
        if let Some(mode) = expected_mode {
            if self.mode != mode {
                return Err(format!(
                    "mode {:?} in state {:?} (expected {:?})",
                    self.mode, self.state, mode
                ));
            }
        }

        let address_phase = matches!(phase, Some((_, Phase::AddressAck)));
        if self.bus.is_driven() != address_phase {
            return Err(format!("bus {:?} in state {:?}", self.bus, self.state));
        }

        let request_phase = matches!(phase, Some((_, Phase::RequestAck)));
        if self.interrupt_line != request_phase {
            return Err(format!(
                "interrupt line {} in state {:?}",
                self.interrupt_line, self.state
            ));
        }

        Ok(())
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::reset_value()
    }
}

/// Result of one clock edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: Registers,
    pub outputs: Outputs,
    /// Fault detected on this edge (the arbiter has already recovered)
    pub fault: Option<Fault>,
    /// Source whose completion was accepted on this edge
    pub serviced: Option<u8>,
}

/// Compute the register file after one clock edge
///
/// Pure function: `current` is not modified.
///
/// # Example
///
/// ```
/// use irqx::core::arbiter::{transition, CompletionSampling, ControllerState, Inputs, Registers};
///
/// let regs = Registers::reset_value();
/// let t = transition(&regs, &Inputs::idle(), CompletionSampling::Registered);
/// assert_eq!(t.next.state(), ControllerState::GetCommands);
/// ```
pub fn transition(
    current: &Registers,
    inputs: &Inputs,
    sampling: CompletionSampling,
) -> Transition {
    if inputs.reset {
        let next = Registers::reset_value();
        return Transition {
            next,
            outputs: next.outputs(),
            fault: None,
            serviced: None,
        };
    }

    let ack_edge = current.ack_sample && !inputs.ack;

    let mut next = *current;
    next.ack_sample = inputs.ack;
    next.bus_sample = inputs.bus;

    let mut fault = None;
    let mut serviced = None;

    match current.state {
        ControllerState::Reset => {
            next.state = ControllerState::GetCommands;
        }

        ControllerState::GetCommands => {
            if let Err(f) = receive_command(current, inputs, &mut next) {
                fault = Some(f);
            }
        }

        ControllerState::JumpIntMethod => {
            next.scan_index = 0;
            next.winner = 0;
            next.bus = BusState::Released;
            next.state = match current.mode {
                Mode::Polling => ControllerState::StartPolling,
                Mode::Priority => ControllerState::StartPriority,
                Mode::Uninitialized => ControllerState::Reset,
            };
        }

        state => {
            if let Some((scheme, phase)) = state.phase() {
                match handshake::step(
                    scheme, phase, current, inputs, ack_edge, sampling, &mut next,
                ) {
                    Ok(Step::Serviced(source)) => serviced = Some(source),
                    Ok(Step::Continue) => {}
                    Err(f) => {
                        fault = Some(f);
                        next = Registers::reset_value();
                    }
                }
            }
        }
    }

    Transition {
        next,
        outputs: next.outputs(),
        fault,
        serviced,
    }
}

/// Command reception: mode select and priority table load
fn receive_command(
    current: &Registers,
    inputs: &Inputs,
    next: &mut Registers,
) -> std::result::Result<(), Fault> {
    match decode_command(current.cycle, inputs.bus) {
        CommandAction::Hold => Ok(()),

        CommandAction::SelectPolling => {
            next.mode = Mode::Polling;
            next.state = ControllerState::JumpIntMethod;
            Ok(())
        }

        CommandAction::LoadPair {
            cycle,
            high,
            low,
            last,
        } => {
            next.table.write_pair(cycle, high, low);
            next.cycle = (cycle + 1) & 0x03;
            if last {
                next.mode = Mode::Priority;
                next.state = ControllerState::JumpIntMethod;
            }
            Ok(())
        }

        CommandAction::Abort { cycle, code } => {
            next.cycle = 0;
            next.mode = Mode::Uninitialized;
            next.table = PriorityTable::new();
            Err(Fault::MalformedCommand { cycle, code })
        }
    }
}

/// The interrupt arbiter
///
/// Owns its register file; the only way to change it is [`tick`](Self::tick).
///
/// # Example
///
/// ```
/// use irqx::core::arbiter::{ControllerState, Inputs, InterruptArbiter, Mode, Requests};
///
/// let mut arbiter = InterruptArbiter::new();
///
/// // Reset -> command reception
/// arbiter.tick(&Inputs::idle());
/// assert_eq!(arbiter.state(), ControllerState::GetCommands);
///
/// // Select polling, then dispatch
/// arbiter.tick(&Inputs::idle().with_bus(Some(0b01)));
/// arbiter.tick(&Inputs::idle());
/// assert_eq!(arbiter.mode(), Mode::Polling);
///
/// // Source 0 is requesting
/// let out = arbiter.tick(&Inputs::idle().with_requests(Requests::IRQ0));
/// assert!(out.interrupt_line);
/// ```
#[derive(Debug, Clone)]
pub struct InterruptArbiter {
    regs: Registers,
    sampling: CompletionSampling,
    last_fault: Option<Fault>,
    ticks: u64,
}

impl InterruptArbiter {
    /// Create an arbiter in its reset state
    pub fn new() -> Self {
        Self::with_sampling(CompletionSampling::default())
    }

    /// Create an arbiter with an explicit completion sampling point
    pub fn with_sampling(sampling: CompletionSampling) -> Self {
        Self {
            regs: Registers::reset_value(),
            sampling,
            last_fault: None,
            ticks: 0,
        }
    }

    /// Advance one clock edge
    ///
    /// # Arguments
    ///
    /// * `inputs` - Signals sampled on this edge
    ///
    /// # Returns
    ///
    /// Outputs registered on this edge
    pub fn tick(&mut self, inputs: &Inputs) -> Outputs {
        self.step(inputs).outputs
    }

    /// Advance one clock edge and return the full transition record
    pub fn step(&mut self, inputs: &Inputs) -> Transition {
        let t = transition(&self.regs, inputs, self.sampling);
        self.ticks += 1;

        if t.next.state != self.regs.state {
            log::debug!(
                "Arbiter: {:?} -> {:?} (tick {})",
                self.regs.state,
                t.next.state,
                self.ticks
            );
        }
        if t.next.mode != self.regs.mode {
            log::debug!("Arbiter mode: {:?} -> {:?}", self.regs.mode, t.next.mode);
        }
        if let Some(fault) = t.fault {
            log::warn!("Arbiter fault at tick {}: {}", self.ticks, fault);
            self.last_fault = Some(fault);
        }
        if let Some(source) = t.serviced {
            log::info!("Source {} serviced at tick {}", source, self.ticks);
        }
        log::trace!(
            "tick {}: req=0x{:02X} bus_in={:?} ack={} -> irq={} bus_out={:?}",
            self.ticks,
            inputs.requests.bits(),
            inputs.bus,
            inputs.ack,
            t.outputs.interrupt_line,
            t.outputs.bus
        );

        self.regs = t.next;
        t
    }

    /// Assert reset for one tick
    pub fn reset(&mut self) -> Outputs {
        self.tick(&Inputs::idle().with_reset(true))
    }

    #[inline]
    pub fn outputs(&self) -> Outputs {
        self.regs.outputs()
    }

    #[inline]
    pub fn state(&self) -> ControllerState {
        self.regs.state
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.regs.mode
    }

    #[inline]
    pub fn command_cycle(&self) -> u8 {
        self.regs.cycle
    }

    #[inline]
    pub fn priority_table(&self) -> &PriorityTable {
        &self.regs.table
    }

    #[inline]
    pub fn scan_index(&self) -> u8 {
        self.regs.scan_index
    }

    #[inline]
    pub fn winning_source(&self) -> u8 {
        self.regs.winner
    }

    #[inline]
    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    /// Most recent protocol fault, if any
    #[inline]
    pub fn last_fault(&self) -> Option<Fault> {
        self.last_fault
    }

    /// Clock edges seen since creation
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[inline]
    pub fn sampling(&self) -> CompletionSampling {
        self.sampling
    }
}

impl Default for InterruptArbiter {
    fn default() -> Self {
        Self::new()
    }
}
