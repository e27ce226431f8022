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

//! Handshake sequencer and bus driver
//!
//! Both arbitration modes run the same three-phase exchange with the processor;
//! they differ only in how the source is picked and in the frame tags.
//!
//! ```text
//! Arbiter                          Processor
//!    | scan finds source S             |
//!    |-- interrupt_line = 1 ---------->|
//!    |<--------- ack falling edge -----|   (1) request ack
//!    |-- interrupt_line = 0            |
//!    |== bus: address_tag + S ========>|
//!    |<--------- ack falling edge -----|   (2) address ack
//!    |-- bus released                  |
//!    |<======= bus: completion_tag + S |
//!    |<--------- ack falling edge -----|   (3) completion
//!    | back to scan                    |
//! ```
//!
//! A completion whose frame does not match `completion_tag + S` is a protocol
//! violation and resets the whole arbiter.

use super::priority::{next_index, poll};
use super::signals::Inputs;
use super::state::{Phase, Scheme};
use super::{CompletionSampling, Registers};
use crate::core::bus::{BusState, Frame};
use crate::core::error::Fault;

/// Source carried by the handshake frames for `scheme`
fn active_source(scheme: Scheme, regs: &Registers) -> u8 {
    match scheme {
        Scheme::Polling => regs.scan_index,
        Scheme::Priority => regs.winner,
    }
}

/// Outcome of one handshake step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Step {
    /// Nothing to report
    Continue,
    /// A source finished its completion phase
    Serviced(u8),
}

/// Advance one handshake phase
///
/// `current` is the register file at the start of the tick, `next` the one
/// being built. On a protocol violation `next` is left untouched and the fault
/// is returned; the caller performs the reset.
pub(super) fn step(
    scheme: Scheme,
    phase: Phase,
    current: &Registers,
    inputs: &Inputs,
    ack_edge: bool,
    sampling: CompletionSampling,
    next: &mut Registers,
) -> Result<Step, Fault> {
    match phase {
        Phase::Scan => {
            scan(scheme, current, inputs, next);
            Ok(Step::Continue)
        }

        Phase::RequestAck => {
            if ack_edge {
                let frame = Frame::new(scheme.address_tag(), active_source(scheme, current));
                next.interrupt_line = false;
                next.bus = BusState::Driven(frame.raw());
                next.state = scheme.state(Phase::AddressAck);
                log::trace!("Address frame {} driven", frame);
            }
            Ok(Step::Continue)
        }

        Phase::AddressAck => {
            if ack_edge {
                next.bus = BusState::Released;
                next.state = scheme.state(Phase::Completion);
                log::trace!("Address acknowledged, bus released");
            }
            Ok(Step::Continue)
        }

        Phase::Completion => {
            if !ack_edge {
                return Ok(Step::Continue);
            }

            let source = active_source(scheme, current);
            let expected = Frame::new(scheme.completion_tag(), source).raw();
            let observed = match sampling {
                CompletionSampling::Registered => current.bus_sample,
                CompletionSampling::SameCycle => inputs.bus,
            };

            if observed == Some(expected) {
                // Polling keeps its index; priority re-evaluates from rank 0
                next.state = scheme.scan_state();
                Ok(Step::Serviced(source))
            } else {
                Err(Fault::CompletionMismatch { expected, observed })
            }
        }
    }
}

/// One tick of the polling or priority scanner
fn scan(scheme: Scheme, current: &Registers, inputs: &Inputs, next: &mut Registers) {
    match scheme {
        Scheme::Polling => {
            if poll(inputs.requests, current.scan_index) {
                next.interrupt_line = true;
                next.state = scheme.state(Phase::RequestAck);
                log::debug!("Polling: source {} requesting", current.scan_index);
            } else {
                next.scan_index = next_index(current.scan_index);
            }
        }
        Scheme::Priority => {
            if let Some((rank, source)) = current.table.first_pending(inputs.requests) {
                next.winner = source;
                next.interrupt_line = true;
                next.state = scheme.state(Phase::RequestAck);
                log::debug!("Priority: source {} wins at rank {}", source, rank);
            }
        }
    }
}
