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

//! Testbench
//!
//! Wires an [`InterruptArbiter`] to a [`Processor`] agent and a request vector,
//! and advances both one clock tick at a time.
//!
//! Each tick:
//!
//! 1. The processor reacts to the arbiter's registered outputs.
//! 2. The bus is settled: the processor only gets a grant if the arbiter has
//!    released the bus.
//! 3. The arbiter samples reset, requests, bus and ack on the clock edge.
//!
//! # Example
//!
//! ```
//! use irqx::core::arbiter::Requests;
//! use irqx::core::testbench::{Setup, Testbench};
//!
//! let mut bench = Testbench::new(Setup::Polling)
//!     .with_requests(Requests::from_bits_retain(0b1010_1010));
//!
//! let order: Vec<u8> = bench
//!     .run_until_serviced(4)
//!     .unwrap()
//!     .iter()
//!     .map(|record| record.source)
//!     .collect();
//! assert_eq!(order, vec![1, 3, 5, 7]);
//! ```

mod processor;

pub use processor::{Processor, Reaction, Setup};

use crate::core::arbiter::{
    CompletionSampling, ControllerState, Inputs, InterruptArbiter, Mode, Requests,
};
use crate::core::bus::{BusState, Wire};
use crate::core::error::{Error, Fault, Result};
use serde::Serialize;

/// Default tick budget for a run
pub const DEFAULT_MAX_TICKS: u64 = 10_000;

/// One accepted completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceRecord {
    pub source: u8,
    pub tick: u64,
}

/// Signals and state on one tick, for traces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickRecord {
    pub tick: u64,
    pub state: ControllerState,
    pub mode: Mode,
    pub requests: u8,
    pub ack: bool,
    pub wire: Wire,
    pub interrupt_line: bool,
    pub bus_out: BusState,
}

/// Arbiter + processor + stimulus
#[derive(Debug, Clone)]
pub struct Testbench {
    arbiter: InterruptArbiter,
    processor: Processor,
    requests: Requests,
    clear_on_service: bool,
    max_ticks: u64,
    services: Vec<ServiceRecord>,
    faults: Vec<(u64, Fault)>,
    trace: Option<Vec<TickRecord>>,
    /// Ticks where the processor wanted the bus while the arbiter held it
    refused_drives: u64,
}

impl Testbench {
    /// Create a testbench and take the arbiter through reset
    pub fn new(setup: Setup) -> Self {
        Self::with_arbiter(setup, InterruptArbiter::new())
    }

    /// Create a testbench around an existing arbiter and take it through reset
    pub fn with_arbiter(setup: Setup, arbiter: InterruptArbiter) -> Self {
        let mut bench = Self {
            arbiter,
            processor: Processor::new(setup),
            requests: Requests::empty(),
            clear_on_service: true,
            max_ticks: DEFAULT_MAX_TICKS,
            services: Vec::new(),
            faults: Vec::new(),
            trace: None,
            refused_drives: 0,
        };
        bench.power_on();
        bench
    }

    /// Completion sampling point of the arbiter (resets the arbiter)
    pub fn with_sampling(mut self, sampling: CompletionSampling) -> Self {
        self.arbiter = InterruptArbiter::with_sampling(sampling);
        self.power_on();
        self
    }

    pub fn with_requests(mut self, requests: Requests) -> Self {
        self.requests = requests;
        self
    }

    pub fn with_isr_latency(mut self, ticks: u32) -> Self {
        self.processor = self.processor.with_isr_latency(ticks);
        self
    }

    /// Withdraw a source's request when its ISR finishes (default on)
    pub fn with_clear_on_service(mut self, clear: bool) -> Self {
        self.clear_on_service = clear;
        self
    }

    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = ticks;
        self
    }

    /// Record a [`TickRecord`] for every tick
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled.then(Vec::new);
        self
    }

    /// Reset tick followed by the tick that leaves the reset state
    fn power_on(&mut self) {
        self.arbiter.reset();
        self.arbiter.tick(&Inputs::idle().with_requests(self.requests));
    }

    /// Assert additional request lines
    pub fn raise(&mut self, requests: Requests) {
        self.requests |= requests;
    }

    /// Withdraw request lines
    pub fn lower(&mut self, requests: Requests) {
        self.requests &= !requests;
    }

    /// Make the processor send a mismatching completion frame next time
    pub fn corrupt_next_completion(&mut self) {
        self.processor.corrupt_next_completion();
    }

    /// Advance one clock tick
    pub fn step(&mut self) -> Result<()> {
        let outputs = self.arbiter.outputs();
        let reaction = self.processor.react(&outputs)?;

        if let Some(source) = reaction.isr_done {
            if self.clear_on_service {
                self.lower(Requests::source(source));
            }
        }

        if reaction.drive.is_some() && outputs.bus.is_driven() {
            self.refused_drives += 1;
            log::warn!(
                "Processor wanted the bus while the arbiter drives it (tick {})",
                self.arbiter.ticks()
            );
        }
        let wire = Wire::settle(outputs.bus, |grant| {
            reaction.drive.map(|value| grant.drive(value))
        });

        let inputs = Inputs::idle()
            .with_requests(self.requests)
            .with_bus(wire.value())
            .with_ack(reaction.ack);
        let t = self.arbiter.step(&inputs);
        let tick = self.arbiter.ticks();

        if let Some(source) = t.serviced {
            self.services.push(ServiceRecord { source, tick });
        }
        if let Some(fault) = t.fault {
            self.faults.push((tick, fault));
            if t.next.state() == ControllerState::Reset {
                self.processor.restart();
            }
        }
        if let Some(trace) = self.trace.as_mut() {
            trace.push(TickRecord {
                tick,
                state: t.next.state(),
                mode: t.next.mode(),
                requests: self.requests.bits(),
                ack: reaction.ack,
                wire,
                interrupt_line: t.outputs.interrupt_line,
                bus_out: t.outputs.bus,
            });
        }

        Ok(())
    }

    /// Advance a fixed number of ticks
    pub fn run_for(&mut self, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(())
    }

    /// Run until `count` services have completed in total
    ///
    /// # Errors
    ///
    /// [`Error::Stalled`] if the tick budget runs out first.
    pub fn run_until_serviced(&mut self, count: usize) -> Result<&[ServiceRecord]> {
        while self.services.len() < count {
            if self.arbiter.ticks() >= self.max_ticks {
                return Err(Error::Stalled {
                    ticks: self.arbiter.ticks(),
                    state: self.arbiter.state(),
                });
            }
            self.step()?;
        }
        Ok(&self.services)
    }

    /// Run until the processor has finished configuring the arbiter
    pub fn run_until_configured(&mut self) -> Result<()> {
        while !self.processor.is_configured() {
            if self.arbiter.ticks() >= self.max_ticks {
                return Err(Error::Stalled {
                    ticks: self.arbiter.ticks(),
                    state: self.arbiter.state(),
                });
            }
            self.step()?;
        }
        Ok(())
    }

    pub fn arbiter(&self) -> &InterruptArbiter {
        &self.arbiter
    }

    pub fn requests(&self) -> Requests {
        self.requests
    }

    pub fn services(&self) -> &[ServiceRecord] {
        &self.services
    }

    /// Service order as source ids
    pub fn service_order(&self) -> Vec<u8> {
        self.services.iter().map(|record| record.source).collect()
    }

    pub fn faults(&self) -> &[(u64, Fault)] {
        &self.faults
    }

    pub fn trace(&self) -> Option<&[TickRecord]> {
        self.trace.as_deref()
    }

    pub fn refused_drives(&self) -> u64 {
        self.refused_drives
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arbiter::PriorityTable;

    #[test]
    fn test_power_on_reaches_command_reception() {
        let bench = Testbench::new(Setup::Polling);
        assert_eq!(bench.arbiter().state(), ControllerState::GetCommands);
        assert_eq!(bench.arbiter().ticks(), 2);
    }

    #[test]
    fn test_polling_alternating_sources() {
        let mut bench =
            Testbench::new(Setup::Polling).with_requests(Requests::from_bits_retain(0b1010_1010));
        bench.run_until_serviced(4).unwrap();
        assert_eq!(bench.service_order(), vec![1, 3, 5, 7]);
        assert!(bench.requests().is_empty());

        // Nothing left: the scanner keeps cycling without raising the line
        bench.run_for(32).unwrap();
        assert_eq!(bench.services().len(), 4);
        assert_eq!(bench.arbiter().state(), ControllerState::StartPolling);
        assert!(!bench.arbiter().outputs().interrupt_line);
    }

    #[test]
    fn test_priority_round_trip_order() {
        let table = PriorityTable::from_ranks([5, 3, 7, 0, 4, 2, 6, 1]).unwrap();
        let mut bench = Testbench::new(Setup::Priority(table)).with_requests(Requests::all());
        bench.run_until_serviced(8).unwrap();
        assert_eq!(bench.service_order(), vec![5, 3, 7, 0, 4, 2, 6, 1]);
        assert_eq!(bench.refused_drives(), 0);
    }

    #[test]
    fn test_stall_is_reported() {
        let mut bench = Testbench::new(Setup::Polling).with_max_ticks(50);
        let err = bench.run_until_serviced(1).unwrap_err();
        assert!(matches!(
            err,
            Error::Stalled {
                ticks: 50,
                state: ControllerState::StartPolling
            }
        ));
    }

    #[test]
    fn test_corrupt_completion_resets_and_reconfigures() {
        let table = PriorityTable::from_ranks([7, 6, 5, 4, 3, 2, 1, 0]).unwrap();
        let mut bench =
            Testbench::new(Setup::Priority(table)).with_requests(Requests::IRQ2 | Requests::IRQ6);
        bench.corrupt_next_completion();

        // Source 6 wins first and its request is withdrawn when its ISR ends.
        // The corrupted completion is rejected, the arbiter resets, the
        // processor reconfigures, and only source 2 is left to service.
        bench.run_until_serviced(1).unwrap();
        assert_eq!(bench.faults().len(), 1);
        assert!(matches!(
            bench.faults()[0].1,
            Fault::CompletionMismatch { .. }
        ));
        assert_eq!(bench.service_order(), vec![2]);
        assert_eq!(bench.arbiter().mode(), Mode::Priority);
    }

    #[test]
    fn test_trace_records_every_tick() {
        let mut bench = Testbench::new(Setup::Polling).with_trace(true);
        bench.run_for(10).unwrap();
        let trace = bench.trace().unwrap();
        assert_eq!(trace.len(), 10);
        assert_eq!(trace[0].tick, 3);
        assert_eq!(trace[0].wire, Wire::Processor(0b01));
        assert_eq!(trace[0].state, ControllerState::JumpIntMethod);
    }

    #[test]
    fn test_same_cycle_sampling_services_too() {
        let mut bench = Testbench::new(Setup::Polling)
            .with_sampling(CompletionSampling::SameCycle)
            .with_requests(Requests::IRQ4);
        bench.run_until_serviced(1).unwrap();
        assert_eq!(bench.service_order(), vec![4]);
    }
}
