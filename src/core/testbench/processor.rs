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

//! Processor agent
//!
//! The processor side of the handshake. Each tick it looks at the arbiter's
//! registered outputs and decides its ack level and whether it wants the bus.
//!
//! ```text
//! State            | ack | bus           | Next
//! -----------------|-----|---------------|------------------------------
//! Configuring      | 1   | command byte  | Idle after the last command
//! Idle             | 1/0 | -             | AwaitAddress when irq is seen
//! AwaitAddress     | 1   | (reads frame) | AckAddress
//! AckAddress       | 0   | -             | Servicing
//! Servicing        | 1   | -             | DriveCompletion when done
//! DriveCompletion  | 1,0 | completion    | Idle
//! Rebooting        | 1   | -             | Configuring
//! ```

use crate::core::arbiter::{Outputs, PriorityTable, Scheme};
use crate::core::bus::{commands, priority_load, BusState, Frame};
use crate::core::error::{Error, Result};

/// How the processor initialises the arbiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setup {
    Polling,
    Priority(PriorityTable),
}

impl Setup {
    /// Command bytes sent during command reception
    ///
    /// # Example
    ///
    /// ```
    /// use irqx::core::testbench::Setup;
    ///
    /// assert_eq!(Setup::Polling.commands(), vec![0b01]);
    /// ```
    pub fn commands(&self) -> Vec<u8> {
        match self {
            Setup::Polling => vec![commands::POLLING],
            Setup::Priority(table) => table
                .ranks()
                .chunks(2)
                .map(|pair| priority_load(pair[0], pair[1]))
                .collect(),
        }
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            Setup::Polling => Scheme::Polling,
            Setup::Priority(_) => Scheme::Priority,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentState {
    Configuring { next: usize },
    Idle,
    AwaitAddress,
    AckAddress { source: u8 },
    Servicing { source: u8, remaining: u32 },
    DriveCompletion { source: u8, strobe: bool },
    Rebooting,
}

/// What the processor does on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaction {
    pub ack: bool,
    /// Value the processor wants on the bus
    pub drive: Option<u8>,
    /// Source whose ISR finished this tick (its request may be withdrawn)
    pub isr_done: Option<u8>,
}

impl Reaction {
    fn idle() -> Self {
        Self {
            ack: true,
            drive: None,
            isr_done: None,
        }
    }
}

/// Processor-side handshake agent
#[derive(Debug, Clone)]
pub struct Processor {
    setup: Setup,
    commands: Vec<u8>,
    state: AgentState,
    isr_latency: u32,
    corrupt_next: bool,
}

impl Processor {
    pub fn new(setup: Setup) -> Self {
        Self {
            commands: setup.commands(),
            setup,
            state: AgentState::Configuring { next: 0 },
            isr_latency: 0,
            corrupt_next: false,
        }
    }

    /// Ticks spent in the ISR between the address ack and the completion
    pub fn with_isr_latency(mut self, ticks: u32) -> Self {
        self.isr_latency = ticks;
        self
    }

    /// Send a wrong completion frame for the next serviced source
    pub fn corrupt_next_completion(&mut self) {
        self.corrupt_next = true;
    }

    /// Start over after the arbiter reset itself
    pub fn restart(&mut self) {
        log::debug!("Processor: arbiter reset, reconfiguring");
        self.state = AgentState::Rebooting;
    }

    /// Whether the command sequence has been fully sent
    pub fn is_configured(&self) -> bool {
        !matches!(
            self.state,
            AgentState::Configuring { .. } | AgentState::Rebooting
        )
    }

    /// Decide this tick's ack level and bus drive
    ///
    /// # Arguments
    ///
    /// * `outputs` - Arbiter outputs registered on the previous edge
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedFrame`] if the arbiter's address frame is missing or
    /// carries the wrong tag.
    pub fn react(&mut self, outputs: &Outputs) -> Result<Reaction> {
        let scheme = self.setup.scheme();
        let mut reaction = Reaction::idle();

        self.state = match self.state {
            AgentState::Rebooting => AgentState::Configuring { next: 0 },

            AgentState::Configuring { next } => {
                reaction.drive = self.commands.get(next).copied();
                if next + 1 >= self.commands.len() {
                    AgentState::Idle
                } else {
                    AgentState::Configuring { next: next + 1 }
                }
            }

            AgentState::Idle => {
                if outputs.interrupt_line {
                    reaction.ack = false;
                    AgentState::AwaitAddress
                } else {
                    AgentState::Idle
                }
            }

            AgentState::AwaitAddress => {
                let expected_tag = scheme.address_tag();
                match outputs.bus {
                    BusState::Driven(raw) if Frame::from_raw(raw).tag() == expected_tag => {
                        let source = Frame::from_raw(raw).source();
                        log::trace!("Processor: address frame for source {}", source);
                        AgentState::AckAddress { source }
                    }
                    other => {
                        return Err(Error::UnexpectedFrame {
                            expected: Frame::new(expected_tag, 0).raw(),
                            observed: other.value(),
                        });
                    }
                }
            }

            AgentState::AckAddress { source } => {
                reaction.ack = false;
                AgentState::Servicing {
                    source,
                    remaining: self.isr_latency,
                }
            }

            AgentState::Servicing { source, remaining } => {
                if remaining == 0 {
                    reaction.isr_done = Some(source);
                    AgentState::DriveCompletion {
                        source,
                        strobe: false,
                    }
                } else {
                    AgentState::Servicing {
                        source,
                        remaining: remaining - 1,
                    }
                }
            }

            AgentState::DriveCompletion { source, strobe } => {
                let frame_source = if self.corrupt_next { source ^ 1 } else { source };
                reaction.drive = Some(Frame::new(scheme.completion_tag(), frame_source).raw());
                if strobe {
                    reaction.ack = false;
                    self.corrupt_next = false;
                    AgentState::Idle
                } else {
                    AgentState::DriveCompletion {
                        source,
                        strobe: true,
                    }
                }
            }
        };

        Ok(reaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bus::tags;

    fn irq() -> Outputs {
        Outputs {
            interrupt_line: true,
            bus: BusState::Released,
        }
    }

    #[test]
    fn test_priority_setup_commands() {
        let table = PriorityTable::from_ranks([5, 3, 7, 0, 4, 2, 6, 1]).unwrap();
        assert_eq!(
            Setup::Priority(table).commands(),
            vec![
                priority_load(5, 3),
                priority_load(7, 0),
                priority_load(4, 2),
                priority_load(6, 1)
            ]
        );
    }

    #[test]
    fn test_configuring_sends_each_command_once() {
        let table = PriorityTable::from_ranks([0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        let mut cpu = Processor::new(Setup::Priority(table));
        let mut sent = Vec::new();
        while !cpu.is_configured() {
            sent.push(cpu.react(&Outputs::default()).unwrap().drive.unwrap());
        }
        assert_eq!(sent, Setup::Priority(table).commands());
    }

    #[test]
    fn test_full_exchange() {
        let mut cpu = Processor::new(Setup::Polling);
        cpu.react(&Outputs::default()).unwrap();

        // Request ack
        let r = cpu.react(&irq()).unwrap();
        assert!(!r.ack);

        // Address frame is read, then acked
        let address = Outputs {
            interrupt_line: false,
            bus: BusState::Driven(Frame::new(tags::POLL_ADDRESS, 6).raw()),
        };
        assert!(cpu.react(&address).unwrap().ack);
        assert!(!cpu.react(&address).unwrap().ack);

        // Zero latency: ISR done immediately
        let r = cpu.react(&Outputs::default()).unwrap();
        assert_eq!(r.isr_done, Some(6));

        let done = Frame::new(tags::POLL_COMPLETE, 6).raw();
        let r = cpu.react(&Outputs::default()).unwrap();
        assert_eq!((r.ack, r.drive), (true, Some(done)));
        let r = cpu.react(&Outputs::default()).unwrap();
        assert_eq!((r.ack, r.drive), (false, Some(done)));

        assert_eq!(cpu.react(&Outputs::default()).unwrap(), Reaction::idle());
    }

    #[test]
    fn test_wrong_address_tag_is_error() {
        let mut cpu = Processor::new(Setup::Polling);
        cpu.react(&Outputs::default()).unwrap();
        cpu.react(&irq()).unwrap();

        let wrong = Outputs {
            interrupt_line: false,
            bus: BusState::Driven(Frame::new(tags::PRIORITY_ADDRESS, 1).raw()),
        };
        assert!(matches!(
            cpu.react(&wrong),
            Err(Error::UnexpectedFrame { .. })
        ));
    }

    #[test]
    fn test_isr_latency_delays_completion() {
        let mut cpu = Processor::new(Setup::Polling).with_isr_latency(3);
        cpu.react(&Outputs::default()).unwrap();
        cpu.react(&irq()).unwrap();
        let address = Outputs {
            interrupt_line: false,
            bus: BusState::Driven(Frame::new(tags::POLL_ADDRESS, 0).raw()),
        };
        cpu.react(&address).unwrap();
        cpu.react(&address).unwrap();

        for _ in 0..3 {
            assert_eq!(cpu.react(&Outputs::default()).unwrap().isr_done, None);
        }
        assert_eq!(cpu.react(&Outputs::default()).unwrap().isr_done, Some(0));
    }
}
