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

//! Controller state register and arbitration mode

use crate::core::bus::tags;
use serde::{Deserialize, Serialize};

/// Controller state register
///
/// The register is 4 bits wide. Codes without a named state fold to
/// [`ControllerState::Reset`] when decoded.
///
/// ```text
/// Code | State               | Waiting for
/// -----|---------------------|----------------------------------
/// 0    | Reset               | -
/// 1    | GetCommands         | 01 / 10 command on the bus
/// 2    | JumpIntMethod       | -
/// 3    | StartPolling        | request bit at scan index
/// 4    | TxIntInfoPolling    | request ack (falling edge)
/// 5    | AckTxInfoRxPolling  | address ack (falling edge)
/// 6    | AckISRDonePolling   | completion frame + ack
/// 7    | StartPriority       | any request in the table
/// 8    | TxIntInfoPriority   | request ack (falling edge)
/// 9    | AckTxInfoRxPriority | address ack (falling edge)
/// 10   | AckISRDonePriority  | completion frame + ack
/// 11-15| (reserved)          | folds to Reset
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ControllerState {
    #[default]
    Reset,
    GetCommands,
    JumpIntMethod,
    StartPolling,
    TxIntInfoPolling,
    AckTxInfoRxPolling,
    AckISRDonePolling,
    StartPriority,
    TxIntInfoPriority,
    AckTxInfoRxPriority,
    AckISRDonePriority,
}

impl ControllerState {
    /// Decode a 4-bit state code
    ///
    /// # Example
    ///
    /// ```
    /// use irqx::core::arbiter::ControllerState;
    ///
    /// assert_eq!(ControllerState::from_code(3), ControllerState::StartPolling);
    /// assert_eq!(ControllerState::from_code(14), ControllerState::Reset);
    /// ```
    pub fn from_code(code: u8) -> Self {
        match code & 0x0F {
            1 => ControllerState::GetCommands,
            2 => ControllerState::JumpIntMethod,
            3 => ControllerState::StartPolling,
            4 => ControllerState::TxIntInfoPolling,
            5 => ControllerState::AckTxInfoRxPolling,
            6 => ControllerState::AckISRDonePolling,
            7 => ControllerState::StartPriority,
            8 => ControllerState::TxIntInfoPriority,
            9 => ControllerState::AckTxInfoRxPriority,
            10 => ControllerState::AckISRDonePriority,
            _ => ControllerState::Reset,
        }
    }

    /// Encode as a 4-bit state code
    pub fn code(self) -> u8 {
        match self {
            ControllerState::Reset => 0,
            ControllerState::GetCommands => 1,
            ControllerState::JumpIntMethod => 2,
            ControllerState::StartPolling => 3,
            ControllerState::TxIntInfoPolling => 4,
            ControllerState::AckTxInfoRxPolling => 5,
            ControllerState::AckISRDonePolling => 6,
            ControllerState::StartPriority => 7,
            ControllerState::TxIntInfoPriority => 8,
            ControllerState::AckTxInfoRxPriority => 9,
            ControllerState::AckISRDonePriority => 10,
        }
    }

    /// Handshake phase of this state, if it belongs to one
    pub fn phase(self) -> Option<(Scheme, Phase)> {
        match self {
            ControllerState::StartPolling => Some((Scheme::Polling, Phase::Scan)),
            ControllerState::TxIntInfoPolling => Some((Scheme::Polling, Phase::RequestAck)),
            ControllerState::AckTxInfoRxPolling => Some((Scheme::Polling, Phase::AddressAck)),
            ControllerState::AckISRDonePolling => Some((Scheme::Polling, Phase::Completion)),
            ControllerState::StartPriority => Some((Scheme::Priority, Phase::Scan)),
            ControllerState::TxIntInfoPriority => Some((Scheme::Priority, Phase::RequestAck)),
            ControllerState::AckTxInfoRxPriority => Some((Scheme::Priority, Phase::AddressAck)),
            ControllerState::AckISRDonePriority => Some((Scheme::Priority, Phase::Completion)),
            _ => None,
        }
    }
}

/// Arbitration mode selected during command reception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Uninitialized,
    Polling,
    Priority,
}

/// Which of the two handshake flavours a state belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    Polling,
    Priority,
}

impl Scheme {
    /// Tag of the arbiter-driven address frame
    pub fn address_tag(self) -> u8 {
        match self {
            Scheme::Polling => tags::POLL_ADDRESS,
            Scheme::Priority => tags::PRIORITY_ADDRESS,
        }
    }

    /// Tag of the processor-driven completion frame
    pub fn completion_tag(self) -> u8 {
        match self {
            Scheme::Polling => tags::POLL_COMPLETE,
            Scheme::Priority => tags::PRIORITY_COMPLETE,
        }
    }

    /// Mode that runs this scheme
    pub fn mode(self) -> Mode {
        match self {
            Scheme::Polling => Mode::Polling,
            Scheme::Priority => Mode::Priority,
        }
    }

    /// State that scans for the next request
    pub fn scan_state(self) -> ControllerState {
        self.state(Phase::Scan)
    }

    /// State implementing `phase` for this scheme
    pub fn state(self, phase: Phase) -> ControllerState {
        match (self, phase) {
            (Scheme::Polling, Phase::Scan) => ControllerState::StartPolling,
            (Scheme::Polling, Phase::RequestAck) => ControllerState::TxIntInfoPolling,
            (Scheme::Polling, Phase::AddressAck) => ControllerState::AckTxInfoRxPolling,
            (Scheme::Polling, Phase::Completion) => ControllerState::AckISRDonePolling,
            (Scheme::Priority, Phase::Scan) => ControllerState::StartPriority,
            (Scheme::Priority, Phase::RequestAck) => ControllerState::TxIntInfoPriority,
            (Scheme::Priority, Phase::AddressAck) => ControllerState::AckTxInfoRxPriority,
            (Scheme::Priority, Phase::Completion) => ControllerState::AckISRDonePriority,
        }
    }
}

/// Step of the request/address/completion handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Looking for a request to service
    Scan,
    /// Interrupt line raised, waiting for the first ack
    RequestAck,
    /// Address frame on the bus, waiting for the second ack
    AddressAck,
    /// Bus released, waiting for the completion frame
    Completion,
}
