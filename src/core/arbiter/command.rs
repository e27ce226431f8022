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

//! Command reception decode
//!
//! While the arbiter sits in `GetCommands` it reads one command byte per tick.
//!
//! ```text
//! Load cycle | Code | Action
//! -----------|------|---------------------------------------------
//! 0          | 01   | Select polling, dispatch
//! 0          | 10   | Write ranks 0-1, cycle -> 1
//! 1          | 10   | Write ranks 2-3, cycle -> 2
//! 2          | 10   | Write ranks 4-5, cycle -> 3
//! 3          | 10   | Write ranks 6-7, select priority, dispatch
//! 0          | else | Hold (no side effect)
//! 1-3        | else | Abort: clear cycle, mode and table
//! ```

use crate::core::bus::{command_code, commands, priority_entries};

/// What command reception does with one sampled byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    /// Nothing recognised; stay in command reception
    Hold,
    /// `01` at the start of a sequence
    SelectPolling,
    /// `10`: write two priority entries for `cycle`
    LoadPair {
        cycle: u8,
        high: u8,
        low: u8,
        /// This pair completes the table
        last: bool,
    },
    /// Anything but `10` part way through a priority load
    Abort { cycle: u8, code: Option<u8> },
}

/// Decode one command byte given the current load cycle
///
/// `byte` is `None` while the bus floats.
///
/// # Example
///
/// ```
/// use irqx::core::arbiter::{decode_command, CommandAction};
///
/// assert_eq!(decode_command(0, Some(0b01)), CommandAction::SelectPolling);
/// assert_eq!(decode_command(0, Some(0b11)), CommandAction::Hold);
/// assert_eq!(
///     decode_command(2, Some(0b11)),
///     CommandAction::Abort { cycle: 2, code: Some(0b11) }
/// );
/// ```
pub fn decode_command(cycle: u8, byte: Option<u8>) -> CommandAction {
    let cycle = cycle & 0x03;
    let code = byte.map(command_code);

    match (cycle, code) {
        (_, Some(commands::PRIORITY)) => {
            let (high, low) = priority_entries(byte.unwrap_or_default());
            CommandAction::LoadPair {
                cycle,
                high,
                low,
                last: cycle == 3,
            }
        }
        (0, Some(commands::POLLING)) => CommandAction::SelectPolling,
        (0, _) => CommandAction::Hold,
        (_, code) => CommandAction::Abort { cycle, code },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bus::priority_load;

    #[test]
    fn test_polling_command() {
        assert_eq!(decode_command(0, Some(0b01)), CommandAction::SelectPolling);
        // Upper bits are ignored for the code
        assert_eq!(
            decode_command(0, Some(0b1111_1101)),
            CommandAction::SelectPolling
        );
    }

    #[test]
    fn test_priority_cycles() {
        for cycle in 0..4 {
            assert_eq!(
                decode_command(cycle, Some(priority_load(6, 1))),
                CommandAction::LoadPair {
                    cycle,
                    high: 6,
                    low: 1,
                    last: cycle == 3,
                }
            );
        }
    }

    #[test]
    fn test_unrecognised_codes_hold_at_start() {
        assert_eq!(decode_command(0, Some(0b00)), CommandAction::Hold);
        assert_eq!(decode_command(0, Some(0b11)), CommandAction::Hold);
        assert_eq!(decode_command(0, None), CommandAction::Hold);
    }

    #[test]
    fn test_anything_but_priority_aborts_mid_load() {
        for code in [0b00, 0b01, 0b11] {
            assert_eq!(
                decode_command(1, Some(code)),
                CommandAction::Abort {
                    cycle: 1,
                    code: Some(code)
                }
            );
        }
        assert_eq!(
            decode_command(3, None),
            CommandAction::Abort {
                cycle: 3,
                code: None
            }
        );
    }
}
