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

//! Property-based tests for arbiter invariants.

use irqx::core::arbiter::{
    transition, CompletionSampling, ControllerState, Inputs, InterruptArbiter, Mode,
    PriorityTable, Registers, Requests,
};
use irqx::core::bus::{BusState, Wire};
use irqx::core::testbench::{Setup, Testbench};
use proptest::prelude::*;

/// Arbitrary non-reset input vector
fn inputs() -> impl Strategy<Value = Inputs> {
    (any::<u8>(), proptest::option::of(any::<u8>()), any::<bool>()).prop_map(
        |(requests, bus, ack)| {
            Inputs::idle()
                .with_requests(Requests::from_bits_retain(requests))
                .with_bus(bus)
                .with_ack(ack)
        },
    )
}

/// Permutation of the eight source ids
fn ranks() -> impl Strategy<Value = [u8; 8]> {
    Just(vec![0u8, 1, 2, 3, 4, 5, 6, 7])
        .prop_shuffle()
        .prop_map(|v| {
            let mut ranks = [0u8; 8];
            ranks.copy_from_slice(&v);
            ranks
        })
}

/// Byte whose command code is neither polling nor priority
fn invalid_command() -> impl Strategy<Value = u8> {
    any::<u8>().prop_map(|b| match b & 0b11 {
        0b01 | 0b10 => b ^ 0b01,
        _ => b,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_reset_restores_power_on_state(history in prop::collection::vec(inputs(), 0..64)) {
        let mut arbiter = InterruptArbiter::new();
        for input in &history {
            arbiter.tick(input);
        }
        let out = arbiter.reset();
        prop_assert_eq!(*arbiter.registers(), Registers::reset_value());
        prop_assert!(!out.interrupt_line);
        prop_assert_eq!(out.bus, BusState::Released);
    }

    #[test]
    fn prop_reachable_registers_validate(
        history in prop::collection::vec(inputs(), 0..96),
    ) {
        let mut arbiter = InterruptArbiter::new();
        for input in &history {
            arbiter.tick(input);
            let regs = arbiter.registers();
            prop_assert!(regs.validate().is_ok(), "{:?}", regs);
        }
    }

    #[test]
    fn prop_transition_is_pure(
        history in prop::collection::vec(inputs(), 0..32),
        last in inputs(),
    ) {
        let mut arbiter = InterruptArbiter::new();
        for input in &history {
            arbiter.tick(input);
        }
        let regs = *arbiter.registers();
        let a = transition(&regs, &last, CompletionSampling::Registered);
        let b = transition(&regs, &last, CompletionSampling::Registered);
        prop_assert_eq!(a, b);
        prop_assert_eq!(regs, *arbiter.registers());
    }

    #[test]
    fn prop_invalid_commands_leave_reception_idle(
        bytes in prop::collection::vec(invalid_command(), 1..32),
    ) {
        let mut arbiter = InterruptArbiter::new();
        arbiter.tick(&Inputs::idle());
        for byte in bytes {
            arbiter.tick(&Inputs::idle().with_bus(Some(byte)));
            prop_assert_eq!(arbiter.state(), ControllerState::GetCommands);
            prop_assert_eq!(arbiter.command_cycle(), 0);
            prop_assert_eq!(arbiter.mode(), Mode::Uninitialized);
        }
        prop_assert_eq!(arbiter.last_fault(), None);
    }

    #[test]
    fn prop_priority_services_in_rank_order(ranks in ranks(), mask in 1u8..=255) {
        let table = PriorityTable::from_ranks(ranks).unwrap();
        let requests = Requests::from_bits_retain(mask);
        let mut bench = Testbench::new(Setup::Priority(table)).with_requests(requests);
        bench.run_until_serviced(mask.count_ones() as usize).unwrap();

        let expected: Vec<u8> = ranks
            .iter()
            .copied()
            .filter(|&source| requests.is_pending(source))
            .collect();
        prop_assert_eq!(bench.service_order(), expected);
    }

    #[test]
    fn prop_polling_services_in_index_order(mask in 1u8..=255, latency in 0u32..4) {
        let mut bench = Testbench::new(Setup::Polling)
            .with_requests(Requests::from_bits_retain(mask))
            .with_isr_latency(latency);
        bench.run_until_serviced(mask.count_ones() as usize).unwrap();

        let expected: Vec<u8> = (0..8).filter(|i| mask & (1 << i) != 0).collect();
        prop_assert_eq!(bench.service_order(), expected);
    }

    #[test]
    fn prop_bus_has_one_driver(
        polling in any::<bool>(),
        ranks in ranks(),
        mask in 1u8..=255,
        same_cycle in any::<bool>(),
    ) {
        let setup = if polling {
            Setup::Polling
        } else {
            Setup::Priority(PriorityTable::from_ranks(ranks).unwrap())
        };
        let sampling = if same_cycle {
            CompletionSampling::SameCycle
        } else {
            CompletionSampling::Registered
        };
        let mut bench = Testbench::new(setup)
            .with_sampling(sampling)
            .with_requests(Requests::from_bits_retain(mask))
            .with_trace(true);
        bench.run_until_serviced(mask.count_ones() as usize).unwrap();

        prop_assert_eq!(bench.refused_drives(), 0);
        prop_assert!(bench.arbiter().registers().validate().is_ok());
        let trace = bench.trace().unwrap();
        for pair in trace.windows(2) {
            if let Wire::Processor(_) = pair[1].wire {
                prop_assert_eq!(pair[0].bus_out, BusState::Released);
            }
        }
    }
}
