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

use criterion::{criterion_group, criterion_main, Criterion};
use irqx::core::arbiter::{
    transition, CompletionSampling, Inputs, InterruptArbiter, PriorityTable, Registers, Requests,
};
use irqx::core::testbench::{Setup, Testbench};
use std::hint::black_box;

fn bench_transition(c: &mut Criterion) {
    let regs = Registers::reset_value();
    let inputs = Inputs::idle().with_requests(Requests::all());
    c.bench_function("transition", |b| {
        b.iter(|| {
            transition(
                black_box(&regs),
                black_box(&inputs),
                CompletionSampling::Registered,
            )
        })
    });
}

fn bench_idle_polling_scan(c: &mut Criterion) {
    let mut arbiter = InterruptArbiter::new();
    arbiter.tick(&Inputs::idle());
    arbiter.tick(&Inputs::idle().with_bus(Some(0b01)));
    arbiter.tick(&Inputs::idle());
    let idle = Inputs::idle();

    c.bench_function("polling_scan_1000_ticks", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                black_box(arbiter.tick(black_box(&idle)));
            }
        })
    });
}

fn bench_priority_round(c: &mut Criterion) {
    let table = PriorityTable::from_ranks([5, 3, 7, 0, 4, 2, 6, 1]).expect("valid ranks");

    c.bench_function("priority_eight_services", |b| {
        b.iter(|| {
            let mut bench = Testbench::new(Setup::Priority(table)).with_requests(Requests::all());
            bench.run_until_serviced(8).expect("all sources serviced");
            black_box(bench.arbiter().ticks())
        })
    });
}

criterion_group!(
    benches,
    bench_transition,
    bench_idle_polling_scan,
    bench_priority_round
);
criterion_main!(benches);
