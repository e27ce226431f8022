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

//! IRQX simulation entry point
//!
//! Runs the arbiter against the processor agent and prints the order in which
//! sources were serviced.

use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use irqx::config::{SimConfig, CONFIG_ENV};
use irqx::core::arbiter::{CompletionSampling, Scheme};
use irqx::core::testbench::{ServiceRecord, TickRecord};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Polling,
    Priority,
}

impl From<ModeArg> for Scheme {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Polling => Scheme::Polling,
            ModeArg::Priority => Scheme::Priority,
        }
    }
}

/// Simulate the 8-source interrupt arbiter
#[derive(Debug, Parser)]
#[command(name = "irqx-sim", version, about)]
struct Cli {
    /// TOML configuration file (defaults to $IRQX_CONFIG when set)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Arbitration mode
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Rank-ordered source ids, e.g. 5,3,7,0,4,2,6,1
    #[arg(short, long, value_delimiter = ',')]
    priorities: Option<Vec<u8>>,

    /// Request vector (decimal, 0x.. or 0b..)
    #[arg(short, long, value_parser = parse_byte)]
    requests: Option<u8>,

    /// Number of services to wait for
    #[arg(short, long)]
    services: Option<usize>,

    /// Tick budget before the run counts as stalled
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Ticks the processor spends in each ISR
    #[arg(long)]
    isr_latency: Option<u32>,

    /// Compare the completion frame on the ack tick instead of the tick before
    #[arg(long)]
    same_cycle_completion: bool,

    /// Write a JSON tick trace to this file
    #[arg(long)]
    trace_json: Option<PathBuf>,

    /// Save the arbiter state to this file after the run
    #[arg(long)]
    save_state: Option<PathBuf>,

    /// Write the effective configuration to this file and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Parse a byte given in decimal, hex (0x) or binary (0b)
fn parse_byte(s: &str) -> Result<u8, String> {
    let s = s.trim().replace('_', "");
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        u8::from_str_radix(bin, 2)
    } else {
        s.parse::<u8>()
    };
    parsed.map_err(|e| format!("invalid request vector '{}': {}", s, e))
}

/// JSON trace file layout
#[derive(Serialize)]
struct TraceReport<'a> {
    generated_at: DateTime<Utc>,
    config: &'a SimConfig,
    services: &'a [ServiceRecord],
    faults: Vec<String>,
    ticks: &'a [TickRecord],
}

/// Write the JSON trace report
fn write_trace(path: &Path, report: &TraceReport<'_>) -> irqx::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    Ok(())
}

impl Cli {
    /// Layer command line overrides on top of the file configuration
    fn resolve_config(&self) -> irqx::Result<SimConfig> {
        let path = self
            .config
            .clone()
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => SimConfig::load(path)?,
            None => SimConfig::default(),
        };

        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(priorities) = &self.priorities {
            config.priorities = priorities.clone();
        }
        if let Some(requests) = self.requests {
            config.requests = requests;
        }
        if let Some(services) = self.services {
            config.services = services;
        }
        if let Some(max_ticks) = self.max_ticks {
            config.max_ticks = max_ticks;
        }
        if let Some(isr_latency) = self.isr_latency {
            config.isr_latency = isr_latency;
        }
        if self.same_cycle_completion {
            config.completion_sampling = CompletionSampling::SameCycle;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Pick up RUST_LOG / IRQX_CONFIG from a .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    log::info!("Starting irqx-sim...");

    let config = cli.resolve_config()?;

    if let Some(path) = &cli.write_config {
        config.save(path)?;
        log::info!("Configuration written to {}", path.display());
        return Ok(());
    }

    log::info!(
        "Mode: {:?}, requests: 0b{:08b}, sampling: {:?}",
        config.mode,
        config.requests,
        config.completion_sampling
    );

    let mut bench = config.testbench()?.with_trace(cli.trace_json.is_some());
    let outcome = bench.run_until_serviced(config.services).map(|_| ());

    let order: Vec<String> = bench
        .service_order()
        .iter()
        .map(|source| source.to_string())
        .collect();
    println!("Service order: {}", order.join(","));
    println!(
        "Ticks: {}, faults: {}, final state: {:?}",
        bench.arbiter().ticks(),
        bench.faults().len(),
        bench.arbiter().state()
    );

    if let Some(path) = &cli.trace_json {
        let report = TraceReport {
            generated_at: Utc::now(),
            config: &config,
            services: bench.services(),
            faults: bench
                .faults()
                .iter()
                .map(|(tick, fault)| format!("tick {}: {}", tick, fault))
                .collect(),
            ticks: bench.trace().unwrap_or_default(),
        };
        write_trace(path, &report)?;
        log::info!("Trace written to {}", path.display());
    }

    if let Some(path) = &cli.save_state {
        bench.arbiter().save_state().save(path)?;
    }

    outcome?;
    Ok(())
}
