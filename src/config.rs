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

//! Simulation configuration
//!
//! A simulation run is described by a TOML file:
//!
//! ```toml
//! mode = "priority"
//! priorities = [5, 3, 7, 0, 4, 2, 6, 1]
//! requests = 255
//! services = 8
//! max_ticks = 10000
//! isr_latency = 2
//! completion_sampling = "registered"
//! clear_on_service = true
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use crate::core::arbiter::{CompletionSampling, PriorityTable, Requests, Scheme, SOURCE_COUNT};
use crate::core::error::{Error, Result};
use crate::core::testbench::{Setup, Testbench, DEFAULT_MAX_TICKS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the default config file
pub const CONFIG_ENV: &str = "IRQX_CONFIG";

/// Simulation run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Arbitration mode the processor selects
    pub mode: Scheme,
    /// Rank-ordered source ids (priority mode)
    pub priorities: Vec<u8>,
    /// Initial request vector
    pub requests: u8,
    /// Services to wait for
    pub services: usize,
    /// Tick budget
    pub max_ticks: u64,
    /// Ticks the processor spends in each ISR
    pub isr_latency: u32,
    pub completion_sampling: CompletionSampling,
    /// Withdraw a request once its ISR finishes
    pub clear_on_service: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            mode: Scheme::Polling,
            priorities: (0..SOURCE_COUNT as u8).collect(),
            requests: 0b1010_1010,
            services: 4,
            max_ticks: DEFAULT_MAX_TICKS,
            isr_latency: 0,
            completion_sampling: CompletionSampling::Registered,
            clear_on_service: true,
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: SimConfig = toml::from_str(&contents)?;
        log::info!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), contents)?;
        Ok(())
    }

    /// Priority table built from `priorities`
    pub fn priority_table(&self) -> Result<PriorityTable> {
        let ranks: [u8; SOURCE_COUNT] = match self.priorities.as_slice().try_into() {
            Ok(ranks) => ranks,
            Err(_) => {
                return Err(Error::InvalidPriorityTable {
                    table: self.priorities.clone(),
                    reason: format!(
                        "expected {} entries, found {}",
                        SOURCE_COUNT,
                        self.priorities.len()
                    ),
                });
            }
        };
        PriorityTable::from_ranks(ranks)
    }

    /// Check the configuration is runnable
    ///
    /// In priority mode the table must name every source exactly once.
    pub fn validate(&self) -> Result<()> {
        if self.mode == Scheme::Priority {
            self.priority_table()?.validate_permutation()?;
        }
        if self.max_ticks == 0 {
            return Err(Error::InvalidConfig("max_ticks must be non-zero".to_string()));
        }
        if self.services > 0 && self.requests == 0 {
            log::warn!("No requests asserted; the run will stall");
        }
        Ok(())
    }

    /// How the processor configures the arbiter
    pub fn setup(&self) -> Result<Setup> {
        Ok(match self.mode {
            Scheme::Polling => Setup::Polling,
            Scheme::Priority => Setup::Priority(self.priority_table()?),
        })
    }

    /// Build a testbench for this configuration
    pub fn testbench(&self) -> Result<Testbench> {
        self.validate()?;
        Ok(Testbench::new(self.setup()?)
            .with_sampling(self.completion_sampling)
            .with_requests(Requests::from_bits_retain(self.requests))
            .with_isr_latency(self.isr_latency)
            .with_clear_on_service(self.clear_on_service)
            .with_max_ticks(self.max_ticks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid_polling() {
        let config = SimConfig::default();
        assert_eq!(config.mode, Scheme::Polling);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SimConfig = toml::from_str(
            r#"
            mode = "priority"
            priorities = [5, 3, 7, 0, 4, 2, 6, 1]
            requests = 255
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, Scheme::Priority);
        assert_eq!(config.requests, 0xFF);
        assert_eq!(config.services, 4);
        assert_eq!(config.completion_sampling, CompletionSampling::Registered);
    }

    #[test]
    fn test_sampling_names() {
        let config: SimConfig = toml::from_str(r#"completion_sampling = "same-cycle""#).unwrap();
        assert_eq!(config.completion_sampling, CompletionSampling::SameCycle);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<SimConfig, _> = toml::from_str("vectored = true");
        assert!(result.is_err());
    }

    #[test]
    fn test_priority_table_length_checked() {
        let config = SimConfig {
            mode: Scheme::Priority,
            priorities: vec![0, 1, 2],
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidPriorityTable { .. })
        ));
    }

    #[test]
    fn test_duplicate_priorities_rejected() {
        let config = SimConfig {
            mode: Scheme::Priority,
            priorities: vec![0, 0, 1, 2, 3, 4, 5, 6],
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidPriorityTable { .. })
        ));
    }

    #[test]
    fn test_zero_tick_budget_rejected() {
        let config = SimConfig {
            max_ticks: 0,
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.toml");

        let config = SimConfig {
            mode: Scheme::Priority,
            priorities: vec![7, 6, 5, 4, 3, 2, 1, 0],
            isr_latency: 3,
            ..SimConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(SimConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "mode = [").unwrap();
        assert!(matches!(SimConfig::load(&path), Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_testbench_from_config_runs() {
        let config = SimConfig {
            mode: Scheme::Priority,
            priorities: vec![5, 3, 7, 0, 4, 2, 6, 1],
            requests: 0xFF,
            services: 8,
            ..SimConfig::default()
        };
        let mut bench = config.testbench().unwrap();
        bench.run_until_serviced(config.services).unwrap();
        assert_eq!(bench.service_order(), vec![5, 3, 7, 0, 4, 2, 6, 1]);
    }
}
