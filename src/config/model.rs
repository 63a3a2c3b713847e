// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::types::{EvaluationMode, Operation, Operator};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [timing]
/// addition_ms = 1000
/// subtraction_ms = 1200
/// multiplication_ms = 2000
/// division_ms = 2500
/// whole_ms = 3000
///
/// [agent]
/// computing_power = 4
/// poll_interval_ms = 2000
///
/// [scheduler]
/// mode = "decomposed"
/// lease_ms = 30000
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub timing: TimingTable,

    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub scheduler: SchedulerSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub timing: TimingTable,
    pub agent: AgentSection,
    pub scheduler: SchedulerSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        timing: TimingTable,
        agent: AgentSection,
        scheduler: SchedulerSection,
    ) -> Self {
        Self {
            timing,
            agent,
            scheduler,
        }
    }

    /// Defaults for everything.
    pub fn defaults() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.timing, raw.agent, raw.scheduler)
    }
}

/// `[timing]` section: simulated cost per operation, in milliseconds.
///
/// This is only an annotation handed to workers; it never affects
/// scheduling order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingTable {
    #[serde(default = "default_addition_ms")]
    pub addition_ms: u64,
    #[serde(default = "default_subtraction_ms")]
    pub subtraction_ms: u64,
    #[serde(default = "default_multiplication_ms")]
    pub multiplication_ms: u64,
    #[serde(default = "default_division_ms")]
    pub division_ms: u64,
    /// Cost of evaluating a whole expression in one unit.
    #[serde(default = "default_whole_ms")]
    pub whole_ms: u64,
}

fn default_addition_ms() -> u64 {
    1000
}

fn default_subtraction_ms() -> u64 {
    1200
}

fn default_multiplication_ms() -> u64 {
    2000
}

fn default_division_ms() -> u64 {
    2500
}

fn default_whole_ms() -> u64 {
    3000
}

impl Default for TimingTable {
    fn default() -> Self {
        Self {
            addition_ms: default_addition_ms(),
            subtraction_ms: default_subtraction_ms(),
            multiplication_ms: default_multiplication_ms(),
            division_ms: default_division_ms(),
            whole_ms: default_whole_ms(),
        }
    }
}

impl TimingTable {
    /// Every operation takes no simulated time.
    pub fn instant() -> Self {
        Self {
            addition_ms: 0,
            subtraction_ms: 0,
            multiplication_ms: 0,
            division_ms: 0,
            whole_ms: 0,
        }
    }

    pub fn millis_for(&self, operation: Operation) -> u64 {
        match operation {
            Operation::Binary(Operator::Add) => self.addition_ms,
            Operation::Binary(Operator::Sub) => self.subtraction_ms,
            Operation::Binary(Operator::Mul) => self.multiplication_ms,
            Operation::Binary(Operator::Div) => self.division_ms,
            Operation::Whole => self.whole_ms,
        }
    }
}

/// `[agent]` section: the in-process worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSection {
    /// Number of concurrent workers.
    #[serde(default = "default_computing_power")]
    pub computing_power: usize,

    /// Delay before polling again when no unit is ready.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay after a failed fetch or report.
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
}

fn default_computing_power() -> usize {
    1
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_error_backoff_ms() -> u64 {
    1000
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            computing_power: default_computing_power(),
            poll_interval_ms: default_poll_interval_ms(),
            error_backoff_ms: default_error_backoff_ms(),
        }
    }
}

impl AgentSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerSection {
    /// `"decomposed"` (default) or `"whole"`.
    #[serde(default)]
    pub mode: EvaluationMode,

    /// How long a claimed unit stays reserved for its worker. Without a
    /// lease, a unit whose worker disappears stays in progress forever.
    #[serde(default)]
    pub lease_ms: Option<u64>,
}

impl SchedulerSection {
    pub fn lease(&self) -> Option<Duration> {
        self.lease_ms.map(Duration::from_millis)
    }
}
