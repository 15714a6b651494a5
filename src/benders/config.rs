//! Run configuration, loadable from TOML.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::master::MasterFormulation;
use crate::subproblem::SequencingStrategy;

/// Which cut families the orchestrator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutConfig {
    pub nogood: bool,
    pub logic: bool,
    pub inference_simple: bool,
    pub inference_smart: bool,
    pub inference_smartest: bool,
    /// Inject `c <= UB` whenever the incumbent improves.
    pub global_bounds: bool,
}

impl Default for CutConfig {
    fn default() -> Self {
        Self {
            nogood: false,
            logic: true,
            inference_simple: true,
            inference_smart: false,
            inference_smartest: false,
            global_bounds: true,
        }
    }
}

impl CutConfig {
    /// Whether any family can cut off an over-cycle-time station.
    pub fn has_inference(&self) -> bool {
        self.inference_simple || self.inference_smart || self.inference_smartest
    }
}

/// Configuration of one Benders run.
///
/// ```toml
/// time_limit_secs = 60
/// master = "assignment"
/// parallel_subproblems = true
///
/// [sequencing]
/// type = "enumeration"
///
/// [cuts]
/// inference_smart = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BendersConfig {
    /// Wall-clock budget for the whole run, in seconds.
    pub time_limit_secs: f64,
    /// Master solutions examined before the run is aborted.
    pub max_iterations: usize,
    pub master: MasterFormulation,
    pub sequencing: SequencingStrategy,
    pub cuts: CutConfig,
    /// Solve the stations of one iteration on the rayon pool.
    pub parallel_subproblems: bool,
}

impl Default for BendersConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 1800.0,
            max_iterations: 100_000,
            master: MasterFormulation::default(),
            sequencing: SequencingStrategy::default(),
            cuts: CutConfig::default(),
            parallel_subproblems: false,
        }
    }
}

impl BendersConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a TOML document. Missing keys take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn with_time_limit_secs(mut self, secs: f64) -> Self {
        self.time_limit_secs = secs;
        self
    }

    pub fn with_max_iterations(mut self, limit: usize) -> Self {
        self.max_iterations = limit;
        self
    }

    pub fn with_master(mut self, master: MasterFormulation) -> Self {
        self.master = master;
        self
    }

    pub fn with_sequencing(mut self, sequencing: SequencingStrategy) -> Self {
        self.sequencing = sequencing;
        self
    }

    pub fn with_cuts(mut self, cuts: CutConfig) -> Self {
        self.cuts = cuts;
        self
    }

    pub fn with_parallel_subproblems(mut self, parallel: bool) -> Self {
        self.parallel_subproblems = parallel;
        self
    }

    /// Time budget; `None` for an infinite limit.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs
            .is_finite()
            .then(|| Duration::from_secs_f64(self.time_limit_secs))
    }

    /// Rejects settings the orchestrator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.time_limit_secs.is_nan() || self.time_limit_secs < 0.0 {
            return Err(Error::Config(format!(
                "time limit must be a non-negative number of seconds, got {}",
                self.time_limit_secs
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::Config("max_iterations must be at least 1".into()));
        }
        if let SequencingStrategy::MiniZinc { executable, solver } = &self.sequencing {
            if executable.trim().is_empty() {
                return Err(Error::Config("MiniZinc executable must not be empty".into()));
            }
            if solver.trim().is_empty() {
                return Err(Error::Config("MiniZinc solver must not be empty".into()));
            }
        }
        Ok(())
    }
}
