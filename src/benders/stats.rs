//! Run statistics and the result record.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Iterations | Master integer solutions examined |
//! | Master / subproblem time | Wall clock spent in each side of the loop |
//! | Nodes | Master branch-and-bound nodes plus subproblem search nodes |
//! | Cache hits | Station task sets answered from the memo |
//! | Gap | `(UB - LB) / LB`, in percent |

use serde::{Deserialize, Serialize};

use crate::cuts::CutFamily;
use crate::models::LineSolution;

/// Number of cuts emitted per family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutCounts {
    pub nogood: usize,
    pub logic: usize,
    pub inference_simple: usize,
    pub inference_smart: usize,
    pub inference_smartest: usize,
    pub global_bounds: usize,
}

impl CutCounts {
    pub fn record(&mut self, family: CutFamily) {
        *self.slot(family) += 1;
    }

    pub fn get(&self, family: CutFamily) -> usize {
        match family {
            CutFamily::Nogood => self.nogood,
            CutFamily::Logic => self.logic,
            CutFamily::SimpleInference => self.inference_simple,
            CutFamily::SmartInference => self.inference_smart,
            CutFamily::SmartestInference => self.inference_smartest,
            CutFamily::GlobalUpperBound => self.global_bounds,
        }
    }

    pub fn total(&self) -> usize {
        self.nogood
            + self.logic
            + self.inference_simple
            + self.inference_smart
            + self.inference_smartest
            + self.global_bounds
    }

    fn slot(&mut self, family: CutFamily) -> &mut usize {
        match family {
            CutFamily::Nogood => &mut self.nogood,
            CutFamily::Logic => &mut self.logic,
            CutFamily::SimpleInference => &mut self.inference_simple,
            CutFamily::SmartInference => &mut self.inference_smart,
            CutFamily::SmartestInference => &mut self.inference_smartest,
            CutFamily::GlobalUpperBound => &mut self.global_bounds,
        }
    }
}

/// Global bounds after one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundSnapshot {
    pub iteration: usize,
    pub lower: i64,
    /// `None` until a feasible line is known.
    pub upper: Option<i64>,
}

/// Counters and timings of one run. Times are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BendersStats {
    pub total_secs: f64,
    pub master_secs: f64,
    pub subproblem_secs: f64,
    pub iterations: usize,
    pub master_solves: usize,
    pub master_nodes: u64,
    pub subproblem_nodes: u64,
    /// Sequencing solves actually run (cache misses with two or more tasks included).
    pub subproblems_solved: usize,
    pub cache_hits: usize,
    pub cuts: CutCounts,
    pub bound_history: Vec<BoundSnapshot>,
}

impl BendersStats {
    pub fn total_nodes(&self) -> u64 {
        self.master_nodes + self.subproblem_nodes
    }

    /// Whether lower bounds never fall and upper bounds never rise.
    pub fn bounds_are_monotone(&self) -> bool {
        self.bound_history.windows(2).all(|w| {
            let lower_ok = w[1].lower >= w[0].lower;
            let upper_ok = match (w[0].upper, w[1].upper) {
                (Some(a), Some(b)) => b <= a,
                (Some(_), None) => false,
                (None, _) => true,
            };
            lower_ok && upper_ok
        })
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Every station of the final master solution fits the cycle time.
    Converged,
    /// The wall-clock budget ran out in the master or a station solve.
    TimeLimitExceeded,
    /// The master became infeasible before any feasible line was found.
    Infeasible,
}

/// Outcome of a run.
///
/// Without a feasible line every numeric field is zero and `solution` is
/// `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BendersResult {
    pub termination: Termination,
    pub feasible: bool,
    pub optimal: bool,
    pub cycle_time: i64,
    pub lower_bound: i64,
    pub gap_percent: f64,
    pub solution: Option<LineSolution>,
    pub stats: BendersStats,
}

impl BendersResult {
    /// Result carrying no line.
    pub fn empty(termination: Termination, stats: BendersStats) -> Self {
        Self {
            termination,
            feasible: false,
            optimal: false,
            cycle_time: 0,
            lower_bound: 0,
            gap_percent: 0.0,
            solution: None,
            stats,
        }
    }
}

/// Relative gap in percent, rounded to four decimals; zero when `lower <= 0`.
pub fn gap_percent(lower: i64, upper: i64) -> f64 {
    if lower <= 0 {
        return 0.0;
    }
    let gap = (upper - lower) as f64 / lower as f64 * 100.0;
    (gap * 10_000.0).round() / 10_000.0
}
