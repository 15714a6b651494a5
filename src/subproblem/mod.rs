//! Station sequencing subproblem.
//!
//! Given the task set the master assigned to one station, find the tour of
//! minimum load: a cycle through every task, all transitions forward except
//! one closing backward transition, respecting precedence.
//!
//! # Strategies
//!
//! | Strategy | Solver | Notes |
//! |----------|--------|-------|
//! | [`MipSequencer`] | any [`MipSolver`] | successor/backward indicators with big-M timing |
//! | [`EnumerationSequencer`] | built in | depth-first branch-and-bound, counts nodes |
//! | [`MiniZincSequencer`] | `minizinc` executable | external CP solver, `chuffed` by default |
//!
//! Each solve reads only the immutable [`Instance`], so stations may be
//! solved in any order or in parallel.

mod enumerate;
mod minizinc;
mod mip;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::lp::MipSolver;
use crate::models::{is_feasible_tour, Instance, StationId, StationTour, TaskId, TaskSet};

pub use enumerate::EnumerationSequencer;
pub use minizinc::{parse_report, render_data, MiniZincReport, MiniZincSequencer, ReportStatus};
pub use mip::MipSequencer;

/// One station's sequencing task.
#[derive(Debug, Clone, Copy)]
pub struct StationProblem<'a> {
    pub instance: &'a Instance,
    pub station: StationId,
    pub tasks: &'a TaskSet,
    /// Loads above this value count as infeasible.
    pub load_cap: i64,
}

impl<'a> StationProblem<'a> {
    pub fn new(
        instance: &'a Instance,
        station: StationId,
        tasks: &'a TaskSet,
        load_cap: i64,
    ) -> Self {
        Self {
            instance,
            station,
            tasks,
            load_cap,
        }
    }

    /// Tasks in ascending id order.
    pub fn task_list(&self) -> Vec<TaskId> {
        self.tasks.iter().copied().collect()
    }

    pub fn infeasible(&self) -> Error {
        Error::InfeasibleStationAssignment {
            station: self.station,
            tasks: self.task_list(),
        }
    }

    pub fn timeout(&self) -> Error {
        Error::SubproblemTimeout {
            station: self.station,
        }
    }
}

/// An optimal station tour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationSolution {
    pub tour: StationTour,
    /// Search nodes spent, when the strategy reports them.
    pub nodes: u64,
}

impl StationSolution {
    #[inline]
    pub fn load(&self) -> i64 {
        self.tour.load
    }
}

/// A station sequencing strategy.
///
/// Only called for stations with two or more tasks; see [`solve_station`].
///
/// # Errors
/// - `InfeasibleStationAssignment` when no tour within the load cap exists
/// - `SubproblemTimeout` when the deadline passes first
pub trait SequencingSolver: Send + Sync {
    fn name(&self) -> &str;

    fn sequence(
        &self,
        problem: &StationProblem<'_>,
        deadline: &Deadline,
    ) -> Result<StationSolution>;
}

/// Solves one station, short-cutting one-task stations.
///
/// A lone task is closed by its backward self-setup and needs no solver.
/// Tours returned by a strategy are checked against the instance.
pub fn solve_station(
    solver: &dyn SequencingSolver,
    problem: &StationProblem<'_>,
    deadline: &Deadline,
) -> Result<StationSolution> {
    match problem.tasks.len() {
        0 => Err(problem.infeasible()),
        1 => {
            let task = problem.task_list()[0];
            Ok(StationSolution {
                tour: StationTour::single(problem.instance, task),
                nodes: 0,
            })
        }
        _ => {
            let solution = solver.sequence(problem, deadline)?;
            if solution.tour.tasks() != *problem.tasks
                || !is_feasible_tour(problem.instance, &solution.tour.sequence)
            {
                return Err(Error::Solver(format!(
                    "{} returned an invalid tour {:?} for station {}",
                    solver.name(),
                    solution.tour.sequence,
                    problem.station
                )));
            }
            Ok(solution)
        }
    }
}

fn default_executable() -> String {
    "minizinc".to_string()
}

fn default_cp_solver() -> String {
    "chuffed".to_string()
}

/// Configured sequencing strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SequencingStrategy {
    /// Small MIP per station through the shared MIP solver.
    #[default]
    Mip,
    /// Exact enumeration of precedence-feasible tours.
    Enumeration,
    /// External MiniZinc run.
    #[serde(rename = "minizinc")]
    MiniZinc {
        #[serde(default = "default_executable")]
        executable: String,
        #[serde(default = "default_cp_solver")]
        solver: String,
    },
}

impl SequencingStrategy {
    /// MiniZinc with `chuffed`, found on `PATH`.
    pub fn minizinc() -> Self {
        Self::MiniZinc {
            executable: default_executable(),
            solver: default_cp_solver(),
        }
    }

    /// Instantiates the strategy; MIP strategies share `mip`.
    pub fn build(&self, mip: Arc<dyn MipSolver>) -> Arc<dyn SequencingSolver> {
        match self {
            Self::Mip => Arc::new(MipSequencer::new(mip)),
            Self::Enumeration => Arc::new(EnumerationSequencer::default()),
            Self::MiniZinc { executable, solver } => {
                Arc::new(MiniZincSequencer::new(executable.clone(), solver.clone()))
            }
        }
    }
}
