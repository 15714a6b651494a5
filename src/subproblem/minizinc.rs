//! Station sequencing through the MiniZinc toolchain.
//!
//! Writes the embedded model and a generated data file to a temporary
//! directory, runs `minizinc` with the remaining time budget, and parses the
//! textual report. Task ids are renumbered `1..=n` within the station.

use std::path::PathBuf;
use std::process::Command;

use log::debug;

use super::{SequencingSolver, StationProblem, StationSolution};
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::models::{StationTour, TaskId, TaskSet};

const STATION_MODEL: &str = include_str!("station.mzn");

const OPTIMAL_MARKER: &str = "==========";
const UNSATISFIABLE_MARKER: &str = "=====UNSATISFIABLE=====";
const NODES_STAT: &str = "%%%mzn-stat: nodes=";

/// External CP sequencing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniZincSequencer {
    executable: String,
    solver: String,
}

impl MiniZincSequencer {
    pub fn new(executable: impl Into<String>, solver: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            solver: solver.into(),
        }
    }
}

/// How a MiniZinc run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    /// Search completed with a proven optimum.
    Optimal,
    /// Search proved no tour exists.
    Infeasible,
    /// Search stopped before completing (time limit or unknown).
    Incomplete,
}

/// Parsed MiniZinc output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniZincReport {
    pub status: ReportStatus,
    /// Last reported load.
    pub load: Option<i64>,
    /// Last reported successor of each task, 1-based station-local ids.
    pub next: Option<Vec<usize>>,
    /// Last reported flag per task: its successor link is the backward one.
    pub closes: Option<Vec<bool>>,
    pub nodes: u64,
}

/// Renders the `.dzn` data of a station (ids renumbered `1..=n`).
pub fn render_data(problem: &StationProblem<'_>) -> String {
    let instance = problem.instance;
    let tasks = problem.task_list();
    let local = |t: TaskId| tasks.iter().position(|&x| x == t).map(|k| k + 1);
    let set_of = |members: &TaskSet| {
        let ids: Vec<String> = members
            .iter()
            .filter_map(|&t| local(t))
            .map(|k| k.to_string())
            .collect();
        format!("{{{}}}", ids.join(", "))
    };
    let sets = |f: &dyn Fn(TaskId) -> String| {
        tasks.iter().map(|&t| f(t)).collect::<Vec<_>>().join(", ")
    };
    let matrix = |get: &dyn Fn(TaskId, TaskId) -> i64| {
        let rows: Vec<String> = tasks
            .iter()
            .map(|&i| {
                tasks
                    .iter()
                    .map(|&j| get(i, j).to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect();
        format!("[| {} |]", rows.join(" | "))
    };

    let durations: Vec<String> = tasks
        .iter()
        .map(|&t| instance.processing_time(t).to_string())
        .collect();
    let lines = [
        format!("nTasks = {};", tasks.len()),
        format!("maxLoad = {};", problem.load_cap),
        format!("dur = [{}];", durations.join(", ")),
        format!("suc = [{}];", sets(&|t| set_of(instance.graph().all_successors(t)))),
        format!("forwSU = {};", matrix(&|i, j| instance.forward_setup(i, j))),
        format!("backSU = {};", matrix(&|i, j| instance.backward_setup(i, j))),
        format!("followForw = [{}];", sets(&|t| set_of(instance.follow_forward(t)))),
        format!("followBack = [{}];", sets(&|t| set_of(instance.follow_backward(t)))),
    ];
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Parses the report printed by `minizinc --statistics`.
pub fn parse_report(output: &str) -> MiniZincReport {
    let mut load: Option<i64> = None;
    let mut next: Option<Vec<usize>> = None;
    let mut closes: Option<Vec<bool>> = None;
    let mut nodes: u64 = 0;
    let mut status = ReportStatus::Incomplete;

    for line in output.lines().map(str::trim) {
        if line == OPTIMAL_MARKER {
            status = ReportStatus::Optimal;
        } else if line == UNSATISFIABLE_MARKER {
            status = ReportStatus::Infeasible;
        } else if let Some(rest) = line.strip_prefix(NODES_STAT) {
            nodes = rest.trim().parse().unwrap_or(nodes);
        } else if let Some(value) = assignment(line, "load") {
            load = value.parse().ok();
        } else if let Some(value) = assignment(line, "next") {
            next = array_items(value).map(|v| v.parse().ok()).collect();
        } else if let Some(value) = assignment(line, "closes") {
            closes = array_items(value).map(|v| v.parse().ok()).collect();
        }
    }

    MiniZincReport {
        status,
        load,
        next,
        closes,
        nodes,
    }
}

/// Items of a printed array such as `[3, 1, 2]`.
fn array_items(value: &str) -> impl Iterator<Item = &str> {
    value
        .trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .map(str::trim)
}

/// Station-local tour (0-based) from 1-based successors: starts at the
/// successor of the closing task and follows `next` around the circuit.
/// `None` unless exactly one task closes and the successors form one cycle.
pub fn tour_order(next: &[usize], closes: &[bool]) -> Option<Vec<usize>> {
    let n = next.len();
    if closes.len() != n || closes.iter().filter(|&&c| c).count() != 1 {
        return None;
    }
    let closing = closes.iter().position(|&c| c)?;
    let mut order = Vec::with_capacity(n);
    let mut current = *next.get(closing)?;
    while order.len() < n {
        let k = current.checked_sub(1).filter(|&k| k < n)?;
        if order.contains(&k) {
            return None;
        }
        order.push(k);
        current = next[k];
    }
    (order.last() == Some(&closing)).then_some(order)
}

/// Value of `name = value;`, if `line` has that shape.
fn assignment<'l>(line: &'l str, name: &str) -> Option<&'l str> {
    let rest = line.strip_prefix(name)?.trim_start();
    let value = rest.strip_prefix('=')?;
    Some(value.trim().trim_end_matches(';').trim())
}

impl SequencingSolver for MiniZincSequencer {
    fn name(&self) -> &str {
        "minizinc"
    }

    fn sequence(
        &self,
        problem: &StationProblem<'_>,
        deadline: &Deadline,
    ) -> Result<StationSolution> {
        if deadline.is_expired() {
            return Err(problem.timeout());
        }

        let dir = tempfile::tempdir()?;
        let model_path: PathBuf = dir.path().join("station.mzn");
        let data_path: PathBuf = dir.path().join("station.dzn");
        std::fs::write(&model_path, STATION_MODEL)?;
        std::fs::write(&data_path, render_data(problem))?;

        let mut cmd = Command::new(&self.executable);
        cmd.arg("--solver").arg(&self.solver).arg("--statistics");
        if let Some(remaining) = deadline.remaining() {
            cmd.arg("--time-limit")
                .arg(remaining.as_millis().max(1).to_string());
        }
        cmd.arg(&model_path).arg(&data_path);

        debug!("running {} for station {}", self.executable, problem.station);
        let output = cmd
            .output()
            .map_err(|e| Error::Solver(format!("failed to run {}: {e}", self.executable)))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let report = parse_report(&stdout);

        match report.status {
            ReportStatus::Infeasible => return Err(problem.infeasible()),
            ReportStatus::Incomplete if !output.status.success() => {
                return Err(Error::Solver(format!(
                    "{} exited with {}: {}",
                    self.executable,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )))
            }
            ReportStatus::Incomplete => return Err(problem.timeout()),
            ReportStatus::Optimal => {}
        }

        let tasks = problem.task_list();
        let order = match (&report.next, &report.closes) {
            (Some(next), Some(closes)) if next.len() == tasks.len() => tour_order(next, closes),
            _ => None,
        }
        .ok_or_else(|| Error::Solver("minizinc report lacks a closed tour".into()))?;
        let sequence: Vec<TaskId> = order.into_iter().map(|k| tasks[k]).collect();

        Ok(StationSolution {
            tour: StationTour::evaluate(problem.instance, sequence),
            nodes: report.nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Instance, RawInstance};
    use std::time::Duration;

    fn toy() -> Instance {
        Instance::build(
            RawInstance::new(2)
                .with_tasks([2, 3, 4])
                .with_precedence(0, 1)
                .with_uniform_setups(1, 1),
        )
        .unwrap()
    }

    #[test]
    fn test_render_data() {
        let inst = toy();
        let tasks: TaskSet = [0, 1].into_iter().collect();
        let data = render_data(&StationProblem::new(&inst, 0, &tasks, 12));
        assert!(data.contains("nTasks = 2;"));
        assert!(data.contains("maxLoad = 12;"));
        assert!(data.contains("dur = [2, 3];"));
        assert!(data.contains("suc = [{2}, {}];"));
        assert!(data.contains("forwSU = [| 0, 1 | 1, 0 |];"));
        assert!(data.contains("followForw = [{2}, {}];"));
        assert!(data.contains("followBack = [{}, {1}];"));
    }

    #[test]
    fn test_render_renumbers_subset() {
        let inst = toy();
        let tasks: TaskSet = [0, 2].into_iter().collect();
        let data = render_data(&StationProblem::new(&inst, 0, &tasks, 12));
        assert!(data.contains("dur = [2, 4];"));
        // task 1 lies outside the station and is dropped
        assert!(data.contains("followForw = [{2}, {1}];"));
    }

    #[test]
    fn test_parse_optimal_report() {
        let out = [
            "load = 9;",
            "next = [2, 1];",
            "closes = [true, false];",
            "----------",
            "load = 7;",
            "next = [2, 1];",
            "closes = [false, true];",
            "----------",
            "==========",
            "%%%mzn-stat: nodes=42",
            "%%%mzn-stat-end",
        ]
        .join("\n");
        let report = parse_report(&out);
        assert_eq!(report.status, ReportStatus::Optimal);
        assert_eq!(report.load, Some(7));
        assert_eq!(report.next, Some(vec![2, 1]));
        assert_eq!(report.closes, Some(vec![false, true]));
        assert_eq!(report.nodes, 42);
    }

    #[test]
    fn test_parse_unsatisfiable_report() {
        let report = parse_report("=====UNSATISFIABLE=====\n%%%mzn-stat: nodes=5\n");
        assert_eq!(report.status, ReportStatus::Infeasible);
        assert_eq!(report.load, None);
        assert_eq!(report.nodes, 5);
    }

    #[test]
    fn test_parse_incomplete_report() {
        let report = parse_report("load = 11;\nnext = [2, 1];\n----------\n");
        assert_eq!(report.status, ReportStatus::Incomplete);
        assert_eq!(report.load, Some(11));
        assert_eq!(parse_report("=====UNKNOWN=====\n").status, ReportStatus::Incomplete);
    }

    #[test]
    fn test_tour_order_follows_successors() {
        // 1 -> 3 -> 2 -> 1, task 2 closes
        assert_eq!(tour_order(&[3, 1, 2], &[false, true, false]), Some(vec![0, 2, 1]));
        // task 1 closes: tour starts at its successor 3
        assert_eq!(tour_order(&[3, 1, 2], &[true, false, false]), Some(vec![2, 1, 0]));
        assert_eq!(tour_order(&[1], &[true]), Some(vec![0]));
    }

    #[test]
    fn test_tour_order_ignores_start_time_ties() {
        // two zero-time tasks share a start time; the order comes from `next` alone
        let inst = Instance::build(
            RawInstance::new(1)
                .with_tasks([0, 0, 3])
                .with_uniform_setups(0, 0),
        )
        .unwrap();
        let tasks: TaskSet = [0, 1, 2].into_iter().collect();
        let problem = StationProblem::new(&inst, 0, &tasks, 10);
        let report = parse_report(concat!(
            "load = 3;\n",
            "next = [3, 1, 2];\n",
            "closes = [false, true, false];\n",
            "==========\n",
        ));
        let order = tour_order(
            report.next.as_deref().unwrap(),
            report.closes.as_deref().unwrap(),
        )
        .unwrap();
        let sequence: Vec<TaskId> = order.into_iter().map(|k| problem.task_list()[k]).collect();
        assert_eq!(sequence, vec![0, 2, 1]);
        assert_eq!(StationTour::evaluate(&inst, sequence).load, 3);
    }

    #[test]
    fn test_tour_order_rejects_broken_circuits() {
        assert_eq!(tour_order(&[2, 1, 3], &[true, false, false]), None);
        assert_eq!(tour_order(&[2, 3, 1], &[true, true, false]), None);
        assert_eq!(tour_order(&[2, 3, 1], &[false, false, false]), None);
        assert_eq!(tour_order(&[2, 4, 1], &[true, false, false]), None);
    }

    #[test]
    fn test_expired_deadline_short_circuits() {
        let inst = toy();
        let tasks: TaskSet = [0, 1].into_iter().collect();
        let solver = MiniZincSequencer::new("definitely-not-installed-minizinc", "chuffed");
        let err = solver
            .sequence(
                &StationProblem::new(&inst, 1, &tasks, 12),
                &Deadline::new(Duration::ZERO),
            )
            .unwrap_err();
        assert!(matches!(err, Error::SubproblemTimeout { station: 1 }));
    }

    #[test]
    fn test_missing_executable_is_solver_error() {
        let inst = toy();
        let tasks: TaskSet = [0, 1].into_iter().collect();
        let solver = MiniZincSequencer::new("definitely-not-installed-minizinc", "chuffed");
        let err = solver
            .sequence(&StationProblem::new(&inst, 0, &tasks, 12), &Deadline::unlimited())
            .unwrap_err();
        assert!(matches!(err, Error::Solver(_)));
    }
}
