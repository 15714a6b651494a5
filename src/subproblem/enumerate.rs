//! Exact tour search by depth-first branch-and-bound.
//!
//! Extends a partial tour one allowed forward follower at a time, only
//! placing a task once all its in-station predecessors are placed. A partial
//! tour is pruned when its elapsed time plus the remaining processing time
//! cannot beat the incumbent (initially the load cap plus one).

use super::{SequencingSolver, StationProblem, StationSolution};
use crate::deadline::Deadline;
use crate::error::Result;
use crate::models::{StationTour, TaskId};

/// Nodes between two deadline checks.
const DEFAULT_POLL_INTERVAL: u64 = 1024;

/// Branch-and-bound tour enumeration.
#[derive(Debug, Clone, Copy)]
pub struct EnumerationSequencer {
    poll_interval: u64,
}

impl EnumerationSequencer {
    pub fn new(poll_interval: u64) -> Self {
        Self {
            poll_interval: poll_interval.max(1),
        }
    }
}

impl Default for EnumerationSequencer {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl SequencingSolver for EnumerationSequencer {
    fn name(&self) -> &str {
        "enumeration"
    }

    fn sequence(
        &self,
        problem: &StationProblem<'_>,
        deadline: &Deadline,
    ) -> Result<StationSolution> {
        let mut search = TourSearch::new(problem, deadline, self.poll_interval);
        search.run()?;
        let nodes = search.nodes;
        match search.best {
            Some(order) => Ok(StationSolution {
                tour: StationTour::evaluate(problem.instance, order),
                nodes,
            }),
            None => Err(problem.infeasible()),
        }
    }
}

struct TourSearch<'p, 'a> {
    problem: &'p StationProblem<'a>,
    deadline: &'p Deadline,
    poll_interval: u64,
    tasks: Vec<TaskId>,
    /// In-station predecessors of each local index (transitive).
    preds: Vec<Vec<usize>>,
    placed: Vec<bool>,
    path: Vec<usize>,
    remaining_work: i64,
    best_load: i64,
    best: Option<Vec<TaskId>>,
    nodes: u64,
}

impl<'p, 'a> TourSearch<'p, 'a> {
    fn new(problem: &'p StationProblem<'a>, deadline: &'p Deadline, poll_interval: u64) -> Self {
        let tasks = problem.task_list();
        let graph = problem.instance.graph();
        let preds = tasks
            .iter()
            .map(|&t| {
                (0..tasks.len())
                    .filter(|&l| graph.precedes(tasks[l], t))
                    .collect()
            })
            .collect();
        let n = tasks.len();
        Self {
            problem,
            deadline,
            poll_interval,
            tasks,
            preds,
            placed: vec![false; n],
            path: Vec::with_capacity(n),
            remaining_work: 0,
            best_load: problem.load_cap.saturating_add(1),
            best: None,
            nodes: 0,
        }
    }

    fn run(&mut self) -> Result<()> {
        let instance = self.problem.instance;
        let total: i64 = self.tasks.iter().map(|&t| instance.processing_time(t)).sum();
        for first in 0..self.tasks.len() {
            if !self.preds[first].is_empty() {
                continue;
            }
            let p = instance.processing_time(self.tasks[first]);
            self.placed[first] = true;
            self.path.push(first);
            self.remaining_work = total - p;
            self.extend(p)?;
            self.path.pop();
            self.placed[first] = false;
        }
        Ok(())
    }

    /// `elapsed` is the completion time of the last task in `path`.
    fn extend(&mut self, elapsed: i64) -> Result<()> {
        self.nodes += 1;
        if self.nodes % self.poll_interval == 0 && self.deadline.is_expired() {
            return Err(self.problem.timeout());
        }

        let instance = self.problem.instance;
        let Some(&last_local) = self.path.last() else {
            return Ok(());
        };
        let last = self.tasks[last_local];

        if self.path.len() == self.tasks.len() {
            let first = self.tasks[self.path[0]];
            if instance.follow_backward(last).contains(&first) {
                let load = elapsed + instance.backward_setup(last, first);
                if load < self.best_load {
                    self.best_load = load;
                    self.best = Some(self.path.iter().map(|&l| self.tasks[l]).collect());
                }
            }
            return Ok(());
        }

        for next in 0..self.tasks.len() {
            let task = self.tasks[next];
            if self.placed[next]
                || !instance.follow_forward(last).contains(&task)
                || self.preds[next].iter().any(|&p| !self.placed[p])
            {
                continue;
            }
            let start = elapsed + instance.forward_setup(last, task);
            if start + self.remaining_work >= self.best_load {
                continue;
            }

            let p = instance.processing_time(task);
            self.placed[next] = true;
            self.path.push(next);
            self.remaining_work -= p;
            let result = self.extend(start + p);
            self.remaining_work += p;
            self.path.pop();
            self.placed[next] = false;
            result?;
        }
        Ok(())
    }
}
