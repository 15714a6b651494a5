//! Line-balancing instance: tasks, precedences, setups, stations.
//!
//! [`RawInstance`] is the serialisable input, assembled with builder calls or
//! read by [`crate::parser`]. [`Instance::build`] validates it once and
//! derives everything the master and the station subproblems need: the
//! transitive precedence closure, allowed forward/backward followers and
//! preceders of every task, and naive cycle-time bounds.
//!
//! # Allowed transitions
//!
//! | Set | Definition |
//! |-----|-----------|
//! | `follow_forward(i)` | all \ (indirect successors of i) \ predecessors of i \ {i} |
//! | `follow_backward(i)` | all \ successors of i \ {i} |
//! | `precede_forward(j)` | { i : j ∈ follow_forward(i) } |
//! | `precede_backward(j)` | { i : j ∈ follow_backward(i) } |
//!
//! # Reference
//! Scholl, Boysen & Fliedner (2013), "The assembly line balancing and
//! scheduling problem with sequence-dependent setup times"

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::{PrecedenceGraph, SetupEntry, SetupMatrix, StationId, TaskId, TaskSet};
use crate::error::{Error, Result};
use crate::validation::{validate_raw_instance, ValidationError, ValidationErrorKind};

/// Unvalidated instance data with 0-based task ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInstance {
    /// Number of stations `K`.
    pub station_count: usize,
    /// Processing time of each task.
    pub processing_times: Vec<i64>,
    /// Precedence pairs `(before, after)`.
    pub precedences: Vec<(TaskId, TaskId)>,
    /// Explicit forward setup relations.
    pub forward_setups: Vec<SetupEntry>,
    /// Explicit backward setup relations.
    pub backward_setups: Vec<SetupEntry>,
}

impl RawInstance {
    /// Creates an empty instance for `station_count` stations.
    pub fn new(station_count: usize) -> Self {
        Self {
            station_count,
            ..Self::default()
        }
    }

    /// Appends a task with the given processing time.
    pub fn with_task(mut self, processing_time: i64) -> Self {
        self.processing_times.push(processing_time);
        self
    }

    /// Appends several tasks.
    pub fn with_tasks(mut self, processing_times: impl IntoIterator<Item = i64>) -> Self {
        self.processing_times.extend(processing_times);
        self
    }

    /// Adds precedence `before -> after`.
    pub fn with_precedence(mut self, before: TaskId, after: TaskId) -> Self {
        self.precedences.push((before, after));
        self
    }

    pub fn with_forward_setup(mut self, from: TaskId, to: TaskId, time: i64) -> Self {
        self.forward_setups.push(SetupEntry::new(from, to, time));
        self
    }

    pub fn with_backward_setup(mut self, from: TaskId, to: TaskId, time: i64) -> Self {
        self.backward_setups.push(SetupEntry::new(from, to, time));
        self
    }

    /// Sets every off-diagonal forward and backward setup of the tasks added
    /// so far to the given values.
    pub fn with_uniform_setups(mut self, forward: i64, backward: i64) -> Self {
        let n = self.task_count();
        for i in 0..n {
            for j in (0..n).filter(|&j| j != i) {
                self.forward_setups.push(SetupEntry::new(i, j, forward));
                self.backward_setups.push(SetupEntry::new(i, j, backward));
            }
        }
        self
    }

    /// Number of tasks.
    #[inline]
    pub fn task_count(&self) -> usize {
        self.processing_times.len()
    }
}

/// Validated, immutable problem data with derived sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    processing_times: Vec<i64>,
    station_count: usize,
    precedences: Vec<(TaskId, TaskId)>,
    graph: PrecedenceGraph,
    forward: SetupMatrix,
    backward: SetupMatrix,
    follow_forward: Vec<TaskSet>,
    follow_backward: Vec<TaskSet>,
    precede_forward: Vec<TaskSet>,
    precede_backward: Vec<TaskSet>,
    min_cycle_time: i64,
    max_cycle_time: i64,
}

impl Instance {
    /// Validates `raw` and derives all sets and bounds.
    ///
    /// # Errors
    /// - `CyclicPrecedence` if the precedence relation has a cycle
    /// - `MalformedInstance` for any other inconsistency
    pub fn build(raw: RawInstance) -> Result<Self> {
        validate_raw_instance(&raw).map_err(into_build_error)?;

        let n = raw.task_count();
        let graph = PrecedenceGraph::new(n, &raw.precedences);
        let forward = SetupMatrix::from_entries(n, &raw.forward_setups);
        let backward = SetupMatrix::from_entries(n, &raw.backward_setups);

        let all: TaskSet = (0..n).collect();
        let follow_forward: Vec<TaskSet> = (0..n)
            .map(|i| {
                let indirect: TaskSet = graph
                    .all_successors(i)
                    .difference(graph.successors(i))
                    .copied()
                    .collect();
                all.iter()
                    .copied()
                    .filter(|j| {
                        *j != i && !indirect.contains(j) && !graph.all_predecessors(i).contains(j)
                    })
                    .collect()
            })
            .collect();
        let follow_backward: Vec<TaskSet> = (0..n)
            .map(|i| {
                all.iter()
                    .copied()
                    .filter(|j| *j != i && !graph.all_successors(i).contains(j))
                    .collect()
            })
            .collect();
        let precede_forward = invert(&follow_forward);
        let precede_backward = invert(&follow_backward);

        let total: i64 = raw.processing_times.iter().sum();
        let k = raw.station_count as i64;
        let even_split = (total + k - 1) / k;
        let longest_single = (0..n)
            .map(|i| raw.processing_times[i] + backward.get(i, i))
            .max()
            .unwrap_or(0);
        let min_cycle_time = even_split.max(longest_single);

        let serial_setups: i64 = (0..n.saturating_sub(1))
            .map(|i| forward.get(i, i + 1))
            .sum::<i64>()
            + backward.get(n - 1, 0);
        let max_cycle_time = (total + serial_setups).max(min_cycle_time);

        Ok(Self {
            processing_times: raw.processing_times,
            station_count: raw.station_count,
            precedences: raw.precedences,
            graph,
            forward,
            backward,
            follow_forward,
            follow_backward,
            precede_forward,
            precede_backward,
            min_cycle_time,
            max_cycle_time,
        })
    }

    #[inline]
    pub fn task_count(&self) -> usize {
        self.processing_times.len()
    }

    #[inline]
    pub fn station_count(&self) -> usize {
        self.station_count
    }

    /// Task ids `0..T`.
    pub fn tasks(&self) -> Range<TaskId> {
        0..self.task_count()
    }

    /// Station ids `0..K`.
    pub fn stations(&self) -> Range<StationId> {
        0..self.station_count
    }

    #[inline]
    pub fn processing_time(&self, task: TaskId) -> i64 {
        self.processing_times[task]
    }

    pub fn processing_times(&self) -> &[i64] {
        &self.processing_times
    }

    pub fn total_processing_time(&self) -> i64 {
        self.processing_times.iter().sum()
    }

    /// Precedence pairs as given.
    pub fn precedences(&self) -> &[(TaskId, TaskId)] {
        &self.precedences
    }

    pub fn graph(&self) -> &PrecedenceGraph {
        &self.graph
    }

    #[inline]
    pub fn forward_setup(&self, from: TaskId, to: TaskId) -> i64 {
        self.forward.get(from, to)
    }

    #[inline]
    pub fn backward_setup(&self, from: TaskId, to: TaskId) -> i64 {
        self.backward.get(from, to)
    }

    pub fn forward_setups(&self) -> &SetupMatrix {
        &self.forward
    }

    pub fn backward_setups(&self) -> &SetupMatrix {
        &self.backward
    }

    /// Tasks allowed to directly follow `task` in a forward transition.
    pub fn follow_forward(&self, task: TaskId) -> &TaskSet {
        &self.follow_forward[task]
    }

    /// Tasks allowed to follow `task` in the closing backward transition.
    pub fn follow_backward(&self, task: TaskId) -> &TaskSet {
        &self.follow_backward[task]
    }

    /// Tasks allowed to directly precede `task` in a forward transition.
    pub fn precede_forward(&self, task: TaskId) -> &TaskSet {
        &self.precede_forward[task]
    }

    /// Tasks allowed to precede `task` in the closing backward transition.
    pub fn precede_backward(&self, task: TaskId) -> &TaskSet {
        &self.precede_backward[task]
    }

    /// Naive lower bound: max(ceil(total / K), max(p_i + back(i, i))).
    pub fn min_cycle_time(&self) -> i64 {
        self.min_cycle_time
    }

    /// Naive upper bound: serial cost of all tasks in input order, never
    /// below [`min_cycle_time`](Self::min_cycle_time).
    pub fn max_cycle_time(&self) -> i64 {
        self.max_cycle_time
    }
}

/// `result[j] = { i : j ∈ sets[i] }`.
fn invert(sets: &[TaskSet]) -> Vec<TaskSet> {
    let mut inverse = vec![TaskSet::new(); sets.len()];
    for (i, set) in sets.iter().enumerate() {
        for &j in set {
            inverse[j].insert(i);
        }
    }
    inverse
}

fn into_build_error(errors: Vec<ValidationError>) -> Error {
    if let Some(task) = errors.iter().find_map(|e| match e.kind {
        ValidationErrorKind::CyclicDependency { task } => Some(task),
        _ => None,
    }) {
        return Error::CyclicPrecedence { task };
    }
    let message = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    Error::MalformedInstance(message)
}
