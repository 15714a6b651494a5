//! Station tours: evaluation and feasibility of a cyclic task sequence.
//!
//! A tour `t0 -> t1 -> ... -> tm` is processed with forward setups between
//! consecutive tasks and closed by one backward setup `tm -> t0`. Its load
//! is the time at which the station is ready to start `t0` again.

use serde::{Deserialize, Serialize};

use super::{Instance, TaskId, TaskSet};

/// A sequence with its start times and load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationTour {
    /// Processing order; the backward transition closes last -> first.
    pub sequence: Vec<TaskId>,
    /// Start time of `sequence[k]`.
    pub start_times: Vec<i64>,
    /// Cycle length of the station.
    pub load: i64,
}

impl StationTour {
    /// Evaluates `sequence` without checking transition feasibility.
    ///
    /// An empty sequence has zero load.
    pub fn evaluate(instance: &Instance, sequence: Vec<TaskId>) -> Self {
        let mut start_times = Vec::with_capacity(sequence.len());
        let mut clock = 0;
        for (k, &task) in sequence.iter().enumerate() {
            if k > 0 {
                clock += instance.forward_setup(sequence[k - 1], task);
            }
            start_times.push(clock);
            clock += instance.processing_time(task);
        }
        let load = match (sequence.first(), sequence.last()) {
            (Some(&first), Some(&last)) => clock + instance.backward_setup(last, first),
            _ => 0,
        };

        Self {
            sequence,
            start_times,
            load,
        }
    }

    /// One-task station: processing time plus backward self-setup.
    pub fn single(instance: &Instance, task: TaskId) -> Self {
        Self::evaluate(instance, vec![task])
    }

    /// Task set covered by this tour.
    pub fn tasks(&self) -> TaskSet {
        self.sequence.iter().copied().collect()
    }

    /// Completion time of the last task, before the closing setup.
    pub fn makespan(&self, instance: &Instance) -> i64 {
        match (self.sequence.last(), self.start_times.last()) {
            (Some(&task), Some(&start)) => start + instance.processing_time(task),
            _ => 0,
        }
    }
}

/// Whether `sequence` uses only allowed transitions and respects precedence.
///
/// Consecutive pairs must be allowed forward followers, the closing pair an
/// allowed backward follower (a one-task tour closes on itself), and no task
/// may appear before one of its predecessors.
pub fn is_feasible_tour(instance: &Instance, sequence: &[TaskId]) -> bool {
    let Some((&first, rest)) = sequence.split_first() else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }

    let forward_ok = sequence
        .windows(2)
        .all(|w| instance.follow_forward(w[0]).contains(&w[1]));
    let last = sequence[sequence.len() - 1];
    let backward_ok = instance.follow_backward(last).contains(&first);

    let graph = instance.graph();
    let order_ok = sequence.iter().enumerate().all(|(pos, &task)| {
        sequence[..pos]
            .iter()
            .all(|&earlier| !graph.precedes(task, earlier))
    });

    forward_ok && backward_ok && order_ok
}

/// Load of the precedence-ordered tour of `tasks`.
///
/// Ready tasks are taken smallest id first. The result caps the optimal
/// station load whenever that tour is feasible.
pub fn naive_load_upper_bound(instance: &Instance, tasks: &TaskSet) -> i64 {
    let order = instance
        .graph()
        .ordered_subset(tasks)
        .unwrap_or_else(|| tasks.iter().copied().collect());
    StationTour::evaluate(instance, order).load
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawInstance;

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
    fn test_evaluate_two_task_tour() {
        let inst = toy();
        let tour = StationTour::evaluate(&inst, vec![0, 1]);
        assert_eq!(tour.start_times, vec![0, 3]);
        assert_eq!(tour.load, 7);
        assert_eq!(tour.makespan(&inst), 6);
    }

    #[test]
    fn test_single_task_load() {
        let inst = toy();
        let tour = StationTour::single(&inst, 2);
        assert_eq!(tour.load, 4);
        assert_eq!(tour.start_times, vec![0]);

        let inst = Instance::build(
            RawInstance::new(1)
                .with_tasks([5, 1])
                .with_backward_setup(0, 0, 3),
        )
        .unwrap();
        assert_eq!(StationTour::single(&inst, 0).load, 8);
    }

    #[test]
    fn test_feasibility_checks() {
        let inst = toy();
        assert!(is_feasible_tour(&inst, &[0, 1]));
        // 1 before its predecessor 0
        assert!(!is_feasible_tour(&inst, &[1, 0]));
        assert!(is_feasible_tour(&inst, &[2, 0, 1]));
        assert!(is_feasible_tour(&inst, &[2]));
        assert!(!is_feasible_tour(&inst, &[]));
    }

    #[test]
    fn test_chain_gap_is_infeasible() {
        // 0 -> 1 -> 2: {0, 2} has no valid tour without 1.
        let inst = Instance::build(
            RawInstance::new(1)
                .with_tasks([1, 1, 1])
                .with_precedence(0, 1)
                .with_precedence(1, 2),
        )
        .unwrap();
        assert!(!is_feasible_tour(&inst, &[0, 2]));
        assert!(!is_feasible_tour(&inst, &[2, 0]));
        assert!(is_feasible_tour(&inst, &[0, 1, 2]));
    }

    #[test]
    fn test_naive_upper_bound_uses_topological_order() {
        let inst = toy();
        let tasks: TaskSet = [0, 1, 2].into_iter().collect();
        // order 0, 1, 2: 2 + 1 + 3 + 1 + 4 + back(2, 0)
        assert_eq!(naive_load_upper_bound(&inst, &tasks), 12);
    }
}
