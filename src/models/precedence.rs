//! Precedence DAG with transitive closure.
//!
//! Closures are computed with an explicit stack and visited set, so the
//! traversal depth never depends on the length of precedence chains.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{TaskId, TaskSet};

/// Direct and transitive precedence relations over tasks `0..n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecedenceGraph {
    successors: Vec<TaskSet>,
    predecessors: Vec<TaskSet>,
    all_successors: Vec<TaskSet>,
    all_predecessors: Vec<TaskSet>,
}

impl PrecedenceGraph {
    /// Builds the graph from `(before, after)` edges.
    ///
    /// Edge ids must be `< task_count`. Cycles are tolerated here and
    /// reported by [`find_cycle`](Self::find_cycle).
    pub fn new(task_count: usize, edges: &[(TaskId, TaskId)]) -> Self {
        let mut successors = vec![TaskSet::new(); task_count];
        let mut predecessors = vec![TaskSet::new(); task_count];
        for &(i, j) in edges {
            successors[i].insert(j);
            predecessors[j].insert(i);
        }

        let all_successors = (0..task_count)
            .map(|i| reachable(i, &successors))
            .collect();
        let all_predecessors = (0..task_count)
            .map(|i| reachable(i, &predecessors))
            .collect();

        Self {
            successors,
            predecessors,
            all_successors,
            all_predecessors,
        }
    }

    pub fn task_count(&self) -> usize {
        self.successors.len()
    }

    /// Immediate successors of `task`.
    pub fn successors(&self, task: TaskId) -> &TaskSet {
        &self.successors[task]
    }

    /// Immediate predecessors of `task`.
    pub fn predecessors(&self, task: TaskId) -> &TaskSet {
        &self.predecessors[task]
    }

    /// Every task reachable from `task`.
    pub fn all_successors(&self, task: TaskId) -> &TaskSet {
        &self.all_successors[task]
    }

    /// Every task that reaches `task`.
    pub fn all_predecessors(&self, task: TaskId) -> &TaskSet {
        &self.all_predecessors[task]
    }

    /// Whether `before` must be completed before `after` (directly or not).
    #[inline]
    pub fn precedes(&self, before: TaskId, after: TaskId) -> bool {
        self.all_successors[before].contains(&after)
    }

    /// Smallest task lying on a cycle, if any.
    pub fn find_cycle(&self) -> Option<TaskId> {
        (0..self.task_count()).find(|&i| self.all_successors[i].contains(&i))
    }

    /// Topological order of all tasks, smallest id first among ready tasks.
    ///
    /// Returns `None` when the graph is cyclic.
    pub fn topological_order(&self) -> Option<Vec<TaskId>> {
        let all: TaskSet = (0..self.task_count()).collect();
        self.ordered_subset(&all)
    }

    /// Topological order of `tasks` under the transitive relation.
    ///
    /// Precedence through tasks outside the subset is respected, since the
    /// order uses transitive predecessors.
    pub fn ordered_subset(&self, tasks: &TaskSet) -> Option<Vec<TaskId>> {
        let mut pending: Vec<(TaskId, usize)> = tasks
            .iter()
            .map(|&t| (t, self.all_predecessors[t].intersection(tasks).count()))
            .collect();

        let mut ready: BTreeSet<TaskId> = pending
            .iter()
            .filter(|(_, deg)| *deg == 0)
            .map(|(t, _)| *t)
            .collect();

        let mut order = Vec::with_capacity(tasks.len());
        while let Some(next) = ready.pop_first() {
            order.push(next);
            for (t, deg) in pending.iter_mut() {
                if *deg > 0 && self.all_successors[next].contains(t) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(*t);
                    }
                }
            }
        }

        (order.len() == tasks.len()).then_some(order)
    }
}

/// Tasks reachable from `start` along `adjacency` (excluding `start` unless
/// it lies on a cycle).
fn reachable(start: TaskId, adjacency: &[TaskSet]) -> TaskSet {
    let mut visited = TaskSet::new();
    let mut stack: Vec<TaskId> = adjacency[start].iter().copied().collect();

    while let Some(node) = stack.pop() {
        if visited.insert(node) {
            stack.extend(
                adjacency[node]
                    .iter()
                    .copied()
                    .filter(|n| !visited.contains(n)),
            );
        }
    }

    visited
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[TaskId]) -> TaskSet {
        items.iter().copied().collect()
    }

    #[test]
    fn test_chain_closure() {
        // 0 -> 1 -> 2 -> 3
        let g = PrecedenceGraph::new(4, &[(0, 1), (1, 2), (2, 3)]);
        assert_eq!(g.successors(0), &set(&[1]));
        assert_eq!(g.all_successors(0), &set(&[1, 2, 3]));
        assert_eq!(g.all_predecessors(3), &set(&[0, 1, 2]));
        assert!(g.precedes(0, 3));
        assert!(!g.precedes(3, 0));
        assert!(g.find_cycle().is_none());
    }

    #[test]
    fn test_diamond_closure() {
        // 0 -> {1, 2} -> 3
        let g = PrecedenceGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert_eq!(g.all_successors(0), &set(&[1, 2, 3]));
        assert_eq!(g.all_predecessors(3), &set(&[0, 1, 2]));
        assert_eq!(g.all_successors(1), &set(&[3]));
        assert_eq!(g.topological_order(), Some(vec![0, 1, 2, 3]));
    }

    #[test]
    fn test_cycle_detected() {
        let g = PrecedenceGraph::new(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
        assert_eq!(g.find_cycle(), Some(1));
        assert!(g.topological_order().is_none());
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let g = PrecedenceGraph::new(2, &[(1, 1)]);
        assert_eq!(g.find_cycle(), Some(1));
    }

    #[test]
    fn test_long_chain_no_recursion_limit() {
        let n = 2_000;
        let edges: Vec<_> = (0..n - 1).map(|i| (i, i + 1)).collect();
        let g = PrecedenceGraph::new(n, &edges);
        assert_eq!(g.all_successors(0).len(), n - 1);
        assert!(g.find_cycle().is_none());
    }

    #[test]
    fn test_ordered_subset_respects_indirect_precedence() {
        // 3 -> 1 -> 0; ordering {0, 3} must put 3 first even though 1 is absent.
        let g = PrecedenceGraph::new(4, &[(3, 1), (1, 0)]);
        assert_eq!(g.ordered_subset(&set(&[0, 3])), Some(vec![3, 0]));
        assert_eq!(g.ordered_subset(&set(&[2, 0])), Some(vec![0, 2]));
    }
}
