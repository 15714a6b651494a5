//! Per-station memo of solved task sets.
//!
//! Every task set a station has been given is kept for the whole run, in
//! the order first seen. Loads are exact, and an infeasible verdict stays
//! valid because the load cap never grows during a run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{StationId, TaskSet};
use crate::subproblem::StationSolution;

/// What the sequencing subproblem found for one task set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationOutcome {
    Solved(StationSolution),
    /// No tour within the load cap in force at solve time.
    Infeasible,
}

impl StationOutcome {
    pub fn load(&self) -> Option<i64> {
        match self {
            Self::Solved(solution) => Some(solution.load()),
            Self::Infeasible => None,
        }
    }
}

/// A task set given to a station and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationRecord {
    pub tasks: TaskSet,
    pub outcome: StationOutcome,
    /// Iteration that first produced this task set.
    pub iteration: usize,
}

/// Station history plus a lookup index keyed by the exact task set.
#[derive(Debug, Clone, Default)]
pub struct StationCache {
    history: Vec<Vec<StationRecord>>,
    index: Vec<HashMap<TaskSet, usize>>,
    hits: usize,
}

impl StationCache {
    pub fn new(station_count: usize) -> Self {
        Self {
            history: vec![Vec::new(); station_count],
            index: vec![HashMap::new(); station_count],
            hits: 0,
        }
    }

    /// Stored outcome for `tasks` on `station`, counting a hit when found.
    pub fn lookup(&mut self, station: StationId, tasks: &TaskSet) -> Option<&StationOutcome> {
        let idx = *self.index.get(station)?.get(tasks)?;
        self.hits += 1;
        Some(&self.history[station][idx].outcome)
    }

    /// Whether `tasks` was already solved on `station`, without counting.
    pub fn contains(&self, station: StationId, tasks: &TaskSet) -> bool {
        self.index
            .get(station)
            .is_some_and(|index| index.contains_key(tasks))
    }

    /// Stores an outcome. A task set already present keeps its first record.
    pub fn insert(
        &mut self,
        station: StationId,
        tasks: TaskSet,
        outcome: StationOutcome,
        iteration: usize,
    ) -> &StationOutcome {
        let history = &mut self.history[station];
        let idx = *self.index[station].entry(tasks.clone()).or_insert_with(|| {
            history.push(StationRecord {
                tasks,
                outcome,
                iteration,
            });
            history.len() - 1
        });
        &history[idx].outcome
    }

    /// Every task set `station` has been given, oldest first.
    pub fn history(&self, station: StationId) -> &[StationRecord] {
        self.history.get(station).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct task sets stored over all stations.
    pub fn len(&self) -> usize {
        self.history.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}
