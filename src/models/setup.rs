//! Sequence-dependent setup times between tasks.
//!
//! A station processes its tasks as a cycle: every transition but one is a
//! *forward* setup, the wrap-around transition back to the first task is a
//! *backward* setup. Both directions are stored as dense `T x T` matrices.
//!
//! # Reference
//! Scholl, Boysen & Fliedner (2013), "The assembly line balancing and
//! scheduling problem with sequence-dependent setup times"

use serde::{Deserialize, Serialize};

use super::TaskId;

/// One explicit setup relation `from -> to` taking `time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupEntry {
    pub from: TaskId,
    pub to: TaskId,
    pub time: i64,
}

impl SetupEntry {
    pub fn new(from: TaskId, to: TaskId, time: i64) -> Self {
        Self { from, to, time }
    }
}

/// Dense setup-time matrix.
///
/// Transitions absent from the input are not infinite: they cost a sentinel
/// of `floor(1.2 * max given)`, keeping every model coefficient finite.
/// The diagonal is zero unless a self entry was given explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupMatrix {
    size: usize,
    times: Vec<i64>,
    sentinel: i64,
}

impl SetupMatrix {
    /// All-zero matrix.
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            times: vec![0; size * size],
            sentinel: 0,
        }
    }

    /// Builds the matrix from explicit entries.
    ///
    /// Entry ids must be `< size`; later duplicates override earlier ones.
    pub fn from_entries(size: usize, entries: &[SetupEntry]) -> Self {
        let mut given: Vec<Option<i64>> = vec![None; size * size];
        let mut max_given: i64 = 0;
        for e in entries {
            given[e.from * size + e.to] = Some(e.time);
            max_given = max_given.max(e.time);
        }
        let sentinel = max_given * 6 / 5;

        let times = given
            .iter()
            .enumerate()
            .map(|(idx, t)| match t {
                Some(t) => *t,
                None if idx / size == idx % size => 0,
                None => sentinel,
            })
            .collect();

        Self {
            size,
            times,
            sentinel,
        }
    }

    /// Setup time of the transition `from -> to`.
    #[inline]
    pub fn get(&self, from: TaskId, to: TaskId) -> i64 {
        self.times[from * self.size + to]
    }

    /// Matrix dimension (task count).
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Cost assigned to transitions missing from the input.
    pub fn sentinel(&self) -> i64 {
        self.sentinel
    }

    /// Row `from` as a slice.
    pub fn row(&self, from: TaskId) -> &[i64] {
        &self.times[from * self.size..(from + 1) * self.size]
    }
}
