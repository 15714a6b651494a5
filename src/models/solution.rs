//! Line solution: one sequenced station plan per station.
//!
//! # Reference
//! Boysen, Fliedner & Scholl (2007), "A classification of assembly line
//! balancing problems"

use serde::{Deserialize, Serialize};

use super::{StationId, StationTour, TaskId, TaskSet};

/// Tasks assigned to each station, indexed by station id.
pub type LineAssignment = Vec<TaskSet>;

/// A complete balanced line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSolution {
    /// Bottleneck station load.
    pub cycle_time: i64,
    /// Station plans in station order.
    pub stations: Vec<StationPlan>,
}

/// Sequenced tasks of one station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationPlan {
    pub station: StationId,
    /// Processing order; closed by a backward setup last -> first.
    pub sequence: Vec<TaskId>,
    /// Start time of `sequence[k]` within the station cycle.
    pub start_times: Vec<i64>,
    /// Station load including all setups.
    pub load: i64,
}

impl StationPlan {
    /// Creates a plan from an evaluated tour.
    pub fn from_tour(station: StationId, tour: StationTour) -> Self {
        Self {
            station,
            sequence: tour.sequence,
            start_times: tour.start_times,
            load: tour.load,
        }
    }

    /// Assigned task set.
    pub fn tasks(&self) -> TaskSet {
        self.sequence.iter().copied().collect()
    }

    /// Start time of `task`, if it is on this station.
    pub fn start_time_of(&self, task: TaskId) -> Option<i64> {
        self.sequence
            .iter()
            .position(|&t| t == task)
            .map(|pos| self.start_times[pos])
    }
}

impl LineSolution {
    /// Builds a solution; the cycle time is the largest station load.
    pub fn new(stations: Vec<StationPlan>) -> Self {
        let cycle_time = stations.iter().map(|s| s.load).max().unwrap_or(0);
        Self {
            cycle_time,
            stations,
        }
    }

    /// Station hosting `task`.
    pub fn station_of(&self, task: TaskId) -> Option<StationId> {
        self.stations
            .iter()
            .find(|s| s.sequence.contains(&task))
            .map(|s| s.station)
    }

    /// Task sets per station.
    pub fn assignment(&self) -> LineAssignment {
        self.stations.iter().map(StationPlan::tasks).collect()
    }

    /// Number of tasks over all stations.
    pub fn task_count(&self) -> usize {
        self.stations.iter().map(|s| s.sequence.len()).sum()
    }

    /// Station with the largest load.
    pub fn bottleneck(&self) -> Option<&StationPlan> {
        self.stations.iter().max_by_key(|s| s.load)
    }

    /// Mean idle share of the stations relative to the cycle time.
    pub fn idle_ratio(&self) -> f64 {
        if self.cycle_time <= 0 || self.stations.is_empty() {
            return 0.0;
        }
        let idle: i64 = self.stations.iter().map(|s| self.cycle_time - s.load).sum();
        idle as f64 / (self.cycle_time as f64 * self.stations.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(station: StationId, sequence: Vec<TaskId>, starts: Vec<i64>, load: i64) -> StationPlan {
        StationPlan {
            station,
            sequence,
            start_times: starts,
            load,
        }
    }

    #[test]
    fn test_cycle_time_is_max_load() {
        let sol = LineSolution::new(vec![
            plan(0, vec![2], vec![0], 4),
            plan(1, vec![0, 1], vec![0, 3], 7),
        ]);
        assert_eq!(sol.cycle_time, 7);
        assert_eq!(sol.task_count(), 3);
        assert_eq!(sol.bottleneck().map(|s| s.station), Some(1));
    }

    #[test]
    fn test_lookup() {
        let sol = LineSolution::new(vec![
            plan(0, vec![2], vec![0], 4),
            plan(1, vec![0, 1], vec![0, 3], 7),
        ]);
        assert_eq!(sol.station_of(1), Some(1));
        assert_eq!(sol.station_of(2), Some(0));
        assert_eq!(sol.station_of(9), None);
        assert_eq!(sol.stations[1].start_time_of(1), Some(3));
        assert_eq!(sol.assignment()[1], [0, 1].into_iter().collect());
    }

    #[test]
    fn test_idle_ratio() {
        let sol = LineSolution::new(vec![
            plan(0, vec![0], vec![0], 5),
            plan(1, vec![1], vec![0], 10),
        ]);
        assert!((sol.idle_ratio() - 0.25).abs() < 1e-9);
        assert_eq!(LineSolution::default().idle_ratio(), 0.0);
    }

    #[test]
    fn test_serialization() {
        let sol = LineSolution::new(vec![plan(0, vec![1, 0], vec![0, 4], 9)]);
        let json = serde_json::to_string(&sol).unwrap();
        let back: LineSolution = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sol);
    }
}
