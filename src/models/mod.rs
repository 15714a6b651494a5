//! Line-balancing domain models.
//!
//! Static problem data ([`Instance`]) and the solution types shared by the
//! master problem, the station subproblems and the orchestrator.
//!
//! # Domain Mappings
//!
//! | u-linebalance | Assembly line | Cell manufacturing |
//! |---------------|---------------|--------------------|
//! | Task | Work element | Operation |
//! | Station | Workstation | Cell |
//! | Forward setup | Changeover within a cycle | Tool change |
//! | Backward setup | Changeover to the next workpiece | Reset |
//! | Cycle time | Takt | Bottleneck time |

mod instance;
mod precedence;
mod setup;
mod solution;
mod station;

use std::collections::BTreeSet;

pub use instance::{Instance, RawInstance};
pub use precedence::PrecedenceGraph;
pub use setup::{SetupEntry, SetupMatrix};
pub use solution::{LineAssignment, LineSolution, StationPlan};
pub use station::{is_feasible_tour, naive_load_upper_bound, StationTour};

/// Task index in `0..T`.
pub type TaskId = usize;

/// Station index in `0..K`.
pub type StationId = usize;

/// Ordered task set; ordering keeps iteration and hashing deterministic.
pub type TaskSet = BTreeSet<TaskId>;
