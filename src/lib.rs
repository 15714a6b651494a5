//! Assembly line balancing with sequence-dependent setups (SUALBSP-2).
//!
//! Assigns tasks to a fixed number of stations and sequences each station,
//! with forward setups between consecutive tasks and one backward setup
//! closing every station cycle, minimising the cycle time. Solved by
//! logic-based Benders decomposition: an assignment master bounded by cuts
//! from exact per-station sequencing subproblems.
//!
//! # Modules
//!
//! - **`models`**: `Instance`, setup matrices, precedence graph, station
//!   tours, `LineSolution`
//! - **`validation`**: raw instance checks and the solution checker
//! - **`parser`**: `.alb` instance files
//! - **`lp`**: solver-neutral MIP models, the `good_lp` backend and the
//!   lazy-constraint driver
//! - **`subproblem`**: station sequencing strategies (MIP, enumeration, MiniZinc)
//! - **`master`**: assignment and scheduling master formulations
//! - **`cuts`**: nogood, logic, inference and global-bound cuts
//! - **`benders`**: the orchestrator, its configuration and statistics
//!
//! # References
//!
//! - Scholl, Boysen & Fliedner (2013), "The assembly line balancing and
//!   scheduling problem with sequence-dependent setup times"
//! - Hooker & Ottosson (2003), "Logic-based Benders decomposition"

pub mod benders;
pub mod cuts;
pub mod deadline;
pub mod error;
pub mod lp;
pub mod master;
pub mod models;
pub mod parser;
pub mod subproblem;
pub mod validation;

pub use benders::{BendersConfig, BendersResult, BendersSolver, Termination};
pub use error::{Error, Result};
pub use models::{Instance, LineSolution, RawInstance};
