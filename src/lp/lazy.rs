//! Lazy-constraint driver.
//!
//! Emulates a solver callback: solve, hand the integer solution to the
//! callback, add the cuts it returns, solve again. Cuts are never removed,
//! so the model only ever gets tighter.

use log::debug;

use super::{LinearConstraint, LinearModel, MipSolution, MipSolver, MipStatus};
use crate::deadline::Deadline;
use crate::error::{Error, Result};

/// Answer of a callback to an integer solution.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackVerdict {
    /// The candidate is final.
    Accept,
    /// The candidate is rejected; add these constraints and continue.
    AddCuts(Vec<LinearConstraint>),
}

/// Receives every integer solution found by the driver.
pub trait LazyConstraintCallback {
    fn on_integer_solution(&mut self, candidate: &MipSolution) -> Result<CallbackVerdict>;
}

/// How a lazy solve ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LazyOutcome {
    /// The callback accepted `solution` after `rounds` solves.
    Accepted { solution: MipSolution, rounds: usize },
    /// The model became infeasible after `rounds` solves.
    Infeasible { rounds: usize },
}

/// Solves `model` until the callback accepts a solution.
///
/// # Errors
/// - `MasterTimeout` when the solver reports a time limit
/// - any error returned by the solver or the callback
///
/// An `AddCuts` verdict with no cuts is treated as acceptance, since
/// re-solving an unchanged model cannot change the answer.
pub fn solve_with_lazy_constraints<S, C>(
    solver: &S,
    model: &mut LinearModel,
    callback: &mut C,
    deadline: &Deadline,
) -> Result<LazyOutcome>
where
    S: MipSolver + ?Sized,
    C: LazyConstraintCallback + ?Sized,
{
    let mut rounds = 0;
    loop {
        let candidate = solver.solve(model, deadline)?;
        rounds += 1;

        match candidate.status {
            MipStatus::Optimal => {}
            MipStatus::TimeLimit => return Err(Error::MasterTimeout),
            MipStatus::Infeasible => return Ok(LazyOutcome::Infeasible { rounds }),
        }

        match callback.on_integer_solution(&candidate)? {
            CallbackVerdict::AddCuts(cuts) if !cuts.is_empty() => {
                debug!("round {rounds}: adding {} lazy constraints", cuts.len());
                for cut in cuts {
                    model.add_constraint(cut);
                }
            }
            _ => {
                return Ok(LazyOutcome::Accepted {
                    solution: candidate,
                    rounds,
                })
            }
        }
    }
}
