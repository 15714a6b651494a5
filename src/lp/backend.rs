//! `good_lp` backend.
//!
//! By default models go to the pure-Rust `microlp` solver, which exposes
//! neither a node count nor a time limit: the deadline is checked before the
//! model is handed over and a solve that starts in time runs to completion.
//!
//! With the `highs` feature models go to HiGHS instead, which receives the
//! remaining budget as its time limit. A HiGHS solve that ends after the
//! deadline is reported as `TimeLimit`, since its answer may not be optimal.

use std::time::Instant;

use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};
use log::trace;

use super::{LinExpr, LinearModel, MipSolution, MipSolver, MipStatus, Sense, VarKind};
use crate::deadline::Deadline;
use crate::error::{Error, Result};

/// Whether the backend stops by itself at the deadline.
const ENFORCES_TIME_LIMIT: bool = cfg!(feature = "highs");

/// [`MipSolver`] backed by `good_lp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpSolver;

impl GoodLpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl MipSolver for GoodLpSolver {
    fn name(&self) -> &str {
        if ENFORCES_TIME_LIMIT {
            "good_lp/highs"
        } else {
            "good_lp/microlp"
        }
    }

    fn solve(&self, model: &LinearModel, deadline: &Deadline) -> Result<MipSolution> {
        let start = Instant::now();
        if deadline.is_expired() {
            return Ok(MipSolution::without_values(MipStatus::TimeLimit, start.elapsed()));
        }

        let mut problem_vars = ProblemVariables::new();
        let vars: Vec<Variable> = model
            .vars()
            .iter()
            .map(|def| {
                let mut v = variable().name(def.name.clone());
                v = match def.kind {
                    VarKind::Binary => v.binary(),
                    VarKind::Integer => v.integer(),
                    VarKind::Continuous => v,
                };
                if def.kind != VarKind::Binary {
                    if def.lower.is_finite() {
                        v = v.min(def.lower);
                    }
                    if def.upper.is_finite() {
                        v = v.max(def.upper);
                    }
                }
                problem_vars.add(v)
            })
            .collect();

        let objective = to_expression(model.objective(), &vars);
        #[cfg(not(feature = "highs"))]
        let mut problem = problem_vars.minimise(objective).using(good_lp::default_solver);
        #[cfg(feature = "highs")]
        let mut problem = {
            let problem = problem_vars.minimise(objective).using(good_lp::highs);
            match deadline.remaining() {
                Some(remaining) => problem.set_time_limit(remaining.as_secs_f64()),
                None => problem,
            }
        };
        for c in model.constraints() {
            let lhs = to_expression(&c.expr, &vars);
            let rhs = c.rhs;
            problem = match c.sense {
                Sense::LessEq => problem.with(constraint!(lhs <= rhs)),
                Sense::GreaterEq => problem.with(constraint!(lhs >= rhs)),
                Sense::Equal => problem.with(constraint!(lhs == rhs)),
            };
        }

        trace!(
            "solving MIP with {} variables and {} constraints",
            model.var_count(),
            model.constraint_count()
        );

        let result = problem.solve();
        if ENFORCES_TIME_LIMIT && deadline.is_expired() {
            return Ok(MipSolution::without_values(MipStatus::TimeLimit, start.elapsed()));
        }
        match result {
            Ok(solution) => {
                let values: Vec<f64> = vars.iter().map(|v| solution.value(*v)).collect();
                let objective = model.objective().evaluate(&values);
                Ok(MipSolution {
                    status: MipStatus::Optimal,
                    values,
                    objective,
                    node_count: 0,
                    solve_time: start.elapsed(),
                })
            }
            Err(ResolutionError::Infeasible) => Ok(MipSolution::without_values(
                MipStatus::Infeasible,
                start.elapsed(),
            )),
            Err(e) => Err(Error::Solver(e.to_string())),
        }
    }
}

fn to_expression(expr: &LinExpr, vars: &[Variable]) -> Expression {
    expr.terms()
        .iter()
        .fold(Expression::from(expr.constant_term()), |acc, &(var, coef)| {
            acc + coef * vars[var.index()]
        })
}
