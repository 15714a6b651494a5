//! Master problem: task-to-station assignment minimising the cycle time.
//!
//! # Formulations
//!
//! Both formulations share the integer cycle time `c ∈ [min, max]` and the
//! binaries `x[i][k]` (task `i` on station `k`):
//!
//! ```text
//! min c
//! Σ_k x[i][k] = 1                      every task placed once
//! Σ_i x[i][k] >= 1                     no empty station
//! Σ_k k·x[i][k] <= Σ_k k·x[j][k]       for every direct precedence i → j
//! ```
//!
//! - **Assignment**: `Σ_i p_i·x[i][k] <= c` per station. Setups are left to
//!   the cuts.
//! - **Scheduling**: adds per-station transition binaries `y[i][j][k]`
//!   (forward) and `z[i][j][k]` (backward, including the self-arc of a lone
//!   task) with degree constraints tied to `x`, exactly one backward arc per
//!   station, and `Σ p·x + Σ f·y + Σ b·z <= c`. Subtours are not eliminated,
//!   so the setup term is a relaxation of the true station load.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::cuts::Cut;
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::lp::{LinExpr, LinearConstraint, LinearModel, MipSolution, MipSolver, MipStatus, VarId};
use crate::models::{Instance, LineAssignment, StationId, TaskId, TaskSet};

/// Choice of master formulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterFormulation {
    #[default]
    Assignment,
    Scheduling,
}

/// Variable handles of the master model.
#[derive(Debug, Clone)]
pub struct MasterVars {
    cycle_time: VarId,
    /// `assign[task][station]`.
    assign: Vec<Vec<VarId>>,
}

impl MasterVars {
    #[inline]
    pub fn cycle_time(&self) -> VarId {
        self.cycle_time
    }

    #[inline]
    pub fn assign(&self, task: TaskId, station: StationId) -> VarId {
        self.assign[task][station]
    }

    /// Reads the assignment and cycle time out of an integer solution.
    ///
    /// Each task goes to the station with the largest `x` value, which is
    /// the one set to 1 in any integral solution.
    pub fn decode(&self, solution: &MipSolution) -> MasterSolution {
        let station_count = self.assign.first().map_or(0, Vec::len);
        let mut assignment: LineAssignment = vec![TaskSet::new(); station_count];
        for (task, row) in self.assign.iter().enumerate() {
            let station = row
                .iter()
                .enumerate()
                .max_by(|a, b| solution.value(*a.1).total_cmp(&solution.value(*b.1)))
                .map(|(k, _)| k);
            if let Some(k) = station {
                assignment[k].insert(task);
            }
        }
        MasterSolution {
            assignment,
            cycle_time: solution.rounded(self.cycle_time),
            node_count: solution.node_count,
        }
    }

    /// Translates a cut into a model constraint.
    pub fn constraint_for(&self, cut: &Cut) -> LinearConstraint {
        let mut expr = LinExpr::new();
        expr.add_term(self.cycle_time, cut.cycle_coef as f64);
        for term in &cut.terms {
            expr.add_term(self.assign(term.task, term.station), term.coef as f64);
        }
        LinearConstraint::ge(expr, cut.rhs as f64)
    }
}

/// Decoded master solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterSolution {
    pub assignment: LineAssignment,
    pub cycle_time: i64,
    pub node_count: u64,
}

/// The master model and its variable handles.
#[derive(Debug, Clone)]
pub struct MasterProblem {
    formulation: MasterFormulation,
    model: LinearModel,
    vars: MasterVars,
}

impl MasterProblem {
    /// Builds the master model for `instance`.
    pub fn build(instance: &Instance, formulation: MasterFormulation) -> Self {
        let mut model = LinearModel::new();
        let cycle_time = model.add_integer(
            "c",
            instance.min_cycle_time() as f64,
            instance.max_cycle_time() as f64,
        );
        let assign: Vec<Vec<VarId>> = instance
            .tasks()
            .map(|i| {
                instance
                    .stations()
                    .map(|k| model.add_binary(format!("x_{i}_{k}")))
                    .collect()
            })
            .collect();

        for row in &assign {
            let placed: LinExpr = row.iter().map(|&x| (x, 1.0)).collect();
            model.add_constraint(LinearConstraint::eq(placed, 1.0));
        }
        for k in instance.stations() {
            let occupied: LinExpr = assign.iter().map(|row| (row[k], 1.0)).collect();
            model.add_constraint(LinearConstraint::ge(occupied, 1.0));
        }
        for &(i, j) in instance.precedences() {
            let mut order = LinExpr::new();
            for k in instance.stations() {
                order.add_term(assign[i][k], k as f64);
                order.add_term(assign[j][k], -(k as f64));
            }
            model.add_constraint(LinearConstraint::le(order, 0.0));
        }

        for k in instance.stations() {
            let mut load: LinExpr = instance
                .tasks()
                .map(|i| (assign[i][k], instance.processing_time(i) as f64))
                .collect();
            if formulation == MasterFormulation::Scheduling {
                add_transition_relaxation(instance, &mut model, &assign, k, &mut load);
            }
            load.add_term(cycle_time, -1.0);
            model.add_constraint(LinearConstraint::le(load, 0.0));
        }

        model.minimise(cycle_time.into());

        debug!(
            "master ({formulation:?}): {} variables, {} constraints",
            model.var_count(),
            model.constraint_count()
        );

        Self {
            formulation,
            model,
            vars: MasterVars { cycle_time, assign },
        }
    }

    pub fn formulation(&self) -> MasterFormulation {
        self.formulation
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn vars(&self) -> &MasterVars {
        &self.vars
    }

    /// Splits the problem so the model can grow while the handles are read.
    pub fn parts_mut(&mut self) -> (&mut LinearModel, &MasterVars) {
        (&mut self.model, &self.vars)
    }

    pub fn add_cut(&mut self, cut: &Cut) {
        let constraint = self.vars.constraint_for(cut);
        self.model.add_constraint(constraint);
    }

    /// Solves the current model once.
    ///
    /// Returns `Ok(None)` when the model is infeasible.
    ///
    /// # Errors
    /// - `MasterTimeout` when the solver hits the deadline
    pub fn solve(
        &self,
        solver: &dyn MipSolver,
        deadline: &Deadline,
    ) -> Result<Option<MasterSolution>> {
        let solution = solver.solve(&self.model, deadline)?;
        match solution.status {
            MipStatus::Optimal => Ok(Some(self.vars.decode(&solution))),
            MipStatus::Infeasible => Ok(None),
            MipStatus::TimeLimit => Err(Error::MasterTimeout),
        }
    }
}

/// Adds the transition variables of station `k` and their setup cost to `load`.
fn add_transition_relaxation(
    instance: &Instance,
    model: &mut LinearModel,
    assign: &[Vec<VarId>],
    k: StationId,
    load: &mut LinExpr,
) {
    let mut out_arcs: BTreeMap<TaskId, LinExpr> = BTreeMap::new();
    let mut in_arcs: BTreeMap<TaskId, LinExpr> = BTreeMap::new();
    let mut closing = LinExpr::new();

    for i in instance.tasks() {
        for &j in instance.follow_forward(i) {
            let y = model.add_binary(format!("y_{i}_{j}_{k}"));
            out_arcs.entry(i).or_default().add_term(y, 1.0);
            in_arcs.entry(j).or_default().add_term(y, 1.0);
            load.add_term(y, instance.forward_setup(i, j) as f64);
        }
        let backward = instance.follow_backward(i).iter().copied().chain([i]);
        for j in backward {
            let z = model.add_binary(format!("z_{i}_{j}_{k}"));
            out_arcs.entry(i).or_default().add_term(z, 1.0);
            in_arcs.entry(j).or_default().add_term(z, 1.0);
            closing.add_term(z, 1.0);
            load.add_term(z, instance.backward_setup(i, j) as f64);
        }
    }

    for i in instance.tasks() {
        for arcs in [&mut out_arcs, &mut in_arcs] {
            let mut degree = arcs.remove(&i).unwrap_or_default();
            degree.add_term(assign[i][k], -1.0);
            model.add_constraint(LinearConstraint::eq(degree, 0.0));
        }
    }
    model.add_constraint(LinearConstraint::eq(closing, 1.0));
}
