//! Station sequencing as a small MIP.
//!
//! Variables over the station's task set `S`:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `y[i][j]` | binary, `j` forward-follows `i` (`j ∈ follow_forward(i) ∩ S`) |
//! | `z[i][j]` | binary, `j` backward-follows `i` (`j ∈ follow_backward(i) ∩ S`) |
//! | `s[i]` | start time of `i` |
//! | `u[i]` | position of `i` along the forward chain, in `[0, n - 1]` for `n` tasks |
//! | `load` | station load, minimised |
//!
//! Every task has one successor and one predecessor and exactly one `z` is
//! set. Forward links push start times apart through a big-M disjunction.
//! Positions forbid closed forward cycles, which the timing rows alone miss
//! when processing and setup times are zero. Every precedence pair inside
//! `S` is ordered directly.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{SequencingSolver, StationProblem, StationSolution};
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::lp::{
    LinExpr, LinearConstraint, LinearModel, MipSolution, MipSolver, MipStatus, VarId,
};
use crate::models::{StationTour, TaskId};

/// MIP-based sequencing through a shared [`MipSolver`].
#[derive(Clone)]
pub struct MipSequencer {
    solver: Arc<dyn MipSolver>,
}

impl MipSequencer {
    pub fn new(solver: Arc<dyn MipSolver>) -> Self {
        Self { solver }
    }
}

impl std::fmt::Debug for MipSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MipSequencer")
            .field("solver", &self.solver.name())
            .finish()
    }
}

/// Variable handles of one station model.
struct SequencingVars {
    tasks: Vec<TaskId>,
    load: VarId,
    position: Vec<VarId>,
    forward: BTreeMap<(TaskId, TaskId), VarId>,
    backward: BTreeMap<(TaskId, TaskId), VarId>,
}

fn build_model(problem: &StationProblem<'_>) -> (LinearModel, SequencingVars) {
    let instance = problem.instance;
    let tasks = problem.task_list();
    let cap = problem.load_cap as f64;
    let mut model = LinearModel::new();

    let load = model.add_continuous("load", 0.0, cap);
    let start: Vec<VarId> = tasks
        .iter()
        .map(|&t| model.add_continuous(format!("s_{t}"), 0.0, cap))
        .collect();
    let last = tasks.len().saturating_sub(1) as f64;
    let position: Vec<VarId> = tasks
        .iter()
        .map(|&t| model.add_continuous(format!("u_{t}"), 0.0, last))
        .collect();

    let mut forward = BTreeMap::new();
    let mut backward = BTreeMap::new();
    for &i in &tasks {
        for &j in instance.follow_forward(i).intersection(problem.tasks) {
            forward.insert((i, j), model.add_binary(format!("y_{i}_{j}")));
        }
        for &j in instance.follow_backward(i).intersection(problem.tasks) {
            backward.insert((i, j), model.add_binary(format!("z_{i}_{j}")));
        }
    }

    // one successor and one predecessor per task
    for &t in &tasks {
        let outgoing: LinExpr = forward
            .iter()
            .chain(backward.iter())
            .filter(|((i, _), _)| *i == t)
            .map(|(_, &v)| (v, 1.0))
            .collect();
        model.add_constraint(LinearConstraint::eq(outgoing, 1.0));

        let incoming: LinExpr = forward
            .iter()
            .chain(backward.iter())
            .filter(|((_, j), _)| *j == t)
            .map(|(_, &v)| (v, 1.0))
            .collect();
        model.add_constraint(LinearConstraint::eq(incoming, 1.0));
    }

    // exactly one backward transition
    let closing: LinExpr = backward.values().map(|&v| (v, 1.0)).collect();
    model.add_constraint(LinearConstraint::eq(closing, 1.0));

    let local: HashMap<TaskId, usize> = tasks.iter().enumerate().map(|(k, &t)| (t, k)).collect();
    let graph = instance.graph();

    for (&(i, j), &y) in &forward {
        // s_i + p_i + f_ij <= s_j + M (1 - y_ij)
        let f = instance.forward_setup(i, j) as f64;
        let p = instance.processing_time(i) as f64;
        let big_m = cap + p + f;
        let expr = LinExpr::new()
            .with_term(start[local[&i]], 1.0)
            .with_term(start[local[&j]], -1.0)
            .with_term(y, big_m);
        model.add_constraint(LinearConstraint::le(expr, big_m - p - f));

        // u_i + 1 <= u_j + n (1 - y_ij)
        let n = tasks.len() as f64;
        let expr = LinExpr::new()
            .with_term(position[local[&i]], 1.0)
            .with_term(position[local[&j]], -1.0)
            .with_term(y, n);
        model.add_constraint(LinearConstraint::le(expr, n - 1.0));
    }

    for &i in &tasks {
        for &j in graph.all_successors(i).intersection(problem.tasks) {
            // s_i + p_i + f_ij y_ij <= s_j
            let mut expr = LinExpr::new()
                .with_term(start[local[&i]], 1.0)
                .with_term(start[local[&j]], -1.0);
            if let Some(&y) = forward.get(&(i, j)) {
                expr.add_term(y, instance.forward_setup(i, j) as f64);
            }
            model.add_constraint(LinearConstraint::le(
                expr,
                -(instance.processing_time(i) as f64),
            ));
        }
    }

    // s_i + p_i + Σ_j b_ij z_ij <= load
    for &i in &tasks {
        let mut expr = LinExpr::new()
            .with_term(start[local[&i]], 1.0)
            .with_term(load, -1.0);
        for (&(from, to), &z) in &backward {
            if from == i {
                expr.add_term(z, instance.backward_setup(from, to) as f64);
            }
        }
        model.add_constraint(LinearConstraint::le(
            expr,
            -(instance.processing_time(i) as f64),
        ));
    }

    model.minimise(LinExpr::from(load));

    (
        model,
        SequencingVars {
            tasks,
            load,
            position,
            forward,
            backward,
        },
    )
}

/// Reads the tour from a solution: start at the head of the backward
/// transition and follow forward links. Falls back to position order when
/// the links do not form one chain.
fn decode(vars: &SequencingVars, solution: &MipSolution) -> Vec<TaskId> {
    let n = vars.tasks.len();
    let closing = vars
        .backward
        .iter()
        .filter(|(_, z)| solution.is_set(**z))
        .map(|(pair, _)| *pair)
        .min();

    if let Some((_, first)) = closing {
        let mut order = vec![first];
        while order.len() < n {
            let Some(&current) = order.last() else { break };
            let next = vars
                .forward
                .iter()
                .filter(|(pair, y)| {
                    pair.0 == current && solution.is_set(**y) && !order.contains(&pair.1)
                })
                .map(|(pair, _)| pair.1)
                .min();
            match next {
                Some(j) => order.push(j),
                None => break,
            }
        }
        if order.len() == n {
            return order;
        }
    }

    let mut by_position: Vec<(f64, TaskId)> = vars
        .tasks
        .iter()
        .zip(&vars.position)
        .map(|(&t, &u)| (solution.value(u), t))
        .collect();
    by_position.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    by_position.into_iter().map(|(_, t)| t).collect()
}

impl SequencingSolver for MipSequencer {
    fn name(&self) -> &str {
        "mip"
    }

    fn sequence(
        &self,
        problem: &StationProblem<'_>,
        deadline: &Deadline,
    ) -> Result<StationSolution> {
        let (model, vars) = build_model(problem);
        let solution = self.solver.solve(&model, deadline)?;
        match solution.status {
            MipStatus::Optimal => {}
            MipStatus::Infeasible => return Err(problem.infeasible()),
            MipStatus::TimeLimit => return Err(problem.timeout()),
        }

        let order = decode(&vars, &solution);
        let tour = StationTour::evaluate(problem.instance, order);
        let reported = solution.rounded(vars.load);
        if tour.load > reported {
            return Err(Error::Solver(format!(
                "station {} tour load {} exceeds model load {reported}",
                problem.station, tour.load
            )));
        }
        Ok(StationSolution {
            tour,
            nodes: solution.node_count,
        })
    }
}
