//! Solver-neutral mixed-integer linear models.
//!
//! The decomposition only declares variables and constraints and reads
//! solution values back; the branch-and-bound itself lives behind
//! [`MipSolver`]. [`GoodLpSolver`] is the bundled backend.
//!
//! Lazy constraints are modelled as explicit message passing: the driver in
//! [`lazy`] re-solves the model and hands every integer solution to a
//! [`LazyConstraintCallback`], which answers with cuts to add or acceptance.

mod backend;
pub mod lazy;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::deadline::Deadline;
use crate::error::Result;

pub use backend::GoodLpSolver;
pub use lazy::{solve_with_lazy_constraints, CallbackVerdict, LazyConstraintCallback, LazyOutcome};

/// Feasibility tolerance for evaluating constraints on solver values.
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Handle of a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(usize);

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Domain of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    Continuous,
    Integer,
    Binary,
}

/// Declared variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDef {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
}

/// Affine expression `constant + Σ coef · var`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constant expression.
    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Builder: adds `coef · var`.
    pub fn with_term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    /// Value of the expression under `values` (indexed by [`VarId::index`]).
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .fold(self.constant, |acc, &(var, coef)| acc + coef * values[var.index()])
    }
}

impl From<VarId> for LinExpr {
    fn from(var: VarId) -> Self {
        Self::new().with_term(var, 1.0)
    }
}

impl FromIterator<(VarId, f64)> for LinExpr {
    fn from_iter<I: IntoIterator<Item = (VarId, f64)>>(iter: I) -> Self {
        let mut expr = Self::new();
        for (var, coef) in iter {
            expr.add_term(var, coef);
        }
        expr
    }
}

/// Relation between an expression and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    LessEq,
    GreaterEq,
    Equal,
}

/// `expr (<=|>=|==) rhs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConstraint {
    pub expr: LinExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn le(expr: LinExpr, rhs: f64) -> Self {
        Self {
            expr,
            sense: Sense::LessEq,
            rhs,
        }
    }

    pub fn ge(expr: LinExpr, rhs: f64) -> Self {
        Self {
            expr,
            sense: Sense::GreaterEq,
            rhs,
        }
    }

    pub fn eq(expr: LinExpr, rhs: f64) -> Self {
        Self {
            expr,
            sense: Sense::Equal,
            rhs,
        }
    }

    /// Whether `values` satisfy the constraint within `tolerance`.
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.sense {
            Sense::LessEq => lhs <= self.rhs + tolerance,
            Sense::GreaterEq => lhs >= self.rhs - tolerance,
            Sense::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// A minimisation model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    vars: Vec<VarDef>,
    constraints: Vec<LinearConstraint>,
    objective: LinExpr,
}

impl LinearModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a variable with bounds `[lower, upper]`.
    pub fn add_var(
        &mut self,
        name: impl Into<String>,
        kind: VarKind,
        lower: f64,
        upper: f64,
    ) -> VarId {
        let (lower, upper) = match kind {
            VarKind::Binary => (0.0, 1.0),
            _ => (lower, upper),
        };
        self.vars.push(VarDef {
            name: name.into(),
            kind,
            lower,
            upper,
        });
        VarId(self.vars.len() - 1)
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.add_var(name, VarKind::Binary, 0.0, 1.0)
    }

    pub fn add_integer(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.add_var(name, VarKind::Integer, lower, upper)
    }

    pub fn add_continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.add_var(name, VarKind::Continuous, lower, upper)
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    /// Sets the expression to minimise.
    pub fn minimise(&mut self, objective: LinExpr) {
        self.objective = objective;
    }

    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinExpr {
        &self.objective
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Whether `values` respect every bound, integrality and constraint.
    pub fn is_feasible(&self, values: &[f64]) -> bool {
        let tol = FEASIBILITY_TOLERANCE;
        values.len() == self.vars.len()
            && self.vars.iter().zip(values).all(|(def, &v)| {
                let integral = def.kind == VarKind::Continuous || (v - v.round()).abs() <= tol;
                integral && v >= def.lower - tol && v <= def.upper + tol
            })
            && self.constraints.iter().all(|c| c.is_satisfied(values, tol))
    }
}

/// Termination status of a MIP solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MipStatus {
    Optimal,
    TimeLimit,
    Infeasible,
}

/// Result of a MIP solve.
#[derive(Debug, Clone, PartialEq)]
pub struct MipSolution {
    pub status: MipStatus,
    /// Variable values; empty unless `status` is `Optimal`.
    pub values: Vec<f64>,
    pub objective: f64,
    /// Branch-and-bound nodes, when the backend reports them.
    pub node_count: u64,
    pub solve_time: Duration,
}

impl MipSolution {
    /// Solve without a solution.
    pub fn without_values(status: MipStatus, solve_time: Duration) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: f64::NAN,
            node_count: 0,
            solve_time,
        }
    }

    #[inline]
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.index()]
    }

    /// Value rounded to the nearest integer.
    #[inline]
    pub fn rounded(&self, var: VarId) -> i64 {
        self.value(var).round() as i64
    }

    /// Binary variable read as a flag.
    #[inline]
    pub fn is_set(&self, var: VarId) -> bool {
        self.value(var) > 0.5
    }
}

/// A mixed-integer solver collaborator.
///
/// Implementations must return `TimeLimit` rather than block past an
/// already-expired deadline.
pub trait MipSolver: Send + Sync {
    fn name(&self) -> &str;

    fn solve(&self, model: &LinearModel, deadline: &Deadline) -> Result<MipSolution>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_evaluation() {
        let mut m = LinearModel::new();
        let x = m.add_integer("x", 0.0, 10.0);
        let y = m.add_binary("y");
        let e = LinExpr::constant(1.5).with_term(x, 2.0).with_term(y, -3.0);
        assert!((e.evaluate(&[4.0, 1.0]) - 6.5).abs() < 1e-9);
        assert_eq!(e.terms().len(), 2);
    }

    #[test]
    fn test_zero_coefficients_dropped() {
        let e: LinExpr = [(VarId(0), 0.0), (VarId(1), 2.0)].into_iter().collect();
        assert_eq!(e.terms(), &[(VarId(1), 2.0)]);
    }

    #[test]
    fn test_constraint_senses() {
        let x = VarId(0);
        let le = LinearConstraint::le(x.into(), 3.0);
        let ge = LinearConstraint::ge(x.into(), 3.0);
        let eq = LinearConstraint::eq(x.into(), 3.0);
        assert!(le.is_satisfied(&[3.0], 1e-9));
        assert!(!le.is_satisfied(&[3.5], 1e-9));
        assert!(ge.is_satisfied(&[4.0], 1e-9));
        assert!(!ge.is_satisfied(&[2.0], 1e-9));
        assert!(eq.is_satisfied(&[3.0], 1e-9));
        assert!(!eq.is_satisfied(&[3.1], 1e-9));
    }

    #[test]
    fn test_model_feasibility() {
        let mut m = LinearModel::new();
        let x = m.add_integer("x", 0.0, 5.0);
        let y = m.add_binary("y");
        m.add_constraint(LinearConstraint::le(
            LinExpr::new().with_term(x, 1.0).with_term(y, 1.0),
            4.0,
        ));
        assert!(m.is_feasible(&[3.0, 1.0]));
        assert!(!m.is_feasible(&[4.0, 1.0]));
        assert!(!m.is_feasible(&[2.5, 0.0]));
        assert!(!m.is_feasible(&[6.0, 0.0]));
        assert!(!m.is_feasible(&[1.0]));
        assert_eq!(m.vars()[1].upper, 1.0);
    }
}
