//! Solver backend interface and solve reports.

use super::model::{LinearConstraint, LinearExpr, ObjectiveSense, Relation};
use super::variables::{Literal, Var};
use std::time::Duration;

/// Status of the solver after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Proven optimal solution found.
    Optimal,
    /// Feasible (but not necessarily optimal) solution found.
    Feasible,
    /// No feasible solution exists.
    Infeasible,
    /// No solution known: time limit reached or the engine gave up.
    Unknown,
    /// Model is invalid or malformed.
    ModelInvalid,
}

impl SolveStatus {
    /// Whether an assignment is available.
    pub fn is_solution_found(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// Outcome of a [`SolverBackend::solve`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    /// Solver status.
    pub status: SolveStatus,
    /// Wall-clock time spent solving.
    pub wall_time: Duration,
    /// Objective value of the returned assignment, if any.
    pub objective_value: Option<f64>,
}

impl SolveReport {
    /// Creates a report with no assignment.
    pub fn empty(status: SolveStatus) -> Self {
        Self {
            status,
            wall_time: Duration::ZERO,
            objective_value: None,
        }
    }

    pub fn is_solution_found(&self) -> bool {
        self.status.is_solution_found()
    }
}

/// Capability interface a constraint engine exposes to model construction.
///
/// Model construction never asks whether the engine supports reification
/// natively: every conditional constraint goes through
/// [`add_implication`](SolverBackend::add_implication), and an engine without
/// indicator constraints synthesizes them from linear rows.
pub trait SolverBackend {
    /// Creates a variable with domain {0, 1}.
    fn new_bool_var(&mut self, name: &str) -> Var;

    /// Creates an integer variable with domain [lo, hi].
    fn new_int_var(&mut self, lo: i64, hi: i64, name: &str) -> Var;

    /// Adds `expr (relation) value` unconditionally.
    fn add_linear(&mut self, expr: LinearExpr, relation: Relation, value: i64);

    /// Adds `constraint`, enforced only when every literal in `indicators`
    /// is true. An empty slice enforces it unconditionally.
    fn add_implication(&mut self, constraint: LinearConstraint, indicators: &[Literal]);

    /// Replaces the objective.
    fn set_objective(&mut self, sense: ObjectiveSense, expr: LinearExpr);

    /// Solves the model, giving up after `time_limit` if one is set.
    fn solve(&mut self, time_limit: Option<Duration>) -> SolveReport;

    /// Value of `var` in the last successful solve.
    fn value_of(&self, var: Var) -> Option<i64>;

    /// Number of variables created so far.
    fn var_count(&self) -> usize;

    /// Number of constraints recorded so far.
    fn constraint_count(&self) -> usize;

    /// Adds a prebuilt constraint unconditionally.
    fn add_constraint(&mut self, constraint: LinearConstraint) {
        let LinearConstraint {
            expr,
            relation,
            rhs,
        } = constraint;
        self.add_linear(expr, relation, rhs);
    }
}
