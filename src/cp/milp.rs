//! MILP backend on `good_lp` with the pure-Rust `microlp` engine.
//!
//! The backend records the model as plain data ([`LinearModel`]) and only
//! translates it into a `good_lp` problem when solving. `microlp` has no
//! indicator constraints, so implications are synthesized as big-M rows
//! whose constants are derived from the variable domains.

use super::model::{LinearConstraint, LinearExpr, LinearModel, Objective, ObjectiveSense, Relation};
use super::solver::{SolveReport, SolveStatus, SolverBackend};
use super::variables::{Literal, Var, VarInfo};
use good_lp::solvers::microlp::microlp;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolutionStatus,
    SolverModel, Variable, WithTimeLimit,
};
use std::time::{Duration, Instant};

/// Result of one engine run.
enum Outcome {
    /// An assignment; `proven` is false when the time limit cut the search short.
    Solved { values: Vec<i64>, proven: bool },
    Infeasible,
    /// The time limit expired before any feasible assignment was found.
    TimedOut,
    Failed(String),
}

/// Mixed-integer linear backend.
///
/// # Examples
///
/// ```
/// use u_stowage::cp::{LinearExpr, MilpBackend, ObjectiveSense, Relation, SolverBackend};
///
/// let mut backend = MilpBackend::new("pick-one");
/// let x = backend.new_bool_var("x");
/// let y = backend.new_bool_var("y");
/// backend.add_linear(LinearExpr::sum([x, y]), Relation::Le, 1);
/// backend.set_objective(ObjectiveSense::Maximize, LinearExpr::term(x, 2).with_term(y, 1));
///
/// let report = backend.solve(None);
/// assert!(report.is_solution_found());
/// assert_eq!(backend.value_of(x), Some(1));
/// assert_eq!(backend.value_of(y), Some(0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MilpBackend {
    model: LinearModel,
    values: Option<Vec<i64>>,
}

impl MilpBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            model: LinearModel::new(name),
            values: None,
        }
    }

    /// The recorded model, with implications already expanded.
    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn into_model(self) -> LinearModel {
        self.model
    }

    /// `sum(1 - lit)`: zero exactly when every literal is true.
    fn relaxation(indicators: &[Literal]) -> LinearExpr {
        let mut slack = LinearExpr::new();
        for &lit in indicators {
            if lit.is_negated() {
                slack.add_term(lit.var(), 1);
            } else {
                slack.add_term(lit.var(), -1);
                slack = slack.with_constant(1);
            }
        }
        slack
    }

    fn push_relaxed(&mut self, expr: &LinearExpr, relation: Relation, rhs: i64, slack: &LinearExpr) {
        let (lo, hi) = expr.bounds(|v| self.model.bounds(v));
        let big_m = match relation {
            Relation::Le => hi - rhs,
            Relation::Ge => rhs - lo,
            Relation::Eq => {
                self.push_relaxed(expr, Relation::Le, rhs, slack);
                self.push_relaxed(expr, Relation::Ge, rhs, slack);
                return;
            }
        };
        // The row already holds for every assignment in the domains.
        if big_m <= 0 {
            return;
        }
        let mut row = expr.clone();
        match relation {
            Relation::Le => row.add_scaled(slack, -big_m),
            _ => row.add_scaled(slack, big_m),
        }
        self.model
            .add_constraint(LinearConstraint::new(row, relation, rhs));
    }
}

impl SolverBackend for MilpBackend {
    fn new_bool_var(&mut self, name: &str) -> Var {
        self.model.add_var(VarInfo::boolean(name))
    }

    fn new_int_var(&mut self, lo: i64, hi: i64, name: &str) -> Var {
        self.model.add_var(VarInfo::integer(name, lo, hi))
    }

    fn add_linear(&mut self, expr: LinearExpr, relation: Relation, value: i64) {
        self.model
            .add_constraint(LinearConstraint::new(expr, relation, value));
    }

    fn add_implication(&mut self, constraint: LinearConstraint, indicators: &[Literal]) {
        if indicators.is_empty() {
            self.add_constraint(constraint);
            return;
        }
        let slack = Self::relaxation(indicators);
        let LinearConstraint {
            expr,
            relation,
            rhs,
        } = constraint;
        self.push_relaxed(&expr, relation, rhs, &slack);
    }

    fn set_objective(&mut self, sense: ObjectiveSense, expr: LinearExpr) {
        self.model.set_objective(Objective { sense, expr });
    }

    fn solve(&mut self, time_limit: Option<Duration>) -> SolveReport {
        self.values = None;
        if let Err(reason) = self.model.validate() {
            tracing::warn!(model = %self.model.name, %reason, "refusing to solve invalid model");
            return SolveReport::empty(SolveStatus::ModelInvalid);
        }

        let started = Instant::now();
        let outcome = run_microlp(&self.model, time_limit);
        let wall_time = started.elapsed();

        let status = match outcome {
            Outcome::Solved { values, proven } => {
                self.values = Some(values);
                if proven {
                    SolveStatus::Optimal
                } else {
                    tracing::warn!(model = %self.model.name, ?wall_time, "time limit reached, returning incumbent");
                    SolveStatus::Feasible
                }
            }
            Outcome::Infeasible => SolveStatus::Infeasible,
            Outcome::TimedOut => {
                tracing::warn!(model = %self.model.name, ?wall_time, "time limit reached before a solution was found");
                SolveStatus::Unknown
            }
            Outcome::Failed(reason) => {
                tracing::warn!(model = %self.model.name, %reason, "engine failed");
                SolveStatus::Unknown
            }
        };

        let objective_value = match (&self.values, &self.model.objective) {
            (Some(values), Some(objective)) => {
                Some(objective.expr.eval(|v| values[v.index()]) as f64)
            }
            _ => None,
        };

        tracing::info!(
            model = %self.model.name,
            ?status,
            ?wall_time,
            ?objective_value,
            "solve finished"
        );

        SolveReport {
            status,
            wall_time,
            objective_value,
        }
    }

    fn value_of(&self, var: Var) -> Option<i64> {
        self.values.as_ref()?.get(var.index()).copied()
    }

    fn var_count(&self) -> usize {
        self.model.var_count()
    }

    fn constraint_count(&self) -> usize {
        self.model.constraint_count()
    }
}

fn to_expression(expr: &LinearExpr, vars: &[Variable]) -> Expression {
    expr.terms()
        .iter()
        .fold(Expression::from(expr.constant_term() as f64), |acc, &(v, c)| {
            acc + (c as f64) * vars[v.index()]
        })
}

fn run_microlp(model: &LinearModel, time_limit: Option<Duration>) -> Outcome {
    let mut problem_vars = ProblemVariables::new();
    let vars: Vec<Variable> = model
        .vars
        .iter()
        .map(|info| {
            problem_vars.add(
                variable()
                    .integer()
                    .min(info.lo as f64)
                    .max(info.hi as f64)
                    .name(info.name.clone()),
            )
        })
        .collect();

    let (sense, objective) = match &model.objective {
        Some(o) => (o.sense, to_expression(&o.expr, &vars)),
        None => (ObjectiveSense::Minimize, Expression::from(0.0)),
    };
    let unsolved = match sense {
        ObjectiveSense::Maximize => problem_vars.maximise(objective),
        ObjectiveSense::Minimize => problem_vars.minimise(objective),
    };
    let mut problem = unsolved.using(microlp);
    if let Some(limit) = time_limit {
        problem = problem.with_time_limit(limit.as_secs_f64());
    }

    for c in &model.constraints {
        let lhs = to_expression(&c.expr, &vars);
        let rhs = c.rhs as f64;
        problem.add_constraint(match c.relation {
            Relation::Le => constraint::leq(lhs, rhs),
            Relation::Ge => constraint::geq(lhs, rhs),
            Relation::Eq => constraint::eq(lhs, rhs),
        });
    }

    match problem.solve() {
        Ok(solution) => Outcome::Solved {
            values: vars
                .iter()
                .map(|&v| solution.value(v).round() as i64)
                .collect(),
            proven: matches!(solution.status(), SolutionStatus::Optimal),
        },
        Err(ResolutionError::Infeasible) => Outcome::Infeasible,
        // microlp reports an expired budget with no incumbent this way.
        Err(ResolutionError::Other(_)) if time_limit.is_some() => Outcome::TimedOut,
        Err(err) => Outcome::Failed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconditional_implication() {
        let mut backend = MilpBackend::new("test");
        let x = backend.new_bool_var("x");
        backend.add_implication(LinearExpr::from(x).equals(1), &[]);
        assert_eq!(backend.model().constraints, vec![LinearExpr::from(x).equals(1)]);
    }

    #[test]
    fn test_big_m_le_row() {
        let mut backend = MilpBackend::new("test");
        let x = backend.new_int_var(0, 5, "x");
        let b = backend.new_bool_var("b");
        // b => x <= 2   becomes   x + 3b <= 5
        backend.add_implication(LinearExpr::from(x).at_most(2), &[Literal::positive(b)]);

        let rows = &backend.model().constraints;
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.relation, Relation::Le);
        assert_eq!(row.expr.terms(), &[(x, 1), (b, 3)]);
        assert_eq!(row.expr.constant_term(), -3);
        assert_eq!(row.rhs, 2);
    }

    #[test]
    fn test_big_m_ge_row_negated() {
        let mut backend = MilpBackend::new("test");
        let x = backend.new_int_var(0, 5, "x");
        let b = backend.new_bool_var("b");
        // !b => x >= 4   becomes   x + 4b >= 4
        backend.add_implication(LinearExpr::from(x).at_least(4), &[!b]);

        let row = &backend.model().constraints[0];
        assert_eq!(row.relation, Relation::Ge);
        assert_eq!(row.expr.terms(), &[(x, 1), (b, 4)]);
        assert_eq!(row.expr.constant_term(), 0);
    }

    #[test]
    fn test_redundant_side_is_skipped() {
        let mut backend = MilpBackend::new("test");
        let x = backend.new_bool_var("x");
        let b = backend.new_bool_var("b");
        // x <= 1 always holds, only the >= side needs a row.
        backend.add_implication(LinearExpr::from(x).equals(1), &[Literal::positive(b)]);
        assert_eq!(backend.constraint_count(), 1);
        assert_eq!(backend.model().constraints[0].relation, Relation::Ge);
    }

    #[test]
    fn test_big_m_rows_match_semantics() {
        let mut backend = MilpBackend::new("test");
        let x = backend.new_bool_var("x");
        let y = backend.new_bool_var("y");
        let a = backend.new_bool_var("a");
        let b = backend.new_bool_var("b");
        // (a && !b) => x == y
        backend.add_implication(LinearExpr::from(x).minus(&LinearExpr::from(y)).equals(0), &[a.into(), !b]);

        let model = backend.model();
        for bits in 0..16i64 {
            let values: Vec<i64> = (0..4).map(|i| (bits >> i) & 1).collect();
            let (vx, vy, va, vb) = (values[0], values[1], values[2], values[3]);
            let enforced = va == 1 && vb == 0;
            let expected = !enforced || vx == vy;
            assert_eq!(model.is_satisfied_by(&values), expected, "assignment {values:?}");
        }
    }

    #[test]
    fn test_solve_maximize() {
        let mut backend = MilpBackend::new("test");
        let x = backend.new_int_var(0, 10, "x");
        let y = backend.new_int_var(0, 10, "y");
        backend.add_linear(LinearExpr::from(x).with_term(y, 2), Relation::Le, 7);
        backend.set_objective(ObjectiveSense::Maximize, LinearExpr::from(x).with_term(y, 1));

        let report = backend.solve(None);
        assert_eq!(report.status, SolveStatus::Optimal);
        assert_eq!(report.objective_value, Some(7.0));
        assert_eq!(backend.value_of(x), Some(7));
        assert_eq!(backend.value_of(y), Some(0));
    }

    #[test]
    fn test_solve_infeasible() {
        let mut backend = MilpBackend::new("test");
        let x = backend.new_bool_var("x");
        backend.add_linear(LinearExpr::from(x), Relation::Ge, 2);

        let report = backend.solve(None);
        assert_eq!(report.status, SolveStatus::Infeasible);
        assert!(backend.value_of(x).is_none());
    }

    #[test]
    fn test_solve_invalid_model() {
        let mut backend = MilpBackend::new("test");
        backend.add_linear(LinearExpr::from(Var::new(3)), Relation::Le, 1);
        assert_eq!(backend.solve(None).status, SolveStatus::ModelInvalid);
    }

    #[test]
    fn test_value_before_solve() {
        let mut backend = MilpBackend::new("test");
        let x = backend.new_bool_var("x");
        assert!(backend.value_of(x).is_none());
    }

    #[test]
    fn test_implication_enforced_only_when_active() {
        let mut backend = MilpBackend::new("test");
        let x = backend.new_bool_var("x");
        let b = backend.new_bool_var("b");
        backend.add_implication(LinearExpr::from(x).equals(0), &[Literal::positive(b)]);
        backend.set_objective(ObjectiveSense::Maximize, LinearExpr::term(x, 2).with_term(b, 1));

        // Both at 1 is forbidden; x=1 alone scores higher than b=1 alone.
        assert!(backend.solve(None).is_solution_found());
        assert_eq!(backend.value_of(x), Some(1));
        assert_eq!(backend.value_of(b), Some(0));
    }

    #[test]
    fn test_generous_time_limit() {
        let mut backend = MilpBackend::new("test");
        let x = backend.new_bool_var("x");
        backend.set_objective(ObjectiveSense::Maximize, LinearExpr::from(x));

        let report = backend.solve(Some(Duration::from_secs(30)));
        assert_eq!(report.status, SolveStatus::Optimal);
        assert_eq!(backend.value_of(x), Some(1));
    }

    #[test]
    fn test_expired_time_limit_returns_without_solution() {
        let mut backend = MilpBackend::new("test");
        let x = backend.new_int_var(0, 2, "x");
        let y = backend.new_int_var(1, 3, "y");
        backend.add_linear(LinearExpr::term(x, 2).with_term(y, 1), Relation::Le, 4);
        backend.set_objective(ObjectiveSense::Maximize, LinearExpr::from(x).with_term(y, 1));

        let report = backend.solve(Some(Duration::ZERO));
        assert_eq!(report.status, SolveStatus::Unknown);
        assert!(report.objective_value.is_none());
        assert!(backend.value_of(x).is_none());

        // The engine stopped on its own budget, so a later solve starts clean.
        let report = backend.solve(None);
        assert_eq!(report.status, SolveStatus::Optimal);
        assert_eq!(report.objective_value, Some(3.0));
    }
}
