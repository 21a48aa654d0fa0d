//! Linear expressions, constraints, and the plain-data model they form.

use super::variables::{Var, VarInfo};

/// An integer linear expression `sum(coef * var) + constant`.
///
/// Terms keep their insertion order; nothing is merged or sorted, so the
/// order in which a model is built is the order it is recorded in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    terms: Vec<(Var, i64)>,
    constant: i64,
}

impl LinearExpr {
    /// The empty expression, equal to zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// An expression with no terms.
    pub fn constant(value: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// A single `coef * var` term.
    pub fn term(var: Var, coef: i64) -> Self {
        Self {
            terms: vec![(var, coef)],
            constant: 0,
        }
    }

    /// The unit-coefficient sum of `vars`.
    pub fn sum<I: IntoIterator<Item = Var>>(vars: I) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1)).collect(),
            constant: 0,
        }
    }

    /// Builder form of [`add_term`](Self::add_term).
    pub fn with_term(mut self, var: Var, coef: i64) -> Self {
        self.add_term(var, coef);
        self
    }

    /// Adds `value` to the constant part.
    pub fn with_constant(mut self, value: i64) -> Self {
        self.constant += value;
        self
    }

    /// Appends `coef * var`. Repeated variables are kept as separate terms.
    pub fn add_term(&mut self, var: Var, coef: i64) {
        self.terms.push((var, coef));
    }

    /// Adds `scale * other` to this expression.
    pub fn add_scaled(&mut self, other: &LinearExpr, scale: i64) {
        self.terms
            .extend(other.terms.iter().map(|&(v, c)| (v, c * scale)));
        self.constant += other.constant * scale;
    }

    /// `self - other`.
    pub fn minus(mut self, other: &LinearExpr) -> Self {
        self.add_scaled(other, -1);
        self
    }

    /// Terms in insertion order.
    pub fn terms(&self) -> &[(Var, i64)] {
        &self.terms
    }

    /// The constant part.
    pub fn constant_term(&self) -> i64 {
        self.constant
    }

    /// True when there are no variable terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluates the expression under an assignment.
    pub fn eval(&self, value: impl Fn(Var) -> i64) -> i64 {
        self.terms
            .iter()
            .map(|&(v, c)| c * value(v))
            .sum::<i64>()
            + self.constant
    }

    /// Tightest `[min, max]` range of the expression over the given domains.
    pub fn bounds(&self, domain: impl Fn(Var) -> (i64, i64)) -> (i64, i64) {
        self.terms
            .iter()
            .fold((self.constant, self.constant), |(lo, hi), &(v, c)| {
                let (vlo, vhi) = domain(v);
                let (a, b) = (c * vlo, c * vhi);
                (lo + a.min(b), hi + a.max(b))
            })
    }

    /// `self == rhs`.
    pub fn equals(self, rhs: i64) -> LinearConstraint {
        LinearConstraint::new(self, Relation::Eq, rhs)
    }

    /// `self <= rhs`.
    pub fn at_most(self, rhs: i64) -> LinearConstraint {
        LinearConstraint::new(self, Relation::Le, rhs)
    }

    /// `self >= rhs`.
    pub fn at_least(self, rhs: i64) -> LinearConstraint {
        LinearConstraint::new(self, Relation::Ge, rhs)
    }
}

impl From<Var> for LinearExpr {
    fn from(var: Var) -> Self {
        LinearExpr::term(var, 1)
    }
}

/// Relation between an expression and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `expr <= rhs`
    Le,
    /// `expr >= rhs`
    Ge,
    /// `expr == rhs`
    Eq,
}

/// A linear constraint `expr (relation) rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConstraint {
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: i64,
}

impl LinearConstraint {
    /// `expr relation rhs`.
    pub fn new(expr: LinearExpr, relation: Relation, rhs: i64) -> Self {
        Self {
            expr,
            relation,
            rhs,
        }
    }

    /// Whether the constraint holds under an assignment.
    pub fn is_satisfied(&self, value: impl Fn(Var) -> i64) -> bool {
        let lhs = self.expr.eval(value);
        match self.relation {
            Relation::Le => lhs <= self.rhs,
            Relation::Ge => lhs >= self.rhs,
            Relation::Eq => lhs == self.rhs,
        }
    }
}

/// A condition that can be reified into a boolean indicator.
///
/// Linear disequality is not linear, so a condition carries its own
/// complement: exactly one of `holds` and `fails` is satisfied by any
/// assignment within the variable domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    holds: LinearConstraint,
    fails: LinearConstraint,
}

impl Condition {
    /// Builds a condition from a constraint and its complement.
    ///
    /// The caller guarantees that the two are mutually exclusive and
    /// exhaustive over the domains involved.
    pub fn new(holds: LinearConstraint, fails: LinearConstraint) -> Self {
        Self { holds, fails }
    }

    /// `var == 1` for a boolean variable.
    pub fn is_true(var: Var) -> Self {
        Self::new(LinearExpr::from(var).equals(1), LinearExpr::from(var).equals(0))
    }

    /// `var == 0` for a boolean variable.
    pub fn is_false(var: Var) -> Self {
        Self::is_true(var).negate()
    }

    /// Row that holds when the condition is true.
    pub fn holds(&self) -> &LinearConstraint {
        &self.holds
    }

    /// Row that holds when the condition is false.
    pub fn fails(&self) -> &LinearConstraint {
        &self.fails
    }

    /// The opposite condition.
    pub fn negate(self) -> Self {
        Self {
            holds: self.fails,
            fails: self.holds,
        }
    }
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    Minimize,
    Maximize,
}

/// Objective function for the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Objective {
    pub sense: ObjectiveSense,
    pub expr: LinearExpr,
}

/// A linear integer model held as plain data.
///
/// Variables are referenced by [`Var`] handles indexing `vars`.
///
/// # Examples
///
/// ```
/// use u_stowage::cp::{LinearExpr, LinearModel, VarInfo};
///
/// let mut model = LinearModel::new("example");
/// let x = model.add_var(VarInfo::boolean("x"));
/// let y = model.add_var(VarInfo::boolean("y"));
/// model.add_constraint(LinearExpr::sum([x, y]).at_most(1));
/// assert!(model.validate().is_ok());
/// assert!(model.is_satisfied_by(&[1, 0]));
/// assert!(!model.is_satisfied_by(&[1, 1]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearModel {
    /// Model name.
    pub name: String,
    /// Variable domains, indexed by [`Var::index`].
    pub vars: Vec<VarInfo>,
    /// Constraints in insertion order.
    pub constraints: Vec<LinearConstraint>,
    /// Objective function.
    pub objective: Option<Objective>,
}

impl LinearModel {
    /// An empty model with no objective.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a variable and returns its handle.
    pub fn add_var(&mut self, info: VarInfo) -> Var {
        self.vars.push(info);
        Var::new(self.vars.len() - 1)
    }

    /// Appends a row.
    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    /// Replaces any previous objective.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Domain of `var`, if the handle belongs to this model.
    pub fn var(&self, var: Var) -> Option<&VarInfo> {
        self.vars.get(var.index())
    }

    /// Domain bounds of a variable; unknown handles get an empty range.
    pub fn bounds(&self, var: Var) -> (i64, i64) {
        self.var(var).map_or((0, 0), |info| (info.lo, info.hi))
    }

    /// Validates the model for consistency.
    ///
    /// Checks that every referenced variable exists and that every domain is
    /// non-empty.
    pub fn validate(&self) -> Result<(), String> {
        for (i, info) in self.vars.iter().enumerate() {
            if info.lo > info.hi {
                return Err(format!(
                    "empty domain for variable {} ({}): [{}, {}]",
                    i, info.name, info.lo, info.hi
                ));
            }
        }
        let objective_terms = self.objective.iter().flat_map(|o| o.expr.terms());
        let constraint_terms = self.constraints.iter().flat_map(|c| c.expr.terms());
        for &(var, _) in constraint_terms.chain(objective_terms) {
            if var.index() >= self.vars.len() {
                return Err(format!("undefined variable: {var}"));
            }
        }
        Ok(())
    }

    /// Whether a full assignment (indexed by variable) satisfies every
    /// domain and constraint.
    pub fn is_satisfied_by(&self, values: &[i64]) -> bool {
        if values.len() != self.vars.len() {
            return false;
        }
        let in_domain = self
            .vars
            .iter()
            .zip(values)
            .all(|(info, &v)| info.lo <= v && v <= info.hi);
        in_domain
            && self
                .constraints
                .iter()
                .all(|c| c.is_satisfied(|var| values[var.index()]))
    }

    /// Number of variables.
    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// Number of linear rows.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}
