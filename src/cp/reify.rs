//! Reification: booleans equivalent to a condition.

use super::model::Condition;
use super::solver::SolverBackend;
use super::variables::{Literal, Var};
use std::collections::BTreeMap;

/// Creates a boolean `b` with `b = 1 <=> condition`.
///
/// Built from two one-directional implications, `b => holds` and
/// `!b => fails`, so it works on any [`SolverBackend`].
pub fn define_indicator<B: SolverBackend + ?Sized>(
    backend: &mut B,
    condition: &Condition,
    name: &str,
) -> Var {
    let b = backend.new_bool_var(name);
    backend.add_implication(condition.holds().clone(), &[Literal::positive(b)]);
    backend.add_implication(condition.fails().clone(), &[!b]);
    b
}

/// Memo of `var == 1` indicators for boolean variables.
///
/// Rules that gate on the same flag share one indicator. Keys are ordered,
/// so the set of indicators depends only on the order of requests.
#[derive(Debug, Clone, Default)]
pub struct IndicatorCache {
    by_var: BTreeMap<Var, Var>,
}

impl IndicatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indicator for `var == 1`; its negation is the indicator for `var == 0`.
    pub fn is_true<B: SolverBackend + ?Sized>(&mut self, backend: &mut B, var: Var) -> Var {
        if let Some(&b) = self.by_var.get(&var) {
            return b;
        }
        let b = define_indicator(backend, &Condition::is_true(var), &format!("ind_{var}"));
        self.by_var.insert(var, b);
        b
    }

    pub fn len(&self) -> usize {
        self.by_var.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_var.is_empty()
    }
}
