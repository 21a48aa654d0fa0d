//! Objective: keep loading phases quiet, then minimize reshuffling overall.

use super::actions::ActionSelector;
use super::scenario::CompiledScenario;
use crate::cp::{LinearExpr, ObjectiveSense, SolverBackend};

/// Builds `maximize loading_weight * Σ idle[loading t] + Σ idle[t]`.
///
/// Each idle flag appears once, with coefficient `1 + loading_weight` inside
/// loading phases and `1` elsewhere.
pub struct ObjectiveBuilder<'a> {
    actions: &'a ActionSelector,
    scenario: &'a CompiledScenario,
    loading_weight: i64,
}

impl<'a> ObjectiveBuilder<'a> {
    pub fn new(actions: &'a ActionSelector, scenario: &'a CompiledScenario, loading_weight: i64) -> Self {
        Self {
            actions,
            scenario,
            loading_weight,
        }
    }

    pub fn expression(&self) -> LinearExpr {
        let mut expr = LinearExpr::new();
        for (t, &idle) in self.actions.idle().iter().enumerate() {
            let coef = if self.scenario.is_loading_transition(t) {
                self.loading_weight.saturating_add(1)
            } else {
                1
            };
            expr.add_term(idle, coef);
        }
        expr
    }

    /// Best objective any assignment could reach: every transition idle.
    pub fn upper_bound(&self) -> i64 {
        self.expression()
            .terms()
            .iter()
            .fold(0i64, |acc, &(_, c)| acc.saturating_add(c))
    }

    pub fn apply<B: SolverBackend + ?Sized>(&self, backend: &mut B) {
        backend.set_objective(ObjectiveSense::Maximize, self.expression());
    }
}
