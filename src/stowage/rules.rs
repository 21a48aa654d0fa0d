//! Structural rules tying the grids into a valid transition system.

use super::actions::{Action, ActionSelector};
use super::error::GridError;
use super::grid::{DecisionGrid, Dimensions, Direction, StateGrid};
use crate::cp::{
    IndicatorCache, LinearConstraint, LinearExpr, Literal, Relation, SolverBackend, Var,
};

/// `a - b == 0`.
fn unchanged(a: Var, b: Var) -> LinearConstraint {
    LinearExpr::from(a).with_term(b, -1).equals(0)
}

/// The fixed, ordered rule set applied once per model build.
///
/// Every rule that compares two time steps or depends on an action is gated
/// through indicators from the shared [`IndicatorCache`]; the remaining rules
/// are plain linear rows.
pub struct ConstraintRules<'a> {
    state: &'a StateGrid,
    decisions: &'a DecisionGrid,
    actions: &'a ActionSelector,
    dims: Dimensions,
}

impl<'a> ConstraintRules<'a> {
    pub fn new(
        state: &'a StateGrid,
        decisions: &'a DecisionGrid,
        actions: &'a ActionSelector,
    ) -> Self {
        Self {
            state,
            decisions,
            actions,
            dims: state.dimensions(),
        }
    }

    /// Applies every rule in order.
    pub fn apply<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
        indicators: &mut IndicatorCache,
    ) -> Result<(), GridError> {
        self.occupancy_matches_lifetime(backend)?;
        self.one_container_per_slot(backend)?;
        self.no_floating(backend)?;
        self.one_action_per_transition(backend);
        self.movement_counts(backend)?;
        self.in_out_exclusive(backend, indicators)?;
        self.out_requires_occupant(backend, indicators)?;
        self.live_count_balance(backend);
        self.no_reappearance(backend, indicators);
        self.idle_keeps_grid(backend, indicators)?;
        self.remove_keeps_grid(backend, indicators)?;
        self.emplace_keeps_empty(backend, indicators)?;
        self.emplace_fills_in_slot(backend, indicators)?;
        self.emplace_clears_out_slot(backend, indicators)?;
        self.insert_keeps_grid(backend, indicators)?;

        tracing::debug!(
            vars = backend.var_count(),
            constraints = backend.constraint_count(),
            indicators = indicators.len(),
            "structural rules applied"
        );
        Ok(())
    }

    /// Iterator over every (s, h) slot.
    fn slots(&self) -> impl Iterator<Item = (usize, usize)> {
        let heights = self.dims.heights;
        (0..self.dims.stacks).flat_map(move |s| (0..heights).map(move |h| (s, h)))
    }

    fn slot_sum(&self, t: usize, s: usize, h: usize) -> Result<LinearExpr, GridError> {
        Ok(LinearExpr::sum(self.state.slot(t, s, h)?))
    }

    /// A container occupies exactly one slot while alive and none otherwise.
    pub fn occupancy_matches_lifetime<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
    ) -> Result<(), GridError> {
        for t in 0..self.dims.time_steps {
            for c in 0..self.dims.containers {
                let placed = LinearExpr::sum(self.state.query(Some(t), Some(c), None, None)?);
                backend.add_linear(
                    placed.with_term(self.actions.lifetime(t, c), -1),
                    Relation::Eq,
                    0,
                );
            }
        }
        Ok(())
    }

    pub fn one_container_per_slot<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
    ) -> Result<(), GridError> {
        for t in 0..self.dims.time_steps {
            for (s, h) in self.slots() {
                backend.add_linear(self.slot_sum(t, s, h)?, Relation::Le, 1);
            }
        }
        Ok(())
    }

    /// A slot may only be occupied when the slot below it is.
    pub fn no_floating<B: SolverBackend + ?Sized>(&self, backend: &mut B) -> Result<(), GridError> {
        for t in 0..self.dims.time_steps {
            for (s, h) in self.slots().filter(|&(_, h)| h > 0) {
                let above = self.slot_sum(t, s, h)?;
                let below = self.slot_sum(t, s, h - 1)?;
                backend.add_linear(above.minus(&below), Relation::Le, 0);
            }
        }
        Ok(())
    }

    pub fn one_action_per_transition<B: SolverBackend + ?Sized>(&self, backend: &mut B) {
        for t in 0..self.dims.transitions() {
            let flags = Action::ALL.iter().map(|&a| self.actions.flag(t, a));
            backend.add_linear(LinearExpr::sum(flags), Relation::Eq, 1);
        }
    }

    /// One `in` per emplace or insert, one `out` per emplace or remove.
    pub fn movement_counts<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
    ) -> Result<(), GridError> {
        for t in 0..self.dims.transitions() {
            let ins = LinearExpr::sum(self.decisions.query(Some(t), Some(Direction::In), None, None)?)
                .with_term(self.actions.flag(t, Action::Emplace), -1)
                .with_term(self.actions.flag(t, Action::Insert), -1);
            backend.add_linear(ins, Relation::Eq, 0);

            let outs = LinearExpr::sum(self.decisions.query(Some(t), Some(Direction::Out), None, None)?)
                .with_term(self.actions.flag(t, Action::Emplace), -1)
                .with_term(self.actions.flag(t, Action::Remove), -1);
            backend.add_linear(outs, Relation::Eq, 0);
        }
        Ok(())
    }

    pub fn in_out_exclusive<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
        indicators: &mut IndicatorCache,
    ) -> Result<(), GridError> {
        for t in 0..self.dims.transitions() {
            for (s, h) in self.slots() {
                let b_in = indicators.is_true(backend, self.decisions.get(t, Direction::In, s, h)?);
                let out = self.decisions.get(t, Direction::Out, s, h)?;
                backend.add_implication(LinearExpr::from(out).equals(0), &[b_in.into()]);
            }
        }
        Ok(())
    }

    /// An `out` may only be flagged where a container currently stands.
    pub fn out_requires_occupant<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
        indicators: &mut IndicatorCache,
    ) -> Result<(), GridError> {
        for t in 0..self.dims.transitions() {
            for (s, h) in self.slots() {
                let out = self.decisions.get(t, Direction::Out, s, h)?;
                let b_out = indicators.is_true(backend, out);
                let occupied = self.slot_sum(t, s, h)?.with_term(out, -1);
                backend.add_implication(occupied.equals(0), &[b_out.into()]);
            }
        }
        Ok(())
    }

    /// `sum L[t] = sum L[t+1] + remove[t] - insert[t]`.
    pub fn live_count_balance<B: SolverBackend + ?Sized>(&self, backend: &mut B) {
        for t in 0..self.dims.transitions() {
            let mut expr = LinearExpr::sum(self.actions.alive_at(t).iter().copied());
            for &l in self.actions.alive_at(t + 1) {
                expr.add_term(l, -1);
            }
            expr.add_term(self.actions.flag(t, Action::Remove), -1);
            expr.add_term(self.actions.flag(t, Action::Insert), 1);
            backend.add_linear(expr, Relation::Eq, 0);
        }
    }

    /// Lifetimes never rise again, except across an insert.
    pub fn no_reappearance<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
        indicators: &mut IndicatorCache,
    ) {
        for t in 0..self.dims.transitions() {
            let b_insert = indicators.is_true(backend, self.actions.flag(t, Action::Insert));
            for c in 0..self.dims.containers {
                let drop = LinearExpr::from(self.actions.lifetime(t, c))
                    .with_term(self.actions.lifetime(t + 1, c), -1);
                backend.add_implication(drop.at_least(0), &[!b_insert]);
            }
        }
    }

    pub fn idle_keeps_grid<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
        indicators: &mut IndicatorCache,
    ) -> Result<(), GridError> {
        for t in 0..self.dims.transitions() {
            let b_idle = indicators.is_true(backend, self.actions.flag(t, Action::Idle));
            for c in 0..self.dims.containers {
                for (s, h) in self.slots() {
                    let now = self.state.get(t, c, s, h)?;
                    let next = self.state.get(t + 1, c, s, h)?;
                    backend.add_implication(unchanged(now, next), &[b_idle.into()]);
                }
            }
        }
        Ok(())
    }

    /// Remove leaves every slot but the `out` slot untouched.
    pub fn remove_keeps_grid<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
        indicators: &mut IndicatorCache,
    ) -> Result<(), GridError> {
        for t in 0..self.dims.transitions() {
            let b_remove = indicators.is_true(backend, self.actions.flag(t, Action::Remove));
            for (s, h) in self.slots() {
                let b_out = indicators.is_true(backend, self.decisions.get(t, Direction::Out, s, h)?);
                for c in 0..self.dims.containers {
                    let now = self.state.get(t, c, s, h)?;
                    let next = self.state.get(t + 1, c, s, h)?;
                    backend.add_implication(unchanged(now, next), &[b_remove.into(), !b_out]);
                }
            }
        }
        Ok(())
    }

    /// Under emplace, a container can only appear where it already was or at
    /// the `in` slot.
    pub fn emplace_keeps_empty<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
        indicators: &mut IndicatorCache,
    ) -> Result<(), GridError> {
        for t in 0..self.dims.transitions() {
            let b_emplace = indicators.is_true(backend, self.actions.flag(t, Action::Emplace));
            for (s, h) in self.slots() {
                let b_in = indicators.is_true(backend, self.decisions.get(t, Direction::In, s, h)?);
                for c in 0..self.dims.containers {
                    let b_here = indicators.is_true(backend, self.state.get(t, c, s, h)?);
                    let next = self.state.get(t + 1, c, s, h)?;
                    backend.add_implication(
                        LinearExpr::from(next).equals(0),
                        &[b_emplace.into(), !b_here, !b_in],
                    );
                }
            }
        }
        Ok(())
    }

    pub fn emplace_fills_in_slot<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
        indicators: &mut IndicatorCache,
    ) -> Result<(), GridError> {
        for t in 0..self.dims.transitions() {
            let b_emplace = indicators.is_true(backend, self.actions.flag(t, Action::Emplace));
            for (s, h) in self.slots() {
                let b_in = indicators.is_true(backend, self.decisions.get(t, Direction::In, s, h)?);
                let gate = [Literal::positive(b_emplace), Literal::positive(b_in)];
                backend.add_implication(self.slot_sum(t, s, h)?.equals(0), &gate);
                backend.add_implication(self.slot_sum(t + 1, s, h)?.equals(1), &gate);
            }
        }
        Ok(())
    }

    pub fn emplace_clears_out_slot<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
        indicators: &mut IndicatorCache,
    ) -> Result<(), GridError> {
        for t in 0..self.dims.transitions() {
            let b_emplace = indicators.is_true(backend, self.actions.flag(t, Action::Emplace));
            for (s, h) in self.slots() {
                let b_out = indicators.is_true(backend, self.decisions.get(t, Direction::Out, s, h)?);
                let gate = [Literal::positive(b_emplace), Literal::positive(b_out)];
                backend.add_implication(self.slot_sum(t, s, h)?.equals(1), &gate);
                backend.add_implication(self.slot_sum(t + 1, s, h)?.equals(0), &gate);
            }
        }
        Ok(())
    }

    /// Insert leaves every slot but the `in` slot untouched.
    pub fn insert_keeps_grid<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
        indicators: &mut IndicatorCache,
    ) -> Result<(), GridError> {
        for t in 0..self.dims.transitions() {
            let b_insert = indicators.is_true(backend, self.actions.flag(t, Action::Insert));
            for (s, h) in self.slots() {
                let b_in = indicators.is_true(backend, self.decisions.get(t, Direction::In, s, h)?);
                for c in 0..self.dims.containers {
                    let now = self.state.get(t, c, s, h)?;
                    let next = self.state.get(t + 1, c, s, h)?;
                    backend.add_implication(unchanged(now, next), &[b_insert.into(), !b_in]);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{MilpBackend, SolveStatus};

    struct Fixture {
        backend: MilpBackend,
        state: StateGrid,
        decisions: DecisionGrid,
        actions: ActionSelector,
    }

    impl Fixture {
        fn new(dims: Dimensions) -> Self {
            let mut backend = MilpBackend::new("rules");
            let state = StateGrid::new(&mut backend, dims);
            let decisions = DecisionGrid::new(&mut backend, dims);
            let actions = ActionSelector::new(&mut backend, dims);
            let mut indicators = IndicatorCache::new();
            ConstraintRules::new(&state, &decisions, &actions)
                .apply(&mut backend, &mut indicators)
                .unwrap();
            Self {
                backend,
                state,
                decisions,
                actions,
            }
        }

        fn fix(&mut self, var: Var, value: i64) {
            self.backend
                .add_linear(LinearExpr::from(var), Relation::Eq, value);
        }

        fn solve(&mut self) -> SolveStatus {
            self.backend.solve(None).status
        }

        fn value(&self, var: Var) -> Option<i64> {
            self.backend.value_of(var)
        }
    }

    #[test]
    fn test_idle_keeps_container() {
        let mut f = Fixture::new(Dimensions::new(2, 1, 1, 1));
        let x0 = f.state.get(0, 0, 0, 0).unwrap();
        let idle = f.actions.flag(0, Action::Idle);
        f.fix(x0, 1);
        f.fix(idle, 1);

        assert_eq!(f.solve(), SolveStatus::Optimal);
        assert_eq!(f.value(f.state.get(1, 0, 0, 0).unwrap()), Some(1));
        assert_eq!(f.value(f.actions.lifetime(1, 0)), Some(1));
    }

    #[test]
    fn test_slot_holds_one_container() {
        let mut f = Fixture::new(Dimensions::new(1, 2, 1, 1));
        let (a, b) = (f.actions.lifetime(0, 0), f.actions.lifetime(0, 1));
        f.fix(a, 1);
        f.fix(b, 1);
        assert_eq!(f.solve(), SolveStatus::Infeasible);
    }

    #[test]
    fn test_floating_container_rejected() {
        let mut f = Fixture::new(Dimensions::new(1, 1, 1, 2));
        let top = f.state.get(0, 0, 0, 1).unwrap();
        f.fix(top, 1);
        assert_eq!(f.solve(), SolveStatus::Infeasible);
    }

    #[test]
    fn test_remove_clears_out_slot() {
        let mut f = Fixture::new(Dimensions::new(2, 1, 1, 1));
        let x0 = f.state.get(0, 0, 0, 0).unwrap();
        let remove = f.actions.flag(0, Action::Remove);
        f.fix(x0, 1);
        f.fix(remove, 1);

        assert_eq!(f.solve(), SolveStatus::Optimal);
        assert_eq!(f.value(f.decisions.get(0, Direction::Out, 0, 0).unwrap()), Some(1));
        assert_eq!(f.value(f.state.get(1, 0, 0, 0).unwrap()), Some(0));
        assert_eq!(f.value(f.actions.lifetime(1, 0)), Some(0));
    }

    #[test]
    fn test_remove_needs_an_occupant() {
        let mut f = Fixture::new(Dimensions::new(2, 1, 1, 1));
        let l0 = f.actions.lifetime(0, 0);
        let remove = f.actions.flag(0, Action::Remove);
        f.fix(l0, 0);
        f.fix(remove, 1);
        assert_eq!(f.solve(), SolveStatus::Infeasible);
    }

    #[test]
    fn test_emplace_moves_container() {
        let mut f = Fixture::new(Dimensions::new(2, 1, 2, 1));
        let from = f.state.get(0, 0, 0, 0).unwrap();
        let to = f.state.get(1, 0, 1, 0).unwrap();
        f.fix(from, 1);
        f.fix(to, 1);

        assert_eq!(f.solve(), SolveStatus::Optimal);
        assert_eq!(f.value(f.actions.flag(0, Action::Emplace)), Some(1));
        assert_eq!(f.value(f.decisions.get(0, Direction::Out, 0, 0).unwrap()), Some(1));
        assert_eq!(f.value(f.decisions.get(0, Direction::In, 1, 0).unwrap()), Some(1));
    }

    #[test]
    fn test_emplace_cannot_stack_on_moving_container() {
        // Moving the only container on top of itself leaves it floating.
        let mut f = Fixture::new(Dimensions::new(2, 1, 1, 2));
        let from = f.state.get(0, 0, 0, 0).unwrap();
        let to = f.state.get(1, 0, 0, 1).unwrap();
        f.fix(from, 1);
        f.fix(to, 1);
        assert_eq!(f.solve(), SolveStatus::Infeasible);
    }

    #[test]
    fn test_insert_places_new_container() {
        let mut f = Fixture::new(Dimensions::new(2, 1, 1, 1));
        let (l0, l1) = (f.actions.lifetime(0, 0), f.actions.lifetime(1, 0));
        f.fix(l0, 0);
        f.fix(l1, 1);

        assert_eq!(f.solve(), SolveStatus::Optimal);
        assert_eq!(f.value(f.actions.flag(0, Action::Insert)), Some(1));
        assert_eq!(f.value(f.decisions.get(0, Direction::In, 0, 0).unwrap()), Some(1));
        assert_eq!(f.value(f.state.get(1, 0, 0, 0).unwrap()), Some(1));
    }

    #[test]
    fn test_reappearance_needs_insert() {
        for allow_insert in [false, true] {
            let mut f = Fixture::new(Dimensions::new(3, 1, 1, 1));
            let lives = [
                f.actions.lifetime(0, 0),
                f.actions.lifetime(1, 0),
                f.actions.lifetime(2, 0),
            ];
            for (var, value) in lives.into_iter().zip([1, 0, 1]) {
                f.fix(var, value);
            }
            if !allow_insert {
                let inserts = f.actions.insert().to_vec();
                for var in inserts {
                    f.fix(var, 0);
                }
            }

            let expected = if allow_insert {
                SolveStatus::Optimal
            } else {
                SolveStatus::Infeasible
            };
            assert_eq!(f.solve(), expected);
        }
    }

    #[test]
    fn test_slot_cannot_be_in_and_out() {
        let mut f = Fixture::new(Dimensions::new(2, 1, 2, 1));
        let x0 = f.state.get(0, 0, 0, 0).unwrap();
        let b_in = f.decisions.get(0, Direction::In, 0, 0).unwrap();
        let b_out = f.decisions.get(0, Direction::Out, 0, 0).unwrap();
        f.fix(x0, 1);
        f.fix(b_in, 1);
        f.fix(b_out, 1);
        assert_eq!(f.solve(), SolveStatus::Infeasible);
    }

    #[test]
    fn test_emplace_keeps_empty_slots_empty() {
        // A at stack 0, B at stack 1, stacks 2 and 3 empty, `in` at stack 3.
        for (target, expected) in [(2, SolveStatus::Infeasible), (3, SolveStatus::Optimal)] {
            let mut f = Fixture::new(Dimensions::new(2, 2, 4, 1));
            let a0 = f.state.get(0, 0, 0, 0).unwrap();
            let b0 = f.state.get(0, 1, 1, 0).unwrap();
            let emplace = f.actions.flag(0, Action::Emplace);
            let b_in = f.decisions.get(0, Direction::In, 3, 0).unwrap();
            let a1 = f.state.get(1, 0, target, 0).unwrap();
            f.fix(a0, 1);
            f.fix(b0, 1);
            f.fix(emplace, 1);
            f.fix(b_in, 1);
            f.fix(a1, 1);
            assert_eq!(f.solve(), expected, "A moved to stack {target}");
        }
    }

    #[test]
    fn test_insert_keeps_existing_containers() {
        for (a_next, expected) in [(1, SolveStatus::Infeasible), (0, SolveStatus::Optimal)] {
            let mut f = Fixture::new(Dimensions::new(2, 2, 2, 1));
            let a0 = f.state.get(0, 0, 0, 0).unwrap();
            let a1 = f.state.get(1, 0, a_next, 0).unwrap();
            let (b_dead, b_alive) = (f.actions.lifetime(0, 1), f.actions.lifetime(1, 1));
            f.fix(a0, 1);
            f.fix(a1, 1);
            f.fix(b_dead, 0);
            f.fix(b_alive, 1);

            assert_eq!(f.solve(), expected, "A at stack {a_next} after the insert");
            if expected == SolveStatus::Optimal {
                assert_eq!(f.value(f.actions.flag(0, Action::Insert)), Some(1));
                assert_eq!(f.value(f.state.get(1, 1, 1, 0).unwrap()), Some(1));
                assert_eq!(f.value(f.decisions.get(0, Direction::In, 1, 0).unwrap()), Some(1));
            }
        }
    }
}
