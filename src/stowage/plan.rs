//! Solved plan snapshot.

use super::actions::{Action, ActionSelector};
use super::error::StowageError;
use super::grid::{DecisionGrid, Dimensions, Direction, StateGrid};
use super::scenario::{CompiledScenario, Shipment};
use crate::cp::{SolveReport, SolverBackend, Var};
use std::fmt;

/// Immutable copy of a solved assignment, with labels and schedule attached
/// for rendering.
#[derive(Debug, Clone)]
pub struct StowagePlan {
    dims: Dimensions,
    report: SolveReport,
    labels: Vec<String>,
    shipments: Vec<Shipment>,
    /// Occupant per (t, s, h).
    occupancy: Vec<Option<usize>>,
    /// Per (t, c).
    lifetime: Vec<bool>,
    actions: Vec<Action>,
    /// Per (t, direction, s, h).
    movement: Vec<bool>,
}

impl StowagePlan {
    /// Reads every grid and selector value out of `backend`.
    ///
    /// Fails with [`StowageError::NotSolved`] unless `report` carries an
    /// assignment.
    pub fn capture<B: SolverBackend + ?Sized>(
        backend: &B,
        report: SolveReport,
        scenario: &CompiledScenario,
        state: &StateGrid,
        decisions: &DecisionGrid,
        selector: &ActionSelector,
    ) -> Result<Self, StowageError> {
        if !report.is_solution_found() {
            return Err(StowageError::NotSolved);
        }
        let value = |var: Var| -> Result<bool, StowageError> {
            backend
                .value_of(var)
                .map(|v| v != 0)
                .ok_or(StowageError::NotSolved)
        };
        let dims = state.dimensions();

        let mut occupancy = vec![None; dims.time_steps * dims.slots()];
        for ((t, c, s, h), var) in state.entries() {
            if value(var)? {
                occupancy[(t * dims.stacks + s) * dims.heights + h] = Some(c);
            }
        }

        let mut lifetime = Vec::with_capacity(dims.time_steps * dims.containers);
        for t in 0..dims.time_steps {
            for &var in selector.alive_at(t) {
                lifetime.push(value(var)?);
            }
        }

        let mut actions = Vec::with_capacity(dims.transitions());
        for t in 0..dims.transitions() {
            let mut chosen = Action::Idle;
            for action in Action::ALL {
                if value(selector.flag(t, action))? {
                    chosen = action;
                    break;
                }
            }
            actions.push(chosen);
        }

        let movement = decisions
            .query(None, None, None, None)?
            .into_iter()
            .map(value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dims,
            report,
            labels: scenario.labels().to_vec(),
            shipments: scenario.shipments().to_vec(),
            occupancy,
            lifetime,
            actions,
            movement,
        })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn report(&self) -> &SolveReport {
        &self.report
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn shipments(&self) -> &[Shipment] {
        &self.shipments
    }

    fn in_yard(&self, t: usize, s: usize, h: usize) -> bool {
        t < self.dims.time_steps && s < self.dims.stacks && h < self.dims.heights
    }

    /// Label of the container at (s, h) at time t. `None` when the slot is
    /// empty or outside the yard.
    pub fn occupant(&self, t: usize, s: usize, h: usize) -> Option<&str> {
        if !self.in_yard(t, s, h) {
            return None;
        }
        let c = self.occupancy[(t * self.dims.stacks + s) * self.dims.heights + h]?;
        Some(&self.labels[c])
    }

    /// Slot (s, h) holding `label` at time t.
    pub fn position(&self, t: usize, label: &str) -> Option<(usize, usize)> {
        let c = self.labels.iter().position(|l| l == label)?;
        if t >= self.dims.time_steps {
            return None;
        }
        let base = t * self.dims.slots();
        self.occupancy[base..base + self.dims.slots()]
            .iter()
            .position(|&o| o == Some(c))
            .map(|i| (i / self.dims.heights, i % self.dims.heights))
    }

    /// Whether container `c` is in the yard at time t.
    pub fn lifetime(&self, t: usize, c: usize) -> bool {
        t < self.dims.time_steps
            && c < self.dims.containers
            && self.lifetime[t * self.dims.containers + c]
    }

    /// # Panics
    ///
    /// Panics if `t` is not a transition of the plan.
    pub fn action(&self, t: usize) -> Action {
        self.actions[t]
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Whether slot (s, h) is the `dir` slot of transition t.
    pub fn movement(&self, t: usize, dir: Direction, s: usize, h: usize) -> bool {
        if t >= self.dims.transitions() || s >= self.dims.stacks || h >= self.dims.heights {
            return false;
        }
        let d = match dir {
            Direction::In => 0,
            Direction::Out => 1,
        };
        self.movement[((t * 2 + d) * self.dims.stacks + s) * self.dims.heights + h]
    }

    /// Labels at time t as rows, top height first, one column per stack.
    pub fn layout(&self, t: usize) -> Vec<Vec<Option<&str>>> {
        (0..self.dims.heights)
            .rev()
            .map(|h| {
                (0..self.dims.stacks)
                    .map(|s| self.occupant(t, s, h))
                    .collect()
            })
            .collect()
    }
}

impl fmt::Display for StowagePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.labels.iter().map(String::len).max().unwrap_or(1).max(1);
        for t in 0..self.dims.time_steps {
            writeln!(f, "t={t}")?;
            for row in self.layout(t) {
                let cells: Vec<String> = row
                    .iter()
                    .map(|cell| format!("[{:^width$}]", cell.unwrap_or("")))
                    .collect();
                writeln!(f, "  {}", cells.join(" "))?;
            }
            if let Some(action) = self.actions.get(t) {
                writeln!(f, "  -> {action}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{MilpBackend, SolveStatus};
    use crate::stowage::scenario::{Scenario, ScenarioCompiler};

    struct Parts {
        backend: MilpBackend,
        scenario: CompiledScenario,
        state: StateGrid,
        decisions: DecisionGrid,
        actions: ActionSelector,
    }

    /// Grids for a two-stack yard with containers A and B, all values pinned
    /// by hand: A at (0, 0) stays, B moves from (0, 1) to (1, 0).
    fn parts() -> Parts {
        let scenario = ScenarioCompiler::compile(
            &Scenario::new(2, 2)
                .with_container("A", 0, 0)
                .with_container("B", 0, 1)
                .with_time_steps(2),
        )
        .unwrap();
        let dims = scenario.dimensions();
        let mut backend = MilpBackend::new("plan");
        let state = StateGrid::new(&mut backend, dims);
        let decisions = DecisionGrid::new(&mut backend, dims);
        let actions = ActionSelector::new(&mut backend, dims);

        let ones = [
            state.get(0, 0, 0, 0).unwrap(),
            state.get(0, 1, 0, 1).unwrap(),
            state.get(1, 0, 0, 0).unwrap(),
            state.get(1, 1, 1, 0).unwrap(),
            decisions.get(0, Direction::Out, 0, 1).unwrap(),
            decisions.get(0, Direction::In, 1, 0).unwrap(),
            actions.flag(0, Action::Emplace),
            actions.lifetime(0, 0),
            actions.lifetime(0, 1),
            actions.lifetime(1, 0),
            actions.lifetime(1, 1),
        ];
        for v in 0..backend.var_count() {
            let var = Var::new(v);
            let value = i64::from(ones.contains(&var));
            backend.add_constraint(crate::cp::LinearExpr::from(var).equals(value));
        }
        Parts {
            backend,
            scenario,
            state,
            decisions,
            actions,
        }
    }

    fn capture(p: &mut Parts) -> Result<StowagePlan, StowageError> {
        let report = p.backend.solve(None);
        assert_eq!(report.status, SolveStatus::Optimal);
        StowagePlan::capture(&p.backend, report, &p.scenario, &p.state, &p.decisions, &p.actions)
    }

    #[test]
    fn test_snapshot_queries() {
        let mut p = parts();
        let plan = capture(&mut p).unwrap();

        assert_eq!(plan.occupant(0, 0, 1), Some("B"));
        assert_eq!(plan.occupant(1, 0, 1), None);
        assert_eq!(plan.occupant(9, 0, 0), None);
        assert_eq!(plan.position(1, "B"), Some((1, 0)));
        assert_eq!(plan.position(0, "Z"), None);
        assert!(plan.lifetime(1, 1));
        assert_eq!(plan.action(0), Action::Emplace);
        assert_eq!(plan.actions(), &[Action::Emplace]);
        assert!(plan.movement(0, Direction::Out, 0, 1));
        assert!(plan.movement(0, Direction::In, 1, 0));
        assert!(!plan.movement(0, Direction::In, 0, 1));
    }

    #[test]
    fn test_layout_top_first() {
        let mut p = parts();
        let plan = capture(&mut p).unwrap();
        assert_eq!(
            plan.layout(0),
            vec![vec![Some("B"), None], vec![Some("A"), None]]
        );
        assert_eq!(
            plan.layout(1),
            vec![vec![None, None], vec![Some("A"), Some("B")]]
        );
        let text = plan.to_string();
        assert!(text.starts_with("t=0\n  [B] [ ]\n  [A] [ ]\n  -> emplace\n"));
    }

    #[test]
    fn test_requires_solution() {
        let p = parts();
        let report = SolveReport::empty(SolveStatus::Infeasible);
        let err = StowagePlan::capture(&p.backend, report, &p.scenario, &p.state, &p.decisions, &p.actions)
            .unwrap_err();
        assert_eq!(err, StowageError::NotSolved);
    }
}
