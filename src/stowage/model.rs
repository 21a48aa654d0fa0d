//! Model assembly: grids, rules, scenario, weights, and objective on one backend.

use super::actions::ActionSelector;
use super::config::StowageConfig;
use super::error::StowageError;
use super::grid::{DecisionGrid, StateGrid};
use super::objective::ObjectiveBuilder;
use super::plan::StowagePlan;
use super::rules::ConstraintRules;
use super::scenario::{CompiledScenario, Scenario, ScenarioCompiler};
use super::weights::WeightOrdering;
use crate::cp::{IndicatorCache, SolveReport, SolverBackend};

/// Largest objective value an `f64` engine represents exactly.
const MAX_EXACT_OBJECTIVE: i64 = 1 << 53;

/// A stowage scenario stated on a solver backend.
///
/// Building is deterministic: the same scenario and configuration produce
/// the same variables and constraints in the same order.
///
/// # Examples
///
/// ```
/// use u_stowage::cp::{MilpBackend, SolveStatus};
/// use u_stowage::stowage::{Action, Scenario, Shipment, StowageConfig, StowageModel};
///
/// let scenario = Scenario::new(1, 1)
///     .with_container("A", 0, 0)
///     .with_shipment(Shipment::new(1).departing(["A"]));
/// let mut model =
///     StowageModel::build(&scenario, MilpBackend::new("demo"), StowageConfig::default()).unwrap();
///
/// assert_eq!(model.solve().status, SolveStatus::Optimal);
/// let plan = model.plan().unwrap();
/// assert_eq!(plan.actions(), &[Action::Remove]);
/// ```
pub struct StowageModel<B: SolverBackend> {
    backend: B,
    config: StowageConfig,
    scenario: CompiledScenario,
    state: StateGrid,
    decisions: DecisionGrid,
    actions: ActionSelector,
    indicators: IndicatorCache,
    report: Option<SolveReport>,
}

impl<B: SolverBackend> StowageModel<B> {
    /// Validates `scenario` and `config`, then states the whole model on
    /// `backend`.
    pub fn build(scenario: &Scenario, mut backend: B, config: StowageConfig) -> Result<Self, StowageError> {
        config.validate().map_err(StowageError::Config)?;
        let compiled = ScenarioCompiler::compile(scenario)?;
        let dims = compiled.dimensions();

        let state = StateGrid::new(&mut backend, dims);
        let decisions = DecisionGrid::new(&mut backend, dims);
        let actions = ActionSelector::new(&mut backend, dims);
        tracing::debug!(
            time_steps = dims.time_steps,
            containers = dims.containers,
            stacks = dims.stacks,
            heights = dims.heights,
            vars = backend.var_count(),
            "grids allocated"
        );

        let mut indicators = IndicatorCache::new();
        ConstraintRules::new(&state, &decisions, &actions).apply(&mut backend, &mut indicators)?;
        compiled.apply(&mut backend, &state, &actions)?;
        if config.weight_ordering {
            WeightOrdering::new(&state, &compiled).apply(&mut backend, &mut indicators)?;
        }
        let objective = ObjectiveBuilder::new(&actions, &compiled, config.loading_idle_weight);
        if objective.upper_bound() > MAX_EXACT_OBJECTIVE {
            return Err(StowageError::Config(format!(
                "objective bound {} exceeds {MAX_EXACT_OBJECTIVE}; lower loading_idle_weight",
                objective.upper_bound()
            )));
        }
        objective.apply(&mut backend);

        tracing::info!(
            vars = backend.var_count(),
            constraints = backend.constraint_count(),
            indicators = indicators.len(),
            "stowage model built"
        );

        Ok(Self {
            backend,
            config,
            scenario: compiled,
            state,
            decisions,
            actions,
            indicators,
            report: None,
        })
    }

    /// Solves with the configured time limit and keeps the report.
    pub fn solve(&mut self) -> SolveReport {
        let report = self.backend.solve(self.config.time_limit);
        self.report = Some(report.clone());
        report
    }

    /// Snapshot of the last solve. Fails with [`StowageError::NotSolved`]
    /// before a solve that found an assignment.
    pub fn plan(&self) -> Result<StowagePlan, StowageError> {
        let report = self.report.clone().ok_or(StowageError::NotSolved)?;
        StowagePlan::capture(
            &self.backend,
            report,
            &self.scenario,
            &self.state,
            &self.decisions,
            &self.actions,
        )
    }

    pub fn report(&self) -> Option<&SolveReport> {
        self.report.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn config(&self) -> &StowageConfig {
        &self.config
    }

    pub fn scenario(&self) -> &CompiledScenario {
        &self.scenario
    }

    pub fn state(&self) -> &StateGrid {
        &self.state
    }

    pub fn decisions(&self) -> &DecisionGrid {
        &self.decisions
    }

    pub fn actions(&self) -> &ActionSelector {
        &self.actions
    }

    /// Number of distinct conditions reified while building.
    pub fn indicator_count(&self) -> usize {
        self.indicators.len()
    }
}
