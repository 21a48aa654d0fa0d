//! Container stowage model generation.
//!
//! Turns a yard, its initial placements, and a shipment schedule into a
//! constraint model over time-indexed occupancy grids, states it on any
//! [`SolverBackend`](crate::cp::SolverBackend), and reads solved
//! assignments back as a [`StowagePlan`].
//!
//! # Key Components
//!
//! - **Grids**: [`StateGrid`] (`x[t, c, s, h]`), [`DecisionGrid`]
//!   (`in`/`out` per transition and slot), [`ActionSelector`] (one
//!   [`Action`] per transition and lifetime flags `L[t, c]`)
//! - **Rules**: [`ConstraintRules`], the structural transition rules
//! - **Scenario**: [`Scenario`] input, validated and resolved by
//!   [`ScenarioCompiler`] into a [`CompiledScenario`]
//! - **Weights**: [`WeightOrdering`] keeps heavier containers below lighter ones
//! - **Objective**: [`ObjectiveBuilder`] rewards idle transitions, loading
//!   phases first
//! - **Assembly**: [`StowageModel`] with [`StowageConfig`]
//!
//! # References
//!
//! Avriel, Penn & Shpirer (2000), "Container ship stowage problem:
//! complexity and connection to the coloring of circle graphs"

mod actions;
mod config;
mod error;
mod grid;
mod model;
mod objective;
mod plan;
mod rules;
mod scenario;
mod weights;

pub use actions::{Action, ActionSelector};
pub use config::{StowageConfig, MAX_LOADING_IDLE_WEIGHT};
pub use error::{Axis, GridError, ScenarioError, StowageError};
pub use grid::{DecisionGrid, Dimensions, Direction, StateGrid};
pub use model::StowageModel;
pub use objective::ObjectiveBuilder;
pub use plan::StowagePlan;
pub use rules::ConstraintRules;
pub use scenario::{
    CompiledScenario, InitialSlot, LifeStage, Lifecycle, PhaseSpan, Placement, Scenario,
    ScenarioCompiler, Shipment, Yard,
};
pub use weights::WeightOrdering;
