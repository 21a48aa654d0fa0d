//! Constraint Programming (CP) modelling layer.
//!
//! Provides an engine-agnostic way to state integer/boolean models: variables,
//! linear constraints, conditional (gated) constraints, and an objective.
//!
//! # Key Components
//!
//! - **Variables**: [`Var`] handles, [`VarInfo`] domains, [`Literal`]s
//! - **Constraints**: [`LinearExpr`], [`LinearConstraint`], [`Condition`]
//! - **Backend**: [`SolverBackend`] trait, implemented by [`MilpBackend`]
//! - **Reification**: [`define_indicator`] and [`IndicatorCache`]
//!
//! # Design
//!
//! Model construction talks to a [`SolverBackend`] only. Conditional
//! constraints always go through [`SolverBackend::add_implication`]; whether
//! the engine has native indicator constraints or synthesizes them (as
//! [`MilpBackend`] does with big-M rows) stays behind the trait.
//!
//! # References
//!
//! Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

mod milp;
mod model;
mod reify;
mod solver;
mod variables;

pub use milp::MilpBackend;
pub use model::{
    Condition, LinearConstraint, LinearExpr, LinearModel, Objective, ObjectiveSense, Relation,
};
pub use reify::{define_indicator, IndicatorCache};
pub use solver::{SolveReport, SolveStatus, SolverBackend};
pub use variables::{Literal, Var, VarInfo};
