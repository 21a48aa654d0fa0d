//! Constraint-model generation for container stacking and stowage.
//!
//! Provides:
//!
//! - **CP (Constraint Programming)**: Engine-agnostic modeling layer with
//!   boolean and integer variables, linear and gated constraints, and a
//!   [`SolverBackend`](cp::SolverBackend) trait. Ships a MILP backend
//!   solving through `good_lp`.
//! - **Stowage**: Time-indexed yard model. Occupancy and movement grids,
//!   structural transition rules, shipment schedule compilation, weight
//!   ordering, and an objective that keeps loading phases free of
//!   reshuffles.
//!
//! # Architecture
//!
//! The stowage layer talks to engines only through the `cp` layer's
//! backend trait. Which engine runs is decided by the backend value handed
//! to [`StowageModel::build`](stowage::StowageModel::build); nothing is
//! global.

pub mod cp;
pub mod stowage;
