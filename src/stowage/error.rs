//! Errors raised while building a stowage model.

use std::fmt;
use thiserror::Error;

/// Grid coordinate axis, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Time,
    Container,
    Stack,
    Height,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::Time => "time",
            Axis::Container => "container",
            Axis::Stack => "stack",
            Axis::Height => "height",
        };
        f.write_str(name)
    }
}

/// Invalid grid access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("{axis} index {index} out of range (extent {extent})")]
    OutOfRange {
        axis: Axis,
        index: usize,
        extent: usize,
    },

    #[error("unknown movement direction '{0}'; expected 'in' or 'out'")]
    UnknownDirection(String),
}

/// Malformed scenario, rejected before any constraint is emitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    #[error("yard must have at least one stack and one height level")]
    EmptyYard,

    #[error("horizon of {time_steps} time steps is shorter than the schedule ({required})")]
    HorizonTooShort { time_steps: usize, required: usize },

    #[error("shipment {phase} has zero duration")]
    ZeroDuration { phase: usize },

    #[error("container '{label}' is placed outside the yard at stack {stack}, height {height}")]
    PlacementOutOfRange {
        label: String,
        stack: usize,
        height: usize,
    },

    #[error("container '{0}' is listed more than once")]
    DuplicateLabel(String),

    #[error("containers '{first}' and '{second}' share stack {stack}, height {height}")]
    SlotConflict {
        first: String,
        second: String,
        stack: usize,
        height: usize,
    },

    #[error("container '{label}' floats at stack {stack}, height {height}")]
    FloatingPlacement {
        label: String,
        stack: usize,
        height: usize,
    },

    #[error("container '{label}' arrives in shipment {phase} but is already in the yard")]
    AlreadyPresent { label: String, phase: usize },

    #[error("container '{label}' arrives in shipment {phase} after it has departed")]
    Reappears { label: String, phase: usize },

    #[error("container '{label}' departs in shipment {phase} without a prior arrival or placement")]
    UnknownDeparture { label: String, phase: usize },

    #[error("container '{label}' departs in shipment {phase} but has already departed")]
    AlreadyDeparted { label: String, phase: usize },

    #[error("container '{label}' both arrives and departs in shipment {phase}")]
    ArrivesAndDeparts { label: String, phase: usize },

    /// Every arrival and departure takes its own transition.
    #[error("shipment {phase} moves {moves} containers in only {duration} transitions")]
    OverfullPhase {
        phase: usize,
        moves: usize,
        duration: usize,
    },

    #[error("weight given for unknown container '{0}'")]
    UnknownWeight(String),

    #[error("container '{0}' has a zero weight")]
    ZeroWeight(String),
}

/// Umbrella error for model construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StowageError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no solution available; solve the model first")]
    NotSolved,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_error_message() {
        let err = GridError::OutOfRange {
            axis: Axis::Height,
            index: 4,
            extent: 3,
        };
        assert_eq!(err.to_string(), "height index 4 out of range (extent 3)");
    }

    #[test]
    fn test_umbrella_conversion() {
        let err: StowageError = ScenarioError::ZeroDuration { phase: 2 }.into();
        assert!(matches!(err, StowageError::Scenario(_)));
        assert_eq!(err.to_string(), "shipment 2 has zero duration");
    }
}
