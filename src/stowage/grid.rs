//! Occupancy and movement grids.

use super::error::{Axis, GridError};
use crate::cp::{SolverBackend, Var};
use std::fmt;
use std::str::FromStr;

/// Fixed model dimensions: time steps, containers, stacks, heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub time_steps: usize,
    pub containers: usize,
    pub stacks: usize,
    pub heights: usize,
}

impl Dimensions {
    pub fn new(time_steps: usize, containers: usize, stacks: usize, heights: usize) -> Self {
        Self {
            time_steps,
            containers,
            stacks,
            heights,
        }
    }

    /// Number of transitions `t -> t + 1`.
    pub fn transitions(&self) -> usize {
        self.time_steps.saturating_sub(1)
    }

    /// Number of (stack, height) slots.
    pub fn slots(&self) -> usize {
        self.stacks * self.heights
    }
}

fn check(axis: Axis, index: usize, extent: usize) -> Result<(), GridError> {
    if index < extent {
        Ok(())
    } else {
        Err(GridError::OutOfRange {
            axis,
            index,
            extent,
        })
    }
}

fn check_opt(axis: Axis, index: Option<usize>, extent: usize) -> Result<(), GridError> {
    index.map_or(Ok(()), |i| check(axis, i, extent))
}

/// Either the single requested index or the whole axis.
fn axis_range(index: Option<usize>, extent: usize) -> std::ops::Range<usize> {
    match index {
        Some(i) => i..i + 1,
        None => 0..extent,
    }
}

/// Boolean occupancy variables `x[t, c, s, h]`.
///
/// Variables are stored in lexicographic (t, c, s, h) order, so every query
/// returns them in that order.
#[derive(Debug, Clone)]
pub struct StateGrid {
    dims: Dimensions,
    vars: Vec<Var>,
}

impl StateGrid {
    /// Allocates one boolean per (t, c, s, h).
    pub fn new<B: SolverBackend + ?Sized>(backend: &mut B, dims: Dimensions) -> Self {
        let mut vars = Vec::with_capacity(dims.time_steps * dims.containers * dims.slots());
        for t in 0..dims.time_steps {
            for c in 0..dims.containers {
                for s in 0..dims.stacks {
                    for h in 0..dims.heights {
                        vars.push(backend.new_bool_var(&format!("t{t}c{c}s{s}h{h}")));
                    }
                }
            }
        }
        Self { dims, vars }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    fn offset(&self, t: usize, c: usize, s: usize, h: usize) -> usize {
        ((t * self.dims.containers + c) * self.dims.stacks + s) * self.dims.heights + h
    }

    pub fn get(&self, t: usize, c: usize, s: usize, h: usize) -> Result<Var, GridError> {
        check(Axis::Time, t, self.dims.time_steps)?;
        check(Axis::Container, c, self.dims.containers)?;
        check(Axis::Stack, s, self.dims.stacks)?;
        check(Axis::Height, h, self.dims.heights)?;
        Ok(self.vars[self.offset(t, c, s, h)])
    }

    /// Variables matching the given coordinates; `None` is a wildcard.
    pub fn query(
        &self,
        t: Option<usize>,
        c: Option<usize>,
        s: Option<usize>,
        h: Option<usize>,
    ) -> Result<Vec<Var>, GridError> {
        check_opt(Axis::Time, t, self.dims.time_steps)?;
        check_opt(Axis::Container, c, self.dims.containers)?;
        check_opt(Axis::Stack, s, self.dims.stacks)?;
        check_opt(Axis::Height, h, self.dims.heights)?;

        let mut out = Vec::new();
        for t in axis_range(t, self.dims.time_steps) {
            for c in axis_range(c, self.dims.containers) {
                for s in axis_range(s, self.dims.stacks) {
                    for h in axis_range(h, self.dims.heights) {
                        out.push(self.vars[self.offset(t, c, s, h)]);
                    }
                }
            }
        }
        Ok(out)
    }

    /// All occupants of slot (s, h) at time t, one per container.
    pub fn slot(&self, t: usize, s: usize, h: usize) -> Result<Vec<Var>, GridError> {
        self.query(Some(t), None, Some(s), Some(h))
    }

    /// Every variable with its (t, c, s, h) key, in key order.
    pub fn entries(&self) -> impl Iterator<Item = ((usize, usize, usize, usize), Var)> + '_ {
        let Dimensions {
            containers,
            stacks,
            heights,
            ..
        } = self.dims;
        self.vars.iter().enumerate().map(move |(i, &var)| {
            let h = i % heights;
            let s = (i / heights) % stacks;
            let c = (i / (heights * stacks)) % containers;
            let t = i / (heights * stacks * containers);
            ((t, c, s, h), var)
        })
    }
}

/// Movement direction at a slot during a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::In, Direction::Out];

    fn ordinal(self) -> usize {
        match self {
            Direction::In => 0,
            Direction::Out => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::In => "in",
            Direction::Out => "out",
        })
    }
}

impl FromStr for Direction {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            other => Err(GridError::UnknownDirection(other.to_string())),
        }
    }
}

/// Boolean movement indicators `in[t, s, h]` and `out[t, s, h]`, one pair
/// per transition and slot.
///
/// Stored in lexicographic (t, direction, s, h) order with `In < Out`.
#[derive(Debug, Clone)]
pub struct DecisionGrid {
    transitions: usize,
    stacks: usize,
    heights: usize,
    vars: Vec<Var>,
}

impl DecisionGrid {
    pub fn new<B: SolverBackend + ?Sized>(backend: &mut B, dims: Dimensions) -> Self {
        let transitions = dims.transitions();
        let mut vars = Vec::with_capacity(transitions * 2 * dims.slots());
        for t in 0..transitions {
            for dir in Direction::ALL {
                for s in 0..dims.stacks {
                    for h in 0..dims.heights {
                        vars.push(backend.new_bool_var(&format!("d{t}s{s}h{h}{dir}")));
                    }
                }
            }
        }
        Self {
            transitions,
            stacks: dims.stacks,
            heights: dims.heights,
            vars,
        }
    }

    pub fn transitions(&self) -> usize {
        self.transitions
    }

    fn offset(&self, t: usize, dir: Direction, s: usize, h: usize) -> usize {
        ((t * 2 + dir.ordinal()) * self.stacks + s) * self.heights + h
    }

    pub fn get(&self, t: usize, dir: Direction, s: usize, h: usize) -> Result<Var, GridError> {
        check(Axis::Time, t, self.transitions)?;
        check(Axis::Stack, s, self.stacks)?;
        check(Axis::Height, h, self.heights)?;
        Ok(self.vars[self.offset(t, dir, s, h)])
    }

    /// Like [`get`](Self::get), with the direction given by name.
    pub fn get_named(&self, t: usize, dir: &str, s: usize, h: usize) -> Result<Var, GridError> {
        self.get(t, dir.parse()?, s, h)
    }

    /// Variables matching the given coordinates; `None` is a wildcard.
    pub fn query(
        &self,
        t: Option<usize>,
        dir: Option<Direction>,
        s: Option<usize>,
        h: Option<usize>,
    ) -> Result<Vec<Var>, GridError> {
        check_opt(Axis::Time, t, self.transitions)?;
        check_opt(Axis::Stack, s, self.stacks)?;
        check_opt(Axis::Height, h, self.heights)?;

        let dirs: &[Direction] = match dir {
            Some(Direction::In) => &[Direction::In],
            Some(Direction::Out) => &[Direction::Out],
            None => &Direction::ALL,
        };
        let mut out = Vec::new();
        for t in axis_range(t, self.transitions) {
            for &d in dirs {
                for s in axis_range(s, self.stacks) {
                    for h in axis_range(h, self.heights) {
                        out.push(self.vars[self.offset(t, d, s, h)]);
                    }
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::MilpBackend;
    use proptest::prelude::*;

    fn state(dims: Dimensions) -> StateGrid {
        StateGrid::new(&mut MilpBackend::new("grid"), dims)
    }

    #[test]
    fn test_state_get_is_lexicographic() {
        let grid = state(Dimensions::new(2, 3, 2, 2));
        assert_eq!(grid.get(0, 0, 0, 0).unwrap().index(), 0);
        assert_eq!(grid.get(0, 0, 0, 1).unwrap().index(), 1);
        assert_eq!(grid.get(0, 0, 1, 0).unwrap().index(), 2);
        assert_eq!(grid.get(0, 1, 0, 0).unwrap().index(), 4);
        assert_eq!(grid.get(1, 0, 0, 0).unwrap().index(), 12);
    }

    #[test]
    fn test_state_out_of_range() {
        let grid = state(Dimensions::new(2, 3, 2, 2));
        assert_eq!(
            grid.get(0, 3, 0, 0),
            Err(GridError::OutOfRange {
                axis: Axis::Container,
                index: 3,
                extent: 3
            })
        );
        assert!(grid.get(2, 0, 0, 0).is_err());
        assert!(grid.query(None, None, Some(5), None).is_err());
    }

    #[test]
    fn test_state_query_wildcards() {
        let grid = state(Dimensions::new(2, 3, 2, 2));
        let per_container = grid.query(Some(1), Some(2), None, None).unwrap();
        assert_eq!(per_container.len(), 4);
        assert_eq!(per_container[0], grid.get(1, 2, 0, 0).unwrap());
        assert_eq!(per_container[3], grid.get(1, 2, 1, 1).unwrap());

        let slot = grid.slot(0, 1, 0).unwrap();
        let expected: Vec<Var> = (0..3).map(|c| grid.get(0, c, 1, 0).unwrap()).collect();
        assert_eq!(slot, expected);

        assert_eq!(grid.query(None, None, None, None).unwrap().len(), 24);
    }

    #[test]
    fn test_state_entries_round_trip_keys() {
        let grid = state(Dimensions::new(2, 2, 3, 2));
        for ((t, c, s, h), var) in grid.entries() {
            assert_eq!(grid.get(t, c, s, h).unwrap(), var);
        }
    }

    #[test]
    fn test_decision_grid() {
        let mut backend = MilpBackend::new("grid");
        let grid = DecisionGrid::new(&mut backend, Dimensions::new(3, 1, 2, 2));
        assert_eq!(grid.transitions(), 2);
        assert_eq!(backend.var_count(), 2 * 2 * 4);

        let ins = grid.query(Some(1), Some(Direction::In), None, None).unwrap();
        let outs = grid.query(Some(1), Some(Direction::Out), None, None).unwrap();
        assert_eq!(ins.len(), 4);
        assert!(ins.iter().max() < outs.iter().min());

        assert_eq!(
            grid.get_named(0, "out", 1, 1).unwrap(),
            grid.get(0, Direction::Out, 1, 1).unwrap()
        );
        assert_eq!(
            grid.get_named(0, "sideways", 0, 0),
            Err(GridError::UnknownDirection("sideways".into()))
        );
        assert!(grid.get(2, Direction::In, 0, 0).is_err());
    }

    #[test]
    fn test_single_time_step_has_no_transitions() {
        let mut backend = MilpBackend::new("grid");
        let grid = DecisionGrid::new(&mut backend, Dimensions::new(1, 1, 1, 1));
        assert_eq!(grid.transitions(), 0);
        assert!(grid.get(0, Direction::In, 0, 0).is_err());
        assert!(grid.query(None, None, None, None).unwrap().is_empty());
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("in".parse::<Direction>(), Ok(Direction::In));
        assert_eq!(Direction::Out.to_string(), "out");
        assert!("IN".parse::<Direction>().is_err());
    }

    proptest! {
        #[test]
        fn prop_query_sorted_and_filtered(
            t in prop::option::of(0usize..3),
            c in prop::option::of(0usize..2),
            s in prop::option::of(0usize..3),
            h in prop::option::of(0usize..2),
        ) {
            let grid = state(Dimensions::new(3, 2, 3, 2));
            let found = grid.query(t, c, s, h).unwrap();

            prop_assert!(found.windows(2).all(|w| w[0] < w[1]));

            let expected: Vec<Var> = grid
                .entries()
                .filter(|((kt, kc, ks, kh), _)| {
                    t.map_or(true, |v| v == *kt)
                        && c.map_or(true, |v| v == *kc)
                        && s.map_or(true, |v| v == *ks)
                        && h.map_or(true, |v| v == *kh)
                })
                .map(|(_, var)| var)
                .collect();
            prop_assert_eq!(found, expected);
        }
    }
}
