//! Per-transition action flags and per-container lifetimes.

use super::grid::Dimensions;
use crate::cp::{SolverBackend, Var};
use std::fmt;

/// What happens during one transition. Exactly one action holds per
/// transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    /// Nothing moves.
    Idle,
    /// One container moves from an `out` slot to an `in` slot.
    Emplace,
    /// One container leaves the yard through an `out` slot.
    Remove,
    /// One container enters the yard through an `in` slot.
    Insert,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Idle, Action::Emplace, Action::Remove, Action::Insert];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Idle => "idle",
            Action::Emplace => "emplace",
            Action::Remove => "remove",
            Action::Insert => "insert",
        })
    }
}

/// Action flags for each transition and lifetime flags `L[t, c]`.
///
/// Indexing is direct; callers stay within `0..transitions` and
/// `0..time_steps` × `0..containers`.
#[derive(Debug, Clone)]
pub struct ActionSelector {
    idle: Vec<Var>,
    emplace: Vec<Var>,
    remove: Vec<Var>,
    insert: Vec<Var>,
    lifetime: Vec<Vec<Var>>,
}

impl ActionSelector {
    /// Creates the four action flags per transition and `L[t, c]` for every
    /// time step and container.
    pub fn new<B: SolverBackend + ?Sized>(backend: &mut B, dims: Dimensions) -> Self {
        let mut idle = Vec::with_capacity(dims.transitions());
        let mut emplace = Vec::with_capacity(dims.transitions());
        let mut remove = Vec::with_capacity(dims.transitions());
        let mut insert = Vec::with_capacity(dims.transitions());
        for t in 0..dims.transitions() {
            idle.push(backend.new_bool_var(&format!("d{t}idle")));
            emplace.push(backend.new_bool_var(&format!("d{t}emplace")));
            remove.push(backend.new_bool_var(&format!("d{t}remove")));
            insert.push(backend.new_bool_var(&format!("d{t}insert")));
        }
        let lifetime = (0..dims.time_steps)
            .map(|t| {
                (0..dims.containers)
                    .map(|c| backend.new_bool_var(&format!("l{t}c{c}")))
                    .collect()
            })
            .collect();
        Self {
            idle,
            emplace,
            remove,
            insert,
            lifetime,
        }
    }

    /// `T - 1`.
    pub fn transitions(&self) -> usize {
        self.idle.len()
    }

    /// Flag of `action` during transition `t`.
    pub fn flag(&self, t: usize, action: Action) -> Var {
        match action {
            Action::Idle => self.idle[t],
            Action::Emplace => self.emplace[t],
            Action::Remove => self.remove[t],
            Action::Insert => self.insert[t],
        }
    }

    /// Idle flags, one per transition.
    pub fn idle(&self) -> &[Var] {
        &self.idle
    }

    /// Emplace flags, one per transition.
    pub fn emplace(&self) -> &[Var] {
        &self.emplace
    }

    /// Remove flags, one per transition.
    pub fn remove(&self) -> &[Var] {
        &self.remove
    }

    /// Insert flags, one per transition.
    pub fn insert(&self) -> &[Var] {
        &self.insert
    }

    /// `L[t, c]`.
    pub fn lifetime(&self, t: usize, c: usize) -> Var {
        self.lifetime[t][c]
    }

    /// `L[t, ·]` for every container.
    pub fn alive_at(&self, t: usize) -> &[Var] {
        &self.lifetime[t]
    }
}
