//! CP variable handles, domains, and literals.

use std::fmt;
use std::ops::Not;

/// Handle to a decision variable owned by a backend.
///
/// Handles are dense indices in creation order, so two models built by the
/// same sequence of calls hand out identical handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(usize);

impl Var {
    /// Creates a handle from a raw index.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// The raw index of this handle.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// An integer variable with a domain [lo, hi].
///
/// Boolean variables are integer variables with domain [0, 1].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarInfo {
    /// Variable name (for diagnostics; not required to be unique).
    pub name: String,
    /// Minimum value.
    pub lo: i64,
    /// Maximum value.
    pub hi: i64,
}

impl VarInfo {
    /// Creates a boolean variable domain.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lo: 0,
            hi: 1,
        }
    }

    /// Creates an integer variable domain.
    pub fn integer(name: impl Into<String>, lo: i64, hi: i64) -> Self {
        Self {
            name: name.into(),
            lo,
            hi,
        }
    }

    /// Whether the domain is exactly {0, 1}.
    pub fn is_boolean(&self) -> bool {
        self.lo == 0 && self.hi == 1
    }

    /// Domain size (hi - lo + 1), zero for an empty domain.
    pub fn domain_size(&self) -> i64 {
        (self.hi - self.lo + 1).max(0)
    }
}

/// A boolean variable or its negation.
///
/// A positive literal is true when its variable is 1; a negated literal is
/// true when its variable is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    var: Var,
    negated: bool,
}

impl Literal {
    /// True when `var == 1`.
    pub fn positive(var: Var) -> Self {
        Self {
            var,
            negated: false,
        }
    }

    /// True when `var == 0`.
    pub fn negative(var: Var) -> Self {
        Self { var, negated: true }
    }

    /// The underlying variable.
    pub fn var(self) -> Var {
        self.var
    }

    /// Whether this is the `var == 0` literal.
    pub fn is_negated(self) -> bool {
        self.negated
    }

    /// Truth value of the literal given the value of its variable.
    pub fn is_true_for(self, value: i64) -> bool {
        (value != 0) != self.negated
    }
}

impl From<Var> for Literal {
    fn from(var: Var) -> Self {
        Literal::positive(var)
    }
}

impl Not for Var {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal::negative(self)
    }
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal {
            var: self.var,
            negated: !self.negated,
        }
    }
}
