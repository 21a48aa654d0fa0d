//! Weight ordering: nothing lighter may support something heavier.

use super::error::GridError;
use super::grid::StateGrid;
use super::scenario::CompiledScenario;
use crate::cp::{IndicatorCache, LinearExpr, SolverBackend};

/// Gates `x[t, c', s, h'] == 0` on `x[t, c, s, h] == 1` for every lighter
/// container `c'` and every height `h' < h`.
///
/// Time steps where `c` is pinned dead are skipped; the gate could never
/// fire there.
pub struct WeightOrdering<'a> {
    state: &'a StateGrid,
    scenario: &'a CompiledScenario,
}

impl<'a> WeightOrdering<'a> {
    pub fn new(state: &'a StateGrid, scenario: &'a CompiledScenario) -> Self {
        Self { state, scenario }
    }

    /// Pairs `(heavy, light)` of container indices with `weight(light) < weight(heavy)`.
    pub fn lighter_pairs(&self) -> Vec<(usize, usize)> {
        let weights = self.scenario.weights();
        let mut pairs = Vec::new();
        for (heavy, &w_heavy) in weights.iter().enumerate() {
            for (light, &w_light) in weights.iter().enumerate() {
                if w_light < w_heavy {
                    pairs.push((heavy, light));
                }
            }
        }
        pairs
    }

    /// Emits the ordering rows. Returns the number of gated rows added.
    pub fn apply<B: SolverBackend + ?Sized>(
        &self,
        backend: &mut B,
        indicators: &mut IndicatorCache,
    ) -> Result<usize, GridError> {
        let pairs = self.lighter_pairs();
        if pairs.is_empty() {
            return Ok(0);
        }
        let dims = self.state.dimensions();
        let mut rows = 0;
        for t in 0..dims.time_steps {
            for &(heavy, light) in &pairs {
                if self.scenario.lifecycle(heavy).stage(t).pinned() == Some(false) {
                    continue;
                }
                for s in 0..dims.stacks {
                    for h in 1..dims.heights {
                        let b = indicators.is_true(backend, self.state.get(t, heavy, s, h)?);
                        for below in 0..h {
                            let x = self.state.get(t, light, s, below)?;
                            backend.add_implication(LinearExpr::from(x).equals(0), &[b.into()]);
                            rows += 1;
                        }
                    }
                }
            }
        }
        tracing::debug!(pairs = pairs.len(), rows, "weight ordering applied");
        Ok(rows)
    }
}
