//! Model build and solve configuration.

use std::time::Duration;

/// Largest accepted `loading_idle_weight`. Objective coefficients reach the
/// engine as `f64`, which is exact up to 2^53; this leaves room for 2^12
/// loading transitions.
pub const MAX_LOADING_IDLE_WEIGHT: i64 = 1 << 40;

/// Configuration for building and solving a [`StowageModel`](super::StowageModel).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_stowage::stowage::StowageConfig;
///
/// let config = StowageConfig::default()
///     .with_time_limit(Duration::from_secs(30))
///     .with_loading_idle_weight(1_000)
///     .with_weight_ordering(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StowageConfig {
    /// Wall-clock limit handed to the backend. `None` = no limit.
    pub time_limit: Option<Duration>,

    /// Objective weight of an idle transition inside a loading phase, on
    /// top of the unit weight every idle transition carries.
    pub loading_idle_weight: i64,

    /// Forbid lighter containers below heavier ones.
    pub weight_ordering: bool,
}

impl Default for StowageConfig {
    fn default() -> Self {
        Self {
            time_limit: None,
            loading_idle_weight: 100_000,
            weight_ordering: true,
        }
    }
}

impl StowageConfig {
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_loading_idle_weight(mut self, weight: i64) -> Self {
        self.loading_idle_weight = weight;
        self
    }

    pub fn with_weight_ordering(mut self, enabled: bool) -> Self {
        self.weight_ordering = enabled;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.loading_idle_weight <= 0 || self.loading_idle_weight > MAX_LOADING_IDLE_WEIGHT {
            return Err(format!(
                "loading_idle_weight must be in [1, {MAX_LOADING_IDLE_WEIGHT}], got {}",
                self.loading_idle_weight
            ));
        }
        if self.time_limit == Some(Duration::ZERO) {
            return Err("time_limit must be non-zero".into());
        }
        Ok(())
    }
}
