//! Search bounds shared by every component.
//!
//! Cost is bounded by sample count and iteration caps, never by wall-clock
//! time. All fields have defaults, so a TOML file only needs the keys it
//! overrides:
//!
//! ```
//! use sky_engine::SearchConfig;
//!
//! let config = SearchConfig::from_toml_str("time_tolerance_ms = 1000").unwrap();
//! assert_eq!(config.time_tolerance_ms, 1000);
//! assert_eq!(config.max_bisection_iterations, 40);
//! ```

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::SkyError;

pub const DEFAULT_TIME_TOLERANCE_MS: u64 = 30_000;
pub const DEFAULT_MAX_BISECTION_ITERATIONS: u32 = 40;
pub const DEFAULT_MAX_HORIZON_DAYS: u32 = 120;
pub const DEFAULT_MAX_SAMPLES: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Bisection stops once the bracket is no wider than this.
    pub time_tolerance_ms: u64,
    /// Bisection gives up refining after this many midpoint evaluations.
    pub max_bisection_iterations: u32,
    /// Largest `horizon_days` a multi-day scan accepts.
    pub max_horizon_days: u32,
    /// Largest number of coarse samples a single scan may produce.
    pub max_samples: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            time_tolerance_ms: DEFAULT_TIME_TOLERANCE_MS,
            max_bisection_iterations: DEFAULT_MAX_BISECTION_ITERATIONS,
            max_horizon_days: DEFAULT_MAX_HORIZON_DAYS,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

impl SearchConfig {
    /// Parse a config from TOML text and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`SkyError::Config`] for malformed TOML, unknown keys, or
    /// values rejected by [`SearchConfig::validate`].
    pub fn from_toml_str(s: &str) -> Result<Self, SkyError> {
        let config: SearchConfig =
            toml::from_str(s).map_err(|e| SkyError::Config(format!("config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject zero-valued bounds.
    pub fn validate(&self) -> Result<(), SkyError> {
        if self.time_tolerance_ms == 0 {
            return Err(SkyError::Config(
                "time_tolerance_ms must be positive".to_string(),
            ));
        }
        if i64::try_from(self.time_tolerance_ms).is_err() {
            return Err(SkyError::Config(format!(
                "time_tolerance_ms {} is too large",
                self.time_tolerance_ms
            )));
        }
        if self.max_bisection_iterations == 0 {
            return Err(SkyError::Config(
                "max_bisection_iterations must be positive".to_string(),
            ));
        }
        if self.max_horizon_days == 0 {
            return Err(SkyError::Config(
                "max_horizon_days must be positive".to_string(),
            ));
        }
        if self.max_samples < 2 {
            return Err(SkyError::Config(
                "max_samples must be at least 2".to_string(),
            ));
        }
        Ok(())
    }

    /// Bisection tolerance as a duration.
    pub fn time_tolerance(&self) -> TimeDelta {
        TimeDelta::try_milliseconds(i64::try_from(self.time_tolerance_ms).unwrap_or(i64::MAX))
            .unwrap_or(TimeDelta::MAX)
    }

    pub fn with_time_tolerance(mut self, tolerance: TimeDelta) -> Self {
        self.time_tolerance_ms = tolerance.num_milliseconds().max(1) as u64;
        self
    }
}
