use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default per-tick time budget.
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_millis(5);

/// Tree controller settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct TreeConfig {
    /// Label used in logs and in the tree dump.
    pub name: String,

    /// Soft per-tick deadline, in microseconds. Advisory only: a slow leaf is never
    /// preempted, but composites stop starting new children once it is spent.
    pub time_budget_micros: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            name: "behavior-tree".to_string(),
            time_budget_micros: DEFAULT_TIME_BUDGET.as_micros() as u64,
        }
    }
}

impl TreeConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_micros(self.time_budget_micros)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget_micros = u64::try_from(budget.as_micros()).unwrap_or(u64::MAX);
        self
    }
}
