use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::config::RoutingConfig;
use super::domain::LeadStage;

/// Traffic-light classification of how long a lead has sat in its current
/// stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaBucket {
    Green,
    Yellow,
    Red,
}

impl SlaBucket {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

const YELLOW_AFTER_HOURS: i64 = 1;
const RED_AFTER_HOURS: i64 = 6;

/// Derives stage deadlines and traffic-light buckets.
#[derive(Debug, Clone)]
pub struct SlaCalculator {
    window: Duration,
}

impl SlaCalculator {
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            window: Duration::hours(config.escalation_window_hours.max(1)),
        }
    }

    /// Deadline for a stage entered at `entered_at`. The same window is
    /// re-applied on every transition, so the clock restarts each time a
    /// lead changes stage. Terminal stages carry no deadline.
    pub fn due_at(&self, stage: LeadStage, entered_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if stage.is_terminal() {
            None
        } else {
            Some(entered_at + self.window)
        }
    }

    /// Pure step function over an elapsed duration. Negative input is
    /// clamped to zero before bucketing.
    pub fn bucket(elapsed: Duration) -> SlaBucket {
        let elapsed = elapsed.max(Duration::zero());
        if elapsed < Duration::hours(YELLOW_AFTER_HOURS) {
            SlaBucket::Green
        } else if elapsed < Duration::hours(RED_AFTER_HOURS) {
            SlaBucket::Yellow
        } else {
            SlaBucket::Red
        }
    }
}
