use serde::{Deserialize, Serialize};

pub const DEFAULT_ESCALATION_WINDOW_HOURS: i64 = 2;

/// Engine configuration injected into each component constructor so tests can
/// vary it per case. Nothing here is read from ambient state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Hours an unassigned lead may wait before it escalates. Values below 1
    /// are replaced with the default.
    pub escalation_window_hours: i64,
    pub ranking: RankingWeights,
}

impl RoutingConfig {
    pub fn new(escalation_window_hours: i64) -> Self {
        let sanitized = if escalation_window_hours >= 1 {
            escalation_window_hours
        } else {
            DEFAULT_ESCALATION_WINDOW_HOURS
        };

        Self {
            escalation_window_hours: sanitized,
            ranking: RankingWeights::default(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ESCALATION_WINDOW_HOURS)
    }
}

/// Fit-score weight table. The defaults below are the documented baseline;
/// overriding them is supported for experimentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    /// Starting score before any signal is applied.
    pub base: i32,
    /// Bonus when the lead's resolved city appears in the coverage text.
    pub city_match: i32,
    /// Bonus when the resolved sector/neighborhood appears.
    pub sector_match: i32,
    /// Bonus when the resolved property type appears.
    pub property_type_match: i32,
    /// Multiplier applied to the candidate's conversion rate (0..1).
    pub conversion_scale: f32,
    /// Bonus for activity within the last 24 hours.
    pub fresh_activity_bonus: i32,
    /// Bonus for activity within the last 72 hours.
    pub recent_activity_bonus: i32,
    /// Deduction per open assignment currently on the candidate's plate.
    pub load_penalty: i32,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            base: 50,
            city_match: 20,
            sector_match: 20,
            property_type_match: 10,
            conversion_scale: 30.0,
            fresh_activity_bonus: 10,
            recent_activity_bonus: 5,
            load_penalty: 8,
        }
    }
}
