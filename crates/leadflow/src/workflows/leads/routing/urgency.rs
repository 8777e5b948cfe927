use serde::{Deserialize, Serialize};

use super::config::RoutingConfig;
use super::domain::{Lead, LeadKind, LeadStage};

/// Escalation flag raised on aging unassigned leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    None,
    Warning,
    Critical,
}

impl EscalationLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    pub const fn is_escalated(self) -> bool {
        !matches!(self, Self::None)
    }
}

// Default urgency weights. Tunable, but these values are the documented
// baseline the queue semantics are calibrated against.
const CALL_REQUEST_WEIGHT: u32 = 24;
const SHOWING_REQUEST_WEIGHT: u32 = 22;
const CHAT_MESSAGE_WEIGHT: u32 = 18;
const INFO_REQUEST_WEIGHT: u32 = 12;
const UNKNOWN_KIND_WEIGHT: u32 = 10;

const AGE_WEIGHT_PER_HOUR: f64 = 8.0;
const AGE_WEIGHT_CAP: u32 = 60;

const PHONE_CONTACT_WEIGHT: u32 = 8;
const BASIC_CONTACT_WEIGHT: u32 = 4;

const LONG_MESSAGE_CHARS: usize = 40;
const LONG_MESSAGE_WEIGHT: u32 = 6;
const SHORT_MESSAGE_WEIGHT: u32 = 2;

const UNASSIGNED_STAGE_WEIGHT: u32 = 12;

const URGENCY_CEILING: u32 = 100;
const CRITICAL_AGE_HOURS: f64 = 6.0;

/// Point-in-time urgency verdict for a single lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyAssessment {
    pub urgency: u8,
    pub escalation: EscalationLevel,
}

/// Stateless scorer applying the documented weight table. Never mutates the
/// lead; escalation is recomputed on every read, so no scheduler has to wake
/// up to apply it.
#[derive(Debug, Clone)]
pub struct UrgencyScorer {
    escalation_window_hours: i64,
}

impl UrgencyScorer {
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            escalation_window_hours: config.escalation_window_hours.max(1),
        }
    }

    /// Monotonically non-decreasing in `age_hours` until the age term
    /// saturates; the result always lands in `0..=100`.
    pub fn score(&self, lead: &Lead, age_hours: f64) -> UrgencyAssessment {
        let age_hours = age_hours.max(0.0);

        let type_weight = match lead.kind {
            LeadKind::CallRequest => CALL_REQUEST_WEIGHT,
            LeadKind::ShowingRequest => SHOWING_REQUEST_WEIGHT,
            LeadKind::ChatMessage => CHAT_MESSAGE_WEIGHT,
            LeadKind::InfoRequest => INFO_REQUEST_WEIGHT,
            LeadKind::Unknown => UNKNOWN_KIND_WEIGHT,
        };

        let age_weight = ((age_hours * AGE_WEIGHT_PER_HOUR).round() as u32).min(AGE_WEIGHT_CAP);

        let contact_weight = if lead.contact.has_phone() {
            PHONE_CONTACT_WEIGHT
        } else {
            BASIC_CONTACT_WEIGHT
        };

        let message_weight = if lead.contact.message.chars().count() > LONG_MESSAGE_CHARS {
            LONG_MESSAGE_WEIGHT
        } else {
            SHORT_MESSAGE_WEIGHT
        };

        let status_weight = if lead.stage == LeadStage::New {
            UNASSIGNED_STAGE_WEIGHT
        } else {
            0
        };

        let total = age_weight + type_weight + contact_weight + message_weight + status_weight;
        let urgency = total.min(URGENCY_CEILING) as u8;

        let escalated =
            lead.stage == LeadStage::New && age_hours >= self.escalation_window_hours as f64;
        let escalation = if !escalated {
            EscalationLevel::None
        } else if age_hours >= CRITICAL_AGE_HOURS {
            EscalationLevel::Critical
        } else {
            EscalationLevel::Warning
        };

        UrgencyAssessment { urgency, escalation }
    }
}
