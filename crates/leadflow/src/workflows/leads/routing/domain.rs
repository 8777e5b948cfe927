use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for inbound leads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeadId(pub String);

/// Identifier wrapper for assignable agents and brokers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub String);

/// Channel through which an inquiry arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadKind {
    InfoRequest,
    CallRequest,
    ChatMessage,
    ShowingRequest,
    /// Catch-all for intake payloads this engine does not recognize.
    #[serde(other)]
    Unknown,
}

impl LeadKind {
    pub const fn label(self) -> &'static str {
        match self {
            LeadKind::InfoRequest => "info_request",
            LeadKind::CallRequest => "call_request",
            LeadKind::ChatMessage => "chat_message",
            LeadKind::ShowingRequest => "showing_request",
            LeadKind::Unknown => "unknown",
        }
    }
}

impl Default for LeadKind {
    fn default() -> Self {
        Self::Unknown
    }
}

/// What an inquiry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSourceKind {
    Property,
    Project,
    AgentProfile,
    Origin,
}

/// Origin of an inquiry, with the geographic and property-type strings the
/// intake path resolved from the referenced listing. Absent fields simply
/// contribute no match signal during ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadSource {
    pub kind: LeadSourceKind,
    pub reference: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
}

/// Contact information submitted with an inquiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl ContactDetails {
    /// A phone number counts only when it carries non-whitespace content.
    pub fn has_phone(&self) -> bool {
        self.phone
            .as_deref()
            .map(|phone| !phone.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Lifecycle phase of a lead. `won`, `lost`, and `archived` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStage {
    New,
    Assigned,
    Contacted,
    Won,
    Lost,
    Archived,
}

impl LeadStage {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::New,
            Self::Assigned,
            Self::Contacted,
            Self::Won,
            Self::Lost,
            Self::Archived,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Assigned => "assigned",
            Self::Contacted => "contacted",
            Self::Won => "won",
            Self::Lost => "lost",
            Self::Archived => "archived",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost | Self::Archived)
    }

    /// Stages reachable in one hop. Terminal stages have no outbound edges;
    /// `archived` models an out-of-band withdrawal from any open stage.
    pub const fn successors(self) -> &'static [LeadStage] {
        match self {
            Self::New => &[Self::Assigned, Self::Archived],
            Self::Assigned => &[Self::Contacted, Self::Archived],
            Self::Contacted => &[Self::Won, Self::Lost, Self::Archived],
            Self::Won | Self::Lost | Self::Archived => &[],
        }
    }

    /// Legacy wire status retained for older consumers. Derived at the
    /// serialization boundary, never stored.
    pub const fn legacy_status(self) -> &'static str {
        match self {
            Self::New => "open",
            Self::Assigned => "working",
            Self::Contacted => "contacted",
            Self::Won => "closed_won",
            Self::Lost => "closed_lost",
            Self::Archived => "withdrawn",
        }
    }
}

impl fmt::Display for LeadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Caller-supplied identity attached to every mutating call for audit
/// attribution. Authentication happens upstream of this engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
}

/// One inbound buyer/renter inquiry tracked through the routing lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub kind: LeadKind,
    pub source: LeadSource,
    pub contact: ContactDetails,
    pub stage: LeadStage,
    pub previous_stage: Option<LeadStage>,
    pub stage_changed_at: DateTime<Utc>,
    pub stage_changed_by: Option<String>,
    pub stage_change_reason: Option<String>,
    pub assigned_to: Option<CandidateId>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub stage_sla_due_at: Option<DateTime<Utc>>,
    pub sla_reset_at: Option<DateTime<Utc>>,
    pub reassignment_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped by the store on every successful update; the service passes the
    /// version it read so concurrent writers on the same lead lose cleanly.
    pub version: u64,
}

impl Lead {
    /// Time spent in the current stage, never negative. For a `new` lead this
    /// coincides with its age since creation.
    pub fn stage_elapsed(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.stage_changed_at)
            .max(Duration::zero())
    }

    /// Fractional hours in the current stage.
    pub fn stage_age_hours(&self, now: DateTime<Utc>) -> f64 {
        self.stage_elapsed(now).num_milliseconds() as f64 / 3_600_000.0
    }
}

/// Role a directory entry fills inside its organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateRole {
    Agent,
    Broker,
}

impl CandidateRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Broker => "broker",
        }
    }
}

/// An assignable agent or broker from the candidate directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub display_name: String,
    pub organization: String,
    pub role: CandidateRole,
    /// Case-folded concatenation of market/sector/city/neighborhood and
    /// organization fragments, used for substring matching.
    pub coverage_text: String,
    /// Most recent login or profile update, whichever is later.
    pub last_active_at: Option<DateTime<Utc>>,
    pub eligible: bool,
}

impl Candidate {
    /// Deterministic coverage normalization: each fragment is trimmed and
    /// Unicode-lowercased, empties are dropped, duplicates keep their first
    /// occurrence, and the result is joined with single spaces.
    pub fn coverage_text_from<I, S>(fragments: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut folded: Vec<String> = Vec::new();
        for fragment in fragments {
            let piece = fragment.as_ref().trim().to_lowercase();
            if piece.is_empty() || folded.contains(&piece) {
                continue;
            }
            folded.push(piece);
        }
        folded.join(" ")
    }

    /// Case-insensitive substring check against the coverage text. Blank
    /// terms never match.
    pub fn covers(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        !needle.is_empty() && self.coverage_text.contains(&needle)
    }
}

/// Append-only record of a stage mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    pub lead_id: LeadId,
    pub from_stage: Option<LeadStage>,
    pub to_stage: LeadStage,
    pub actor_id: String,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Whether an assignee change was a first assignment or a handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentEventKind {
    Assigned,
    Reassigned,
}

impl AssignmentEventKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Reassigned => "reassigned",
        }
    }
}

/// Append-only record of an assignee change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentEvent {
    pub lead_id: LeadId,
    pub from_assignee: Option<CandidateId>,
    pub to_assignee: CandidateId,
    pub event_kind: AssignmentEventKind,
    pub note: Option<String>,
    pub actor_id: String,
    pub occurred_at: DateTime<Utc>,
}
