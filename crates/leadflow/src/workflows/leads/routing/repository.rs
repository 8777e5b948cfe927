use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    AssignmentEvent, Candidate, CandidateId, CandidateRole, Lead, LeadId, LeadStage, StageEvent,
};

/// Storage abstraction over the authoritative lead store.
///
/// Single-document reads and writes are strongly consistent. `update` is a
/// compare-and-swap on the lead version: the write succeeds only when the
/// stored version still equals `expected_version`, and the store bumps the
/// version on success.
pub trait LeadStore: Send + Sync {
    fn insert(&self, lead: Lead) -> Result<Lead, StoreError>;
    fn fetch(&self, id: &LeadId) -> Result<Option<Lead>, StoreError>;
    fn update(&self, lead: Lead, expected_version: u64) -> Result<Lead, StoreError>;
    fn query_by_stage(&self, stage: Option<LeadStage>) -> Result<Vec<Lead>, StoreError>;
    fn append_stage_event(&self, event: StageEvent) -> Result<(), StoreError>;
    fn append_assignment_event(&self, event: AssignmentEvent) -> Result<(), StoreError>;
}

/// Error enumeration for lead-store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("lead already exists or lost the version race")]
    Conflict,
    #[error("lead not found")]
    NotFound,
    #[error("lead store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only roster of assignable agents. Eventual consistency is acceptable
/// here; rankings are soft recommendations, not hard guarantees.
pub trait CandidateDirectory: Send + Sync {
    fn list_eligible(
        &self,
        role_filter: Option<CandidateRole>,
    ) -> Result<Vec<Candidate>, DirectoryError>;
}

/// Error enumeration for directory failures.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("candidate directory unavailable: {0}")]
    Unavailable(String),
}

/// Fire-and-forget announcement channel for assignments. Failures must never
/// roll back the authoritative write; the service logs and moves on.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, candidate: &CandidateId, notice: AssignmentNotice)
        -> Result<(), NotificationError>;
}

/// Payload describing a new or changed assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentNotice {
    pub template: String,
    pub lead_id: LeadId,
    pub candidate_id: CandidateId,
    pub occurred_at: DateTime<Utc>,
    pub details: BTreeMap<String, String>,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
