//! Lead routing engine: lifecycle validation, SLA and escalation math,
//! urgency scoring, and assignment ranking behind one orchestrating service.

pub mod config;
pub mod domain;
pub mod ranking;
pub mod repository;
pub mod router;
pub mod service;
pub mod sla;
pub mod stage;
pub mod urgency;

#[cfg(test)]
mod tests;

pub use config::{RankingWeights, RoutingConfig};
pub use domain::{
    Actor, AssignmentEvent, AssignmentEventKind, Candidate, CandidateId, CandidateRole,
    ContactDetails, Lead, LeadId, LeadKind, LeadSource, LeadSourceKind, LeadStage, StageEvent,
};
pub use ranking::{AssignmentRanker, AssignmentSuggestion, CandidateStatsIndex};
pub use repository::{
    AssignmentNotice, CandidateDirectory, DirectoryError, LeadStore, NotificationError,
    NotificationSink, StoreError,
};
pub use router::lead_router;
pub use service::{
    CreateLeadInput, LeadRoutingError, LeadRoutingService, LeadView, QueueItem, QueueSnapshot,
    QueueStats,
};
pub use sla::{SlaBucket, SlaCalculator};
pub use stage::{LeadStageMachine, TransitionRejection};
pub use urgency::{EscalationLevel, UrgencyAssessment, UrgencyScorer};
