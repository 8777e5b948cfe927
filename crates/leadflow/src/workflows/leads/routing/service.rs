use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::config::RoutingConfig;
use super::domain::{
    Actor, AssignmentEvent, AssignmentEventKind, Candidate, CandidateId, ContactDetails, Lead,
    LeadId, LeadKind, LeadSource, LeadStage, StageEvent,
};
use super::ranking::{AssignmentRanker, AssignmentSuggestion, CandidateStatsIndex};
use super::repository::{
    AssignmentNotice, CandidateDirectory, DirectoryError, LeadStore, NotificationSink, StoreError,
};
use super::sla::{SlaBucket, SlaCalculator};
use super::stage::{LeadStageMachine, TransitionRejection};
use super::urgency::{EscalationLevel, UrgencyScorer};

/// Intake payload for a new lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeadInput {
    #[serde(default)]
    pub kind: LeadKind,
    pub source: LeadSource,
    pub contact: ContactDetails,
}

/// Error taxonomy surfaced unchanged to callers. Client-error variants are
/// never retried by the engine; `conflict` gets one automatic retry inside
/// the mutating operations before it reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum LeadRoutingError {
    #[error("invalid lead payload: {0}")]
    Validation(String),
    #[error("lead or candidate not found")]
    NotFound,
    #[error("lead is in a terminal stage and can no longer change")]
    TerminalStage,
    #[error("stage {requested} is not reachable from {current}")]
    InvalidTransition {
        current: LeadStage,
        requested: LeadStage,
    },
    #[error("reassigning a lead to a different agent requires a reason")]
    ReasonRequired,
    #[error("concurrent update lost the version race")]
    Conflict,
    #[error("downstream dependency unavailable: {0}")]
    Unavailable(String),
}

impl LeadRoutingError {
    /// Stable wire code for API payloads.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound => "not_found",
            Self::TerminalStage => "terminal_stage",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::ReasonRequired => "reason_required",
            Self::Conflict => "conflict",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

impl From<StoreError> for LeadRoutingError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict => Self::Conflict,
            StoreError::NotFound => Self::NotFound,
            StoreError::Unavailable(detail) => Self::Unavailable(detail),
        }
    }
}

impl From<DirectoryError> for LeadRoutingError {
    fn from(value: DirectoryError) -> Self {
        match value {
            DirectoryError::Unavailable(detail) => Self::Unavailable(detail),
        }
    }
}

/// Serialized view of a lead. The legacy status string is derived here and
/// never stored; contact details beyond the name stay out of responses.
#[derive(Debug, Clone, Serialize)]
pub struct LeadView {
    pub id: LeadId,
    pub kind: LeadKind,
    pub stage: LeadStage,
    pub legacy_status: &'static str,
    pub source: LeadSource,
    pub contact_name: String,
    pub assigned_to: Option<CandidateId>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub stage_changed_at: DateTime<Utc>,
    pub stage_sla_due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn view(&self) -> LeadView {
        LeadView {
            id: self.id.clone(),
            kind: self.kind,
            stage: self.stage,
            legacy_status: self.stage.legacy_status(),
            source: self.source.clone(),
            contact_name: self.contact.name.clone(),
            assigned_to: self.assigned_to.clone(),
            assigned_at: self.assigned_at,
            stage_changed_at: self.stage_changed_at,
            stage_sla_due_at: self.stage_sla_due_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// One prioritized queue entry.
#[derive(Debug, Clone, Serialize)]
pub struct QueueItem {
    pub lead: LeadView,
    pub age_hours: f64,
    pub urgency: u8,
    pub escalation: EscalationLevel,
    pub sla_bucket: SlaBucket,
    pub suggestions: Vec<AssignmentSuggestion>,
}

/// Aggregates over the returned queue slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStats {
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
    pub escalated: usize,
    pub mean_urgency: f64,
}

impl QueueStats {
    fn aggregate(items: &[QueueItem]) -> Self {
        let mut green = 0;
        let mut yellow = 0;
        let mut red = 0;
        let mut escalated = 0;
        for item in items {
            match item.sla_bucket {
                SlaBucket::Green => green += 1,
                SlaBucket::Yellow => yellow += 1,
                SlaBucket::Red => red += 1,
            }
            if item.escalation.is_escalated() {
                escalated += 1;
            }
        }

        let mean_urgency = if items.is_empty() {
            0.0
        } else {
            items.iter().map(|item| item.urgency as f64).sum::<f64>() / items.len() as f64
        };

        Self {
            green,
            yellow,
            red,
            escalated,
            mean_urgency,
        }
    }
}

/// Prioritized queue snapshot for operator tooling.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub stats: QueueStats,
    pub items: Vec<QueueItem>,
}

static LEAD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_lead_id() -> LeadId {
    let id = LEAD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LeadId(format!("lead-{id:06}"))
}

fn normalize_reason(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|reason| !reason.is_empty())
        .map(str::to_string)
}

fn sanitize_contact(contact: ContactDetails) -> Result<ContactDetails, LeadRoutingError> {
    let name = contact.name.trim().to_string();
    if name.is_empty() {
        return Err(LeadRoutingError::Validation(
            "contact name must not be empty".to_string(),
        ));
    }

    let email = contact.email.trim().to_string();
    if email.is_empty() {
        return Err(LeadRoutingError::Validation(
            "contact email must not be empty".to_string(),
        ));
    }

    let phone = contact.phone.and_then(|phone| {
        let trimmed = phone.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    });

    Ok(ContactDetails {
        name,
        email,
        phone,
        message: contact.message,
    })
}

/// What an accepted assignment will write, computed against a fresh read so
/// the compare-and-swap retry can re-derive it.
struct AssignmentPlan {
    lead: Lead,
    from_stage: LeadStage,
    from_assignee: Option<CandidateId>,
    to_assignee: CandidateId,
    event_kind: AssignmentEventKind,
    assignee_changed: bool,
    note: Option<String>,
}

/// Orchestrator composing the stage machine, SLA calculator, urgency scorer,
/// and assignment ranker over the external collaborators.
pub struct LeadRoutingService<S, D, N> {
    store: Arc<S>,
    directory: Arc<D>,
    notifications: Arc<N>,
    sla: SlaCalculator,
    scorer: UrgencyScorer,
    ranker: AssignmentRanker,
}

impl<S, D, N> LeadRoutingService<S, D, N>
where
    S: LeadStore + 'static,
    D: CandidateDirectory + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(
        store: Arc<S>,
        directory: Arc<D>,
        notifications: Arc<N>,
        config: RoutingConfig,
    ) -> Self {
        let sla = SlaCalculator::new(&config);
        let scorer = UrgencyScorer::new(&config);
        let ranker = AssignmentRanker::new(&config);

        Self {
            store,
            directory,
            notifications,
            sla,
            scorer,
            ranker,
        }
    }

    /// Create a lead in stage `new` and open its audit trail.
    pub fn create_lead(
        &self,
        input: CreateLeadInput,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Lead, LeadRoutingError> {
        let contact = sanitize_contact(input.contact)?;
        if input.source.reference.trim().is_empty() {
            return Err(LeadRoutingError::Validation(
                "lead source reference must not be empty".to_string(),
            ));
        }

        let lead = Lead {
            id: next_lead_id(),
            kind: input.kind,
            source: input.source,
            contact,
            stage: LeadStage::New,
            previous_stage: None,
            stage_changed_at: now,
            stage_changed_by: Some(actor.id.clone()),
            stage_change_reason: None,
            assigned_to: None,
            assigned_at: None,
            stage_sla_due_at: self.sla.due_at(LeadStage::New, now),
            sla_reset_at: None,
            reassignment_reason: None,
            created_at: now,
            updated_at: now,
            version: 1,
        };

        let stored = self.store.insert(lead)?;
        self.store.append_stage_event(StageEvent {
            lead_id: stored.id.clone(),
            from_stage: None,
            to_stage: LeadStage::New,
            actor_id: actor.id.clone(),
            reason: None,
            occurred_at: now,
        })?;

        Ok(stored)
    }

    /// Assign or reassign a lead. The SLA clock restarts, and a change
    /// between two different agents requires a non-empty note. The
    /// notification at the end is fire-and-forget.
    pub fn assign(
        &self,
        lead_id: &LeadId,
        candidate_id: &CandidateId,
        actor: &Actor,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Lead, LeadRoutingError> {
        let roster = self.directory.list_eligible(None)?;
        if !roster.iter().any(|candidate| &candidate.id == candidate_id) {
            return Err(LeadRoutingError::NotFound);
        }

        let note = normalize_reason(note);

        let mut retried = false;
        loop {
            let current = self
                .store
                .fetch(lead_id)?
                .ok_or(LeadRoutingError::NotFound)?;
            let plan = self.plan_assignment(&current, candidate_id, actor, &note, now)?;

            match self.store.update(plan.lead.clone(), current.version) {
                Ok(stored) => {
                    self.append_assignment_audit(&stored, &plan, actor, now)?;
                    self.announce_assignment(&stored, &plan, now);
                    return Ok(stored);
                }
                Err(StoreError::Conflict) if !retried => {
                    retried = true;
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    fn plan_assignment(
        &self,
        current: &Lead,
        candidate_id: &CandidateId,
        actor: &Actor,
        note: &Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AssignmentPlan, LeadRoutingError> {
        if current.stage.is_terminal() {
            return Err(LeadRoutingError::TerminalStage);
        }

        let reassignment = current
            .assigned_to
            .as_ref()
            .map(|existing| existing != candidate_id)
            .unwrap_or(false);
        if reassignment && note.is_none() {
            return Err(LeadRoutingError::ReasonRequired);
        }

        // Always a no-op or new -> assigned, but the machine still gets the
        // final say so the invariant lives in one place.
        let requested = if current.stage == LeadStage::New {
            LeadStage::Assigned
        } else {
            current.stage
        };
        let next_stage = Self::validated(current.stage, requested)?;

        let assignee_changed = current.assigned_to.as_ref() != Some(candidate_id);
        let event_kind = if current.assigned_to.is_none() {
            AssignmentEventKind::Assigned
        } else {
            AssignmentEventKind::Reassigned
        };

        let mut lead = current.clone();
        if next_stage != lead.stage {
            lead.previous_stage = Some(lead.stage);
            lead.stage = next_stage;
        }
        lead.stage_changed_at = now;
        lead.stage_changed_by = Some(actor.id.clone());
        lead.stage_change_reason = note.clone();
        lead.assigned_to = Some(candidate_id.clone());
        lead.assigned_at = Some(now);
        lead.stage_sla_due_at = self.sla.due_at(next_stage, now);
        if reassignment {
            lead.sla_reset_at = Some(now);
            lead.reassignment_reason = note.clone();
        }
        lead.updated_at = now;

        Ok(AssignmentPlan {
            lead,
            from_stage: current.stage,
            from_assignee: current.assigned_to.clone(),
            to_assignee: candidate_id.clone(),
            event_kind,
            assignee_changed,
            note: note.clone(),
        })
    }

    fn append_assignment_audit(
        &self,
        stored: &Lead,
        plan: &AssignmentPlan,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), LeadRoutingError> {
        self.store.append_stage_event(StageEvent {
            lead_id: stored.id.clone(),
            from_stage: Some(plan.from_stage),
            to_stage: stored.stage,
            actor_id: actor.id.clone(),
            reason: plan.note.clone(),
            occurred_at: now,
        })?;

        if plan.assignee_changed {
            self.store.append_assignment_event(AssignmentEvent {
                lead_id: stored.id.clone(),
                from_assignee: plan.from_assignee.clone(),
                to_assignee: plan.to_assignee.clone(),
                event_kind: plan.event_kind,
                note: plan.note.clone(),
                actor_id: actor.id.clone(),
                occurred_at: now,
            })?;
        }

        Ok(())
    }

    fn announce_assignment(&self, stored: &Lead, plan: &AssignmentPlan, now: DateTime<Utc>) {
        if !plan.assignee_changed {
            return;
        }

        let template = match plan.event_kind {
            AssignmentEventKind::Assigned => "lead_assigned",
            AssignmentEventKind::Reassigned => "lead_reassigned",
        };

        let mut details = BTreeMap::new();
        details.insert("stage".to_string(), stored.stage.label().to_string());
        details.insert("contact".to_string(), stored.contact.name.clone());
        if let Some(note) = &plan.note {
            details.insert("note".to_string(), note.clone());
        }

        let notice = AssignmentNotice {
            template: template.to_string(),
            lead_id: stored.id.clone(),
            candidate_id: plan.to_assignee.clone(),
            occurred_at: now,
            details,
        };

        if let Err(error) = self.notifications.notify(&plan.to_assignee, notice) {
            warn!(
                lead = %stored.id.0,
                candidate = %plan.to_assignee.0,
                %error,
                "assignment notification failed"
            );
        }
    }

    /// Move a lead through the lifecycle graph, auditing the change. No-op
    /// requests (`requested == current stage`) are accepted and still
    /// audited, so the log reflects operator intent.
    pub fn transition(
        &self,
        lead_id: &LeadId,
        requested: LeadStage,
        actor: &Actor,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Lead, LeadRoutingError> {
        let reason = normalize_reason(reason);

        let mut retried = false;
        loop {
            let current = self
                .store
                .fetch(lead_id)?
                .ok_or(LeadRoutingError::NotFound)?;
            let next_stage = Self::validated(current.stage, requested)?;

            let mut lead = current.clone();
            if next_stage != lead.stage {
                lead.previous_stage = Some(lead.stage);
                lead.stage = next_stage;
            }
            lead.stage_changed_at = now;
            lead.stage_changed_by = Some(actor.id.clone());
            lead.stage_change_reason = reason.clone();
            lead.stage_sla_due_at = self.sla.due_at(next_stage, now);
            lead.updated_at = now;

            match self.store.update(lead, current.version) {
                Ok(stored) => {
                    self.store.append_stage_event(StageEvent {
                        lead_id: stored.id.clone(),
                        from_stage: Some(current.stage),
                        to_stage: stored.stage,
                        actor_id: actor.id.clone(),
                        reason: reason.clone(),
                        occurred_at: now,
                    })?;
                    return Ok(stored);
                }
                Err(StoreError::Conflict) if !retried => {
                    retried = true;
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Read-only snapshot of the prioritized queue. One full read of the
    /// lead set and the eligible roster, then pure per-lead computation;
    /// no further round trips.
    pub fn list_queue(
        &self,
        filter_stage: Option<LeadStage>,
        now: DateTime<Utc>,
    ) -> Result<QueueSnapshot, LeadRoutingError> {
        let all = self.store.query_by_stage(None)?;
        let roster = self.directory.list_eligible(None)?;
        let stats_index = CandidateStatsIndex::from_leads(&all);

        let mut items: Vec<QueueItem> = all
            .into_iter()
            .filter(|lead| {
                filter_stage
                    .map(|stage| lead.stage == stage)
                    .unwrap_or(true)
            })
            .map(|lead| self.queue_item(lead, &roster, &stats_index, now))
            .collect();

        items.sort_by(|a, b| {
            b.urgency
                .cmp(&a.urgency)
                .then_with(|| a.lead.id.cmp(&b.lead.id))
        });

        let stats = QueueStats::aggregate(&items);
        Ok(QueueSnapshot { stats, items })
    }

    fn queue_item(
        &self,
        lead: Lead,
        roster: &[Candidate],
        stats_index: &CandidateStatsIndex,
        now: DateTime<Utc>,
    ) -> QueueItem {
        let elapsed = lead.stage_elapsed(now);
        let age_hours = lead.stage_age_hours(now);
        let assessment = self.scorer.score(&lead, age_hours);
        let sla_bucket = SlaCalculator::bucket(elapsed);
        let suggestions = self.ranker.suggest(&lead, roster, stats_index, now);

        QueueItem {
            age_hours,
            urgency: assessment.urgency,
            escalation: assessment.escalation,
            sla_bucket,
            suggestions,
            lead: lead.view(),
        }
    }

    fn validated(
        current: LeadStage,
        requested: LeadStage,
    ) -> Result<LeadStage, LeadRoutingError> {
        LeadStageMachine::validate_transition(current, requested).map_err(|rejection| {
            match rejection {
                TransitionRejection::TerminalStage => LeadRoutingError::TerminalStage,
                TransitionRejection::InvalidTransition => LeadRoutingError::InvalidTransition {
                    current,
                    requested,
                },
            }
        })
    }
}
