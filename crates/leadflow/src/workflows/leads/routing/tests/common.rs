use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::leads::routing::config::RoutingConfig;
use crate::workflows::leads::routing::domain::{
    Actor, AssignmentEvent, Candidate, CandidateId, CandidateRole, ContactDetails, Lead, LeadId,
    LeadKind, LeadSource, LeadSourceKind, LeadStage, StageEvent,
};
use crate::workflows::leads::routing::repository::{
    AssignmentNotice, CandidateDirectory, DirectoryError, LeadStore, NotificationError,
    NotificationSink, StoreError,
};
use crate::workflows::leads::routing::router::lead_router;
use crate::workflows::leads::routing::service::{CreateLeadInput, LeadRoutingService};

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 3, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn routing_config() -> RoutingConfig {
    RoutingConfig::default()
}

pub(super) fn operator() -> Actor {
    Actor {
        id: "op-441".to_string(),
        display_name: "Queue Operator".to_string(),
    }
}

pub(super) fn property_source() -> LeadSource {
    LeadSource {
        kind: LeadSourceKind::Property,
        reference: "prop-8102".to_string(),
        city: Some("Des Moines".to_string()),
        sector: Some("Downtown".to_string()),
        property_type: Some("condo".to_string()),
    }
}

pub(super) fn basic_contact() -> ContactDetails {
    ContactDetails {
        name: "Jordan Avery".to_string(),
        email: "jordan.avery@example.com".to_string(),
        phone: None,
        message: "Looking for a condo.".to_string(),
    }
}

pub(super) fn call_request_input() -> CreateLeadInput {
    CreateLeadInput {
        kind: LeadKind::CallRequest,
        source: property_source(),
        contact: basic_contact(),
    }
}

pub(super) fn lead_in_stage(stage: LeadStage, now: DateTime<Utc>) -> Lead {
    Lead {
        id: LeadId("lead-fixture".to_string()),
        kind: LeadKind::CallRequest,
        source: property_source(),
        contact: basic_contact(),
        stage,
        previous_stage: None,
        stage_changed_at: now,
        stage_changed_by: Some(operator().id),
        stage_change_reason: None,
        assigned_to: None,
        assigned_at: None,
        stage_sla_due_at: None,
        sla_reset_at: None,
        reassignment_reason: None,
        created_at: now,
        updated_at: now,
        version: 1,
    }
}

pub(super) fn candidate(
    id: &str,
    coverage: &[&str],
    last_active_at: Option<DateTime<Utc>>,
    eligible: bool,
) -> Candidate {
    Candidate {
        id: CandidateId(id.to_string()),
        display_name: id.replace('-', " "),
        organization: "Harbor Realty".to_string(),
        role: CandidateRole::Agent,
        coverage_text: Candidate::coverage_text_from(coverage.iter().copied()),
        last_active_at,
        eligible,
    }
}

/// Three eligible agents with descending coverage fit plus one disabled
/// entry that must never surface.
pub(super) fn roster(now: DateTime<Utc>) -> Vec<Candidate> {
    vec![
        candidate(
            "agent-ana",
            &["Des Moines", "Downtown", "condo", "Harbor Realty"],
            Some(now - Duration::hours(2)),
            true,
        ),
        candidate(
            "agent-ben",
            &["Des Moines", "townhome", "Harbor Realty"],
            Some(now - Duration::hours(48)),
            true,
        ),
        candidate("agent-cia", &["Ankeny", "ranch"], None, true),
        candidate(
            "agent-dov",
            &["Des Moines", "Downtown", "condo"],
            Some(now - Duration::hours(1)),
            false,
        ),
    ]
}

#[derive(Default, Clone)]
pub(super) struct MemoryLeadStore {
    leads: Arc<Mutex<HashMap<LeadId, Lead>>>,
    stage_events: Arc<Mutex<Vec<StageEvent>>>,
    assignment_events: Arc<Mutex<Vec<AssignmentEvent>>>,
}

impl MemoryLeadStore {
    pub(super) fn seed(&self, lead: Lead) {
        self.leads
            .lock()
            .expect("lead store mutex poisoned")
            .insert(lead.id.clone(), lead);
    }

    pub(super) fn stage_events_for(&self, id: &LeadId) -> Vec<StageEvent> {
        self.stage_events
            .lock()
            .expect("stage event mutex poisoned")
            .iter()
            .filter(|event| &event.lead_id == id)
            .cloned()
            .collect()
    }

    pub(super) fn assignment_events_for(&self, id: &LeadId) -> Vec<AssignmentEvent> {
        self.assignment_events
            .lock()
            .expect("assignment event mutex poisoned")
            .iter()
            .filter(|event| &event.lead_id == id)
            .cloned()
            .collect()
    }
}

impl LeadStore for MemoryLeadStore {
    fn insert(&self, lead: Lead) -> Result<Lead, StoreError> {
        let mut guard = self.leads.lock().expect("lead store mutex poisoned");
        if guard.contains_key(&lead.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(lead.id.clone(), lead.clone());
        Ok(lead)
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<Lead>, StoreError> {
        let guard = self.leads.lock().expect("lead store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, mut lead: Lead, expected_version: u64) -> Result<Lead, StoreError> {
        let mut guard = self.leads.lock().expect("lead store mutex poisoned");
        match guard.get(&lead.id) {
            None => Err(StoreError::NotFound),
            Some(stored) if stored.version != expected_version => Err(StoreError::Conflict),
            Some(_) => {
                lead.version = expected_version + 1;
                guard.insert(lead.id.clone(), lead.clone());
                Ok(lead)
            }
        }
    }

    fn query_by_stage(&self, stage: Option<LeadStage>) -> Result<Vec<Lead>, StoreError> {
        let guard = self.leads.lock().expect("lead store mutex poisoned");
        let mut leads: Vec<Lead> = guard
            .values()
            .filter(|lead| stage.map(|wanted| lead.stage == wanted).unwrap_or(true))
            .cloned()
            .collect();
        leads.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(leads)
    }

    fn append_stage_event(&self, event: StageEvent) -> Result<(), StoreError> {
        self.stage_events
            .lock()
            .expect("stage event mutex poisoned")
            .push(event);
        Ok(())
    }

    fn append_assignment_event(&self, event: AssignmentEvent) -> Result<(), StoreError> {
        self.assignment_events
            .lock()
            .expect("assignment event mutex poisoned")
            .push(event);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    candidates: Arc<Mutex<Vec<Candidate>>>,
}

impl MemoryDirectory {
    pub(super) fn with_roster(roster: Vec<Candidate>) -> Self {
        Self {
            candidates: Arc::new(Mutex::new(roster)),
        }
    }
}

impl CandidateDirectory for MemoryDirectory {
    fn list_eligible(
        &self,
        role_filter: Option<CandidateRole>,
    ) -> Result<Vec<Candidate>, DirectoryError> {
        let guard = self.candidates.lock().expect("directory mutex poisoned");
        Ok(guard
            .iter()
            .filter(|candidate| candidate.eligible)
            .filter(|candidate| role_filter.map(|role| candidate.role == role).unwrap_or(true))
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemorySink {
    notices: Arc<Mutex<Vec<AssignmentNotice>>>,
}

impl MemorySink {
    pub(super) fn notices(&self) -> Vec<AssignmentNotice> {
        self.notices.lock().expect("sink mutex poisoned").clone()
    }
}

impl NotificationSink for MemorySink {
    fn notify(
        &self,
        _candidate: &CandidateId,
        notice: AssignmentNotice,
    ) -> Result<(), NotificationError> {
        self.notices
            .lock()
            .expect("sink mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct FailingSink;

impl NotificationSink for FailingSink {
    fn notify(
        &self,
        _candidate: &CandidateId,
        _notice: AssignmentNotice,
    ) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("webhook offline".to_string()))
    }
}

/// Store that loses the version race a configurable number of times before
/// delegating to the inner memory store.
pub(super) struct RaceyLeadStore {
    inner: MemoryLeadStore,
    conflicts_remaining: AtomicU32,
}

impl RaceyLeadStore {
    pub(super) fn conflicting(inner: MemoryLeadStore, conflicts: u32) -> Self {
        Self {
            inner,
            conflicts_remaining: AtomicU32::new(conflicts),
        }
    }
}

impl LeadStore for RaceyLeadStore {
    fn insert(&self, lead: Lead) -> Result<Lead, StoreError> {
        self.inner.insert(lead)
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<Lead>, StoreError> {
        self.inner.fetch(id)
    }

    fn update(&self, lead: Lead, expected_version: u64) -> Result<Lead, StoreError> {
        let remaining = self.conflicts_remaining.load(Ordering::Acquire);
        if remaining > 0 {
            self.conflicts_remaining
                .store(remaining - 1, Ordering::Release);
            return Err(StoreError::Conflict);
        }
        self.inner.update(lead, expected_version)
    }

    fn query_by_stage(&self, stage: Option<LeadStage>) -> Result<Vec<Lead>, StoreError> {
        self.inner.query_by_stage(stage)
    }

    fn append_stage_event(&self, event: StageEvent) -> Result<(), StoreError> {
        self.inner.append_stage_event(event)
    }

    fn append_assignment_event(&self, event: AssignmentEvent) -> Result<(), StoreError> {
        self.inner.append_assignment_event(event)
    }
}

pub(super) struct UnavailableLeadStore;

impl LeadStore for UnavailableLeadStore {
    fn insert(&self, _lead: Lead) -> Result<Lead, StoreError> {
        Err(StoreError::Unavailable("lead store offline".to_string()))
    }

    fn fetch(&self, _id: &LeadId) -> Result<Option<Lead>, StoreError> {
        Err(StoreError::Unavailable("lead store offline".to_string()))
    }

    fn update(&self, _lead: Lead, _expected_version: u64) -> Result<Lead, StoreError> {
        Err(StoreError::Unavailable("lead store offline".to_string()))
    }

    fn query_by_stage(&self, _stage: Option<LeadStage>) -> Result<Vec<Lead>, StoreError> {
        Err(StoreError::Unavailable("lead store offline".to_string()))
    }

    fn append_stage_event(&self, _event: StageEvent) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("lead store offline".to_string()))
    }

    fn append_assignment_event(&self, _event: AssignmentEvent) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("lead store offline".to_string()))
    }
}

pub(super) type MemoryService = LeadRoutingService<MemoryLeadStore, MemoryDirectory, MemorySink>;

pub(super) fn build_service() -> (MemoryService, Arc<MemoryLeadStore>, Arc<MemorySink>) {
    let store = Arc::new(MemoryLeadStore::default());
    let directory = Arc::new(MemoryDirectory::with_roster(roster(fixed_now())));
    let sink = Arc::new(MemorySink::default());
    let service = LeadRoutingService::new(
        store.clone(),
        directory,
        sink.clone(),
        routing_config(),
    );
    (service, store, sink)
}

pub(super) fn lead_router_with_service(service: MemoryService) -> axum::Router {
    lead_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
