use chrono::{DateTime, Duration, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use leadflow::config::RoutingSettings;
use leadflow::workflows::leads::routing::{
    AssignmentEvent, AssignmentNotice, Candidate, CandidateDirectory, CandidateId, CandidateRole,
    DirectoryError, Lead, LeadId, LeadStage, LeadStore, NotificationError, NotificationSink,
    RoutingConfig, StageEvent, StoreError,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local lead store with compare-and-swap update semantics matching
/// the trait contract: the write succeeds only when the stored version still
/// equals the expected one, and the version is bumped on success.
#[derive(Default, Clone)]
pub(crate) struct InMemoryLeadStore {
    leads: Arc<Mutex<HashMap<LeadId, Lead>>>,
    stage_events: Arc<Mutex<Vec<StageEvent>>>,
    assignment_events: Arc<Mutex<Vec<AssignmentEvent>>>,
}

impl InMemoryLeadStore {
    pub(crate) fn stage_events(&self) -> Vec<StageEvent> {
        self.stage_events
            .lock()
            .expect("stage event mutex poisoned")
            .clone()
    }

    pub(crate) fn assignment_events(&self) -> Vec<AssignmentEvent> {
        self.assignment_events
            .lock()
            .expect("assignment event mutex poisoned")
            .clone()
    }
}

impl LeadStore for InMemoryLeadStore {
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
pub(crate) struct InMemoryCandidateDirectory {
    candidates: Arc<Mutex<Vec<Candidate>>>,
}

impl InMemoryCandidateDirectory {
    pub(crate) fn with_roster(roster: Vec<Candidate>) -> Self {
        Self {
            candidates: Arc::new(Mutex::new(roster)),
        }
    }
}

impl CandidateDirectory for InMemoryCandidateDirectory {
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

/// Sink that records notices so the demo can show what was dispatched. A real
/// deployment would push to the messaging fabric instead.
#[derive(Default, Clone)]
pub(crate) struct RecordingNotificationSink {
    notices: Arc<Mutex<Vec<AssignmentNotice>>>,
}

impl RecordingNotificationSink {
    pub(crate) fn notices(&self) -> Vec<AssignmentNotice> {
        self.notices.lock().expect("sink mutex poisoned").clone()
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn notify(
        &self,
        candidate: &CandidateId,
        notice: AssignmentNotice,
    ) -> Result<(), NotificationError> {
        tracing::info!(candidate = %candidate.0, template = %notice.template, "assignment notice dispatched");
        self.notices
            .lock()
            .expect("sink mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(crate) fn routing_config_from(settings: &RoutingSettings) -> RoutingConfig {
    RoutingConfig::new(settings.escalation_window_hours)
}

/// Seeded roster used by `serve` and the demo commands until a directory
/// integration replaces it.
pub(crate) fn demo_roster(now: DateTime<Utc>) -> Vec<Candidate> {
    let coverage = |fragments: &[&str]| Candidate::coverage_text_from(fragments.iter().copied());
    vec![
        Candidate {
            id: CandidateId("agent-ana".to_string()),
            display_name: "Ana Duarte".to_string(),
            organization: "Harbor Realty".to_string(),
            role: CandidateRole::Agent,
            coverage_text: coverage(&["Des Moines", "Downtown", "condo", "Harbor Realty"]),
            last_active_at: Some(now - Duration::hours(2)),
            eligible: true,
        },
        Candidate {
            id: CandidateId("agent-ben".to_string()),
            display_name: "Ben Okafor".to_string(),
            organization: "Harbor Realty".to_string(),
            role: CandidateRole::Agent,
            coverage_text: coverage(&["Des Moines", "East Village", "townhome", "Harbor Realty"]),
            last_active_at: Some(now - Duration::hours(40)),
            eligible: true,
        },
        Candidate {
            id: CandidateId("agent-cia".to_string()),
            display_name: "Cia Mwangi".to_string(),
            organization: "Prairie Brokers".to_string(),
            role: CandidateRole::Broker,
            coverage_text: coverage(&["Ankeny", "ranch", "Prairie Brokers"]),
            last_active_at: None,
            eligible: true,
        },
        Candidate {
            id: CandidateId("agent-dov".to_string()),
            display_name: "Dov Feld".to_string(),
            organization: "Prairie Brokers".to_string(),
            role: CandidateRole::Broker,
            coverage_text: coverage(&["Des Moines", "Downtown", "condo"]),
            last_active_at: Some(now - Duration::hours(1)),
            eligible: false,
        },
    ]
}

pub(crate) fn parse_stage(raw: &str) -> Result<LeadStage, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "new" => Ok(LeadStage::New),
        "assigned" => Ok(LeadStage::Assigned),
        "contacted" => Ok(LeadStage::Contacted),
        "won" => Ok(LeadStage::Won),
        "lost" => Ok(LeadStage::Lost),
        "archived" => Ok(LeadStage::Archived),
        other => Err(format!(
            "unknown stage '{other}' (expected new, assigned, contacted, won, lost, or archived)"
        )),
    }
}

pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}
