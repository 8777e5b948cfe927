use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::{RankingWeights, RoutingConfig};
use super::domain::{Candidate, CandidateId, Lead, LeadStage};

/// Hours-since-active sentinel for candidates with no recorded activity.
pub const NEVER_ACTIVE_HOURS: i64 = 999;

const SHORTLIST_LIMIT: usize = 3;
const FRESH_ACTIVITY_HOURS: i64 = 24;
const RECENT_ACTIVITY_HOURS: i64 = 72;

#[derive(Debug, Clone, Copy, Default)]
struct CandidateTally {
    active_load: u32,
    won: u32,
    total_assigned: u32,
}

/// Per-candidate workload and conversion tallies, built once per queue pass
/// from the full lead snapshot rather than recomputed per suggestion call.
#[derive(Debug, Clone, Default)]
pub struct CandidateStatsIndex {
    tallies: BTreeMap<CandidateId, CandidateTally>,
}

impl CandidateStatsIndex {
    /// Open assignments count toward load; every currently-assigned lead,
    /// terminal ones included, counts toward the conversion base.
    pub fn from_leads(leads: &[Lead]) -> Self {
        let mut tallies: BTreeMap<CandidateId, CandidateTally> = BTreeMap::new();
        for lead in leads {
            let assignee = match &lead.assigned_to {
                Some(assignee) => assignee,
                None => continue,
            };
            let tally = tallies.entry(assignee.clone()).or_default();
            tally.total_assigned += 1;
            match lead.stage {
                LeadStage::Assigned | LeadStage::Contacted => tally.active_load += 1,
                LeadStage::Won => tally.won += 1,
                _ => {}
            }
        }
        Self { tallies }
    }

    /// Leads currently sitting with the candidate in `assigned` or
    /// `contacted`.
    pub fn active_load(&self, candidate: &CandidateId) -> u32 {
        self.tallies
            .get(candidate)
            .map(|tally| tally.active_load)
            .unwrap_or(0)
    }

    /// `won / total_ever_assigned`, zero for candidates never assigned.
    pub fn conversion_rate(&self, candidate: &CandidateId) -> f32 {
        match self.tallies.get(candidate) {
            Some(tally) if tally.total_assigned > 0 => {
                tally.won as f32 / tally.total_assigned as f32
            }
            _ => 0.0,
        }
    }
}

/// One ranked shortlist entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSuggestion {
    pub candidate_id: CandidateId,
    pub fit_score: i32,
    pub active_load: u32,
    pub conversion_rate_pct: u8,
    pub hours_since_active: i64,
}

/// Ranks eligible candidates for a lead with the configured weight table.
/// Read-only and deterministic given its inputs.
#[derive(Debug, Clone)]
pub struct AssignmentRanker {
    weights: RankingWeights,
}

impl AssignmentRanker {
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            weights: config.ranking.clone(),
        }
    }

    /// Shortlist of at most three candidates, sorted by descending fit with a
    /// stable tie-break on candidate id. Ineligible candidates never score.
    pub fn suggest(
        &self,
        lead: &Lead,
        candidates: &[Candidate],
        stats: &CandidateStatsIndex,
        now: DateTime<Utc>,
    ) -> Vec<AssignmentSuggestion> {
        let mut ranked: Vec<AssignmentSuggestion> = candidates
            .iter()
            .filter(|candidate| candidate.eligible)
            .map(|candidate| self.score_candidate(lead, candidate, stats, now))
            .collect();

        ranked.sort_by(|a, b| {
            b.fit_score
                .cmp(&a.fit_score)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });
        ranked.truncate(SHORTLIST_LIMIT);
        ranked
    }

    fn score_candidate(
        &self,
        lead: &Lead,
        candidate: &Candidate,
        stats: &CandidateStatsIndex,
        now: DateTime<Utc>,
    ) -> AssignmentSuggestion {
        let weights = &self.weights;
        let mut fit = weights.base;

        if let Some(city) = &lead.source.city {
            if candidate.covers(city) {
                fit += weights.city_match;
            }
        }
        if let Some(sector) = &lead.source.sector {
            if candidate.covers(sector) {
                fit += weights.sector_match;
            }
        }
        if let Some(property_type) = &lead.source.property_type {
            if candidate.covers(property_type) {
                fit += weights.property_type_match;
            }
        }

        let conversion_rate = stats.conversion_rate(&candidate.id);
        fit += (conversion_rate * weights.conversion_scale).round() as i32;

        let hours_since_active = candidate
            .last_active_at
            .map(|at| now.signed_duration_since(at).num_hours().max(0))
            .unwrap_or(NEVER_ACTIVE_HOURS);
        if hours_since_active <= FRESH_ACTIVITY_HOURS {
            fit += weights.fresh_activity_bonus;
        } else if hours_since_active <= RECENT_ACTIVITY_HOURS {
            fit += weights.recent_activity_bonus;
        }

        let active_load = stats.active_load(&candidate.id);
        fit -= active_load as i32 * weights.load_penalty;

        AssignmentSuggestion {
            candidate_id: candidate.id.clone(),
            fit_score: fit,
            active_load,
            conversion_rate_pct: (conversion_rate * 100.0).round() as u8,
            hours_since_active,
        }
    }
}
