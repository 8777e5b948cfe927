use chrono::Duration;

use super::common::{candidate, fixed_now, lead_in_stage, roster, routing_config};
use crate::workflows::leads::routing::domain::{Candidate, CandidateId, LeadId, LeadStage};
use crate::workflows::leads::routing::ranking::{
    AssignmentRanker, CandidateStatsIndex, NEVER_ACTIVE_HOURS,
};

#[test]
fn coverage_normalization_is_deterministic() {
    let text = Candidate::coverage_text_from(["  Des Moines ", "DOWNTOWN", "", "des moines", "Condo"]);
    assert_eq!(text, "des moines downtown condo");
}

#[test]
fn coverage_matching_ignores_case_and_blank_terms() {
    let now = fixed_now();
    let agent = candidate("agent-ana", &["Des Moines", "Downtown"], Some(now), true);

    assert!(agent.covers("des moines"));
    assert!(agent.covers("  DOWNTOWN "));
    assert!(!agent.covers("ankeny"));
    assert!(!agent.covers("   "));
}

#[test]
fn full_coverage_and_fresh_activity_score_highest() {
    let now = fixed_now();
    let ranker = AssignmentRanker::new(&routing_config());
    let lead = lead_in_stage(LeadStage::New, now);
    let index = CandidateStatsIndex::default();

    let suggestions = ranker.suggest(&lead, &roster(now), &index, now);

    assert_eq!(suggestions.len(), 3);
    // 50 base + 20 city + 20 sector + 10 type + 10 fresh activity
    assert_eq!(suggestions[0].candidate_id, CandidateId("agent-ana".to_string()));
    assert_eq!(suggestions[0].fit_score, 110);
    // 50 base + 20 city + 5 recent activity
    assert_eq!(suggestions[1].candidate_id, CandidateId("agent-ben".to_string()));
    assert_eq!(suggestions[1].fit_score, 75);
    // 50 base, never active
    assert_eq!(suggestions[2].candidate_id, CandidateId("agent-cia".to_string()));
    assert_eq!(suggestions[2].fit_score, 50);
    assert_eq!(suggestions[2].hours_since_active, NEVER_ACTIVE_HOURS);
}

#[test]
fn ineligible_candidates_never_surface() {
    let now = fixed_now();
    let ranker = AssignmentRanker::new(&routing_config());
    let lead = lead_in_stage(LeadStage::New, now);

    let suggestions = ranker.suggest(&lead, &roster(now), &CandidateStatsIndex::default(), now);
    assert!(suggestions
        .iter()
        .all(|suggestion| suggestion.candidate_id.0 != "agent-dov"));
}

#[test]
fn shortlist_is_capped_at_three_and_sorted() {
    let now = fixed_now();
    let ranker = AssignmentRanker::new(&routing_config());
    let lead = lead_in_stage(LeadStage::New, now);

    let mut many = roster(now);
    many.push(candidate("agent-eli", &["Des Moines"], Some(now), true));
    many.push(candidate("agent-fay", &["Downtown"], Some(now), true));

    let suggestions = ranker.suggest(&lead, &many, &CandidateStatsIndex::default(), now);
    assert!(suggestions.len() <= 3);
    for pair in suggestions.windows(2) {
        assert!(pair[0].fit_score >= pair[1].fit_score);
    }
}

#[test]
fn ties_break_on_candidate_id() {
    let now = fixed_now();
    let ranker = AssignmentRanker::new(&routing_config());
    let lead = lead_in_stage(LeadStage::New, now);

    let twins = vec![
        candidate("agent-zed", &["Des Moines"], Some(now), true),
        candidate("agent-abe", &["Des Moines"], Some(now), true),
    ];

    let suggestions = ranker.suggest(&lead, &twins, &CandidateStatsIndex::default(), now);
    assert_eq!(suggestions[0].candidate_id.0, "agent-abe");
    assert_eq!(suggestions[1].candidate_id.0, "agent-zed");
    assert_eq!(suggestions[0].fit_score, suggestions[1].fit_score);
}

#[test]
fn open_assignments_drag_the_fit_score_down() {
    let now = fixed_now();
    let ranker = AssignmentRanker::new(&routing_config());
    let queue_lead = lead_in_stage(LeadStage::New, now);

    let ana = CandidateId("agent-ana".to_string());
    let mut open_a = lead_in_stage(LeadStage::Assigned, now);
    open_a.id = LeadId("lead-a".to_string());
    open_a.assigned_to = Some(ana.clone());
    let mut open_b = lead_in_stage(LeadStage::Contacted, now);
    open_b.id = LeadId("lead-b".to_string());
    open_b.assigned_to = Some(ana.clone());

    let index = CandidateStatsIndex::from_leads(&[open_a, open_b]);
    assert_eq!(index.active_load(&ana), 2);

    let suggestions = ranker.suggest(&queue_lead, &roster(now), &index, now);
    let ana_entry = suggestions
        .iter()
        .find(|suggestion| suggestion.candidate_id == ana)
        .expect("ana still ranked");
    // 110 unloaded, minus 2 * 8
    assert_eq!(ana_entry.fit_score, 94);
    assert_eq!(ana_entry.active_load, 2);
}

#[test]
fn conversion_rate_rewards_closers() {
    let now = fixed_now();
    let ben = CandidateId("agent-ben".to_string());

    let mut history = Vec::new();
    for (index, stage) in [
        LeadStage::Won,
        LeadStage::Won,
        LeadStage::Lost,
        LeadStage::Contacted,
    ]
    .into_iter()
    .enumerate()
    {
        let mut lead = lead_in_stage(stage, now);
        lead.id = LeadId(format!("lead-{index}"));
        lead.assigned_to = Some(ben.clone());
        history.push(lead);
    }

    let index = CandidateStatsIndex::from_leads(&history);
    assert_eq!(index.active_load(&ben), 1);
    assert!((index.conversion_rate(&ben) - 0.5).abs() < f32::EPSILON);

    let ranker = AssignmentRanker::new(&routing_config());
    let queue_lead = lead_in_stage(LeadStage::New, now);
    let suggestions = ranker.suggest(&queue_lead, &roster(now), &index, now);
    let ben_entry = suggestions
        .iter()
        .find(|suggestion| suggestion.candidate_id == ben)
        .expect("ben ranked");

    // 75 coverage/recency, + round(0.5 * 30) = 15, - 1 * 8 load
    assert_eq!(ben_entry.fit_score, 82);
    assert_eq!(ben_entry.conversion_rate_pct, 50);
}

#[test]
fn activity_recency_bonus_steps_at_one_and_three_days() {
    let now = fixed_now();
    let ranker = AssignmentRanker::new(&routing_config());
    let lead = lead_in_stage(LeadStage::New, now);
    let index = CandidateStatsIndex::default();

    let fresh = vec![candidate("agent-x", &[], Some(now - Duration::hours(24)), true)];
    assert_eq!(ranker.suggest(&lead, &fresh, &index, now)[0].fit_score, 60);

    let recent = vec![candidate("agent-x", &[], Some(now - Duration::hours(60)), true)];
    assert_eq!(ranker.suggest(&lead, &recent, &index, now)[0].fit_score, 55);

    let stale = vec![candidate("agent-x", &[], Some(now - Duration::hours(96)), true)];
    assert_eq!(ranker.suggest(&lead, &stale, &index, now)[0].fit_score, 50);
}
