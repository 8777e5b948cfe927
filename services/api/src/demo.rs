use crate::infra::{
    demo_roster, parse_instant, parse_stage, InMemoryCandidateDirectory, InMemoryLeadStore,
    RecordingNotificationSink,
};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use std::sync::Arc;

use leadflow::error::AppError;
use leadflow::workflows::leads::routing::{
    Actor, CandidateId, ContactDetails, CreateLeadInput, LeadId, LeadKind, LeadRoutingService,
    LeadSource, LeadSourceKind, LeadStage, QueueSnapshot, RoutingConfig,
};

#[derive(Args, Debug, Default)]
pub(crate) struct QueueReportArgs {
    /// Stage filter (new, assigned, contacted, won, lost, archived)
    #[arg(long, value_parser = parse_stage)]
    pub(crate) stage: Option<LeadStage>,
    /// Override the evaluation instant (RFC 3339). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) now: Option<DateTime<Utc>>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the evaluation instant (RFC 3339). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Skip the assignment and lifecycle portion of the demo.
    #[arg(long)]
    pub(crate) queue_only: bool,
}

type DemoService =
    LeadRoutingService<InMemoryLeadStore, InMemoryCandidateDirectory, RecordingNotificationSink>;

fn demo_operator() -> Actor {
    Actor {
        id: "op-demo".to_string(),
        display_name: "Demo Operator".to_string(),
    }
}

fn demo_service(
    now: DateTime<Utc>,
) -> (
    DemoService,
    Arc<InMemoryLeadStore>,
    Arc<RecordingNotificationSink>,
) {
    let store = Arc::new(InMemoryLeadStore::default());
    let directory = Arc::new(InMemoryCandidateDirectory::with_roster(demo_roster(now)));
    let sink = Arc::new(RecordingNotificationSink::default());
    let service = LeadRoutingService::new(
        store.clone(),
        directory,
        sink.clone(),
        RoutingConfig::default(),
    );
    (service, store, sink)
}

/// Seed a small spread of inquiries at different ages so every SLA bucket
/// and escalation level shows up in the report.
fn seed_demo_leads(service: &DemoService, now: DateTime<Utc>) -> Result<Vec<LeadId>, AppError> {
    let operator = demo_operator();
    let mut ids = Vec::new();

    let aging_call = CreateLeadInput {
        kind: LeadKind::CallRequest,
        source: LeadSource {
            kind: LeadSourceKind::Property,
            reference: "prop-8102".to_string(),
            city: Some("Des Moines".to_string()),
            sector: Some("Downtown".to_string()),
            property_type: Some("condo".to_string()),
        },
        contact: ContactDetails {
            name: "Jordan Avery".to_string(),
            email: "jordan.avery@example.com".to_string(),
            phone: None,
            message: "Looking for a condo.".to_string(),
        },
    };
    ids.push(
        service
            .create_lead(aging_call, &operator, now - Duration::hours(3))?
            .id,
    );

    let fresh_showing = CreateLeadInput {
        kind: LeadKind::ShowingRequest,
        source: LeadSource {
            kind: LeadSourceKind::Property,
            reference: "prop-2207".to_string(),
            city: Some("Des Moines".to_string()),
            sector: Some("East Village".to_string()),
            property_type: Some("townhome".to_string()),
        },
        contact: ContactDetails {
            name: "Priya Nair".to_string(),
            email: "priya.nair@example.com".to_string(),
            phone: Some("+1 515 555 0144".to_string()),
            message: "Could we tour this Saturday morning? Pre-approved and ready.".to_string(),
        },
    };
    ids.push(
        service
            .create_lead(fresh_showing, &operator, now - Duration::minutes(30))?
            .id,
    );

    let stale_info = CreateLeadInput {
        kind: LeadKind::InfoRequest,
        source: LeadSource {
            kind: LeadSourceKind::Project,
            reference: "proj-ankeny-44".to_string(),
            city: Some("Ankeny".to_string()),
            sector: None,
            property_type: Some("ranch".to_string()),
        },
        contact: ContactDetails {
            name: "Sam Whitfield".to_string(),
            email: "sam.whitfield@example.com".to_string(),
            phone: None,
            message: "Price list please.".to_string(),
        },
    };
    ids.push(
        service
            .create_lead(stale_info, &operator, now - Duration::hours(7))?
            .id,
    );

    Ok(ids)
}

fn render_queue(snapshot: &QueueSnapshot) {
    println!(
        "Queue: {} lead(s) | green {} / yellow {} / red {} | {} escalated | mean urgency {:.1}",
        snapshot.items.len(),
        snapshot.stats.green,
        snapshot.stats.yellow,
        snapshot.stats.red,
        snapshot.stats.escalated,
        snapshot.stats.mean_urgency
    );

    for item in &snapshot.items {
        println!(
            "- {} | {} | {} | urgency {} | sla {} | escalation {} | age {:.1}h",
            item.lead.id.0,
            item.lead.kind.label(),
            item.lead.stage,
            item.urgency,
            item.sla_bucket.label(),
            item.escalation.label(),
            item.age_hours
        );
        for suggestion in &item.suggestions {
            println!(
                "    suggest {} (fit {}, load {}, conversion {}%, active {}h ago)",
                suggestion.candidate_id.0,
                suggestion.fit_score,
                suggestion.active_load,
                suggestion.conversion_rate_pct,
                suggestion.hours_since_active
            );
        }
    }
}

pub(crate) fn run_queue_report(args: QueueReportArgs) -> Result<(), AppError> {
    let QueueReportArgs { stage, now } = args;
    let now = now.unwrap_or_else(Utc::now);

    let (service, _, _) = demo_service(now);
    seed_demo_leads(&service, now)?;

    println!("Lead queue report (seeded demo data, evaluated {now})");
    if let Some(stage) = stage {
        println!("Stage filter: {stage}");
    }

    let snapshot = service.list_queue(stage, now)?;
    render_queue(&snapshot);

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { now, queue_only } = args;
    let now = now.unwrap_or_else(Utc::now);
    let operator = demo_operator();

    println!("Lead routing demo (evaluated {now})");
    let (service, store, sink) = demo_service(now);
    let ids = seed_demo_leads(&service, now)?;

    println!("\nIntake queue");
    let snapshot = service.list_queue(None, now)?;
    render_queue(&snapshot);

    if queue_only {
        return Ok(());
    }

    let showing_lead = ids[1].clone();
    let ana = CandidateId("agent-ana".to_string());
    let ben = CandidateId("agent-ben".to_string());

    println!("\nAssignment walkthrough");
    let assigned = service.assign(&showing_lead, &ana, &operator, None, now)?;
    println!(
        "- {} assigned to {} (stage {}, SLA due {:?})",
        assigned.id.0,
        ana.0,
        assigned.stage,
        assigned.stage_sla_due_at
    );

    match service.assign(&showing_lead, &ben, &operator, None, now) {
        Err(err) => println!("- handoff without a note rejected: {err}"),
        Ok(_) => println!("- unexpected: handoff accepted without a note"),
    }

    let reassigned = service.assign(
        &showing_lead,
        &ben,
        &operator,
        Some("ana is double-booked this weekend"),
        now + Duration::minutes(10),
    )?;
    println!(
        "- {} handed off to {} (reason: {})",
        reassigned.id.0,
        ben.0,
        reassigned
            .reassignment_reason
            .as_deref()
            .unwrap_or("none recorded")
    );

    println!("\nLifecycle walkthrough");
    match service.transition(&showing_lead, LeadStage::Won, &operator, None, now) {
        Err(err) => println!("- jump straight to won rejected: {err}"),
        Ok(_) => println!("- unexpected: stage jump accepted"),
    }

    let contacted = service.transition(
        &showing_lead,
        LeadStage::Contacted,
        &operator,
        Some("toured the unit"),
        now + Duration::hours(1),
    )?;
    println!("- {} moved to {}", contacted.id.0, contacted.stage);

    let won = service.transition(
        &showing_lead,
        LeadStage::Won,
        &operator,
        Some("lease signed"),
        now + Duration::hours(4),
    )?;
    println!("- {} closed as {}", won.id.0, won.stage);

    println!("\nAudit trail for {}", showing_lead.0);
    for event in store.stage_events() {
        if event.lead_id != showing_lead {
            continue;
        }
        let from = event
            .from_stage
            .map(|stage| stage.label())
            .unwrap_or("(intake)");
        println!(
            "- stage {} -> {} by {} ({})",
            from,
            event.to_stage,
            event.actor_id,
            event.reason.as_deref().unwrap_or("no reason recorded")
        );
    }
    for event in store.assignment_events() {
        if event.lead_id != showing_lead {
            continue;
        }
        let from = event
            .from_assignee
            .as_ref()
            .map(|candidate| candidate.0.as_str())
            .unwrap_or("(unassigned)");
        println!(
            "- {} {} -> {} ({})",
            event.event_kind.label(),
            from,
            event.to_assignee.0,
            event.note.as_deref().unwrap_or("no note")
        );
    }

    let notices = sink.notices();
    if notices.is_empty() {
        println!("\nNotifications: none dispatched");
    } else {
        println!("\nNotifications");
        for notice in notices {
            println!(
                "- template={} lead={} candidate={}",
                notice.template, notice.lead_id.0, notice.candidate_id.0
            );
        }
    }

    println!("\nClosing queue state");
    let closing = service.list_queue(None, now + Duration::hours(4))?;
    render_queue(&closing);

    Ok(())
}
