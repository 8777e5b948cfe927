use crate::cli::ServeArgs;
use crate::infra::{
    demo_roster, routing_config_from, AppState, InMemoryCandidateDirectory, InMemoryLeadStore,
    RecordingNotificationSink,
};
use crate::routes::with_lead_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use leadflow::config::AppConfig;
use leadflow::error::AppError;
use leadflow::telemetry;
use leadflow::workflows::leads::routing::LeadRoutingService;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryLeadStore::default());
    let directory = Arc::new(InMemoryCandidateDirectory::with_roster(demo_roster(
        Utc::now(),
    )));
    let notifications = Arc::new(RecordingNotificationSink::default());
    let routing_config = routing_config_from(&config.routing);
    let routing_service = Arc::new(LeadRoutingService::new(
        store,
        directory,
        notifications,
        routing_config,
    ));

    let app = with_lead_routes(routing_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lead routing service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
