use crate::cli::ServeArgs;
use crate::infra::{
    seeded_templates, AppState, InMemoryCandidateRepository, InMemoryChecklistRepository,
    InMemoryRuleSetRepository,
};
use crate::routes::app_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use visa_rules::config::AppConfig;
use visa_rules::error::AppError;
use visa_rules::telemetry;
use visa_rules::workflows::checklist::ChecklistService;
use visa_rules::workflows::metrics::GenerationMetrics;
use visa_rules::workflows::rules::{CandidateReview, RuleStore};

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

    let store = Arc::new(RuleStore::new(Arc::new(
        InMemoryRuleSetRepository::default(),
    )));
    let checklists = Arc::new(InMemoryChecklistRepository::default());

    let review = Arc::new(CandidateReview::new(
        Arc::clone(&store),
        Arc::new(InMemoryCandidateRepository::default()),
        config.review.clone(),
    ));
    let checklist_service = Arc::new(ChecklistService::new(
        store,
        Arc::new(seeded_templates()),
        Arc::clone(&checklists),
    ));
    let generation_metrics = Arc::new(GenerationMetrics::new(checklists));

    let app = app_router(review, checklist_service, generation_metrics)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "visa rules service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
