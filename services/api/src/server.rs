use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryInvigilationStore};
use crate::routes::with_invigilation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use invigil::config::AppConfig;
use invigil::error::AppError;
use invigil::telemetry;
use invigil::workflows::examination::InvigilationService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
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

    let store = Arc::new(InMemoryInvigilationStore::default());
    let service = Arc::new(InvigilationService::new(store, config.scheduling));

    let app = with_invigilation_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        change_cutoff_hours = config.scheduling.change_cutoff_hours,
        "invigilation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
