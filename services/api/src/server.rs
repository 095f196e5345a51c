use crate::cli::ServeArgs;
use crate::infra::{census_service, AppState};
use crate::routes::with_discharge_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use discharge_orchestrator::config::AppConfig;
use discharge_orchestrator::error::AppError;
use discharge_orchestrator::telemetry;
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

    let discharge_service =
        census_service(config.discharge, args.facilities_csv.as_deref(), None)?;

    let app = with_discharge_routes(discharge_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        exclusive_placement = config.discharge.exclusive_placement,
        duplicate_signals = ?config.discharge.duplicate_signals,
        "discharge orchestrator ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
