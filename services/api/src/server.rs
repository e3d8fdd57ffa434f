use crate::cli::ServeArgs;
use crate::infra::{AppState, TrackingServices};
use crate::routes::with_tracking_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use payroll_tracking::config::AppConfig;
use payroll_tracking::error::AppError;
use payroll_tracking::telemetry;
use payroll_tracking::workflows::tracking::ReviewPolicy;
use std::sync::atomic::{AtomicBool, Ordering};
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let policy = ReviewPolicy::from(&config.workflow);
    let services = TrackingServices::in_memory(policy)?;

    let app = with_tracking_routes(services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        require_recommendation = policy.require_recommendation,
        "payroll tracking service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
