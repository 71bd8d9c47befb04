use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_rating_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use klinic::config::AppConfig;
use klinic::error::AppError;
use klinic::telemetry;
use klinic::workflows::ratings::{HttpRatingStatusClient, RatingPromptService};
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
    if let Some(ratings_url) = args.ratings_url.take() {
        config.ratings.base_url = ratings_url;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let status_source = Arc::new(HttpRatingStatusClient::new(config.ratings.base_url.clone()));
    let rating_service = Arc::new(RatingPromptService::new(status_source));

    let app = with_rating_routes(rating_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        ratings_backend = %config.ratings.base_url,
        "rating prompt service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
