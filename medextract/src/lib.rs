//! # medextract: prompt-version analytics for medical document extraction
//!
//! `medextract` sits next to a GenAI extraction pipeline that turns clinical documents into
//! structured records. Every extraction request is reported here as an [`analytics::Observation`]
//! tagged with the prompt version that produced it. The service answers two questions:
//!
//! - How is a prompt version doing? Success rate, latency percentiles, token cost and field
//!   completeness over a recent window.
//! - Should a candidate prompt replace the current one? A control vs. treatment comparison that
//!   ends in PROMOTE, REVIEW, KEEP CONTROL or INSUFFICIENT DATA.
//!
//! ## Architecture
//!
//! - [`analytics`]: the pure core. [`analytics::MetricsEngine`] summarizes observations and
//!   [`analytics::ComparisonEngine`] turns two summaries into a decision.
//! - [`store`]: where observations live, in memory or in PostgreSQL.
//! - [`service`]: resolves time windows, loads observations and calls the engines.
//! - [`api`]: the Axum HTTP surface, documented with `utoipa` at `/docs`.
//!
//! ## Configuration
//!
//! See [`config`]. Pricing, thresholds and the default prompt version are all configuration.

pub mod analytics;
pub mod api;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod openapi;
pub mod service;
pub mod store;
pub mod telemetry;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::Method,
    routing::{get, post},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

use crate::{
    api::handlers::{metrics as metrics_handlers, observations, prompts},
    config::StoreConfig,
    errors::Error,
    metrics::ObservationMetrics,
    openapi::ApiDoc,
    service::AnalyticsService,
    store::{InMemoryObservationStore, ObservationStore, PostgresObservationStore},
};

/// Shared state handed to every handler.
///
/// ```ignore
/// let state = AppState::builder()
///     .service(service)
///     .config(config)
///     .maybe_metrics(metrics)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub service: Arc<AnalyticsService>,
    pub config: Config,
    pub metrics: Option<ObservationMetrics>,
}

/// Get the medextract database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

async fn render_metrics(State(state): State<AppState>) -> Result<String, Error> {
    match &state.metrics {
        Some(metrics) => Ok(metrics.render().map_err(anyhow::Error::from)?),
        None => Err(Error::Internal {
            operation: "render metrics: metrics are disabled".to_string(),
        }),
    }
}

/// Build the application router: the `/api/v1` surface, health check, docs and
/// (when enabled) the Prometheus endpoint.
pub fn build_router(state: AppState) -> Router {
    let enable_metrics = state.config.enable_metrics && state.metrics.is_some();

    let api_routes = Router::new()
        .route("/metrics/prompts/{version}", get(metrics_handlers::get_prompt_metrics))
        .route("/metrics/compare", post(metrics_handlers::compare_prompt_versions))
        .route("/observations", post(observations::create_observation))
        .route("/prompts/versions", get(prompts::list_prompt_versions));

    let mut stateful = Router::new().nest("/api/v1", api_routes);
    if enable_metrics {
        stateful = stateful.route("/internal/metrics", get(render_metrics));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .merge(stateful.with_state(state))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

async fn connect_postgres(url: &str, settings: &config::PoolSettings) -> anyhow::Result<PostgresObservationStore> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout())
        .idle_timeout(settings.idle_timeout())
        .max_lifetime(settings.max_lifetime())
        .connect(url)
        .await?;

    let store = PostgresObservationStore::new(pool);
    store.migrate().await?;
    Ok(store)
}

/// The assembled service.
///
/// 1. **Create**: [`Application::new`] connects the configured store and runs migrations
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until shutdown
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance backed by the configured store
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting medextract with configuration: {:#?}", config);

        match config.store.clone() {
            StoreConfig::InMemory => {
                info!("Using in-memory observation store: observations are lost on restart");
                Self::new_with_store(config, Arc::new(InMemoryObservationStore::new()))
            }
            StoreConfig::Postgres { url, pool } => {
                let store = connect_postgres(&url, &pool).await?;
                let pg_pool = store.pool().clone();
                let mut app = Self::new_with_store(config, Arc::new(store))?;
                app.pool = Some(pg_pool);
                Ok(app)
            }
        }
    }

    /// Create an application over an existing store
    pub fn new_with_store(config: Config, store: Arc<dyn ObservationStore>) -> anyhow::Result<Self> {
        let service = AnalyticsService::new(
            store,
            config.analytics.summary.clone(),
            config.analytics.comparison.clone(),
            config.analytics.window.clone(),
            config.prompts.default_version.clone(),
        );

        let metrics = if config.enable_metrics {
            Some(ObservationMetrics::new(&prometheus::Registry::new())?)
        } else {
            None
        };

        let state = AppState::builder()
            .service(Arc::new(service))
            .config(config.clone())
            .maybe_metrics(metrics)
            .build();

        Ok(Self {
            router: build_router(state),
            config,
            pool: None,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(any(test, feature = "test-utils"))]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "medextract listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::test_utils::*;

    #[test_log::test(tokio::test)]
    async fn test_healthz() {
        let (server, _store) = create_test_app();
        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[test_log::test(tokio::test)]
    async fn test_openapi_and_docs_served() {
        let (server, _store) = create_test_app();

        let spec = server.get("/openapi.json").await;
        spec.assert_status_ok();
        assert!(spec.text().contains("\"openapi\""));

        server.get("/docs").await.assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_metrics_endpoint_enabled() {
        let (server, store) = create_test_app();
        seed_observations(&store, "v1.0.0", 1, 1).await;

        server
            .post("/api/v1/observations")
            .json(&serde_json::json!({"prompt_version": "v1.0.0", "success": true}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server.get("/internal/metrics").await;
        response.assert_status_ok();
        let text = response.text();
        assert!(text.contains("# TYPE medextract_observations_total counter"));
        assert!(text.contains(r#"medextract_observations_total{outcome="success",prompt_version="v1.0.0"} 1"#));
    }

    #[test_log::test(tokio::test)]
    async fn test_metrics_endpoint_disabled() {
        let mut config = create_test_config();
        config.enable_metrics = false;
        let (server, _store) = create_test_app_with_config(config);

        server.get("/internal/metrics").await.assert_status_not_found();
    }
}
