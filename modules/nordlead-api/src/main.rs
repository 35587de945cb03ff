use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nordlead_common::Config;
use nordlead_store::{PgAdminStore, PgCatalog, PgEntityStore, PgJobStore};
use nordlead_sync::logo::LogoFinder;
use nordlead_sync::summary::Summarizer;
use nordlead_sync::sync::{SyncOptions, SyncOrchestrator};
use registry_client::{RegistryClient, RegistrySpec, RetryPolicy};
use webhook_client::WebhookClient;

mod auth;
mod components;
mod pages;
mod rest;

pub struct AppState {
    pub config: Config,
    pub catalog: PgCatalog,
    pub entities: PgEntityStore,
    pub jobs: PgJobStore,
    pub admin: PgAdminStore,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub webhooks: WebhookClient,
    pub summarizer: Option<Summarizer>,
    pub rate_limiter: Mutex<HashMap<IpAddr, Vec<Instant>>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nordlead=info".parse()?))
        .init();

    let config = Config::web_from_env();

    let pool = nordlead_store::connect(&config.database_url).await?;
    nordlead_store::migrate(&pool).await?;

    let policy = RetryPolicy::new(
        config.registry_retries,
        Duration::from_millis(config.registry_retry_base_ms),
    );
    let registry = Arc::new(
        RegistryClient::new(
            RegistrySpec::norway(&config.registry_base_url),
            config.registry_user_agent.clone(),
        )
        .with_policy(policy),
    );

    let entities = PgEntityStore::new(pool.clone());
    let jobs = PgJobStore::new(pool.clone());
    let summarizer = Summarizer::from_config(&config);

    let mut orchestrator = SyncOrchestrator::new(
        registry,
        Arc::new(entities.clone()),
        Arc::new(jobs.clone()),
        SyncOptions::from_config(&config),
    )
    .with_logo_finder(LogoFinder::new());
    if let Some(summarizer) = Summarizer::from_config(&config) {
        orchestrator = orchestrator.with_summarizer(summarizer);
    }

    let state = Arc::new(AppState {
        catalog: PgCatalog::new(pool.clone()),
        entities,
        jobs,
        admin: PgAdminStore::new(pool),
        orchestrator: Arc::new(orchestrator),
        webhooks: WebhookClient::new(),
        summarizer,
        rate_limiter: Mutex::new(HashMap::new()),
        config,
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Pages
        .route("/login", get(pages::login_page).post(pages::login_submit))
        .route("/logout", get(pages::logout))
        .route("/dashboard", get(pages::dashboard_page))
        // Companies
        .route("/api/companies", get(rest::companies::api_companies))
        .route(
            "/api/companies/{orgnr}",
            get(rest::companies::api_company_detail),
        )
        .route(
            "/api/companies/{orgnr}/regenerate-summary",
            post(rest::companies::api_regenerate_summary),
        )
        // Dashboard data
        .route("/api/dashboard/stats", get(rest::stats::api_dashboard_stats))
        // Sync
        .route("/api/sync", post(rest::sync::api_trigger_sync))
        .route("/api/sync/jobs", get(rest::sync::api_sync_jobs))
        // Export
        .route("/api/export", post(rest::export::api_export))
        // Scoring models
        .route(
            "/api/scoring-models",
            get(rest::models::api_models_list).post(rest::models::api_model_create),
        )
        .route(
            "/api/scoring-models/active",
            get(rest::models::api_model_active),
        )
        .route(
            "/api/scoring-models/{id}",
            delete(rest::models::api_model_delete),
        )
        .route(
            "/api/scoring-models/{id}/activate",
            post(rest::models::api_model_activate),
        )
        .route(
            "/api/scoring-models/{id}/preview",
            post(rest::models::api_model_preview),
        )
        // Integrations
        .route(
            "/api/integrations",
            get(rest::integrations::api_integrations_list)
                .post(rest::integrations::api_integration_create),
        )
        .route(
            "/api/integrations/{id}",
            delete(rest::integrations::api_integration_delete),
        )
        .route(
            "/api/integrations/trigger",
            post(rest::integrations::api_integrations_trigger),
        )
        .with_state(state.clone())
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr = format!("{}:{}", state.config.web_host, state.config.web_port);
    info!(addr = addr.as_str(), "Nordlead API listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
