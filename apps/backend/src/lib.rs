pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use srs_core::{Card, InfiniteSm2, SchedulingAlgorithm, SystemClock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::persistence::{HttpPersistence, MemoryPersistence, RemotePersistence};
use crate::services::session::StudySession;
use crate::services::source::{CardSource, HttpCardSource};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<StudySession>,
}

/// Build the API router over a session.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/session/next", get(routes::session::next))
        .route("/api/session/grade", post(routes::session::grade))
        .route("/api/session/counts", get(routes::session::counts))
        .route("/api/session/generate", post(routes::session::generate))
        .route("/api/session/status", get(routes::session::status))
        .route("/api/cards/:id", get(routes::cards::get))
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let seed = load_seed_deck(&config)?;

    let persistence: Arc<dyn RemotePersistence> = match &config.persistence_url {
        Some(url) => {
            tracing::info!("Using remote persistence at {}", url);
            Arc::new(HttpPersistence::new(url))
        }
        None => {
            tracing::info!("PERSISTENCE_URL not set, keeping state in memory");
            Arc::new(MemoryPersistence::new())
        }
    };

    let source: Option<Arc<dyn CardSource>> =
        match (&config.card_source_url, &config.card_source_api_key) {
            (Some(url), Some(key)) => Some(Arc::new(HttpCardSource::new(url, key))),
            _ => {
                tracing::info!("No content source credential, card generation disabled");
                None
            }
        };

    let algorithm = Arc::new(InfiniteSm2::default());
    tracing::info!("Scheduling with {}", algorithm.name());

    let session = Arc::new(StudySession::new(
        &config.session_id,
        &config.scheduler,
        algorithm,
        persistence,
        source,
        Arc::new(SystemClock),
        StdRng::from_entropy(),
    ));

    tracing::info!("Hydrating session {}...", config.session_id);
    let hydration = session.hydrate(seed).await;
    tracing::info!(?hydration, "Session ready");

    let app = router(AppState {
        session: session.clone(),
    })
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    session.shutdown();
    if let Err(e) = session.sync().flush_states().await {
        tracing::warn!(error = %e, "Final state sync failed");
    }

    Ok(())
}

fn load_seed_deck(config: &Config) -> anyhow::Result<Vec<Card>> {
    let Some(path) = &config.seed_deck_path else {
        return Ok(Vec::new());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed deck {}", path.display()))?;
    let cards = srs_core::parse(&content, &config.default_unit)
        .with_context(|| format!("parsing seed deck {}", path.display()))?;
    tracing::info!("Loaded {} seed cards from {}", cards.len(), path.display());
    Ok(cards)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn health_check() -> &'static str {
    "OK"
}
