//! Browser form UI served with axum.

mod handlers;
mod page;

pub use page::{Level, Notice, render_page};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::{DateTime, Utc};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ConfigError;
use crate::models::Config;
use crate::services::CostEstimator;
use crate::session::{SessionStore, UploadStore, close_session};

pub const SESSION_COOKIE: &str = "docqa_session";

/// Room for the multipart framing and the small form fields around the file.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
    pub uploads: UploadStore,
    pub estimator: Arc<CostEstimator>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let estimator = CostEstimator::from_config(&config.cost)?;
        let sessions = SessionStore::new(
            &config.session,
            config.server.default_chunk_size,
            config.retrieval.k,
        );
        Ok(Self {
            uploads: UploadStore::new(&config.upload),
            sessions: Arc::new(sessions),
            estimator: Arc::new(estimator),
            config: Arc::new(config),
            started_at: Utc::now(),
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.uploads.max_bytes() as usize + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(handlers::index))
        .route("/key", post(handlers::check_key))
        .route("/upload", post(handlers::upload))
        .route("/ask", post(handlers::ask))
        .route("/history/clear", post(handlers::clear_history))
        .route("/reset", post(handlers::reset))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically evict idle sessions, releasing their indexes and uploads.
pub fn spawn_session_sweeper(state: AppState) -> JoinHandle<()> {
    let every = Duration::from_secs(state.config.session.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            for session in state.sessions.sweep_idle().await {
                close_session(&session, &state.uploads).await;
            }
        }
    })
}

/// Serve the UI on `bind` until `shutdown` resolves.
pub async fn run<F>(state: AppState, bind: &str, shutdown: F) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "docqa UI listening");
    info!(
        driver = %state.config.vector_store.driver,
        idle_timeout_secs = state.config.session.idle_timeout_secs,
        "session settings"
    );

    let sweeper = spawn_session_sweeper(state.clone());
    let app = create_app(state.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    sweeper.abort();
    let sessions = state.sessions.drain().await;
    info!(sessions = sessions.len(), "closing sessions");
    for session in sessions {
        close_session(&session, &state.uploads).await;
    }

    Ok(())
}
