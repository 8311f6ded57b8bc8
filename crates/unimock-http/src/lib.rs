//! # Unimock HTTP
//!
//! The HTTP surface of Unimock. One router serves three kinds of traffic:
//!
//! | Prefix | Handler |
//! |---|---|
//! | `/_uni/scenarios` | scenario CRUD ([`scenario_api`]) |
//! | `/_uni/…` | technical endpoints: health, metrics ([`tech`]) |
//! | everything else | the mock pipeline ([`mock_handler`]) |
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use unimock_http::{build_router, AppState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = unimock_core::load_config(std::path::Path::new("config.yaml")).await?;
//!     let state = AppState::from_config(config).await?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, build_router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod mock_handler;
pub mod scenario_api;
pub mod tech;

pub use error::ApiError;
pub use tech::Metrics;

use axum::routing::{any, get};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use unimock_core::{MockStore, Result, ScenarioRegistry, SectionRegistry, UnimockConfig};

/// Stuck connections are cut after this long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state behind every handler
#[derive(Clone)]
pub struct AppState {
    /// Configured sections; immutable once the server runs
    pub sections: Arc<SectionRegistry>,
    /// Installed scenarios
    pub scenarios: Arc<ScenarioRegistry>,
    /// The resource store
    pub store: Arc<MockStore>,
    /// Mock-traffic counters
    pub metrics: Arc<Metrics>,
    /// Server start time, for the health endpoint
    pub started_at: Instant,
}

impl AppState {
    /// State over a prepared section registry, with empty store and
    /// scenario registry.
    pub fn new(sections: SectionRegistry) -> Self {
        Self {
            sections: Arc::new(sections),
            scenarios: Arc::new(ScenarioRegistry::new()),
            store: Arc::new(MockStore::new()),
            metrics: Arc::new(Metrics::new()),
            started_at: Instant::now(),
        }
    }

    /// Compile sections and install startup scenarios from configuration.
    pub async fn from_config(config: UnimockConfig) -> Result<Self> {
        let sections = SectionRegistry::from_config(&config.sections)?;
        let state = Self::new(sections);
        for scenario in config.scenarios {
            state.scenarios.insert(scenario.into_scenario()).await?;
        }
        Ok(state)
    }
}

/// Assemble the full router: scenario API and technical endpoints under
/// `/_uni`, the mock pipeline as the fallback for everything else.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/_uni/scenarios", scenario_api::router())
        .route("/_uni/health", get(tech::health))
        .route("/_uni/metrics", get(tech::metrics))
        .route("/_uni", any(tech::unknown))
        .route("/_uni/{*rest}", any(tech::unknown))
        .fallback(mock_handler::handle)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

/// Serve until the shutdown future resolves; in-flight requests drain
/// before the listener closes.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}
