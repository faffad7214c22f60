//! reelscout HTTP server
//!
//! Exposes the reelscout engine as JSON endpoints for a browser front-end.
//!
//! # Usage
//!
//! ```no_run
//! use reelscout_server::{AppState, ServerConfig, router};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load(None)?;
//!     let app = router(AppState::from_config(&config)?);
//!     let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! Then call the endpoints from the front-end:
//!
//! ```javascript
//! // Ranked download links for a movie page
//! const links = await fetch('/api/download-all?url=' + encodeURIComponent(page) + '&method=playwright');
//!
//! // Search a listing site
//! const movies = await fetch('/api/moviezwap-scraper?q=kalki');
//! ```

use std::sync::Arc;

use axum::Router;
use axum::routing::{MethodRouter, get, post};
use reelscout_core::{DownloadRelay, ListingSite, MovieScraper, WebhookClient};
use tower_http::cors::{Any, CorsLayer};

pub mod config;
pub mod error;
mod handlers;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError};

/// Shared handler state
///
/// Every field is cheap to clone; handlers never lock anything.
#[derive(Clone)]
pub struct AppState {
    pub(crate) scraper: Arc<MovieScraper>,
    pub(crate) webhook: Arc<WebhookClient>,
    pub(crate) relay: DownloadRelay,
    pub(crate) moviezwap: Arc<ListingSite>,
    pub(crate) movierulz: Arc<ListingSite>,
}

impl AppState {
    /// Build the state from a loaded configuration
    ///
    /// # Errors
    /// Returns error if an HTTP client cannot be initialized
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let scraper = MovieScraper::with_config(config.client_config(), config.result_limits())?;
        let webhook = WebhookClient::new(&config.upstream.webhook_url, config.webhook_timeout())?;
        let relay = DownloadRelay::new(&config.upstream.download_service_url, config.download_timeout())?;

        Ok(Self {
            scraper: Arc::new(scraper),
            webhook: Arc::new(webhook),
            relay,
            moviezwap: Arc::new(ListingSite::moviezwap()),
            movierulz: Arc::new(ListingSite::movierulz()),
        })
    }

    /// Point the listing sites at other base URLs
    pub fn with_listing_sites(mut self, moviezwap: ListingSite, movierulz: ListingSite) -> Self {
        self.moviezwap = Arc::new(moviezwap);
        self.movierulz = Arc::new(movierulz);
        self
    }
}

/// Adds the shared `OPTIONS` answer and the 405 fallback to a route
fn endpoint(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route
        .options(handlers::preflight)
        .fallback(handlers::method_not_allowed)
}

/// Build the router with all endpoints
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/download-enhanced", endpoint(get(handlers::download_enhanced)))
        .route("/api/download-all", endpoint(get(handlers::download_all)))
        .route("/api/playwright-download", endpoint(get(handlers::playwright_download)))
        .route(
            "/api/moviezwap-scraper",
            endpoint(get(handlers::moviezwap_get).post(handlers::moviezwap_post)),
        )
        .route("/api/playwright-scrape", endpoint(post(handlers::playwright_scrape)))
        .route("/api/search", endpoint(get(handlers::search)))
        .route("/api/n8n-proxy", endpoint(get(handlers::webhook_proxy)))
        .route("/api/python-download", endpoint(post(handlers::python_download)))
        .route("/health", endpoint(get(handlers::health)))
        .fallback(handlers::not_found)
        .layer(cors)
        .with_state(state)
}
