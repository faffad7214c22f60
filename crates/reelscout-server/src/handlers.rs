//! HTTP handlers
//!
//! One handler per endpoint. Each handler validates its parameters,
//! calls into `reelscout_core` and shapes the JSON response. Failure
//! policy differs per endpoint; see the notes on each handler.

use std::convert::Infallible;

use axum::Json;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use reelscout_core::webhook::DEFAULT_SOURCE;
use reelscout_core::{Candidate, DownloadRequest, ExtractionMethod, MovieRecord, ReelscoutError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct UrlParams {
    url: Option<String>,
    method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    q: Option<String>,
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryBody {
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadBody {
    movie_url: Option<String>,
    title: Option<String>,
}

/// Response of the link extraction endpoints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    pub url: String,
    pub download_links: Vec<Candidate>,
    pub total: usize,
    pub message: String,
    pub method: String,
}

/// Response of the listing endpoints
#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub success: bool,
    pub source: String,
    pub query: String,
    pub results: Vec<MovieRecord>,
    pub total: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<&'static str>,
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::missing(name))
}

/// Method name as reported by the endpoint
struct Reported {
    /// Value of the `method` field and the error label
    name: String,
    /// Prefix of the success message
    label: String,
}

impl Reported {
    fn titled(method: ExtractionMethod) -> Self {
        let name = method.as_str();
        let mut chars = name.chars();
        let label = chars
            .next()
            .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
            .unwrap_or_default();
        Self {
            name: name.to_string(),
            label,
        }
    }

    fn echoed(requested: &str) -> Self {
        Self {
            name: requested.to_string(),
            label: requested.to_string(),
        }
    }
}

async fn extract(
    state: &AppState,
    url: String,
    method: ExtractionMethod,
    reported: Reported,
) -> Result<Json<LinkResponse>, ApiError> {
    let links = state
        .scraper
        .extract_links(&url, method)
        .await
        .map_err(|e| {
            ApiError::internal(format!("Failed to extract download links ({})", reported.name), e)
        })?;

    Ok(Json(LinkResponse {
        message: format!(
            "{} extraction found {} download links",
            reported.label,
            links.len()
        ),
        total: links.len(),
        download_links: links,
        method: reported.name,
        url,
    }))
}

/// `GET /api/download-enhanced?url=`
pub async fn download_enhanced(
    State(state): State<AppState>,
    Query(params): Query<UrlParams>,
) -> Result<Json<LinkResponse>, ApiError> {
    let url = required(params.url, "URL")?;
    let method = ExtractionMethod::Enhanced;
    extract(&state, url, method, Reported::titled(method)).await
}

/// `GET /api/download-all?url=&method=`
///
/// An unrecognized method falls back to basic extraction. The requested
/// name is echoed back in `method` and `message` either way.
pub async fn download_all(
    State(state): State<AppState>,
    Query(params): Query<UrlParams>,
) -> Result<Json<LinkResponse>, ApiError> {
    let url = required(params.url, "URL")?;
    let requested = params
        .method
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| ExtractionMethod::Enhanced.as_str().to_string());

    let method = match requested.parse::<ExtractionMethod>() {
        Ok(method) => method,
        Err(e) => {
            tracing::debug!(error = %e, "falling back to basic extraction");
            ExtractionMethod::Basic
        }
    };
    extract(&state, url, method, Reported::echoed(&requested)).await
}

/// `GET /api/playwright-download?url=`
pub async fn playwright_download(
    State(state): State<AppState>,
    Query(params): Query<UrlParams>,
) -> Result<Json<LinkResponse>, ApiError> {
    let url = required(params.url, "URL")?;
    let method = ExtractionMethod::Playwright;
    extract(&state, url, method, Reported::titled(method)).await
}

/// `GET /api/moviezwap-scraper?q=` (or `query=`)
pub async fn moviezwap_get(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<ListingResponse>, ApiError> {
    let query = required(params.q.or(params.query), "Query")?;
    moviezwap_search(&state, query).await
}

/// `POST /api/moviezwap-scraper` with `{query}`
pub async fn moviezwap_post(
    State(state): State<AppState>,
    body: Option<Json<QueryBody>>,
) -> Result<Json<ListingResponse>, ApiError> {
    let query = required(body.and_then(|Json(b)| b.query), "Query")?;
    moviezwap_search(&state, query).await
}

async fn moviezwap_search(state: &AppState, query: String) -> Result<Json<ListingResponse>, ApiError> {
    let site = &state.moviezwap;
    let results = state
        .scraper
        .search_listing(site, &query)
        .await
        .map_err(|e| ApiError::Listing {
            source_name: site.source.clone(),
            message: e.to_string(),
        })?;

    Ok(Json(ListingResponse {
        success: true,
        message: format!("Found {} movies from {}", results.len(), site.source),
        source: site.source.clone(),
        total: results.len(),
        results,
        query,
        method: None,
    }))
}

/// `POST /api/playwright-scrape` with `{query}`
///
/// Searches movierulz and mines every movie page for streams.
pub async fn playwright_scrape(
    State(state): State<AppState>,
    body: Option<Json<QueryBody>>,
) -> Result<Json<ListingResponse>, ApiError> {
    let query = required(body.and_then(|Json(b)| b.query), "Query")?;
    let site = &state.movierulz;

    let results = state
        .scraper
        .search_with_streams(site, &query)
        .await
        .map_err(|e| ApiError::internal("Failed to scrape movies", e))?;

    Ok(Json(ListingResponse {
        success: true,
        message: format!("Found {} movies with streaming URLs", results.len()),
        source: site.source.clone(),
        total: results.len(),
        results,
        query,
        method: Some("playwright-simulation"),
    }))
}

/// `GET /api/search?query=`
///
/// An acknowledged-but-unfinished workflow is answered with 200 and
/// `success: false`; other failures are 500.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Value>, ApiError> {
    let query = required(params.query, "Query")?;

    match state.webhook.search(&query).await {
        Ok(results) => Ok(Json(json!({
            "query": query,
            "total": results.len(),
            "message": format!("Found {} movies", results.len()),
            "results": results,
            "source": DEFAULT_SOURCE,
            "success": true,
        }))),
        Err(ReelscoutError::WorkflowIncomplete) => Ok(Json(json!({
            "query": query,
            "results": [],
            "total": 0,
            "message": "Search workflow did not complete properly. No results found.",
            "source": DEFAULT_SOURCE,
            "success": false,
            "error": "Workflow incomplete",
        }))),
        Err(e) => Err(ApiError::internal("Failed to fetch movies", e)),
    }
}

/// `GET /api/n8n-proxy?query=`
///
/// Never fails with a server error: upstream failures become 200 with
/// `success: false` and no results. A workflow that was only started is
/// not a failure here; it answers `success: true` with no results.
pub async fn webhook_proxy(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Value>, ApiError> {
    let query = required(params.query, "Query")?;

    let outcome = match state.webhook.search(&query).await {
        Err(ReelscoutError::WorkflowIncomplete) => {
            tracing::debug!(query = %query, "search workflow only started");
            Ok(Vec::new())
        }
        other => other,
    };

    let body = match outcome {
        Ok(results) => json!({
            "success": true,
            "total": results.len(),
            "message": format!("Found {} movies from 5MovieRulz", results.len()),
            "results": results,
            "query": query,
            "source": DEFAULT_SOURCE,
        }),
        Err(e) => {
            tracing::warn!(query = %query, error = %e, "webhook proxy failed");
            json!({
                "success": false,
                "error": "Failed to fetch from search webhook",
                "message": e.to_string(),
                "results": [],
                "total": 0,
                "query": query,
            })
        }
    };

    Ok(Json(body))
}

/// `POST /api/python-download` with `{movieUrl, title}`
///
/// Answers with an NDJSON stream of progress events. Upstream failures
/// are reported in-stream as an `error` event.
pub async fn python_download(
    State(state): State<AppState>,
    body: Option<Json<DownloadBody>>,
) -> Result<Response, ApiError> {
    let Some(Json(body)) = body else {
        return Err(ApiError::BadRequest("Movie URL is required".to_string()));
    };
    let movie_url = required(body.movie_url, "Movie URL")
        .map_err(|_| ApiError::BadRequest("Movie URL is required".to_string()))?;

    tracing::info!(url = %movie_url, "starting download relay");
    let events = state
        .relay
        .relay(DownloadRequest {
            movie_url,
            title: body.title,
        })
        .map(|event| Ok::<_, Infallible>(event.to_ndjson()));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(events))
        .map_err(|e| ApiError::internal("Internal server error", e))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "reelscout",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Answers a bare `OPTIONS` request with an empty 200
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Unknown paths
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims_and_rejects_blank() {
        assert_eq!(required(Some("  kalki ".to_string()), "Query").ok().as_deref(), Some("kalki"));
        assert!(matches!(required(Some("   ".to_string()), "Query"), Err(ApiError::BadRequest(_))));
        assert!(matches!(required(None, "URL"), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_reported_method_names() {
        let titled = Reported::titled(ExtractionMethod::Playwright);
        assert_eq!(titled.name, "playwright");
        assert_eq!(titled.label, "Playwright");

        let echoed = Reported::echoed("selenium");
        assert_eq!(echoed.name, "selenium");
        assert_eq!(echoed.label, "selenium");
    }

    #[test]
    fn test_link_response_shape() {
        let response = LinkResponse {
            url: "https://example.com/movie".to_string(),
            download_links: Vec::new(),
            total: 0,
            message: "Enhanced extraction found 0 download links".to_string(),
            method: "enhanced".to_string(),
        };
        let value = serde_json::to_value(&response).expect("Serialization should succeed");
        assert_eq!(value["method"], "enhanced");
        assert!(value["downloadLinks"].as_array().is_some_and(Vec::is_empty));
    }

    #[test]
    fn test_listing_response_omits_missing_method() {
        let response = ListingResponse {
            success: true,
            source: "moviezwap.care".to_string(),
            query: "kalki".to_string(),
            results: Vec::new(),
            total: 0,
            message: "Found 0 movies from moviezwap.care".to_string(),
            method: None,
        };
        let value = serde_json::to_value(&response).expect("Serialization should succeed");
        assert!(value.get("method").is_none());
        assert_eq!(value["success"], true);
    }
}
