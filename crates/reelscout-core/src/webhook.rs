//! Search workflow webhook client
//!
//! Forwards a search query to an external workflow webhook and
//! normalizes whatever JSON shape it answers with into a list of
//! result objects.

use serde_json::{Map, Value, json};
use std::time::Duration;

use crate::error::{ReelscoutError, Result};

/// Default webhook endpoint of the search workflow
pub const DEFAULT_WEBHOOK_URL: &str =
    "https://n8n-instance-vnyx.onrender.com/webhook/movie-scraper-villas";

/// Source label given to results that carry none
pub const DEFAULT_SOURCE: &str = "5movierulz.villas";

/// Message the workflow engine returns when it acknowledged the request
/// without waiting for the workflow to produce results
const WORKFLOW_STARTED: &str = "Workflow was started";

/// Longest upstream error body kept in error messages
const MAX_ERROR_BODY: usize = 500;

/// Client for the search workflow webhook
pub struct WebhookClient {
    client: reqwest::Client,
    url: String,
}

impl WebhookClient {
    /// Create a client for a webhook URL
    ///
    /// # Arguments
    /// * `url` - Webhook endpoint
    /// * `timeout` - Total request timeout (60 s in the default server config)
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("reelscout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ReelscoutError::HttpError)?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run a search through the webhook
    ///
    /// # Returns
    /// Result objects with `source` and `moviePageUrl` filled in
    ///
    /// # Errors
    /// - `InvalidQuery` if the query is blank
    /// - `Upstream` if the webhook answers with a non-success status
    /// - `ParseError` if the body is not JSON
    /// - `WorkflowIncomplete` if the workflow only acknowledged the request
    /// - `Timeout`, `HttpError` on transport failure
    pub async fn search(&self, query: &str) -> Result<Vec<Value>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(ReelscoutError::InvalidQuery(
                "Search query cannot be empty".to_string(),
            ));
        }

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&json!({ "query": trimmed }))
            .send()
            .await
            .map_err(|e| ReelscoutError::from_request(&self.url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(ReelscoutError::Upstream(format!(
                "webhook responded with status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ReelscoutError::ParseError(format!("webhook payload: {}", e)))?;

        let results = parse_webhook_payload(payload)?;
        tracing::info!(query = trimmed, count = results.len(), "webhook search finished");
        Ok(results)
    }
}

/// Normalizes a webhook payload into result objects
///
/// Accepted shapes, in order: a top-level array, an object with a
/// `results` array, a single object with a `title`. Anything else yields
/// no results. Every object keeps all of its fields and gains `source`
/// and `moviePageUrl` when missing.
///
/// # Errors
/// Returns `WorkflowIncomplete` for a "Workflow was started" acknowledgement
pub fn parse_webhook_payload(payload: Value) -> Result<Vec<Value>> {
    if is_workflow_started(&payload) {
        return Err(ReelscoutError::WorkflowIncomplete);
    }

    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("results") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                object.insert("results".to_string(), other);
                single_titled(object)
            }
            None => single_titled(object),
        },
        _ => Vec::new(),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(object) => Some(Value::Object(with_defaults(object))),
            _ => None,
        })
        .collect())
}

fn single_titled(object: Map<String, Value>) -> Vec<Value> {
    if object.contains_key("title") {
        vec![Value::Object(object)]
    } else {
        Vec::new()
    }
}

fn is_workflow_started(payload: &Value) -> bool {
    let message = match payload {
        Value::Array(items) => items.first().and_then(|first| first.get("message")),
        other => other.get("message"),
    };
    message.and_then(Value::as_str) == Some(WORKFLOW_STARTED)
}

fn with_defaults(mut object: Map<String, Value>) -> Map<String, Value> {
    if non_empty_str(object.get("source")).is_none() {
        object.insert("source".to_string(), Value::from(DEFAULT_SOURCE));
    }

    if non_empty_str(object.get("moviePageUrl")).is_none() {
        let page = non_empty_str(object.get("originalUrl"))
            .or_else(|| non_empty_str(object.get("url")))
            .map(str::to_string);
        if let Some(page) = page {
            object.insert("moviePageUrl".to_string(), Value::from(page));
        }
    }

    object
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
