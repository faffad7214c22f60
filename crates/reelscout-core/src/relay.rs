//! Download relay
//!
//! Forwards a download request to the remote download service and turns
//! its line-oriented progress output into a stream of [`ProgressEvent`]s.
//! The stream always starts with a `started` event and always ends with a
//! terminal `completed` or `error` event.

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Duration;

use crate::error::{ReelscoutError, Result};

/// Default remote download service endpoint
pub const DEFAULT_DOWNLOAD_SERVICE_URL: &str = "https://movie-downloader-wior.onrender.com/download";

/// Title used when the request carries none
const UNKNOWN_TITLE: &str = "Unknown Movie";

/// Directory the download service writes into
const OUTPUT_PATH: &str = "./downloads/";

/// Stage of a relayed download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Started,
    Info,
    Progress,
    Completed,
    Error,
}

impl EventStatus {
    /// Maps an upstream status string; unknown values count as progress
    fn from_upstream(status: &str) -> Self {
        match status {
            "started" => EventStatus::Started,
            "info" => EventStatus::Info,
            "completed" => EventStatus::Completed,
            "error" => EventStatus::Error,
            _ => EventStatus::Progress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Error)
    }
}

/// One NDJSON progress line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: EventStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,

    /// Fields passed through from upstream JSON lines
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProgressEvent {
    pub fn new(status: EventStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            timestamp: Utc::now(),
            extra: Map::new(),
        }
    }

    /// Adds a passthrough field
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Parses one upstream output line
    ///
    /// JSON objects keep their fields, with `status` defaulting to
    /// progress and `message` defaulting to the raw line. Anything else
    /// becomes a progress event carrying the trimmed line. Blank lines
    /// yield `None`.
    pub fn from_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let Ok(Value::Object(mut fields)) = serde_json::from_str::<Value>(trimmed) else {
            return Some(ProgressEvent::new(EventStatus::Progress, trimmed));
        };

        let status = fields
            .remove("status")
            .and_then(|s| s.as_str().map(EventStatus::from_upstream))
            .unwrap_or(EventStatus::Progress);
        let message = fields
            .remove("message")
            .and_then(|m| m.as_str().filter(|m| !m.is_empty()).map(str::to_string))
            .unwrap_or_else(|| trimmed.to_string());
        fields.remove("timestamp");

        Some(Self {
            status,
            message,
            timestamp: Utc::now(),
            extra: fields,
        })
    }

    /// Serializes the event as one NDJSON line, newline included
    pub fn to_ndjson(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|e| {
            json!({ "status": "error", "message": format!("unserializable event: {}", e) }).to_string()
        });
        line.push('\n');
        line
    }
}

/// A download request as received from the front-end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub movie_url: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl DownloadRequest {
    fn title_or_default(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_TITLE)
    }
}

/// Client for the remote download service
#[derive(Clone)]
pub struct DownloadRelay {
    client: reqwest::Client,
    service_url: String,
    response_timeout: Duration,
}

impl DownloadRelay {
    /// Create a relay for a service URL
    ///
    /// # Arguments
    /// * `service_url` - Download service endpoint
    /// * `response_timeout` - Time allowed until upstream response headers arrive
    pub fn new(service_url: impl Into<String>, response_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(response_timeout)
            .build()
            .map_err(ReelscoutError::HttpError)?;

        Ok(Self {
            client,
            service_url: service_url.into(),
            response_timeout,
        })
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Sends the request upstream and waits for response headers
    ///
    /// # Errors
    /// - `Upstream` on a non-success status, with a dedicated message for 502
    /// - `Timeout` if no response arrives within the response timeout
    /// - `HttpError` on transport failure
    pub async fn connect(&self, request: &DownloadRequest) -> Result<reqwest::Response> {
        let payload = json!({
            "url": request.movie_url,
            "title": request.title_or_default(),
            "download": true,
            "output_path": OUTPUT_PATH,
        });

        let send = self
            .client
            .post(&self.service_url)
            .header(reqwest::header::ACCEPT, "text/plain")
            .json(&payload)
            .send();

        let response = tokio::time::timeout(self.response_timeout, send)
            .await
            .map_err(|_| ReelscoutError::Timeout(self.service_url.clone()))?
            .map_err(|e| ReelscoutError::from_request(&self.service_url, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_GATEWAY {
            return Err(ReelscoutError::Upstream(
                "download service is sleeping or crashed (502), restart it and retry".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReelscoutError::Upstream(format!(
                "download service responded with status {} - {}",
                status.as_u16(),
                body.trim()
            )));
        }

        Ok(response)
    }

    /// Relays a download as a stream of progress events
    ///
    /// The stream owns the upstream response. Dropping it (for example
    /// when the client disconnects) closes the upstream connection.
    pub fn relay(&self, request: DownloadRequest) -> impl Stream<Item = ProgressEvent> + Send + 'static {
        let relay = self.clone();

        async_stream::stream! {
            let mut guard = RelayGuard::new(&request.movie_url);

            yield ProgressEvent::new(EventStatus::Started, "Initializing download relay")
                .with_field("movieUrl", request.movie_url.clone())
                .with_field("title", request.title_or_default());
            yield ProgressEvent::new(EventStatus::Info, "Connecting to download service");

            let response = match relay.connect(&request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(url = %request.movie_url, error = %e, "download relay failed to connect");
                    guard.finish();
                    yield ProgressEvent::new(EventStatus::Error, format!("Connection failed: {}", e));
                    return;
                }
            };

            yield ProgressEvent::new(EventStatus::Info, "Download service connected");

            let mut body = response.bytes_stream();
            let mut lines = LineBuffer::default();
            let mut terminal_seen = false;

            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(bytes) => {
                        for line in lines.push(&bytes) {
                            if let Some(event) = ProgressEvent::from_line(&line) {
                                terminal_seen |= event.status.is_terminal();
                                yield event;
                            }
                        }
                    }
                    Err(e) => {
                        guard.finish();
                        yield ProgressEvent::new(EventStatus::Error, format!("Stream error: {}", e));
                        return;
                    }
                }
            }

            if let Some(line) = lines.finish()
                && let Some(event) = ProgressEvent::from_line(&line)
            {
                terminal_seen |= event.status.is_terminal();
                yield event;
            }

            guard.finish();
            if !terminal_seen {
                yield ProgressEvent::new(EventStatus::Completed, "Download process completed");
            }
        }
    }
}

/// Splits a byte stream into lines across chunk boundaries
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }

    fn finish(self) -> Option<String> {
        (!self.pending.is_empty()).then(|| String::from_utf8_lossy(&self.pending).into_owned())
    }
}

/// Logs when a relay stream is dropped before it finished
struct RelayGuard {
    movie_url: String,
    finished: bool,
}

impl RelayGuard {
    fn new(movie_url: &str) -> Self {
        Self {
            movie_url: movie_url.to_string(),
            finished: false,
        }
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(url = %self.movie_url, "client disconnected, download relay dropped");
        }
    }
}
