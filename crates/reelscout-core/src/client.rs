//! HTML fetcher with browser-like headers and request jitter
//!
//! Provides an HTTP client that rotates user agents, sends a browser
//! header set, waits a random delay before each request and follows
//! a bounded number of redirects.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

use crate::error::{ReelscoutError, Result};

/// Configuration for the HTML fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Lower bound of the pre-request delay in milliseconds (default: 500)
    pub min_delay_ms: u64,
    /// Upper bound of the pre-request delay in milliseconds (default: 2500)
    pub max_delay_ms: u64,
    /// Maximum redirects followed per request (default: 5)
    pub max_redirects: usize,
    /// Seed for user agent and delay selection; random when `None`
    pub seed: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            min_delay_ms: 500,
            max_delay_ms: 2500,
            max_redirects: 5,
            seed: None,
        }
    }
}

const CHROME_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

const FIREFOX_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
];

const SAFARI_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

const MOBILE_AGENTS: &[&str] = &[
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
];

const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Header set sent with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProfile {
    /// Desktop user agent with the full browser header set
    Desktop,
    /// Mobile user agent with a reduced header set
    Mobile,
    /// User agent, `Accept` and `Referer` only
    Minimal,
}

impl HeaderProfile {
    /// Order tried by [`HtmlFetcher::fetch_with_fallback`]
    pub const FALLBACK_ORDER: [HeaderProfile; 3] =
        [HeaderProfile::Desktop, HeaderProfile::Mobile, HeaderProfile::Minimal];
}

/// Browser family a request impersonates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
}

impl Browser {
    /// Every browser family, in session order
    pub const ALL: [Browser; 3] = [Browser::Chrome, Browser::Firefox, Browser::Safari];

    fn agents(&self) -> &'static [&'static str] {
        match self {
            Browser::Chrome => CHROME_AGENTS,
            Browser::Firefox => FIREFOX_AGENTS,
            Browser::Safari => SAFARI_AGENTS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Safari => "safari",
        }
    }
}

/// Random pre-request delay and user agent picker
///
/// The RNG lock is only held while drawing a value, never across an await.
pub struct Jitter {
    min: Duration,
    max: Duration,
    rng: Mutex<StdRng>,
}

impl Jitter {
    /// Create a jitter source for the given delay range
    ///
    /// # Arguments
    /// * `min_ms` - Shortest delay in milliseconds
    /// * `max_ms` - Longest delay in milliseconds; raised to `min_ms` if lower
    /// * `seed` - Fixed seed for reproducible draws
    pub fn new(min_ms: u64, max_ms: u64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms.max(min_ms)),
            rng: Mutex::new(rng),
        }
    }

    /// Draw the next delay
    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(self.min..=self.max)
    }

    /// Pick one entry of a pool
    pub fn pick<'a>(&self, pool: &[&'a str]) -> &'a str {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        pool.choose(&mut *rng).copied().unwrap_or(CHROME_AGENTS[0])
    }

    /// Sleep for the next delay
    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    /// Delay range
    pub fn range(&self) -> (Duration, Duration) {
        (self.min, self.max)
    }
}

/// HTTP client for fetching listing and movie pages
///
/// Handles all outbound page fetches, including:
/// - User agent rotation per request
/// - Browser-like headers (Accept, Sec-Fetch-*, DNT, Referer)
/// - Random delay before each request
/// - Manual, bounded redirect following
pub struct HtmlFetcher {
    client: reqwest::Client,
    jitter: Jitter,
    max_redirects: usize,
}

impl HtmlFetcher {
    /// Create a new fetcher with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new fetcher with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(ReelscoutError::HttpError)?;

        Ok(Self {
            client,
            jitter: Jitter::new(config.min_delay_ms, config.max_delay_ms, config.seed),
            max_redirects: config.max_redirects,
        })
    }

    /// Fetch a page with the desktop header profile
    ///
    /// # Arguments
    /// * `url` - Absolute URL to fetch
    /// * `referer` - Optional `Referer` header value
    ///
    /// # Returns
    /// The response body as text
    ///
    /// # Errors
    /// - `Status` - Server answered with a non-success status
    /// - `Timeout` - Request exceeded the configured timeout
    /// - `HttpError` - Connection or protocol error
    pub async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<String> {
        self.fetch_with_profile(url, referer, HeaderProfile::Desktop).await
    }

    /// Fetch a page with a specific header profile
    pub async fn fetch_with_profile(
        &self,
        url: &str,
        referer: Option<&str>,
        profile: HeaderProfile,
    ) -> Result<String> {
        let agent = match profile {
            HeaderProfile::Desktop => self.pick_desktop_agent(),
            HeaderProfile::Mobile => self.jitter.pick(MOBILE_AGENTS),
            HeaderProfile::Minimal => self.jitter.pick(CHROME_AGENTS),
        };
        let headers = profile_headers(profile, agent, referer);

        self.jitter.pause().await;
        self.do_fetch(url, headers).await
    }

    /// Fetch a page, trying each header profile once until one succeeds
    ///
    /// Profiles are tried in [`HeaderProfile::FALLBACK_ORDER`]. There is no
    /// backoff: each profile gets exactly one attempt.
    ///
    /// # Errors
    /// Returns `FetchFailed` when every profile failed
    pub async fn fetch_with_fallback(&self, url: &str, referer: Option<&str>) -> Result<String> {
        for profile in HeaderProfile::FALLBACK_ORDER {
            match self.fetch_with_profile(url, referer, profile).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    tracing::warn!(url, ?profile, error = %e, "fetch attempt failed");
                }
            }
        }
        Err(ReelscoutError::FetchFailed(url.to_string()))
    }

    /// Fetch a page impersonating one browser family
    pub async fn fetch_as(&self, url: &str, referer: Option<&str>, browser: Browser) -> Result<String> {
        let agent = self.jitter.pick(browser.agents());
        let headers = profile_headers(HeaderProfile::Desktop, agent, referer);

        self.jitter.pause().await;
        self.do_fetch(url, headers).await
    }

    /// Perform a single fetch attempt with manual redirect following
    async fn do_fetch(&self, url: &str, headers: HeaderMap) -> Result<String> {
        let mut current_url = url.to_string();

        for _ in 0..=self.max_redirects {
            let response = self
                .client
                .get(&current_url)
                .headers(headers.clone())
                .send()
                .await
                .map_err(|e| ReelscoutError::from_request(&current_url, e))?;

            let status = response.status();

            if status.is_redirection() {
                if let Some(location) = response.headers().get(header::LOCATION)
                    && let Ok(loc_str) = location.to_str()
                {
                    current_url = resolve_location(&current_url, loc_str)?;
                    continue;
                }
                // No usable Location header, return the body as-is
                return response
                    .text()
                    .await
                    .map_err(|e| ReelscoutError::from_request(&current_url, e));
            }

            if !status.is_success() {
                return Err(ReelscoutError::Status {
                    status: status.as_u16(),
                    url: current_url,
                });
            }

            return response
                .text()
                .await
                .map_err(|e| ReelscoutError::from_request(&current_url, e));
        }

        Err(ReelscoutError::TooManyRedirects(url.to_string()))
    }

    fn pick_desktop_agent(&self) -> &'static str {
        let pools = [CHROME_AGENTS, FIREFOX_AGENTS, SAFARI_AGENTS];
        let all: Vec<&'static str> = pools.iter().flat_map(|p| p.iter().copied()).collect();
        self.jitter.pick(&all)
    }

    /// Get a reference to the jitter source (for testing)
    pub fn jitter(&self) -> &Jitter {
        &self.jitter
    }
}

fn resolve_location(current: &str, location: &str) -> Result<String> {
    let base = Url::parse(current).map_err(|_| ReelscoutError::InvalidUrl(current.to_string()))?;
    base.join(location)
        .map(String::from)
        .map_err(|_| ReelscoutError::InvalidUrl(location.to_string()))
}

/// Build the header map for a profile
fn profile_headers(profile: HeaderProfile, agent: &'static str, referer: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(agent));

    match profile {
        HeaderProfile::Desktop => {
            headers.insert(header::ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
            headers.insert(
                header::ACCEPT_LANGUAGE,
                HeaderValue::from_static("en-US,en;q=0.9,hi;q=0.8"),
            );
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
            headers.insert(header::DNT, HeaderValue::from_static("1"));
            headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
            headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
            headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
            headers.insert(
                "sec-fetch-site",
                HeaderValue::from_static(if referer.is_some() { "same-origin" } else { "none" }),
            );
            headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
        }
        HeaderProfile::Mobile => {
            headers.insert(header::ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
            headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
            headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        }
        HeaderProfile::Minimal => {
            headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        }
    }

    if let Some(referer) = referer
        && let Ok(value) = HeaderValue::from_str(referer)
    {
        headers.insert(header::REFERER, value);
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quiet_config() -> ClientConfig {
        ClientConfig {
            timeout_secs: 5,
            min_delay_ms: 0,
            max_delay_ms: 0,
            max_redirects: 3,
            seed: Some(7),
        }
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.min_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 2500);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_fetcher_creation() {
        assert!(HtmlFetcher::new().is_ok());
        assert!(HtmlFetcher::with_config(quiet_config()).is_ok());
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let jitter = Jitter::new(500, 2500, Some(42));
        for _ in 0..100 {
            let delay = jitter.next_delay();
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(2500));
        }
    }

    #[test]
    fn test_jitter_seeded_is_reproducible() {
        let a = Jitter::new(0, 10_000, Some(9));
        let b = Jitter::new(0, 10_000, Some(9));
        let draws_a: Vec<_> = (0..10).map(|_| a.next_delay()).collect();
        let draws_b: Vec<_> = (0..10).map(|_| b.next_delay()).collect();
        assert_eq!(draws_a, draws_b);
        assert_eq!(a.pick(CHROME_AGENTS), b.pick(CHROME_AGENTS));
    }

    #[test]
    fn test_jitter_inverted_range_is_clamped() {
        let jitter = Jitter::new(300, 100, None);
        assert_eq!(jitter.range(), (Duration::from_millis(300), Duration::from_millis(300)));
        assert_eq!(jitter.next_delay(), Duration::from_millis(300));
    }

    #[test]
    fn test_desktop_headers() {
        let headers = profile_headers(HeaderProfile::Desktop, CHROME_AGENTS[0], Some("https://site.example/"));
        assert_eq!(headers[header::USER_AGENT], CHROME_AGENTS[0]);
        assert_eq!(headers[header::REFERER], "https://site.example/");
        assert_eq!(headers["sec-fetch-mode"], "navigate");
        assert_eq!(headers["sec-fetch-site"], "same-origin");
        assert_eq!(headers[header::DNT], "1");
        assert!(headers.contains_key(header::CACHE_CONTROL));
    }

    #[test]
    fn test_minimal_headers() {
        let headers = profile_headers(HeaderProfile::Minimal, CHROME_AGENTS[0], None);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[header::ACCEPT], "*/*");
        assert!(!headers.contains_key(header::REFERER));
    }

    #[test]
    fn test_browser_agent_pools() {
        assert!(Browser::Firefox.agents().iter().all(|a| a.contains("Firefox")));
        assert!(Browser::Safari.agents().iter().all(|a| a.contains("Version/")));
        assert!(Browser::Chrome.agents().iter().all(|a| a.contains("Chrome/")));
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let fetcher = HtmlFetcher::with_config(quiet_config()).expect("Fetcher should build");
        let body = fetcher
            .fetch(&format!("{}/movie", server.uri()), None)
            .await
            .expect("Fetch should succeed");
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_maps_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HtmlFetcher::with_config(quiet_config()).expect("Fetcher should build");
        let url = format!("{}/missing", server.uri());
        let result = fetcher.fetch(&url, None).await;
        match result {
            Err(ReelscoutError::Status { status, url: failed }) => {
                assert_eq!(status, 404);
                assert_eq!(failed, url);
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_follows_relative_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&server)
            .await;

        let fetcher = HtmlFetcher::with_config(quiet_config()).expect("Fetcher should build");
        let body = fetcher
            .fetch(&format!("{}/old", server.uri()), None)
            .await
            .expect("Fetch should succeed");
        assert_eq!(body, "moved");
    }

    #[tokio::test]
    async fn test_fetch_stops_after_max_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
            .mount(&server)
            .await;

        let fetcher = HtmlFetcher::with_config(quiet_config()).expect("Fetcher should build");
        let result = fetcher.fetch(&format!("{}/loop", server.uri()), None).await;
        assert!(matches!(result, Err(ReelscoutError::TooManyRedirects(_))));
    }

    #[tokio::test]
    async fn test_fallback_uses_next_profile() {
        let server = MockServer::start().await;
        // Desktop profile is the only one sending sec-fetch-mode
        Mock::given(method("GET"))
            .and(header_exists("sec-fetch-mode"))
            .respond_with(ResponseTemplate::new(403))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("results"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HtmlFetcher::with_config(quiet_config()).expect("Fetcher should build");
        let body = fetcher
            .fetch_with_fallback(&format!("{}/search", server.uri()), Some("https://site.example/"))
            .await
            .expect("Fallback should succeed");
        assert_eq!(body, "results");
    }

    #[tokio::test]
    async fn test_fallback_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = HtmlFetcher::with_config(quiet_config()).expect("Fetcher should build");
        let result = fetcher.fetch_with_fallback(&format!("{}/x", server.uri()), None).await;
        assert!(matches!(result, Err(ReelscoutError::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_fetch_as_pins_browser_family() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let fetcher = HtmlFetcher::with_config(quiet_config()).expect("Fetcher should build");
        fetcher
            .fetch_as(&server.uri(), None, Browser::Firefox)
            .await
            .expect("Fetch should succeed");

        let requests = server.received_requests().await.expect("Recording is enabled");
        let agent = requests[0]
            .headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .expect("User agent should be sent");
        assert!(agent.contains("Firefox"));
    }

    #[tokio::test]
    async fn test_cookies_are_not_carried_between_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/first"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "session=abc; Path=/")
                    .set_body_string("first"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/second"))
            .and(header_exists("cookie"))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/second"))
            .respond_with(ResponseTemplate::new(200).set_body_string("second"))
            .mount(&server)
            .await;

        let fetcher = HtmlFetcher::with_config(quiet_config()).expect("Fetcher should build");
        fetcher
            .fetch(&format!("{}/first", server.uri()), None)
            .await
            .expect("Fetch should succeed");
        let body = fetcher
            .fetch(&format!("{}/second", server.uri()), None)
            .await
            .expect("Second fetch should carry no cookie");
        assert_eq!(body, "second");
    }
}
