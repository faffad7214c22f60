//! Main scraper API
//!
//! Combines the HTML fetcher with the extraction engine and the listing
//! parser: fetch a page, run a rule set over it, return ranked results.

use futures::future::join_all;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::client::{Browser, ClientConfig, HtmlFetcher};
use crate::error::{ReelscoutError, Result};
use crate::parser::{
    DEFAULT_CAP, DEFAULT_LISTING_CAP, ExtractOptions, ListingSite, RuleSet, extract_candidates,
    parse_listing,
};
use crate::ranking::rank;
use crate::types::{Candidate, MovieRecord};

/// How links are extracted from a movie page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionMethod {
    /// One fetch, full download rule set
    #[default]
    Enhanced,
    /// One fetch per browser family, results merged
    Playwright,
    /// One fetch, cloud/direct/torrent subset with inferred services
    Basic,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Enhanced => "enhanced",
            ExtractionMethod::Playwright => "playwright",
            ExtractionMethod::Basic => "basic",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionMethod {
    type Err = ReelscoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enhanced" => Ok(ExtractionMethod::Enhanced),
            "playwright" => Ok(ExtractionMethod::Playwright),
            "basic" => Ok(ExtractionMethod::Basic),
            other => Err(ReelscoutError::InvalidQuery(format!(
                "unknown extraction method '{}'",
                other
            ))),
        }
    }
}

/// Result caps per operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultLimits {
    /// Single-page extraction (enhanced)
    pub page: usize,
    /// Multi-session extraction (playwright)
    pub sessions: usize,
    /// Basic extraction
    pub basic: usize,
    /// Listing and search results
    pub listing: usize,
    /// Streams kept per movie page
    pub streams: usize,
}

impl Default for ResultLimits {
    fn default() -> Self {
        Self {
            page: DEFAULT_CAP,
            sessions: 15,
            basic: 15,
            listing: DEFAULT_LISTING_CAP,
            streams: DEFAULT_CAP,
        }
    }
}

/// Main scraper API
///
/// Owns one [`HtmlFetcher`] and the built-in rule sets. Each call is an
/// independent request lifecycle; nothing is cached between calls.
pub struct MovieScraper {
    fetcher: HtmlFetcher,
    limits: ResultLimits,
    download_rules: RuleSet,
    basic_rules: RuleSet,
    streaming_rules: RuleSet,
}

impl MovieScraper {
    /// Create a new scraper with default configuration
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default(), ResultLimits::default())
    }

    /// Create a new scraper with custom fetcher configuration and caps
    ///
    /// # Arguments
    /// * `config` - Fetcher configuration
    /// * `limits` - Result caps per operation
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails
    pub fn with_config(config: ClientConfig, limits: ResultLimits) -> Result<Self> {
        Ok(Self {
            fetcher: HtmlFetcher::with_config(config)?,
            limits,
            download_rules: RuleSet::download(),
            basic_rules: RuleSet::basic(),
            streaming_rules: RuleSet::streaming(),
        })
    }

    pub fn limits(&self) -> &ResultLimits {
        &self.limits
    }

    /// Extract download links from a movie page
    ///
    /// # Arguments
    /// * `url` - Absolute `http(s)` URL of the page
    /// * `method` - Extraction method
    ///
    /// # Returns
    /// Ranked candidates, capped per method
    ///
    /// # Errors
    /// - `InvalidUrl` if `url` is not an absolute http(s) URL
    /// - `Status`, `Timeout`, `HttpError` if the page cannot be fetched
    ///   (enhanced and basic only; multi-session never fails on fetch)
    ///
    /// # Example
    /// ```no_run
    /// # async fn example() -> reelscout_core::Result<()> {
    /// use reelscout_core::{ExtractionMethod, MovieScraper};
    /// let scraper = MovieScraper::new()?;
    /// let links = scraper.extract_links("https://example.com/movie/1", ExtractionMethod::Enhanced).await?;
    /// for link in links {
    ///     println!("{} [{}] {}", link.service, link.quality, link.url);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn extract_links(&self, url: &str, method: ExtractionMethod) -> Result<Vec<Candidate>> {
        let referer = page_referer(url)?;

        let links = match method {
            ExtractionMethod::Enhanced => {
                let html = self.fetcher.fetch(url, Some(&referer)).await?;
                extract_candidates(
                    &html,
                    url,
                    &self.download_rules,
                    &ExtractOptions::with_cap(self.limits.page),
                )
            }
            ExtractionMethod::Basic => {
                let html = self.fetcher.fetch(url, Some(&referer)).await?;
                extract_candidates(
                    &html,
                    url,
                    &self.basic_rules,
                    &ExtractOptions::with_cap(self.limits.basic),
                )
            }
            ExtractionMethod::Playwright => self.extract_multi_session(url, &referer).await,
        };

        tracing::info!(url, %method, count = links.len(), "links extracted");
        Ok(links)
    }

    /// Fetch the page once per browser family concurrently and merge
    ///
    /// A failed session contributes no candidates.
    async fn extract_multi_session(&self, url: &str, referer: &str) -> Vec<Candidate> {
        let sessions = Browser::ALL.map(|browser| async move {
            (browser, self.fetcher.fetch_as(url, Some(referer), browser).await)
        });

        let mut merged = Vec::new();
        for (browser, result) in join_all(sessions).await {
            match result {
                Ok(html) => {
                    let found = extract_candidates(
                        &html,
                        url,
                        &self.download_rules,
                        &ExtractOptions::with_cap(usize::MAX),
                    );
                    tracing::debug!(browser = browser.name(), count = found.len(), "session finished");
                    merged.extend(found);
                }
                Err(e) => {
                    tracing::warn!(browser = browser.name(), error = %e, "session failed");
                }
            }
        }

        rank(merged, self.limits.sessions)
    }

    /// Search a listing site and parse the results page
    ///
    /// The search page is fetched with header-profile fallback. Only
    /// records whose title contains the query (case-insensitive) are kept.
    ///
    /// # Errors
    /// - `InvalidQuery` if the query is empty or whitespace only
    /// - `FetchFailed` if every header profile failed
    /// - `ParseError` if HTML parsing fails
    pub async fn search_listing(&self, site: &ListingSite, query: &str) -> Result<Vec<MovieRecord>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(ReelscoutError::InvalidQuery(
                "Search query cannot be empty".to_string(),
            ));
        }

        let search_url = site.search_url(trimmed);
        let html = self
            .fetcher
            .fetch_with_fallback(&search_url, Some(&site.referer()))
            .await?;

        let records = parse_listing(&html, site, Some(trimmed), self.limits.listing)?;

        tracing::info!(source = %site.source, query = trimmed, count = records.len(), "listing parsed");
        Ok(records)
    }

    /// Search a listing site, then mine each movie page for streams
    ///
    /// Movie pages are fetched concurrently. A page that fails to load
    /// leaves its record with no streams. When streams are found, the
    /// record's `url` becomes the first stream and `movie_page_url`
    /// keeps the page.
    ///
    /// # Errors
    /// Same as [`MovieScraper::search_listing`]
    pub async fn search_with_streams(&self, site: &ListingSite, query: &str) -> Result<Vec<MovieRecord>> {
        let records = self.search_listing(site, query).await?;
        let referer = site.referer();

        let enriched = records.into_iter().map(|mut record| {
            let referer = referer.as_str();
            async move {
                record.streaming_urls = self.streams_for(&record.movie_page_url, referer).await;
                if let Some(first) = record.streaming_urls.first() {
                    record.url = first.url.clone();
                }
                record
            }
        });

        Ok(join_all(enriched).await)
    }

    async fn streams_for(&self, page_url: &str, referer: &str) -> Vec<Candidate> {
        match self.fetcher.fetch(page_url, Some(referer)).await {
            Ok(html) => extract_candidates(
                &html,
                page_url,
                &self.streaming_rules,
                &ExtractOptions::with_cap(self.limits.streams),
            ),
            Err(e) => {
                tracing::warn!(url = page_url, error = %e, "movie page fetch failed");
                Vec::new()
            }
        }
    }
}

/// Validates a page URL and returns its origin as a referer
fn page_referer(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|_| ReelscoutError::InvalidUrl(url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ReelscoutError::InvalidUrl(url.to_string()));
    }
    Ok(format!("{}/", parsed.origin().ascii_serialization()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!("enhanced".parse::<ExtractionMethod>().ok(), Some(ExtractionMethod::Enhanced));
        assert_eq!(" Playwright ".parse::<ExtractionMethod>().ok(), Some(ExtractionMethod::Playwright));
        assert_eq!("basic".parse::<ExtractionMethod>().ok(), Some(ExtractionMethod::Basic));
        assert!("selenium".parse::<ExtractionMethod>().is_err());
        assert_eq!(ExtractionMethod::default(), ExtractionMethod::Enhanced);
    }

    #[test]
    fn test_default_limits() {
        let limits = ResultLimits::default();
        assert_eq!(limits.page, 20);
        assert_eq!(limits.sessions, 15);
        assert_eq!(limits.listing, 15);
    }

    #[test]
    fn test_page_referer() {
        assert_eq!(
            page_referer("https://www.5movierulz.villas/movie/x.html").ok().as_deref(),
            Some("https://www.5movierulz.villas/")
        );
        assert!(matches!(page_referer("ftp://host/x"), Err(ReelscoutError::InvalidUrl(_))));
        assert!(matches!(page_referer("not a url"), Err(ReelscoutError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_extract_links_rejects_invalid_url() {
        let scraper = MovieScraper::new().expect("Scraper should build");
        let result = scraper.extract_links("javascript:alert(1)", ExtractionMethod::Enhanced).await;
        assert!(matches!(result, Err(ReelscoutError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_search_listing_rejects_blank_query() {
        let scraper = MovieScraper::new().expect("Scraper should build");
        let result = scraper.search_listing(&ListingSite::moviezwap(), "   ").await;
        assert!(matches!(result, Err(ReelscoutError::InvalidQuery(_))));
    }
}
