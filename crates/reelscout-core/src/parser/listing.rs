//! Listing page parser
//!
//! Parses search-result and listing pages of movie sites into
//! [`MovieRecord`]s. Container segmentation uses CSS selectors; titles,
//! URLs and posters are read from each container's elements.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

use crate::error::{ReelscoutError, Result};
use crate::parser::metadata::{clean_title, extract_genre, extract_language, extract_quality, extract_year};
use crate::types::MovieRecord;
use crate::url::{build_search_url, resolve_listing_url};

/// Default number of movie records returned per listing
pub const DEFAULT_LISTING_CAP: usize = 15;

/// Container selectors, tried in order; the first with any match wins
const CONTAINER_SELECTORS: &[&str] = &[
    "div.mylist",
    "article[class*=post]",
    "div[class*=film]",
    "div[class*=movie]",
];

/// Title selectors inside a container, tried in order
const TITLE_SELECTORS: &[TitleSource] = &[
    TitleSource::Text("h1 a, h2 a, h3 a, h4 a, h5 a, h6 a"),
    TitleSource::Text("h1, h2, h3, h4, h5, h6"),
    TitleSource::Text("a[class*=title]"),
    TitleSource::Attr("a[title]", "title"),
    TitleSource::Text("a"),
    TitleSource::Text("span[class*=title], div[class*=title]"),
];

/// Words marking navigation entries rather than movies
const NAVIGATION_LABELS: &[&str] = &["home", "featured", "search", "category"];

enum TitleSource {
    Text(&'static str),
    Attr(&'static str, &'static str),
}

/// A movie listing site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSite {
    /// Label written into each record's `source`
    pub source: String,
    /// Scheme and host, without trailing slash
    pub base_url: String,
    /// Search path up to and including the query parameter
    pub search_path: String,
    /// Whether container images are real posters (vs. list bullets)
    pub scraped_posters: bool,
}

impl ListingSite {
    /// moviezwap search results (`div.mylist` rows)
    pub fn moviezwap() -> Self {
        Self {
            source: "moviezwap.care".to_string(),
            base_url: "https://www.moviezwap.care".to_string(),
            search_path: "/search.php?q=".to_string(),
            scraped_posters: false,
        }
    }

    /// 5movierulz search results (`article.post` cards)
    pub fn movierulz() -> Self {
        Self {
            source: "5movierulz.villas".to_string(),
            base_url: "https://www.5movierulz.villas".to_string(),
            search_path: "/search_movies?s=".to_string(),
            scraped_posters: true,
        }
    }

    /// Replaces the base URL, keeping every other setting
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builds the search URL for a query
    pub fn search_url(&self, query: &str) -> String {
        build_search_url(&self.base_url, &self.search_path, query)
    }

    /// Referer sent with requests to this site
    pub fn referer(&self) -> String {
        format!("{}/", self.base_url)
    }
}

/// Parses a listing page into movie records
///
/// # Arguments
/// * `html` - Raw HTML of the listing or search-results page
/// * `site` - Site the page came from
/// * `query` - When `Some`, only titles containing it (case-insensitive) are kept
/// * `cap` - Maximum number of records returned
///
/// # Returns
/// Records in page order with duplicate titles removed
///
/// # Errors
/// Returns `ParseError` if a selector fails to compile
pub fn parse_listing(
    html: &str,
    site: &ListingSite,
    query: Option<&str>,
    cap: usize,
) -> Result<Vec<MovieRecord>> {
    let document = Html::parse_document(html);
    let query = query.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty());
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for css in CONTAINER_SELECTORS {
        let selector = parse_selector(css)?;
        let containers: Vec<ElementRef> = document.select(&selector).collect();
        if containers.is_empty() {
            continue;
        }

        tracing::debug!(selector = css, count = containers.len(), "listing containers found");
        for container in containers {
            if let Some(record) = parse_container(&container, site)?
                && keep_record(&record, query.as_deref(), &mut seen)
            {
                records.push(record);
            }
        }
        break;
    }

    if records.is_empty() {
        records = parse_fallback_anchors(&document, site, query.as_deref(), &mut seen)?;
    }

    records.truncate(cap);
    Ok(records)
}

fn parse_container(container: &ElementRef, site: &ListingSite) -> Result<Option<MovieRecord>> {
    let Some(raw_title) = container_title(container)? else {
        return Ok(None);
    };

    let href_selector = parse_selector("a[href]")?;
    let Some(url) = container
        .select(&href_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_listing_url(href, &site.base_url))
    else {
        return Ok(None);
    };

    let poster = if site.scraped_posters {
        let img_selector = parse_selector("img[src]")?;
        container
            .select(&img_selector)
            .next()
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| resolve_listing_url(src, &site.base_url))
    } else {
        None
    };

    Ok(Some(build_record(&raw_title, url, poster, site)))
}

fn container_title(container: &ElementRef) -> Result<Option<String>> {
    for source in TITLE_SELECTORS {
        let title = match source {
            TitleSource::Text(css) => {
                let selector = parse_selector(css)?;
                container
                    .select(&selector)
                    .map(|el| el.text().collect::<String>().trim().to_string())
                    .find(|t| t.chars().count() > 2)
            }
            TitleSource::Attr(css, attr) => {
                let selector = parse_selector(css)?;
                container
                    .select(&selector)
                    .filter_map(|el| el.value().attr(attr))
                    .map(|t| t.trim().to_string())
                    .find(|t| t.chars().count() > 2)
            }
        };

        if title.is_some() {
            return Ok(title);
        }
    }
    Ok(None)
}

fn parse_fallback_anchors(
    document: &Html,
    site: &ListingSite,
    query: Option<&str>,
    seen: &mut HashSet<String>,
) -> Result<Vec<MovieRecord>> {
    let selector = parse_selector("a[href$='.html']")?;
    let mut records = Vec::new();

    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let title = anchor.text().collect::<String>().trim().to_string();

        if title.chars().count() <= 5 || !href.contains("movie") {
            continue;
        }
        let Some(url) = resolve_listing_url(href, &site.base_url) else {
            continue;
        };

        let record = build_record(&title, url, None, site);
        if keep_record(&record, query, seen) {
            records.push(record);
        }
    }

    if !records.is_empty() {
        tracing::debug!(count = records.len(), "listing fallback anchors used");
    }
    Ok(records)
}

fn build_record(raw_title: &str, url: String, poster: Option<String>, site: &ListingSite) -> MovieRecord {
    let title = clean_title(raw_title);
    MovieRecord {
        poster: poster.unwrap_or_else(|| placeholder_poster(&title)),
        year: extract_year(raw_title),
        quality: extract_quality(raw_title),
        language: extract_language(raw_title),
        genre: extract_genre(raw_title),
        source: site.source.clone(),
        movie_page_url: url.clone(),
        url,
        title,
        streaming_urls: Vec::new(),
    }
}

/// Applies the title and URL filters, recording the title's dedupe key
fn keep_record(record: &MovieRecord, query: Option<&str>, seen: &mut HashSet<String>) -> bool {
    let lower = record.title.to_lowercase();

    if record.title.chars().count() <= 3 {
        return false;
    }
    if NAVIGATION_LABELS.iter().any(|label| lower.contains(label)) {
        return false;
    }
    if record.movie_page_url.contains("/category/") {
        return false;
    }
    if let Some(query) = query
        && !lower.contains(query)
    {
        return false;
    }

    seen.insert(title_key(&record.title))
}

/// Dedupe key: lowercase ASCII alphanumerics of the title
fn title_key(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Builds an SVG poster placeholder as a base64 data URI
///
/// The image shows the first 20 characters of the title.
pub fn placeholder_poster(title: &str) -> String {
    let label: String = title.chars().take(20).collect();
    let label = label
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    let svg = format!(
        concat!(
            r##"<svg width="300" height="400" xmlns="http://www.w3.org/2000/svg">"##,
            r##"<rect width="100%" height="100%" fill="#667eea"/>"##,
            r##"<text x="50%" y="50%" font-family="Arial, sans-serif" font-size="18" "##,
            r##"fill="#ffffff" text-anchor="middle" dy=".3em">{}</text></svg>"##
        ),
        label
    );
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ReelscoutError::ParseError(format!("Invalid selector: {:?}", e)))
}
