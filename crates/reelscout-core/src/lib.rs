//! reelscout Core Library
//!
//! Finds download and streaming links for movies on listing and
//! file-hosting sites.
//!
//! # Overview
//!
//! This crate provides the scraping engine behind the reelscout server:
//! - HTML fetcher with user agent rotation, browser headers and request jitter
//! - Regex extraction engine driven by ordered rule sets
//! - URL normalization, metadata heuristics and priority ranking
//! - Listing page parser producing movie records
//! - Clients for the search workflow webhook and the download service
//!
//! # Example
//!
//! ```no_run
//! use reelscout_core::{ExtractionMethod, ListingSite, MovieScraper, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let scraper = MovieScraper::new()?;
//!
//!     // Search a listing site
//!     let movies = scraper.search_listing(&ListingSite::moviezwap(), "kalki").await?;
//!
//!     // Extract ranked download links from the first movie page
//!     if let Some(movie) = movies.first() {
//!         let links = scraper
//!             .extract_links(&movie.movie_page_url, ExtractionMethod::Enhanced)
//!             .await?;
//!         for link in links {
//!             println!("{} {} {}", link.priority, link.service, link.url);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Offline extraction
//!
//! The engine itself is a pure function of HTML text and a base URL, see
//! [`parser::extract_candidates`].

mod client;
mod error;
pub mod parser;
pub mod ranking;
pub mod relay;
mod scraper;
mod types;
pub mod url;
pub mod webhook;

// Re-export client types
pub use client::{Browser, ClientConfig, HeaderProfile, HtmlFetcher, Jitter};

// Re-export error types
pub use error::{ReelscoutError, Result};

// Re-export the extraction engine
pub use parser::{ExtractOptions, ExtractorRule, ListingSite, RuleSet, extract_candidates, parse_listing};

// Re-export main scraper API
pub use scraper::{ExtractionMethod, MovieScraper, ResultLimits};

// Re-export data types
pub use types::{Candidate, LinkType, MovieRecord, Service, UNKNOWN};

// Re-export upstream clients
pub use relay::{DownloadRelay, DownloadRequest, EventStatus, ProgressEvent};
pub use webhook::WebhookClient;
