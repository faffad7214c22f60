//! Core data types for reelscout
//!
//! Contains the candidate link and movie record structures shared by the
//! extraction engine, the listing parser and the HTTP layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder used by every metadata heuristic when nothing matched
pub const UNKNOWN: &str = "Unknown";

/// Hosting provider category of a candidate link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    #[serde(rename = "Google Drive")]
    GoogleDrive,
    #[serde(rename = "Mega")]
    Mega,
    #[serde(rename = "MediaFire")]
    MediaFire,
    #[serde(rename = "Dropbox")]
    Dropbox,
    #[serde(rename = "Direct Download")]
    DirectDownload,
    #[serde(rename = "File Hosting")]
    FileHosting,
    #[serde(rename = "Streaming")]
    Streaming,
    #[serde(rename = "Torrent")]
    Torrent,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Service {
    /// Human readable label, identical to the serialized form
    pub fn label(&self) -> &'static str {
        match self {
            Service::GoogleDrive => "Google Drive",
            Service::Mega => "Mega",
            Service::MediaFire => "MediaFire",
            Service::Dropbox => "Dropbox",
            Service::DirectDownload => "Direct Download",
            Service::FileHosting => "File Hosting",
            Service::Streaming => "Streaming",
            Service::Torrent => "Torrent",
            Service::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a candidate link was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// `href` pointing at a video file
    Direct,
    /// Cloud storage share link
    Cloud,
    /// `.torrent` file or magnet URI
    Torrent,
    /// Third-party file locker
    Filehost,
    /// Streaming embed page
    Stream,
    /// Anchor, button or div carrying download intent
    Button,
    /// URL assigned inside inline script
    Javascript,
    /// Base64-encoded `data-url` attribute
    Hidden,
}

/// A single discovered download or stream link with inferred metadata
///
/// Created transiently per extraction run; `url` is always absolute
/// (`http(s)://` or `magnet:`) and unique within one result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Absolute, normalized URL
    pub url: String,

    /// Hosting provider category
    pub service: Service,

    /// Discovery category
    #[serde(rename = "type")]
    pub link_type: LinkType,

    /// Quality label (e.g. "1080p", "BluRay") or "Unknown"
    pub quality: String,

    /// File size as found near the link (e.g. "1.4 GB") or "Unknown"
    pub size: String,

    /// Audio language label or "Unknown"
    pub language: String,

    /// Rank derived from `service`, lower is preferred
    pub priority: u8,
}

/// A movie entry parsed from a listing or search-results page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRecord {
    /// Cleaned title text
    pub title: String,

    /// Best URL for the movie: first stream when known, else the movie page
    pub url: String,

    /// Canonical movie page URL on the listing site
    pub movie_page_url: String,

    /// Listing site the record came from (e.g. "moviezwap.care")
    pub source: String,

    /// Four digit release year or "Unknown"
    pub year: String,

    /// Quality label or "Unknown"
    pub quality: String,

    /// Language label or "Unknown"
    pub language: String,

    /// Genre label or "Unknown"
    pub genre: String,

    /// Scraped poster URL or an SVG data-URI placeholder
    pub poster: String,

    /// Streaming links mined from the movie page
    pub streaming_urls: Vec<Candidate>,
}
