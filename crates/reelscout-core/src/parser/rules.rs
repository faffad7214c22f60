//! Extractor rules and the built-in rule sets
//!
//! A rule pairs a regex whose first capture group is a raw URL with the
//! link category and hosting service it implies. Rule sets are plain data:
//! the engine in [`super::links`] runs whatever set it is given.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use regex::Regex;
use std::sync::LazyLock;

use crate::error::{ReelscoutError, Result};
use crate::types::{LinkType, Service};

/// Video container extensions recognized as direct downloads
const VIDEO_EXTENSIONS: &str = "mp4|mkv|avi|mov|wmv|flv|webm|m4v|3gp|mpg|mpeg";

/// Third-party file lockers
const FILE_HOSTS: &str =
    "zippyshare|rapidgator|uploaded|turbobit|nitroflare|1fichier|uptobox|filefactory|depositfiles";

/// Streaming embed providers
const STREAM_HOSTS: &str = "streamtape|doodstream|mixdrop|streamlare|streamhub";

/// Substrings a script-assigned URL must contain to count as a download
const SCRIPT_URL_KEYWORDS: &[&str] = &[
    "download",
    "dl",
    "file",
    "movie",
    ".mp4",
    ".mkv",
    ".avi",
    "drive.google",
    "mega.nz",
];

/// Substrings a "watch online" anchor must contain to count as a stream
const STREAM_URL_KEYWORDS: &[&str] = &["streamlare", "vcdnlare", "stream"];

/// A single extraction rule
///
/// Every variant carries its compiled pattern; the first capture group of
/// each match is the raw URL handed to normalization.
#[derive(Debug, Clone)]
pub enum ExtractorRule {
    /// `href` attribute whose target fixes the service
    Href {
        name: &'static str,
        pattern: Regex,
        link_type: LinkType,
        service: Service,
    },

    /// Anchor, button or div that signals download intent
    Button { name: &'static str, pattern: Regex },

    /// URL assigned inside inline script
    ///
    /// When `keywords` is non-empty the URL must contain one of them.
    Script {
        name: &'static str,
        pattern: Regex,
        keywords: &'static [&'static str],
    },

    /// Base64-encoded `data-url` attribute
    ///
    /// Only decoded values starting with `http` or `magnet:` are kept.
    Base64 { name: &'static str, pattern: Regex },

    /// Link whose service is inferred from the URL text itself
    Inferred { name: &'static str, pattern: Regex },

    /// Streaming anchor filtered by URL keywords
    Stream {
        name: &'static str,
        pattern: Regex,
        keywords: &'static [&'static str],
    },
}

/// A raw rule match, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub raw: String,
    pub link_type: LinkType,
    pub service: Service,
}

impl ExtractorRule {
    /// Creates an `Href` rule from a pattern string
    ///
    /// # Errors
    /// Returns `ParseError` if the pattern does not compile
    pub fn href(
        name: &'static str,
        pattern: &str,
        link_type: LinkType,
        service: Service,
    ) -> Result<Self> {
        Ok(ExtractorRule::Href {
            name,
            pattern: compile(pattern)?,
            link_type,
            service,
        })
    }

    /// Creates a `Button` rule from a pattern string
    pub fn button(name: &'static str, pattern: &str) -> Result<Self> {
        Ok(ExtractorRule::Button {
            name,
            pattern: compile(pattern)?,
        })
    }

    /// Creates a `Script` rule from a pattern string
    pub fn script(
        name: &'static str,
        pattern: &str,
        keywords: &'static [&'static str],
    ) -> Result<Self> {
        Ok(ExtractorRule::Script {
            name,
            pattern: compile(pattern)?,
            keywords,
        })
    }

    /// Creates a `Base64` rule from a pattern string
    pub fn base64(name: &'static str, pattern: &str) -> Result<Self> {
        Ok(ExtractorRule::Base64 {
            name,
            pattern: compile(pattern)?,
        })
    }

    /// Creates an `Inferred` rule from a pattern string
    pub fn inferred(name: &'static str, pattern: &str) -> Result<Self> {
        Ok(ExtractorRule::Inferred {
            name,
            pattern: compile(pattern)?,
        })
    }

    /// Creates a `Stream` rule from a pattern string
    pub fn stream(
        name: &'static str,
        pattern: &str,
        keywords: &'static [&'static str],
    ) -> Result<Self> {
        Ok(ExtractorRule::Stream {
            name,
            pattern: compile(pattern)?,
            keywords,
        })
    }

    /// Rule name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ExtractorRule::Href { name, .. }
            | ExtractorRule::Button { name, .. }
            | ExtractorRule::Script { name, .. }
            | ExtractorRule::Base64 { name, .. }
            | ExtractorRule::Inferred { name, .. }
            | ExtractorRule::Stream { name, .. } => *name,
        }
    }

    fn pattern(&self) -> &Regex {
        match self {
            ExtractorRule::Href { pattern, .. }
            | ExtractorRule::Button { pattern, .. }
            | ExtractorRule::Script { pattern, .. }
            | ExtractorRule::Base64 { pattern, .. }
            | ExtractorRule::Inferred { pattern, .. }
            | ExtractorRule::Stream { pattern, .. } => pattern,
        }
    }

    /// Scans the whole document and returns every raw match in order
    ///
    /// Each call starts a fresh match iterator. A capture that cannot be
    /// decoded is skipped without affecting the remaining matches.
    pub fn scan(&self, html: &str) -> Vec<RuleMatch> {
        self.pattern()
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| self.classify(m.as_str()))
            .collect()
    }

    /// Filter a URL after normalization, for rules that restrict targets
    pub(crate) fn accepts(&self, url: &str) -> bool {
        match self {
            ExtractorRule::Script { keywords, .. } | ExtractorRule::Stream { keywords, .. } => {
                keywords.is_empty() || {
                    let lower = url.to_lowercase();
                    keywords.iter().any(|k| lower.contains(k))
                }
            }
            _ => true,
        }
    }

    fn classify(&self, raw: &str) -> Option<RuleMatch> {
        let (raw, link_type, service) = match self {
            ExtractorRule::Href {
                link_type, service, ..
            } => (raw.to_string(), *link_type, *service),
            ExtractorRule::Button { .. } => {
                (raw.to_string(), LinkType::Button, Service::DirectDownload)
            }
            ExtractorRule::Script { .. } => {
                (raw.to_string(), LinkType::Javascript, Service::DirectDownload)
            }
            ExtractorRule::Base64 { .. } => {
                (decode_data_url(raw)?, LinkType::Hidden, Service::DirectDownload)
            }
            ExtractorRule::Inferred { .. } => {
                let service = infer_service(raw);
                let link_type = if service == Service::Torrent {
                    LinkType::Torrent
                } else {
                    LinkType::Direct
                };
                (raw.to_string(), link_type, service)
            }
            ExtractorRule::Stream { .. } => {
                (raw.to_string(), LinkType::Stream, Service::Streaming)
            }
        };

        Some(RuleMatch {
            raw,
            link_type,
            service,
        })
    }
}

/// Infers a hosting service from URL substrings
///
/// # Example
/// ```
/// use reelscout_core::parser::rules::infer_service;
/// use reelscout_core::Service;
/// assert_eq!(infer_service("https://drive.google.com/uc?id=1"), Service::GoogleDrive);
/// assert_eq!(infer_service("https://host.com/page"), Service::Unknown);
/// ```
pub fn infer_service(url: &str) -> Service {
    let lower = url.to_lowercase();
    if lower.contains("drive.google") {
        Service::GoogleDrive
    } else if lower.contains("mega.") {
        Service::Mega
    } else if lower.contains("mediafire") {
        Service::MediaFire
    } else if lower.contains("dropbox") {
        Service::Dropbox
    } else if lower.contains("torrent") || lower.starts_with("magnet:") {
        Service::Torrent
    } else if lower.contains("download") || lower.contains("dl") {
        Service::DirectDownload
    } else {
        Service::Unknown
    }
}

/// Standard alphabet, padding optional, stray trailing bits ignored
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

fn decode_data_url(encoded: &str) -> Option<String> {
    let bytes = LENIENT_BASE64.decode(encoded).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;
    (decoded.starts_with("http") || decoded.starts_with("magnet:")).then_some(decoded)
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ReelscoutError::ParseError(format!("invalid rule pattern: {}", e)))
}

/// An ordered list of extractor rules
///
/// Earlier rules win when two rules capture the same URL, since
/// deduplication keeps the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ExtractorRule>,
}

static DOWNLOAD_RULES: LazyLock<RuleSet> =
    LazyLock::new(|| build_download_rules().expect("built-in download rules compile"));

static BASIC_RULES: LazyLock<RuleSet> =
    LazyLock::new(|| build_basic_rules().expect("built-in basic rules compile"));

static STREAMING_RULES: LazyLock<RuleSet> =
    LazyLock::new(|| build_streaming_rules().expect("built-in streaming rules compile"));

impl RuleSet {
    /// Creates a rule set from an ordered list of rules
    pub fn new(rules: Vec<ExtractorRule>) -> Self {
        Self { rules }
    }

    /// Full download rule set used by the enhanced and multi-session methods
    pub fn download() -> Self {
        DOWNLOAD_RULES.clone()
    }

    /// Cloud, direct and torrent links with service inferred from the URL
    pub fn basic() -> Self {
        BASIC_RULES.clone()
    }

    /// Streaming embeds, used on movie pages found through listings
    pub fn streaming() -> Self {
        STREAMING_RULES.clone()
    }

    /// Appends a rule at the lowest precedence
    pub fn push(&mut self, rule: ExtractorRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[ExtractorRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Built-in rule tables
// ----------------------------------------------------------------------------

fn build_download_rules() -> Result<RuleSet> {
    Ok(RuleSet::new(vec![
        ExtractorRule::href(
            "direct-video",
            &format!(r#"(?i)href=["']([^"']*\.(?:{})[^"']*)["']"#, VIDEO_EXTENSIONS),
            LinkType::Direct,
            Service::DirectDownload,
        )?,
        ExtractorRule::href(
            "google-drive",
            r#"(?i)href=["']([^"']*(?:drive\.google\.com|docs\.google\.com)/(?:file/d/|open\?id=|uc\?id=)[^"']*)["']"#,
            LinkType::Cloud,
            Service::GoogleDrive,
        )?,
        ExtractorRule::href(
            "mega",
            r#"(?i)href=["']([^"']*mega\.(?:nz|co\.nz)/(?:file/|folder/|#!)[^"']*)["']"#,
            LinkType::Cloud,
            Service::Mega,
        )?,
        ExtractorRule::href(
            "mediafire",
            r#"(?i)href=["']([^"']*mediafire\.com/(?:file/|download/)[^"']*)["']"#,
            LinkType::Cloud,
            Service::MediaFire,
        )?,
        ExtractorRule::href(
            "dropbox",
            r#"(?i)href=["']([^"']*dropbox\.com/(?:s/|sh/)[^"']*)["']"#,
            LinkType::Cloud,
            Service::Dropbox,
        )?,
        ExtractorRule::href(
            "torrent-file",
            r#"(?i)href=["']([^"']*\.torrent[^"']*)["']"#,
            LinkType::Torrent,
            Service::Torrent,
        )?,
        ExtractorRule::href(
            "magnet",
            r#"(?i)href=["'](magnet:\?xt=urn:btih:[^"']*)["']"#,
            LinkType::Torrent,
            Service::Torrent,
        )?,
        ExtractorRule::href(
            "file-host",
            &format!(r#"(?i)href=["']([^"']*(?:{})\.[^"']*)["']"#, FILE_HOSTS),
            LinkType::Filehost,
            Service::FileHosting,
        )?,
        ExtractorRule::href(
            "stream-embed",
            &format!(r#"(?i)href=["']([^"']*(?:{})\.(?:com|net|org|to)[^"']*)["']"#, STREAM_HOSTS),
            LinkType::Stream,
            Service::Streaming,
        )?,
        ExtractorRule::button(
            "download-anchor",
            r#"(?i)<a[^>]*href=["']([^"']+)["'][^>]*>.*?(?:download|dl|get|grab|save|fetch).*?</a>"#,
        )?,
        ExtractorRule::button(
            "download-button",
            r#"(?i)<button[^>]*onclick=["'].*?(?:window\.open\(|location\.href\s*=)\s*["']([^"']+)["'].*?download.*?</button>"#,
        )?,
        ExtractorRule::button(
            "download-div",
            r#"(?i)<div[^>]*class=["'][^"']*download[^"']*["'][^>]*>.*?href=["']([^"']+)["']"#,
        )?,
        ExtractorRule::script(
            "script-variable",
            r#"(?i)\b(?:downloadUrl|fileUrl|movieUrl|videoUrl)\s*=\s*["']([^"']+)["']"#,
            &[],
        )?,
        ExtractorRule::script(
            "script-window-open",
            r#"(?i)window\.open\(\s*["']([^"']+)["']"#,
            SCRIPT_URL_KEYWORDS,
        )?,
        ExtractorRule::script(
            "script-location",
            r#"(?i)(?:window\.location|location\.href|document\.location)\s*=\s*["']([^"']+)["']"#,
            SCRIPT_URL_KEYWORDS,
        )?,
        ExtractorRule::script(
            "script-object-key",
            r#"(?i)downloadLink\s*:\s*["']([^"']+)["']"#,
            &[],
        )?,
        ExtractorRule::base64("data-url", r#"(?i)data-url=["']([A-Za-z0-9+/=]+)["']"#)?,
    ]))
}

fn build_basic_rules() -> Result<RuleSet> {
    Ok(RuleSet::new(vec![
        ExtractorRule::inferred("basic-download", r#"(?i)href=["']([^"']*(?:download|dl)[^"']*)["']"#)?,
        ExtractorRule::inferred(
            "basic-video",
            r#"(?i)href=["']([^"']*\.(?:mp4|mkv|avi|mov|wmv|flv|webm|m4v)[^"']*)["']"#,
        )?,
        ExtractorRule::inferred("basic-drive", r#"(?i)href=["']([^"']*drive\.google\.com[^"']*)["']"#)?,
        ExtractorRule::inferred("basic-mega", r#"(?i)href=["']([^"']*mega\.nz[^"']*)["']"#)?,
        ExtractorRule::inferred("basic-mediafire", r#"(?i)href=["']([^"']*mediafire\.com[^"']*)["']"#)?,
        ExtractorRule::inferred("basic-dropbox", r#"(?i)href=["']([^"']*dropbox\.com[^"']*)["']"#)?,
        ExtractorRule::inferred("basic-torrent", r#"(?i)href=["']([^"']*\.torrent[^"']*)["']"#)?,
        ExtractorRule::inferred("basic-magnet", r#"(?i)href=["'](magnet:[^"']*)["']"#)?,
    ]))
}

fn build_streaming_rules() -> Result<RuleSet> {
    Ok(RuleSet::new(vec![
        ExtractorRule::stream("streamlare-href", r#"(?i)href=["']([^"']*streamlare[^"']*)["']"#, &[])?,
        ExtractorRule::stream("vcdnlare-href", r#"(?i)href=["']([^"']*vcdnlare[^"']*)["']"#, &[])?,
        ExtractorRule::stream("streamlare-src", r#"(?i)src=["']([^"']*streamlare[^"']*)["']"#, &[])?,
        ExtractorRule::stream("vcdnlare-src", r#"(?i)src=["']([^"']*vcdnlare[^"']*)["']"#, &[])?,
        ExtractorRule::stream("vcdn-src", r#"(?i)src=["']([^"']*vcdn[^"']*)["']"#, &[])?,
        ExtractorRule::href(
            "stream-embed",
            &format!(r#"(?i)(?:href|src)=["']([^"']*(?:{})\.(?:com|net|org|to)[^"']*)["']"#, STREAM_HOSTS),
            LinkType::Stream,
            Service::Streaming,
        )?,
        ExtractorRule::stream(
            "watch-online",
            r#"(?i)<a[^>]*href=["']([^"']+)["'][^>]*>.*?(?:watch.*?online|streamlare).*?</a>"#,
            STREAM_URL_KEYWORDS,
        )?,
    ]))
}
