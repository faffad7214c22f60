//! URL normalization and validation
//!
//! Turns raw strings captured from HTML into absolute candidate URLs,
//! and provides the small builders used for listing-site URLs.
//! Every function here is total: any input yields a value, never a panic.

use url::Url;

/// Minimum length of an accepted candidate URL
const MIN_URL_LEN: usize = 10;

/// Hosts whose share links carry the decryption key after `#`
const FRAGMENT_KEY_HOSTS: &[&str] = &["mega.nz", "mega.co.nz"];

/// Normalizes a raw matched string into an absolute URL
///
/// Rules, applied in order: trim and strip control characters, decode
/// common HTML entities, prefix `https:` to protocol-relative references,
/// resolve root-relative paths against the base origin, keep `http…` and
/// `magnet:` values as-is, resolve anything else as a relative reference.
///
/// # Arguments
/// * `raw` - String captured from HTML (href, src, script literal…)
/// * `base` - URL of the page the string was found on
///
/// # Returns
/// `Some(url)` if the value could be made absolute, `None` otherwise.
/// The result still has to pass [`is_valid_candidate_url`].
///
/// # Example
/// ```
/// use reelscout_core::url::normalize_url;
/// let url = normalize_url(" /dl/file.mkv\n", "https://example.com/movie/1");
/// assert_eq!(url.as_deref(), Some("https://example.com/dl/file.mkv"));
/// ```
pub fn normalize_url(raw: &str, base: &str) -> Option<String> {
    let cleaned: String = raw.trim().chars().filter(|c| !c.is_control()).collect();
    let cleaned = decode_html_entities(&cleaned);

    if cleaned.is_empty() {
        return None;
    }

    if cleaned.starts_with("//") {
        return Some(format!("https:{}", cleaned));
    }

    if cleaned.starts_with('/') {
        let origin = Url::parse(base).ok()?.origin();
        if !origin.is_tuple() {
            return None;
        }
        return Some(format!("{}{}", origin.ascii_serialization(), cleaned));
    }

    if cleaned.starts_with("http") || cleaned.starts_with("magnet:") {
        return Some(cleaned);
    }

    let base = Url::parse(base).ok()?;
    base.join(&cleaned).ok().map(String::from)
}

/// Checks whether a normalized URL may become a candidate
///
/// Rejects short values, non-navigational schemes (`javascript:`,
/// `mailto:`, `void(0)`) and anything carrying a `#` fragment, except on
/// Mega hosts where the fragment holds the file key.
///
/// # Example
/// ```
/// use reelscout_core::url::is_valid_candidate_url;
/// assert!(is_valid_candidate_url("https://mega.nz/file/ABC123#key456"));
/// assert!(!is_valid_candidate_url("https://example.com/page#section"));
/// ```
pub fn is_valid_candidate_url(url: &str) -> bool {
    if url.chars().count() < MIN_URL_LEN {
        return false;
    }

    let lower = url.to_ascii_lowercase();
    if !(lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("magnet:"))
    {
        return false;
    }

    if lower.contains("javascript:") || lower.contains("mailto:") || lower.contains("void(0)") {
        return false;
    }

    if url.contains('#') && !has_fragment_key_host(url) {
        return false;
    }

    true
}

/// Normalizes and validates in one step
pub fn clean_candidate_url(raw: &str, base: &str) -> Option<String> {
    normalize_url(raw, base).filter(|url| is_valid_candidate_url(url))
}

/// Resolves a listing-page href against the listing site's base URL
///
/// Listing hrefs are site-relative paths, so this is plain concatenation
/// rather than RFC 3986 resolution.
///
/// # Example
/// ```
/// use reelscout_core::url::resolve_listing_url;
/// let url = resolve_listing_url("/movie/X-(2024)-Telugu.html", "https://www.moviezwap.care");
/// assert_eq!(url.as_deref(), Some("https://www.moviezwap.care/movie/X-(2024)-Telugu.html"));
/// ```
pub fn resolve_listing_url(href: &str, base: &str) -> Option<String> {
    let href = decode_html_entities(href.trim());
    if href.is_empty() {
        return None;
    }

    let base = base.trim_end_matches('/');
    if href.starts_with("http") {
        Some(href)
    } else if href.starts_with("//") {
        Some(format!("https:{}", href))
    } else if href.starts_with('/') {
        Some(format!("{}{}", base, href))
    } else {
        Some(format!("{}/{}", base, href))
    }
}

/// Builds a search URL for a listing site
///
/// # Arguments
/// * `base` - Site base URL (e.g. "https://www.moviezwap.care")
/// * `search_path` - Path up to and including the query parameter (e.g. "/search.php?q=")
/// * `query` - Search query string, URL encoded here
///
/// # Example
/// ```
/// use reelscout_core::url::build_search_url;
/// let url = build_search_url("https://www.moviezwap.care", "/search.php?q=", "kalki 2898");
/// assert_eq!(url, "https://www.moviezwap.care/search.php?q=kalki%202898");
/// ```
pub fn build_search_url(base: &str, search_path: &str, query: &str) -> String {
    let encoded = urlencoding::encode(query);
    format!("{}{}{}", base.trim_end_matches('/'), search_path, encoded)
}

/// Decodes common HTML entities in URLs
pub(crate) fn decode_html_entities(url: &str) -> String {
    url.replace("&amp;", "&")
        .replace("&#38;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

fn has_fragment_key_host(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    match parsed.host_str() {
        Some(host) => FRAGMENT_KEY_HOSTS
            .iter()
            .any(|allowed| host == *allowed || host.ends_with(&format!(".{}", allowed))),
        None => false,
    }
}
