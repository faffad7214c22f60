//! Link extraction engine
//!
//! Runs a [`RuleSet`] over raw HTML and produces a deduplicated, ranked
//! list of [`Candidate`]s. The function is pure: the same HTML, base URL
//! and rules always produce the same list.

use std::collections::HashSet;

use crate::parser::metadata::annotate;
use crate::parser::rules::RuleSet;
use crate::ranking::{rank, service_priority};
use crate::types::Candidate;
use crate::url::clean_candidate_url;

/// Default cap for single-page extraction
pub const DEFAULT_CAP: usize = 20;

/// Options for one extraction run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Maximum number of candidates returned
    pub cap: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { cap: DEFAULT_CAP }
    }
}

impl ExtractOptions {
    pub fn with_cap(cap: usize) -> Self {
        Self { cap }
    }
}

/// Extracts candidate links from an HTML document
///
/// Every rule scans the whole document in order. Each capture is
/// normalized against `base` and validated; the first rule to produce a
/// URL decides its service and type. Surviving candidates are annotated
/// with metadata from the surrounding HTML, then ranked and capped.
///
/// # Arguments
/// * `html` - Raw HTML of the page
/// * `base` - URL the page was fetched from
/// * `rules` - Ordered rule set
/// * `options` - Extraction options (cap)
///
/// # Returns
/// Candidates sorted by priority, then quality score, at most `options.cap`
///
/// # Example
/// ```
/// use reelscout_core::parser::{extract_candidates, ExtractOptions, RuleSet};
/// let html = r#"<a href="/files/movie.1080p.mp4">Download</a>"#;
/// let links = extract_candidates(html, "https://example.com/m/1", &RuleSet::download(), &ExtractOptions::default());
/// assert_eq!(links[0].url, "https://example.com/files/movie.1080p.mp4");
/// assert_eq!(links[0].quality, "1080p");
/// ```
pub fn extract_candidates(
    html: &str,
    base: &str,
    rules: &RuleSet,
    options: &ExtractOptions,
) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for rule in rules.rules() {
        let matches = rule.scan(html);
        let matched = matches.len();
        let mut accepted = 0usize;

        for m in matches {
            let Some(url) = clean_candidate_url(&m.raw, base) else {
                continue;
            };
            if !rule.accepts(&url) || !seen.insert(url.clone()) {
                continue;
            }

            let meta = annotate(&url, html);
            candidates.push(Candidate {
                priority: service_priority(m.service),
                url,
                service: m.service,
                link_type: m.link_type,
                quality: meta.quality,
                size: meta.size,
                language: meta.language,
            });
            accepted += 1;
        }

        if matched > 0 {
            tracing::debug!(rule = rule.name(), matched, accepted, "rule scanned");
        }
    }

    rank(candidates, options.cap)
}
