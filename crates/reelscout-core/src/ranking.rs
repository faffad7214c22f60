//! Deduplication and ranking of candidate links

use std::collections::HashSet;

use crate::types::{Candidate, Service};

/// Quality label scores, higher is better
const QUALITY_SCORES: &[(&str, u32)] = &[
    ("4K", 100),
    ("2160p", 100),
    ("BluRay", 90),
    ("BRRip", 85),
    ("BDRip", 85),
    ("1080p", 80),
    ("FHD", 80),
    ("Full HD", 80),
    ("WebRip", 75),
    ("WEB-DL", 75),
    ("WebDL", 75),
    ("DVDRip", 70),
    ("DVD", 70),
    ("HDRip", 65),
    ("HDTVRip", 65),
    ("720p", 60),
    ("HD", 60),
    ("480p", 40),
    ("SD", 40),
    ("360p", 20),
    ("TS", 15),
    ("TC", 15),
    ("CAM", 10),
];

/// Priority of a hosting service, lower is preferred
pub fn service_priority(service: Service) -> u8 {
    match service {
        Service::GoogleDrive => 1,
        Service::Mega => 2,
        Service::MediaFire => 3,
        Service::Dropbox => 4,
        Service::DirectDownload => 5,
        Service::FileHosting => 6,
        Service::Streaming => 7,
        Service::Torrent => 8,
        Service::Unknown => 9,
    }
}

/// Score of a quality label, 0 for unrecognized labels
///
/// # Example
/// ```
/// use reelscout_core::ranking::quality_score;
/// assert_eq!(quality_score("4k"), 100);
/// assert_eq!(quality_score("Unknown"), 0);
/// ```
pub fn quality_score(quality: &str) -> u32 {
    QUALITY_SCORES
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(quality))
        .map(|(_, score)| *score)
        .unwrap_or(0)
}

/// Drops every candidate whose URL was already seen, keeping the first
pub fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.url.clone()))
        .collect()
}

/// Deduplicates, sorts and truncates a discovery-ordered candidate list
///
/// Sorting is by ascending priority, then descending quality score.
/// The sort is stable, so equal candidates stay in discovery order.
///
/// # Arguments
/// * `candidates` - Candidates in the order they were discovered
/// * `cap` - Maximum number of candidates to keep
pub fn rank(candidates: Vec<Candidate>, cap: usize) -> Vec<Candidate> {
    let mut ranked = dedupe(candidates);
    ranked.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| quality_score(&b.quality).cmp(&quality_score(&a.quality)))
    });
    ranked.truncate(cap);
    ranked
}
