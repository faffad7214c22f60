//! HTML parsers for movie and file-hosting pages
//!
//! Contains the regex link extraction engine, its rule tables, the
//! metadata heuristics and the listing page parser.

pub mod links;
pub mod listing;
pub mod metadata;
pub mod rules;

pub use links::{DEFAULT_CAP, ExtractOptions, extract_candidates};
pub use listing::{DEFAULT_LISTING_CAP, ListingSite, parse_listing, placeholder_poster};
pub use rules::{ExtractorRule, RuleSet};
