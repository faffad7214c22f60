//! Metadata heuristics for candidates and movie titles
//!
//! Infers quality, size, language, year and genre by regex-matching
//! free text. For candidate links the text is the URL plus a window
//! of HTML around the URL's first occurrence.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::UNKNOWN;

/// Characters of HTML taken on each side of the URL's first occurrence
const WINDOW_RADIUS: usize = 100;

/// Quality vocabulary in precedence order; first group with a match wins
const QUALITY_GROUPS: &[&[&str]] = &[
    &["4K", "2160p"],
    &["1080p", "FHD", "Full HD"],
    &["720p", "HD"],
    &["480p", "SD"],
    &["360p"],
    &["BluRay", "BRRip", "BDRip"],
    &["DVDRip", "DVD"],
    &["WebRip", "WEB-DL", "WebDL"],
    &["HDRip", "HDTVRip"],
    &["CAM", "TS", "TC"],
];

const LANGUAGE_GROUPS: &[&[&str]] = &[
    &[
        "Hindi",
        "English",
        "Tamil",
        "Telugu",
        "Malayalam",
        "Kannada",
        "Bengali",
        "Punjabi",
        "Gujarati",
        "Marathi",
    ],
    &["Dual Audio", "Multi Audio"],
];

const GENRE_GROUPS: &[&[&str]] = &[&[
    "Action",
    "Comedy",
    "Drama",
    "Horror",
    "Thriller",
    "Romance",
    "Sci-Fi",
    "Fantasy",
    "Adventure",
    "Crime",
    "Mystery",
]];

static QUALITY_PATTERNS: LazyLock<Vec<Vocabulary>> =
    LazyLock::new(|| QUALITY_GROUPS.iter().map(|g| Vocabulary::new(g)).collect());

static LANGUAGE_PATTERNS: LazyLock<Vec<Vocabulary>> =
    LazyLock::new(|| LANGUAGE_GROUPS.iter().map(|g| Vocabulary::new(g)).collect());

static GENRE_PATTERNS: LazyLock<Vec<Vocabulary>> =
    LazyLock::new(|| GENRE_GROUPS.iter().map(|g| Vocabulary::new(g)).collect());

static SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+(?:\.\d+)?\s*(?:GB|MB|KB|TB)\b").expect("size pattern is valid")
});

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("year pattern is valid"));

/// Quality, size and language inferred for one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMetadata {
    pub quality: String,
    pub size: String,
    pub language: String,
}

/// One precedence group of a label vocabulary
///
/// Matching is whole-word and case-insensitive; the returned label is the
/// vocabulary spelling, not the matched text.
struct Vocabulary {
    pattern: Regex,
    labels: &'static [&'static str],
}

impl Vocabulary {
    fn new(labels: &'static [&'static str]) -> Self {
        let alternation = labels
            .iter()
            .map(|l| regex::escape(l))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
            .expect("vocabulary pattern is valid");
        Self { pattern, labels }
    }

    fn find(&self, text: &str) -> Option<&'static str> {
        let matched = self.pattern.find(text)?.as_str();
        self.labels
            .iter()
            .copied()
            .find(|label| label.eq_ignore_ascii_case(matched))
    }
}

fn first_label(groups: &[Vocabulary], text: &str) -> String {
    groups
        .iter()
        .find_map(|group| group.find(text))
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// Extracts a quality label, checking groups in precedence order
pub fn extract_quality(text: &str) -> String {
    first_label(&QUALITY_PATTERNS, text)
}

/// Extracts the first file size expression (e.g. "1.4 GB")
pub fn extract_size(text: &str) -> String {
    SIZE_PATTERN
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Extracts an audio language label
pub fn extract_language(text: &str) -> String {
    first_label(&LANGUAGE_PATTERNS, text)
}

/// Extracts a four digit year between 1900 and 2099
pub fn extract_year(text: &str) -> String {
    YEAR_PATTERN
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Extracts a genre label
pub fn extract_genre(text: &str) -> String {
    first_label(&GENRE_PATTERNS, text)
}

/// Builds the text searched for a candidate's metadata
///
/// The URL itself followed by up to 100 characters of HTML on each side
/// of the URL's first occurrence. A URL that does not appear literally
/// (e.g. one rebuilt from a relative path) gets the first 99 characters of
/// the document.
pub fn context_window(url: &str, html: &str) -> String {
    let (start, end) = match html.find(url) {
        Some(pos) => (
            chars_back(html, pos, WINDOW_RADIUS),
            chars_forward(html, pos, WINDOW_RADIUS),
        ),
        None => (0, chars_forward(html, 0, WINDOW_RADIUS - 1)),
    };

    format!("{} {}", url, &html[start..end])
}

/// Byte offset `count` characters before `pos`, or 0
fn chars_back(s: &str, pos: usize, count: usize) -> usize {
    s[..pos]
        .char_indices()
        .rev()
        .take(count)
        .last()
        .map_or(pos, |(i, _)| i)
}

/// Byte offset `count` characters after `pos`, or the end of `s`
fn chars_forward(s: &str, pos: usize, count: usize) -> usize {
    s[pos..]
        .char_indices()
        .nth(count)
        .map_or(s.len(), |(i, _)| pos + i)
}

/// Infers all candidate metadata from the URL's context window
pub fn annotate(url: &str, html: &str) -> LinkMetadata {
    let window = context_window(url, html);
    LinkMetadata {
        quality: extract_quality(&window),
        size: extract_size(&window),
        language: extract_language(&window),
    }
}

/// Cleans a listing title for display
///
/// Keeps ASCII word characters, whitespace, dashes, parentheses and
/// brackets, collapses whitespace and caps the result at 100 characters.
pub fn clean_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| {
            c.is_ascii_alphanumeric()
                || *c == '_'
                || c.is_whitespace()
                || matches!(c, '-' | '(' | ')' | '[' | ']')
        })
        .collect();

    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(100)
        .collect()
}
