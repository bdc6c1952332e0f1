//! Tag Transformation Pipeline
//!
//! Normalizes and derives Source-A tag values before they are compared with
//! Source B. The transformer is pure: it never touches files, never fails and
//! produces the same output for the same input.
//!
//! ## Steps
//!
//! 1. Multi-valued frames (`TCON`, `TCMP`, `TCOM`) are flattened to one
//!    `", "`-joined string, keeping order and duplicates.
//! 2. `TCON` is cleaned by [`clean_genre`]. A genre that cleans to nothing
//!    stays as an empty value, which clears the genre on Source B.
//! 3. `COMM` is rebuilt by [`build_comment`] from energy, vocal type,
//!    purchase fields and the existing comment text.
//!
//! ## Example
//!
//! ```ignore
//! use core_metadata::transformer::TagTransformer;
//!
//! let transformer = TagTransformer::from_config(&config);
//! let fields = transformer.candidate_tags();
//! let raw = codec.read_fields(&path, &fields).await?;
//! let transformed = transformer.transform(raw);
//! ```

use bridge_traits::tags::{get_ignore_case, TagMap, TagValue};
use core_runtime::config::AppConfig;
use regex::Regex;
use std::sync::LazyLock;

/// Frames that may carry several values
pub const MULTI_VALUE_FRAMES: &[&str] = &["TCON", "TCMP", "TCOM"];

pub const GENRE_FRAME: &str = "TCON";
pub const COMMENT_FRAME: &str = "COMM";

/// User-defined frames the composite comment is built from
pub const COMMENT_SOURCE_FRAMES: &[&str] = &[
    "TXXX:energylevel",
    "TXXX:keinelyrics",
    "TXXX:kaufmonat",
    "TXXX:kaufgrund",
    "TXXX:kaufort",
    "TXXX:livegesehen",
];

const ENERGY_FRAME: &str = "TXXX:energylevel";
const LYRICS_FRAME: &str = "TXXX:keinelyrics";

/// Comment prefixes, in output order
const PURCHASE_PARTS: &[(&str, &str)] = &[
    ("km", "TXXX:kaufmonat"),
    ("kg", "TXXX:kaufgrund"),
    ("ko", "TXXX:kaufort"),
    ("lg", "TXXX:livegesehen"),
];

/// A segment from start or `;` up to and including the first `‖`
static ANNOTATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((?:^|;)\s*)[^;]+?\s*‖\s*").expect("genre annotation regex")
});

static DECADE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}s\b").expect("decade regex"));

/// Upper bound on cleaning passes; real genre strings settle in two
const MAX_CLEAN_PASSES: usize = 16;

/// Stateless transformer configured with the bidirectional and one-way sets
#[derive(Debug, Clone, Default)]
pub struct TagTransformer {
    bidirectional: Vec<String>,
    one_way: Vec<String>,
}

impl TagTransformer {
    pub fn new(bidirectional: Vec<String>, one_way: Vec<String>) -> Self {
        Self {
            bidirectional,
            one_way,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.bidirectional_tags.clone(), config.one_way_tags())
    }

    pub fn bidirectional_tags(&self) -> &[String] {
        &self.bidirectional
    }

    /// Whether `tag` belongs to the bidirectional set (case-insensitive)
    pub fn is_bidirectional(&self, tag: &str) -> bool {
        self.bidirectional
            .iter()
            .any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Every field that has to be read from a file before transforming it
    ///
    /// Bidirectional tags come first, followed by the one-way selection and
    /// the transformer inputs. Identifiers are de-duplicated
    /// case-insensitively, keeping the first spelling seen.
    pub fn candidate_tags(&self) -> Vec<String> {
        let inputs = MULTI_VALUE_FRAMES
            .iter()
            .copied()
            .chain([GENRE_FRAME, COMMENT_FRAME])
            .chain(COMMENT_SOURCE_FRAMES.iter().copied())
            .map(str::to_string);

        let mut tags: Vec<String> = Vec::new();
        for tag in self
            .bidirectional
            .iter()
            .cloned()
            .chain(self.one_way.iter().cloned())
            .chain(inputs)
        {
            if !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
                tags.push(tag);
            }
        }
        tags
    }

    /// Apply every transformation to a Source-A reading
    pub fn transform(&self, mut tags: TagMap) -> TagMap {
        flatten_multi_values(&mut tags);

        if let Some(genre) = tags.get(GENRE_FRAME).and_then(genre_text) {
            tags.insert(GENRE_FRAME.to_string(), TagValue::Text(clean_genre(&genre)));
        }

        let comment = build_comment(&tags);
        tags.insert(COMMENT_FRAME.to_string(), TagValue::Text(comment));
        tags
    }
}

fn flatten_multi_values(tags: &mut TagMap) {
    for frame in MULTI_VALUE_FRAMES {
        if let Some(TagValue::List(items)) = tags.get(*frame) {
            let joined = items.join(", ");
            tags.insert(frame.to_string(), TagValue::Text(joined));
        }
    }
}

fn genre_text(value: &TagValue) -> Option<String> {
    match value {
        TagValue::Text(s) => Some(s.clone()),
        _ => None,
    }
}

/// Remove `‖` annotations and decade tokens from a genre string
///
/// The result is a `", "`-joined list of the remaining non-empty entries.
/// Cleaning is repeated until the output is stable, so
/// `clean_genre(clean_genre(x)) == clean_genre(x)`.
pub fn clean_genre(raw: &str) -> String {
    let mut current = clean_genre_once(raw);
    for _ in 0..MAX_CLEAN_PASSES {
        let next = clean_genre_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn clean_genre_once(raw: &str) -> String {
    let stripped = ANNOTATION_REGEX.replace_all(raw, "$1");
    let without_decades = DECADE_REGEX.replace_all(&stripped, "");
    without_decades
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Compose the multi-line comment written to Source B
pub fn build_comment(tags: &TagMap) -> String {
    let mut parts = Vec::new();

    if let Some(energy) = non_empty(tags, ENERGY_FRAME) {
        parts.push(format!("[ e{} ]", energy));
    }

    let genre = non_empty(tags, GENRE_FRAME)
        .unwrap_or_default()
        .to_lowercase();
    let lyrics = non_empty(tags, LYRICS_FRAME)
        .unwrap_or_default()
        .to_lowercase();
    parts.push(format!("[ typ{} ]", vocal_type(&genre, &lyrics)));

    for (prefix, frame) in PURCHASE_PARTS {
        if let Some(value) = non_empty(tags, frame) {
            parts.push(format!("[ {}{} ]", prefix, value));
        }
    }

    if let Some(existing) = non_empty(tags, COMMENT_FRAME) {
        parts.push(existing);
    }

    parts.join("\n")
}

/// Vocal type code, first match wins
fn vocal_type(genre: &str, lyrics: &str) -> &'static str {
    if genre.contains("a cappella") {
        "A"
    } else if lyrics.contains("instrumental") {
        "I"
    } else if genre.contains("female vocals") {
        "Vfemale"
    } else if genre.contains("male vocals") {
        "Vmale"
    } else if genre.contains("duet") {
        "Vduet"
    } else if genre.contains("mixed vocals") {
        "Vmixed"
    } else {
        "I"
    }
}

fn non_empty(tags: &TagMap, id: &str) -> Option<String> {
    get_ignore_case(tags, id)
        .map(TagValue::as_text)
        .filter(|s| !s.is_empty())
}
