//! Tag Value Model and Codec Trait
//!
//! Tag values coming out of an audio file are loosely typed: plain text frames,
//! numeric frames such as `TBPM`, multi-valued frames such as `TCON` and
//! comment frames that carry a language. [`TagValue`] models those shapes as a
//! closed enum with explicit conversion rules to the string-only ledger.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::Result;

/// Identifier → value mapping for one file, ordered by identifier
pub type TagMap = BTreeMap<String, TagValue>;

/// A single tag value as read from or written to an audio file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
    Comment { language: String, text: String },
}

impl TagValue {
    pub fn text(value: impl Into<String>) -> Self {
        TagValue::Text(value.into())
    }

    /// Render the value as display text
    ///
    /// Lists are joined with `", "`, whole numbers lose their fraction and
    /// comments yield only their text.
    pub fn as_text(&self) -> String {
        match self {
            TagValue::Text(s) => s.clone(),
            TagValue::Number(n) => format_number(*n),
            TagValue::List(items) => items.join(", "),
            TagValue::Comment { text, .. } => text.clone(),
        }
    }

    /// String form persisted in the ledger
    pub fn to_ledger_string(&self) -> String {
        self.as_text()
    }

    /// Numeric interpretation, if the rendered text is a finite number
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            TagValue::Number(n) => *n,
            other => other.as_text().trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }

    /// Value equality used by the diff for the frame `id`
    ///
    /// Values compare as text. Numeric frames such as `TBPM`, and values that
    /// are numbers on either side, compare numerically when both sides read
    /// as finite numbers, so a `TBPM` of `"128"` equals `"128.0"`.
    pub fn same_as(&self, other: &TagValue, id: &str) -> bool {
        let numeric = is_numeric_frame(id)
            || matches!(self, TagValue::Number(_))
            || matches!(other, TagValue::Number(_));
        if numeric {
            if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
                return a == b;
            }
        }
        self.as_text() == other.as_text()
    }

    /// Compare against a ledger baseline, which is stored as text
    pub fn matches_ledger(&self, baseline: &str, id: &str) -> bool {
        self.same_as(&TagValue::Text(baseline.to_string()), id)
    }
}

/// Frames whose text is a number
pub const NUMERIC_FRAMES: &[&str] = &["TBPM", "TLEN", "TDLY", "TYER"];

pub fn is_numeric_frame(id: &str) -> bool {
    NUMERIC_FRAMES.iter().any(|frame| frame.eq_ignore_ascii_case(id))
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Text(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Text(value)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Treat an empty value like an absent one
fn present(value: Option<&TagValue>) -> Option<&TagValue> {
    value.filter(|v| !v.as_text().is_empty())
}

/// Equality of two optional values of frame `id`, where `None` means "absent"
///
/// An empty value equals an absent one, since clearing a frame and
/// removing it read the same to a player.
pub fn values_equal(id: &str, a: Option<&TagValue>, b: Option<&TagValue>) -> bool {
    match (present(a), present(b)) {
        (Some(a), Some(b)) => a.same_as(b, id),
        (None, None) => true,
        _ => false,
    }
}

/// Equality of an optional value against an optional ledger baseline
pub fn matches_baseline(id: &str, value: Option<&TagValue>, baseline: Option<&str>) -> bool {
    match (present(value), baseline.filter(|b| !b.is_empty())) {
        (Some(v), Some(b)) => v.matches_ledger(b, id),
        (None, None) => true,
        _ => false,
    }
}

/// Case-insensitive lookup of a tag identifier
pub fn get_ignore_case<'a>(tags: &'a TagMap, id: &str) -> Option<&'a TagValue> {
    tags.get(id).or_else(|| {
        tags.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(id))
            .map(|(_, value)| value)
    })
}

/// Tag codec trait
///
/// Reads and merges named tag fields on a single audio file. Identifiers are
/// ID3v2 frame ids (`TIT2`, `TKEY`, `COMM`) or `TXXX:<description>` for user
/// defined text frames, whose description is matched case-insensitively.
///
/// # Contract
///
/// - `read_fields` returns only the requested identifiers that are present,
///   keyed exactly as requested. Absent fields are simply missing.
/// - `write_fields` merges the given fields into the file and must leave
///   every other field untouched.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::tags::{TagCodec, TagMap, TagValue};
///
/// async fn bump_key(codec: &dyn TagCodec, path: &Path) -> Result<()> {
///     let mut fields = TagMap::new();
///     fields.insert("TKEY".into(), TagValue::text("9A"));
///     codec.write_fields(path, &fields).await
/// }
/// ```
#[async_trait]
pub trait TagCodec: Send + Sync {
    /// Read the requested fields from `path`
    async fn read_fields(&self, path: &Path, fields: &[String]) -> Result<TagMap>;

    /// Merge `values` into the tag of `path`
    async fn write_fields(&self, path: &Path, values: &TagMap) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_text_variants() {
        assert_eq!(TagValue::text("8A").as_text(), "8A");
        assert_eq!(TagValue::Number(128.0).as_text(), "128");
        assert_eq!(TagValue::Number(97.5).as_text(), "97.5");
        assert_eq!(
            TagValue::List(vec!["House".into(), "Disco".into()]).as_text(),
            "House, Disco"
        );
        assert_eq!(
            TagValue::Comment {
                language: "eng".into(),
                text: "hello".into()
            }
            .as_text(),
            "hello"
        );
    }

    #[test]
    fn test_same_as_numeric_frames() {
        assert!(TagValue::text("128").same_as(&TagValue::text("128.0"), "TBPM"));
        assert!(TagValue::text("128").same_as(&TagValue::Number(128.0), "TBPM"));
        assert!(TagValue::text("128").same_as(&TagValue::Number(128.0), "TXXX:Rating"));
        assert!(!TagValue::text("8A").same_as(&TagValue::text("8a"), "TKEY"));
        assert!(!TagValue::text("9A").same_as(&TagValue::text("10A"), "TKEY"));
    }

    #[test]
    fn test_same_as_text_frames_compare_text() {
        assert!(!TagValue::text("1.0").same_as(&TagValue::text("1"), "TIT2"));
        assert!(!TagValue::text("08").same_as(&TagValue::text("8"), "TXXX:EnergyLevel"));
        assert!(TagValue::text("NaN").same_as(&TagValue::text("NaN"), "TIT2"));
        assert!(TagValue::text("NaN").same_as(&TagValue::text("NaN"), "TBPM"));
        assert!(TagValue::text("inf").same_as(&TagValue::text("inf"), "TBPM"));
        assert!(TagValue::text("NaN").as_number().is_none());
    }

    #[test]
    fn test_optional_comparisons() {
        let key = TagValue::text("8A");
        assert!(values_equal("TKEY", None, None));
        assert!(!values_equal("TKEY", Some(&key), None));
        assert!(matches_baseline("TKEY", Some(&key), Some("8A")));
        assert!(!matches_baseline("TKEY", None, Some("8A")));
        assert!(matches_baseline("TKEY", None, None));
        assert!(matches_baseline("TBPM", Some(&TagValue::text("120.0")), Some("120")));
    }

    #[test]
    fn test_empty_value_equals_absent() {
        let empty = TagValue::text("");
        assert!(values_equal("TCON", Some(&empty), None));
        assert!(!values_equal("TCON", Some(&empty), Some(&TagValue::text("1990s"))));
        assert!(matches_baseline("TCON", Some(&empty), None));
        assert!(matches_baseline("TCON", None, Some("")));
    }

    #[test]
    fn test_get_ignore_case() {
        let mut tags = TagMap::new();
        tags.insert("TXXX:EnergyLevel".into(), TagValue::text("7"));
        assert_eq!(
            get_ignore_case(&tags, "TXXX:energylevel"),
            Some(&TagValue::text("7"))
        );
        assert!(get_ignore_case(&tags, "TXXX:kaufort").is_none());
    }

    #[test]
    fn test_untagged_serde() {
        let value: TagValue = serde_json::from_str("\"Song\"").unwrap();
        assert_eq!(value, TagValue::text("Song"));
        let value: TagValue = serde_json::from_str("120").unwrap();
        assert_eq!(value, TagValue::Number(120.0));
        let value: TagValue =
            serde_json::from_str(r#"{"language":"deu","text":"hallo"}"#).unwrap();
        assert_eq!(
            value,
            TagValue::Comment {
                language: "deu".into(),
                text: "hallo".into()
            }
        );
        assert_eq!(serde_json::to_string(&TagValue::text("x")).unwrap(), "\"x\"");
    }
}
