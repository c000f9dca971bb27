//! Page header parsing and serialisation.
//!
//! A page's raw text is either plain prose, or a `key: value` header block
//! followed by a line containing exactly `---` and the body. Keys ending in
//! `s` hold comma-separated lists; header lines starting with `#` are
//! comments. The decoded mapping always carries the body under the `text`
//! key, so a mapping alone is enough to reconstruct the page.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Key under which the page body is stored in a decoded mapping.
pub const TEXT_KEY: &str = "text";

// Any run of line endings around the separator, so `\n`, `\r\n`, and bare
// `\r` page bodies all split identically.
static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]+---[\r\n]+").unwrap());
static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]+").unwrap());
static LIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*").unwrap());

/// A single header property: a scalar string, or an ordered list for keys
/// ending in `s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    Scalar(String),
    List(Vec<String>),
}

impl PropValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            PropValue::Scalar(s) => Some(s),
            PropValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            PropValue::Scalar(_) => None,
            PropValue::List(items) => Some(items),
        }
    }

    /// Header-line form: lists join with `, ` after sorting (lossy for
    /// unsorted input, by design).
    fn format(&self) -> String {
        match self {
            PropValue::Scalar(s) => s.clone(),
            PropValue::List(items) => {
                let mut sorted = items.clone();
                sorted.sort();
                sorted.join(", ")
            }
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Scalar(value.to_string())
    }
}

/// A decoded page: every header property plus the body under [`TEXT_KEY`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageProps {
    map: HashMap<String, PropValue>,
}

impl PageProps {
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.map.get(key)
    }

    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(PropValue::as_scalar)
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        self.map.get(key).and_then(PropValue::as_list)
    }

    /// The page body. Always present after decoding.
    pub fn text(&self) -> &str {
        self.scalar(TEXT_KEY).unwrap_or("")
    }

    pub fn set(&mut self, key: &str, value: PropValue) {
        self.map.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        self.map.remove(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropValue)> {
        self.map.iter()
    }
}

/// Splits raw page text into an optional header and the body.
///
/// The split happens at the first line consisting of exactly `---` surrounded
/// by line endings; without one, the whole text is body.
pub fn split_header_body(raw: &str) -> (Option<&str>, &str) {
    let mut parts = SEPARATOR.splitn(raw, 2);
    let first = parts.next().unwrap_or("");
    match parts.next() {
        Some(body) => (Some(first), body),
        None => (None, raw),
    }
}

/// Decodes raw page text into its property mapping.
///
/// Header comment lines (`#`) and lines without a colon are skipped; keys and
/// values are trimmed; duplicate keys keep the last occurrence; keys ending
/// in `s` split their value on commas into an ordered list.
pub fn decode_metadata(raw: &str) -> PageProps {
    let (header, body) = split_header_body(raw);
    let mut props = PageProps::default();
    if let Some(header) = header {
        for line in LINE_BREAKS.split(header) {
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            let value = if key.ends_with('s') {
                PropValue::List(LIST_SEPARATOR.split(value).map(str::to_string).collect())
            } else {
                PropValue::Scalar(value.to_string())
            };
            props.set(key, value);
        }
    }
    props.set(TEXT_KEY, PropValue::Scalar(body.to_string()));
    props
}

/// Builds the textual header block from a mapping, one `key: value` line per
/// property sorted by key. The body entry is excluded.
pub fn pack_header(props: &PageProps) -> String {
    let mut entries: Vec<(&String, &PropValue)> =
        props.iter().filter(|(k, _)| *k != TEXT_KEY).collect();
    entries.sort_by_key(|(k, _)| k.as_str());
    entries
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v.format()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialises a mapping back into raw page text: encoded header, a `---`
/// separator, and the body. With no header properties, the body alone.
pub fn encode_metadata(props: &PageProps) -> String {
    let header = pack_header(props);
    let text = props.text();
    if header.is_empty() {
        text.to_string()
    } else {
        format!("{header}\n---\n{text}")
    }
}
