//! Link extraction from page bodies.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::titles::normalize_title;

/// The bracketed-link grammar: shortest match, no nesting.
pub(crate) static WIKI_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[(.+?)\]\]").unwrap());

/// Scans body text for `[[...]]` links and returns the normalized targets,
/// de-duplicated, in first-occurrence order.
///
/// The target is the text before a `|` label separator; for `Image:` embeds
/// only the portion before the first `;` parameter counts. Unterminated
/// brackets are simply not matched.
pub fn extract_links(text: Option<&str>) -> Vec<String> {
    let Some(text) = text else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for cap in WIKI_WORD.captures_iter(text) {
        let mut link = &cap[1];
        if let Some((target, _label)) = link.split_once('|') {
            link = target;
        }
        if link.starts_with("Image:") {
            link = link.split(';').next().unwrap_or(link);
        }
        let link = normalize_title(link);
        if !links.contains(&link) {
            links.push(link);
        }
    }
    links
}
