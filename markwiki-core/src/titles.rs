//! Title normalisation and page URLs.
//!
//! Two distinct forms are in play: storage keys compare titles with
//! underscores replaced by spaces, while URL paths use the underscore form,
//! percent-encoded as UTF-8.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::store::PageStore;

// Everything except alphanumerics, `_`, `.`, `-`, and path slashes gets
// percent-encoded.
const URL_ALPHABET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'/');

/// Canonical storage form of a title: underscores become spaces.
pub fn normalize_title(title: &str) -> String {
    title.replace('_', " ")
}

/// Percent-encodes a URL part, keeping path slashes.
pub fn url_quote(value: &str) -> String {
    utf8_percent_encode(value, URL_ALPHABET).to_string()
}

/// URL path component for a title: spaces to underscores, then encoded.
pub fn page_url_rel(title: &str) -> String {
    url_quote(&title.replace(' ', "_"))
}

/// Absolute URL path for a page.
pub fn page_url(title: &str) -> String {
    format!("/{}", page_url_rel(title))
}

/// URL of the page describing a label. Follows the label page's redirect
/// property when one is set.
pub fn label_url(store: &dyn PageStore, label: &str) -> String {
    let mut title = format!("Label:{label}");
    if let Some(page) = store.get_page(&title) {
        if let Some(redirect) = page.redirect {
            title = redirect;
        }
    }
    page_url(&title)
}
