//! Derived link/label graph queries.
//!
//! Nothing here is indexed: both relations are recomputed from the current
//! page set on every call. Wikis served by this engine are small enough that
//! correctness beats an incremental index.

use crate::page::Page;
use crate::titles::normalize_title;

/// Pages whose extracted link set contains the normalized title.
pub fn backlinks_among<'a>(
    pages: impl Iterator<Item = &'a Page>,
    title: &str,
) -> Vec<&'a Page> {
    let wanted = normalize_title(title);
    pages
        .filter(|page| page.links.iter().any(|link| *link == wanted))
        .collect()
}

/// Pages whose label set contains the label.
pub fn with_label<'a>(pages: impl Iterator<Item = &'a Page>, label: &str) -> Vec<&'a Page> {
    pages
        .filter(|page| page.labels.iter().any(|l| l == label))
        .collect()
}
