//! Wiki-wide settings.
//!
//! Settings live in the body of a regular wiki page and use the same header
//! codec as everything else. Callers obtain an immutable [`Settings`]
//! snapshot from the store and thread it explicitly into rendering and
//! access checks; the store invalidates its cached snapshot when the host
//! page is saved.

use crate::meta::{PageProps, decode_metadata};

/// Title of the page hosting the settings.
pub const SETTINGS_PAGE_NAME: &str = "gaewiki:settings";

/// Seed body for a fresh wiki's settings page.
pub const DEFAULT_SETTINGS: &str = "wiki_title: My Wiki
start_page: Welcome
admin_email: nobody@example.com
sidebar: gaewiki:sidebar
footer: gaewiki:footer
open-reading: yes
open-editing: no
editors: user1@example.com, user2@example.com
interwiki-google: http://www.google.com/search?q=%s
interwiki-wp: http://en.wikipedia.org/wiki/Special:Search?search=%s
timezone: UTC
---
# gaewiki:settings

Edit me.";

/// An immutable settings snapshot.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    props: PageProps,
}

impl Settings {
    pub fn parse(body: &str) -> Self {
        Self {
            props: decode_metadata(body),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.scalar(key)
    }

    /// List-valued setting; missing or scalar keys read as empty.
    pub fn list(&self, key: &str) -> &[String] {
        self.props.list(key).unwrap_or(&[])
    }

    /// True when the setting equals the given scalar.
    pub fn is(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }

    pub fn start_page(&self) -> &str {
        self.get("start_page").unwrap_or("Welcome")
    }

    pub fn wiki_title(&self) -> &str {
        self.get("wiki_title").unwrap_or("My Wiki")
    }

    /// URL template for an interwiki prefix, if configured.
    pub fn interwiki(&self, prefix: &str) -> Option<&str> {
        self.props.scalar(&format!("interwiki-{prefix}"))
    }

    /// All configured interwiki prefixes with their templates, sorted.
    pub fn interwikis(&self) -> Vec<(&str, &str)> {
        let mut found: Vec<(&str, &str)> = self
            .props
            .iter()
            .filter_map(|(key, value)| {
                let prefix = key.strip_prefix("interwiki-")?;
                Some((prefix, value.as_scalar()?))
            })
            .collect();
        found.sort_by_key(|(prefix, _)| *prefix);
        found
    }

    /// Extension names handed to the markdown engine.
    pub fn markdown_extensions(&self) -> &[String] {
        self.list("markdown-extensions")
    }

    pub(crate) fn props(&self) -> &PageProps {
        &self.props
    }
}
