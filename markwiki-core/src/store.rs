//! Page storage.
//!
//! [`PageStore`] is the narrow read interface the renderer consumes; the
//! surrounding service supplies a real implementation. [`InMemoryStore`] is
//! the reference implementation used by the CLI and the tests; it also owns
//! the write lifecycle (save, update, delete, revision archiving) and the
//! cached settings snapshot.

use std::collections::BTreeMap;

use log::debug;
use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::graph;
use crate::meta::{PropValue, decode_metadata, encode_metadata};
use crate::page::{GEO_LABEL, Page, Revision};
use crate::settings::{DEFAULT_SETTINGS, SETTINGS_PAGE_NAME, Settings};
use crate::titles::normalize_title;

/// Read access to stored pages. Titles are looked up in normalized form
/// (underscores and spaces equivalent); only saved pages are returned.
pub trait PageStore {
    fn get_page(&self, title: &str) -> Option<Page>;
    fn pages_by_label(&self, label: &str) -> Vec<Page>;
    fn backlinks(&self, title: &str) -> Vec<Page>;
}

/// In-memory page store keyed by normalized title.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    pages: BTreeMap<String, Page>,
    revisions: Vec<Revision>,
    settings_cache: Option<Settings>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    /// Loads the page by title, or a fresh unsaved placeholder when nothing
    /// is stored under it.
    pub fn get_by_title(&self, title: &str) -> Page {
        let key = normalize_title(title);
        match self.pages.get(&key) {
            Some(page) => page.clone(),
            None => Page::new(&key),
        }
    }

    /// Saves a page, re-deriving every dependent field from its raw body.
    ///
    /// A `name` header property renames the page; renaming over an existing
    /// title is rejected with [`Error::PageExists`].
    pub fn put(&mut self, mut page: Page) -> Result<()> {
        let old_key = normalize_title(&page.title);
        if let Some(body) = page.body.clone() {
            let props = decode_metadata(&body);
            if let Some(name) = props.scalar("name") {
                if name != page.title {
                    if self.pages.contains_key(&normalize_title(name)) {
                        return Err(Error::PageExists(name.to_string()));
                    }
                    page.title = name.to_string();
                }
            }
        }
        page.rederive();
        page.saved = true;
        let title = page.title.clone();
        self.pages.remove(&old_key);
        self.pages.insert(normalize_title(&title), page);
        self.check_and_flush(&title);
        Ok(())
    }

    /// Replaces a page's raw text (or deletes the page), archiving the prior
    /// revision first.
    pub fn update_page(
        &mut self,
        title: &str,
        body: &str,
        author: Option<&str>,
        delete: bool,
    ) -> Result<()> {
        let mut page = self.get_by_title(title);
        if page.is_saved() {
            self.backup(&page);
            if delete {
                debug!("deleting page \"{}\"", page.title);
                self.pages.remove(&normalize_title(&page.title));
                self.check_and_flush(&page.title);
                return Ok(());
            }
        }

        debug!("updating page \"{}\"", page.title);
        page.body = Some(body.to_string());
        page.author = author.map(str::to_string);
        page.updated = OffsetDateTime::now_utc();
        self.put(page)
    }

    /// Archives the current revision of a page.
    fn backup(&mut self, page: &Page) {
        debug!("backing up page \"{}\"", page.title);
        self.revisions.push(Revision {
            title: page.title.clone(),
            body: page.body.clone().unwrap_or_default(),
            author: page.author.clone(),
            created: page.updated,
        });
    }

    /// Archived revisions of a page, newest first.
    pub fn history(&self, title: &str) -> Vec<Revision> {
        let wanted = normalize_title(title);
        let mut found: Vec<Revision> = self
            .revisions
            .iter()
            .filter(|rev| normalize_title(&rev.title) == wanted)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created.cmp(&a.created));
        found
    }

    /// Every page, plain titles before namespaced (`:`) ones.
    pub fn all_pages(&self) -> Vec<Page> {
        let mut pages: Vec<Page> = self.pages.values().cloned().collect();
        pages.sort_by_key(|page| {
            let lower = page.title.to_lowercase();
            if page.title.contains(':') {
                lower
            } else {
                format!(":{lower}")
            }
        });
        pages
    }

    pub fn recently_added(&self, limit: usize) -> Vec<Page> {
        let mut pages: Vec<Page> = self.pages.values().cloned().collect();
        pages.sort_by(|a, b| b.created.cmp(&a.created));
        pages.truncate(limit);
        pages
    }

    /// The most recently updated pages visible under the wiki's reading
    /// policy.
    pub fn recent_changes(&self, settings: &Settings) -> Vec<Page> {
        let open = matches!(settings.get("open-reading"), Some("yes") | Some("login"));
        let mut pages: Vec<Page> = self
            .pages
            .values()
            .filter(|page| open || page.pread)
            .cloned()
            .collect();
        pages.sort_by(|a, b| b.updated.cmp(&a.updated));
        pages.truncate(20);
        pages
    }

    pub fn publicly_readable(&self, settings: &Settings) -> Vec<Page> {
        let open = settings.is("open-reading", "yes");
        let mut pages: Vec<Page> = self
            .pages
            .values()
            .filter(|page| open || page.pread)
            .cloned()
            .collect();
        pages.sort_by_key(|page| page.title.to_lowercase());
        pages
    }

    /// Geotagged pages, optionally narrowed to a label, newest first.
    pub fn geotagged(&self, label: Option<&str>, limit: usize) -> Vec<Page> {
        let label = normalize_title(label.unwrap_or(GEO_LABEL));
        let mut pages = self.pages_by_label(&label);
        pages.sort_by(|a, b| b.created.cmp(&a.created));
        pages.truncate(limit);
        pages.retain(|page| page.labels.iter().any(|l| l == GEO_LABEL));
        pages
    }

    /// The current settings snapshot, seeding the host page on first use.
    pub fn settings(&mut self) -> Settings {
        if let Some(cached) = &self.settings_cache {
            return cached.clone();
        }
        if self.get_page(SETTINGS_PAGE_NAME).is_none() {
            let mut page = Page::new(SETTINGS_PAGE_NAME);
            page.body = Some(DEFAULT_SETTINGS.to_string());
            if let Err(err) = self.put(page) {
                debug!("failed to seed the settings page: {err}");
            }
        }
        let body = self
            .get_page(SETTINGS_PAGE_NAME)
            .and_then(|page| page.body)
            .unwrap_or_default();
        let settings = Settings::parse(&body);
        self.settings_cache = Some(settings.clone());
        settings
    }

    /// Applies updates to the settings host page; `None` removes a key.
    pub fn change_settings<I>(&mut self, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, Option<PropValue>)>,
    {
        let mut page = self.get_by_title(SETTINGS_PAGE_NAME);
        if page.body.is_none() {
            page.body = Some(DEFAULT_SETTINGS.to_string());
        }
        let mut props = decode_metadata(page.body.as_deref().unwrap_or(""));
        for (key, value) in updates {
            match value {
                Some(value) => props.set(&key, value),
                None => {
                    props.remove(&key);
                }
            }
        }
        page.body = Some(encode_metadata(&props));
        self.put(page)
    }

    /// Drops the cached settings snapshot.
    pub fn invalidate_settings(&mut self) {
        self.settings_cache = None;
    }

    fn check_and_flush(&mut self, title: &str) {
        if title == SETTINGS_PAGE_NAME {
            self.invalidate_settings();
        }
    }

    /// A fresh page pre-filled from the most specific template page
    /// available for the requesting user.
    pub fn page_from_template(&self, title: &str, user: Option<&str>, is_admin: bool) -> Page {
        let mut template = "# PAGE_TITLE\n\n**PAGE_TITLE** is ...".to_string();
        let mut names = vec!["gaewiki:anon page template"];
        if user.is_some() {
            names.insert(0, "gaewiki:user page template");
        }
        if is_admin {
            names.insert(0, "gaewiki:admin page template");
        }
        for name in names {
            if let Some(body) = self.get_page(name).and_then(|page| page.body) {
                debug!("loaded template from {name}");
                template = body.replace(name, "PAGE_TITLE");
                break;
            }
        }
        if let Some(user) = user {
            template = template.replace("USER_EMAIL", user);
        }
        let mut page = Page::new(&normalize_title(title));
        let body = template.replace("PAGE_TITLE", &page.title);
        page.body = Some(body);
        page
    }
}

impl PageStore for InMemoryStore {
    fn get_page(&self, title: &str) -> Option<Page> {
        self.pages.get(&normalize_title(title)).cloned()
    }

    fn pages_by_label(&self, label: &str) -> Vec<Page> {
        graph::with_label(self.pages.values(), label)
            .into_iter()
            .cloned()
            .collect()
    }

    fn backlinks(&self, title: &str) -> Vec<Page> {
        graph::backlinks_among(self.pages.values(), title)
            .into_iter()
            .cloned()
            .collect()
    }
}
