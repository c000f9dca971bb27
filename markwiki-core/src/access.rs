//! Access policy checks.
//!
//! Pure lookups over the settings snapshot, the store, and per-page header
//! properties. Users are plain email strings; admin status is decided by the
//! surrounding service.

use log::warn;
use regex::Regex;

use crate::settings::Settings;
use crate::store::PageStore;

/// Anchored match against a settings-supplied pattern. Invalid patterns are
/// logged and treated as non-matching.
fn pattern_matches(pattern: &str, title: &str) -> bool {
    match Regex::new(&format!("^(?:{pattern})")) {
        Ok(re) => re.is_match(title),
        Err(err) => {
            warn!("ignoring invalid page pattern {pattern:?}: {err}");
            false
        }
    }
}

pub fn is_page_whitelisted(settings: &Settings, title: &str) -> bool {
    settings
        .get("page-whitelist")
        .is_some_and(|pattern| pattern_matches(pattern, title))
}

/// Whitelisting beats blacklisting.
pub fn is_page_blacklisted(settings: &Settings, title: &str) -> bool {
    if is_page_whitelisted(settings, title) {
        return false;
    }
    settings
        .get("page-blacklist")
        .is_some_and(|pattern| pattern_matches(pattern, title))
}

pub fn can_edit_page(
    store: &dyn PageStore,
    settings: &Settings,
    title: &str,
    user: Option<&str>,
    is_admin: bool,
) -> bool {
    if is_admin {
        return true;
    }

    if title.starts_with("gaewiki:") {
        return false;
    }

    if title.contains('/') && settings.is("parents-must-exist", "yes") {
        let parent_title = title.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("");
        if store.get_page(parent_title).is_none() {
            return false;
        }
    }

    if settings.is("open-editing", "yes") {
        let locked = store.get_page(title).is_some_and(|page| page.is_locked());
        if !locked {
            return !is_page_blacklisted(settings, title);
        }
    }
    let Some(user) = user else {
        return false;
    };
    if settings.is("open-editing", "login") {
        return !is_page_blacklisted(settings, title);
    }
    if settings.list("editors").iter().any(|editor| editor == user) {
        return !is_page_blacklisted(settings, title);
    }
    false
}

/// Whether the user may read the page.
///
/// Admins and configured readers/editors see everything. Otherwise an open
/// wiki shows all pages except `private: yes` ones (which fall back to the
/// page's own readers/editors lists), a login wiki shows `public: yes` pages
/// plus everything to signed-in users, and a closed wiki shows only
/// `public: yes` pages.
pub fn can_read_page(
    store: &dyn PageStore,
    settings: &Settings,
    title: &str,
    user: Option<&str>,
    is_admin: bool,
) -> bool {
    if is_admin {
        return true;
    }

    let in_list = |key: &str| {
        user.is_some_and(|user| settings.list(key).iter().any(|entry| entry == user))
    };
    if in_list("readers") || in_list("editors") {
        return true;
    }

    let page = store.get_page(title);
    let page_prop = |key: &str| -> Option<String> {
        page.as_ref()
            .and_then(|page| page.prop_scalar(key).map(str::to_string))
    };
    let in_page_list = |key: &str| {
        user.is_some_and(|user| {
            page.as_ref()
                .and_then(|page| page.prop_list(key))
                .is_some_and(|list| list.iter().any(|entry| entry == user))
        })
    };

    match settings.get("open-reading") {
        Some("yes") | None => {
            if page_prop("private").as_deref() != Some("yes") {
                return true;
            }
            in_page_list("readers") || in_page_list("editors")
        }
        Some("login") => page_prop("public").as_deref() == Some("yes") || user.is_some(),
        Some(_) => page_prop("public").as_deref() == Some("yes"),
    }
}

pub fn can_see_most_pages(settings: &Settings, user: Option<&str>, is_admin: bool) -> bool {
    if is_admin {
        return true;
    }
    match settings.get("open-reading") {
        Some("yes") | None => return true,
        _ => {}
    }
    let Some(user) = user else {
        return false;
    };
    if settings.is("open-reading", "login") {
        return true;
    }
    settings.list("readers").iter().any(|reader| reader == user)
        || settings.list("editors").iter().any(|editor| editor == user)
}

pub fn can_upload_image(settings: &Settings, user: Option<&str>, is_admin: bool) -> bool {
    if is_admin {
        return true;
    }
    if settings.is("image-uploading", "yes") {
        return true;
    }
    user.is_some() && settings.is("image-uploading", "login")
}
