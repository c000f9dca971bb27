/*!
 * markwiki-core
 *
 * Core library for a small wiki engine: page text is a `key: value` header
 * block plus a markdown body, rendered to HTML through a link/macro language
 * (`[[internal]]`, `[[prefix:interwiki]]`, `[[List:label]]` listings,
 * `[[Image:...]]` embeds, `[[gaewiki:...]]` widget tokens, redirects), with a
 * backlink/label graph derived from the stored pages.
 *
 * The crate is intentionally free of I/O so it can:
 * - Back a real service (provide a `PageStore`/`ImageService` adapter)
 * - Drive the bundled static-site CLI via `InMemoryStore`
 * - Be unit tested with synthetic page sets
 *
 * High-Level Flow (render):
 * 1. Split the raw text into header and body; decode the header mapping.
 * 2. Bail out early for `format: plain` pages (escaped verbatim).
 * 3. Render the body markdown to HTML (`markdown` crate, extensions from
 *    the wiki settings).
 * 4. Apply the `display_title` override to the first `<h1>`.
 * 5. Expand every `[[...]]` token against the page store, the interwiki
 *    table, and the image collaborator.
 * 6. Apply the typography substitutions.
 *
 * Saving a page re-derives its metadata-dependent fields (links, labels,
 * redirect, geo point) from the raw text; the graph queries recompute from
 * those derived sets on demand.
 */

mod access;
mod error;
mod graph;
mod images;
mod links;
mod meta;
mod page;
mod render;
mod settings;
mod store;
mod titles;

pub use access::{
    can_edit_page, can_read_page, can_see_most_pages, can_upload_image, is_page_blacklisted,
    is_page_whitelisted,
};
pub use error::{Error, Result};
pub use graph::{backlinks_among, with_label};
pub use images::{ImageService, NoImages};
pub use links::extract_links;
pub use meta::{
    PageProps, PropValue, TEXT_KEY, decode_metadata, encode_metadata, pack_header,
    split_header_body,
};
pub use page::{GEO_LABEL, GeoPoint, PARENT_LABEL_PREFIX, Page, Revision};
pub use render::{Wikifier, cleanup_summary};
pub use settings::{DEFAULT_SETTINGS, SETTINGS_PAGE_NAME, Settings};
pub use store::{InMemoryStore, PageStore};
pub use titles::{label_url, normalize_title, page_url, page_url_rel, url_quote};
