use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use markwiki_core::{
    InMemoryStore, NoImages, Page, PageStore, Settings, Wikifier, page_url, page_url_rel,
};
use serde_json::json;

use crate::BuildOptions;

/// Adapter build module
///
/// This module bridges the CLI-specific concerns (real filesystem, output
/// directory layout, CSS emission, JSON model emission, strict handling) to
/// the pure core library (`markwiki-core`), which performs header parsing,
/// markup rendering, and link-graph derivation.
///
/// High-level steps:
/// 1. Walk the input directory and save every `.wiki` file into an
///    `InMemoryStore` (deriving links/labels/redirects per page).
/// 2. Obtain the settings snapshot (seeded from the defaults when the wiki
///    carries no `gaewiki:settings` page of its own).
/// 3. Render every page with the markup engine and wrap it in a document
///    shell; the start page is additionally written as index.html.
/// 4. Optionally emit a JSON model (markwiki-data.json).
/// 5. Enforce `--strict` (treat warnings as errors).
/// 6. Print a completion line including the warning count.
pub fn run_build(opts: BuildOptions) -> Result<()> {
    let mut store = InMemoryStore::new();
    let mut warnings = Vec::new();

    load_pages(&opts.input, &mut store, &mut warnings)?;
    info!("loaded {} pages from {}", store.len(), opts.input.display());

    let settings = store.settings();

    // Site emission
    if opts.output.exists() {
        fs::remove_dir_all(&opts.output)
            .with_context(|| format!("Failed removing {}", opts.output.display()))?;
    }
    fs::create_dir_all(&opts.output)
        .with_context(|| format!("Failed creating {}", opts.output.display()))?;
    fs::create_dir_all(opts.output.join("css"))?;
    fs::write(opts.output.join("css/style.css"), DEFAULT_CSS.as_bytes())
        .context("Writing CSS failed")?;

    let images = NoImages;
    let wikifier = Wikifier::new(&store, &settings, &images);

    let pages = store.all_pages();
    let mut emitted = 0usize;
    for page in &pages {
        let raw = page.body.as_deref().unwrap_or("");
        let html = match wikifier.render(raw, Some(&page.title), None) {
            Ok(html) => html,
            Err(err) => {
                warnings.push(format!("Failed to render \"{}\": {err}", page.title));
                continue;
            }
        };
        let doc = wrap_full_html(page, &html, &settings);
        let rel = format!("{}.html", page_url_rel(&page.title));
        let target = opts.output.join(&rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed creating {}", parent.display()))?;
        }
        fs::write(&target, &doc).with_context(|| format!("Failed writing page {rel}"))?;
        debug!("wrote {rel}");
        if page.title == settings.start_page() {
            fs::write(opts.output.join("index.html"), &doc)
                .context("Failed writing index.html")?;
        }
        emitted += 1;
    }

    // Optional JSON model
    if opts.emit_json {
        let pages_json: Vec<_> = pages
            .iter()
            .map(|p| {
                json!({
                  "title": p.title,
                  "url": page_url(&p.title),
                  "links": p.links,
                  "labels": p.labels,
                  "redirect": p.redirect,
                  "public": p.pread,
                  "backlinks": store.backlinks(&p.title)
                      .iter()
                      .map(|b| b.title.clone())
                      .collect::<Vec<_>>(),
                })
            })
            .collect();

        let model = json!({
          "wiki_title": settings.wiki_title(),
          "start_page": settings.start_page(),
          "pages": pages_json,
          "warnings": warnings,
        });
        let pretty = serde_json::to_string_pretty(&model).context("Serialising model failed")?;
        fs::write(opts.output.join("markwiki-data.json"), pretty)
            .context("Failed writing markwiki-data.json")?;
    }

    let warning_count = warnings.len();
    for w in &warnings {
        log::warn!("{w}");
    }

    if opts.strict && warning_count > 0 {
        // Fail after emitting artifacts (mirrors prior behavior; change policy if you prefer pre-emission fail)
        return Err(anyhow!(
            "Strict mode: build failed due to {} warning(s)",
            warning_count
        ));
    }

    // Always print final completion line with page and warning counts
    println!(
        "[markwiki] build completed -> {} (pages: {}, warnings: {})",
        opts.output.display(),
        emitted,
        warning_count
    );

    Ok(())
}

/// Walks the input tree and saves every `.wiki` file as a page. The path
/// relative to the root, minus the extension, is the page title.
fn load_pages(root: &Path, store: &mut InMemoryStore, warnings: &mut Vec<String>) -> Result<()> {
    fn walk(
        root: &Path,
        dir: &Path,
        store: &mut InMemoryStore,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        let entries =
            fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                walk(root, &path, store, warnings)?;
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("wiki") {
                continue;
            }
            let raw = match fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(err) => {
                    warnings.push(format!("Failed to read {}: {err}", path.display()));
                    continue;
                }
            };
            let title = title_for(root, &path);
            if let Err(err) = store.update_page(&title, &raw, None, false) {
                warnings.push(format!("Skipping {}: {err}", path.display()));
            }
        }
        Ok(())
    }
    walk(root, root, store, warnings)
}

/// Page title for a file: the relative path without the extension, with the
/// platform separator normalized to `/`. Underscore/space folding happens in
/// the store.
fn title_for(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if let Some(last) = parts.last_mut() {
        if let Some(stem) = last.strip_suffix(".wiki") {
            *last = stem.to_string();
        }
    }
    parts.join("/")
}

/// Wrap the rendered page body inside a full HTML document shell.
fn wrap_full_html(page: &Page, body_html: &str, settings: &Settings) -> String {
    // Nested titles (a/b/c) emit into subdirectories; walk back up for CSS.
    let depth = page_url_rel(&page.title).matches('/').count();
    let css_prefix = "../".repeat(depth);

    let mut out = String::new();
    out.push_str("<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\" />");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\" />");
    out.push_str("<title>");
    out.push_str(&html_escape::encode_text(page.display_title()));
    out.push_str(" — ");
    out.push_str(&html_escape::encode_text(settings.wiki_title()));
    out.push_str("</title>");
    out.push_str("<link rel=\"stylesheet\" href=\"");
    out.push_str(&css_prefix);
    out.push_str("css/style.css\" />");
    out.push_str("</head><body><main class=\"content\">");
    out.push_str(body_html);
    out.push_str("</main></body></html>");
    out
}

// Simplified CSS (subset of earlier styling). Extend as needed.
const DEFAULT_CSS: &str = include_str!("default.css");
