//! The markup engine: raw page text to HTML.
//!
//! Rendering is a pure function of the raw text, the context title, and the
//! injected collaborators: pages are looked up through [`PageStore`], images
//! through [`ImageService`], and the interwiki table comes from the settings
//! snapshot. Order matters: header split, the plain-format escape hatch,
//! markdown, the display-title override, link expansion, then typography.

use html_escape::{encode_double_quoted_attribute, encode_text};
use log::debug;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

use crate::error::{Error, Result};
use crate::images::ImageService;
use crate::links::WIKI_WORD;
use crate::meta::decode_metadata;
use crate::page::{PARENT_LABEL_PREFIX, Page};
use crate::settings::Settings;
use crate::store::PageStore;
use crate::titles::{page_url, page_url_rel, url_quote};

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new("<h1>(.+)</h1>").unwrap());
static DOT_SPACING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.  ").unwrap());
static DASH_SPACING: Lazy<Regex> = Lazy::new(|| Regex::new(" +(—|--) +").unwrap());
static IFRAMES: Lazy<Regex> = Lazy::new(|| Regex::new("<iframe.*</iframe>").unwrap());
static HEADING_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<h\d>.*").unwrap());

/// How a `[[...]]` token target dispatches, keyed by its namespace prefix.
/// A prefix containing a space is not a namespace at all.
#[derive(Debug, PartialEq, Eq)]
enum LinkKind<'a> {
    Internal,
    List(&'a str),
    Children(&'a str),
    Special(&'a str),
    Image(&'a str),
    Interwiki { prefix: &'a str, rest: &'a str },
}

fn classify(target: &str) -> LinkKind<'_> {
    let Some((prefix, rest)) = target.split_once(':') else {
        return LinkKind::Internal;
    };
    if prefix.contains(' ') {
        return LinkKind::Internal;
    }
    match prefix {
        "List" => LinkKind::List(rest),
        "gaewiki" => LinkKind::Special(rest),
        "ListChildren" => LinkKind::Children(rest),
        "Image" => LinkKind::Image(rest),
        _ => LinkKind::Interwiki { prefix, rest },
    }
}

/// The markup renderer.
pub struct Wikifier<'a> {
    store: &'a dyn PageStore,
    settings: &'a Settings,
    images: &'a dyn ImageService,
}

impl<'a> Wikifier<'a> {
    pub fn new(
        store: &'a dyn PageStore,
        settings: &'a Settings,
        images: &'a dyn ImageService,
    ) -> Self {
        Self {
            store,
            settings,
            images,
        }
    }

    /// Renders raw stored page text to HTML.
    ///
    /// `context_title` names the page being rendered (used by `ListChildren:`
    /// and the audio player fallback); `display_title` overrides the page's
    /// own `display_title` property.
    pub fn render(
        &self,
        raw: &str,
        context_title: Option<&str>,
        display_title: Option<&str>,
    ) -> Result<String> {
        let props = decode_metadata(raw);
        let body = props.text();

        // Escape hatch for non-wiki content: no markdown, no links.
        if props.scalar("format") == Some("plain") {
            return Ok(encode_text(body).to_string());
        }

        let mut html = render_markdown(body, self.settings)?;
        if let Some(display) = display_title.or_else(|| props.scalar("display_title")) {
            html = replace_heading(&html, display);
        }
        self.wikify(&html, context_title)
    }

    /// Expands every `[[...]]` token and applies the typography fixups.
    pub fn wikify(&self, text: &str, context_title: Option<&str>) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for cap in WIKI_WORD.captures_iter(text) {
            let m = cap.get(0).unwrap();
            out.push_str(&text[last..m.start()]);
            out.push_str(&self.wikify_one(&cap[1], context_title)?);
            last = m.end();
        }
        out.push_str(&text[last..]);

        let text = DOT_SPACING.replace_all(&out, ".&nbsp; ");
        let text = DASH_SPACING.replace_all(&text, "&nbsp;— ");
        Ok(text.into_owned())
    }

    /// Page summary: the explicit `summary` property, else the rendered body
    /// with the title heading suppressed.
    pub fn summary(&self, page: &Page) -> Result<String> {
        if let Some(summary) = page.prop_scalar("summary") {
            return Ok(summary.to_string());
        }
        self.render(page.body.as_deref().unwrap_or(""), None, Some(""))
    }

    fn wikify_one(&self, token: &str, context_title: Option<&str>) -> Result<String> {
        let (name, mut label) = match token.split_once('|') {
            Some((name, label)) => (name, label),
            None => (token, token),
        };

        let kind = classify(name);
        // Namespaced targets without an explicit label display the part
        // after the prefix, even when they fall through to an internal link.
        if kind != LinkKind::Internal && label == name {
            if let Some((_prefix, rest)) = name.split_once(':') {
                label = rest;
            }
        }

        match kind {
            LinkKind::Internal => Ok(self.internal_link(name, label)),
            LinkKind::List(spec) => Ok(self.label_listing(spec)),
            LinkKind::Special(body) => Ok(self.special_token(body, context_title)),
            LinkKind::Children(prefix) => {
                let prefix = if prefix.is_empty() {
                    context_title.unwrap_or_default()
                } else {
                    prefix
                };
                Ok(self.label_listing(&format!("{PARENT_LABEL_PREFIX}{prefix}")))
            }
            LinkKind::Image(spec) => {
                let args: Vec<&str> = spec.split(';').collect();
                self.image_embed(&args, label)
            }
            LinkKind::Interwiki { prefix, rest } => {
                match self.settings.interwiki(prefix) {
                    Some(template) => {
                        let url = template.replace("%s", &url_quote(rest));
                        Ok(format!(
                            r#"<a class="iw iw-{prefix}" href="{url}" target="_blank">{}</a>"#,
                            encode_text(label)
                        ))
                    }
                    // Unknown namespace: the whole target is a page title.
                    None => Ok(self.internal_link(name, label)),
                }
            }
        }
    }

    /// An anchor to a wiki page; unknown or unsaved targets become
    /// "create" links.
    fn internal_link(&self, name: &str, label: &str) -> String {
        let (class, href, hint) = if self.store.get_page(name).is_some() {
            ("int".to_string(), page_url(name), name.to_string())
        } else {
            (
                "int missing".to_string(),
                format!("/w/edit?page={}", page_url_rel(name)),
                format!("{name} (create)"),
            )
        };
        format!(
            r#"<a class="{class}" href="{href}" title="{}">{}</a>"#,
            encode_double_quoted_attribute(&hint),
            encode_text(label)
        )
    }

    /// An unordered list of the pages carrying a label. The spec after the
    /// label may request `sort=date,desc`; the default order is
    /// case-insensitive by title. No matches render as nothing at all.
    fn label_listing(&self, spec: &str) -> String {
        let mut keys = spec.split(';');
        let label = keys.next().unwrap_or("");

        let mut pages = self.store.pages_by_label(label);
        if spec.split(';').any(|key| key == "sort=date,desc") {
            pages.sort_by(|a, b| b.created.cmp(&a.created));
        } else {
            pages.sort_by_key(|page| page.title.to_lowercase());
        }

        let mut items = String::new();
        for page in &pages {
            let name = page.redirect.as_deref().unwrap_or(&page.title);
            items.push_str(&format!(
                r#"<li class="list-group-item"><a href="{}" title="{}">{}</a></li>"#,
                page_url(name),
                encode_double_quoted_attribute(name),
                encode_text(page.display_title()),
            ));
        }
        if items.is_empty() {
            String::new()
        } else {
            format!(r#"<ul class="list-group">{items}</ul>"#)
        }
    }

    /// `gaewiki:` tokens: widgets and escape hatches that are not links.
    /// Unknown tokens degrade to a comment visible only in the source.
    fn special_token(&self, body: &str, context_title: Option<&str>) -> String {
        let parts: Vec<&str> = body.split(';').collect();
        debug!("parsing a special token: {parts:?}");

        match parts[0] {
            "mp3player" => {
                let mut url = parts
                    .iter()
                    .find_map(|part| part.strip_prefix("url="))
                    .map(str::to_string);
                if url.is_none() {
                    if let Some(title) = context_title {
                        url = self
                            .store
                            .get_page(title)
                            .and_then(|page| page.file().map(str::to_string));
                    }
                }
                let Some(url) = url else {
                    return "<!-- player error: no file -->".to_string();
                };
                let file_url = encode_double_quoted_attribute(&url).to_string();
                format!(
                    "<div class=\"player mp3player\">\
                     <object type=\"application/x-shockwave-flash\" data=\"/static/player.swf\" width=\"200\" height=\"20\">\
                     <param name=\"movie\" value=\"/files/player.swf\"/>\
                     <param name=\"bgcolor\" value=\"#eeeeee\"/>\
                     <param name=\"FlashVars\" value=\"mp3={file_url}&amp;buttoncolor=000000&amp;slidercolor=000000&amp;loadingcolor=808080\"/>\
                     </object> <a href=\"{file_url}\">Download audio file</a></div>"
                )
            }
            "map" => self.map_embed(&parts[1..], context_title),
            other => format!("<!-- unsupported token: {other} -->"),
        }
    }

    /// The map token's iframe embed. `page=` and `label=` rewrite the target
    /// URL; other keys override iframe attributes.
    fn map_embed(&self, args: &[&str], context_title: Option<&str>) -> String {
        let mut width = "300";
        let mut height = "200";
        let mut class = "map right";
        let mut url = format!(
            "/w/map?page={}",
            page_url_rel(context_title.unwrap_or_default())
        );
        let mut extra = String::new();

        for arg in args {
            let Some((key, value)) = arg.split_once('=') else {
                continue;
            };
            match key {
                "page" => url = format!("/w/map?page={}", page_url_rel(value)),
                "label" => url = format!("/w/pages/map?label={}", page_url_rel(value)),
                "width" => width = value,
                "height" => height = value,
                "class" => class = value,
                _ => extra.push_str(&format!(
                    r#" {key}="{}""#,
                    encode_double_quoted_attribute(value)
                )),
            }
        }

        format!(
            r#"<iframe class="{class}" width="{width}" height="{height}" src="{url}"{extra}></iframe>"#
        )
    }

    /// An `<img>` wrapped in a link to the image detail page. Unknown keys
    /// propagate as lookup failures.
    fn image_embed(&self, args: &[&str], label: &str) -> Result<String> {
        let key = args.first().copied().unwrap_or("");
        let mut size = None;
        let mut crop = false;
        let mut align = None;
        for arg in args.get(1..).unwrap_or(&[]) {
            if let Some(value) = arg.strip_prefix("size=") {
                size = value.parse().ok();
            } else if *arg == "crop" {
                crop = true;
            } else if *arg == "left" || *arg == "right" {
                align = Some(*arg);
            }
        }

        let title = if label.is_empty() {
            "Click to view image details"
        } else {
            label
        };

        let src = self.images.url(key, size, crop)?;
        let filename = self.images.filename(key)?;
        let mut attrs = format!(
            r#"src="{}" alt="{}""#,
            encode_double_quoted_attribute(&src),
            encode_double_quoted_attribute(&filename)
        );
        if let Some(align) = align {
            attrs.push_str(&format!(r#" align="{align}""#));
        }
        Ok(format!(
            r#"<a href="/w/image/view?key={}" title="{}"><img {attrs}/></a>"#,
            url_quote(key),
            encode_double_quoted_attribute(title)
        ))
    }
}

/// Strips embeds and everything from the first heading onward, for feed-style
/// summaries.
pub fn cleanup_summary(text: &str) -> String {
    let text = IFRAMES.replace_all(text, "");
    HEADING_TAIL.replace(&text, "").into_owned()
}

fn render_markdown(text: &str, settings: &Settings) -> Result<String> {
    let options = markdown_options(settings.markdown_extensions());
    markdown::to_html_with_options(text, &options)
        .map(|html| html.trim().to_string())
        .map_err(|err| Error::Markdown(err.to_string()))
}

fn markdown_options(extensions: &[String]) -> markdown::Options {
    let mut options = if extensions.iter().any(|ext| ext == "gfm") {
        markdown::Options::gfm()
    } else {
        markdown::Options::default()
    };
    // Raw HTML in page bodies passes through unescaped.
    options.compile.allow_dangerous_html = true;
    options
}

/// Replaces the first rendered `<h1>` with the display title, or removes it
/// when the override is blank.
fn replace_heading(html: &str, display_title: &str) -> String {
    let replacement = if display_title.trim().is_empty() {
        String::new()
    } else {
        format!("<h1>{}</h1>", encode_text(display_title))
    };
    HEADING.replace(html, NoExpand(&replacement)).into_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::Error;
    use crate::store::InMemoryStore;

    struct TestImages;

    impl ImageService for TestImages {
        fn url(&self, key: &str, size: Option<u32>, crop: bool) -> Result<String> {
            let mut url = format!("/img/{key}");
            if let Some(size) = size {
                url.push_str(&format!("/s{size}"));
            }
            if crop {
                url.push_str("/crop");
            }
            Ok(url)
        }

        fn filename(&self, key: &str) -> Result<String> {
            Ok(key.to_string())
        }
    }

    fn wikify(text: &str, context: Option<&str>) -> String {
        let mut store = InMemoryStore::new();
        let settings = store.settings();
        Wikifier::new(&store, &settings, &TestImages)
            .wikify(text, context)
            .unwrap()
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(wikify("foo bar", None), "foo bar");
    }

    #[test]
    fn basic_linking() {
        assert_eq!(
            wikify("[[foo bar]]", None),
            r#"<a class="int missing" href="/w/edit?page=foo_bar" title="foo bar (create)">foo bar</a>"#
        );
        assert_eq!(
            wikify("[[foo|bar]]", None),
            r#"<a class="int missing" href="/w/edit?page=foo" title="foo (create)">bar</a>"#
        );
    }

    #[test]
    fn multiple_links_on_one_line() {
        assert_eq!(
            wikify("[[foo]], [[bar]]", None),
            r#"<a class="int missing" href="/w/edit?page=foo" title="foo (create)">foo</a>, <a class="int missing" href="/w/edit?page=bar" title="bar (create)">bar</a>"#
        );
    }

    #[test]
    fn interwiki_linking() {
        assert_eq!(
            wikify("[[google:hello]]", None),
            r#"<a class="iw iw-google" href="http://www.google.com/search?q=hello" target="_blank">hello</a>"#
        );
        // Unknown prefix falls through to an internal link, keeping the
        // shortened label.
        assert_eq!(
            wikify("[[missing:hello]]", None),
            r#"<a class="int missing" href="/w/edit?page=missing%3Ahello" title="missing:hello (create)">hello</a>"#
        );
    }

    #[test]
    fn saved_pages_link_directly() {
        let mut store = InMemoryStore::new();
        let settings = store.settings();
        store.update_page("foo bar", "# foo bar", None, false).unwrap();
        let out = Wikifier::new(&store, &settings, &TestImages)
            .wikify("[[foo_bar|click]]", None)
            .unwrap();
        assert_eq!(
            out,
            r#"<a class="int" href="/foo_bar" title="foo_bar">click</a>"#
        );
    }

    #[test]
    fn typography() {
        assert_eq!(wikify("foo. bar", None), "foo. bar");
        assert_eq!(wikify("foo.  bar", None), "foo.&nbsp; bar");
        assert_eq!(wikify("foo  —  bar", None), "foo&nbsp;— bar");
        assert_eq!(wikify("foo  --  bar", None), "foo&nbsp;— bar");
    }

    #[test]
    fn unterminated_links_stay_literal() {
        assert_eq!(wikify("[[foo", None), "[[foo");
    }

    #[test]
    fn unsupported_token_becomes_comment() {
        assert_eq!(
            wikify("[[gaewiki:whatever]]", None),
            "<!-- unsupported token: whatever -->"
        );
    }

    #[test]
    fn mp3_player_needs_a_file() {
        assert_eq!(
            wikify("[[gaewiki:mp3player]]", None),
            "<!-- player error: no file -->"
        );
        let with_url = wikify("[[gaewiki:mp3player;url=http://x/y.mp3]]", None);
        assert!(with_url.contains("mp3=http://x/y.mp3&amp;"));
        assert!(with_url.contains(r#"<a href="http://x/y.mp3">Download audio file</a>"#));
    }

    #[test]
    fn mp3_player_falls_back_to_the_page_file() {
        let mut store = InMemoryStore::new();
        let settings = store.settings();
        store
            .update_page("song", "file: http://x/s.mp3\n---\n# song", None, false)
            .unwrap();
        let out = Wikifier::new(&store, &settings, &TestImages)
            .wikify("[[gaewiki:mp3player]]", Some("song"))
            .unwrap();
        assert!(out.contains("mp3=http://x/s.mp3&amp;"));
    }

    #[test]
    fn map_embed_defaults_and_overrides() {
        assert_eq!(
            wikify("[[gaewiki:map]]", Some("my place")),
            r#"<iframe class="map right" width="300" height="200" src="/w/map?page=my_place"></iframe>"#
        );
        assert_eq!(
            wikify("[[gaewiki:map;label=cities;width=400;frameborder=0]]", None),
            r#"<iframe class="map right" width="400" height="200" src="/w/pages/map?label=cities" frameborder="0"></iframe>"#
        );
    }

    #[test]
    fn image_embeds() {
        assert_eq!(
            wikify("[[Image:pic.jpg]]", None),
            r#"<a href="/w/image/view?key=pic.jpg" title="pic.jpg"><img src="/img/pic.jpg" alt="pic.jpg"/></a>"#
        );
        assert_eq!(
            wikify("[[Image:pic.jpg;size=200;crop;left|My pic]]", None),
            r#"<a href="/w/image/view?key=pic.jpg" title="My pic"><img src="/img/pic.jpg/s200/crop" alt="pic.jpg" align="left"/></a>"#
        );
    }

    #[test]
    fn unknown_image_key_is_an_error() {
        let mut store = InMemoryStore::new();
        let settings = store.settings();
        let err = Wikifier::new(&store, &settings, &crate::images::NoImages)
            .wikify("[[Image:nope.png]]", None)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownImage(key) if key == "nope.png"));
    }

    #[test]
    fn summary_cleanup() {
        let text = "intro <iframe src=\"x\"></iframe> outro\n<h2>rest</h2>\nmore";
        assert_eq!(cleanup_summary(text), "intro  outro\n");
    }
}
