//! End-to-end rendering behavior against an in-memory store.

use markwiki_core::{
    ImageService, InMemoryStore, PageStore, Result, Settings, Wikifier, decode_metadata,
    encode_metadata,
};
use pretty_assertions::assert_eq;

struct TestImages;

impl ImageService for TestImages {
    fn url(&self, key: &str, _size: Option<u32>, _crop: bool) -> Result<String> {
        Ok(format!("/img/{key}"))
    }

    fn filename(&self, key: &str) -> Result<String> {
        Ok(key.to_string())
    }
}

fn fresh() -> (InMemoryStore, Settings) {
    let mut store = InMemoryStore::new();
    let settings = store.settings();
    (store, settings)
}

#[test]
fn missing_pages_render_as_create_links() {
    let (store, settings) = fresh();
    let html = Wikifier::new(&store, &settings, &TestImages)
        .render("[[foo bar]]", None, None)
        .unwrap();
    assert!(html.contains("missing"), "html: {html}");
    assert!(html.contains(r#"href="/w/edit?page=foo_bar""#), "html: {html}");
    assert!(html.contains("foo bar (create)"), "html: {html}");
}

#[test]
fn interwiki_links_open_in_a_new_tab() {
    let (store, settings) = fresh();
    let html = Wikifier::new(&store, &settings, &TestImages)
        .render("[[google:hello]]", None, None)
        .unwrap();
    assert!(
        html.contains(r#"href="http://www.google.com/search?q=hello""#),
        "html: {html}"
    );
    assert!(html.contains(r#"target="_blank""#), "html: {html}");
}

#[test]
fn label_listings() {
    let (mut store, settings) = fresh();
    {
        let wikifier = Wikifier::new(&store, &settings, &TestImages);
        assert_eq!(wikifier.wikify("[[List:foo]]", None).unwrap(), "");
    }

    store
        .update_page("bar", "labels: foo\n---\n# bar\n\nHello, world.", None, false)
        .unwrap();
    store
        .update_page("baz", "labels: foo\n---\n# baz\n\nHello, world.", None, false)
        .unwrap();

    let wikifier = Wikifier::new(&store, &settings, &TestImages);
    assert_eq!(
        wikifier.wikify("[[List:foo]]", None).unwrap(),
        "<ul class=\"list-group\">\
         <li class=\"list-group-item\"><a href=\"/bar\" title=\"bar\">bar</a></li>\
         <li class=\"list-group-item\"><a href=\"/baz\" title=\"baz\">baz</a></li>\
         </ul>"
    );
}

#[test]
fn label_listings_can_sort_by_date() {
    let (mut store, settings) = fresh();
    // "apple" sorts first by title but is the older page.
    store
        .update_page(
            "apple",
            "date: 2020-01-01 10:00:00\nlabels: foo\n---\nx",
            None,
            false,
        )
        .unwrap();
    store
        .update_page(
            "zebra",
            "date: 2021-06-15 09:30:00\nlabels: foo\n---\nx",
            None,
            false,
        )
        .unwrap();

    let wikifier = Wikifier::new(&store, &settings, &TestImages);
    let by_title = wikifier.wikify("[[List:foo]]", None).unwrap();
    assert!(by_title.find("/apple").unwrap() < by_title.find("/zebra").unwrap());

    let by_date = wikifier.wikify("[[List:foo;sort=date,desc]]", None).unwrap();
    assert!(by_date.find("/zebra").unwrap() < by_date.find("/apple").unwrap());
}

#[test]
fn listings_follow_redirects() {
    let (mut store, settings) = fresh();
    store
        .update_page("alias", "labels: foo\nredirect: target\n---\nx", None, false)
        .unwrap();
    let wikifier = Wikifier::new(&store, &settings, &TestImages);
    let html = wikifier.wikify("[[List:foo]]", None).unwrap();
    assert!(html.contains(r#"href="/target""#), "html: {html}");
}

#[test]
fn children_listings() {
    let (mut store, settings) = fresh();
    store.update_page("foo/bar", "x", None, false).unwrap();
    store.update_page("foo/baz", "x", None, false).unwrap();

    let wikifier = Wikifier::new(&store, &settings, &TestImages);
    let explicit = wikifier.wikify("[[ListChildren:foo]]", None).unwrap();
    assert!(explicit.contains(r#"href="/foo/bar""#), "html: {explicit}");
    assert!(explicit.contains(r#"href="/foo/baz""#), "html: {explicit}");

    // An empty prefix falls back to the context title.
    let implicit = wikifier.wikify("[[ListChildren:]]", Some("foo")).unwrap();
    assert_eq!(explicit, implicit);
}

#[test]
fn display_title_overrides_the_heading() {
    let (store, settings) = fresh();
    let wikifier = Wikifier::new(&store, &settings, &TestImages);

    let html = wikifier
        .render("display_title: foo\n---\n# bar", None, None)
        .unwrap();
    assert!(!html.contains("<h1>bar</h1>"), "html: {html}");
    assert!(html.contains("<h1>foo</h1>"), "html: {html}");

    let html = wikifier.render("display_title:\n---\n# foo", None, None).unwrap();
    assert!(!html.contains("<h1>"), "html: {html}");
}

#[test]
fn caller_display_title_beats_the_property() {
    let (store, settings) = fresh();
    let wikifier = Wikifier::new(&store, &settings, &TestImages);
    let html = wikifier
        .render("display_title: foo\n---\n# bar", None, Some("baz"))
        .unwrap();
    assert!(html.contains("<h1>baz</h1>"), "html: {html}");
}

#[test]
fn plain_format_bypasses_everything() {
    let (store, settings) = fresh();
    let wikifier = Wikifier::new(&store, &settings, &TestImages);
    let html = wikifier
        .render("format: plain\n---\n# <b>raw</b> [[foo]]", None, None)
        .unwrap();
    assert_eq!(html, "# &lt;b&gt;raw&lt;/b&gt; [[foo]]");
}

#[test]
fn markdown_renders_headings() {
    let (store, settings) = fresh();
    let wikifier = Wikifier::new(&store, &settings, &TestImages);
    assert_eq!(wikifier.render("# foo", None, None).unwrap(), "<h1>foo</h1>");
}

#[test]
fn redirects_resolve_one_hop() {
    let (mut store, _) = fresh();
    store.update_page("A", "redirect: B\n---\n# A", None, false).unwrap();
    store.update_page("B", "# B", None, false).unwrap();

    let a = store.get_by_title("A");
    assert_eq!(a.redirected(&store).title, "B");

    // A redirect to a missing page resolves to the original.
    store.update_page("C", "redirect: nowhere\n---\n# C", None, false).unwrap();
    let c = store.get_by_title("C");
    assert_eq!(c.redirected(&store).title, "C");

    // Self-redirects stay put instead of looping.
    store.update_page("D", "redirect: D\n---\n# D", None, false).unwrap();
    let d = store.get_by_title("D");
    assert_eq!(d.redirected(&store).title, "D");
}

#[test]
fn metadata_only_edits_keep_the_prose() {
    let (mut store, _) = fresh();
    store
        .update_page("page", "labels: one\n---\nThe prose.", None, false)
        .unwrap();

    let mut page = store.get_by_title("page");
    page.set_property("labels", Some(markwiki_core::PropValue::List(vec!["two".into()])));
    store.put(page).unwrap();

    let page = store.get_by_title("page");
    assert_eq!(page.body.as_deref(), Some("labels: two\n---\nThe prose."));
    assert_eq!(page.labels, vec!["two"]);
    assert_eq!(store.pages_by_label("one").len(), 0);
    assert_eq!(store.pages_by_label("two").len(), 1);
}

#[test]
fn codec_round_trip_through_the_public_api() {
    let raw = "key: value\nkeys: one, two\n---\nbody text";
    let props = decode_metadata(raw);
    let encoded = encode_metadata(&props);
    let again = decode_metadata(&encoded);
    assert_eq!(again.scalar("key"), Some("value"));
    assert_eq!(again.list("keys"), props.list("keys"));
    assert_eq!(again.text(), "body text");
}

#[test]
fn link_graph_follows_edits() {
    let (mut store, _) = fresh();
    store.update_page("a", "[[x]]", None, false).unwrap();
    assert_eq!(store.backlinks("x").len(), 1);

    store.update_page("a", "[[y]]", None, false).unwrap();
    assert_eq!(store.backlinks("x").len(), 0);
    assert_eq!(store.backlinks("y").len(), 1);
}

#[test]
fn summaries() {
    let (mut store, settings) = fresh();
    store
        .update_page("with", "summary: Short and sweet.\n---\n# Long", None, false)
        .unwrap();
    store
        .update_page("without", "# Title\n\nFirst paragraph.", None, false)
        .unwrap();

    let wikifier = Wikifier::new(&store, &settings, &TestImages);
    let page = store.get_by_title("with");
    assert_eq!(wikifier.summary(&page).unwrap(), "Short and sweet.");

    let page = store.get_by_title("without");
    let summary = wikifier.summary(&page).unwrap();
    assert!(!summary.contains("<h1>"), "summary: {summary}");
    assert!(summary.contains("First paragraph."), "summary: {summary}");
}

#[test]
fn rendering_is_deterministic() {
    let (mut store, settings) = fresh();
    store.update_page("foo", "# foo", None, false).unwrap();
    let wikifier = Wikifier::new(&store, &settings, &TestImages);
    let raw = "Some [[foo]] and [[bar]].\n\n[[List:foo]]";
    let first = wikifier.render(raw, Some("page"), None).unwrap();
    let second = wikifier.render(raw, Some("page"), None).unwrap();
    assert_eq!(first, second);
}
