//! The page model: raw stored text plus fields derived from it.

use log::{debug, warn};
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use time::format_description::FormatItem;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::links::extract_links;
use crate::meta::{PageProps, PropValue, decode_metadata, encode_metadata};
use crate::store::PageStore;

/// Marker label for pages carrying a geo point.
pub const GEO_LABEL: &str = "gaewiki:geopt";

/// Prefix of the implicit label naming a page's parent path.
pub const PARENT_LABEL_PREFIX: &str = "gaewiki:parent:";

/// Format of the `date` header property.
static DATE_FORMAT: Lazy<Vec<FormatItem<'static>>> = Lazy::new(|| {
    time::format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]")
        .unwrap_or_default()
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// A wiki page.
///
/// The derived fields (`redirect`, `pread`, `labels`, `links`, `geopt`) are a
/// pure function of the raw body at the moment of the last save; they are
/// rebuilt by [`Page::rederive`] and never mutated independently. Header
/// properties are parsed lazily on first access and cached for the lifetime
/// of this instance.
#[derive(Debug, Clone)]
pub struct Page {
    pub title: String,
    pub body: Option<String>,
    pub author: Option<String>,
    pub created: OffsetDateTime,
    pub updated: OffsetDateTime,
    /// Whether the page is publicly readable (`public: yes` without
    /// `private: yes`).
    pub pread: bool,
    /// Title of the page this one redirects to, if any.
    pub redirect: Option<String>,
    pub labels: Vec<String>,
    /// Normalized titles this page links to.
    pub links: Vec<String>,
    pub geopt: Option<GeoPoint>,
    pub(crate) saved: bool,
    props: OnceCell<PageProps>,
}

/// An immutable snapshot of a page revision, archived before every overwrite
/// or delete.
#[derive(Debug, Clone)]
pub struct Revision {
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub created: OffsetDateTime,
}

impl Page {
    /// A fresh, unsaved placeholder.
    pub fn new(title: &str) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            title: title.to_string(),
            body: None,
            author: None,
            created: now,
            updated: now,
            pread: false,
            redirect: None,
            labels: Vec::new(),
            links: Vec::new(),
            geopt: None,
            saved: false,
            props: OnceCell::new(),
        }
    }

    /// True once the page has been stored; placeholders created on first
    /// reference are unsaved.
    pub fn is_saved(&self) -> bool {
        self.saved
    }

    fn props(&self) -> &PageProps {
        self.props
            .get_or_init(|| decode_metadata(self.body.as_deref().unwrap_or("")))
    }

    pub fn get_property(&self, key: &str) -> Option<&PropValue> {
        self.props().get(key)
    }

    pub fn prop_scalar(&self, key: &str) -> Option<&str> {
        self.props().scalar(key)
    }

    pub fn prop_list(&self, key: &str) -> Option<&[String]> {
        self.props().list(key)
    }

    /// Changes one header property and re-serialises the header back into the
    /// raw body in the same step. `None` removes the property.
    pub fn set_property(&mut self, key: &str, value: Option<PropValue>) {
        let mut props = self.props().clone();
        match value {
            Some(value) => props.set(key, value),
            None => {
                props.remove(key);
            }
        }
        self.body = Some(encode_metadata(&props));
        debug!("changed property {key} of page \"{}\"", self.title);
        self.props = OnceCell::with_value(props);
    }

    /// The raw body with the `date` and `name` properties refreshed from the
    /// page's current state, for editing forms.
    pub fn actual_body(&self) -> String {
        let mut props = self.props().clone();
        let date = PrimitiveDateTime::new(self.created.date(), self.created.time())
            .format(&*DATE_FORMAT)
            .unwrap_or_default();
        props.set("date", PropValue::Scalar(date));
        props.set("name", PropValue::Scalar(self.title.clone()));
        encode_metadata(&props)
    }

    pub fn display_title(&self) -> &str {
        self.prop_scalar("display_title").unwrap_or(&self.title)
    }

    /// The `file` property, used by the audio player token.
    pub fn file(&self) -> Option<&str> {
        self.prop_scalar("file")
    }

    /// MIME type of the attached file, sniffed from the URL when the header
    /// does not state one.
    pub fn file_type(&self) -> String {
        if let Some(explicit) = self.prop_scalar("file_type") {
            return explicit.to_string();
        }
        let url = self.file().unwrap_or("");
        if url.ends_with(".mp3") {
            "audio/mpeg".to_string()
        } else if url.ends_with(".ogg") {
            "audio/vorbis".to_string()
        } else {
            "application/octet-stream".to_string()
        }
    }

    pub fn comments_enabled(&self) -> bool {
        self.prop_list("comments") == Some(&["yes".to_string()][..])
    }

    pub fn is_locked(&self) -> bool {
        self.prop_scalar("locked") == Some("yes")
    }

    /// Follows this page's redirect property one hop: returns the target page
    /// when it exists and is saved, this page otherwise. Never recursive.
    pub fn redirected(&self, store: &dyn PageStore) -> Page {
        if let Some(target) = &self.redirect {
            if let Some(page) = store.get_page(target) {
                return page;
            }
        }
        self.clone()
    }

    /// Rebuilds every derived field from the raw body. Called by the store on
    /// save; renames (the `name` property) are handled there because they
    /// need a conflict check.
    pub(crate) fn rederive(&mut self) {
        if let Some(body) = self.body.clone() {
            let props = decode_metadata(&body);
            self.redirect = props.scalar("redirect").map(str::to_string);
            self.pread =
                props.scalar("public") == Some("yes") && props.scalar("private") != Some("yes");
            self.labels = props.list("labels").map(<[String]>::to_vec).unwrap_or_default();
            if let Some(date) = props.scalar("date") {
                if let Ok(parsed) = PrimitiveDateTime::parse(date, &*DATE_FORMAT) {
                    self.created = parsed.assume_utc();
                }
            }
            self.update_geopt(&props);
            self.props = OnceCell::with_value(props);
        } else {
            self.props = OnceCell::new();
        }
        self.links = extract_links(self.body.as_deref());
        self.add_implicit_labels();
    }

    /// Maintains the geo point and its marker label from the `geo` property.
    fn update_geopt(&mut self, props: &PageProps) {
        self.labels.retain(|label| label != GEO_LABEL);
        self.geopt = None;
        let Some(geo) = props.scalar("geo") else {
            return;
        };
        let point = geo.split_once(',').and_then(|(lat, lon)| {
            Some(GeoPoint {
                lat: lat.trim().parse().ok()?,
                lon: lon.trim().parse().ok()?,
            })
        });
        match point {
            Some(point) => {
                self.geopt = Some(point);
                self.labels.push(GEO_LABEL.to_string());
                debug!("put {} on the map: {point:?}", self.title);
            }
            None => warn!(
                "ignoring malformed geo property on \"{}\": {geo}",
                self.title
            ),
        }
    }

    /// Adds the implicit parent label for slash-delimited titles. Only the
    /// immediate parent path is labelled.
    fn add_implicit_labels(&mut self) {
        self.labels
            .retain(|label| !label.starts_with(PARENT_LABEL_PREFIX));
        if let Some((parents, _leaf)) = self.title.rsplit_once('/') {
            self.labels.push(format!("{PARENT_LABEL_PREFIX}{parents}"));
        }
    }
}
