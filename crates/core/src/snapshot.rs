//! Owned, detached copies of a page.

use dom_query::Document;
use url::Url;

use crate::protect::protect_images;
use crate::widgets::strip_widgets;
use crate::{EzyCopyError, Result};

/// An owned copy of a page's DOM taken at extraction time.
///
/// A snapshot never shares nodes with the document it was cloned from, so
/// cleaning it cannot leak back into the page the user is looking at. The
/// only mutations are the crate's own cleaning passes, applied before the
/// snapshot is handed to an extractor.
pub struct Snapshot {
    doc: Document,
    base_url: Option<Url>,
}

impl Snapshot {
    /// Builds a snapshot straight from markup.
    pub fn from_html(html: &str, base_url: Option<Url>) -> Self {
        Self { doc: Document::from(html), base_url }
    }

    /// Serializes `source` and parses the result into a fresh tree.
    pub(crate) fn clone_from(source: &Document, base_url: Option<Url>) -> Result<Self> {
        let html = source.html();
        if html.trim().is_empty() || source.select("body").is_empty() {
            return Err(EzyCopyError::HtmlParseError("document has no body to clone".to_string()));
        }
        Ok(Self::from_html(&html, base_url))
    }

    /// Drops every element carrying `attribute`, descendants included.
    pub(crate) fn remove_marked(&self, attribute: &str) -> usize {
        let marked = self.doc.select(&format!("[{attribute}]"));
        let count = marked.length();
        marked.remove();
        count
    }

    /// Runs the widget stripper and the image protector, in that order.
    ///
    /// Returns `(widgets_removed, images_wrapped)`.
    pub fn clean(&mut self) -> (usize, usize) {
        let widgets = strip_widgets(&self.doc);
        let wrapped = protect_images(&self.doc);
        (widgets, wrapped)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Full serialized markup.
    pub fn html(&self) -> String {
        self.doc.html().to_string()
    }

    /// Markup inside `<body>`.
    pub fn body_html(&self) -> String {
        self.doc.select("body").inner_html().to_string()
    }

    /// Trimmed `<title>` text, empty when the page has none.
    pub fn title(&self) -> String {
        self.doc.select("head title").text().trim().to_string()
    }

    /// Total number of `<img>` elements.
    pub fn image_count(&self) -> usize {
        self.doc.select("img").length()
    }
}
