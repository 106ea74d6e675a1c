//! Read-only HTML parsing for scoring and metadata.
//!
//! This module provides the [`Document`] and [`Element`] types used by the
//! built-in article extractor and the image collector. Mutable work on a
//! page (visibility marking, widget stripping, figure wrapping) happens on a
//! [`Snapshot`](crate::snapshot::Snapshot) instead.
//!
//! # Example
//!
//! ```rust
//! use ezycopy_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <h1>Title</h1>
//!             <p class="content">Paragraph</p>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html);
//! let paragraphs = doc.select("p.content").unwrap();
//! assert_eq!(paragraphs.len(), 1);
//! ```

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::preprocess::{self, PreprocessConfig};
use crate::{EzyCopyError, Result};

/// A parsed, immutable HTML document.
///
/// # Example
///
/// ```rust
/// use ezycopy_core::parse::Document;
///
/// let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
/// let doc = Document::parse(html);
/// assert_eq!(doc.title(), Some("Test".to_string()));
/// ```
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses a full HTML document as-is.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html), base_url: None }
    }

    /// Parses an HTML fragment, such as extracted article content.
    pub fn parse_fragment(html: &str) -> Self {
        Self { html: Html::parse_fragment(html), base_url: None }
    }

    /// Runs the normalizer over `html` before parsing.
    ///
    /// The base URL from `config` is kept on the document so later stages can
    /// resolve image sources against it.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ezycopy_core::parse::Document;
    /// use ezycopy_core::preprocess::PreprocessConfig;
    ///
    /// let html = "<html><body><script>x()</script><article>Content</article></body></html>";
    /// let doc = Document::parse_with_preprocessing(html, &PreprocessConfig::default());
    /// assert!(!doc.as_string().contains("<script"));
    /// ```
    pub fn parse_with_preprocessing(html: &str, config: &PreprocessConfig) -> Self {
        let cleaned = preprocess::preprocess_html(html, config);
        Self { html: Html::parse_document(&cleaned), base_url: config.base_url.clone() }
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Gets the underlying `scraper::Html`.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Serializes the whole document.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`EzyCopyError::HtmlParseError`] if the selector is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ezycopy_core::parse::Document;
    ///
    /// let html = r#"<p class="content">First</p><p class="content">Second</p>"#;
    /// let doc = Document::parse(html);
    /// let elements = doc.select("p.content").unwrap();
    /// assert_eq!(elements.len(), 2);
    /// ```
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(Element::from).collect())
    }

    /// Gets the trimmed content of the `<title>` element, if any.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|title| !title.is_empty())
    }

    /// Gets all text of the document with whitespace runs collapsed.
    pub fn text_content(&self) -> String {
        collapse_whitespace(&self.html.root_element().text().collect::<String>())
    }
}

/// A single element of a [`Document`].
///
/// # Example
///
/// ```rust
/// use ezycopy_core::parse::Document;
///
/// let html = r#"<a href="https://example.com">Link text</a>"#;
/// let doc = Document::parse(html);
/// let link = &doc.select("a").unwrap()[0];
///
/// assert_eq!(link.text(), "Link text");
/// assert_eq!(link.attr("href"), Some("https://example.com"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> From<ElementRef<'a>> for Element<'a> {
    fn from(element: ElementRef<'a>) -> Self {
        Self { element }
    }
}

impl<'a> Element<'a> {
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Concatenated text of every descendant text node.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Parent element, skipping the document node.
    pub fn parent(&self) -> Option<Element<'a>> {
        self.element.parent().and_then(ElementRef::wrap).map(Element::from)
    }

    /// Direct element children in document order.
    pub fn children(&self) -> Vec<Element<'a>> {
        self.element.children().filter_map(ElementRef::wrap).map(Element::from).collect()
    }

    /// True when some ancestor has the given tag.
    pub fn has_ancestor(&self, tag: &str) -> bool {
        self.element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| ancestor.value().name().eq_ignore_ascii_case(tag))
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`EzyCopyError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = parse_selector(selector)?;
        Ok(self.element.select(&sel).map(Element::from).collect())
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| EzyCopyError::HtmlParseError(format!("Invalid selector: {}", e)))
}

/// Lowercase-free whitespace collapse used for text comparisons and word counts.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
