//! Image reference collection and Markdown path rewriting.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::parse::Document;
use crate::preprocess::{LAZY_SRC_ATTRS, absolutize};

/// One unique image of a content subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    /// Absolute URL
    pub src: String,
    pub alt: String,
}

/// `![alt]`, where the alt may hold backslash escapes and balanced brackets.
const ALT_TEXT: &str = r"!\[(?:\[[^\]]*\]|\\.|[^\]\\])*\]";

/// `(url)` or `(url "title")`; the url may hold escapes and balanced parentheses.
const DESTINATION: &str = r#"\((?:\\.|\([^()\s]*\)|[^()\\\s])+(?:\s+"[^"]*")?\)"#;

static MARKDOWN_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("{ALT_TEXT}{DESTINATION}")).expect("markdown image pattern"));

/// Collects unique image references from an HTML fragment in one pass.
///
/// The source is `src`, then `data-src`, then `data-lazy-src`; empty values
/// count as missing. Data URIs are skipped. Sources are resolved against
/// `base_url` when one is known and deduplicated by the resolved URL. A
/// missing or empty `alt` becomes `image-{n}`, where `n` is the position of
/// the `<img>` in the fragment.
///
/// ```rust
/// use ezycopy_core::images::collect_images;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/post/").unwrap();
/// let html = r#"<img src="a.png" alt="A"><img data-src="/a.png"><img src="https://example.com/post/a.png">"#;
/// let images = collect_images(html, Some(&base));
///
/// assert_eq!(images.len(), 2);
/// assert_eq!(images[0].src, "https://example.com/post/a.png");
/// assert_eq!(images[1].alt, "image-1");
/// ```
pub fn collect_images(html: &str, base_url: Option<&Url>) -> Vec<ImageRef> {
    let doc = Document::parse_fragment(html);
    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for (index, img) in doc.select("img").unwrap_or_default().into_iter().enumerate() {
        let Some(src) = std::iter::once("src")
            .chain(LAZY_SRC_ATTRS.iter().copied())
            .filter_map(|attr| img.attr(attr))
            .map(str::trim)
            .find(|value| !value.is_empty())
        else {
            continue;
        };
        if src.starts_with("data:") {
            continue;
        }

        let src = base_url.and_then(|base| absolutize(base, src)).unwrap_or_else(|| src.to_string());
        if !seen.insert(src.clone()) {
            continue;
        }

        let alt = img
            .attr("alt")
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("image-{index}"));

        images.push(ImageRef { src, alt });
    }

    images
}

/// Number of unique non-data-URI images in an HTML fragment.
pub fn count_unique_images(html: &str, base_url: Option<&Url>) -> usize {
    collect_images(html, base_url).len()
}

/// Removes every `![alt](src)` and `![alt](src "title")` reference.
pub fn strip_images(markdown: &str) -> String {
    MARKDOWN_IMAGE.replace_all(markdown, "").into_owned()
}

/// Regex for `url` as it may appear in a rendered destination, where any
/// ASCII punctuation can carry a backslash escape (`\(`, `\)`).
fn destination_pattern(url: &str) -> String {
    let mut pattern = String::with_capacity(url.len() * 2);
    for c in url.chars() {
        if c.is_ascii_punctuation() {
            pattern.push_str(r"\\?");
        }
        pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
    }
    pattern
}

/// Rewrites Markdown image references whose URL is a key of `url_to_path`.
///
/// Keys are raw URLs; destinations the renderer escaped still match. Alt
/// text and an optional title are kept verbatim. URLs that are not in
/// the map are left alone, so a partially failed download batch still
/// yields a usable document.
///
/// ```rust
/// use std::collections::HashMap;
/// use ezycopy_core::images::rewrite_image_paths;
///
/// let map = HashMap::from([("https://a.co/x.png?v=1".to_string(), "images/p/x.png".to_string())]);
/// let md = r#"![X](https://a.co/x.png?v=1 "Cap") and ![Y](https://a.co/y.png)"#;
///
/// assert_eq!(
///     rewrite_image_paths(md, &map),
///     r#"![X](images/p/x.png "Cap") and ![Y](https://a.co/y.png)"#
/// );
/// ```
pub fn rewrite_image_paths(markdown: &str, url_to_path: &HashMap<String, String>) -> String {
    let mut result = markdown.to_string();

    for (url, local_path) in url_to_path {
        let pattern = format!(r#"({ALT_TEXT}\(){}((?:\s+"[^"]*")?\))"#, destination_pattern(url));
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        result = re
            .replace_all(&result, |caps: &Captures| format!("{}{}{}", &caps[1], local_path, &caps[2]))
            .into_owned();
    }

    result
}
