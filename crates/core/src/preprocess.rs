//! Text/DOM normalizer.
//!
//! String-level passes over HTML, built on `lol_html` streaming rewrites:
//! non-content tags go, comments go, unlikely containers are unwrapped,
//! relative URLs become absolute and whitespace runs are collapsed outside
//! `<pre>` blocks.

use std::sync::LazyLock;

use lol_html::{RewriteStrSettings, element, rewrite_str};
use regex::Regex;
use url::Url;

/// Tags that never carry article content.
pub const NON_CONTENT_TAGS: &[&str] =
    &["script", "style", "noscript", "iframe", "svg", "canvas", "template", "object", "embed"];

/// Elements that render as Markdown images.
pub const IMAGE_TAGS: &[&str] = &["img", "picture"];

/// Attributes consulted, in order, when an image has no usable `src`.
pub const LAZY_SRC_ATTRS: &[&str] = &["data-src", "data-lazy-src"];

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern"));

static UNLIKELY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|cookie|consent)",
    )
    .expect("unlikely pattern")
});

static MAYBE_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story|tweet)")
        .expect("candidate pattern")
});

static PRE_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<pre\b.*?</pre\s*>").expect("pre pattern"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Configuration for the normalizer.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Tags removed together with their content
    pub strip_tags: &'static [&'static str],
    /// Unwrap containers whose class/id looks like page chrome
    pub remove_unlikely: bool,
    /// Spare unlikely matches that also look like content
    pub keep_positive: bool,
    /// Rewrite relative `href`/`src` to absolute
    pub convert_urls: bool,
    /// Copy `data-src`/`data-lazy-src` into an empty or placeholder `src`
    pub promote_lazy_images: bool,
    /// Collapse whitespace runs outside `<pre>`
    pub collapse_whitespace: bool,
    /// Base URL for converting relative URLs
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            strip_tags: NON_CONTENT_TAGS,
            remove_unlikely: true,
            keep_positive: true,
            convert_urls: true,
            promote_lazy_images: true,
            collapse_whitespace: true,
            base_url: None,
        }
    }
}

impl PreprocessConfig {
    /// Settings for a content subtree that is about to be rendered.
    ///
    /// Nothing structural is removed; only URLs, lazy images and junk tags
    /// are touched.
    pub fn for_content(base_url: Option<Url>) -> Self {
        Self { remove_unlikely: false, base_url, ..Default::default() }
    }
}

/// Runs every enabled normalizer pass over `html`.
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut processed = remove_unwanted_tags(html, config.strip_tags);
    processed = remove_comments(&processed);

    if config.remove_unlikely {
        processed = remove_unlikely_candidates(&processed, config.keep_positive);
    }

    if config.promote_lazy_images {
        processed = promote_lazy_images(&processed);
    }

    if config.convert_urls
        && let Some(base_url) = &config.base_url
    {
        processed = convert_relative_urls(&processed, base_url);
    }

    if config.collapse_whitespace { normalize_whitespace(&processed) } else { processed }
}

/// Normalizes a rendered-content fragment against `base_url`.
pub fn normalize_content(html: &str, base_url: Option<&Url>) -> String {
    preprocess_html(html, &PreprocessConfig::for_content(base_url.cloned()))
}

/// Drops every image element from `html`.
pub fn remove_images(html: &str) -> String {
    remove_unwanted_tags(html, IMAGE_TAGS)
}

fn remove_unwanted_tags(html: &str, tags: &[&str]) -> String {
    if tags.is_empty() {
        return html.to_string();
    }

    let handlers = tags
        .iter()
        .map(|tag| {
            element!(tag, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();

    rewrite_str(html, RewriteStrSettings { element_content_handlers: handlers, ..RewriteStrSettings::new() })
        .unwrap_or_else(|_| html.to_string())
}

fn remove_comments(html: &str) -> String {
    COMMENT.replace_all(html, "").into_owned()
}

fn looks_unlikely(value: &str, keep_positive: bool) -> bool {
    UNLIKELY.is_match(value) && (!keep_positive || !MAYBE_CANDIDATE.is_match(value))
}

/// Unwraps (keeps the children of) elements whose id/class looks like chrome.
fn remove_unlikely_candidates(html: &str, keep_positive: bool) -> String {
    let handlers = vec![element!("*", |el| {
        if matches!(el.tag_name().as_str(), "body" | "html" | "article" | "main" | "a") {
            return Ok(());
        }

        let by_id = el.get_attribute("id").is_some_and(|id| looks_unlikely(&id, keep_positive));
        let by_class = el
            .get_attribute("class")
            .is_some_and(|class| class.split_whitespace().any(|name| looks_unlikely(name, keep_positive)));

        if by_id || by_class {
            el.remove_and_keep_content();
        }
        Ok(())
    })];

    rewrite_str(html, RewriteStrSettings { element_content_handlers: handlers, ..RewriteStrSettings::new() })
        .unwrap_or_else(|_| html.to_string())
}

fn is_placeholder_src(src: &str) -> bool {
    let src = src.trim();
    src.is_empty() || src.starts_with("data:")
}

/// Fills an empty or data-URI `src` from the first lazy-load attribute.
pub fn promote_lazy_images(html: &str) -> String {
    let handlers = vec![element!("img", |el| {
        if !el.get_attribute("src").is_none_or(|src| is_placeholder_src(&src)) {
            return Ok(());
        }

        let lazy = LAZY_SRC_ATTRS
            .iter()
            .filter_map(|attr| el.get_attribute(attr))
            .find(|value| !is_placeholder_src(value));

        if let Some(lazy) = lazy {
            el.set_attribute("src", lazy.trim()).ok();
        }
        Ok(())
    })];

    rewrite_str(html, RewriteStrSettings { element_content_handlers: handlers, ..RewriteStrSettings::new() })
        .unwrap_or_else(|_| html.to_string())
}

/// Joins `value` onto `base_url` unless it is a fragment, a data URI or a
/// non-navigational scheme.
pub fn absolutize(base_url: &Url, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.starts_with('#') {
        return None;
    }
    let lower = value.to_ascii_lowercase();
    if ["data:", "javascript:", "mailto:", "tel:"].iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }
    base_url.join(value).ok().map(String::from)
}

fn absolutize_attrs(
    el: &mut lol_html::html_content::Element<'_, '_>, base_url: &Url, attrs: &[&str],
) -> lol_html::HandlerResult {
    for attr in attrs {
        if let Some(value) = el.get_attribute(attr)
            && let Some(absolute) = absolutize(base_url, &value)
        {
            el.set_attribute(attr, &absolute)?;
        }
    }
    Ok(())
}

/// Converts relative `href`/`src` (and lazy-load sources) to absolute URLs.
pub fn convert_relative_urls(html: &str, base_url: &Url) -> String {
    let handlers = vec![
        element!("a[href]", |el| absolutize_attrs(el, base_url, &["href"])),
        element!("link[href]", |el| absolutize_attrs(el, base_url, &["href"])),
        element!("img", |el| absolutize_attrs(el, base_url, &["src", "data-src", "data-lazy-src"])),
        element!("source[src]", |el| absolutize_attrs(el, base_url, &["src"])),
    ];

    rewrite_str(html, RewriteStrSettings { element_content_handlers: handlers, ..RewriteStrSettings::new() })
        .unwrap_or_else(|_| html.to_string())
}

/// Collapses whitespace runs to one space, leaving `<pre>` blocks intact.
fn normalize_whitespace(html: &str) -> String {
    let mut output = String::with_capacity(html.len());
    let mut last = 0;

    for block in PRE_BLOCK.find_iter(html) {
        output.push_str(&WHITESPACE.replace_all(&html[last..block.start()], " "));
        output.push_str(block.as_str());
        last = block.end();
    }
    output.push_str(&WHITESPACE.replace_all(&html[last..], " "));
    output
}
