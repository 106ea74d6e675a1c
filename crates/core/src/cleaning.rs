//! Cleanup of the extracted article fragment.
//!
//! Runs after the top candidate and its siblings have been joined. The
//! conditional step is the aggressive one and is skipped in relaxed mode;
//! the rest only tidies markup.

use std::sync::LazyLock;

use dom_query::{Document, NodeRef, Selection};
use regex::Regex;
use url::Url;

use crate::preprocess::convert_relative_urls;
use crate::protect::inside_figure;

/// Configuration for post-extraction cleanup
#[derive(Debug, Clone)]
pub struct CleaningConfig {
    /// Run conditional cleaning (chrome, link-dense and image-dominated blocks)
    pub conditional: bool,
    /// Maximum link density threshold (0.0 to 1.0)
    pub max_link_density: f64,
    /// Whether to remove conditional comments
    pub remove_conditional_comments: bool,
    /// Whether to keep class attributes (default: false)
    pub keep_classes: bool,
    /// Whether to remove empty nodes
    pub remove_empty_nodes: bool,
    /// Maximum passes for removing empty nodes
    pub max_empty_node_passes: usize,
    /// Base URL for converting relative URLs
    pub base_url: Option<Url>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            conditional: true,
            max_link_density: 0.5,
            remove_conditional_comments: true,
            keep_classes: false,
            remove_empty_nodes: true,
            max_empty_node_passes: 10,
            base_url: None,
        }
    }
}

/// Containers conditional cleaning may drop.
const CONDITIONAL_TAGS: &str = "div, section, ul, ol, form, fieldset, aside, table, nav";

const EMPTY_TAGS: &[&str] = &["div", "p", "span", "section", "article", "aside", "nav", "header", "footer"];

static CONDITIONAL_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--\[if[^\]]*\]>.*?<!\[endif\]-->|<!--<!\[if[^\]]*\]>.*?<!\[endif\]-->")
        .expect("conditional comment pattern")
});

static CLASS_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s+class=["'][^"']*["']"#).expect("class attribute pattern"));

static DOC_CHROME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(toc|table[-_ ]of[-_ ]contents|on[-_ ]this[-_ ]page|breadcrumbs?|sidebar|sidenav|navigation|page[-_ ]nav|pagination|pager|edit[-_ ]on[-_ ]github|edit[-_ ]this[-_ ]page|related[-_ ]posts|read[-_ ]next)",
    )
    .expect("chrome pattern")
});

static CHROME_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(edit on github|edit this page|ask about this page|copy for llm|share this( article| post)?)$")
        .expect("chrome text pattern")
});

static EMPTY_NODES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    EMPTY_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"<{tag}(?:\s[^>]*)?>\s*(?:<br\s*/?>\s*)*</{tag}>")).expect("empty node pattern")
        })
        .collect()
});

/// Cleans an extracted fragment according to `config`.
pub fn clean_html(html: &str, config: &CleaningConfig) -> String {
    let mut processed = html.to_string();

    if config.remove_conditional_comments {
        processed = remove_conditional_comments(&processed);
    }

    if config.conditional {
        processed = clean_conditionally(&processed, config.max_link_density);
    }

    if !config.keep_classes {
        processed = strip_classes(&processed);
    }

    if config.remove_empty_nodes {
        processed = remove_empty_nodes(&processed, config.max_empty_node_passes);
    }

    if let Some(base_url) = &config.base_url {
        processed = convert_relative_urls(&processed, base_url);
    }

    processed
}

fn remove_conditional_comments(html: &str) -> String {
    CONDITIONAL_COMMENT.replace_all(html, "").into_owned()
}

fn strip_classes(html: &str) -> String {
    CLASS_ATTR.replace_all(html, "").into_owned()
}

/// Iteratively drops whitespace-only nodes until a pass changes nothing.
fn remove_empty_nodes(html: &str, max_passes: usize) -> String {
    let mut result = html.to_string();

    for _ in 0..max_passes {
        let before = result.len();
        for re in EMPTY_NODES.iter() {
            result = re.replace_all(&result, "").into_owned();
        }
        if result.len() == before {
            break;
        }
    }

    result
}

fn is_figure(node: &NodeRef<'_>) -> bool {
    node.node_name().is_some_and(|name| name.eq_ignore_ascii_case("figure"))
}

/// Ratio of link text characters to all text characters.
fn link_density(sel: &Selection<'_>) -> f64 {
    let text_length = sel.text().trim().chars().count();
    if text_length == 0 {
        return 0.0;
    }
    let link_length: usize = sel.select("a").iter().map(|link| link.text().trim().chars().count()).sum();
    link_length as f64 / text_length as f64
}

fn looks_like_chrome(sel: &Selection<'_>) -> bool {
    if let Some(class) = sel.attr("class")
        && class.split_whitespace().any(|c| DOC_CHROME.is_match(c))
    {
        return true;
    }
    sel.attr("id").is_some_and(|id| DOC_CHROME.is_match(&id))
}

/// Images not already protected by a figure.
fn bare_image_count(sel: &Selection<'_>) -> usize {
    sel.select("img").nodes().iter().filter(|img| !inside_figure(img)).count()
}

fn should_remove(sel: &Selection<'_>, max_link_density: f64) -> bool {
    if looks_like_chrome(sel) {
        return true;
    }
    if link_density(sel) > max_link_density {
        return true;
    }

    let images = bare_image_count(sel);
    let paragraphs = sel.select("p").length();
    images > 1 && paragraphs * 2 < images
}

/// Conditional cleaning.
///
/// Containers are visited innermost first. A figure, or anything inside one,
/// is never a removal target; when a removed container holds figures, the
/// figures are kept in its place.
fn clean_conditionally(html: &str, max_link_density: f64) -> String {
    let doc = Document::from(html);

    let containers = doc.select(CONDITIONAL_TAGS);
    for node in containers.nodes().iter().rev() {
        if is_figure(node) || inside_figure(node) {
            continue;
        }

        let sel = Selection::from(*node);
        if !should_remove(&sel, max_link_density) {
            continue;
        }

        let figures: String = sel
            .select("figure")
            .nodes()
            .iter()
            .filter(|figure| !inside_figure(figure))
            .map(|figure| Selection::from(*figure).html().to_string())
            .collect();

        if figures.is_empty() {
            node.remove_from_parent();
        } else {
            sel.replace_with_html(figures);
        }
    }

    let blocks = doc.select("p, span, li, div, a");
    for node in blocks.nodes() {
        let sel = Selection::from(*node);
        if CHROME_TEXT.is_match(sel.text().trim()) && sel.select("img").is_empty() {
            node.remove_from_parent();
        }
    }

    doc.select("body").inner_html().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditional(html: &str) -> String {
        clean_conditionally(html, 0.5)
    }

    #[test]
    fn test_remove_conditional_comments() {
        let html = r#"
            <!--[if IE]>
            <div>IE specific content</div>
            <![endif]-->
            <div>Normal content</div>
        "#;
        let result = remove_conditional_comments(html);
        assert!(!result.contains("[if IE]"));
        assert!(result.contains("Normal content"));
    }

    #[test]
    fn test_removes_link_dense_block() {
        let html = r##"
            <div class="links"><a href="#">Link 1</a> <a href="#">Link 2</a> <a href="#">Link 3</a></div>
            <div><p>This is substantial text content with a <a href="#">small link</a> inside it.</p></div>
        "##;
        let result = conditional(html);
        assert!(!result.contains("Link 1"));
        assert!(result.contains("substantial text content"));
    }

    #[test]
    fn test_removes_chrome_by_class_and_id() {
        let html = r#"
            <nav class="breadcrumbs">Home / Blog</nav>
            <div id="table-of-contents">Contents</div>
            <div><p>Body paragraph.</p></div>
        "#;
        let result = conditional(html);
        assert!(!result.contains("Home / Blog"));
        assert!(!result.contains("Contents"));
        assert!(result.contains("Body paragraph."));
    }

    #[test]
    fn test_removes_image_dominated_block_of_bare_images() {
        let html = r#"
            <div><img src="a.jpg"><img src="b.jpg"><img src="c.jpg"></div>
            <div><p>Keep me.</p></div>
        "#;
        let result = conditional(html);
        assert!(!result.contains("a.jpg"));
        assert!(result.contains("Keep me."));
    }

    #[test]
    fn test_figures_survive_conditional_cleaning() {
        let html = r##"
            <div>
                <a href="#">Gallery link one</a>
                <figure><img src="a.jpg"></figure>
                <figure><img src="b.jpg"></figure>
                <figure><img src="c.jpg"></figure>
            </div>
        "##;
        let result = conditional(html);
        assert!(!result.contains("Gallery link one"));
        assert!(result.contains("a.jpg"));
        assert!(result.contains("b.jpg"));
        assert!(result.contains("c.jpg"));
    }

    #[test]
    fn test_content_inside_figure_is_untouched() {
        let html = r##"<figure><div class="sidebar"><img src="a.jpg"></div><figcaption><a href="#">Credit</a></figcaption></figure>"##;
        let result = conditional(html);
        assert!(result.contains("a.jpg"));
        assert!(result.contains("Credit"));
    }

    #[test]
    fn test_removes_chrome_text_blocks() {
        let html = r#"<p>Real paragraph.</p><p>Edit on GitHub</p>"#;
        let result = conditional(html);
        assert!(result.contains("Real paragraph."));
        assert!(!result.contains("Edit on GitHub"));
    }

    #[test]
    fn test_relaxed_mode_keeps_link_dense_blocks() {
        let html = r##"<div><a href="#">Link 1</a> <a href="#">Link 2</a></div>"##;
        let config = CleaningConfig { conditional: false, ..Default::default() };
        let result = clean_html(html, &config);
        assert!(result.contains("Link 1"));
    }

    #[test]
    fn test_remove_empty_nodes_nested() {
        let html = r#"<div><p></p><span> </span></div><p>Content</p>"#;
        let result = remove_empty_nodes(html, 10);
        assert_eq!(result, "<p>Content</p>");
    }

    #[test]
    fn test_strip_classes_unless_kept() {
        let html = r#"<div class="container">Content</div>"#;

        let result = clean_html(html, &CleaningConfig::default());
        assert!(!result.contains("class="));

        let config = CleaningConfig { keep_classes: true, ..Default::default() };
        assert!(clean_html(html, &config).contains("class="));
    }

    #[test]
    fn test_clean_html_absolutizes_urls() {
        let base = Url::parse("https://example.com/blog/").unwrap();
        let config = CleaningConfig { base_url: Some(base), ..Default::default() };
        let result = clean_html(r#"<p>See <a href="/about">about</a> for the full story.</p><p><img src="pic.jpg"></p>"#, &config);

        assert!(result.contains(r#"href="https://example.com/about""#));
        assert!(result.contains(r#"src="https://example.com/blog/pic.jpg""#));
    }
}
