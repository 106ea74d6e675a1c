use crate::Result;

/// Tags the renderer drops together with their content.
pub const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "form", "button", "input", "select", "textarea"];

/// Configuration for HTML to Markdown rendering
#[derive(Debug, Clone)]
pub struct MarkdownConfig {
    /// Tags dropped with their content
    pub skip_tags: Vec<&'static str>,
    /// Use `-` rather than `*` for bullet lists
    pub dash_bullets: bool,
    /// Fence code blocks rather than indenting them
    pub fenced_code: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self { skip_tags: SKIPPED_TAGS.to_vec(), dash_bullets: true, fenced_code: true }
    }
}

/// Renders a content subtree as Markdown.
///
/// Headings are ATX (`#`), tables come out as GFM pipe tables, forms and
/// interactive controls are dropped.
///
/// ```rust
/// use ezycopy_core::formatters::{MarkdownConfig, MarkdownRenderer};
///
/// let renderer = MarkdownRenderer::new(MarkdownConfig::default());
/// let md = renderer.render("<h2>Intro</h2><ul><li>one</li></ul>").unwrap();
/// assert!(md.contains("## Intro"));
/// assert!(md.contains("- one"));
/// ```
pub struct MarkdownRenderer {
    #[cfg(feature = "markdown")]
    converter: htmd::HtmlToMarkdown,
}

impl MarkdownRenderer {
    #[cfg(feature = "markdown")]
    pub fn new(config: MarkdownConfig) -> Self {
        use htmd::options::{BulletListMarker, CodeBlockStyle, HeadingStyle, Options};

        let options = Options {
            heading_style: HeadingStyle::Atx,
            code_block_style: if config.fenced_code { CodeBlockStyle::Fenced } else { CodeBlockStyle::Indented },
            bullet_list_marker: if config.dash_bullets { BulletListMarker::Dash } else { BulletListMarker::Asterisk },
            ..Default::default()
        };
        let converter = htmd::HtmlToMarkdown::builder().skip_tags(config.skip_tags).options(options).build();
        Self { converter }
    }

    #[cfg(not(feature = "markdown"))]
    pub fn new(_config: MarkdownConfig) -> Self {
        Self {}
    }

    /// Converts `html` to Markdown.
    ///
    /// # Errors
    ///
    /// Returns [`EzyCopyError::HtmlParseError`](crate::EzyCopyError::HtmlParseError)
    /// if the converter fails.
    #[cfg(feature = "markdown")]
    pub fn render(&self, html: &str) -> Result<String> {
        self.converter.convert(html).map_err(|e| crate::EzyCopyError::HtmlParseError(e.to_string()))
    }

    /// Fallback HTML to text conversion when the markdown feature is disabled
    #[cfg(not(feature = "markdown"))]
    pub fn render(&self, html: &str) -> Result<String> {
        Ok(crate::parse::Document::parse_fragment(html).text_content())
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(MarkdownConfig::default())
    }
}

/// Renders `html` with the default configuration.
pub fn convert_to_markdown(html: &str) -> Result<String> {
    MarkdownRenderer::default().render(html)
}

#[cfg(all(test, feature = "markdown"))]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_markdown_basic() {
        let markdown = convert_to_markdown(r#"<h1>Title</h1><p>This is a paragraph.</p>"#).unwrap();
        assert!(markdown.contains("# Title"));
        assert!(markdown.contains("This is a paragraph."));
    }

    #[test]
    fn test_html_to_markdown_with_links() {
        let markdown = convert_to_markdown(r#"<p>Check out <a href="https://example.com">this link</a>.</p>"#).unwrap();
        assert!(markdown.contains("[this link](https://example.com)"));
    }

    #[test]
    fn test_html_to_markdown_with_images() {
        let markdown = convert_to_markdown(r#"<p>An image: <img src="https://a.co/photo.jpg" alt="A photo"></p>"#).unwrap();
        assert!(markdown.contains("![A photo](https://a.co/photo.jpg)"));
    }

    #[test]
    fn test_html_to_markdown_with_tables() {
        let html = r#"
            <table>
                <thead><tr><th>Column 1</th><th>Column 2</th></tr></thead>
                <tbody><tr><td>Data 1</td><td>Data 2</td></tr></tbody>
            </table>
        "#;
        let markdown = convert_to_markdown(html).unwrap();
        assert!(markdown.contains("|"));
        assert!(markdown.contains("Column 1"));
        assert!(markdown.contains("Data 1"));
    }

    #[test]
    fn test_html_to_markdown_with_code_blocks() {
        let markdown = convert_to_markdown(r#"<pre><code>fn main() { println!("Hello"); }</code></pre>"#).unwrap();
        assert!(markdown.contains("```"));
    }

    #[test]
    fn test_forms_are_dropped() {
        let html = r#"<p>Keep</p><form><label>Email</label><input name="e"><button>Subscribe</button></form>"#;
        let markdown = convert_to_markdown(html).unwrap();
        assert!(markdown.contains("Keep"));
        assert!(!markdown.contains("Subscribe"));
        assert!(!markdown.contains("Email"));
    }

    #[test]
    fn test_bullet_and_heading_style() {
        let markdown = convert_to_markdown("<h3>Steps</h3><ul><li>First</li><li>Second</li></ul>").unwrap();
        assert!(markdown.contains("### Steps"));
        assert!(markdown.contains("- First"));

        let renderer = MarkdownRenderer::new(MarkdownConfig { dash_bullets: false, ..Default::default() });
        assert!(renderer.render("<ul><li>First</li></ul>").unwrap().contains("* First"));
    }
}
