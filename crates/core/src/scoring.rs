//! Candidate scoring for the built-in extractor.
//!
//! A candidate's score combines its tag, its class/id vocabulary, how much
//! prose it holds and how many protected figures it carries, discounted by
//! the share of its text that sits inside links.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Element;

/// Configuration for content scoring
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Weight for positive class/ID patterns
    pub positive_weight: f64,
    /// Weight for negative class/ID patterns
    pub negative_weight: f64,
    /// Maximum content density score from character count
    pub max_char_density_score: f64,
    /// Maximum content density score from comma count
    pub max_comma_density_score: f64,
    /// Characters per point for content density scoring
    pub chars_per_point: usize,
    /// Points per figure-wrapped image
    pub figure_weight: f64,
    /// Cap on the figure bonus
    pub max_figure_score: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_char_density_score: 3.0,
            max_comma_density_score: 3.0,
            chars_per_point: 100,
            figure_weight: 1.0,
            max_figure_score: 3.0,
        }
    }
}

/// Breakdown of an element's score.
#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub tag_name: String,
    pub base_score: f64,
    pub class_weight: f64,
    pub content_density: f64,
    pub figure_bonus: f64,
    /// 0.0 (no links) to 1.0 (all text is link text)
    pub link_density: f64,
    pub final_score: f64,
}

static POSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story|tweet|recipe|gallery)")
        .expect("positive pattern")
});

static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|promo|newsletter|subscribe|share|social)",
    )
    .expect("negative pattern")
});

/// Base score by tag:
/// - ARTICLE: +10, SECTION: +8, DIV: +5
/// - TD, BLOCKQUOTE, FIGURE: +3
/// - FORM and list/metadata tags: -3
/// - headings, TH, HEADER, FOOTER, NAV: -5
pub fn base_tag_score(element: &Element<'_>) -> f64 {
    match element.tag_name().as_str() {
        "article" => 10.0,
        "section" => 8.0,
        "div" => 5.0,
        "td" | "blockquote" | "figure" => 3.0,
        "form" => -3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" => -5.0,
        _ => 0.0,
    }
}

/// Positive weight wins over negative; the id is consulted before classes.
pub fn class_id_weight(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let weigh = |value: &str| {
        if POSITIVE.is_match(value) {
            Some(config.positive_weight)
        } else if NEGATIVE.is_match(value) {
            Some(config.negative_weight)
        } else {
            None
        }
    };

    if let Some(weight) = element.attr("id").and_then(weigh) {
        return weight;
    }

    element
        .attr("class")
        .and_then(|class| class.split_whitespace().find_map(weigh))
        .unwrap_or(0.0)
}

/// One point per `chars_per_point` characters plus one per comma, each capped.
pub fn content_density_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let text = element.text();
    let char_score = ((text.chars().count() / config.chars_per_point) as f64).min(config.max_char_density_score);
    let comma_score = (text.matches(',').count() as f64).min(config.max_comma_density_score);

    char_score + comma_score
}

/// Bonus for images the image protector wrapped in `<figure>`.
pub fn figure_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let figures = element.select("figure img").map(|imgs| imgs.len()).unwrap_or(0);
    (figures as f64 * config.figure_weight).min(config.max_figure_score)
}

/// Ratio of link text characters to all text characters.
pub fn link_density(element: &Element<'_>) -> f64 {
    let text_length = element.text().chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let link_text_length = element
        .select("a")
        .unwrap_or_default()
        .iter()
        .map(|link| link.text().chars().count())
        .sum::<usize>();

    link_text_length as f64 / text_length as f64
}

fn looks_like_code(tag_name: &str, text: &str) -> bool {
    if tag_name != "pre" || text.len() <= 50 {
        return false;
    }
    let len = text.len() as f64;
    let comma_ratio = text.matches(',').count() as f64 / len;
    let space_ratio = text.matches(' ').count() as f64 / len;
    let special_ratio = text.chars().filter(|c| !c.is_alphanumeric() && !c.is_whitespace()).count() as f64 / len;

    special_ratio > 0.15 && comma_ratio < 0.01 && space_ratio < 0.15
}

/// Scores `element`.
///
/// The link penalty multiplies by `1 - link_density`, halved for elements
/// with a positive class/id or more than 500 characters of text.
pub fn calculate_score(element: &Element<'_>, config: &ScoreConfig) -> ScoreResult {
    let tag_name = element.tag_name();
    let text = element.text();

    let base_score = base_tag_score(element);
    let class_weight = class_id_weight(element, config);
    let content_density = content_density_score(element, config);
    let figure_bonus = figure_score(element, config);
    let ld = link_density(element);

    let code_penalty = if looks_like_code(&tag_name, &text) { -10.0 } else { 0.0 };
    let lenient = class_weight > 0.0 || text.chars().count() > 500;
    let link_penalty = if lenient { 1.0 - (ld * 0.5) } else { 1.0 - ld };

    let final_score = (base_score + class_weight + content_density + figure_bonus + code_penalty) * link_penalty;

    ScoreResult { tag_name, base_score, class_weight, content_density, figure_bonus, link_density: ld, final_score }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Document;
    use rstest::rstest;

    fn first<'a>(doc: &'a Document, selector: &str) -> Element<'a> {
        doc.select(selector).unwrap().into_iter().next().unwrap()
    }

    #[rstest]
    #[case("<article>x</article>", "article", 10.0)]
    #[case("<section>x</section>", "section", 8.0)]
    #[case("<div>x</div>", "div", 5.0)]
    #[case("<figure>x</figure>", "figure", 3.0)]
    #[case("<table><tr><td>x</td></tr></table>", "td", 3.0)]
    #[case("<pre>x</pre>", "pre", 0.0)]
    #[case("<form>x</form>", "form", -3.0)]
    #[case("<nav>x</nav>", "nav", -5.0)]
    fn test_base_tag_score(#[case] html: &str, #[case] selector: &str, #[case] expected: f64) {
        let doc = Document::parse(html);
        assert_eq!(base_tag_score(&first(&doc, selector)), expected);
    }

    #[rstest]
    #[case(r#"<div class="article-content">x</div>"#, 25.0)]
    #[case(r#"<div class="sidebar">x</div>"#, -25.0)]
    #[case(r#"<div class="share-tools">x</div>"#, -25.0)]
    #[case(r#"<div id="main-content" class="sidebar">x</div>"#, 25.0)]
    #[case(r#"<div class="container" id="wrapper">x</div>"#, 0.0)]
    fn test_class_id_weight(#[case] html: &str, #[case] expected: f64) {
        let doc = Document::parse(html);
        assert_eq!(class_id_weight(&first(&doc, "div"), &ScoreConfig::default()), expected);
    }

    #[test]
    fn test_content_density() {
        let doc = Document::parse("<div>Text with commas, more commas, even more commas, and additional commas.</div>");
        assert_eq!(content_density_score(&first(&doc, "div"), &ScoreConfig::default()), 3.0);

        let long = format!("<div>{}</div>", "a".repeat(500));
        let doc = Document::parse(&long);
        assert_eq!(content_density_score(&first(&doc, "div"), &ScoreConfig::default()), 3.0);
    }

    #[test]
    fn test_figure_score_counts_only_protected_images() {
        let html = r#"<div>
            <figure><img src="a.jpg"></figure>
            <figure><img src="b.jpg"></figure>
            <img src="c.jpg">
        </div>"#;
        let doc = Document::parse(html);
        assert_eq!(figure_score(&first(&doc, "div"), &ScoreConfig::default()), 2.0);
    }

    #[test]
    fn test_link_density() {
        let doc = Document::parse(r##"<div><a href="#">Link text</a></div>"##);
        assert_eq!(link_density(&first(&doc, "div")), 1.0);

        let doc = Document::parse(r##"<div>Some text <a href="#">link</a> more text</div>"##);
        let density = link_density(&first(&doc, "div"));
        assert!(density > 0.0 && density < 1.0);

        let doc = Document::parse("<div></div>");
        assert_eq!(link_density(&first(&doc, "div")), 0.0);
    }

    #[test]
    fn test_calculate_score_article() {
        let html = r##"<article class="main-content" id="post">
            This is a long piece of text that should score well, with multiple commas, to indicate prose content.
            <a href="#">Small link</a>
            More text here to increase character count, more commas, more content, this should score high.
        </article>"##;
        let doc = Document::parse(html);
        let result = calculate_score(&first(&doc, "article"), &ScoreConfig::default());

        assert_eq!(result.tag_name, "article");
        assert_eq!(result.base_score, 10.0);
        assert_eq!(result.class_weight, 25.0);
        assert!(result.link_density > 0.0 && result.link_density < 0.3);
        assert!(result.final_score > 25.0);
    }

    #[test]
    fn test_calculate_score_nav_penalized() {
        let html = r##"<nav class="menu"><a href="#">Link 1</a><a href="#">Link 2</a><a href="#">Link 3</a></nav>"##;
        let doc = Document::parse(html);
        let result = calculate_score(&first(&doc, "nav"), &ScoreConfig::default());

        assert_eq!(result.base_score, -5.0);
        assert_eq!(result.class_weight, -25.0);
        assert!(result.final_score <= 0.0);
    }

    #[test]
    fn test_code_block_penalty() {
        let code = "fn main(){let x=[1;2];if x[0]==1{println!(\"{:?}\",x);}}".repeat(2);
        let doc = Document::parse(&format!("<pre>{code}</pre>"));
        let result = calculate_score(&first(&doc, "pre"), &ScoreConfig::default());
        assert!(result.final_score < 0.0);
    }
}
