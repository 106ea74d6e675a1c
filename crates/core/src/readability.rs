//! Built-in article extractor.
//!
//! [`Readability`] implements [`ArticleExtractor`], the seam the
//! reconciliation state machine drives. It reads title and byline from the
//! raw snapshot, normalizes the markup, scores candidates, and returns the
//! cleaned content of the winner and its siblings.
//!
//! # Example
//!
//! ```rust
//! use ezycopy_core::{ArticleExtractor, CleaningMode, Readability, Snapshot};
//!
//! let html = r#"<html><head><title>Post</title></head><body><article class="post">
//!     <p>Long enough opening paragraph, with commas, clauses, and plenty of text to score well.</p>
//!     <p>A second paragraph keeps going, adding more prose, more commas, and more characters.</p>
//! </article></body></html>"#;
//!
//! let snapshot = Snapshot::from_html(html, None);
//! let article = Readability::new().extract(&snapshot, CleaningMode::Conditional).unwrap();
//! assert_eq!(article.title, "Post");
//! ```

use url::Url;

use crate::cleaning::CleaningConfig;
use crate::extract::{ExtractConfig, extract_content};
use crate::parse::Document;
use crate::preprocess::PreprocessConfig;
use crate::snapshot::Snapshot;
use crate::{EzyCopyError, Result};

/// How aggressively the extracted fragment is cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleaningMode {
    /// Conditional cleaning on: chrome, link-dense and image-dominated
    /// blocks are dropped.
    #[default]
    Conditional,
    /// Conditional cleaning off. Used for the image-loss retry.
    Relaxed,
}

/// What an extractor found.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedArticle {
    /// Article title, empty when none could be found
    pub title: String,
    pub byline: Option<String>,
    /// Cleaned HTML fragment
    pub content: String,
    /// Text of `content` with whitespace collapsed
    pub text_content: String,
}

/// Isolates the primary content of a snapshot.
///
/// Implementations must not mutate anything but their own copies. A failure
/// means no article could be identified with confidence.
pub trait ArticleExtractor {
    fn extract(&self, snapshot: &Snapshot, mode: CleaningMode) -> Result<ExtractedArticle>;
}

/// Configuration for the Readability builder.
///
/// # Example
///
/// ```rust
/// use ezycopy_core::ReadabilityConfig;
///
/// let config = ReadabilityConfig::builder()
///     .min_score(25.0)
///     .char_threshold(500)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ReadabilityConfig {
    /// Minimum score threshold for extraction (default: 20.0).
    pub min_score: f64,

    /// Minimum character count for valid content (default: 500).
    pub char_threshold: usize,

    /// Number of top candidates to track (default: 5).
    pub nb_top_candidates: usize,

    /// Maximum elements to parse (0 = unlimited, default: 0).
    pub max_elems_to_parse: usize,

    /// Whether to remove unlikely candidates (default: true).
    pub remove_unlikely: bool,

    /// Whether to preserve class attributes in output HTML (default: false).
    pub keep_classes: bool,

    /// Maximum link density before conditional cleaning drops a block (default: 0.5).
    pub max_link_density: f64,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self {
            min_score: 20.0,
            char_threshold: 500,
            nb_top_candidates: 5,
            max_elems_to_parse: 0,
            remove_unlikely: true,
            keep_classes: false,
            max_link_density: 0.5,
        }
    }
}

impl ReadabilityConfig {
    pub fn builder() -> ReadabilityConfigBuilder {
        ReadabilityConfigBuilder::new()
    }
}

/// Builder for [`ReadabilityConfig`].
pub struct ReadabilityConfigBuilder {
    config: ReadabilityConfig,
}

impl ReadabilityConfigBuilder {
    pub fn new() -> Self {
        Self { config: ReadabilityConfig::default() }
    }

    /// Sets the minimum score threshold.
    pub fn min_score(mut self, value: f64) -> Self {
        self.config.min_score = value;
        self
    }

    /// Sets the character threshold.
    pub fn char_threshold(mut self, value: usize) -> Self {
        self.config.char_threshold = value;
        self
    }

    /// Sets the number of top candidates.
    pub fn nb_top_candidates(mut self, value: usize) -> Self {
        self.config.nb_top_candidates = value;
        self
    }

    /// Sets the maximum elements to parse.
    pub fn max_elems_to_parse(mut self, value: usize) -> Self {
        self.config.max_elems_to_parse = value;
        self
    }

    /// Sets whether to remove unlikely candidates.
    pub fn remove_unlikely(mut self, value: bool) -> Self {
        self.config.remove_unlikely = value;
        self
    }

    /// Sets whether to preserve class attributes in output HTML.
    pub fn keep_classes(mut self, value: bool) -> Self {
        self.config.keep_classes = value;
        self
    }

    /// Sets the link density above which conditional cleaning drops a block.
    pub fn max_link_density(mut self, value: f64) -> Self {
        self.config.max_link_density = value;
        self
    }

    pub fn build(self) -> ReadabilityConfig {
        self.config
    }
}

impl Default for ReadabilityConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Heuristic article extractor.
///
/// # Example
///
/// ```rust
/// use ezycopy_core::Readability;
///
/// let reader = Readability::new();
/// let html = "<html><body><nav><a href=\"/\">Home</a></nav></body></html>";
/// assert!(reader.parse(html).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Readability {
    config: ReadabilityConfig,
}

impl Readability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReadabilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReadabilityConfig {
        &self.config
    }

    /// Extracts from raw HTML with conditional cleaning.
    pub fn parse(&self, html: &str) -> Result<ExtractedArticle> {
        self.extract_html(html, None, CleaningMode::Conditional)
    }

    /// Extracts from raw HTML, resolving relative links against `url`.
    ///
    /// # Errors
    ///
    /// Returns [`EzyCopyError::InvalidUrl`] if the URL is invalid.
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<ExtractedArticle> {
        let base_url = Url::parse(url).map_err(|e| EzyCopyError::InvalidUrl(e.to_string()))?;
        self.extract_html(html, Some(base_url), CleaningMode::Conditional)
    }

    fn extract_html(&self, html: &str, base_url: Option<Url>, mode: CleaningMode) -> Result<ExtractedArticle> {
        let raw = Document::parse(html);
        let title = raw.extract_title().unwrap_or_default();
        let byline = raw.extract_byline();

        let preprocess = PreprocessConfig {
            remove_unlikely: self.config.remove_unlikely,
            base_url: base_url.clone(),
            ..Default::default()
        };
        let doc = Document::parse_with_preprocessing(html, &preprocess);

        let extract_config = ExtractConfig {
            min_score_threshold: self.config.min_score,
            max_top_candidates: self.config.nb_top_candidates,
            char_threshold: self.config.char_threshold,
            max_elements: self.config.max_elems_to_parse,
            sibling_threshold: 0.2,
            cleaning: CleaningConfig {
                conditional: mode == CleaningMode::Conditional,
                max_link_density: self.config.max_link_density,
                keep_classes: self.config.keep_classes,
                base_url,
                ..Default::default()
            },
        };

        let extracted = extract_content(&doc, &extract_config)?;
        let text_content = Document::parse_fragment(&extracted.content).text_content();

        Ok(ExtractedArticle { title, byline, content: extracted.content, text_content })
    }
}

impl ArticleExtractor for Readability {
    fn extract(&self, snapshot: &Snapshot, mode: CleaningMode) -> Result<ExtractedArticle> {
        self.extract_html(&snapshot.html(), snapshot.base_url().cloned(), mode)
    }
}
