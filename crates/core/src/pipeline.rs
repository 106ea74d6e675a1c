//! The extraction pipeline, end to end.
//!
//! A selection (when enabled and non-empty) short-circuits everything;
//! otherwise the page goes through reconciliation. Either way the chosen
//! subtree is normalized, its images collected, and the result rendered and
//! post-processed into Markdown.

use tracing::debug;
use url::Url;

use crate::Result;
use crate::article::ExtractionResult;
use crate::formatters::{MarkdownConfig, MarkdownRenderer};
use crate::images::collect_images;
use crate::postprocess::postprocess_markdown;
use crate::preprocess::{normalize_content, remove_images};
use crate::readability::{ArticleExtractor, Readability};
use crate::reconcile::{ExtractionPath, ReconcileStrategy, reconcile};
use crate::selection::{SelectionSource, capture};
use crate::settings::Settings;
use crate::visibility::LiveDocument;

const UNTITLED: &str = "Untitled";

/// Switches for one extraction run.
///
/// The default mirrors [`Settings::default`]: images on, selections off.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Keep images in the Markdown and collect them as [`ImageRef`](crate::images::ImageRef)s.
    pub include_images: bool,
    /// Let a non-empty selection replace full-page extraction.
    pub selective_copy: bool,
    pub strategy: ReconcileStrategy,
    pub markdown: MarkdownConfig,
}

impl ExtractOptions {
    pub fn with_strategy(mut self, strategy: ReconcileStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for ExtractOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            include_images: settings.include_images,
            selective_copy: settings.selective_copy,
            strategy: ReconcileStrategy::default(),
            markdown: MarkdownConfig::default(),
        }
    }
}

/// Extracts the article (or the selection) of `live` as Markdown.
///
/// Only rendering can fail; every extraction step degrades instead.
pub fn extract<E>(
    live: &mut LiveDocument, selection: Option<&SelectionSource>, extractor: &E, options: &ExtractOptions,
) -> Result<ExtractionResult>
where
    E: ArticleExtractor + ?Sized,
{
    let selected = selection.filter(|_| options.selective_copy).and_then(|source| capture(live, source));

    let (title, byline, content, path) = match selected {
        Some(fragment) => {
            debug!("extracting from selection");
            (live.title(), None, fragment, ExtractionPath::Selection)
        }
        None => {
            let reconciled = reconcile(live, extractor, options.include_images, options.strategy);
            (reconciled.title, reconciled.byline, reconciled.content, reconciled.path)
        }
    };

    let base_url = live.base_url();
    let content = normalize_content(&content, base_url);
    let (content, images) = if options.include_images {
        let images = collect_images(&content, base_url);
        (content, images)
    } else {
        (remove_images(&content), Vec::new())
    };

    let body = MarkdownRenderer::new(options.markdown.clone()).render(&content)?;
    let body = postprocess_markdown(&body);

    let title = [title.trim(), live.title().as_str()]
        .into_iter()
        .find(|candidate| !candidate.is_empty())
        .unwrap_or(UNTITLED)
        .to_string();

    debug!(?path, images = images.len(), body_len = body.len(), "extraction finished");

    Ok(ExtractionResult {
        title,
        body,
        source_url: base_url.map(Url::to_string).unwrap_or_default(),
        byline: byline.filter(|b| !b.trim().is_empty()),
        is_selection: path == ExtractionPath::Selection,
        content_html: content,
        images,
        path,
    })
}

/// Parses `html` and extracts it with the built-in [`Readability`] extractor.
///
/// ```rust
/// use ezycopy_core::{ExtractOptions, extract_html};
///
/// let html = r#"<html><head><title>Notes</title></head><body><article>
///     <h1>Notes</h1>
///     <p>Rust makes it easy to write fast and reliable software, and this paragraph is long enough to count.</p>
///     <p>Another paragraph keeps the extractor confident that this is the article body of the page.</p>
/// </article></body></html>"#;
///
/// let options = ExtractOptions::default();
/// let result = extract_html(html, None, &options).unwrap();
/// assert_eq!(result.title, "Notes");
/// assert!(result.body.contains("fast and reliable"));
/// ```
pub fn extract_html(html: &str, base_url: Option<Url>, options: &ExtractOptions) -> Result<ExtractionResult> {
    let mut live = LiveDocument::parse(html, base_url);
    extract(&mut live, None, &Readability::default(), options)
}
