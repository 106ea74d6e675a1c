//! Image-loss reconciliation.
//!
//! Article extractors tend to throw away image-heavy sections along with the
//! boilerplate. After a successful first pass this module checks how many of
//! the page's images survived and, depending on the configured
//! [`ReconcileStrategy`], either re-runs the extractor with relaxed cleaning
//! or swaps in a CMS content container.
//!
//! Every decision is a pure function of already-computed counts, and every
//! failure degrades to a usable result: extractor failure falls back to the
//! raw `<body>`, a failed retry keeps the first pass.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use dom_query::Document;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::Result;
use crate::images::count_unique_images;
use crate::parse::collapse_whitespace;
use crate::readability::{ArticleExtractor, CleaningMode, ExtractedArticle};
use crate::snapshot::Snapshot;
use crate::visibility::LiveDocument;

/// Loss ratios strictly above this trigger reconciliation.
pub const IMAGE_LOSS_THRESHOLD: f64 = 0.5;

/// Overlap ratios strictly above this count as a text match.
pub const TEXT_OVERLAP_THRESHOLD: f64 = 0.5;

/// Content containers of common CMSes, in priority order.
pub const CMS_SELECTORS: &[&str] =
    &[".rte", ".entry-content", ".post-content", ".article-content", ".post-body", ".story-body", ".article-body"];

/// Blocks dropped from a CMS container before it is rendered.
const CONTAINER_NOISE_SELECTORS: &[&str] = &[
    "style",
    "script",
    "noscript",
    "[class*=\"interlude\"]",
    "[class*=\"promo\"]",
    "[class*=\"advert\"]",
    "[class*=\"sidebar\"]",
    "[class*=\"related\"]",
    "[class*=\"newsletter\"]",
    "[class*=\"subscribe\"]",
    "[id*=\"promo\"]",
    "[id*=\"advert\"]",
];

/// Which reconciliation runs after a successful first pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReconcileStrategy {
    /// Re-extract with relaxed cleaning when too many images were lost.
    #[default]
    ImageLossRetry,
    /// Replace the output with the best-matching CMS container when too many
    /// of its images were lost.
    CmsContainer,
}

impl FromStr for ReconcileStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "retry" | "image-loss-retry" => Ok(Self::ImageLossRetry),
            "cms" | "cms-container" => Ok(Self::CmsContainer),
            other => Err(format!("unknown strategy '{other}' (expected 'retry' or 'cms')")),
        }
    }
}

impl fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageLossRetry => f.write_str("retry"),
            Self::CmsContainer => f.write_str("cms"),
        }
    }
}

/// Which path produced an extraction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtractionPath {
    Selection,
    Article,
    RelaxedRetry,
    CmsContainer,
    BodyFallback,
}

/// A page that can hand out fresh cleaned snapshots.
///
/// Implemented by [`LiveDocument`]; tests substitute their own.
pub trait SnapshotSource {
    /// A new snapshot with hidden elements, widgets removed and images protected.
    fn cleaned_snapshot(&mut self) -> Result<Snapshot>;
    /// The page's own `<title>`, trimmed.
    fn document_title(&self) -> String;
    /// Raw `<body>` markup.
    fn body_html(&self) -> String;
    fn base_url(&self) -> Option<&Url>;
}

impl SnapshotSource for LiveDocument {
    fn cleaned_snapshot(&mut self) -> Result<Snapshot> {
        LiveDocument::cleaned_snapshot(self)
    }

    fn document_title(&self) -> String {
        self.title()
    }

    fn body_html(&self) -> String {
        LiveDocument::body_html(self)
    }

    fn base_url(&self) -> Option<&Url> {
        LiveDocument::base_url(self)
    }
}

/// The reconciled article, before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub title: String,
    pub byline: Option<String>,
    /// HTML content subtree
    pub content: String,
    pub path: ExtractionPath,
}

impl Reconciled {
    fn from_article(article: ExtractedArticle, path: ExtractionPath) -> Self {
        Self { title: article.title, byline: article.byline, content: article.content, path }
    }
}

/// A CMS container considered as a replacement for extractor output.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateContainer<T> {
    pub element: T,
    pub selector: &'static str,
    /// 0.0 to 1.0
    pub text_overlap: f64,
    pub image_count: usize,
}

/// Fraction of `page_images` missing from the extracted output.
///
/// Zero when the page has no images.
pub fn image_loss_ratio(page_images: usize, extracted_images: usize) -> f64 {
    if page_images == 0 {
        return 0.0;
    }
    (page_images as f64 - extracted_images as f64) / page_images as f64
}

/// True when the loss is strictly above [`IMAGE_LOSS_THRESHOLD`].
pub fn should_reconcile(loss_ratio: f64) -> bool {
    loss_ratio > IMAGE_LOSS_THRESHOLD
}

fn normalize_text(text: &str) -> String {
    collapse_whitespace(&text.to_lowercase())
}

/// Similarity between trusted extractor text and a container's text.
///
/// Both sides are lowercased and whitespace-collapsed. A container holding
/// all of the reference scores 1.0; a container contained in the reference
/// scores its share of the reference length. Otherwise the score is the
/// share of reference words longer than three characters that occur in the
/// container.
pub fn text_overlap_ratio(reference: &str, container: &str) -> f64 {
    let reference = normalize_text(reference);
    if reference.is_empty() {
        return 0.0;
    }
    let container = normalize_text(container);

    if container.contains(&reference) {
        return 1.0;
    }
    if reference.contains(&container) {
        return container.chars().count() as f64 / reference.chars().count() as f64;
    }

    let words: Vec<&str> = reference.split(' ').filter(|word| word.chars().count() > 3).collect();
    if words.is_empty() {
        return 0.0;
    }
    let matched = words.iter().filter(|word| container.contains(*word)).count();
    matched as f64 / words.len() as f64
}

/// Picks the winning container.
///
/// Among candidates whose overlap is above [`TEXT_OVERLAP_THRESHOLD`] the
/// image-richest wins; with no such candidate the image-richest overall
/// wins. Ties go to the earlier candidate.
pub fn rank<T>(candidates: Vec<CandidateContainer<T>>) -> Option<CandidateContainer<T>> {
    let (matches, rest): (Vec<_>, Vec<_>) =
        candidates.into_iter().partition(|candidate| candidate.text_overlap > TEXT_OVERLAP_THRESHOLD);
    let pool = if matches.is_empty() { rest } else { matches };
    pool.into_iter().min_by_key(|candidate| Reverse(candidate.image_count))
}

/// CMS containers in `snapshot` holding at least one image.
///
/// `element` is the container's inner HTML.
pub fn find_containers(snapshot: &Snapshot, reference_text: &str) -> Vec<CandidateContainer<String>> {
    let mut candidates = Vec::new();
    for &selector in CMS_SELECTORS {
        let matches = snapshot.document().select(selector);
        for container in matches.iter() {
            let image_count = container.select("img").length();
            if image_count == 0 {
                continue;
            }
            candidates.push(CandidateContainer {
                element: container.inner_html().to_string(),
                selector,
                text_overlap: text_overlap_ratio(reference_text, &container.text()),
                image_count,
            });
        }
    }
    candidates
}

/// Drops scripts, styles and promo blocks from a container's markup.
pub fn clean_container_html(html: &str) -> String {
    let doc = Document::from(html);
    for selector in CONTAINER_NOISE_SELECTORS {
        doc.select(selector).remove();
    }
    doc.select("body").inner_html().to_string()
}

enum State {
    ExtractFirstPass,
    RetryRelaxed { first: ExtractedArticle },
    ContainerFallback { first: ExtractedArticle, snapshot: Snapshot },
    FallbackBody,
    Done(Reconciled),
}

fn first_pass<E>(snapshot: Snapshot, extractor: &E, include_images: bool, strategy: ReconcileStrategy) -> State
where
    E: ArticleExtractor + ?Sized,
{
    let first = match extractor.extract(&snapshot, CleaningMode::Conditional) {
        Ok(first) => first,
        Err(err) => {
            warn!(error = %err, "extractor found no article, using page body");
            return State::FallbackBody;
        }
    };
    if !include_images {
        return State::Done(Reconciled::from_article(first, ExtractionPath::Article));
    }

    match strategy {
        ReconcileStrategy::ImageLossRetry => {
            let page_images = snapshot.image_count();
            let extracted_images = count_unique_images(&first.content, snapshot.base_url());
            let loss = image_loss_ratio(page_images, extracted_images);
            debug!(page_images, extracted_images, loss, "first pass image loss");

            if should_reconcile(loss) {
                State::RetryRelaxed { first }
            } else {
                State::Done(Reconciled::from_article(first, ExtractionPath::Article))
            }
        }
        ReconcileStrategy::CmsContainer => State::ContainerFallback { first, snapshot },
    }
}

/// Runs the reconciliation state machine over a full page.
///
/// Never fails: every failing step degrades to a lesser result.
pub fn reconcile<S, E>(source: &mut S, extractor: &E, include_images: bool, strategy: ReconcileStrategy) -> Reconciled
where
    S: SnapshotSource + ?Sized,
    E: ArticleExtractor + ?Sized,
{
    let mut state = State::ExtractFirstPass;

    loop {
        state = match state {
            State::ExtractFirstPass => match source.cleaned_snapshot() {
                Ok(snapshot) => first_pass(snapshot, extractor, include_images, strategy),
                Err(err) => {
                    warn!(error = %err, "could not snapshot page");
                    State::FallbackBody
                }
            },

            State::RetryRelaxed { first } => {
                let retry = source
                    .cleaned_snapshot()
                    .and_then(|snapshot| extractor.extract(&snapshot, CleaningMode::Relaxed));
                match retry {
                    Ok(relaxed) => {
                        debug!("using relaxed retry output");
                        State::Done(Reconciled::from_article(relaxed, ExtractionPath::RelaxedRetry))
                    }
                    Err(err) => {
                        debug!(error = %err, "relaxed retry failed, keeping first pass");
                        State::Done(Reconciled::from_article(first, ExtractionPath::Article))
                    }
                }
            }

            State::ContainerFallback { first, snapshot } => {
                let winner = rank(find_containers(&snapshot, &first.text_content));
                match winner {
                    Some(container) => {
                        let extracted_images = count_unique_images(&first.content, snapshot.base_url());
                        let loss = image_loss_ratio(container.image_count, extracted_images);
                        debug!(selector = container.selector, overlap = container.text_overlap, loss, "cms container");

                        if should_reconcile(loss) {
                            let content = clean_container_html(&container.element);
                            State::Done(Reconciled {
                                title: first.title,
                                byline: first.byline,
                                content,
                                path: ExtractionPath::CmsContainer,
                            })
                        } else {
                            State::Done(Reconciled::from_article(first, ExtractionPath::Article))
                        }
                    }
                    None => State::Done(Reconciled::from_article(first, ExtractionPath::Article)),
                }
            }

            State::FallbackBody => State::Done(Reconciled {
                title: source.document_title(),
                byline: None,
                content: source.body_html(),
                path: ExtractionPath::BodyFallback,
            }),

            State::Done(result) => return result,
        };
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::EzyCopyError;

    /// Source that hands out the same markup on every snapshot.
    struct FixedSource {
        html: String,
        snapshots: usize,
    }

    impl FixedSource {
        fn new(html: &str) -> Self {
            Self { html: html.to_string(), snapshots: 0 }
        }
    }

    impl SnapshotSource for FixedSource {
        fn cleaned_snapshot(&mut self) -> Result<Snapshot> {
            self.snapshots += 1;
            Ok(Snapshot::from_html(&self.html, None))
        }

        fn document_title(&self) -> String {
            "Page Title".to_string()
        }

        fn body_html(&self) -> String {
            "<p>raw body</p>".to_string()
        }

        fn base_url(&self) -> Option<&Url> {
            None
        }
    }

    /// Extractor with scripted outputs per cleaning mode.
    struct Scripted {
        conditional: Option<ExtractedArticle>,
        relaxed: Option<ExtractedArticle>,
    }

    impl ArticleExtractor for Scripted {
        fn extract(&self, _snapshot: &Snapshot, mode: CleaningMode) -> Result<ExtractedArticle> {
            let output = match mode {
                CleaningMode::Conditional => &self.conditional,
                CleaningMode::Relaxed => &self.relaxed,
            };
            output.clone().ok_or(EzyCopyError::NoContent)
        }
    }

    fn article(content: &str, text: &str) -> ExtractedArticle {
        ExtractedArticle {
            title: "Article".to_string(),
            byline: Some("Ada".to_string()),
            content: content.to_string(),
            text_content: text.to_string(),
        }
    }

    fn imgs(n: usize) -> String {
        (0..n).map(|i| format!(r#"<img src="https://a.co/{i}.png">"#)).collect()
    }

    fn page_with_images(n: usize) -> String {
        format!("<html><head><title>T</title></head><body>{}</body></html>", imgs(n))
    }

    #[rstest]
    #[case(0, 0, 0.0)]
    #[case(4, 4, 0.0)]
    #[case(4, 2, 0.5)]
    #[case(4, 0, 1.0)]
    #[case(100, 49, 0.51)]
    fn test_image_loss_ratio(#[case] page: usize, #[case] extracted: usize, #[case] expected: f64) {
        assert!((image_loss_ratio(page, extracted) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(!should_reconcile(0.5));
        assert!(should_reconcile(0.51));
    }

    #[test]
    fn test_extractor_failure_falls_back_to_body() {
        let mut source = FixedSource::new(&page_with_images(0));
        let extractor = Scripted { conditional: None, relaxed: None };

        let result = reconcile(&mut source, &extractor, true, ReconcileStrategy::ImageLossRetry);

        assert_eq!(result.path, ExtractionPath::BodyFallback);
        assert_eq!(result.title, "Page Title");
        assert_eq!(result.byline, None);
        assert_eq!(result.content, "<p>raw body</p>");
    }

    #[test]
    fn test_images_excluded_skips_analysis() {
        let mut source = FixedSource::new(&page_with_images(10));
        let extractor = Scripted { conditional: Some(article("<p>x</p>", "x")), relaxed: Some(article("<p>y</p>", "y")) };

        let result = reconcile(&mut source, &extractor, false, ReconcileStrategy::ImageLossRetry);

        assert_eq!(result.path, ExtractionPath::Article);
        assert_eq!(result.content, "<p>x</p>");
        assert_eq!(source.snapshots, 1);
    }

    #[test]
    fn test_loss_at_threshold_keeps_first_pass() {
        let mut source = FixedSource::new(&page_with_images(4));
        let first = article(&imgs(2), "");
        let extractor = Scripted { conditional: Some(first.clone()), relaxed: Some(article(&imgs(4), "")) };

        let result = reconcile(&mut source, &extractor, true, ReconcileStrategy::ImageLossRetry);

        assert_eq!(result.path, ExtractionPath::Article);
        assert_eq!(result.content, first.content);
    }

    #[test]
    fn test_heavy_loss_retries_with_fresh_snapshot() {
        let mut source = FixedSource::new(&page_with_images(4));
        let extractor = Scripted { conditional: Some(article(&imgs(1), "")), relaxed: Some(article(&imgs(4), "")) };

        let result = reconcile(&mut source, &extractor, true, ReconcileStrategy::ImageLossRetry);

        assert_eq!(result.path, ExtractionPath::RelaxedRetry);
        assert_eq!(result.content, imgs(4));
        assert_eq!(source.snapshots, 2);
    }

    #[test]
    fn test_failed_retry_keeps_first_pass() {
        let mut source = FixedSource::new(&page_with_images(4));
        let extractor = Scripted { conditional: Some(article("<p>text only</p>", "text only")), relaxed: None };

        let result = reconcile(&mut source, &extractor, true, ReconcileStrategy::ImageLossRetry);

        assert_eq!(result.path, ExtractionPath::Article);
        assert_eq!(result.content, "<p>text only</p>");
        assert_eq!(result.byline, Some("Ada".to_string()));
    }

    #[test]
    fn test_text_overlap_ratio() {
        assert_eq!(text_overlap_ratio("", "anything"), 0.0);
        assert_eq!(text_overlap_ratio("Hello   World", "intro hello world outro"), 1.0);
        assert_eq!(text_overlap_ratio("abcd efgh", "abcd"), 4.0 / 9.0);
        assert_eq!(text_overlap_ratio("quick brown foxes jump", "slow brown foxes sleep"), 0.5);
        assert_eq!(text_overlap_ratio("a an the", "other"), 0.0);
    }

    fn candidate(id: u8, overlap: f64, images: usize) -> CandidateContainer<u8> {
        CandidateContainer { element: id, selector: ".entry-content", text_overlap: overlap, image_count: images }
    }

    #[test]
    fn test_rank_prefers_image_richest_text_match() {
        let winner = rank(vec![candidate(1, 0.9, 2), candidate(2, 0.4, 10), candidate(3, 0.6, 5)]);
        assert_eq!(winner.map(|c| c.element), Some(3));
    }

    #[test]
    fn test_rank_falls_back_to_most_images() {
        let winner = rank(vec![candidate(1, 0.1, 2), candidate(2, 0.5, 7), candidate(3, 0.2, 7)]);
        assert_eq!(winner.map(|c| c.element), Some(2));
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank::<u8>(Vec::new()).is_none());
    }

    #[test]
    fn test_cms_container_replaces_lossy_output() {
        let html = format!(
            r#"<html><body>
                <div class="entry-content"><p>Shared article text here.</p>{}<div class="promo">Buy now</div></div>
            </body></html>"#,
            imgs(4)
        );
        let mut source = FixedSource::new(&html);
        let first = article("<p>Shared article text here.</p>", "Shared article text here.");
        let extractor = Scripted { conditional: Some(first), relaxed: None };

        let result = reconcile(&mut source, &extractor, true, ReconcileStrategy::CmsContainer);

        assert_eq!(result.path, ExtractionPath::CmsContainer);
        assert_eq!(result.content.matches("<img").count(), 4);
        assert!(!result.content.contains("Buy now"));
        assert_eq!(result.title, "Article");
    }

    #[test]
    fn test_cms_container_kept_when_extractor_has_images() {
        let html = format!(r#"<html><body><div class="post-body"><p>Text.</p>{}</div></body></html>"#, imgs(2));
        let mut source = FixedSource::new(&html);
        let extractor = Scripted { conditional: Some(article(&imgs(2), "Text.")), relaxed: None };

        let result = reconcile(&mut source, &extractor, true, ReconcileStrategy::CmsContainer);
        assert_eq!(result.path, ExtractionPath::Article);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("retry".parse::<ReconcileStrategy>(), Ok(ReconcileStrategy::ImageLossRetry));
        assert_eq!("CMS".parse::<ReconcileStrategy>(), Ok(ReconcileStrategy::CmsContainer));
        assert!("both".parse::<ReconcileStrategy>().is_err());
        assert_eq!(ReconcileStrategy::default().to_string(), "retry");
    }
}
