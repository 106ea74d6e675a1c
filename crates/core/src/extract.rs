use std::cmp::Ordering;

use tracing::debug;

use crate::cleaning::{CleaningConfig, clean_html};
use crate::parse::{Document, Element};
use crate::scoring::{ScoreConfig, ScoreResult, calculate_score, link_density};
use crate::{EzyCopyError, Result};

/// Configuration for content extraction
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Minimum score threshold for top candidate
    pub min_score_threshold: f64,
    /// Maximum number of top candidates to track
    pub max_top_candidates: usize,
    /// Minimum character threshold for content
    pub char_threshold: usize,
    /// Maximum elements to consider
    pub max_elements: usize,
    /// Sibling score threshold (multiplier of top score)
    pub sibling_threshold: f64,
    /// Cleanup applied to the joined fragment
    pub cleaning: CleaningConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_score_threshold: 10.0,
            max_top_candidates: 5,
            char_threshold: 500,
            max_elements: 1000,
            sibling_threshold: 0.2,
            cleaning: CleaningConfig::default(),
        }
    }
}

/// A candidate element with its score
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub element: Element<'a>,
    pub score_result: ScoreResult,
}

/// The result of content extraction
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Cleaned HTML of the top candidate and its siblings
    pub content: String,
    /// The top candidate score
    pub top_score: f64,
    /// Number of elements extracted
    pub element_count: usize,
}

impl<'a> Candidate<'a> {
    fn new(element: Element<'a>, score_result: ScoreResult) -> Self {
        Self { element, score_result }
    }

    fn score(&self) -> f64 {
        self.score_result.final_score
    }
}

/// Tags that are considered potential content containers
const CANDIDATE_SELECTOR: &str = "div, article, section, main, p, td, pre, blockquote";

/// Containers that never receive propagated score.
const ROOT_TAGS: &[&str] = &["html", "body"];

/// Collects scored candidates in document order.
fn identify_candidates<'a>(
    doc: &'a Document, config: &ExtractConfig, score_config: &ScoreConfig,
) -> Vec<Candidate<'a>> {
    let max_elements = if config.max_elements == 0 { usize::MAX } else { config.max_elements };

    doc.select(CANDIDATE_SELECTOR)
        .unwrap_or_default()
        .into_iter()
        .take(max_elements)
        .filter(|element| {
            matches!(element.tag_name().as_str(), "article" | "section" | "main")
                || element.text().chars().count() >= config.char_threshold / 10
        })
        .map(|element| {
            let score_result = calculate_score(&element, score_config);
            Candidate::new(element, score_result)
        })
        .collect()
}

/// Propagates candidate scores up the tree.
///
/// The parent gains half of each positive candidate score and the
/// grandparent a third. Ancestors that were not candidates yet are scored
/// and added.
fn propagate_scores<'a>(candidates: &mut Vec<Candidate<'a>>, score_config: &ScoreConfig) {
    let originals: Vec<(Element<'a>, f64)> =
        candidates.iter().map(|candidate| (candidate.element, candidate.score())).collect();

    for (element, score) in originals {
        if score <= 0.0 {
            continue;
        }

        let parent = element.parent();
        let grandparent = parent.and_then(|p| p.parent());

        for (ancestor, divisor) in [(parent, 2.0), (grandparent, 3.0)] {
            let Some(ancestor) = ancestor else {
                continue;
            };
            if ROOT_TAGS.contains(&ancestor.tag_name().as_str()) {
                continue;
            }

            let boost = score / divisor;
            match candidates.iter_mut().find(|candidate| candidate.element == ancestor) {
                Some(existing) => existing.score_result.final_score += boost,
                None => {
                    let mut score_result = calculate_score(&ancestor, score_config);
                    score_result.final_score += boost;
                    candidates.push(Candidate::new(ancestor, score_result));
                }
            }
        }
    }
}

/// Returns the highest scoring candidate if it meets the minimum threshold.
fn select_top_candidate<'a, 'c>(candidates: &'c [Candidate<'a>], config: &ExtractConfig) -> Result<&'c Candidate<'a>> {
    let top_candidate = candidates.iter().max_by(|a, b| compare_candidates(a, b)).ok_or(EzyCopyError::NoContent)?;

    if top_candidate.score() < config.min_score_threshold {
        return Err(EzyCopyError::NotReadable { score: top_candidate.score(), threshold: config.min_score_threshold });
    }

    Ok(top_candidate)
}

/// Paragraphs that carry prose on their own.
fn is_qualifying_paragraph(element: &Element<'_>) -> bool {
    element.tag_name() == "p" && element.text().chars().count() > 80 && link_density(element) < 0.25
}

/// The top candidate plus qualifying siblings, in document order.
///
/// A sibling qualifies when it is a tracked candidate scoring at least
/// `top_score * sibling_threshold`, a prose paragraph, or a `<header>` with
/// some text.
fn select_with_siblings<'a>(
    top_candidate: &Candidate<'a>, candidates: &[Candidate<'a>], config: &ExtractConfig,
) -> Vec<Element<'a>> {
    let top = top_candidate.element;
    let Some(parent) = top.parent() else {
        return vec![top];
    };

    let threshold = top_candidate.score() * config.sibling_threshold;
    let mut ranked: Vec<&Candidate<'a>> = candidates.iter().collect();
    ranked.sort_by(|a, b| compare_candidates(b, a));
    ranked.truncate(config.max_top_candidates.max(1));

    parent
        .children()
        .into_iter()
        .filter(|sibling| {
            if *sibling == top {
                return true;
            }
            let tag = sibling.tag_name();
            if tag == "p" {
                return is_qualifying_paragraph(sibling);
            }
            if tag == "header" {
                return sibling.text().trim().chars().count() >= 10;
            }
            ranked.iter().any(|candidate| candidate.element == *sibling && candidate.score() >= threshold)
        })
        .collect()
}

/// Extracts the main content from a document.
///
/// 1. Identifies and scores candidate elements
/// 2. Propagates scores to ancestors
/// 3. Selects the top candidate
/// 4. Includes qualifying siblings
/// 5. Cleans the joined fragment
pub fn extract_content(doc: &Document, config: &ExtractConfig) -> Result<ExtractedContent> {
    let score_config = ScoreConfig::default();

    let mut candidates = identify_candidates(doc, config, &score_config);
    propagate_scores(&mut candidates, &score_config);

    let top_candidate = select_top_candidate(&candidates, config)?;
    let selected = select_with_siblings(top_candidate, &candidates, config);
    debug!(
        tag = %top_candidate.element.tag_name(),
        score = top_candidate.score(),
        candidates = candidates.len(),
        siblings = selected.len().saturating_sub(1),
        "selected top candidate"
    );

    let content = selected.iter().map(Element::outer_html).collect::<Vec<_>>().join("\n");
    let content = clean_html(&content, &config.cleaning);

    Ok(ExtractedContent { content, top_score: top_candidate.score(), element_count: selected.len() })
}

fn compare_candidates(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    let score_order = a.score().partial_cmp(&b.score()).unwrap_or(Ordering::Equal);
    if score_order != Ordering::Equal {
        return score_order;
    }

    let tag_order = candidate_priority(&a.element.tag_name()).cmp(&candidate_priority(&b.element.tag_name()));
    if tag_order != Ordering::Equal {
        return tag_order;
    }

    a.element.text().chars().count().cmp(&b.element.text().chars().count())
}

fn candidate_priority(tag_name: &str) -> u8 {
    match tag_name {
        "article" | "main" | "section" => 3,
        "div" => 2,
        _ => 1,
    }
}
