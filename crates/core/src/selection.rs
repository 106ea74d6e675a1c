//! Selection-aware short-circuit.
//!
//! A user selection replaces full-page extraction: no prefilter, no widget
//! stripping, no extractor. The selected markup is copied into a detached
//! container and treated as the entire content subtree.

use dom_query::Document;
use tracing::debug;

use crate::visibility::LiveDocument;

/// Where the selection comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionSource {
    /// Every element matching a CSS selector on the live page, in document order.
    Selector(String),
    /// Markup already cut out of the page by the host.
    Fragment(String),
}

/// Copies the selection into a detached `<div>`.
///
/// Returns `None` for an invalid selector, a selector without matches, or a
/// selection with no text; the caller then falls through to full-page
/// extraction. The live document is only read.
pub fn capture(live: &LiveDocument, source: &SelectionSource) -> Option<String> {
    let html = match source {
        SelectionSource::Selector(selector) => {
            let selection = live.document().try_select(selector)?;
            selection.iter().map(|sel| sel.html().to_string()).collect::<String>()
        }
        SelectionSource::Fragment(html) => html.clone(),
    };

    let container = Document::from(format!("<div>{html}</div>").as_str());
    let fragment = container.select("body > div");
    if fragment.text().trim().is_empty() {
        debug!("selection is empty, falling through to full page");
        return None;
    }

    Some(fragment.html().to_string())
}
