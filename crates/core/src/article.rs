//! Extraction result and its final Markdown document.
//!
//! [`ExtractionResult`] is what the pipeline hands to the persistence layer:
//! the cleaned Markdown body, the HTML subtree it came from, and the images
//! that may later be downloaded and rewritten to local paths.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::images::{ImageRef, rewrite_image_paths};
use crate::reconcile::ExtractionPath;

/// Where the Markdown document is going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputTarget {
    /// Title and body only.
    #[default]
    Clipboard,
    /// Title, `Source:` and `Author:` lines, then the body.
    Download,
}

/// The result of one extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub title: String,

    /// Post-processed Markdown body.
    pub body: String,

    pub source_url: String,

    pub byline: Option<String>,

    /// True when the body came from the user's selection.
    pub is_selection: bool,

    /// The HTML subtree the body was rendered from.
    pub content_html: String,

    /// Unique images of the subtree. Empty when images are excluded.
    pub images: Vec<ImageRef>,

    /// Which extraction path produced the content.
    pub path: ExtractionPath,
}

impl ExtractionResult {
    /// Renders the full Markdown document for `target`.
    ///
    /// ```rust
    /// use ezycopy_core::{ExtractionPath, ExtractionResult, OutputTarget};
    ///
    /// let result = ExtractionResult {
    ///     title: "Post".into(),
    ///     body: "Body text.".into(),
    ///     source_url: "https://example.com/post".into(),
    ///     byline: Some("Ada".into()),
    ///     is_selection: false,
    ///     content_html: "<p>Body text.</p>".into(),
    ///     images: vec![],
    ///     path: ExtractionPath::Article,
    /// };
    ///
    /// assert_eq!(result.to_markdown(OutputTarget::Clipboard), "# Post\n\nBody text.");
    /// assert_eq!(
    ///     result.to_markdown(OutputTarget::Download),
    ///     "# Post\n\nSource: https://example.com/post\nAuthor: Ada\n\nBody text."
    /// );
    /// ```
    pub fn to_markdown(&self, target: OutputTarget) -> String {
        let mut parts = vec![format!("# {}", self.title), String::new()];

        if target == OutputTarget::Download {
            parts.push(format!("Source: {}", self.source_url));
            if let Some(byline) = self.byline.as_deref().filter(|b| !b.is_empty()) {
                parts.push(format!("Author: {byline}"));
            }
            parts.push(String::new());
        }

        if self.is_selection {
            parts.push("---".to_string());
            parts.push(String::new());
            parts.push("*Selected content:*".to_string());
            parts.push(String::new());
        }

        parts.push(self.body.clone());
        parts.join("\n")
    }

    /// Points image references at downloaded local copies.
    ///
    /// URLs missing from `url_to_path` keep their remote source.
    pub fn localize_images(&mut self, url_to_path: &HashMap<String, String>) {
        if url_to_path.is_empty() {
            return;
        }
        self.body = rewrite_image_paths(&self.body, url_to_path);
    }
}
