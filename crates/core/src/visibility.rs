//! Visibility prefilter over the live document.
//!
//! Hidden-ness is a property of the cascade, and the cascade only exists on
//! the live page: once the markup is serialized into a snapshot, rules keyed
//! on ancestors, ids or sibling structure stop meaning anything to later
//! passes. So the prefilter resolves computed visibility on the live tree,
//! tags hidden elements with [`HIDDEN_MARKER`], clones, and immediately
//! removes the tags again. The clone then drops everything that was tagged.

use std::collections::HashMap;

use dom_query::{Document, NodeId, NodeRef, Selection};
use tracing::debug;
use url::Url;

use crate::Result;
use crate::css::{ComputedStyle, StyleSheet};
use crate::snapshot::Snapshot;

/// Attribute used to tag hidden elements for the duration of a clone.
pub const HIDDEN_MARKER: &str = "data-ezycopy-hidden";

/// Elements whose computed style says nothing about visible content.
const STYLELESS_TAGS: &[&str] = &["script", "style", "link", "meta", "noscript", "template", "br", "wbr"];

/// The page the user is looking at.
///
/// Holds the mutable DOM plus the stylesheets found in it. Only
/// [`LiveDocument::snapshot`] touches the tree, and it leaves no trace.
pub struct LiveDocument {
    doc: Document,
    styles: StyleSheet,
    base_url: Option<Url>,
}

impl LiveDocument {
    /// Parses `html` and collects its `<style>` sheets.
    pub fn parse(html: &str, base_url: Option<Url>) -> Self {
        let doc = Document::from(html);
        let sheets: Vec<String> = doc.select("style").iter().map(|style| style.text().to_string()).collect();
        let styles = StyleSheet::from_sources(sheets.iter().map(String::as_str));
        Self { doc, styles, base_url }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Trimmed `<title>` text.
    pub fn title(&self) -> String {
        self.doc.select("head title").text().trim().to_string()
    }

    /// Markup inside `<body>`, untouched by any cleaning.
    pub fn body_html(&self) -> String {
        self.doc.select("body").inner_html().to_string()
    }

    /// Tags hidden elements; the returned guard untags them when dropped.
    pub fn mark_hidden(&mut self) -> HiddenMarks<'_> {
        HiddenMarks::acquire(&self.doc, &self.styles)
    }

    /// Clones the page without its visually hidden elements.
    ///
    /// The markers live on the page only while the clone is taken; they are
    /// removed on every exit path, including a failed clone.
    pub fn snapshot(&mut self) -> Result<Snapshot> {
        let base_url = self.base_url.clone();
        let marks = self.mark_hidden();
        let hidden = marks.count();
        let snapshot = Snapshot::clone_from(marks.doc, base_url)?;
        drop(marks);

        let removed = snapshot.remove_marked(HIDDEN_MARKER);
        debug!(hidden, removed, "took visibility-filtered snapshot");
        Ok(snapshot)
    }

    /// Snapshot plus widget stripping and image protection.
    pub fn cleaned_snapshot(&mut self) -> Result<Snapshot> {
        let mut snapshot = self.snapshot()?;
        let (widgets, wrapped) = snapshot.clean();
        debug!(widgets, wrapped, "cleaned snapshot");
        Ok(snapshot)
    }
}

/// Scoped marking of hidden elements on a live document.
///
/// Acquiring tags every hidden element; dropping removes every tag.
pub struct HiddenMarks<'a> {
    doc: &'a Document,
    count: usize,
}

impl<'a> HiddenMarks<'a> {
    fn acquire(doc: &'a Document, styles: &StyleSheet) -> Self {
        let matches = match_rules(doc, styles);
        let mut count = 0;

        let elements = doc.select("body *");
        for node in elements.nodes() {
            let Some(name) = node.node_name() else {
                continue;
            };
            if STYLELESS_TAGS.iter().any(|tag| name.eq_ignore_ascii_case(tag)) || has_marked_ancestor(node) {
                continue;
            }

            let sel = Selection::from(*node);
            if is_hidden(&sel, matches.get(&node.id).map(Vec::as_slice).unwrap_or_default(), styles) {
                sel.set_attr(HIDDEN_MARKER, "");
                count += 1;
            }
        }

        Self { doc, count }
    }

    /// Number of elements tagged.
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Drop for HiddenMarks<'_> {
    fn drop(&mut self) {
        self.doc.select(&format!("[{HIDDEN_MARKER}]")).remove_attr(HIDDEN_MARKER);
    }
}

/// Maps each element to the indices of the stylesheet rules matching it.
///
/// Indices come out ascending, which is cascade order.
fn match_rules(doc: &Document, styles: &StyleSheet) -> HashMap<NodeId, Vec<usize>> {
    let mut matches: HashMap<NodeId, Vec<usize>> = HashMap::new();
    for (index, rule) in styles.rules.iter().enumerate() {
        let Some(selection) = doc.try_select(&rule.selector) else {
            continue;
        };
        for node in selection.nodes() {
            matches.entry(node.id).or_default().push(index);
        }
    }
    matches
}

fn has_marked_ancestor(node: &NodeRef<'_>) -> bool {
    node.ancestors(None).into_iter().any(|ancestor| Selection::from(ancestor).has_attr(HIDDEN_MARKER))
}

fn is_hidden(sel: &Selection<'_>, rule_indices: &[usize], styles: &StyleSheet) -> bool {
    if sel.has_attr("hidden") {
        return true;
    }

    let mut style = ComputedStyle::default();
    for &index in rule_indices {
        style.apply_rule(&styles.rules[index]);
    }
    if let Some(inline) = sel.attr("style") {
        style.apply_inline(&inline);
    }
    style.is_hidden()
}
