//! Widget and noise stripper for cloned snapshots.
//!
//! Interactive UI (toolbars, player chrome, rating and share widgets, forms,
//! editable regions) reads as text to an extractor but is never part of the
//! article. Matches are removed unless they hold real prose.

use std::collections::HashSet;
use std::sync::LazyLock;

use dom_query::{Document, NodeId, Selection};
use regex::Regex;

/// ARIA roles of interactive widgets.
pub const WIDGET_ROLES: &[&str] = &[
    "toolbar",
    "menu",
    "menubar",
    "tablist",
    "dialog",
    "alertdialog",
    "slider",
    "progressbar",
    "button",
    "listbox",
    "combobox",
    "switch",
    "tooltip",
    "search",
    "radiogroup",
    "spinbutton",
    "scrollbar",
];

/// Tags that are interactive by themselves.
pub const WIDGET_TAGS: &[&str] = &["form", "button", "input", "select", "textarea", "dialog"];

/// Data attributes that wire an element to page scripts.
pub const INTERACTIVE_DATA_ATTRS: &[&str] =
    &["data-action", "data-toggle", "data-bs-toggle", "data-controller", "data-share", "data-rating"];

/// Own text longer than this (with sentence punctuation) is kept regardless.
pub const PROSE_GUARD_CHARS: usize = 200;

const PROTECTED_TAGS: &[&str] = &["html", "body", "main", "article"];

static WIDGET_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(toolbar|tool-bar|player|video-controls|vjs|jw-controls|ytp|plyr|rating|ratings|stars|star-rating|share|sharing|share-buttons|social-share|social-links|newsletter|subscribe|signup|sign-up|comment-form|carousel-controls|slider-nav)\b",
    )
    .expect("widget class pattern")
});

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]").expect("sentence pattern"));

/// True when `sel` carries any widget signal.
pub fn is_widget(sel: &Selection<'_>) -> bool {
    let Some(tag) = sel.nodes().first().and_then(|node| node.node_name()) else {
        return false;
    };
    let tag = tag.to_ascii_lowercase();

    if PROTECTED_TAGS.contains(&tag.as_str()) {
        return false;
    }
    if WIDGET_TAGS.contains(&tag.as_str()) {
        return true;
    }

    if let Some(role) = sel.attr("role")
        && role.split_whitespace().any(|r| WIDGET_ROLES.contains(&r.to_ascii_lowercase().as_str()))
    {
        return true;
    }

    if let Some(editable) = sel.attr("contenteditable")
        && !editable.trim().eq_ignore_ascii_case("false")
    {
        return true;
    }

    if INTERACTIVE_DATA_ATTRS.iter().any(|attr| sel.has_attr(attr)) {
        return true;
    }

    ["class", "id"]
        .iter()
        .filter_map(|attr| sel.attr(attr))
        .any(|value| WIDGET_CLASS.is_match(&value))
}

/// True when text is long enough and punctuated like sentences.
pub fn looks_like_prose(text: &str) -> bool {
    let text = text.trim();
    text.chars().count() > PROSE_GUARD_CHARS && SENTENCE_END.is_match(text)
}

/// Removes widget elements from `doc`, returning how many were removed.
///
/// Elements inside an already-selected widget are not evaluated separately.
pub fn strip_widgets(doc: &Document) -> usize {
    let mut doomed: HashSet<NodeId> = HashSet::new();
    let mut order = Vec::new();

    let elements = doc.select("body *");
    for node in elements.nodes() {
        if node.ancestors(None).iter().any(|ancestor| doomed.contains(&ancestor.id)) {
            continue;
        }

        let sel = Selection::from(*node);
        if is_widget(&sel) && !looks_like_prose(&sel.text()) {
            doomed.insert(node.id);
            order.push(*node);
        }
    }

    for node in &order {
        node.remove_from_parent();
    }
    order.len()
}
