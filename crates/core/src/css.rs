//! Lightweight CSS cascade for visibility.
//!
//! Parses `<style>` sheets and inline `style=""` attributes and tracks only
//! the handful of properties that decide whether an element is painted:
//! `display`, `visibility`, `opacity`, `height`/`max-height` and `overflow`.
//! Conditional at-rules (`@media`, `@supports`, ...) are skipped, and so are
//! selectors that only apply to an interaction state.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Properties that can hide an element.
pub const TRACKED_PROPERTIES: &[&str] =
    &["display", "visibility", "opacity", "height", "max-height", "overflow", "overflow-y"];

const DYNAMIC_PSEUDOS: &[&str] = &[
    ":hover",
    ":focus",
    ":active",
    ":visited",
    ":target",
    ":checked",
    ":focus-within",
    ":focus-visible",
];

/// A single `property: value` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

/// `(ids, classes/attributes/pseudo-classes, types)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity(pub u32, pub u32, pub u32);

/// One selector with the declarations of the rule it came from.
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selector: String,
    pub specificity: Specificity,
    pub order: usize,
    pub declarations: Vec<Declaration>,
}

/// Rules relevant to visibility, sorted by cascade precedence (lowest first).
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    pub rules: Vec<StyleRule>,
}

impl StyleSheet {
    /// Parses and merges several sheets in document order.
    pub fn from_sources<'a>(sources: impl IntoIterator<Item = &'a str>) -> Self {
        let mut sheet = StyleSheet::default();
        for source in sources {
            sheet.append(source);
        }
        sheet.rules.sort_by(|a, b| a.specificity.cmp(&b.specificity).then(a.order.cmp(&b.order)));
        sheet
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn append(&mut self, css: &str) {
        let css = strip_comments(css);
        let mut rest = css.as_str();

        while let Some(open) = rest.find('{') {
            let prelude = rest[..open].trim();
            let Some(close) = matching_brace(rest, open) else {
                break;
            };
            let body = &rest[open + 1..close];
            rest = &rest[close + 1..];

            if prelude.starts_with('@') {
                continue;
            }

            let declarations: Vec<Declaration> = parse_declarations(body)
                .into_iter()
                .filter(|decl| TRACKED_PROPERTIES.contains(&decl.property.as_str()))
                .collect();
            if declarations.is_empty() {
                continue;
            }

            for selector in prelude.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                if is_dynamic(selector) {
                    continue;
                }
                let order = self.rules.len();
                self.rules.push(StyleRule {
                    selector: selector.to_string(),
                    specificity: specificity(selector),
                    order,
                    declarations: declarations.clone(),
                });
            }
        }
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, ch) in text[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_dynamic(selector: &str) -> bool {
    selector.contains("::") || DYNAMIC_PSEUDOS.iter().any(|pseudo| selector.contains(pseudo))
}

/// Parses a declaration block or an inline `style` attribute.
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    block
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let mut value = value.trim().to_ascii_lowercase();
            if property.is_empty() || value.is_empty() {
                return None;
            }

            let important = value.ends_with("!important");
            if important {
                value = value.trim_end_matches("!important").trim().to_string();
            }
            Some(Declaration { property, value, important })
        })
        .collect()
}

/// Approximate selector specificity.
pub fn specificity(selector: &str) -> Specificity {
    let mut spec = Specificity::default();
    let chars: Vec<char> = selector.chars().collect();
    let mut i = 0;
    let mut at_compound_start = true;

    let skip_ident = |i: &mut usize| {
        while *i < chars.len() && (chars[*i].is_alphanumeric() || chars[*i] == '-' || chars[*i] == '_') {
            *i += 1;
        }
    };

    while i < chars.len() {
        match chars[i] {
            '#' => {
                spec.0 += 1;
                i += 1;
                skip_ident(&mut i);
            }
            '.' => {
                spec.1 += 1;
                i += 1;
                skip_ident(&mut i);
            }
            '[' => {
                spec.1 += 1;
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                i += 1;
            }
            ':' => {
                i += 1;
                if i < chars.len() && chars[i] == ':' {
                    spec.2 += 1;
                    i += 1;
                } else {
                    spec.1 += 1;
                }
                skip_ident(&mut i);
                if i < chars.len() && chars[i] == '(' {
                    let mut depth = 0;
                    while i < chars.len() {
                        match chars[i] {
                            '(' => depth += 1,
                            ')' => {
                                depth -= 1;
                                if depth == 0 {
                                    i += 1;
                                    break;
                                }
                            }
                            _ => {}
                        }
                        i += 1;
                    }
                }
            }
            c if c.is_alphabetic() && at_compound_start => {
                spec.2 += 1;
                skip_ident(&mut i);
            }
            _ => i += 1,
        }
        at_compound_start = i == 0 || matches!(chars.get(i.wrapping_sub(1)), Some(' ' | '>' | '+' | '~'));
    }

    spec
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Precedence {
    important: bool,
    inline: bool,
    specificity: Specificity,
    order: usize,
}

/// Cascaded values of the tracked properties for one element.
#[derive(Debug, Clone, Default)]
pub struct ComputedStyle {
    values: HashMap<String, (Precedence, String)>,
}

impl ComputedStyle {
    /// Applies a stylesheet rule's declarations.
    pub fn apply_rule(&mut self, rule: &StyleRule) {
        for decl in &rule.declarations {
            let precedence =
                Precedence { important: decl.important, inline: false, specificity: rule.specificity, order: rule.order };
            self.apply(decl, precedence);
        }
    }

    /// Applies an inline `style` attribute, which beats every non-important rule.
    pub fn apply_inline(&mut self, style: &str) {
        for (order, decl) in parse_declarations(style).iter().enumerate() {
            if !TRACKED_PROPERTIES.contains(&decl.property.as_str()) {
                continue;
            }
            let precedence =
                Precedence { important: decl.important, inline: true, specificity: Specificity::default(), order };
            self.apply(decl, precedence);
        }
    }

    fn apply(&mut self, decl: &Declaration, precedence: Precedence) {
        let replace = match self.values.get(&decl.property) {
            Some((current, _)) => precedence.cmp(current) != Ordering::Less,
            None => true,
        };
        if replace {
            self.values.insert(decl.property.clone(), (precedence, decl.value.clone()));
        }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.values.get(property).map(|(_, value)| value.as_str())
    }

    /// True when the element would not be painted.
    pub fn is_hidden(&self) -> bool {
        if self.get("display") == Some("none") {
            return true;
        }
        if matches!(self.get("visibility"), Some("hidden" | "collapse")) {
            return true;
        }
        if self.get("opacity").and_then(parse_number).is_some_and(|opacity| opacity == 0.0) {
            return true;
        }

        let zero_height = ["height", "max-height"]
            .iter()
            .any(|prop| self.get(prop).and_then(parse_number).is_some_and(|h| h == 0.0));
        let clipped = ["overflow", "overflow-y"]
            .iter()
            .any(|prop| matches!(self.get(prop), Some("hidden" | "clip")));
        zero_height && clipped
    }
}

/// Leading numeric part of a CSS value (`"0px"` -> `0.0`).
fn parse_number(value: &str) -> Option<f64> {
    let end = value
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.' || *c == '-' || *c == '+'))
        .map_or(value.len(), |(i, _)| i);
    value[..end].parse().ok()
}
