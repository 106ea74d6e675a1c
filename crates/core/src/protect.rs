//! Figure protection for bare images.
//!
//! Conditional cleaning treats `<figure>` content as protected. Wrapping
//! stray images in one keeps them alive when they sit in link-dense or
//! short-text blocks.

use dom_query::{Document, NodeRef, Selection};

use crate::preprocess::LAZY_SRC_ATTRS;

/// True when both dimensions are present and at most one pixel.
pub fn is_tracking_pixel(width: Option<&str>, height: Option<&str>) -> bool {
    let tiny = |value: Option<&str>| {
        value
            .map(|v| v.trim().trim_end_matches("px").trim())
            .and_then(|v| v.parse::<f64>().ok())
            .is_some_and(|v| v <= 1.0)
    };
    tiny(width) && tiny(height)
}

/// The source a browser would end up loading, lazy attributes included.
fn effective_src(sel: &Selection<'_>) -> Option<String> {
    let usable = |value: &str| {
        let value = value.trim();
        !value.is_empty() && !value.starts_with("data:")
    };

    if let Some(src) = sel.attr("src")
        && usable(&*src)
    {
        return Some(src.trim().to_string());
    }
    LAZY_SRC_ATTRS
        .iter()
        .filter_map(|attr| sel.attr(attr))
        .find(|value| usable(&**value))
        .map(|value| value.trim().to_string())
        .or_else(|| sel.attr("src").map(|src| src.trim().to_string()))
}

pub(crate) fn inside_figure(node: &NodeRef<'_>) -> bool {
    node.ancestors(None)
        .iter()
        .any(|ancestor| ancestor.node_name().is_some_and(|name| name.eq_ignore_ascii_case("figure")))
}

/// Wraps every unprotected content image in `<figure>`.
///
/// Skips images already inside a figure, 1×1 tracking pixels and images
/// whose only source is a data URI. An image inside `<picture>` is wrapped
/// together with its picture element. Returns the number of wraps.
pub fn protect_images(doc: &Document) -> usize {
    let mut wrapped = 0;

    let images = doc.select("img");
    for node in images.nodes() {
        if inside_figure(node) {
            continue;
        }

        let img = Selection::from(*node);
        let width = img.attr("width");
        let height = img.attr("height");
        if is_tracking_pixel(width.as_deref(), height.as_deref()) {
            continue;
        }
        if effective_src(&img).is_some_and(|src| src.starts_with("data:")) {
            continue;
        }

        let target = match node.parent() {
            Some(parent) if parent.node_name().is_some_and(|name| name.eq_ignore_ascii_case("picture")) => {
                Selection::from(parent)
            }
            _ => img,
        };
        let html = target.html();
        target.replace_with_html(format!("<figure>{html}</figure>"));
        wrapped += 1;
    }

    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protect(html: &str) -> (usize, String) {
        let doc = Document::from(html);
        let wrapped = protect_images(&doc);
        (wrapped, doc.select("body").inner_html().to_string())
    }

    #[test]
    fn test_wraps_bare_image() {
        let (wrapped, body) = protect(r#"<body><div><a href="/x"><img src="https://a.co/p.jpg" alt="P"></a></div></body>"#);
        assert_eq!(wrapped, 1);
        assert!(body.contains(r#"<figure><img src="https://a.co/p.jpg" alt="P"></figure>"#));
    }

    #[test]
    fn test_skips_image_already_in_figure() {
        let (wrapped, body) =
            protect(r#"<body><figure><div><img src="https://a.co/p.jpg"></div><figcaption>C</figcaption></figure></body>"#);
        assert_eq!(wrapped, 0);
        assert_eq!(body.matches("<figure>").count(), 1);
    }

    #[test]
    fn test_skips_tracking_pixel() {
        let (wrapped, body) = protect(r#"<body><img src="https://t.co/px.gif" width="1" height="1"></body>"#);
        assert_eq!(wrapped, 0);
        assert!(!body.contains("<figure>"));
    }

    #[test]
    fn test_skips_data_uri() {
        let (wrapped, _) = protect(r#"<body><img src="data:image/png;base64,iVBORw0KGgo="></body>"#);
        assert_eq!(wrapped, 0);
    }

    #[test]
    fn test_lazy_image_with_placeholder_is_wrapped() {
        let (wrapped, _) =
            protect(r#"<body><img src="data:image/gif;base64,R0lGOD" data-src="https://a.co/real.jpg"></body>"#);
        assert_eq!(wrapped, 1);
    }

    #[test]
    fn test_picture_is_wrapped_whole() {
        let (wrapped, body) = protect(
            r#"<body><picture><source srcset="https://a.co/p.webp"><img src="https://a.co/p.jpg"></picture></body>"#,
        );
        assert_eq!(wrapped, 1);
        assert!(body.contains("<figure><picture>"));
    }

    #[test]
    fn test_tracking_pixel_dimensions() {
        assert!(is_tracking_pixel(Some("1"), Some("1")));
        assert!(is_tracking_pixel(Some("0"), Some("1px")));
        assert!(!is_tracking_pixel(Some("1"), None));
        assert!(!is_tracking_pixel(Some("2"), Some("1")));
        assert!(!is_tracking_pixel(Some("auto"), Some("1")));
    }
}
