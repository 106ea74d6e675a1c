//! Markdown cleanup applied after rendering.
//!
//! Every step is a string rewrite. Running [`postprocess_markdown`] on its own
//! output changes nothing.

use std::sync::LazyLock;

use regex::Regex;

/// `[](target)` not preceded by `!`: a link whose image was stripped.
static EMPTY_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(^|[^!\]])\[\s*\]\([^)]*\)").expect("empty link pattern"));

/// `[text](#)`: an anchor-only link, usually a gallery or lightbox trigger.
static ANCHOR_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^!\]])\[([^\[\]]+)\]\(#\)").expect("anchor link pattern"));

/// A line opening with `[` and a number that never closes the bracket,
/// indented or not.
static GALLERY_COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\[\d+[^\]\n]*$\n?").expect("gallery counter pattern"));

static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("blank run pattern"));

static STRAY_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\n(?:---|\*\*\*|___|\* \* \*)\n\n").expect("stray rule pattern"));

/// Replaces until the text stops changing. Matches can overlap a previous
/// replacement, so a single `replace_all` is not enough.
fn replace_until_stable(text: String, re: &Regex, rep: &str) -> String {
    let mut current = text;
    loop {
        let next = re.replace_all(&current, rep);
        if next == current {
            return current;
        }
        current = next.into_owned();
    }
}

/// Cleans rendered Markdown.
///
/// In order:
/// 1. drop empty and anchor-only link remnants left by image stripping
/// 2. drop orphaned gallery counter lines such as `[3 / 12`
/// 3. collapse runs of blank lines to a single blank line
/// 4. drop horizontal rules surrounded by blank lines
/// 5. trim
///
/// Image references are never touched here; see
/// [`strip_images`](crate::images::strip_images).
///
/// ```rust
/// use ezycopy_core::postprocess::postprocess_markdown;
///
/// let md = "See ![x](http://a.co/i.png) here.\n\n\n\nNext.";
/// assert_eq!(postprocess_markdown(md), "See ![x](http://a.co/i.png) here.\n\nNext.");
/// ```
pub fn postprocess_markdown(markdown: &str) -> String {
    let mut result = replace_until_stable(markdown.replace("\r\n", "\n"), &EMPTY_LINK, "${1}");
    result = replace_until_stable(result, &ANCHOR_LINK, "${1}${2}");
    result = GALLERY_COUNTER.replace_all(&result, "").into_owned();
    result = BLANK_RUN.replace_all(&result, "\n\n").into_owned();
    result = replace_until_stable(result, &STRAY_RULE, "\n\n");
    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_collapses_blank_lines_and_keeps_images() {
        let md = "See ![x](http://a.co/i.png) here.\n\n\n\nNext.";
        assert_eq!(postprocess_markdown(md), "See ![x](http://a.co/i.png) here.\n\nNext.");
    }

    #[rstest]
    #[case::stripped_image_link("Before [](#) after", "Before  after")]
    #[case::stripped_image_link_with_target("Text\n\n[](https://a.co/full.jpg)\n\nMore", "Text\n\nMore")]
    #[case::adjacent_remnants("x[](#)[](#)[](#)y", "xy")]
    #[case::anchor_only_link("Open [gallery](#) now", "Open gallery now")]
    #[case::real_link_kept("A [link](https://a.co) here", "A [link](https://a.co) here")]
    #[case::image_kept("![](https://a.co/i.png)", "![](https://a.co/i.png)")]
    fn test_link_remnants(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(postprocess_markdown(input), expected);
    }

    #[test]
    fn test_removes_gallery_counters() {
        let md = "Photo essay\n\n[1 of 12\n\n![a](https://a.co/a.jpg)\n\n[2 / 12\nCaption\n\n[3] Footnote";
        assert_eq!(postprocess_markdown(md), "Photo essay\n\n![a](https://a.co/a.jpg)\n\nCaption\n\n[3] Footnote");
    }

    #[test]
    fn test_removes_indented_gallery_counters() {
        assert_eq!(postprocess_markdown(" \n [3"), "");
        assert_eq!(postprocess_markdown("Text\n\t[4 of 7\nMore"), "Text\nMore");
    }

    #[rstest]
    #[case("One\n\n---\n\nTwo", "One\n\nTwo")]
    #[case("One\n\n* * *\n\n***\n\nTwo", "One\n\nTwo")]
    #[case("One\n---\nTwo", "One\n---\nTwo")]
    fn test_stray_rules(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(postprocess_markdown(input), expected);
    }

    #[test]
    fn test_whitespace_only_lines_count_as_blank() {
        assert_eq!(postprocess_markdown("\n\n  A\n \t\n\n\nB  \n\n"), "A\n\nB");
    }

    #[rstest]
    #[case("See ![x](http://a.co/i.png) here.\n\n\n\nNext.")]
    #[case("[[](#)](https://a.co)\n\n\n[](#)\n\n---\n\n[4 / 5\n\nEnd")]
    #[case("\n\n---\n\n---\n\nBody\n\n---\n\n")]
    #[case("Crlf\r\n\r\n\r\n\r\nLine")]
    #[case(" \n [3")]
    #[case("\t[3*!")]
    #[case("Intro\n\n  [2 / 9\n\nOutro")]
    fn test_idempotent(#[case] input: &str) {
        let once = postprocess_markdown(input);
        assert_eq!(postprocess_markdown(&once), once);
    }
}
