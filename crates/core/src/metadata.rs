use serde_json::Value;

use crate::Document;

/// Author-ish class/id fragments, tried in order.
const BYLINE_PATTERNS: &[&str] = &["byline", "author", "by-author", "writer"];

/// Bylines longer than this are prose, not a name.
const MAX_BYLINE_CHARS: usize = 100;

impl Document {
    /// Extract title with priority fallback:
    /// 1. JSON-LD `headline`
    /// 2. Open Graph `og:title`
    /// 3. Twitter `twitter:title`
    /// 4. Meta `title` / `DC.title`
    /// 5. `<title>` element
    /// 6. First `<h1>` element
    pub fn extract_title(&self) -> Option<String> {
        if let Some(headline) = self.json_ld_str("headline") {
            return Some(headline);
        }

        ["og:title", "twitter:title", "title", "DC.title"]
            .iter()
            .find_map(|name| self.get_meta_content(name))
            .or_else(|| self.title())
            .or_else(|| self.first_text("h1", usize::MAX))
    }

    /// Extract byline with priority fallback:
    /// 1. JSON-LD `author` (string, object or array)
    /// 2. Meta `author` / `article:author` / `DC.creator`
    /// 3. `[rel="author"]` link text
    /// 4. `[itemprop="author"]` text
    /// 5. Class/ID containing "byline", "author" or "writer"
    pub fn extract_byline(&self) -> Option<String> {
        if let Some(name) = self.json_ld_values().iter().find_map(|value| value.get("author").and_then(author_name)) {
            return Some(name);
        }

        if let Some(author) = ["author", "article:author", "DC.creator"]
            .iter()
            .find_map(|name| self.get_meta_content(name))
            .filter(|author| !author.starts_with("http"))
        {
            return Some(author);
        }

        if let Some(author) = ["[rel=\"author\"]", "[itemprop=\"author\"]"]
            .iter()
            .find_map(|selector| self.first_text(selector, MAX_BYLINE_CHARS))
        {
            return Some(author);
        }

        BYLINE_PATTERNS.iter().find_map(|pattern| {
            self.first_text(&format!("[class*=\"{pattern}\"]"), MAX_BYLINE_CHARS)
                .or_else(|| self.first_text(&format!("[id*=\"{pattern}\"]"), MAX_BYLINE_CHARS))
        })
    }

    /// Get meta tag content by name or property attribute
    fn get_meta_content(&self, attr: &str) -> Option<String> {
        ["name", "property"].iter().find_map(|key| {
            self.select(&format!("meta[{key}=\"{attr}\"]"))
                .ok()?
                .first()
                .and_then(|el| el.attr("content"))
                .map(str::trim)
                .filter(|content| !content.is_empty())
                .map(str::to_string)
        })
    }

    /// First non-empty trimmed text among the first few matches.
    fn first_text(&self, selector: &str, max_chars: usize) -> Option<String> {
        self.select(selector).ok()?.iter().take(3).find_map(|el| {
            let text = crate::parse::collapse_whitespace(&el.text());
            (!text.is_empty() && text.chars().count() < max_chars).then_some(text)
        })
    }

    /// Every JSON-LD object on the page, `@graph` members flattened in.
    fn json_ld_values(&self) -> Vec<Value> {
        let mut values = Vec::new();
        let Ok(scripts) = self.select("script[type=\"application/ld+json\"]") else {
            return values;
        };

        for script in scripts {
            let Ok(value) = serde_json::from_str::<Value>(script.text().trim()) else {
                continue;
            };
            let items = match value {
                Value::Array(items) => items,
                other => vec![other],
            };
            for item in items {
                if let Some(Value::Array(graph)) = item.get("@graph") {
                    values.extend(graph.iter().cloned());
                }
                values.push(item);
            }
        }
        values
    }

    fn json_ld_str(&self, key: &str) -> Option<String> {
        self.json_ld_values()
            .iter()
            .find_map(|value| value.get(key).and_then(Value::as_str).map(str::trim).map(str::to_string))
            .filter(|value| !value.is_empty())
    }
}

/// Author name from a JSON-LD `author` field, which may be a string, an
/// object with `name`, or an array of either.
fn author_name(author: &Value) -> Option<String> {
    match author {
        Value::String(name) if !name.trim().is_empty() => Some(name.trim().to_string()),
        Value::Object(obj) => obj.get("name").and_then(author_name),
        Value::Array(items) => items.iter().find_map(author_name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML_WITH_META: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title>Test Page Title</title>
            <meta name="author" content="John Doe">
            <meta property="og:title" content="OG Title">
            <script type="application/ld+json">
            {
                "@context": "https://schema.org",
                "@type": "Article",
                "headline": "JSON-LD Headline",
                "author": {
                    "@type": "Person",
                    "name": "Jane Smith"
                }
            }
            </script>
        </head>
        <body>
            <h1>Main Heading</h1>
            <p>First paragraph.</p>
        </body>
        </html>
    "#;

    const HTML_WITHOUT_META: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head><title>Simple Page</title></head>
        <body><h1>Heading</h1><p>This is a paragraph with some text content.</p></body>
        </html>
    "#;

    #[test]
    fn test_extract_title_from_json_ld() {
        let doc = Document::parse(HTML_WITH_META);
        assert_eq!(doc.extract_title(), Some("JSON-LD Headline".to_string()));
    }

    #[test]
    fn test_extract_title_fallback() {
        let doc = Document::parse(HTML_WITHOUT_META);
        assert_eq!(doc.extract_title(), Some("Simple Page".to_string()));
    }

    #[test]
    fn test_extract_title_from_og_then_h1() {
        let doc = Document::parse(r#"<head><meta property="og:title" content="OG Title"></head><body></body>"#);
        assert_eq!(doc.extract_title(), Some("OG Title".to_string()));

        let doc = Document::parse("<body><h1>  Only a heading </h1></body>");
        assert_eq!(doc.extract_title(), Some("Only a heading".to_string()));
    }

    #[test]
    fn test_extract_byline_from_json_ld() {
        let doc = Document::parse(HTML_WITH_META);
        assert_eq!(doc.extract_byline(), Some("Jane Smith".to_string()));
    }

    #[test]
    fn test_extract_byline_from_meta() {
        let doc = Document::parse(r#"<head><meta name="author" content="John Doe"></head><body></body>"#);
        assert_eq!(doc.extract_byline(), Some("John Doe".to_string()));
    }

    #[test]
    fn test_extract_byline_from_class() {
        let doc = Document::parse(r#"<body><p class="post-byline">By   Ada Lovelace</p><p>Text.</p></body>"#);
        assert_eq!(doc.extract_byline(), Some("By Ada Lovelace".to_string()));
    }

    #[test]
    fn test_extract_byline_array_and_graph() {
        let html = r#"
            <head>
                <script type="application/ld+json">
                {
                    "@context": "https://schema.org",
                    "@graph": [
                        {"@type": "WebSite", "name": "Site"},
                        {"@type": "Article", "author": [{"@type": "Person", "name": "First Author"}, {"name": "Second"}]}
                    ]
                }
                </script>
            </head>
            <body></body>
        "#;
        let doc = Document::parse(html);
        assert_eq!(doc.extract_byline(), Some("First Author".to_string()));
    }

    #[test]
    fn test_missing_byline() {
        let doc = Document::parse(HTML_WITHOUT_META);
        assert_eq!(doc.extract_byline(), None);
    }

    #[test]
    fn test_author_url_is_not_a_byline() {
        let doc = Document::parse(r#"<head><meta property="article:author" content="https://fb.com/x"></head><body></body>"#);
        assert_eq!(doc.extract_byline(), None);
    }
}
