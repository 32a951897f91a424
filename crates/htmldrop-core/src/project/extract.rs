//! Title and description extraction from uploaded HTML.
//!
//! Extraction is regex-based and tolerant of malformed markup.

use crate::config::ProjectConfig;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title(?:\s[^>]*)?>(.*?)</title\s*>").unwrap());

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h[1-6](?:\s[^>]*)?>(.*?)</h[1-6]\s*>").unwrap());

static META_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").unwrap());

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p\s*>").unwrap());

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z]{2,8});").unwrap());

/// Title and description derived from an HTML body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMetadata {
    pub title: String,
    pub description: String,
}

/// Derive display metadata from an HTML document.
///
/// Title: `<title>`, else the first heading, else a placeholder.
/// Description: `<meta name="description">`, else the first paragraph, else a
/// placeholder. The description is cut to a fixed length with `...` appended.
pub fn extract_metadata(html: &str) -> ExtractedMetadata {
    let title = first_text(&TITLE, html)
        .or_else(|| first_text(&HEADING, html))
        .unwrap_or_else(|| ProjectConfig::UNTITLED.to_string());

    let description = meta_description(html)
        .or_else(|| first_text(&PARAGRAPH, html))
        .map(|d| truncate_chars(&d, ProjectConfig::DESCRIPTION_MAX_CHARS))
        .unwrap_or_else(|| ProjectConfig::NO_DESCRIPTION.to_string());

    ExtractedMetadata { title, description }
}

/// Strip tags, decode entities and collapse whitespace.
pub fn clean_text(fragment: &str) -> String {
    let without_tags = TAG.replace_all(fragment, " ");
    let decoded = decode_entities(&without_tags);
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

/// Decode named and numeric character references.
///
/// Unknown names are left as written.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or(body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "laquo" => '«',
        "raquo" => '»',
        _ => return None,
    })
}

fn first_text(pattern: &Regex, html: &str) -> Option<String> {
    pattern
        .captures_iter(html)
        .map(|caps| clean_text(&caps[1]))
        .find(|text| !text.is_empty())
}

fn meta_description(html: &str) -> Option<String> {
    META_TAG.find_iter(html).find_map(|tag| {
        let mut is_description = false;
        let mut content = None;
        for caps in ATTRIBUTE.captures_iter(tag.as_str()) {
            let value = caps.get(2).or(caps.get(3)).map_or("", |m| m.as_str());
            match caps[1].to_ascii_lowercase().as_str() {
                "name" => is_description = value.eq_ignore_ascii_case("description"),
                "content" => content = Some(value.to_string()),
                _ => {}
            }
        }
        if !is_description {
            return None;
        }
        content.map(|c| clean_text(&c)).filter(|c| !c.is_empty())
    })
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_meta_description() {
        let html = r#"<html><head><title> My  Page </title>
            <meta content="A short &amp; sweet page" name="description"></head>
            <body><p>Ignored paragraph</p></body></html>"#;
        let meta = extract_metadata(html);
        assert_eq!(meta.title, "My Page");
        assert_eq!(meta.description, "A short & sweet page");
    }

    #[test]
    fn test_heading_and_paragraph_fallbacks() {
        let html = "<body><h2 class=\"x\">Hello <em>there</em></h2><p></p><p>First real text.</p></body>";
        let meta = extract_metadata(html);
        assert_eq!(meta.title, "Hello there");
        assert_eq!(meta.description, "First real text.");
    }

    #[test]
    fn test_placeholders() {
        let meta = extract_metadata("<div>no structure</div>");
        assert_eq!(meta.title, "Untitled Project");
        assert_eq!(meta.description, "No description");

        let meta = extract_metadata("<title>   </title><pre>not a paragraph</pre>");
        assert_eq!(meta.title, "Untitled Project");
        assert_eq!(meta.description, "No description");
    }

    #[test]
    fn test_description_truncated() {
        let long = "word ".repeat(40);
        let html = format!("<p>{}</p>", long);
        let meta = extract_metadata(&html);
        assert!(meta.description.ends_with("..."));
        assert_eq!(meta.description.trim_end_matches("...").chars().count(), 99);

        let exact = "x".repeat(100);
        let meta = extract_metadata(&format!("<p>{}</p>", exact));
        assert_eq!(meta.description, exact);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#65;&#x42; &quot;c&quot;"), "a <b> AB \"c\"");
        assert_eq!(decode_entities("&bogus; & alone"), "&bogus; & alone");
    }

    #[test]
    fn test_multibyte_truncation() {
        let text = "é".repeat(150);
        let cut = truncate_chars(&text, 100);
        assert_eq!(cut.chars().count(), 103);
    }
}
