//! Escaping and allow-list checks applied while rendering.

use std::sync::LazyLock;

use regex::Regex;

static HEX_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
        .expect("Invalid regex")
});

static RGB_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^rgba?\(\s*\d{1,3}%?\s*,\s*\d{1,3}%?\s*,\s*\d{1,3}%?\s*(?:,\s*(?:0|1|0?\.\d+|\d{1,3}%)\s*)?\)$",
    )
    .expect("Invalid regex")
});

const NAMED_COLORS: &[&str] = &[
    "black", "white", "red", "green", "blue", "yellow", "orange", "purple", "pink", "brown",
    "gray", "grey", "silver", "gold", "navy", "teal", "maroon", "olive", "lime", "aqua",
    "fuchsia", "cyan", "magenta", "transparent",
];

const MAX_COMMENT_LABEL: usize = 32;

/// Escape text for use in element content and double-quoted attributes.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Return the color normalized for a `style` attribute, or `None` when it is
/// not a hex, `rgb()`/`rgba()`, or named color.
#[must_use]
pub fn safe_color(raw: &str) -> Option<String> {
    let color = raw.trim();
    if HEX_COLOR_RE.is_match(color) || RGB_COLOR_RE.is_match(color) {
        return Some(color.to_ascii_lowercase());
    }
    let lower = color.to_ascii_lowercase();
    NAMED_COLORS.contains(&lower.as_str()).then_some(lower)
}

/// Whether a link or image target may be emitted.
///
/// Absolute `http`, `https`, and `mailto` URLs are allowed, as are
/// site-relative paths and fragment anchors. Protocol-relative URLs are not.
#[must_use]
pub fn is_safe_url(raw: &str) -> bool {
    let candidate = raw.trim();
    if candidate.is_empty() || candidate.chars().any(char::is_control) {
        return false;
    }
    if candidate.starts_with('#') {
        return true;
    }
    if candidate.starts_with('/') {
        return !candidate.starts_with("//") && !candidate.starts_with("/\\");
    }
    url::Url::parse(candidate).is_ok_and(|u| matches!(u.scheme(), "http" | "https" | "mailto"))
}

/// Reduce an arbitrary label to something safe inside an HTML comment.
#[must_use]
pub fn comment_label(raw: &str) -> String {
    let label: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_COMMENT_LABEL)
        .collect();
    if label.is_empty() { "unknown".to_string() } else { label }
}

/// Class attribute value for a code block language, e.g. `language-rust`.
#[must_use]
pub fn language_class(raw: &str) -> Option<String> {
    let lang: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#'))
        .take(MAX_COMMENT_LABEL)
        .collect::<String>()
        .to_ascii_lowercase();
    (!lang.is_empty()).then(|| format!("language-{lang}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_colors() {
        assert_eq!(safe_color("#FFF").as_deref(), Some("#fff"));
        assert!(safe_color("#12345678").is_some());
        assert!(safe_color("rgb(10, 20, 30)").is_some());
        assert!(safe_color("rgba(10,20,30,0.5)").is_some());
        assert_eq!(safe_color(" Red ").as_deref(), Some("red"));
        assert!(safe_color("#12345").is_none());
        assert!(safe_color("red; background: url(x)").is_none());
        assert!(safe_color("expression(alert(1))").is_none());
    }

    #[test]
    fn test_urls() {
        assert!(is_safe_url("https://example.com/a?b=c"));
        assert!(is_safe_url("mailto:shop@example.com"));
        assert!(is_safe_url("/products/red-shirt"));
        assert!(is_safe_url("#details"));
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url("  JavaScript:alert(1)"));
        assert!(!is_safe_url("//evil.example.com"));
        assert!(!is_safe_url("data:text/html;base64,AAAA"));
        assert!(!is_safe_url("java\nscript:alert(1)"));
        assert!(!is_safe_url(""));
    }

    #[test]
    fn test_comment_label_strips_comment_terminators() {
        assert_eq!(comment_label("--><script>"), "--script");
        assert_eq!(comment_label("!!!"), "unknown");
        assert_eq!(comment_label(&"a".repeat(100)).len(), MAX_COMMENT_LABEL);
    }

    #[test]
    fn test_language_class() {
        assert_eq!(language_class("Rust").as_deref(), Some("language-rust"));
        assert_eq!(language_class("c++").as_deref(), Some("language-c++"));
        assert_eq!(language_class("\"><x"), Some("language-x".to_string()));
        assert_eq!(language_class("  "), None);
    }
}
