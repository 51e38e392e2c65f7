//! HTML rendering of rich-text documents.

use std::fmt::Write as _;

use serde_json::{Map, Value};

use super::sanitize::{comment_label, escape, is_safe_url, language_class, safe_color};
use super::{MAX_DEPTH, children, node_type, str_field};

/// Render a stored description to sanitized HTML.
///
/// Never fails: malformed or unknown nodes become HTML comments and nesting
/// past the depth limit is cut off.
///
/// ```
/// use emporium_core::richtext::render_html;
/// use serde_json::json;
///
/// let doc = json!({"type": "root", "children": [
///     {"type": "paragraph", "children": [{"text": "Hi <there>", "bold": true}]}
/// ]});
/// assert_eq!(render_html(&doc), "<p><strong>Hi &lt;there&gt;</strong></p>");
/// ```
#[must_use]
pub fn render_html(document: &Value) -> String {
    let mut out = String::new();
    match document {
        Value::Null => {}
        Value::String(s) if s.trim().is_empty() => {}
        Value::String(s) => {
            let _ = write!(out, "<p>{}</p>", escape(s));
        }
        Value::Array(nodes) => render_nodes(nodes, 0, &mut out),
        Value::Object(obj) if node_type(obj) == Some("root") => {
            render_nodes(children(obj), 0, &mut out);
        }
        other => render_node(other, 0, &mut out),
    }
    out
}

fn render_nodes(nodes: &[Value], depth: usize, out: &mut String) {
    for node in nodes {
        render_node(node, depth, out);
    }
}

fn render_node(node: &Value, depth: usize, out: &mut String) {
    if depth >= MAX_DEPTH {
        return;
    }
    let Value::Object(obj) = node else {
        out.push_str("<!-- invalid node -->");
        return;
    };

    let kind = node_type(obj);
    if matches!(kind, None | Some("text")) && obj.contains_key("text") {
        render_text(obj, out);
        return;
    }

    let inner = depth + 1;
    match kind {
        Some("paragraph") => wrap("p", obj, inner, out),
        Some("heading") => {
            let level = obj
                .get("level")
                .and_then(Value::as_u64)
                .unwrap_or(2)
                .clamp(1, 6);
            wrap(&format!("h{level}"), obj, inner, out);
        }
        Some("quote") => wrap("blockquote", obj, inner, out),
        Some("list") => {
            let ordered = obj.get("ordered").and_then(Value::as_bool).unwrap_or(false);
            wrap(if ordered { "ol" } else { "ul" }, obj, inner, out);
        }
        Some("list-item") => wrap("li", obj, inner, out),
        Some("code") => {
            let text = super::plain_text_of(children(obj), inner);
            match str_field(obj, "language").and_then(language_class) {
                Some(class) => {
                    let _ = write!(out, "<pre><code class=\"{class}\">{}</code></pre>", escape(&text));
                }
                None => {
                    let _ = write!(out, "<pre><code>{}</code></pre>", escape(&text));
                }
            }
        }
        Some("link") => render_link(obj, inner, out),
        Some("image") => render_image(obj, out),
        Some("line-break") => out.push_str("<br>"),
        Some(other) => {
            let _ = write!(out, "<!-- unsupported node: {} -->", comment_label(other));
        }
        None => out.push_str("<!-- invalid node -->"),
    }
}

fn wrap(tag: &str, obj: &Map<String, Value>, depth: usize, out: &mut String) {
    let _ = write!(out, "<{tag}>");
    render_nodes(children(obj), depth, out);
    let _ = write!(out, "</{tag}>");
}

fn render_link(obj: &Map<String, Value>, depth: usize, out: &mut String) {
    let Some(url) = str_field(obj, "url").filter(|u| is_safe_url(u)) else {
        // Keep the text, drop the anchor.
        render_nodes(children(obj), depth, out);
        return;
    };
    let _ = write!(out, "<a href=\"{}\"", escape(url.trim()));
    if obj.get("new_tab").and_then(Value::as_bool).unwrap_or(false) {
        out.push_str(" target=\"_blank\" rel=\"noopener noreferrer\"");
    }
    out.push('>');
    render_nodes(children(obj), depth, out);
    out.push_str("</a>");
}

fn render_image(obj: &Map<String, Value>, out: &mut String) {
    let Some(src) = str_field(obj, "src").filter(|s| is_safe_url(s)) else {
        out.push_str("<!-- blocked image -->");
        return;
    };
    let alt = str_field(obj, "alt").unwrap_or_default();
    let _ = write!(out, "<img src=\"{}\" alt=\"{}\"", escape(src.trim()), escape(alt));
    for dim in ["width", "height"] {
        if let Some(px) = obj.get(dim).and_then(Value::as_u64).filter(|v| *v > 0) {
            let _ = write!(out, " {dim}=\"{px}\"");
        }
    }
    out.push('>');
}

fn render_text(obj: &Map<String, Value>, out: &mut String) {
    let flag = |key: &str| obj.get(key).and_then(Value::as_bool).unwrap_or(false);
    let mut html = escape(str_field(obj, "text").unwrap_or_default());

    for (key, tag) in [
        ("code", "code"),
        ("bold", "strong"),
        ("italic", "em"),
        ("underline", "u"),
        ("strikethrough", "s"),
    ] {
        if flag(key) {
            html = format!("<{tag}>{html}</{tag}>");
        }
    }

    let mut style = String::new();
    if let Some(color) = str_field(obj, "color").and_then(safe_color) {
        let _ = write!(style, "color: {color};");
    }
    if let Some(color) = str_field(obj, "background").and_then(safe_color) {
        if !style.is_empty() {
            style.push(' ');
        }
        let _ = write!(style, "background-color: {color};");
    }
    if style.is_empty() {
        out.push_str(&html);
    } else {
        let _ = write!(out, "<span style=\"{style}\">{html}</span>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root(children: Value) -> Value {
        json!({"type": "root", "children": children})
    }

    #[test]
    fn test_null_and_legacy_string() {
        assert_eq!(render_html(&Value::Null), "");
        assert_eq!(render_html(&json!("Plain & simple")), "<p>Plain &amp; simple</p>");
    }

    #[test]
    fn test_unknown_node_degrades_to_comment() {
        let doc = root(json!([
            {"type": "carousel", "children": []},
            {"type": "paragraph", "children": [{"text": "after"}]}
        ]));
        assert_eq!(
            render_html(&doc),
            "<!-- unsupported node: carousel --><p>after</p>"
        );
    }

    #[test]
    fn test_unknown_node_name_cannot_close_comment() {
        let doc = root(json!([{"type": "x--><script>alert(1)</script>"}]));
        let html = render_html(&doc);
        assert!(!html.contains("<script>"));
        assert!(html.starts_with("<!-- unsupported node: "));
    }

    #[test]
    fn test_headings_clamp_level() {
        let doc = root(json!([
            {"type": "heading", "level": 9, "children": [{"text": "A"}]},
            {"type": "heading", "children": [{"text": "B"}]}
        ]));
        assert_eq!(render_html(&doc), "<h6>A</h6><h2>B</h2>");
    }

    #[test]
    fn test_text_styles_nest_in_fixed_order() {
        let doc = root(json!([{"type": "paragraph", "children": [
            {"text": "x", "bold": true, "italic": true, "color": "#ff0000"}
        ]}]));
        assert_eq!(
            render_html(&doc),
            "<p><span style=\"color: #ff0000;\"><em><strong>x</strong></em></span></p>"
        );
    }

    #[test]
    fn test_invalid_color_is_dropped() {
        let doc = root(json!([{"type": "paragraph", "children": [
            {"text": "x", "color": "red;position:fixed"}
        ]}]));
        assert_eq!(render_html(&doc), "<p>x</p>");
    }

    #[test]
    fn test_links() {
        let doc = root(json!([{"type": "paragraph", "children": [
            {"type": "link", "url": "https://example.com", "new_tab": true, "children": [{"text": "ok"}]},
            {"type": "link", "url": "javascript:alert(1)", "children": [{"text": "bad"}]}
        ]}]));
        assert_eq!(
            render_html(&doc),
            "<p><a href=\"https://example.com\" target=\"_blank\" rel=\"noopener noreferrer\">ok</a>bad</p>"
        );
    }

    #[test]
    fn test_lists_and_quotes() {
        let doc = root(json!([
            {"type": "list", "ordered": true, "children": [
                {"type": "list-item", "children": [{"text": "one"}]}
            ]},
            {"type": "quote", "children": [{"text": "q"}, {"type": "line-break"}, {"text": "r"}]}
        ]));
        assert_eq!(
            render_html(&doc),
            "<ol><li>one</li></ol><blockquote>q<br>r</blockquote>"
        );
    }

    #[test]
    fn test_code_block_escapes_and_ignores_styles() {
        let doc = root(json!([{"type": "code", "language": "Rust", "children": [
            {"text": "if a < b {", "bold": true}
        ]}]));
        assert_eq!(
            render_html(&doc),
            "<pre><code class=\"language-rust\">if a &lt; b {</code></pre>"
        );
    }

    #[test]
    fn test_images() {
        let doc = root(json!([
            {"type": "image", "src": "/media/a.png", "alt": "A \"quoted\" alt", "width": 640},
            {"type": "image", "src": "javascript:x"}
        ]));
        assert_eq!(
            render_html(&doc),
            "<img src=\"/media/a.png\" alt=\"A &quot;quoted&quot; alt\" width=\"640\"><!-- blocked image -->"
        );
    }

    #[test]
    fn test_non_object_nodes() {
        let doc = root(json!([42, "loose"]));
        assert_eq!(render_html(&doc), "<!-- invalid node --><!-- invalid node -->");
    }

    #[test]
    fn test_depth_limit_truncates() {
        let mut node = json!({"text": "deep"});
        for _ in 0..(MAX_DEPTH + 5) {
            node = json!({"type": "quote", "children": [node]});
        }
        let html = render_html(&node);
        assert!(!html.contains("deep"));
        assert!(html.starts_with("<blockquote>"));
    }
}
