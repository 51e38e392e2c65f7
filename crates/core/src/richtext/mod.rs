//! Rich-text product descriptions.
//!
//! Descriptions are stored as a JSON node tree:
//!
//! ```json
//! {"type": "root", "children": [
//!   {"type": "heading", "level": 2, "children": [{"text": "Care"}]},
//!   {"type": "paragraph", "children": [
//!     {"text": "Wash ", "bold": true},
//!     {"type": "link", "url": "/care", "children": [{"text": "cold"}]}
//!   ]}
//! ]}
//! ```
//!
//! Element nodes carry a `type` and `children`; text leaves carry `text` plus
//! optional style flags (`bold`, `italic`, `underline`, `strikethrough`,
//! `code`) and `color` / `background`. A bare top-level array is accepted as
//! the root's children, and a plain string is treated as a single paragraph.

mod html;
mod sanitize;

pub use html::render_html;
pub use sanitize::{escape, is_safe_url, safe_color};

use serde_json::{Map, Value};
use thiserror::Error;

/// Nesting below this depth is not rendered.
pub const MAX_DEPTH: usize = 32;

const ELEMENT_TYPES: &[&str] = &[
    "root",
    "paragraph",
    "heading",
    "quote",
    "list",
    "list-item",
    "code",
    "link",
    "image",
    "line-break",
];

const BLOCK_TYPES: &[&str] = &["paragraph", "heading", "quote", "list", "list-item", "code"];

/// Why a document was refused on write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RichTextError {
    #[error("must be a rich-text document, a list of nodes, or a string")]
    InvalidRoot,
    #[error("nodes may be nested at most {MAX_DEPTH} levels deep")]
    TooDeep,
    #[error("node at {path} must be an object")]
    InvalidNode { path: String },
    #[error("unknown node type {kind:?} at {path}")]
    UnknownType { path: String, kind: String },
}

/// Check a document before it is stored.
///
/// Rendering tolerates anything, but writes are held to the node schema so
/// stored descriptions stay editable.
///
/// # Errors
///
/// Returns the first structural problem found.
pub fn validate_document(document: &Value) -> Result<(), RichTextError> {
    match document {
        Value::Null | Value::String(_) => Ok(()),
        Value::Array(nodes) => validate_nodes(nodes, 1, "children"),
        Value::Object(obj) if node_type(obj) == Some("root") => {
            validate_nodes(children(obj), 1, "children")
        }
        _ => Err(RichTextError::InvalidRoot),
    }
}

fn validate_nodes(nodes: &[Value], depth: usize, path: &str) -> Result<(), RichTextError> {
    if depth > MAX_DEPTH {
        return Err(RichTextError::TooDeep);
    }
    for (i, node) in nodes.iter().enumerate() {
        let here = format!("{path}[{i}]");
        let Value::Object(obj) = node else {
            return Err(RichTextError::InvalidNode { path: here });
        };
        match node_type(obj) {
            None | Some("text") if obj.contains_key("text") => {}
            Some(kind) if ELEMENT_TYPES.contains(&kind) && kind != "root" => {
                validate_nodes(children(obj), depth + 1, &format!("{here}.children"))?;
            }
            Some(kind) => {
                return Err(RichTextError::UnknownType {
                    path: here,
                    kind: kind.to_string(),
                });
            }
            None => return Err(RichTextError::InvalidNode { path: here }),
        }
    }
    Ok(())
}

/// Extract readable text, one line per block element.
#[must_use]
pub fn to_plain_text(document: &Value) -> String {
    let raw = match document {
        Value::String(s) => s.clone(),
        Value::Array(nodes) => plain_text_of(nodes, 0),
        Value::Object(obj) if node_type(obj) == Some("root") => plain_text_of(children(obj), 0),
        Value::Object(_) => plain_text_of(std::slice::from_ref(document), 0),
        _ => String::new(),
    };
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Plain text truncated to `max_chars` on a word boundary, with an ellipsis
/// when anything was cut.
#[must_use]
pub fn summarize(document: &Value, max_chars: usize) -> String {
    let text = to_plain_text(document).split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= max_chars {
        return text;
    }
    let cut: String = text.chars().take(max_chars).collect();
    let trimmed = cut
        .rsplit_once(' ')
        .map_or(cut.as_str(), |(head, _)| head)
        .trim_end_matches(|c: char| c.is_ascii_punctuation());
    format!("{trimmed}…")
}

pub(crate) fn plain_text_of(nodes: &[Value], depth: usize) -> String {
    let mut out = String::new();
    collect_text(nodes, depth, &mut out);
    out
}

fn collect_text(nodes: &[Value], depth: usize, out: &mut String) {
    if depth >= MAX_DEPTH {
        return;
    }
    for node in nodes {
        let Value::Object(obj) = node else { continue };
        match node_type(obj) {
            None | Some("text") => {
                if let Some(text) = str_field(obj, "text") {
                    out.push_str(text);
                }
            }
            Some("line-break") => out.push('\n'),
            Some("image") => {}
            Some(kind) => {
                collect_text(children(obj), depth + 1, out);
                if BLOCK_TYPES.contains(&kind) {
                    out.push('\n');
                }
            }
        }
    }
}

fn node_type(obj: &Map<String, Value>) -> Option<&str> {
    str_field(obj, "type")
}

fn children(obj: &Map<String, Value>) -> &[Value] {
    obj.get("children")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({"type": "root", "children": [
            {"type": "heading", "children": [{"text": "Care"}]},
            {"type": "paragraph", "children": [
                {"text": "Wash "},
                {"type": "link", "url": "/care", "children": [{"text": "cold"}]},
                {"text": " only."}
            ]},
            {"type": "image", "src": "/a.png"}
        ]})
    }

    #[test]
    fn test_plain_text_lines() {
        assert_eq!(to_plain_text(&sample()), "Care\nWash cold only.");
        assert_eq!(to_plain_text(&Value::Null), "");
        assert_eq!(to_plain_text(&json!("  legacy ")), "legacy");
    }

    #[test]
    fn test_summarize_cuts_on_word_boundary() {
        assert_eq!(summarize(&sample(), 100), "Care Wash cold only.");
        assert_eq!(summarize(&sample(), 12), "Care Wash…");
    }

    #[test]
    fn test_validate_accepts_known_shapes() {
        assert!(validate_document(&sample()).is_ok());
        assert!(validate_document(&Value::Null).is_ok());
        assert!(validate_document(&json!("text")).is_ok());
        assert!(validate_document(&json!([{"text": "x"}])).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        assert_eq!(validate_document(&json!(5)), Err(RichTextError::InvalidRoot));
        assert!(matches!(
            validate_document(&json!([{"type": "carousel"}])),
            Err(RichTextError::UnknownType { .. })
        ));
        assert!(matches!(
            validate_document(&json!([1])),
            Err(RichTextError::InvalidNode { .. })
        ));

        let mut node = json!({"text": "deep"});
        for _ in 0..=MAX_DEPTH {
            node = json!({"type": "quote", "children": [node]});
        }
        assert_eq!(validate_document(&json!([node])), Err(RichTextError::TooDeep));
    }
}
