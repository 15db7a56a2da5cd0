//! Recovery of a JSON value from whatever the model actually sent back.
//!
//! Strategies run from strict to permissive and the first one that yields a
//! value wins:
//!
//! 1. direct parse once conversational filler is stripped
//! 2. the first fenced ```json block holding an object
//! 3. brace-matched extraction, closing truncated output
//! 4. field-by-field extraction from broken JSON
//! 5. every brace span without nesting, first that parses

use crate::error::{AnalysisError, Result};
use crate::util::{static_regex, truncate_str};
use serde_json::{Map, Value};

/// Longest reply excerpt carried by an unrecoverable-response error.
const PREVIEW_CHARS: usize = 200;

const STRING_FIELDS: &[&str] = &["summary", "mermaid_code"];
const LIST_FIELDS: &[&str] = &["detected_issues", "fix_recommendations"];

static_regex!(
    polite_opener,
    r"(?i)^(?:sure|certainly|of course|okay|absolutely)\b[,.!]?\s*"
);
static_regex!(
    reply_intro,
    r"(?i)^(?:here is|here's|here’s|here are|i'll|i will|let me)\b[^{\[\n`]*[:\n]?\s*"
);
static_regex!(
    polite_closer,
    r"(?is)[.!]?\s*(?:is there anything else|let me know|hope this helps|feel free to)[^{}]*$"
);
static_regex!(fenced_object, r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```");
static_regex!(trailing_comma, r",\s*([}\]])");
static_regex!(dangling_comma, r",\s*$");
static_regex!(
    string_field,
    r#"(?s)"(summary|mermaid_code)"\s*:\s*"((?:[^"\\]|\\.)*)(?:"|\\?\z)"#
);
static_regex!(
    list_field_start,
    r#""(detected_issues|fix_recommendations)"\s*:\s*\["#
);
static_regex!(flat_object, r"\{[^{}]*\}");

/// Recover a JSON value from a raw model reply.
pub fn recover(reply: &str) -> Result<Value> {
    let cleaned = strip_conversation(reply);

    if let Ok(value) = serde_json::from_str::<Value>(strip_markdown_fences(&cleaned)) {
        return Ok(value);
    }
    if let Some(value) = from_fenced_block(&cleaned) {
        log::debug!("Recovered JSON from fenced block");
        return Ok(value);
    }
    if let Some(value) = from_balanced_braces(&cleaned) {
        log::debug!("Recovered JSON by brace matching");
        return Ok(value);
    }
    let candidate = cleaned.find('{').map_or(cleaned.as_str(), |i| &cleaned[i..]);
    if let Some(value) = extract_fields(candidate) {
        log::debug!("Recovered JSON by field extraction");
        return Ok(value);
    }
    if let Some(value) = first_flat_object(&cleaned) {
        log::debug!("Recovered JSON by candidate scan");
        return Ok(value);
    }

    Err(AnalysisError::UnrecoverableResponse {
        preview: truncate_str(reply, PREVIEW_CHARS).to_string(),
    })
}

/// Strip conversational openers ("Sure, here is your analysis:") and closers
/// ("Let me know if...") around the payload.
pub fn strip_conversation(reply: &str) -> String {
    let mut text = reply.trim();
    loop {
        let before = text.len();
        for re in [polite_opener(), reply_intro()] {
            if let Some(m) = re.find(text) {
                text = text[m.end()..].trim_start();
            }
        }
        if text.len() == before {
            break;
        }
    }

    if let Some(m) = polite_closer().find(text) {
        let head = text[..m.start()].trim_end();
        if head.ends_with(['}', ']', '`']) {
            text = head;
        }
    }
    text.to_string()
}

/// Strip markdown code fences wrapping the whole text
fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let clean = clean.strip_suffix("```").unwrap_or(clean);
    clean.trim()
}

fn from_fenced_block(text: &str) -> Option<Value> {
    let caps = fenced_object().captures(text)?;
    parse_lenient(&caps[1])
}

/// Parse as-is, then once more after [`fix_json_issues`].
fn parse_lenient(text: &str) -> Option<Value> {
    serde_json::from_str(text)
        .ok()
        .or_else(|| serde_json::from_str(&fix_json_issues(text)).ok())
}

/// Try to fix common JSON issues from LLM responses: raw control characters
/// inside strings and trailing commas.
pub fn fix_json_issues(json: &str) -> String {
    let escaped = escape_control_chars(json);
    let fixed = trailing_comma().replace_all(&escaped, "$1");
    dangling_comma().replace(&fixed, "").into_owned()
}

fn escape_control_chars(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            } else if c.is_control() {
                match c {
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    other => out.push_str(&format!("\\u{:04x}", other as u32)),
                }
                continue;
            }
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════
//  BRACE MATCHING
// ═══════════════════════════════════════════════════════════════════════════

/// What an open string literal is doing in its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringRole {
    Key,
    ObjectValue,
    ArrayElement,
}

#[derive(Debug, PartialEq, Eq)]
enum Extracted<'a> {
    Complete(&'a str),
    /// Output ended before the object closed; closed off here.
    Truncated(String),
}

fn from_balanced_braces(text: &str) -> Option<Value> {
    match extract_balanced_object(text)? {
        Extracted::Complete(slice) => parse_lenient(slice),
        Extracted::Truncated(repaired) => parse_lenient(&repaired),
    }
}

/// Scan from the first `{` to its matching `}`, honoring strings and escapes.
/// Truncated input is closed: an open value string is terminated, an open
/// key or element is dropped, then missing brackets are appended.
fn extract_balanced_object(text: &str) -> Option<Extracted<'_>> {
    let start = text.find('{')?;
    let body = &text[start..];

    let mut closers: Vec<char> = Vec::new();
    let mut open_string: Option<(StringRole, usize)> = None;
    let mut last_closed: Option<(StringRole, usize)> = None;
    let mut escaped = false;
    let mut last_significant = ' ';

    for (i, c) in body.char_indices() {
        if let Some((role, opened_at)) = open_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                open_string = None;
                last_closed = Some((role, opened_at));
                last_significant = '"';
            }
            continue;
        }

        match c {
            '"' => {
                let role = match closers.last() {
                    Some(']') => StringRole::ArrayElement,
                    _ if last_significant == ':' => StringRole::ObjectValue,
                    _ => StringRole::Key,
                };
                open_string = Some((role, i));
            }
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                if closers.pop() != Some(c) {
                    return None;
                }
                if closers.is_empty() {
                    return Some(Extracted::Complete(&body[..=i]));
                }
            }
            _ => {}
        }
        if !c.is_whitespace() {
            last_significant = c;
        }
    }

    let mut repaired = body.to_string();
    if let Some((role, opened_at)) = open_string {
        match role {
            StringRole::ObjectValue => {
                if escaped {
                    repaired.pop();
                }
                repaired.push('"');
            }
            StringRole::Key | StringRole::ArrayElement => repaired.truncate(opened_at),
        }
        last_closed = None;
    }

    loop {
        let trimmed_len = repaired.trim_end().len();
        repaired.truncate(trimmed_len);
        if repaired.ends_with(',') || repaired.ends_with(':') {
            repaired.pop();
            continue;
        }
        // A key left without its value.
        if let Some((StringRole::Key, opened_at)) = last_closed.take() {
            if repaired.ends_with('"') && closers.last() == Some(&'}') {
                repaired.truncate(opened_at);
                continue;
            }
        }
        break;
    }

    repaired.extend(closers.iter().rev());
    Some(Extracted::Truncated(repaired))
}

// ═══════════════════════════════════════════════════════════════════════════
//  FIELD EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════

/// Pull the known fields out of JSON too broken to parse. Needs `summary`.
fn extract_fields(text: &str) -> Option<Value> {
    let mut object = Map::new();

    for caps in string_field().captures_iter(text) {
        let name = &caps[1];
        if !object.contains_key(name) {
            object.insert(name.to_string(), Value::String(unescape(&caps[2])));
        }
    }
    if !object.contains_key("summary") {
        return None;
    }

    for caps in list_field_start().captures_iter(text) {
        let name = &caps[1];
        if object.contains_key(name) {
            continue;
        }
        let Some(whole) = caps.get(0) else { continue };
        let items = complete_string_elements(&text[whole.end()..])
            .into_iter()
            .map(Value::String)
            .collect();
        object.insert(name.to_string(), Value::Array(items));
    }

    debug_assert!(object
        .keys()
        .all(|k| STRING_FIELDS.contains(&k.as_str()) || LIST_FIELDS.contains(&k.as_str())));
    Some(Value::Object(object))
}

/// Collect string literals from the inside of an array until `]` or until the
/// text runs out. A literal cut off by the end of text is dropped.
fn complete_string_elements(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut chars = text.char_indices();

    while let Some((start, c)) = chars.next() {
        match c {
            ']' => break,
            '"' => {
                let mut escaped = false;
                let mut end = None;
                for (i, c) in chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == '"' {
                        end = Some(i);
                        break;
                    }
                }
                match end {
                    Some(end) => items.push(unescape(&text[start + 1..end])),
                    None => break,
                }
            }
            _ => {}
        }
    }
    items
}

/// Decode JSON string escapes, tolerating raw control characters and bad
/// escape sequences.
fn unescape(raw: &str) -> String {
    if let Ok(s) = serde_json::from_str::<String>(&format!("\"{}\"", raw)) {
        return s;
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => {}
        }
    }
    out
}

fn first_flat_object(text: &str) -> Option<Value> {
    flat_object()
        .find_iter(text)
        .find_map(|m| parse_lenient(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "summary": "A web app with a REST backend.",
            "mermaid_code": "sequenceDiagram\n    participant U\n    U->>API: GET",
            "detected_issues": ["No caching", "Single database"],
            "fix_recommendations": ["Add Redis"]
        })
    }

    #[test]
    fn test_valid_json_is_returned_unchanged() {
        let text = serde_json::to_string_pretty(&sample()).unwrap();
        assert_eq!(recover(&text).unwrap(), sample());
    }

    #[test]
    fn test_non_object_json_is_returned_as_is() {
        assert_eq!(recover("\"not an object\"").unwrap(), json!("not an object"));
    }

    #[test]
    fn test_conversational_prefix_and_fence() {
        let reply = format!(
            "Sure, here is your analysis:\n```json\n{}\n```\nLet me know if you need anything else!",
            serde_json::to_string_pretty(&sample()).unwrap()
        );
        assert_eq!(recover(&reply).unwrap(), sample());
    }

    #[test]
    fn test_fence_in_the_middle_of_prose() {
        let reply = "The architecture is simple.\n\n```\n{\"summary\": \"ok\"}\n```\n\nThat is all.";
        assert_eq!(recover(reply).unwrap(), json!({"summary": "ok"}));
    }

    #[test]
    fn test_strip_conversation() {
        assert_eq!(strip_conversation("Of course! Here's the JSON:\n{}"), "{}");
        assert_eq!(strip_conversation("I'll analyze it.\n{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(
            strip_conversation("{\"a\": 1}\n\nHope this helps."),
            "{\"a\": 1}"
        );
        assert_eq!(strip_conversation("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_closer_inside_truncated_json_is_kept() {
        let reply = "{\"summary\": \"Ask them to let me know";
        assert_eq!(strip_conversation(reply), reply);
    }

    #[test]
    fn test_brace_matching_skips_prose_and_braces_in_strings() {
        let reply = "Result follows {\"summary\": \"uses {templates} and \\\"quotes\\\"\"} trailing";
        assert_eq!(
            recover(reply).unwrap(),
            json!({"summary": "uses {templates} and \"quotes\""})
        );
    }

    #[test]
    fn test_truncated_mid_array_keeps_complete_elements() {
        let reply = r#"{"summary": "Monolith with workers.", "mermaid_code": "sequenceDiagram\n    A->>B: job", "detected_issues": ["No retries", "Shared state", "Unbounded qu"#;
        let value = recover(reply).unwrap();
        assert_eq!(value["summary"], "Monolith with workers.");
        assert_eq!(value["mermaid_code"], "sequenceDiagram\n    A->>B: job");
        assert_eq!(value["detected_issues"], json!(["No retries", "Shared state"]));
    }

    #[test]
    fn test_truncated_inside_value_string_is_closed() {
        let value = recover(r#"{"summary": "Cut off here"#).unwrap();
        assert_eq!(value, json!({"summary": "Cut off here"}));
    }

    #[test]
    fn test_truncated_after_key_drops_it() {
        let value = recover(r#"{"summary": "s", "mermaid_code":"#).unwrap();
        assert_eq!(value, json!({"summary": "s"}));
        let value = recover(r#"{"summary": "s", "mermaid_code""#).unwrap();
        assert_eq!(value, json!({"summary": "s"}));
    }

    #[test]
    fn test_trailing_commas_and_raw_newlines_are_repaired() {
        let reply = "{\"summary\": \"line one\nline two\", \"detected_issues\": [\"a\",],}";
        let value = recover(reply).unwrap();
        assert_eq!(value["summary"], "line one\nline two");
        assert_eq!(value["detected_issues"], json!(["a"]));
    }

    #[test]
    fn test_manual_extraction_from_broken_json() {
        let reply = r#"{"summary": "Broken \"but\" useful", "mermaid_code": "graph TD\nA-->B", "detected_issues": ["x", oops, "y"], "fix_recommendations": [}"#;
        let value = extract_fields(reply).unwrap();
        assert_eq!(value["summary"], "Broken \"but\" useful");
        assert_eq!(value["mermaid_code"], "graph TD\nA-->B");
        assert_eq!(value["detected_issues"], json!(["x", "y"]));
        assert_eq!(value["fix_recommendations"], json!([]));
        assert_eq!(recover(reply).unwrap(), value);
    }

    #[test]
    fn test_manual_extraction_requires_summary() {
        assert!(extract_fields(r#"{"mermaid_code": "x", "detected_issues": ["a"]"#).is_none());
    }

    #[test]
    fn test_complete_string_elements_drops_cut_literal() {
        assert_eq!(
            complete_string_elements(r#" "a", "b \"q\"", "unfinish"#),
            vec!["a".to_string(), "b \"q\"".to_string()]
        );
        assert_eq!(
            complete_string_elements(r#""a"], "other": ["b"]"#),
            vec!["a".to_string()]
        );
    }

    #[test]
    fn test_brute_force_scan_finds_flat_object() {
        let reply = "Broken { outer: [ {\"status\": \"partial\",} ";
        assert_eq!(recover(reply).unwrap(), json!({"status": "partial"}));
    }

    #[test]
    fn test_unrecoverable_reply_has_bounded_preview() {
        let reply = "I could not analyze this repository. ".repeat(20);
        match recover(&reply) {
            Err(AnalysisError::UnrecoverableResponse { preview }) => {
                assert!(preview.chars().count() <= PREVIEW_CHARS);
                assert!(preview.starts_with("I could not"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_extract_balanced_object_complete_slice() {
        assert_eq!(
            extract_balanced_object("x {\"a\": [1, {\"b\": 2}]} y"),
            Some(Extracted::Complete("{\"a\": [1, {\"b\": 2}]}"))
        );
        assert_eq!(extract_balanced_object("no braces"), None);
        assert_eq!(extract_balanced_object("{\"a\": ]"), None);
    }

    #[test]
    fn test_fix_json_issues() {
        assert_eq!(fix_json_issues("[1, 2, ]"), "[1, 2]");
        assert_eq!(fix_json_issues("{\"a\": \"x\ty\"}"), "{\"a\": \"x\\ty\"}");
    }
}
