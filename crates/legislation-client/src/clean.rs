//! HTML cleanup for API responses
//!
//! Search results carry highlight markup such as
//! `<strong class="tbl_tx_type">민법</strong>` inside titles.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Strip tags, decode entities, and collapse whitespace
pub fn clean_html_tags(text: &str) -> String {
    let without_tags = TAG_RE.replace_all(text, "");
    let decoded = ENTITY_RE.replace_all(&without_tags, |caps: &Captures| {
        decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    WHITESPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Clean every string in a JSON value, recursively
pub fn clean_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(clean_html_tags(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(clean_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, clean_value(value)))
                .collect(),
        ),
        other => other,
    }
}

fn decode_entity(entity: &str) -> Option<String> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        return u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from);
    }
    if let Some(dec) = entity.strip_prefix('#') {
        return dec
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from);
    }
    let decoded = match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "middot" => "·",
        _ => return None,
    };
    Some(decoded.to_string())
}
