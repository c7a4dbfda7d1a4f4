//! Decoding of model responses.
//!
//! Models are asked for bare JSON and reply with fenced code blocks,
//! explanatory prose, or half of each. Cleanup runs in order: trim, strip a
//! leading/trailing fence pair, and as a last resort isolate the first
//! balanced `{...}` span. Decoding is tolerant — every field has a default —
//! and only a missing *essential* field (one without which no result can be
//! built) fails the extraction.

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use tenderdesk_core::errors::StageError;

/// Strip a leading ```` ``` ````/```` ```json ```` fence and its closing
/// marker, when present.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Find the first balanced `{...}` span, respecting strings and escapes.
pub fn isolate_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Decode one JSON object from a raw model response.
pub fn decode_object(raw: &str) -> Result<Map<String, Value>, StageError> {
    let cleaned = strip_code_fences(raw);

    let value = serde_json::from_str::<Value>(cleaned).or_else(|first_error| {
        isolate_object(cleaned)
            .ok_or_else(|| StageError::ExtractionFailed(first_error.to_string()))
            .and_then(|span| {
                serde_json::from_str::<Value>(span)
                    .map_err(|error| StageError::ExtractionFailed(error.to_string()))
            })
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(StageError::ExtractionFailed(format!(
            "expected a JSON object, got {}",
            value_kind(&other)
        ))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Error for an essential field the decode cannot recover from.
pub fn missing(field: &str) -> StageError {
    StageError::ExtractionFailed(format!("essential field `{field}` is missing or mistyped"))
}

// ---------------------------------------------------------------------------
// Tolerant field readers: absent or mistyped values become defaults.
// ---------------------------------------------------------------------------

pub fn bool_field(map: &Map<String, Value>, key: &str) -> Option<bool> {
    map.get(key).and_then(Value::as_bool)
}

pub fn str_or(map: &Map<String, Value>, key: &str, default: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| default.to_owned())
}

/// Read a 0–100 percentage, clamping out-of-range numbers.
pub fn pct_or(map: &Map<String, Value>, key: &str, default: u8) -> u8 {
    map.get(key)
        .and_then(Value::as_f64)
        .map(|value| value.clamp(0.0, 100.0).round() as u8)
        .unwrap_or(default)
}

pub fn u32_or(map: &Map<String, Value>, key: &str, default: u32) -> u32 {
    map.get(key)
        .and_then(Value::as_u64)
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(default)
}

pub fn decimal_field(map: &Map<String, Value>, key: &str) -> Option<Decimal> {
    match map.get(key)? {
        Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                Some(Decimal::from(value))
            } else {
                number.as_f64().and_then(Decimal::from_f64_retain)
            }
        }
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub fn decimal_or(map: &Map<String, Value>, key: &str, default: Decimal) -> Decimal {
    decimal_field(map, key).unwrap_or(default)
}

/// Read an array of strings, skipping entries of other types.
pub fn string_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|values| {
            values.iter().filter_map(Value::as_str).map(str::to_owned).collect()
        })
        .unwrap_or_default()
}

pub fn object_list<'a>(map: &'a Map<String, Value>, key: &str) -> Vec<&'a Map<String, Value>> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;

    #[test]
    fn fenced_response_round_trips_to_the_bare_json() {
        let bare = r#"{"qualified": true, "priority": "high"}"#;
        let fenced = format!("```json\n{bare}\n```");

        let from_fenced = decode_object(&fenced).expect("decodes");
        let from_bare = decode_object(bare).expect("decodes");
        assert_eq!(from_fenced, from_bare);
    }

    #[test]
    fn untagged_fences_are_stripped_too() {
        let map = decode_object("```\n{\"confidence\": 90}\n```").expect("decodes");
        assert_eq!(map.get("confidence"), Some(&json!(90)));
    }

    #[test]
    fn prose_around_the_object_is_ignored() {
        let raw = "Sure, here is the assessment you asked for:\n\n{\"qualified\": false,\
                   \"reasoning\": \"specs are {out of} range\"}\n\nLet me know if you need more.";
        let map = decode_object(raw).expect("decodes");
        assert_eq!(map.get("qualified"), Some(&json!(false)));
        assert_eq!(map.get("reasoning"), Some(&json!("specs are {out of} range")));
    }

    #[test]
    fn braces_inside_strings_do_not_break_isolation() {
        let span = isolate_object(r#"noise {"a": "b } c", "d": {"e": 1}} trailing"#).expect("span");
        assert_eq!(span, r#"{"a": "b } c", "d": {"e": 1}}"#);
    }

    #[test]
    fn garbage_fails_with_a_typed_error() {
        let error = decode_object("I could not produce JSON this time.").expect_err("must fail");
        assert!(matches!(error, StageError::ExtractionFailed(_)));
    }

    #[test]
    fn non_object_json_is_rejected() {
        let error = decode_object("[1, 2, 3]").expect_err("must fail");
        assert!(error.to_string().contains("an array"));
    }

    #[test]
    fn tolerant_readers_substitute_defaults() {
        let map = decode_object(r#"{"priority": 7, "win": "not-a-number"}"#).expect("decodes");

        assert_eq!(str_or(&map, "priority", "medium"), "medium");
        assert_eq!(pct_or(&map, "win", 75), 75);
        assert_eq!(u32_or(&map, "count", 3), 3);
        assert!(string_list(&map, "factors").is_empty());
    }

    #[test]
    fn percentages_are_clamped() {
        let map = decode_object(r#"{"a": 140, "b": -3, "c": 61.4}"#).expect("decodes");
        assert_eq!(pct_or(&map, "a", 0), 100);
        assert_eq!(pct_or(&map, "b", 0), 0);
        assert_eq!(pct_or(&map, "c", 0), 61);
    }

    #[test]
    fn decimals_decode_from_numbers_and_strings() {
        let map = decode_object(r#"{"bid": 7124.25, "cost": "4830", "count": 12}"#).expect("decodes");
        assert_eq!(decimal_field(&map, "bid"), Some(Decimal::new(712425, 2)));
        assert_eq!(decimal_field(&map, "cost"), Some(Decimal::from(4830)));
        assert_eq!(decimal_field(&map, "count"), Some(Decimal::from(12)));
        assert_eq!(decimal_field(&map, "absent"), None);
    }

    #[test]
    fn string_lists_skip_mixed_entries() {
        let map = decode_object(r#"{"risks": ["late delivery", 42, "thin margin"]}"#).expect("decodes");
        assert_eq!(string_list(&map, "risks"), vec!["late delivery", "thin margin"]);
    }
}
