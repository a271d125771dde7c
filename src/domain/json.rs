use serde_json::Value;

/// Extract a JSON object from raw model output.
///
/// Tolerates fenced blocks (``` / ```json), leading prose, and trailing
/// noise. Anything that does not resolve to a JSON object is rejected;
/// unknown fields inside the object are the caller's business.
pub fn extract_object(raw: &str) -> Option<Value> {
    let candidate = strip_code_fences(raw.trim());

    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        if value.is_object() {
            return Some(value);
        }
    }

    // Model wrapped the object in prose: slice from the first `{` to the
    // matching region's last `}` and retry.
    let start = candidate.find('{')?;
    let end = candidate.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&candidate[start..=end]) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Remove a surrounding markdown code fence, with or without a language tag.
fn strip_code_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line (e.g. "json").
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.rfind("```").map_or(rest, |idx| &rest[..idx]).trim()
}

/// Read a string field, trimmed, treating missing/empty as `None`.
pub fn non_empty_str(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Read a string field with an empty-string default.
pub fn string_or_default(value: &Value, field: &str) -> String {
    non_empty_str(value, field).unwrap_or_default()
}
