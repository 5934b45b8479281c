//! Parsing of structured model responses.
//!
//! Models drift from the requested JSON shape. Every parser here fails toward
//! the conservative reading: missing or malformed keys mean "nothing
//! relevant" or "zero records", never a guess.

use indexmap::IndexSet;
use serde_json::Value;

/// Read the relevance classifier's answer.
///
/// Returns the relevant attribute names, or an empty list when the model
/// reports no applicable context. `is_context_available` may come back as a
/// boolean or as the strings `"true"`/`"false"`.
pub fn parse_related_attributes(value: &Value) -> Vec<String> {
    let available = match value.get("is_context_available") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    };
    if !available {
        return Vec::new();
    }

    let Some(items) = value.get("related_attributes").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut seen = IndexSet::new();
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Read the record-count judgment. Missing or non-numeric values read as 0.
pub fn parse_required_data_points(value: &Value) -> i64 {
    match value.get("required_data_points") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().map(|f| f.round() as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

/// Clamp a model-proposed record count into `[1, max]`.
pub fn clamp_data_points(n: i64, max: usize) -> usize {
    let max = max.max(1) as i64;
    n.clamp(1, max) as usize
}
