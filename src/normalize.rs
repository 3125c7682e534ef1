// Normalizer - maps raw remote rows into canonical Records
//
// Total function: malformed fields degrade to their sentinel, never to an
// error. Upstream serializes integers as decimals ("2023.0"), duplicates the
// status column under a caption with a trailing space, and mixes numbers and
// strings in the monetary column; all of that is absorbed here so the engine
// only ever sees canonical values.

use crate::record::{
    RawRow, Record, COL_ENTITY, COL_ID, COL_PROCESS, COL_REGION, COL_STATUS, COL_STATUS_ALIAS,
    COL_VALUE, COL_YEAR, CANONICAL_COLUMNS, ENTITY_SENTINEL, PROCESS_SENTINEL, REGION_SENTINEL,
    STATUS_SENTINEL, YEAR_SENTINEL,
};
use serde_json::Value;

/// Normalize one raw row. Field rules are independent of each other; applying
/// this to an already-canonical row is a no-op.
pub fn normalize(raw: &RawRow) -> Record {
    let extra = raw
        .iter()
        .filter(|(key, _)| !CANONICAL_COLUMNS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Record {
        id: row_id(raw),
        process_number: label_field(raw, &[COL_PROCESS], PROCESS_SENTINEL),
        entity: categorical_field(raw, &[COL_ENTITY], ENTITY_SENTINEL),
        region: categorical_field(raw, &[COL_REGION], REGION_SENTINEL),
        year: label_field(raw, &[COL_YEAR], YEAR_SENTINEL),
        status: categorical_field(raw, &[COL_STATUS, COL_STATUS_ALIAS], STATUS_SENTINEL),
        transfer_value: monetary_field(raw.get(COL_VALUE)),
        extra,
    }
}

fn row_id(raw: &RawRow) -> i64 {
    match raw.get(COL_ID) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => strip_dot_zero(s.trim()).parse().unwrap_or(0),
        _ => 0,
    }
}

/// Categorical text: first populated source among the aliased captions,
/// trimmed and upper-cased; sentinel when every alias is empty.
fn categorical_field(raw: &RawRow, keys: &[&str], sentinel: &str) -> String {
    first_populated(raw, keys)
        .map(|s| strip_dot_zero(s.trim()).to_uppercase())
        .unwrap_or_else(|| sentinel.to_string())
}

/// Numeric-looking identifier kept as a string label (year, process number):
/// trimmed, `.0` artifact stripped, case preserved.
fn label_field(raw: &RawRow, keys: &[&str], sentinel: &str) -> String {
    first_populated(raw, keys)
        .map(|s| strip_dot_zero(s.trim()).to_string())
        .unwrap_or_else(|| sentinel.to_string())
}

fn first_populated(raw: &RawRow, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match raw.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Monetary value: numbers pass through, strings are scrubbed of stray
/// characters and the `.0` artifact before parsing. Unparseable, non-finite,
/// or negative input degrades to 0.
fn monetary_field(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let scrubbed: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            strip_dot_zero(&scrubbed).parse().unwrap_or(0.0)
        }
        _ => 0.0,
    };

    if parsed.is_finite() && parsed > 0.0 {
        parsed
    } else {
        0.0
    }
}

/// Strip the trailing ".0" the upstream sheet appends to integer cells.
fn strip_dot_zero(s: &str) -> &str {
    s.strip_suffix(".0").unwrap_or(s)
}

// ============================================================================
// TESTS
// ============================================================================
