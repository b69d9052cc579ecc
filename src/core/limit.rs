use serde_json::Value;

/// Row cap for a selection: the lesser of the caller's requested size and the
/// campaign's daily limit, or whichever one is set. `None` means unbounded.
///
/// Zero and negative values count as unset on either side.
pub fn effective_limit(requested: Option<i64>, daily_limit: Option<i64>) -> Option<u64> {
    let positive = |v: Option<i64>| v.filter(|n| *n > 0).map(|n| n as u64);

    match (positive(requested), positive(daily_limit)) {
        (Some(r), Some(d)) => Some(r.min(d)),
        (Some(r), None) => Some(r),
        (None, d) => d,
    }
}

/// Reads a requested batch size from a loosely typed request field.
///
/// Integers, integral floats and numeric strings are accepted. Anything else
/// yields `None` and the selection proceeds as if no size had been requested.
pub fn parse_requested_limit(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
