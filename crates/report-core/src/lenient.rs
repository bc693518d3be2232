//! Fail-soft coercion of loosely typed backend JSON.

use serde_json::Value;

/// Coerce a JSON value to a number. Numbers and numeric strings are kept;
/// absent, null, boolean and non-numeric values count as zero.
pub fn number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Coerce a JSON value to a simulation day. Anything below 1 maps to 0,
/// which no projection range accepts.
pub fn day(value: Option<&Value>) -> u32 {
    let v = number(value);
    if v >= 1.0 {
        v.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Opaque identifiers arrive either as strings or as integers.
pub fn opaque_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_and_numeric_strings() {
        assert_eq!(number(Some(&json!(4.5))), 4.5);
        assert_eq!(number(Some(&json!(" 12 "))), 12.0);
        assert_eq!(number(Some(&json!(-3))), -3.0);
    }

    #[test]
    fn everything_else_is_zero() {
        assert_eq!(number(None), 0.0);
        assert_eq!(number(Some(&Value::Null)), 0.0);
        assert_eq!(number(Some(&json!(true))), 0.0);
        assert_eq!(number(Some(&json!("abc"))), 0.0);
        assert_eq!(number(Some(&json!(""))), 0.0);
        assert_eq!(number(Some(&json!("inf"))), 0.0);
        assert_eq!(number(Some(&json!([1, 2]))), 0.0);
        assert_eq!(number(Some(&json!({"v": 1}))), 0.0);
    }

    #[test]
    fn days_below_one_are_zero() {
        assert_eq!(day(Some(&json!(3))), 3);
        assert_eq!(day(Some(&json!(0))), 0);
        assert_eq!(day(Some(&json!(-2))), 0);
        assert_eq!(day(None), 0);
    }

    #[test]
    fn ids_from_strings_or_numbers() {
        assert_eq!(opaque_id(&json!("v1")), Some("v1".to_string()));
        assert_eq!(opaque_id(&json!(7)), Some("7".to_string()));
        assert_eq!(opaque_id(&Value::Null), None);
    }
}
