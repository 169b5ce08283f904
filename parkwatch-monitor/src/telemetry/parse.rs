//! Lenient numeric parsing for backend readings.
//!
//! Sensors report numbers, numeric strings ("40.4"), strings with units
//! ("3.48 mm/s") or null. Anything that yields no finite leading number
//! is treated as missing, and missing readings evaluate as `0`. Zero is
//! below every threshold, so garbage input can never raise an alarm.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse the leading decimal number of `text`, ignoring trailing units.
pub fn parse_reading(text: &str) -> Option<f64> {
    let text = text.trim();
    let prefix_len = text
        .char_indices()
        .take_while(|(i, c)| {
            c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E') || (*i == 0 && matches!(c, '+' | '-'))
        })
        .count();

    // "1e" or "2." style prefixes are not valid floats; back off until
    // the longest prefix that parses.
    (1..=prefix_len)
        .rev()
        .find_map(|len| text[..len].parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Extract a reading from an arbitrary JSON value.
pub fn reading_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|value| value.is_finite()),
        Value::String(text) => parse_reading(text),
        _ => None,
    }
}

/// Missing or unparsable readings count as zero.
pub fn or_zero(reading: Option<f64>) -> f64 {
    reading.unwrap_or(0.0)
}

/// Serde adapter: accept a number, a numeric string, or null.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(reading_from_value))
}

/// Serde adapter: accept a bool, "true"/"false", 0/1, or null (false).
pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => flag,
        Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

/// Serde adapter: accept a string or a scalar rendered as text.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("6.5", Some(6.5) ; "plain")]
    #[test_case("  40.4 ", Some(40.4) ; "padded")]
    #[test_case("3.48 mm/s", Some(3.48) ; "with units")]
    #[test_case("92%", Some(92.0) ; "percent")]
    #[test_case("-4.25", Some(-4.25) ; "negative")]
    #[test_case("1e3", Some(1000.0) ; "exponent")]
    #[test_case("2e", Some(2.0) ; "dangling exponent")]
    #[test_case("--", None ; "placeholder")]
    #[test_case("", None ; "empty")]
    #[test_case("abc", None ; "text")]
    fn parses_leading_number(input: &str, expected: Option<f64>) {
        assert_eq!(parse_reading(input), expected);
    }

    #[test]
    fn reads_json_values() {
        assert_eq!(reading_from_value(&json!(327.67)), Some(327.67));
        assert_eq!(reading_from_value(&json!("5.5")), Some(5.5));
        assert_eq!(reading_from_value(&json!(null)), None);
        assert_eq!(reading_from_value(&json!(true)), None);
        assert_eq!(reading_from_value(&json!({"v": 1})), None);
    }

    #[test]
    fn missing_reading_is_zero() {
        assert_eq!(or_zero(None), 0.0);
        assert_eq!(or_zero(parse_reading("n/a")), 0.0);
        assert_eq!(or_zero(Some(7.0)), 7.0);
    }

    #[derive(Deserialize)]
    struct Record {
        #[serde(default, deserialize_with = "lenient_f64")]
        vibration: Option<f64>,
        #[serde(default, deserialize_with = "lenient_string")]
        severity: Option<String>,
    }

    #[derive(Deserialize)]
    struct Flag {
        #[serde(default, deserialize_with = "lenient_bool")]
        triggered: bool,
    }

    #[test_case(json!({"triggered": true}), true ; "bool")]
    #[test_case(json!({"triggered": null}), false ; "null")]
    #[test_case(json!({}), false ; "missing")]
    #[test_case(json!({"triggered": "true"}), true ; "string true")]
    #[test_case(json!({"triggered": " TRUE "}), true ; "padded string")]
    #[test_case(json!({"triggered": "false"}), false ; "string false")]
    #[test_case(json!({"triggered": 1}), true ; "one")]
    #[test_case(json!({"triggered": 0}), false ; "zero")]
    fn lenient_bool_reads_flags(input: Value, expected: bool) {
        let flag: Flag = serde_json::from_value(input).unwrap();
        assert_eq!(flag.triggered, expected);
    }

    #[test]
    fn serde_adapters_tolerate_mixed_types() {
        let record: Record =
            serde_json::from_value(json!({"vibration": "6.1", "severity": 3})).unwrap();
        assert_eq!(record.vibration, Some(6.1));
        assert_eq!(record.severity.as_deref(), Some("3"));

        let record: Record = serde_json::from_value(json!({"vibration": "bad"})).unwrap();
        assert_eq!(record.vibration, None);
        assert_eq!(record.severity, None);
    }
}
