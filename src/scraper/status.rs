//! Status and configuration value decoding.

use crate::db::Value;

/// Status strings the monitoring views report, and their numeric codes.
const STATUS_SENTINELS: &[(&str, f64)] = &[
    ("YES", 1.0),
    ("NO", 0.0),
    ("UNKNOWN", 2.0),
    ("STARTING", 3.0),
    ("STOPPING", 4.0),
    ("TRUE", 1.0),
    ("FALSE", 0.0),
    ("ACTIVE", 1.0),
    ("ERROR", 0.0),
    ("INITIALIZING", 3.0),
    ("SYNCING", 4.0),
];

/// Configuration strings and their numeric codes.
const CONFIG_SENTINELS: &[(&str, f64)] = &[("overwrite", 1.0), ("normal", 0.0)];

/// Decode a status column.
///
/// Known status strings map to their code, anything else numeric is taken as
/// is. Returns `None` for unrecognized text and `NULL`.
///
/// # Examples
///
/// ```
/// use hana_exporter::db::Value;
/// use hana_exporter::scraper::parse_status;
///
/// assert_eq!(parse_status(&Value::from("ACTIVE")), Some(1.0));
/// assert_eq!(parse_status(&Value::from("42")), Some(42.0));
/// assert_eq!(parse_status(&Value::from("DEGRADED")), None);
/// ```
pub fn parse_status(value: &Value) -> Option<f64> {
    match value {
        Value::Text(text) => lookup(STATUS_SENTINELS, text).or_else(|| value.as_f64()),
        _ => value.as_f64(),
    }
}

/// Decode a configuration value. `NULL` reads as `0`.
pub fn parse_config_string(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Text(text) => lookup(CONFIG_SENTINELS, text).or_else(|| value.as_f64()),
        _ => value.as_f64(),
    }
}

fn lookup(table: &[(&str, f64)], text: &str) -> Option<f64> {
    table.iter().find(|(s, _)| *s == text).map(|(_, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_sentinels() {
        let cases = [
            ("YES", 1.0),
            ("NO", 0.0),
            ("UNKNOWN", 2.0),
            ("STARTING", 3.0),
            ("STOPPING", 4.0),
            ("TRUE", 1.0),
            ("FALSE", 0.0),
            ("ACTIVE", 1.0),
            ("ERROR", 0.0),
            ("INITIALIZING", 3.0),
            ("SYNCING", 4.0),
        ];
        for (text, code) in cases {
            assert_eq!(parse_status(&Value::from(text)), Some(code), "{text}");
        }
    }

    #[test]
    fn test_status_fallbacks() {
        assert_eq!(parse_status(&Value::Int(1)), Some(1.0));
        assert_eq!(parse_status(&Value::from("2.5")), Some(2.5));
        assert_eq!(parse_status(&Value::Null), None);
        // Matching is exact.
        assert_eq!(parse_status(&Value::from("active")), None);
        assert_eq!(parse_status(&Value::from("STOPPED")), None);
    }

    #[test]
    fn test_config_strings() {
        assert_eq!(parse_config_string(&Value::from("overwrite")), Some(1.0));
        assert_eq!(parse_config_string(&Value::from("normal")), Some(0.0));
        assert_eq!(parse_config_string(&Value::from("3")), Some(3.0));
        assert_eq!(parse_config_string(&Value::Null), Some(0.0));
        assert_eq!(parse_config_string(&Value::from("legacy")), None);
    }
}
