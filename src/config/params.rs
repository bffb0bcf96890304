//! Typed extraction from a stage's generic `parameters` map.

use std::collections::HashMap;

/// Extracts a typed parameter, falling back to `default` if the key is
/// absent or doesn't deserialise to `T`.
pub fn extract_param<T>(params: &HashMap<String, serde_json::Value>, key: &str, default: T) -> T
where
    T: serde::de::DeserializeOwned,
{
    params
        .get(key)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_present_and_missing() {
        let mut params = HashMap::new();
        params.insert("threshold".to_string(), json!(3));

        let threshold: i64 = extract_param(&params, "threshold", 0);
        assert_eq!(threshold, 3);

        let missing: i64 = extract_param(&params, "nope", 42);
        assert_eq!(missing, 42);
    }

    #[test]
    fn test_extract_type_mismatch_falls_back_to_default() {
        let mut params = HashMap::new();
        params.insert("threshold".to_string(), json!("not a number"));

        let threshold: i64 = extract_param(&params, "threshold", 7);
        assert_eq!(threshold, 7);
    }
}
