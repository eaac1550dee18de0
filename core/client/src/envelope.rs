//! Response envelope handling.
//!
//! The backend wraps payloads as `{code, message, data}`. A `code` of zero is
//! success; any other code is a business error whose message is shown as-is.
//! Older endpoints return the raw payload with no `code` at all.

use serde_json::Value;

use nexushub_common::{Error, Result};

/// Unwrap an envelope, returning the inner `data` (or `null` if absent).
///
/// Payloads without an integer `code` field are returned unchanged.
pub fn unwrap_envelope(payload: Value) -> Result<Value> {
    let Value::Object(mut map) = payload else {
        return Ok(payload);
    };

    let code = match map.get("code").and_then(Value::as_i64) {
        Some(code) => code,
        None => return Ok(Value::Object(map)),
    };

    if code == 0 {
        return Ok(map.remove("data").unwrap_or(Value::Null));
    }

    let message = map
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or("Request failed")
        .to_string();

    Err(Error::Business { code, message })
}

/// Extract a human readable message from an error response body.
pub(crate) fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Err(_) if body.len() <= 200 => Some(body.to_string()),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_returns_data() {
        let data = unwrap_envelope(json!({"code": 0, "message": "success", "data": [1, 2]})).unwrap();
        assert_eq!(data, json!([1, 2]));
    }

    #[test]
    fn test_success_without_data_is_null() {
        let data = unwrap_envelope(json!({"code": 0, "message": "deleted"})).unwrap();
        assert_eq!(data, Value::Null);
    }

    #[test]
    fn test_non_zero_code_is_business_error() {
        let err = unwrap_envelope(json!({"code": 4001, "message": "bucket missing"})).unwrap_err();
        match err {
            Error::Business { code, message } => {
                assert_eq!(code, 4001);
                assert_eq!(message, "bucket missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_legacy_payload_passes_through() {
        let raw = json!({"theme_name": "dark"});
        assert_eq!(unwrap_envelope(raw.clone()).unwrap(), raw);

        let list = json!([{"id": 1}]);
        assert_eq!(unwrap_envelope(list.clone()).unwrap(), list);
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(
            error_detail(r#"{"code": 404, "message": "file not found"}"#).as_deref(),
            Some("file not found")
        );
        assert_eq!(error_detail("  ").as_deref(), None);
        assert_eq!(error_detail("Bad Gateway").as_deref(), Some("Bad Gateway"));
    }
}
