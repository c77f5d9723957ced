//! Response envelope handling.
//!
//! Success: `{ "success": true, "data": ... }`.
//! Failure: `{ "success": false, "error": { "code", "message", "details"? } }`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, GENERIC_ERROR_MESSAGE};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

/// Code used when a failed response carries no error envelope.
pub const HTTP_ERROR_CODE: &str = "HTTP_ERROR";

/// Turn a raw HTTP response into the payload or a normalized [`ApiError`].
///
/// A successful body without a `data` member is returned whole. Top-level
/// fields beside an object `data` are folded into it unless `data` already
/// has them.
pub fn unwrap_response(status: u16, body: &str) -> Result<Value, ApiError> {
    let parsed: Option<Value> = if body.trim().is_empty() {
        Some(Value::Null)
    } else {
        serde_json::from_str(body).ok()
    };
    let ok = (200..300).contains(&status);

    let Some(mut value) = parsed else {
        return if ok {
            Err(ApiError::Decode(format!("non-JSON response body (status {status})")))
        } else {
            Err(http_error(status))
        };
    };

    if let Some(error) = value.get_mut("error").map(Value::take).filter(Value::is_object) {
        let failed = !ok || value.get("success").and_then(Value::as_bool) == Some(false);
        if failed {
            return Err(server_error(status, error));
        }
    }

    if !ok {
        return Err(http_error(status));
    }

    let Value::Object(mut fields) = value else {
        return Ok(value);
    };
    let Some(data) = fields.remove("data") else {
        return Ok(Value::Object(fields));
    };
    Ok(match data {
        Value::Object(mut data) => {
            for (key, field) in fields {
                if !ENVELOPE_KEYS.contains(&key.as_str()) && !data.contains_key(&key) {
                    data.insert(key, field);
                }
            }
            Value::Object(data)
        }
        other => other,
    })
}

const ENVELOPE_KEYS: [&str; 3] = ["success", "data", "error"];

fn server_error(status: u16, error: Value) -> ApiError {
    let body: ErrorBody = serde_json::from_value(error).unwrap_or(ErrorBody {
        code: None,
        message: None,
        details: None,
    });
    ApiError::Server {
        status,
        code: body.code.unwrap_or_else(|| HTTP_ERROR_CODE.to_string()),
        message: body
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
        details: body.details,
    }
}

fn http_error(status: u16) -> ApiError {
    ApiError::Server {
        status,
        code: HTTP_ERROR_CODE.to_string(),
        message: GENERIC_ERROR_MESSAGE.to_string(),
        details: None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn success_returns_data() {
        let body = json!({"success": true, "data": {"locations": []}}).to_string();
        assert_eq!(unwrap_response(200, &body).unwrap(), json!({"locations": []}));
    }

    #[test]
    fn success_without_data_returns_body() {
        let body = json!({"session_token": "abc"}).to_string();
        assert_eq!(unwrap_response(200, &body).unwrap()["session_token"], "abc");
    }

    #[test]
    fn sibling_fields_fold_into_data() {
        let body = json!({
            "success": true,
            "session_token": "top",
            "message": "sent",
            "data": {"expires_in": 300, "message": "kept"}
        })
        .to_string();
        assert_eq!(
            unwrap_response(200, &body).unwrap(),
            json!({"expires_in": 300, "message": "kept", "session_token": "top"})
        );
    }

    #[test]
    fn non_object_data_is_returned_as_is() {
        let body = json!({"success": true, "extra": 1, "data": [1, 2]}).to_string();
        assert_eq!(unwrap_response(200, &body).unwrap(), json!([1, 2]));
    }

    #[test]
    fn empty_body_is_null() {
        assert_eq!(unwrap_response(204, "").unwrap(), Value::Null);
    }

    #[test]
    fn error_envelope_is_normalized() {
        let body = json!({
            "success": false,
            "error": {"code": "CONTENT_BLOCKED", "message": "Not allowed", "details": {"reason": "phone"}}
        })
        .to_string();
        let err = unwrap_response(400, &body).unwrap_err();
        assert_eq!(err.code(), Some("CONTENT_BLOCKED"));
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.user_message(), "Not allowed");
        match err {
            ApiError::Server { details, .. } => assert_eq!(details, Some(json!({"reason": "phone"}))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn error_without_message_uses_generic() {
        let body = json!({"success": false, "error": {"code": "X"}}).to_string();
        let err = unwrap_response(500, &body).unwrap_err();
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn non_envelope_failure() {
        let err = unwrap_response(502, "<html>bad gateway</html>").unwrap_err();
        assert_eq!(err.code(), Some(HTTP_ERROR_CODE));
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn success_false_on_2xx_is_an_error() {
        let body = json!({"success": false, "error": {"code": "INVALID_OTP", "message": "Wrong code"}})
            .to_string();
        let err = unwrap_response(200, &body).unwrap_err();
        assert_eq!(err.code(), Some("INVALID_OTP"));
    }
}
