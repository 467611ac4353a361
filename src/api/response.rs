//! Response decoding shared by the wrapper, refresh and auth calls.

use super::error::ApiError;
use reqwest::{Response, StatusCode};
use serde_json::Value;

/// Decode a response: `None` for 204 or an empty 2xx body, parsed JSON for
/// other 2xx, [`ApiError::Request`] for everything else.
pub async fn read_json(response: Response) -> Result<Option<Value>, ApiError> {
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    let body = response.bytes().await?;
    decode_body(status, &body)
}

pub(crate) fn decode_body(status: StatusCode, body: &[u8]) -> Result<Option<Value>, ApiError> {
    if status.is_success() {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        return Ok(Some(serde_json::from_slice(body)?));
    }

    Err(ApiError::Request {
        status,
        message: error_message(status, body),
    })
}

/// Server-provided `message` when present, otherwise one built from the
/// status text.
pub fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            format!(
                "Erro {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown status")
            )
        })
}
