//! Response handling shared by the REST surfaces.

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;
use todo_core::BackendError;

/// Transport failure (no response).
pub(crate) fn transport_error(e: &reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::new("request timed out")
    } else {
        BackendError::new(format!("request failed: {e}"))
    }
}

/// Pass 2xx responses through; turn anything else into a [`BackendError`].
pub(crate) async fn check(resp: Response) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    Err(error_from_body(status.as_u16(), &text))
}

/// Check the status, then decode the JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, BackendError> {
    let resp = check(resp).await?;
    let status = resp.status().as_u16();
    resp.json::<T>()
        .await
        .map_err(|e| BackendError::with_status(status, format!("unexpected response body: {e}")))
}

/// Build an error from a non-2xx body.
///
/// The auth service reports `msg` or `error_description`, the data service
/// `message`; codes come as `error_code` or `code`.
pub(crate) fn error_from_body(status: u16, body: &str) -> BackendError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |names: &[&str]| {
        parsed.as_ref().and_then(|v| {
            names
                .iter()
                .find_map(|name| v.get(*name).and_then(Value::as_str).map(str::to_string))
        })
    };

    let message = field(&["msg", "message", "error_description", "error"])
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| format!("request failed with status {status}"));
    let error = BackendError::with_status(status, message);
    match field(&["error_code", "code"]) {
        Some(code) => error.code(code),
        None => error,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
