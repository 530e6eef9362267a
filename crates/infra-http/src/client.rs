// Shared HTTP plumbing: base URL, API key header, status and envelope handling

use ingestflow_core::port::RemoteError;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

pub const API_KEY_HEADER: &str = "X-Dataverse-key";

/// Longest error body excerpt carried in a `RemoteError`
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }
}

pub(crate) async fn send(builder: RequestBuilder) -> Result<Response, RemoteError> {
    builder
        .send()
        .await
        .map_err(|e| RemoteError::Transport(e.to_string()))
}

/// Fail with `RemoteError::Status` unless the response is a success
pub(crate) async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

pub(crate) async fn read_json(response: Response) -> Result<Value, RemoteError> {
    let response = ensure_success(response).await?;
    response
        .json::<Value>()
        .await
        .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

/// `data` of a `{"status": "OK", "data": ...}` envelope
pub(crate) fn unwrap_envelope(body: Value) -> Result<Value, RemoteError> {
    match body.get("status").and_then(Value::as_str) {
        Some("OK") => Ok(body.get("data").cloned().unwrap_or(Value::Null)),
        Some(_) => Err(RemoteError::InvalidResponse(
            body.get("message")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string(),
        )),
        None => Err(RemoteError::InvalidResponse(
            "Response has no status field".to_string(),
        )),
    }
}

pub(crate) fn status_error(status: StatusCode, body: &str) -> RemoteError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(MAX_ERROR_BODY).collect());
    RemoteError::Status {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_data_is_returned() {
        let data = unwrap_envelope(json!({"status": "OK", "data": {"id": 7}})).unwrap();
        assert_eq!(data["id"], 7);
    }

    #[test]
    fn test_error_envelope_carries_message() {
        let err = unwrap_envelope(json!({"status": "ERROR", "message": "Dataset is locked"}))
            .unwrap_err();
        assert_eq!(err, RemoteError::InvalidResponse("Dataset is locked".to_string()));
    }

    #[test]
    fn test_status_error_prefers_json_message() {
        let err = status_error(
            StatusCode::FORBIDDEN,
            r#"{"status":"ERROR","message":"Not authorized"}"#,
        );
        assert_eq!(
            err,
            RemoteError::Status {
                status: 403,
                message: "Not authorized".to_string()
            }
        );

        let err = status_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(err, RemoteError::Status { status: 502, message } if message.contains("bad gateway")));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:8080/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(client.url("/api/info/version"), "http://localhost:8080/api/info/version");
    }
}
