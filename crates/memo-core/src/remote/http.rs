//! HTTP implementation of the remote client

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Response, StatusCode};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::UserId;
use crate::util::{format_timestamp, truncate_error};

use super::{ChangedSince, ListResponse, RemoteClient, UpsertAck, UpsertPayload};

/// Per-user identity header; the server defaults absent values to guest
const USER_HEADER: &str = "X-User";

/// Bound on every request, converting a hung server into `Error::Timeout`
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `reqwest`-backed client for the note collection endpoints
#[derive(Debug, Clone)]
pub struct HttpRemoteClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRemoteClient {
    /// Create a client for the given API base URL, e.g.
    /// `http://localhost:5000/api`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = normalize_base_url(&base_url.into())?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(map_request_error)?;

        Ok(Self { base_url, http })
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn list_changed_since(
        &self,
        user_id: UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<ChangedSince> {
        let mut url = format!("{}/notes", self.base_url);
        if let Some(since) = since {
            let since = format_timestamp(since);
            url.push_str("?updated_after=");
            url.push_str(&urlencoding::encode(&since));
        }

        let response = self
            .http
            .get(&url)
            .header(USER_HEADER, user_id.to_string())
            .send()
            .await
            .map_err(map_request_error)?;
        let response = check_status(response).await?;

        let payload = response
            .json::<ListResponse>()
            .await
            .map_err(map_request_error)?;
        Ok(payload.into())
    }

    async fn upsert_note(&self, user_id: UserId, payload: &UpsertPayload) -> Result<UpsertAck> {
        let url = format!("{}/notes/upsert", self.base_url);

        let response = self
            .http
            .post(&url)
            .header(USER_HEADER, user_id.to_string())
            .json(payload)
            .send()
            .await
            .map_err(map_request_error)?;
        let response = check_status(response).await?;

        response
            .json::<UpsertAck>()
            .await
            .map_err(map_request_error)
    }

    async fn delete_note(&self, user_id: UserId, remote_id: &str) -> Result<()> {
        let url = format!("{}/notes/{}", self.base_url, urlencoding::encode(remote_id));

        let response = self
            .http
            .delete(&url)
            .header(USER_HEADER, user_id.to_string())
            .send()
            .await
            .map_err(map_request_error)?;

        // Already gone on the server is exactly what we wanted.
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(remote_id, "remote note already deleted");
            return Ok(());
        }

        check_status(response).await?;
        Ok(())
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("server URL must not be empty".into()));
    }
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(Error::InvalidInput(
            "server URL must include http:// or https://".into(),
        ));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Sort transport-level failures into the engine's error taxonomy
fn map_request_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout(error.to_string())
    } else if error.is_decode() {
        Error::InvalidPayload(error.to_string())
    } else {
        Error::Network(error.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        message: parse_api_error(&body),
    })
}

/// Pull a human-readable message out of an error response body
fn parse_api_error(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ErrorDetail>,
        message: Option<String>,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorDetail {
        Message(String),
        Shaped { message: Option<String> },
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        let detail = match parsed.error {
            Some(ErrorDetail::Message(message)) => Some(message),
            Some(ErrorDetail::Shaped { message }) => message,
            None => None,
        };
        if let Some(message) = detail.or(parsed.message) {
            return truncate_error(&message, 180);
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        truncate_error(trimmed, 180)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url(" http://localhost:5000/api/ ").unwrap(),
            "http://localhost:5000/api"
        );
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("localhost:5000").is_err());
    }

    #[test]
    fn test_parse_api_error_nested_shape() {
        let message = parse_api_error(
            r#"{"error": {"code": "UNAUTHORIZED", "message": "X-User header required"}}"#,
        );
        assert_eq!(message, "X-User header required");
    }

    #[test]
    fn test_parse_api_error_flat_shapes() {
        assert_eq!(
            parse_api_error(r#"{"error": "database is locked"}"#),
            "database is locked"
        );
        assert_eq!(
            parse_api_error(r#"{"message": "try again later"}"#),
            "try again later"
        );
    }

    #[test]
    fn test_parse_api_error_falls_back_to_body() {
        assert_eq!(parse_api_error("<html>502 Bad Gateway</html>"), "<html>502 Bad Gateway</html>");
        assert_eq!(parse_api_error("   "), "no response body");
    }
}
