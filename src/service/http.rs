//! HTTP-backed session service client.
//!
//! Expected endpoints (relative to the configured base URL, e.g.
//! `http://localhost:8080/v1`):
//! - `POST /sessions`                       -- create a session
//! - `GET  /sessions/{id}`                  -- read state and metrics
//! - `POST /sessions/{id}/actions`          -- submit an action
//! - `GET  /rl/export?sessionId&limit&offset` -- recorded experiences
//! - `GET  /health`                         -- liveness
//!
//! Non-2xx responses are decoded into [`ServiceError::Api`] using the error
//! body's code, falling back to a code derived from the HTTP status.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::{ErrorCode, ErrorResponse, ServiceError};
use super::traits::{Observation, SessionService};
use super::types::{
    CreateSessionRequest, CreateSessionResponse, ExportResponse, GameId, HealthResponse,
    PlayActionRequest, PlayActionResponse, PlayerProfile, Session, SessionId,
};
use crate::experience::ExperienceRecord;

/// Session service reached over HTTP with bearer-token auth.
#[derive(Debug, Clone)]
pub struct HttpSessionService {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl HttpSessionService {
    /// Create a client for `base_url`. `timeout` bounds each individual request.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl SessionService for HttpSessionService {
    async fn create_session(
        &self,
        game_id: GameId,
        profile: &PlayerProfile,
    ) -> Result<CreateSessionResponse, ServiceError> {
        let body = CreateSessionRequest {
            game_id,
            player_profile: profile.clone(),
        };
        let resp = self
            .http
            .post(format!("{}/sessions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let created: CreateSessionResponse = decode(resp).await?;
        debug!(session_id = %created.session_id, state = %created.state, "session created");
        Ok(created)
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Observation, ServiceError> {
        let resp = self
            .http
            .get(format!("{}/sessions/{}", self.base_url, session_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let session: Session = decode(resp).await?;
        Ok(session.into())
    }

    async fn play_action(
        &self,
        session_id: SessionId,
        request: &PlayActionRequest,
    ) -> Result<Observation, ServiceError> {
        let resp = self
            .http
            .post(format!("{}/sessions/{}/actions", self.base_url, session_id))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let played: PlayActionResponse = decode(resp).await?;
        Ok(played.into())
    }

    async fn export_experiences(
        &self,
        session_id: SessionId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ExperienceRecord>, ServiceError> {
        let resp = self
            .http
            .get(format!("{}/rl/export", self.base_url))
            .bearer_auth(&self.api_key)
            .query(&[
                ("sessionId", session_id.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;

        let page: ExportResponse = decode(resp).await?;
        debug!(%session_id, limit, offset, count = page.experiences.len(), "fetched export page");
        Ok(page.experiences)
    }

    async fn health(&self) -> Result<HealthResponse, ServiceError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        decode(resp).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Decode a successful body, or turn an error response into [`ServiceError::Api`].
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json::<T>()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()));
    }

    let text = resp.text().await?;
    let (code, message) = match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => (ErrorCode::parse(&body.error.code), body.error.message),
        Err(_) => (code_for_status(status), format!("{status}: {text}")),
    };

    Err(ServiceError::Api {
        code,
        status: Some(status.as_u16()),
        message,
    })
}

/// Best-effort code for error responses that carry no structured body.
fn code_for_status(status: StatusCode) -> ErrorCode {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorCode::InvalidInput,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorCode::Unauthorized,
        StatusCode::PAYMENT_REQUIRED => ErrorCode::WalletLimitExceeded,
        StatusCode::NOT_FOUND => ErrorCode::NotFound,
        StatusCode::CONFLICT => ErrorCode::StateError,
        StatusCode::TOO_MANY_REQUESTS => ErrorCode::RateLimit,
        s if s.is_server_error() => ErrorCode::InternalError,
        _ => ErrorCode::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::ErrorClassifier;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned response per connection until the test ends.
    async fn canned_server(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    async fn get_error(status: &'static str, body: &'static str) -> ServiceError {
        let base = canned_server(status, body).await;
        let svc = HttpSessionService::new(&base, "k", Duration::from_secs(5)).unwrap();
        svc.get_session(SessionId(uuid::Uuid::new_v4())).await.unwrap_err()
    }

    #[tokio::test]
    async fn structured_error_body_sets_the_code() {
        let err = get_error(
            "409 Conflict",
            r#"{"error":{"code":"STATE_ERROR","message":"Spin is not allowed in state Initialized"}}"#,
        )
        .await;
        match &err {
            ServiceError::Api {
                code,
                status,
                message,
            } => {
                assert_eq!(*code, ErrorCode::StateError);
                assert_eq!(*status, Some(409));
                assert!(message.contains("not allowed"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert!(ErrorClassifier::default().is_fatal(&err));
    }

    #[tokio::test]
    async fn body_code_wins_over_status() {
        let err = get_error(
            "400 Bad Request",
            r#"{"error":{"code":"RATE_LIMIT","message":"slow down"}}"#,
        )
        .await;
        assert_eq!(err.code(), Some(ErrorCode::RateLimit));
        assert!(ErrorClassifier::default().is_retryable(&err));
    }

    #[tokio::test]
    async fn unstructured_error_falls_back_to_status() {
        let err = get_error("503 Service Unavailable", "upstream down").await;
        assert_eq!(err.code(), Some(ErrorCode::InternalError));
        assert!(err.to_string().contains("upstream down"));
        assert!(ErrorClassifier::default().is_retryable(&err));
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_decode_error() {
        let err = get_error("200 OK", r#"{"state":"#).await;
        assert!(matches!(err, ServiceError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn status_fallback_codes() {
        assert_eq!(code_for_status(StatusCode::BAD_REQUEST), ErrorCode::InvalidInput);
        assert_eq!(code_for_status(StatusCode::PAYMENT_REQUIRED), ErrorCode::WalletLimitExceeded);
        assert_eq!(code_for_status(StatusCode::CONFLICT), ErrorCode::StateError);
        assert_eq!(code_for_status(StatusCode::TOO_MANY_REQUESTS), ErrorCode::RateLimit);
        assert_eq!(code_for_status(StatusCode::BAD_GATEWAY), ErrorCode::InternalError);
        assert_eq!(code_for_status(StatusCode::IM_A_TEAPOT), ErrorCode::Unknown);
    }

    #[test]
    fn trims_trailing_slash() {
        let svc = HttpSessionService::new("http://localhost:8080/v1/", "k", Duration::from_secs(5))
            .unwrap();
        assert_eq!(svc.base_url(), "http://localhost:8080/v1");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        // Port 9 (discard) on localhost is essentially never listening.
        let svc = HttpSessionService::new("http://127.0.0.1:9", "k", Duration::from_secs(2))
            .unwrap();
        let err = svc.get_session(SessionId(uuid::Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, ServiceError::Transport(_)), "got {err:?}");
        assert_eq!(err.code(), None);
    }
}
