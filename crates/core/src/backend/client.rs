//! HTTP client for the Git backend service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::backend::{GitBackend, OperationReply, PullReply, PullState, ResolveReply};
use crate::config::BackendConfig;
use crate::conflict::Resolutions;
use crate::errors::BackendError;
use crate::models::{GitStatus, StatusPayload};

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Only meaningful on `/pull`; kept as text so other endpoints never
    /// fail on it.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Envelope {
    /// The text meant for the user, preferring `error` over `message`.
    fn reason(&self) -> Option<String> {
        self.error.clone().or_else(|| self.message.clone())
    }

    /// Treat an explicit `success: false` as a rejection.
    fn into_accepted(self) -> Result<Self, BackendError> {
        if self.success == Some(false) {
            let reason = self
                .reason()
                .unwrap_or_else(|| "the backend rejected the request".to_string());
            return Err(BackendError::Rejected(reason));
        }
        Ok(self)
    }
}

/// Asynchronous client for the backend's Git REST API.
#[derive(Clone)]
pub struct HttpGitBackend {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpGitBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let base_url = format!(
            "{}/{}",
            config.url.trim_end_matches('/'),
            config.api_prefix.trim_matches('/')
        )
        .trim_end_matches('/')
        .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("gitdeck/", env!("CARGO_PKG_VERSION"))),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!(base_url = %base_url, "created HttpGitBackend");
        Ok(Self {
            http,
            base_url,
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn post(&self, path: &str, body: Value) -> Result<Envelope, BackendError> {
        let req = self.authorize(self.http.post(self.url(path)).json(&body));
        let resp = req.send().await?;
        read_envelope(resp).await
    }

    async fn post_operation(&self, path: &str, body: Value) -> Result<OperationReply, BackendError> {
        let envelope = self.post(path, body).await?.into_accepted()?;
        debug!(path, "backend operation accepted");
        Ok(OperationReply {
            message: envelope.message,
        })
    }
}

/// Read the body of a response, mapping non-2xx statuses to
/// [`BackendError::Api`] with the backend's message unwrapped.
async fn read_body(resp: reqwest::Response) -> Result<String, BackendError> {
    let status = resp.status();
    let body = resp.text().await?;
    if status.is_success() {
        return Ok(body);
    }

    let message = serde_json::from_str::<Envelope>(&body)
        .ok()
        .and_then(|e| e.reason())
        .unwrap_or_else(|| format!("HTTP {}", status));
    warn!(status = status.as_u16(), message = %message, "backend returned an error");
    Err(BackendError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn read_envelope(resp: reqwest::Response) -> Result<Envelope, BackendError> {
    let body = read_body(resp).await?;
    if body.trim().is_empty() {
        return Ok(Envelope::default());
    }
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl GitBackend for HttpGitBackend {
    #[instrument(skip(self))]
    async fn get_status(&self) -> Result<GitStatus, BackendError> {
        let req = self.authorize(self.http.get(self.url("/status")));
        let body = read_body(req.send().await?).await?;

        let mut value: Value = serde_json::from_str(&body)?;
        if value.get("success").and_then(Value::as_bool) == Some(false) {
            let envelope: Envelope = serde_json::from_value(value)?;
            let reason = envelope
                .reason()
                .unwrap_or_else(|| "status unavailable".to_string());
            return Err(BackendError::Rejected(reason));
        }
        if let Some(data) = value.get_mut("data").map(Value::take) {
            value = data;
        }
        let payload: StatusPayload = serde_json::from_value(value)?;
        let status = GitStatus::from_payload(payload);
        debug!(
            branch = %status.branch,
            outgoing = status.outgoing_changes.len(),
            incoming = status.incoming_changes.len(),
            conflicts = status.merge_conflicts.len(),
            merging = status.is_merging,
            "fetched status"
        );
        Ok(status)
    }

    #[instrument(skip(self))]
    async fn stage(&self, files: &[String]) -> Result<OperationReply, BackendError> {
        self.post_operation("/stage", json!({ "files": files })).await
    }

    #[instrument(skip(self))]
    async fn unstage(&self, files: &[String]) -> Result<OperationReply, BackendError> {
        self.post_operation("/unstage", json!({ "files": files })).await
    }

    #[instrument(skip(self, message))]
    async fn commit(&self, files: &[String], message: &str) -> Result<OperationReply, BackendError> {
        self.post_operation(
            "/commit",
            json!({ "files": files, "commit_message": message }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn revert(&self, files: &[String]) -> Result<OperationReply, BackendError> {
        self.post_operation("/revert", json!({ "files": files })).await
    }

    #[instrument(skip(self))]
    async fn revert_file(&self, file_path: &str) -> Result<OperationReply, BackendError> {
        self.post_operation("/revert-file", json!({ "file_path": file_path }))
            .await
    }

    #[instrument(skip(self))]
    async fn revert_all(&self) -> Result<OperationReply, BackendError> {
        self.post_operation("/revert-all", json!({})).await
    }

    #[instrument(skip(self))]
    async fn push(&self) -> Result<OperationReply, BackendError> {
        self.post_operation("/push", json!({})).await
    }

    #[instrument(skip(self))]
    async fn pull(&self, branch: &str) -> Result<PullReply, BackendError> {
        let envelope = self
            .post("/pull", json!({ "branch": branch }))
            .await?
            .into_accepted()?;
        let state = match envelope.state.as_deref() {
            Some("resolve") => PullState::Resolve,
            None | Some("ok") => PullState::Ok,
            Some(other) => {
                warn!(state = other, "unknown pull state, treating as ok");
                PullState::Ok
            }
        };
        Ok(PullReply {
            state,
            message: envelope.message,
        })
    }

    #[instrument(skip(self, resolutions), fields(files = resolutions.len()))]
    async fn resolve_conflicts(
        &self,
        resolutions: &Resolutions,
    ) -> Result<ResolveReply, BackendError> {
        let envelope = self
            .post("/resolve", json!({ "resolutions": resolutions }))
            .await?;
        let success = envelope
            .success
            .unwrap_or_else(|| envelope.error.is_none());
        Ok(ResolveReply {
            success,
            message: if success {
                envelope.message
            } else {
                envelope.reason()
            },
        })
    }

    #[instrument(skip(self))]
    async fn finalize_merge(&self) -> Result<OperationReply, BackendError> {
        self.post_operation("/merge/finalize", json!({})).await
    }

    #[instrument(skip(self))]
    async fn abort_merge(&self) -> Result<OperationReply, BackendError> {
        self.post_operation("/merge/abort", json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str, prefix: &str) -> BackendConfig {
        BackendConfig {
            url: url.into(),
            api_prefix: prefix.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_base_url_joins_prefix() {
        let backend = HttpGitBackend::new(&config("http://localhost:6868/", "/api/git/")).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:6868/api/git");
        assert_eq!(backend.url("/status"), "http://localhost:6868/api/git/status");

        let backend = HttpGitBackend::new(&config("http://localhost:6868", "")).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:6868");
    }

    #[test]
    fn test_envelope_rejection_prefers_error() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"success": false, "error": "nothing staged", "message": "ignored"}"#,
        )
        .unwrap();
        match envelope.into_accepted() {
            Err(BackendError::Rejected(reason)) => assert_eq!(reason, "nothing staged"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_without_success_is_accepted() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"message": "Pushed", "state": "resolve"}"#).unwrap();
        let envelope = envelope.into_accepted().unwrap();
        assert_eq!(envelope.state.as_deref(), Some("resolve"));
        assert_eq!(envelope.message.as_deref(), Some("Pushed"));
    }
}
