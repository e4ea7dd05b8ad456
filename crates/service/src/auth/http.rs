use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument, warn};

use super::collaborator::AuthCollaborator;
use super::domain::{ErrorBody, LoginRequest, LoginResponse, RemoteUser};
use super::errors::CollaboratorError;
use crate::errors::ServiceError;

/// Authentication collaborator reached over HTTP/JSON.
///
/// - `POST {base_url}/auth/login` with `{identifier, secret}`
/// - `GET {base_url}/auth/session` with `Authorization: Bearer <token>`
#[derive(Clone)]
pub struct HttpAuthCollaborator {
    client: Client,
    base_url: String,
}

impl HttpAuthCollaborator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ServiceError::Config("authentication base URL is not set".into()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Config(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(cfg: &configs::AuthClientConfig) -> Result<Self, ServiceError> {
        Self::new(cfg.base_url.clone(), Duration::from_secs(cfg.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl AuthCollaborator for HttpAuthCollaborator {
    #[instrument(skip(self, request), fields(identifier = %request.identifier))]
    async fn verify(&self, request: &LoginRequest) -> Result<LoginResponse, CollaboratorError> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(request)
            .send()
            .await
            .map_err(classify_transport)?;
        let resp = check_status(resp).await?;
        resp.json::<LoginResponse>().await.map_err(|e| CollaboratorError::Malformed(e.to_string()))
    }

    #[instrument(skip_all)]
    async fn validate_token(&self, token: &str) -> Result<RemoteUser, CollaboratorError> {
        let resp = self
            .client
            .get(self.url("/auth/session"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(classify_transport)?;
        let resp = check_status(resp).await?;
        resp.json::<RemoteUser>().await.map_err(|e| CollaboratorError::Malformed(e.to_string()))
    }
}

fn classify_transport(e: reqwest::Error) -> CollaboratorError {
    warn!(error = %e, "authentication request failed");
    if e.is_timeout() {
        CollaboratorError::Unavailable(format!("timeout: {e}"))
    } else if e.is_decode() {
        CollaboratorError::Malformed(e.to_string())
    } else {
        CollaboratorError::Unavailable(e.to_string())
    }
}

async fn check_status(resp: Response) -> Result<Response, CollaboratorError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = match resp.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };
    debug!(%status, %detail, "authentication service returned an error");
    Err(classify_status(status, detail))
}

/// 4xx means the service understood and refused; 408/429 and 5xx are worth a
/// later attempt.
pub(crate) fn classify_status(status: StatusCode, detail: String) -> CollaboratorError {
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => CollaboratorError::Unavailable(detail),
        s if s.is_client_error() => CollaboratorError::Rejected(detail),
        _ => CollaboratorError::Unavailable(detail),
    }
}
