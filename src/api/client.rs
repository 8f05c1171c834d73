//! API client for the MindHaven authentication endpoints.
//!
//! Only the endpoints the session core consumes live here: login, token
//! refresh, revocation, and the token-status diagnostic. Feature traffic
//! (chat, mood intake, assessments) goes through the per-feature clients
//! built on top of the token lifecycle manager.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::UserProfile;

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Rotated token pair returned by the refresh endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
}

/// Diagnostic report from the token-status endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenStatus {
    pub is_valid: bool,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Outcome of a 2xx login response.
///
/// A pending email verification is a successful response on the wire, not
/// an error, and must stay distinguishable from both.
#[derive(Debug, Clone)]
pub enum LoginReply {
    Tokens {
        access_token: String,
        refresh_token: String,
        user: UserProfile,
    },
    VerificationPending {
        message: String,
        can_resend: bool,
    },
}

/// The authentication endpoints, as a seam for tests.
///
/// `TokenLifecycleManager` only ever talks to this trait; production wires
/// in [`ApiClient`], tests wire in a counting mock.
#[async_trait]
pub trait AuthTransport: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<LoginReply, ApiError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, ApiError>;

    async fn revoke(&self, refresh_token: &str) -> Result<(), ApiError>;

    async fn revoke_all(&self, access_token: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
struct LoginResponseWire {
    access_token: String,
    refresh_token: String,
    user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct VerificationPendingWire {
    #[serde(default)]
    verification_required: bool,
    #[serde(default)]
    can_resend_verification: bool,
    #[serde(default)]
    message: String,
}

/// API client for MindHaven.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit
    /// (should retry), or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self.client.post(&url).json(body).send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response.json().await.map_err(|e| {
                        ApiError::InvalidResponse(format!("Bad JSON from {}: {}", url, e))
                    });
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = %url, retry = retries, backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    fn parse_login_body(text: &str) -> Result<LoginReply, ApiError> {
        // Both shapes come back as 2xx; the verification payload is the one
        // carrying an explicit flag, so test for it first.
        if let Ok(pending) = serde_json::from_str::<VerificationPendingWire>(text) {
            if pending.verification_required {
                return Ok(LoginReply::VerificationPending {
                    message: pending.message,
                    can_resend: pending.can_resend_verification,
                });
            }
        }

        let parsed: LoginResponseWire = serde_json::from_str(text)
            .map_err(|e| ApiError::InvalidResponse(format!("Bad login response: {}", e)))?;

        Ok(LoginReply::Tokens {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token,
            user: parsed.user,
        })
    }

    /// Query the diagnostic token-status endpoint.
    pub async fn token_status(&self, access_token: &str) -> Result<TokenStatus, ApiError> {
        let response = self
            .client
            .get(self.url("/auth/token-status"))
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Bad token status: {}", e)))
    }
}

#[async_trait]
impl AuthTransport for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginReply, ApiError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .form(&[("username", email), ("password", password)])
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Bad login response: {}", e)))?;

        Self::parse_login_body(&text)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, ApiError> {
        self.post_json(
            "/auth/refresh",
            &serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn revoke(&self, refresh_token: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/auth/revoke"))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        // Status only; no body contract
        Self::check_response(response).await?;
        debug!("Refresh token revoked");
        Ok(())
    }

    async fn revoke_all(&self, access_token: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/auth/revoke-all"))
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::check_response(response).await?;
        debug!("All sessions revoked");
        Ok(())
    }
}
