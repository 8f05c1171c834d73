//! Token lifecycle: validity evaluation and coalesced refresh.

use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::{AuthTransport, LoginReply};
use crate::models::{TokenPair, UserProfile};

use super::claims::{self, TokenState, DEFAULT_REFRESH_THRESHOLD_MINUTES};
use super::session::SessionStore;

/// Errors surfaced by the lifecycle manager.
///
/// Clone because a refresh outcome is shared among every caller that
/// coalesced onto the same in-flight attempt.
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    /// The refresh endpoint was unreachable or rejected the refresh token.
    /// The local session has already been cleared when this is returned.
    #[error("session refresh failed: {0}")]
    Refresh(String),

    /// The login endpoint rejected the credentials. Carries the server's
    /// message verbatim for display.
    #[error("login failed: {0}")]
    Login(String),
}

/// Outcome of a login attempt that the server accepted.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Session established and persisted
    Established(UserProfile),
    /// Credentials were fine but the email is unverified; offer a resend
    VerificationRequired { message: String, can_resend: bool },
}

type RefreshFuture = Shared<BoxFuture<'static, Result<String, AuthError>>>;

struct Inner {
    transport: Arc<dyn AuthTransport>,
    session: SessionStore,
    threshold_minutes: i64,
    /// The single in-flight refresh, if any. Set before the network call
    /// starts, cleared when it settles; callers arriving in between await
    /// the same shared future instead of issuing a second round trip.
    inflight: Mutex<Option<RefreshFuture>>,
}

/// One instance per running client, injected into every consumer that
/// issues authenticated requests.
#[derive(Clone)]
pub struct TokenLifecycleManager {
    inner: Arc<Inner>,
}

impl TokenLifecycleManager {
    pub fn new(transport: Arc<dyn AuthTransport>, session: SessionStore) -> Self {
        Self::with_threshold(transport, session, DEFAULT_REFRESH_THRESHOLD_MINUTES)
    }

    pub fn with_threshold(
        transport: Arc<dyn AuthTransport>,
        session: SessionStore,
        threshold_minutes: i64,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                session,
                threshold_minutes,
                inflight: Mutex::new(None),
            }),
        }
    }

    pub fn session(&self) -> SessionStore {
        self.inner.session.clone()
    }

    fn state(&self, threshold_minutes: i64) -> TokenState {
        match self.inner.session.access_token() {
            Some(token) => TokenState::evaluate(&token, threshold_minutes),
            None => TokenState::Expired,
        }
    }

    /// True while the stored token is usable, including the window where it
    /// is expiring soon. Missing or undecodable tokens are invalid.
    pub fn is_valid(&self) -> bool {
        self.state(self.inner.threshold_minutes) != TokenState::Expired
    }

    /// True when the token should be refreshed before the next request:
    /// expiring within `threshold_minutes`, already expired, or absent.
    pub fn is_expiring_soon(&self, threshold_minutes: i64) -> bool {
        self.state(threshold_minutes) != TokenState::Valid
    }

    /// Expiry of the stored token, when one decodes.
    pub fn expiry_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let token = self.inner.session.access_token()?;
        claims::expiry_time(&token)
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// Concurrent callers coalesce onto one network round trip and all
    /// receive its outcome; a call arriving after that attempt settles
    /// starts a fresh one. Any failure clears the whole session first, so
    /// the client never keeps a pair it cannot refresh.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        let fut = {
            let mut slot = self.inner.inflight.lock().await;
            match slot.as_ref() {
                Some(inflight) => inflight.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let fut: RefreshFuture = async move {
                        let outcome = do_refresh(&inner).await;
                        inner.inflight.lock().await.take();
                        outcome
                    }
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        fut.await
    }

    /// Token ready to put on a request: the stored one when comfortably
    /// valid, otherwise the result of a refresh. `None` means the caller
    /// should treat the user as logged out.
    pub async fn ensure_valid_token(&self) -> Option<String> {
        if let Some(token) = self.inner.session.access_token() {
            if TokenState::evaluate(&token, self.inner.threshold_minutes) == TokenState::Valid {
                return Some(token);
            }
        }

        match self.refresh().await {
            Ok(token) => Some(token),
            Err(e) => {
                debug!(error = %e, "Could not obtain a valid token");
                None
            }
        }
    }

    /// Exchange credentials for a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        match self.inner.transport.login(email, password).await {
            Ok(LoginReply::Tokens {
                access_token,
                refresh_token,
                user,
            }) => {
                let pair = TokenPair {
                    access_token,
                    refresh_token,
                };
                self.inner
                    .session
                    .set_session(&pair, &user)
                    .map_err(|e| AuthError::Login(format!("could not persist session: {e:#}")))?;
                Ok(LoginOutcome::Established(user))
            }
            Ok(LoginReply::VerificationPending {
                message,
                can_resend,
            }) => Ok(LoginOutcome::VerificationRequired {
                message,
                can_resend,
            }),
            Err(e) => Err(AuthError::Login(e.server_message())),
        }
    }

    /// Revoke the current refresh token remotely (best effort), then clear
    /// the local session unconditionally.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.inner.session.refresh_token() {
            if let Err(e) = self.inner.transport.revoke(&refresh_token).await {
                warn!(error = %e, "Remote revocation failed; clearing local session anyway");
            }
        }
        self.inner.session.clear_session();
    }

    /// Revoke every session for this user remotely (best effort), then
    /// clear the local session unconditionally.
    pub async fn revoke_all_sessions(&self) {
        if let Some(access_token) = self.inner.session.access_token() {
            if let Err(e) = self.inner.transport.revoke_all(&access_token).await {
                warn!(error = %e, "Revoke-all failed; clearing local session anyway");
            }
        }
        self.inner.session.clear_session();
    }
}

async fn do_refresh(inner: &Inner) -> Result<String, AuthError> {
    let Some(refresh_token) = inner.session.refresh_token() else {
        inner.session.clear_session();
        return Err(AuthError::Refresh("no refresh token stored".to_string()));
    };

    match inner.transport.refresh(&refresh_token).await {
        Ok(tokens) => {
            let pair = TokenPair {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            };
            if let Err(e) = inner.session.set_tokens(&pair) {
                inner.session.clear_session();
                return Err(AuthError::Refresh(format!(
                    "could not persist refreshed tokens: {e:#}"
                )));
            }
            debug!("Access token refreshed");
            Ok(pair.access_token)
        }
        Err(e) => {
            warn!(error = %e, "Refresh rejected; clearing session");
            inner.session.clear_session();
            Err(AuthError::Refresh(e.server_message()))
        }
    }
}
