//! Session credentials and the token-refresh interceptor
//!
//! Per request the flow is:
//! 1. `before_dispatch` attaches `Authorization: Bearer <access token>` when one is stored.
//! 2. A 401 on a request that is not the token issuance endpoint and has not
//!    been retried yet starts a refresh: the request is marked `retried`, the
//!    refresh token is exchanged for a new access token and the request is replayed.
//! 3. A failed refresh (or no refresh token at all) clears the session,
//!    signals the login redirect and fails with `AuthExpired`.

use crate::config::{AuthEndpoints, RefreshPolicy};
use crate::pipeline::{Dispatcher, Interceptor};
use crate::request::{ApiRequest, ApiResponse};
use crate::{ClientError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taged_core::{Credentials, StoredSession, User};
use taged_storage::KeyValueStore;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Store key of the persisted session blob
pub const SESSION_KEY: &str = "user";

/// Collaborator told when the session ends for good.
///
/// Called fire-and-forget from the refresh flow; implementations must not block.
#[cfg_attr(test, mockall::automock)]
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self);
}

/// Redirect that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect_to_login(&self) {
        warn!("Session ended, login required");
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

/// Owner of the signed-in user's credentials
///
/// Other components only read through the accessors; the session itself is
/// the only writer, and every write is persisted before it returns.
pub struct AuthSession {
    store: Arc<dyn KeyValueStore>,
    state: RwLock<StoredSession>,
    endpoints: AuthEndpoints,
    policy: RefreshPolicy,
    refresh_lock: Mutex<()>,
    redirect: Arc<dyn LoginRedirect>,
}

impl AuthSession {
    /// Restore the session persisted in `store`.
    ///
    /// An unreadable blob is discarded rather than failing startup.
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        endpoints: AuthEndpoints,
        policy: RefreshPolicy,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self> {
        let state = match store.get(SESSION_KEY).await? {
            Some(blob) => match serde_json::from_str::<StoredSession>(&blob) {
                Ok(session) => session,
                Err(e) => {
                    warn!("Discarding unreadable stored session: {}", e);
                    StoredSession::default()
                }
            },
            None => StoredSession::default(),
        };

        debug!(
            logged_in = state.credentials.access_token.is_some(),
            has_refresh_token = state.credentials.refresh_token.is_some(),
            "Loaded session"
        );

        Ok(Self {
            store,
            state: RwLock::new(state),
            endpoints,
            policy,
            refresh_lock: Mutex::new(()),
            redirect,
        })
    }

    pub async fn credentials(&self) -> Credentials {
        self.state.read().await.credentials.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.credentials.access_token.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.state.read().await.credentials.refresh_token.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state.read().await.credentials.access_token.is_some()
    }

    pub fn endpoints(&self) -> &AuthEndpoints {
        &self.endpoints
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Replace the session after a successful login
    pub async fn start(&self, credentials: Credentials, user: Option<User>) -> Result<()> {
        self.commit(|state| *state = StoredSession { credentials, user })
            .await
    }

    /// Cache the profile of the signed-in user
    pub async fn set_user(&self, user: User) -> Result<()> {
        self.commit(|state| state.user = Some(user)).await
    }

    /// Drop all credentials and the cached profile
    pub async fn clear(&self) -> Result<()> {
        self.commit(|state| *state = StoredSession::default()).await
    }

    /// Swap in a refreshed access token; the refresh token is left as is
    async fn update_access_token(&self, access_token: String) -> Result<()> {
        self.commit(|state| state.credentials.access_token = Some(access_token))
            .await
    }

    /// Apply `update` to a copy, persist it, then publish it.
    ///
    /// A failed write leaves the in-memory session untouched.
    async fn commit(&self, update: impl FnOnce(&mut StoredSession) + Send) -> Result<()> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        update(&mut next);

        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    async fn persist(&self, state: &StoredSession) -> Result<()> {
        if state.credentials.is_empty() && state.user.is_none() {
            self.store.remove(SESSION_KEY).await?;
        } else {
            self.store
                .set(SESSION_KEY, serde_json::to_string(state)?)
                .await?;
        }
        Ok(())
    }

    /// Terminal failure: clear everything and ask for a new login
    async fn end_session(&self) {
        if let Err(e) = self.clear().await {
            error!("Failed to clear stored session: {}", e);
            // Credentials are dead either way
            *self.state.write().await = StoredSession::default();
        }
        self.redirect.redirect_to_login();
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// The refresh call is marked `retried` so a 401 from it cannot recurse.
    async fn exchange(&self, refresh_token: &str, dispatcher: &dyn Dispatcher) -> Result<String> {
        let mut request = ApiRequest::post(&self.endpoints.refresh_path)
            .with_json(&RefreshRequest { refresh_token })?;
        request.retried = true;

        let response = dispatcher.dispatch(request).await?;
        if response.status != 200 {
            return Err(ClientError::Status {
                status: response.status,
                body: response.text(),
            });
        }

        let body: RefreshResponse = response.json()?;
        if body.access_token.is_empty() {
            return Err(ClientError::InvalidResponse(
                "Refresh response carried an empty access token".to_string(),
            ));
        }
        Ok(body.access_token)
    }

    #[instrument(skip_all, fields(method = %request.method, path = %request.path))]
    async fn recover(
        &self,
        request: &mut ApiRequest,
        original: ClientError,
        dispatcher: &dyn Dispatcher,
    ) -> Result<ApiResponse> {
        request.retried = true;

        let guard = match self.policy {
            RefreshPolicy::Coalesced => Some(self.refresh_lock.lock().await),
            RefreshPolicy::Independent => None,
        };

        if guard.is_some() {
            let current = self.access_token().await;
            let sent = request.bearer_token();
            if sent.is_some() && current.as_deref() != sent {
                drop(guard);
                return match current {
                    Some(_) => {
                        debug!("Access token already refreshed by another request, replaying");
                        dispatcher.dispatch(request.clone()).await
                    }
                    None => {
                        debug!("Session already ended by another request");
                        Err(ClientError::AuthExpired {
                            original: Box::new(original),
                        })
                    }
                };
            }
        }

        let Some(refresh_token) = self.refresh_token().await else {
            warn!("Got 401 without a refresh token, ending session");
            self.end_session().await;
            return Err(ClientError::AuthExpired {
                original: Box::new(original),
            });
        };

        match self.exchange(&refresh_token, dispatcher).await {
            Ok(access_token) => {
                debug!("New access token received ({} chars)", access_token.len());
                if let Err(e) = self.update_access_token(access_token.clone()).await {
                    warn!(
                        "Failed to persist refreshed access token, keeping it in memory only: {}",
                        e
                    );
                    self.state.write().await.credentials.access_token = Some(access_token);
                }
                drop(guard);
                info!("Access token refreshed, replaying request");
                dispatcher.dispatch(request.clone()).await
            }
            Err(e) => {
                warn!("Token refresh failed, ending session: {}", e);
                self.end_session().await;
                Err(ClientError::AuthExpired {
                    original: Box::new(original),
                })
            }
        }
    }
}

#[async_trait]
impl Interceptor for AuthSession {
    async fn before_dispatch(&self, request: &mut ApiRequest) -> Result<()> {
        if let Some(token) = self.access_token().await {
            request.set_bearer_token(&token);
        }
        Ok(())
    }

    async fn after_response(
        &self,
        request: &mut ApiRequest,
        outcome: Result<ApiResponse>,
        dispatcher: &dyn Dispatcher,
    ) -> Result<ApiResponse> {
        let error = match outcome {
            Ok(response) => return Ok(response),
            Err(error) => error,
        };

        if !error.is_unauthorized()
            || request.retried
            || self.endpoints.is_token_issuance(&request.path)
        {
            return Err(error);
        }

        self.recover(request, error, dispatcher).await
    }
}
