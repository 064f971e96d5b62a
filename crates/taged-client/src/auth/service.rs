//! Login, logout and profile lookup

use super::session::AuthSession;
use crate::pipeline::Dispatcher;
use crate::request::ApiRequest;
use crate::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taged_core::{Credentials, User};
use tracing::{info, instrument, warn};

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenPair {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
}

pub struct AuthService {
    dispatcher: Arc<dyn Dispatcher>,
    session: Arc<AuthSession>,
}

impl AuthService {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, session: Arc<AuthSession>) -> Self {
        Self {
            dispatcher,
            session,
        }
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// Exchange username and password for a token pair and start a session.
    ///
    /// Returns the profile when it could be fetched; a failed profile lookup
    /// leaves the user logged in without one.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<User>> {
        // Stale tokens must not ride along on the token request
        self.session.clear().await?;

        let request = ApiRequest::post(&self.session.endpoints().token_path)
            .with_json(&LoginRequest { username, password })?;
        let response = self.dispatcher.dispatch(request).await?;

        let tokens: TokenPair = response.json()?;
        let Some(access) = tokens.access.filter(|token| !token.is_empty()) else {
            return Err(ClientError::InvalidResponse(
                "Token response did not contain an access token".to_string(),
            ));
        };

        self.session
            .start(
                Credentials {
                    access_token: Some(access),
                    refresh_token: tokens.refresh.filter(|token| !token.is_empty()),
                },
                None,
            )
            .await?;
        info!("Logged in as {}", username);

        match self.fetch_profile().await {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!("Logged in but failed to load profile: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn logout(&self) -> Result<()> {
        self.session.clear().await?;
        info!("Logged out");
        Ok(())
    }

    /// Load the signed-in user's profile and cache it in the session
    pub async fn fetch_profile(&self) -> Result<User> {
        let request = ApiRequest::get(&self.session.endpoints().profile_path);
        let user: User = self.dispatcher.dispatch(request).await?.json()?;
        self.session.set_user(user.clone()).await?;
        Ok(user)
    }

    /// Cached profile, without a network call
    pub async fn whoami(&self) -> Option<User> {
        self.session.user().await
    }
}
