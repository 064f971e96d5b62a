//! Taged API Client
//!
//! This crate provides the HTTP side of the taged notes client:
//! - Request pipeline with interceptors and a per-request deadline
//! - Session persistence with transparent access-token refresh
//! - Login, profile and notes/drafts endpoints

pub mod auth;
pub mod config;
pub mod error;
pub mod notes;
pub mod pipeline;
pub mod request;
pub mod transport;

pub use auth::{AuthService, AuthSession, LogRedirect, LoginRedirect};
pub use config::{AuthEndpoints, ClientConfig, HttpClientConfig, RefreshPolicy};
pub use error::{ClientError, Result};
pub use notes::NotesApi;
pub use pipeline::{Dispatcher, Interceptor, Pipeline};
pub use request::{ApiRequest, ApiResponse, RequestBody, UploadFile};
pub use transport::{ReqwestTransport, Transport};

use std::sync::Arc;
use taged_storage::KeyValueStore;
use tracing::debug;

/// Fully wired client: transport, session interceptor and endpoint groups
pub struct TagedClient {
    session: Arc<AuthSession>,
    pipeline: Arc<Pipeline>,
    auth: AuthService,
    notes: NotesApi,
}

impl TagedClient {
    /// Build a client over a real HTTP transport
    pub async fn connect(
        config: &ClientConfig,
        store: Arc<dyn KeyValueStore>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.base_url, &config.http)?);
        let base_url = transport.base_url().to_string();
        Self::with_transport(config, transport, base_url, store, redirect).await
    }

    /// Build a client over any transport
    pub async fn with_transport(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        base_url: String,
        store: Arc<dyn KeyValueStore>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self> {
        let session = Arc::new(
            AuthSession::load(store, config.auth.clone(), config.refresh_policy, redirect).await?,
        );

        let pipeline = Arc::new(
            Pipeline::new(transport)
                .with_deadline(config.request_deadline())
                .with_interceptor(session.clone()),
        );

        debug!(
            "Client ready for {} ({:?} refresh)",
            base_url, config.refresh_policy
        );

        Ok(Self {
            auth: AuthService::new(pipeline.clone(), session.clone()),
            notes: NotesApi::new(pipeline.clone(), base_url),
            session,
            pipeline,
        })
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// Raw pipeline for endpoints without a dedicated wrapper
    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn notes(&self) -> &NotesApi {
        &self.notes
    }
}
