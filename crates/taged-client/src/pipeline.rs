//! Request pipeline: interceptors around a transport

use crate::request::{ApiRequest, ApiResponse};
use crate::transport::Transport;
use crate::{ClientError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Re-entry point for interceptors that need to issue or replay requests
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Run a request through the full pipeline, interceptors included
    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Hook around dispatch
///
/// `before_dispatch` runs in registration order, `after_response` in reverse.
///
/// An interceptor that replays through the `Dispatcher` runs the whole chain
/// again for the replay. Interceptors registered before it therefore see the
/// replayed outcome twice: once inside the replay and once more as the outer
/// dispatch unwinds. Register such interceptors first if they must run once
/// per logical request.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn before_dispatch(&self, _request: &mut ApiRequest) -> Result<()> {
        Ok(())
    }

    /// Inspect or replace the outcome of a dispatch
    async fn after_response(
        &self,
        _request: &mut ApiRequest,
        outcome: Result<ApiResponse>,
        _dispatcher: &dyn Dispatcher,
    ) -> Result<ApiResponse> {
        outcome
    }
}

/// Transport plus an ordered interceptor chain
pub struct Pipeline {
    transport: Arc<dyn Transport>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    deadline: Option<Duration>,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            interceptors: Vec::new(),
            deadline: None,
        }
    }

    /// Bound every transport call; a call past the deadline fails with `Timeout`
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.register(interceptor);
        self
    }

    pub fn register(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.dispatch(request).await
    }

    /// One transport call; non-2xx responses become errors
    async fn send_once(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let sent = self.transport.send(request);

        let response = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, sent).await.map_err(|_| {
                warn!(
                    "{} {} exceeded deadline of {}s",
                    request.method,
                    request.path,
                    deadline.as_secs()
                );
                ClientError::Timeout(deadline.as_secs())
            })??,
            None => sent.await?,
        };

        if response.is_success() {
            Ok(response)
        } else {
            debug!(
                "{} {} failed with status {}",
                request.method, request.path, response.status
            );
            Err(ClientError::from_response(response.status, &response.body))
        }
    }
}

#[async_trait]
impl Dispatcher for Pipeline {
    async fn dispatch(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        for interceptor in &self.interceptors {
            interceptor.before_dispatch(&mut request).await?;
        }

        let mut outcome = self.send_once(&request).await;

        for interceptor in self.interceptors.iter().rev() {
            outcome = interceptor
                .after_response(&mut request, outcome, self)
                .await;
        }

        outcome
    }
}
