use std::sync::Arc;

use async_trait::async_trait;

use crate::{config::BackendConfig, transport::RetryingClient};

/// Decides whether a caller may act on a monitoring session. The default
/// admits everyone; deployments with a session store plug in their own.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, user_id: &str, session_id: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _user_id: &str, _session_id: &str) -> bool {
        true
    }
}

#[derive(Clone)]
pub struct AppState {
    pub client: RetryingClient,
    pub backend: Arc<BackendConfig>,
    pub authorizer: Arc<dyn Authorizer>,
}

impl AppState {
    pub fn new(client: RetryingClient, backend: BackendConfig) -> Self {
        Self {
            client,
            backend: Arc::new(backend),
            authorizer: Arc::new(AllowAll),
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn backend_url(&self, path: &str) -> String {
        self.backend.url_for(path)
    }
}
