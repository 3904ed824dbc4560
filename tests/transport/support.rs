use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use proctor::transport::{
    BackendRequest, BackendResponse, BackendTransport, RetryConfig, RetryingClient,
    TransportError,
};

/// Replays a fixed list of attempt results, then answers `200 {}`.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<BackendResponse, TransportError>>>,
    requests: Mutex<Vec<BackendRequest>>,
    timeouts: Mutex<Vec<Duration>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<BackendResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().expect("timeouts lock").clone()
    }
}

#[async_trait]
impl BackendTransport for ScriptedBackend {
    async fn send(
        &self,
        request: &BackendRequest,
        timeout: Duration,
    ) -> Result<BackendResponse, TransportError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.timeouts.lock().expect("timeouts lock").push(timeout);
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Ok(BackendResponse::new(200, "{}")))
    }
}

pub fn client(backend: Arc<ScriptedBackend>) -> RetryingClient {
    RetryingClient::new(backend, RetryConfig::default())
}

pub fn status(code: u16, body: &str) -> Result<BackendResponse, TransportError> {
    Ok(BackendResponse::new(code, body))
}
