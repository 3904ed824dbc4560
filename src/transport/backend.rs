use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, header,
    multipart::{Form, Part},
};
use tokio::time::timeout;

use crate::transport::{
    error::{TransportError, internal_error, network_error, timeout_error},
    types::{BackendRequest, BackendResponse, FormField, FormValue, HttpMethod, RequestBody},
};

/// One delivery attempt against the external backend. Any HTTP status is an
/// `Ok` response; only network failures and timeouts are errors here.
#[async_trait]
pub trait BackendTransport: Send + Sync {
    async fn send(
        &self,
        request: &BackendRequest,
        timeout: Duration,
    ) -> Result<BackendResponse, TransportError>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| internal_error(format!("failed to build http client: {err}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BackendTransport for HttpBackend {
    async fn send(
        &self,
        request: &BackendRequest,
        request_timeout: Duration,
    ) -> Result<BackendResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match &request.body {
            RequestBody::Empty => builder.header(header::ACCEPT, "application/json"),
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart(fields) => builder.multipart(build_form(fields)?),
        };

        // One bound covers connect, headers and body.
        let exchange = async {
            let response = builder
                .send()
                .await
                .map_err(|err| network_error(format!("backend request failed: {err}")))?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|err| {
                network_error(format!("failed to read backend response body: {err}"))
            })?;
            Ok::<_, TransportError>(BackendResponse::new(status, body))
        };

        match timeout(request_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(timeout_error(format!(
                "backend request timed out after {}ms",
                request_timeout.as_millis()
            ))),
        }
    }
}

fn build_form(fields: &[FormField]) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for field in fields {
        form = match &field.value {
            FormValue::Text(value) => form.text(field.name.clone(), value.clone()),
            FormValue::File {
                file_name,
                content_type,
                data,
            } => {
                let part = Part::bytes(data.to_vec())
                    .file_name(file_name.clone())
                    .mime_str(content_type)
                    .map_err(|err| {
                        internal_error(format!("invalid content type '{content_type}': {err}"))
                    })?;
                form.part(field.name.clone(), part)
            }
        };
    }
    Ok(form)
}
