pub mod backend;
pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use backend::{BackendTransport, HttpBackend};
pub use client::RetryingClient;
pub use error::{TransportError, TransportErrorKind};
pub use retry::{AttemptVerdict, RetryLayer};
pub use types::{BackendRequest, BackendResponse, FormField, FormValue, RequestBody, RetryConfig};
