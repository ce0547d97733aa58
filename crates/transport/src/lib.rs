//! HTTP transport for the upload engine.
//!
//! The engine only talks to the [`Transport`] trait: one authenticated
//! POST of a byte body, answered with a status and a body. [`call`] turns
//! that answer into a decoded JSON reply or a [`TransportError`].
//! [`HttpTransport`] is the `reqwest` implementation used in production;
//! tests substitute in-memory services.

pub mod client;
pub mod error;

pub use client::{HttpTransport, ServiceConfig};
pub use error::TransportError;

use std::future::Future;
use std::pin::Pin;

use blockput_protocol::ErrorReply;
use bytes::Bytes;
use serde::de::DeserializeOwned;

/// Raw answer to a POST.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub status: u16,
    pub content_type: String,
    pub body: Bytes,
}

impl Response {
    /// Builds a JSON response (used by mock services).
    pub fn json(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: "application/json".into(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status / 100 == 2
    }
}

/// Boxed future returned by [`Transport::post`].
pub type PostFuture<'a> = Pin<Box<dyn Future<Output = Result<Response, TransportError>> + Send + 'a>>;

/// Abstract connection to the upload service.
///
/// Implementations must be safe to share between workers; every block
/// uploads through the same transport concurrently.
pub trait Transport: Send + Sync {
    /// POSTs `body` to `path` (relative to the upload host).
    fn post<'a>(&'a self, path: &'a str, content_type: &'a str, body: Bytes) -> PostFuture<'a>;
}

/// POSTs and decodes the reply.
///
/// A 2xx answer is decoded as JSON into `T`; an empty 2xx body yields
/// `T::default()`. Any other status becomes [`TransportError::Status`],
/// carrying the service's `{"error": ...}` message when present.
pub async fn call<T>(
    transport: &dyn Transport,
    path: &str,
    content_type: &str,
    body: Bytes,
) -> Result<T, TransportError>
where
    T: DeserializeOwned + Default,
{
    let resp = transport.post(path, content_type, body).await?;
    decode(resp)
}

/// Decodes a raw [`Response`]; see [`call`].
pub fn decode<T>(resp: Response) -> Result<T, TransportError>
where
    T: DeserializeOwned + Default,
{
    if resp.is_success() {
        if resp.body.is_empty() {
            return Ok(T::default());
        }
        return serde_json::from_slice(&resp.body).map_err(TransportError::Json);
    }

    let mut message = String::new();
    if resp.content_type.starts_with("application/json")
        && !resp.body.is_empty()
        && let Ok(reply) = serde_json::from_slice::<ErrorReply>(&resp.body)
    {
        message = reply.error;
    }
    if message.is_empty() {
        message = reqwest::StatusCode::from_u16(resp.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("unexpected status")
            .to_string();
    }

    Err(TransportError::Status {
        status: resp.status,
        message,
    })
}
