//! `reqwest` implementation of [`Transport`].
//!
//! Every request carries `Authorization: UpToken <token>` and, when
//! configured, a `Host` override so the service can be reached by IP.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HOST, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{PostFuture, Response, Transport, TransportError};

const DEFAULT_UP_HOST: &str = "http://up.qbox.me";

/// Where and how to reach the upload service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL requests are sent to (scheme, host or IP, optional port).
    #[serde(default = "default_up_host")]
    pub up_host: String,

    /// Value of the `Host` header, when `up_host` is an IP address.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,

    /// Upload token sent as `UpToken <token>`.
    #[serde(default)]
    pub token: String,

    /// Whole-request timeout in seconds (0 disables it).
    #[serde(default)]
    pub timeout_secs: u64,
}

fn default_up_host() -> String {
    DEFAULT_UP_HOST.to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            up_host: default_up_host(),
            host: String::new(),
            token: String::new(),
            timeout_secs: 0,
        }
    }
}

/// Upload service client over HTTP.
///
/// Cheap to share: the inner `reqwest::Client` pools connections and is
/// used concurrently by every worker.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Builds a client from `config`.
    pub fn new(config: &ServiceConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        if !config.token.is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("UpToken {}", config.token))
                    .map_err(|_| TransportError::InvalidHeader("token".into()))?,
            );
        }
        if !config.host.is_empty() {
            headers.insert(
                HOST,
                HeaderValue::from_str(&config.host)
                    .map_err(|_| TransportError::InvalidHeader("host".into()))?,
            );
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.up_host.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn do_post(
        &self,
        path: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<Response, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        let len = body.len();

        let mut req = self.http.post(&url).body(body);
        if !content_type.is_empty() {
            req = req.header(CONTENT_TYPE, content_type);
        }
        let resp = req.send().await?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = resp.bytes().await?;

        trace!(%url, sent = len, status, received = body.len(), "post");

        Ok(Response {
            status,
            content_type,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn post<'a>(&'a self, path: &'a str, content_type: &'a str, body: Bytes) -> PostFuture<'a> {
        Box::pin(self.do_post(path, content_type, body))
    }
}
