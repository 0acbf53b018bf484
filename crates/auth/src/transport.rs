//! HTTP egress: the trait the dispatcher and coordinator send through, and
//! its reqwest implementation.

use std::time::Duration;

use {
    async_trait::async_trait,
    reqwest::Client,
    tracing::{debug, trace},
    triage_config::ApiConfig,
    url::Url,
};

use crate::{
    error::TransportError,
    types::{OutgoingCall, Response},
};

/// Sends one call and buffers the response. Implementations add no auth
/// behaviour of their own; a 401 is an ordinary response here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, call: &OutgoingCall) -> Result<Response, TransportError>;
}

/// reqwest-backed transport rooted at the API base URL.
///
/// The client keeps a cookie jar, so the long-lived session cookie set by
/// login is replayed on the refresh call.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        Url::parse(base_url).map_err(|e| TransportError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let mut builder = Client::builder().cookie_store(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| TransportError::Client {
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, TransportError> {
        Self::new(&config.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Append `path` to the base URL. `Url::join` would drop the base's own
    /// path segment (`/api`) for absolute paths, so this concatenates.
    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        let joined = if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        };
        Url::parse(&joined).map_err(|e| TransportError::InvalidUrl {
            url: joined,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, call: &OutgoingCall) -> Result<Response, TransportError> {
        let url = self.url_for(&call.path)?;
        trace!(method = %call.method, url = %url, retried = call.already_retried, "sending request");

        let mut request = self
            .client
            .request(call.method.clone(), url)
            .headers(call.headers.clone());
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let network_error = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout {
                    path: call.path.clone(),
                }
            } else {
                TransportError::Network {
                    path: call.path.clone(),
                    reason: e.to_string(),
                }
            }
        };

        let resp = request.send().await.map_err(network_error)?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(network_error)?;

        debug!(method = %call.method, path = %call.path, status = status.as_u16(), "response received");
        Ok(Response::new(status, body).with_headers(headers))
    }
}
