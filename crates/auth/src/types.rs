use std::fmt;

use {
    bytes::Bytes,
    reqwest::{
        Method, StatusCode,
        header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
    },
    secrecy::{ExposeSecret, Secret},
    serde::de::DeserializeOwned,
};

/// Short-lived bearer token. The value never appears in `Debug` output.
#[derive(Clone)]
pub struct Credential(Secret<String>);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Secret::new(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Value for the `Authorization` header, marked sensitive so header
    /// dumps redact it.
    fn header_value(&self) -> Option<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.expose())).ok()?;
        value.set_sensitive(true);
        Some(value)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Credential {}

/// One HTTP request as handed to the dispatcher.
#[derive(Debug, Clone)]
pub struct OutgoingCall {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/incidents?page=2`.
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
    /// Set once the call has been resent after a credential refresh.
    pub already_retried: bool,
}

impl OutgoingCall {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
            already_retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Path without its query string.
    pub fn route(&self) -> &str {
        self.path
            .split_once('?')
            .map_or(self.path.as_str(), |(route, _)| route)
    }

    /// Token currently attached as `Authorization: Bearer <token>`, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
    }

    pub(crate) fn attach_credential(&mut self, credential: &Credential) {
        match credential.header_value() {
            Some(value) => {
                self.headers.insert(AUTHORIZATION, value);
            },
            None => {
                tracing::warn!(path = %self.path, "credential is not a valid header value, sending without it");
                self.headers.remove(AUTHORIZATION);
            },
        }
    }

    pub(crate) fn detach_credential(&mut self) {
        self.headers.remove(AUTHORIZATION);
    }
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    exhausted_retry: bool,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            exhausted_retry: false,
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// True for a 401 that came back on a call which had already been
    /// resent with a refreshed credential. No further refresh is attempted.
    pub fn is_exhausted_retry(&self) -> bool {
        self.exhausted_retry
    }

    pub(crate) fn into_exhausted_retry(mut self) -> Self {
        self.exhausted_retry = true;
        self
    }
}
