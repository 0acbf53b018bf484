//! In-process tracker API used by the unit tests.

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use {async_trait::async_trait, reqwest::StatusCode, tokio::sync::Semaphore};

use crate::{
    error::TransportError,
    signal::SessionTerminationSignal,
    transport::Transport,
    types::{OutgoingCall, Response},
};

pub(crate) const USER_JSON: &str = r#"{
    "id": "6f1c2a8e-4f7b-4d3a-9b1e-2c5d8e7f9a01",
    "name": "Dana Ops",
    "email": "dana@example.com",
    "role": "AGENT",
    "isActive": true,
    "createdAt": "2025-01-10T09:00:00Z",
    "updatedAt": "2025-02-01T12:30:00Z"
}"#;

/// Scripted answer for the next `/auth/refresh` call.
pub(crate) enum RefreshReply {
    /// Issue the token and start accepting it.
    Token(&'static str),
    /// Issue the token but keep rejecting it.
    Unaccepted(&'static str),
    Status(u16),
    Body(&'static str),
    Unreachable,
}

/// Accepts exactly one bearer token on protected routes and answers 401
/// otherwise. Refresh calls can be held until the test releases them.
pub(crate) struct FakeApi {
    accepted: Mutex<Option<String>>,
    replies: Mutex<VecDeque<RefreshReply>>,
    gate: Option<Semaphore>,
    calls: Mutex<Vec<OutgoingCall>>,
    refresh_calls: AtomicUsize,
    unauthorized: AtomicUsize,
}

impl FakeApi {
    pub(crate) fn new(replies: Vec<RefreshReply>) -> Self {
        Self {
            accepted: Mutex::new(None),
            replies: Mutex::new(replies.into()),
            gate: None,
            calls: Mutex::new(Vec::new()),
            refresh_calls: AtomicUsize::new(0),
            unauthorized: AtomicUsize::new(0),
        }
    }

    /// Like `new`, but refresh calls block until [`Self::release_refresh`].
    pub(crate) fn gated(replies: Vec<RefreshReply>) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(replies)
        }
    }

    pub(crate) fn accepting(self, token: &str) -> Self {
        *self.accepted.lock().unwrap() = Some(token.to_string());
        self
    }

    /// Stop accepting whatever token is currently valid.
    pub(crate) fn revoke(&self) {
        *self.accepted.lock().unwrap() = None;
    }

    pub(crate) fn release_refresh(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn unauthorized_responses(&self) -> usize {
        self.unauthorized.load(Ordering::SeqCst)
    }

    /// Every call that reached the API, in arrival order.
    pub(crate) fn calls(&self) -> Vec<OutgoingCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, route: &str) -> Vec<OutgoingCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.route() == route)
            .collect()
    }

    async fn refresh(&self) -> Result<Response, TransportError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(RefreshReply::Token(token)) => {
                *self.accepted.lock().unwrap() = Some(token.to_string());
                Ok(token_response(token))
            },
            Some(RefreshReply::Unaccepted(token)) => Ok(token_response(token)),
            Some(RefreshReply::Status(code)) => Ok(Response::new(
                StatusCode::from_u16(code).unwrap(),
                "{\"error\":\"refresh denied\"}",
            )),
            Some(RefreshReply::Body(body)) => Ok(Response::new(StatusCode::OK, body)),
            Some(RefreshReply::Unreachable) => Err(TransportError::Network {
                path: "/auth/refresh".into(),
                reason: "connection refused".into(),
            }),
            None => Ok(Response::new(StatusCode::INTERNAL_SERVER_ERROR, "")),
        }
    }

    fn protected(&self, call: &OutgoingCall) -> Response {
        let accepted = self.accepted.lock().unwrap().clone();
        if accepted.is_none() || call.bearer() != accepted.as_deref() {
            self.unauthorized.fetch_add(1, Ordering::SeqCst);
            return Response::new(StatusCode::UNAUTHORIZED, "{\"error\":\"unauthorized\"}");
        }
        if call.route() == "/auth/me" {
            return Response::new(StatusCode::OK, USER_JSON);
        }
        let body = serde_json::json!({ "method": call.method.as_str(), "path": call.path });
        Response::new(StatusCode::OK, body.to_string())
    }
}

fn token_response(token: &str) -> Response {
    Response::new(
        StatusCode::OK,
        serde_json::json!({ "accessToken": token }).to_string(),
    )
}

#[async_trait]
impl Transport for FakeApi {
    async fn execute(&self, call: &OutgoingCall) -> Result<Response, TransportError> {
        self.calls.lock().unwrap().push(call.clone());

        match call.route() {
            "/auth/refresh" => self.refresh().await,
            "/auth/login" => {
                let password = call
                    .body
                    .as_ref()
                    .and_then(|b| b["password"].as_str())
                    .unwrap_or_default();
                if password != "correct-horse" {
                    return Ok(Response::new(
                        StatusCode::UNAUTHORIZED,
                        "{\"error\":\"invalid credentials\"}",
                    ));
                }
                *self.accepted.lock().unwrap() = Some("T1".into());
                let body = format!("{{\"user\": {USER_JSON}, \"accessToken\": \"T1\"}}");
                Ok(Response::new(StatusCode::OK, body))
            },
            "/auth/logout" => {
                *self.accepted.lock().unwrap() = None;
                Ok(Response::new(StatusCode::NO_CONTENT, ""))
            },
            "/down" => Err(TransportError::Network {
                path: call.path.clone(),
                reason: "connection reset".into(),
            }),
            _ => Ok(self.protected(call)),
        }
    }
}

#[derive(Default)]
pub(crate) struct SignalCounter {
    fired: AtomicUsize,
}

impl SignalCounter {
    pub(crate) fn count(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

impl SessionTerminationSignal for SignalCounter {
    fn notify_expired(&self) {
        self.fired.fetch_add(1, Ordering::SeqCst);
    }
}
