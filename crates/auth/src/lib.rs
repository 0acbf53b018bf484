//! Authenticated access to the incident tracker API.
//!
//! [`RequestDispatcher`] is the single egress point: it attaches the bearer
//! credential and, when the server answers 401, asks the
//! [`RefreshCoordinator`] for a new one. The coordinator guarantees a single
//! upstream refresh per expiry no matter how many requests are in flight,
//! and fires the [`SessionTerminationSignal`] when the refresh fails.

pub mod api;
pub mod coordinator;
pub mod dispatcher;
pub mod dto;
pub mod endpoints;
pub mod error;
pub mod signal;
pub mod store;
pub mod transport;
pub mod types;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod testing;

pub use {
    api::AuthClient,
    coordinator::RefreshCoordinator,
    dispatcher::RequestDispatcher,
    dto::{LoginRequest, LoginResponse, RefreshResponse, Role, UserPublic},
    endpoints::AuthEndpoints,
    error::{ApiError, DispatchError, RefreshError, TransportError},
    signal::{SessionEvent, SessionEvents, SessionTerminationSignal},
    store::{CredentialStore, FileCredentialStore, MemoryCredentialStore},
    transport::{ReqwestTransport, Transport},
    types::{Credential, OutgoingCall, Response},
};
