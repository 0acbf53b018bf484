//! Typed client for the auth endpoints, built on the dispatcher.

use std::sync::Arc;

use {
    secrecy::Secret,
    serde::de::DeserializeOwned,
    tracing::{info, warn},
    triage_config::{TriageConfig, credentials_path},
};

use crate::{
    coordinator::RefreshCoordinator,
    dispatcher::RequestDispatcher,
    dto::{LoginRequest, LoginResponse, UserPublic},
    endpoints::AuthEndpoints,
    error::{ApiError, TransportError},
    signal::SessionTerminationSignal,
    store::{CredentialStore, FileCredentialStore},
    transport::{ReqwestTransport, Transport},
    types::{Credential, OutgoingCall, Response},
};

#[derive(Clone)]
pub struct AuthClient {
    dispatcher: RequestDispatcher,
    store: Arc<dyn CredentialStore>,
}

impl AuthClient {
    pub fn new(dispatcher: RequestDispatcher, store: Arc<dyn CredentialStore>) -> Self {
        Self { dispatcher, store }
    }

    /// Wire the full stack from config: reqwest transport, file-backed
    /// credential store, refresh coordinator and dispatcher.
    pub fn from_config(
        config: &TriageConfig,
        signal: Arc<dyn SessionTerminationSignal>,
    ) -> Result<Self, TransportError> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::from_config(&config.api)?);
        let store: Arc<dyn CredentialStore> =
            Arc::new(FileCredentialStore::open(credentials_path(config)));
        let endpoints = AuthEndpoints::from_config(&config.auth);

        let coordinator = RefreshCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            signal,
            endpoints.refresh.clone(),
        )
        .with_timeout(config.auth.refresh_timeout());
        let dispatcher =
            RequestDispatcher::new(transport, Arc::clone(&store), coordinator, endpoints);

        Ok(Self::new(dispatcher, store))
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.get().is_some()
    }

    /// Exchange email and password for an access credential.
    pub async fn login(&self, email: &str, password: Secret<String>) -> Result<LoginResponse, ApiError> {
        let path = self.dispatcher.endpoints().login.clone();
        let body = LoginRequest {
            email: email.to_string(),
            password,
        };
        let body = serde_json::to_value(&body).map_err(ApiError::Encode)?;

        let response = self
            .dispatcher
            .send(OutgoingCall::post(path.clone()).with_json(body))
            .await?;
        let login: LoginResponse = decode(&path, expect_success(&path, response)?)?;

        self.store.set(Credential::new(login.access_token.clone()));
        info!(user = %login.user.email, role = ?login.user.role, "logged in");
        Ok(login)
    }

    /// End the session. The local credential is dropped even when the
    /// server call fails, and that failure is still reported.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let path = self.dispatcher.endpoints().logout.clone();
        let result = self
            .dispatcher
            .send(OutgoingCall::post(path.clone()).with_json(serde_json::json!({})))
            .await;
        self.store.clear();

        match result {
            Ok(response) => expect_success(&path, response).map(|_| ()),
            Err(e) => {
                warn!(error = %e, "logout request failed, local session cleared anyway");
                Err(e.into())
            },
        }
    }

    /// Fetch the user the current credential belongs to.
    pub async fn me(&self) -> Result<UserPublic, ApiError> {
        let path = self.dispatcher.endpoints().me.clone();
        let response = self.dispatcher.send(OutgoingCall::get(path.clone())).await?;
        decode(&path, expect_success(&path, response)?)
    }
}

fn expect_success(path: &str, response: Response) -> Result<Response, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    Err(ApiError::Status {
        path: path.to_string(),
        status: response.status(),
        body: response.text(),
    })
}

fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ApiError> {
    response.json().map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}
