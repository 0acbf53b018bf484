use std::sync::Arc;

use {
    reqwest::StatusCode,
    tracing::{debug, warn},
};

use crate::{
    coordinator::RefreshCoordinator,
    endpoints::AuthEndpoints,
    error::DispatchError,
    store::CredentialStore,
    transport::Transport,
    types::{OutgoingCall, Response},
};

/// Sole egress point for tracker API calls.
///
/// Attaches the current credential, and on a 401 waits for the shared
/// refresh cycle and resends the call once with the new credential.
#[derive(Clone)]
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    coordinator: RefreshCoordinator,
    endpoints: AuthEndpoints,
}

impl RequestDispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        coordinator: RefreshCoordinator,
        endpoints: AuthEndpoints,
    ) -> Self {
        Self {
            transport,
            store,
            coordinator,
            endpoints,
        }
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn endpoints(&self) -> &AuthEndpoints {
        &self.endpoints
    }

    /// Send `call`, transparently recovering from one credential expiry.
    ///
    /// Non-401 responses and transport errors are returned untouched. A 401
    /// on a call that was already retried comes back as the response itself,
    /// flagged with [`Response::is_exhausted_retry`].
    pub async fn send(&self, mut call: OutgoingCall) -> Result<Response, DispatchError> {
        let issuing = self.endpoints.is_credential_issuing(call.route());
        if issuing {
            call.detach_credential();
        } else if let Some(credential) = self.store.get() {
            call.attach_credential(&credential);
        }

        let response = self.transport.execute(&call).await?;
        if issuing || response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if call.already_retried {
            warn!(method = %call.method, path = %call.path, "unauthorized after credential refresh");
            return Ok(response.into_exhausted_retry());
        }

        call.already_retried = true;
        debug!(method = %call.method, path = %call.path, "credential rejected, awaiting refresh");
        let credential = self.coordinator.obtain_credential().await?;
        call.attach_credential(&credential);

        let retried = self.transport.execute(&call).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            warn!(method = %call.method, path = %call.path, "unauthorized after credential refresh");
            return Ok(retried.into_exhausted_retry());
        }
        Ok(retried)
    }
}
