//! Single-flight credential refresh.
//!
//! However many requests hit a 401 at once, one `POST /auth/refresh` is
//! issued. Callers arriving while it is outstanding queue on the cycle and
//! all of them receive the same outcome.

use std::{
    panic::AssertUnwindSafe,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    futures::FutureExt,
    tokio::sync::oneshot,
    tracing::{debug, info, warn},
};

use crate::{
    dto::RefreshResponse,
    error::RefreshError,
    signal::SessionTerminationSignal,
    store::CredentialStore,
    transport::Transport,
    types::{Credential, OutgoingCall},
};

type Outcome = Result<Credential, RefreshError>;

enum Phase {
    Idle,
    Refreshing {
        cycle: u64,
        /// Parked callers in arrival order; the initiator is first.
        waiters: Vec<oneshot::Sender<Outcome>>,
    },
}

struct Inner {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    signal: Arc<dyn SessionTerminationSignal>,
    refresh_path: String,
    timeout: Mutex<Option<Duration>>,
    // Never held across an await.
    phase: Mutex<Phase>,
    cycles: AtomicU64,
}

/// Owner of the refresh state machine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        signal: Arc<dyn SessionTerminationSignal>,
        refresh_path: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                store,
                signal,
                refresh_path: refresh_path.into(),
                timeout: Mutex::new(None),
                phase: Mutex::new(Phase::Idle),
                cycles: AtomicU64::new(0),
            }),
        }
    }

    /// Bound every refresh cycle; a cycle that has not settled by then
    /// fails with [`RefreshError::TimedOut`].
    ///
    /// The bound is shared by all clones and applies from the next cycle on.
    #[must_use]
    pub fn with_timeout(self, timeout: Option<Duration>) -> Self {
        *self
            .inner
            .timeout
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = timeout;
        self
    }

    /// Get a fresh credential, joining the in-flight cycle if there is one
    /// or starting a new cycle otherwise.
    pub async fn obtain_credential(&self) -> Result<Credential, RefreshError> {
        let (tx, rx) = oneshot::channel();

        let started = {
            let mut phase = self.inner.lock_phase();
            match &mut *phase {
                Phase::Refreshing { cycle, waiters } => {
                    waiters.push(tx);
                    debug!(cycle = *cycle, queued = waiters.len(), "joined in-flight refresh");
                    None
                },
                Phase::Idle => {
                    let cycle = self.inner.cycles.fetch_add(1, Ordering::SeqCst) + 1;
                    *phase = Phase::Refreshing {
                        cycle,
                        waiters: vec![tx],
                    };
                    Some(cycle)
                },
            }
        };

        // The upstream call runs detached so a caller dropping its future
        // cannot leave the other waiters parked on a cycle nobody drives.
        if let Some(cycle) = started {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.run_cycle(cycle).await });
        }

        rx.await.unwrap_or(Err(RefreshError::Abandoned))
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.inner.lock_phase(), Phase::Refreshing { .. })
    }

    /// Callers parked on the in-flight cycle, initiator included.
    pub fn pending_waiters(&self) -> usize {
        match &*self.inner.lock_phase() {
            Phase::Refreshing { waiters, .. } => waiters.len(),
            Phase::Idle => 0,
        }
    }

    /// Number of refresh cycles started so far.
    pub fn cycles_started(&self) -> u64 {
        self.inner.cycles.load(Ordering::SeqCst)
    }
}

impl Inner {
    fn lock_phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_cycle(&self, cycle: u64) {
        info!(cycle, "refreshing access credential");

        let outcome = AssertUnwindSafe(self.bounded_refresh())
            .catch_unwind()
            .await
            .unwrap_or(Err(RefreshError::Abandoned));

        // Store update, waiter hand-off and the return to Idle happen under
        // one lock: a late caller lands either in this list or in a new cycle.
        // A file-backed store writes synchronously here, so the lock is held
        // for one small file write once per cycle.
        let waiters = {
            let mut phase = self.lock_phase();
            match &outcome {
                Ok(credential) => self.store.set(credential.clone()),
                Err(_) => self.store.clear(),
            }
            match std::mem::replace(&mut *phase, Phase::Idle) {
                Phase::Refreshing { waiters, .. } => waiters,
                Phase::Idle => Vec::new(),
            }
        };

        match &outcome {
            Ok(_) => info!(cycle, released = waiters.len(), "access credential refreshed"),
            Err(e) => {
                warn!(cycle, released = waiters.len(), error = %e, "credential refresh failed, ending session");
                self.signal.notify_expired();
            },
        }

        for waiter in waiters {
            // A waiter whose caller went away has nothing left to receive.
            let _ = waiter.send(outcome.clone());
        }
    }

    async fn bounded_refresh(&self) -> Outcome {
        let timeout = *self.timeout.lock().unwrap_or_else(PoisonError::into_inner);
        match timeout {
            Some(after) => tokio::time::timeout(after, self.request_credential())
                .await
                .unwrap_or(Err(RefreshError::TimedOut { after })),
            None => self.request_credential().await,
        }
    }

    async fn request_credential(&self) -> Outcome {
        let call = OutgoingCall::post(self.refresh_path.clone()).with_json(serde_json::json!({}));
        let response = self.transport.execute(&call).await?;

        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status(),
            });
        }

        let body: RefreshResponse =
            response
                .json()
                .map_err(|e| RefreshError::MalformedResponse {
                    reason: e.to_string(),
                })?;
        if body.access_token.is_empty() {
            return Err(RefreshError::MalformedResponse {
                reason: "empty accessToken".into(),
            });
        }

        Ok(Credential::new(body.access_token))
    }
}
