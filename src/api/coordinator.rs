//! Single-flight token refresh for authenticated calls.
//!
//! Every authenticated request goes through [`RefreshCoordinator::dispatch`].
//! When the API rejects the access token with a 401, the first request to
//! notice starts a refresh; requests that hit a 401 while that refresh is in
//! flight wait on a oneshot instead of starting their own. Once the refresh
//! settles, the waiters are woken in arrival order and each one replays its
//! request once with the renewed token, or fails with the refresh error.
//!
//! ```text
//! IDLE --401--> REFRESHING --ok--> IDLE (waiters resolved, requests replayed)
//!                 |   ^    --err-> IDLE (waiters rejected, session cleared,
//!                 +401+              redirect to sign-in)
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::response::ApiError;
use super::transport::{ApiRequest, RawResponse, Transport};
use crate::session::SessionStore;
use crate::storage::models::Account;

/// Credentials returned by a successful refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshedCredentials {
    pub access: String,
    pub account: Account,
}

/// Exchanges the long-lived credential for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<RefreshedCredentials, ApiError>;
}

type Waiter = oneshot::Sender<Result<(), Arc<ApiError>>>;

enum RefreshState {
    Idle,
    Refreshing { waiters: Vec<Waiter> },
}

enum Entry<'a> {
    /// This request drives the refresh
    Leader(RefreshGuard<'a>),
    /// A refresh is already in flight; wait for it to settle
    Queued(oneshot::Receiver<Result<(), Arc<ApiError>>>),
}

pub struct RefreshCoordinator {
    refresh_timeout: Option<Duration>,
    refresher: Arc<dyn TokenRefresher>,
    session: Arc<SessionStore>,
    signin_path: String,
    state: Mutex<RefreshState>,
    transport: Arc<dyn Transport>,
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        refresher: Arc<dyn TokenRefresher>,
        session: Arc<SessionStore>,
        signin_path: impl Into<String>,
    ) -> Self {
        Self {
            refresh_timeout: None,
            refresher,
            session,
            signin_path: signin_path.into(),
            state: Mutex::new(RefreshState::Idle),
            transport,
        }
    }

    /// Bound each refresh call. An elapsed bound counts as a failed refresh.
    pub fn with_refresh_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock_state(), RefreshState::Refreshing { .. })
    }

    /// Number of requests waiting on the in-flight refresh
    pub fn pending(&self) -> usize {
        match &*self.lock_state() {
            RefreshState::Refreshing { waiters } => waiters.len(),
            RefreshState::Idle => 0,
        }
    }

    /// Send an authenticated request, refreshing the session on a 401.
    ///
    /// A request is replayed at most once. Any response other than a first
    /// 401 is returned as-is (non-2xx as [`ApiError::Status`]).
    pub async fn dispatch(&self, mut request: ApiRequest) -> Result<RawResponse, ApiError> {
        let response = self.send(&request).await?;
        if !response.is_unauthorized() || request.is_retried() {
            return response.into_result();
        }
        request.mark_retried();

        match self.enter() {
            Entry::Queued(settled) => {
                debug!(
                    request_id = %request.id,
                    path = %request.path,
                    "Refresh in flight, queueing request"
                );
                match settled.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => return Err(ApiError::RefreshFailed(e)),
                    Err(_) => return Err(ApiError::RefreshAbandoned),
                }
            }
            Entry::Leader(guard) => {
                self.refresh(guard).await.map_err(ApiError::RefreshFailed)?;
            }
        }

        debug!(request_id = %request.id, path = %request.path, "Replaying request");
        self.send(&request).await?.into_result()
    }

    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        let token = self.session.access_token().await;
        self.transport.send(request, token.as_deref()).await
    }

    fn enter(&self) -> Entry<'_> {
        let mut state = self.lock_state();
        if let RefreshState::Refreshing { waiters } = &mut *state {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            return Entry::Queued(rx);
        }

        *state = RefreshState::Refreshing {
            waiters: Vec::new(),
        };
        Entry::Leader(RefreshGuard {
            coordinator: self,
            settled: false,
        })
    }

    async fn refresh(&self, guard: RefreshGuard<'_>) -> Result<(), Arc<ApiError>> {
        info!("Access token rejected, refreshing session");

        match self.call_refresher().await {
            Ok(renewed) => {
                self.session.set_auth(renewed.access, renewed.account).await;
                let released = guard.settle(Ok(()));
                info!(released, "Session refreshed");
                Ok(())
            }
            Err(e) => {
                let e = Arc::new(e);
                warn!(error = %e, "Session refresh failed, signing out");
                // Cleared before going idle so a new cycle never races the logout
                self.session.clear_auth().await;
                let rejected = guard.settle(Err(Arc::clone(&e)));
                debug!(rejected, "Rejected queued requests");
                self.session.redirect_to_signin(&self.signin_path);
                Err(e)
            }
        }
    }

    async fn call_refresher(&self) -> Result<RefreshedCredentials, ApiError> {
        match self.refresh_timeout {
            Some(limit) => tokio::time::timeout(limit, self.refresher.refresh())
                .await
                .unwrap_or(Err(ApiError::RefreshTimeout(limit))),
            None => self.refresher.refresh().await,
        }
    }

    /// Return to idle, handing back whoever was waiting
    fn reset(&self) -> Vec<Waiter> {
        let mut state = self.lock_state();
        match std::mem::replace(&mut *state, RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refresh_timeout", &self.refresh_timeout)
            .field("signin_path", &self.signin_path)
            .finish_non_exhaustive()
    }
}

/// Held by the request driving a refresh.
///
/// Dropping it without settling (the driving future was cancelled) puts the
/// coordinator back to idle and wakes every waiter with a closed channel.
struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshGuard<'_> {
    /// Go idle and deliver `outcome` to the waiters in arrival order.
    fn settle(mut self, outcome: Result<(), Arc<ApiError>>) -> usize {
        self.settled = true;
        let waiters = self.coordinator.reset();
        let count = waiters.len();
        for waiter in waiters {
            // The waiting request may have been cancelled
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let waiters = self.coordinator.reset();
            warn!(
                pending = waiters.len(),
                "Refresh abandoned before it settled"
            );
        }
    }
}
