//! Client session state and its durable storage boundary.
//!
//! A [`SessionStore`] holds the live [`Session`] behind a lock, writes every
//! mutation through to the [`Database`], and broadcasts [`SessionEvent`]s so
//! the hosting application can react to sign-in, sign-out and forced
//! redirects.

mod cookies;

pub use cookies::PersistentCookieJar;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::storage::models::{Account, PersistedSession};
use crate::storage::{Database, DatabaseError};

/// The in-memory session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub account: Option<Account>,
    pub is_authenticated: bool,
}

impl Session {
    /// Rebuild a session from its persisted form
    pub fn load(persisted: PersistedSession) -> Self {
        Self {
            access_token: persisted.access_token,
            account: persisted.account,
            is_authenticated: persisted.is_authenticated,
        }
    }

    /// The fields written to disk
    pub fn save(&self) -> PersistedSession {
        PersistedSession {
            access_token: self.access_token.clone(),
            account: self.account.clone(),
            is_authenticated: self.is_authenticated,
        }
    }
}

/// Notifications emitted on session transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Authenticated,
    Cleared,
    /// The session could not be renewed; the client must go to `path`
    RedirectToSignin { path: String },
}

const EVENT_CAPACITY: usize = 16;

pub struct SessionStore {
    db: Database,
    events: broadcast::Sender<SessionEvent>,
    state: RwLock<Session>,
}

impl SessionStore {
    /// Open the store, loading whatever session was persisted last.
    pub fn open(db: Database) -> Result<Self, DatabaseError> {
        let session = db.load_session()?.map(Session::load).unwrap_or_default();
        debug!(
            authenticated = session.is_authenticated,
            "Loaded persisted session"
        );
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            db,
            events,
            state: RwLock::new(session),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Session {
        self.state.read().await.clone()
    }

    /// The current access token, read at call time
    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.access_token.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated
    }

    pub async fn set_auth(&self, access_token: String, account: Account) {
        let mut state = self.state.write().await;
        *state = Session {
            access_token: Some(access_token),
            account: Some(account),
            is_authenticated: true,
        };
        self.persist(&state);
        drop(state);
        self.emit(SessionEvent::Authenticated);
    }

    pub async fn clear_auth(&self) {
        let mut state = self.state.write().await;
        *state = Session::default();
        self.persist(&state);
        drop(state);
        self.emit(SessionEvent::Cleared);
    }

    pub async fn update_access_token(&self, access_token: String) {
        let mut state = self.state.write().await;
        state.access_token = Some(access_token);
        self.persist(&state);
    }

    /// Replace the account profile, keeping the current token
    pub async fn update_account(&self, account: Account) {
        let mut state = self.state.write().await;
        state.account = Some(account);
        self.persist(&state);
    }

    pub(crate) fn redirect_to_signin(&self, path: &str) {
        self.emit(SessionEvent::RedirectToSignin {
            path: path.to_string(),
        });
    }

    fn persist(&self, session: &Session) {
        // Disk is best-effort: the in-memory session stays authoritative
        if let Err(e) = self.db.save_session(&session.save()) {
            warn!(error = %e, "Failed to persist session");
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}
