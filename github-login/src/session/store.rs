//! In-memory session store
//!
//! Tracks where each browser is in the login flow. Entries live for the
//! configured TTL and are treated as absent once expired.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::{SessionError, SessionId};
use crate::oauth2::{ExchangeResult, StateToken};

/// Where a browser session is in the login flow
#[derive(Debug, Clone, PartialEq)]
pub enum LoginState {
    /// No flow started
    Anonymous,
    /// Sent to the consent screen, waiting for the callback
    RedirectedToProvider {
        /// State token the callback must echo
        state: StateToken,
    },
    /// Callback accepted, token exchange in progress
    ExchangingToken,
    /// Flow completed
    Authenticated(ExchangeResult),
    /// Flow failed; a new one must be started
    Unauthorized,
}

impl LoginState {
    /// Short name for logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::RedirectedToProvider { .. } => "redirected_to_provider",
            Self::ExchangingToken => "exchanging_token",
            Self::Authenticated(_) => "authenticated",
            Self::Unauthorized => "unauthorized",
        }
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    state: LoginState,
    expires_at: DateTime<Utc>,
}

impl SessionEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Shared store of login sessions
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, SessionEntry>>>,
    ttl: Duration,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.lock().len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionStore {
    /// Create an empty store whose entries live for `ttl`
    #[must_use]
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
        }
    }

    /// Start a new flow
    ///
    /// Issues a fresh session id and state token. Any `previous` session of
    /// the same browser is discarded.
    #[must_use]
    pub fn begin(&self, previous: Option<&SessionId>) -> (SessionId, StateToken) {
        let session_id = SessionId::generate();
        let state = StateToken::generate();
        let entry = SessionEntry {
            state: LoginState::RedirectedToProvider {
                state: state.clone(),
            },
            expires_at: self.expiry(Utc::now()),
        };

        let mut sessions = self.sessions.lock();
        if let Some(previous) = previous {
            sessions.remove(previous);
        }
        sessions.insert(session_id.clone(), entry);

        (session_id, state)
    }

    /// Accept a callback for `session_id` carrying `state`
    ///
    /// The state is single use: on success the session moves to
    /// [`LoginState::ExchangingToken`], on mismatch to
    /// [`LoginState::Unauthorized`].
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotFound`] / [`SessionError::Expired`] for an unknown
    ///   or stale session
    /// - [`SessionError::NotPending`] if no callback is expected
    /// - [`SessionError::StateMismatch`] if `state` differs from the one issued
    pub fn take_pending(&self, session_id: &SessionId, state: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock();
        let entry = sessions.get_mut(session_id).ok_or(SessionError::NotFound)?;

        if entry.is_expired(Utc::now()) {
            sessions.remove(session_id);
            return Err(SessionError::Expired);
        }

        let LoginState::RedirectedToProvider { state: expected } = &entry.state else {
            return Err(SessionError::NotPending);
        };

        if expected.as_str() == state {
            entry.state = LoginState::ExchangingToken;
            Ok(())
        } else {
            entry.state = LoginState::Unauthorized;
            Err(SessionError::StateMismatch)
        }
    }

    /// Record a completed login; the session lives for another full TTL
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] / [`SessionError::Expired`] if the session
    /// was replaced or timed out while the exchange was running
    pub fn complete(
        &self,
        session_id: &SessionId,
        result: ExchangeResult,
    ) -> Result<(), SessionError> {
        self.transition(session_id, LoginState::Authenticated(result))
    }

    /// Record a failed login
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] / [`SessionError::Expired`] for an unknown
    /// or stale session; nothing is stored in that case
    pub fn fail(&self, session_id: &SessionId) -> Result<(), SessionError> {
        self.transition(session_id, LoginState::Unauthorized)
    }

    /// End a pending flow the provider refused
    ///
    /// Only a session waiting for its callback is moved to
    /// [`LoginState::Unauthorized`], and only if `state`, when supplied,
    /// matches the one issued. Anything else is left untouched.
    ///
    /// # Errors
    ///
    /// Same as [`take_pending`](Self::take_pending)
    pub fn abandon(
        &self,
        session_id: &SessionId,
        state: Option<&str>,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock();
        let entry = sessions.get_mut(session_id).ok_or(SessionError::NotFound)?;

        if entry.is_expired(Utc::now()) {
            return Err(SessionError::Expired);
        }

        let LoginState::RedirectedToProvider { state: expected } = &entry.state else {
            return Err(SessionError::NotPending);
        };

        if state.is_some_and(|state| state != expected.as_str()) {
            return Err(SessionError::StateMismatch);
        }

        entry.state = LoginState::Unauthorized;
        Ok(())
    }

    /// The login result, if the session completed and has not expired
    #[must_use]
    pub fn result(&self, session_id: &SessionId) -> Option<ExchangeResult> {
        match self.state(session_id) {
            LoginState::Authenticated(result) => Some(result),
            _ => None,
        }
    }

    /// Current state of `session_id`; unknown and expired sessions are
    /// [`LoginState::Anonymous`]
    #[must_use]
    pub fn state(&self, session_id: &SessionId) -> LoginState {
        let now = Utc::now();
        self.sessions
            .lock()
            .get(session_id)
            .filter(|entry| !entry.is_expired(now))
            .map_or(LoginState::Anonymous, |entry| entry.state.clone())
    }

    /// Drop every expired session, returning how many were removed
    #[must_use]
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(now));
        before - sessions.len()
    }

    /// Number of stored sessions, expired ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether the store holds no sessions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    fn transition(&self, session_id: &SessionId, state: LoginState) -> Result<(), SessionError> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock();
        let entry = sessions.get_mut(session_id).ok_or(SessionError::NotFound)?;

        if entry.is_expired(now) {
            return Err(SessionError::Expired);
        }

        entry.state = state;
        entry.expires_at = self.expiry(now);
        Ok(())
    }

    fn expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Purge expired sessions from `store` every `interval` until aborted
pub fn spawn_purge_task(
    store: SessionStore,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, remaining = store.len(), "Purged expired sessions");
            }
        }
    })
}
