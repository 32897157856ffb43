use chrono::Utc;
use job_logging::{job_info, job_warn};
use quizpress_core::{AuthState, Identity, Session};
use thiserror::Error;

use crate::prefs::{PreferenceError, PreferenceStore, IDENTITY_KEY};
use crate::settings::CredentialStore;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0} is not allowed to access this system")]
    NotAllowed(String),
    #[error("an identity is required")]
    EmptyIdentity,
    #[error("could not remember login: {0}")]
    Storage(#[from] PreferenceError),
}

/// Per-connection authentication state.
///
/// `LoggedOut -> LoggedIn` through [`login`](Self::login) or restoration in
/// [`is_authenticated`](Self::is_authenticated); `LoggedIn -> LoggedOut` through
/// [`logout`](Self::logout).
pub struct SessionManager<'a> {
    credentials: &'a CredentialStore,
    prefs: &'a dyn PreferenceStore,
    state: AuthState,
}

impl<'a> SessionManager<'a> {
    pub fn new(credentials: &'a CredentialStore, prefs: &'a dyn PreferenceStore) -> Self {
        Self {
            credentials,
            prefs,
            state: AuthState::LoggedOut,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.state.session()
    }

    /// True when a session exists, or one could be restored from the remembered
    /// identity. Restoration re-checks the allow-list every time.
    pub fn is_authenticated(&mut self) -> bool {
        if self.state.is_logged_in() {
            return true;
        }

        let saved = match self.prefs.get(IDENTITY_KEY) {
            Ok(saved) => saved,
            Err(err) => {
                job_warn!("Could not read remembered identity: {}", err);
                return false;
            }
        };
        let Some(identity) = saved.as_deref().and_then(Identity::parse) else {
            return false;
        };

        if !self.credentials.allowed().permits(&identity) {
            job_warn!("Remembered identity {} is no longer allowed", identity);
            return false;
        }

        job_info!("Restored session for {}", identity);
        self.state = AuthState::LoggedIn(Session::new(identity, Utc::now()));
        true
    }

    pub fn login(&mut self, raw: &str) -> Result<Session, AuthError> {
        if let Some(session) = self.state.session() {
            // Already logged in: no transition, no write.
            return Ok(session.clone());
        }

        let identity = Identity::parse(raw).ok_or(AuthError::EmptyIdentity)?;
        if !self.credentials.allowed().permits(&identity) {
            job_warn!("Login rejected for {}", identity);
            return Err(AuthError::NotAllowed(identity.to_string()));
        }

        self.prefs.set(IDENTITY_KEY, identity.as_str())?;
        let session = Session::new(identity, Utc::now());
        job_info!("Logged in as {}", session.identity());
        self.state = AuthState::LoggedIn(session.clone());
        Ok(session)
    }

    /// Forgets the remembered identity and clears the session, whatever the current state.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        let previous = std::mem::take(&mut self.state);
        if let AuthState::LoggedIn(session) = &previous {
            job_info!("Logged out {}", session.identity());
        }
        self.prefs.delete(IDENTITY_KEY)?;
        Ok(())
    }
}
