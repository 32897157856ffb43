use chrono::{DateTime, Utc};

use crate::Identity;

/// An authenticated session. Always bound to exactly one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    identity: Identity,
    established_at: DateTime<Utc>,
}

impl Session {
    pub fn new(identity: Identity, established_at: DateTime<Utc>) -> Self {
        Self {
            identity,
            established_at,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    LoggedOut,
    LoggedIn(Session),
}

impl AuthState {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, AuthState::LoggedIn(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::LoggedIn(session) => Some(session),
            AuthState::LoggedOut => None,
        }
    }
}
