//! In-memory login session. Nothing here survives a restart.

use std::sync::{Arc, RwLock};

use crate::api::UserSession;

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<UserSession>,
}

/// Shared handle to the current bearer token; clones see the same session.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set_token(token);
        store
    }

    pub fn token(&self) -> Option<String> {
        self.with_read(|state| state.token.clone())
    }

    pub fn user(&self) -> Option<UserSession> {
        self.with_read(|state| state.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.with_read(|state| state.token.is_some())
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.with_write(|state| state.token = Some(token.into()));
    }

    pub fn establish(&self, user: UserSession) {
        self.with_write(|state| {
            state.token = Some(user.session_id.clone());
            state.user = Some(user);
        });
    }

    pub fn clear(&self) {
        self.with_write(|state| *state = SessionState::default());
    }

    fn with_read<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        match self.inner.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn with_write(&self, f: impl FnOnce(&mut SessionState)) {
        match self.inner.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}
