//! Authentication store with optional disk persistence.

use std::sync::Arc;

use linkup_shared::User;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::storage::Storage;

const STORAGE_KEY: &str = "linkup_session";

/// Stored session data
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthState {
    pub token: Option<String>,
    pub user: Option<User>,
}

/// Holds the token used to `connect` and the signed-in user.
#[derive(Clone, Debug)]
pub struct AuthStore {
    state: Arc<watch::Sender<AuthState>>,
    storage: Option<Storage>,
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStore {
    /// In-memory store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(watch::Sender::new(AuthState::default())),
            storage: None,
        }
    }

    /// Store persisted in `storage`, starting from whatever was saved there.
    pub fn with_storage(storage: Storage) -> Self {
        let initial = storage.load::<AuthState>(STORAGE_KEY).unwrap_or_default();
        Self {
            state: Arc::new(watch::Sender::new(initial)),
            storage: Some(storage),
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().token.is_some()
    }

    pub fn set_token(&self, token: Option<String>) {
        self.update(|state| state.token = token);
    }

    pub fn set_user(&self, user: Option<User>) {
        self.update(|state| state.user = user);
    }

    pub fn login(&self, token: String, user: Option<User>) {
        self.update(|state| {
            state.token = Some(token);
            state.user = user;
        });
    }

    /// Clear the session, including its persisted copy.
    pub fn logout(&self) {
        self.state.send_replace(AuthState::default());
        if let Some(storage) = &self.storage {
            storage.remove(STORAGE_KEY);
        }
    }

    /// Receiver that observes every change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn update(&self, apply: impl FnOnce(&mut AuthState)) {
        self.state.send_modify(apply);
        if let Some(storage) = &self.storage {
            if !storage.save(STORAGE_KEY, &*self.state.borrow()) {
                crate::log_warn!("failed to persist auth session");
            }
        }
    }
}
