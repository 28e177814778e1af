//! Application state store.

use std::sync::Arc;

use linkup_shared::Session;
use tokio::sync::watch;

/// Holds the entities the UI renders, e.g. the current session.
#[derive(Clone, Debug)]
pub struct AppStore {
    session: Arc<watch::Sender<Option<Session>>>,
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStore {
    pub fn new() -> Self {
        Self {
            session: Arc::new(watch::Sender::new(None)),
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub fn set_session(&self, session: Option<Session>) {
        self.session.send_replace(session);
    }

    pub fn clear_session(&self) {
        self.set_session(None);
    }

    /// Receiver that observes every change to the current session.
    pub fn subscribe_session(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }
}
