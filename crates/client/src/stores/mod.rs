//! Global stores for application state.
//!
//! Both stores are plain last-write-wins holders on `tokio::sync::watch`, so
//! any part of the application can read the current value or await changes.
//! [`bind`] wires them to the realtime connection.

pub mod app;
pub mod auth;

pub use app::AppStore;
pub use auth::{AuthState, AuthStore};

use linkup_shared::{SessionUpdated, UserUpdated};

use crate::ws::{RealtimeClient, Subscription};

/// Populate the stores from server pushes: `session_update` sets the current
/// session, `user_update` sets the signed-in user.
pub fn bind(client: &RealtimeClient, app: &AppStore, auth: &AuthStore) -> Vec<Subscription> {
    let app = app.clone();
    let sessions = client.on_message(move |update: SessionUpdated| {
        app.set_session(update.session);
    });

    let auth = auth.clone();
    let users = client.on_message(move |update: UserUpdated| {
        auth.set_user(Some(update.user));
    });

    vec![sessions, users]
}
