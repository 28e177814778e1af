//! Linkup Client - command-line entry point
//!
//! Connects to the configured backend, mirrors server pushes into the stores,
//! and logs what happens until Ctrl-C.

use anyhow::Context;
use linkup_client::logging::init_tracing;
use linkup_client::storage::Storage;
use linkup_client::{stores, AppStore, AuthStore, Listener, RealtimeClient, RealtimeConfig};
use linkup_client::{log_info, log_warn};
use linkup_shared::{EVENT_CLOSE, EVENT_OPEN};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("linkup_client=debug");

    let config = RealtimeConfig::from_env();

    let auth = match Storage::default_location() {
        Some(storage) => AuthStore::with_storage(storage),
        None => {
            log_warn!("no config directory available, session will not be persisted");
            AuthStore::new()
        }
    };
    if let Ok(token) = std::env::var("LINKUP_TOKEN") {
        auth.set_token(Some(token));
    }
    let token = auth
        .token()
        .context("no session token: set LINKUP_TOKEN")?;

    let app = AppStore::new();
    let client = RealtimeClient::new(config);

    let _bindings = stores::bind(&client, &app, &auth);
    let _opened = client.on(EVENT_OPEN, Listener::new(|_| log_info!("realtime connection open")));
    let _closed = client.on(
        EVENT_CLOSE,
        Listener::new(|_| log_info!("realtime connection lost")),
    );

    let mut sessions = app.subscribe_session();
    tokio::spawn(async move {
        while sessions.changed().await.is_ok() {
            match sessions.borrow_and_update().as_ref() {
                Some(session) => log_info!("current session: {} ({:?})", session.id, session.status),
                None => log_info!("no current session"),
            }
        }
    });

    let mut states = client.watch_state();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            log_info!("connection state: {:?}", state);
        }
    });

    client.connect(&token)?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    client.disconnect()?;
    client.shutdown()?;
    Ok(())
}
