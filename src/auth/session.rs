use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use super::IdentityProvider;
use crate::error::{Error, Result};
use crate::observe::{Subscription, lock};
use crate::types::{Principal, Session};

/// Tracks who is signed in.
///
/// Starts in `loading` and leaves it exactly once, on the first auth-state
/// callback. Holds a single identity-provider subscription for its lifetime.
pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    state: Arc<watch::Sender<Session>>,
    registration: Mutex<Option<Subscription>>,
}

impl SessionStore {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (tx, _rx) = watch::channel(Session::default());
        let state = Arc::new(tx);

        let weak = Arc::downgrade(&state);
        let registration = provider.subscribe_auth_state(Box::new(move |principal| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            state.send_if_modified(|session| {
                let changed = session.loading || session.principal != principal;
                if changed {
                    tracing::debug!(
                        principal = principal.as_ref().map(|p| p.id.as_str()),
                        "auth state changed"
                    );
                }
                session.loading = false;
                session.principal = principal;
                changed
            });
        }));

        Self {
            provider,
            state,
            registration: Mutex::new(Some(registration)),
        }
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Signed-in principal; `None` while loading or when signed out.
    #[must_use]
    pub fn principal(&self) -> Option<Principal> {
        let session = self.state.borrow();
        if session.loading {
            None
        } else {
            session.principal.clone()
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Resolves once the identity provider has reported for the first time.
    pub async fn wait_until_loaded(&self) -> Result<Session> {
        let mut rx = self.subscribe();
        let session = rx
            .wait_for(|session| !session.loading)
            .await
            .map_err(|e| Error::Subscription(e.to_string()))?;
        Ok(session.clone())
    }

    /// Asks the provider to end the session; the resulting auth-state update
    /// clears `principal`.
    pub async fn sign_out(&self) -> Result<()> {
        self.provider.sign_out().await
    }

    /// Drops the identity-provider subscription. Later provider updates are
    /// no longer observed.
    pub fn teardown(&self) {
        if let Some(registration) = lock(&self.registration).take() {
            registration.unsubscribe();
        }
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        lock(&self.registration).is_some()
    }
}
