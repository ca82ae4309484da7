use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::observe::{Listeners, Subscription, lock};
use crate::types::Principal;

pub type AuthCallback = Box<dyn Fn(Option<Principal>) + Send + Sync>;

/// The identity provider as the console sees it.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Principal signed in right now, if any.
    fn current_principal(&self) -> Option<Principal>;

    /// Registers for auth-state changes. The callback receives the current
    /// state at least once, then every change until the handle is dropped.
    fn subscribe_auth_state(&self, on_change: AuthCallback) -> Subscription;

    /// Ends the session. Subscribers observe the sign-out as a `None` update.
    async fn sign_out(&self) -> Result<()>;

    /// A bearer token for `principal`, fetched fresh for each call.
    async fn fresh_token(&self, principal: &Principal) -> Result<String>;
}

#[derive(Default)]
struct IdentityState {
    principal: Option<Principal>,
    token: Option<String>,
}

/// Identity provider backed by a locally stored principal and token, as
/// written by `shoreline auth login`.
pub struct LocalIdentity {
    state: Mutex<IdentityState>,
    listeners: Listeners<Option<Principal>>,
    credentials_path: Option<PathBuf>,
}

impl LocalIdentity {
    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            state: Mutex::new(IdentityState::default()),
            listeners: Listeners::new(),
            credentials_path: None,
        }
    }

    #[must_use]
    pub fn signed_in(principal: Principal, token: impl Into<String>) -> Self {
        let identity = Self::signed_out();
        {
            let mut state = lock(&identity.state);
            state.principal = Some(principal);
            state.token = Some(token.into());
        }
        identity
    }

    /// Signing out also deletes this credentials file.
    #[must_use]
    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    pub fn sign_in(&self, principal: Principal, token: impl Into<String>) {
        {
            let mut state = lock(&self.state);
            state.principal = Some(principal.clone());
            state.token = Some(token.into());
        }
        self.listeners.emit(Some(principal));
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    fn current_principal(&self) -> Option<Principal> {
        lock(&self.state).principal.clone()
    }

    fn subscribe_auth_state(&self, on_change: AuthCallback) -> Subscription {
        let callback: Arc<dyn Fn(Option<Principal>) + Send + Sync> = Arc::from(on_change);
        let registered = Arc::clone(&callback);
        let subscription = self.listeners.add(move |principal| registered(principal));
        callback(self.current_principal());
        subscription
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(path) = &self.credentials_path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        *lock(&self.state) = IdentityState::default();
        tracing::debug!("signed out");
        self.listeners.emit(None);
        Ok(())
    }

    async fn fresh_token(&self, principal: &Principal) -> Result<String> {
        let state = lock(&self.state);
        match (&state.principal, &state.token) {
            (Some(current), Some(token)) if current.id == principal.id => Ok(token.clone()),
            _ => Err(Error::AuthenticationRequired),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<Option<String>>>>, AuthCallback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: AuthCallback = Box::new(move |p: Option<Principal>| {
            lock(&sink).push(p.map(|p| p.id));
        });
        (seen, callback)
    }

    #[test]
    fn test_subscribe_delivers_current_state() {
        let identity = LocalIdentity::signed_in(Principal::new("u1"), "tok");
        let (seen, callback) = recorder();
        let _sub = identity.subscribe_auth_state(callback);
        assert_eq!(*lock(&seen), vec![Some("u1".to_string())]);
    }

    #[tokio::test]
    async fn test_sign_out_notifies_and_clears_token() {
        let identity = LocalIdentity::signed_in(Principal::new("u1"), "tok");
        let (seen, callback) = recorder();
        let _sub = identity.subscribe_auth_state(callback);

        identity.sign_out().await.unwrap();

        assert_eq!(*lock(&seen), vec![Some("u1".to_string()), None]);
        assert!(identity.current_principal().is_none());
        assert!(matches!(
            identity.fresh_token(&Principal::new("u1")).await,
            Err(Error::AuthenticationRequired)
        ));
    }

    #[tokio::test]
    async fn test_sign_out_removes_credentials_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("credentials.toml");
        fs::write(&path, "token = 'x'").unwrap();

        let identity =
            LocalIdentity::signed_in(Principal::new("u1"), "tok").with_credentials_file(&path);
        identity.sign_out().await.unwrap();
        assert!(!path.exists());

        // A second sign-out with the file already gone is fine.
        identity.sign_out().await.unwrap();
    }

    #[tokio::test]
    async fn test_token_only_for_current_principal() {
        let identity = LocalIdentity::signed_in(Principal::new("u1"), "tok");
        assert_eq!(identity.fresh_token(&Principal::new("u1")).await.unwrap(), "tok");
        assert!(identity.fresh_token(&Principal::new("u2")).await.is_err());
    }
}
