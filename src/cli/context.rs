use std::sync::Arc;

use tokio::task::JoinHandle;

use super::credentials::{Credentials, credentials_path, load_credentials, save_credentials};
use super::{init_store, load_config};
use crate::api::ApiClient;
use crate::auth::{IdentityProvider, LocalIdentity, SessionStore};
use crate::config::ConsoleConfig;
use crate::console::ViewCache;
use crate::store::{MembershipStore, SqliteStore};
use crate::types::MembershipSet;
use crate::workspace::MembershipResolver;

/// Everything a signed-in command needs, wired together.
pub struct ConsoleContext {
    pub config: ConsoleConfig,
    pub credentials: Credentials,
    pub store: Arc<SqliteStore>,
    pub session: SessionStore,
    pub resolver: MembershipResolver,
    pub api: ApiClient,
    pub cache: Arc<ViewCache>,
    follower: JoinHandle<()>,
}

impl ConsoleContext {
    pub fn open(data_dir: Option<String>) -> anyhow::Result<Self> {
        let mut config = load_config(data_dir)?;
        let credentials = load_credentials()?;
        if config.api_base_url.is_empty() {
            config.api_base_url = credentials.server_url.clone();
        }

        let store = Arc::new(init_store(&config)?);
        let identity = Arc::new(
            LocalIdentity::signed_in(credentials.principal(), credentials.token.clone())
                .with_credentials_file(credentials_path()?),
        );
        let session = SessionStore::new(Arc::clone(&identity) as Arc<dyn IdentityProvider>);
        let resolver = MembershipResolver::new(Arc::clone(&store) as Arc<dyn MembershipStore>);
        let follower = resolver.follow(&session);
        let api = ApiClient::from_config(&config, identity)?;

        Ok(Self {
            config,
            credentials,
            store,
            session,
            resolver,
            api,
            cache: Arc::new(ViewCache::new()),
            follower,
        })
    }

    pub async fn memberships(&self) -> anyhow::Result<MembershipSet> {
        Ok(self.resolver.wait_until_loaded().await?)
    }

    /// Resolves which workspace a command acts on: the one named explicitly,
    /// else the remembered selection if still valid, else the first.
    pub async fn active_workspace(&self, explicit: Option<&str>) -> anyhow::Result<String> {
        let set = self.memberships().await?;
        if set.memberships.is_empty() {
            anyhow::bail!(
                "You are not yet assigned to a workspace. Ask an administrator to add you to one."
            );
        }

        if let Some(id) = explicit {
            if !self.resolver.select_client(id) {
                anyhow::bail!("You are not a member of workspace '{id}'");
            }
        } else if let Some(saved) = self.credentials.workspace.as_deref() {
            self.resolver.select_client(saved);
        }

        self.resolver
            .active_id()
            .ok_or_else(|| anyhow::anyhow!("No workspace selected."))
    }

    pub fn remember_workspace(&mut self, client_id: &str) -> anyhow::Result<()> {
        self.credentials.workspace = Some(client_id.to_string());
        save_credentials(&self.credentials)
    }
}

impl Drop for ConsoleContext {
    fn drop(&mut self) {
        self.resolver.teardown();
        self.session.teardown();
        self.follower.abort();
    }
}
