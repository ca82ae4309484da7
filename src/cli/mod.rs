mod admin;
mod auth;
mod commands;
mod context;
pub mod credentials;
mod info;
pub mod pickers;
mod plan;
mod query;
mod usage;
mod workspace;

pub use admin::{run_client_set, run_init, run_member_add, run_member_remove};
pub use auth::{run_auth_login, run_auth_logout, run_auth_status};
pub use commands::{
    AdminCommands, AuthCommands, BillingCommands, ClientCommands, MemberCommands,
    WorkspaceCommands,
};
pub use context::ConsoleContext;
pub use info::run_info;
pub use plan::{run_billing_checkout, run_billing_portal, run_plan};
pub use query::{QueryArgs, run_query};
pub use usage::{run_history, run_usage};
pub use workspace::{run_workspace_list, run_workspace_select};

use crate::config::ConsoleConfig;
use crate::store::SqliteStore;

/// Config with an optional `--data-dir` override applied.
pub fn load_config(data_dir: Option<String>) -> anyhow::Result<ConsoleConfig> {
    let mut config = ConsoleConfig::from_env()?;
    if let Some(dir) = data_dir {
        config.data_dir = dir.into();
    }
    Ok(config)
}

/// Open the store from the configured data directory, checking it exists
pub fn init_store(config: &ConsoleConfig) -> anyhow::Result<SqliteStore> {
    let db_path = config.db_path();

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'shoreline admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}
