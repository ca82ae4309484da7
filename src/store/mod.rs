mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::observe::Subscription;
use crate::types::WorkspaceProfile;

/// One membership entry as stored: both fields may be missing, and the join
/// time comes back in whatever shape the store uses natively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMembership {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub joined_at: Option<Value>,
}

/// A user's membership map, keyed by workspace id.
pub type MembershipRecord = BTreeMap<String, RawMembership>;

pub type MembershipCallback = Box<dyn Fn(Result<MembershipRecord>) + Send + Sync>;

/// Live source of per-user membership records.
pub trait MembershipStore: Send + Sync {
    /// Delivers the current record, then a new one after every change, until
    /// the returned handle is dropped. A failure is delivered as `Err`.
    fn subscribe_memberships(&self, principal_id: &str, on_snapshot: MembershipCallback)
    -> Subscription;
}

/// One-shot lookups of workspace profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Error::NotFound` when the workspace has no profile.
    async fn fetch_profile(&self, client_id: &str) -> Result<WorkspaceProfile>;
}
