use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};

use super::schema::SCHEMA;
use super::{MembershipCallback, MembershipRecord, MembershipStore, ProfileStore, RawMembership};
use crate::error::{Error, Result};
use crate::observe::{Listeners, Subscription, lock};
use crate::types::WorkspaceProfile;

type MembershipListeners = Listeners<Result<MembershipRecord>>;

/// Local membership and profile database.
///
/// Membership subscribers are notified after every write that touches their
/// user, which makes this usable as a live store for the resolver.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    watchers: Mutex<HashMap<String, MembershipListeners>>,
}

/// A membership row with its owner, for admin listings.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipRow {
    pub user_id: String,
    pub client_id: String,
    pub role: Option<String>,
    pub joined_at: Option<Value>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            watchers: Mutex::new(HashMap::new()),
        }
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        lock(&self.conn)
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Membership operations

    /// Adds or updates a membership. An existing join time is kept when
    /// `joined_at` is `None`.
    pub fn upsert_membership(
        &self,
        user_id: &str,
        client_id: &str,
        role: Option<&str>,
        joined_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO memberships (user_id, client_id, role, joined_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, client_id) DO UPDATE SET
                role = excluded.role,
                joined_at = COALESCE(excluded.joined_at, memberships.joined_at)",
            params![user_id, client_id, role, joined_at.map(|dt| dt.to_rfc3339())],
        )?;
        self.notify(user_id);
        Ok(())
    }

    pub fn remove_membership(&self, user_id: &str, client_id: &str) -> Result<bool> {
        let removed = self.conn().execute(
            "DELETE FROM memberships WHERE user_id = ?1 AND client_id = ?2",
            params![user_id, client_id],
        )?;
        if removed > 0 {
            self.notify(user_id);
        }
        Ok(removed > 0)
    }

    pub fn list_memberships(&self, user_id: &str) -> Result<MembershipRecord> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT client_id, role, joined_at FROM memberships WHERE user_id = ?1",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                RawMembership {
                    role: row.get(1)?,
                    joined_at: sql_to_json(row.get(2)?),
                },
            ))
        })?;
        rows.collect::<std::result::Result<MembershipRecord, _>>()
            .map_err(Error::from)
    }

    pub fn list_all_memberships(&self) -> Result<Vec<MembershipRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, client_id, role, joined_at FROM memberships
             ORDER BY user_id, client_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(MembershipRow {
                user_id: row.get(0)?,
                client_id: row.get(1)?,
                role: row.get(2)?,
                joined_at: sql_to_json(row.get(3)?),
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Client document operations

    pub fn put_client_document(&self, client_id: &str, document: &Map<String, Value>) -> Result<()> {
        let text = serde_json::to_string(document)?;
        self.conn().execute(
            "INSERT INTO clients (id, document, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at",
            params![client_id, text, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_client_document(&self, client_id: &str) -> Result<Option<Map<String, Value>>> {
        let row: Option<(String, Option<String>)> = self
            .conn()
            .query_row(
                "SELECT document, updated_at FROM clients WHERE id = ?1",
                params![client_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((text, updated_at)) = row else {
            return Ok(None);
        };
        let mut document: Map<String, Value> = serde_json::from_str(&text)?;
        if let Some(updated_at) = updated_at {
            document
                .entry("updated_at")
                .or_insert(Value::String(updated_at));
        }
        Ok(Some(document))
    }

    pub fn list_clients(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id FROM clients ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<String>, _>>()
            .map_err(Error::from)
    }

    /// Number of live membership subscriptions for `user_id`.
    #[must_use]
    pub fn watcher_count(&self, user_id: &str) -> usize {
        lock(&self.watchers)
            .get(user_id)
            .map_or(0, Listeners::len)
    }

    fn notify(&self, user_id: &str) {
        let listeners = {
            let mut watchers = lock(&self.watchers);
            match watchers.get(user_id) {
                Some(listeners) if listeners.is_empty() => {
                    watchers.remove(user_id);
                    return;
                }
                Some(listeners) => listeners.clone(),
                None => return,
            }
        };
        let snapshot = self.list_memberships(user_id);
        if let Err(e) = &snapshot {
            tracing::warn!("Failed to reload memberships for {user_id}: {e}");
        }
        listeners.emit_with(|| match &snapshot {
            Ok(record) => Ok(record.clone()),
            Err(e) => Err(Error::Subscription(e.to_string())),
        });
    }
}

impl MembershipStore for SqliteStore {
    fn subscribe_memberships(
        &self,
        principal_id: &str,
        on_snapshot: MembershipCallback,
    ) -> Subscription {
        let callback: Arc<dyn Fn(Result<MembershipRecord>) + Send + Sync> = Arc::from(on_snapshot);
        let listeners = {
            let mut watchers = lock(&self.watchers);
            watchers.retain(|_, listeners| !listeners.is_empty());
            watchers
                .entry(principal_id.to_string())
                .or_default()
                .clone()
        };
        let registered = Arc::clone(&callback);
        let subscription = listeners.add(move |snapshot| registered(snapshot));

        callback(
            self.list_memberships(principal_id)
                .map_err(|e| Error::Subscription(e.to_string())),
        );
        subscription
    }
}

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn fetch_profile(&self, client_id: &str) -> Result<WorkspaceProfile> {
        let document = self.get_client_document(client_id)?.ok_or(Error::NotFound)?;
        Ok(WorkspaceProfile::from_document(client_id, &document))
    }
}

fn sql_to_json(value: SqlValue) -> Option<Value> {
    match value {
        SqlValue::Null | SqlValue::Blob(_) => None,
        SqlValue::Integer(i) => Some(Value::from(i)),
        SqlValue::Real(f) => serde_json::Number::from_f64(f).map(Value::Number),
        SqlValue::Text(s) => Some(Value::String(s)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    #[test]
    fn test_initialize_creates_tables() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"memberships".to_string()));
        assert!(tables.contains(&"clients".to_string()));
    }

    #[test]
    fn test_membership_crud() {
        let store = store();
        let joined = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        store.upsert_membership("u1", "acme", Some("admin"), Some(joined)).unwrap();
        store.upsert_membership("u1", "globex", None, None).unwrap();

        let record = store.list_memberships("u1").unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record["acme"].role.as_deref(), Some("admin"));
        assert_eq!(
            record["acme"].joined_at,
            Some(json!("2023-11-14T22:13:20+00:00"))
        );
        assert_eq!(record["globex"].role, None);

        // Role change keeps the original join time.
        store.upsert_membership("u1", "acme", Some("member"), None).unwrap();
        let record = store.list_memberships("u1").unwrap();
        assert_eq!(record["acme"].role.as_deref(), Some("member"));
        assert!(record["acme"].joined_at.is_some());

        assert!(store.remove_membership("u1", "acme").unwrap());
        assert!(!store.remove_membership("u1", "acme").unwrap());
        assert_eq!(store.list_memberships("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_numeric_joined_at_round_trips_as_number() {
        let store = store();
        store
            .conn()
            .execute(
                "INSERT INTO memberships (user_id, client_id, joined_at) VALUES ('u1', 'acme', 1700000000)",
                [],
            )
            .unwrap();
        let record = store.list_memberships("u1").unwrap();
        assert_eq!(record["acme"].joined_at, Some(json!(1_700_000_000)));
    }

    #[test]
    fn test_subscription_receives_initial_and_updates() {
        let store = store();
        store.upsert_membership("u1", "acme", None, None).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = store.subscribe_memberships(
            "u1",
            Box::new(move |snapshot| {
                lock(&sink).push(snapshot.unwrap().len());
            }),
        );

        store.upsert_membership("u1", "globex", None, None).unwrap();
        store.upsert_membership("u2", "initech", None, None).unwrap();
        assert_eq!(*lock(&seen), vec![1, 2]);
        assert_eq!(store.watcher_count("u1"), 1);

        drop(sub);
        store.remove_membership("u1", "acme").unwrap();
        assert_eq!(*lock(&seen), vec![1, 2]);
        assert_eq!(store.watcher_count("u1"), 0);
    }

    #[test]
    fn test_cancelled_watchers_are_pruned() {
        let store = store();
        let sub = store.subscribe_memberships("u1", Box::new(|_| {}));
        drop(sub);
        assert!(lock(&store.watchers).contains_key("u1"));

        store.upsert_membership("u1", "acme", None, None).unwrap();
        assert!(!lock(&store.watchers).contains_key("u1"));

        let sub = store.subscribe_memberships("u2", Box::new(|_| {}));
        drop(sub);
        let _live = store.subscribe_memberships("u3", Box::new(|_| {}));
        let watchers = lock(&store.watchers);
        assert!(!watchers.contains_key("u2"));
        assert_eq!(watchers.len(), 1);
    }

    #[test]
    fn test_subscription_reports_store_failure() {
        let store = SqliteStore::open_in_memory().unwrap();
        let errors = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&errors);
        let _sub = store.subscribe_memberships(
            "u1",
            Box::new(move |snapshot| {
                if matches!(snapshot, Err(Error::Subscription(_))) {
                    sink.fetch_add(1, Ordering::SeqCst);
                }
            }),
        );
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_profile() {
        let store = store();
        assert!(matches!(store.fetch_profile("acme").await, Err(Error::NotFound)));

        let doc = json!({"display_name": "Acme", "plan_id": "pro", "entitlements": {"max_result_rows": 1000}});
        store
            .put_client_document("acme", doc.as_object().unwrap())
            .unwrap();

        let profile = store.fetch_profile("acme").await.unwrap();
        assert_eq!(profile.title(), "Acme");
        assert_eq!(profile.plan_id.as_deref(), Some("pro"));
        assert!(profile.updated_at.is_some());
        assert_eq!(store.list_clients().unwrap(), vec!["acme".to_string()]);
    }
}
