use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::SessionStore;
use crate::error::{Error, Result};
use crate::observe::{Subscription, lock};
use crate::store::{MembershipRecord, MembershipStore};
use crate::types::{DEFAULT_ROLE, Membership, MembershipSet, Principal, timestamp};

/// Derives the live workspace list and active workspace for a principal.
///
/// Holds at most one membership subscription, for the principal most
/// recently passed to [`set_principal`](Self::set_principal). Snapshots from
/// a subscription that has since been replaced are discarded.
#[derive(Clone)]
pub struct MembershipResolver {
    store: Arc<dyn MembershipStore>,
    shared: Arc<Shared>,
}

struct Shared {
    state: watch::Sender<MembershipSet>,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Bumped whenever the current subscription is replaced or abandoned.
    generation: u64,
    attached: bool,
    principal_id: Option<String>,
    subscription: Option<Subscription>,
}

impl MembershipResolver {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        let (state, _rx) = watch::channel(MembershipSet::default());
        Self {
            store,
            shared: Arc::new(Shared {
                state,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> MembershipSet {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MembershipSet> {
        self.shared.state.subscribe()
    }

    #[must_use]
    pub fn active_id(&self) -> Option<String> {
        self.shared.state.borrow().active_id.clone()
    }

    /// Points the resolver at a new principal, or none.
    ///
    /// Passing the id already being followed is a no-op, including after a
    /// subscription failure: a fresh subscription only starts when the
    /// principal changes.
    pub fn set_principal(&self, principal: Option<&Principal>) {
        let next_id = principal.map(|p| p.id.clone());

        let (generation, previous) = {
            let mut inner = lock(&self.shared.inner);
            if inner.attached && inner.principal_id == next_id {
                return;
            }
            inner.generation += 1;
            inner.attached = true;
            inner.principal_id = next_id.clone();
            (inner.generation, inner.subscription.take())
        };
        drop(previous);

        let Some(principal_id) = next_id else {
            self.shared.state.send_replace(MembershipSet::empty());
            return;
        };

        tracing::debug!(principal = %principal_id, "subscribing to workspace memberships");
        self.shared.state.send_modify(|set| set.loading = true);

        let weak = Arc::downgrade(&self.shared);
        let subscription = self.store.subscribe_memberships(
            &principal_id,
            Box::new(move |snapshot| {
                if let Some(shared) = weak.upgrade() {
                    shared.apply(generation, snapshot);
                }
            }),
        );

        let mut inner = lock(&self.shared.inner);
        if inner.generation == generation {
            inner.subscription = Some(subscription);
        } else {
            drop(inner);
            drop(subscription);
        }
    }

    /// Makes `client_id` active if the principal belongs to it. Unknown ids
    /// are dropped and `false` is returned; nothing is queued.
    pub fn select_client(&self, client_id: &str) -> bool {
        let mut known = false;
        self.shared.state.send_if_modified(|set| {
            known = set.contains(client_id);
            if known && set.active_id.as_deref() != Some(client_id) {
                set.active_id = Some(client_id.to_string());
                true
            } else {
                false
            }
        });
        if !known {
            tracing::warn!(client_id, "ignoring selection of unknown workspace");
        }
        known
    }

    /// Resolves once the current load has finished.
    pub async fn wait_until_loaded(&self) -> Result<MembershipSet> {
        let mut rx = self.subscribe();
        let set = rx
            .wait_for(|set| !set.loading)
            .await
            .map_err(|e| Error::Subscription(e.to_string()))?;
        Ok(set.clone())
    }

    /// Feeds every settled session state into [`set_principal`](Self::set_principal).
    /// The task ends when the session store goes away.
    pub fn follow(&self, session: &SessionStore) -> JoinHandle<()> {
        let mut rx = session.subscribe();
        let resolver = self.clone();
        tokio::spawn(async move {
            loop {
                let current = rx.borrow_and_update().clone();
                if !current.loading {
                    resolver.set_principal(current.principal.as_ref());
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Releases the membership subscription. A later `set_principal` starts
    /// over.
    pub fn teardown(&self) {
        let previous = {
            let mut inner = lock(&self.shared.inner);
            inner.generation += 1;
            inner.attached = false;
            inner.principal_id = None;
            inner.subscription.take()
        };
        drop(previous);
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        lock(&self.shared.inner).subscription.is_some()
    }
}

impl Shared {
    fn apply(&self, generation: u64, snapshot: Result<MembershipRecord>) {
        let mut inner = lock(&self.inner);
        if inner.generation != generation {
            return;
        }

        match snapshot {
            Ok(record) => {
                let memberships = memberships_from_record(record);
                self.state.send_modify(|set| set.apply_snapshot(memberships));
            }
            Err(e) => {
                tracing::error!(
                    principal = inner.principal_id.as_deref().unwrap_or_default(),
                    "Failed to load workspace memberships: {e}"
                );
                inner.generation += 1;
                let failed = inner.subscription.take();
                self.state.send_replace(MembershipSet::empty());
                drop(inner);
                drop(failed);
            }
        }
    }
}

/// Builds membership entries from a raw record. Missing roles default to
/// `member`; unreadable join times are dropped.
#[must_use]
pub fn memberships_from_record(record: MembershipRecord) -> Vec<Membership> {
    record
        .into_iter()
        .map(|(client_id, raw)| Membership {
            client_id,
            role: raw.role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            joined_at: raw.joined_at.as_ref().and_then(timestamp::from_store_value),
        })
        .collect()
}
