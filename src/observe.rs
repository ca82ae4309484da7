//! Live-subscription plumbing shared by the identity provider, the backing
//! stores and the resolvers built on top of them.
//!
//! A producer keeps a [`Listeners`] table; registering a callback yields a
//! [`Subscription`] handle. Dropping the handle (or calling
//! [`Subscription::unsubscribe`]) removes the callback synchronously, so no
//! further updates reach it.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Handle for a registered callback. Unregisters on drop.
#[must_use = "dropping a Subscription unregisters it immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle with nothing to tear down.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

struct ListenerTable<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

/// Registry of callbacks interested in values of type `T`.
///
/// Callbacks are invoked outside the registry lock, in registration order, so
/// a callback may subscribe or unsubscribe without deadlocking.
pub struct Listeners<T> {
    table: Arc<Mutex<ListenerTable<T>>>,
}

impl<T: Send + 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(ListenerTable {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    pub fn add(&self, callback: impl Fn(T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut table = lock(&self.table);
            let id = table.next_id;
            table.next_id += 1;
            table.entries.push((id, Arc::new(callback)));
            id
        };

        let weak = Arc::downgrade(&self.table);
        Subscription::new(move || {
            if let Some(table) = weak.upgrade() {
                lock(&table).entries.retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    /// Delivers a freshly built value to every listener.
    pub fn emit_with(&self, make: impl Fn() -> T) {
        for callback in self.snapshot() {
            callback(make());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.table).entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Callback<T>> {
        lock(&self.table)
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }
}

impl<T: Clone + Send + 'static> Listeners<T> {
    pub fn emit(&self, value: T) {
        for callback in self.snapshot() {
            callback(value.clone());
        }
    }
}

impl<T: Send + 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
