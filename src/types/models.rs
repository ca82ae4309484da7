use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ROLE: &str = "member";

/// An authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Principal {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            email: None,
        }
    }

    /// Best label for display: name, then email, then id.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Identity state as seen by consumers. `principal` is meaningless while
/// `loading` is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub principal: Option<Principal>,
    pub loading: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            principal: None,
            loading: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub client_id: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
}

impl Membership {
    /// Ordering used for membership lists: by join time when both sides have
    /// one, otherwise by client id.
    #[must_use]
    pub fn display_order(&self, other: &Self) -> Ordering {
        match (self.joined_at, other.joined_at) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.client_id.cmp(&other.client_id)),
            _ => self.client_id.cmp(&other.client_id),
        }
    }
}

/// Workspaces the current principal belongs to, plus the active one.
///
/// `active_id`, when set, always names an entry of `memberships`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipSet {
    pub memberships: Vec<Membership>,
    pub active_id: Option<String>,
    pub loading: bool,
}

impl MembershipSet {
    /// The signed-out / failed state: nothing to choose from, not loading.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            memberships: Vec::new(),
            active_id: None,
            loading: false,
        }
    }

    #[must_use]
    pub fn contains(&self, client_id: &str) -> bool {
        self.memberships.iter().any(|m| m.client_id == client_id)
    }

    #[must_use]
    pub fn active_membership(&self) -> Option<&Membership> {
        let active = self.active_id.as_deref()?;
        self.memberships.iter().find(|m| m.client_id == active)
    }

    /// Active workspace, or `None` while a load is in flight.
    #[must_use]
    pub fn resolved_active_id(&self) -> Option<&str> {
        if self.loading {
            None
        } else {
            self.active_id.as_deref()
        }
    }

    /// Replaces the memberships, keeping the previous active id if it is
    /// still present and falling back to the first entry otherwise.
    pub fn apply_snapshot(&mut self, memberships: Vec<Membership>) {
        let memberships = merge_sort(memberships);
        let keep = self
            .active_id
            .as_deref()
            .is_some_and(|current| memberships.iter().any(|m| m.client_id == current));
        if !keep {
            self.active_id = memberships.first().map(|m| m.client_id.clone());
        }
        self.memberships = memberships;
        self.loading = false;
    }
}

/// Stable merge sort over [`Membership::display_order`].
///
/// The pairwise rule is not transitive once entries with and without join
/// times are mixed, so `slice::sort_by` may panic on it. Merging only ever
/// compares neighbours of the two runs and always terminates.
fn merge_sort(mut items: Vec<Membership>) -> Vec<Membership> {
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items);
    let right = merge_sort(right);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => r.display_order(l) == Ordering::Less,
            _ => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    merged
}

impl Default for MembershipSet {
    fn default() -> Self {
        Self {
            memberships: Vec::new(),
            active_id: None,
            loading: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn membership(id: &str, joined: Option<i64>) -> Membership {
        Membership {
            client_id: id.to_string(),
            role: DEFAULT_ROLE.to_string(),
            joined_at: joined.map(|secs| Utc.timestamp_opt(secs, 0).unwrap()),
        }
    }

    fn ids(set: &MembershipSet) -> Vec<&str> {
        set.memberships.iter().map(|m| m.client_id.as_str()).collect()
    }

    #[test]
    fn test_sort_by_joined_at_when_both_present() {
        let mut set = MembershipSet::default();
        set.apply_snapshot(vec![membership("b", Some(100)), membership("a", Some(200))]);
        assert_eq!(ids(&set), vec!["b", "a"]);
    }

    #[test]
    fn test_sort_falls_back_to_id_when_timestamp_missing() {
        let a = membership("a", Some(200));
        let c = membership("c", None);
        let b = membership("b", Some(100));
        assert_eq!(a.display_order(&c), Ordering::Less);
        assert_eq!(c.display_order(&b), Ordering::Greater);
        assert_eq!(b.display_order(&a), Ordering::Less);
    }

    #[test]
    fn test_sort_survives_mixed_timestamps() {
        // (c,1) < (a,2) < (b,-) < (c,1) under the pairwise rule.
        let mut set = MembershipSet::default();
        set.apply_snapshot(vec![
            membership("c", Some(1)),
            membership("a", Some(2)),
            membership("b", None),
        ]);
        assert_eq!(set.memberships.len(), 3);

        let mixed: Vec<Membership> = (0..240)
            .map(|i| {
                let id = format!("ws{:05}", (i * 7919) % 1000);
                let joined = (i % 2 == 0).then_some(((i * 104_729) % 5000) as i64);
                membership(&id, joined)
            })
            .collect();
        let mut expected: Vec<String> = mixed.iter().map(|m| m.client_id.clone()).collect();
        expected.sort();

        let mut set = MembershipSet::default();
        set.apply_snapshot(mixed);
        let mut got: Vec<String> = ids(&set).into_iter().map(String::from).collect();
        assert_eq!(set.active_id.as_deref(), Some(got[0].as_str()));
        got.sort();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_sort_is_stable_for_equal_entries() {
        let mut set = MembershipSet::default();
        let mut first = membership("a", None);
        first.role = "owner".into();
        set.apply_snapshot(vec![membership("b", None), first, membership("a", None)]);
        assert_eq!(ids(&set), vec!["a", "a", "b"]);
        assert_eq!(set.memberships[0].role, "owner");
    }

    #[test]
    fn test_first_snapshot_activates_first_entry() {
        let mut set = MembershipSet::default();
        set.apply_snapshot(vec![membership("zeta", None), membership("alpha", None)]);
        assert_eq!(set.active_id.as_deref(), Some("alpha"));
        assert!(!set.loading);
    }

    #[test]
    fn test_active_id_preserved_when_still_present() {
        let mut set = MembershipSet::default();
        set.apply_snapshot(vec![membership("a", None), membership("b", None)]);
        set.active_id = Some("b".into());
        set.apply_snapshot(vec![membership("b", None), membership("c", None), membership("a", None)]);
        assert_eq!(set.active_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_active_id_falls_back_when_removed() {
        let mut set = MembershipSet::default();
        set.apply_snapshot(vec![membership("a", None), membership("b", None)]);
        set.active_id = Some("b".into());
        set.apply_snapshot(vec![membership("c", None), membership("a", None)]);
        assert_eq!(set.active_id.as_deref(), Some("a"));

        set.apply_snapshot(Vec::new());
        assert_eq!(set.active_id, None);
        assert!(set.active_membership().is_none());
    }

    #[test]
    fn test_resolved_active_id_hidden_while_loading() {
        let mut set = MembershipSet::default();
        set.active_id = Some("a".into());
        assert_eq!(set.resolved_active_id(), None);
    }

    #[test]
    fn test_principal_label() {
        let mut p = Principal::new("uid-1");
        assert_eq!(p.label(), "uid-1");
        p.email = Some("ana@example.com".into());
        assert_eq!(p.label(), "ana@example.com");
        p.display_name = Some("Ana".into());
        assert_eq!(p.label(), "Ana");
    }
}
