//! Active-alert set, its shared handle and the read-only view handed to binders.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::connections::ConnectionRegistry;

/// Shared alert set; write access is reserved for the reconciler
pub(crate) type SharedAlertSet = Arc<RwLock<ActiveAlertSet>>;

/// Emails of connections currently believed to have an active alert.
///
/// Every member is a connection known to the registry it was built
/// against. Membership can only shrink through [`replace_all`](Self::replace_all):
/// notifications add urgency, only a full poll retracts it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveAlertSet {
    members: HashSet<String>,
}

impl ActiveAlertSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole membership with `ids ∩ registry`.
    ///
    /// Prior members are cleared unconditionally, including the ones added
    /// by notifications since the last replacement. Returns whether the
    /// membership changed.
    pub fn replace_all<I, S>(&mut self, ids: I, registry: &ConnectionRegistry) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let next: HashSet<String> = ids
            .into_iter()
            .filter_map(|id| {
                let id = id.as_ref();
                if registry.contains(id) {
                    Some(id.to_string())
                } else {
                    tracing::debug!(email = %id, "Ignoring alert for unknown connection");
                    None
                }
            })
            .collect();

        if next == self.members {
            return false;
        }
        self.members = next;
        true
    }

    /// Mark one connection as alerting.
    ///
    /// No-op when already a member or unknown to the registry. Returns
    /// whether it was inserted.
    pub fn add_one(&mut self, id: &str, registry: &ConnectionRegistry) -> bool {
        if !registry.contains(id) {
            tracing::debug!(email = %id, "Ignoring notification for unknown connection");
            return false;
        }
        self.members.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in sorted order
    pub fn members(&self) -> Vec<String> {
        self.members
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Read-only handle on the shared alert set, handed to UI binders.
///
/// Reads take a short read lock and return owned data.
#[derive(Debug, Clone)]
pub struct AlertView {
    inner: SharedAlertSet,
}

impl AlertView {
    pub(crate) fn new(inner: SharedAlertSet) -> Self {
        Self { inner }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Owned copy of the current membership
    pub fn snapshot(&self) -> ActiveAlertSet {
        self.inner.read().clone()
    }
}
