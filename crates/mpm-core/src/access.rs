//! Access record (C2): an immutable `(permissions, uid, domain)` triple,
//! plus the merge-on-insert access set used throughout the trie.

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::permission::Permission;

/// A single recorded access: the permission bits a process in `domain`,
/// running as `uid`, was observed to exercise.
///
/// Immutable after construction — there are no setters, so the source
/// project's runtime "attribute can't be modified" check becomes a
/// compile-time guarantee: once built, an `Access` cannot be mutated in
/// place. The only way to change its permissions is [`Access::union`],
/// which returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Access {
    permissions: Permission,
    uid: u32,
    domain: Domain,
    /// Process title at the time of access, recorded for debugging only;
    /// it never participates in equality, hashing, or the merge key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proctitle: Option<String>,
}

impl Access {
    /// Construct a new access. `uid` and `domain` are set exactly once,
    /// at construction.
    pub fn new(permissions: Permission, uid: u32, domain: Domain) -> Self {
        Self {
            permissions,
            uid,
            domain,
            proctitle: None,
        }
    }

    /// Attach a proctitle for debugging display. Builder-style, since
    /// `Access` has no in-place mutators.
    pub fn with_proctitle(mut self, proctitle: impl Into<String>) -> Self {
        self.proctitle = Some(proctitle.into());
        self
    }

    /// The permission bits of this access.
    pub fn permissions(&self) -> Permission {
        self.permissions
    }

    /// The acting uid.
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// The process's exec-history domain.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// The merge key used by [`AccessSet`]: two accesses with the same
    /// key are combined by permission union rather than kept separate
    /// (invariant I3).
    fn merge_key(&self) -> (u32, &Domain) {
        (self.uid, &self.domain)
    }

    /// Return a new `Access` with the same `(uid, domain)` and the union
    /// of both accesses' permission bits.
    pub fn union(&self, other: &Access) -> Access {
        debug_assert_eq!(self.uid, other.uid);
        debug_assert_eq!(self.domain, other.domain);
        Access {
            permissions: self.permissions | other.permissions,
            uid: self.uid,
            domain: self.domain.clone(),
            proctitle: self.proctitle.clone().or_else(|| other.proctitle.clone()),
        }
    }

    /// Short display using only the current domain link.
    pub fn short_display(&self) -> String {
        format!("<{} uid={}: {}>", self.domain.short_display(), self.uid, self.permissions)
    }

    /// Full display including proctitle and the whole domain.
    pub fn full_display(&self) -> String {
        format!(
            "<{:?} {} ({}): {}>",
            self.domain.links(),
            self.proctitle.as_deref().unwrap_or(""),
            self.uid,
            self.permissions
        )
    }
}

/// A set of [`Access`] values honoring invariant I3: no two entries
/// share `(uid, domain)`. Backed by a `Vec` rather than a `HashSet` so
/// that iteration order matches insertion order, which the threshold
/// generalizer (C5) and multi-run generalizer (C8) rely on for
/// deterministic results (§5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessSet(Vec<Access>);

impl AccessSet {
    /// An empty set.
    pub fn new() -> Self {
        AccessSet(Vec::new())
    }

    /// `true` if the set has no accesses.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct `(uid, domain)` accesses held.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Add `access` to the set (§4.2). If an entry already exists with
    /// the same `(uid, domain)`, it is replaced by one whose permissions
    /// are the union of both; otherwise `access` is appended.
    pub fn add_access(&mut self, access: Access) {
        let key = access.merge_key();
        if let Some(existing) = self.0.iter_mut().find(|a| a.merge_key() == key) {
            *existing = existing.union(&access);
        } else {
            self.0.push(access);
        }
    }

    /// Merge every access from `other` into `self` via [`AccessSet::add_access`].
    pub fn extend(&mut self, other: &AccessSet) {
        for access in &other.0 {
            self.add_access(access.clone());
        }
    }

    /// Iterate accesses in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Access> {
        self.0.iter()
    }

    /// Find the access for a specific `(uid, domain)`, if present.
    pub fn get(&self, uid: u32, domain: &Domain) -> Option<&Access> {
        self.0.iter().find(|a| a.uid == uid && &a.domain == domain)
    }
}

impl<'a> IntoIterator for &'a AccessSet {
    type Item = &'a Access;
    type IntoIter = std::slice::Iter<'a, Access>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Access> for AccessSet {
    fn from_iter<T: IntoIterator<Item = Access>>(iter: T) -> Self {
        let mut set = AccessSet::new();
        for access in iter {
            set.add_access(access);
        }
        set
    }
}
