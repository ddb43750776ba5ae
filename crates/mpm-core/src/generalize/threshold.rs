//! Threshold generalizer (C5): if a large-enough fraction of a
//! directory's children were observed with the same `(uid, domain)`
//! access to the same permission bit, lift that bit up into the
//! directory's `generalized` set.
//!
//! Two variants share the same lifting rule but disagree on what `N`
//! (the denominator) is: [`generalize`] counts children as they appear
//! in the trie (i.e. as seen in the audit log); [`generalize_fs`] counts
//! children as reported by a filesystem snapshot (C5'), which catches
//! directories whose unaccessed children would otherwise be
//! undercounted.

use std::collections::{HashMap, HashSet};

use crate::access::Access;
use crate::config::MiningConfig;
use crate::db::FsSnapshot;
use crate::domain::Domain;
use crate::permission::Permission;
use crate::trie::{NodeId, Trie};

/// Lift accesses shared by a sufficient fraction of a directory's
/// children, counted from the trie itself (i.e. from the audit log).
pub fn generalize(trie: &mut Trie, config: &MiningConfig) {
    for node in trie.post_order() {
        let n = trie.node(node).children().len();
        lift_by_count(trie, node, n, config.generalize_threshold);
    }
}

/// Lift accesses shared by a sufficient fraction of a directory's
/// children, counted from a filesystem snapshot (C5').
pub fn generalize_fs<S: FsSnapshot>(trie: &mut Trie, snapshot: &S, config: &MiningConfig) {
    for node in trie.post_order() {
        if node == trie.root() {
            continue;
        }
        let path = trie.path_of(node);
        let Ok(Some(inode)) = snapshot.search_path(&path) else {
            continue;
        };
        let Ok(n) = snapshot.get_num_children(inode) else {
            continue;
        };
        lift_by_count(trie, node, n, config.generalize_fs_threshold);
    }
}

type ThresholdKey = (u32, Domain, Permission);

fn lift_by_count(trie: &mut Trie, node: NodeId, n: usize, threshold: f64) {
    if n == 0 {
        return;
    }
    let children = trie.node(node).children().to_vec();
    let mut counts: HashMap<ThresholdKey, usize> = HashMap::new();
    for &child in &children {
        let mut present: HashSet<ThresholdKey> = HashSet::new();
        let child_node = trie.node(child);
        // Only a child's own directly-recorded accesses count (§4.5,
        // `tree.py:314-327`) — `generalized` is a separate staging set a
        // post-order pass may have already populated on this very child,
        // and folding it in here would let a lift at depth N re-lift at
        // every ancestor on the way to the root.
        for access in child_node.accesses.iter() {
            for bit in access.permissions().iter_bits() {
                present.insert((access.uid(), access.domain().clone(), bit));
            }
        }
        for key in present {
            *counts.entry(key).or_insert(0) += 1;
        }
    }

    for ((uid, domain, bit), count) in counts {
        if (count as f64) / (n as f64) >= threshold {
            trie.node_mut(node)
                .generalized
                .add_access(Access::new(bit, uid, domain));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditEntry;

    fn entry(path: &str, uid: u32) -> AuditEntry {
        AuditEntry {
            proctitle: "t".to_string(),
            path: path.to_string(),
            permission: Permission::READ,
            uid,
            pid: 1,
            ppid: 0,
            operation: "open".to_string(),
            domain: Domain::empty().exec("/bin/t", uid),
        }
    }

    #[test]
    fn unanimous_access_is_lifted_to_parent() {
        let mut trie = Trie::new();
        trie.load_log([
            &entry("/home/alice/a", 1000),
            &entry("/home/alice/b", 1000),
            &entry("/home/alice/c", 1000),
        ]);
        let config = MiningConfig::default();
        generalize(&mut trie, &config);

        let node = trie.insert("/home/alice");
        assert!(!trie.node(node).generalized.is_empty());
        let access = trie.node(node).generalized.get(1000, &Domain::empty().exec("/bin/t", 1000)).unwrap();
        assert_eq!(access.permissions(), Permission::READ);
    }

    #[test]
    fn non_unanimous_access_is_not_lifted() {
        let mut trie = Trie::new();
        trie.load_log([&entry("/home/bob/a", 1000)]);
        trie.insert("/home/bob/b");
        let config = MiningConfig::default();
        generalize(&mut trie, &config);

        let node = trie.insert("/home/bob");
        assert!(trie.node(node).generalized.is_empty());
    }
}
