//! Tree merge (C9): recursively fold one trie's contents into another,
//! unioning accesses at nodes that coincide on path.
//!
//! Merging is the step that turns several independently-mined tries
//! (one per log, or the regex-only trie synthesized by [`crate::generalize::runs`])
//! into the single trie an evaluator runs lookups against.

use crate::error::{MpmError, Result};
use crate::trie::{NodeId, Trie};

/// Fold every node of `source` into `target`, unioning accesses at
/// coinciding paths (§4.9).
///
/// For each child of a node being visited in `source`: if `target`
/// already has a child with the same tag, the merge descends instead of
/// overwriting; otherwise the entire `source` subtree is deep-copied
/// under the corresponding `target` node. A node present in both trees
/// with accesses on both sides must agree on `is_regexp` — disagreement
/// is an invariant violation (I2/I3), not a silent override, since a
/// literal and a regex child can't share a tag and a lookup semantics.
///
/// Commutative: `merge_into(&mut a, &b)` and `merge_into(&mut b, &a)`
/// leave `a` and `b` with equal access sets at every path (§8).
pub fn merge_into(target: &mut Trie, source: &Trie) -> Result<()> {
    merge_node(target, target.root(), source, source.root())
}

fn merge_node(target: &mut Trie, target_node: NodeId, source: &Trie, source_node: NodeId) -> Result<()> {
    for &source_child in source.node(source_node).children() {
        let source_child_node = source.node(source_child);
        let tag = source_child_node.tag.clone();

        match find_child_by_tag(target, target_node, &tag) {
            Some(target_child) => {
                reconcile_flags(target, target_child, source, source_child)?;

                let accesses = source_child_node.accesses.clone();
                let generalized = source_child_node.generalized.clone();
                target.node_mut(target_child).accesses.extend(&accesses);
                target.node_mut(target_child).generalized.extend(&generalized);

                merge_node(target, target_child, source, source_child)?;
            }
            None => {
                deep_copy_subtree(target, target_node, source, source_child);
            }
        }
    }
    Ok(())
}

fn find_child_by_tag(trie: &Trie, parent: NodeId, tag: &str) -> Option<NodeId> {
    trie.node(parent).children().iter().copied().find(|&c| trie.node(c).tag == tag)
}

/// Both sides having accesses on a coinciding node requires their
/// `is_regexp` flags to agree (§4.9). `is_recursive` is unioned rather
/// than checked: a node recursive in either input stays recursive in
/// the merge, since dropping the flag would silently narrow what it
/// grants.
fn reconcile_flags(target: &mut Trie, target_node: NodeId, source: &Trie, source_node: NodeId) -> Result<()> {
    let target_has_accesses = !target.node(target_node).accesses.is_empty();
    let source_has_accesses = !source.node(source_node).accesses.is_empty();

    if target_has_accesses && source_has_accesses && target.node(target_node).is_regexp != source.node(source_node).is_regexp {
        return Err(MpmError::InvariantViolation(format!(
            "merge conflict at '{}': is_regexp disagrees between inputs",
            target.path_of(target_node)
        )));
    }

    if source.node(source_node).is_recursive {
        target.node_mut(target_node).is_recursive = true;
    }
    Ok(())
}

/// Deep-copy `source_node` and its entire subtree as a fresh child of
/// `target_parent`, preserving tags, accesses, generalized sets, and
/// flags.
fn deep_copy_subtree(target: &mut Trie, target_parent: NodeId, source: &Trie, source_node: NodeId) -> NodeId {
    let source_node_ref = source.node(source_node);
    let new_node = target.add_child(target_parent, &source_node_ref.tag);
    target.node_mut(new_node).accesses.extend(&source_node_ref.accesses);
    target.node_mut(new_node).generalized.extend(&source_node_ref.generalized);
    target.node_mut(new_node).is_regexp = source_node_ref.is_regexp;
    target.node_mut(new_node).is_recursive = source_node_ref.is_recursive;

    for &source_child in source.node(source_node).children() {
        deep_copy_subtree(target, new_node, source, source_child);
    }
    new_node
}

/// Merge every trie in `tries` into a single new trie, left to right.
/// Empty input yields an empty trie.
pub fn merge_all(tries: &[Trie]) -> Result<Trie> {
    let mut out = Trie::new();
    for trie in tries {
        merge_into(&mut out, trie)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Access;
    use crate::domain::Domain;
    use crate::permission::Permission;

    fn with_access(path: &str, perm: Permission, uid: u32) -> Trie {
        let mut trie = Trie::new();
        let node = trie.insert(path);
        trie.node_mut(node).accesses.add_access(Access::new(perm, uid, Domain::empty()));
        trie
    }

    #[test]
    fn merge_unions_accesses_at_the_same_path() {
        let a = with_access("/x", Permission::READ, 1000);
        let b = with_access("/x", Permission::WRITE, 1000);

        let mut merged = a.clone();
        merge_into(&mut merged, &b).unwrap();

        let node = merged.insert("/x");
        let access = merged.node(node).accesses.get(1000, &Domain::empty()).unwrap();
        assert_eq!(access.permissions(), Permission::READ | Permission::WRITE);
    }

    #[test]
    fn merge_is_commutative_on_access_sets() {
        let a = with_access("/x", Permission::READ, 1000);
        let b = with_access("/x", Permission::WRITE, 1000);

        let mut ab = a.clone();
        merge_into(&mut ab, &b).unwrap();
        let mut ba = b.clone();
        merge_into(&mut ba, &a).unwrap();

        let node_ab = ab.insert("/x");
        let node_ba = ba.insert("/x");
        assert_eq!(
            ab.node(node_ab).accesses.get(1000, &Domain::empty()),
            ba.node(node_ba).accesses.get(1000, &Domain::empty())
        );
    }

    #[test]
    fn disjoint_subtree_is_deep_copied() {
        let a = with_access("/a/one", Permission::READ, 1000);
        let b = with_access("/b/two", Permission::WRITE, 2000);

        let mut merged = a.clone();
        merge_into(&mut merged, &b).unwrap();

        assert!(merged.accessed_paths().contains_key("/a/one"));
        assert!(merged.accessed_paths().contains_key("/b/two"));
    }

    #[test]
    fn conflicting_is_regexp_flags_are_an_invariant_violation() {
        let mut a = Trie::new();
        let a_child = a.insert("/d/x");
        a.node_mut(a_child).accesses.add_access(Access::new(Permission::READ, 1000, Domain::empty()));

        let mut b = Trie::new();
        let d = b.insert("/d");
        let b_child = b.add_child(d, "x");
        b.node_mut(b_child).is_regexp = true;
        b.node_mut(b_child).accesses.add_access(Access::new(Permission::READ, 1000, Domain::empty()));

        let mut merged = a.clone();
        let result = merge_into(&mut merged, &b);
        assert!(result.is_err());
    }

    #[test]
    fn recursive_flag_is_preserved_across_merge() {
        let mut a = Trie::new();
        let tmp = a.insert("/tmp");
        a.node_mut(tmp).is_recursive = true;
        a.node_mut(tmp).accesses.add_access(Access::new(Permission::READ, 1000, Domain::empty()));

        let b = Trie::new();
        let mut merged = b.clone();
        merge_into(&mut merged, &a).unwrap();

        let node = merged.insert("/tmp");
        assert!(merged.node(node).is_recursive);
    }
}
