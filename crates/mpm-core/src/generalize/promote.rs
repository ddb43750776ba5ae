//! Promotion pass (C11): turn a node's `generalized` set into a live
//! `.*` regex child, the only place a `generalized` set ever actually
//! changes what [`crate::trie::Trie::find`] returns.
//!
//! Idempotent: promoting twice reuses the existing `.*` child rather
//! than creating a sibling, and the source node's `generalized` set ends
//! up empty either way (I4).

use crate::trie::Trie;

const WILDCARD_TAG: &str = ".*";

/// Promote every node's pending `generalized` accesses into a `.*`
/// regex child.
pub fn promote_generalized(trie: &mut Trie) {
    for node in trie.post_order() {
        if trie.node(node).generalized.is_empty() {
            continue;
        }
        let wildcard = find_or_create_wildcard(trie, node);
        let pending = trie.node(node).generalized.clone();
        trie.node_mut(wildcard).accesses.extend(&pending);
        trie.node_mut(node).generalized = Default::default();
    }
}

/// Find this node's existing `.*` regex child, or create one. Shared
/// with [`super::owner::generalize_by_owner_directory`], which also
/// needs to land accesses on a node's wildcard child without going
/// through the `generalized`-staging dance.
pub(crate) fn find_or_create_wildcard(trie: &mut Trie, parent: crate::trie::NodeId) -> crate::trie::NodeId {
    if let Some(existing) = trie
        .node(parent)
        .children()
        .iter()
        .copied()
        .find(|&c| trie.node(c).is_regexp && trie.node(c).tag == WILDCARD_TAG)
    {
        return existing;
    }
    let child = trie.add_child(parent, WILDCARD_TAG);
    trie.node_mut(child).is_regexp = true;
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Access;
    use crate::domain::Domain;
    use crate::permission::Permission;

    #[test]
    fn promotion_creates_a_single_wildcard_child() {
        let mut trie = Trie::new();
        let dir = trie.insert("/home/alice");
        trie.node_mut(dir)
            .generalized
            .add_access(Access::new(Permission::READ, 1000, Domain::empty()));

        promote_generalized(&mut trie);
        promote_generalized(&mut trie);

        let wildcards: Vec<_> = trie
            .node(dir)
            .children()
            .iter()
            .filter(|&&c| trie.node(c).is_regexp)
            .collect();
        assert_eq!(wildcards.len(), 1);
        assert!(trie.node(dir).generalized.is_empty());
    }
}
