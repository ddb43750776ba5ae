//! Nonexistent-path generalizer (C7): a path that was accessed but no
//! longer exists in the filesystem snapshot tells you nothing about that
//! specific name — only that *something* at that location was once
//! accessible. Its accesses are folded into the parent directory's
//! `generalized` set instead, so the fact survives as a directory-level
//! claim rather than pinning a dead filename.

use crate::config::MiningConfig;
use crate::db::FsSnapshot;
use crate::trie::Trie;

/// Fold the accesses of every node whose path is absent from `snapshot`
/// into its parent's `generalized` set.
pub fn generalize_nonexistent<S: FsSnapshot>(trie: &mut Trie, snapshot: &S, _config: &MiningConfig) {
    for node in trie.post_order() {
        if node == trie.root() {
            continue;
        }
        let path = trie.path_of(node);
        let exists = matches!(snapshot.search_path(&path), Ok(Some(_)));
        if exists {
            continue;
        }
        let Some(parent) = trie.node(node).parent() else {
            continue;
        };
        let accesses = trie.node(node).accesses.clone();
        let generalized = trie.node(node).generalized.clone();
        trie.node_mut(parent).generalized.extend(&accesses);
        trie.node_mut(parent).generalized.extend(&generalized);
    }
}
