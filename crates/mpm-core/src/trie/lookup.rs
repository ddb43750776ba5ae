//! Node lookup (C4): literal match, then regex children in insertion
//! order (first full match wins), then recursive-ancestor short-circuit,
//! else not found.
//!
//! "Not found" is `None`, never an error (§7) — a missing path is a
//! routine outcome of evaluation, not a fault.

use super::{NodeId, Trie};

/// Controls which of the fallback lookup steps `Trie::find` is allowed
/// to use. Callers that only want an exact literal match (e.g. the
/// merge pass, §4.9) can disable the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    /// Try regex children when no literal child matches.
    pub allow_regex: bool,
    /// Fall back to the nearest recursive ancestor when no child
    /// matches at all.
    pub allow_recursive: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        FindOptions {
            allow_regex: true,
            allow_recursive: true,
        }
    }
}

impl Trie {
    /// Resolve `path` to the node that governs access to it, per the
    /// precedence in §4.4: at every step of the walk, a node flagged
    /// `is_recursive` answers immediately for itself and its whole
    /// descendant closure (I5) — even if a more specific literal or
    /// regex child exists further down. Only once that short-circuit
    /// doesn't apply does an exact literal child win outright; failing
    /// that, the first regex child (in insertion order) whose pattern
    /// fully matches the remaining component wins; failing that, the
    /// walk dead-ends and lookup reports not found.
    pub fn find(&mut self, path: &str, options: FindOptions) -> Option<NodeId> {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        self.find_from(self.root, &components, options)
    }

    fn find_from(&mut self, current: NodeId, remaining: &[&str], options: FindOptions) -> Option<NodeId> {
        if options.allow_recursive && self.node(current).is_recursive {
            return Some(current);
        }

        let Some((&component, rest)) = remaining.split_first() else {
            return Some(current);
        };

        let children: Vec<NodeId> = self.node(current).children().to_vec();

        for &child in &children {
            if self.node(child).tag == component && !self.node(child).is_regexp {
                if let Some(found) = self.find_from(child, rest, options) {
                    return Some(found);
                }
            }
        }

        if options.allow_regex {
            for &child in &children {
                if !self.node(child).is_regexp {
                    continue;
                }
                let is_match = match self.node_mut(child).regex() {
                    Ok(re) => re.is_match(component),
                    Err(_) => false,
                };
                if is_match {
                    if let Some(found) = self.find_from(child, rest, options) {
                        return Some(found);
                    }
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Permission;

    #[test]
    fn literal_child_wins_over_regex_sibling() {
        let mut trie = Trie::new();
        let log_dir = trie.insert("/var/log");
        let literal = trie.insert("/var/log/app.log");
        let regex = trie.add_child(log_dir, "app-.*\\.log");
        trie.node_mut(regex).is_regexp = true;

        let found = trie.find("/var/log/app.log", FindOptions::default());
        assert_eq!(found, Some(literal));
    }

    #[test]
    fn first_matching_regex_child_wins_in_insertion_order() {
        let mut trie = Trie::new();
        let log_dir = trie.insert("/var/log");
        let first = trie.add_child(log_dir, ".*");
        trie.node_mut(first).is_regexp = true;
        let second = trie.add_child(log_dir, "app-.*");
        trie.node_mut(second).is_regexp = true;

        let found = trie.find("/var/log/app-1.log", FindOptions::default());
        assert_eq!(found, Some(first));
    }

    #[test]
    fn recursive_ancestor_is_used_when_no_child_matches() {
        let mut trie = Trie::new();
        let tmp = trie.insert("/tmp");
        trie.node_mut(tmp).is_recursive = true;
        trie.node_mut(tmp).accesses.add_access(crate::access::Access::new(
            Permission::READ,
            1000,
            crate::domain::Domain::empty(),
        ));

        let found = trie.find("/tmp/a/b/c", FindOptions::default());
        assert_eq!(found, Some(tmp));
    }

    #[test]
    fn recursive_node_short_circuits_before_a_more_specific_literal_child() {
        let mut trie = Trie::new();
        let tmp = trie.insert("/tmp");
        trie.node_mut(tmp).is_recursive = true;
        trie.insert("/tmp/a");

        let found = trie.find("/tmp/a", FindOptions::default());
        assert_eq!(found, Some(tmp), "I5: recursive ancestor answers on first match, even when a more specific child exists");
    }

    #[test]
    fn unknown_path_with_no_recursive_ancestor_is_none() {
        let mut trie = Trie::new();
        trie.insert("/etc/passwd");
        assert_eq!(trie.find("/var/unknown", FindOptions::default()), None);
    }

    #[test]
    fn disabling_recursive_fallback_returns_none() {
        let mut trie = Trie::new();
        let tmp = trie.insert("/tmp");
        trie.node_mut(tmp).is_recursive = true;

        let opts = FindOptions {
            allow_regex: true,
            allow_recursive: false,
        };
        assert_eq!(trie.find("/tmp/a", opts), None);
    }
}
