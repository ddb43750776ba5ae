//! Path trie (C3): a directory-shaped tree keyed by path components, with
//! per-node access sets and generalization flags.
//!
//! Nodes live in an arena (`Vec<TrieNode>`) indexed by [`NodeId`] rather
//! than behind `Rc<RefCell<_>>` — parent/child links are plain integers,
//! so the whole `Trie` is `Clone`, which gives deep-clone independence
//! (§4.3, §8 "Clone independence") for free: cloning the `Vec` clones
//! every node and its access sets, and there is no shared mutable state
//! to alias.

mod lookup;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::access::{Access, AccessSet};
use crate::audit::AuditEntry;
use crate::error::{MpmError, Result};
use crate::permission::Permission;

pub use lookup::FindOptions;

/// Index of a node in a [`Trie`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One node of the path trie (§3 TrieNode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrieNode {
    /// Last path component, or `.*` for a regex child.
    pub tag: String,
    /// Accesses directly recorded for this node.
    pub accesses: AccessSet,
    /// Accesses lifted by a generalization pass, awaiting promotion
    /// (§4.11) into a regex child. Empty once promoted (I4).
    pub generalized: AccessSet,
    /// `true` if `tag` is matched against sibling names as a regex
    /// rather than compared literally.
    pub is_regexp: bool,
    /// `true` if this node's accesses apply to itself *and* every
    /// descendant (I5).
    pub is_recursive: bool,

    parent: Option<NodeId>,
    children: Vec<NodeId>,

    #[serde(skip)]
    compiled: Option<Regex>,
}

impl TrieNode {
    fn new(tag: String, parent: Option<NodeId>) -> Self {
        Self {
            tag,
            accesses: AccessSet::new(),
            generalized: AccessSet::new(),
            is_regexp: false,
            is_recursive: false,
            parent,
            children: Vec::new(),
        compiled: None,
        }
    }

    /// Children of this node, in insertion order (§5 determinism).
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Parent of this node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Lazily compile and cache this node's tag as a regex (§9 "Regex
    /// cache"). Only meaningful when `is_regexp` is set.
    fn regex(&mut self) -> Result<&Regex> {
        if self.compiled.is_none() {
            let anchored = format!("^(?:{})$", self.tag);
            let re = Regex::new(&anchored).map_err(|source| MpmError::InvalidPattern {
                pattern: self.tag.clone(),
                source,
            })?;
            self.compiled = Some(re);
        }
        Ok(self.compiled.as_ref().expect("just inserted"))
    }
}

/// The path trie itself: an arena of [`TrieNode`]s rooted at `/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trie {
    nodes: Vec<TrieNode>,
    root: NodeId,
}

/// Pattern used to flag a freshly-created path-generalization component
/// as a regex node: an unescaped dot (§4.3 `add_path_generalization`).
static UNESCAPED_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\\]\.").unwrap());

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl Trie {
    /// A new trie containing only the root node, tagged `/`.
    pub fn new() -> Self {
        let root = NodeId(0);
        Trie {
            nodes: vec![TrieNode::new("/".to_string(), None)],
            root,
        }
    }

    /// Identifier of the root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> &TrieNode {
        &self.nodes[id.index()]
    }

    /// Mutably borrow a node.
    pub fn node_mut(&mut self, id: NodeId) -> &mut TrieNode {
        &mut self.nodes[id.index()]
    }

    /// Number of nodes in the trie (including the root).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if the trie holds only the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn push_child(&mut self, parent: NodeId, tag: String) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TrieNode::new(tag, Some(parent)));
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Create a single child node tagged `tag` directly under `parent`,
    /// without splitting on `/`. Used by generalization passes that
    /// synthesize a regex tag (e.g. `.*`) at a precise level.
    pub(crate) fn add_child(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.push_child(parent, tag.to_string())
    }

    fn child_by_tag(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.nodes[parent.index()]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c.index()].tag == tag)
    }

    /// Split a POSIX path into its non-empty components, ignoring a
    /// trailing slash (so `/a/b/` and `/a/b` insert identically).
    fn components(path: &str) -> impl Iterator<Item = &str> {
        path.split('/').filter(|c| !c.is_empty())
    }

    /// Walk `path`, creating literal-tag children as needed, and return
    /// the terminal node.
    pub fn insert(&mut self, path: &str) -> NodeId {
        let mut current = self.root;
        for component in Self::components(path) {
            current = match self.child_by_tag(current, component) {
                Some(existing) => existing,
                None => self.push_child(current, component.to_string()),
            };
        }
        current
    }

    /// Reconstruct the absolute path leading to `node`.
    pub fn path_of(&self, node: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = node;
        while current != self.root {
            let n = &self.nodes[current.index()];
            parts.push(n.tag.clone());
            current = n.parent.expect("non-root node has a parent (I1)");
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }

    /// Load a batch of audit entries (§4.3 `load_log`): for each entry,
    /// strip a trailing `" (deleted)"` marker, create/locate the node,
    /// and merge an `Access` built from `(permission, uid, domain)` via
    /// the §4.2 rule. `proctitle` rides along for debugging only.
    pub fn load_log<'a>(&mut self, entries: impl IntoIterator<Item = &'a AuditEntry>) {
        for entry in entries {
            let path = entry.path.strip_suffix(" (deleted)").unwrap_or(&entry.path);
            let node = self.insert(path);
            let access = Access::new(entry.permission, entry.uid, entry.domain.clone())
                .with_proctitle(entry.proctitle.clone());
            self.nodes[node.index()].accesses.add_access(access);
        }
    }

    /// Every distinct domain carried by any access (concrete or
    /// generalized) anywhere in the trie, in first-seen order. Used by
    /// CLI-level passes (FHS application, owner-by-directory) that need
    /// "every domain observed in this run" rather than a single one.
    pub fn domains(&self) -> Vec<crate::domain::Domain> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for node in &self.nodes {
            for access in node.accesses.iter().chain(node.generalized.iter()) {
                if seen.insert(access.domain().clone()) {
                    out.push(access.domain().clone());
                }
            }
        }
        out
    }

    /// Every node with a non-empty access set, keyed by reconstructed
    /// absolute path (§4.3 `get_accessed_paths`).
    pub fn accessed_paths(&self) -> HashMap<String, NodeId> {
        let mut out = HashMap::new();
        for (idx, node) in self.nodes.iter().enumerate() {
            if !node.accesses.is_empty() {
                out.insert(self.path_of(NodeId(idx as u32)), NodeId(idx as u32));
            }
        }
        out
    }

    /// Insert `path`, tagging each newly-created node whose final
    /// component contains an unescaped dot as a regex node (§4.3
    /// `add_path_generalization`). Existing nodes are reused by tag,
    /// preserving their flags.
    pub fn add_path_generalization(&mut self, path: &str) -> NodeId {
        let mut current = self.root;
        for component in Self::components(path) {
            current = match self.child_by_tag(current, component) {
                Some(existing) => existing,
                None => {
                    let id = self.push_child(current, component.to_string());
                    self.nodes[id.index()].is_regexp = UNESCAPED_DOT.is_match(component);
                    id
                }
            };
        }
        current
    }

    /// Produce a fully independent copy: equivalent to `self.clone()`,
    /// named to match the spec's vocabulary (§4.3, §8 "Clone
    /// independence").
    pub fn deep_clone(&self) -> Trie {
        self.clone()
    }

    pub(crate) fn nodes_iter(&self) -> impl Iterator<Item = (NodeId, &TrieNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    /// Every node reachable from the root, deepest first (post-order),
    /// siblings visited in insertion order. Generalization passes walk
    /// the trie this way so a node's children have already been
    /// processed by the time the node itself is visited.
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.post_order_from(self.root, &mut out);
        out
    }

    fn post_order_from(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for &child in self.node(node).children() {
            self.post_order_from(child, out);
        }
        out.push(node);
    }

    /// Render the trie as an indented hierarchy, one line per node,
    /// annotated with its flags and accesses. Purely diagnostic output
    /// for `tree.txt`-style result dumps, not a serialization format.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_from(self.root, 0, &mut out);
        out
    }

    fn dump_from(&self, node: NodeId, depth: usize, out: &mut String) {
        let n = self.node(node);
        out.push_str(&"  ".repeat(depth));
        out.push_str(&n.tag);
        if n.is_regexp {
            out.push_str(" [regexp]");
        }
        if n.is_recursive {
            out.push_str(" [recursive]");
        }
        for access in n.accesses.iter() {
            out.push_str(&format!(" {{uid={} perm={}}}", access.uid(), access.permissions()));
        }
        out.push('\n');
        for &child in n.children() {
            self.dump_from(child, depth + 1, out);
        }
    }
}
