//! `FsSnapshot` (§6): the narrow interface the engine uses to consult a
//! point-in-time filesystem snapshot, and C12's enumeration of concrete
//! inode ids along a (possibly regex-bearing) trie path.
//!
//! Like [`crate::audit::AuditSource`], this is a boundary trait — the
//! concrete snapshot store (typically backed by a database dump of a
//! filesystem walk) is an external collaborator and out of scope here.

use crate::trie::{NodeId, Trie};

/// Opaque identifier of a filesystem object in a snapshot (an inode
/// number, a database rowid — whatever the collaborator uses).
pub type InodeId = u64;

/// Read-only access to a filesystem snapshot, as needed by the
/// generalization passes that reason about what's actually on disk
/// (C5', C6, C7, C12).
pub trait FsSnapshot {
    /// Error type surfaced by snapshot queries.
    type Error: std::error::Error + 'static;

    /// Resolve an absolute path to its inode id, if it exists in the
    /// snapshot.
    fn search_path(&self, path: &str) -> Result<Option<InodeId>, Self::Error>;

    /// `true` if `inode` denotes a directory.
    fn is_directory(&self, inode: InodeId) -> Result<bool, Self::Error>;

    /// Owning uid of `inode`.
    fn get_owner(&self, inode: InodeId) -> Result<u32, Self::Error>;

    /// Inode ids of every direct child of `inode`.
    fn get_children_inodes(&self, inode: InodeId) -> Result<Vec<InodeId>, Self::Error>;

    /// `true` if `uid` can read `inode` per the snapshot's recorded mode.
    fn can_read(&self, inode: InodeId, uid: u32) -> Result<bool, Self::Error>;

    /// `true` if `uid` can write `inode` per the snapshot's recorded mode.
    fn can_write(&self, inode: InodeId, uid: u32) -> Result<bool, Self::Error>;

    /// Number of direct children of `inode` (used by the filesystem-derived
    /// threshold generalizer, C5').
    fn get_num_children(&self, inode: InodeId) -> Result<usize, Self::Error>;

    /// Every directory in the snapshot owned by one of `uids` or one of
    /// `gids`, as `(absolute_path, owner_uid)` pairs. Used by the
    /// owner-by-directory generalizer (§4.6) to find directories worth
    /// granting a blanket `.*` rule under, independent of anything the
    /// audit log observed.
    fn get_directories_by_id(&self, uids: &[u32], gids: &[u32]) -> Result<Vec<(String, u32)>, Self::Error>;

    /// The direct child of `inode` named `name`, if any.
    fn get_specific_child(&self, inode: InodeId, name: &str) -> Result<Option<InodeId>, Self::Error>;

    /// `(inode, name)` pairs for every direct child of `inode`.
    fn get_children_rowids_and_names(&self, inode: InodeId) -> Result<Vec<(InodeId, String)>, Self::Error>;
}

/// Walk a trie path from the root, resolving each component against the
/// snapshot (C12): literal components are looked up by name; a
/// `is_regexp` component is expanded to every matching child name found
/// in the snapshot at that level. Returns every concrete inode id
/// reachable by substituting the trie's regex components with real
/// directory-entry names.
pub fn node_to_db_paths<S: FsSnapshot>(
    trie: &Trie,
    node: NodeId,
    snapshot: &S,
    root_inode: InodeId,
) -> Result<Vec<InodeId>, S::Error> {
    let mut components = Vec::new();
    let mut current = node;
    while current != trie.root() {
        components.push(current);
        current = trie.node(current).parent().expect("non-root has a parent");
    }
    components.reverse();

    let mut frontier = vec![root_inode];
    for component in components {
        let tag = &trie.node(component).tag;
        let mut next = Vec::new();
        for &inode in &frontier {
            if trie.node(component).is_regexp {
                let re = regex::Regex::new(&format!("^(?:{tag})$")).ok();
                for (child_inode, name) in snapshot.get_children_rowids_and_names(inode)? {
                    if re.as_ref().is_some_and(|re| re.is_match(&name)) {
                        next.push(child_inode);
                    }
                }
            } else if let Some(child) = snapshot.get_specific_child(inode, tag)? {
                next.push(child);
            }
        }
        frontier = next;
        if frontier.is_empty() {
            break;
        }
    }
    Ok(frontier)
}
