//! Reference `FsSnapshot` (A5): a JSON "directory manifest" describing a
//! point-in-time filesystem walk.
//!
//! Stands in for the real persistent filesystem-snapshot database (§1,
//! §6 — out of scope for `mpm-core`). The manifest is a flat JSON object
//! keyed by absolute path:
//!
//! ```json
//! {
//!   "/": {"uid": 0, "gid": 0, "mode": 493, "is_dir": true},
//!   "/etc/passwd": {"uid": 0, "gid": 0, "mode": 420, "is_dir": false}
//! }
//! ```
//!
//! `mode` is a standard POSIX permission word; ownership checks use only
//! the owner and "other" bits (there is no group concept in the core
//! engine's uid-keyed model, so group bits are not consulted for
//! `can_read`/`can_write` — only for [`FsSnapshot::get_directories_by_id`]'s
//! `gids` filter, which the manifest tracks separately via `gid`).

use std::collections::HashMap;
use std::convert::Infallible;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use mpm_core::db::{FsSnapshot, InodeId};
use serde::Deserialize;
use thiserror::Error;

const OWNER_READ: u32 = 0o400;
const OWNER_WRITE: u32 = 0o200;
const OTHER_READ: u32 = 0o004;
const OTHER_WRITE: u32 = 0o002;

/// Failure loading a directory-manifest JSON file.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The underlying file could not be opened or read.
    #[error("reading directory manifest: {0}")]
    Io(#[from] std::io::Error),
    /// The file wasn't valid JSON, or didn't match the manifest shape.
    #[error("parsing directory manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestEntry {
    uid: u32,
    gid: u32,
    mode: u32,
    is_dir: bool,
}

struct Node {
    path: String,
    entry: ManifestEntry,
    children: Vec<InodeId>,
}

/// A [`FsSnapshot`] built from a flat path→metadata JSON manifest.
pub struct DirectoryManifest {
    nodes: Vec<Node>,
    by_path: HashMap<String, InodeId>,
}

fn parent_of(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(trimmed[..idx].to_string()),
        None => None,
    }
}

fn name_of(path: &str) -> &str {
    if path == "/" {
        return "/";
    }
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

impl DirectoryManifest {
    /// Load a manifest from a JSON file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let file = File::open(path)?;
        let entries: HashMap<String, ManifestEntry> = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self::from_entries(entries))
    }

    fn from_entries(entries: HashMap<String, ManifestEntry>) -> Self {
        let mut paths: Vec<String> = entries.keys().cloned().collect();
        paths.sort();

        let mut nodes = Vec::with_capacity(paths.len());
        let mut by_path = HashMap::with_capacity(paths.len());
        for (idx, path) in paths.iter().enumerate() {
            let id = inode_id(idx);
            by_path.insert(path.clone(), id);
            nodes.push(Node {
                path: path.clone(),
                entry: entries[path].clone(),
                children: Vec::new(),
            });
        }

        let parent_links: Vec<(InodeId, Option<InodeId>)> = nodes
            .iter()
            .enumerate()
            .map(|(idx, n)| (inode_id(idx), parent_of(&n.path).and_then(|p| by_path.get(&p).copied())))
            .collect();
        for (child_id, parent) in parent_links {
            if let Some(parent_id) = parent {
                nodes[node_index(parent_id)].children.push(child_id);
            }
        }

        Self { nodes, by_path }
    }

    fn node(&self, inode: InodeId) -> &Node {
        &self.nodes[node_index(inode)]
    }
}

/// `DirectoryManifest` assigns inode ids as 1-based positions in its own
/// `nodes` arena, sorted by path for determinism. `InodeId` is opaque to
/// `mpm-core` itself — this mapping is purely an implementation detail
/// of this reference snapshot.
fn inode_id(index: usize) -> InodeId {
    index as u64 + 1
}

fn node_index(inode: InodeId) -> usize {
    (inode - 1) as usize
}

impl FsSnapshot for DirectoryManifest {
    type Error = Infallible;

    fn search_path(&self, path: &str) -> Result<Option<InodeId>, Self::Error> {
        Ok(self.by_path.get(path).copied())
    }

    fn is_directory(&self, inode: InodeId) -> Result<bool, Self::Error> {
        Ok(self.node(inode).entry.is_dir)
    }

    fn get_owner(&self, inode: InodeId) -> Result<u32, Self::Error> {
        Ok(self.node(inode).entry.uid)
    }

    fn get_children_inodes(&self, inode: InodeId) -> Result<Vec<InodeId>, Self::Error> {
        Ok(self.node(inode).children.clone())
    }

    fn can_read(&self, inode: InodeId, uid: u32) -> Result<bool, Self::Error> {
        let entry = &self.node(inode).entry;
        let bit = if entry.uid == uid { OWNER_READ } else { OTHER_READ };
        Ok(entry.mode & bit != 0)
    }

    fn can_write(&self, inode: InodeId, uid: u32) -> Result<bool, Self::Error> {
        let entry = &self.node(inode).entry;
        let bit = if entry.uid == uid { OWNER_WRITE } else { OTHER_WRITE };
        Ok(entry.mode & bit != 0)
    }

    fn get_num_children(&self, inode: InodeId) -> Result<usize, Self::Error> {
        Ok(self.node(inode).children.len())
    }

    fn get_directories_by_id(&self, uids: &[u32], gids: &[u32]) -> Result<Vec<(String, u32)>, Self::Error> {
        Ok(self
            .nodes
            .iter()
            .filter(|n| n.entry.is_dir && (uids.contains(&n.entry.uid) || gids.contains(&n.entry.gid)))
            .map(|n| (n.path.clone(), n.entry.uid))
            .collect())
    }

    fn get_specific_child(&self, inode: InodeId, name: &str) -> Result<Option<InodeId>, Self::Error> {
        Ok(self
            .node(inode)
            .children
            .iter()
            .copied()
            .find(|&c| name_of(&self.node(c).path) == name))
    }

    fn get_children_rowids_and_names(&self, inode: InodeId) -> Result<Vec<(InodeId, String)>, Self::Error> {
        Ok(self
            .node(inode)
            .children
            .iter()
            .map(|&c| (c, name_of(&self.node(c).path).to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> DirectoryManifest {
        let json = r#"{
            "/": {"uid": 0, "gid": 0, "mode": 493, "is_dir": true},
            "/etc": {"uid": 0, "gid": 0, "mode": 493, "is_dir": true},
            "/etc/passwd": {"uid": 0, "gid": 0, "mode": 420, "is_dir": false},
            "/home/alice": {"uid": 1000, "gid": 1000, "mode": 493, "is_dir": true}
        }"#;
        let entries: HashMap<String, ManifestEntry> = serde_json::from_str(json).unwrap();
        DirectoryManifest::from_entries(entries)
    }

    #[test]
    fn search_path_and_children() {
        let fs = manifest();
        let etc = fs.search_path("/etc").unwrap().unwrap();
        assert!(fs.is_directory(etc).unwrap());
        assert_eq!(fs.get_num_children(etc).unwrap(), 1);
    }

    #[test]
    fn owner_can_read_and_write_but_other_cannot_write() {
        let fs = manifest();
        let passwd = fs.search_path("/etc/passwd").unwrap().unwrap();
        assert!(fs.can_read(passwd, 0).unwrap());
        assert!(!fs.can_write(passwd, 0).unwrap());
        assert!(fs.can_read(passwd, 1000).unwrap());
        assert!(!fs.can_write(passwd, 1000).unwrap());
    }

    #[test]
    fn directories_owned_by_uid_are_found() {
        let fs = manifest();
        let dirs = fs.get_directories_by_id(&[1000], &[]).unwrap();
        assert_eq!(dirs, vec![("/home/alice".to_string(), 1000)]);
    }
}
