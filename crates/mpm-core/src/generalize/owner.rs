//! Owner-based generalizer (C6): lift an access to directory scope when
//! the filesystem snapshot shows the acting uid stands in some
//! ownership/capability relationship to every child, even children that
//! were never themselves accessed.
//!
//! The four strategies are tried in a fixed order and the first one that
//! applies wins — this is a genuine short-circuit (an `elif` chain in
//! the source project, not four independent checks that could all fire):
//! `OWN_DIR` → `OWN_FILES` → `READ_FILES` → `WRITE_FILES`. `OWN_DIR` and
//! `OWN_FILES` grant the uid's full observed permission set, on the
//! theory that ownership implies full control; `READ_FILES`/
//! `WRITE_FILES` only grant the single capability they checked.
//!
//! A strategy with no children to check is never satisfied — an empty
//! directory tells you nothing about ownership (`all_if_any`).

use std::collections::HashMap;

use crate::access::Access;
use crate::config::MiningConfig;
use crate::db::FsSnapshot;
use crate::domain::Domain;
use crate::permission::Permission;
use crate::trie::Trie;

/// Run the owner-generalization pass over every directory node that
/// exists in `snapshot`.
pub fn generalize_by_owner<S: FsSnapshot>(trie: &mut Trie, snapshot: &S, config: &MiningConfig) {
    let strategy = config.owner_generalization_strategy;
    for node in trie.post_order() {
        if node == trie.root() {
            continue;
        }
        let path = trie.path_of(node);
        let Ok(Some(inode)) = snapshot.search_path(&path) else {
            continue;
        };
        if !matches!(snapshot.is_directory(inode), Ok(true)) {
            continue;
        }
        let Ok(child_inodes) = snapshot.get_children_inodes(inode) else {
            continue;
        };
        if child_inodes.is_empty() {
            continue;
        }

        let children = trie.node(node).children().to_vec();
        let mut perm_by_uid: HashMap<u32, Permission> = HashMap::new();
        let mut domain_by_uid: HashMap<u32, Domain> = HashMap::new();
        for &child in &children {
            let child_node = trie.node(child);
            for access in child_node.accesses.iter().chain(child_node.generalized.iter()) {
                *perm_by_uid.entry(access.uid()).or_insert(Permission::NONE) |= access.permissions();
                domain_by_uid.entry(access.uid()).or_insert_with(|| access.domain().clone());
            }
        }

        let dir_owner = snapshot.get_owner(inode).ok();

        for (&uid, &observed) in &perm_by_uid {
            let dir_owner_matches = strategy.own_dir && dir_owner == Some(uid);
            let owns_all_files = strategy.own_files
                && all_if_any(child_inodes.iter().map(|&c| snapshot.get_owner(c).ok() == Some(uid)));
            let reads_all_files = strategy.read_files
                && all_if_any(child_inodes.iter().map(|&c| snapshot.can_read(c, uid).unwrap_or(false)));
            let writes_all_files = strategy.write_files
                && all_if_any(child_inodes.iter().map(|&c| snapshot.can_write(c, uid).unwrap_or(false)));

            let grant = if dir_owner_matches || owns_all_files {
                Some(observed)
            } else if reads_all_files {
                Some(Permission::READ)
            } else if writes_all_files {
                Some(Permission::WRITE)
            } else {
                None
            };

            if let Some(grant) = grant {
                let domain = domain_by_uid.get(&uid).cloned().unwrap_or_else(Domain::empty);
                trie.node_mut(node).generalized.add_access(Access::new(grant, uid, domain));
            }
        }
    }
}

/// Owner-by-directory variant (§4.6, last paragraph): instead of lifting
/// accesses already present in the trie, search the snapshot directly
/// for directories owned by any of `uids` or `gids`, and grant a
/// blanket `READ|WRITE` rule under each for every supplied domain. This
/// is how a service's private directories (e.g. a daemon's own
/// `uid`-owned spool dir) end up covered even when the audit log never
/// recorded an access that would have triggered the by-node strategies
/// above.
pub fn generalize_by_owner_directory<S: FsSnapshot>(
    trie: &mut Trie,
    snapshot: &S,
    uids: &[u32],
    gids: &[u32],
    domains: &[Domain],
) -> Result<(), S::Error> {
    for (path, _owner_uid) in snapshot.get_directories_by_id(uids, gids)? {
        let node = trie.insert(&path);
        let regex_child = super::promote::find_or_create_wildcard(trie, node);

        for domain in domains {
            let uid = domain.current().map(|link| link.effective_uid).unwrap_or(0);
            trie.node_mut(regex_child)
                .accesses
                .add_access(Access::new(Permission::READ | Permission::WRITE, uid, domain.clone()));
        }
    }
    Ok(())
}

/// `false` for an empty iterator; otherwise `true` iff every item is
/// `true`. Named after the source project's helper of the same
/// behavior: an owner claim about zero files is vacuously unconvincing,
/// not vacuously true.
fn all_if_any(mut items: impl Iterator<Item = bool>) -> bool {
    match items.next() {
        None => false,
        Some(first) => first && items.all(|b| b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;
    use std::convert::Infallible;

    #[derive(Default)]
    struct FakeFs {
        owners: Map<u64, u32>,
        children: Map<u64, Vec<u64>>,
        dirs: Map<u64, bool>,
        paths: Map<String, u64>,
        readable: Map<(u64, u32), bool>,
        directories_by_id: Vec<(String, u32)>,
    }

    impl FsSnapshot for FakeFs {
        type Error = Infallible;
        fn search_path(&self, path: &str) -> Result<Option<u64>, Infallible> {
            Ok(self.paths.get(path).copied())
        }
        fn is_directory(&self, inode: u64) -> Result<bool, Infallible> {
            Ok(*self.dirs.get(&inode).unwrap_or(&false))
        }
        fn get_owner(&self, inode: u64) -> Result<u32, Infallible> {
            Ok(*self.owners.get(&inode).unwrap_or(&0))
        }
        fn get_children_inodes(&self, inode: u64) -> Result<Vec<u64>, Infallible> {
            Ok(self.children.get(&inode).cloned().unwrap_or_default())
        }
        fn can_read(&self, inode: u64, uid: u32) -> Result<bool, Infallible> {
            Ok(*self.readable.get(&(inode, uid)).unwrap_or(&false))
        }
        fn can_write(&self, _inode: u64, _uid: u32) -> Result<bool, Infallible> {
            Ok(false)
        }
        fn get_num_children(&self, inode: u64) -> Result<usize, Infallible> {
            Ok(self.children.get(&inode).map_or(0, Vec::len))
        }
        fn get_directories_by_id(&self, _uids: &[u32], _gids: &[u32]) -> Result<Vec<(String, u32)>, Infallible> {
            Ok(self.directories_by_id.clone())
        }
        fn get_specific_child(&self, _inode: u64, _name: &str) -> Result<Option<u64>, Infallible> {
            Ok(None)
        }
        fn get_children_rowids_and_names(&self, _inode: u64) -> Result<Vec<(u64, String)>, Infallible> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn owning_the_directory_grants_full_observed_permission() {
        let mut trie = Trie::new();
        let dir = trie.insert("/home/alice");
        let file = trie.insert("/home/alice/a");
        trie.node_mut(file).accesses.add_access(Access::new(
            Permission::READ | Permission::WRITE,
            1000,
            Domain::empty(),
        ));

        let fs = FakeFs {
            owners: Map::from([(1, 1000)]),
            children: Map::from([(1, vec![2])]),
            dirs: Map::from([(1, true)]),
            paths: Map::from([("/home/alice".to_string(), 1)]),
            readable: Map::new(),
            ..Default::default()
        };

        let config = MiningConfig::default();
        generalize_by_owner(&mut trie, &fs, &config);

        let access = trie.node(dir).generalized.get(1000, &Domain::empty()).unwrap();
        assert_eq!(access.permissions(), Permission::READ | Permission::WRITE);
    }

    #[test]
    fn read_files_strategy_grants_only_read() {
        let mut trie = Trie::new();
        let dir = trie.insert("/srv/data");
        let file = trie.insert("/srv/data/a");
        trie.node_mut(file)
            .accesses
            .add_access(Access::new(Permission::READ, 2000, Domain::empty()));

        let fs = FakeFs {
            owners: Map::from([(1, 0)]),
            children: Map::from([(1, vec![2])]),
            dirs: Map::from([(1, true)]),
            paths: Map::from([("/srv/data".to_string(), 1)]),
            readable: Map::from([((2, 2000), true)]),
            ..Default::default()
        };

        let config = MiningConfig::default();
        generalize_by_owner(&mut trie, &fs, &config);

        let access = trie.node(dir).generalized.get(2000, &Domain::empty()).unwrap();
        assert_eq!(access.permissions(), Permission::READ);
    }

    #[test]
    fn owner_by_directory_grants_blanket_rule_under_matching_dirs() {
        let mut trie = Trie::new();
        let fs = FakeFs {
            directories_by_id: vec![("/var/spool/mpmd".to_string(), 1500)],
            ..Default::default()
        };
        let domains = vec![Domain::empty().exec("/usr/sbin/mpmd", 1500)];

        generalize_by_owner_directory(&mut trie, &fs, &[1500], &[], &domains).unwrap();

        let dir = trie.insert("/var/spool/mpmd");
        let wildcards: Vec<_> = trie
            .node(dir)
            .children()
            .iter()
            .copied()
            .filter(|&c| trie.node(c).is_regexp)
            .collect();
        assert_eq!(wildcards.len(), 1);
        let access = trie.node(wildcards[0]).accesses.get(1500, &domains[0]).unwrap();
        assert_eq!(access.permissions(), Permission::READ | Permission::WRITE);
    }
}
