use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tracing::{debug, warn};

use fleet_proto::{DirectoryToMake, InodeToChange, InodeToMake, NewInode, UpdateRequest};
use fleet_tree::{Image, Inode, RegularInode};

use crate::desired::{desired_view, DesiredNode};
use crate::error::{ReconcileError, ReconcileResult};
use crate::sub::Sub;

/// Build the structural edit script that transforms the machine's live
/// tree into the filtered desired tree, writing it into `request`.
///
/// Walks the union of live and desired paths in lexicographic order.
/// Paths excluded by the image's filter are left alone entirely, even
/// when they exist only on the live side.
///
/// Missing computed files follow the deletion policy:
/// `delete_missing_computed_files` emits a deletion for the path and
/// continues, regardless of `ignore_missing_computed_files` (deletion is
/// always safe to prefer when explicitly requested); otherwise the
/// ignore flag decides between skipping the path and failing the whole
/// build.
pub fn build_update_request(
    sub: &Sub<'_>,
    image: &Image,
    request: &mut UpdateRequest,
    delete_missing_computed_files: bool,
    ignore_missing_computed_files: bool,
) -> ReconcileResult<()> {
    let desired = desired_view(image)?;
    let live: BTreeMap<String, &Inode> = sub
        .tree
        .walk()
        .into_iter()
        .map(|entry| (entry.path, entry.inode))
        .collect();
    let paths: BTreeSet<&String> = live.keys().chain(desired.keys()).collect();

    for path in paths {
        if image.filter.matches(path) {
            continue;
        }
        let live_node = live.get(path).copied();
        match desired.get(path).cloned() {
            None => {
                if live_node.is_some() {
                    request.paths_to_delete.push(path.clone());
                }
            }
            Some(DesiredNode::Directory(dir)) => match live_node {
                Some(Inode::Directory(live_dir)) => {
                    if (live_dir.mode, live_dir.uid, live_dir.gid)
                        != (dir.mode, dir.uid, dir.gid)
                    {
                        request.inodes_to_change.push(InodeToChange {
                            path: path.clone(),
                            mode: dir.mode,
                            uid: dir.uid,
                            gid: dir.gid,
                            mtime: 0,
                        });
                    }
                }
                Some(_) => {
                    request.paths_to_delete.push(path.clone());
                    push_directory(request, path, dir.mode, dir.uid, dir.gid);
                }
                None => push_directory(request, path, dir.mode, dir.uid, dir.gid),
            },
            Some(DesiredNode::Regular(inode)) => {
                emit_regular(request, path, live_node, inode);
            }
            Some(DesiredNode::Computed(_)) => match sub.computed_inodes.get(path.as_str()) {
                Some(resolved) => emit_regular(request, path, live_node, resolved),
                None if delete_missing_computed_files => {
                    warn!(sub = %sub, path = path.as_str(), "deleting missing computed file");
                    request.paths_to_delete.push(path.clone());
                }
                None if ignore_missing_computed_files => {
                    warn!(sub = %sub, path = path.as_str(), "ignoring missing computed file");
                }
                None => {
                    return Err(ReconcileError::MissingComputedFile { path: path.clone() });
                }
            },
            Some(DesiredNode::Symlink(link)) => {
                let matches = matches!(
                    live_node,
                    Some(Inode::Symlink(live_link))
                        if live_link.target == link.target
                            && live_link.uid == link.uid
                            && live_link.gid == link.gid
                );
                if !matches {
                    if matches!(live_node, Some(Inode::Directory(_))) {
                        request.paths_to_delete.push(path.clone());
                    }
                    request.inodes_to_make.push(InodeToMake {
                        path: path.clone(),
                        inode: NewInode::Symlink {
                            uid: link.uid,
                            gid: link.gid,
                            target: link.target.clone(),
                        },
                    });
                }
            }
            Some(DesiredNode::Special(special)) => match live_node {
                Some(Inode::Special(live_special)) if live_special == special => {}
                Some(Inode::Special(live_special)) if live_special.rdev == special.rdev => {
                    request.inodes_to_change.push(InodeToChange {
                        path: path.clone(),
                        mode: special.mode,
                        uid: special.uid,
                        gid: special.gid,
                        mtime: special.mtime,
                    });
                }
                other => {
                    if matches!(other, Some(Inode::Directory(_))) {
                        request.paths_to_delete.push(path.clone());
                    }
                    request.inodes_to_make.push(InodeToMake {
                        path: path.clone(),
                        inode: NewInode::Special {
                            mode: special.mode,
                            uid: special.uid,
                            gid: special.gid,
                            mtime: special.mtime,
                            rdev: special.rdev,
                        },
                    });
                }
            },
        }
    }

    debug!(
        sub = %sub,
        deletes = request.paths_to_delete.len(),
        makes = request.inodes_to_make.len(),
        changes = request.inodes_to_change.len(),
        "update request built"
    );
    Ok(())
}

fn push_directory(request: &mut UpdateRequest, path: &str, mode: u32, uid: u32, gid: u32) {
    request.directories_to_make.push(DirectoryToMake {
        path: path.to_string(),
        mode,
        uid,
        gid,
    });
}

/// Emit operations bringing `path` to the desired regular inode.
fn emit_regular(
    request: &mut UpdateRequest,
    path: &str,
    live_node: Option<&Inode>,
    desired: &RegularInode,
) {
    match live_node {
        Some(Inode::Regular(live)) if live.same_content(desired) => {
            if (live.mode, live.uid, live.gid, live.mtime)
                != (desired.mode, desired.uid, desired.gid, desired.mtime)
            {
                request.inodes_to_change.push(InodeToChange {
                    path: path.to_string(),
                    mode: desired.mode,
                    uid: desired.uid,
                    gid: desired.gid,
                    mtime: desired.mtime,
                });
            }
        }
        other => {
            if matches!(other, Some(Inode::Directory(_))) {
                request.paths_to_delete.push(path.to_string());
            }
            request.inodes_to_make.push(InodeToMake {
                path: path.to_string(),
                inode: NewInode::Regular {
                    mode: desired.mode,
                    uid: desired.uid,
                    gid: desired.gid,
                    mtime: desired.mtime,
                    size: desired.size,
                    hash: desired.hash,
                },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_types::ObjectHash;
    use fleet_tree::{ComputedInode, FileSystemTree, Filter, ObjectCache, TreeBuilder};

    fn sub_context<'a>(
        tree: &'a FileSystemTree,
        cache: &'a ObjectCache,
        computed: &'a BTreeMap<String, RegularInode>,
    ) -> Sub<'a> {
        Sub {
            hostname: "worker-1",
            tree,
            object_cache: cache,
            computed_inodes: computed,
        }
    }

    fn resolved_inode(content: &[u8]) -> RegularInode {
        RegularInode {
            mode: 0o644,
            uid: 0,
            gid: 0,
            mtime: 0,
            size: content.len() as u64,
            hash: ObjectHash::of_bytes(content),
        }
    }

    fn computed_spec() -> ComputedInode {
        ComputedInode {
            mode: 0o644,
            uid: 0,
            gid: 0,
            source: "generator".into(),
        }
    }

    fn build(
        sub: &Sub<'_>,
        image: &Image,
        delete_missing: bool,
        ignore_missing: bool,
    ) -> ReconcileResult<UpdateRequest> {
        let mut request = UpdateRequest::new();
        build_update_request(sub, image, &mut request, delete_missing, ignore_missing)?;
        Ok(request)
    }

    #[test]
    fn identical_trees_produce_empty_request() {
        let tree = TreeBuilder::new()
            .file("/etc/passwd", b"root:x:0:0")
            .unwrap()
            .symlink("/etc/mtab", "/proc/mounts")
            .unwrap()
            .build()
            .unwrap();
        let cache = ObjectCache::from_tree(&tree);
        let computed = BTreeMap::new();
        let sub = sub_context(&tree, &cache, &computed);
        let image = Image::new(tree.clone());

        let request = build(&sub, &image, false, false).unwrap();
        assert!(request.is_empty());
    }

    #[test]
    fn live_only_paths_are_deleted() {
        let live = TreeBuilder::new()
            .file("/etc/stale.conf", b"old")
            .unwrap()
            .build()
            .unwrap();
        let cache = ObjectCache::from_tree(&live);
        let computed = BTreeMap::new();
        let sub = sub_context(&live, &cache, &computed);
        let image = Image::new(FileSystemTree::empty());

        let request = build(&sub, &image, false, false).unwrap();
        assert_eq!(request.paths_to_delete, vec!["/etc", "/etc/stale.conf"]);
        assert!(request.inodes_to_make.is_empty());
    }

    #[test]
    fn filter_excluded_live_paths_are_left_alone() {
        let live = TreeBuilder::new()
            .file("/tmp/scratch", b"junk")
            .unwrap()
            .build()
            .unwrap();
        let cache = ObjectCache::from_tree(&live);
        let computed = BTreeMap::new();
        let sub = sub_context(&live, &cache, &computed);
        let image =
            Image::new(FileSystemTree::empty()).with_filter(Filter::new(["/tmp"]).unwrap());

        let request = build(&sub, &image, false, false).unwrap();
        assert!(request.is_empty());
    }

    #[test]
    fn desired_only_paths_are_created_parents_first() {
        let live = FileSystemTree::empty();
        let cache = ObjectCache::new();
        let computed = BTreeMap::new();
        let sub = sub_context(&live, &cache, &computed);

        let desired = TreeBuilder::new()
            .file("/etc/hostname", b"worker-1")
            .unwrap()
            .build()
            .unwrap();
        let image = Image::new(desired);

        let request = build(&sub, &image, false, false).unwrap();
        assert_eq!(request.directories_to_make.len(), 1);
        assert_eq!(request.directories_to_make[0].path, "/etc");
        assert_eq!(request.inodes_to_make.len(), 1);
        let make = &request.inodes_to_make[0];
        assert_eq!(make.path, "/etc/hostname");
        assert!(matches!(
            make.inode,
            NewInode::Regular { hash, size: 8, .. } if hash == ObjectHash::of_bytes(b"worker-1")
        ));
    }

    #[test]
    fn metadata_drift_becomes_inode_change() {
        let desired_inode = RegularInode {
            mode: 0o600,
            uid: 10,
            gid: 10,
            mtime: 500,
            size: 4,
            hash: ObjectHash::of_bytes(b"keys"),
        };
        let mut live_inode = desired_inode;
        live_inode.mode = 0o644;
        live_inode.uid = 0;

        let live = TreeBuilder::new()
            .file_inode("/etc/secret", live_inode)
            .unwrap()
            .build()
            .unwrap();
        let desired = TreeBuilder::new()
            .file_inode("/etc/secret", desired_inode)
            .unwrap()
            .build()
            .unwrap();
        let cache = ObjectCache::from_tree(&live);
        let computed = BTreeMap::new();
        let sub = sub_context(&live, &cache, &computed);
        let image = Image::new(desired);

        let request = build(&sub, &image, false, false).unwrap();
        assert!(request.inodes_to_make.is_empty());
        assert_eq!(request.inodes_to_change.len(), 1);
        let change = &request.inodes_to_change[0];
        assert_eq!(change.path, "/etc/secret");
        assert_eq!(change.mode, 0o600);
        assert_eq!(change.uid, 10);
    }

    #[test]
    fn content_drift_becomes_inode_make() {
        let live = TreeBuilder::new()
            .file("/etc/hosts", b"old contents")
            .unwrap()
            .build()
            .unwrap();
        let desired = TreeBuilder::new()
            .file("/etc/hosts", b"new contents")
            .unwrap()
            .build()
            .unwrap();
        let cache = ObjectCache::from_tree(&live);
        let computed = BTreeMap::new();
        let sub = sub_context(&live, &cache, &computed);
        let image = Image::new(desired);

        let request = build(&sub, &image, false, false).unwrap();
        assert!(request.inodes_to_change.is_empty());
        assert_eq!(request.inodes_to_make.len(), 1);
        assert!(matches!(
            request.inodes_to_make[0].inode,
            NewInode::Regular { hash, .. } if hash == ObjectHash::of_bytes(b"new contents")
        ));
    }

    #[test]
    fn symlink_target_change_is_remade() {
        let live = TreeBuilder::new()
            .symlink("/etc/mtab", "/old/target")
            .unwrap()
            .build()
            .unwrap();
        let desired = TreeBuilder::new()
            .symlink("/etc/mtab", "/proc/mounts")
            .unwrap()
            .build()
            .unwrap();
        let cache = ObjectCache::new();
        let computed = BTreeMap::new();
        let sub = sub_context(&live, &cache, &computed);
        let image = Image::new(desired);

        let request = build(&sub, &image, false, false).unwrap();
        assert_eq!(request.inodes_to_make.len(), 1);
        assert!(matches!(
            &request.inodes_to_make[0].inode,
            NewInode::Symlink { target, .. } if target == "/proc/mounts"
        ));
    }

    #[test]
    fn special_attribute_drift_with_same_rdev_becomes_change() {
        let live = TreeBuilder::new()
            .special("/dev/null", 0o666, 259)
            .unwrap()
            .build()
            .unwrap();
        let desired = TreeBuilder::new()
            .special("/dev/null", 0o600, 259)
            .unwrap()
            .build()
            .unwrap();
        let cache = ObjectCache::new();
        let computed = BTreeMap::new();
        let sub = sub_context(&live, &cache, &computed);
        let image = Image::new(desired);

        let request = build(&sub, &image, false, false).unwrap();
        assert!(request.inodes_to_make.is_empty());
        assert_eq!(request.inodes_to_change.len(), 1);
        let change = &request.inodes_to_change[0];
        assert_eq!(change.path, "/dev/null");
        assert_eq!(change.mode, 0o600);
    }

    #[test]
    fn special_rdev_change_is_remade() {
        let live = TreeBuilder::new()
            .special("/dev/loop0", 0o660, 1792)
            .unwrap()
            .build()
            .unwrap();
        let desired = TreeBuilder::new()
            .special("/dev/loop0", 0o660, 1793)
            .unwrap()
            .build()
            .unwrap();
        let cache = ObjectCache::new();
        let computed = BTreeMap::new();
        let sub = sub_context(&live, &cache, &computed);
        let image = Image::new(desired);

        let request = build(&sub, &image, false, false).unwrap();
        assert!(request.inodes_to_change.is_empty());
        assert_eq!(request.inodes_to_make.len(), 1);
        assert!(matches!(
            request.inodes_to_make[0].inode,
            NewInode::Special { rdev: 1793, .. }
        ));
    }

    #[test]
    fn type_change_from_directory_deletes_first() {
        let live = TreeBuilder::new()
            .file("/data/member", b"x")
            .unwrap()
            .build()
            .unwrap();
        // Desired /data is a regular file where the live side has a
        // directory.
        let desired = TreeBuilder::new()
            .file("/data", b"now a file")
            .unwrap()
            .build()
            .unwrap();
        let cache = ObjectCache::from_tree(&live);
        let computed = BTreeMap::new();
        let sub = sub_context(&live, &cache, &computed);
        let image = Image::new(desired);

        let request = build(&sub, &image, false, false).unwrap();
        assert!(request.paths_to_delete.contains(&"/data".to_string()));
        assert_eq!(request.inodes_to_make.len(), 1);
        assert_eq!(request.inodes_to_make[0].path, "/data");
    }

    #[test]
    fn resolved_computed_file_is_materialized() {
        let live = FileSystemTree::empty();
        let cache = ObjectCache::new();
        let mut computed = BTreeMap::new();
        computed.insert("/etc/motd".to_string(), resolved_inode(b"welcome"));
        let sub = sub_context(&live, &cache, &computed);
        let image =
            Image::new(FileSystemTree::empty()).with_computed_spec("/etc/motd", computed_spec());

        let request = build(&sub, &image, false, false).unwrap();
        assert_eq!(request.inodes_to_make.len(), 1);
        assert!(matches!(
            request.inodes_to_make[0].inode,
            NewInode::Regular { hash, .. } if hash == ObjectHash::of_bytes(b"welcome")
        ));
    }

    // -----------------------------------------------------------------------
    // Missing computed file policy matrix
    // -----------------------------------------------------------------------

    #[test]
    fn missing_computed_delete_true_emits_deletion() {
        let live = TreeBuilder::new()
            .file("/etc/motd", b"stale generated content")
            .unwrap()
            .build()
            .unwrap();
        let cache = ObjectCache::from_tree(&live);
        let computed = BTreeMap::new();
        let sub = sub_context(&live, &cache, &computed);
        let image =
            Image::new(FileSystemTree::empty()).with_computed_spec("/etc/motd", computed_spec());

        // The ignore flag is irrelevant once deletion is requested.
        for ignore in [false, true] {
            let request = build(&sub, &image, true, ignore).unwrap();
            assert!(
                request.paths_to_delete.contains(&"/etc/motd".to_string()),
                "ignore={ignore}: deletion must be emitted"
            );
        }
    }

    #[test]
    fn missing_computed_ignore_true_skips_path() {
        let live = FileSystemTree::empty();
        let cache = ObjectCache::new();
        let computed = BTreeMap::new();
        let sub = sub_context(&live, &cache, &computed);
        let image =
            Image::new(FileSystemTree::empty()).with_computed_spec("/etc/motd", computed_spec());

        let request = build(&sub, &image, false, true).unwrap();
        assert!(request.is_empty());
    }

    #[test]
    fn missing_computed_fails_build_without_ignore() {
        let live = FileSystemTree::empty();
        let cache = ObjectCache::new();
        let computed = BTreeMap::new();
        let sub = sub_context(&live, &cache, &computed);
        let image =
            Image::new(FileSystemTree::empty()).with_computed_spec("/etc/motd", computed_spec());

        let err = build(&sub, &image, false, false).unwrap_err();
        assert!(err.is_missing_computed_file());
    }

    #[test]
    fn ambiguous_spec_fails_the_build() {
        let live = FileSystemTree::empty();
        let cache = ObjectCache::new();
        let computed = BTreeMap::new();
        let sub = sub_context(&live, &cache, &computed);

        let desired = TreeBuilder::new()
            .file("/etc/motd", b"fixed")
            .unwrap()
            .build()
            .unwrap();
        let image = Image::new(desired).with_computed_spec("/etc/motd", computed_spec());

        let err = build(&sub, &image, false, false).unwrap_err();
        assert!(matches!(err, ReconcileError::AmbiguousInodeSpec { .. }));
    }

    #[test]
    fn directory_attribute_drift_becomes_change() {
        let live = TreeBuilder::new()
            .file("/srv/data", b"x")
            .unwrap()
            .build()
            .unwrap();
        // Same shape, but the desired /srv has different permissions.
        let base = TreeBuilder::new()
            .file("/srv/data", b"x")
            .unwrap()
            .build()
            .unwrap();
        let (srv_number, _) = base.lookup("/srv").unwrap();
        let mut inodes: BTreeMap<u64, Inode> = BTreeMap::new();
        for n in 1u64.. {
            let Some(inode) = base.inode(n) else { break };
            let mut inode = inode.clone();
            if n == srv_number {
                if let Inode::Directory(dir) = &mut inode {
                    dir.mode = 0o700;
                }
            }
            inodes.insert(n, inode);
        }
        let desired = FileSystemTree::new(inodes, base.root()).unwrap();

        let cache = ObjectCache::from_tree(&live);
        let computed = BTreeMap::new();
        let sub = sub_context(&live, &cache, &computed);
        let image = Image::new(desired);

        let request = build(&sub, &image, false, false).unwrap();
        assert_eq!(request.inodes_to_change.len(), 1);
        assert_eq!(request.inodes_to_change[0].path, "/srv");
        assert_eq!(request.inodes_to_change[0].mode, 0o700);
    }
}
