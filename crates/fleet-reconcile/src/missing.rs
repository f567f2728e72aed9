use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use fleet_types::ObjectHash;
use fleet_tree::Image;

use crate::desired::{desired_view, DesiredNode};
use crate::error::{ReconcileError, ReconcileResult};
use crate::sub::Sub;

/// The object-level delta for one machine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MissingLists {
    /// Hash → size of every object the machine must fetch from a remote
    /// object server. A hash needed by many paths appears once.
    pub fetch: BTreeMap<ObjectHash, u64>,
    /// Hashes of locally-generated content the machine itself must push,
    /// since only it can produce that content.
    pub push: BTreeSet<ObjectHash>,
}

impl MissingLists {
    /// Returns `true` when the machine already matches its image.
    pub fn is_empty(&self) -> bool {
        self.fetch.is_empty() && self.push.is_empty()
    }
}

/// Compute the fetch and push lists for one machine.
///
/// Walks the image's filtered desired view in lexicographic order. Fixed
/// hashes absent from the machine's object cache land in the fetch list;
/// computed paths are resolved through `sub.computed_inodes` when
/// `push_computed_files` is set, and resolved hashes absent from the
/// cache land in the push list.
///
/// A computed path that cannot be resolved is skipped when
/// `ignore_missing_computed_files` is set; otherwise the whole call
/// fails and no partial lists escape, so callers can never apply an
/// update whose computed-file set is incomplete.
pub fn build_missing_lists(
    sub: &Sub<'_>,
    image: &Image,
    push_computed_files: bool,
    ignore_missing_computed_files: bool,
) -> ReconcileResult<MissingLists> {
    let desired = desired_view(image)?;
    let mut lists = MissingLists::default();
    for (path, node) in &desired {
        match node {
            DesiredNode::Regular(inode) => {
                if !sub.object_cache.contains(&inode.hash) {
                    lists.fetch.insert(inode.hash, inode.size);
                }
            }
            DesiredNode::Computed(_) => {
                if !push_computed_files {
                    continue;
                }
                match sub.computed_inodes.get(path) {
                    Some(resolved) => {
                        if !sub.object_cache.contains(&resolved.hash) {
                            lists.push.insert(resolved.hash);
                        }
                    }
                    None if ignore_missing_computed_files => {
                        warn!(sub = %sub, path = %path, "ignoring missing computed file");
                    }
                    None => {
                        return Err(ReconcileError::MissingComputedFile { path: path.clone() });
                    }
                }
            }
            DesiredNode::Directory(_) | DesiredNode::Symlink(_) | DesiredNode::Special(_) => {}
        }
    }
    debug!(
        sub = %sub,
        fetch = lists.fetch.len(),
        push = lists.push.len(),
        "missing lists built"
    );
    Ok(lists)
}
