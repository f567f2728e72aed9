use std::collections::BTreeMap;

use fleet_tree::{
    ComputedInode, DirectoryInode, Image, Inode, RegularInode, SpecialInode, SymlinkInode,
};

use crate::error::{ReconcileError, ReconcileResult};

/// One entry of the filtered desired view.
#[derive(Clone, Debug)]
pub(crate) enum DesiredNode<'a> {
    Directory(&'a DirectoryInode),
    Regular(&'a RegularInode),
    Computed(&'a ComputedInode),
    Symlink(&'a SymlinkInode),
    Special(&'a SpecialInode),
}

/// Build the filtered desired view of an image: every desired path in
/// lexicographic order, with the image's computed-file specs merged in.
///
/// A path carrying both a fixed-hash regular inode and a computed spec
/// is a configuration error ([`ReconcileError::AmbiguousInodeSpec`]);
/// the view fails rather than guess which wins. A computed spec may
/// override an in-tree computed placeholder, since both mean the same
/// thing.
pub(crate) fn desired_view(image: &Image) -> ReconcileResult<BTreeMap<String, DesiredNode<'_>>> {
    let mut view = BTreeMap::new();
    for entry in image.tree.walk() {
        if image.filter.matches(&entry.path) {
            continue;
        }
        let node = match entry.inode {
            Inode::Directory(dir) => DesiredNode::Directory(dir),
            Inode::Regular(inode) => DesiredNode::Regular(inode),
            Inode::Computed(spec) => DesiredNode::Computed(spec),
            Inode::Symlink(link) => DesiredNode::Symlink(link),
            Inode::Special(special) => DesiredNode::Special(special),
        };
        view.insert(entry.path, node);
    }
    for (path, spec) in &image.computed_specs {
        if image.filter.matches(path) {
            continue;
        }
        match view.get(path) {
            None | Some(DesiredNode::Computed(_)) => {
                view.insert(path.clone(), DesiredNode::Computed(spec));
            }
            Some(_) => {
                return Err(ReconcileError::AmbiguousInodeSpec { path: path.clone() });
            }
        }
    }
    Ok(view)
}
