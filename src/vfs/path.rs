//! Path resolution: walks the mount tree, jumping into a child mount's
//! root inode whenever a traversed inode is covered by one.

use crate::error::{Errno, KResult};
use crate::vfs::inode::{FileType, Ino};
use crate::vfs::mount::{self, MountId};

/// Resolve `path` to a `(mount, inode)` pair. `want_dir` rejects a
/// non-directory final component with `Errno::ENOTDIR`; a trailing `/`
/// in `path` implies `want_dir` regardless of the argument.
pub fn resolve(path: &str, want_dir: bool) -> KResult<(MountId, Ino)> {
    if !path.starts_with('/') {
        return Err(Errno::EINVAL);
    }
    let trailing_slash = path.len() > 1 && path.ends_with('/');
    let want_dir = want_dir || trailing_slash;

    let root_id = mount::root_mount()?;
    let root_ino = mount::with_mount(root_id, |m| m.sb.root_ino())?;
    let mut cur_mount = root_id;
    let mut cur_ino = root_ino;

    let components: alloc::vec::Vec<&str> =
        path.split('/').filter(|s| !s.is_empty()).collect();

    for (i, name) in components.iter().enumerate() {
        let is_last = i + 1 == components.len();

        let next_ino = mount::with_mount(cur_mount, |m| m.sb.lookup_inode(cur_ino, name))??;
        cur_ino = next_ino;

        if let Some((child_mount, child_root)) = mount::covering_mount(cur_mount, cur_ino) {
            cur_mount = child_mount;
            cur_ino = child_root;
        }

        if is_last && want_dir {
            let meta = mount::with_mount(cur_mount, |m| m.sb.inode_get(cur_ino))??;
            if meta.ftype != FileType::Directory {
                return Err(Errno::ENOTDIR);
            }
        }
    }

    Ok((cur_mount, cur_ino))
}

/// Split `path` into `(parent_dir, leaf_name)`, resolving the parent.
/// Used by create/mkdir/unlink/link, which need the parent directory's
/// `(mount, inode)` plus the unresolved leaf name.
pub fn resolve_parent<'a>(path: &'a str) -> KResult<(MountId, Ino, &'a str)> {
    if !path.starts_with('/') || path == "/" {
        return Err(Errno::EINVAL);
    }
    let trimmed = path.trim_end_matches('/');
    let split_at = trimmed.rfind('/').ok_or(Errno::EINVAL)?;
    let (parent_path, leaf) = trimmed.split_at(split_at);
    let leaf = &leaf[1..];
    if leaf.is_empty() {
        return Err(Errno::EINVAL);
    }
    let parent_path = if parent_path.is_empty() { "/" } else { parent_path };
    let (mount_id, ino) = resolve(parent_path, true)?;
    Ok((mount_id, ino, leaf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_relative_paths() {
        assert_eq!(resolve("etc/passwd", false), Err(Errno::EINVAL));
    }

    #[test]
    fn resolve_parent_splits_leaf() {
        // no mounted root in this test binary; only exercise the
        // string-splitting half by checking the error path is EINVAL,
        // not a panic, when the path is malformed.
        assert_eq!(resolve_parent("/"), Err(Errno::EINVAL));
        assert_eq!(resolve_parent("noroot"), Err(Errno::EINVAL));
    }
}
