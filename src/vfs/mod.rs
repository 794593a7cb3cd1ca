//! Virtual filesystem: mount tree, path resolution, and the superblock
//! operations contract every driver implements.

pub mod driver;
pub mod inode;
pub mod mount;
pub mod path;

use crate::error::{Errno, KResult};
use inode::{DirEntry, FileType, Ino, InodeMeta};
use mount::MountId;

/// Mount the root filesystem. Called once during boot.
pub fn mount_root(driver_name: &str, source: &str) -> KResult<MountId> {
    mount::mount_root(driver_name, source)
}

pub fn mount(driver_name: &str, source: &str, target: &str) -> KResult<MountId> {
    mount::mount(driver_name, source, target)
}

/// Resolve and stat a path.
pub fn stat(path: &str) -> KResult<InodeMeta> {
    let (mount_id, ino) = path::resolve(path, false)?;
    mount::with_mount(mount_id, |m| m.sb.inode_get(ino))?
}

pub fn read(path: &str, offset: u64, buf: &mut [u8]) -> KResult<usize> {
    let (mount_id, ino) = path::resolve(path, false)?;
    mount::with_mount(mount_id, |m| m.sb.read_inode(ino, offset, buf))?
}

pub fn write(path: &str, offset: u64, buf: &[u8]) -> KResult<usize> {
    let (mount_id, ino) = path::resolve(path, false)?;
    mount::with_mount(mount_id, |m| m.sb.write_inode(ino, offset, buf))?
}

pub fn truncate(path: &str, new_len: u64) -> KResult<()> {
    let (mount_id, ino) = path::resolve(path, false)?;
    mount::with_mount(mount_id, |m| m.sb.trunc_inode(ino, new_len))?
}

/// Create a regular (or device/fifo/socket) inode at `path`. The parent
/// directory must already exist.
pub fn create(path: &str, ftype: FileType, mode: u32, rdev: Option<(u32, u32)>) -> KResult<Ino> {
    let (mount_id, parent_ino, leaf) = path::resolve_parent(path)?;
    mount::with_mount(mount_id, |m| {
        let meta = InodeMeta {
            ino: inode::INO_INVALID,
            ftype,
            mode,
            nlink: 1,
            open_count: 0,
            size: 0,
            rdev,
        };
        m.sb.make_inode(parent_ino, leaf, meta)
    })?
}

pub fn mkdir(path: &str, mode: u32) -> KResult<Ino> {
    let (mount_id, parent_ino, leaf) = path::resolve_parent(path)?;
    mount::with_mount(mount_id, |m| m.sb.make_directory(parent_ino, leaf, mode))?
}

pub fn link(existing: &str, new_path: &str) -> KResult<()> {
    let (src_mount, target_ino) = path::resolve(existing, false)?;
    let (dst_mount, parent_ino, leaf) = path::resolve_parent(new_path)?;
    if src_mount != dst_mount {
        return Err(Errno::EINVAL);
    }
    mount::with_mount(dst_mount, |m| m.sb.link_inode(parent_ino, leaf, target_ino))?
}

pub fn unlink(path: &str) -> KResult<()> {
    let (mount_id, parent_ino, leaf) = path::resolve_parent(path)?;
    mount::with_mount(mount_id, |m| m.sb.unlink_inode(parent_ino, leaf))?
}

pub fn rmdir(path: &str) -> KResult<()> {
    let (mount_id, parent_ino, leaf) = path::resolve_parent(path)?;
    mount::with_mount(mount_id, |m| m.sb.rmdir_inode(parent_ino, leaf))?
}

/// `vfs_rename(old, new)`: link the target at `new`, then drop the `old`
/// name. Both paths must resolve to the same mount (cross-mount rename
/// would need a copy, which this driver set has no call for).
pub fn rename(old: &str, new: &str) -> KResult<()> {
    let (old_mount, target_ino) = path::resolve(old, false)?;
    let (new_mount, new_parent, leaf) = path::resolve_parent(new)?;
    if old_mount != new_mount {
        return Err(Errno::EINVAL);
    }
    mount::with_mount(new_mount, |m| m.sb.link_inode(new_parent, leaf, target_ino))??;
    let (old_mount, old_parent, old_leaf) = path::resolve_parent(old)?;
    mount::with_mount(old_mount, |m| m.sb.unlink_inode(old_parent, old_leaf))?
}

/// Read the next directory entry starting from the opaque cursor `iter`
/// (0 initially). Returns `None` once the directory is exhausted.
pub fn readdir(path: &str, iter: &mut u64) -> KResult<Option<DirEntry>> {
    let (mount_id, ino) = path::resolve(path, true)?;
    mount::with_mount(mount_id, |m| m.sb.get_direntry(ino, iter))?
}
