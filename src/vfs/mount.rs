//! Mount tree. Exactly one mount has no parent and is the global root.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use spin::Mutex;

use crate::error::{Errno, KResult};
use crate::vfs::driver::Superblock;
use crate::vfs::inode::Ino;

pub type MountId = u32;

pub struct MountNode {
    pub id: MountId,
    pub sb: Box<dyn Superblock>,
    /// The mount and inode this mount covers, or `None` for the root.
    pub covers: Option<(MountId, Ino)>,
    /// Child mounts, keyed by the inode they cover in this mount.
    pub children: BTreeMap<Ino, MountId>,
}

struct MountTable {
    mounts: BTreeMap<MountId, MountNode>,
    root: Option<MountId>,
    next_id: MountId,
}

static TABLE: Mutex<MountTable> =
    Mutex::new(MountTable { mounts: BTreeMap::new(), root: None, next_id: 1 });

/// Mount `driver_name`'s filesystem as the global root.
pub fn mount_root(driver_name: &str, source: &str) -> KResult<MountId> {
    let driver = crate::vfs::driver::find(driver_name).ok_or(Errno::ENODEV)?;
    let sb = driver.read_superblock(source)?;

    let mut table = TABLE.lock();
    if table.root.is_some() {
        return Err(Errno::EBUSY);
    }
    let id = table.next_id;
    table.next_id += 1;
    table.mounts.insert(id, MountNode { id, sb, covers: None, children: BTreeMap::new() });
    table.root = Some(id);
    Ok(id)
}

/// `vfs_mount(source, target, opts)`: resolve `target`, look up the named
/// driver, call its `read_superblock`, splice the new mount as a child
/// covering the target inode.
pub fn mount(driver_name: &str, source: &str, target: &str) -> KResult<MountId> {
    let driver = crate::vfs::driver::find(driver_name).ok_or(Errno::ENODEV)?;
    let (target_mount, target_ino) = crate::vfs::path::resolve(target, true)?;
    let sb = driver.read_superblock(source)?;

    let mut table = TABLE.lock();
    let id = table.next_id;
    table.next_id += 1;
    table.mounts.insert(
        id,
        MountNode { id, sb, covers: Some((target_mount, target_ino)), children: BTreeMap::new() },
    );
    if let Some(parent) = table.mounts.get_mut(&target_mount) {
        parent.children.insert(target_ino, id);
    }
    Ok(id)
}

pub fn root_mount() -> KResult<MountId> {
    TABLE.lock().root.ok_or(Errno::ENODEV)
}

pub fn with_mount<R>(id: MountId, f: impl FnOnce(&MountNode) -> R) -> KResult<R> {
    let table = TABLE.lock();
    let node = table.mounts.get(&id).ok_or(Errno::ENODEV)?;
    Ok(f(node))
}

/// If `ino` in `mount_id` is covered by a child mount, return that child's
/// id and root inode.
pub fn covering_mount(mount_id: MountId, ino: Ino) -> Option<(MountId, Ino)> {
    let table = TABLE.lock();
    let node = table.mounts.get(&mount_id)?;
    let child_id = *node.children.get(&ino)?;
    let child = table.mounts.get(&child_id)?;
    Some((child_id, child.sb.root_ino()))
}

pub fn source_label(id: MountId) -> String {
    id.to_string()
}

#[allow(dead_code)]
pub fn all_mount_ids() -> Vec<MountId> {
    TABLE.lock().mounts.keys().copied().collect()
}
