//! Filesystem driver registry and the superblock operations contract: a
//! driver must be registered before any mount that uses it.
//!
//! Operations are kept at superblock scope rather than as a per-inode
//! trait object, since the rest of the kernel keys everything by a plain
//! `Ino` index into the superblock's own inode table rather than by a
//! live `Arc<Inode>` graph.

use alloc::boxed::Box;
use alloc::vec::Vec;

use spin::Mutex;

use crate::error::KResult;
use crate::vfs::inode::{DirEntry, Ino, InodeMeta};

/// Superblock operations: one boxed instance per live mount, created by
/// `FilesystemDriver::read_superblock`.
pub trait Superblock: Send + Sync {
    fn root_ino(&self) -> Ino;
    fn block_size(&self) -> usize;

    fn lookup_inode(&self, parent: Ino, name: &str) -> KResult<Ino>;
    fn make_directory(&self, parent: Ino, name: &str, mode: u32) -> KResult<Ino>;
    fn make_inode(
        &self,
        parent: Ino,
        name: &str,
        meta: InodeMeta,
    ) -> KResult<Ino>;
    fn link_inode(&self, parent: Ino, name: &str, target: Ino) -> KResult<()>;
    fn unlink_inode(&self, parent: Ino, name: &str) -> KResult<()>;
    /// Remove the empty directory `name` under `parent`. `ENOTEMPTY` if it
    /// holds anything beyond `.`/`..`, `ENOTDIR` if `name` isn't a directory.
    fn rmdir_inode(&self, parent: Ino, name: &str) -> KResult<()>;

    fn inode_get(&self, ino: Ino) -> KResult<InodeMeta>;
    fn inode_set(&self, ino: Ino, meta: &InodeMeta) -> KResult<()>;

    fn read_inode(&self, ino: Ino, offset: u64, buf: &mut [u8]) -> KResult<usize>;
    fn write_inode(&self, ino: Ino, offset: u64, buf: &[u8]) -> KResult<usize>;
    fn trunc_inode(&self, ino: Ino, new_len: u64) -> KResult<()>;

    /// `iter` is an opaque cursor, 0 initially; returns `None` once it
    /// reaches the special "end" value.
    fn get_direntry(&self, dir_ino: Ino, iter: &mut u64) -> KResult<Option<DirEntry>>;
}

pub trait FilesystemDriver: Send + Sync {
    fn name(&self) -> &'static str;
    fn read_superblock(&self, source: &str) -> KResult<Box<dyn Superblock>>;
}

static DRIVERS: Mutex<Vec<&'static dyn FilesystemDriver>> = Mutex::new(Vec::new());

pub fn register(driver: &'static dyn FilesystemDriver) {
    DRIVERS.lock().push(driver);
}

pub fn find(name: &str) -> Option<&'static dyn FilesystemDriver> {
    DRIVERS.lock().iter().find(|d| d.name() == name).copied()
}
