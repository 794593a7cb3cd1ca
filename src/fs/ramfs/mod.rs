//! In-memory filesystem implementing the VFS driver contract: inode
//! B-tree, hashed directories, direct/indirect file blocks.

pub mod btree;
pub mod dir;
pub mod file;

use alloc::boxed::Box;

use btree::InodeBtree;
use dir::RamfsDirectory;
use file::FileBlocks;
use spin::Mutex;

use crate::error::{Errno, KResult};
use crate::vfs::driver::{FilesystemDriver, Superblock};
use crate::vfs::inode::{DirEntry, FileType, Ino, InodeMeta, INO_INVALID};

const BTREE_FANOUT: usize = 64;

enum Payload {
    None,
    Directory(RamfsDirectory),
    File(FileBlocks),
}

struct InodeRecord {
    meta: InodeMeta,
    payload: Payload,
}

fn sentinel_record() -> Box<InodeRecord> {
    Box::new(InodeRecord {
        meta: InodeMeta {
            ino: INO_INVALID,
            ftype: FileType::Unknown,
            mode: 0,
            nlink: 0,
            open_count: 0,
            size: 0,
            rdev: None,
        },
        payload: Payload::None,
    })
}

struct RamfsState {
    btree: InodeBtree,
    root_ino: Ino,
}

pub struct RamfsSuperblock {
    state: Mutex<RamfsState>,
}

impl RamfsSuperblock {
    fn new() -> Self {
        let mut btree = InodeBtree::new(BTREE_FANOUT, sentinel_record());
        let root_ino = btree.new_leaf(InodeRecord {
            meta: InodeMeta {
                ino: INO_INVALID,
                ftype: FileType::Directory,
                mode: 0o755,
                nlink: 2,
                open_count: 0,
                size: 0,
                rdev: None,
            },
            payload: Payload::Directory(RamfsDirectory::new()),
        });
        {
            let root = btree.get_mut(root_ino).expect("just-inserted root inode");
            root.meta.ino = root_ino;
            // Root of the global VFS: ".." points to itself.
            if let Payload::Directory(dir) = &mut root.payload {
                dir.insert(".", root_ino);
                dir.insert("..", root_ino);
            }
        }
        RamfsSuperblock { state: Mutex::new(RamfsState { btree, root_ino }) }
    }

    fn directory<'a>(
        state: &'a mut RamfsState,
        ino: Ino,
    ) -> KResult<&'a mut RamfsDirectory> {
        let record = state.btree.get_mut(ino).ok_or(Errno::ENOENT)?;
        match &mut record.payload {
            Payload::Directory(dir) => Ok(dir),
            _ => Err(Errno::ENOTDIR),
        }
    }
}

impl Superblock for RamfsSuperblock {
    fn root_ino(&self) -> Ino {
        self.state.lock().root_ino
    }

    fn block_size(&self) -> usize {
        file::PAGE_BYTES
    }

    fn lookup_inode(&self, parent: Ino, name: &str) -> KResult<Ino> {
        let mut state = self.state.lock();
        let dir = Self::directory(&mut state, parent)?;
        dir.lookup(name).ok_or(Errno::ENOENT)
    }

    fn make_directory(&self, parent: Ino, name: &str, mode: u32) -> KResult<Ino> {
        let mut state = self.state.lock();
        {
            let dir = Self::directory(&mut state, parent)?;
            if dir.contains(name) {
                return Err(Errno::EEXIST);
            }
        }

        let new_ino = state.btree.new_leaf(InodeRecord {
            meta: InodeMeta {
                ino: INO_INVALID,
                ftype: FileType::Directory,
                mode,
                nlink: 2,
                open_count: 0,
                size: 0,
                rdev: None,
            },
            payload: Payload::Directory(RamfsDirectory::new()),
        });
        {
            let new_record = state.btree.get_mut(new_ino).expect("just inserted");
            new_record.meta.ino = new_ino;
            if let Payload::Directory(dir) = &mut new_record.payload {
                dir.insert(".", new_ino);
                dir.insert("..", parent);
            }
        }
        let parent_dir = Self::directory(&mut state, parent)?;
        parent_dir.insert(name, new_ino);
        if let Some(parent_record) = state.btree.get_mut(parent) {
            parent_record.meta.nlink += 1;
        }
        Ok(new_ino)
    }

    fn make_inode(&self, parent: Ino, name: &str, meta: InodeMeta) -> KResult<Ino> {
        let mut state = self.state.lock();
        {
            let dir = Self::directory(&mut state, parent)?;
            if dir.contains(name) {
                return Err(Errno::EEXIST);
            }
        }
        let payload = match meta.ftype {
            FileType::Regular => Payload::File(FileBlocks::new()),
            _ => Payload::None,
        };
        let mut meta = meta;
        meta.nlink = 1;
        meta.ino = INO_INVALID;
        let new_ino = state.btree.new_leaf(InodeRecord { meta, payload });
        if let Some(record) = state.btree.get_mut(new_ino) {
            record.meta.ino = new_ino;
        }
        let dir = Self::directory(&mut state, parent)?;
        dir.insert(name, new_ino);
        Ok(new_ino)
    }

    fn link_inode(&self, parent: Ino, name: &str, target: Ino) -> KResult<()> {
        let mut state = self.state.lock();
        if state.btree.get(target).is_none() {
            return Err(Errno::ENOENT);
        }
        {
            let dir = Self::directory(&mut state, parent)?;
            if dir.contains(name) {
                return Err(Errno::EEXIST);
            }
        }
        let dir = Self::directory(&mut state, parent)?;
        dir.insert(name, target);
        state.btree.get_mut(target).unwrap().meta.nlink += 1;
        Ok(())
    }

    fn unlink_inode(&self, parent: Ino, name: &str) -> KResult<()> {
        let mut state = self.state.lock();
        let target_ino = {
            let dir = Self::directory(&mut state, parent)?;
            dir.lookup(name).ok_or(Errno::ENOENT)?
        };
        {
            let record = state.btree.get(target_ino).ok_or(Errno::EKERN)?;
            if record.meta.ftype == FileType::Directory {
                return Err(Errno::EISDIR);
            }
        }
        let dir = Self::directory(&mut state, parent)?;
        dir.remove(name);

        let record = state.btree.get_mut(target_ino).ok_or(Errno::EKERN)?;
        record.meta.nlink = record.meta.nlink.saturating_sub(1);
        if record.meta.is_reapable() {
            state.btree.free_leaf(target_ino);
        }
        Ok(())
    }

    fn rmdir_inode(&self, parent: Ino, name: &str) -> KResult<()> {
        if name == "." || name == ".." {
            return Err(Errno::EINVAL);
        }
        let mut state = self.state.lock();
        let target_ino = {
            let dir = Self::directory(&mut state, parent)?;
            dir.lookup(name).ok_or(Errno::ENOENT)?
        };
        {
            let record = state.btree.get(target_ino).ok_or(Errno::EKERN)?;
            if record.meta.ftype != FileType::Directory {
                return Err(Errno::ENOTDIR);
            }
        }
        {
            // Only "." and ".." should remain; anything else means the
            // directory still has live entries.
            let target_dir = Self::directory(&mut state, target_ino)?;
            if target_dir.len() > 2 {
                return Err(Errno::ENOTEMPTY);
            }
        }

        let dir = Self::directory(&mut state, parent)?;
        dir.remove(name);
        if let Some(parent_record) = state.btree.get_mut(parent) {
            parent_record.meta.nlink = parent_record.meta.nlink.saturating_sub(1);
        }
        state.btree.free_leaf(target_ino);
        Ok(())
    }

    fn inode_get(&self, ino: Ino) -> KResult<InodeMeta> {
        let state = self.state.lock();
        state.btree.get(ino).map(|r| r.meta.clone()).ok_or(Errno::ENOENT)
    }

    fn inode_set(&self, ino: Ino, meta: &InodeMeta) -> KResult<()> {
        let mut state = self.state.lock();
        let record = state.btree.get_mut(ino).ok_or(Errno::ENOENT)?;
        record.meta = meta.clone();
        if record.meta.is_reapable() {
            state.btree.free_leaf(ino);
        }
        Ok(())
    }

    fn read_inode(&self, ino: Ino, offset: u64, buf: &mut [u8]) -> KResult<usize> {
        let mut state = self.state.lock();
        let record = state.btree.get_mut(ino).ok_or(Errno::ENOENT)?;
        let size = record.meta.size;
        if offset >= size {
            return Ok(0);
        }
        let want = (buf.len() as u64).min(size - offset) as usize;
        match &record.payload {
            Payload::File(f) => {
                f.read(offset, &mut buf[..want])?;
                Ok(want)
            }
            _ => Err(Errno::EINVAL),
        }
    }

    fn write_inode(&self, ino: Ino, offset: u64, buf: &[u8]) -> KResult<usize> {
        let mut state = self.state.lock();
        let record = state.btree.get_mut(ino).ok_or(Errno::ENOENT)?;
        match &mut record.payload {
            Payload::File(f) => {
                f.write(offset, buf)?;
                let end = offset + buf.len() as u64;
                if end > record.meta.size {
                    record.meta.size = end;
                }
                Ok(buf.len())
            }
            _ => Err(Errno::EINVAL),
        }
    }

    fn trunc_inode(&self, ino: Ino, new_len: u64) -> KResult<()> {
        let mut state = self.state.lock();
        let record = state.btree.get_mut(ino).ok_or(Errno::ENOENT)?;
        match &mut record.payload {
            Payload::File(f) => {
                if new_len < record.meta.size {
                    let page = file::PAGE_BYTES as u64;
                    let first_freed = ((new_len + page - 1) / page) as usize;
                    f.truncate_from(first_freed);
                }
                record.meta.size = new_len;
                Ok(())
            }
            _ => Err(Errno::EINVAL),
        }
    }

    fn get_direntry(&self, dir_ino: Ino, iter: &mut u64) -> KResult<Option<DirEntry>> {
        let mut state = self.state.lock();
        let (ino, name, off) = {
            let dir = Self::directory(&mut state, dir_ino)?;
            match dir.next_entry(iter) {
                Some((ino, name)) => (ino, alloc::string::String::from(name), *iter),
                None => return Ok(None),
            }
        };
        let ftype = state.btree.get(ino).map(|r| r.meta.ftype).unwrap_or(FileType::Unknown);
        Ok(Some(DirEntry { d_ino: ino, d_off: off, d_type: ftype.dt(), d_name: name }))
    }
}

pub struct RamfsDriver;

impl FilesystemDriver for RamfsDriver {
    fn name(&self) -> &'static str {
        "ramfs"
    }

    fn read_superblock(&self, _source: &str) -> KResult<Box<dyn Superblock>> {
        Ok(Box::new(RamfsSuperblock::new()))
    }
}

static RAMFS_DRIVER: RamfsDriver = RamfsDriver;

pub fn init() {
    crate::vfs::driver::register(&RAMFS_DRIVER);
}
