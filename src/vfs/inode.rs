//! Inode and directory-entry types shared by every filesystem driver.

use alloc::string::String;

pub type Ino = u32;

/// Index 0 is the sentinel invalid inode.
pub const INO_INVALID: Ino = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FileType {
    Regular,
    Directory,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
    Symlink,
    Unknown,
}

impl FileType {
    /// `dirent.d_type` values.
    pub fn dt(self) -> u8 {
        match self {
            FileType::Unknown => 0,
            FileType::Fifo => 1,
            FileType::CharDevice => 2,
            FileType::Directory => 4,
            FileType::BlockDevice => 6,
            FileType::Regular => 8,
            FileType::Symlink => 10,
            FileType::Socket => 12,
        }
    }
}

/// Attributes carried by every inode.
#[derive(Debug, Clone)]
pub struct InodeMeta {
    pub ino: Ino,
    pub ftype: FileType,
    pub mode: u32,
    pub nlink: u32,
    pub open_count: u32,
    pub size: u64,
    /// (major, minor) for char/block device inodes.
    pub rdev: Option<(u32, u32)>,
}

impl InodeMeta {
    /// An inode with both link count and open count zero must be reaped.
    pub fn is_reapable(&self) -> bool {
        self.nlink == 0 && self.open_count == 0
    }
}

#[derive(Debug, Clone)]
pub struct DirEntry {
    pub d_ino: Ino,
    pub d_off: u64,
    pub d_type: u8,
    pub d_name: String,
}
