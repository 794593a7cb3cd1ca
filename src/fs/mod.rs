//! Filesystem drivers. `ramfs` is the only one shipped; `init()` registers
//! every driver with the VFS driver registry before boot mounts the root.

pub mod ramfs;

pub fn init() {
    ramfs::init();
}
